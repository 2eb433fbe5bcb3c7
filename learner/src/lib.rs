pub mod collector;
pub mod scheduler;

pub use collector::{Collector, CycleReport};
pub use scheduler::{Scheduler, SchedulerHandle};
