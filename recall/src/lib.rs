pub mod aggregate;
pub mod query_engine;
pub mod server;

pub use query_engine::QueryEngine;
