pub mod adapters;
mod client;

pub use client::*;
