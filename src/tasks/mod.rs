//! Background Tasks Module
//!
//! Tasks that run periodically while a store is connected.
//!
//! # Tasks
//! - Sweeper: applies pending truncate requests and removes expired records

mod sweeper;

pub use sweeper::spawn_sweeper;
