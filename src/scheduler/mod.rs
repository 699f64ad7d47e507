//! Periodic tick driver.

pub mod engine;

pub use self::engine::{run_monitor_loop, tick_once};
