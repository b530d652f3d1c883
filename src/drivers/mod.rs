//! Servo driver, task pinning and the task watchdog.

pub mod servo;
pub mod task_pin;
pub mod watchdog;
