//! Progress publication helpers.
//!
//! This module handles rate-limiting of per-task progress events.

mod throttle;

pub use throttle::ProgressThrottle;
