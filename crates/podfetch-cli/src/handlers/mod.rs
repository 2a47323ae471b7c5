//! Command handlers.
//!
//! Handlers are thin: they parse CLI-specific input, call into the
//! coordinator or evaluator, and format output for the terminal. Machine
//! readable results (storage actions, policy reports) go to stdout as JSON;
//! logs go to stderr.

pub mod evict;
pub mod simulate;
