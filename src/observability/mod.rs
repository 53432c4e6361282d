//! Observability subsystem.
//!
//! Structured log events only: request spans come from tower_http's
//! `TraceLayer`, everything else from `tracing` macros with fields.

pub mod logging;
