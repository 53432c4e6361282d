//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Startup: backend address list
//!     → backend.rs (parse each address into a BackendTarget)
//!     → round_robin.rs (BackendRegistry, fixed rotation order)
//!
//! Per request:
//!     → BackendRegistry::select_next (atomic cursor advance)
//!     → selected BackendTarget handed to the forwarding proxy
//! ```
//!
//! # Design Decisions
//! - Registry is immutable after construction apart from the cursor
//! - Selection is blind: no health state, no weights
//! - Cursor update never overlaps backend I/O

pub mod backend;
pub mod round_robin;

pub use backend::{BackendTarget, ConfigurationError};
pub use round_robin::BackendRegistry;
