//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, catch-all route)
//!     → [load balancer picks backend]
//!     → request.rs (retarget URI, drop hop-by-hop headers)
//!     → forward.rs (one upstream request via client.rs)
//!     → response.rs (stream backend response back, or 502)
//!       or upgrade.rs (on 101, splice caller and backend connections)
//!     → Send to client
//! ```

pub mod client;
pub mod forward;
pub mod headers;
pub mod request;
pub mod response;
pub mod server;
pub mod upgrade;

pub use forward::forward;
pub use response::ProxyError;
pub use server::{AppState, HttpServer};
