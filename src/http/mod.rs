//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, pipeline layers)
//!     → request.rs (request ID, client address)
//!     → context.rs (per-request context in extensions)
//!     → assets.rs (static directories)
//!     → [router registry dispatch]
//!     → response.rs (error rendering)
//!     → Send to client
//! ```

pub mod assets;
pub mod context;
pub mod request;
pub mod response;
pub mod server;

pub use context::{BodyKind, Ctx, RequestContext, UploadedFile};
pub use request::X_REQUEST_ID;
pub use server::{build_router, AppState, HttpServer, ServerError};
