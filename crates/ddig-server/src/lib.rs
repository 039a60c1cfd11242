//! HTTP surface: form submissions on `/submit`, the Admin Query API on
//! `/api`, and `/health`.

pub mod admin;
pub mod auth;
pub mod compat;
pub mod envelope;
pub mod handlers;
pub mod registry;
pub mod server;
pub mod submission;

pub use envelope::{ApiError, Envelope};
pub use registry::{FormContext, FormHandler, FormRegistry, RegistryError};
pub use server::{build_router, start, AppState, ServerError, ServerHandle};
pub use submission::Submission;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
