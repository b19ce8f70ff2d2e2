//! HTTP admin API over the bridge facade.
//!
//! Exposes subscriber CRUD, event emission, connectivity probes, and the
//! status snapshot to the surrounding application layer. Errors surface as
//! structured `{error: {code, message}}` bodies with no internal detail.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod handlers;
pub mod server;

pub use error::ApiError;
pub use server::{create_router, start_server};
