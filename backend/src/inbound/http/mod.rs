//! HTTP inbound adapter exposing the sync REST endpoints.

pub mod caller;
pub mod error;
pub mod health;
pub mod state;
pub mod status;
pub mod sync;

pub use error::ApiResult;
