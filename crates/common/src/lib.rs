//! Shared types for the load balancer member tooling

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
