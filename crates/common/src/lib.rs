//! Common types for the UltraDNS workspace

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::{MASK, Secret};
