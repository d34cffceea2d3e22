//! Types shared by the QuickBooks report workspace crates

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
