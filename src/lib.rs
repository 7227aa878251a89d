#![warn(clippy::all)]

pub mod error;
pub mod sql;

pub use error::{Error, Result};
