//! Hookbridge Core - Shared types and utilities for the scripting bridge

mod error;
mod types;
mod idgen;

pub use error::*;
pub use types::*;
pub use idgen::*;
