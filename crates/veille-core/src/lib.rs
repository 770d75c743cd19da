//! # veille-core
//!
//! Core types, traits, and abstractions for the veille matching engine.
//!
//! This crate provides the foundational data structures and trait
//! definitions that the other veille crates depend on.

pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use models::*;
pub use traits::*;
