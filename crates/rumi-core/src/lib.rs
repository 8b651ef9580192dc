//! # rumi-core
//!
//! Core types, traits, and abstractions for the rumi notes backend.
//!
//! This crate provides the note model, the storage port that every
//! persistence backend implements, and the shared error type.

pub mod defaults;
pub mod error;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use models::*;
pub use traits::*;
