//! Shared domain types, collaborator traits, configuration, rank fusion and
//! section chunking for the docsearch workspace.

pub mod chunker;
pub mod config;
pub mod error;
pub mod fusion;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
