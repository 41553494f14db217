//! Shared domain types for the debate arena.
//!
//! Everything that crosses a crate boundary lives here: the error
//! taxonomy, session and turn records, the engine-state projection,
//! usage tallies, bus events, stream chunks, IDs, and configuration.

pub mod config;
pub mod error;
pub mod events;
pub mod ids;
pub mod session;
pub mod state;
pub mod stream;
pub mod turn;
pub mod usage;

pub use error::{BlockReason, Error, ProviderError, ProviderErrorKind, ProviderType, Result};
