//! Encrypted, TTL-expiring storage for debate records.
//!
//! The [`store::SessionStore`] seals every blob with AES-256-GCM before
//! it reaches the pluggable [`backend::StoreBackend`], and is the only
//! component allowed to mutate [`da_domain::session::DebateSession`]s.

pub mod backend;
pub mod crypto;
pub mod store;

pub use backend::{MemoryBackend, StoreBackend};
pub use crypto::SessionCrypto;
pub use store::SessionStore;
