//! Solmint Core - devnet SPL token client SDK
//!
//! This library provides the core of a thin token client: request/response
//! gateways over an injected wallet provider and blockchain client, plus a
//! single-flight orchestrator for user-triggered operations. Key custody,
//! transaction signing, and network transport stay behind the boundary
//! traits.

pub mod error;
pub mod provider;
pub mod chain;
pub mod session;
pub mod token;
pub mod orchestrator;

// Re-export commonly used types for convenience
pub use error::{Error, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
