//! Per-entity Markov chain text modeling.
//!
//! This crate provides:
//! - Word and n-gram tokenization
//! - Incremental chain building with a configurable context depth
//! - Weighted random generation with spacing reconstruction
//! - Stores (in memory, on disk) and a service facade for hosts
//!
//! The model functions are pure: a chain goes in, an updated chain or a text
//! comes out. Persistence is the caller's business, see [`service::Markov`].

/// Configuration contract and workspace settings.
pub mod config;

/// Error taxonomy.
pub mod error;

/// Chains, tokenizer, builder and generator.
pub mod model;

/// Chain persistence.
pub mod store;

/// Read-modify-write glue around a store.
pub mod service;

/// File helpers (line reading, atomic replace, directory listing).
///
/// Not exposed
pub(crate) mod io;

pub use config::{EntityConfig, ScopeConfig, Settings, StoreFormat, TokenMode};
pub use error::{AbsentReason, MarkovError};
pub use model::chain::{TransitionModel, CONTROL};
pub use service::{Ingestion, Markov};
