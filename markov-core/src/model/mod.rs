//! Token-transition chains: building them from text and walking them back into text.
//!
//! This module provides:
//! - Tokenization of raw text (`tokenizer`)
//! - The persisted chain and its states (`TransitionModel`, `State`)
//! - Sliding-window ingestion (`ChainBuilder`)
//! - Weighted random walks (`Generator`) and their parameters (`GenerationInput`)
//! - One entity's chain with its settings (`EntityChain`)

/// Splits raw text into word or n-gram tokens.
pub mod tokenizer;

/// Successor distribution of a single state, with weighted sampling.
pub mod state;

/// The transition model, the control marker and state key derivation.
pub mod chain;

/// Folds token sequences into a transition model.
pub mod builder;

/// Word-mode spacing reconstruction.
pub mod spacing;

/// Generation parameters (chain shape, attempt and length limits).
pub mod generation_input;

/// Weighted random walk with bounded retries.
pub mod generator;

/// An entity's chain plus its configuration.
pub mod entity;
