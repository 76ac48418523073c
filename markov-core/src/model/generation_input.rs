use crate::config::{EntityConfig, Settings, TokenMode};

/// Parameters of one generation request.
///
/// # Responsibilities
/// - Carry the entity's chain shape (`depth`, `mode`) so walks rebuild the
///   same state keys ingestion recorded
/// - Bound the work: `max_attempts` walks, each at most `max_tokens` long
///
/// # Invariants
/// - `depth`, `max_attempts` and `max_tokens` are always >= 1
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GenerationInput {
	depth: usize,
	mode: TokenMode,
	max_attempts: usize,
	max_tokens: usize,
}

impl GenerationInput {
	/// Creates an input for a chain of the given shape, with 5 attempts and 1000 tokens.
	pub fn new(depth: usize, mode: TokenMode) -> Self {
		Self { depth: depth.max(1), mode, max_attempts: 5, max_tokens: 1000 }
	}

	/// Input matching an entity's configuration and the workspace limits.
	pub fn for_entity(config: &EntityConfig, settings: &Settings) -> Self {
		Self::new(config.depth(), config.token_mode)
			.with_max_attempts(settings.max_attempts)
			.with_max_tokens(settings.max_tokens)
	}

	/// Total attempts before an empty result becomes an error (at least 1).
	pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
		self.max_attempts = max_attempts.max(1);
		self
	}

	/// Longest walk in tokens (at least 1).
	pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
		self.max_tokens = max_tokens.max(1);
		self
	}

	/// Context depth of the chain.
	pub fn depth(&self) -> usize {
		self.depth
	}

	/// Token mode the chain was built with.
	pub fn mode(&self) -> TokenMode {
		self.mode
	}

	/// Total walks tried before giving up on empty output.
	pub fn max_attempts(&self) -> usize {
		self.max_attempts
	}

	/// Longest walk, in tokens.
	pub fn max_tokens(&self) -> usize {
		self.max_tokens
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn limits_never_drop_below_one() {
		let input = GenerationInput::new(0, TokenMode::Word).with_max_attempts(0).with_max_tokens(0);
		assert_eq!(input.depth(), 1);
		assert_eq!(input.max_attempts(), 1);
		assert_eq!(input.max_tokens(), 1);
	}

	#[test]
	fn for_entity_copies_shape_and_limits() {
		let config = EntityConfig { enabled: true, token_mode: TokenMode::NGram(4), chain_depth: 2 };
		let settings = Settings { max_attempts: 3, max_tokens: 50, ..Settings::default() };
		let input = GenerationInput::for_entity(&config, &settings);
		assert_eq!(input.mode(), TokenMode::NGram(4));
		assert_eq!(input.depth(), 2);
		assert_eq!(input.max_attempts(), 3);
		assert_eq!(input.max_tokens(), 50);
	}
}
