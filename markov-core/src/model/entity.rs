use rand::Rng;

use crate::config::{EntityConfig, Settings};
use crate::error::{AbsentReason, MarkovError};
use super::builder::ChainBuilder;
use super::chain::TransitionModel;
use super::generation_input::GenerationInput;
use super::generator::Generator;

/// Warning returned when a configuration change makes an existing chain
/// mix incompatible state granularities.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Advisory {
	pub previous: EntityConfig,
	pub current: EntityConfig,
}

impl Advisory {
	/// Sentence explaining why the chain should be reset.
	pub fn message(&self) -> String {
		format!(
			"chain was built with mode {} at depth {}, now {} at depth {}: reset it to avoid mixing both",
			self.previous.token_mode,
			self.previous.depth(),
			self.current.token_mode,
			self.current.depth()
		)
	}
}

/// One entity's chain and the settings it is built with.
///
/// `model` is `None` until the first enabled ingestion.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EntityChain {
	pub entity: String,
	pub config: EntityConfig,
	pub model: Option<TransitionModel>,
}

impl EntityChain {
	/// Wraps stored settings and chain of `entity`.
	pub fn new(entity: &str, config: EntityConfig, model: Option<TransitionModel>) -> Self {
		Self { entity: entity.to_owned(), config, model }
	}

	/// Folds `text` into the chain, creating it on first use.
	///
	/// Returns `Ok(None)` without touching anything when modeling is disabled,
	/// otherwise the number of tokens folded.
	pub fn observe(&mut self, text: &str) -> Result<Option<usize>, MarkovError> {
		if !self.config.enabled {
			return Ok(None);
		}
		let builder = ChainBuilder::new(self.config.depth());
		let mut model = self.model.take().unwrap_or_default();
		let result = builder.ingest_text(&mut model, text, self.config.token_mode);
		self.model = Some(model);
		result.map(Some)
	}

	/// Generates text from the chain.
	///
	/// # Errors
	/// - [`MarkovError::ModelAbsent`] if modeling is disabled or nothing was ingested.
	/// - Generator errors otherwise.
	pub fn generate<R: Rng>(&self, generator: &mut Generator<R>, settings: &Settings) -> Result<String, MarkovError> {
		if !self.config.enabled {
			return Err(self.absent(AbsentReason::Disabled));
		}
		let model = match &self.model {
			Some(model) if !model.is_empty() => model,
			_ => return Err(self.absent(AbsentReason::NoChain)),
		};
		generator.generate(model, &GenerationInput::for_entity(&self.config, settings))
	}

	/// Replaces the configuration.
	///
	/// The chain is kept as is: an [`Advisory`] is returned when it exists and
	/// was built with another mode or depth.
	pub fn reconfigure(&mut self, config: EntityConfig) -> Option<Advisory> {
		let previous = std::mem::replace(&mut self.config, config);
		let has_chain = self.model.as_ref().is_some_and(|model| !model.is_empty());
		if has_chain && !previous.is_compatible_with(&self.config) {
			return Some(Advisory { previous, current: self.config.clone() });
		}
		None
	}

	/// Drops the chain; the configuration stays.
	pub fn reset(&mut self) {
		self.model = None;
	}

	fn absent(&self, reason: AbsentReason) -> MarkovError {
		MarkovError::ModelAbsent { entity: self.entity.clone(), reason }
	}
}
