//! Caller-side glue: read-modify-write cycles around a [`ChainStore`].
//!
//! [`Markov`] is what a host (chat bot, HTTP server...) talks to. It resolves
//! configuration from the store, runs the pure core, and writes results back.
//! It performs no locking: a host sharing one `Markov` between threads wraps
//! it in a mutex, which also serializes concurrent ingestions.

use std::path::Path;

use rand::Rng;

use crate::config::{EntityConfig, ScopeConfig, Settings, TokenMode};
use crate::error::{AbsentReason, MarkovError};
use crate::model::builder::ChainBuilder;
use crate::model::entity::Advisory;
use crate::model::generator::Generator;
use crate::store::ChainStore;

/// Outcome of observing one message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ingestion {
	/// The message was folded into the author's chain.
	Recorded { tokens: usize },
	/// The author has not enabled modeling.
	Disabled,
	/// Something failed; the message's contribution was dropped and logged.
	Dropped,
	/// The message is a command (it does not start with an alphanumeric
	/// character) or was posted by the host itself.
	Ignored,
}

/// Entry point for hosts: one store, one set of settings.
pub struct Markov<S: ChainStore> {
	store: S,
	settings: Settings,
}

impl<S: ChainStore> Markov<S> {
	/// Creates the service over `store`.
	pub fn new(store: S, settings: Settings) -> Self {
		Self { store, settings }
	}

	/// Settings the service was created with.
	pub fn settings(&self) -> &Settings {
		&self.settings
	}

	/// Underlying store.
	pub fn store(&self) -> &S {
		&self.store
	}

	/// Folds a pre-approved message into its author's chain.
	///
	/// Never fails: errors are logged and the message is dropped, leaving the
	/// stored chain untouched.
	pub fn observe(&mut self, entity: &str, text: &str) -> Ingestion {
		if self.is_ignored(entity, text) {
			log::debug!("ignoring message from {entity}");
			return Ingestion::Ignored;
		}
		match self.try_observe(entity, text) {
			Ok(Some(tokens)) => Ingestion::Recorded { tokens },
			Ok(None) => Ingestion::Disabled,
			Err(e) => {
				log::warn!("dropping message from {entity}: {e}");
				Ingestion::Dropped
			}
		}
	}

	/// The host's own messages and command-like messages (`!markov @bob`) never
	/// reach a chain.
	fn is_ignored(&self, entity: &str, text: &str) -> bool {
		if self.settings.self_id.as_deref() == Some(entity) {
			return true;
		}
		text.chars().next().is_some_and(|c| !c.is_alphanumeric())
	}

	fn try_observe(&mut self, entity: &str, text: &str) -> Result<Option<usize>, MarkovError> {
		let mut chain = self.store.load_chain(entity)?;
		let tokens = chain.observe(text)?;
		if tokens.is_some() {
			self.store.save_chain(&chain)?;
		}
		Ok(tokens)
	}

	/// Generates text for `entity` with the given random source.
	pub fn generate_with<R: Rng>(&self, entity: &str, generator: &mut Generator<R>) -> Result<String, MarkovError> {
		let chain = self.store.load_chain(entity)?;
		let text = chain.generate(generator, &self.settings);
		if let Err(e) = &text {
			log::debug!("generation for {entity} failed: {e}");
		}
		text
	}

	/// Generates text for `entity`, asked from `channel` of `scope`.
	///
	/// Returns `Ok(None)` when that channel is not observed: the host stays
	/// silent there, the same way it ignores the channel's messages.
	pub fn generate_in<R: Rng>(
		&self,
		entity: &str,
		scope: Option<&str>,
		channel: Option<&str>,
		generator: &mut Generator<R>,
	) -> Result<Option<String>, MarkovError> {
		if !self.is_eligible(scope, channel)? {
			log::debug!("not generating for {entity}: {scope:?}/{channel:?} is not observed");
			return Ok(None);
		}
		self.generate_with(entity, generator).map(Some)
	}

	/// Generates text for `entity` with the thread-local RNG.
	pub fn generate(&self, entity: &str) -> Result<String, MarkovError> {
		self.generate_with(entity, &mut Generator::new())
	}

	/// Turns modeling on; a first-time entity gets the default mode and depth.
	pub fn enable(&mut self, entity: &str) -> Result<(), MarkovError> {
		let mut config = self.store.load_config(entity)?.unwrap_or_else(|| self.settings.entity_defaults());
		config.enabled = true;
		self.store.save_config(entity, &config)
	}

	/// Turns modeling off and forgets the chain.
	pub fn disable(&mut self, entity: &str) -> Result<(), MarkovError> {
		let mut config = self.store.load_config(entity)?.unwrap_or_default();
		config.enabled = false;
		self.store.save_config(entity, &config)?;
		self.store.delete_model(entity)
	}

	/// Forgets the chain, keeping settings.
	pub fn reset(&mut self, entity: &str) -> Result<(), MarkovError> {
		log::info!("resetting chain of {entity}");
		self.store.delete_model(entity)
	}

	/// Changes token mode and/or depth.
	///
	/// An existing chain is kept as is; the returned [`Advisory`] says when it
	/// should be reset because it was built with another shape.
	pub fn configure(&mut self, entity: &str, mode: Option<TokenMode>, depth: Option<usize>) -> Result<Option<Advisory>, MarkovError> {
		let mut chain = self.store.load_chain(entity)?;
		let config = EntityConfig {
			token_mode: mode.unwrap_or(chain.config.token_mode),
			chain_depth: depth.unwrap_or(chain.config.chain_depth).max(1),
			..chain.config.clone()
		};
		let advisory = chain.reconfigure(config);
		if let Some(advisory) = &advisory {
			log::warn!("{entity}: {}", advisory.message());
		}
		self.store.save_config(entity, &chain.config)?;
		Ok(advisory)
	}

	/// Settings of `entity`; an unknown entity gets the (disabled) defaults.
	pub fn config(&self, entity: &str) -> Result<EntityConfig, MarkovError> {
		Ok(self.store.load_config(entity)?.unwrap_or_default())
	}

	/// Every entity with stored settings, sorted.
	pub fn entities(&self) -> Result<Vec<String>, MarkovError> {
		self.store.entities()
	}

	/// Builds a chain from a corpus file, one message per line, and merges it
	/// into the entity's chain. Modeling must be enabled.
	pub fn train<P: AsRef<Path>>(&mut self, entity: &str, corpus: P) -> Result<usize, MarkovError> {
		let mut chain = self.store.load_chain(entity)?;
		if !chain.config.enabled {
			return Err(MarkovError::ModelAbsent { entity: entity.to_owned(), reason: AbsentReason::Disabled });
		}

		let builder = ChainBuilder::new(chain.config.depth());
		let trained = builder.build_from_file(corpus, chain.config.token_mode)?;
		let states = trained.len();
		chain.model.get_or_insert_with(Default::default).merge(&trained);
		self.store.save_chain(&chain)?;
		Ok(states)
	}

	/// Whether a message posted in `channel` of `scope` may be observed.
	///
	/// Messages outside any scope (direct messages) are always eligible.
	pub fn is_eligible(&self, scope: Option<&str>, channel: Option<&str>) -> Result<bool, MarkovError> {
		let Some(scope) = scope else {
			return Ok(true);
		};
		let restriction = self.store.load_scope(scope)?;
		Ok(match channel {
			Some(channel) => restriction.allows(channel),
			None => restriction.restricted_channels.is_none(),
		})
	}

	/// Channel restriction of `scope`.
	pub fn scope(&self, scope: &str) -> Result<ScopeConfig, MarkovError> {
		self.store.load_scope(scope)
	}

	/// Adds `channel` to the channels observed in `scope`.
	pub fn enable_channel(&mut self, scope: &str, channel: &str) -> Result<bool, MarkovError> {
		let mut restriction = self.store.load_scope(scope)?;
		let changed = restriction.allow(channel);
		self.store.save_scope(scope, &restriction)?;
		Ok(changed)
	}

	/// Removes `channel` from the channels observed in `scope`.
	pub fn disable_channel(&mut self, scope: &str, channel: &str) -> Result<bool, MarkovError> {
		let mut restriction = self.store.load_scope(scope)?;
		let changed = restriction.deny(channel);
		self.store.save_scope(scope, &restriction)?;
		Ok(changed)
	}

	/// Lifts any channel restriction of `scope`.
	pub fn clear_scope(&mut self, scope: &str) -> Result<(), MarkovError> {
		let mut restriction = self.store.load_scope(scope)?;
		restriction.clear();
		self.store.save_scope(scope, &restriction)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::model::chain::CONTROL;
	use crate::store::MemoryStore;
	use rand::SeedableRng;
	use rand::rngs::StdRng;
	use std::io::Write;

	fn service() -> Markov<MemoryStore> {
		Markov::new(MemoryStore::new(), Settings::default())
	}

	fn seeded() -> Generator<StdRng> {
		Generator::with_rng(StdRng::seed_from_u64(11))
	}

	#[test]
	fn messages_of_disabled_entities_are_not_recorded() {
		let mut markov = service();
		assert_eq!(markov.observe("ann", "hello"), Ingestion::Disabled);
		assert!(markov.store().load_model("ann").unwrap().is_none());
	}

	#[test]
	fn enabled_entity_learns_and_speaks() {
		let mut markov = service();
		markov.enable("ann").unwrap();
		assert_eq!(markov.observe("ann", "Hello, world!"), Ingestion::Recorded { tokens: 4 });
		assert_eq!(markov.generate_with("ann", &mut seeded()).unwrap(), "Hello, world!");
	}

	#[test]
	fn observations_accumulate() {
		let mut markov = service();
		markov.enable("ann").unwrap();
		markov.observe("ann", "hi");
		markov.observe("ann", "hi");
		let model = markov.store().load_model("ann").unwrap().unwrap();
		assert_eq!(model.weight(CONTROL, "hi"), 2);
	}

	#[test]
	fn invalid_mode_drops_the_message() {
		let mut store = MemoryStore::new();
		let broken = EntityConfig { enabled: true, token_mode: TokenMode::NGram(0), chain_depth: 1 };
		store.save_config("ann", &broken).unwrap();

		let mut markov = Markov::new(store, Settings::default());
		assert_eq!(markov.observe("ann", "hello"), Ingestion::Dropped);
		assert!(markov.store().load_model("ann").unwrap().is_none());
	}

	#[test]
	fn disable_forgets_the_chain() {
		let mut markov = service();
		markov.enable("ann").unwrap();
		markov.observe("ann", "hello");
		markov.disable("ann").unwrap();

		assert!(markov.store().load_model("ann").unwrap().is_none());
		assert!(matches!(
			markov.generate("ann"),
			Err(MarkovError::ModelAbsent { reason: AbsentReason::Disabled, .. })
		));
	}

	#[test]
	fn reset_keeps_settings() {
		let mut markov = service();
		markov.enable("ann").unwrap();
		markov.observe("ann", "hello");
		markov.reset("ann").unwrap();

		assert!(markov.config("ann").unwrap().enabled);
		assert!(matches!(
			markov.generate("ann"),
			Err(MarkovError::ModelAbsent { reason: AbsentReason::NoChain, .. })
		));
	}

	#[test]
	fn configure_advises_reset_and_keeps_chain() {
		let mut markov = service();
		markov.enable("ann").unwrap();
		markov.observe("ann", "one two three");

		let advisory = markov.configure("ann", None, Some(2)).unwrap();
		assert!(advisory.is_some());
		assert_eq!(markov.config("ann").unwrap().chain_depth, 2);
		assert!(markov.store().load_model("ann").unwrap().is_some());

		// The old depth-1 chain cannot be walked at depth 2
		assert!(matches!(
			markov.generate_with("ann", &mut seeded()),
			Err(MarkovError::ModelIncomplete { .. })
		));
	}

	#[test]
	fn enable_uses_default_shape_once() {
		let settings = Settings { default_mode: TokenMode::NGram(4), default_depth: 2, ..Settings::default() };
		let mut markov = Markov::new(MemoryStore::new(), settings);
		markov.enable("ann").unwrap();
		assert_eq!(markov.config("ann").unwrap().token_mode, TokenMode::NGram(4));

		markov.configure("ann", Some(TokenMode::Word), None).unwrap();
		markov.disable("ann").unwrap();
		markov.enable("ann").unwrap();
		let config = markov.config("ann").unwrap();
		assert_eq!(config.token_mode, TokenMode::Word);
		assert_eq!(config.chain_depth, 2);
	}

	#[test]
	fn scope_restrictions_gate_eligibility() {
		let mut markov = service();
		assert!(markov.is_eligible(None, None).unwrap());
		assert!(markov.is_eligible(Some("guild"), Some("general")).unwrap());

		markov.enable_channel("guild", "bots").unwrap();
		assert!(markov.is_eligible(Some("guild"), Some("bots")).unwrap());
		assert!(!markov.is_eligible(Some("guild"), Some("general")).unwrap());
		assert!(!markov.is_eligible(Some("guild"), None).unwrap());

		assert!(markov.disable_channel("guild", "bots").unwrap());
		assert!(!markov.is_eligible(Some("guild"), Some("bots")).unwrap());

		markov.clear_scope("guild").unwrap();
		assert!(markov.is_eligible(Some("guild"), Some("general")).unwrap());
	}

	#[test]
	fn command_messages_are_ignored() {
		let mut markov = service();
		markov.enable("ann").unwrap();
		assert_eq!(markov.observe("ann", "!markov @bob"), Ingestion::Ignored);
		assert_eq!(markov.observe("ann", " leading space"), Ingestion::Ignored);
		assert!(markov.store().load_model("ann").unwrap().is_none());

		assert_eq!(markov.observe("ann", "élan vital"), Ingestion::Recorded { tokens: 2 });
	}

	#[test]
	fn host_messages_are_ignored() {
		let settings = Settings { self_id: Some("markov-bot".to_owned()), ..Settings::default() };
		let mut markov = Markov::new(MemoryStore::new(), settings);
		markov.enable("markov-bot").unwrap();
		assert_eq!(markov.observe("markov-bot", "hello"), Ingestion::Ignored);
		assert!(markov.store().load_model("markov-bot").unwrap().is_none());
	}

	#[test]
	fn generation_is_silent_outside_observed_channels() {
		let mut markov = service();
		markov.enable("ann").unwrap();
		markov.observe("ann", "hello");
		markov.enable_channel("guild", "bots").unwrap();

		assert_eq!(markov.generate_in("ann", Some("guild"), Some("general"), &mut seeded()).unwrap(), None);
		assert_eq!(markov.generate_in("ann", Some("guild"), Some("bots"), &mut seeded()).unwrap().as_deref(), Some("hello"));
		assert_eq!(markov.generate_in("ann", None, None, &mut seeded()).unwrap().as_deref(), Some("hello"));
	}

	#[test]
	fn train_merges_a_corpus() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "hello there").unwrap();
		writeln!(file, "hello again").unwrap();

		let mut markov = service();
		assert!(markov.train("ann", file.path()).is_err());

		markov.enable("ann").unwrap();
		markov.observe("ann", "hello");
		markov.train("ann", file.path()).unwrap();

		let model = markov.store().load_model("ann").unwrap().unwrap();
		assert_eq!(model.weight(CONTROL, "hello"), 3);
		assert_eq!(model.successors("hello").unwrap().total(), 3);
	}
}
