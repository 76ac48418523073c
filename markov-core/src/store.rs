//! Persistence of chains, entity settings and scope restrictions.
//!
//! The core never calls a store on its own: callers load, fold or walk, then
//! save. [`MemoryStore`] keeps everything in maps; [`FileStore`] keeps one
//! small document per entity and per scope in a directory.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{EntityConfig, ScopeConfig, StoreFormat};
use crate::error::MarkovError;
use crate::io::{list_stems, remove_if_exists, write_replace};
use crate::model::chain::TransitionModel;
use crate::model::entity::EntityChain;

const CONFIG_SUFFIX: &str = ".config.json";
const SCOPE_SUFFIX: &str = ".scope.json";

/// Prefix of file stems holding a hex-encoded identifier.
const ENCODED_PREFIX: char = '~';

/// Storage contract used around every read-modify-write cycle.
pub trait ChainStore {
	fn load_config(&self, entity: &str) -> Result<Option<EntityConfig>, MarkovError>;

	fn save_config(&mut self, entity: &str, config: &EntityConfig) -> Result<(), MarkovError>;

	fn load_model(&self, entity: &str) -> Result<Option<TransitionModel>, MarkovError>;

	fn save_model(&mut self, entity: &str, model: &TransitionModel) -> Result<(), MarkovError>;

	fn delete_model(&mut self, entity: &str) -> Result<(), MarkovError>;

	/// Restriction of `scope`; an unknown scope is unrestricted.
	fn load_scope(&self, scope: &str) -> Result<ScopeConfig, MarkovError>;

	fn save_scope(&mut self, scope: &str, config: &ScopeConfig) -> Result<(), MarkovError>;

	/// Every entity with stored settings.
	fn entities(&self) -> Result<Vec<String>, MarkovError>;

	/// Loads settings and chain together; unknown entities get default settings.
	fn load_chain(&self, entity: &str) -> Result<EntityChain, MarkovError> {
		let config = self.load_config(entity)?.unwrap_or_default();
		let model = self.load_model(entity)?;
		Ok(EntityChain::new(entity, config, model))
	}

	/// Saves settings and chain; a chain of `None` removes the stored one.
	fn save_chain(&mut self, chain: &EntityChain) -> Result<(), MarkovError> {
		self.save_config(&chain.entity, &chain.config)?;
		match &chain.model {
			Some(model) => self.save_model(&chain.entity, model),
			None => self.delete_model(&chain.entity),
		}
	}
}

/// In-memory store.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
	configs: HashMap<String, EntityConfig>,
	models: HashMap<String, TransitionModel>,
	scopes: HashMap<String, ScopeConfig>,
}

impl MemoryStore {
	/// Creates an empty store.
	pub fn new() -> Self {
		Self::default()
	}
}

impl ChainStore for MemoryStore {
	fn load_config(&self, entity: &str) -> Result<Option<EntityConfig>, MarkovError> {
		Ok(self.configs.get(entity).cloned())
	}

	fn save_config(&mut self, entity: &str, config: &EntityConfig) -> Result<(), MarkovError> {
		self.configs.insert(entity.to_owned(), config.clone());
		Ok(())
	}

	fn load_model(&self, entity: &str) -> Result<Option<TransitionModel>, MarkovError> {
		Ok(self.models.get(entity).cloned())
	}

	fn save_model(&mut self, entity: &str, model: &TransitionModel) -> Result<(), MarkovError> {
		self.models.insert(entity.to_owned(), model.clone());
		Ok(())
	}

	fn delete_model(&mut self, entity: &str) -> Result<(), MarkovError> {
		self.models.remove(entity);
		Ok(())
	}

	fn load_scope(&self, scope: &str) -> Result<ScopeConfig, MarkovError> {
		Ok(self.scopes.get(scope).cloned().unwrap_or_default())
	}

	fn save_scope(&mut self, scope: &str, config: &ScopeConfig) -> Result<(), MarkovError> {
		self.scopes.insert(scope.to_owned(), config.clone());
		Ok(())
	}

	fn entities(&self) -> Result<Vec<String>, MarkovError> {
		let mut entities: Vec<String> = self.configs.keys().cloned().collect();
		entities.sort();
		Ok(entities)
	}
}

/// Directory-backed store.
///
/// Layout:
/// - `<entity>.config.json`: [`EntityConfig`]
/// - `<entity>.chain.json` or `<entity>.chain.bin` (postcard): [`TransitionModel`]
/// - `<scope>.scope.json`: [`ScopeConfig`]
///
/// Chains are read in either encoding and written in the configured one.
/// Every write replaces the whole file through a rename.
#[derive(Debug, Clone)]
pub struct FileStore {
	root: PathBuf,
	format: StoreFormat,
}

impl FileStore {
	/// Opens (and creates if needed) a store rooted at `root`.
	pub fn open<P: AsRef<Path>>(root: P, format: StoreFormat) -> Result<Self, MarkovError> {
		let root = root.as_ref().to_path_buf();
		fs::create_dir_all(&root)?;
		Ok(Self { root, format })
	}

	/// Directory holding the documents.
	pub fn root(&self) -> &Path {
		&self.root
	}

	/// Maps an identifier to its file name.
	///
	/// `[A-Za-z0-9_-]` identifiers are used as they are; any other one
	/// (`ann.b`, `../etc`, non-ASCII names) is stored as `~` followed by the
	/// hex of its UTF-8 bytes, so it can neither escape the directory nor
	/// collide with a plain one.
	fn path(&self, id: &str, suffix: &str) -> Result<PathBuf, MarkovError> {
		if id.is_empty() {
			return Err(MarkovError::Storage("empty identifier".to_owned()));
		}
		let plain = id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
		let stem = if plain { id.to_owned() } else { format!("{ENCODED_PREFIX}{}", hex::encode(id)) };
		Ok(self.root.join(format!("{stem}{suffix}")))
	}

	/// Inverse of the naming in [`FileStore::path`]; `None` for foreign files.
	fn identifier(stem: &str) -> Option<String> {
		match stem.strip_prefix(ENCODED_PREFIX) {
			None => Some(stem.to_owned()),
			Some(encoded) => String::from_utf8(hex::decode(encoded).ok()?).ok(),
		}
	}

	fn chain_suffix(format: StoreFormat) -> &'static str {
		match format {
			StoreFormat::Json => ".chain.json",
			StoreFormat::Postcard => ".chain.bin",
		}
	}

	fn other_format(&self) -> StoreFormat {
		match self.format {
			StoreFormat::Json => StoreFormat::Postcard,
			StoreFormat::Postcard => StoreFormat::Json,
		}
	}

	fn read_model(path: &Path, format: StoreFormat) -> Result<Option<TransitionModel>, MarkovError> {
		if !path.is_file() {
			return Ok(None);
		}
		let bytes = fs::read(path)?;
		let model = match format {
			StoreFormat::Json => serde_json::from_slice(&bytes)?,
			StoreFormat::Postcard => postcard::from_bytes(&bytes)?,
		};
		Ok(Some(model))
	}

	fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>, MarkovError> {
		if !path.is_file() {
			return Ok(None);
		}
		Ok(Some(serde_json::from_slice(&fs::read(path)?)?))
	}
}

impl ChainStore for FileStore {
	fn load_config(&self, entity: &str) -> Result<Option<EntityConfig>, MarkovError> {
		Self::read_json(&self.path(entity, CONFIG_SUFFIX)?)
	}

	fn save_config(&mut self, entity: &str, config: &EntityConfig) -> Result<(), MarkovError> {
		let path = self.path(entity, CONFIG_SUFFIX)?;
		write_replace(path, &serde_json::to_vec_pretty(config)?)?;
		Ok(())
	}

	fn load_model(&self, entity: &str) -> Result<Option<TransitionModel>, MarkovError> {
		let preferred = self.path(entity, Self::chain_suffix(self.format))?;
		if let Some(model) = Self::read_model(&preferred, self.format)? {
			return Ok(Some(model));
		}
		let other = self.other_format();
		Self::read_model(&self.path(entity, Self::chain_suffix(other))?, other)
	}

	fn save_model(&mut self, entity: &str, model: &TransitionModel) -> Result<(), MarkovError> {
		let bytes = match self.format {
			StoreFormat::Json => serde_json::to_vec(model)?,
			StoreFormat::Postcard => postcard::to_stdvec(model)?,
		};
		write_replace(self.path(entity, Self::chain_suffix(self.format))?, &bytes)?;
		remove_if_exists(self.path(entity, Self::chain_suffix(self.other_format()))?)?;
		log::debug!("saved chain of {entity} ({} states)", model.len());
		Ok(())
	}

	fn delete_model(&mut self, entity: &str) -> Result<(), MarkovError> {
		remove_if_exists(self.path(entity, Self::chain_suffix(StoreFormat::Json))?)?;
		remove_if_exists(self.path(entity, Self::chain_suffix(StoreFormat::Postcard))?)?;
		Ok(())
	}

	fn load_scope(&self, scope: &str) -> Result<ScopeConfig, MarkovError> {
		Ok(Self::read_json(&self.path(scope, SCOPE_SUFFIX)?)?.unwrap_or_default())
	}

	fn save_scope(&mut self, scope: &str, config: &ScopeConfig) -> Result<(), MarkovError> {
		let path = self.path(scope, SCOPE_SUFFIX)?;
		write_replace(path, &serde_json::to_vec_pretty(config)?)?;
		Ok(())
	}

	fn entities(&self) -> Result<Vec<String>, MarkovError> {
		let mut entities: Vec<String> = list_stems(&self.root, CONFIG_SUFFIX)?
			.iter()
			.filter_map(|stem| Self::identifier(stem))
			.collect();
		entities.sort();
		Ok(entities)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::TokenMode;
	use crate::model::chain::CONTROL;

	fn sample_model() -> TransitionModel {
		let mut model = TransitionModel::new();
		model.record(CONTROL, "hi");
		model.record("hi", CONTROL);
		model
	}

	fn exercise(store: &mut dyn ChainStore) {
		assert!(store.load_config("ann").unwrap().is_none());
		assert!(store.load_model("ann").unwrap().is_none());

		let config = EntityConfig { enabled: true, token_mode: TokenMode::NGram(2), chain_depth: 3 };
		store.save_config("ann", &config).unwrap();
		store.save_model("ann", &sample_model()).unwrap();

		let chain = store.load_chain("ann").unwrap();
		assert_eq!(chain.config, config);
		assert_eq!(chain.model, Some(sample_model()));

		store.delete_model("ann").unwrap();
		assert!(store.load_model("ann").unwrap().is_none());
		assert_eq!(store.entities().unwrap(), vec!["ann"]);

		let mut scope = store.load_scope("guild").unwrap();
		assert!(scope.allows("general"));
		scope.allow("bots");
		store.save_scope("guild", &scope).unwrap();
		assert!(!store.load_scope("guild").unwrap().allows("general"));
	}

	#[test]
	fn memory_store_contract() {
		exercise(&mut MemoryStore::new());
	}

	#[test]
	fn file_store_contract_json() {
		let dir = tempfile::tempdir().unwrap();
		exercise(&mut FileStore::open(dir.path(), StoreFormat::Json).unwrap());
	}

	#[test]
	fn file_store_contract_postcard() {
		let dir = tempfile::tempdir().unwrap();
		exercise(&mut FileStore::open(dir.path(), StoreFormat::Postcard).unwrap());
	}

	#[test]
	fn chain_document_is_plain_json() {
		let dir = tempfile::tempdir().unwrap();
		let mut store = FileStore::open(dir.path(), StoreFormat::Json).unwrap();
		store.save_model("ann", &sample_model()).unwrap();

		let raw = fs::read_to_string(dir.path().join("ann.chain.json")).unwrap();
		let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
		assert_eq!(value["hi"][CONTROL], 1);
	}

	#[test]
	fn switching_format_reads_the_old_file_and_replaces_it() {
		let dir = tempfile::tempdir().unwrap();
		FileStore::open(dir.path(), StoreFormat::Json).unwrap().save_model("ann", &sample_model()).unwrap();

		let mut store = FileStore::open(dir.path(), StoreFormat::Postcard).unwrap();
		let model = store.load_model("ann").unwrap().unwrap();
		assert_eq!(model, sample_model());

		store.save_model("ann", &model).unwrap();
		assert!(dir.path().join("ann.chain.bin").is_file());
		assert!(!dir.path().join("ann.chain.json").exists());
	}

	#[test]
	fn empty_identifier_is_rejected() {
		let dir = tempfile::tempdir().unwrap();
		let store = FileStore::open(dir.path(), StoreFormat::Json).unwrap();
		assert!(matches!(store.load_scope(""), Err(MarkovError::Storage(_))));
	}

	#[test]
	fn unusual_identifiers_are_encoded() {
		let dir = tempfile::tempdir().unwrap();
		let mut store = FileStore::open(dir.path(), StoreFormat::Json).unwrap();
		let config = EntityConfig { enabled: true, ..EntityConfig::default() };

		for id in ["ann.b", "../etc", "zoë"] {
			store.save_config(id, &config).unwrap();
			store.save_model(id, &sample_model()).unwrap();
			assert_eq!(store.load_chain(id).unwrap().model, Some(sample_model()));
		}
		store.save_config("bob", &config).unwrap();

		assert!(dir.path().join("~616e6e2e62.config.json").is_file());
		assert!(!dir.path().join("ann.b.config.json").exists());
		assert!(!dir.path().parent().unwrap().join("etc.config.json").exists());
		assert_eq!(store.entities().unwrap(), vec!["../etc", "ann.b", "bob", "zoë"]);
	}
}
