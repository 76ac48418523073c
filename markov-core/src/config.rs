//! Configuration contract and workspace settings.
//!
//! - [`TokenMode`] and [`EntityConfig`] describe how one entity's chain is built.
//! - [`ScopeConfig`] optionally restricts which channels of a scope are observed.
//! - [`Settings`] is loaded from `markov.toml` (path overridable with `MARKOV_CONFIG`)
//!   and then patched by `MARKOV_DATA_DIR` / `MARKOV_BIND`.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::{env, fs};

use serde::{Deserialize, Serialize};

use crate::error::MarkovError;

/// N-gram length used when a mode is given as plain `ngram`.
pub const DEFAULT_NGRAM_LENGTH: usize = 3;

/// How raw text is cut into tokens.
///
/// Parsed once from its textual name (`word`, `ngram`, `ngram:4`, `ngram(4)`);
/// unknown names are a [`MarkovError::Configuration`], never a silent fallback.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(try_from = "String", into = "String")]
pub enum TokenMode {
	/// Alternating word runs and delimiter runs.
	#[default]
	Word,
	/// Fixed-length character slices.
	NGram(usize),
}

impl TokenMode {
	/// Builds an n-gram mode, rejecting a zero length.
	pub fn ngram(length: usize) -> Result<Self, MarkovError> {
		if length == 0 {
			return Err(MarkovError::Configuration("n-gram length must be >= 1".to_owned()));
		}
		Ok(TokenMode::NGram(length))
	}
}

impl fmt::Display for TokenMode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			TokenMode::Word => write!(f, "word"),
			TokenMode::NGram(length) => write!(f, "ngram:{length}"),
		}
	}
}

impl FromStr for TokenMode {
	type Err = MarkovError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let name = s.trim().to_ascii_lowercase();
		match name.as_str() {
			"word" => return Ok(TokenMode::Word),
			"ngram" => return Ok(TokenMode::NGram(DEFAULT_NGRAM_LENGTH)),
			_ => (),
		}

		let length = name
			.strip_prefix("ngram:")
			.or_else(|| name.strip_prefix("ngram(").and_then(|rest| rest.strip_suffix(')')));

		match length {
			Some(length) => {
				let n: usize = length.trim().parse().map_err(|_| {
					MarkovError::Configuration(format!("invalid n-gram length in token mode {:?}", s.trim()))
				})?;
				TokenMode::ngram(n)
			}
			None => Err(MarkovError::Configuration(format!("unknown token mode {:?}", s.trim()))),
		}
	}
}

impl TryFrom<String> for TokenMode {
	type Error = MarkovError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		value.parse()
	}
}

impl From<TokenMode> for String {
	fn from(mode: TokenMode) -> Self {
		mode.to_string()
	}
}

/// Per-entity modeling settings.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct EntityConfig {
	pub enabled: bool,
	pub token_mode: TokenMode,
	/// Context depth; anything below 1 behaves as 1.
	pub chain_depth: usize,
}

impl Default for EntityConfig {
	fn default() -> Self {
		Self { enabled: false, token_mode: TokenMode::Word, chain_depth: 1 }
	}
}

impl EntityConfig {
	/// Effective chain depth (always >= 1).
	pub fn depth(&self) -> usize {
		self.chain_depth.max(1)
	}

	/// Whether switching to `other` changes how states are keyed.
	pub fn is_compatible_with(&self, other: &EntityConfig) -> bool {
		self.token_mode == other.token_mode && self.depth() == other.depth()
	}
}

/// Channel restriction for one scope (a guild, a workspace...).
///
/// `None` means every channel of the scope is observed.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
#[serde(default)]
pub struct ScopeConfig {
	pub restricted_channels: Option<BTreeSet<String>>,
}

impl ScopeConfig {
	/// Returns `true` if messages from `channel` may be observed.
	pub fn allows(&self, channel: &str) -> bool {
		match &self.restricted_channels {
			None => true,
			Some(channels) => channels.contains(channel),
		}
	}

	/// Adds `channel` to the allowed set, turning the restriction on if needed.
	pub fn allow(&mut self, channel: &str) -> bool {
		self.restricted_channels.get_or_insert_with(BTreeSet::new).insert(channel.to_owned())
	}

	/// Removes `channel` from the allowed set.
	///
	/// An emptied set stays in place: the scope then observes nothing until
	/// [`ScopeConfig::clear`] lifts the restriction.
	pub fn deny(&mut self, channel: &str) -> bool {
		match &mut self.restricted_channels {
			Some(channels) => channels.remove(channel),
			None => false,
		}
	}

	/// Lifts the restriction: every channel is observed again.
	pub fn clear(&mut self) {
		self.restricted_channels = None;
	}
}

/// On-disk encoding used by the file store for chains.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreFormat {
	#[default]
	Json,
	Postcard,
}

/// Workspace settings, read from TOML.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Settings {
	/// Address the HTTP host binds to.
	pub bind: String,
	pub port: u16,
	/// Directory holding the file store.
	pub data_dir: PathBuf,
	pub store_format: StoreFormat,
	/// Total generation attempts before giving up on empty walks.
	pub max_attempts: usize,
	/// Longest walk, in tokens.
	pub max_tokens: usize,
	/// Longest reply, in characters (applied by the presentation layer).
	pub max_length: usize,
	/// Mode given to entities that enable modeling.
	pub default_mode: TokenMode,
	pub default_depth: usize,
	/// Identity of the host itself; its own messages are never observed.
	pub self_id: Option<String>,
}

impl Default for Settings {
	fn default() -> Self {
		Self {
			bind: "127.0.0.1".to_owned(),
			port: 5000,
			data_dir: PathBuf::from("./data"),
			store_format: StoreFormat::Json,
			max_attempts: 5,
			max_tokens: 1000,
			max_length: 2000,
			default_mode: TokenMode::Word,
			default_depth: 1,
			self_id: None,
		}
	}
}

impl Settings {
	/// Parses settings from a TOML document; missing keys take their defaults.
	pub fn from_toml_str(contents: &str) -> Result<Self, MarkovError> {
		Ok(toml::from_str(contents)?)
	}

	/// Loads settings from `path`, or from `MARKOV_CONFIG`, or from `./markov.toml`.
	///
	/// A missing file is not an error: defaults are used. Environment
	/// overrides are applied last.
	pub fn load(path: Option<&Path>) -> Result<Self, MarkovError> {
		let path = match path {
			Some(p) => p.to_path_buf(),
			None => env::var_os("MARKOV_CONFIG").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("markov.toml")),
		};

		let mut settings = if path.is_file() {
			log::info!("loading settings from {}", path.display());
			Self::from_toml_str(&fs::read_to_string(&path)?)?
		} else {
			log::info!("no settings file at {}, using defaults", path.display());
			Self::default()
		};

		if let Ok(dir) = env::var("MARKOV_DATA_DIR") {
			settings.data_dir = PathBuf::from(dir);
		}
		if let Ok(bind) = env::var("MARKOV_BIND") {
			settings.bind = bind;
		}

		Ok(settings)
	}

	/// Configuration handed to an entity the first time it enables modeling.
	pub fn entity_defaults(&self) -> EntityConfig {
		EntityConfig { enabled: true, token_mode: self.default_mode, chain_depth: self.default_depth.max(1) }
	}
}
