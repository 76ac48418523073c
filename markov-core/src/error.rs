//! Error taxonomy shared by the tokenizer, builder, generator and stores.

use thiserror::Error;

/// Why an entity has nothing to generate from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbsentReason {
	/// The entity never enabled modeling, or turned it off.
	Disabled,
	/// Modeling is enabled but nothing has been ingested yet (or it was reset).
	NoChain,
}

/// Everything that can go wrong while building, walking or storing a chain.
#[derive(Debug, Error)]
pub enum MarkovError {
	/// Unrecognized token mode or an invalid mode parameter.
	#[error("configuration error: {0}")]
	Configuration(String),

	/// The walk reached a state the model never recorded.
	///
	/// Usually the chain depth or token mode changed since ingestion.
	#[error("model incomplete: no successors recorded for state {state:?}")]
	ModelIncomplete { state: String },

	/// Every attempt drew the end marker first.
	#[error("empty generation after {attempts} attempts")]
	EmptyGeneration { attempts: usize },

	#[error("no chain available for {entity} ({reason:?})")]
	ModelAbsent { entity: String, reason: AbsentReason },

	#[error("storage error: {0}")]
	Storage(String),

	#[error("io error: {0}")]
	Io(#[from] std::io::Error),

	#[error("json error: {0}")]
	Json(#[from] serde_json::Error),

	#[error("postcard error: {0}")]
	Postcard(#[from] postcard::Error),

	#[error("toml error: {0}")]
	Toml(#[from] toml::de::Error),
}

impl MarkovError {
	/// Renders the error as a sentence fit for the person who asked for a generation.
	///
	/// Internal details (paths, parser messages) are never included.
	pub fn user_message(&self, entity: &str) -> String {
		match self {
			MarkovError::ModelAbsent { reason: AbsentReason::Disabled, .. } => {
				format!("Sorry, {entity} won't let me model their speech")
			}
			MarkovError::ModelAbsent { reason: AbsentReason::NoChain, .. } => {
				format!("Sorry, I do not have a markov chain for {entity}")
			}
			MarkovError::EmptyGeneration { .. } => {
				format!("Sorry, the chain for {entity} only ever says nothing")
			}
			MarkovError::ModelIncomplete { .. } => format!(
				"Sorry, the chain for {entity} does not match its settings, it should be reset"
			),
			MarkovError::Configuration(_) => {
				format!("Sorry, the markov settings for {entity} are invalid")
			}
			_ => "Sorry, something went wrong while reading the markov chain".to_owned(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn configuration_error_names_the_mode() {
		let e = MarkovError::Configuration("unknown token mode \"frobnicate\"".into());
		assert!(e.to_string().contains("frobnicate"));
	}

	#[test]
	fn user_message_distinguishes_absent_reasons() {
		let disabled = MarkovError::ModelAbsent { entity: "ann".into(), reason: AbsentReason::Disabled };
		let missing = MarkovError::ModelAbsent { entity: "ann".into(), reason: AbsentReason::NoChain };
		assert!(disabled.user_message("ann").contains("won't let me"));
		assert!(missing.user_message("ann").contains("do not have"));
	}

	#[test]
	fn user_message_hides_storage_details() {
		let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "/secret/path.json");
		let e: MarkovError = io_err.into();
		assert!(e.to_string().contains("io error"));
		assert!(!e.user_message("ann").contains("/secret"));
	}
}
