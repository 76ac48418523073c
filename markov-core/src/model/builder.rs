use std::path::Path;
use std::sync::mpsc;
use std::thread;

use crate::config::TokenMode;
use crate::error::MarkovError;
use crate::io::read_file;
use super::chain::{state_key, TransitionModel, CONTROL};
use super::tokenizer::tokenize;

/// Folds token sequences into a [`TransitionModel`] with a sliding context window.
///
/// # Responsibilities
/// - Record one transition per token, keyed by the state of the previous
///   `depth` tokens
/// - Record the final transition to [`CONTROL`]
/// - Build large corpora in parallel partial models and merge them
///
/// The builder never persists anything: the caller owns the read-modify-write
/// cycle around it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChainBuilder {
	depth: usize,
}

impl ChainBuilder {
	/// Creates a builder; a depth below 1 is treated as 1.
	pub fn new(depth: usize) -> Self {
		Self { depth: depth.max(1) }
	}

	/// Context depth (always >= 1).
	pub fn depth(&self) -> usize {
		self.depth
	}

	/// Returns `model` with `tokens` folded in.
	///
	/// An empty sequence records a single `CONTROL -> CONTROL` transition.
	pub fn ingest(&self, mut model: TransitionModel, tokens: &[String]) -> TransitionModel {
		self.ingest_into(&mut model, tokens);
		model
	}

	/// In-place form of [`ChainBuilder::ingest`].
	pub fn ingest_into(&self, model: &mut TransitionModel, tokens: &[String]) {
		let mut state = CONTROL.to_owned();
		for (i, token) in tokens.iter().enumerate() {
			model.record(&state, token);
			state = state_key(&tokens[..=i], self.depth);
		}
		model.record(&state, CONTROL);
	}

	/// Tokenizes `text` with `mode` and folds it into `model`.
	///
	/// All-or-nothing: `model` is only touched once tokenizing succeeded.
	/// Returns the number of tokens folded.
	pub fn ingest_text(&self, model: &mut TransitionModel, text: &str, mode: TokenMode) -> Result<usize, MarkovError> {
		let tokens = tokenize(text, mode)?;
		log::debug!("folding {} tokens at depth {}", tokens.len(), self.depth);
		self.ingest_into(model, &tokens);
		Ok(tokens.len())
	}

	/// Builds a model from every line of a text file.
	///
	/// # Behavior
	/// - Splits lines into chunks (CPU cores * factor).
	/// - Spawns one thread per chunk building a partial model.
	/// - Merges the partial models into the result.
	///
	/// Blank lines are skipped; each other line counts as one message.
	pub fn build_from_file<P: AsRef<Path>>(&self, filename: P, mode: TokenMode) -> Result<TransitionModel, MarkovError> {
		// Validate once before spawning anything
		tokenize("", mode)?;

		let lines: Vec<String> = read_file(&filename)?
			.into_iter()
			.filter(|line| !line.trim().is_empty())
			.collect();
		if lines.is_empty() {
			return Ok(TransitionModel::new());
		}

		let cpus = num_cpus::get();
		let factor = 8;
		let chunks = cpus * factor;
		let chunk_size = lines.len().div_ceil(chunks);

		let (tx, rx) = mpsc::channel();
		for chunk in lines.chunks(chunk_size) {
			let tx = tx.clone();
			let chunk: Vec<String> = chunk.to_vec();
			let builder = *self;

			thread::spawn(move || {
				let mut partial = TransitionModel::new();
				for line in chunk {
					// The mode was validated above, so tokenizing cannot fail here
					if let Ok(tokens) = tokenize(&line, mode) {
						builder.ingest_into(&mut partial, &tokens);
					}
				}
				// The receiver outlives every sender
				let _ = tx.send(partial);
			});
		}
		drop(tx);

		let mut model = TransitionModel::new();
		for partial in rx.iter() {
			model.merge(&partial);
		}
		log::info!("built {} states from {} lines of {}", model.len(), lines.len(), filename.as_ref().display());

		Ok(model)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	fn tokens(words: &[&str]) -> Vec<String> {
		words.iter().map(|w| (*w).to_owned()).collect()
	}

	#[test]
	fn depth_one_chains_single_tokens() {
		let model = ChainBuilder::new(1).ingest(TransitionModel::new(), &tokens(&["Hello", ",", "world", "!"]));
		assert_eq!(model.weight(CONTROL, "Hello"), 1);
		assert_eq!(model.weight("Hello", ","), 1);
		assert_eq!(model.weight(",", "world"), 1);
		assert_eq!(model.weight("world", "!"), 1);
		assert_eq!(model.weight("!", CONTROL), 1);
		assert_eq!(model.len(), 5);
	}

	#[test]
	fn depth_two_concatenates_window() {
		let model = ChainBuilder::new(2).ingest(TransitionModel::new(), &tokens(&["a", "b", "c"]));
		assert_eq!(model.weight(CONTROL, "a"), 1);
		assert_eq!(model.weight("a", "b"), 1);
		assert_eq!(model.weight("ab", "c"), 1);
		assert_eq!(model.weight("bc", CONTROL), 1);
	}

	#[test]
	fn zero_depth_is_treated_as_one() {
		assert_eq!(ChainBuilder::new(0).depth(), 1);
	}

	#[test]
	fn empty_sequence_records_control_loop() {
		let model = ChainBuilder::new(3).ingest(TransitionModel::new(), &[]);
		assert_eq!(model.weight(CONTROL, CONTROL), 1);
		assert_eq!(model.len(), 1);
	}

	#[test]
	fn ingest_text_rejects_invalid_mode() {
		let mut model = TransitionModel::new();
		let result = ChainBuilder::new(1).ingest_text(&mut model, "abc", TokenMode::NGram(0));
		assert!(matches!(result, Err(MarkovError::Configuration(_))));
		assert!(model.is_empty());
	}

	#[test]
	fn build_from_file_matches_sequential_ingestion() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		let lines = ["the cat sat", "", "the dog sat down", "a cat, a dog"];
		for line in lines {
			writeln!(file, "{line}").unwrap();
		}

		let builder = ChainBuilder::new(2);
		let parallel = builder.build_from_file(file.path(), TokenMode::Word).unwrap();

		let mut sequential = TransitionModel::new();
		for line in lines.iter().filter(|l| !l.is_empty()) {
			builder.ingest_text(&mut sequential, line, TokenMode::Word).unwrap();
		}
		assert_eq!(parallel, sequential);
	}
}
