use rand::Rng;
use rand::rngs::ThreadRng;

use crate::config::TokenMode;
use crate::error::MarkovError;
use super::chain::{state_key, TransitionModel, CONTROL};
use super::generation_input::GenerationInput;
use super::spacing::needs_space;

/// Weighted random walk over a [`TransitionModel`].
///
/// # Responsibilities
/// - Walk from [`CONTROL`] until [`CONTROL`] is drawn again
/// - Rebuild state keys exactly the way the builder recorded them
/// - Reinsert spaces between word tokens for presentation
/// - Retry empty walks a bounded number of times
///
/// The random source is injected so walks can be replayed with a seeded RNG.
#[derive(Debug)]
pub struct Generator<R: Rng = ThreadRng> {
	rng: R,
}

impl Generator<ThreadRng> {
	/// Creates a generator backed by the thread-local RNG.
	pub fn new() -> Self {
		Self { rng: rand::rng() }
	}
}

impl Default for Generator<ThreadRng> {
	fn default() -> Self {
		Self::new()
	}
}

impl<R: Rng> Generator<R> {
	/// Creates a generator drawing from `rng` (a seeded one replays walks).
	pub fn with_rng(rng: R) -> Self {
		Self { rng }
	}

	/// Performs a single walk.
	///
	/// # Returns
	/// - `Ok(String)`: the generated text, possibly empty if [`CONTROL`] was
	///   drawn first.
	///
	/// # Errors
	/// - [`MarkovError::ModelIncomplete`] if the walk reaches a state without
	///   recorded successors (depth or mode changed since ingestion, or a
	///   foreign model).
	///
	/// # Notes
	/// - The walk stops after `max_tokens` tokens and keeps what it has.
	/// - Spacing is only applied in word mode; n-gram tokens carry their own.
	pub fn walk(&mut self, model: &TransitionModel, input: &GenerationInput) -> Result<String, MarkovError> {
		let mut produced: Vec<String> = Vec::new();
		let mut text = String::new();
		let mut state = CONTROL.to_owned();

		loop {
			if produced.len() >= input.max_tokens() {
				log::debug!("walk stopped after {} tokens", produced.len());
				break;
			}

			let next = model
				.successors(&state)
				.and_then(|successors| successors.draw(&mut self.rng))
				.ok_or_else(|| MarkovError::ModelIncomplete { state: state.clone() })?;

			if next == CONTROL {
				break;
			}

			if input.mode() == TokenMode::Word && needs_space(produced.last().map(String::as_str), next) {
				text.push(' ');
			}
			text.push_str(next);
			produced.push(next.to_owned());

			state = state_key(&produced, input.depth());
		}

		Ok(text)
	}

	/// Generates text, retrying walks that came back empty.
	///
	/// # Errors
	/// - [`MarkovError::EmptyGeneration`] if all `max_attempts` walks were empty.
	/// - Any error of [`Generator::walk`], surfaced immediately.
	pub fn generate(&mut self, model: &TransitionModel, input: &GenerationInput) -> Result<String, MarkovError> {
		let attempts = input.max_attempts();
		for attempt in 1..=attempts {
			let text = self.walk(model, input)?;
			if !text.is_empty() {
				return Ok(text);
			}
			log::debug!("attempt {attempt}/{attempts} produced an empty walk");
		}

		Err(MarkovError::EmptyGeneration { attempts })
	}
}
