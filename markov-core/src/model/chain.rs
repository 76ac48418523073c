use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::state::State;

/// Start and end marker of every walk.
///
/// It contains backticks, which the tokenizer strips from all input, so it
/// can never equal a token or a concatenation of tokens.
pub const CONTROL: &str = "`markov:120325977862006`";

/// Builds the state key reached after `tokens`: the concatenation of the last
/// `min(tokens.len(), depth)` tokens, or [`CONTROL`] when `tokens` is empty.
///
/// Both the builder and the generator derive keys through this function,
/// which is what lets a walk find the states ingestion recorded.
pub fn state_key<S: AsRef<str>>(tokens: &[S], depth: usize) -> String {
	if tokens.is_empty() {
		return CONTROL.to_owned();
	}
	let start = tokens.len().saturating_sub(depth.max(1));
	tokens[start..].iter().map(AsRef::as_ref).collect()
}

/// Weighted token-transition model of one entity.
///
/// Serializes as exactly `{state: {token: weight}}`, which is the persisted
/// document format.
///
/// # Invariants
/// - For every state, the sum of its successor weights equals the number of
///   times that state was current during ingestion.
/// - Every non-control state is a suffix (at most `depth` tokens) of some
///   ingested token sequence, concatenated without separators.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct TransitionModel {
	states: HashMap<String, State>,
}

impl TransitionModel {
	/// Creates an empty model (nothing ingested yet).
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns `true` if no state was ever recorded.
	pub fn is_empty(&self) -> bool {
		self.states.is_empty()
	}

	/// Number of distinct states.
	pub fn len(&self) -> usize {
		self.states.len()
	}

	/// Successor distribution of `state`, if it was ever recorded.
	pub fn successors(&self, state: &str) -> Option<&State> {
		self.states.get(state)
	}

	/// Increments `model[state][next]`, creating missing entries.
	pub fn record(&mut self, state: &str, next: &str) {
		self.states.entry(state.to_owned()).or_default().add_transition(next);
	}

	/// Weight of the `state -> next` transition, 0 when absent.
	pub fn weight(&self, state: &str, next: &str) -> u64 {
		self.states.get(state).map_or(0, |s| s.weight(next))
	}

	/// Every recorded state with its successors, in no particular order.
	pub fn states(&self) -> impl Iterator<Item = (&str, &State)> {
		self.states.iter().map(|(key, state)| (key.as_str(), state))
	}

	/// Merges another model into this one; weights of matching transitions are summed.
	///
	/// Ingestion is additive, so merging partial models built from disjoint
	/// inputs gives the same model as ingesting everything sequentially.
	pub fn merge(&mut self, other: &Self) {
		for (key, state) in &other.states {
			if let Some(existing) = self.states.get_mut(key) {
				existing.merge(state);
			} else {
				self.states.insert(key.clone(), state.clone());
			}
		}
	}

	/// Parses a persisted JSON document.
	pub fn from_json(document: &str) -> Result<Self, serde_json::Error> {
		serde_json::from_str(document)
	}

	/// Renders the persisted JSON document.
	pub fn to_json(&self) -> Result<String, serde_json::Error> {
		serde_json::to_string(self)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn state_key_uses_last_depth_tokens() {
		let tokens = ["a", "b", "c"];
		assert_eq!(state_key(&tokens[..0], 2), CONTROL);
		assert_eq!(state_key(&tokens[..1], 2), "a");
		assert_eq!(state_key(&tokens[..], 2), "bc");
		assert_eq!(state_key(&tokens[..], 5), "abc");
		assert_eq!(state_key(&tokens[..], 0), "c");
	}

	#[test]
	fn control_cannot_come_from_text() {
		let tokens = crate::model::tokenizer::tokenize(CONTROL, crate::config::TokenMode::Word).unwrap();
		assert!(!tokens.iter().any(|t| t == CONTROL || t.contains('`')));
	}

	#[test]
	fn persisted_shape_is_map_of_maps() {
		let mut model = TransitionModel::new();
		model.record(CONTROL, "hello");
		model.record("hello", CONTROL);

		let value: serde_json::Value = serde_json::from_str(&model.to_json().unwrap()).unwrap();
		assert_eq!(value[CONTROL]["hello"], 1);
		assert_eq!(value["hello"][CONTROL], 1);

		let parsed = TransitionModel::from_json(&model.to_json().unwrap()).unwrap();
		assert_eq!(parsed, model);
	}

	#[test]
	fn merge_adds_and_inserts_states() {
		let mut left = TransitionModel::new();
		left.record(CONTROL, "a");
		let mut right = TransitionModel::new();
		right.record(CONTROL, "a");
		right.record("a", CONTROL);

		left.merge(&right);
		assert_eq!(left.weight(CONTROL, "a"), 2);
		assert_eq!(left.weight("a", CONTROL), 1);
		assert_eq!(left.len(), 2);
	}
}
