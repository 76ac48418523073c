use std::collections::BTreeMap;

use rand::Rng;

use serde::{Deserialize, Serialize};


/// Successor distribution of one chain state.
///
/// Conceptually, this is a node in a Markov chain where outgoing edges
/// are weighted by their number of observations. The state key itself
/// lives in the owning [`TransitionModel`](super::chain::TransitionModel),
/// so a `State` serializes as a bare `{token: weight}` object.
///
/// ## Invariants
/// - The sum of the weights equals the number of times the state was current
///   during ingestion.
/// - Successors are kept ordered so a seeded random source always walks the
///   same way.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct State {
	/// Example: { "world" => 42, "there" => 3 }
	transitions: BTreeMap<String, u64>,
}

impl State {
	/// Creates a state with no recorded successor.
	pub fn new() -> Self {
		Self::default()
	}

	/// Records one more occurrence of `next`.
	pub fn add_transition(&mut self, next: &str) {
		let weight = self.transitions.entry(next.to_owned()).or_insert(0);
		*weight = weight.saturating_add(1);
	}

	/// Observed weight of `next`, 0 when never seen.
	pub fn weight(&self, next: &str) -> u64 {
		self.transitions.get(next).copied().unwrap_or(0)
	}

	/// Sum of all successor weights, saturating at `u64::MAX`.
	pub fn total(&self) -> u64 {
		self.transitions.values().fold(0u64, |sum, weight| sum.saturating_add(*weight))
	}

	/// Sum of all successor weights, `None` if it does not fit in a `u64`.
	///
	/// Only a foreign or corrupt document can get there.
	pub fn checked_total(&self) -> Option<u64> {
		self.transitions.values().try_fold(0u64, |sum, weight| sum.checked_add(*weight))
	}

	/// Number of distinct successors.
	pub fn len(&self) -> usize {
		self.transitions.len()
	}

	/// Returns `true` if no successor was recorded.
	pub fn is_empty(&self) -> bool {
		self.transitions.is_empty()
	}

	/// Successors and their weights, in token order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
		self.transitions.iter().map(|(token, weight)| (token.as_str(), *weight))
	}

	/// Draws a successor with probability proportional to its weight.
	///
	/// Performs an O(n) scan with cumulative subtraction. Zero weights (only
	/// possible in a hand-edited document) are never drawn.
	///
	/// Returns `None` if no successor has a positive weight, or if the weights
	/// overflow (the walk then reports the state as incomplete).
	pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&str> {
		let total = self.checked_total()?;
		if total == 0 {
			return None;
		}

		let mut r = rng.random_range(0..total);
		for (next, weight) in &self.transitions {
			if r < *weight {
				return Some(next.as_str());
			}
			r -= weight;
		}

		None
	}

	/// Adds every weight of `other` into this state.
	pub fn merge(&mut self, other: &Self) {
		for (next, weight) in &other.transitions {
			let existing = self.transitions.entry(next.clone()).or_insert(0);
			*existing = existing.saturating_add(*weight);
		}
	}
}
