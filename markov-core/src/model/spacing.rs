//! Word-mode spacing heuristic.
//!
//! Word tokens are stored without the whitespace that separated them, so the
//! generator guesses where spaces go. This only affects presentation: chain
//! states never contain these spaces.

/// Characters after which no space is inserted (opening brackets, quotes, hyphens...).
const NO_SPACE_AFTER: &str = "\"([{'/-";

/// Punctuation that is preceded by a space even though it is not alphanumeric.
const OPENS_WITH_SPACE: &str = "\"([{|";

fn made_of(token: &str, set: &str) -> bool {
	!token.is_empty() && token.chars().all(|c| set.contains(c))
}

/// Decides whether a space goes between `previous` and `next`.
///
/// `previous` is `None` at the start of a walk.
pub fn needs_space(previous: Option<&str>, next: &str) -> bool {
	let Some(previous) = previous else {
		return false;
	};
	if made_of(previous, NO_SPACE_AFTER) {
		return false;
	}
	next.chars().next().is_some_and(char::is_alphanumeric) || made_of(next, OPENS_WITH_SPACE)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn no_space_at_start() {
		assert!(!needs_space(None, "Hello"));
	}

	#[test]
	fn words_are_separated() {
		assert!(needs_space(Some("Hello"), "world"));
		assert!(needs_space(Some(","), "world"));
	}

	#[test]
	fn closing_punctuation_sticks_to_previous_word() {
		assert!(!needs_space(Some("Hello"), ","));
		assert!(!needs_space(Some("world"), "!"));
		assert!(!needs_space(Some("world"), ")"));
	}

	#[test]
	fn opening_punctuation_gets_a_space() {
		assert!(needs_space(Some("said"), "\""));
		assert!(needs_space(Some("see"), "("));
		assert!(needs_space(Some("a"), "|"));
	}

	#[test]
	fn nothing_follows_opening_punctuation_with_a_space() {
		assert!(!needs_space(Some("("), "see"));
		assert!(!needs_space(Some("'"), "t"));
		assert!(!needs_space(Some("-"), "based"));
		assert!(!needs_space(Some("(\""), "quote"));
	}
}
