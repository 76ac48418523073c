use crate::config::TokenMode;
use crate::error::MarkovError;

/// Word characters: a run of these forms a word token.
///
/// Apostrophes are not word characters, so `don't` yields `don`, `'`, `t`.
fn is_word_char(c: char) -> bool {
	c.is_alphanumeric() || c == '_'
}

/// Removes code formatting (backticks) and outer whitespace.
fn preprocess(text: &str) -> String {
	let stripped: String = text.chars().filter(|c| *c != '`').collect();
	stripped.trim().to_owned()
}

/// Splits raw text into tokens according to `mode`.
///
/// # Behavior
/// - Backticks are removed and outer whitespace stripped first.
/// - `Word`: alternating word runs and delimiter runs, each trimmed; empty
///   or whitespace-only pieces are dropped.
/// - `NGram(n)`: consecutive slices of `n` characters; a shorter remainder
///   is kept as the last token.
///
/// # Errors
/// Returns [`MarkovError::Configuration`] for `NGram(0)`.
pub fn tokenize(text: &str, mode: TokenMode) -> Result<Vec<String>, MarkovError> {
	let text = preprocess(text);
	match mode {
		TokenMode::Word => Ok(split_words(&text)),
		TokenMode::NGram(0) => Err(MarkovError::Configuration("n-gram length must be >= 1".to_owned())),
		TokenMode::NGram(length) => Ok(split_ngrams(&text, length)),
	}
}

/// Same as [`tokenize`] with a textual mode name (`"word"`, `"ngram:3"`...).
pub fn tokenize_named(text: &str, mode: &str) -> Result<Vec<String>, MarkovError> {
	tokenize(text, mode.parse()?)
}

fn split_words(text: &str) -> Vec<String> {
	let mut tokens = Vec::new();
	let mut run = String::new();
	let mut run_is_word = None;

	for c in text.chars() {
		let word = is_word_char(c);
		if run_is_word.is_some_and(|previous| previous != word) {
			push_trimmed(&mut tokens, &run);
			run.clear();
		}
		run.push(c);
		run_is_word = Some(word);
	}
	push_trimmed(&mut tokens, &run);

	tokens
}

fn push_trimmed(tokens: &mut Vec<String>, run: &str) {
	let piece = run.trim();
	if !piece.is_empty() {
		tokens.push(piece.to_owned());
	}
}

fn split_ngrams(text: &str, length: usize) -> Vec<String> {
	let chars: Vec<char> = text.chars().collect();
	chars.chunks(length).map(|chunk| chunk.iter().collect()).collect()
}
