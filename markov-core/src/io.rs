use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::{fs, io};

/// Reads a text file and returns all its lines as a `Vec<String>`.
///
/// - Reads the entire file into memory
/// - Splits on `\n` / `\r\n`
pub(crate) fn read_file<P: AsRef<Path>>(filename: P) -> io::Result<Vec<String>> {
	let mut contents = String::new();
	File::open(filename)?.read_to_string(&mut contents)?;
	Ok(contents.lines().map(str::to_owned).collect())
}

/// Writes `bytes` to `path` through a temporary sibling and a rename.
///
/// Readers see either the previous file or the new one, never a partial write.
pub(crate) fn write_replace<P: AsRef<Path>>(path: P, bytes: &[u8]) -> io::Result<()> {
	let path = path.as_ref();
	let file_name = path
		.file_name()
		.ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Path has no filename"))?;

	let mut temporary = PathBuf::from(path);
	temporary.set_file_name(format!(".{}.tmp", file_name.to_string_lossy()));

	fs::write(&temporary, bytes)?;
	fs::rename(&temporary, path)
}

/// Removes `path`, ignoring a file that is already gone.
pub(crate) fn remove_if_exists<P: AsRef<Path>>(path: P) -> io::Result<()> {
	match fs::remove_file(path) {
		Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
		other => other,
	}
}

/// Lists the names of files in `dir` ending with `suffix`, with the suffix removed.
///
/// Example: with suffix `".config.json"`, `ann.config.json` → `"ann"`.
pub(crate) fn list_stems<P: AsRef<Path>>(dir: P, suffix: &str) -> io::Result<Vec<String>> {
	let mut stems = Vec::new();

	for entry in fs::read_dir(dir)? {
		let entry = entry?;
		let path = entry.path();

		if path.is_file() {
			if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
				if let Some(stem) = name.strip_suffix(suffix) {
					if !stem.is_empty() && !stem.starts_with('.') {
						stems.push(stem.to_owned());
					}
				}
			}
		}
	}

	stems.sort();
	Ok(stems)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn write_replace_overwrites_and_leaves_no_temporary() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("ann.chain.json");

		write_replace(&path, b"{}").unwrap();
		write_replace(&path, b"{\"a\":{}}").unwrap();

		assert_eq!(fs::read_to_string(&path).unwrap(), "{\"a\":{}}");
		assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
	}

	#[test]
	fn list_stems_filters_by_suffix() {
		let dir = tempfile::tempdir().unwrap();
		fs::write(dir.path().join("ann.config.json"), "{}").unwrap();
		fs::write(dir.path().join("bob.config.json"), "{}").unwrap();
		fs::write(dir.path().join("ann.chain.json"), "{}").unwrap();

		assert_eq!(list_stems(dir.path(), ".config.json").unwrap(), vec!["ann", "bob"]);
	}

	#[test]
	fn remove_if_exists_tolerates_missing_files() {
		let dir = tempfile::tempdir().unwrap();
		assert!(remove_if_exists(dir.path().join("missing")).is_ok());
	}

	#[test]
	fn read_file_splits_lines() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("corpus.txt");
		fs::write(&path, "one\r\ntwo\n").unwrap();
		assert_eq!(read_file(&path).unwrap(), vec!["one", "two"]);
	}
}
