//! File-backed journal.
//!
//! One JSON file per entry under a base directory.

use crate::{JournalError, JournalInterface};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;

pub struct FileJournal {
	base_path: PathBuf,
}

impl FileJournal {
	pub fn new(base_path: PathBuf) -> Self {
		Self { base_path }
	}

	/// Maps a key to a filesystem-safe path.
	fn get_file_path(&self, key: &str) -> PathBuf {
		let safe_key = key.replace(['/', ':', '\\'], "_");
		self.base_path.join(format!("{}.json", safe_key))
	}
}

#[async_trait]
impl JournalInterface for FileJournal {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, JournalError> {
		let path = self.get_file_path(key);

		match fs::read(&path).await {
			Ok(data) => Ok(data),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(JournalError::NotFound),
			Err(e) => Err(JournalError::Backend(e.to_string())),
		}
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), JournalError> {
		let path = self.get_file_path(key);

		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent)
				.await
				.map_err(|e| JournalError::Backend(e.to_string()))?;
		}

		// Write to a temp file, then rename over the target
		let temp_path = path.with_extension("tmp");
		fs::write(&temp_path, value)
			.await
			.map_err(|e| JournalError::Backend(e.to_string()))?;

		fs::rename(&temp_path, &path)
			.await
			.map_err(|e| JournalError::Backend(e.to_string()))?;

		Ok(())
	}

	async fn delete(&self, key: &str) -> Result<(), JournalError> {
		let path = self.get_file_path(key);

		match fs::remove_file(&path).await {
			Ok(_) => Ok(()),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(JournalError::Backend(e.to_string())),
		}
	}

	async fn exists(&self, key: &str) -> Result<bool, JournalError> {
		fs::try_exists(self.get_file_path(key))
			.await
			.map_err(|e| JournalError::Backend(e.to_string()))
	}
}

/// Factory function to create a file journal from configuration.
///
/// Configuration parameters:
/// - `path`: base directory for journal files (default: "./data/journal")
pub fn create_file_journal(config: &toml::Value) -> Result<Box<dyn JournalInterface>, JournalError> {
	let path = config
		.get("path")
		.and_then(|v| v.as_str())
		.unwrap_or("./data/journal")
		.to_string();

	Ok(Box::new(FileJournal::new(PathBuf::from(path))))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{Journal, JournalEntry};
	use intent_types::{IntentError, Outcome};

	#[tokio::test]
	async fn test_entries_survive_a_new_journal_instance() {
		let dir = tempfile::tempdir().unwrap();
		let outcome = Outcome::rejected(None, &IntentError::InvalidIntent("bad".into()));
		let entry = JournalEntry::new(Some("do something".into()), None, outcome);

		let id = Journal::new(Box::new(FileJournal::new(dir.path().to_path_buf())))
			.record(&entry)
			.await
			.unwrap();

		let reopened = Journal::new(Box::new(FileJournal::new(dir.path().to_path_buf())));
		assert!(reopened.contains(&id).await.unwrap());
		assert_eq!(reopened.lookup(&id).await.unwrap(), entry);
		// no temp file left behind
		let leftovers: Vec<_> = std::fs::read_dir(dir.path())
			.unwrap()
			.filter_map(Result::ok)
			.filter(|e| e.path().extension().is_some_and(|ext| ext == "tmp"))
			.collect();
		assert!(leftovers.is_empty());
	}

	#[tokio::test]
	async fn test_missing_and_deleted_keys() {
		let dir = tempfile::tempdir().unwrap();
		let journal = FileJournal::new(dir.path().join("nested"));

		assert!(matches!(
			journal.get_bytes("outcome:nope").await,
			Err(JournalError::NotFound)
		));
		journal.set_bytes("outcome:a", b"{}".to_vec()).await.unwrap();
		assert!(journal.exists("outcome:a").await.unwrap());
		journal.delete("outcome:a").await.unwrap();
		journal.delete("outcome:a").await.unwrap();
		assert!(!journal.exists("outcome:a").await.unwrap());
	}

	#[test]
	fn test_factory_uses_configured_path() {
		let config: toml::Value = toml::from_str("path = \"/tmp/journal\"").unwrap();
		assert!(create_file_journal(&config).is_ok());
	}
}
