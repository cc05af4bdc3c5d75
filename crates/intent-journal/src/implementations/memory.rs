//! In-memory journal backend.

use crate::{JournalError, JournalInterface};
use async_trait::async_trait;
use dashmap::DashMap;

/// Journal that lives for the duration of the process.
#[derive(Default)]
pub struct MemoryJournal {
	entries: DashMap<String, Vec<u8>>,
}

impl MemoryJournal {
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait]
impl JournalInterface for MemoryJournal {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, JournalError> {
		self.entries
			.get(key)
			.map(|entry| entry.value().clone())
			.ok_or(JournalError::NotFound)
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), JournalError> {
		self.entries.insert(key.to_string(), value);
		Ok(())
	}

	async fn delete(&self, key: &str) -> Result<(), JournalError> {
		self.entries.remove(key);
		Ok(())
	}

	async fn exists(&self, key: &str) -> Result<bool, JournalError> {
		Ok(self.entries.contains_key(key))
	}
}

/// Factory function to create an in-memory journal. Takes no configuration.
pub fn create_memory_journal(_config: &toml::Value) -> Result<Box<dyn JournalInterface>, JournalError> {
	Ok(Box::new(MemoryJournal::new()))
}
