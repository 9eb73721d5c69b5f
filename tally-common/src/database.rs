//! Database operation patterns and utilities

use crate::{
    error::{TokenError, TokenResult},
    serialization::TokenSerialize,
};
use async_trait::async_trait;
use rocksdb::{Options, DB};
use std::sync::Arc;

/// Database operations trait
#[async_trait]
pub trait DatabaseOps {
    /// Store data with standardized key formatting
    async fn store_data<T: TokenSerialize + Send + Sync>(
        &self,
        prefix: &str,
        key: &str,
        data: &T,
    ) -> TokenResult<()>;

    /// Load data with standardized key formatting
    async fn load_data<T: TokenSerialize + Send + Sync>(
        &self,
        prefix: &str,
        key: &str,
    ) -> TokenResult<Option<T>>;

    /// Delete data with standardized key formatting
    async fn delete_data(&self, prefix: &str, key: &str) -> TokenResult<()>;

    /// Check if key exists
    async fn exists(&self, prefix: &str, key: &str) -> TokenResult<bool>;
}

/// Tally database wrapper with standardized operations
pub struct LedgerDatabase {
    db: Arc<DB>,
}

impl LedgerDatabase {
    /// Create new database instance
    pub fn new(path: &str) -> TokenResult<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_max_open_files(1000);
        opts.set_use_fsync(false);
        opts.set_bytes_per_sync(8388608);
        opts.set_max_write_buffer_number(8);
        opts.set_write_buffer_size(67108864);
        opts.set_compaction_style(rocksdb::DBCompactionStyle::Universal);

        let db = DB::open(&opts, path)?;
        tracing::debug!("opened ledger database at {}", path);

        Ok(Self { db: Arc::new(db) })
    }

    /// Format key with prefix
    fn format_key(prefix: &str, key: &str) -> String {
        format!("{}:{}", prefix, key)
    }

    /// Get raw value from database
    pub fn get_raw(&self, key: &[u8]) -> TokenResult<Option<Vec<u8>>> {
        self.db.get(key).map_err(TokenError::from)
    }

    /// Put raw value to database
    pub fn put_raw(&self, key: &[u8], value: &[u8]) -> TokenResult<()> {
        self.db.put(key, value).map_err(TokenError::from)
    }

    /// Delete raw key from database
    pub fn delete_raw(&self, key: &[u8]) -> TokenResult<()> {
        self.db.delete(key).map_err(TokenError::from)
    }
}

#[async_trait]
impl DatabaseOps for LedgerDatabase {
    async fn store_data<T: TokenSerialize + Send + Sync>(
        &self,
        prefix: &str,
        key: &str,
        data: &T,
    ) -> TokenResult<()> {
        let formatted_key = Self::format_key(prefix, key);
        let encoded = data
            .encode()
            .map_err(|e| TokenError::serialization(format!("failed to encode data: {}", e)))?;

        self.put_raw(formatted_key.as_bytes(), &encoded)
    }

    async fn load_data<T: TokenSerialize + Send + Sync>(
        &self,
        prefix: &str,
        key: &str,
    ) -> TokenResult<Option<T>> {
        let formatted_key = Self::format_key(prefix, key);

        match self.get_raw(formatted_key.as_bytes())? {
            Some(bytes) => {
                let data = T::decode(&bytes).map_err(|e| {
                    TokenError::serialization(format!("failed to decode data: {}", e))
                })?;
                Ok(Some(data))
            }
            None => Ok(None),
        }
    }

    async fn delete_data(&self, prefix: &str, key: &str) -> TokenResult<()> {
        let formatted_key = Self::format_key(prefix, key);
        self.delete_raw(formatted_key.as_bytes())
    }

    async fn exists(&self, prefix: &str, key: &str) -> TokenResult<bool> {
        let formatted_key = Self::format_key(prefix, key);
        Ok(self.get_raw(formatted_key.as_bytes())?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialization::EncodingType;
    use serde::{Deserialize, Serialize};
    use tempfile::tempdir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct TestData {
        id: u64,
        name: String,
    }

    impl TokenSerialize for TestData {
        fn preferred_encoding() -> EncodingType {
            EncodingType::Bincode
        }
    }

    #[tokio::test]
    async fn test_database_operations() {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("test_db");
        let db = LedgerDatabase::new(db_path.to_str().unwrap()).unwrap();

        let test_data = TestData {
            id: 123,
            name: "test".to_string(),
        };

        // Test store
        db.store_data("test", "key1", &test_data).await.unwrap();

        // Test load
        let loaded: Option<TestData> = db.load_data("test", "key1").await.unwrap();
        assert_eq!(loaded, Some(test_data.clone()));

        // Test exists
        assert!(db.exists("test", "key1").await.unwrap());
        assert!(!db.exists("test", "key2").await.unwrap());

        // Test delete
        db.delete_data("test", "key1").await.unwrap();
        let loaded_after_delete: Option<TestData> = db.load_data("test", "key1").await.unwrap();
        assert_eq!(loaded_after_delete, None);
    }
}
