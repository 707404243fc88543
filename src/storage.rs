//! Binary object persistence contract.
//!
//! Storage backends (filesystem, S3, ...) live outside this crate; the core
//! only consumes the trait from file-upload helpers. See
//! [`crate::context::UploadedFile::persist`].

use anyhow::Result;

pub trait Storage: Send + Sync {
    fn exists(&self, key: &str) -> Result<bool>;
    /// Store `content` under `key`, returning the number of bytes written.
    fn put(&self, key: &str, content: &[u8]) -> Result<u64>;
    fn get(&self, key: &str) -> Result<Vec<u8>>;
    fn delete(&self, key: &str) -> Result<()>;
}
