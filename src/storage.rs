//! Stores for chunk and metadata blobs, from `zarrs_storage` and `zarrs_filesystem`.

pub use bytes::Bytes;
pub use zarrs_filesystem::{FilesystemStore, FilesystemStoreCreateError};
pub use zarrs_storage::byte_range::ByteRange;
pub use zarrs_storage::store::MemoryStore;
pub use zarrs_storage::{
    ListableStorageTraits, MaybeBytes, ReadableStorageTraits, ReadableWritableStorage,
    ReadableWritableStorageTraits, StorageError, StoreKey, StoreKeyError, WritableStorageTraits,
};

/// Trim the slashes from a node path; the root node is the empty path.
#[must_use]
pub fn normalize_path(path: &str) -> String {
    path.trim_matches('/').to_string()
}

/// The key of `suffix` under the node at `path`.
///
/// # Errors
/// Returns a [`StoreKeyError`] if the result is not a valid store key.
pub fn node_key(path: &str, suffix: &str) -> Result<StoreKey, StoreKeyError> {
    if path.is_empty() {
        StoreKey::new(suffix)
    } else {
        StoreKey::new(format!("{path}/{suffix}"))
    }
}
