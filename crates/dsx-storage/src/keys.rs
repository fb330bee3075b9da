//! Shared key generation for dataset images.
//!
//! Key format: `{owner_id}/{collection_name}/{filename}`.

/// Build the destination key for an image.
///
/// Pure function of its inputs: the same owner, collection and filename always map
/// to the same key, which is what gives uploads their overwrite semantics.
pub fn destination_key(owner_id: &str, collection_name: &str, filename: &str) -> String {
    format!("{}/{}/{}", owner_id, collection_name, filename)
}

/// Strip any directory components from an archive path, keeping the part after the
/// last `/`.
pub fn base_filename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
