//! Content verification for downloaded artifacts.

use std::path::Path;

use anyhow::Result;

use crate::util::hash::sha256_file;

use super::FetchError;

/// Check whether a file's SHA256 matches the expected digest.
///
/// A missing or unreadable file is simply "no match"; callers treat that
/// as a cache miss, not an error.
pub fn matches(path: &Path, expected: &str) -> bool {
    match sha256_file(path) {
        Ok(actual) => actual.eq_ignore_ascii_case(expected),
        Err(_) => false,
    }
}

/// Verify a file against an expected SHA256 digest.
pub fn verify(path: &Path, expected: &str) -> Result<(), FetchError> {
    let actual = sha256_file(path).map_err(FetchError::Io)?;
    if actual.eq_ignore_ascii_case(expected) {
        Ok(())
    } else {
        Err(FetchError::ChecksumMismatch {
            expected: expected.to_string(),
            actual,
        })
    }
}
