//! ID generation utilities for Shipwright
//!
//! Provides functions for generating correlation ids for invocations and
//! naming disposable clones.

use rand::Rng;

/// Get current timestamp in milliseconds since Unix epoch
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Generate a correlation id for one goal invocation
///
/// Format: `corr-{timestamp_ms}-{random_hex}`
/// Example: `corr-1738300800123-a1b2`
pub fn generate_correlation_id() -> String {
    let random: u16 = rand::rng().random();
    format!("corr-{}-{:04x}", now_ms(), random)
}

/// Generate a directory name for a disposable clone of `owner/repo` at `sha`
///
/// Format: `{owner}-{repo}-{short_sha}-{random_hex}`
pub fn generate_clone_name(owner: &str, repo: &str, sha: &str) -> String {
    let random: u16 = rand::rng().random();
    format!("{}-{}-{}-{:04x}", owner, repo, short_sha(sha), random)
}

/// First seven characters of a commit sha, the way git abbreviates it
pub fn short_sha(sha: &str) -> &str {
    match sha.char_indices().nth(7) {
        Some((idx, _)) => &sha[..idx],
        None => sha,
    }
}
