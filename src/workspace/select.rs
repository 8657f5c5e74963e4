//! Glob selection over working copy files

use glob::{MatchOptions, Pattern};

use crate::error::{DeliveryError, Result};
use crate::workspace::traits::WorkingCopy;

const OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Compile a glob pattern, mapping syntax errors into `err`
pub fn compile_glob(pattern: &str, err: fn(String) -> DeliveryError) -> Result<Pattern> {
    Pattern::new(pattern).map_err(|e| err(format!("invalid glob '{}': {}", pattern, e)))
}

pub fn glob_matches(pattern: &Pattern, path: &str) -> bool {
    pattern.matches_with(path, OPTIONS)
}

/// Files in the working copy matching `pattern`, in listing order
pub async fn files_matching(wc: &dyn WorkingCopy, pattern: &Pattern) -> Result<Vec<String>> {
    Ok(wc
        .list_files()
        .await?
        .into_iter()
        .filter(|path| glob_matches(pattern, path))
        .collect())
}
