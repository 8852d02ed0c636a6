//! Rule set file loading.

use std::path::Path;

use homerules_domain::rule::RuleSet;
use tracing::{info, warn};

/// Rule file errors.
#[derive(Debug, thiserror::Error)]
pub enum RulesFileError {
    /// File I/O failure.
    #[error("failed to read rules file")]
    Io(#[from] std::io::Error),
    /// The file is not JSON at all.
    #[error("rules file is not valid JSON")]
    Parse(#[from] serde_json::Error),
}

/// Load the rule set stored at `path`.
///
/// A missing file yields an empty set. Individual malformed rules are
/// logged and skipped.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not JSON.
pub fn load(path: &Path) -> Result<RuleSet, RulesFileError> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let set = parse(&content)?;
            info!(path = %path.display(), rules = set.rules.len(), rejected = set.rejected.len(), "rules loaded");
            Ok(set)
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "rules file not found, starting without rules");
            Ok(RuleSet::default())
        }
        Err(err) => Err(RulesFileError::Io(err)),
    }
}

/// Decode a rules document, logging every rejected rule.
///
/// # Errors
///
/// Returns [`RulesFileError::Parse`] if `content` is not JSON.
pub fn parse(content: &str) -> Result<RuleSet, RulesFileError> {
    let set = RuleSet::from_json(serde_json::from_str(content)?);
    for rejected in &set.rejected {
        let source = std::error::Error::source(&rejected.reason)
            .map(ToString::to_string)
            .unwrap_or_default();
        warn!(
            index = rejected.index,
            id = rejected.id.as_deref().unwrap_or("?"),
            reason = %rejected.reason,
            details = %source,
            "skipping rule"
        );
    }
    Ok(set)
}
