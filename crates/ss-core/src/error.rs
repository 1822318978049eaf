//! Error types for page actions.
//!
//! A missing DOM element is never an error; only attempted actions can fail.
//! Every failure here is recoverable: dispatch failures fall through to the
//! next fallback in the same cycle, media rejections go to the playback
//! guard, and anything escaping a cycle step is absorbed at the cycle top
//! level so one bad cycle never stops future polling.

use thiserror::Error;

/// Failure of an action against the live page.
#[derive(Debug, Clone, Error)]
pub enum ActionError {
    /// Synthetic event dispatch threw inside the host page.
    #[error("synthetic event dispatch failed: {0}")]
    Dispatch(String),

    /// A media element API call was rejected (autoplay policy, detached
    /// element, unsupported operation).
    #[error("media operation rejected: {0}")]
    Media(String),
}

impl ActionError {
    /// Lightweight severity classification for the cycle-level catch.
    ///
    /// Only critical failures are forwarded to the log sink; everything else
    /// is absorbed silently to avoid log spam against a flickering DOM.
    pub fn is_critical(&self) -> bool {
        let msg = match self {
            Self::Dispatch(m) | Self::Media(m) => m,
        };
        msg.to_ascii_lowercase().contains("critical")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_criticality() {
        assert!(ActionError::Dispatch("CRITICAL: detached root".into()).is_critical());
        assert!(!ActionError::Media("NotAllowedError".into()).is_critical());
    }
}
