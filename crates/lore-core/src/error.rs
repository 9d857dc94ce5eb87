//! Error types for lore operations.
//!
//! Query-style operations never fail; they return empty results instead.
//! Errors are reserved for invalid options, hierarchy cycles and foreign data
//! that cannot be decoded.

use crate::types::CommunityId;
use thiserror::Error;

/// Result type for lore operations.
pub type Result<T> = std::result::Result<T, LoreError>;

/// Errors that can occur during lore operations.
#[derive(Error, Debug)]
pub enum LoreError {
    /// An option or configuration value is out of its valid domain.
    #[error("Invalid value for {field}: {value} ({reason})")]
    InvalidOption {
        field: String,
        value: String,
        reason: String,
    },

    /// No community with this id is stored.
    #[error("Community not found: {0}")]
    CommunityNotFound(CommunityId),

    /// Re-parenting would make a community its own ancestor.
    #[error("Re-parenting {child} under {parent} would create a cycle")]
    HierarchyCycle {
        child: CommunityId,
        parent: CommunityId,
    },

    /// A snapshot was produced by an incompatible version.
    #[error("Unsupported snapshot version: expected {expected}, found {found}")]
    SnapshotVersion { expected: u32, found: u32 },

    /// Serialization errors.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// Convenience constructors
impl LoreError {
    pub fn invalid_option(
        field: impl Into<String>,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        LoreError::InvalidOption {
            field: field.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_option_display() {
        let err = LoreError::invalid_option("resolution", -1.0, "must be positive");
        let msg = err.to_string();
        assert!(msg.contains("resolution"));
        assert!(msg.contains("-1"));
        assert!(msg.contains("must be positive"));
    }

    #[test]
    fn from_serde_json() {
        let json_err = serde_json::from_str::<u32>("not a number").unwrap_err();
        let err: LoreError = json_err.into();
        assert!(matches!(err, LoreError::Serialization(_)));
    }
}
