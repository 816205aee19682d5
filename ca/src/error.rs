//! Aggregator error types

use thiserror::Error;

use crate::key::ScopeKey;

/// Errors returned by aggregator and context lookups
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregatorError {
    #[error("No aggregator registered under {key}")]
    NotRegistered { key: ScopeKey },

    #[error("Aggregator under {key} holds {found}, requested {expected}")]
    TypeMismatch {
        key: ScopeKey,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Aggregator under {key} is already in use (unsynchronized aggregators are single-writer)")]
    Contended { key: ScopeKey },

    #[error("Producer for {key} dropped its sender before delivering a value")]
    ProducerDropped { key: ScopeKey },
}

impl AggregatorError {
    /// True when the lookup found no usable aggregator: either nothing was
    /// registered under the key, or it was registered for another type.
    pub fn is_not_found_or_invalid(&self) -> bool {
        matches!(self, Self::NotRegistered { .. } | Self::TypeMismatch { .. })
    }

    /// Scope key the failing operation addressed
    pub fn key(&self) -> &ScopeKey {
        match self {
            Self::NotRegistered { key }
            | Self::TypeMismatch { key, .. }
            | Self::Contended { key }
            | Self::ProducerDropped { key } => key,
        }
    }
}

/// Result alias for aggregator operations
pub type AggregatorResult<T> = Result<T, AggregatorError>;
