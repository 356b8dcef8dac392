// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Errors raised while resolving metadata documents.

use std::sync::Arc;

/// Errors that can occur while fetching a metadata document
#[derive(Debug, Clone, thiserror::Error)]
pub enum MetadataError {
    /// The request could not be sent or the response body could not be read.
    #[error("metadata request to {location} failed")]
    Network {
        location: String,
        #[source]
        source: Arc<dyn std::error::Error + Send + Sync>,
    },

    /// The server answered with a non-success status.
    #[error("metadata request to {location} returned HTTP {status}")]
    Status { location: String, status: u16 },

    /// The content pointer cannot be resolved (unsupported scheme, bad URL).
    #[error("cannot resolve content pointer {pointer}: {reason}")]
    InvalidPointer { pointer: String, reason: String },

    /// The document is not valid JSON.
    #[error("metadata document from {location} is not valid JSON")]
    Decode {
        location: String,
        #[source]
        source: Arc<serde_json::Error>,
    },
}

impl MetadataError {
    pub fn network(
        location: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        MetadataError::Network {
            location: location.into(),
            source: Arc::new(source),
        }
    }

    pub fn invalid_pointer(pointer: impl Into<String>, reason: impl Into<String>) -> Self {
        MetadataError::InvalidPointer {
            pointer: pointer.into(),
            reason: reason.into(),
        }
    }

    pub fn decode(location: impl Into<String>, source: serde_json::Error) -> Self {
        MetadataError::Decode {
            location: location.into(),
            source: Arc::new(source),
        }
    }

    /// Connectivity failures, rate limiting and server errors are transient.
    pub fn is_retryable(&self) -> bool {
        match self {
            MetadataError::Network { .. } => true,
            MetadataError::Status { status, .. } => *status == 429 || *status >= 500,
            MetadataError::InvalidPointer { .. } | MetadataError::Decode { .. } => false,
        }
    }
}
