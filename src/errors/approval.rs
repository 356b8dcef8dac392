// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

/// Failure of the persistent allow/deny list store
#[derive(Debug, Clone, thiserror::Error)]
#[error("approval store unavailable: {details}")]
pub struct ApprovalStoreError {
    details: String,
    #[source]
    source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl ApprovalStoreError {
    pub fn new(details: impl Into<String>) -> Self {
        Self {
            details: details.into(),
            source: None,
        }
    }

    pub fn with_source(
        details: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            details: details.into(),
            source: Some(Arc::new(source)),
        }
    }
}
