// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Metadata documents describing collections and items.
//!
//! Contracts carry a [`ContentPointer`] to a JSON document. A
//! [`MetadataFetcher`] turns the pointer into the raw document; the typed
//! views here pick out the fields the marketplace shows.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::errors::MetadataError;
use crate::types::ContentPointer;

mod http;

pub use http::HttpMetadataFetcher;

/// Resolves content pointers to JSON documents
#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    async fn fetch(&self, pointer: &ContentPointer) -> Result<serde_json::Value, MetadataError>;
}

/// Collection metadata document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionMetadata {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub cover_image: Option<String>,
}

/// One trait of an item, as listed in its metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemAttribute {
    pub trait_type: String,
    pub value: serde_json::Value,
}

impl ItemAttribute {
    /// The value as display text; strings are shown without quotes
    pub fn value_text(&self) -> String {
        match &self.value {
            serde_json::Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }
}

/// Item metadata document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemMetadata {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub attributes: Vec<ItemAttribute>,
}

impl ItemMetadata {
    /// Attributes as `trait -> value`; a repeated trait keeps its last value
    pub fn attribute_map(&self) -> BTreeMap<String, String> {
        self.attributes
            .iter()
            .map(|attribute| (attribute.trait_type.clone(), attribute.value_text()))
            .collect()
    }
}

/// Decodes a fetched document into one of the typed views.
///
/// # Errors
///
/// Returns [`MetadataError::Decode`] naming `pointer` when the document does
/// not have the expected shape.
pub fn decode<T: DeserializeOwned>(
    pointer: &ContentPointer,
    document: serde_json::Value,
) -> Result<T, MetadataError> {
    serde_json::from_value(document).map_err(|e| MetadataError::decode(pointer.to_string(), e))
}
