// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Drop/take pagination over lazy listings

use futures::{Stream, StreamExt};
use serde::Deserialize;

use crate::config::PageLimits;

/// Requested window of a listing, as given by the client.
///
/// Both bounds are optional and may be out of range; [`Page::resolve`]
/// turns them into a window the listing can serve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub drop: Option<i64>,
    #[serde(default)]
    pub take: Option<i64>,
}

impl Page {
    pub fn new(drop: i64, take: i64) -> Self {
        Self {
            drop: Some(drop),
            take: Some(take),
        }
    }

    /// `(drop, take)` after applying defaults and limits.
    ///
    /// A negative or missing `drop` starts at the beginning. A missing `take`
    /// uses the default page size; any `take` is clamped to `0..=max_take`.
    pub fn resolve(&self, limits: PageLimits) -> (usize, usize) {
        let drop = self.drop.unwrap_or(0).max(0);
        let take = self
            .take
            .unwrap_or(limits.default_take as i64)
            .clamp(0, limits.max_take as i64);
        (
            usize::try_from(drop).unwrap_or(usize::MAX),
            usize::try_from(take).unwrap_or(0),
        )
    }
}

/// Skips `drop` elements of `listing` and yields at most `take` after that.
///
/// The listing is consumed lazily, so nothing past the page is ever resolved.
pub fn drop_take<S>(listing: S, page: Page, limits: PageLimits) -> impl Stream<Item = S::Item>
where
    S: Stream,
{
    let (drop, take) = page.resolve(limits);
    listing.skip(drop).take(take)
}
