// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Configuration for a marketplace deployment
//!
//! This module controls which marketplace this deployment is, the fees it
//! advertises, page and cache bounds, and retry behavior toward the ledger
//! and metadata hosts.
//!
//! # Example: Using defaults
//!
//! ```rust,ignore
//! use ledger_market::MarketplaceConfig;
//!
//! let config = MarketplaceConfig::new(marketplace_address);
//! ```
//!
//! # Example: Custom configuration
//!
//! ```rust,ignore
//! use ledger_market::MarketplaceConfigBuilder;
//! use std::time::Duration;
//!
//! let config = MarketplaceConfigBuilder::new(marketplace_address)
//!     .service_fee(5, 100)
//!     .max_take(64)
//!     .snapshot_refresh_interval(Duration::from_secs(2))
//!     .build();
//! ```
//!
//! # Example: From the environment
//!
//! ```rust,ignore
//! use ledger_market::MarketplaceConfig;
//!
//! // Reads MARKETPLACE_ADDRESS and friends, loading `.env` if present
//! let config = MarketplaceConfig::from_env()?;
//! ```

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::MarketError;
use crate::transport::RetryConfig;
use crate::types::Address;

pub mod constants;

use constants::env;

/// Fees this marketplace advertises on ordinary items and charges on sales
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeSchedule {
    /// Marketplace cut of a sale, as `numerator / denominator`
    pub service_fee_numerator: u32,
    pub service_fee_denominator: u32,
    /// Amount attached when putting an item up for sale (nano units)
    pub sale_fee: u128,
    /// Amount attached to a transfer (nano units)
    pub transfer_fee: u128,
    /// Network fee estimate shown with every item (nano units)
    pub network_fee: u128,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            service_fee_numerator: 0,
            service_fee_denominator: 1,
            sale_fee: 0,
            transfer_fee: 0,
            network_fee: 0,
        }
    }
}

/// Bounds on listing pages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    /// Page size when the request does not specify one
    pub default_take: usize,
    /// Largest page a request can get, whatever it asks for
    pub max_take: usize,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_take: constants::DEFAULT_PAGE_TAKE,
            max_take: constants::MAX_PAGE_TAKE,
        }
    }
}

/// Bounds on cache growth
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheLimits {
    /// Entry bound applied to every cache
    pub max_entries: usize,
    /// Expiry of the collection item index
    pub item_index_ttl: Duration,
}

impl Default for CacheLimits {
    fn default() -> Self {
        Self {
            max_entries: constants::DEFAULT_CACHE_MAX_ENTRIES,
            item_index_ttl: constants::ITEM_INDEX_TTL,
        }
    }
}

/// Block stream buffering and failure budget
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSettings {
    /// Events buffered per subscriber
    pub capacity: usize,
    /// Consecutive failed fetch rounds (each already retried) before the stream terminates
    pub max_restarts: u32,
    /// Retry policy for each `next_block_after` call
    pub retry: RetryConfig,
    /// Pause before a terminated stream is started again from the last confirmed block
    pub restart_delay: Duration,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            capacity: constants::BLOCK_STREAM_CAPACITY,
            max_restarts: constants::BLOCK_STREAM_MAX_RESTARTS,
            retry: RetryConfig::default(),
            restart_delay: constants::BLOCK_STREAM_RESTART_DELAY,
        }
    }
}

/// Configuration for a marketplace deployment
///
/// Use [`MarketplaceConfigBuilder`] for a fluent API to construct instances.
#[derive(Debug, Clone)]
pub struct MarketplaceConfig {
    /// This deployment's own marketplace contract. Sales listed on any other
    /// marketplace are shown as ordinary items.
    pub marketplace: Address,

    pub fees: FeeSchedule,

    pub pages: PageLimits,

    pub caches: CacheLimits,

    /// How often the reference snapshot is advanced to the ledger head
    /// Default: 5 seconds
    pub snapshot_refresh_interval: Duration,

    /// Retries for ledger reads
    /// Default: 3 retries, 100ms base delay
    pub ledger_retry: RetryConfig,

    /// Retries for metadata documents
    /// Default: 10 retries
    pub metadata_retry: RetryConfig,

    /// Timeout for each metadata request
    /// Default: 30 seconds
    pub metadata_timeout: Duration,

    pub stream: StreamSettings,
}

impl MarketplaceConfig {
    /// Creates a configuration with default bounds and zero fees
    pub fn new(marketplace: Address) -> Self {
        Self {
            marketplace,
            fees: FeeSchedule::default(),
            pages: PageLimits::default(),
            caches: CacheLimits::default(),
            snapshot_refresh_interval: constants::SNAPSHOT_REFRESH_INTERVAL,
            ledger_retry: RetryConfig::default(),
            metadata_retry: RetryConfig {
                max_retries: constants::METADATA_MAX_RETRIES,
                ..RetryConfig::default()
            },
            metadata_timeout: constants::METADATA_REQUEST_TIMEOUT,
            stream: StreamSettings::default(),
        }
    }

    /// Create config suited to tests: no retries, no backoff
    ///
    /// Failures surface on the first attempt, which keeps tests against
    /// mock collaborators fast and deterministic.
    pub fn minimal(marketplace: Address) -> Self {
        let no_retry = RetryConfig {
            max_retries: 0,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(1),
        };
        Self {
            ledger_retry: no_retry.clone(),
            metadata_retry: no_retry.clone(),
            stream: StreamSettings {
                retry: no_retry,
                restart_delay: Duration::from_millis(1),
                ..StreamSettings::default()
            },
            ..Self::new(marketplace)
        }
    }

    /// Loads the configuration from the process environment.
    ///
    /// A `.env` file in the working directory is loaded first when present.
    /// Only `MARKETPLACE_ADDRESS` is required.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Config`] when the marketplace address is missing
    /// or any variable fails to parse.
    pub fn from_env() -> Result<Self, MarketError> {
        Self::from_vars(|name| dotenvy::var(name).ok())
    }

    /// Loads the configuration through an arbitrary variable lookup
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, MarketError> {
        let marketplace = lookup(env::MARKETPLACE_ADDRESS)
            .ok_or_else(|| MarketError::config(format!("{} is not set", env::MARKETPLACE_ADDRESS)))?;
        let marketplace: Address = parse_var(env::MARKETPLACE_ADDRESS, &marketplace)?;

        let mut builder = MarketplaceConfigBuilder::new(marketplace);
        let mut fees = FeeSchedule::default();
        if let Some(value) = parse_optional(&lookup, env::SERVICE_FEE_NUMERATOR)? {
            fees.service_fee_numerator = value;
        }
        if let Some(value) = parse_optional(&lookup, env::SERVICE_FEE_DENOMINATOR)? {
            fees.service_fee_denominator = value;
        }
        if let Some(value) = parse_optional(&lookup, env::SALE_FEE)? {
            fees.sale_fee = value;
        }
        if let Some(value) = parse_optional(&lookup, env::TRANSFER_FEE)? {
            fees.transfer_fee = value;
        }
        if let Some(value) = parse_optional(&lookup, env::NETWORK_FEE)? {
            fees.network_fee = value;
        }
        builder = builder.fees(fees);

        if let Some(max_take) = parse_optional(&lookup, env::PAGE_MAX_TAKE)? {
            builder = builder.max_take(max_take);
        }
        if let Some(max_entries) = parse_optional(&lookup, env::CACHE_MAX_ENTRIES)? {
            builder = builder.cache_max_entries(max_entries);
        }

        let config = builder.build();
        config.validate()?;
        Ok(config)
    }

    /// Checks values that would make the deployment misbehave
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Config`] for a zero service fee denominator, a
    /// zero page or cache bound, or a default page larger than the maximum.
    pub fn validate(&self) -> Result<(), MarketError> {
        if self.fees.service_fee_denominator == 0 {
            return Err(MarketError::config("service fee denominator must not be zero"));
        }
        if self.pages.max_take == 0 {
            return Err(MarketError::config("maximum page size must not be zero"));
        }
        if self.pages.default_take > self.pages.max_take {
            return Err(MarketError::config(format!(
                "default page size {} exceeds maximum {}",
                self.pages.default_take, self.pages.max_take
            )));
        }
        if self.caches.max_entries == 0 {
            return Err(MarketError::config("cache entry bound must not be zero"));
        }
        Ok(())
    }
}

fn parse_var<T>(name: &str, raw: &str) -> Result<T, MarketError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.trim()
        .parse()
        .map_err(|e| MarketError::config(format!("{name}: cannot parse `{raw}`: {e}")))
}

fn parse_optional<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<T>, MarketError>
where
    T: FromStr,
    T::Err: Display,
{
    lookup(name).map(|raw| parse_var(name, &raw)).transpose()
}

/// Builder for [`MarketplaceConfig`]
///
/// # Example
///
/// ```rust,ignore
/// use ledger_market::MarketplaceConfigBuilder;
///
/// let config = MarketplaceConfigBuilder::new(marketplace_address)
///     .network_fee(50_000_000)
///     .cache_max_entries(10_000)
///     .build();
/// ```
pub struct MarketplaceConfigBuilder {
    config: MarketplaceConfig,
}

impl MarketplaceConfigBuilder {
    pub fn new(marketplace: Address) -> Self {
        Self {
            config: MarketplaceConfig::new(marketplace),
        }
    }

    /// Start from [`MarketplaceConfig::minimal`]
    pub fn minimal(marketplace: Address) -> Self {
        Self {
            config: MarketplaceConfig::minimal(marketplace),
        }
    }

    pub fn fees(mut self, fees: FeeSchedule) -> Self {
        self.config.fees = fees;
        self
    }

    /// Set the marketplace cut as `numerator / denominator`
    pub fn service_fee(mut self, numerator: u32, denominator: u32) -> Self {
        self.config.fees.service_fee_numerator = numerator;
        self.config.fees.service_fee_denominator = denominator;
        self
    }

    pub fn network_fee(mut self, amount: u128) -> Self {
        self.config.fees.network_fee = amount;
        self
    }

    pub fn default_take(mut self, take: usize) -> Self {
        self.config.pages.default_take = take;
        self
    }

    /// Set the largest page a listing can return
    ///
    /// The default page size is lowered to fit if needed.
    pub fn max_take(mut self, take: usize) -> Self {
        self.config.pages.max_take = take;
        self.config.pages.default_take = self.config.pages.default_take.min(take);
        self
    }

    pub fn cache_max_entries(mut self, max_entries: usize) -> Self {
        self.config.caches.max_entries = max_entries;
        self
    }

    pub fn item_index_ttl(mut self, ttl: Duration) -> Self {
        self.config.caches.item_index_ttl = ttl;
        self
    }

    pub fn snapshot_refresh_interval(mut self, interval: Duration) -> Self {
        self.config.snapshot_refresh_interval = interval;
        self
    }

    pub fn ledger_retry(mut self, retry: RetryConfig) -> Self {
        self.config.ledger_retry = retry;
        self
    }

    pub fn metadata_retry(mut self, retry: RetryConfig) -> Self {
        self.config.metadata_retry = retry;
        self
    }

    pub fn metadata_timeout(mut self, timeout: Duration) -> Self {
        self.config.metadata_timeout = timeout;
        self
    }

    pub fn stream(mut self, stream: StreamSettings) -> Self {
        self.config.stream = stream;
        self
    }

    pub fn build(self) -> MarketplaceConfig {
        self.config
    }
}
