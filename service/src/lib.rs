//! Service contains the business logic of the application.
//!
//! List of available Cargo features:
#![doc = document_features::document_features!()]
#![deny(
    nonstandard_style,
    rust_2018_idioms,
    rustdoc::all,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code
)]
#![forbid(non_ascii_idents)]
#![warn(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    clippy::pedantic,
    clippy::wildcard_enum_match_arm,
    deprecated_in_future,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    unused_crate_dependencies,
    unused_import_braces,
    unused_labels,
    unused_lifetimes,
    unused_qualifications,
    unused_results
)]

pub mod command;
pub mod domain;
pub mod infra;
pub mod query;
pub mod read;

use std::num::NonZeroUsize;

use common::clock;
use smart_default::SmartDefault;

#[cfg(doc)]
use common::Clock;
#[cfg(doc)]
use infra::Database;

pub use self::{command::Command, query::Query};

/// [`Service`] configuration.
#[derive(Clone, Copy, Debug, SmartDefault)]
pub struct Config {
    /// Number of elements in a page, whenever a request omits it.
    #[default(Config::DEFAULT_PAGE_SIZE)]
    pub default_page_size: NonZeroUsize,
}

impl Config {
    /// Default value of [`Config::default_page_size`].
    pub const DEFAULT_PAGE_SIZE: NonZeroUsize = match NonZeroUsize::new(10) {
        Some(size) => size,
        None => unreachable!(),
    };
}

/// Domain service.
#[derive(Clone, Debug)]
pub struct Service<Db, Clk = clock::System> {
    /// Configuration of this [`Service`].
    config: Config,

    /// [`Database`] of this [`Service`].
    database: Db,

    /// [`Clock`] this [`Service`] reads the current time from.
    clock: Clk,
}

impl<Db> Service<Db> {
    /// Creates a new [`Service`] reading the system time.
    #[must_use]
    pub fn new(config: Config, database: Db) -> Self {
        Self::with_clock(config, database, clock::System)
    }
}

impl<Db, Clk> Service<Db, Clk> {
    /// Creates a new [`Service`] reading the time from the provided
    /// [`Clock`].
    #[must_use]
    pub fn with_clock(config: Config, database: Db, clock: Clk) -> Self {
        Self {
            config,
            database,
            clock,
        }
    }

    /// Returns [`Config`] of this [`Service`].
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns [`Database`] of this [`Service`].
    #[must_use]
    pub fn database(&self) -> &Db {
        &self.database
    }

    /// Returns [`Clock`] of this [`Service`].
    #[must_use]
    pub fn clock(&self) -> &Clk {
        &self.clock
    }
}
