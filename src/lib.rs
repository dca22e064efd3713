//! # conductor-inventory
//!
//! Host, group and datacenter topology for cluster execution tools, fetched
//! from a conductor inventory service and cached on local disk so the tool
//! keeps working while the service is briefly unreachable.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                              Loader                                  │
//! │        (fresh cache? local : remote, remote failed? local)           │
//! └─────────────────────────────────────────────────────────────────────┘
//!          │                         │                         │
//!          ▼                         ▼                         ▼
//! ┌─────────────────┐   ┌─────────────────────┐   ┌─────────────────────┐
//! │   CacheStore    │   │    RemoteFetcher    │   │   InventoryParser   │
//! │  (raw document  │   │  (blocking GET to   │   │  (two-pass parent   │
//! │   on disk, TTL) │   │   the service)      │   │   resolution)       │
//! └─────────────────┘   └─────────────────────┘   └─────────────────────┘
//!                                    │
//!                                    ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │             Inventory snapshot (hosts, groups, datacenters)          │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use conductor_inventory::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let config = Config::load(None).expect("config");
//!     let loader = Loader::open(&config)?;
//!
//!     for host in loader.hosts() {
//!         println!("{} ({})", host.fqdn, host.datacenter_id);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Re-export commonly used items in prelude
pub mod prelude {
    //! Convenient re-exports of commonly used types and traits.

    // Configuration
    pub use crate::config::{BackendSettings, Config};

    // Error handling
    pub use crate::error::{Error, Result};

    // Inventory
    pub use crate::inventory::{
        Datacenter, Group, Host, Inventory, InventoryBackend, LoadSource, Loader, LoaderState,
        WorkGroup,
    };
}

/// Error types and result aliases.
///
/// Only [`Error::Network`](error::Error::Network) is recoverable; it makes the
/// loader fall back to the local cache.
pub mod error;

/// Configuration model and layered loading from files and the environment.
pub mod config;

/// Topology records, parser, cache store, fetcher and loader.
pub mod inventory;

pub use error::{Error, Result};
