//! DNS-SD browsing over multicast DNS.
//!
//! A browse session queries for a service type on the local links, keeps
//! a cache of what responders announce, and reports instances as they
//! appear and disappear on each interface.

pub mod api;
pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod mdns;
pub mod registry;

pub use context::{BrowseContext, StopReason};
pub use error::{BrowseError, Result};
pub use mdns::handler::{BrowseHandler, FnHandler};
pub use mdns::lookup::{
    browse, lookup_type, lookup_type_at_interfaces, lookup_type_continuously, BrowseOptions,
};
pub use shared::types::BrowseEntry;
