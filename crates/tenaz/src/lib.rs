//! Tenaz: Locator Resolution and Synchronization for UI Automation
//!
//! Tenaz (Spanish: "tenacious") sits between test code and a driver session.
//! It turns symbolic element names into driver queries, finds elements with
//! a visible-first policy, rebuilds element references that went stale, and
//! runs bounded polling waits.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        TENAZ Architecture                        │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  "Login.Username"                                                │
//! │        │                                                         │
//! │        ▼                                                         │
//! │  ┌────────────┐   ┌────────────┐   ┌────────────┐                │
//! │  │ Repository │──►│ Resolver   │──►│ Strategy   │──► DriverQuery │
//! │  └────────────┘   └────────────┘   └────────────┘                │
//! │                                          │                       │
//! │        ┌─────────────────────────────────┘                       │
//! │        ▼                                                         │
//! │  ┌────────────┐   ┌────────────┐   ┌────────────┐                │
//! │  │ Finder     │◄─►│ Reconstruct│   │ Waiter     │                │
//! │  └────────────┘   └────────────┘   └────────────┘                │
//! │        │                                 │                       │
//! │        └──────────────► Session ◄────────┘                       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]

mod attribute_wait;
mod config;
mod context;
mod finder;
mod handle;
mod logging;
pub mod mock;
mod reconstruct;
mod repository;
mod resolver;
mod result;
mod session;
mod strategy;
mod wait;

pub use attribute_wait::{AttributeCondition, AttributeWait, Relation};
pub use config::{
    SyncConfig, SyncConfigBuilder, DEFAULT_POLL_INTERVAL_MS, DEFAULT_TIMEOUT_MS,
};
pub use context::Context;
pub use finder::{ElementFilter, ElementFinder};
pub use handle::{AncestorChain, ChainStep, ElementHandle};
pub use logging::{init_logging, LogFormat};
pub use reconstruct::{PathReconstructor, RebuildOptions};
pub use repository::{
    ElementRepository, RepositoryBuilder, RepositoryEntry, RepositoryRegistry, StaticRepository,
};
pub use resolver::{SymbolicLocatorResolver, Target};
pub use result::{TenazError, TenazResult};
pub use session::{prefer_visible, NodeRef, Session};
pub use strategy::{translate, DriverQuery, LocatorSpec, Strategy};
pub use wait::{
    wait_until, wait_until_with, ElementWaits, FnCondition, PollCondition, WaitKind, WaitOptions,
    WaitResult, Waiter, MIN_POLL_INTERVAL,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::attribute_wait::*;
    pub use super::config::*;
    pub use super::context::*;
    pub use super::finder::*;
    pub use super::handle::*;
    pub use super::logging::*;
    pub use super::reconstruct::*;
    pub use super::repository::*;
    pub use super::resolver::*;
    pub use super::result::*;
    pub use super::session::*;
    pub use super::strategy::*;
    pub use super::wait::*;
}
