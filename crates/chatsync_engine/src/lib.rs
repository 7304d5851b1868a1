//! # Chatsync Engine
//!
//! Collection lifecycle and backfill engine for chatsync.
//!
//! This crate provides:
//! - Real-time lifecycle tracking (initializing → online ↔ degraded)
//! - Paged lifecycle tracking (fetching → partially → fully populated)
//! - The page source abstraction over the transport collaborator
//! - The paged backfill driver and parallel room population
//!
//! ## Key Invariants
//!
//! - Lifecycle states are derived from store activity and progress
//!   counter completion, never from arbitrary external signals
//! - Backfill results racing live events are arbitrated by the store's
//!   version ordering alone
//! - A refetch re-enters fetching without discarding merged entities

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backfill;
mod config;
mod connection;
mod error;
mod paged;
mod source;

pub use backfill::{populate_rooms, Backfill, BackfillSummary};
pub use config::EngineConfig;
pub use connection::{RealTimeProviderState, RealTimeRepositoryState, RealTimeTracker};
pub use error::{EngineError, EngineResult};
pub use paged::{PagedLifecycle, PagedProviderState, PagedRepositoryState};
pub use source::{MockPageSource, Page, PageCursor, PageSource};

pub use chatsync_store::ConnectionStatus;
