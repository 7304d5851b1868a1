//! # Chatsync Store
//!
//! Versioned state store for chatsync.
//!
//! This crate provides:
//! - The canonical [`Store`] with per-signature version ordering
//! - Immutable [`State`] values published to consumers
//! - The state feed (broadcaster/listener protocol)
//! - [`Snapshotable`] conversions with bounded relationship prefetch
//! - [`ProgressCounter`] for bulk-operation completion tracking
//! - A pass-through persistence backing
//!
//! ## Key Invariants
//!
//! - All mutation flows through one commit section; merges never
//!   interleave
//! - Within one signature domain, versions only move forward
//! - A published `State` never reflects a half-applied mutation
//! - Listeners see states in production order, at most once each

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backing;
mod broadcast;
mod error;
mod progress;
mod snapshot;
mod state;
mod store;

pub use backing::{InMemoryBacking, StateBacking};
pub use broadcast::{StateFeed, Subscription, SubscriptionId};
pub use error::{StoreError, StoreResult};
pub use progress::{ProgressCounter, ProgressSummary};
pub use snapshot::{EntityGraph, Snapshotable};
pub use state::{ConnectionStatus, State};
pub use store::{ApplyResult, Store, StoreStats};
