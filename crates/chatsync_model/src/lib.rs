//! # Chatsync Model
//!
//! Chat domain model for chatsync.
//!
//! This crate provides:
//! - Entity identifiers (`RoomId`, `UserId`, `MessageId`)
//! - Version signatures and the `Versionable` ordering contract
//! - Chat entities (`Room`, `User`, `Message`, `ReadCursor`, `PresenceRecord`)
//! - The closed `MutationPayload` union and the `Mutation` envelope
//! - Immutable snapshot value types handed to consumers
//!
//! This is a pure data crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod entity;
mod id;
mod mutation;
mod snapshot;
mod version;

pub use entity::{Message, Metadata, PresenceRecord, ReadCursor, Room, User};
pub use id::{MessageId, RoomId, UserId};
pub use mutation::{InvalidMutation, Mutation, MutationPayload};
pub use snapshot::{
    MessageSnapshot, PresenceSnapshot, ReadCursorSnapshot, RoomSnapshot, UserSnapshot,
};
pub use version::{Version, VersionSignature, Versionable};
