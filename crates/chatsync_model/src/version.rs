//! Version signatures and the ordering contract for mutations.

use crate::id::RoomId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Version counter scoped to one signature domain.
///
/// Versions are monotonically increasing within a single
/// `VersionSignature` value; they carry no meaning across domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(pub u64);

impl Version {
    /// Creates a new version.
    #[must_use]
    pub const fn new(v: u64) -> Self {
        Self(v)
    }

    /// Returns the raw version value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the next version.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v:{}", self.0)
    }
}

/// Classifies why a piece of state changed.
///
/// Each distinct signature value is an independent ordering domain: the
/// store tracks a separate last-accepted `Version` per signature it has
/// seen. Two signatures are comparable only if identical, including any
/// embedded room ID; equality and hashing are structural.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VersionSignature {
    /// No signature was attached to the mutation source.
    Unsigned,
    /// Initial bulk load of state.
    InitialState,
    /// The local user was added to a room.
    AddedToRoom(RoomId),
    /// The local user was removed from a room.
    RemovedFromRoom(RoomId),
    /// A room's content changed (attributes, messages, membership).
    RoomUpdated(RoomId),
    /// A room was deleted.
    RoomDeleted(RoomId),
    /// A read cursor moved within a room.
    ReadStateUpdated(RoomId),
    /// The session's subscription set changed.
    SubscriptionStateUpdated,
}

impl VersionSignature {
    /// Returns the room embedded in this signature, if any.
    #[must_use]
    pub fn room(&self) -> Option<&RoomId> {
        match self {
            VersionSignature::AddedToRoom(id)
            | VersionSignature::RemovedFromRoom(id)
            | VersionSignature::RoomUpdated(id)
            | VersionSignature::RoomDeleted(id)
            | VersionSignature::ReadStateUpdated(id) => Some(id),
            VersionSignature::Unsigned
            | VersionSignature::InitialState
            | VersionSignature::SubscriptionStateUpdated => None,
        }
    }

    /// Returns true if accepting this signature removes the local user
    /// or the room itself from the store.
    #[must_use]
    pub fn is_removal(&self) -> bool {
        matches!(
            self,
            VersionSignature::RemovedFromRoom(_) | VersionSignature::RoomDeleted(_)
        )
    }
}

impl fmt::Display for VersionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionSignature::Unsigned => write!(f, "unsigned"),
            VersionSignature::InitialState => write!(f, "initial-state"),
            VersionSignature::AddedToRoom(id) => write!(f, "added-to-room({id})"),
            VersionSignature::RemovedFromRoom(id) => write!(f, "removed-from-room({id})"),
            VersionSignature::RoomUpdated(id) => write!(f, "room-updated({id})"),
            VersionSignature::RoomDeleted(id) => write!(f, "room-deleted({id})"),
            VersionSignature::ReadStateUpdated(id) => write!(f, "read-state-updated({id})"),
            VersionSignature::SubscriptionStateUpdated => write!(f, "subscription-state-updated"),
        }
    }
}

/// Contract implemented by any mutation source.
///
/// The store consults `signature()` to pick the ordering domain and
/// `version()` to decide acceptance within it.
pub trait Versionable {
    /// The version of this mutation within its signature domain.
    fn version(&self) -> Version;

    /// The signature domain this mutation belongs to.
    fn signature(&self) -> &VersionSignature;
}
