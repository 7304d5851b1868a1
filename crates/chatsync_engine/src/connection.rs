//! Real-time collection lifecycle, driven by store deliveries and the
//! transport collaborator's connection signal.

use chatsync_store::ConnectionStatus;
use parking_lot::RwLock;
use tracing::debug;

/// Lifecycle of a real-time collection, as the engine tracks it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RealTimeRepositoryState {
    /// Registered, waiting for the first state delivery.
    Initializing,
    /// Receiving live updates over an established connection.
    Online,
    /// The underlying connection is down or reconnecting.
    Degraded,
}

/// The two-state lifecycle exposed to consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RealTimeProviderState {
    /// Live updates are flowing.
    Connected,
    /// Updates may be missing or delayed.
    Degraded,
}

impl From<RealTimeRepositoryState> for RealTimeProviderState {
    fn from(state: RealTimeRepositoryState) -> Self {
        match state {
            RealTimeRepositoryState::Online => RealTimeProviderState::Connected,
            RealTimeRepositoryState::Initializing | RealTimeRepositoryState::Degraded => {
                RealTimeProviderState::Degraded
            }
        }
    }
}

/// Tracks one real-time collection's lifecycle.
///
/// `Initializing → Online` happens on the first state delivery after
/// registration; after that, `Online ↔ Degraded` follows the connection
/// signal alone, independent of what the delivered states contain.
#[derive(Debug)]
pub struct RealTimeTracker {
    state: RwLock<RealTimeRepositoryState>,
}

impl RealTimeTracker {
    /// Creates a tracker in `Initializing`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: RwLock::new(RealTimeRepositoryState::Initializing),
        }
    }

    /// Records a successful state delivery.
    pub fn on_state_delivered(&self) {
        let mut state = self.state.write();
        if *state == RealTimeRepositoryState::Initializing {
            debug!("real-time collection online after first delivery");
            *state = RealTimeRepositoryState::Online;
        }
    }

    /// Records a connection status change from the transport.
    pub fn on_connection_status(&self, status: ConnectionStatus) {
        let mut state = self.state.write();
        match (*state, status) {
            (RealTimeRepositoryState::Online, ConnectionStatus::Connecting)
            | (RealTimeRepositoryState::Online, ConnectionStatus::Disconnected) => {
                debug!(?status, "real-time collection degraded");
                *state = RealTimeRepositoryState::Degraded;
            }
            (RealTimeRepositoryState::Degraded, ConnectionStatus::Connected) => {
                debug!("real-time collection back online");
                *state = RealTimeRepositoryState::Online;
            }
            // Initializing waits for the first delivery regardless of
            // connection churn.
            _ => {}
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> RealTimeRepositoryState {
        *self.state.read()
    }

    /// Consumer-facing lifecycle state.
    #[must_use]
    pub fn provider_state(&self) -> RealTimeProviderState {
        RealTimeProviderState::from(self.state())
    }
}

impl Default for RealTimeTracker {
    fn default() -> Self {
        Self::new()
    }
}
