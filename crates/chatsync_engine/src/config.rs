//! Configuration for backfill and population runs.

/// Configuration for an engine-driven collection.
///
/// No retry knobs live here: retry and backoff belong to the transport
/// collaborator behind the page source.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Name of the logical collection, used in logs.
    pub collection: String,
    /// Requested page size for backfill fetches.
    pub page_size: u32,
    /// Maximum number of rooms populated concurrently.
    pub max_parallel_rooms: usize,
}

impl EngineConfig {
    /// Creates a configuration for the named collection.
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            page_size: 100,
            max_parallel_rooms: 4,
        }
    }

    /// Sets the requested page size.
    #[must_use]
    pub fn with_page_size(mut self, size: u32) -> Self {
        self.page_size = size;
        self
    }

    /// Sets the room population parallelism.
    #[must_use]
    pub fn with_max_parallel_rooms(mut self, parallelism: usize) -> Self {
        self.max_parallel_rooms = parallelism.max(1);
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new("rooms")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder() {
        let config = EngineConfig::new("messages")
            .with_page_size(25)
            .with_max_parallel_rooms(2);
        assert_eq!(config.collection, "messages");
        assert_eq!(config.page_size, 25);
        assert_eq!(config.max_parallel_rooms, 2);
    }

    #[test]
    fn parallelism_is_at_least_one() {
        let config = EngineConfig::default().with_max_parallel_rooms(0);
        assert_eq!(config.max_parallel_rooms, 1);
    }
}
