//! Fetch cache statistics

/// Statistics for fetch cache operations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchStats {
    /// Requests served from fresh data
    pub hits: u64,
    /// Requests served from stale data while refreshing
    pub stale_hits: u64,
    /// Requests that had to wait for the transport
    pub misses: u64,
    /// Transport calls started
    pub transport_calls: u64,
    /// Requests that joined an in-flight call
    pub coalesced: u64,
    /// Transport calls that failed
    pub failures: u64,
    /// Results discarded because the entry was invalidated mid-flight
    pub dropped_results: u64,
    /// Waiters that cancelled or timed out
    pub cancellations: u64,
    /// Current number of entries
    pub size: usize,
}

impl FetchStats {
    /// Calculate hit ratio (0.0 to 1.0), counting stale hits as hits
    pub fn hit_ratio(&self) -> f64 {
        let total = self.total_requests();
        if total == 0 {
            0.0
        } else {
            (self.hits + self.stale_hits) as f64 / total as f64
        }
    }

    /// Total requests (hits + stale hits + misses)
    pub fn total_requests(&self) -> u64 {
        self.hits + self.stale_hits + self.misses
    }

    /// Requests that did not cause a transport call of their own
    pub fn saved_calls(&self) -> u64 {
        self.hits + self.coalesced
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_stats() {
        let stats = FetchStats::default();
        assert_eq!(stats.total_requests(), 0);
        assert_eq!(stats.hit_ratio(), 0.0);
    }

    #[test]
    fn test_hit_ratio() {
        let stats = FetchStats {
            hits: 70,
            stale_hits: 10,
            misses: 20,
            ..Default::default()
        };
        assert!((stats.hit_ratio() - 0.8).abs() < f64::EPSILON);
        assert_eq!(stats.total_requests(), 100);
    }

    #[test]
    fn test_saved_calls() {
        let stats = FetchStats {
            hits: 5,
            coalesced: 9,
            ..Default::default()
        };
        assert_eq!(stats.saved_calls(), 14);
    }
}
