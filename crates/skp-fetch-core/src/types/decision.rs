//! Staleness decision type

use std::fmt;

/// Outcome of the staleness policy for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decision {
    /// Return cached data, no transport call
    Serve,
    /// Return cached data and refresh it in the background
    ServeAndRefresh,
    /// Wait for a new value from the transport
    Refetch,
}

impl Decision {
    /// Check if cached data is returned immediately
    pub fn serves_cached(&self) -> bool {
        matches!(self, Decision::Serve | Decision::ServeAndRefresh)
    }

    /// Check if a transport call may be started
    pub fn needs_transport(&self) -> bool {
        matches!(self, Decision::ServeAndRefresh | Decision::Refetch)
    }

    /// Get decision as string label
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Serve => "serve",
            Decision::ServeAndRefresh => "serve_and_refresh",
            Decision::Refetch => "refetch",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
