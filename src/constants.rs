// Application-wide constants

/// Health-check defaults (applied when a group's `health_check` block omits a field).
pub mod health {
    pub const DEFAULT_PATH: &str = "/health";
    pub const DEFAULT_INTERVAL_MS: u64 = 30_000;
    pub const DEFAULT_SUCCEED_THRESHOLD: u32 = 2;
    pub const DEFAULT_FAILURE_THRESHOLD: u32 = 2;
    pub const PROBE_TIMEOUT_MS: u64 = 5_000;
    /// Bound on how long supervisor shutdown waits for in-flight probes.
    pub const SHUTDOWN_GRACE_MULTIPLE: u32 = 2;
}

/// Least-response-time policy tuning.
pub mod lrt {
    pub const TTFB_EWMA_ALPHA: f64 = 0.2;
}

/// Hot reload configuration
pub mod hot_reload {
    pub const CHANNEL_BUFFER_SIZE: usize = 32;
    pub const DEBOUNCE_DELAY_MS: u64 = 100;
}

/// Request-id header shared by the listener and the forwarder.
pub const REQUEST_ID_HEADER: &str = "x-request-id";
