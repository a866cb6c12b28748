//! Simulator error types

/// Errors raised while assembling or running a simulation.
#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum SimError {
    // Setup errors
    #[error("configuration error: {0}")]
    Config(String),

    #[error("topology error: {0}")]
    Topology(String),

    /// A drawn content has no owning source node. Raised at workload time,
    /// never during event processing: content placement assigns every
    /// content exactly one source before the run starts.
    #[error("content {0} has no source node")]
    NoSource(u64),

    // Engine errors
    /// A strategy was handed a packet kind it has no transition for
    /// (e.g. a cache-service completion reaching a strategy that never
    /// enqueues cache operations).
    #[error("invalid packet kind '{0}' for this strategy")]
    InvalidPacketKind(String),

    #[error("pop from empty event queue")]
    EmptyQueue,

    // IO / serialisation
    #[error("I/O error: {0}")]
    Io(String),

    #[error("JSON error: {0}")]
    Json(String),
}

impl SimError {
    /// Whether this error arises while assembling a scenario rather than
    /// while dispatching events.
    ///
    /// Setup errors abort the run with a single-line diagnostic. Engine
    /// errors indicate a scheduling or strategy fault and propagate as-is;
    /// no event is ever silently dropped.
    pub fn is_setup(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::Topology(_) | Self::NoSource(_)
        )
    }
}

impl From<std::io::Error> for SimError {
    fn from(err: std::io::Error) -> Self {
        SimError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for SimError {
    fn from(err: serde_json::Error) -> Self {
        SimError::Json(err.to_string())
    }
}

/// Result type alias for simulator operations
pub type Result<T> = std::result::Result<T, SimError>;
