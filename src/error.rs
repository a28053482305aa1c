use thiserror::Error;

/// An external process failed to come up. Fatal to the startup phase it
/// occurred in, but never to the cleanup of processes that did start.
#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("failed to launch {label}: {source}")]
    Io {
        label: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{label} did not accept connections at {addr} within {timeout:?}")]
    NeverReady {
        label: String,
        addr: String,
        timeout: std::time::Duration,
    },
}

/// Failure of a single JSON-RPC call. `Transport` and `Rpc` stay separate so
/// a scenario driving a negative path can tell a well-formed error envelope
/// from a dead connection.
#[derive(Debug, Error)]
pub enum RpcClientError {
    #[error("transport failure calling {url}: {reason}")]
    Transport { url: String, reason: String },

    #[error("rpc error response: {payload}")]
    Rpc { payload: String },
}

/// Aggregated termination failures from a teardown sweep. Reported for
/// diagnostics only; never raised past the teardown boundary.
#[derive(Debug, Error)]
#[error("failed to terminate {} process(es): {}", .failures.len(), .failures.join("; "))]
pub struct CleanupError {
    pub failures: Vec<String>,
}
