//! Progress reporting for transaction submission

use alloy::primitives::{Address, B256};
use std::fmt;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusUpdate {
    Simulating { to: Address },
    SimulationFailed { to: Address, reason: String },
    Submitted { hash: B256 },
    Confirmed { hash: B256, block_number: Option<u64> },
    BatchStep { index: usize, total: usize },
}

impl fmt::Display for StatusUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusUpdate::Simulating { to } => write!(f, "Simulating call to {}", to),
            StatusUpdate::SimulationFailed { to, reason } => {
                write!(f, "Simulation of call to {} failed: {}", to, reason)
            }
            StatusUpdate::Submitted { hash } => write!(f, "Transaction submitted: {}", hash),
            StatusUpdate::Confirmed { hash, block_number } => match block_number {
                Some(block) => write!(f, "Transaction {} confirmed in block {}", hash, block),
                None => write!(f, "Transaction {} confirmed", hash),
            },
            StatusUpdate::BatchStep { index, total } => {
                write!(f, "Sending transaction {}/{}", index + 1, total)
            }
        }
    }
}

/// Receives progress updates from send paths
pub trait StatusSink: Send + Sync {
    fn update(&self, status: StatusUpdate);
}

/// Default sink: logs every update at info level
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingStatusSink;

impl StatusSink for TracingStatusSink {
    fn update(&self, status: StatusUpdate) {
        info!("{}", status);
    }
}

struct FnSink<F>(F);

impl<F> StatusSink for FnSink<F>
where
    F: Fn(StatusUpdate) + Send + Sync,
{
    fn update(&self, status: StatusUpdate) {
        (self.0)(status)
    }
}

/// Wrap a closure as a sink, e.g. to forward updates to a UI channel.
pub fn status_fn<F>(f: F) -> Arc<dyn StatusSink>
where
    F: Fn(StatusUpdate) + Send + Sync + 'static,
{
    Arc::new(FnSink(f))
}

pub(crate) fn default_sink() -> Arc<dyn StatusSink> {
    Arc::new(TracingStatusSink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_status_fn_forwards_updates() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let seen = seen.clone();
            status_fn(move |s| seen.lock().unwrap().push(s))
        };

        sink.update(StatusUpdate::BatchStep { index: 0, total: 2 });
        sink.update(StatusUpdate::Submitted { hash: B256::ZERO });

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].to_string(), "Sending transaction 1/2");
    }
}
