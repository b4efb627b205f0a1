use tracing::{debug, warn};

use crate::gateway::LogGateway;

/// Rewrite the log once it has taken `threshold` appends since the last rewrite.
/// Returns true if a compaction ran.
pub async fn compact_if_due(gateway: &LogGateway, threshold: u64) -> bool {
    let appends = gateway.appends_since_compact().await;
    if appends < threshold.max(1) {
        debug!("compaction not due: {appends}/{threshold} appends");
        return false;
    }
    match gateway.compact().await {
        Ok(()) => {
            metrics::counter!(crate::observability::WAL_COMPACTIONS_TOTAL).increment(1);
            true
        }
        Err(e) => {
            // Old log is still intact; try again next time.
            warn!("compaction after {appends} appends failed: {e}");
            false
        }
    }
}
