//! Worker lifecycle for the single-process daemon

use async_trait::async_trait;
use bbtimer_host_api::{HostResult, WorkerHost};
use tracing::info;

/// The daemon is its own only client, so superseding and claiming
/// reduce to logging.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalWorkerHost;

#[async_trait]
impl WorkerHost for LocalWorkerHost {
    async fn skip_waiting(&self) -> HostResult<()> {
        info!("New cache generation takes over immediately");
        Ok(())
    }

    async fn claim_clients(&self) -> HostResult<()> {
        info!("Clients now served by the active generation");
        Ok(())
    }
}
