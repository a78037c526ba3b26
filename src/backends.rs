//! Backend selection (§10.3): opens the Store/Queue/Event Stream
//! implementation named by `config.{store,queue,stream}.backend`, shared by
//! every long-lived process (`api`, `ingress`, `orchestrator`, `worker`).

use std::sync::Arc;

use tracing::info;

use crate::config::{Backend, Config};
use crate::events::{EventStream, local::LocalEventStream, managed::ManagedEventStream};
use crate::queue::{WorkQueue, local::LocalQueue, managed::ManagedQueue};
use crate::store::{StateStore, local::LocalStore, managed::ManagedStore};

pub type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub async fn open_store(config: &Config) -> Result<Arc<dyn StateStore>, AnyError> {
    match config.store.backend {
        Backend::Local => {
            info!(path = %config.store.fjall_path.display(), "opening local state store");
            Ok(Arc::new(LocalStore::open(&config.store.fjall_path)?))
        }
        Backend::Managed => {
            let dsn = config.store.managed_dsn.as_deref().ok_or("store.managed_dsn not set")?;
            info!("connecting to managed state store");
            Ok(Arc::new(ManagedStore::connect(dsn).await?))
        }
    }
}

pub async fn open_queue(config: &Config) -> Result<Arc<dyn WorkQueue>, AnyError> {
    match config.queue.backend {
        Backend::Local => {
            info!(path = %config.queue.fjall_path.display(), "opening local work queue");
            Ok(Arc::new(LocalQueue::open(&config.queue.fjall_path)?))
        }
        Backend::Managed => {
            let dsn = config.queue.managed_dsn.as_deref().ok_or("queue.managed_dsn not set")?;
            info!("connecting to managed work queue");
            Ok(Arc::new(ManagedQueue::connect(dsn).await?))
        }
    }
}

pub async fn open_stream(config: &Config) -> Result<Arc<dyn EventStream>, AnyError> {
    match config.stream.backend {
        Backend::Local => {
            info!(path = %config.stream.fjall_path.display(), "opening local event stream");
            Ok(Arc::new(LocalEventStream::open(&config.stream.fjall_path)?))
        }
        Backend::Managed => {
            let dsn = config.stream.managed_dsn.as_deref().ok_or("stream.managed_dsn not set")?;
            info!("connecting to managed event stream");
            Ok(Arc::new(ManagedEventStream::connect(dsn).await?))
        }
    }
}
