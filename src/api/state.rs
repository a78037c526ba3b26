use std::sync::Arc;

use crate::config::Config;
use crate::events::EventStream;
use crate::observability::Metrics;
use crate::queue::WorkQueue;
use crate::storage::StorageClient;
use crate::store::StateStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn StateStore>,
    pub queue: Arc<dyn WorkQueue>,
    pub stream: Arc<dyn EventStream>,
    pub storage: Arc<StorageClient>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn StateStore>,
        queue: Arc<dyn WorkQueue>,
        stream: Arc<dyn EventStream>,
        storage: StorageClient,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            queue,
            stream,
            storage: Arc::new(storage),
            metrics,
        }
    }
}
