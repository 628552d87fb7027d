//! Shared application state for the Axum API server.

use std::sync::Arc;

use barbe_common::config::AppConfig;
use barbe_engine::{CleanupSweep, NotificationDispatcher};
use barbe_notifier::OwnerNotifier;
use barbe_store::StoreClient;

/// Application state shared across all route handlers via Axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub store: StoreClient,
    pub dispatcher: Arc<NotificationDispatcher>,
    pub cleanup: Arc<CleanupSweep>,
    pub owner: OwnerNotifier,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(
        store: StoreClient,
        dispatcher: Arc<NotificationDispatcher>,
        cleanup: Arc<CleanupSweep>,
        owner: OwnerNotifier,
        config: AppConfig,
    ) -> Self {
        Self {
            store,
            dispatcher,
            cleanup,
            owner,
            config,
        }
    }
}
