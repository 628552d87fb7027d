pub mod routes;
pub mod state;

use std::sync::Arc;

use barbe_common::config::AppConfig;
use barbe_engine::{CleanupSweep, NotificationDispatcher};
use barbe_notifier::{DisabledPush, OwnerNotifier, PushDelivery, WebPushSender};
use barbe_store::StoreClient;

use crate::state::AppState;

/// Wire every component from one loaded configuration.
pub fn build_state(config: AppConfig) -> AppState {
    let store = StoreClient::new(&config);
    let owner = OwnerNotifier::new(&config, store.clone());

    let push: Arc<dyn PushDelivery> = match (&config.vapid_private_key, config.push_enabled()) {
        (Some(private_key), true) => Arc::new(WebPushSender::new(
            private_key.clone(),
            config.vapid_subject.clone(),
        )),
        _ => Arc::new(DisabledPush),
    };

    let dispatcher = Arc::new(NotificationDispatcher::new(
        store.clone(),
        push,
        owner.clone(),
        &config,
    ));
    let cleanup = Arc::new(CleanupSweep::new(store.clone()));

    AppState::new(store, dispatcher, cleanup, owner, config)
}
