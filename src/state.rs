use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::config::Config;
use crate::gateway::{Gateway, OutboundEvent};
use crate::models::UserId;
use crate::models::profile::ProfileStore;
use crate::models::subscription::{DriverDetails, PendingInvite, SubscriptionTable};
use crate::observability::metrics::Metrics;
use crate::registry::OrderRegistry;

pub struct AppState {
    pub config: Config,
    pub registry: OrderRegistry,
    pub subscriptions: SubscriptionTable,
    pub profiles: ProfileStore,
    pub driver_details: DashMap<UserId, DriverDetails>,
    pub pending_invites: DashMap<UserId, PendingInvite>,
    pub gateway: Arc<dyn Gateway>,
    pub events_tx: broadcast::Sender<OutboundEvent>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(
        config: Config,
        gateway: Arc<dyn Gateway>,
        events_tx: broadcast::Sender<OutboundEvent>,
    ) -> Self {
        Self {
            config,
            registry: OrderRegistry::new(),
            subscriptions: SubscriptionTable::new(),
            profiles: ProfileStore::new(),
            driver_details: DashMap::new(),
            pending_invites: DashMap::new(),
            gateway,
            events_tx,
            metrics: Metrics::new(),
        }
    }
}
