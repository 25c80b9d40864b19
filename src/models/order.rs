use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::gateway::MessageRef;
use crate::models::UserId;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeliveryScope {
    IntraCity,
    InterCity { region: String },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OrderStatus {
    Open,
    Accepted,
    Completed,
}

/// An active delivery order. One per customer; the registry entry that wraps
/// it owns the live reminder task handles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub customer: UserId,
    pub scope: DeliveryScope,
    pub vehicle: String,
    pub pickup: String,
    pub dropoff: String,
    /// Requested wall-clock time, normalized `HH:MM`, interpreted against
    /// the current day.
    pub when: String,
    pub status: OrderStatus,
    pub driver: Option<UserId>,
    pub board_msg: Option<MessageRef>,
    pub driver_info_msg: Option<MessageRef>,
    pub customer_info_msg: Option<MessageRef>,
    pub rating_msg: Option<MessageRef>,
    pub rating: Option<u8>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Order {
    pub fn new(
        customer: UserId,
        scope: DeliveryScope,
        vehicle: String,
        pickup: String,
        dropoff: String,
        when: String,
    ) -> Self {
        Self {
            customer,
            scope,
            vehicle,
            pickup,
            dropoff,
            when,
            status: OrderStatus::Open,
            driver: None,
            board_msg: None,
            driver_info_msg: None,
            customer_info_msg: None,
            rating_msg: None,
            rating: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// `driver` is set exactly while the order is claimed or finished.
    pub fn invariants_hold(&self) -> bool {
        match self.status {
            OrderStatus::Open => self.driver.is_none(),
            OrderStatus::Accepted | OrderStatus::Completed => self.driver.is_some(),
        }
    }
}
