use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::gateway::MessageRef;
use crate::models::UserId;

/// Entitlement state for one driver. Absent from the table means no
/// entitlement at all (payment required, no prompt issued yet).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Subscription {
    Trial {
        expires_at: DateTime<Utc>,
    },
    Active {
        since: DateTime<Utc>,
    },
    /// Trial lapsed (or none granted); waiting for a payment receipt.
    /// `review_msg` is set once a receipt has been forwarded for review.
    WaitCheck {
        review_msg: Option<MessageRef>,
    },
}

/// Driver details captured by the onboarding flow, used for trial grants and
/// receipt captions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverDetails {
    pub name: String,
    pub vehicle_make: String,
    pub plate: String,
    pub phone: String,
}

/// An invite DM awaiting reconciliation with an observed group join.
#[derive(Debug, Clone)]
pub struct PendingInvite {
    pub message: MessageRef,
    pub link: String,
}

/// The subscription table. Transition rules: Trial -> Active only via admin
/// approval, Trial -> WaitCheck only via the expiry sweep, and no path from
/// WaitCheck back to Trial.
#[derive(Default)]
pub struct SubscriptionTable {
    records: DashMap<UserId, Subscription>,
}

impl SubscriptionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, driver: UserId) -> Option<Subscription> {
        self.records.get(&driver).map(|r| r.value().clone())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records a trial for a driver with no existing record. Returns false if
    /// any record is already present.
    pub fn grant_trial(&self, driver: UserId, expires_at: DateTime<Utc>) -> bool {
        use dashmap::mapref::entry::Entry;

        match self.records.entry(driver) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(Subscription::Trial { expires_at });
                true
            }
        }
    }

    /// Flips every trial expired before `now` to WaitCheck and returns the
    /// affected drivers. Check and flip happen under the entry's write lock,
    /// so a record converted to Active in the meantime is left alone and the
    /// sweep never writes state after yielding control.
    pub fn expire_trials(&self, now: DateTime<Utc>) -> Vec<UserId> {
        let candidates: Vec<UserId> = self
            .records
            .iter()
            .filter_map(|entry| match entry.value() {
                Subscription::Trial { expires_at } if *expires_at <= now => Some(*entry.key()),
                _ => None,
            })
            .collect();

        candidates
            .into_iter()
            .filter(|driver| {
                match self.records.get_mut(driver) {
                    Some(mut record) => match record.value() {
                        Subscription::Trial { expires_at } if *expires_at <= now => {
                            *record.value_mut() = Subscription::WaitCheck { review_msg: None };
                            true
                        }
                        _ => false,
                    },
                    None => false,
                }
            })
            .collect()
    }

    /// Puts a driver into the payment-collection state. An Active record is
    /// never downgraded; there is no sanctioned Active -> WaitCheck path.
    pub fn set_wait_check(&self, driver: UserId) {
        use dashmap::mapref::entry::Entry;

        match self.records.entry(driver) {
            Entry::Occupied(mut slot) => {
                if !matches!(slot.get(), Subscription::Active { .. }) {
                    slot.insert(Subscription::WaitCheck { review_msg: None });
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(Subscription::WaitCheck { review_msg: None });
            }
        }
    }

    /// Attaches the payments-review message to a WaitCheck record. Returns
    /// false when the driver is not awaiting a check.
    pub fn set_review_message(&self, driver: UserId, message: MessageRef) -> bool {
        match self.records.get_mut(&driver) {
            Some(mut record) => match record.value_mut() {
                Subscription::WaitCheck { review_msg } => {
                    *review_msg = Some(message);
                    true
                }
                _ => false,
            },
            None => false,
        }
    }

    /// Activates a driver, overwriting whatever record existed. The
    /// overwrite is what clears a live trial atomically with respect to the
    /// expiry sweep. Returns the previous record.
    pub fn activate(&self, driver: UserId, since: DateTime<Utc>) -> Option<Subscription> {
        self.records.insert(driver, Subscription::Active { since })
    }
}
