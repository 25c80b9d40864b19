use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::task::JoinHandle;

use crate::error::AppError;
use crate::gateway::MessageRef;
use crate::models::UserId;
use crate::models::order::{Order, OrderStatus};

struct OrderEntry {
    order: Order,
    reminders: Vec<JoinHandle<()>>,
}

impl OrderEntry {
    fn cancel_reminders(&mut self) {
        // Aborting a finished task is a no-op, so this can race a firing
        // reminder without harm.
        for task in self.reminders.drain(..) {
            task.abort();
        }
    }
}

/// The authoritative table of active orders, keyed by customer. All methods
/// are synchronous: handlers check-and-flip here before their first await,
/// which is what serializes concurrent claims on the same order.
#[derive(Default)]
pub struct OrderRegistry {
    entries: DashMap<UserId, OrderEntry>,
}

impl OrderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, customer: UserId) -> Option<Order> {
        self.entries.get(&customer).map(|e| e.value().order.clone())
    }

    /// Registers a fresh order. A completed previous order is superseded; an
    /// order still open or claimed blocks the new one.
    pub fn insert(&self, order: Order) -> Result<(), AppError> {
        debug_assert!(order.invariants_hold());

        if let Some(mut existing) = self.entries.get_mut(&order.customer) {
            if existing.order.status != OrderStatus::Completed {
                return Err(AppError::WrongState);
            }
            existing.cancel_reminders();
            existing.order = order;
            return Ok(());
        }

        self.entries.insert(
            order.customer,
            OrderEntry {
                order,
                reminders: Vec::new(),
            },
        );
        Ok(())
    }

    /// The accept flip: open -> accepted with the driver recorded, atomically
    /// with respect to other claims. Returns a snapshot for the messaging
    /// that follows.
    pub fn claim(&self, customer: UserId, driver: UserId) -> Result<Order, AppError> {
        let mut entry = self
            .entries
            .get_mut(&customer)
            .ok_or_else(|| AppError::NotFound(format!("order {customer} not found")))?;

        if entry.order.status != OrderStatus::Open {
            return Err(AppError::AlreadyClaimed);
        }

        entry.order.status = OrderStatus::Accepted;
        entry.order.driver = Some(driver);
        debug_assert!(entry.order.invariants_hold());
        Ok(entry.order.clone())
    }

    /// Compensation for a claim whose required driver notification never
    /// arrived: the order goes back to the claimable pool.
    pub fn rollback_claim(&self, customer: UserId, driver: UserId) {
        if let Some(mut entry) = self.entries.get_mut(&customer) {
            if entry.order.status == OrderStatus::Accepted && entry.order.driver == Some(driver) {
                entry.cancel_reminders();
                entry.order.status = OrderStatus::Open;
                entry.order.driver = None;
                entry.order.driver_info_msg = None;
                entry.order.customer_info_msg = None;
            }
        }
    }

    /// accepted -> completed, by the assigned driver only. Reminders die with
    /// the transition.
    pub fn complete(&self, customer: UserId, driver: UserId) -> Result<Order, AppError> {
        let mut entry = self
            .entries
            .get_mut(&customer)
            .ok_or_else(|| AppError::NotFound(format!("order {customer} not found")))?;

        if entry.order.status != OrderStatus::Accepted {
            return Err(AppError::WrongState);
        }
        if entry.order.driver != Some(driver) {
            return Err(AppError::NotAssignedDriver);
        }

        entry.cancel_reminders();
        entry.order.status = OrderStatus::Completed;
        entry.order.completed_at = Some(Utc::now());
        debug_assert!(entry.order.invariants_hold());
        Ok(entry.order.clone())
    }

    /// Driver walked away: accepted -> open with the driver cleared. The
    /// order stays in the registry and is claimable again. Returns the
    /// pre-reset snapshot so the caller can clean up its messages.
    pub fn reopen(&self, customer: UserId, driver: UserId) -> Result<Order, AppError> {
        let mut entry = self
            .entries
            .get_mut(&customer)
            .ok_or_else(|| AppError::NotFound(format!("order {customer} not found")))?;

        if entry.order.status != OrderStatus::Accepted {
            return Err(AppError::WrongState);
        }
        if entry.order.driver != Some(driver) {
            return Err(AppError::NotAssignedDriver);
        }

        entry.cancel_reminders();
        let before = entry.order.clone();
        entry.order.status = OrderStatus::Open;
        entry.order.driver = None;
        entry.order.driver_info_msg = None;
        entry.order.customer_info_msg = None;
        debug_assert!(entry.order.invariants_hold());
        Ok(before)
    }

    /// Full removal (customer or admin cancellation). Reminders are cancelled
    /// with the entry.
    pub fn remove(&self, customer: UserId) -> Option<Order> {
        self.entries.remove(&customer).map(|(_, mut entry)| {
            entry.cancel_reminders();
            entry.order
        })
    }

    /// Records a rating: completed orders only, owner only, exactly once.
    /// Returns the snapshot with the clamped score applied.
    pub fn rate(&self, customer: UserId, rater: UserId, score: u8) -> Result<Order, AppError> {
        let mut entry = self
            .entries
            .get_mut(&customer)
            .ok_or_else(|| AppError::NotFound(format!("order {customer} not found")))?;

        if rater != customer {
            return Err(AppError::Unauthorized);
        }
        if entry.order.status != OrderStatus::Completed {
            return Err(AppError::WrongState);
        }
        if entry.order.rating.is_some() {
            return Err(AppError::AlreadyRated);
        }

        entry.order.rating = Some(score.clamp(1, 5));
        Ok(entry.order.clone())
    }

    pub fn set_board_msg(&self, customer: UserId, message: MessageRef) {
        if let Some(mut entry) = self.entries.get_mut(&customer) {
            entry.order.board_msg = Some(message);
        }
    }

    pub fn set_info_msgs(
        &self,
        customer: UserId,
        driver_info: Option<MessageRef>,
        customer_info: Option<MessageRef>,
    ) {
        if let Some(mut entry) = self.entries.get_mut(&customer) {
            entry.order.driver_info_msg = driver_info;
            entry.order.customer_info_msg = customer_info;
        }
    }

    pub fn set_rating_msg(&self, customer: UserId, message: Option<MessageRef>) {
        if let Some(mut entry) = self.entries.get_mut(&customer) {
            entry.order.rating_msg = message;
        }
    }

    pub fn clear_customer_info_msg(&self, customer: UserId) {
        if let Some(mut entry) = self.entries.get_mut(&customer) {
            entry.order.customer_info_msg = None;
        }
    }

    /// Replaces the reminder set for an accepted order. Anything previously
    /// scheduled is cancelled first; handles for an order no longer accepted
    /// are aborted on the spot.
    pub fn attach_reminders(&self, customer: UserId, handles: Vec<JoinHandle<()>>) {
        match self.entries.get_mut(&customer) {
            Some(mut entry) if entry.order.status == OrderStatus::Accepted => {
                entry.cancel_reminders();
                entry.reminders = handles;
            }
            _ => {
                for task in handles {
                    task.abort();
                }
            }
        }
    }

    pub fn cancel_reminders(&self, customer: UserId) {
        if let Some(mut entry) = self.entries.get_mut(&customer) {
            entry.cancel_reminders();
        }
    }

    pub fn live_reminder_count(&self, customer: UserId) -> usize {
        self.entries
            .get(&customer)
            .map(|entry| {
                entry
                    .reminders
                    .iter()
                    .filter(|task| !task.is_finished())
                    .count()
            })
            .unwrap_or(0)
    }

    /// Drops completed orders older than the cutoff. Unrated completed orders
    /// are covered too; this is the retention policy for the registry.
    pub fn purge_completed(&self, cutoff: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| {
            !(entry.order.status == OrderStatus::Completed
                && entry.order.completed_at.is_some_and(|at| at < cutoff))
        });
        before - self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::OrderRegistry;
    use crate::error::AppError;
    use crate::models::UserId;
    use crate::models::order::{DeliveryScope, Order, OrderStatus};

    fn order(customer: i64) -> Order {
        Order::new(
            UserId(customer),
            DeliveryScope::IntraCity,
            "Van".into(),
            "Market St 1".into(),
            "Harbor Rd 9".into(),
            "19:00".into(),
        )
    }

    #[test]
    fn second_claim_observes_already_claimed() {
        let registry = OrderRegistry::new();
        registry.insert(order(1)).unwrap();

        assert!(registry.claim(UserId(1), UserId(10)).is_ok());
        assert!(matches!(
            registry.claim(UserId(1), UserId(11)),
            Err(AppError::AlreadyClaimed)
        ));

        let snapshot = registry.get(UserId(1)).unwrap();
        assert_eq!(snapshot.driver, Some(UserId(10)));
    }

    #[test]
    fn driver_is_set_iff_claimed_or_finished() {
        let registry = OrderRegistry::new();
        registry.insert(order(1)).unwrap();
        assert!(registry.get(UserId(1)).unwrap().invariants_hold());

        registry.claim(UserId(1), UserId(10)).unwrap();
        assert!(registry.get(UserId(1)).unwrap().invariants_hold());

        registry.complete(UserId(1), UserId(10)).unwrap();
        let snapshot = registry.get(UserId(1)).unwrap();
        assert!(snapshot.invariants_hold());
        assert_eq!(snapshot.status, OrderStatus::Completed);
    }

    #[test]
    fn only_assigned_driver_completes() {
        let registry = OrderRegistry::new();
        registry.insert(order(1)).unwrap();
        registry.claim(UserId(1), UserId(10)).unwrap();

        assert!(matches!(
            registry.complete(UserId(1), UserId(11)),
            Err(AppError::NotAssignedDriver)
        ));
    }

    #[test]
    fn reopen_clears_driver_and_allows_new_claim() {
        let registry = OrderRegistry::new();
        registry.insert(order(1)).unwrap();
        registry.claim(UserId(1), UserId(10)).unwrap();

        registry.reopen(UserId(1), UserId(10)).unwrap();
        let snapshot = registry.get(UserId(1)).unwrap();
        assert_eq!(snapshot.status, OrderStatus::Open);
        assert_eq!(snapshot.driver, None);

        assert!(registry.claim(UserId(1), UserId(11)).is_ok());
    }

    #[test]
    fn removed_order_cannot_be_claimed() {
        let registry = OrderRegistry::new();
        registry.insert(order(1)).unwrap();
        registry.remove(UserId(1)).unwrap();

        assert!(matches!(
            registry.claim(UserId(1), UserId(10)),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn rating_is_owner_only_and_exactly_once() {
        let registry = OrderRegistry::new();
        registry.insert(order(1)).unwrap();
        registry.claim(UserId(1), UserId(10)).unwrap();
        registry.complete(UserId(1), UserId(10)).unwrap();

        assert!(matches!(
            registry.rate(UserId(1), UserId(10), 5),
            Err(AppError::Unauthorized)
        ));

        let rated = registry.rate(UserId(1), UserId(1), 9).unwrap();
        assert_eq!(rated.rating, Some(5));

        assert!(matches!(
            registry.rate(UserId(1), UserId(1), 2),
            Err(AppError::AlreadyRated)
        ));
        assert_eq!(registry.get(UserId(1)).unwrap().rating, Some(5));
    }

    #[test]
    fn rating_requires_completed_state() {
        let registry = OrderRegistry::new();
        registry.insert(order(1)).unwrap();

        assert!(matches!(
            registry.rate(UserId(1), UserId(1), 4),
            Err(AppError::WrongState)
        ));
    }

    #[test]
    fn open_order_blocks_resubmission_but_completed_is_superseded() {
        let registry = OrderRegistry::new();
        registry.insert(order(1)).unwrap();
        assert!(matches!(registry.insert(order(1)), Err(AppError::WrongState)));

        registry.claim(UserId(1), UserId(10)).unwrap();
        registry.complete(UserId(1), UserId(10)).unwrap();
        assert!(registry.insert(order(1)).is_ok());
        assert_eq!(registry.get(UserId(1)).unwrap().status, OrderStatus::Open);
    }

    #[tokio::test]
    async fn reminders_attach_only_while_accepted() {
        let registry = OrderRegistry::new();
        registry.insert(order(1)).unwrap();

        let stray = tokio::spawn(async {
            tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
        });
        registry.attach_reminders(UserId(1), vec![stray]);
        tokio::task::yield_now().await;
        assert_eq!(registry.live_reminder_count(UserId(1)), 0);

        registry.claim(UserId(1), UserId(10)).unwrap();
        let task = tokio::spawn(async {
            tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
        });
        registry.attach_reminders(UserId(1), vec![task]);
        assert_eq!(registry.live_reminder_count(UserId(1)), 1);

        registry.complete(UserId(1), UserId(10)).unwrap();
        assert_eq!(registry.live_reminder_count(UserId(1)), 0);
    }

    #[test]
    fn purge_drops_only_stale_completed_orders() {
        let registry = OrderRegistry::new();
        registry.insert(order(1)).unwrap();
        registry.insert(order(2)).unwrap();
        registry.claim(UserId(2), UserId(10)).unwrap();
        registry.complete(UserId(2), UserId(10)).unwrap();

        assert_eq!(registry.purge_completed(Utc::now() - Duration::hours(1)), 0);
        assert_eq!(registry.purge_completed(Utc::now() + Duration::hours(1)), 1);
        assert!(registry.get(UserId(1)).is_some());
        assert!(registry.get(UserId(2)).is_none());
    }
}
