//! Order lifecycle: submit, accept, complete, rate, cancel. Every handler
//! does its authoritative check-and-flip on the registry before the first
//! gateway call, so concurrent actions on the same order serialize cleanly.

use std::sync::Arc;

use tracing::info;

use crate::coordinator::{messages, reminders};
use crate::error::AppError;
use crate::gateway::{Action, best_effort};
use crate::models::UserId;
use crate::models::order::{DeliveryScope, Order, OrderStatus};
use crate::state::AppState;

const CLAIMED_NOTE: &str = "Status: CLAIMED";
const COMPLETED_NOTE: &str = "Status: COMPLETED";

fn claim_action(customer: UserId) -> Action {
    Action::new("Claim", format!("accept:{customer}"))
}

fn cancel_action(customer: UserId) -> Action {
    Action::new("Cancel order", format!("cancel:{customer}"))
}

fn complete_action(customer: UserId) -> Action {
    Action::new("Complete order", format!("complete:{customer}"))
}

fn rating_actions(customer: UserId) -> Vec<Action> {
    (1..=5)
        .map(|score| Action::new(score.to_string(), format!("rate:{customer}:{score}")))
        .collect()
}

fn customer_name(state: &AppState, customer: UserId) -> String {
    state
        .profiles
        .get(customer)
        .map(|p| p.name)
        .unwrap_or_else(|| "Customer".to_string())
}

/// Finalized draft from the conversational layer becomes a live order on the
/// dispatch board.
pub async fn submit_order(
    state: &Arc<AppState>,
    customer: UserId,
    scope: DeliveryScope,
    vehicle: String,
    pickup: String,
    dropoff: String,
    when: String,
) -> Result<Order, AppError> {
    let profile = state
        .profiles
        .get(customer)
        .ok_or_else(|| AppError::NotFound(format!("profile {customer} not found")))?;
    if profile.phone.is_none() {
        return Err(AppError::BadRequest(
            "customer has no phone number on file".to_string(),
        ));
    }

    let when = reminders::parse_hhmm(&when)?.format("%H:%M").to_string();
    let order = Order::new(customer, scope, vehicle, pickup, dropoff, when);
    state.registry.insert(order.clone())?;

    let board_text = messages::board_post(&order, &profile.name, None);
    let board_msg = match state
        .gateway
        .send_message(state.config.drivers_chat, &board_text, &[claim_action(customer)])
        .await
    {
        Ok(message) => message,
        Err(err) => {
            // An order nobody can see is not an order.
            state.registry.remove(customer);
            return Err(err.into());
        }
    };
    state.registry.set_board_msg(customer, board_msg);

    best_effort(
        "order confirmation",
        state
            .gateway
            .send_message(
                customer.into(),
                &messages::order_submitted(),
                &[cancel_action(customer)],
            )
            .await,
    );

    state.metrics.open_orders.inc();
    state
        .metrics
        .actions_total
        .with_label_values(&["submit", "ok"])
        .inc();
    info!(customer = %customer, "order posted to dispatch board");
    state
        .registry
        .get(customer)
        .ok_or_else(|| AppError::Internal("order vanished after submit".to_string()))
}

/// A driver claims an open order. The status flip happens before any
/// messaging; if the required driver notification cannot be delivered the
/// claim is rolled back and the order returns to the pool.
pub async fn accept(
    state: &Arc<AppState>,
    customer: UserId,
    driver: UserId,
) -> Result<Order, AppError> {
    if state.registry.get(customer).is_none() {
        return Err(AppError::NotFound(format!("order {customer} not found")));
    }

    if state.profiles.phone_of(driver).is_none() {
        best_effort(
            "phone prompt",
            state
                .gateway
                .send_message(driver.into(), &messages::phone_needed(), &[])
                .await,
        );
        return Err(AppError::DriverNotOnboarded);
    }

    let order = state.registry.claim(customer, driver)?;

    let cust_name = customer_name(state, customer);
    let cust_phone = state
        .profiles
        .phone_of(customer)
        .unwrap_or_else(|| "unknown".to_string());

    let driver_msg = match state
        .gateway
        .send_message(
            driver.into(),
            &messages::driver_assigned(&order, &cust_name, &cust_phone),
            &[complete_action(customer), cancel_action(customer)],
        )
        .await
    {
        Ok(message) => message,
        Err(err) => {
            state.registry.rollback_claim(customer, driver);
            state
                .metrics
                .actions_total
                .with_label_values(&["accept", "rolled_back"])
                .inc();
            return Err(err.into());
        }
    };

    if let Some(board) = order.board_msg {
        best_effort(
            "board post claim edit",
            state
                .gateway
                .edit_message(
                    board,
                    &messages::board_post(&order, &cust_name, Some(CLAIMED_NOTE)),
                    &[],
                )
                .await,
        );
    }

    let driver_profile = state.profiles.get(driver);
    let (drv_name, drv_phone) = match driver_profile {
        Some(p) => (p.name, p.phone.unwrap_or_else(|| "unknown".to_string())),
        None => ("Driver".to_string(), "unknown".to_string()),
    };
    let customer_msg = best_effort(
        "customer driver-found notice",
        state
            .gateway
            .send_message(
                customer.into(),
                &messages::customer_driver_found(&drv_name, &drv_phone),
                &[cancel_action(customer)],
            )
            .await,
    );

    state
        .registry
        .set_info_msgs(customer, Some(driver_msg), customer_msg);

    reminders::schedule(state, customer);

    state.metrics.open_orders.dec();
    state
        .metrics
        .actions_total
        .with_label_values(&["accept", "ok"])
        .inc();
    info!(customer = %customer, driver = %driver, "order claimed");
    state
        .registry
        .get(customer)
        .ok_or_else(|| AppError::Internal("order vanished after accept".to_string()))
}

/// The assigned driver marks the order done; the customer gets a rating
/// prompt in exchange for their now-stale assignment notice.
pub async fn complete(
    state: &Arc<AppState>,
    customer: UserId,
    driver: UserId,
) -> Result<Order, AppError> {
    let order = state.registry.complete(customer, driver)?;

    if let Some(driver_info) = order.driver_info_msg {
        best_effort(
            "driver info strip",
            state.gateway.clear_actions(driver_info).await,
        );
    }

    if let Some(board) = order.board_msg {
        let cust_name = customer_name(state, customer);
        best_effort(
            "board post completion edit",
            state
                .gateway
                .edit_message(
                    board,
                    &messages::board_post(&order, &cust_name, Some(COMPLETED_NOTE)),
                    &[],
                )
                .await,
        );
    }

    if let Some(customer_info) = order.customer_info_msg {
        best_effort(
            "stale assignment notice delete",
            state.gateway.delete_message(customer_info).await,
        );
        state.registry.clear_customer_info_msg(customer);
    }

    let rating_msg = best_effort(
        "rating prompt",
        state
            .gateway
            .send_message(
                customer.into(),
                &messages::rating_prompt(),
                &rating_actions(customer),
            )
            .await,
    );
    state.registry.set_rating_msg(customer, rating_msg);

    state
        .metrics
        .actions_total
        .with_label_values(&["complete", "ok"])
        .inc();
    info!(customer = %customer, driver = %driver, "order completed");
    state
        .registry
        .get(customer)
        .ok_or_else(|| AppError::Internal("order vanished after completion".to_string()))
}

/// The owning customer rates a completed order, once.
pub async fn rate(
    state: &Arc<AppState>,
    customer: UserId,
    rater: UserId,
    score: u8,
) -> Result<Order, AppError> {
    let order = state.registry.rate(customer, rater, score)?;
    let recorded = order.rating.unwrap_or(score.clamp(1, 5));

    if let Some(rating_msg) = order.rating_msg {
        best_effort(
            "rating prompt strip",
            state.gateway.clear_actions(rating_msg).await,
        );
    }

    best_effort(
        "rating thanks",
        state
            .gateway
            .send_message(customer.into(), &messages::rating_thanks(recorded), &[])
            .await,
    );

    let cust_name = customer_name(state, customer);
    best_effort(
        "rating audit line",
        state
            .gateway
            .send_message(
                state.config.ratings_chat,
                &messages::rating_audit(customer, &cust_name, recorded),
                &[],
            )
            .await,
    );

    state
        .metrics
        .actions_total
        .with_label_values(&["rate", "ok"])
        .inc();
    info!(customer = %customer, score = recorded, "order rated");
    Ok(order)
}

/// Who cancelled decides what happens: the customer or an admin removes the
/// order outright, the assigned driver returns it to the pool.
pub async fn cancel(
    state: &Arc<AppState>,
    customer: UserId,
    caller: UserId,
) -> Result<(), AppError> {
    let order = state
        .registry
        .get(customer)
        .ok_or_else(|| AppError::NotFound(format!("order {customer} not found")))?;

    if order.status == OrderStatus::Completed {
        return Err(AppError::AlreadyFinalized);
    }

    if caller == customer {
        remove_and_notify(
            state,
            customer,
            &messages::cancelled_by_customer_to_driver(),
            &messages::cancelled_by_customer_to_customer(),
        )
        .await;
        state
            .metrics
            .actions_total
            .with_label_values(&["cancel", "customer"])
            .inc();
        info!(customer = %customer, "order cancelled by customer");
        return Ok(());
    }

    if order.driver == Some(caller) {
        let before = state.registry.reopen(customer, caller)?;

        if let Some(customer_info) = before.customer_info_msg {
            best_effort(
                "stale assignment notice delete",
                state.gateway.delete_message(customer_info).await,
            );
        }
        best_effort(
            "driver-cancel notice to customer",
            state
                .gateway
                .send_message(
                    customer.into(),
                    &messages::cancelled_by_driver_to_customer(),
                    &[],
                )
                .await,
        );
        if let Some(board) = before.board_msg {
            let cust_name = customer_name(state, customer);
            let reopened = state.registry.get(customer).unwrap_or(before.clone());
            best_effort(
                "board post reopen edit",
                state
                    .gateway
                    .edit_message(
                        board,
                        &messages::board_post(&reopened, &cust_name, None),
                        &[claim_action(customer)],
                    )
                    .await,
            );
        }
        if let Some(driver_info) = before.driver_info_msg {
            best_effort(
                "driver info strip",
                state.gateway.clear_actions(driver_info).await,
            );
        }

        state.metrics.open_orders.inc();
        state
            .metrics
            .actions_total
            .with_label_values(&["cancel", "driver"])
            .inc();
        info!(customer = %customer, driver = %caller, "order returned to pool by driver");
        return Ok(());
    }

    if state.config.is_admin(caller) {
        remove_and_notify(
            state,
            customer,
            &messages::cancelled_by_admin_to_driver(),
            &messages::cancelled_by_admin_to_customer(),
        )
        .await;
        state
            .metrics
            .actions_total
            .with_label_values(&["cancel", "admin"])
            .inc();
        info!(customer = %customer, admin = %caller, "order cancelled by admin");
        return Ok(());
    }

    Err(AppError::Unauthorized)
}

async fn remove_and_notify(
    state: &Arc<AppState>,
    customer: UserId,
    driver_text: &str,
    customer_text: &str,
) {
    let Some(order) = state.registry.remove(customer) else {
        return;
    };
    if order.status == OrderStatus::Open {
        state.metrics.open_orders.dec();
    }

    if let Some(board) = order.board_msg {
        best_effort(
            "board post delete",
            state.gateway.delete_message(board).await,
        );
    }
    if let Some(driver) = order.driver {
        best_effort(
            "cancel notice to driver",
            state
                .gateway
                .send_message(driver.into(), driver_text, &[])
                .await,
        );
    }
    best_effort(
        "cancel notice to customer",
        state
            .gateway
            .send_message(customer.into(), customer_text, &[])
            .await,
    );
}
