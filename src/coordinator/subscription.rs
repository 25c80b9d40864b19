//! Driver entitlement: trial grants, the periodic expiry sweep, the
//! payment-approval workflow, and invite/join reconciliation.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::{Duration as TokioDuration, interval};
use tracing::{info, warn};
use uuid::Uuid;

use crate::coordinator::messages;
use crate::error::AppError;
use crate::gateway::{Action, best_effort};
use crate::models::subscription::{DriverDetails, PendingInvite, Subscription};
use crate::models::{ChatId, UserId};
use crate::state::AppState;

/// Membership states reported by the messaging surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberStatus {
    Left,
    Kicked,
    Restricted,
    Member,
    Administrator,
    Creator,
}

fn join_group_action(link: &str) -> Action {
    Action::new("Join the drivers' group", link)
}

fn submit_receipt_action(driver: UserId) -> Action {
    Action::new("Submit receipt", format!("receipt:{driver}"))
}

fn review_actions(driver: UserId) -> Vec<Action> {
    vec![
        Action::new("Approve", format!("approve:{driver}")),
        Action::new("Reject", format!("reject:{driver}")),
    ]
}

/// Onboarding handed us a qualified driver: store their profile and details,
/// start the trial window, and invite them into the group.
pub async fn complete_onboarding(
    state: &Arc<AppState>,
    driver: UserId,
    details: DriverDetails,
) -> Result<Subscription, AppError> {
    if state.subscriptions.get(driver).is_some() {
        return Err(AppError::WrongState);
    }

    state
        .profiles
        .upsert(driver, details.name.clone(), Some(details.phone.clone()));
    state.driver_details.insert(driver, details);

    let link = match state
        .gateway
        .create_invite(state.config.drivers_chat, &format!("driver-{driver}"), 1)
        .await
    {
        Ok(link) => link,
        Err(err) => {
            best_effort(
                "invite failure notice to driver",
                state
                    .gateway
                    .send_message(driver.into(), &messages::invite_failed_to_driver(), &[])
                    .await,
            );
            notify_admins(state, &messages::invite_failed_to_admin(driver, &err.to_string())).await;
            return Err(AppError::LinkMinting(err.to_string()));
        }
    };

    let invite_dm = state
        .gateway
        .send_message(
            driver.into(),
            &messages::trial_invite(state.config.trial_days),
            &[join_group_action(&link)],
        )
        .await?;

    let expires_at = Utc::now() + Duration::days(state.config.trial_days);
    if !state.subscriptions.grant_trial(driver, expires_at) {
        best_effort(
            "duplicate trial invite delete",
            state.gateway.delete_message(invite_dm).await,
        );
        return Err(AppError::WrongState);
    }

    state.pending_invites.insert(
        driver,
        PendingInvite {
            message: invite_dm,
            link,
        },
    );

    state.metrics.trials_granted_total.inc();
    info!(driver = %driver, %expires_at, "trial granted");
    Ok(Subscription::Trial { expires_at })
}

/// Runs for the process lifetime: evicts expired trials and purges stale
/// completed orders.
pub async fn run_expiry_sweep(state: Arc<AppState>) {
    info!(
        period_secs = state.config.sweep_interval_secs,
        "expiry sweep started"
    );
    let mut ticker = interval(TokioDuration::from_secs(state.config.sweep_interval_secs));
    ticker.tick().await; // first tick is immediate

    loop {
        ticker.tick().await;
        sweep_tick(&state).await;
    }
}

/// One pass of the sweep. The Trial -> WaitCheck flip happens atomically
/// before the first gateway call, so the tick is idempotent per driver and
/// an approval landing mid-tick is never overwritten afterwards.
pub async fn sweep_tick(state: &Arc<AppState>) {
    let now = Utc::now();

    for driver in state.subscriptions.expire_trials(now) {
        // Kick-then-unban: membership ends now, the door stays open for a
        // paid return.
        best_effort(
            "trial eviction kick",
            state
                .gateway
                .kick_member(state.config.drivers_chat, driver)
                .await,
        );
        best_effort(
            "trial eviction unban",
            state
                .gateway
                .unban_member(state.config.drivers_chat, driver)
                .await,
        );

        best_effort(
            "trial expiry notice",
            state
                .gateway
                .send_message(driver.into(), &messages::trial_expired_notice(), &[])
                .await,
        );
        best_effort(
            "payment prompt",
            state
                .gateway
                .send_message(
                    driver.into(),
                    &messages::payment_prompt(
                        &state.config.card_number,
                        &state.config.card_holder,
                        state.config.subscription_price,
                    ),
                    &[submit_receipt_action(driver)],
                )
                .await,
        );

        state.metrics.trial_evictions_total.inc();
        info!(driver = %driver, "trial expired, driver moved to payment collection");
    }

    let cutoff = now - Duration::hours(state.config.completed_ttl_hours);
    let purged = state.registry.purge_completed(cutoff);
    if purged > 0 {
        info!(purged, "purged stale completed orders");
    }
}

/// A receipt comes in from a driver awaiting payment review.
pub async fn submit_receipt(
    state: &Arc<AppState>,
    driver: UserId,
    attachment: Uuid,
) -> Result<(), AppError> {
    match state.subscriptions.get(driver) {
        Some(Subscription::WaitCheck { .. }) => {}
        _ => return Err(AppError::WrongState),
    }

    let details = state
        .driver_details
        .get(&driver)
        .map(|d| d.value().clone())
        .unwrap_or_else(|| DriverDetails {
            name: state
                .profiles
                .get(driver)
                .map(|p| p.name)
                .unwrap_or_else(|| "unknown".to_string()),
            vehicle_make: "unknown".to_string(),
            plate: "unknown".to_string(),
            phone: state.profiles.phone_of(driver).unwrap_or_else(|| "unknown".to_string()),
        });
    let caption = messages::receipt_caption(driver, &details, state.config.subscription_price);

    let review_msg = match state
        .gateway
        .send_attachment(
            state.config.payments_chat,
            attachment,
            &caption,
            &review_actions(driver),
        )
        .await
    {
        Ok(message) => message,
        Err(err) => {
            // The review surface is unreachable; route the receipt straight
            // to the admins and tell the driver to retry.
            warn!(driver = %driver, error = %err, "receipt forward failed, falling back to admin DMs");
            let with_note = format!("{caption}{}", messages::receipt_forward_failed_note());
            for admin in &state.config.admins {
                best_effort(
                    "receipt fallback to admin",
                    state
                        .gateway
                        .send_attachment((*admin).into(), attachment, &with_note, &[])
                        .await,
                );
            }
            notify_admins(
                state,
                &messages::receipt_forward_failed_alert(driver, &err.to_string()),
            )
            .await;
            return Err(err.into());
        }
    };

    state.subscriptions.set_review_message(driver, review_msg);

    best_effort(
        "receipt received notice",
        state
            .gateway
            .send_message(driver.into(), &messages::receipt_received(), &[])
            .await,
    );

    state.metrics.receipts_total.inc();
    info!(driver = %driver, "receipt forwarded for review");
    Ok(())
}

/// Admin approves a payment: invite first, then the state flip; nothing
/// changes when the link cannot be minted or the driver is unreachable.
pub async fn approve(
    state: &Arc<AppState>,
    driver: UserId,
    admin: UserId,
) -> Result<(), AppError> {
    if !state.config.is_admin(admin) {
        return Err(AppError::Unauthorized);
    }

    let link = state
        .gateway
        .create_invite(state.config.drivers_chat, &format!("driver-{driver}"), 1)
        .await
        .map_err(|err| AppError::LinkMinting(err.to_string()))?;

    let invite_dm = state
        .gateway
        .send_message(
            driver.into(),
            &messages::payment_approved(),
            &[join_group_action(&link)],
        )
        .await?;

    state.pending_invites.insert(
        driver,
        PendingInvite {
            message: invite_dm,
            link,
        },
    );

    // The overwrite clears any live trial atomically; a sweep tick running
    // right now no longer sees it.
    let previous = state.subscriptions.activate(driver, Utc::now());
    annotate_review(state, previous, driver, admin, "Approved").await;

    state.metrics.approvals_total.inc();
    info!(driver = %driver, admin = %admin, "payment approved, driver active");
    Ok(())
}

/// Admin rejects a payment: the driver stays in payment collection.
pub async fn reject(state: &Arc<AppState>, driver: UserId, admin: UserId) -> Result<(), AppError> {
    if !state.config.is_admin(admin) {
        return Err(AppError::Unauthorized);
    }

    best_effort(
        "rejection notice",
        state
            .gateway
            .send_message(driver.into(), &messages::payment_rejected(), &[])
            .await,
    );

    let current = state.subscriptions.get(driver);
    annotate_review(state, current, driver, admin, "Rejected").await;

    info!(driver = %driver, admin = %admin, "payment rejected");
    Ok(())
}

/// Someone just joined the drivers' group: if we were holding an invite DM
/// for them, retract it and say hello.
pub async fn membership_changed(
    state: &Arc<AppState>,
    group: ChatId,
    user: UserId,
    old: MemberStatus,
    new: MemberStatus,
) {
    if group != state.config.drivers_chat {
        return;
    }
    let was_out = matches!(old, MemberStatus::Left | MemberStatus::Kicked);
    let is_in = matches!(new, MemberStatus::Member | MemberStatus::Administrator);
    if !(was_out && is_in) {
        return;
    }

    let Some((_, invite)) = state.pending_invites.remove(&user) else {
        return;
    };

    best_effort(
        "invite DM retraction",
        state.gateway.delete_message(invite.message).await,
    );
    best_effort(
        "welcome note",
        state
            .gateway
            .send_message(user.into(), &messages::welcome_to_group(), &[])
            .await,
    );
    info!(user = %user, "join reconciled, invite cleared");
}

async fn annotate_review(
    state: &Arc<AppState>,
    record: Option<Subscription>,
    driver: UserId,
    admin: UserId,
    verdict: &str,
) {
    let Some(Subscription::WaitCheck {
        review_msg: Some(review),
    }) = record
    else {
        return;
    };

    let details = state.driver_details.get(&driver).map(|d| d.value().clone());
    let caption = match details {
        Some(details) => {
            messages::receipt_caption(driver, &details, state.config.subscription_price)
        }
        None => format!("Subscription payment from driver {driver}"),
    };
    let stamped = messages::review_stamp(
        &caption,
        verdict,
        admin,
        &Utc::now().format("%Y-%m-%d %H:%M").to_string(),
    );

    best_effort(
        "review message stamp",
        state.gateway.edit_message(review, &stamped, &[]).await,
    );
}

async fn notify_admins(state: &Arc<AppState>, text: &str) {
    for admin in &state.config.admins {
        best_effort(
            "admin alert",
            state.gateway.send_message((*admin).into(), text, &[]).await,
        );
    }
}
