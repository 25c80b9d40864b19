//! Milestone reminders for accepted orders: one-shot timers at fixed offsets
//! before the requested time, owned by the order's registry entry.

use std::sync::Arc;

use chrono::{Local, NaiveDateTime, NaiveTime};
use tokio::time::{Duration, sleep};
use tracing::debug;

use crate::coordinator::messages;
use crate::error::AppError;
use crate::gateway::best_effort;
use crate::models::UserId;
use crate::models::order::OrderStatus;
use crate::state::AppState;

/// Offsets in seconds before the event moment, largest first.
pub const MILESTONES: [(i64, &str); 4] = [
    (3600, "1 hour left"),
    (1800, "30 minutes left"),
    (900, "15 minutes left"),
    (0, "Time to go"),
];

pub fn parse_hhmm(raw: &str) -> Result<NaiveTime, AppError> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map_err(|_| AppError::BadRequest(format!("time must be HH:MM, got {raw:?}")))
}

/// Seconds until today's occurrence of `when`. A clock time already past is
/// treated as "now", so only the due-now milestone remains schedulable.
pub fn seconds_to_event(when: NaiveTime, now: NaiveDateTime) -> i64 {
    let target = now.date().and_time(when);
    (target - now).num_seconds().max(0)
}

/// Delay per milestone, skipping any that would fire late.
pub fn milestone_delays(seconds_to_event: i64) -> Vec<(u64, &'static str)> {
    MILESTONES
        .iter()
        .filter_map(|(offset, label)| {
            let delay = seconds_to_event - offset;
            if delay < 0 {
                None
            } else {
                Some((delay as u64, *label))
            }
        })
        .collect()
}

/// Cancels any previous timer set for the order and builds a fresh one. Safe
/// to call on every transition into `accepted`; a no-op for orders in any
/// other state.
pub fn schedule(state: &Arc<AppState>, customer: UserId) {
    state.registry.cancel_reminders(customer);

    let Some(order) = state.registry.get(customer) else {
        return;
    };
    if order.status != OrderStatus::Accepted {
        return;
    }
    let Some(driver) = order.driver else {
        return;
    };
    let Ok(when) = parse_hhmm(&order.when) else {
        // The submit handler validated this; an unparsable time here means a
        // bug upstream, not something to crash a timer over.
        tracing::error!(customer = %customer, when = %order.when, "unparsable order time");
        return;
    };

    let seconds = seconds_to_event(when, Local::now().naive_local());
    let delays = milestone_delays(seconds);
    debug!(customer = %customer, driver = %driver, count = delays.len(), "scheduling reminders");

    let handles = delays
        .into_iter()
        .map(|(delay, label)| {
            let gateway = state.gateway.clone();
            let metrics = state.metrics.clone();
            let text = messages::reminder(label, &order);
            tokio::spawn(async move {
                if delay > 0 {
                    sleep(Duration::from_secs(delay)).await;
                }
                best_effort(
                    "driver reminder",
                    gateway.send_message(driver.into(), &text, &[]).await,
                );
                metrics.reminders_fired_total.inc();
            })
        })
        .collect::<Vec<_>>();

    state
        .metrics
        .reminders_scheduled_total
        .inc_by(handles.len() as u64);
    state.registry.attach_reminders(customer, handles);
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime};

    use super::{milestone_delays, parse_hhmm, seconds_to_event};

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn now(h: u32, m: u32) -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 8, 26).unwrap().and_time(at(h, m))
    }

    #[test]
    fn an_hour_out_schedules_all_four_milestones() {
        let seconds = seconds_to_event(at(19, 0), now(18, 0));
        assert_eq!(seconds, 3600);

        let delays = milestone_delays(seconds);
        assert_eq!(
            delays,
            vec![
                (0, "1 hour left"),
                (1800, "30 minutes left"),
                (2700, "15 minutes left"),
                (3600, "Time to go"),
            ]
        );
    }

    #[test]
    fn a_past_time_fires_only_the_due_now_notice() {
        let seconds = seconds_to_event(at(10, 0), now(18, 0));
        assert_eq!(seconds, 0);

        let delays = milestone_delays(seconds);
        assert_eq!(delays, vec![(0, "Time to go")]);
    }

    #[test]
    fn twenty_minutes_out_skips_the_longer_offsets() {
        let seconds = seconds_to_event(at(18, 20), now(18, 0));
        assert_eq!(seconds, 1200);

        let delays = milestone_delays(seconds);
        assert_eq!(delays, vec![(300, "15 minutes left"), (1200, "Time to go")]);
    }

    #[test]
    fn hhmm_parsing_accepts_valid_and_rejects_garbage() {
        assert!(parse_hhmm("19:00").is_ok());
        assert!(parse_hhmm(" 07:05 ").is_ok());
        assert!(parse_hhmm("25:00").is_err());
        assert!(parse_hhmm("19.00").is_err());
        assert!(parse_hhmm("soon").is_err());
    }
}
