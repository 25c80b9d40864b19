use std::env;

use crate::error::AppError;
use crate::models::{ChatId, UserId};

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    /// Group where open orders are posted and claimed.
    pub drivers_chat: ChatId,
    /// Surface receiving rating audit lines.
    pub ratings_chat: ChatId,
    /// Surface receiving payment receipts for review.
    pub payments_chat: ChatId,
    pub admins: Vec<UserId>,
    pub trial_days: i64,
    pub sweep_interval_secs: u64,
    /// Completed orders older than this are purged by the sweep.
    pub completed_ttl_hours: i64,
    pub card_number: String,
    pub card_holder: String,
    pub subscription_price: u64,
    pub event_buffer_size: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            drivers_chat: ChatId(parse_or_default("DRIVERS_CHAT_ID", -100_100)?),
            ratings_chat: ChatId(parse_or_default("RATINGS_CHAT_ID", -100_200)?),
            payments_chat: ChatId(parse_or_default("PAYMENTS_CHAT_ID", -100_300)?),
            admins: parse_admins(&env::var("ADMIN_IDS").unwrap_or_default())?,
            trial_days: parse_or_default("TRIAL_DAYS", 7)?,
            sweep_interval_secs: parse_or_default("SWEEP_INTERVAL_SECS", 3600)?,
            completed_ttl_hours: parse_or_default("COMPLETED_TTL_HOURS", 24)?,
            card_number: env::var("CARD_NUMBER").unwrap_or_else(|_| "0000 0000 0000 0000".into()),
            card_holder: env::var("CARD_HOLDER").unwrap_or_else(|_| "DISPATCH ADMIN".into()),
            subscription_price: parse_or_default("SUBSCRIPTION_PRICE", 99_000)?,
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", 1024)?,
        })
    }

    pub fn is_admin(&self, user: UserId) -> bool {
        self.admins.contains(&user)
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}

fn parse_admins(raw: &str) -> Result<Vec<UserId>, AppError> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<i64>()
                .map(UserId)
                .map_err(|err| AppError::Internal(format!("invalid ADMIN_IDS entry {part}: {err}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::parse_admins;
    use crate::models::UserId;

    #[test]
    fn admin_list_parses_with_whitespace() {
        let admins = parse_admins(" 1, 42 ,7 ").unwrap();
        assert_eq!(admins, vec![UserId(1), UserId(42), UserId(7)]);
    }

    #[test]
    fn empty_admin_list_is_ok() {
        assert!(parse_admins("").unwrap().is_empty());
    }
}
