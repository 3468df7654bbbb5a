//! Allocation service configuration.

use thiserror::Error;

pub const STOCK_RECIPIENT_VAR: &str = "ALLOCATION_STOCK_RECIPIENT";
pub const CONFLICT_RETRIES_VAR: &str = "ALLOCATION_CONFLICT_RETRIES";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationConfig {
    /// Address out-of-stock notifications are sent to.
    pub stock_notification_recipient: String,
    /// How many times `AllocationService::allocate` re-runs after a
    /// concurrency conflict.
    pub conflict_retries: u32,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            stock_notification_recipient: "stock@made.com".to_string(),
            conflict_retries: 3,
        }
    }
}

impl AllocationConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source; unset variables keep their
    /// defaults.
    pub fn from_lookup<L>(lookup: L) -> Result<Self, ConfigError>
    where
        L: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(recipient) = lookup(STOCK_RECIPIENT_VAR) {
            let recipient = recipient.trim();
            if recipient.is_empty() {
                return Err(ConfigError::Invalid {
                    name: STOCK_RECIPIENT_VAR,
                    reason: "must not be empty".to_string(),
                });
            }
            config.stock_notification_recipient = recipient.to_string();
        }

        if let Some(retries) = lookup(CONFLICT_RETRIES_VAR) {
            config.conflict_retries =
                retries
                    .trim()
                    .parse()
                    .map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
                        name: CONFLICT_RETRIES_VAR,
                        reason: e.to_string(),
                    })?;
        }

        Ok(config)
    }

    pub fn with_conflict_retries(mut self, retries: u32) -> Self {
        self.conflict_retries = retries;
        self
    }
}
