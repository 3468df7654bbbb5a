//! Outbound notifications.
//!
//! Delivery is at-most-once per event occurrence: a failed send is reported
//! to the caller and never retried here.

use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::warn;

use allocation_core::Sku;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("notification delivery failed: {0}")]
    Delivery(String),
}

pub fn out_of_stock_subject(sku: &Sku) -> String {
    format!("Out of stock for {sku}")
}

/// Sends notifications to people outside the system.
pub trait Notifier: Send + Sync {
    fn send_out_of_stock_notification(&self, sku: &Sku) -> Result<(), NotificationError>;
}

impl<N> Notifier for Arc<N>
where
    N: Notifier + ?Sized,
{
    fn send_out_of_stock_notification(&self, sku: &Sku) -> Result<(), NotificationError> {
        (**self).send_out_of_stock_notification(sku)
    }
}

/// Emits each notification as a structured tracing event.
#[derive(Debug, Clone)]
pub struct LogNotifier {
    recipient: String,
}

impl LogNotifier {
    pub fn new(recipient: impl Into<String>) -> Self {
        Self {
            recipient: recipient.into(),
        }
    }
}

impl Notifier for LogNotifier {
    fn send_out_of_stock_notification(&self, sku: &Sku) -> Result<(), NotificationError> {
        warn!(
            recipient = %self.recipient,
            sku = %sku,
            subject = %out_of_stock_subject(sku),
            "out of stock notification"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub recipient: String,
    pub subject: String,
}

/// Records notifications instead of sending them (tests/dev).
#[derive(Debug)]
pub struct InMemoryNotifier {
    recipient: String,
    sent: Mutex<Vec<Notification>>,
}

impl InMemoryNotifier {
    pub fn new(recipient: impl Into<String>) -> Self {
        Self {
            recipient: recipient.into(),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Snapshot of everything sent so far.
    pub fn sent(&self) -> Vec<Notification> {
        match self.sent.lock() {
            Ok(sent) => sent.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Notifier for InMemoryNotifier {
    fn send_out_of_stock_notification(&self, sku: &Sku) -> Result<(), NotificationError> {
        let mut sent = self
            .sent
            .lock()
            .map_err(|_| NotificationError::Delivery("notifier lock poisoned".to_string()))?;
        sent.push(Notification {
            recipient: self.recipient.clone(),
            subject: out_of_stock_subject(sku),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_recipient_and_subject() {
        let notifier = InMemoryNotifier::new("stock@made.com");
        notifier
            .send_out_of_stock_notification(&"POPULAR-CURTAINS".parse().unwrap())
            .unwrap();

        assert_eq!(
            notifier.sent(),
            vec![Notification {
                recipient: "stock@made.com".to_string(),
                subject: "Out of stock for POPULAR-CURTAINS".to_string(),
            }]
        );
    }

    #[test]
    fn log_notifier_always_succeeds() {
        let notifier: Arc<dyn Notifier> = Arc::new(LogNotifier::new("stock@made.com"));
        assert!(notifier.send_out_of_stock_notification(&"LAMP".parse().unwrap()).is_ok());
    }
}
