use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Envelope for an event travelling through one dispatch pass.
///
/// Notes:
/// - `dispatch_id` is shared by the starting event and every event it cascades into.
/// - `position` is the order in which the event entered the queue (starting event = 0).
/// - `caused_by` is the position of the event whose handling produced this one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<E> {
    dispatch_id: Uuid,
    position: u64,
    caused_by: Option<u64>,
    payload: E,
}

impl<E> Envelope<E> {
    /// Envelope for the event that starts a dispatch pass.
    pub fn origin(dispatch_id: Uuid, payload: E) -> Self {
        Self {
            dispatch_id,
            position: 0,
            caused_by: None,
            payload,
        }
    }

    /// Envelope for an event produced while handling the event at `caused_by`.
    pub fn cascaded(dispatch_id: Uuid, position: u64, caused_by: u64, payload: E) -> Self {
        Self {
            dispatch_id,
            position,
            caused_by: Some(caused_by),
            payload,
        }
    }

    pub fn dispatch_id(&self) -> Uuid {
        self.dispatch_id
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn caused_by(&self) -> Option<u64> {
        self.caused_by
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }
}
