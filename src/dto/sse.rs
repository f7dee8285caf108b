use serde::Serialize;
use utoipa::ToSchema;

use crate::{dto::phase::VisibleGamePhase, services::reconciler::Connectivity};

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    /// Event name; unnamed events reach `message` listeners.
    pub event: Option<String>,
    /// Payload, usually JSON.
    pub data: String,
}

impl ServerEvent {
    /// Build an event carrying a raw text payload.
    pub fn new<E>(event: E, data: String) -> Self
    where
        E: Into<Option<String>>,
    {
        Self {
            event: event.into(),
            data,
        }
    }

    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Initial metadata sent to an SSE client when it connects.
pub struct Handshake {
    /// Human-readable message confirming the subscription.
    pub message: String,
    /// Whether the game store is currently unreachable.
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Broadcast whenever the game phase changes.
pub struct PhaseChangedEvent {
    /// Visible phase.
    pub phase: VisibleGamePhase,
    /// Round being scored, if any.
    pub current_round: Option<u8>,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the game store becomes reachable or unreachable.
pub struct ConnectivityEvent {
    /// New connectivity state.
    pub connectivity: Connectivity,
}
