use serde::Serialize;
use utoipa::ToSchema;

use crate::services::reconciler::Connectivity;

/// Simple health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: String,
}

impl HealthResponse {
    /// Create a health response indicating the system is operational.
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }

    /// Create a health response indicating the game store cannot be reached.
    pub fn degraded() -> Self {
        Self {
            status: "degraded".to_string(),
        }
    }
}

impl From<Connectivity> for HealthResponse {
    fn from(value: Connectivity) -> Self {
        match value {
            Connectivity::Connected => Self::ok(),
            Connectivity::Disconnected => Self::degraded(),
        }
    }
}
