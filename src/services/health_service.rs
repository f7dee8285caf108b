use crate::{dto::health::HealthResponse, state::SharedState};

/// Check the game store and report whether it answered.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    state.reconciler().check_connectivity().await.into()
}
