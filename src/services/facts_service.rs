use crate::{
    dao::models::{NewPlayerFact, PlayerFact},
    dto::facts::FactRequest,
    error::ServiceError,
    state::SharedState,
};

/// Player facts, newest first.
pub async fn list_facts(state: &SharedState) -> Vec<PlayerFact> {
    state.reconciler().player_facts().await
}

/// Attach a fact to a player, replacing the previous one.
pub async fn save_fact(
    state: &SharedState,
    request: FactRequest,
) -> Result<PlayerFact, ServiceError> {
    let fact = NewPlayerFact::now(request.player_name.trim(), request.fact.trim());
    state.reconciler().save_player_fact(fact).await
}

/// Remove the fact attached to a player.
pub async fn delete_fact(state: &SharedState, player_name: &str) -> Result<(), ServiceError> {
    state.reconciler().delete_player_fact(player_name).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_state;

    fn request(name: &str, fact: &str) -> FactRequest {
        FactRequest {
            player_name: name.into(),
            fact: fact.into(),
        }
    }

    #[tokio::test]
    async fn facts_are_trimmed_and_upserted() {
        let (state, harness) = test_state();
        state.reconciler().refresh().await;

        save_fact(&state, request(" Emma ", "hates bogeys")).await.unwrap();
        let saved = save_fact(&state, request("Emma", " loves birdies ")).await.unwrap();

        assert_eq!(saved.fact, "loves birdies");
        assert!(saved.id.is_some());
        let facts = list_facts(&state).await;
        assert_eq!(facts.len(), 1);
        assert_eq!(harness.store.facts().len(), 1);
    }

    #[tokio::test]
    async fn deleting_an_unknown_fact_is_not_found() {
        let (state, _harness) = test_state();
        state.reconciler().refresh().await;
        save_fact(&state, request("Emma", "hates bogeys")).await.unwrap();

        delete_fact(&state, "Emma").await.unwrap();

        assert!(matches!(
            delete_fact(&state, "Emma").await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(list_facts(&state).await.is_empty());
    }
}
