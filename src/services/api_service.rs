//! The `/api` storage surface, served straight from the local store.

use crate::{
    dao::models::{GameRecord, NewGameRecord, NewPlayerFact, PlayerFact, sort_by_date_desc},
    error::ServiceError,
    state::{
        SharedState,
        grid::{MAX_PLAYERS, MIN_PLAYERS, ROUND_COUNT},
    },
};

/// Every stored game, newest first.
pub async fn list_games(state: &SharedState) -> Result<Vec<GameRecord>, ServiceError> {
    let mut games = state.api_store().list_games().await?;
    sort_by_date_desc(&mut games);
    Ok(games)
}

/// One stored game.
pub async fn get_game(state: &SharedState, id: String) -> Result<GameRecord, ServiceError> {
    state
        .api_store()
        .find_game(id.clone())
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("game `{id}` not found")))
}

/// Record a finished game. Identity fields are filled when absent.
pub async fn create_game(
    state: &SharedState,
    game: NewGameRecord,
) -> Result<GameRecord, ServiceError> {
    validate_game(&game)?;
    Ok(state.api_store().save_game(game).await?)
}

/// Every stored fact, newest first.
pub async fn list_facts(state: &SharedState) -> Result<Vec<PlayerFact>, ServiceError> {
    Ok(state.api_store().list_player_facts().await?)
}

/// Insert or replace the fact for a player.
pub async fn upsert_fact(
    state: &SharedState,
    fact: NewPlayerFact,
) -> Result<PlayerFact, ServiceError> {
    if fact.player_name.trim().is_empty() {
        return Err(ServiceError::InvalidInput(
            "playerName must not be empty".into(),
        ));
    }
    Ok(state.api_store().save_player_fact(fact).await?)
}

/// Remove the fact for a player.
pub async fn delete_fact(state: &SharedState, player_name: String) -> Result<(), ServiceError> {
    if state
        .api_store()
        .delete_player_fact(player_name.clone())
        .await?
    {
        Ok(())
    } else {
        Err(ServiceError::NotFound(format!(
            "no fact for player `{player_name}`"
        )))
    }
}

fn validate_game(game: &NewGameRecord) -> Result<(), ServiceError> {
    let players = game.player_names.len();
    if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&players) {
        return Err(ServiceError::InvalidInput(format!(
            "a game needs 2 to 6 players, got {players}"
        )));
    }
    if game.scores.len() != ROUND_COUNT || game.scores.iter().any(|row| row.len() != players) {
        return Err(ServiceError::InvalidInput(
            "scores must hold 9 rounds with one cell per player".into(),
        ));
    }
    if game.final_totals.len() != players {
        return Err(ServiceError::InvalidInput(
            "finalTotals must hold one total per player".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{game, test_state};

    #[test]
    fn game_shape_is_checked() {
        assert!(validate_game(&game(None)).is_ok());

        let mut short = game(None);
        short.scores.pop();
        assert!(validate_game(&short).is_err());

        let mut solo = game(None);
        solo.player_names.truncate(1);
        assert!(validate_game(&solo).is_err());

        let mut totals = game(None);
        totals.final_totals.push(0);
        assert!(validate_game(&totals).is_err());
    }

    #[tokio::test]
    async fn unknown_game_and_fact_are_not_found() {
        let (state, _harness) = test_state();

        assert!(matches!(
            get_game(&state, "nope".into()).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            delete_fact(&state, "Emma".into()).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn created_game_can_be_read_back() {
        let (state, _harness) = test_state();

        let created = create_game(&state, game(Some("1710500000000"))).await.unwrap();

        assert_eq!(created.id, "1710500000000");
        let fetched = get_game(&state, created.id.clone()).await.unwrap();
        assert_eq!(fetched, created);
        assert_eq!(list_games(&state).await.unwrap().len(), 1);
    }
}
