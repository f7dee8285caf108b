//! Read-only views over recorded games.

use crate::{
    dao::models::GameRecord,
    dto::history::GameSummary,
    error::ServiceError,
    state::SharedState,
};

const BEST_GAMES: usize = 3;

/// Every known game, newest first.
pub async fn list_games(state: &SharedState) -> Vec<GameRecord> {
    state.reconciler().games().await
}

/// Summaries of the games whose roster matches every fragment.
///
/// A fragment matches a player when it is a case-insensitive substring of the
/// name. No fragments matches every game.
pub async fn search_games(state: &SharedState, fragments: &[String]) -> Vec<GameSummary> {
    let games = state.reconciler().games().await;
    filter_by_players(&games, fragments)
        .into_iter()
        .map(GameSummary::from)
        .collect()
}

/// The three games with the lowest winning total.
pub async fn best_games(state: &SharedState) -> Vec<GameRecord> {
    let mut games = state.reconciler().games().await;
    games.sort_by_key(winning_total);
    games.truncate(BEST_GAMES);
    games
}

/// One game by id.
pub async fn find_game(state: &SharedState, id: &str) -> Result<GameRecord, ServiceError> {
    state.reconciler().find_game(id).await
}

fn filter_by_players<'a>(games: &'a [GameRecord], fragments: &[String]) -> Vec<&'a GameRecord> {
    let fragments = fragments
        .iter()
        .map(|fragment| fragment.to_lowercase())
        .collect::<Vec<_>>();
    games
        .iter()
        .filter(|game| {
            fragments.iter().all(|fragment| {
                game.player_names
                    .iter()
                    .any(|name| name.to_lowercase().contains(fragment.as_str()))
            })
        })
        .collect()
}

fn winning_total(game: &GameRecord) -> i32 {
    game.final_totals.iter().copied().min().unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{sample_record, test_state};

    fn record(id: &str, date: &str, names: &[&str], totals: &[i32]) -> GameRecord {
        GameRecord {
            player_names: names.iter().map(|name| name.to_string()).collect(),
            final_totals: totals.to_vec(),
            ..sample_record(id, date)
        }
    }

    fn games() -> Vec<GameRecord> {
        vec![
            record("1", "2024-03-15", &["John", "Sarah", "Mike"], &[32, 57, 44]),
            record("2", "2024-03-14", &["Emma", "David"], &[52, 24]),
            record("3", "2024-03-13", &["Alex", "Lisa", "Tom", "Kate"], &[36, 38, 51, 61]),
            record("4", "2024-03-12", &["Emma", "Sarah"], &[40, 41]),
        ]
    }

    #[test]
    fn every_fragment_must_match_a_player() {
        let games = games();
        let ids = |fragments: &[&str]| {
            let fragments = fragments.iter().map(|f| f.to_string()).collect::<Vec<_>>();
            filter_by_players(&games, &fragments)
                .into_iter()
                .map(|game| game.id.clone())
                .collect::<Vec<_>>()
        };

        assert_eq!(ids(&["emma"]), vec!["2", "4"]);
        assert_eq!(ids(&["EM", "sar"]), vec!["4"]);
        assert_eq!(ids(&["zed"]), Vec::<String>::new());
        assert_eq!(ids(&[]).len(), 4);
    }

    #[tokio::test]
    async fn best_games_have_lowest_winning_totals() {
        let (state, harness) = test_state();
        for game in games() {
            harness.store.insert_game(game);
        }
        state.reconciler().refresh().await;

        let best = best_games(&state).await;

        let ids = best.iter().map(|game| game.id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["2", "1", "3"]);
    }

    #[tokio::test]
    async fn search_summaries_name_the_winner() {
        let (state, harness) = test_state();
        for game in games() {
            harness.store.insert_game(game);
        }
        state.reconciler().refresh().await;

        let summaries = search_games(&state, &["david".to_string()]).await;

        assert_eq!(summaries.len(), 1);
        let winner = summaries[0].winner.as_ref().unwrap();
        assert_eq!(winner.name, "David");
        assert_eq!(winner.score, 24);
        assert_eq!(summaries[0].player_count, 2);

        let listed = list_games(&state).await;
        assert_eq!(listed[0].date, "2024-03-15");
        assert_eq!(find_game(&state, "3").await.unwrap().player_names.len(), 4);
    }
}
