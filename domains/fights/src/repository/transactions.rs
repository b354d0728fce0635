//! Transaction helpers for the Fights domain

use super::challenges::{CHALLENGE_COLUMNS, PLAYER_BUSY_QUERY};
use crate::domain::entities::FightChallenge;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

/// Lock the players owning the given profiles until the transaction ends.
/// Rows are locked in id order so two creations naming the same pair
/// cannot deadlock.
pub async fn lock_players_tx(
    tx: &mut Transaction<'_, Postgres>,
    profile_ids: &[Uuid],
) -> Result<Vec<Uuid>, sqlx::Error> {
    let rows = sqlx::query_scalar::<_, Uuid>(
        r#"
        SELECT id FROM players
        WHERE id IN (SELECT player_id FROM player_profiles WHERE id = ANY($1))
        ORDER BY id
        FOR UPDATE
        "#,
    )
    .bind(profile_ids)
    .fetch_all(&mut **tx)
    .await?;
    Ok(rows)
}

/// Whether the profile's player has an active challenge in any project,
/// within a transaction
pub async fn has_active_for_player_tx(
    tx: &mut Transaction<'_, Postgres>,
    profile_id: Uuid,
) -> Result<bool, sqlx::Error> {
    let exists = sqlx::query_scalar::<_, bool>(PLAYER_BUSY_QUERY)
        .bind(profile_id)
        .fetch_one(&mut **tx)
        .await?;
    Ok(exists)
}

/// Create a challenge within a transaction
pub async fn create_challenge_tx(
    tx: &mut Transaction<'_, Postgres>,
    challenge: &FightChallenge,
) -> Result<FightChallenge, sqlx::Error> {
    let query = format!(
        "INSERT INTO fight_challenges ({CHALLENGE_COLUMNS}) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
         RETURNING {CHALLENGE_COLUMNS}"
    );
    let row = sqlx::query_as::<_, FightChallenge>(&query)
        .bind(challenge.id)
        .bind(challenge.project_id)
        .bind(challenge.initiator_id)
        .bind(challenge.initiator_health)
        .bind(challenge.initiator_strength)
        .bind(challenge.opponent_id)
        .bind(challenge.opponent_health)
        .bind(challenge.opponent_strength)
        .bind(challenge.status)
        .bind(challenge.winner_id)
        .bind(challenge.draw)
        .bind(challenge.created_at)
        .bind(challenge.updated_at)
        .fetch_one(&mut **tx)
        .await?;
    Ok(row)
}
