//! Fight challenge repository

use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entities::{FightChallenge, FightStatus};
use taskogotchi_common::{RepositoryError, Result};

pub(crate) const CHALLENGE_COLUMNS: &str = "id, project_id, initiator_id, initiator_health, \
     initiator_strength, opponent_id, opponent_health, opponent_strength, status, winner_id, \
     draw, created_at, updated_at";

/// Non-terminal statuses, as SQL
pub(crate) const ACTIVE_STATUS_FILTER: &str = "status NOT IN ('completed', 'canceled')";

/// Whether the player owning profile `$1` fights anywhere, in any of their projects
pub(crate) const PLAYER_BUSY_QUERY: &str = "WITH player_profiles_of AS ( \
        SELECT sibling.id FROM player_profiles sibling \
        INNER JOIN player_profiles own ON own.player_id = sibling.player_id \
        WHERE own.id = $1 \
     ) \
     SELECT EXISTS (SELECT 1 FROM fight_challenges \
     WHERE status NOT IN ('completed', 'canceled') \
       AND (initiator_id IN (SELECT id FROM player_profiles_of) \
            OR opponent_id IN (SELECT id FROM player_profiles_of)))";

#[derive(Clone)]
pub struct FightChallengeRepository {
    pool: PgPool,
}

impl FightChallengeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find challenge by ID
    pub async fn find(&self, id: Uuid) -> Result<Option<FightChallenge>> {
        let query = format!("SELECT {CHALLENGE_COLUMNS} FROM fight_challenges WHERE id = $1");
        let row = sqlx::query_as::<_, FightChallenge>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// Active challenges where any profile of the account is a combatant
    pub async fn list_active_for_account(&self, account_id: &str) -> Result<Vec<FightChallenge>> {
        let query = format!(
            "WITH account_profiles AS ( \
                SELECT pp.id FROM player_profiles pp \
                INNER JOIN players pl ON pl.id = pp.player_id \
                WHERE pl.account_id = $1 \
             ) \
             SELECT {CHALLENGE_COLUMNS} FROM fight_challenges \
             WHERE {ACTIVE_STATUS_FILTER} \
               AND (initiator_id IN (SELECT id FROM account_profiles) \
                    OR opponent_id IN (SELECT id FROM account_profiles)) \
             ORDER BY created_at DESC"
        );
        let rows = sqlx::query_as::<_, FightChallenge>(&query)
            .bind(account_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Whether the profile's player is a combatant in any active challenge,
    /// in this project or another
    pub async fn has_active_for_player(&self, profile_id: Uuid) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(PLAYER_BUSY_QUERY)
            .bind(profile_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    /// Persist a transition only if the stored status is still `expected`.
    ///
    /// Returns `RepositoryError::StaleWrite` if another writer moved the
    /// challenge first, or `RepositoryError::NotFound` if it does not exist.
    pub async fn save_transition(
        &self,
        challenge: &FightChallenge,
        expected: FightStatus,
    ) -> Result<FightChallenge> {
        let query = format!(
            "UPDATE fight_challenges SET status = $3, winner_id = $4, draw = $5, updated_at = $6 \
             WHERE id = $1 AND status = $2 \
             RETURNING {CHALLENGE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, FightChallenge>(&query)
            .bind(challenge.id)
            .bind(expected)
            .bind(challenge.status)
            .bind(challenge.winner_id)
            .bind(challenge.draw)
            .bind(challenge.updated_at)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(saved) => Ok(saved),
            None => match self.find(challenge.id).await? {
                Some(_) => Err(RepositoryError::StaleWrite.into()),
                None => Err(RepositoryError::NotFound.into()),
            },
        }
    }
}
