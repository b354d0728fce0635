//! Player repository

use crate::domain::entities::Player;
use taskogotchi_common::Result;
use sqlx::PgPool;

pub(crate) const PLAYER_COLUMNS: &str = "id, account_id, name, email, created_at, updated_at";

#[derive(Clone)]
pub struct PlayerRepository {
    pool: PgPool,
}

impl PlayerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find player by tracker account id
    pub async fn find_by_account_id(&self, account_id: &str) -> Result<Option<Player>> {
        let query = format!("SELECT {PLAYER_COLUMNS} FROM players WHERE account_id = $1");
        let row = sqlx::query_as::<_, Player>(&query)
            .bind(account_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// Insert the player, or refresh name and email if the account id is known.
    ///
    /// The stored id and account id never change.
    pub async fn upsert(&self, player: &Player) -> Result<Player> {
        let query = format!(
            "INSERT INTO players (id, account_id, name, email, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (account_id) DO UPDATE SET \
                name = EXCLUDED.name, email = EXCLUDED.email, updated_at = NOW() \
             RETURNING {PLAYER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, Player>(&query)
            .bind(player.id)
            .bind(&player.account_id)
            .bind(&player.name)
            .bind(&player.email)
            .bind(player.created_at)
            .bind(player.updated_at)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }
}
