//! Player profile repository

use crate::domain::entities::{PlayerProfile, ProfileDetails};
use taskogotchi_common::Result;
use sqlx::PgPool;
use uuid::Uuid;

/// Profile joined with its player and project
pub(crate) const PROFILE_DETAILS_SELECT: &str = r#"
    SELECT pp.id, pp.player_id, pp.project_id, pl.account_id, pl.name AS player_name, pl.email,
           pr.external_id AS project_external_id, pr.name AS project_name
    FROM player_profiles pp
    INNER JOIN players pl ON pl.id = pp.player_id
    INNER JOIN projects pr ON pr.id = pp.project_id
"#;

#[derive(Clone)]
pub struct ProfileRepository {
    pool: PgPool,
}

impl ProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Return the existing (player, project) profile or create it
    pub async fn get_or_create(&self, profile: &PlayerProfile) -> Result<PlayerProfile> {
        sqlx::query(
            r#"
            INSERT INTO player_profiles (id, player_id, project_id, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (player_id, project_id) DO NOTHING
            "#,
        )
        .bind(profile.id)
        .bind(profile.player_id)
        .bind(profile.project_id)
        .bind(profile.created_at)
        .execute(&self.pool)
        .await?;

        let row = sqlx::query_as::<_, PlayerProfile>(
            r#"
            SELECT id, player_id, project_id, created_at
            FROM player_profiles WHERE player_id = $1 AND project_id = $2
            "#,
        )
        .bind(profile.player_id)
        .bind(profile.project_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Find profile by tracker account id and tracker project id
    pub async fn find_details(
        &self,
        account_id: &str,
        project_external_id: &str,
    ) -> Result<Option<ProfileDetails>> {
        let query =
            format!("{PROFILE_DETAILS_SELECT} WHERE pl.account_id = $1 AND pr.external_id = $2");
        let row = sqlx::query_as::<_, ProfileDetails>(&query)
            .bind(account_id)
            .bind(project_external_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// Find profile by tracker account id within a known project
    pub async fn find_details_in_project(
        &self,
        account_id: &str,
        project_id: Uuid,
    ) -> Result<Option<ProfileDetails>> {
        let query =
            format!("{PROFILE_DETAILS_SELECT} WHERE pl.account_id = $1 AND pp.project_id = $2");
        let row = sqlx::query_as::<_, ProfileDetails>(&query)
            .bind(account_id)
            .bind(project_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// Find profile by ID
    pub async fn find_details_by_id(&self, id: Uuid) -> Result<Option<ProfileDetails>> {
        let query = format!("{PROFILE_DETAILS_SELECT} WHERE pp.id = $1");
        let row = sqlx::query_as::<_, ProfileDetails>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }
}
