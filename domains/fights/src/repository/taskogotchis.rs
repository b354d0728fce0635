//! Taskogotchi repository

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entities::{ProfileDetails, ProfilePet, Taskogotchi};
use taskogotchi_common::db::is_unique_violation;
use taskogotchi_common::{RepositoryError, Result};

pub(crate) const TASKOGOTCHI_COLUMNS: &str =
    "id, profile_id, image, health, strength, last_updated";

/// Flat row for a taskogotchi joined with its owning profile
#[derive(sqlx::FromRow)]
struct ProfilePetRow {
    pet_id: Uuid,
    image: Option<Json<serde_json::Value>>,
    health: i32,
    strength: i32,
    last_updated: DateTime<Utc>,
    profile_id: Uuid,
    player_id: Uuid,
    project_id: Uuid,
    account_id: String,
    player_name: Option<String>,
    email: Option<String>,
    project_external_id: String,
    project_name: Option<String>,
}

impl From<ProfilePetRow> for ProfilePet {
    fn from(row: ProfilePetRow) -> Self {
        ProfilePet {
            profile: ProfileDetails {
                id: row.profile_id,
                player_id: row.player_id,
                project_id: row.project_id,
                account_id: row.account_id,
                player_name: row.player_name,
                email: row.email,
                project_external_id: row.project_external_id,
                project_name: row.project_name,
            },
            taskogotchi: Taskogotchi {
                id: row.pet_id,
                profile_id: row.profile_id,
                image: row.image,
                health: row.health,
                strength: row.strength,
                last_updated: row.last_updated,
            },
        }
    }
}

#[derive(Clone)]
pub struct TaskogotchiRepository {
    pool: PgPool,
}

impl TaskogotchiRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find the taskogotchi owned by a profile
    pub async fn find_by_profile(&self, profile_id: Uuid) -> Result<Option<Taskogotchi>> {
        let query = format!("SELECT {TASKOGOTCHI_COLUMNS} FROM taskogotchis WHERE profile_id = $1");
        let row = sqlx::query_as::<_, Taskogotchi>(&query)
            .bind(profile_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// Create a taskogotchi
    ///
    /// Returns `RepositoryError::AlreadyExists` if the profile already owns one.
    pub async fn create(&self, pet: &Taskogotchi) -> Result<Taskogotchi> {
        let query = format!(
            "INSERT INTO taskogotchis ({TASKOGOTCHI_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {TASKOGOTCHI_COLUMNS}"
        );
        let row = sqlx::query_as::<_, Taskogotchi>(&query)
            .bind(pet.id)
            .bind(pet.profile_id)
            .bind(&pet.image)
            .bind(pet.health)
            .bind(pet.strength)
            .bind(pet.last_updated)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    RepositoryError::AlreadyExists
                } else {
                    RepositoryError::from(e)
                }
            })?;
        Ok(row)
    }

    /// Update image and stats of an existing taskogotchi
    pub async fn update(&self, pet: &Taskogotchi) -> Result<Taskogotchi> {
        let query = format!(
            "UPDATE taskogotchis SET image = $2, health = $3, strength = $4, last_updated = $5 \
             WHERE id = $1 \
             RETURNING {TASKOGOTCHI_COLUMNS}"
        );
        let row = sqlx::query_as::<_, Taskogotchi>(&query)
            .bind(pet.id)
            .bind(&pet.image)
            .bind(pet.health)
            .bind(pet.strength)
            .bind(pet.last_updated)
            .fetch_optional(&self.pool)
            .await?;
        row.ok_or_else(|| RepositoryError::NotFound.into())
    }

    /// List taskogotchis in a project, skipping the given profile
    pub async fn list_in_project(
        &self,
        project_id: Uuid,
        exclude_profile_id: Uuid,
    ) -> Result<Vec<ProfilePet>> {
        let rows = sqlx::query_as::<_, ProfilePetRow>(
            r#"
            SELECT t.id AS pet_id, t.image, t.health, t.strength, t.last_updated,
                   pp.id AS profile_id, pp.player_id, pp.project_id,
                   pl.account_id, pl.name AS player_name, pl.email,
                   pr.external_id AS project_external_id, pr.name AS project_name
            FROM taskogotchis t
            INNER JOIN player_profiles pp ON pp.id = t.profile_id
            INNER JOIN players pl ON pl.id = pp.player_id
            INNER JOIN projects pr ON pr.id = pp.project_id
            WHERE pp.project_id = $1 AND pp.id <> $2
            ORDER BY pl.account_id
            "#,
        )
        .bind(project_id)
        .bind(exclude_profile_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(ProfilePet::from).collect())
    }
}
