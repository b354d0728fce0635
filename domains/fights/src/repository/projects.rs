//! Project repository

use crate::domain::entities::Project;
use taskogotchi_common::Result;
use sqlx::PgPool;

pub(crate) const PROJECT_COLUMNS: &str = "id, external_id, name, created_at, updated_at";

#[derive(Clone)]
pub struct ProjectRepository {
    pool: PgPool,
}

impl ProjectRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find project by tracker project id
    pub async fn find_by_external_id(&self, external_id: &str) -> Result<Option<Project>> {
        let query = format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE external_id = $1");
        let row = sqlx::query_as::<_, Project>(&query)
            .bind(external_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// Insert the project, or refresh its name if the external id is known
    pub async fn upsert(&self, project: &Project) -> Result<Project> {
        let query = format!(
            "INSERT INTO projects (id, external_id, name, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (external_id) DO UPDATE SET name = EXCLUDED.name, updated_at = NOW() \
             RETURNING {PROJECT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, Project>(&query)
            .bind(project.id)
            .bind(&project.external_id)
            .bind(&project.name)
            .bind(project.created_at)
            .bind(project.updated_at)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }
}
