use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    domain::user_profile::UserProfile,
    repository::errors::RepositoryError,
    usecase::contracts::ProfileRepository,
};

#[derive(Clone)]
pub struct PostgresProfileRepository {
    pool: PgPool,
}

impl PostgresProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl ProfileRepository for PostgresProfileRepository {
    #[tracing::instrument(skip(self, profile), fields(user_id = %profile.id))]
    async fn upsert_identity(&self, profile: &UserProfile) -> Result<UserProfile, RepositoryError> {
        tracing::debug!("upserting profile identity");

        let stored = sqlx::query_as::<_, UserProfile>(
            r#"
            INSERT INTO user_profiles (id, first_name, last_name, email, phone_number,
                                       profile_picture_url, is_driver, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO UPDATE
            SET email = EXCLUDED.email,
                profile_picture_url = COALESCE(user_profiles.profile_picture_url, EXCLUDED.profile_picture_url)
            RETURNING id, first_name, last_name, email, phone_number, profile_picture_url,
                      is_driver, created_at, updated_at
            "#
        )
        .bind(profile.id)
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(&profile.email)
        .bind(&profile.phone_number)
        .bind(&profile.profile_picture_url)
        .bind(profile.is_driver)
        .bind(profile.created_at)
        .bind(profile.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        tracing::debug!("profile identity stored");
        Ok(stored)
    }

    #[tracing::instrument(skip(self), fields(user_id = %id))]
    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserProfile>, RepositoryError> {
        tracing::debug!("finding profile by id");

        let profile = sqlx::query_as::<_, UserProfile>(
            r#"
            SELECT id, first_name, last_name, email, phone_number, profile_picture_url,
                   is_driver, created_at, updated_at
            FROM user_profiles
            WHERE id = $1
            "#
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(profile)
    }

    #[tracing::instrument(skip(self, profile), fields(user_id = %profile.id))]
    async fn update(&self, profile: &UserProfile) -> Result<(), RepositoryError> {
        tracing::debug!("updating profile");

        let result = sqlx::query(
            r#"
            UPDATE user_profiles
            SET first_name = $2, last_name = $3, phone_number = $4,
                profile_picture_url = $5, is_driver = $6, updated_at = $7
            WHERE id = $1
            "#
        )
        .bind(profile.id)
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(&profile.phone_number)
        .bind(&profile.profile_picture_url)
        .bind(profile.is_driver)
        .bind(profile.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        tracing::debug!("profile updated successfully");
        Ok(())
    }
}
