use uuid::Uuid;

use crate::domain::session::Session;
use crate::domain::user_profile::{ProfilePatch, UserProfile};
use crate::usecase::contracts::ProfileRepository;
use crate::usecase::error::UsecaseError;

pub struct ProfilesUseCase<P>
where
    P: ProfileRepository,
{
    profile_repository: P,
}

impl<P> ProfilesUseCase<P>
where
    P: ProfileRepository,
{
    pub fn new(profile_repository: P) -> Self {
        Self { profile_repository }
    }

    /// Creates the caller's profile on first sign-in. Repeating it (every OAuth
    /// sign-in does) merges into the stored profile without undoing edits.
    #[tracing::instrument(skip(self, session), fields(user_id = %session.user_id))]
    pub async fn register(&self, session: &Session) -> Result<UserProfile, UsecaseError> {
        tracing::debug!("registering profile");

        let initial = UserProfile::from_session(session);
        let stored = self.profile_repository.upsert_identity(&initial).await?;

        tracing::info!(is_driver = stored.is_driver, "profile registered");
        Ok(stored)
    }

    #[tracing::instrument(skip(self), fields(user_id = %user_id))]
    pub async fn get(&self, user_id: Uuid) -> Result<UserProfile, UsecaseError> {
        self.profile_repository
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| UsecaseError::NotFound("Profile".to_string()))
    }

    #[tracing::instrument(skip(self, patch), fields(user_id = %user_id))]
    pub async fn update(&self, user_id: Uuid, patch: ProfilePatch) -> Result<UserProfile, UsecaseError> {
        tracing::debug!("updating profile");

        let mut profile = self.get(user_id).await?;
        profile.apply(patch);
        self.profile_repository.update(&profile).await?;

        tracing::info!(is_driver = profile.is_driver, "profile updated");
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecase::contracts::MockProfileRepository;
    use mockall::predicate::eq;

    fn session() -> Session {
        Session {
            user_id: Uuid::new_v4(),
            email: "ravi@example.com".to_string(),
            display_name: Some("Ravi Kumar".to_string()),
            photo_url: Some("https://img.example.com/ravi.png".to_string()),
        }
    }

    #[tokio::test]
    async fn test_register_builds_profile_from_session() {
        let session = session();
        let mut mock = MockProfileRepository::new();
        mock.expect_upsert_identity()
            .withf(|profile: &UserProfile| {
                profile.first_name == "Ravi"
                    && profile.last_name == "Kumar"
                    && profile.email == "ravi@example.com"
                    && !profile.is_driver
            })
            .times(1)
            .returning(|profile| Ok(profile.clone()));

        let usecase = ProfilesUseCase::new(mock);
        let profile = usecase.register(&session).await.unwrap();

        assert_eq!(profile.id, session.user_id);
        assert_eq!(
            profile.profile_picture_url.as_deref(),
            Some("https://img.example.com/ravi.png")
        );
    }

    #[tokio::test]
    async fn test_register_returns_stored_profile_with_edits() {
        let session = session();
        let mut existing = UserProfile::from_session(&session);
        existing.phone_number = "+91 98000 00000".to_string();
        existing.is_driver = true;
        let stored = existing.clone();

        let mut mock = MockProfileRepository::new();
        mock.expect_upsert_identity()
            .returning(move |_| Ok(stored.clone()));
        mock.expect_update().times(0);

        let usecase = ProfilesUseCase::new(mock);
        let profile = usecase.register(&session).await.unwrap();

        assert_eq!(profile, existing);
    }

    #[tokio::test]
    async fn test_update_applies_patch() {
        let session = session();
        let profile = UserProfile::from_session(&session);
        let user_id = profile.id;

        let mut mock = MockProfileRepository::new();
        mock.expect_find_by_id()
            .with(eq(user_id))
            .returning(move |_| Ok(Some(profile.clone())));
        mock.expect_update()
            .withf(|profile: &UserProfile| profile.is_driver && profile.last_name == "K")
            .times(1)
            .returning(|_| Ok(()));

        let usecase = ProfilesUseCase::new(mock);
        let updated = usecase
            .update(
                user_id,
                ProfilePatch {
                    last_name: Some("K".to_string()),
                    is_driver: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.first_name, "Ravi");
    }

    #[tokio::test]
    async fn test_get_missing_profile() {
        let mut mock = MockProfileRepository::new();
        mock.expect_find_by_id().returning(|_| Ok(None));

        let usecase = ProfilesUseCase::new(mock);
        assert!(matches!(
            usecase.get(Uuid::new_v4()).await,
            Err(UsecaseError::NotFound(_))
        ));
    }
}
