use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::session::Session;

/// Longest first or last name kept, in characters.
pub const MAX_NAME_CHARS: usize = 100;

fn capped(name: &str) -> String {
    name.chars().take(MAX_NAME_CHARS).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserProfile {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub profile_picture_url: Option<String>,
    pub is_driver: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfilePatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub profile_picture_url: Option<String>,
    pub is_driver: Option<bool>,
}

impl UserProfile {
    /// Initial profile written at registration. The first word of the display
    /// name becomes the first name, the rest the last name, each capped at
    /// [`MAX_NAME_CHARS`].
    pub fn from_session(session: &Session) -> Self {
        let display_name = session.display_name.as_deref().unwrap_or_default();
        let mut words = display_name.split_whitespace();
        let first_name = capped(words.next().unwrap_or_default());
        let last_name = capped(&words.collect::<Vec<_>>().join(" "));
        let now = Utc::now();

        Self {
            id: session.user_id,
            first_name,
            last_name,
            email: session.email.clone(),
            phone_number: String::new(),
            profile_picture_url: session.photo_url.clone().filter(|url| !url.is_empty()),
            is_driver: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }

    pub fn apply(&mut self, patch: ProfilePatch) {
        if let Some(first_name) = patch.first_name {
            self.first_name = first_name;
        }
        if let Some(last_name) = patch.last_name {
            self.last_name = last_name;
        }
        if let Some(phone_number) = patch.phone_number {
            self.phone_number = phone_number;
        }
        if let Some(url) = patch.profile_picture_url {
            self.profile_picture_url = if url.is_empty() { None } else { Some(url) };
        }
        if let Some(is_driver) = patch.is_driver {
            self.is_driver = is_driver;
        }
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(display_name: Option<&str>) -> Session {
        Session {
            user_id: Uuid::new_v4(),
            email: "asha@example.com".to_string(),
            display_name: display_name.map(String::from),
            photo_url: None,
        }
    }

    #[test]
    fn test_name_split_on_first_word() {
        let profile = UserProfile::from_session(&session(Some("Asha Rani Varma")));

        assert_eq!(profile.first_name, "Asha");
        assert_eq!(profile.last_name, "Rani Varma");
        assert_eq!(profile.display_name(), "Asha Rani Varma");
        assert!(!profile.is_driver);
        assert_eq!(profile.created_at, profile.updated_at);
    }

    #[test]
    fn test_missing_display_name_gives_empty_names() {
        let profile = UserProfile::from_session(&session(None));

        assert_eq!(profile.first_name, "");
        assert_eq!(profile.last_name, "");
        assert_eq!(profile.display_name(), "");
    }

    #[test]
    fn test_oversized_token_name_is_capped() {
        let long_first = "A".repeat(5000);
        let long_last = "ब".repeat(300);
        let display_name = format!("{} {}", long_first, long_last);
        let profile = UserProfile::from_session(&session(Some(display_name.as_str())));

        assert_eq!(profile.first_name.chars().count(), MAX_NAME_CHARS);
        assert_eq!(profile.last_name.chars().count(), MAX_NAME_CHARS);
    }

    #[test]
    fn test_apply_patch_touches_only_given_fields() {
        let mut profile = UserProfile::from_session(&session(Some("Asha Varma")));
        let original_updated_at = profile.updated_at;

        std::thread::sleep(std::time::Duration::from_millis(10));

        profile.apply(ProfilePatch {
            phone_number: Some("+91 90000 00000".to_string()),
            is_driver: Some(true),
            ..Default::default()
        });

        assert_eq!(profile.first_name, "Asha");
        assert_eq!(profile.phone_number, "+91 90000 00000");
        assert!(profile.is_driver);
        assert!(profile.updated_at > original_updated_at);
    }
}
