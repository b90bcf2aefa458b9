//! Local profile editing.
//!
//! There is no profile endpoint on the server; edits are applied to the cached
//! user record and persisted through
//! [`SessionManager::update_profile`](crate::manager::SessionManager::update_profile).

use crate::error::{AuthError, Result};
use crate::types::{SocialLinks, User};
use crate::validation::validate_email;
use serde::{Deserialize, Serialize};

/// Which social handle to edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocialPlatform {
    Twitter,
    Instagram,
    Spotify,
}

/// Editable copy of the user's profile fields.
///
/// Empty strings mean "not set".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDraft {
    pub username: String,
    pub email: String,
    pub bio: String,
    pub location: String,
    pub website: String,
    pub social_links: SocialLinks,
}

impl ProfileDraft {
    pub fn from_user(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            email: user.email.clone(),
            bio: user.bio.clone().unwrap_or_default(),
            location: user.location.clone().unwrap_or_default(),
            website: user.website.clone().unwrap_or_default(),
            social_links: user.social_links.clone(),
        }
    }

    pub fn set_social(&mut self, platform: SocialPlatform, handle: impl Into<String>) {
        let handle = optional(handle.into());
        match platform {
            SocialPlatform::Twitter => self.social_links.twitter = handle,
            SocialPlatform::Instagram => self.social_links.instagram = handle,
            SocialPlatform::Spotify => self.social_links.spotify = handle,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.username.trim().is_empty() {
            return Err(AuthError::InvalidInput {
                field: "username".to_string(),
                message: "Username cannot be empty".to_string(),
            });
        }

        validate_email(self.email.trim())?;

        let website = self.website.trim();
        if !website.is_empty()
            && !(website.starts_with("http://") || website.starts_with("https://"))
        {
            return Err(AuthError::InvalidInput {
                field: "website".to_string(),
                message: "Website must start with http:// or https://".to_string(),
            });
        }

        Ok(())
    }

    /// Merge the draft into `user`. Identity, role and creation date are kept.
    pub fn apply_to(&self, user: &User) -> User {
        User {
            username: self.username.trim().to_string(),
            email: self.email.trim().to_string(),
            bio: optional(self.bio.clone()),
            location: optional(self.location.clone()),
            website: optional(self.website.clone()),
            social_links: self.social_links.clone(),
            ..user.clone()
        }
    }
}

fn optional(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;

    fn ana() -> User {
        let mut user = User::new("1", "ana", "ana@example.com", Role::Artist);
        user.bio = Some("Synth pop".to_string());
        user
    }

    #[test]
    fn test_round_trip_without_edits() {
        let user = ana();
        let draft = ProfileDraft::from_user(&user);
        assert_eq!(draft.bio, "Synth pop");
        assert_eq!(draft.apply_to(&user), user);
    }

    #[test]
    fn test_apply_keeps_identity() {
        let user = ana();
        let mut draft = ProfileDraft::from_user(&user);
        draft.username = "ana.k".to_string();
        draft.bio = "   ".to_string();
        draft.location = "Kraków".to_string();
        draft.set_social(SocialPlatform::Instagram, "@ana");

        let updated = draft.apply_to(&user);
        assert_eq!(updated.id, "1");
        assert_eq!(updated.role, Role::Artist);
        assert_eq!(updated.username, "ana.k");
        assert_eq!(updated.bio, None);
        assert_eq!(updated.location.as_deref(), Some("Kraków"));
        assert_eq!(updated.social_links.instagram.as_deref(), Some("@ana"));
    }

    #[test]
    fn test_clearing_social_handle() {
        let mut draft = ProfileDraft::from_user(&ana());
        draft.set_social(SocialPlatform::Twitter, "ana");
        draft.set_social(SocialPlatform::Twitter, "");
        assert!(draft.social_links.twitter.is_none());
    }

    #[test]
    fn test_validate() {
        let mut draft = ProfileDraft::from_user(&ana());
        assert!(draft.validate().is_ok());

        draft.website = "example.com".to_string();
        assert!(matches!(
            draft.validate(),
            Err(AuthError::InvalidInput { ref field, .. }) if field == "website"
        ));

        draft.website = "https://example.com".to_string();
        draft.email = "nope".to_string();
        assert!(matches!(
            draft.validate(),
            Err(AuthError::InvalidInput { ref field, .. }) if field == "email"
        ));
    }
}
