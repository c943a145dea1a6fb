//! Account forms: sign-in, registration, profile edits and password change.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

use crate::error::CoreError;
use crate::payload::{Attachment, Payload};
use crate::resources::Draft;

#[derive(Clone, Serialize, Validate)]
pub struct Credentials {
    #[validate(
        length(min = 1, message = "Email is required"),
        email(message = "Enter a valid email")
    )]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

// Passwords stay out of logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Serialize, Validate)]
pub struct Registration {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Enter a valid email"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

/// External identity providers accepted by `POST /auth/{provider}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OAuthProvider {
    Google,
    Facebook,
    Apple,
}

impl OAuthProvider {
    /// Path segment under `/auth`.
    pub fn as_str(&self) -> &'static str {
        match self {
            OAuthProvider::Google => "google",
            OAuthProvider::Facebook => "facebook",
            OAuthProvider::Apple => "apple",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            OAuthProvider::Google => "Google",
            OAuthProvider::Facebook => "Facebook",
            OAuthProvider::Apple => "Apple",
        }
    }
}

impl FromStr for OAuthProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "google" => Ok(OAuthProvider::Google),
            "facebook" => Ok(OAuthProvider::Facebook),
            "apple" => Ok(OAuthProvider::Apple),
            other => Err(format!("unsupported provider {other:?}")),
        }
    }
}

impl fmt::Display for OAuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Profile form. With an avatar the request goes out as multipart,
/// otherwise as JSON; callers never choose.
#[derive(Debug, Clone, Validate)]
pub struct ProfileUpdate {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Enter a valid email"))]
    pub email: String,
    pub phone: Option<String>,
    pub bio: Option<String>,
    pub avatar: Option<Attachment>,
}

impl ProfileUpdate {
    /// Pre-fill from the signed-in identity, like the profile page does.
    pub fn from_identity(identity: &crate::identity::Identity) -> Self {
        Self {
            name: identity.name.clone(),
            email: identity.email.clone(),
            phone: identity.phone.clone(),
            bio: identity.bio.clone(),
            avatar: None,
        }
    }
}

impl Draft for ProfileUpdate {
    fn to_payload(&self) -> Result<Payload, CoreError> {
        let avatar = self.avatar.clone().map(|avatar| avatar.under("avatar"));
        Ok(Payload::json(&json!({
            "name": self.name,
            "email": self.email,
            "phone": self.phone.clone().unwrap_or_default(),
            "bio": self.bio.clone().unwrap_or_default(),
        }))?
        .with_attachment(avatar))
    }
}

#[derive(Debug, Clone, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub new_password: String,
    #[validate(must_match(other = "new_password", message = "Passwords must match"))]
    pub confirm_password: String,
}

impl PasswordChange {
    pub fn new(
        current_password: impl Into<String>,
        new_password: impl Into<String>,
        confirm_password: impl Into<String>,
    ) -> Self {
        Self {
            current_password: current_password.into(),
            new_password: new_password.into(),
            confirm_password: confirm_password.into(),
        }
    }
}

impl Draft for PasswordChange {
    fn to_payload(&self) -> Result<Payload, CoreError> {
        Payload::json(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation;

    #[test]
    fn credentials_require_valid_email() {
        let errors = validation::check(&Credentials::new("nobody", "secret")).unwrap_err();
        assert_eq!(errors.first("email"), Some("Enter a valid email"));
        assert!(errors.first("password").is_none());

        assert!(validation::check(&Credentials::new("a@x.com", "secret")).is_ok());
    }

    #[test]
    fn credentials_debug_hides_password() {
        let shown = format!("{:?}", Credentials::new("a@x.com", "hunter22"));
        assert!(!shown.contains("hunter22"));
    }

    #[test]
    fn password_change_rules() {
        let short = PasswordChange::new("old", "short", "short");
        assert_eq!(
            short.check().unwrap_err().first("newPassword"),
            Some("Password must be at least 8 characters")
        );

        let mismatch = PasswordChange::new("old", "longenough", "longenougj");
        assert_eq!(
            mismatch.check().unwrap_err().first("confirmPassword"),
            Some("Passwords must match")
        );

        let ok = PasswordChange::new("old", "longenough", "longenough");
        assert!(ok.check().is_ok());
        assert_eq!(ok.to_payload().unwrap().fields()["confirmPassword"], "longenough");
    }

    #[test]
    fn profile_with_avatar_goes_multipart() {
        let mut update = ProfileUpdate {
            name: "Ada".to_string(),
            email: "ada@cabin.test".to_string(),
            phone: None,
            bio: Some("Fixes the boat".to_string()),
            avatar: None,
        };
        assert!(!update.to_payload().unwrap().is_multipart());

        update.avatar = Some(Attachment::new("file", "me.png", vec![1, 2, 3]));
        let payload = update.to_payload().unwrap();
        assert_eq!(payload.attachment().map(|a| a.field.as_str()), Some("avatar"));
        assert_eq!(payload.fields()["phone"], "");
    }

    #[test]
    fn provider_parses_case_insensitively() {
        assert_eq!("Google".parse::<OAuthProvider>(), Ok(OAuthProvider::Google));
        assert!("myspace".parse::<OAuthProvider>().is_err());
        assert_eq!(OAuthProvider::Apple.to_string(), "apple");
    }
}
