use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use super::{Validate, non_blank, trimmed_opt};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub email: String,
    #[serde(rename = "password")]
    pub password_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occupation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    #[serde(default)]
    pub socials: Vec<String>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

/// A user as returned to clients: hex id, no password hash.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occupation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    pub socials: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_hex(),
            name: user.name.clone(),
            email: user.email.clone(),
            occupation: user.occupation.clone(),
            location: user.location.clone(),
            bio: user.bio.clone(),
            photo: user.photo.clone(),
            socials: user.socials.clone(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

pub(crate) fn check_email(email: &str) -> Result<(), String> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err("a valid email is required".to_string()),
    }
}

/// Profile fields a user may change about themselves.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub occupation: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default)]
    pub socials: Option<Vec<String>>,
}

impl Validate for ProfileUpdate {
    fn validate(&self) -> Result<(), String> {
        if let Some(name) = &self.name {
            non_blank(name, "name")?;
        }
        if let Some(email) = &self.email {
            check_email(email)?;
        }
        Ok(())
    }
}

impl ProfileUpdate {
    /// Applies the update in place. Optional text fields sent as blank strings
    /// are cleared.
    pub fn apply(&self, user: &mut User, now: DateTime<Utc>) {
        if let Some(name) = &self.name {
            user.name = name.trim().to_string();
        }
        if let Some(email) = &self.email {
            user.email = normalize_email(email);
        }
        if self.occupation.is_some() {
            user.occupation = trimmed_opt(self.occupation.clone());
        }
        if self.location.is_some() {
            user.location = trimmed_opt(self.location.clone());
        }
        if self.bio.is_some() {
            user.bio = trimmed_opt(self.bio.clone());
        }
        if self.photo.is_some() {
            user.photo = trimmed_opt(self.photo.clone());
        }
        if let Some(socials) = &self.socials {
            user.socials = socials
                .iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        user.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_user() -> User {
        let now = Utc::now();
        User {
            id: ObjectId::new(),
            name: "Asha".to_string(),
            email: "asha@example.com".to_string(),
            password_hash: "hash".to_string(),
            occupation: Some("Engineer".to_string()),
            location: None,
            bio: None,
            photo: None,
            socials: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn email_check() {
        assert!(check_email("a@b.co").is_ok());
        assert!(check_email("no-at-sign").is_err());
        assert!(check_email("@b.co").is_err());
        assert!(check_email("a@localhost").is_err());
    }

    #[test]
    fn update_clears_blank_fields_and_normalizes_email() {
        let mut user = sample_user();
        let update: ProfileUpdate = serde_json::from_value(json!({
            "email": " Asha@Example.COM ",
            "occupation": "",
            "socials": ["https://github.com/asha", " "]
        }))
        .unwrap();
        assert!(update.validate().is_ok());
        update.apply(&mut user, Utc::now());

        assert_eq!(user.email, "asha@example.com");
        assert_eq!(user.occupation, None);
        assert_eq!(user.socials, vec!["https://github.com/asha".to_string()]);
        assert_eq!(user.name, "Asha");
    }

    #[test]
    fn password_cannot_be_set_through_profile() {
        assert!(serde_json::from_value::<ProfileUpdate>(json!({ "password": "x" })).is_err());
    }
}
