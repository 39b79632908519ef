//! User accounts.

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::config::Limits;
use crate::error::{RippleError, RippleResult};
use crate::store::{Collection, RecordStore, Records};
use crate::validation;

/// A user as handed out to callers. The password digest never leaves the
/// store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub preferences: Map<String, Value>,
    /// Missing on accounts written by older versions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<NaiveDateTime>,
}

/// A user as stored in users.json.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct UserRecord {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub password: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub preferences: Map<String, Value>,
    /// Missing on accounts written by older versions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<NaiveDateTime>,
}

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        User {
            id: record.id,
            name: record.name,
            email: record.email,
            username: record.username,
            phone: record.phone,
            preferences: record.preferences,
            created_at: record.created_at,
        }
    }
}

impl UserRecord {
    fn matches_login(&self, login: &str) -> bool {
        let login = login.to_lowercase();
        self.email.to_lowercase() == login
            || self
                .username
                .as_ref()
                .is_some_and(|u| u.to_lowercase() == login)
    }
}

/// Sign-up form.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub username: Option<String>,
    pub phone: Option<String>,
    pub preferences: Option<Map<String, Value>>,
}

impl NewUser {
    pub fn new(name: &str, email: &str, password: &str) -> Self {
        NewUser {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            ..NewUser::default()
        }
    }
}

/// Hex SHA-256 of the password.
///
/// Unsalted, kept for compatibility with existing users.json files. A
/// salted slow hash would change the stored format.
pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

#[derive(Clone)]
pub struct UserManager {
    store: RecordStore,
    limits: Limits,
}

impl UserManager {
    pub fn new(store: RecordStore, limits: Limits) -> Self {
        UserManager { store, limits }
    }

    pub(crate) fn records(&self) -> Vec<UserRecord> {
        self.store.load(Collection::Users)
    }

    /// Create an account. Email (and username, when given) must not match
    /// an existing account case-insensitively.
    pub fn create(&self, new_user: NewUser) -> RippleResult<User> {
        validation::require("name", &new_user.name)?;
        validation::require("email", &new_user.email)?;
        validation::require("password", &new_user.password)?;
        validation::email(&new_user.email)?;
        if new_user.password.chars().count() < self.limits.password_min_length {
            return Err(RippleError::Validation(format!(
                "Password must be at least {} characters",
                self.limits.password_min_length
            )));
        }

        let mut users: Records<UserRecord> = self.store.load_records(Collection::Users);
        let email = new_user.email.trim().to_lowercase();

        if users.iter().any(|u| u.email.to_lowercase() == email)
            || users.raw_field_matches("email", &email)
        {
            return Err(RippleError::DuplicateEmail(email));
        }
        if let Some(username) = &new_user.username {
            let wanted = username.to_lowercase();
            if users
                .iter()
                .any(|u| u.username.as_ref().is_some_and(|n| n.to_lowercase() == wanted))
                || users.raw_field_matches("username", &wanted)
            {
                return Err(RippleError::DuplicateUsername(username.clone()));
            }
        }

        let record = UserRecord {
            id: uuid::Uuid::new_v4().to_string(),
            name: new_user.name,
            email,
            username: new_user.username,
            password: hash_password(&new_user.password),
            phone: new_user.phone.unwrap_or_default(),
            preferences: new_user.preferences.unwrap_or_default(),
            created_at: Some(Local::now().naive_local()),
        };

        users.push(record.clone());
        self.store.save(Collection::Users, &users)?;
        info!(user_id = %record.id, "created user");

        Ok(record.into())
    }

    /// Match by email or username (case-insensitive) and password digest.
    pub fn authenticate(&self, login: &str, password: &str) -> Option<User> {
        if login.trim().is_empty() || password.is_empty() {
            return None;
        }
        let digest = hash_password(password);

        let user = self
            .records()
            .into_iter()
            .find(|u| u.matches_login(login.trim()) && u.password == digest)
            .map(User::from);

        if user.is_none() {
            debug!("authentication failed");
        }
        user
    }

    /// Replace the preferences object wholesale.
    pub fn update_preferences(
        &self,
        user_id: &str,
        preferences: Map<String, Value>,
    ) -> RippleResult<()> {
        let mut users: Records<UserRecord> = self.store.load_records(Collection::Users);
        let user = users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| RippleError::UserNotFound(user_id.to_string()))?;

        user.preferences = preferences;
        self.store.save(Collection::Users, &users)
    }

    pub fn get(&self, user_id: &str) -> Option<User> {
        self.records()
            .into_iter()
            .find(|u| u.id == user_id)
            .map(User::from)
    }

    pub fn list(&self) -> Vec<User> {
        self.records().into_iter().map(User::from).collect()
    }
}
