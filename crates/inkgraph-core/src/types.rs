//! Core domain types for the blog graph.
//!
//! Read-side records (`User`, `Post`, `Category`) are what callers receive
//! after normalization. Write-side inputs (`NewUser`, `NewPost`,
//! `EntryUpdate`) validate their shape before anything touches the store.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{InkgraphError, Result};
use crate::markup::Markup;
use crate::paging::Page;

// ── Identifiers ───────────────────────────────────────────────────

/// Opaque node identifier assigned by the database.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct Uid(pub String);

impl Uid {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Uid {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Uid {
    fn from(value: String) -> Self {
        Self(value)
    }
}

// ── Read-side records ─────────────────────────────────────────────

/// A registered account. The password credential is never part of it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub uid: Uid,
    pub username: String,
    pub email: String,
    pub display_name: Option<String>,
    pub avatar_img: String,
    pub date_joined: DateTime<Utc>,
}

/// The author fields embedded in post listings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserSummary {
    pub uid: Uid,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_img: String,
}

/// A shared category node referenced by posts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    pub uid: Uid,
    pub name: String,
}

/// A published post.
///
/// `content` has line breaks converted to markup; `content_raw` is the text
/// exactly as stored, for edit forms.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Post {
    pub uid: Uid,
    pub title: String,
    pub content: Markup,
    pub content_raw: String,
    pub date_published: DateTime<Utc>,
    pub author: UserSummary,
    pub tags: Vec<String>,
    pub category: Option<Category>,
}

/// A user together with one page of the posts they authored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPosts {
    pub user: UserSummary,
    pub posts: Page<Post>,
}

/// Result of checking a login attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginOutcome {
    Verified,
    Rejected,
    UnknownAccount,
}

// ── Lookups ───────────────────────────────────────────────────────

/// The single key a user lookup resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserKey {
    Uid(Uid),
    Email(String),
    Username(String),
}

/// Caller-supplied user identification.
///
/// Any of the keys may be set; empty strings count as absent. When several
/// are given, `uid` wins over `email`, which wins over `username`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserLookup {
    pub uid: Option<Uid>,
    pub username: Option<String>,
    pub email: Option<String>,
}

impl UserLookup {
    pub fn by_uid(uid: impl Into<Uid>) -> Self {
        Self {
            uid: Some(uid.into()),
            ..Default::default()
        }
    }

    pub fn by_username(username: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            ..Default::default()
        }
    }

    pub fn by_email(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            ..Default::default()
        }
    }

    /// Pick the identifying key, or fail if none was supplied.
    pub fn key(&self) -> Result<UserKey> {
        if let Some(uid) = self.uid.as_ref().filter(|u| !u.is_empty()) {
            return Ok(UserKey::Uid(uid.clone()));
        }
        if let Some(email) = non_blank(&self.email) {
            return Ok(UserKey::Email(email.to_string()));
        }
        if let Some(username) = non_blank(&self.username) {
            return Ok(UserKey::Username(username.to_string()));
        }
        Err(InkgraphError::invalid(
            "a user lookup needs one of uid, email or username",
        ))
    }
}

impl From<UserKey> for UserLookup {
    fn from(key: UserKey) -> Self {
        match key {
            UserKey::Uid(uid) => Self::by_uid(uid),
            UserKey::Email(email) => Self::by_email(email),
            UserKey::Username(username) => Self::by_username(username),
        }
    }
}

impl From<Uid> for UserLookup {
    fn from(uid: Uid) -> Self {
        Self::by_uid(uid)
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

// ── Write-side inputs ─────────────────────────────────────────────

/// Registration form data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl NewUser {
    pub fn validate(&self) -> Result<()> {
        require("username", &self.username)?;
        require_email(&self.email)?;
        require("password", &self.password)
    }
}

/// Data for publishing a post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub author: Uid,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub category: Option<Uid>,
}

impl NewPost {
    pub fn validate(&self) -> Result<()> {
        require("title", &self.title)?;
        if self.author.is_empty() {
            return Err(InkgraphError::invalid("a post needs an author uid"));
        }
        if let Some(category) = &self.category {
            if category.is_empty() {
                return Err(InkgraphError::invalid("category uid is empty"));
            }
        }
        Ok(())
    }
}

fn require_email(email: &str) -> Result<()> {
    require("email", email)?;
    if !email.contains('@') {
        return Err(InkgraphError::invalid(format!(
            "email {email:?} is not an address"
        )));
    }
    Ok(())
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(InkgraphError::invalid(format!("{field} must not be empty")));
    }
    Ok(())
}

/// A value written by a partial update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

/// Properties that a partial update may overwrite, and whether they hold a list.
pub const UPDATABLE_FIELDS: &[(&str, bool)] = &[
    ("username", false),
    ("email", false),
    ("pw", false),
    ("display_name", false),
    ("avatar_img", false),
    ("title", false),
    ("content", false),
    ("tags", true),
];

/// Properties assigned once by the store and never rewritten.
pub const IMMUTABLE_FIELDS: &[&str] = &["uid", "date_joined", "date_published"];

/// Name of the password credential property.
pub const PASSWORD_FIELD: &str = "pw";

/// A partial field map applied to an existing node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryUpdate {
    fields: BTreeMap<String, FieldValue>,
}

impl EntryUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter.
    pub fn set(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Reject empty updates, unknown or immutable fields, and values of the wrong shape.
    pub fn validate(&self) -> Result<()> {
        if self.fields.is_empty() {
            return Err(InkgraphError::invalid("update has no fields"));
        }
        for (field, value) in &self.fields {
            if IMMUTABLE_FIELDS.contains(&field.as_str()) {
                return Err(InkgraphError::invalid(format!(
                    "field {field:?} cannot be updated"
                )));
            }
            let Some(&(_, is_list)) = UPDATABLE_FIELDS
                .iter()
                .find(|(name, _)| *name == field.as_str())
            else {
                return Err(InkgraphError::invalid(format!("unknown field {field:?}")));
            };
            match (is_list, value) {
                (true, FieldValue::List(_)) | (false, FieldValue::Text(_)) => {}
                (true, FieldValue::Text(_)) => {
                    return Err(InkgraphError::invalid(format!(
                        "field {field:?} expects a list"
                    )))
                }
                (false, FieldValue::List(_)) => {
                    return Err(InkgraphError::invalid(format!(
                        "field {field:?} expects a string"
                    )))
                }
            }
        }
        for (field, value) in &self.fields {
            let FieldValue::Text(text) = value else {
                continue;
            };
            match field.as_str() {
                "email" => require_email(text)?,
                "username" | "title" | PASSWORD_FIELD => require(field, text)?,
                _ => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_without_keys_is_invalid() {
        let err = UserLookup::default().key().unwrap_err();
        assert!(matches!(err, InkgraphError::InvalidArgument(_)));

        let blank = UserLookup {
            username: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(blank.key().is_err());
    }

    #[test]
    fn lookup_prefers_uid_then_email_then_username() {
        let all = UserLookup {
            uid: Some(Uid::from("u-1")),
            username: Some("alice".to_string()),
            email: Some("alice@example.com".to_string()),
        };
        assert_eq!(all.key().unwrap(), UserKey::Uid(Uid::from("u-1")));

        let no_uid = UserLookup {
            uid: None,
            ..all.clone()
        };
        assert_eq!(
            no_uid.key().unwrap(),
            UserKey::Email("alice@example.com".to_string())
        );

        assert_eq!(
            UserLookup::by_username("alice").key().unwrap(),
            UserKey::Username("alice".to_string())
        );
    }

    #[test]
    fn new_user_requires_fields() {
        let mut user = NewUser {
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password: "hunter22".to_string(),
            display_name: None,
        };
        assert!(user.validate().is_ok());

        user.email = "not-an-address".to_string();
        assert!(user.validate().is_err());

        user.email = "alice@example.com".to_string();
        user.password.clear();
        assert!(user.validate().is_err());
    }

    #[test]
    fn new_post_requires_title_and_author() {
        let post = NewPost {
            title: "Hello".to_string(),
            content: "body".to_string(),
            author: Uid::from("u-1"),
            tags: vec![],
            category: None,
        };
        assert!(post.validate().is_ok());

        let untitled = NewPost {
            title: String::new(),
            ..post.clone()
        };
        assert!(untitled.validate().is_err());

        let orphan = NewPost {
            author: Uid::from(""),
            ..post
        };
        assert!(orphan.validate().is_err());
    }

    #[test]
    fn update_validation() {
        assert!(EntryUpdate::new().validate().is_err());

        let ok = EntryUpdate::new()
            .set("title", "New title")
            .set("tags", vec!["rust".to_string()]);
        assert!(ok.validate().is_ok());

        let immutable = EntryUpdate::new().set("date_published", "2020-01-01");
        assert!(immutable.validate().is_err());

        let unknown = EntryUpdate::new().set("is_admin", "true");
        assert!(unknown.validate().is_err());

        let wrong_shape = EntryUpdate::new().set("tags", "rust");
        assert!(wrong_shape.validate().is_err());

        let blank_pw = EntryUpdate::new().set("pw", "");
        assert!(blank_pw.validate().is_err());
    }

    #[test]
    fn update_applies_registration_rules_to_identity_fields() {
        for (field, value) in [
            ("username", ""),
            ("username", "   "),
            ("email", ""),
            ("email", "not-an-address"),
            ("title", " "),
        ] {
            let update = EntryUpdate::new().set(field, value);
            assert!(
                matches!(update.validate(), Err(InkgraphError::InvalidArgument(_))),
                "{field}={value:?} should be rejected"
            );
        }

        let ok = EntryUpdate::new()
            .set("username", "alice2")
            .set("email", "alice2@example.com")
            .set("display_name", "");
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn update_deserializes_from_json_map() {
        let update: EntryUpdate =
            serde_json::from_str(r#"{"title": "t", "tags": ["a", "b"]}"#).unwrap();
        assert_eq!(update.get("title"), Some(&FieldValue::from("t")));
        assert_eq!(
            update.get("tags"),
            Some(&FieldValue::List(vec!["a".to_string(), "b".to_string()]))
        );
        assert!(update.validate().is_ok());
    }

    #[test]
    fn login_outcome_serializes_snake_case() {
        let json = serde_json::to_string(&LoginOutcome::UnknownAccount).unwrap();
        assert_eq!(json, "\"unknown_account\"");
    }
}
