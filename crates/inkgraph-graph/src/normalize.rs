//! Raw result shapes and their conversion into domain records.
//!
//! Map projections come back as plain maps with string timestamps and raw
//! text. Normalization parses the timestamps, converts content line breaks
//! into markup while keeping the raw text, fills the default avatar, and
//! turns counts into page metadata.

use neo4rs::Row;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use inkgraph_core::{
    parse_timestamp, Category, Markup, Page, Pagination, Post, Uid, User, UserSummary,
};

use crate::client::GraphError;

/// Avatar assigned at registration and assumed when none is stored.
pub const DEFAULT_AVATAR: &str = "default.jpg";

#[derive(Debug, Clone, Deserialize)]
pub struct RawUser {
    pub uid: String,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub avatar_img: Option<String>,
    pub date_joined: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawUserSummary {
    pub uid: String,
    pub username: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub avatar_img: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawCategory {
    pub uid: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawPost {
    pub uid: String,
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    pub date_published: String,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub author: Option<RawUserSummary>,
    #[serde(default)]
    pub category: Option<RawCategory>,
}

/// A user node with one page of authored posts and their count.
#[derive(Debug, Clone, Deserialize)]
pub struct RawUserPosts {
    pub uid: String,
    pub username: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub avatar_img: Option<String>,
    #[serde(default)]
    pub pub_posts: Vec<RawPost>,
    pub total_posts: i64,
}

impl RawUserPosts {
    pub fn summary(&self) -> UserSummary {
        normalize_summary(RawUserSummary {
            uid: self.uid.clone(),
            username: self.username.clone(),
            display_name: self.display_name.clone(),
            avatar_img: self.avatar_img.clone(),
        })
    }
}

pub fn normalize_user(raw: RawUser) -> Result<User, GraphError> {
    Ok(User {
        uid: Uid(raw.uid),
        username: raw.username,
        email: raw.email,
        display_name: non_empty(raw.display_name),
        avatar_img: avatar(raw.avatar_img),
        date_joined: parse_timestamp(&raw.date_joined)?,
    })
}

pub fn normalize_summary(raw: RawUserSummary) -> UserSummary {
    UserSummary {
        uid: Uid(raw.uid),
        username: raw.username,
        display_name: non_empty(raw.display_name),
        avatar_img: avatar(raw.avatar_img),
    }
}

pub fn normalize_category(raw: RawCategory) -> Category {
    Category {
        uid: Uid(raw.uid),
        name: raw.name,
    }
}

pub fn normalize_post(raw: RawPost) -> Result<Post, GraphError> {
    let author = raw.author.ok_or_else(|| {
        GraphError::Serialization(format!("post {} has no author edge", raw.uid))
    })?;
    let content_raw = raw.content.unwrap_or_default();

    Ok(Post {
        content: Markup::from_text(&content_raw),
        content_raw,
        date_published: parse_timestamp(&raw.date_published)?,
        uid: Uid(raw.uid),
        title: raw.title,
        author: normalize_summary(author),
        tags: raw.tags.unwrap_or_default(),
        category: raw.category.map(normalize_category),
    })
}

pub fn normalize_posts(raw: Vec<RawPost>) -> Result<Vec<Post>, GraphError> {
    raw.into_iter().map(normalize_post).collect()
}

/// Build a page from raw items and the count returned alongside them.
pub fn normalize_page(
    raw: Vec<RawPost>,
    total: i64,
    pagination: Pagination,
) -> Result<Page<Post>, GraphError> {
    let items = normalize_posts(raw)?;
    Ok(Page::new(items, count(total), pagination))
}

/// Read column `key` of a result row into `T`.
pub(crate) fn decode<T: DeserializeOwned>(row: &Row, key: &str) -> Result<T, GraphError> {
    row.get::<T>(key)
        .map_err(|e| GraphError::Serialization(format!("Failed to decode column {key}: {e}")))
}

/// Database counts are signed; a negative count never happens but maps to 0.
pub fn count(total: i64) -> u64 {
    u64::try_from(total).unwrap_or(0)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

fn avatar(value: Option<String>) -> String {
    non_empty(value).unwrap_or_else(|| DEFAULT_AVATAR.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Utc};
    use serde_json::json;

    fn raw_post(uid: &str, content: &str) -> RawPost {
        serde_json::from_value(json!({
            "uid": uid,
            "title": "Hello",
            "content": content,
            "date_published": "2024-05-01T10:00:00.000000000Z",
            "tags": ["rust", "graphs"],
            "author": {"uid": "u1", "username": "alice", "display_name": "", "avatar_img": null},
            "category": {"uid": "c1", "name": "Notes"}
        }))
        .unwrap()
    }

    #[test]
    fn post_content_keeps_raw_copy() {
        let original = "line one\nline two\r\nline three";
        let post = normalize_post(raw_post("p1", original)).unwrap();

        assert_eq!(post.content_raw, original);
        assert_eq!(post.content.as_str(), "line one<br>line two<br>line three");
        assert_eq!(post.date_published.year(), 2024);
        assert_eq!(post.tags, vec!["rust", "graphs"]);
        assert_eq!(post.category.unwrap().name, "Notes");
    }

    #[test]
    fn author_defaults_are_filled() {
        let post = normalize_post(raw_post("p1", "x")).unwrap();
        assert_eq!(post.author.username, "alice");
        assert_eq!(post.author.display_name, None);
        assert_eq!(post.author.avatar_img, DEFAULT_AVATAR);
    }

    #[test]
    fn post_without_author_is_rejected() {
        let raw: RawPost = serde_json::from_value(json!({
            "uid": "p2",
            "title": "Orphan",
            "content": "x",
            "date_published": "2024-05-01T10:00:00Z",
            "tags": null,
            "author": null,
            "category": null
        }))
        .unwrap();
        assert!(matches!(
            normalize_post(raw),
            Err(GraphError::Serialization(_))
        ));
    }

    #[test]
    fn missing_tags_and_category_are_empty() {
        let raw: RawPost = serde_json::from_value(json!({
            "uid": "p3",
            "title": "Bare",
            "date_published": "2024-05-01T10:00:00Z",
            "author": {"uid": "u1", "username": "alice"}
        }))
        .unwrap();
        let post = normalize_post(raw).unwrap();
        assert!(post.tags.is_empty());
        assert!(post.category.is_none());
        assert_eq!(post.content_raw, "");
    }

    #[test]
    fn user_join_date_is_parsed() {
        let now = Utc::now();
        let raw = RawUser {
            uid: "u1".to_string(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            display_name: Some("Alice".to_string()),
            avatar_img: Some("alice.png".to_string()),
            date_joined: now.to_rfc3339(),
        };
        let user = normalize_user(raw).unwrap();
        assert_eq!(user.date_joined, now);
        assert_eq!(user.avatar_img, "alice.png");
    }

    #[test]
    fn fraction_width_does_not_affect_instant_order() {
        let stamp = |date_published: &str| {
            let mut raw = raw_post("p", "x");
            raw.date_published = date_published.to_string();
            normalize_post(raw).unwrap().date_published
        };
        assert!(stamp("2024-05-01T10:00:00.12Z") < stamp("2024-05-01T10:00:00.123Z"));
        assert!(stamp("2024-05-01T10:00:00Z") < stamp("2024-05-01T10:00:00.001Z"));
    }

    #[test]
    fn bad_join_date_is_a_serialization_error() {
        let raw = RawUser {
            uid: "u1".to_string(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            display_name: None,
            avatar_img: None,
            date_joined: "not a date".to_string(),
        };
        assert!(matches!(
            normalize_user(raw),
            Err(GraphError::Serialization(_))
        ));
    }

    #[test]
    fn page_counts_come_from_reported_total() {
        let raw = (4..=6).map(|i| raw_post(&format!("p{i}"), "x")).collect();
        let page = normalize_page(raw, 7, Pagination::new(2, 3).unwrap()).unwrap();

        assert_eq!(page.items.len(), 3);
        assert_eq!(page.total, 7);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.items[0].uid, Uid::from("p4"));
    }

    #[test]
    fn user_posts_shape_deserializes() {
        let raw: RawUserPosts = serde_json::from_value(json!({
            "uid": "u1",
            "username": "alice",
            "display_name": "Alice",
            "avatar_img": "a.png",
            "pub_posts": [],
            "total_posts": 0
        }))
        .unwrap();
        assert_eq!(raw.summary().display_name.as_deref(), Some("Alice"));
        assert_eq!(count(raw.total_posts), 0);
        assert_eq!(count(-1), 0);
    }
}
