//! Read operations on the blog graph.
//!
//! Every read is a single-shot query. "Not found" is `None` (or the
//! matching outcome), never an error.

use serde::Deserialize;

use inkgraph_core::{
    Category, LoginOutcome, Page, Pagination, Post, Uid, User, UserKey, UserLookup, UserPosts,
};

use crate::client::GraphError;
use crate::credentials::verify_password;
use crate::normalize::{
    decode, normalize_category, normalize_page, normalize_post, normalize_user, RawCategory,
    RawPost, RawUser, RawUserPosts,
};
use crate::query::{Ordering, Projection, QueryBuilder, Selector};
use crate::schema::Label;
use crate::store::{
    post_projection, user_projection, GraphStore, AUTHOR_FIELDS, CATEGORY_FIELDS, USER_POSTS,
};

/// Fields accepted by [`GraphStore::get_uid`], and the label that owns each.
/// `uid` is looked up across every label.
const LOOKUP_FIELDS: &[(&str, Option<Label>)] = &[
    ("uid", None),
    ("username", Some(Label::User)),
    ("email", Some(Label::User)),
    ("title", Some(Label::Post)),
    ("name", Some(Label::Category)),
];

#[derive(Debug, Deserialize)]
struct UidRow {
    uid: String,
}

#[derive(Debug, Deserialize)]
struct CredentialRow {
    uid: String,
    #[serde(default)]
    pw: Option<String>,
}

impl GraphStore {
    // ── Identifier Lookups ───────────────────────────────────────

    /// Resolve the uid of the node whose `field` equals `value`.
    ///
    /// If several nodes match, the lowest uid is returned.
    pub async fn get_uid(&self, field: &str, value: &str) -> Result<Option<Uid>, GraphError> {
        let Some(&(_, label)) = LOOKUP_FIELDS.iter().find(|(name, _)| *name == field) else {
            return Err(GraphError::InvalidArgument(format!(
                "{field:?} is not a lookup field"
            )));
        };

        let builder = match label {
            Some(label) => QueryBuilder::new(label, Selector::eq(field, value)),
            None => QueryBuilder::any(Selector::Uid(Uid::from(value))),
        };
        let q = builder
            .first_only()
            .project(Projection::fields(["uid"]))
            .build()?;

        match self.client().read_one(q.into_query()).await? {
            Some(row) => {
                let found: UidRow = decode(&row, "item")?;
                Ok(Some(Uid(found.uid)))
            }
            None => Ok(None),
        }
    }

    // ── Users ────────────────────────────────────────────────────

    /// Fetch a user by uid, email or username.
    pub async fn get_user(&self, lookup: impl Into<UserLookup>) -> Result<Option<User>, GraphError> {
        let lookup: UserLookup = lookup.into();
        let key = lookup.key()?;
        let q = QueryBuilder::new(Label::User, user_selector(&key))
            .first_only()
            .project(user_projection())
            .build()?;

        match self.client().read_one(q.into_query()).await? {
            Some(row) => {
                let raw: RawUser = decode(&row, "item")?;
                Ok(Some(normalize_user(raw)?))
            }
            None => Ok(None),
        }
    }

    /// Check a login attempt against the stored credential.
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<LoginOutcome, GraphError> {
        let q = QueryBuilder::new(Label::User, Selector::eq("email", email))
            .first_only()
            .project(Projection::fields(["uid", "pw"]))
            .build()?;

        let Some(row) = self.client().read_one(q.into_query()).await? else {
            return Ok(LoginOutcome::UnknownAccount);
        };
        let credential: CredentialRow = decode(&row, "item")?;
        let Some(stored) = credential.pw.as_deref() else {
            return Ok(LoginOutcome::Rejected);
        };

        match verify_password(password, stored) {
            Ok(true) => Ok(LoginOutcome::Verified),
            Ok(false) => Ok(LoginOutcome::Rejected),
            Err(e) => {
                tracing::warn!(uid = %credential.uid, error = %e, "Stored credential is unreadable");
                Ok(LoginOutcome::Rejected)
            }
        }
    }

    // ── Posts ────────────────────────────────────────────────────

    /// Fetch a post with its author and category. Uids of other node types
    /// yield `None`.
    pub async fn get_post(&self, uid: &Uid) -> Result<Option<Post>, GraphError> {
        let q = QueryBuilder::new(Label::Post, Selector::Uid(uid.clone()))
            .first_only()
            .project(post_projection())
            .build()?;

        match self.client().read_one(q.into_query()).await? {
            Some(row) => {
                let raw: RawPost = decode(&row, "item")?;
                Ok(Some(normalize_post(raw)?))
            }
            None => Ok(None),
        }
    }

    /// One page of all posts, newest first, with the total counted in the
    /// same statement.
    pub async fn list_posts(&self, pagination: Pagination) -> Result<Page<Post>, GraphError> {
        let q = QueryBuilder::new(Label::Post, Selector::All)
            .order_by(Ordering::desc("date_published"))
            .paginate(pagination)
            .project(post_projection())
            .with_total("total")
            .build()?;

        let Some(row) = self.client().read_one(q.into_query()).await? else {
            return Ok(Page::new(Vec::new(), 0, pagination));
        };
        let items: Vec<RawPost> = decode(&row, "items")?;
        let total: i64 = decode(&row, "total")?;

        tracing::debug!(
            page = pagination.page(),
            returned = items.len(),
            total,
            "Listed posts"
        );
        normalize_page(items, total, pagination)
    }

    /// One page of the posts a user authored, newest first, walking the
    /// author edge in reverse. Fails if the user cannot be resolved.
    pub async fn list_user_posts(
        &self,
        lookup: impl Into<UserLookup>,
        pagination: Pagination,
    ) -> Result<UserPosts, GraphError> {
        let lookup: UserLookup = lookup.into();
        let uid = match lookup.key()? {
            UserKey::Uid(uid) => uid,
            UserKey::Username(username) => self
                .get_uid("username", &username)
                .await?
                .ok_or_else(|| unknown_user("username", &username))?,
            UserKey::Email(email) => self
                .get_uid("email", &email)
                .await?
                .ok_or_else(|| unknown_user("email", &email))?,
        };

        let q = QueryBuilder::new(Label::User, Selector::Uid(uid.clone()))
            .first_only()
            .project(
                Projection::fields(AUTHOR_FIELDS.iter().copied())
                    .many(
                        "pub_posts",
                        USER_POSTS,
                        post_projection(),
                        Some(Ordering::desc("date_published")),
                        Some(pagination),
                    )
                    .count("total_posts", USER_POSTS),
            )
            .build()?;

        let row = self
            .client()
            .read_one(q.into_query())
            .await?
            .ok_or_else(|| unknown_user("uid", uid.as_str()))?;
        let raw: RawUserPosts = decode(&row, "item")?;
        let user = raw.summary();
        let posts = normalize_page(raw.pub_posts, raw.total_posts, pagination)?;

        Ok(UserPosts { user, posts })
    }

    // ── Categories ───────────────────────────────────────────────

    /// Every category, by name.
    pub async fn list_categories(&self) -> Result<Vec<Category>, GraphError> {
        let q = QueryBuilder::new(Label::Category, Selector::All)
            .order_by(Ordering::asc("name"))
            .project(Projection::fields(CATEGORY_FIELDS.iter().copied()))
            .build()?;

        let rows = self.client().read_rows(q.into_query()).await?;
        let mut categories = Vec::with_capacity(rows.len());
        for row in rows {
            let raw: RawCategory = decode(&row, "item")?;
            categories.push(normalize_category(raw));
        }
        Ok(categories)
    }
}

fn user_selector(key: &UserKey) -> Selector {
    match key {
        UserKey::Uid(uid) => Selector::Uid(uid.clone()),
        UserKey::Email(email) => Selector::eq("email", email.as_str()),
        UserKey::Username(username) => Selector::eq("username", username.as_str()),
    }
}

fn unknown_user(field: &str, value: &str) -> GraphError {
    GraphError::InvalidArgument(format!("no user with {field} {value:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_fields_map_to_labels() {
        let label_of = |field: &str| {
            LOOKUP_FIELDS
                .iter()
                .find(|(name, _)| *name == field)
                .map(|(_, label)| *label)
        };
        assert_eq!(label_of("username"), Some(Some(Label::User)));
        assert_eq!(label_of("email"), Some(Some(Label::User)));
        assert_eq!(label_of("name"), Some(Some(Label::Category)));
        assert_eq!(label_of("uid"), Some(None));
        assert_eq!(label_of("pw"), None);
    }

    #[test]
    fn user_selector_uses_the_resolved_key() {
        assert_eq!(
            user_selector(&UserKey::Email("a@b.c".to_string())),
            Selector::eq("email", "a@b.c")
        );
        assert_eq!(
            user_selector(&UserKey::Uid(Uid::from("u1"))),
            Selector::Uid(Uid::from("u1"))
        );
    }

    #[test]
    fn user_query_never_projects_the_credential() {
        let q = QueryBuilder::new(Label::User, user_selector(&UserKey::Username("alice".into())))
            .first_only()
            .project(user_projection())
            .build()
            .unwrap();
        assert!(!q.text().contains(".pw"));
        assert!(q.text().contains("date_joined: toString(n.date_joined)"));
    }

    #[test]
    fn unknown_user_is_invalid_argument() {
        assert!(unknown_user("username", "ghost").is_invalid_argument());
    }
}
