//! Write operations on the blog graph.
//!
//! Each write is a single statement in its own transaction (see
//! [`GraphClient::mutate`](crate::client::GraphClient::mutate)). Uids and
//! timestamps are assigned by the server with `randomUUID()` and
//! `datetime()`. Timestamps stay native so `ORDER BY` compares instants.

use neo4rs::query;

use inkgraph_core::types::PASSWORD_FIELD;
use inkgraph_core::{EntryUpdate, FieldValue, NewPost, NewUser, Uid};

use crate::client::GraphError;
use crate::credentials::hash_password;
use crate::normalize::{decode, DEFAULT_AVATAR};
use crate::query::ident;
use crate::store::GraphStore;

impl GraphStore {
    // ── Creation ─────────────────────────────────────────────────

    /// Register a user. The password is hashed before it is written and the
    /// join date is stamped by the server.
    pub async fn create_user(&self, user: &NewUser) -> Result<Uid, GraphError> {
        user.validate()?;
        let pw = hash_password(&user.password)?;

        let q = query(
            "CREATE (n:User {
               uid: randomUUID(), username: $username, email: $email, pw: $pw,
               display_name: $display_name, avatar_img: $avatar_img,
               date_joined: datetime()
             })
             RETURN n.uid AS uid",
        )
        .param("username", user.username.clone())
        .param("email", user.email.clone())
        .param("pw", pw)
        .param("display_name", opt_string(&user.display_name))
        .param("avatar_img", DEFAULT_AVATAR);

        let uid = self.created_uid("create_user", q).await?;
        tracing::info!(uid = %uid, username = %user.username, "User created");
        Ok(uid)
    }

    /// Publish a post owned by `post.author`, optionally in a category.
    ///
    /// The author edge is created in the same statement as the post, so a
    /// post never exists without one. An unknown author or category uid is
    /// an invalid argument and nothing is written.
    pub async fn create_post(&self, post: &NewPost) -> Result<Uid, GraphError> {
        post.validate()?;
        let category = post
            .category
            .as_ref()
            .map(|c| c.0.clone())
            .unwrap_or_default();

        let q = query(
            "MATCH (a:User) WHERE a.uid = $author
             OPTIONAL MATCH (c:Category) WHERE c.uid = $category
             WITH a, c WHERE $category = '' OR c IS NOT NULL
             CREATE (p:Post {
               uid: randomUUID(), title: $title, content: $content, tags: $tags,
               date_published: datetime()
             })
             CREATE (p)-[:AUTHORED_BY]->(a)
             FOREACH (cat IN CASE WHEN c IS NULL THEN [] ELSE [c] END |
               CREATE (p)-[:IN_CATEGORY]->(cat))
             RETURN p.uid AS uid",
        )
        .param("author", post.author.0.clone())
        .param("category", category)
        .param("title", post.title.clone())
        .param("content", post.content.clone())
        .param("tags", post.tags.clone());

        let rows = self.client().mutate("create_post", q).await?;
        let Some(row) = rows.first() else {
            return Err(GraphError::InvalidArgument(format!(
                "author {} or category {:?} does not exist",
                post.author,
                post.category.as_ref().map(Uid::as_str)
            )));
        };
        let uid = Uid(decode::<String>(row, "uid")?);
        tracing::info!(uid = %uid, author = %post.author, "Post created");
        Ok(uid)
    }

    /// Create a category. Names are unique.
    pub async fn create_category(&self, name: &str) -> Result<Uid, GraphError> {
        if name.trim().is_empty() {
            return Err(GraphError::InvalidArgument(
                "category name must not be empty".to_string(),
            ));
        }

        let q = query(
            "CREATE (n:Category {uid: randomUUID(), name: $name})
             RETURN n.uid AS uid",
        )
        .param("name", name.to_string());

        let uid = self.created_uid("create_category", q).await?;
        tracing::info!(uid = %uid, name, "Category created");
        Ok(uid)
    }

    // ── Updates ──────────────────────────────────────────────────

    /// Overwrite some properties of the node with `uid`.
    ///
    /// Returns `Ok(false)` when no node has that uid. A `pw` value is hashed
    /// before it is written.
    pub async fn update_entry(&self, uid: &Uid, update: &EntryUpdate) -> Result<bool, GraphError> {
        update.validate()?;
        let (cypher, values) = update_statement(update)?;

        let mut q = query(&cypher).param("uid", uid.0.clone());
        for (name, value) in values {
            q = match value {
                FieldValue::Text(s) => q.param(&name, s),
                FieldValue::List(list) => q.param(&name, list),
            };
        }

        let matched = self.matched_count("update_entry", q).await?;
        if matched == 0 {
            tracing::info!(uid = %uid, "Update matched no node");
        }
        Ok(matched > 0)
    }

    /// Replace a user's password credential.
    pub async fn reset_password(&self, uid: &Uid, password: &str) -> Result<bool, GraphError> {
        let update = EntryUpdate::new().set(PASSWORD_FIELD, password);
        self.update_entry(uid, &update).await
    }

    // ── Deletion ─────────────────────────────────────────────────

    /// Delete the node with `uid` and its relationships. Deleting a user also
    /// deletes the posts they authored. Returns `Ok(false)` when no node has
    /// that uid.
    pub async fn delete_entry(&self, uid: &Uid) -> Result<bool, GraphError> {
        let q = query(
            "MATCH (n) WHERE n.uid = $uid
             OPTIONAL MATCH (p:Post)-[:AUTHORED_BY]->(n)
             WITH n, collect(p) AS authored
             FOREACH (post IN authored | DETACH DELETE post)
             DETACH DELETE n
             RETURN count(n) AS matched",
        )
        .param("uid", uid.0.clone());

        let matched = self.matched_count("delete_entry", q).await?;
        tracing::info!(uid = %uid, deleted = matched > 0, "Delete processed");
        Ok(matched > 0)
    }

    // ── Helpers ──────────────────────────────────────────────────

    async fn created_uid(
        &self,
        operation: &'static str,
        q: neo4rs::Query,
    ) -> Result<Uid, GraphError> {
        let rows = self.client().mutate(operation, q).await?;
        let row = rows.first().ok_or_else(|| {
            GraphError::Serialization(format!("{operation} returned no uid"))
        })?;
        Ok(Uid(decode::<String>(row, "uid")?))
    }

    async fn matched_count(
        &self,
        operation: &'static str,
        q: neo4rs::Query,
    ) -> Result<i64, GraphError> {
        let rows = self.client().mutate(operation, q).await?;
        match rows.first() {
            Some(row) => decode::<i64>(row, "matched"),
            None => Ok(0),
        }
    }
}

/// Build the `SET` statement for an update. Values are bound as `$f0`,
/// `$f1`, ... in field order; a password is hashed here.
fn update_statement(update: &EntryUpdate) -> Result<(String, Vec<(String, FieldValue)>), GraphError> {
    let mut assignments = Vec::new();
    let mut values = Vec::new();
    for (i, (field, value)) in update.fields().enumerate() {
        let name = format!("f{i}");
        assignments.push(format!("n.{} = ${name}", ident(field)?));
        let value = match value {
            FieldValue::Text(s) if field == PASSWORD_FIELD => FieldValue::Text(hash_password(s)?),
            other => other.clone(),
        };
        values.push((name, value));
    }

    let cypher = format!(
        "MATCH (n) WHERE n.uid = $uid
         SET {}
         RETURN count(n) AS matched",
        assignments.join(", ")
    );
    Ok((cypher, values))
}

fn opt_string(opt: &Option<String>) -> String {
    opt.clone().unwrap_or_default()
}
