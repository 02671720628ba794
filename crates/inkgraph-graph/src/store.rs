//! The blog store: typed operations for Users, Posts and Categories.
//!
//! Reads live in `queries.rs`, writes in `mutations.rs`. Both are `impl`
//! blocks on [`GraphStore`].

use crate::client::GraphClient;
use crate::query::{Edge, Projection};
use crate::schema::{Label, AUTHORED_BY, IN_CATEGORY};

pub(crate) const USER_FIELDS: &[&str] = &["uid", "username", "email", "display_name", "avatar_img"];
pub(crate) const AUTHOR_FIELDS: &[&str] = &["uid", "username", "display_name", "avatar_img"];
pub(crate) const POST_FIELDS: &[&str] = &["uid", "title", "content", "tags"];
pub(crate) const CATEGORY_FIELDS: &[&str] = &["uid", "name"];

/// Post to author.
pub(crate) const POST_AUTHOR: Edge = Edge::outgoing(AUTHORED_BY, Label::User);
/// User to authored posts (reverse of [`POST_AUTHOR`]).
pub(crate) const USER_POSTS: Edge = POST_AUTHOR.reversed(Label::Post);
/// Post to category.
pub(crate) const POST_CATEGORY: Edge = Edge::outgoing(IN_CATEGORY, Label::Category);

/// Fields returned for a user. The credential is never among them.
pub(crate) fn user_projection() -> Projection {
    Projection::fields(USER_FIELDS.iter().copied()).timestamps(["date_joined"])
}

/// Fields returned for every post, with its author and category nested.
pub(crate) fn post_projection() -> Projection {
    Projection::fields(POST_FIELDS.iter().copied())
        .timestamps(["date_published"])
        .one(
            "author",
            POST_AUTHOR,
            Projection::fields(AUTHOR_FIELDS.iter().copied()),
        )
        .one(
            "category",
            POST_CATEGORY,
            Projection::fields(CATEGORY_FIELDS.iter().copied()),
        )
}

/// Data-access layer for the blog, wrapping one shared connection.
///
/// Construct it once at startup with [`GraphStore::new`], hand clones to
/// request handlers, and call [`GraphStore::close`] at shutdown.
#[derive(Clone)]
pub struct GraphStore {
    client: GraphClient,
}

impl GraphStore {
    pub fn new(client: GraphClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &GraphClient {
        &self.client
    }

    pub fn close(self) {
        self.client.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{EdgeDirection, QueryBuilder, Selector};
    use inkgraph_core::Uid;

    #[test]
    fn author_edge_and_reverse_lookup_share_relation() {
        assert_eq!(POST_AUTHOR.direction(), EdgeDirection::Outgoing);
        assert_eq!(USER_POSTS.direction(), EdgeDirection::Incoming);
    }

    #[test]
    fn post_projection_nests_author_and_category() {
        let q = QueryBuilder::new(Label::Post, Selector::Uid(Uid::from("p1")))
            .first_only()
            .project(post_projection())
            .build()
            .unwrap();
        let text = q.text();
        assert!(text.contains("date_published: toString(n.date_published)"));
        assert!(text.contains("author: COLLECT { MATCH (n)-[:AUTHORED_BY]->(v0:User)"));
        assert!(text.contains("category: COLLECT { MATCH (n)-[:IN_CATEGORY]->(v1:Category)"));
        assert!(!text.contains(".pw"));
    }
}
