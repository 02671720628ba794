//! Graph layout: node labels, relationship types, constraints and indexes.

use std::fmt;

use neo4rs::query;

use crate::client::{GraphClient, GraphError};

/// Node labels used by the blog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Label {
    User,
    Post,
    Category,
}

impl Label {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Post => "Post",
            Self::Category => "Category",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `(:Post)-[:AUTHORED_BY]->(:User)`: ownership, exactly one per post.
pub const AUTHORED_BY: &str = "AUTHORED_BY";

/// `(:Post)-[:IN_CATEGORY]->(:Category)`: optional, shared.
pub const IN_CATEGORY: &str = "IN_CATEGORY";

/// Cypher statements for schema initialization.
const SCHEMA_STATEMENTS: &[&str] = &[
    // Uniqueness constraints
    "CREATE CONSTRAINT user_uid IF NOT EXISTS FOR (n:User) REQUIRE n.uid IS UNIQUE",
    "CREATE CONSTRAINT user_username IF NOT EXISTS FOR (n:User) REQUIRE n.username IS UNIQUE",
    "CREATE CONSTRAINT user_email IF NOT EXISTS FOR (n:User) REQUIRE n.email IS UNIQUE",
    "CREATE CONSTRAINT post_uid IF NOT EXISTS FOR (n:Post) REQUIRE n.uid IS UNIQUE",
    "CREATE CONSTRAINT category_uid IF NOT EXISTS FOR (n:Category) REQUIRE n.uid IS UNIQUE",
    "CREATE CONSTRAINT category_name IF NOT EXISTS FOR (n:Category) REQUIRE n.name IS UNIQUE",
    // Listing order
    "CREATE INDEX post_date_published IF NOT EXISTS FOR (n:Post) ON (n.date_published)",
];

/// Create constraints and indexes. Safe to run repeatedly.
pub async fn initialize_schema(client: &GraphClient) -> Result<(), GraphError> {
    tracing::info!("Initializing graph schema");

    for statement in SCHEMA_STATEMENTS {
        client.run(query(statement)).await?;
    }

    tracing::info!(
        statements = SCHEMA_STATEMENTS.len(),
        "Graph schema initialized"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_render_as_node_types() {
        assert_eq!(Label::User.as_str(), "User");
        assert_eq!(Label::Post.to_string(), "Post");
        assert_eq!(Label::Category.as_str(), "Category");
    }

    #[test]
    fn schema_statements_are_idempotent() {
        assert!(SCHEMA_STATEMENTS.iter().all(|s| s.contains("IF NOT EXISTS")));
    }

    #[test]
    fn lookup_fields_are_unique() {
        for field in ["n.uid", "n.username", "n.email", "n.name"] {
            assert!(
                SCHEMA_STATEMENTS
                    .iter()
                    .any(|s| s.contains(field) && s.contains("IS UNIQUE")),
                "{field} should be unique"
            );
        }
    }
}
