//! inkgraph graph store: the Neo4j data layer for the blog.
//!
//! All reads and writes of Users, Posts and Categories go through
//! [`GraphStore`]. Reads build Cypher with [`query::QueryBuilder`]; every
//! write runs in its own transaction and is committed or rolled back before
//! the call returns.

pub mod client;
pub mod credentials;
pub mod mutations;
pub mod normalize;
pub mod queries;
pub mod query;
pub mod schema;
pub mod store;
pub mod txn;

pub use client::{GraphClient, GraphConfig, GraphError};
pub use schema::{initialize_schema, Label};
pub use store::GraphStore;
