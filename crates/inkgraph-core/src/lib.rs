//! inkgraph-core: Shared types and payload normalization for the inkgraph blog store.
//!
//! This crate provides the pieces every layer agrees on:
//! - Domain records (User, Post, Category) and write inputs
//! - Pagination requests and page counting
//! - Line-break markup for post content
//! - Timestamp parsing for stored date strings
//! - Common error types

pub mod error;
pub mod markup;
pub mod paging;
pub mod timestamp;
pub mod types;

pub use error::InkgraphError;
pub use markup::Markup;
pub use paging::{page_count, Page, Pagination};
pub use timestamp::parse_timestamp;
pub use types::{
    Category, EntryUpdate, FieldValue, LoginOutcome, NewPost, NewUser, Post, Uid, User, UserKey,
    UserLookup, UserPosts, UserSummary,
};
