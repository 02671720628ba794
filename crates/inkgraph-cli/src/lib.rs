//! inkgraph-cli: command-line access to the blog store.
//!
//! Settings loading and argument helpers live here so they can be tested
//! without a database; `main.rs` wires them to [`inkgraph_graph::GraphStore`].

pub mod args;
pub mod config;
