//! Settings for the inkgraph command line.

use config::{ConfigError, Environment, File, Map};
use serde::Deserialize;

use inkgraph_graph::GraphConfig;

/// Environment prefix; `INKGRAPH__NEO4J__URI` sets `neo4j.uri`.
pub const ENV_PREFIX: &str = "INKGRAPH";

/// Top-level settings.
///
/// Loaded from `inkgraph.toml` (or another file prefix) and `INKGRAPH__`
/// environment variables. Missing sections fall back to defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub neo4j: GraphConfig,

    #[serde(default)]
    pub blog: BlogSettings,
}

/// Presentation settings for listings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct BlogSettings {
    /// Page size used when a listing command is not given one.
    #[serde(default = "default_posts_per_page")]
    pub posts_per_page: u32,
}

fn default_posts_per_page() -> u32 {
    5
}

impl Default for BlogSettings {
    fn default() -> Self {
        Self {
            posts_per_page: default_posts_per_page(),
        }
    }
}

impl Settings {
    /// Load settings from `<file_prefix>.{toml,json,yaml,...}` if present,
    /// then the process environment.
    pub fn load(file_prefix: &str) -> Result<Self, ConfigError> {
        Self::load_with_env(file_prefix, None)
    }

    /// As [`Settings::load`], reading variables from `env` instead of the
    /// process environment when given.
    pub fn load_with_env(
        file_prefix: &str,
        env: Option<Map<String, String>>,
    ) -> Result<Self, ConfigError> {
        config::Config::builder()
            .add_source(File::with_name(file_prefix).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()?
            .try_deserialize()
    }
}
