//! Argument types shared by several subcommands.

use anyhow::{anyhow, bail};
use clap::Args;

use inkgraph_core::types::UPDATABLE_FIELDS;
use inkgraph_core::{EntryUpdate, FieldValue, Pagination, Uid, UserLookup};

/// Identify a user by any one key. With several, uid beats email beats username.
#[derive(Debug, Clone, Default, Args)]
pub struct UserArgs {
    #[arg(long)]
    pub uid: Option<String>,

    #[arg(long)]
    pub username: Option<String>,

    #[arg(long)]
    pub email: Option<String>,
}

impl From<UserArgs> for UserLookup {
    fn from(args: UserArgs) -> Self {
        UserLookup {
            uid: args.uid.map(Uid::from),
            username: args.username,
            email: args.email,
        }
    }
}

#[derive(Debug, Clone, Default, Args)]
pub struct PageArgs {
    /// Page number, starting at 1.
    #[arg(long, default_value_t = 1)]
    pub page: u32,

    /// Posts per page (default: blog.posts_per_page).
    #[arg(long)]
    pub page_size: Option<u32>,
}

impl PageArgs {
    pub fn pagination(&self, default_size: u32) -> anyhow::Result<Pagination> {
        Ok(Pagination::new(
            self.page,
            self.page_size.unwrap_or(default_size),
        )?)
    }
}

/// Parse `field=value` assignments into an update. List fields take a
/// comma-separated value; blank items are dropped.
pub fn parse_update(assignments: &[String]) -> anyhow::Result<EntryUpdate> {
    let mut update = EntryUpdate::new();
    for assignment in assignments {
        let (field, value) = assignment
            .split_once('=')
            .ok_or_else(|| anyhow!("expected field=value, got {assignment:?}"))?;
        let field = field.trim();
        if update.get(field).is_some() {
            bail!("field {field:?} given more than once");
        }

        let is_list = UPDATABLE_FIELDS
            .iter()
            .any(|(name, list)| *name == field && *list);
        let value = if is_list {
            FieldValue::List(
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect(),
            )
        } else {
            FieldValue::Text(value.to_string())
        };
        update.insert(field, value);
    }
    update.validate()?;
    Ok(update)
}
