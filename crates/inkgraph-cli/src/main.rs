//! CLI entry point for the inkgraph blog store.

use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use tracing_subscriber::{fmt, EnvFilter};

use inkgraph_core::{NewPost, NewUser, Uid, UserLookup};
use inkgraph_graph::{initialize_schema, GraphClient, GraphStore};

use inkgraph_cli::args::{parse_update, PageArgs, UserArgs};
use inkgraph_cli::config::Settings;

#[derive(Parser)]
#[command(name = "inkgraph")]
#[command(about = "Manage users, posts and categories in the inkgraph store")]
struct Cli {
    /// Config file prefix (default: inkgraph).
    #[arg(short, long, default_value = "inkgraph", global = true)]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create uniqueness constraints and indexes.
    InitSchema,

    /// Register a user.
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        display_name: Option<String>,
    },

    /// Check a password.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },

    /// Show a user.
    User(UserArgs),

    /// Resolve the uid of a node by one of its fields.
    Uid {
        /// uid, username, email, title or name.
        field: String,
        value: String,
    },

    /// Publish a post.
    Publish {
        /// Author uid.
        #[arg(long)]
        author: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Category uid.
        #[arg(long)]
        category: Option<String>,
    },

    /// Create a category.
    Category { name: String },

    /// List categories.
    Categories,

    /// List all posts, newest first.
    Posts(PageArgs),

    /// List the posts of one user, newest first.
    UserPosts {
        #[command(flatten)]
        user: UserArgs,
        #[command(flatten)]
        page: PageArgs,
    },

    /// Show a post.
    Post { uid: String },

    /// Overwrite fields of any node: `--set title=New --set tags=a,b`.
    Update {
        uid: String,
        #[arg(long = "set", required = true)]
        assignments: Vec<String>,
    },

    /// Replace a user's password.
    ResetPassword {
        uid: String,
        #[arg(long)]
        password: String,
    },

    /// Delete a node and its relationships.
    Delete { uid: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .json()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = Settings::load(&cli.config)?;

    let client = GraphClient::connect(&settings.neo4j).await?;
    let store = GraphStore::new(client);

    let result = run(&store, &settings, cli.command).await;
    store.close();
    result
}

async fn run(store: &GraphStore, settings: &Settings, command: Command) -> anyhow::Result<()> {
    let page_size = settings.blog.posts_per_page;

    match command {
        Command::InitSchema => {
            initialize_schema(store.client()).await?;
            emit(&json!({ "schema": "ready" }))
        }
        Command::Register {
            username,
            email,
            password,
            display_name,
        } => {
            let uid = store
                .create_user(&NewUser {
                    username,
                    email,
                    password,
                    display_name,
                })
                .await?;
            emit(&json!({ "uid": uid }))
        }
        Command::Login { email, password } => {
            let outcome = store.authenticate(&email, &password).await?;
            emit(&json!({ "outcome": outcome }))
        }
        Command::User(args) => emit(&store.get_user(UserLookup::from(args)).await?),
        Command::Uid { field, value } => emit(&store.get_uid(&field, &value).await?),
        Command::Publish {
            author,
            title,
            content,
            tags,
            category,
        } => {
            let uid = store
                .create_post(&NewPost {
                    title,
                    content,
                    author: Uid::from(author),
                    tags,
                    category: category.map(Uid::from),
                })
                .await?;
            emit(&json!({ "uid": uid }))
        }
        Command::Category { name } => {
            let uid = store.create_category(&name).await?;
            emit(&json!({ "uid": uid }))
        }
        Command::Categories => emit(&store.list_categories().await?),
        Command::Posts(page) => emit(&store.list_posts(page.pagination(page_size)?).await?),
        Command::UserPosts { user, page } => {
            let pagination = page.pagination(page_size)?;
            emit(&store.list_user_posts(user, pagination).await?)
        }
        Command::Post { uid } => emit(&store.get_post(&Uid::from(uid)).await?),
        Command::Update { uid, assignments } => {
            let update = parse_update(&assignments)?;
            let updated = store.update_entry(&Uid::from(uid), &update).await?;
            emit(&json!({ "updated": updated }))
        }
        Command::ResetPassword { uid, password } => {
            let updated = store.reset_password(&Uid::from(uid), &password).await?;
            emit(&json!({ "updated": updated }))
        }
        Command::Delete { uid } => {
            let deleted = store.delete_entry(&Uid::from(uid)).await?;
            emit(&json!({ "deleted": deleted }))
        }
    }
}

fn emit<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
