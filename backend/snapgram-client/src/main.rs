use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use snapgram_client::{AppError, Config, FeedItem, FeedPager, SignIn, Snapgram};

#[derive(Parser, Debug)]
#[command(name = "snapgram-client")]
#[command(about = "Browse a Snapgram backend from the command line", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Sign in with SNAPGRAM_EMAIL / SNAPGRAM_PASSWORD before running the command
    #[arg(long, global = true)]
    sign_in: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the home feed, newest first
    Feed {
        /// Number of pages to load
        #[arg(short, long, default_value_t = 1)]
        pages: usize,

        /// Only posts by this user id
        #[arg(long)]
        creator: Option<String>,
    },

    /// Search post captions
    Search {
        term: String,

        #[arg(short, long, default_value_t = 1)]
        pages: usize,
    },

    /// List users, newest first
    Users {
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show one post
    Post { id: String },

    /// Show the signed-in user
    Me,

    /// List the signed-in user's saved posts
    Saved,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_current_span(true)
                .with_line_number(true)
                .with_target(true),
        )
        .init();
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

async fn print_feed<T: FeedItem + Serialize>(pager: FeedPager<T>, pages: usize) -> Result<()> {
    let added = pager.fetch_pages(pages).await?;
    info!(
        items = added,
        pages = pager.pages_loaded(),
        more = pager.has_next_page(),
        "feed loaded"
    );
    for item in pager.items() {
        print_json(&item)?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{:#}", e), "command failed");
            match e.downcast_ref::<AppError>() {
                Some(app_error) => eprintln!("{}", app_error.user_message()),
                None => eprintln!("{:#}", e),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::from_env().context("failed to load configuration")?;
    let app = Snapgram::connect(config).context("failed to create backend client")?;

    if cli.sign_in {
        let form = SignIn {
            email: std::env::var("SNAPGRAM_EMAIL").context("SNAPGRAM_EMAIL must be set")?,
            password: std::env::var("SNAPGRAM_PASSWORD")
                .context("SNAPGRAM_PASSWORD must be set")?,
        };
        app.auth.sign_in(form).await.context("sign in failed")?;
    }

    match cli.command {
        Commands::Feed { pages, creator } => {
            let pager = match creator {
                Some(user_id) => app.creator_feed(user_id),
                None => app.home_feed(),
            };
            print_feed(pager, pages).await?;
        }
        Commands::Search { term, pages } => {
            print_feed(app.search_feed(term), pages).await?;
        }
        Commands::Users { limit } => {
            for user in app.users.get_users(limit).await? {
                print_json(&user)?;
            }
        }
        Commands::Post { id } => match app.posts.get_post(&id).await? {
            Some(post) => print_json(&post)?,
            None => return Err(AppError::NotFound(format!("post {}", id)).into()),
        },
        Commands::Me => match app.auth.current_user().await? {
            Some(user) => print_json(&user)?,
            None => warn!("not signed in"),
        },
        Commands::Saved => {
            let user = app.auth.current_user().await?.ok_or_else(|| {
                AppError::Unauthorized("saved posts require --sign-in".to_string())
            })?;
            for post in app.saves.saved_posts(&user.id).await? {
                print_json(&post)?;
            }
        }
    }

    if cli.sign_in {
        if let Err(e) = app.auth.sign_out().await {
            warn!(error = %e, "sign out failed");
        }
    }

    Ok(())
}
