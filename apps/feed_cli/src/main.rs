use std::{io::Write as _, path::PathBuf, sync::Arc};

use anyhow::Result;
use clap::{Parser, Subcommand};
use feed_core::{load_settings, FeedController};
use shared::domain::PostId;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::broadcast::error::RecvError,
    task::JoinHandle,
};
use tracing_subscriber::EnvFilter;

mod commands;
mod render;

use commands::{dispatch, parse_command, Flow};

#[derive(Parser, Debug)]
#[command(name = "feed", about = "Browse and post to the social feed")]
struct Args {
    /// Content API base url; overrides feed.toml and the environment.
    #[arg(long)]
    base_url: Option<String>,
    /// Settings file to read instead of ./feed.toml.
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the feed once.
    List,
    /// Print one post with its comments.
    Show { id: i64 },
    /// Create a post, then print the refreshed feed.
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
    },
    /// Prompt for commands until `quit` (default).
    Interactive,
}

fn spawn_event_log(controller: &FeedController) -> JoinHandle<()> {
    let mut events = controller.subscribe_events();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => tracing::debug!(?event, "feed event"),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "feed event log fell behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

async fn run_interactive(controller: &Arc<FeedController>) -> Result<()> {
    println!("{}", render::render_screen(&controller.snapshot()));
    println!("type 'help' for commands");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(message) => {
                println!("{message}");
                continue;
            }
        };
        match dispatch(controller, command).await {
            (Flow::Continue, output) => print!("{output}"),
            (Flow::Exit, _) => break,
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = load_settings(args.config.as_deref())?;
    if let Some(base_url) = args.base_url.as_deref() {
        settings = settings.with_base_url(base_url)?;
    }

    let controller = FeedController::connect(&settings).await?;
    let event_log = spawn_event_log(&controller);

    let result = match args.command.unwrap_or(Command::Interactive) {
        Command::List => {
            print!("{}", render::render_feed(&controller.snapshot()));
            Ok(())
        }
        Command::Show { id } => {
            let snapshot = controller.snapshot();
            match snapshot.find_post(PostId(id)) {
                Some(post) => {
                    controller.select_post(post);
                    print!("{}", render::render_detail(post));
                    Ok(())
                }
                None => {
                    print!("{}", render::render_feed(&snapshot));
                    Err(anyhow::anyhow!("no post with id {id} in the feed"))
                }
            }
        }
        Command::Create { title, content } => {
            controller.set_draft_title(title);
            controller.set_draft_content(content);
            match controller.submit_draft().await {
                Ok(pending) => {
                    let _ = pending.wait().await;
                    print!("{}", render::render_screen(&controller.snapshot()));
                    Ok(())
                }
                Err(err) => {
                    print!("{}", render::render_screen(&controller.snapshot()));
                    Err(anyhow::Error::new(err).context("post was not created"))
                }
            }
        }
        Command::Interactive => run_interactive(&controller).await,
    };

    event_log.abort();
    result
}
