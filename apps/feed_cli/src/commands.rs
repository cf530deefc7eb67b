//! Commands typed at the interactive prompt and their dispatch to the controller.

use std::sync::Arc;

use feed_core::FeedController;
use shared::domain::PostId;

use crate::render;

pub const HELP: &str = "\
commands:
  refresh            reload the feed
  title <text>       set the new post title
  content <text>     set the new post content
  draft              show the current draft
  submit             create a post from the draft
  open <id>          show a post and its comments
  close              close the open post
  help               show this help
  quit               exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedCommand {
    Refresh,
    Title(String),
    Content(String),
    Draft,
    Submit,
    Open(PostId),
    Close,
    Help,
    Quit,
}

impl FeedCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Refresh => "refresh",
            Self::Title(_) => "title",
            Self::Content(_) => "content",
            Self::Draft => "draft",
            Self::Submit => "submit",
            Self::Open(_) => "open",
            Self::Close => "close",
            Self::Help => "help",
            Self::Quit => "quit",
        }
    }
}

pub fn parse_command(line: &str) -> Result<FeedCommand, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    match word.to_ascii_lowercase().as_str() {
        "refresh" | "r" => Ok(FeedCommand::Refresh),
        "title" => Ok(FeedCommand::Title(rest.to_string())),
        "content" => Ok(FeedCommand::Content(rest.to_string())),
        "draft" => Ok(FeedCommand::Draft),
        "submit" | "create" => Ok(FeedCommand::Submit),
        "open" | "show" => rest
            .parse::<i64>()
            .map(|id| FeedCommand::Open(PostId(id)))
            .map_err(|_| format!("'{rest}' is not a post id")),
        "close" => Ok(FeedCommand::Close),
        "help" | "?" => Ok(FeedCommand::Help),
        "quit" | "exit" | "q" => Ok(FeedCommand::Quit),
        "" => Err("empty command".to_string()),
        other => Err(format!("unknown command '{other}' (try 'help')")),
    }
}

pub enum Flow {
    Continue,
    Exit,
}

/// Runs one command and returns the text to print.
///
/// Controller failures are already in the snapshot, so they only show up in the
/// rendered screen.
pub async fn dispatch(controller: &Arc<FeedController>, command: FeedCommand) -> (Flow, String) {
    tracing::debug!(command = command.name(), "dispatching feed command");

    let output = match command {
        FeedCommand::Refresh => {
            let _ = controller.refresh_feed().await;
            render::render_screen(&controller.snapshot())
        }
        FeedCommand::Title(title) => {
            controller.set_draft_title(title);
            render::render_draft(&controller.snapshot())
        }
        FeedCommand::Content(content) => {
            controller.set_draft_content(content);
            render::render_draft(&controller.snapshot())
        }
        FeedCommand::Draft => render::render_draft(&controller.snapshot()),
        FeedCommand::Submit => {
            if let Ok(pending) = controller.submit_draft().await {
                let _ = pending.wait().await;
            }
            render::render_screen(&controller.snapshot())
        }
        FeedCommand::Open(post_id) => {
            let snapshot = controller.snapshot();
            match snapshot.find_post(post_id) {
                Some(post) => {
                    controller.select_post(post);
                    render::render_detail(post)
                }
                None => format!("No post with id {post_id} in the current feed.\n"),
            }
        }
        FeedCommand::Close => {
            controller.clear_selection();
            render::render_feed(&controller.snapshot())
        }
        FeedCommand::Help => format!("{HELP}\n"),
        FeedCommand::Quit => return (Flow::Exit, String::new()),
    };

    (Flow::Continue, output)
}
