//! Text rendering of the feed snapshot: list view and detail overlay.

use std::fmt::Write as _;

use feed_core::FeedSnapshot;
use shared::protocol::Post;

const PREVIEW_CHARS: usize = 100;

/// First 100 characters of `content`, with `...` appended when cut.
pub fn preview(content: &str) -> String {
    let mut chars = content.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

pub fn render_feed(snapshot: &FeedSnapshot) -> String {
    let mut out = String::new();

    if let Some(error) = &snapshot.last_error {
        let _ = writeln!(out, "Error: {error}");
    }

    let _ = writeln!(out, "== Posts ==");
    if snapshot.posts.is_empty() {
        if snapshot.busy {
            let _ = writeln!(out, "Loading posts...");
        } else if snapshot.last_error.is_none() {
            let _ = writeln!(out, "No posts yet. Create one!");
        }
    }

    for post in &snapshot.posts {
        let _ = writeln!(out, "[{}] {}", post.id, post.title);
        let _ = writeln!(out, "    {}", preview(&post.content));
        let _ = writeln!(out, "    Comments: {}", post.comment_count());
    }

    if snapshot.busy && !snapshot.posts.is_empty() {
        let _ = writeln!(out, "(working...)");
    }

    out
}

pub fn render_detail(post: &Post) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== {} ==", post.title);
    let _ = writeln!(out, "{}", post.content);
    let _ = writeln!(out, "----");
    let _ = writeln!(out, "Comments ({}):", post.comment_count());

    if post.comments.is_empty() {
        let _ = writeln!(out, "No comments yet.");
    }
    for comment in &post.comments {
        let _ = writeln!(out, "  - {}", comment.content);
        let _ = writeln!(
            out,
            "    Commented on: {}",
            comment.created_at.display_local()
        );
    }
    out
}

pub fn render_draft(snapshot: &FeedSnapshot) -> String {
    format!(
        "Draft title: {:?}\nDraft content: {:?}\n",
        snapshot.draft.title, snapshot.draft.content
    )
}

/// Full screen: the list, then the open post if there is one.
pub fn render_screen(snapshot: &FeedSnapshot) -> String {
    let mut out = render_feed(snapshot);
    if let Some(post) = snapshot.selected_post() {
        out.push('\n');
        out.push_str(&render_detail(post));
    }
    out
}
