//! Feed snapshot, status flags, selection and form draft behind one writer API.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use shared::{
    domain::PostId,
    protocol::{CreatePostRequest, Post},
};
use tokio::sync::broadcast;
use tracing::debug;

use crate::{error::FeedError, FeedEvent};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Post currently open in the detail view.
///
/// Holds a copy taken at selection time; later refreshes do not update it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Selection {
    #[default]
    NoSelection,
    PostSelected(Post),
}

impl Selection {
    pub fn post(&self) -> Option<&Post> {
        match self {
            Self::NoSelection => None,
            Self::PostSelected(post) => Some(post),
        }
    }

    pub fn post_id(&self) -> Option<PostId> {
        self.post().map(|post| post.id)
    }
}

/// Values typed into the create-post form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostDraft {
    pub title: String,
    pub content: String,
}

impl PostDraft {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_empty() && self.content.is_empty()
    }
}

/// Builds the creation payload, rejecting blank fields.
///
/// The payload carries the values as typed; trimming is only used for the check.
pub fn validate_post_input(title: &str, content: &str) -> Result<CreatePostRequest, FeedError> {
    if title.trim().is_empty() || content.trim().is_empty() {
        return Err(FeedError::Validation);
    }
    Ok(CreatePostRequest {
        title: title.to_string(),
        content: content.to_string(),
    })
}

/// Owned point-in-time copy of everything the render layer reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedSnapshot {
    /// Server order, never re-sorted.
    pub posts: Vec<Post>,
    pub busy: bool,
    pub last_error: Option<String>,
    pub selection: Selection,
    pub draft: PostDraft,
}

impl FeedSnapshot {
    pub fn find_post(&self, post_id: PostId) -> Option<&Post> {
        self.posts.iter().find(|post| post.id == post_id)
    }

    pub fn selected_post(&self) -> Option<&Post> {
        self.selection.post()
    }
}

/// Mutable feed state. Every transition returns the events it produced.
#[derive(Debug, Default)]
pub struct FeedState {
    snapshot: FeedSnapshot,
}

impl FeedState {
    pub fn snapshot(&self) -> FeedSnapshot {
        self.snapshot.clone()
    }

    pub fn begin_request(&mut self) -> Vec<FeedEvent> {
        let mut events = Vec::with_capacity(2);
        if !self.snapshot.busy {
            self.snapshot.busy = true;
            events.push(FeedEvent::BusyChanged(true));
        }
        if self.snapshot.last_error.take().is_some() {
            events.push(FeedEvent::ErrorChanged(None));
        }
        events
    }

    pub fn finish_request(&mut self) -> Vec<FeedEvent> {
        if !self.snapshot.busy {
            return Vec::new();
        }
        self.snapshot.busy = false;
        vec![FeedEvent::BusyChanged(false)]
    }

    pub fn replace_posts(&mut self, posts: Vec<Post>) -> Vec<FeedEvent> {
        let count = posts.len();
        self.snapshot.posts = posts;
        vec![FeedEvent::PostsReplaced { count }]
    }

    pub fn record_error(&mut self, message: impl Into<String>) -> Vec<FeedEvent> {
        let message = message.into();
        self.snapshot.last_error = Some(message.clone());
        vec![FeedEvent::ErrorChanged(Some(message))]
    }

    pub fn select_post(&mut self, post: &Post) -> Vec<FeedEvent> {
        self.snapshot.selection = Selection::PostSelected(post.clone());
        vec![FeedEvent::SelectionChanged(Some(post.id))]
    }

    pub fn clear_selection(&mut self) -> Vec<FeedEvent> {
        match std::mem::take(&mut self.snapshot.selection) {
            Selection::NoSelection => Vec::new(),
            Selection::PostSelected(_) => vec![FeedEvent::SelectionChanged(None)],
        }
    }

    pub fn set_draft_title(&mut self, title: impl Into<String>) -> Vec<FeedEvent> {
        self.snapshot.draft.title = title.into();
        vec![FeedEvent::DraftChanged]
    }

    pub fn set_draft_content(&mut self, content: impl Into<String>) -> Vec<FeedEvent> {
        self.snapshot.draft.content = content.into();
        vec![FeedEvent::DraftChanged]
    }

    pub fn clear_draft(&mut self) -> Vec<FeedEvent> {
        if self.snapshot.draft.is_empty() {
            return Vec::new();
        }
        self.snapshot.draft = PostDraft::default();
        vec![FeedEvent::DraftChanged]
    }

    /// Clears the draft only when it is what `request` was built from, so a
    /// post created from other values leaves the form alone.
    pub fn clear_submitted_draft(&mut self, request: &CreatePostRequest) -> Vec<FeedEvent> {
        let draft = &self.snapshot.draft;
        if draft.title != request.title || draft.content != request.content {
            return Vec::new();
        }
        self.clear_draft()
    }
}

/// Shared handle to [`FeedState`] plus the event channel observers listen on.
#[derive(Clone)]
pub struct FeedStore {
    state: Arc<Mutex<FeedState>>,
    events: broadcast::Sender<FeedEvent>,
}

impl Default for FeedStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            state: Arc::new(Mutex::new(FeedState::default())),
            events,
        }
    }

    fn lock(&self) -> MutexGuard<'_, FeedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs one transition under the lock, then publishes its events.
    pub fn apply<F>(&self, transition: F)
    where
        F: FnOnce(&mut FeedState) -> Vec<FeedEvent>,
    {
        let events = {
            let mut guard = self.lock();
            transition(&mut *guard)
        };
        for event in events {
            debug!(?event, "feed state transition");
            let _ = self.events.send(event);
        }
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        self.lock().snapshot()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FeedEvent> {
        self.events.subscribe()
    }

    /// Marks a request in flight until the returned guard is dropped.
    pub fn begin_request(&self) -> BusyGuard {
        self.apply(FeedState::begin_request);
        BusyGuard {
            store: self.clone(),
        }
    }
}

/// Clears the busy flag when dropped, on every exit path.
#[must_use = "dropping the guard immediately clears the busy flag"]
pub struct BusyGuard {
    store: FeedStore,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.store.apply(FeedState::finish_request);
    }
}

#[cfg(test)]
#[path = "tests/state_tests.rs"]
mod tests;
