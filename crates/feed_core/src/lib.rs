use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use async_trait::async_trait;
use shared::{
    domain::PostId,
    protocol::{CreatePostRequest, Post},
};
use tokio::{sync::broadcast, task::JoinHandle};
use tracing::{debug, info, warn};

pub mod error;
pub mod settings;
pub mod state;
pub mod transport;

pub use error::{FeedError, FeedOperation, VALIDATION_MESSAGE};
pub use settings::{load_settings, ClientSettings, RefreshPolicy};
pub use state::{validate_post_input, FeedSnapshot, PostDraft, Selection};
pub use transport::{ApiFailure, ErrorBody, HttpFeedApi};

use state::{BusyGuard, FeedState, FeedStore};

/// Remote content API consumed by the controller.
#[async_trait]
pub trait FeedApi: Send + Sync {
    async fn list_posts(&self) -> Result<Vec<Post>, ApiFailure>;
    async fn create_post(&self, request: &CreatePostRequest) -> Result<(), ApiFailure>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    PostsReplaced { count: usize },
    BusyChanged(bool),
    ErrorChanged(Option<String>),
    SelectionChanged(Option<PostId>),
    DraftChanged,
}

/// A refresh that has been issued: sequence number taken, busy flag raised.
struct RefreshTicket {
    seq: u64,
    _busy: BusyGuard,
}

/// Re-fetch triggered by a successful post creation.
pub struct PendingRefresh {
    handle: JoinHandle<Result<(), FeedError>>,
}

impl PendingRefresh {
    /// Waits for the re-fetch to settle. Its outcome is already recorded in the
    /// controller state; the result is returned for callers that want it.
    pub async fn wait(self) -> Result<(), FeedError> {
        match self.handle.await {
            Ok(result) => result,
            Err(err) => {
                warn!(error = %err, "feed refresh task did not complete");
                Err(FeedError::transport(FeedOperation::FetchPosts))
            }
        }
    }
}

pub struct FeedController {
    api: Arc<dyn FeedApi>,
    store: FeedStore,
    refresh_policy: RefreshPolicy,
    refresh_seq: AtomicU64,
}

impl FeedController {
    pub fn new(api: Arc<dyn FeedApi>, refresh_policy: RefreshPolicy) -> Arc<Self> {
        Arc::new(Self {
            api,
            store: FeedStore::new(),
            refresh_policy,
            refresh_seq: AtomicU64::new(0),
        })
    }

    /// Builds a controller and runs the initial refresh.
    ///
    /// A failed initial refresh is recorded as the last error, not returned.
    pub async fn start(api: Arc<dyn FeedApi>, refresh_policy: RefreshPolicy) -> Arc<Self> {
        let controller = Self::new(api, refresh_policy);
        if let Err(err) = controller.refresh_feed().await {
            debug!(error = %err, "initial feed refresh failed");
        }
        controller
    }

    pub async fn connect(settings: &ClientSettings) -> anyhow::Result<Arc<Self>> {
        let api = HttpFeedApi::new(settings)?;
        info!(posts_url = %api.posts_url(), "starting feed controller");
        Ok(Self::start(Arc::new(api), settings.refresh_policy).await)
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        self.store.snapshot()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<FeedEvent> {
        self.store.subscribe()
    }

    /// Re-reads the full post list and replaces the local copy on success.
    ///
    /// On failure the current posts stay as they are and the error is recorded.
    pub async fn refresh_feed(&self) -> Result<(), FeedError> {
        let ticket = self.begin_refresh();
        self.complete_refresh(ticket).await
    }

    fn begin_refresh(&self) -> RefreshTicket {
        let seq = self.refresh_seq.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(seq, "issuing feed refresh");
        RefreshTicket {
            seq,
            _busy: self.store.begin_request(),
        }
    }

    fn is_superseded(&self, seq: u64) -> bool {
        self.refresh_policy == RefreshPolicy::LatestIssuedWins
            && self.refresh_seq.load(Ordering::SeqCst) != seq
    }

    async fn complete_refresh(&self, ticket: RefreshTicket) -> Result<(), FeedError> {
        let seq = ticket.seq;
        let outcome = self.api.list_posts().await;
        let superseded = self.is_superseded(seq);

        match outcome {
            Ok(posts) => {
                if superseded {
                    debug!(seq, count = posts.len(), "discarding superseded feed response");
                    return Ok(());
                }
                info!(seq, count = posts.len(), "feed refreshed");
                self.store.apply(|state| state.replace_posts(posts));
                Ok(())
            }
            Err(failure) => {
                let err = FeedError::from_failure(FeedOperation::FetchPosts, failure.clone());
                warn!(seq, error = %failure, "feed refresh failed");
                if !superseded {
                    self.store
                        .apply(|state| state.record_error(err.user_message()));
                }
                Err(err)
            }
        }
    }

    /// Sends a new post. Nothing is inserted locally; on success the draft is
    /// cleared if it still holds the submitted values, and a full refresh is
    /// spawned, which the returned handle tracks.
    pub async fn create_post(
        self: &Arc<Self>,
        title: &str,
        content: &str,
    ) -> Result<PendingRefresh, FeedError> {
        let request = match validate_post_input(title, content) {
            Ok(request) => request,
            Err(err) => {
                debug!("rejected post with empty title or content");
                self.store
                    .apply(|state| state.record_error(err.user_message()));
                return Err(err);
            }
        };

        let busy = self.store.begin_request();
        if let Err(failure) = self.api.create_post(&request).await {
            let err = FeedError::from_failure(FeedOperation::CreatePost, failure.clone());
            warn!(error = %failure, "post creation failed");
            self.store
                .apply(|state| state.record_error(err.user_message()));
            return Err(err);
        }

        info!(title = %request.title, "post created");
        self.store
            .apply(|state| state.clear_submitted_draft(&request));
        drop(busy);

        let ticket = self.begin_refresh();
        let controller = Arc::clone(self);
        let handle = tokio::spawn(async move { controller.complete_refresh(ticket).await });
        Ok(PendingRefresh { handle })
    }

    /// Submits whatever is currently in the draft.
    pub async fn submit_draft(self: &Arc<Self>) -> Result<PendingRefresh, FeedError> {
        let draft = self.snapshot().draft;
        self.create_post(&draft.title, &draft.content).await
    }

    pub fn set_draft_title(&self, title: impl Into<String>) {
        let title = title.into();
        self.store.apply(|state| state.set_draft_title(title));
    }

    pub fn set_draft_content(&self, content: impl Into<String>) {
        let content = content.into();
        self.store.apply(|state| state.set_draft_content(content));
    }

    /// Opens `post` in the detail view. Any post is accepted, listed or not.
    pub fn select_post(&self, post: &Post) {
        self.store.apply(|state| state.select_post(post));
    }

    pub fn clear_selection(&self) {
        self.store.apply(FeedState::clear_selection);
    }
}

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
