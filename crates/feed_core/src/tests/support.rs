use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{any, get},
    Json, Router,
};
use shared::{
    domain::{CommentId, PostId, Timestamp},
    protocol::{Comment, CreatePostRequest, Post},
};
use tokio::{net::TcpListener, sync::Mutex};

use crate::settings::ClientSettings;

pub fn post(id: i64, title: &str, content: &str) -> Post {
    Post {
        id: PostId(id),
        created_at: Timestamp::new("2024-05-01T10:00:00Z"),
        updated_at: Timestamp::new("2024-05-01T10:00:00Z"),
        deleted_at: None,
        title: title.to_string(),
        content: content.to_string(),
        comments: Vec::new(),
    }
}

pub fn comment(id: i64, post_id: i64, content: &str) -> Comment {
    Comment {
        id: CommentId(id),
        created_at: Timestamp::new("2024-05-02T08:30:00Z"),
        updated_at: Timestamp::new("2024-05-02T08:30:00Z"),
        deleted_at: None,
        content: content.to_string(),
        post_id: PostId(post_id),
    }
}

/// In-memory stand-in for the content API.
#[derive(Clone, Default)]
pub struct ContentServer {
    pub posts: Arc<Mutex<Vec<Post>>>,
    pub create_failure: Arc<Mutex<Option<(StatusCode, String)>>>,
    pub received: Arc<Mutex<Vec<CreatePostRequest>>>,
}

impl ContentServer {
    pub fn with_posts(posts: Vec<Post>) -> Self {
        Self {
            posts: Arc::new(Mutex::new(posts)),
            ..Self::default()
        }
    }

    pub async fn fail_creates_with(&self, status: StatusCode, body: impl Into<String>) {
        *self.create_failure.lock().await = Some((status, body.into()));
    }
}

async fn list_posts(State(server): State<ContentServer>) -> Json<Vec<Post>> {
    Json(server.posts.lock().await.clone())
}

async fn create_post(
    State(server): State<ContentServer>,
    Json(request): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<Post>), (StatusCode, String)> {
    server.received.lock().await.push(request.clone());
    if let Some(failure) = server.create_failure.lock().await.clone() {
        return Err(failure);
    }

    let mut posts = server.posts.lock().await;
    let created = post(posts.len() as i64 + 1, &request.title, &request.content);
    posts.push(created.clone());
    Ok((StatusCode::CREATED, Json(created)))
}

async fn serve(app: Router) -> String {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

pub async fn spawn_content_server(server: ContentServer) -> ClientSettings {
    let app = Router::new()
        .route("/posts/", get(list_posts).post(create_post))
        .with_state(server);
    let base_url = serve(app).await;
    ClientSettings::new(&base_url).expect("settings")
}

/// Answers every `/posts/` request with the same status and body.
pub async fn spawn_fixed_response_server(status: StatusCode, body: &str) -> ClientSettings {
    let body = body.to_string();
    let app = Router::new().route(
        "/posts/",
        any(move || {
            let body = body.clone();
            async move { (status, body) }
        }),
    );
    let base_url = serve(app).await;
    ClientSettings::new(&base_url).expect("settings")
}

/// Settings pointing at a port nothing listens on.
pub async fn unreachable_settings() -> ClientSettings {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    ClientSettings::new(&format!("http://{addr}")).expect("settings")
}
