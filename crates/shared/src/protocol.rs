use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::{CommentId, PostId, Timestamp};

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(rename = "ID")]
    pub id: CommentId,
    #[serde(rename = "CreatedAt")]
    pub created_at: Timestamp,
    #[serde(rename = "UpdatedAt")]
    pub updated_at: Timestamp,
    #[serde(rename = "DeletedAt", default)]
    pub deleted_at: Option<Timestamp>,
    pub content: String,
    /// Owning post, used for lookup only.
    pub post_id: PostId,
}

impl Comment {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    #[serde(rename = "ID")]
    pub id: PostId,
    #[serde(rename = "CreatedAt")]
    pub created_at: Timestamp,
    #[serde(rename = "UpdatedAt")]
    pub updated_at: Timestamp,
    #[serde(rename = "DeletedAt", default)]
    pub deleted_at: Option<Timestamp>,
    pub title: String,
    pub content: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub comments: Vec<Comment>,
}

impl Post {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn comment_count(&self) -> usize {
        self.comments.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePostRequest {
    pub title: String,
    pub content: String,
}
