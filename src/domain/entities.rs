//! Domain entities mirrored from persistent storage.
//!
//! Posts and comments carry the author's display fields denormalized from the
//! user row so a cached entry can be rendered without a second lookup.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

pub type PostId = i32;
pub type CommentId = i32;
pub type UserId = i32;

/// Identifier of whoever liked an entry.
pub type LikerId = String;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub profile_picture_link: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub timestamp: Option<OffsetDateTime>,
    #[serde(default)]
    pub likes: BTreeSet<LikerId>,
}

impl Post {
    pub fn new(id: PostId) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_author(mut self, user_id: UserId, username: impl Into<String>) -> Self {
        self.user_id = Some(user_id);
        self.username = Some(username.into());
        self
    }

    /// Returns `true` when the liker was not already present.
    pub fn add_like(&mut self, liker: impl Into<LikerId>) -> bool {
        self.likes.insert(liker.into())
    }

    pub fn remove_like(&mut self, liker: &str) -> bool {
        self.likes.remove(liker)
    }
}

/// A comment as stored by the persistence layer.
///
/// `post_id` is optional because partially hydrated rows exist upstream; the
/// cache refuses to admit a comment that does not name its owning post.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    #[serde(default)]
    pub post_id: Option<PostId>,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub profile_picture_link: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub timestamp: Option<OffsetDateTime>,
    #[serde(default)]
    pub likes: BTreeSet<LikerId>,
}

impl Comment {
    pub fn new(id: CommentId, post_id: PostId) -> Self {
        Self {
            id,
            post_id: Some(post_id),
            ..Default::default()
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_author(mut self, user_id: UserId, username: impl Into<String>) -> Self {
        self.user_id = Some(user_id);
        self.username = Some(username.into());
        self
    }

    pub fn add_like(&mut self, liker: impl Into<LikerId>) -> bool {
        self.likes.insert(liker.into())
    }

    pub fn remove_like(&mut self, liker: &str) -> bool {
        self.likes.remove(liker)
    }
}

/// The user bound to a session key.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub user_id: UserId,
    pub username: String,
    pub full_name: String,
    #[serde(skip_serializing)]
    pub hashed_password: String,
}

impl User {
    pub fn new(
        user_id: UserId,
        username: impl Into<String>,
        full_name: impl Into<String>,
        hashed_password: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            username: username.into(),
            full_name: full_name.into(),
            hashed_password: hashed_password.into(),
        }
    }
}

// Keeps password hashes out of logs.
impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("user_id", &self.user_id)
            .field("username", &self.username)
            .field("full_name", &self.full_name)
            .field("hashed_password", &"<redacted>")
            .finish()
    }
}
