use thiserror::Error;

use super::entities::{CommentId, PostId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    #[error("comment {comment_id} has no owning post id")]
    MissingPostId { comment_id: CommentId },
    #[error("comment {comment_id} belongs to post {found:?}, not post {expected}")]
    PostMismatch {
        comment_id: CommentId,
        expected: PostId,
        found: Option<PostId>,
    },
    #[error("cache indexes disagree: {message}")]
    Incoherent { message: String },
}

impl CacheError {
    pub fn missing_post_id(comment_id: CommentId) -> Self {
        Self::MissingPostId { comment_id }
    }

    pub fn post_mismatch(comment_id: CommentId, expected: PostId, found: Option<PostId>) -> Self {
        Self::PostMismatch {
            comment_id,
            expected,
            found,
        }
    }

    pub fn incoherent(message: impl Into<String>) -> Self {
        Self::Incoherent {
            message: message.into(),
        }
    }

    /// Contract violations are caller bugs; incoherence is a cache bug.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Self::MissingPostId { .. } | Self::PostMismatch { .. })
    }
}
