//! The operation contract shared by every cache implementation.
//!
//! Callers use the cache-aside pattern: read through the cache, fall back to
//! the persistent store on `None`, then populate. Writes go to the store first
//! and are mirrored here only after they succeed. Every mutation aimed at an
//! entity the cache does not hold is a no-op.

use std::sync::Arc;

use crate::domain::entities::{Comment, CommentId, Post, PostId, User};
use crate::domain::error::CacheError;

/// Cache operations for posts, comments and user sessions.
pub trait CachingService: Send + Sync {
    /// Label used when instrumenting this service.
    fn name(&self) -> &str;

    fn get_post(&self, post_id: PostId) -> Option<Post>;

    /// Inserts or fully replaces the post stored under `post.id`.
    fn put_post(&self, post: Post);

    /// Evicts the post and every comment grouped under it.
    fn remove_post(&self, post_id: PostId);

    fn edit_post(&self, post_id: PostId, text: &str);

    fn like_post(&self, post_id: PostId, liker: &str);

    fn unlike_post(&self, post_id: PostId, liker: &str);

    fn get_comment(&self, comment_id: CommentId) -> Option<Comment>;

    /// `None` means the comments of this post are unknown to the cache, while
    /// `Some(vec![])` means the post is known to have none.
    fn get_comments_for_post(&self, post_id: PostId) -> Option<Vec<Comment>>;

    /// Inserts or replaces a comment and files it under its owning post.
    ///
    /// Fails only when the comment does not name its owning post.
    fn put_comment(&self, comment: Comment) -> Result<(), CacheError>;

    /// Replaces the whole comment group of `post_id` with `comments`.
    fn put_comments_for_post(
        &self,
        post_id: PostId,
        comments: Vec<Comment>,
    ) -> Result<(), CacheError>;

    fn remove_comment(&self, comment_id: CommentId);

    fn edit_comment(&self, comment_id: CommentId, text: &str);

    fn like_comment(&self, comment_id: CommentId, liker: &str);

    fn unlike_comment(&self, comment_id: CommentId, liker: &str);

    fn put_user_session(&self, session_key: &str, user: User);

    fn get_user_session(&self, session_key: &str) -> Option<User>;

    fn remove_user_session(&self, session_key: &str);
}

/// Every operation of [`CachingService`] except `name`, used to label timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheOp {
    GetPost,
    PutPost,
    RemovePost,
    EditPost,
    LikePost,
    UnlikePost,
    GetComment,
    GetCommentsForPost,
    PutComment,
    PutCommentsForPost,
    RemoveComment,
    EditComment,
    LikeComment,
    UnlikeComment,
    PutUserSession,
    GetUserSession,
    RemoveUserSession,
}

impl CacheOp {
    pub const ALL: [CacheOp; 17] = [
        CacheOp::GetPost,
        CacheOp::PutPost,
        CacheOp::RemovePost,
        CacheOp::EditPost,
        CacheOp::LikePost,
        CacheOp::UnlikePost,
        CacheOp::GetComment,
        CacheOp::GetCommentsForPost,
        CacheOp::PutComment,
        CacheOp::PutCommentsForPost,
        CacheOp::RemoveComment,
        CacheOp::EditComment,
        CacheOp::LikeComment,
        CacheOp::UnlikeComment,
        CacheOp::PutUserSession,
        CacheOp::GetUserSession,
        CacheOp::RemoveUserSession,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CacheOp::GetPost => "get_post",
            CacheOp::PutPost => "put_post",
            CacheOp::RemovePost => "remove_post",
            CacheOp::EditPost => "edit_post",
            CacheOp::LikePost => "like_post",
            CacheOp::UnlikePost => "unlike_post",
            CacheOp::GetComment => "get_comment",
            CacheOp::GetCommentsForPost => "get_comments_for_post",
            CacheOp::PutComment => "put_comment",
            CacheOp::PutCommentsForPost => "put_comments_for_post",
            CacheOp::RemoveComment => "remove_comment",
            CacheOp::EditComment => "edit_comment",
            CacheOp::LikeComment => "like_comment",
            CacheOp::UnlikeComment => "unlike_comment",
            CacheOp::PutUserSession => "put_user_session",
            CacheOp::GetUserSession => "get_user_session",
            CacheOp::RemoveUserSession => "remove_user_session",
        }
    }

    /// Position of this operation in [`CacheOp::ALL`].
    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl<C> CachingService for Arc<C>
where
    C: CachingService + ?Sized,
{
    fn name(&self) -> &str {
        (**self).name()
    }

    fn get_post(&self, post_id: PostId) -> Option<Post> {
        (**self).get_post(post_id)
    }

    fn put_post(&self, post: Post) {
        (**self).put_post(post)
    }

    fn remove_post(&self, post_id: PostId) {
        (**self).remove_post(post_id)
    }

    fn edit_post(&self, post_id: PostId, text: &str) {
        (**self).edit_post(post_id, text)
    }

    fn like_post(&self, post_id: PostId, liker: &str) {
        (**self).like_post(post_id, liker)
    }

    fn unlike_post(&self, post_id: PostId, liker: &str) {
        (**self).unlike_post(post_id, liker)
    }

    fn get_comment(&self, comment_id: CommentId) -> Option<Comment> {
        (**self).get_comment(comment_id)
    }

    fn get_comments_for_post(&self, post_id: PostId) -> Option<Vec<Comment>> {
        (**self).get_comments_for_post(post_id)
    }

    fn put_comment(&self, comment: Comment) -> Result<(), CacheError> {
        (**self).put_comment(comment)
    }

    fn put_comments_for_post(
        &self,
        post_id: PostId,
        comments: Vec<Comment>,
    ) -> Result<(), CacheError> {
        (**self).put_comments_for_post(post_id, comments)
    }

    fn remove_comment(&self, comment_id: CommentId) {
        (**self).remove_comment(comment_id)
    }

    fn edit_comment(&self, comment_id: CommentId, text: &str) {
        (**self).edit_comment(comment_id, text)
    }

    fn like_comment(&self, comment_id: CommentId, liker: &str) {
        (**self).like_comment(comment_id, liker)
    }

    fn unlike_comment(&self, comment_id: CommentId, liker: &str) {
        (**self).unlike_comment(comment_id, liker)
    }

    fn put_user_session(&self, session_key: &str, user: User) {
        (**self).put_user_session(session_key, user)
    }

    fn get_user_session(&self, session_key: &str) -> Option<User> {
        (**self).get_user_session(session_key)
    }

    fn remove_user_session(&self, session_key: &str) {
        (**self).remove_user_session(session_key)
    }
}

/// Stand-in used when caching is switched off: every read misses and every
/// write is dropped, so callers always fall through to the persistent store.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

impl CachingService for NoopCache {
    fn name(&self) -> &str {
        "noop_cache"
    }

    fn get_post(&self, _post_id: PostId) -> Option<Post> {
        None
    }

    fn put_post(&self, _post: Post) {}

    fn remove_post(&self, _post_id: PostId) {}

    fn edit_post(&self, _post_id: PostId, _text: &str) {}

    fn like_post(&self, _post_id: PostId, _liker: &str) {}

    fn unlike_post(&self, _post_id: PostId, _liker: &str) {}

    fn get_comment(&self, _comment_id: CommentId) -> Option<Comment> {
        None
    }

    fn get_comments_for_post(&self, _post_id: PostId) -> Option<Vec<Comment>> {
        None
    }

    fn put_comment(&self, comment: Comment) -> Result<(), CacheError> {
        // Still rejected so a caller bug shows up with caching disabled too.
        match comment.post_id {
            Some(_) => Ok(()),
            None => Err(CacheError::missing_post_id(comment.id)),
        }
    }

    fn put_comments_for_post(
        &self,
        post_id: PostId,
        comments: Vec<Comment>,
    ) -> Result<(), CacheError> {
        match comments.iter().find(|c| c.post_id != Some(post_id)) {
            Some(stray) => Err(CacheError::post_mismatch(stray.id, post_id, stray.post_id)),
            None => Ok(()),
        }
    }

    fn remove_comment(&self, _comment_id: CommentId) {}

    fn edit_comment(&self, _comment_id: CommentId, _text: &str) {}

    fn like_comment(&self, _comment_id: CommentId, _liker: &str) {}

    fn unlike_comment(&self, _comment_id: CommentId, _liker: &str) {}

    fn put_user_session(&self, _session_key: &str, _user: User) {}

    fn get_user_session(&self, _session_key: &str) -> Option<User> {
        None
    }

    fn remove_user_session(&self, _session_key: &str) {}
}
