//! Latency-recording decorator for any [`CachingService`].
//!
//! Each operation gets its own histogram, registered once at construction
//! under [`METRIC_CACHE_OP_MS`] with `cache` and `op` labels. A call starts a
//! timer guard, delegates, and the guard records elapsed milliseconds when it
//! drops, including while a panic unwinds through it. Results pass through
//! untouched.

use std::time::Instant;

use metrics::{Histogram, Recorder, histogram};

use crate::domain::entities::{Comment, CommentId, Post, PostId, User};
use crate::domain::error::CacheError;

use super::service::{CacheOp, CachingService};

pub const METRIC_CACHE_OP_MS: &str = "socialcache_cache_op_ms";

const OP_COUNT: usize = CacheOp::ALL.len();

pub struct MeteredCache<C> {
    inner: C,
    label: String,
    timers: [Histogram; OP_COUNT],
}

impl<C: CachingService> MeteredCache<C> {
    /// Wraps `inner`, labelling its timers with `inner.name()`.
    pub fn new(inner: C) -> Self {
        let label = inner.name().to_string();
        Self::with_label(inner, label)
    }

    /// Wraps `inner` with timers registered on the global recorder.
    pub fn with_label(inner: C, label: impl Into<String>) -> Self {
        let label = label.into();
        let timers = register_timers(&label);
        Self {
            inner,
            label,
            timers,
        }
    }

    /// Wraps `inner` with timers registered on `recorder` instead of the
    /// global one.
    pub fn with_recorder<R: Recorder>(inner: C, recorder: &R, label: impl Into<String>) -> Self {
        let label = label.into();
        let timers = metrics::with_local_recorder(recorder, || register_timers(&label));
        Self {
            inner,
            label,
            timers,
        }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn into_inner(self) -> C {
        self.inner
    }

    fn time(&self, op: CacheOp) -> OpTimer<'_> {
        OpTimer {
            histogram: &self.timers[op.index()],
            started_at: Instant::now(),
        }
    }
}

fn register_timers(label: &str) -> [Histogram; OP_COUNT] {
    CacheOp::ALL.map(|op| {
        histogram!(
            METRIC_CACHE_OP_MS,
            "cache" => label.to_string(),
            "op" => op.as_str()
        )
    })
}

struct OpTimer<'a> {
    histogram: &'a Histogram,
    started_at: Instant,
}

impl Drop for OpTimer<'_> {
    fn drop(&mut self) {
        self.histogram
            .record(self.started_at.elapsed().as_secs_f64() * 1000.0);
    }
}

impl<C: CachingService> CachingService for MeteredCache<C> {
    fn name(&self) -> &str {
        &self.label
    }

    fn get_post(&self, post_id: PostId) -> Option<Post> {
        let _timer = self.time(CacheOp::GetPost);
        self.inner.get_post(post_id)
    }

    fn put_post(&self, post: Post) {
        let _timer = self.time(CacheOp::PutPost);
        self.inner.put_post(post)
    }

    fn remove_post(&self, post_id: PostId) {
        let _timer = self.time(CacheOp::RemovePost);
        self.inner.remove_post(post_id)
    }

    fn edit_post(&self, post_id: PostId, text: &str) {
        let _timer = self.time(CacheOp::EditPost);
        self.inner.edit_post(post_id, text)
    }

    fn like_post(&self, post_id: PostId, liker: &str) {
        let _timer = self.time(CacheOp::LikePost);
        self.inner.like_post(post_id, liker)
    }

    fn unlike_post(&self, post_id: PostId, liker: &str) {
        let _timer = self.time(CacheOp::UnlikePost);
        self.inner.unlike_post(post_id, liker)
    }

    fn get_comment(&self, comment_id: CommentId) -> Option<Comment> {
        let _timer = self.time(CacheOp::GetComment);
        self.inner.get_comment(comment_id)
    }

    fn get_comments_for_post(&self, post_id: PostId) -> Option<Vec<Comment>> {
        let _timer = self.time(CacheOp::GetCommentsForPost);
        self.inner.get_comments_for_post(post_id)
    }

    fn put_comment(&self, comment: Comment) -> Result<(), CacheError> {
        let _timer = self.time(CacheOp::PutComment);
        self.inner.put_comment(comment)
    }

    fn put_comments_for_post(
        &self,
        post_id: PostId,
        comments: Vec<Comment>,
    ) -> Result<(), CacheError> {
        let _timer = self.time(CacheOp::PutCommentsForPost);
        self.inner.put_comments_for_post(post_id, comments)
    }

    fn remove_comment(&self, comment_id: CommentId) {
        let _timer = self.time(CacheOp::RemoveComment);
        self.inner.remove_comment(comment_id)
    }

    fn edit_comment(&self, comment_id: CommentId, text: &str) {
        let _timer = self.time(CacheOp::EditComment);
        self.inner.edit_comment(comment_id, text)
    }

    fn like_comment(&self, comment_id: CommentId, liker: &str) {
        let _timer = self.time(CacheOp::LikeComment);
        self.inner.like_comment(comment_id, liker)
    }

    fn unlike_comment(&self, comment_id: CommentId, liker: &str) {
        let _timer = self.time(CacheOp::UnlikeComment);
        self.inner.unlike_comment(comment_id, liker)
    }

    fn put_user_session(&self, session_key: &str, user: User) {
        let _timer = self.time(CacheOp::PutUserSession);
        self.inner.put_user_session(session_key, user)
    }

    fn get_user_session(&self, session_key: &str) -> Option<User> {
        let _timer = self.time(CacheOp::GetUserSession);
        self.inner.get_user_session(session_key)
    }

    fn remove_user_session(&self, session_key: &str) {
        let _timer = self.time(CacheOp::RemoveUserSession);
        self.inner.remove_user_session(session_key)
    }
}
