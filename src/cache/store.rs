//! In-memory cache storage for posts, comments and user sessions.
//!
//! Posts, comments and the comments-by-post group index share one lock: a
//! post removal and a comment insertion for the same post are serialized, so
//! a comment can never be indexed by id while missing from its group (or the
//! reverse). Groups hold comment ids only; the comment itself lives once in
//! the by-id index.
//!
//! Ids dropped from a group under [`GroupReplacePolicy::Retain`] are tracked
//! per post so that removing the post still evicts them.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use dashmap::DashMap;
use tracing::{debug, trace, warn};

use crate::domain::entities::{Comment, CommentId, Post, PostId, User};
use crate::domain::error::CacheError;

use super::config::{CacheConfig, GroupReplacePolicy};
use super::lock::{rw_read, rw_write};
use super::service::CachingService;

const SOURCE: &str = "cache::store";

#[derive(Debug, Default)]
struct Indexes {
    posts_by_id: HashMap<PostId, Post>,
    comments_by_id: HashMap<CommentId, Comment>,
    comment_ids_by_post: HashMap<PostId, HashSet<CommentId>>,
    /// Cached comments that a group replacement dropped from their group.
    retained_by_post: HashMap<PostId, HashSet<CommentId>>,
}

impl Indexes {
    /// Stores `comment` by id, pulling it out of the group (or retained set)
    /// of a previous version that belonged to another post. The caller adds it
    /// to `post_id`'s group.
    fn insert_comment(&mut self, post_id: PostId, comment: Comment) {
        let comment_id = comment.id;
        let previous = self.comments_by_id.insert(comment_id, comment);

        if let Some(previous_post) = previous.and_then(|c| c.post_id)
            && previous_post != post_id
        {
            if let Some(group) = self.comment_ids_by_post.get_mut(&previous_post) {
                group.remove(&comment_id);
            }
            self.forget_retained(previous_post, comment_id);
        }
        self.forget_retained(post_id, comment_id);
    }

    fn forget_retained(&mut self, post_id: PostId, comment_id: CommentId) {
        if let Some(ids) = self.retained_by_post.get_mut(&post_id) {
            ids.remove(&comment_id);
            if ids.is_empty() {
                self.retained_by_post.remove(&post_id);
            }
        }
    }

    fn comments_in_group(&self, ids: &HashSet<CommentId>) -> Vec<Comment> {
        let mut comments: Vec<Comment> = ids
            .iter()
            .filter_map(|id| self.comments_by_id.get(id).cloned())
            .collect();
        comments.sort_by_key(|comment| comment.id);
        comments
    }
}

/// Point-in-time sizes of each index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub posts: usize,
    pub comments: usize,
    pub comment_groups: usize,
    pub sessions: usize,
}

/// The direct, map-backed [`CachingService`].
pub struct MapCache {
    policy: GroupReplacePolicy,
    indexes: RwLock<Indexes>,
    sessions: DashMap<String, User>,
}

impl Default for MapCache {
    fn default() -> Self {
        Self::new()
    }
}

impl MapCache {
    pub fn new() -> Self {
        Self::with_policy(GroupReplacePolicy::default())
    }

    pub fn with_policy(policy: GroupReplacePolicy) -> Self {
        Self {
            policy,
            indexes: RwLock::new(Indexes::default()),
            sessions: DashMap::new(),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::with_policy(config.group_replace_policy)
    }

    pub fn policy(&self) -> GroupReplacePolicy {
        self.policy
    }

    pub fn stats(&self) -> CacheStats {
        let indexes = rw_read(&self.indexes, SOURCE, "stats");
        CacheStats {
            posts: indexes.posts_by_id.len(),
            comments: indexes.comments_by_id.len(),
            comment_groups: indexes.comment_ids_by_post.len(),
            sessions: self.sessions.len(),
        }
    }

    /// Checks that the comment indexes agree with each other.
    ///
    /// Every grouped or retained id must resolve to a comment owned by that
    /// post, and every cached comment must be tracked by exactly one of its
    /// post's group or retained set. Under [`GroupReplacePolicy::Purge`] the
    /// retained sets stay empty, so every cached comment is grouped.
    pub fn verify_coherence(&self) -> Result<(), CacheError> {
        let indexes = rw_read(&self.indexes, SOURCE, "verify_coherence");

        for (kind, tracked) in [
            ("grouped", &indexes.comment_ids_by_post),
            ("retained", &indexes.retained_by_post),
        ] {
            for (post_id, ids) in tracked {
                for comment_id in ids {
                    match indexes.comments_by_id.get(comment_id) {
                        None => {
                            return Err(CacheError::incoherent(format!(
                                "comment {comment_id} is {kind} under post {post_id} but not cached by id"
                            )));
                        }
                        Some(comment) if comment.post_id != Some(*post_id) => {
                            return Err(CacheError::incoherent(format!(
                                "comment {comment_id} is {kind} under post {post_id} but belongs to {:?}",
                                comment.post_id
                            )));
                        }
                        Some(_) => {}
                    }
                }
            }
        }

        if self.policy == GroupReplacePolicy::Purge && !indexes.retained_by_post.is_empty() {
            return Err(CacheError::incoherent(
                "purge policy left dropped comments retained by id",
            ));
        }

        for (comment_id, comment) in &indexes.comments_by_id {
            let contains = |tracked: &HashMap<PostId, HashSet<CommentId>>| {
                comment
                    .post_id
                    .and_then(|post_id| tracked.get(&post_id))
                    .is_some_and(|ids| ids.contains(comment_id))
            };
            match (
                contains(&indexes.comment_ids_by_post),
                contains(&indexes.retained_by_post),
            ) {
                (true, false) | (false, true) => {}
                (false, false) => {
                    return Err(CacheError::incoherent(format!(
                        "comment {comment_id} of post {:?} is cached by id but neither grouped nor retained",
                        comment.post_id
                    )));
                }
                (true, true) => {
                    return Err(CacheError::incoherent(format!(
                        "comment {comment_id} of post {:?} is both grouped and retained",
                        comment.post_id
                    )));
                }
            }
        }

        Ok(())
    }

    /// Drops every post, comment, group and session.
    pub fn clear(&self) {
        let mut indexes = rw_write(&self.indexes, SOURCE, "clear");
        *indexes = Indexes::default();
        self.sessions.clear();
    }

    fn with_post_mut(&self, post_id: PostId, op: &'static str, apply: impl FnOnce(&mut Post)) {
        let mut indexes = rw_write(&self.indexes, SOURCE, op);
        match indexes.posts_by_id.get_mut(&post_id) {
            Some(post) => apply(post),
            None => trace!(op, post_id, "post not cached; skipping"),
        }
    }

    fn with_comment_mut(
        &self,
        comment_id: CommentId,
        op: &'static str,
        apply: impl FnOnce(&mut Comment),
    ) {
        let mut indexes = rw_write(&self.indexes, SOURCE, op);
        match indexes.comments_by_id.get_mut(&comment_id) {
            Some(comment) => apply(comment),
            None => trace!(op, comment_id, "comment not cached; skipping"),
        }
    }
}

impl CachingService for MapCache {
    fn name(&self) -> &str {
        "map_cache"
    }

    fn get_post(&self, post_id: PostId) -> Option<Post> {
        rw_read(&self.indexes, SOURCE, "get_post")
            .posts_by_id
            .get(&post_id)
            .cloned()
    }

    fn put_post(&self, post: Post) {
        rw_write(&self.indexes, SOURCE, "put_post")
            .posts_by_id
            .insert(post.id, post);
    }

    fn remove_post(&self, post_id: PostId) {
        let mut indexes = rw_write(&self.indexes, SOURCE, "remove_post");
        indexes.posts_by_id.remove(&post_id);

        // Detach the group and retained set first, then evict their members by id.
        let grouped = indexes.comment_ids_by_post.remove(&post_id);
        let retained = indexes.retained_by_post.remove(&post_id);
        if grouped.is_none() && retained.is_none() {
            return;
        }

        let mut cascaded = 0usize;
        for comment_id in grouped.iter().chain(retained.iter()).flatten() {
            if indexes.comments_by_id.remove(comment_id).is_some() {
                cascaded += 1;
            }
        }
        debug!(post_id, cascaded, "evicted post comments");
    }

    fn edit_post(&self, post_id: PostId, text: &str) {
        self.with_post_mut(post_id, "edit_post", |post| {
            post.text = Some(text.to_string());
        });
    }

    fn like_post(&self, post_id: PostId, liker: &str) {
        self.with_post_mut(post_id, "like_post", |post| {
            post.add_like(liker);
        });
    }

    fn unlike_post(&self, post_id: PostId, liker: &str) {
        self.with_post_mut(post_id, "unlike_post", |post| {
            post.remove_like(liker);
        });
    }

    fn get_comment(&self, comment_id: CommentId) -> Option<Comment> {
        rw_read(&self.indexes, SOURCE, "get_comment")
            .comments_by_id
            .get(&comment_id)
            .cloned()
    }

    fn get_comments_for_post(&self, post_id: PostId) -> Option<Vec<Comment>> {
        let indexes = rw_read(&self.indexes, SOURCE, "get_comments_for_post");
        indexes
            .comment_ids_by_post
            .get(&post_id)
            .map(|ids| indexes.comments_in_group(ids))
    }

    fn put_comment(&self, comment: Comment) -> Result<(), CacheError> {
        let Some(post_id) = comment.post_id else {
            warn!(
                comment_id = comment.id,
                "rejected comment without owning post id"
            );
            return Err(CacheError::missing_post_id(comment.id));
        };

        let comment_id = comment.id;
        let mut indexes = rw_write(&self.indexes, SOURCE, "put_comment");
        indexes.insert_comment(post_id, comment);
        indexes
            .comment_ids_by_post
            .entry(post_id)
            .or_default()
            .insert(comment_id);
        Ok(())
    }

    fn put_comments_for_post(
        &self,
        post_id: PostId,
        comments: Vec<Comment>,
    ) -> Result<(), CacheError> {
        if let Some(stray) = comments.iter().find(|c| c.post_id != Some(post_id)) {
            warn!(
                post_id,
                comment_id = stray.id,
                found = ?stray.post_id,
                "rejected comment group containing a foreign comment"
            );
            return Err(CacheError::post_mismatch(stray.id, post_id, stray.post_id));
        }

        let fresh: HashSet<CommentId> = comments.iter().map(|comment| comment.id).collect();

        let mut indexes = rw_write(&self.indexes, SOURCE, "put_comments_for_post");
        let previous = indexes.comment_ids_by_post.insert(post_id, fresh);
        for comment in comments {
            indexes.insert_comment(post_id, comment);
        }

        if let Some(previous) = previous {
            let group = &indexes.comment_ids_by_post[&post_id];
            let dropped: Vec<CommentId> = previous.difference(group).copied().collect();

            for comment_id in &dropped {
                let owned = indexes
                    .comments_by_id
                    .get(comment_id)
                    .is_some_and(|c| c.post_id == Some(post_id));
                if !owned {
                    continue;
                }
                match self.policy {
                    GroupReplacePolicy::Purge => {
                        indexes.comments_by_id.remove(comment_id);
                    }
                    GroupReplacePolicy::Retain => {
                        indexes
                            .retained_by_post
                            .entry(post_id)
                            .or_default()
                            .insert(*comment_id);
                    }
                }
            }

            if !dropped.is_empty() {
                debug!(
                    post_id,
                    dropped = dropped.len(),
                    policy = ?self.policy,
                    "replaced comment group"
                );
            }
        }

        Ok(())
    }

    fn remove_comment(&self, comment_id: CommentId) {
        let mut indexes = rw_write(&self.indexes, SOURCE, "remove_comment");
        let Some(comment) = indexes.comments_by_id.remove(&comment_id) else {
            trace!(comment_id, "comment not cached; skipping");
            return;
        };

        // The group stays even when this was its last member.
        if let Some(post_id) = comment.post_id {
            if let Some(group) = indexes.comment_ids_by_post.get_mut(&post_id) {
                group.remove(&comment_id);
            }
            indexes.forget_retained(post_id, comment_id);
        }
    }

    fn edit_comment(&self, comment_id: CommentId, text: &str) {
        self.with_comment_mut(comment_id, "edit_comment", |comment| {
            comment.text = Some(text.to_string());
        });
    }

    fn like_comment(&self, comment_id: CommentId, liker: &str) {
        self.with_comment_mut(comment_id, "like_comment", |comment| {
            comment.add_like(liker);
        });
    }

    fn unlike_comment(&self, comment_id: CommentId, liker: &str) {
        self.with_comment_mut(comment_id, "unlike_comment", |comment| {
            comment.remove_like(liker);
        });
    }

    fn put_user_session(&self, session_key: &str, user: User) {
        self.sessions.insert(session_key.to_string(), user);
    }

    fn get_user_session(&self, session_key: &str) -> Option<User> {
        self.sessions
            .get(session_key)
            .map(|entry| entry.value().clone())
    }

    fn remove_user_session(&self, session_key: &str) {
        self.sessions.remove(session_key);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use super::*;

    fn comments_of(cache: &MapCache, post_id: PostId) -> Option<Vec<CommentId>> {
        cache
            .get_comments_for_post(post_id)
            .map(|comments| comments.into_iter().map(|c| c.id).collect())
    }

    fn likes(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn posts_roundtrip() {
        let cache = MapCache::new();
        assert!(cache.get_post(1).is_none());
        assert!(cache.get_post(2).is_none());

        let post1 = Post::new(1).with_text("first");
        let post2 = Post::new(2);
        let post3 = Post::new(3);
        cache.put_post(post1.clone());
        cache.put_post(post2.clone());
        cache.put_post(post3.clone());

        assert_eq!(cache.get_post(1), Some(post1.clone()));
        assert_eq!(cache.get_post(2), Some(post2));
        assert_eq!(cache.get_post(3), Some(post3.clone()));

        cache.remove_post(2);

        assert_eq!(cache.get_post(1), Some(post1));
        assert!(cache.get_post(2).is_none());
        assert_eq!(cache.get_post(3), Some(post3));
    }

    #[test]
    fn put_post_replaces_rather_than_merges() {
        let cache = MapCache::new();
        let mut liked = Post::new(1).with_text("old");
        liked.add_like("Me");
        cache.put_post(liked);

        cache.put_post(Post::new(1).with_text("new"));

        let cached = cache.get_post(1).expect("cached post");
        assert_eq!(cached.text.as_deref(), Some("new"));
        assert!(cached.likes.is_empty());
    }

    #[test]
    fn removing_post_cascades_to_its_comments() {
        let cache = MapCache::new();
        let c31 = Comment::new(31, 1);
        let c32 = Comment::new(32, 1);
        let c33 = Comment::new(33, 2);
        let c34 = Comment::new(34, 2);

        cache.put_post(Post::new(1));
        cache
            .put_comments_for_post(1, vec![c31.clone(), c32.clone()])
            .expect("group for post 1");
        cache.put_post(Post::new(2));
        cache
            .put_comments_for_post(2, vec![c33, c34])
            .expect("group for post 2");

        assert_eq!(comments_of(&cache, 2), Some(vec![33, 34]));

        cache.remove_post(2);

        assert!(cache.get_post(2).is_none());
        assert!(cache.get_comment(33).is_none());
        assert!(cache.get_comment(34).is_none());
        assert!(cache.get_comments_for_post(2).is_none());

        assert!(cache.get_post(1).is_some());
        assert_eq!(cache.get_comment(31), Some(c31));
        assert_eq!(cache.get_comment(32), Some(c32));
        assert_eq!(comments_of(&cache, 1), Some(vec![31, 32]));
        cache.verify_coherence().expect("coherent after cascade");
    }

    #[test]
    fn cascade_runs_without_a_cached_post() {
        let cache = MapCache::new();
        cache
            .put_comments_for_post(4, vec![Comment::new(41, 4)])
            .expect("group for post 4");

        cache.remove_post(4);

        assert!(cache.get_comment(41).is_none());
        assert!(cache.get_comments_for_post(4).is_none());
    }

    #[test]
    fn removing_absent_post_changes_nothing() {
        let cache = MapCache::new();
        cache.put_post(Post::new(1));
        cache.put_post(Post::new(3));
        cache
            .put_comments_for_post(1, vec![Comment::new(31, 1)])
            .expect("group for post 1");
        let before = cache.stats();

        cache.remove_post(5);

        assert_eq!(cache.stats(), before);
        assert!(cache.get_post(1).is_some());
        assert!(cache.get_post(3).is_some());
        assert_eq!(comments_of(&cache, 1), Some(vec![31]));
    }

    #[test]
    fn put_comment_grows_existing_group() {
        let cache = MapCache::new();
        let c1 = Comment::new(31, 1).with_text("one");
        let c2 = Comment::new(32, 1).with_text("two");
        cache
            .put_comments_for_post(1, vec![c1.clone(), c2.clone()])
            .expect("group for post 1");

        let c3 = Comment::new(33, 1).with_text("three");
        cache.put_comment(c3.clone()).expect("comment with post id");

        assert_eq!(
            cache.get_comments_for_post(1),
            Some(vec![c1.clone(), c2.clone(), c3.clone()])
        );
        assert_eq!(cache.get_comment(31), Some(c1));
        assert_eq!(cache.get_comment(32), Some(c2));
        assert_eq!(cache.get_comment(33), Some(c3));
    }

    #[test]
    fn put_comment_creates_missing_group() {
        let cache = MapCache::new();
        cache
            .put_comments_for_post(1, vec![Comment::new(31, 1)])
            .expect("group for post 1");

        cache
            .put_comment(Comment::new(34, 2))
            .expect("comment with post id");

        assert_eq!(comments_of(&cache, 1), Some(vec![31]));
        assert_eq!(comments_of(&cache, 2), Some(vec![34]));
        cache.verify_coherence().expect("coherent");
    }

    #[test]
    fn put_comment_without_post_id_is_rejected() {
        let cache = MapCache::new();
        let orphan = Comment {
            id: 7,
            ..Default::default()
        };

        let err = cache.put_comment(orphan).expect_err("orphan comment");

        assert_eq!(err, CacheError::missing_post_id(7));
        assert!(err.is_contract_violation());
        assert!(cache.get_comment(7).is_none());
        assert_eq!(cache.stats(), CacheStats::default());
    }

    #[test]
    fn replacing_comment_under_another_post_moves_it() {
        let cache = MapCache::new();
        cache
            .put_comment(Comment::new(31, 1))
            .expect("comment with post id");
        cache
            .put_comment(Comment::new(31, 2))
            .expect("comment with post id");

        assert_eq!(comments_of(&cache, 1), Some(vec![]));
        assert_eq!(comments_of(&cache, 2), Some(vec![31]));
        cache.verify_coherence().expect("coherent after move");
    }

    #[test]
    fn remove_comment_shrinks_group_only() {
        let cache = MapCache::new();
        cache.put_post(Post::new(1));
        cache
            .put_comments_for_post(1, vec![Comment::new(31, 1), Comment::new(32, 1)])
            .expect("group for post 1");

        cache.remove_comment(32);

        assert!(cache.get_post(1).is_some());
        assert!(cache.get_comment(32).is_none());
        assert!(cache.get_comment(31).is_some());
        assert_eq!(comments_of(&cache, 1), Some(vec![31]));

        cache.remove_comment(37);
        assert_eq!(comments_of(&cache, 1), Some(vec![31]));
    }

    #[test]
    fn removing_last_comment_leaves_empty_group() {
        let cache = MapCache::new();
        cache
            .put_comment(Comment::new(1, 3).with_text("Old Text"))
            .expect("comment with post id");
        assert_eq!(comments_of(&cache, 3), Some(vec![1]));

        cache.remove_comment(1);

        assert!(cache.get_comment(1).is_none());
        assert_eq!(cache.get_comments_for_post(3), Some(vec![]));
    }

    #[test]
    fn replacing_group_drops_members_and_retains_them_by_id() {
        let cache = MapCache::new();
        cache
            .put_comments_for_post(1, vec![Comment::new(31, 1), Comment::new(32, 1)])
            .expect("first group");

        cache
            .put_comments_for_post(1, vec![Comment::new(32, 1), Comment::new(33, 1)])
            .expect("second group");

        assert_eq!(comments_of(&cache, 1), Some(vec![32, 33]));
        assert!(cache.get_comment(31).is_some());
        cache.verify_coherence().expect("retain tolerates dropped ids");
    }

    #[test]
    fn removing_post_evicts_comments_dropped_by_replacement() {
        for policy in [GroupReplacePolicy::Retain, GroupReplacePolicy::Purge] {
            let cache = MapCache::with_policy(policy);
            cache.put_post(Post::new(1));
            cache
                .put_comments_for_post(1, vec![Comment::new(31, 1), Comment::new(32, 1)])
                .expect("first group");
            cache
                .put_comments_for_post(1, vec![Comment::new(32, 1)])
                .expect("second group");

            cache.remove_post(1);

            assert!(cache.get_comment(31).is_none(), "{policy:?}");
            assert!(cache.get_comment(32).is_none(), "{policy:?}");
            assert_eq!(cache.stats().comments, 0, "{policy:?}");
            cache
                .verify_coherence()
                .unwrap_or_else(|err| panic!("{policy:?}: {err}"));
        }
    }

    #[test]
    fn retained_comment_leaves_tracking_when_regrouped_or_removed() {
        let cache = MapCache::new();
        cache
            .put_comments_for_post(1, vec![Comment::new(31, 1), Comment::new(32, 1)])
            .expect("first group");
        cache
            .put_comments_for_post(1, vec![Comment::new(32, 1)])
            .expect("second group");

        cache
            .put_comment(Comment::new(31, 1))
            .expect("comment with post id");
        assert_eq!(comments_of(&cache, 1), Some(vec![31, 32]));
        cache.verify_coherence().expect("regrouped comment is only grouped");

        cache
            .put_comments_for_post(1, vec![Comment::new(32, 1)])
            .expect("third group");
        cache.remove_comment(31);
        assert!(cache.get_comment(31).is_none());
        cache.verify_coherence().expect("removed comment is untracked");

        cache.remove_post(1);
        assert_eq!(cache.stats(), CacheStats::default());
    }

    #[test]
    fn retained_comment_moved_to_another_post_survives_old_post_removal() {
        let cache = MapCache::new();
        cache
            .put_comments_for_post(1, vec![Comment::new(31, 1), Comment::new(32, 1)])
            .expect("first group");
        cache
            .put_comments_for_post(1, vec![Comment::new(32, 1)])
            .expect("second group");

        cache
            .put_comment(Comment::new(31, 2))
            .expect("comment with post id");
        cache.remove_post(1);

        assert_eq!(cache.get_comment(31).and_then(|c| c.post_id), Some(2));
        assert_eq!(comments_of(&cache, 2), Some(vec![31]));
        cache.verify_coherence().expect("moved comment belongs to post 2");
    }

    #[test]
    fn purge_policy_evicts_dropped_members() {
        let cache = MapCache::with_policy(GroupReplacePolicy::Purge);
        cache
            .put_comments_for_post(1, vec![Comment::new(31, 1), Comment::new(32, 1)])
            .expect("first group");

        cache
            .put_comments_for_post(1, vec![Comment::new(32, 1)])
            .expect("second group");

        assert_eq!(comments_of(&cache, 1), Some(vec![32]));
        assert!(cache.get_comment(31).is_none());
        cache.verify_coherence().expect("purge keeps indexes in lockstep");
    }

    #[test]
    fn empty_group_is_distinct_from_unknown() {
        let cache = MapCache::new();
        assert!(cache.get_comments_for_post(9).is_none());

        cache
            .put_comments_for_post(9, Vec::new())
            .expect("empty group");

        assert_eq!(cache.get_comments_for_post(9), Some(vec![]));
    }

    #[test]
    fn foreign_comment_rejects_whole_group() {
        let cache = MapCache::new();
        cache
            .put_comments_for_post(1, vec![Comment::new(31, 1)])
            .expect("first group");

        let err = cache
            .put_comments_for_post(1, vec![Comment::new(32, 1), Comment::new(40, 4)])
            .expect_err("foreign comment");

        assert_eq!(err, CacheError::post_mismatch(40, 1, Some(4)));
        assert_eq!(comments_of(&cache, 1), Some(vec![31]));
        assert!(cache.get_comment(32).is_none());
    }

    #[test]
    fn edit_changes_text_only() {
        let cache = MapCache::new();
        let mut post = Post::new(1).with_text("Old Text");
        post.add_like("Me");
        cache.put_post(post);
        cache
            .put_comment(Comment::new(1, 3).with_text("Old Text"))
            .expect("comment with post id");

        cache.edit_post(1, "New Text");
        cache.edit_comment(1, "New Text");

        let post = cache.get_post(1).expect("cached post");
        assert_eq!(post.text.as_deref(), Some("New Text"));
        assert_eq!(post.likes, likes(&["Me"]));
        let comment = cache.get_comment(1).expect("cached comment");
        assert_eq!(comment.text.as_deref(), Some("New Text"));
        assert_eq!(comments_of(&cache, 3), Some(vec![1]));
    }

    #[test]
    fn mutations_on_absent_entities_are_noops() {
        let cache = MapCache::new();

        cache.edit_post(1, "New Text");
        cache.like_post(1, "Me");
        cache.unlike_post(1, "Me");
        cache.edit_comment(1, "New Text");
        cache.like_comment(1, "Me");
        cache.unlike_comment(1, "Me");
        cache.remove_comment(1);
        cache.remove_post(1);

        assert!(cache.get_post(1).is_none());
        assert!(cache.get_comment(1).is_none());
        assert_eq!(cache.stats(), CacheStats::default());
    }

    #[test]
    fn like_and_unlike_post() {
        let cache = MapCache::new();
        cache.put_post(Post::new(1));
        assert!(cache.get_post(1).expect("post").likes.is_empty());

        cache.like_post(1, "Me");
        cache.like_post(1, "Me");
        assert_eq!(cache.get_post(1).expect("post").likes, likes(&["Me"]));

        cache.unlike_post(1, "Me");
        assert!(cache.get_post(1).expect("post").likes.is_empty());
        cache.unlike_post(1, "Me");
        assert!(cache.get_post(1).expect("post").likes.is_empty());
    }

    #[test]
    fn like_and_unlike_comment() {
        let cache = MapCache::new();
        let mut comment = Comment::new(1, 3).with_text("Old Text");
        comment.add_like("Me");
        cache.put_comment(comment).expect("comment with post id");

        cache.like_comment(1, "You");
        assert_eq!(
            cache.get_comment(1).expect("comment").likes,
            likes(&["Me", "You"])
        );

        cache.unlike_comment(1, "Me");
        cache.unlike_comment(1, "You");
        assert!(cache.get_comment(1).expect("comment").likes.is_empty());

        let grouped = cache.get_comments_for_post(3).expect("group");
        assert!(grouped[0].likes.is_empty());
    }

    #[test]
    fn sessions_are_independent() {
        let cache = MapCache::new();
        let user1 = User::new(1, "User1", "Full Name 1", "Hashed Password");
        let user2 = User::new(2, "User2", "Full Name 2", "Hashed Password");

        assert!(cache.get_user_session("sessionKey1").is_none());

        cache.put_user_session("sessionKey1", user1.clone());
        assert_eq!(cache.get_user_session("sessionKey1"), Some(user1.clone()));
        assert!(cache.get_user_session("sessionKey2").is_none());

        cache.put_user_session("sessionKey2", user2.clone());
        cache.put_post(Post::new(1));
        cache.remove_post(1);

        assert_eq!(cache.get_user_session("sessionKey1"), Some(user1));
        assert_eq!(cache.get_user_session("sessionKey2"), Some(user2));

        cache.remove_user_session("sessionKey2");
        assert!(cache.get_user_session("sessionKey2").is_none());
        assert!(cache.get_user_session("sessionKey1").is_some());
        assert_eq!(cache.stats().sessions, 1);
    }

    #[test]
    fn clear_empties_every_index() {
        let cache = MapCache::new();
        cache.put_post(Post::new(1));
        cache
            .put_comment(Comment::new(31, 1))
            .expect("comment with post id");
        cache.put_user_session("k", User::new(1, "u", "U", "h"));

        cache.clear();

        assert_eq!(cache.stats(), CacheStats::default());
    }

    #[test]
    fn store_recovers_from_poisoned_lock() {
        let cache = MapCache::new();

        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = cache
                .indexes
                .write()
                .expect("indexes lock should be acquired");
            panic!("poison indexes lock");
        }));

        cache.put_post(Post::new(1));
        assert!(cache.get_post(1).is_some());
    }
}
