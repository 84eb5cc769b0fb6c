//! Concurrent workload that drives every cache operation from many threads.
//!
//! Workers walk a fixed schedule over a bounded post id space so that post
//! removals, comment puts and group replacements for the same post collide
//! constantly. Every comment read back is checked against the post it was
//! requested for.

use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cache::CachingService;
use crate::domain::entities::{Comment, CommentId, Post, PostId, User};

const COMMENTS_PER_POST: i32 = 8;
const SCHEDULE_LEN: usize = 12;
const COMMENT_ID_STRIDE: i32 = 1000;

/// Largest `post_span` whose comment ids still fit in a [`CommentId`].
pub const MAX_POST_SPAN: i32 = (CommentId::MAX - COMMENT_ID_STRIDE) / COMMENT_ID_STRIDE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoakPlan {
    pub threads: usize,
    pub rounds: usize,
    pub post_span: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SoakReport {
    pub operations: u64,
    pub hits: u64,
    pub misses: u64,
    /// Reads that returned a comment filed under the wrong post.
    pub stray_reads: u64,
    pub elapsed: Duration,
}

#[derive(Default)]
struct Tally {
    operations: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    stray_reads: AtomicU64,
}

impl Tally {
    fn lookup<T>(&self, found: &Option<T>) {
        let counter = if found.is_some() {
            &self.hits
        } else {
            &self.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Runs `plan` against `cache` and reports what the workers observed.
pub fn run(cache: &dyn CachingService, plan: SoakPlan) -> SoakReport {
    let tally = Tally::default();
    let started_at = Instant::now();

    info!(
        threads = plan.threads,
        rounds = plan.rounds,
        post_span = plan.post_span,
        cache = cache.name(),
        "starting soak"
    );

    thread::scope(|scope| {
        for worker in 0..plan.threads {
            let tally = &tally;
            scope.spawn(move || run_worker(cache, plan, worker, tally));
        }
    });

    let report = SoakReport {
        operations: tally.operations.load(Ordering::Relaxed),
        hits: tally.hits.load(Ordering::Relaxed),
        misses: tally.misses.load(Ordering::Relaxed),
        stray_reads: tally.stray_reads.load(Ordering::Relaxed),
        elapsed: started_at.elapsed(),
    };

    info!(
        operations = report.operations,
        hits = report.hits,
        misses = report.misses,
        stray_reads = report.stray_reads,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "soak finished"
    );

    report
}

fn run_worker(cache: &dyn CachingService, plan: SoakPlan, worker: usize, tally: &Tally) {
    let liker = format!("worker-{worker}");
    let span = plan.post_span.clamp(1, MAX_POST_SPAN) as usize;

    for round in 0..plan.rounds {
        let post_id = ((round * 31 + worker * 17) % span) as PostId + 1;
        let comment_id = comment_id_for(post_id, round);

        match (round + worker) % SCHEDULE_LEN {
            0 => cache.put_post(Post::new(post_id).with_text(format!("post {post_id}"))),
            1 => {
                if let Err(err) = cache.put_comment(Comment::new(comment_id, post_id)) {
                    warn!(error = %err, "soak comment rejected");
                }
            }
            2 => {
                let group = (0..3)
                    .map(|offset| Comment::new(comment_id_for(post_id, round + offset), post_id))
                    .collect();
                if let Err(err) = cache.put_comments_for_post(post_id, group) {
                    warn!(error = %err, "soak comment group rejected");
                }
            }
            3 => cache.remove_post(post_id),
            4 => cache.remove_comment(comment_id),
            5 => cache.edit_post(post_id, &format!("edited by {liker}")),
            6 => cache.like_post(post_id, &liker),
            7 => cache.unlike_post(post_id, &liker),
            8 => {
                cache.edit_comment(comment_id, &format!("edited by {liker}"));
                cache.like_comment(comment_id, &liker);
                cache.unlike_comment(comment_id, &liker);
            }
            9 => {
                let comments = cache.get_comments_for_post(post_id);
                tally.lookup(&comments);
                let strays = comments
                    .iter()
                    .flatten()
                    .filter(|comment| comment.post_id != Some(post_id))
                    .count() as u64;
                if strays > 0 {
                    warn!(post_id, strays, "comment group returned foreign comments");
                    tally.stray_reads.fetch_add(strays, Ordering::Relaxed);
                }
            }
            10 => {
                tally.lookup(&cache.get_post(post_id));
                let comment = cache.get_comment(comment_id);
                tally.lookup(&comment);
                if comment.is_some_and(|c| c.post_id != Some(post_id)) {
                    tally.stray_reads.fetch_add(1, Ordering::Relaxed);
                }
            }
            _ => {
                let key = Uuid::new_v4().to_string();
                let user = User::new(worker as i32, liker.clone(), liker.clone(), "soak");
                cache.put_user_session(&key, user);
                tally.lookup(&cache.get_user_session(&key));
                cache.remove_user_session(&key);
            }
        }

        tally.operations.fetch_add(1, Ordering::Relaxed);
    }

    debug!(worker, "soak worker done");
}

fn comment_id_for(post_id: PostId, round: usize) -> CommentId {
    post_id * COMMENT_ID_STRIDE + (round as i32 % COMMENTS_PER_POST)
}
