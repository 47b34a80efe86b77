//! Rebuild reply chains from linked posts.

use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::error::ThreadError;
use crate::models::{Post, Thread};
use crate::utils::word_count;

/// Reconstruct threads from posts sorted oldest first.
///
/// Every post without a `parent` seeds one thread, which is extended by
/// following `nextTweet` until the chain ends. Posts with a parent are only
/// reachable as continuations and never start a thread of their own.
pub fn reconstruct(posts: &[Post]) -> Result<Vec<Thread>, ThreadError> {
    let mut by_id: HashMap<&str, &Post> = HashMap::with_capacity(posts.len());
    for post in posts {
        if by_id.insert(post.id.as_str(), post).is_some() {
            return Err(ThreadError::DuplicatePost(post.id.clone()));
        }
    }

    let mut threads = Vec::new();
    for root in posts.iter().filter(|p| p.is_root()) {
        threads.push(follow_chain(root, &by_id)?);
    }

    Ok(threads)
}

fn follow_chain<'a>(
    root: &'a Post,
    by_id: &HashMap<&'a str, &'a Post>,
) -> Result<Thread, ThreadError> {
    let mut visited: HashSet<&'a str> = HashSet::new();
    let mut post_ids = Vec::new();
    let mut text = String::new();
    let mut words = 0;

    let mut current = root;
    loop {
        if !visited.insert(current.id.as_str()) {
            return Err(ThreadError::Cycle {
                root: root.id.clone(),
                id: current.id.clone(),
            });
        }

        post_ids.push(current.id.clone());
        text.push_str(&current.full_text);
        words += word_count(&current.full_text);

        let Some(next_id) = current.next_tweet.as_deref() else {
            break;
        };
        current = by_id
            .get(next_id)
            .copied()
            .ok_or_else(|| ThreadError::MissingPost {
                from: current.id.clone(),
                id: next_id.to_string(),
            })?;
    }

    Ok(Thread {
        id: root.id.clone(),
        post_ids,
        text,
        word_count: words,
    })
}

/// Summary figures for a set of threads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ThreadStats {
    pub threads: usize,
    pub posts: usize,
    pub words: usize,
    pub longest: usize,
}

impl ThreadStats {
    pub fn from_threads(threads: &[Thread]) -> Self {
        threads.iter().fold(Self::default(), |mut acc, t| {
            acc.threads += 1;
            acc.posts += t.len();
            acc.words += t.word_count;
            acc.longest = acc.longest.max(t.len());
            acc
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> Vec<Post> {
        vec![
            Post::new("A", "first ").with_next("B"),
            Post::new("B", "second ").with_parent("A").with_next("C"),
            Post::new("C", "third").with_parent("B"),
        ]
    }

    #[test]
    fn test_single_chain() {
        let threads = reconstruct(&chain()).unwrap();
        assert_eq!(threads.len(), 1);

        let thread = &threads[0];
        assert_eq!(thread.id, "A");
        assert_eq!(thread.post_ids, vec!["A", "B", "C"]);
        assert_eq!(thread.text, "first second third");
        assert_eq!(thread.word_count, 3);
    }

    #[test]
    fn test_text_has_no_separator() {
        let posts = vec![
            Post::new("1", "ab").with_next("2"),
            Post::new("2", "cd").with_parent("1"),
        ];
        let threads = reconstruct(&posts).unwrap();
        assert_eq!(threads[0].text, "abcd");
    }

    #[test]
    fn test_standalone_posts_are_threads() {
        let mut posts = chain();
        posts.push(Post::new("D", "alone"));
        posts.insert(0, Post::new("Z", "earlier"));

        let threads = reconstruct(&posts).unwrap();
        let ids: Vec<&str> = threads.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["Z", "A", "D"]);
        assert_eq!(threads[2].post_ids, vec!["D"]);
    }

    #[test]
    fn test_cycle_is_rejected() {
        let posts = vec![
            Post::new("A", "a").with_next("B"),
            Post::new("B", "b").with_parent("A").with_next("C"),
            Post::new("C", "c").with_parent("B").with_next("B"),
        ];
        let err = reconstruct(&posts).unwrap_err();
        assert_eq!(
            err,
            ThreadError::Cycle {
                root: "A".to_string(),
                id: "B".to_string(),
            }
        );
    }

    #[test]
    fn test_self_loop_is_rejected() {
        let posts = vec![Post::new("A", "a").with_next("A")];
        assert!(matches!(
            reconstruct(&posts),
            Err(ThreadError::Cycle { .. })
        ));
    }

    #[test]
    fn test_missing_link() {
        let posts = vec![Post::new("A", "a").with_next("gone")];
        let err = reconstruct(&posts).unwrap_err();
        assert_eq!(
            err,
            ThreadError::MissingPost {
                from: "A".to_string(),
                id: "gone".to_string(),
            }
        );
    }

    #[test]
    fn test_duplicate_ids() {
        let posts = vec![Post::new("A", "a"), Post::new("A", "b")];
        assert_eq!(
            reconstruct(&posts).unwrap_err(),
            ThreadError::DuplicatePost("A".to_string())
        );
    }

    #[test]
    fn test_empty_input() {
        assert!(reconstruct(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_thread_stats() {
        let mut posts = chain();
        posts.push(Post::new("D", "one two"));
        let threads = reconstruct(&posts).unwrap();
        let stats = ThreadStats::from_threads(&threads);
        assert_eq!(
            stats,
            ThreadStats {
                threads: 2,
                posts: 4,
                words: 5,
                longest: 3,
            }
        );
    }
}
