//! Pure derivations over the fetched post list.
//!
//! Everything here is recomputed on each render; the data set is small enough
//! that nothing is memoized.

use crate::model::{Post, Principal};

const MILLIS_PER_HOUR: i64 = 60 * 60 * 1000;
const NANOS_PER_MILLI: u64 = 1_000_000;

/// A point in time as the backend or the browser reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timestamp {
    Nanos(u64),
    Millis(i64),
}

impl Timestamp {
    fn as_millis(self) -> Option<i64> {
        match self {
            Timestamp::Nanos(0) | Timestamp::Millis(0) => None,
            Timestamp::Nanos(n) => Some((n / NANOS_PER_MILLI) as i64),
            Timestamp::Millis(m) => Some(m),
        }
    }
}

/// Posts whose title or description contains `term`, ignoring case.
pub fn filter_posts<'a>(posts: &'a [Post], term: &str) -> Vec<&'a Post> {
    let needle = term.to_lowercase();
    posts
        .iter()
        .filter(|p| {
            p.title.to_lowercase().contains(&needle)
                || p.description.to_lowercase().contains(&needle)
        })
        .collect()
}

pub fn answered_count(posts: &[Post]) -> usize {
    posts.iter().filter(|p| p.is_answered()).count()
}

pub fn unanswered_count(posts: &[Post]) -> usize {
    posts.iter().filter(|p| !p.is_answered()).count()
}

/// Elapsed-time label for `timestamp` relative to `now_millis`.
pub fn time_ago(timestamp: Timestamp, now_millis: i64) -> String {
    let Some(then) = timestamp.as_millis() else {
        return "unknown date".to_string();
    };

    let hours = (now_millis - then).div_euclid(MILLIS_PER_HOUR);
    if hours < 1 {
        return "less than 1 hour".to_string();
    }
    if hours == 1 {
        return "1 hour".to_string();
    }
    if hours < 24 {
        return format!("{} hours", hours);
    }

    let days = hours / 24;
    if days == 1 {
        "1 day".to_string()
    } else {
        format!("{} days", days)
    }
}

/// Whether `viewer` gets edit/delete controls on `post`.
///
/// Cosmetic only: the backend decides whether the change is allowed.
pub fn can_edit(viewer: Option<&Principal>, post: &Post) -> bool {
    viewer.is_some_and(|v| v.as_str() == post.created_by.as_str())
}

pub fn responses_label(count: usize) -> String {
    if count == 1 {
        "1 response".to_string()
    } else {
        format!("{} responses", count)
    }
}
