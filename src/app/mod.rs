pub mod auth;
pub mod conversations;
pub mod error;
pub mod matches;
pub mod messages;
pub mod moderation;
pub mod rate_limiter;
pub mod unread;

/// One page of results plus the total matching count.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
}
