/// Per-user quotas on write actions.
#[derive(Debug, Clone, Copy)]
pub struct RateLimits {
    pub messages_per_hour: u32,
    pub messages_per_day: u32,
    pub match_requests_per_day: u32,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            messages_per_hour: 60,
            messages_per_day: 300,
            match_requests_per_day: 20,
        }
    }
}

/// Write actions subject to quotas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateAction {
    Message,
    MatchRequest,
}

impl RateAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::MatchRequest => "match_request",
        }
    }
}

impl RateLimits {
    /// Every (limit, window) pair that applies to `action`.
    pub fn windows_for(&self, action: RateAction) -> Vec<(u32, RateWindow)> {
        match action {
            RateAction::Message => vec![
                (self.messages_per_hour, RateWindow::Hour),
                (self.messages_per_day, RateWindow::Day),
            ],
            RateAction::MatchRequest => vec![(self.match_requests_per_day, RateWindow::Day)],
        }
    }
}

/// Time window for rate limiting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateWindow {
    Hour,
    Day,
}

impl RateWindow {
    pub fn seconds(&self) -> u64 {
        match self {
            RateWindow::Hour => 3600,
            RateWindow::Day => 86400,
        }
    }
}

/// Calculate current window timestamp for rate limiting
pub fn current_window(window_seconds: u64) -> u64 {
    window_index(time::OffsetDateTime::now_utc().unix_timestamp(), window_seconds)
}

/// Fixed-window bucket containing `unix_seconds`.
pub fn window_index(unix_seconds: i64, window_seconds: u64) -> u64 {
    u64::try_from(unix_seconds).unwrap_or_default() / window_seconds.max(1)
}
