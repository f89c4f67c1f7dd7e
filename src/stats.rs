use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Counters for one connection.
pub struct ConnectionStats {
    opened_at: Instant,
    commands_sent: AtomicU64,
    replies_received: AtomicU64,
    server_errors: AtomicU64,
    timeouts: AtomicU64,
    discarded_replies: AtomicU64,
    failed_requests: AtomicU64,
    command_calls: Mutex<HashMap<String, u64>>,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self {
            opened_at: Instant::now(),
            commands_sent: AtomicU64::new(0),
            replies_received: AtomicU64::new(0),
            server_errors: AtomicU64::new(0),
            timeouts: AtomicU64::new(0),
            discarded_replies: AtomicU64::new(0),
            failed_requests: AtomicU64::new(0),
            command_calls: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn on_command(&self, command: &str) {
        self.commands_sent.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut calls) = self.command_calls.lock() {
            let key = command.to_ascii_lowercase();
            let entry = calls.entry(key).or_insert(0);
            *entry += 1;
        }
    }

    pub(crate) fn on_reply(&self) {
        self.replies_received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn on_server_error(&self) {
        self.server_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn on_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn on_discarded(&self) {
        self.discarded_replies.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn on_failed(&self, count: usize) {
        self.failed_requests
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn uptime_secs(&self) -> u64 {
        self.opened_at.elapsed().as_secs()
    }

    pub fn commands_sent(&self) -> u64 {
        self.commands_sent.load(Ordering::Relaxed)
    }

    pub fn replies_received(&self) -> u64 {
        self.replies_received.load(Ordering::Relaxed)
    }

    pub fn server_errors(&self) -> u64 {
        self.server_errors.load(Ordering::Relaxed)
    }

    pub fn timeouts(&self) -> u64 {
        self.timeouts.load(Ordering::Relaxed)
    }

    /// Replies that arrived after their caller stopped waiting.
    pub fn discarded_replies(&self) -> u64 {
        self.discarded_replies.load(Ordering::Relaxed)
    }

    /// Requests resolved with a connection failure.
    pub fn failed_requests(&self) -> u64 {
        self.failed_requests.load(Ordering::Relaxed)
    }

    pub fn command_stats_snapshot(&self) -> Vec<(String, u64)> {
        if let Ok(calls) = self.command_calls.lock() {
            let mut out: Vec<(String, u64)> = calls.iter().map(|(k, v)| (k.clone(), *v)).collect();
            out.sort_by(|a, b| a.0.cmp(&b.0));
            return out;
        }
        Vec::new()
    }
}

impl Default for ConnectionStats {
    fn default() -> Self {
        Self::new()
    }
}
