use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use crate::policy::TriggerPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ScanReason {
    PageLoad,
    /// Short delay after load for content rendered by scripts.
    AsyncContent,
    /// Longer delays on single-page-app boards.
    SpaFollowUp,
    UrlChanged,
    /// Requested explicitly over the message channel.
    Forced,
}

/// Pending scans ordered by deadline. Stale entries are kept: a scan that
/// fires late just reads whatever the document looks like by then.
#[derive(Debug, Default)]
pub struct ScanQueue {
    pending: Vec<(Instant, ScanReason)>,
}

impl ScanQueue {
    pub fn on_page_load(&mut self, now: Instant, host: &str, policy: &TriggerPolicy) {
        self.push(now, ScanReason::PageLoad);
        for ms in &policy.load_delays_ms {
            self.push(now + Duration::from_millis(*ms), ScanReason::AsyncContent);
        }
        if policy.is_spa_host(host) {
            for ms in &policy.spa_delays_ms {
                self.push(now + Duration::from_millis(*ms), ScanReason::SpaFollowUp);
            }
        }
    }

    pub fn on_url_change(&mut self, now: Instant, policy: &TriggerPolicy) {
        self.push(
            now + Duration::from_millis(policy.url_change_delay_ms),
            ScanReason::UrlChanged,
        );
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.first().map(|(at, _)| *at)
    }

    /// Remove and return every scan due at `now`, earliest first.
    pub fn take_due(&mut self, now: Instant) -> Vec<ScanReason> {
        let split = self.pending.partition_point(|(at, _)| *at <= now);
        self.pending.drain(..split).map(|(_, reason)| reason).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn push(&mut self, at: Instant, reason: ScanReason) {
        let idx = self.pending.partition_point(|(t, _)| *t <= at);
        self.pending.insert(idx, (at, reason));
    }
}

// ── Tests ──
