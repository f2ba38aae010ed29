use std::sync::Arc;

use serde::Serialize;

use crate::detect::{self, PageSignal};
use crate::extract::{self, ExtractedJobData};
use crate::page::Page;
use crate::policy::Policy;
use crate::trigger::ScanReason;

/// Result of one scan. `data` is present exactly when the page was judged a
/// job posting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    pub reason: ScanReason,
    pub signal: PageSignal,
    pub data: Option<ExtractedJobData>,
}

/// Detection state for one page view. Every scan replaces the previous
/// detection wholesale.
#[derive(Debug, Clone)]
pub struct Detector {
    policy: Arc<Policy>,
    latest: Option<Detection>,
}

impl Detector {
    pub fn new(policy: Arc<Policy>) -> Self {
        Self {
            policy,
            latest: None,
        }
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn rescan(&mut self, page: &Page, reason: ScanReason) -> &Detection {
        let signal = detect::scan(page, &self.policy.detection);
        let data = signal
            .is_job_page
            .then(|| extract::extract(page, &self.policy.extraction));
        self.latest.insert(Detection {
            reason,
            signal,
            data,
        })
    }

    pub fn detection(&self) -> Option<&Detection> {
        self.latest.as_ref()
    }

    pub fn is_job_page(&self) -> bool {
        self.latest.as_ref().is_some_and(|d| d.signal.is_job_page)
    }

    pub fn job_data(&self) -> Option<&ExtractedJobData> {
        self.latest.as_ref().and_then(|d| d.data.as_ref())
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    const JOB: &str = r#"<html><body>
        <h1 class="job-details-jobs-unified-top-card__job-title">Senior Engineer</h1>
        </body></html>"#;

    #[test]
    fn fresh_detector_has_nothing() {
        let detector = Detector::new(Arc::new(Policy::default()));
        assert!(detector.detection().is_none());
        assert!(!detector.is_job_page());
        assert!(detector.job_data().is_none());
    }

    #[test]
    fn positive_scan_caches_data() {
        let mut detector = Detector::new(Arc::new(Policy::default()));
        let page = Page::parse(JOB, "https://www.linkedin.com/jobs/view/123").unwrap();
        let detection = detector.rescan(&page, ScanReason::PageLoad);
        assert!(detection.signal.is_job_page);
        assert_eq!(detection.data.as_ref().unwrap().title, "Senior Engineer");
        assert!(detector.is_job_page());
    }

    #[test]
    fn url_change_replaces_previous_data() {
        let mut detector = Detector::new(Arc::new(Policy::default()));
        let page = Page::parse(JOB, "https://www.linkedin.com/jobs/view/123").unwrap();
        detector.rescan(&page, ScanReason::PageLoad);
        assert!(detector.job_data().is_some());

        // Same markup, but the SPA navigated to the feed and the job card is gone.
        let page = Page::parse("<html><body><p>Feed</p></body></html>", "https://www.linkedin.com/feed/")
            .unwrap();
        let detection = detector.rescan(&page, ScanReason::UrlChanged);
        assert!(!detection.signal.is_job_page);
        assert!(!detection.signal.url_pattern);
        assert!(detector.job_data().is_none());
        assert_eq!(detector.detection().unwrap().reason, ScanReason::UrlChanged);
    }

    #[test]
    fn new_job_url_gets_new_data() {
        let mut detector = Detector::new(Arc::new(Policy::default()));
        let first = Page::parse(JOB, "https://www.linkedin.com/jobs/view/123").unwrap();
        detector.rescan(&first, ScanReason::PageLoad);
        let second = Page::parse(JOB, "https://www.linkedin.com/jobs/view/456").unwrap();
        detector.rescan(&second, ScanReason::UrlChanged);
        assert_eq!(
            detector.job_data().unwrap().url,
            "https://www.linkedin.com/jobs/view/456"
        );
    }
}
