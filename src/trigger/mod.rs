//! Decides when to scan.
//!
//! A [`Trigger`] owns one page view: it scans on load, again after the
//! configured delays, again whenever the URL changes without a reload, and on
//! explicit request over the message channel. It is a single task; a scan runs
//! to completion before the next event is looked at, so scans never overlap.

pub mod affordance;
pub mod schedule;
pub mod source;

use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use url::Url;

use crate::detector::Detector;
use crate::messaging::{Envelope, PageEndpoint, Request, Response};
use crate::page::Page;
use crate::policy::TriggerPolicy;

pub use affordance::{Affordance, LogAffordance};
pub use schedule::{ScanQueue, ScanReason};
pub use source::{FileSource, HttpSource, MemorySource, SnapshotSource};

pub struct Trigger<S, A> {
    source: S,
    affordance: A,
    detector: Detector,
    queue: ScanQueue,
    current_url: Option<String>,
}

impl<S: SnapshotSource, A: Affordance> Trigger<S, A> {
    pub fn new(source: S, affordance: A, detector: Detector) -> Self {
        Self {
            source,
            affordance,
            detector,
            queue: ScanQueue::default(),
            current_url: None,
        }
    }

    /// Drive the page view until `shutdown` resolves, then hand back the
    /// detector with the latest detection.
    pub async fn run(mut self, mut endpoint: PageEndpoint, shutdown: impl Future<Output = ()>) -> Detector {
        let policy = self.detector.policy().trigger.clone();
        let mut poll = tokio::time::interval(Duration::from_millis(policy.poll_interval_ms.max(1)));
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        self.page_load(&policy).await;
        endpoint.mark_ready();

        loop {
            let deadline = self.queue.next_deadline();
            tokio::select! {
                _ = &mut shutdown => break,
                _ = wait_until(deadline) => self.run_due().await,
                _ = poll.tick() => self.poll_url(&policy).await,
                Some(envelope) = endpoint.recv() => self.answer(envelope).await,
            }
        }

        debug!("Trigger stopped with {} scans pending", self.queue.len());
        self.detector
    }

    async fn page_load(&mut self, policy: &TriggerPolicy) {
        let url = match self.source.current_url().await {
            Ok(url) => url,
            Err(e) => {
                warn!("No document to scan on load: {}", e);
                return;
            }
        };
        info!("Content script loaded on {}", url);
        self.queue.on_page_load(Instant::now(), &host_of(&url), policy);
        self.current_url = Some(url);
        self.run_due().await;
    }

    async fn poll_url(&mut self, policy: &TriggerPolicy) {
        let Ok(url) = self.source.current_url().await else {
            return;
        };
        if self.current_url.as_deref() == Some(url.as_str()) {
            return;
        }
        if self.current_url.is_none() {
            // Document appeared after start-up; treat it as a fresh load.
            self.page_load(policy).await;
            return;
        }
        info!("URL changed to {}, re-detecting job description", url);
        self.current_url = Some(url);
        self.queue.on_url_change(Instant::now(), policy);
    }

    async fn run_due(&mut self) {
        for reason in self.queue.take_due(Instant::now()) {
            self.scan(reason).await;
        }
    }

    async fn scan(&mut self, reason: ScanReason) {
        let snapshot = match self.source.snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Skipping {:?} scan: {}", reason, e);
                return;
            }
        };
        let page = match Page::from_snapshot(&snapshot) {
            Ok(page) => page,
            Err(e) => {
                warn!("Skipping {:?} scan: {}", reason, e);
                return;
            }
        };

        debug!("Running {:?} scan on {}", reason, page.href());
        let detection = self.detector.rescan(&page, reason);
        match &detection.data {
            Some(data) => self.affordance.show(data),
            None => self.affordance.hide(),
        }
    }

    async fn answer(&mut self, envelope: Envelope) {
        let Envelope { request, reply } = envelope;
        debug!("Message received: {:?}", request);
        if request == Request::ForceDetection {
            self.scan(ScanReason::Forced).await;
        }
        let response = Response::answer(&self.detector, request);
        if reply.send(response).is_err() {
            debug!("Requester went away before the reply");
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

fn host_of(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_lowercase))
        .unwrap_or_default()
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use tokio::sync::oneshot;
    use tokio::time::sleep;

    use super::*;
    use crate::extract::ExtractedJobData;
    use crate::messaging::{self, fetch_job_data, JobAvailability};
    use crate::page::Snapshot;
    use crate::policy::Policy;

    fn fixture(name: &str) -> String {
        std::fs::read_to_string(format!("tests/fixtures/{}.html", name)).unwrap()
    }

    #[derive(Clone, Default)]
    struct Recorder {
        events: Arc<Mutex<Vec<String>>>,
    }

    impl Recorder {
        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    impl Affordance for Recorder {
        fn show(&mut self, data: &ExtractedJobData) {
            self.events.lock().unwrap().push(format!("show {}", data.title));
        }

        fn hide(&mut self) {
            self.events.lock().unwrap().push("hide".to_string());
        }
    }

    fn detector() -> Detector {
        Detector::new(Arc::new(Policy::default()))
    }

    #[tokio::test(start_paused = true)]
    async fn url_change_rescans_and_drops_stale_data() {
        let source = MemorySource::new(Snapshot::new(
            "https://boards.greenhouse.io/acme/jobs/42",
            fixture("greenhouse_jsonld"),
        ));
        let page = source.clone();
        let recorder = Recorder::default();
        let (client, endpoint) = messaging::channel(8);
        let (stop, stopped) = oneshot::channel::<()>();

        let trigger = Trigger::new(source, recorder.clone(), detector());
        let run = trigger.run(endpoint, async {
            let _ = stopped.await;
        });

        let drive = async {
            sleep(Duration::from_millis(1000)).await;
            let before = fetch_job_data(&client).await;

            // SPA navigation: new URL and new markup, no reload.
            page.load(Snapshot::new(
                "https://boards.greenhouse.io/acme/blog/autumn",
                fixture("blog_post"),
            ));
            sleep(Duration::from_millis(1000)).await;
            let pending = fetch_job_data(&client).await;

            sleep(Duration::from_millis(2000)).await;
            let after = fetch_job_data(&client).await;
            let _ = stop.send(());
            (before, pending, after)
        };

        let (detector, (before, pending, after)) = tokio::join!(run, drive);

        match before {
            JobAvailability::Ready(data) => assert_eq!(data.title, "Flight Software Engineer"),
            other => panic!("expected job data, got {:?}", other),
        }
        // The URL-change scan has not fired yet; the last scan's data stands.
        assert!(matches!(pending, JobAvailability::Ready(_)));
        assert_eq!(after, JobAvailability::NotJobPage);
        assert_eq!(detector.detection().unwrap().reason, ScanReason::UrlChanged);
        assert!(detector.job_data().is_none());
        assert_eq!(
            recorder.events(),
            vec![
                "show Flight Software Engineer".to_string(),
                "show Flight Software Engineer".to_string(),
                "hide".to_string(),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn spa_host_is_rescanned_after_late_render() {
        // LinkedIn renders the job card after the shell; only the follow-up
        // scans can see it.
        let source = MemorySource::new(Snapshot::new(
            "https://www.linkedin.com/jobs/collections/recommended/",
            "<html><body><div id=\"shell\"></div></body></html>",
        ));
        let page = source.clone();
        let (client, endpoint) = messaging::channel(8);
        let (stop, stopped) = oneshot::channel::<()>();

        let trigger = Trigger::new(source, LogAffordance::default(), detector());
        let run = trigger.run(endpoint, async {
            let _ = stopped.await;
        });

        let drive = async {
            sleep(Duration::from_millis(700)).await;
            let early = fetch_job_data(&client).await;
            page.set_html(fixture("linkedin_view"));
            sleep(Duration::from_millis(1500)).await;
            let late = fetch_job_data(&client).await;
            let _ = stop.send(());
            (early, late)
        };

        let (_, (early, late)) = tokio::join!(run, drive);
        assert_eq!(early, JobAvailability::NotJobPage);
        match late {
            JobAvailability::Ready(data) => {
                assert_eq!(data.title, "Senior Backend Engineer");
                assert_eq!(data.company, "Northwind Logistics");
            }
            other => panic!("expected job data, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn forced_detection_scans_immediately() {
        let source = MemorySource::new(Snapshot::new(
            "https://www.indeed.com/viewjob?jk=1",
            fixture("blog_post"),
        ));
        let page = source.clone();
        let (client, endpoint) = messaging::channel(8);
        let (stop, stopped) = oneshot::channel::<()>();

        let trigger = Trigger::new(source, LogAffordance::default(), detector());
        let run = trigger.run(endpoint, async {
            let _ = stopped.await;
        });

        let drive = async {
            sleep(Duration::from_millis(600)).await;
            let before = client.force_detection().await;
            page.set_html(fixture("keyword_rich"));
            let after = client.force_detection().await;
            let _ = stop.send(());
            (before, after)
        };

        let (detector, (before, after)) = tokio::join!(run, drive);
        assert_eq!(before, Ok(false));
        assert_eq!(after, Ok(true));
        assert_eq!(detector.detection().unwrap().reason, ScanReason::Forced);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_document_skips_scans() {
        let source = MemorySource::default();
        let (client, endpoint) = messaging::channel(8);
        let (stop, stopped) = oneshot::channel::<()>();

        let trigger = Trigger::new(source, LogAffordance::default(), detector());
        let run = trigger.run(endpoint, async {
            let _ = stopped.await;
        });
        let drive = async {
            sleep(Duration::from_millis(100)).await;
            let status = client.check_job_page().await;
            let _ = stop.send(());
            status
        };

        let (detector, status) = tokio::join!(run, drive);
        assert_eq!(status, Ok(false));
        assert!(detector.detection().is_none());
    }
}
