//! Request/response channel between the page context and the extension UI.
//!
//! The UI side only ever pulls: it asks whether the page is a job posting and,
//! if so, for the extracted data. A page context that has not finished its
//! first scan answers [`ChannelError::NotReady`]; one that is gone answers
//! [`ChannelError::Disconnected`]. Neither is retried.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, warn};

use crate::detector::Detector;
use crate::extract::ExtractedJobData;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    CheckJobPage,
    ExtractJobData,
    ForceDetection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    JobData(ExtractedJobData),
    Status {
        #[serde(rename = "isJobPage")]
        is_job_page: bool,
    },
}

impl Response {
    /// Answer from the detector's latest scan. `extractJobData` with nothing
    /// cached gets a negative status rather than an error.
    pub fn answer(detector: &Detector, request: Request) -> Self {
        match request {
            Request::CheckJobPage | Request::ForceDetection => Response::Status {
                is_job_page: detector.is_job_page(),
            },
            Request::ExtractJobData => match detector.job_data() {
                Some(data) => Response::JobData(data.clone()),
                None => Response::Status { is_job_page: false },
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ChannelError {
    #[error("receiving end is not ready yet")]
    NotReady,
    #[error("page context is gone")]
    Disconnected,
}

pub struct Envelope {
    pub request: Request,
    pub reply: oneshot::Sender<Response>,
}

pub fn channel(capacity: usize) -> (PageClient, PageEndpoint) {
    let (tx, rx) = mpsc::channel(capacity);
    let (ready_tx, ready_rx) = watch::channel(false);
    (
        PageClient {
            tx,
            ready: ready_rx,
        },
        PageEndpoint {
            rx,
            ready: ready_tx,
        },
    )
}

/// Page-context end of the channel.
pub struct PageEndpoint {
    rx: mpsc::Receiver<Envelope>,
    ready: watch::Sender<bool>,
}

impl PageEndpoint {
    pub fn mark_ready(&self) {
        self.ready.send_replace(true);
    }

    pub async fn recv(&mut self) -> Option<Envelope> {
        self.rx.recv().await
    }
}

/// UI end of the channel.
#[derive(Clone)]
pub struct PageClient {
    tx: mpsc::Sender<Envelope>,
    ready: watch::Receiver<bool>,
}

impl PageClient {
    pub async fn request(&self, request: Request) -> Result<Response, ChannelError> {
        if !*self.ready.borrow() {
            // A dropped endpoint that never became ready is just as absent.
            return Err(if self.tx.is_closed() {
                ChannelError::Disconnected
            } else {
                ChannelError::NotReady
            });
        }
        let (reply, response) = oneshot::channel();
        self.tx
            .send(Envelope { request, reply })
            .await
            .map_err(|_| ChannelError::Disconnected)?;
        response.await.map_err(|_| ChannelError::Disconnected)
    }

    pub async fn check_job_page(&self) -> Result<bool, ChannelError> {
        self.status(Request::CheckJobPage).await
    }

    /// Re-scan now and report the fresh verdict.
    pub async fn force_detection(&self) -> Result<bool, ChannelError> {
        self.status(Request::ForceDetection).await
    }

    async fn status(&self, request: Request) -> Result<bool, ChannelError> {
        Ok(match self.request(request).await? {
            Response::Status { is_job_page } => is_job_page,
            Response::JobData(_) => true,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobAvailability {
    Ready(ExtractedJobData),
    NotJobPage,
    /// Page context not injected or not done with its first scan.
    NotYetAvailable,
    /// Page context destroyed; job data stays unavailable.
    Unavailable,
}

/// Check the page, then pull its data. Channel failures become availability
/// states, never errors.
pub async fn fetch_job_data(client: &PageClient) -> JobAvailability {
    match try_fetch(client).await {
        Ok(Some(data)) => JobAvailability::Ready(data),
        Ok(None) => JobAvailability::NotJobPage,
        Err(ChannelError::NotReady) => {
            debug!("Page context not ready, no job data yet");
            JobAvailability::NotYetAvailable
        }
        Err(ChannelError::Disconnected) => {
            warn!("Page context disconnected, job data unavailable");
            JobAvailability::Unavailable
        }
    }
}

async fn try_fetch(client: &PageClient) -> Result<Option<ExtractedJobData>, ChannelError> {
    if !client.check_job_page().await? {
        return Ok(None);
    }
    match client.request(Request::ExtractJobData).await? {
        Response::JobData(data) => Ok(Some(data)),
        // Rescanned negative between the two requests.
        Response::Status { .. } => Ok(None),
    }
}

// ── Tests ──
