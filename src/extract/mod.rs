pub mod fields;
pub mod lists;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::page::Page;
use crate::policy::ExtractionPolicy;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedJobData {
    pub url: String,
    pub title: String,
    pub company: String,
    pub description: String,
    pub requirements: Vec<String>,
    pub responsibilities: Vec<String>,
    pub extracted_at: DateTime<Utc>,
}

/// Pull every field out of a page already judged to be a job posting.
/// Missing fields resolve to their fallbacks; this never fails.
pub fn extract(page: &Page, policy: &ExtractionPolicy) -> ExtractedJobData {
    let title = fields::title(page, policy);
    let company = fields::company(page, policy);
    let description = fields::description(page, policy, &title);
    let requirements = lists::items_under_heading(page, &policy.requirement_headings);
    let responsibilities = lists::items_under_heading(page, &policy.responsibility_headings);

    debug!(
        title = %title,
        company = %company,
        description_len = description.len(),
        requirements = requirements.len(),
        responsibilities = responsibilities.len(),
        "Extracted job data"
    );

    ExtractedJobData {
        url: page.href().to_string(),
        title,
        company,
        description,
        requirements,
        responsibilities,
        extracted_at: Utc::now(),
    }
}

// ── Tests ──
