//! Checks a policy against labelled sample pages.
//!
//! A corpus directory holds `corpus.json` plus the HTML files it names:
//!
//! ```json
//! [{ "file": "view.html", "url": "https://www.linkedin.com/jobs/view/1/", "jobPage": true, "title": "Engineer" }]
//! ```

use std::fs;
use std::path::Path;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::detect;
use crate::error::Result;
use crate::extract;
use crate::page::Page;
use crate::policy::Policy;

pub const MANIFEST: &str = "corpus.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorpusCase {
    pub file: String,
    pub url: String,
    pub job_page: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Verdict {
    TruePositive,
    TrueNegative,
    FalsePositive,
    FalseNegative,
    /// File unreadable or URL invalid; the case never got scanned.
    Failed,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseResult {
    pub case: CorpusCase,
    pub verdict: Verdict,
    pub keywords: usize,
    /// Extracted title, for positive scans.
    pub title: Option<String>,
    /// False when an expected title was given and extraction missed it.
    pub title_ok: bool,
    pub error: Option<String>,
}

impl CaseResult {
    pub fn passed(&self) -> bool {
        matches!(self.verdict, Verdict::TruePositive | Verdict::TrueNegative) && self.title_ok
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CorpusReport {
    pub cases: Vec<CaseResult>,
    pub true_positives: usize,
    pub true_negatives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    pub failed: usize,
    pub title_mismatches: usize,
}

impl CorpusReport {
    fn tally(cases: Vec<CaseResult>) -> Self {
        let mut report = CorpusReport::default();
        for result in &cases {
            match result.verdict {
                Verdict::TruePositive => report.true_positives += 1,
                Verdict::TrueNegative => report.true_negatives += 1,
                Verdict::FalsePositive => report.false_positives += 1,
                Verdict::FalseNegative => report.false_negatives += 1,
                Verdict::Failed => report.failed += 1,
            }
            if !result.title_ok {
                report.title_mismatches += 1;
            }
        }
        report.cases = cases;
        report
    }

    pub fn all_passed(&self) -> bool {
        self.cases.iter().all(CaseResult::passed)
    }
}

pub fn load_manifest(dir: &Path) -> Result<Vec<CorpusCase>> {
    let raw = fs::read_to_string(dir.join(MANIFEST))?;
    Ok(serde_json::from_str(&raw)?)
}

pub fn evaluate(dir: &Path, policy: &Policy) -> Result<CorpusReport> {
    evaluate_with(dir, policy, |_| {})
}

/// Like [`evaluate`], calling `progress` once per finished case (from worker
/// threads, in no particular order).
pub fn evaluate_with<F>(dir: &Path, policy: &Policy, progress: F) -> Result<CorpusReport>
where
    F: Fn(&CaseResult) + Sync,
{
    let cases = load_manifest(dir)?;
    info!("Evaluating {} corpus cases in {}", cases.len(), dir.display());

    let results: Vec<CaseResult> = cases
        .into_par_iter()
        .map(|case| {
            let result = run_case(dir, policy, case);
            progress(&result);
            result
        })
        .collect();

    let report = CorpusReport::tally(results);
    info!(
        tp = report.true_positives,
        tn = report.true_negatives,
        fp = report.false_positives,
        fn_ = report.false_negatives,
        failed = report.failed,
        "Corpus evaluated"
    );
    Ok(report)
}

fn run_case(dir: &Path, policy: &Policy, case: CorpusCase) -> CaseResult {
    let page = fs::read_to_string(dir.join(&case.file))
        .map_err(crate::error::Error::from)
        .and_then(|html| Page::parse(&html, &case.url));
    let page = match page {
        Ok(page) => page,
        Err(e) => {
            warn!("Corpus case {} failed: {}", case.file, e);
            return CaseResult {
                case,
                verdict: Verdict::Failed,
                keywords: 0,
                title: None,
                title_ok: false,
                error: Some(e.to_string()),
            };
        }
    };

    let signal = detect::scan(&page, &policy.detection);
    let title = signal
        .is_job_page
        .then(|| extract::extract(&page, &policy.extraction).title);
    let verdict = match (case.job_page, signal.is_job_page) {
        (true, true) => Verdict::TruePositive,
        (false, false) => Verdict::TrueNegative,
        (false, true) => Verdict::FalsePositive,
        (true, false) => Verdict::FalseNegative,
    };
    let title_ok = match (&case.title, &title) {
        (Some(expected), Some(got)) => expected == got,
        (Some(_), None) => false,
        (None, _) => true,
    };

    CaseResult {
        keywords: signal.keyword_count(),
        case,
        verdict,
        title,
        title_ok,
        error: None,
    }
}

// ── Tests ──
