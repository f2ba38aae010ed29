use tracing::debug;

use crate::page::{text_content, Page};
use crate::policy::{ExtractionPolicy, FieldRule};

pub fn title(page: &Page, policy: &ExtractionPolicy) -> String {
    if let Some(found) = first_text(page, &policy.title, |t| !t.trim().is_empty()) {
        return found;
    }

    let fallback = title_prefix(&page.document_title(), &policy.title_delimiters);
    debug!("Job title fallback from document title: {:?}", fallback);
    fallback.unwrap_or_else(|| policy.title_placeholder.clone())
}

pub fn company(page: &Page, policy: &ExtractionPolicy) -> String {
    first_text(page, &policy.company, |t| !t.trim().is_empty())
        .unwrap_or_else(|| {
            debug!("Company fallback: {}", policy.company_placeholder);
            policy.company_placeholder.clone()
        })
}

/// Never empty: falls back to main/body text and then to `title`.
pub fn description(page: &Page, policy: &ExtractionPolicy, title: &str) -> String {
    // Length is judged on the untrimmed text, padding included.
    let min = policy.description_min_chars;
    if let Some(found) = first_text(page, &policy.description, |t| t.chars().count() > min) {
        return found;
    }

    let body: String = page
        .main_text()
        .chars()
        .take(policy.fallback_body_chars)
        .collect();
    let body = body.trim();
    debug!("Description fallback from main content ({} chars)", body.len());
    if body.is_empty() {
        title.to_string()
    } else {
        body.to_string()
    }
}

/// Trimmed text of the first element matched by the earliest selector whose
/// raw text satisfies `accept`. Later selectors are never consulted once one
/// succeeds.
fn first_text(page: &Page, rule: &FieldRule, accept: impl Fn(&str) -> bool) -> Option<String> {
    rule.iter().find_map(|(source, selector)| {
        let element = page.first(selector)?;
        let raw = text_content(element);
        if accept(&raw) {
            let text = raw.trim();
            debug!("Matched selector {:?} ({} chars)", source, text.len());
            Some(text.to_string())
        } else {
            None
        }
    })
}

/// Leading part of a document title, cut at the first delimiter.
fn title_prefix(doc_title: &str, delimiters: &[char]) -> Option<String> {
    let prefix = doc_title.split(|c| delimiters.contains(&c)).next()?.trim();
    if prefix.is_empty() {
        None
    } else {
        Some(prefix.to_string())
    }
}

// ── Tests ──
