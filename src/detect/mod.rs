pub mod structured;

use serde::Serialize;
use tracing::{debug, info};

use crate::page::Page;
use crate::policy::DetectionPolicy;

/// Evidence gathered by one scan, plus the decision drawn from it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSignal {
    pub is_job_page: bool,
    pub host_allowed: bool,
    pub matched_keywords: Vec<String>,
    pub structured_data: bool,
    pub site_elements: Vec<String>,
    pub url_pattern: bool,
}

impl PageSignal {
    pub fn keyword_count(&self) -> usize {
        self.matched_keywords.len()
    }
}

/// Compute every signal for `page` and combine them. Nothing short-circuits:
/// the returned evidence is complete even when the host check already fails.
pub fn scan(page: &Page, policy: &DetectionPolicy) -> PageSignal {
    let host = page.host();
    let host_allowed = policy.job_sites.iter().any(|site| host.contains(site.as_str()));

    let text = page.visible_text().to_lowercase();
    let matched_keywords: Vec<String> = policy
        .keywords
        .iter()
        .filter(|k| text.contains(k.to_lowercase().as_str()))
        .cloned()
        .collect();

    let structured_data = structured::has_job_posting(&page.json_ld_blocks());

    let site_elements: Vec<String> = policy
        .site_selectors
        .iter()
        .filter(|(_, selector)| page.contains(selector))
        .map(|(source, _)| source.to_string())
        .collect();

    let path = page.url().path();
    let url_pattern = policy.url_patterns.iter().any(|p| p.matches(&host, path));

    let is_job_page = host_allowed
        && (matched_keywords.len() >= policy.keyword_threshold
            || structured_data
            || !site_elements.is_empty()
            || url_pattern);

    debug!(
        host = %host,
        host_allowed,
        keywords = matched_keywords.len(),
        structured_data,
        site_elements = site_elements.len(),
        url_pattern,
        "Page signals"
    );
    if is_job_page {
        info!("Job description detected on {}", page.href());
    } else {
        debug!("No job description detected on {}", page.href());
    }

    PageSignal {
        is_job_page,
        host_allowed,
        matched_keywords,
        structured_data,
        site_elements,
        url_pattern,
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::Policy;

    fn fixture(name: &str) -> String {
        std::fs::read_to_string(format!("tests/fixtures/{}.html", name)).unwrap()
    }

    fn scan_html(html: &str, url: &str) -> PageSignal {
        let page = Page::parse(html, url).unwrap();
        scan(&page, &Policy::default().detection)
    }

    #[test]
    fn linkedin_top_card() {
        let html = r#"<html><body>
            <h1 class="job-details-jobs-unified-top-card__job-title">Senior Engineer</h1>
            </body></html>"#;
        let signal = scan_html(html, "https://www.linkedin.com/jobs/view/123");
        assert!(signal.is_job_page);
        assert!(signal.url_pattern);
        assert_eq!(
            signal.site_elements,
            vec![".job-details-jobs-unified-top-card__job-title".to_string()]
        );
    }

    #[test]
    fn structured_data_alone_is_enough() {
        let signal = scan_html(&fixture("greenhouse_jsonld"), "https://boards.greenhouse.io/acme/jobs/42");
        assert!(signal.structured_data);
        assert!(signal.keyword_count() < 3);
        assert!(signal.site_elements.is_empty());
        assert!(signal.is_job_page);
    }

    #[test]
    fn no_evidence_on_allowed_host() {
        let signal = scan_html(&fixture("blog_post"), "https://www.indeed.com/career-advice/walks");
        assert!(signal.host_allowed);
        assert_eq!(signal.keyword_count(), 0);
        assert!(!signal.structured_data);
        assert!(signal.site_elements.is_empty());
        assert!(!signal.is_job_page);
    }

    #[test]
    fn unlisted_host_never_matches() {
        let html = fixture("keyword_rich");
        let signal = scan_html(&html, "https://example.com/careers/data-analyst");
        assert!(signal.keyword_count() >= 10);
        assert!(!signal.host_allowed);
        assert!(!signal.is_job_page);
    }

    #[test]
    fn keywords_reach_threshold_on_allowed_host() {
        let signal = scan_html(&fixture("keyword_rich"), "https://jobs.lever.co/acme/123");
        assert!(signal.host_allowed);
        assert!(!signal.structured_data);
        assert!(signal.is_job_page);
    }

    #[test]
    fn script_text_is_not_counted() {
        let html = r#"<body><p>Hello</p><script>var s = "responsibilities requirements qualifications";</script></body>"#;
        let signal = scan_html(html, "https://www.indeed.com/x");
        assert_eq!(signal.keyword_count(), 0);
        assert!(!signal.is_job_page);
    }

    #[test]
    fn threshold_comes_from_policy() {
        let html = "<body><p>Responsibilities. Requirements. Qualifications.</p></body>";
        let page = Page::parse(html, "https://www.dice.com/job-detail/1").unwrap();
        let mut policy = Policy::default().detection;
        assert!(scan(&page, &policy).is_job_page);
        policy.keyword_threshold = 4;
        assert!(!scan(&page, &policy).is_job_page);
    }
}
