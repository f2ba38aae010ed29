//! Detection thresholds, vocabularies and selector lists.
//!
//! Everything the scanner and extractor treat as tunable lives here so it can
//! be adjusted from a policy file or the environment without touching code.

use std::fmt;
use std::path::Path;

use regex::Regex;
use scraper::Selector;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const ENV_PREFIX: &str = "JOBSCAN";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Policy {
    pub detection: DetectionPolicy,
    pub extraction: ExtractionPolicy,
    pub trigger: TriggerPolicy,
}

impl Policy {
    /// Layer an optional policy file and `JOBSCAN_*` environment variables
    /// over the built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}

// ── Detection ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionPolicy {
    /// Host fragments of job boards; a page outside them is never a job page.
    pub job_sites: Vec<String>,
    pub keywords: Vec<String>,
    pub keyword_threshold: usize,
    /// Containers that only appear on job-detail views.
    pub site_selectors: SelectorChain,
    pub url_patterns: Vec<UrlPattern>,
}

impl Default for DetectionPolicy {
    fn default() -> Self {
        Self {
            job_sites: strings(&[
                "linkedin.com",
                "indeed.com",
                "glassdoor.com",
                "monster.com",
                "ziprecruiter.com",
                "angellist.com",
                "dice.com",
                "careerbuilder.com",
                "workday.com",
                "greenhouse.io",
                "lever.co",
                "smartrecruiters.com",
            ]),
            keywords: strings(&[
                "job description",
                "responsibilities",
                "requirements",
                "qualifications",
                "experience",
                "skills",
                "education",
                "salary",
                "benefits",
                "apply",
                "position",
                "role",
                "opportunity",
                "candidate",
                "team",
                "company",
                "duties",
                "expectations",
                "preferred",
                "must have",
                "nice to have",
                "about the job",
                "about this role",
                "what you'll do",
                "we are looking for",
            ]),
            keyword_threshold: 3,
            site_selectors: SelectorChain::builtin(&[
                ".jobs-search__job-details",
                ".job-details-jobs-unified-top-card",
                ".jobs-unified-top-card",
                ".job-details-module",
                ".jobs-box__html-content",
                ".jobs-description-content",
                "[data-job-id]",
                ".jobs-details",
                ".jobs-box__group",
                ".job-details-jobs-unified-top-card__job-title",
                ".job-details-jobs-unified-top-card__company-name",
            ]),
            url_patterns: vec![UrlPattern {
                host: "linkedin.com".to_string(),
                path: PathPattern::builtin(r"/jobs/(view|search)/"),
            }],
        }
    }
}

/// A job-detail route on a specific board, e.g. LinkedIn's `/jobs/view/<id>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlPattern {
    pub host: String,
    pub path: PathPattern,
}

impl UrlPattern {
    pub fn matches(&self, host: &str, path: &str) -> bool {
        host.contains(&self.host) && self.path.0.is_match(path)
    }
}

// ── Extraction ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionPolicy {
    pub title: FieldRule,
    pub company: FieldRule,
    pub description: FieldRule,
    /// Containers with this much text or less are treated as boilerplate.
    pub description_min_chars: usize,
    pub fallback_body_chars: usize,
    pub title_delimiters: Vec<char>,
    pub title_placeholder: String,
    pub company_placeholder: String,
    pub requirement_headings: Vec<String>,
    pub responsibility_headings: Vec<String>,
}

impl Default for ExtractionPolicy {
    fn default() -> Self {
        Self {
            title: FieldRule {
                site: SelectorChain::builtin(&[
                    ".job-details-jobs-unified-top-card__job-title",
                    ".jobs-unified-top-card__job-title",
                    ".jobs-search__job-details--wrapper h1",
                    ".job-details-jobs-unified-top-card__job-title h1",
                ]),
                generic: SelectorChain::builtin(&[
                    "h1",
                    "[class*=\"job-title\"]",
                    "[class*=\"jobTitle\"]",
                    "[data-test*=\"job-title\"]",
                    "[role=\"heading\"]",
                ]),
            },
            company: FieldRule {
                site: SelectorChain::builtin(&[
                    ".job-details-jobs-unified-top-card__company-name",
                    ".jobs-unified-top-card__company-name",
                    ".job-details-jobs-unified-top-card__company-name a",
                    ".jobs-unified-top-card__subtitle-primary-grouping .jobs-unified-top-card__company-name",
                    "a[data-control-name=\"company_link\"]",
                ]),
                generic: SelectorChain::builtin(&[
                    "[class*=\"company\"]",
                    "[data-test*=\"company\"]",
                    "[class*=\"employer\"]",
                ]),
            },
            description: FieldRule {
                site: SelectorChain::builtin(&[
                    ".jobs-box__html-content",
                    ".jobs-description-content__text",
                    ".jobs-box__group .jobs-box__html-content",
                    ".job-details-module",
                    ".jobs-description .jobs-box__html-content",
                ]),
                generic: SelectorChain::builtin(&[
                    "[class*=\"description\"]",
                    "[class*=\"job-description\"]",
                    "[data-test*=\"description\"]",
                    "section[class*=\"description\"]",
                    "div[class*=\"content\"]",
                ]),
            },
            description_min_chars: 100,
            fallback_body_chars: 5000,
            title_delimiters: vec!['|', ',', '-'],
            title_placeholder: "Job Position".to_string(),
            company_placeholder: "Company".to_string(),
            requirement_headings: strings(&["requirements", "qualifications", "skills"]),
            responsibility_headings: strings(&["responsibilities", "duties", "role"]),
        }
    }
}

/// Board-specific selectors are always consulted before generic ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldRule {
    pub site: SelectorChain,
    pub generic: SelectorChain,
}

impl FieldRule {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Selector)> {
        self.site.iter().chain(self.generic.iter())
    }
}

// ── Trigger ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerPolicy {
    /// Re-scans after the initial one, to catch asynchronously loaded content.
    pub load_delays_ms: Vec<u64>,
    pub spa_hosts: Vec<String>,
    pub spa_delays_ms: Vec<u64>,
    pub url_change_delay_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for TriggerPolicy {
    fn default() -> Self {
        Self {
            load_delays_ms: vec![500],
            spa_hosts: strings(&["linkedin.com"]),
            spa_delays_ms: vec![2000, 5000],
            url_change_delay_ms: 2000,
            poll_interval_ms: 250,
        }
    }
}

impl TriggerPolicy {
    pub fn is_spa_host(&self, host: &str) -> bool {
        self.spa_hosts.iter().any(|h| host.contains(h.as_str()))
    }
}

// ── Compiled values ──

/// Ordered CSS selectors, compiled once when the policy is loaded.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct SelectorChain {
    entries: Vec<(String, Selector)>,
}

impl SelectorChain {
    pub fn parse<S: AsRef<str>>(sources: &[S]) -> Result<Self> {
        let entries = sources
            .iter()
            .map(|s| {
                let source = s.as_ref();
                Selector::parse(source)
                    .map(|selector| (source.to_string(), selector))
                    .map_err(|e| Error::InvalidSelector {
                        selector: source.to_string(),
                        reason: format!("{:?}", e),
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { entries })
    }

    fn builtin(sources: &[&str]) -> Self {
        Self::parse(sources).unwrap()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Selector)> {
        self.entries.iter().map(|(s, sel)| (s.as_str(), sel))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl TryFrom<Vec<String>> for SelectorChain {
    type Error = Error;

    fn try_from(sources: Vec<String>) -> Result<Self> {
        Self::parse(&sources)
    }
}

impl From<SelectorChain> for Vec<String> {
    fn from(chain: SelectorChain) -> Self {
        chain.entries.into_iter().map(|(s, _)| s).collect()
    }
}

impl PartialEq for SelectorChain {
    fn eq(&self, other: &Self) -> bool {
        self.iter().map(|(s, _)| s).eq(other.iter().map(|(s, _)| s))
    }
}

impl fmt::Debug for SelectorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter().map(|(s, _)| s)).finish()
    }
}

/// Regex matched against the URL path.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PathPattern(Regex);

impl PathPattern {
    pub fn parse(pattern: &str) -> Result<Self> {
        Regex::new(pattern)
            .map(Self)
            .map_err(|source| Error::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })
    }

    fn builtin(pattern: &str) -> Self {
        Self::parse(pattern).unwrap()
    }
}

impl TryFrom<String> for PathPattern {
    type Error = Error;

    fn try_from(pattern: String) -> Result<Self> {
        Self::parse(&pattern)
    }
}

impl From<PathPattern> for String {
    fn from(pattern: PathPattern) -> Self {
        pattern.0.as_str().to_string()
    }
}

impl PartialEq for PathPattern {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_str() == other.0.as_str()
    }
}

impl fmt::Debug for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0.as_str())
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// ── Tests ──
