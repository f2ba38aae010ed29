use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::{Error, Result};

static BODY: LazyLock<Selector> = LazyLock::new(|| Selector::parse("body").unwrap());
static MAIN: LazyLock<Selector> = LazyLock::new(|| Selector::parse("main").unwrap());
static TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("title").unwrap());
static JSON_LD: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"script[type="application/ld+json"]"#).unwrap());

const HIDDEN_TAGS: &[&str] = &["script", "style", "noscript", "template", "head"];
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "footer",
    "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav", "ol", "p",
    "pre", "section", "table", "td", "th", "tr", "ul",
];

/// Raw page state as handed over by whatever hosts the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub url: String,
    pub html: String,
}

impl Snapshot {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
        }
    }
}

/// A parsed, read-only view of one document at one URL.
pub struct Page {
    document: Html,
    url: Url,
}

impl Page {
    pub fn parse(html: &str, url: &str) -> Result<Self> {
        let url = Url::parse(url).map_err(|source| Error::InvalidUrl {
            url: url.to_string(),
            source,
        })?;
        Ok(Self {
            document: Html::parse_document(html),
            url,
        })
    }

    pub fn from_snapshot(snapshot: &Snapshot) -> Result<Self> {
        Self::parse(&snapshot.html, &snapshot.url)
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn href(&self) -> &str {
        self.url.as_str()
    }

    /// Lower-cased host, empty for URLs without one (`file:`, `about:`).
    pub fn host(&self) -> String {
        self.url
            .host_str()
            .map(|h| h.to_lowercase())
            .unwrap_or_default()
    }

    pub fn document_title(&self) -> String {
        self.first(&TITLE)
            .map(|t| collapse_whitespace(&text_content(t)))
            .unwrap_or_default()
    }

    pub fn first(&self, selector: &Selector) -> Option<ElementRef<'_>> {
        self.document.select(selector).next()
    }

    pub fn contains(&self, selector: &Selector) -> bool {
        self.first(selector).is_some()
    }

    pub fn select<'a>(&'a self, selector: &'a Selector) -> impl Iterator<Item = ElementRef<'a>> {
        self.document.select(selector)
    }

    /// Rendered-ish body text: script and style content dropped, block
    /// elements separated by newlines.
    pub fn visible_text(&self) -> String {
        let mut out = String::new();
        collect_visible(self.body(), &mut out);
        out
    }

    /// Full text of `<main>`, or of the body when there is no `<main>`.
    pub fn main_text(&self) -> String {
        let root = self.first(&MAIN).unwrap_or_else(|| self.body());
        text_content(root)
    }

    pub fn json_ld_blocks(&self) -> Vec<String> {
        self.select(&JSON_LD).map(text_content).collect()
    }

    fn body(&self) -> ElementRef<'_> {
        self.first(&BODY)
            .unwrap_or_else(|| self.document.root_element())
    }
}

/// Concatenated text of every descendant, like the DOM's `textContent`.
pub fn text_content(element: ElementRef<'_>) -> String {
    element.text().collect()
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn is_heading_tag(name: &str) -> bool {
    matches!(name, "h1" | "h2" | "h3" | "h4" | "h5" | "h6")
}

fn collect_visible(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            let name = child_element.value().name();
            if HIDDEN_TAGS.contains(&name) {
                continue;
            }
            collect_visible(child_element, out);
            if BLOCK_TAGS.contains(&name) {
                out.push('\n');
            }
        } else if let Some(text) = child.value().as_text() {
            out.push_str(text);
        }
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    const HTML: &str = r#"<html><head><title>Backend Engineer | Acme</title>
        <script type="application/ld+json">{"@type":"JobPosting"}</script></head>
        <body><nav>Menu</nav><main><p>Hello <b>world</b></p><script>var salary = 1;</script></main>
        <style>.x{}</style></body></html>"#;

    #[test]
    fn visible_text_skips_scripts_and_styles() {
        let page = Page::parse(HTML, "https://example.com/a").unwrap();
        let text = page.visible_text();
        assert!(text.contains("Hello world"));
        assert!(text.contains("Menu"));
        assert!(!text.contains("salary"));
        assert!(!text.contains(".x{}"));
        assert!(!text.contains("Backend Engineer"));
    }

    #[test]
    fn main_text_prefers_main() {
        let page = Page::parse(HTML, "https://example.com/a").unwrap();
        let main = page.main_text();
        assert!(main.starts_with("Hello world"));
        assert!(!main.contains("Menu"));
    }

    #[test]
    fn title_host_and_json_ld() {
        let page = Page::parse(HTML, "https://WWW.Example.com/a?b=1").unwrap();
        assert_eq!(page.document_title(), "Backend Engineer | Acme");
        assert_eq!(page.host(), "www.example.com");
        assert_eq!(page.json_ld_blocks(), vec![r#"{"@type":"JobPosting"}"#.to_string()]);
    }

    #[test]
    fn bad_url_is_an_error() {
        assert!(matches!(
            Page::parse("<p></p>", "not a url"),
            Err(Error::InvalidUrl { .. })
        ));
        let page = Page::parse("<p></p>", "file:///tmp/page.html").unwrap();
        assert_eq!(page.host(), "");
    }
}
