use std::sync::LazyLock;

use scraper::{ElementRef, Selector};

use crate::page::{collapse_whitespace, is_heading_tag, text_content, Page};

static HEADINGS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1, h2, h3, h4, h5, h6, strong, b").unwrap());
static LISTS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("ul, ol").unwrap());
static ITEMS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("li").unwrap());

/// Items of the first list introduced by a heading that mentions one of
/// `keywords`. Headings are tried in document order against their own
/// siblings first; a bold label standing alone in a paragraph only counts
/// when no heading has a list of its own. Empty when nothing matches.
pub fn items_under_heading<S: AsRef<str>>(page: &Page, keywords: &[S]) -> Vec<String> {
    let headings: Vec<ElementRef<'_>> = page
        .select(&HEADINGS)
        .filter(|heading| {
            let text = text_content(*heading).to_lowercase();
            keywords
                .iter()
                .any(|k| text.contains(k.as_ref().to_lowercase().as_str()))
        })
        .collect();

    headings
        .iter()
        .find_map(|heading| following_list(*heading))
        .or_else(|| headings.iter().find_map(|heading| list_after_label(*heading)))
        .map(list_items)
        .unwrap_or_default()
}

/// `<p><strong>Requirements:</strong></p><ul>…` puts the list beside the
/// paragraph rather than beside the inline heading.
fn list_after_label(heading: ElementRef<'_>) -> Option<ElementRef<'_>> {
    let name = heading.value().name();
    if name != "strong" && name != "b" {
        return None;
    }
    let parent = heading.parent().and_then(ElementRef::wrap)?;
    let own = collapse_whitespace(&text_content(heading));
    if collapse_whitespace(&text_content(parent)) == own {
        following_list(parent)
    } else {
        None
    }
}

/// First following sibling that is or holds a list, stopping at the next heading.
fn following_list(start: ElementRef<'_>) -> Option<ElementRef<'_>> {
    for sibling in start.next_siblings().filter_map(ElementRef::wrap) {
        let name = sibling.value().name();
        if is_heading_tag(name) {
            break;
        }
        if name == "ul" || name == "ol" || sibling.select(&LISTS).next().is_some() {
            return Some(sibling);
        }
    }
    None
}

fn list_items(container: ElementRef<'_>) -> Vec<String> {
    container
        .select(&ITEMS)
        .map(|li| collapse_whitespace(&text_content(li)))
        .filter(|t| !t.is_empty())
        .collect()
}

// ── Tests ──
