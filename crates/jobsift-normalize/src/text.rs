//! Job-type labels and description HTML.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html};

const JOB_TYPE_VARIANTS: &[(&str, &str)] = &[
    ("fulltime", "Full-time"),
    ("full time", "Full-time"),
    ("full-time", "Full-time"),
    ("parttime", "Part-time"),
    ("part time", "Part-time"),
    ("part-time", "Part-time"),
    ("temp to hire", "Temp-to-hire"),
    ("temp-to-hire", "Temp-to-hire"),
    ("temptohire", "Temp-to-hire"),
    ("contractor", "Contract"),
    ("contract", "Contract"),
    ("temporary", "Temporary"),
    ("temp", "Temporary"),
    ("permanent", "Permanent"),
    ("perm", "Permanent"),
    ("internship", "Internship"),
];

const MAX_UNMAPPED_JOB_TYPE: usize = 30;

const BLOCK_TAGS: &[&str] = &[
    "p", "div", "section", "article", "header", "footer", "ul", "ol", "table", "tr", "h1", "h2",
    "h3", "h4", "h5", "h6", "blockquote", "pre",
];

static INLINE_WS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static LINE_SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t\u{a0}]+").unwrap());
static BLANK_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Map a card's job-type snippet ("Full-time · Day shift") to a canonical label.
/// Unknown labels are kept, cut to 30 characters.
pub fn normalize_job_type(text: &str) -> Option<String> {
    let head = text.split('·').next().unwrap_or_default().trim();
    if head.is_empty() {
        return None;
    }
    let lower = head.to_lowercase();
    if let Some((_, label)) = JOB_TYPE_VARIANTS.iter().find(|(key, _)| lower.contains(key)) {
        return Some((*label).to_string());
    }
    if head.chars().count() > MAX_UNMAPPED_JOB_TYPE {
        let cut: String = head.chars().take(MAX_UNMAPPED_JOB_TYPE).collect();
        return Some(format!("{cut}..."));
    }
    Some(head.to_string())
}

/// Render a description fragment as readable plain text: block elements and
/// `<br>` break lines, list items become bullets, markup is dropped.
pub fn html_to_text(html: &str) -> Option<String> {
    if html.trim().is_empty() {
        return None;
    }
    let fragment = Html::parse_fragment(html);
    let mut out = String::new();
    render(fragment.root_element(), &mut out);

    let lines = out
        .lines()
        .map(|line| LINE_SPACES.replace_all(line, " ").trim().to_string())
        .collect::<Vec<_>>()
        .join("\n");
    let text = BLANK_RUNS.replace_all(&lines, "\n\n").trim().to_string();
    (!text.is_empty()).then_some(text)
}

fn render(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(child_el) = ElementRef::wrap(child) {
            let name = child_el.value().name();
            match name {
                "script" | "style" | "noscript" => {}
                "br" => out.push('\n'),
                "li" => {
                    out.push_str("\n• ");
                    render(child_el, out);
                    out.push('\n');
                }
                _ if BLOCK_TAGS.contains(&name) => {
                    out.push('\n');
                    render(child_el, out);
                    out.push('\n');
                }
                _ => render(child_el, out),
            }
        } else if let Some(text) = child.value().as_text() {
            out.push_str(&INLINE_WS.replace_all(text, " "));
        }
    }
}
