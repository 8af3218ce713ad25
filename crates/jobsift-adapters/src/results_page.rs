//! Job-card extraction from a rendered results page.

use std::collections::HashSet;

use jobsift_core::CardFields;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};
use url::Url;

use crate::search::SEARCH_BASE_URL;
use crate::AdapterError;

/// Card container selectors; whichever matches the most elements wins.
const CARD_SELECTORS: &[&str] = &[
    "div.tapItem",
    "div.job_seen_beacon",
    "div[class*='job_seen_beacon']",
    "ul.jobsearch-ResultsList > li",
    "[data-testid='jobListing']",
    "div[id^='jobCard']",
];
const CARD_FALLBACK_SELECTOR: &str = "div[class*='job']";

const TITLE: (&str, &str) = ("a.jcs-JobTitle", "h2.jobTitle span[title]");
const COMPANY: (&str, &str) = ("[data-testid='company-name']", "span.companyName");
const LINK: (&str, &str) = ("a.jcs-JobTitle", "h2.jobTitle a");
const LOCATION: (&str, &str) = ("[data-testid='text-location']", "div.companyLocation");
const SALARY: (&str, &str) = (
    "div[class*='salary-snippet-container']",
    "div.salary-snippet-container",
);
const DATE_POSTED: (&str, &str) = ("span.date", "span[class*='date']");
const JOB_TYPE: (&str, &str) = (
    "div[data-testid='job-type-info']",
    "div.metadataContainer span.attribute_snippet",
);

struct CardSelectors {
    title: (Selector, Selector),
    company: (Selector, Selector),
    link: (Selector, Selector),
    location: (Selector, Selector),
    salary: (Selector, Selector),
    date_posted: (Selector, Selector),
    job_type: (Selector, Selector),
}

impl CardSelectors {
    fn compile() -> Result<Self, AdapterError> {
        Ok(Self {
            title: pair(TITLE)?,
            company: pair(COMPANY)?,
            link: pair(LINK)?,
            location: pair(LOCATION)?,
            salary: pair(SALARY)?,
            date_posted: pair(DATE_POSTED)?,
            job_type: pair(JOB_TYPE)?,
        })
    }
}

fn selector(css: &str) -> Result<Selector, AdapterError> {
    Selector::parse(css).map_err(|e| AdapterError::Message(format!("invalid selector {css}: {e}")))
}

fn pair((primary, backup): (&str, &str)) -> Result<(Selector, Selector), AdapterError> {
    Ok((selector(primary)?, selector(backup)?))
}

/// Extract the job cards of one results page. Cards without a title, company
/// or link are dropped here and never reach the pipeline.
pub fn parse_results_page(html: &str) -> Result<Vec<CardFields>, AdapterError> {
    let document = Html::parse_document(html);
    let selectors = CardSelectors::compile()?;

    let mut best: Vec<ElementRef<'_>> = Vec::new();
    for css in CARD_SELECTORS {
        let sel = selector(css)?;
        let found = outermost(document.select(&sel).collect());
        if found.len() > best.len() {
            debug!(selector = css, cards = found.len(), "card selector match");
            best = found;
        }
    }
    if best.is_empty() {
        warn!("no job cards under the standard selectors, trying fallback");
        let sel = selector(CARD_FALLBACK_SELECTOR)?;
        best = outermost(document.select(&sel).collect());
    }

    let mut cards = Vec::with_capacity(best.len());
    for card in best {
        let fields = read_card(card, &selectors);
        if fields.has_required() {
            cards.push(fields);
        } else {
            warn!(title = ?fields.title, company = ?fields.company, "dropping card without title, company or link");
        }
    }
    Ok(cards)
}

/// Drops matches nested inside another match, so a wrapper and its inner card
/// count as one card.
fn outermost(found: Vec<ElementRef<'_>>) -> Vec<ElementRef<'_>> {
    let ids = found.iter().map(|el| el.id()).collect::<HashSet<_>>();
    found
        .into_iter()
        .filter(|el| !el.ancestors().any(|node| ids.contains(&node.id())))
        .collect()
}

fn read_card(card: ElementRef<'_>, sel: &CardSelectors) -> CardFields {
    let title = first_match(card, &sel.title).and_then(|el| {
        el.value()
            .attr("title")
            .and_then(|t| text_or_none(t.to_string()))
            .or_else(|| element_text(el))
    });
    let link = first_match(card, &sel.link)
        .and_then(|el| el.value().attr("href"))
        .and_then(|href| text_or_none(href.to_string()))
        .map(|href| absolute_link(&href));

    CardFields {
        title,
        company: first_match(card, &sel.company).and_then(element_text),
        link,
        location: first_match(card, &sel.location).and_then(element_text),
        salary: first_match(card, &sel.salary).and_then(element_text),
        job_type: first_match(card, &sel.job_type).and_then(element_text),
        work_setting: None,
        date_posted: first_match(card, &sel.date_posted).and_then(element_text),
        description: None,
    }
}

fn first_match<'a>(card: ElementRef<'a>, (primary, backup): &(Selector, Selector)) -> Option<ElementRef<'a>> {
    card.select(primary).next().or_else(|| card.select(backup).next())
}

fn element_text(el: ElementRef<'_>) -> Option<String> {
    text_or_none(el.text().collect::<Vec<_>>().join(" "))
}

fn text_or_none(value: String) -> Option<String> {
    let collapsed = value.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

fn absolute_link(href: &str) -> String {
    match Url::parse(SEARCH_BASE_URL).and_then(|base| base.join(href)) {
        Ok(url) => url.into(),
        Err(_) => href.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body><div id="mosaic">
          <div class="job_seen_beacon">
            <h2 class="jobTitle"><a class="jcs-JobTitle" href="/rc/clk?jk=abc123&amp;from=serp">
              <span title="Line Cook">Line Cook</span></a></h2>
            <span data-testid="company-name">Diner</span>
            <div data-testid="text-location">Remote in Austin, TX</div>
            <div class="metadata salary-snippet-container"><div>$15 an hour</div></div>
            <div data-testid="job-type-info">Full-time · Day shift</div>
            <span class="date">Posted 3 days ago</span>
          </div>
          <div class="job_seen_beacon">
            <h2 class="jobTitle"><a href="https://www.indeed.com/pagead/clk?mo=r&amp;ad=xyz">
              <span title="Prep Cook">Prep Cook</span></a></h2>
            <span class="companyName">Bistro</span>
            <div class="companyLocation">Dallas, TX 75201</div>
          </div>
          <div class="job_seen_beacon">
            <h2 class="jobTitle"><a class="jcs-JobTitle" href="/rc/clk?jk=def456">Dishwasher</a></h2>
          </div>
        </div></body></html>"#;

    #[test]
    fn extracts_fields_with_primary_and_backup_selectors() {
        let cards = parse_results_page(PAGE).unwrap();
        assert_eq!(cards.len(), 2);

        let first = &cards[0];
        assert_eq!(first.title.as_deref(), Some("Line Cook"));
        assert_eq!(first.company.as_deref(), Some("Diner"));
        assert_eq!(
            first.link.as_deref(),
            Some("https://www.indeed.com/rc/clk?jk=abc123&from=serp")
        );
        assert_eq!(first.location.as_deref(), Some("Remote in Austin, TX"));
        assert_eq!(first.salary.as_deref(), Some("$15 an hour"));
        assert_eq!(first.job_type.as_deref(), Some("Full-time · Day shift"));
        assert_eq!(first.date_posted.as_deref(), Some("Posted 3 days ago"));

        let second = &cards[1];
        assert_eq!(second.title.as_deref(), Some("Prep Cook"));
        assert_eq!(second.company.as_deref(), Some("Bistro"));
        assert_eq!(
            second.link.as_deref(),
            Some("https://www.indeed.com/pagead/clk?mo=r&ad=xyz")
        );
        assert_eq!(second.location.as_deref(), Some("Dallas, TX 75201"));
        assert_eq!(second.salary, None);
    }

    #[test]
    fn page_without_cards_is_empty() {
        let cards = parse_results_page("<html><body><p>No results</p></body></html>").unwrap();
        assert!(cards.is_empty());
    }

    #[test]
    fn fallback_keeps_only_the_outermost_card() {
        let html = r#"
            <html><body>
              <div class="job-wrapper">
                <div class="job-card">
                  <a class="jcs-JobTitle" href="/rc/clk?jk=nest01">Line Cook</a>
                  <span data-testid="company-name">Diner</span>
                </div>
              </div>
              <div class="job-wrapper">
                <div class="job-card">
                  <a class="jcs-JobTitle" href="/rc/clk?jk=nest02">Baker</a>
                  <span data-testid="company-name">Bakery</span>
                </div>
              </div>
            </body></html>"#;
        let cards = parse_results_page(html).unwrap();
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].link.as_deref(), Some("https://www.indeed.com/rc/clk?jk=nest01"));
        assert_eq!(cards[1].title.as_deref(), Some("Baker"));
    }
}
