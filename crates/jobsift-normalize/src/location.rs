//! Free-text location cleanup into `City, ST ZIP` parts.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

static REMOTE_PREFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^remote\b").unwrap());
static REMOTE_IN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)remote\s+in\s+(.*)").unwrap());
// Lowercase only, so the state code "IN" is never read as a preposition.
static IN_CLAUSE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\sin\s+(.*)").unwrap());
static PARENTHETICAL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(.*?\)").unwrap());
static MORE_LOCATIONS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\+\d+\s+locations?").unwrap());
static COUNTRY_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*United States\s*$").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static CITY_STATE_ZIP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([^,]+),\s*([A-Z]{2})\b(?:\s+(\d{5}(?:-\d{4})?))?").unwrap()
});

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedLocation {
    /// Canonical `City, ST ZIP` on a match, otherwise the cleaned text.
    pub location: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    /// The text opened with a "Remote" marker.
    pub remote: bool,
}

pub fn parse_location(text: &str) -> ParsedLocation {
    let text = text.trim();
    if text.is_empty() {
        return ParsedLocation::default();
    }

    let remote = REMOTE_PREFIX.is_match(text);
    let residual = if remote {
        REMOTE_IN
            .captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "Remote".to_string())
    } else {
        IN_CLAUSE
            .captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_else(|| text.to_string())
    };

    let cleaned = strip_annotations(&residual);
    if cleaned.is_empty() {
        return ParsedLocation {
            remote,
            ..ParsedLocation::default()
        };
    }

    match CITY_STATE_ZIP.captures(&cleaned) {
        Some(caps) => {
            let city = caps[1].trim().to_string();
            let state = caps[2].to_string();
            let zip_code = caps.get(3).map(|m| m.as_str().to_string());
            let location = match &zip_code {
                Some(zip) => format!("{city}, {state} {zip}"),
                None => format!("{city}, {state}"),
            };
            ParsedLocation {
                location: Some(location),
                city: Some(city),
                state: Some(state),
                zip_code,
                remote,
            }
        }
        None => {
            debug!(location = %cleaned, "no city/state match in location text");
            ParsedLocation {
                location: Some(cleaned),
                remote,
                ..ParsedLocation::default()
            }
        }
    }
}

fn strip_annotations(text: &str) -> String {
    let text = PARENTHETICAL.replace_all(text, "");
    let text = MORE_LOCATIONS.replace_all(&text, "");
    let text = COUNTRY_SUFFIX.replace(&text, "");
    WHITESPACE.replace_all(&text, " ").trim().to_string()
}
