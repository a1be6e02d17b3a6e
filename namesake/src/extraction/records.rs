//! Result-card parsing.
//!
//! Each card is parsed on its own. A card without a name/profile anchor is
//! skipped quietly; a card that fails for any other reason is logged and
//! skipped. Neither stops the remaining cards from being parsed.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::ExtractionConfig;
use crate::models::ResultRecord;
use crate::utils::{collapse_whitespace, resolve_url};

#[allow(clippy::expect_used)]
static DIGIT_RUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d+(?:[,.\s\u{a0}\u{202f}']\d{3})*").expect("hardcoded regex pattern is valid")
});

#[allow(clippy::expect_used)]
static CONTACT_DOMAIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:at|de|em|bei|su|di|van|op|w|в|на)\s+([a-z0-9][a-z0-9\-]*(?:\.[a-z0-9\-]+)*\.[a-z]{2,})\b",
    )
    .expect("hardcoded regex pattern is valid")
});

const AFFILIATION_SELECTORS: &[&str] = &[".gs_ai_aff", ".gsc_oai_aff"];
const EMAIL_SELECTORS: &[&str] = &[".gs_ai_eml", ".gsc_oai_eml"];
const CITED_BY_SELECTORS: &[&str] = &[".gs_ai_cby", ".gsc_oai_cby"];
const THUMBNAIL_SELECTORS: &[&str] = &[".gs_ai_pho img", "img"];
const INTEREST_SELECTORS: &[&str] = &[".gs_ai_one_int", ".gsc_oai_one_int"];

/// Why a single card produced no record.
#[derive(Debug, Error)]
enum CardError {
    #[error("card has no name/profile anchor")]
    MissingAnchor,

    #[error("profile link {0:?} does not resolve to a page")]
    InvalidLink(String),
}

/// Parses result cards into [`ResultRecord`] values.
#[derive(Debug, Clone)]
pub struct RecordParser {
    origin: String,
    card_selectors: Vec<String>,
    name_selectors: Vec<String>,
}

impl RecordParser {
    /// Creates a parser from configuration.
    #[must_use]
    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self {
            origin: config.site_origin.clone(),
            card_selectors: config.card_selectors.clone(),
            name_selectors: config.name_selectors.clone(),
        }
    }

    /// Origin used to resolve relative links.
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Extracts every parsable card, in document order.
    #[must_use]
    pub fn parse(&self, html: &str) -> Vec<ResultRecord> {
        let document = Html::parse_document(html);
        let cards = self.find_cards(&document);
        let mut records = Vec::with_capacity(cards.len());

        for (index, card) in cards.iter().enumerate() {
            let parsed = catch_unwind(AssertUnwindSafe(|| self.parse_card(card)));
            match parsed {
                Ok(Ok(record)) => records.push(record),
                Ok(Err(CardError::MissingAnchor)) => {
                    debug!(card = index, "Skipping card without profile anchor");
                }
                Ok(Err(e)) => {
                    warn!(card = index, error = %e, "Skipping unparsable card");
                }
                Err(_) => {
                    warn!(card = index, "Card parser panicked; skipping card");
                }
            }
        }

        debug!(cards = cards.len(), records = records.len(), "Parsed result cards");
        records
    }

    /// Cards matched by the first card selector that matches anything.
    fn find_cards<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        for pattern in &self.card_selectors {
            let Ok(selector) = Selector::parse(pattern) else {
                warn!(selector = %pattern, "Ignoring invalid card selector");
                continue;
            };
            let cards: Vec<_> = document.select(&selector).collect();
            if !cards.is_empty() {
                return cards;
            }
        }
        Vec::new()
    }

    fn parse_card(&self, card: &ElementRef<'_>) -> Result<ResultRecord, CardError> {
        let (name, href) = self.find_name_anchor(card).ok_or(CardError::MissingAnchor)?;
        let profile_url =
            resolve_url(&self.origin, &href).ok_or_else(|| CardError::InvalidLink(href.clone()))?;

        let mut record = ResultRecord::new(name, profile_url)
            .with_affiliation(first_text(card, AFFILIATION_SELECTORS).unwrap_or_default())
            .with_interests(all_texts(card, INTEREST_SELECTORS));

        record.contact_domain =
            first_text(card, EMAIL_SELECTORS).and_then(|text| parse_contact_domain(&text));
        record.citation_count =
            first_text(card, CITED_BY_SELECTORS).and_then(|text| parse_citation_count(&text));
        record.thumbnail_url = first_attr(card, THUMBNAIL_SELECTORS, "src")
            .and_then(|src| resolve_url(&self.origin, &src));

        Ok(record)
    }

    fn find_name_anchor(&self, card: &ElementRef<'_>) -> Option<(String, String)> {
        for pattern in &self.name_selectors {
            let Ok(selector) = Selector::parse(pattern) else {
                continue;
            };
            for anchor in card.select(&selector) {
                let Some(href) = anchor.value().attr("href") else {
                    continue;
                };
                let name = element_text(&anchor);
                if !name.is_empty() {
                    return Some((name, href.to_string()));
                }
            }
        }
        None
    }
}

impl Default for RecordParser {
    fn default() -> Self {
        Self::from_config(&ExtractionConfig::default())
    }
}

/// Parses records with the default configuration.
#[must_use]
pub fn parse_records(html: &str) -> Vec<ResultRecord> {
    RecordParser::default().parse(html)
}

/// Reads the first integer in a phrase such as "Cited by 1,234".
#[must_use]
pub fn parse_citation_count(text: &str) -> Option<u64> {
    let run = DIGIT_RUN.find(text)?;
    let digits: String = run.as_str().chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// Reads the domain from a phrase such as "Verified email at mit.edu".
#[must_use]
pub fn parse_contact_domain(text: &str) -> Option<String> {
    CONTACT_DOMAIN
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_lowercase())
}

fn element_text(element: &ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

fn first_text(card: &ElementRef<'_>, patterns: &[&str]) -> Option<String> {
    patterns
        .iter()
        .filter_map(|p| Selector::parse(p).ok())
        .find_map(|selector| {
            card.select(&selector)
                .map(|el| element_text(&el))
                .find(|text| !text.is_empty())
        })
}

fn all_texts(card: &ElementRef<'_>, patterns: &[&str]) -> Vec<String> {
    patterns
        .iter()
        .filter_map(|p| Selector::parse(p).ok())
        .map(|selector| {
            card.select(&selector)
                .map(|el| element_text(&el))
                .filter(|text| !text.is_empty())
                .collect::<Vec<_>>()
        })
        .find(|texts| !texts.is_empty())
        .unwrap_or_default()
}

fn first_attr(card: &ElementRef<'_>, patterns: &[&str], attr: &str) -> Option<String> {
    patterns
        .iter()
        .filter_map(|p| Selector::parse(p).ok())
        .find_map(|selector| {
            card.select(&selector)
                .find_map(|el| el.value().attr(attr).map(str::trim).filter(|v| !v.is_empty()))
                .map(String::from)
        })
}
