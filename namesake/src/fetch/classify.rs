//! Request URL construction and response classification.

use crate::config::FetchConfig;
use crate::errors::FetchFailure;
use crate::models::PaginationToken;

/// Signatures of an interstitial challenge page.
///
/// Only page furniture is matched, so a result card that merely mentions
/// CAPTCHA (an interest label, say) is not mistaken for a challenge.
pub const CAPTCHA_MARKERS: &[&str] = &[
    "unusual traffic",
    "gs_captcha",
    "id=\"captcha-form\"",
    "google.com/recaptcha/api",
    "recaptcha/api.js",
];

/// Class names that only appear on a page carrying result cards.
const RESULT_CARD_MARKERS: &[&str] = &["gsc_1usr", "gs_ai_chpr"];

/// Whether `body` is a challenge page rather than results.
///
/// A body with result cards is never a challenge page.
#[must_use]
pub fn detect_captcha(body: &str) -> bool {
    let lower = body.to_lowercase();
    if RESULT_CARD_MARKERS.iter().any(|marker| lower.contains(marker)) {
        return false;
    }
    CAPTCHA_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Maps a response to a failure, or `Ok` when the body holds results.
///
/// 429 is always `rate_limited`. A challenge body is `captcha` whatever the
/// status. Any other non-2xx status is `network_error`.
pub fn classify_response(status: u16, body: &str) -> Result<(), FetchFailure> {
    if status == 429 {
        return Err(FetchFailure::rate_limited("HTTP 429 Too Many Requests"));
    }
    if detect_captcha(body) {
        return Err(FetchFailure::captcha(format!(
            "HTTP {status}: challenge page returned instead of results"
        )));
    }
    if !(200..300).contains(&status) {
        return Err(FetchFailure::network(format!("HTTP {status}")));
    }
    Ok(())
}

/// Builds the author-search URL for `subject`, continuing at `token`.
#[must_use]
pub fn build_search_url(
    config: &FetchConfig,
    subject: &str,
    token: Option<&PaginationToken>,
) -> String {
    let subject = subject.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut url = format!(
        "{}/citations?view_op=search_authors&mauthors={}&hl={}",
        config.base_url.trim_end_matches('/'),
        urlencoding::encode(&subject),
        urlencoding::encode(&config.language),
    );
    if let Some(token) = token {
        url.push('&');
        url.push_str(&token.to_query_pair());
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::testing::{author_card, captcha_page, results_page};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_first_page_url() {
        let config = FetchConfig::default();
        assert_eq!(
            build_search_url(&config, "  Ada   Lovelace ", None),
            "https://scholar.google.com/citations?view_op=search_authors&mauthors=Ada%20Lovelace&hl=en"
        );
    }

    #[test]
    fn test_url_carries_token_by_kind() {
        let config = FetchConfig::default()
            .with_base_url("https://scholar.example.org/")
            .with_language("de");

        let url = build_search_url(
            &config,
            "Ada",
            Some(&PaginationToken::AfterAuthor("x=y&z".into())),
        );
        assert_eq!(
            url,
            "https://scholar.example.org/citations?view_op=search_authors&mauthors=Ada&hl=de&after_author=x%3Dy%26z"
        );

        let url = build_search_url(&config, "Ada", Some(&PaginationToken::Cstart(40)));
        assert!(url.ends_with("&cstart=40"));
        let url = build_search_url(&config, "Ada", Some(&PaginationToken::Start(10)));
        assert!(url.ends_with("&start=10"));
    }

    #[test]
    fn test_classify_rate_limited() {
        let err = classify_response(429, "unusual traffic").unwrap_err();
        assert_eq!(err.kind, ErrorKind::RateLimited);
    }

    #[test]
    fn test_classify_captcha() {
        let body = "<html>Our systems have detected Unusual Traffic from your network</html>";
        assert_eq!(classify_response(200, body).unwrap_err().kind, ErrorKind::Captcha);
        assert_eq!(
            classify_response(503, "<div id=\"gs_captcha_ccl\"></div>").unwrap_err().kind,
            ErrorKind::Captcha
        );
    }

    #[test]
    fn test_classify_challenge_signatures() {
        let form = r#"<form id="captcha-form" action="index"></form>"#;
        assert!(detect_captcha(form));
        let script = r#"<script src="https://www.google.com/recaptcha/api.js" async></script>"#;
        assert!(detect_captcha(script));
        assert!(detect_captcha(&captcha_page()));
    }

    #[test]
    fn test_results_mentioning_captcha_are_not_a_challenge() {
        let card = author_card("Luis von Ahn", "vonahn1").replace(
            "</h3>",
            r#"</h3><div class="gs_ai_int"><a class="gs_ai_one_int" href="/citations?view_op=search_authors&amp;mauthors=label:captcha">CAPTCHA</a><a class="gs_ai_one_int">reCAPTCHA</a></div>"#,
        );
        let body = results_page(&[card], None);

        assert!(!detect_captcha(&body));
        assert!(classify_response(200, &body).is_ok());
        assert!(!detect_captcha("<p>We study CAPTCHA usability.</p>"));
    }

    #[test]
    fn test_classify_other_status() {
        let err = classify_response(500, "oops").unwrap_err();
        assert_eq!(err.kind, ErrorKind::NetworkError);
        assert_eq!(err.message, "HTTP 500");
    }

    #[test]
    fn test_classify_success() {
        assert!(classify_response(200, "<div class=\"gsc_1usr\"></div>").is_ok());
        assert!(!detect_captcha(""));
    }
}
