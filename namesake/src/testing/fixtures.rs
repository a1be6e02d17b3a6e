//! HTML fixtures shaped like author-search result pages.

use crate::models::PaginationToken;

/// A result card with only a name and profile link.
#[must_use]
pub fn author_card(name: &str, user_id: &str) -> String {
    format!(
        r#"<div class="gsc_1usr"><div class="gs_ai gs_scl gs_ai_chpr">
<div class="gs_ai_t"><h3 class="gs_ai_name"><a href="/citations?hl=en&amp;user={user_id}">{name}</a></h3></div>
</div></div>"#
    )
}

/// A result card with every optional field filled in.
#[must_use]
pub fn detailed_card(
    name: &str,
    user_id: &str,
    affiliation: &str,
    email_domain: &str,
    cited_by: u64,
) -> String {
    format!(
        r#"<div class="gsc_1usr"><div class="gs_ai gs_scl gs_ai_chpr">
<a href="/citations?hl=en&amp;user={user_id}" class="gs_ai_pho"><span class="gs_rimg"><img alt="{name}" src="/citations/images/avatar_scholar_56.png"></span></a>
<div class="gs_ai_t">
<h3 class="gs_ai_name"><a href="/citations?hl=en&amp;user={user_id}">{name}</a></h3>
<div class="gs_ai_aff">{affiliation}</div>
<div class="gs_ai_eml">Verified email at {email_domain}</div>
<div class="gs_ai_cby">Cited by {cited_by}</div>
<div class="gs_ai_int"><a class="gs_ai_one_int" href="/citations?view_op=search_authors&amp;mauthors=label:ml">Machine Learning</a></div>
</div></div></div>"#
    )
}

/// Renders the pagination control for `next`, disabled when absent.
#[must_use]
pub fn next_control(next: Option<&PaginationToken>) -> String {
    match next {
        Some(PaginationToken::AfterAuthor(cursor)) => format!(
            r#"<button type="button" class="gs_btnPR gs_in_ib gs_btn_half" aria-label="Next" onclick="window.location='/citations?view_op\x3dsearch_authors\x26hl\x3den\x26mauthors\x3dsubject\x26after_author\x3d{cursor}\x26astart\x3d10'"><span class="gs_wr"><span class="gs_ico gs_ico_nav_next"></span></span></button>"#
        ),
        Some(PaginationToken::Cstart(n)) => format!(
            r#"<a class="gsc_pgn_pnx" href="/citations?hl=en&amp;user=subject&amp;cstart={n}&amp;pagesize=10">Next</a>"#
        ),
        Some(PaginationToken::Start(n)) => format!(
            r#"<a class="gs_nph" href="/citations?view_op=search_authors&amp;mauthors=subject&amp;start={n}">Next</a>"#
        ),
        None => r#"<button type="button" class="gs_btnPR gs_in_ib gs_btn_half gs_dis" disabled aria-label="Next"><span class="gs_wr"></span></button>"#.to_string(),
    }
}

/// A full results page holding `cards` and a pagination control.
#[must_use]
pub fn results_page(cards: &[String], next: Option<&PaginationToken>) -> String {
    format!(
        r#"<!doctype html><html><head><title>Author search</title></head><body>
<div id="gsc_sa_ccl">{}</div>
<div id="gsc_authors_bottom_pag"><div class="gsc_pgn">{}</div></div>
</body></html>"#,
        cards.join("\n"),
        next_control(next),
    )
}

/// A results page with `count` numbered cards, ids `{prefix}{i}`.
#[must_use]
pub fn numbered_page(prefix: &str, range: std::ops::Range<usize>, next: Option<&PaginationToken>) -> String {
    let cards: Vec<_> = range
        .map(|i| author_card(&format!("Author {prefix}{i}"), &format!("{prefix}{i}")))
        .collect();
    results_page(&cards, next)
}

/// A page with no result cards.
#[must_use]
pub fn empty_results_page() -> String {
    results_page(&[], None)
}

/// An interstitial challenge page.
#[must_use]
pub fn captcha_page() -> String {
    r#"<html><head><title>Sorry...</title></head><body>
<div id="gs_captcha_ccl"><h1>Please show you're not a robot</h1>
<p>Our systems have detected unusual traffic from your computer network.</p></div>
</body></html>"#
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::{extract_token, parse_records};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_fixture_pages_parse_back() {
        let next = PaginationToken::AfterAuthor("Zx9_AAAAJ".into());
        let html = results_page(
            &[
                author_card("Ada Lovelace", "ada1"),
                detailed_card("Ada King", "ada2", "Cambridge", "cam.ac.uk", 1_024),
            ],
            Some(&next),
        );

        let records = parse_records(&html);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].citation_count, Some(1_024));
        assert_eq!(records[1].contact_domain.as_deref(), Some("cam.ac.uk"));
        assert_eq!(extract_token(&html), Some(next));
    }

    #[test]
    fn test_each_token_kind_renders_extractable() {
        for token in [PaginationToken::Cstart(20), PaginationToken::Start(10)] {
            let html = results_page(&[author_card("A", "a")], Some(&token));
            assert_eq!(extract_token(&html), Some(token));
        }
        assert_eq!(extract_token(&empty_results_page()), None);
    }

    #[test]
    fn test_numbered_page() {
        let html = numbered_page("p", 0..3, None);
        let ids: Vec<_> = parse_records(&html)
            .into_iter()
            .filter_map(|r| r.subject_id)
            .collect();
        assert_eq!(ids, vec!["p0", "p1", "p2"]);
    }
}
