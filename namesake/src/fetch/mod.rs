//! Fetching raw search result pages.

mod classify;
#[cfg(feature = "http")]
mod http;
mod protocols;

pub use classify::{build_search_url, classify_response, detect_captcha, CAPTCHA_MARKERS};
#[cfg(feature = "http")]
pub use http::HttpSearchFetcher;
pub use protocols::{FetchedPage, SearchFetcher};
