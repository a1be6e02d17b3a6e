//! HTML extraction: result records and pagination tokens.

mod records;
mod token;

pub use records::{parse_citation_count, parse_contact_domain, parse_records, RecordParser};
pub use token::{
    decode_handler_escapes, extract_token, normalize_entities, AfterAuthorParamStrategy,
    CstartParamStrategy, NextButtonStrategy, NextLabelStrategy, StartParamStrategy,
    TokenExtractor, TokenStrategy,
};
