//! Text normalization for SANRAL tender listings.
//!
//! This crate provides:
//! - [`text`]: entity decoding, whitespace collapsing, title-casing
//! - [`DateParser`]: ordered multi-format date parsing
//! - [`extract_email`]: contact address selection
//! - [`SummaryRowParser`]: positional listing row → provisional fields

pub mod dates;
pub mod email;
pub mod summary;
pub mod text;

pub use dates::{DateFormat, DateParser, DateShape, parse_create_date};
pub use email::extract_email;
pub use summary::{
    ProvisionalFields, ROW_FIELD_COUNT, RawRow, RowRejection, SummaryRowParser,
};
