//! CMS REST adapter.
//!
//! Pages through the CMS collection endpoints and normalises the JSON items
//! with the same rules as CSV exports.

mod dto;
mod http_source;

pub use http_source::CmsHttpSource;
