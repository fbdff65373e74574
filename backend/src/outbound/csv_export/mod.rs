//! CSV export adapter.
//!
//! Reads CMS exports from disk with the `csv` crate and hands the rows to the
//! shared normaliser.

mod reader;

pub use reader::CsvExportReader;
