//! Human readable dumps of tokens, declarations, projections and reports.

pub mod tree;
