//! Alert filter query language
//!
//! A filter is a single expression of the form `<key><operator><value>` or free
//! text. Keys starting with `@` address alert metadata (`@state`, `@age`,
//! `@silence_author`, `@limit`, ...), any other key addresses a label or, when
//! the label is missing, an annotation of the same name.
//!
//! ```text
//! cluster=dev          label equality, case-insensitive
//! instance=~^web       regex search
//! @state!=suppressed   alert state
//! @age>1h              started more than an hour ago
//! @limit=50            stop after 50 matching alerts
//! disk full            free text over labels, annotations and silence comments
//! ```

pub mod filter;
pub mod matcher;
pub mod parser;

pub use filter::{apply_filters, compile_filters, Filter, FilterStatus};
pub use matcher::{Matcher, ValueMatch};
pub use parser::{parse_duration, parse_expression, Expression, FilterError, FilterOperator};
