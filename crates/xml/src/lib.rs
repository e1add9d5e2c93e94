//! Streaming XML rewrite engine.
//!
//! Configuration documents are edited as a stream of parser events. Every
//! event is copied unchanged unless an [`ElementComponent`] claims the
//! element it starts, in which case the component owns that element's whole
//! subtree. Content nobody claims, including elements without a known
//! schema, is reproduced as read.

#![warn(missing_docs)]

pub mod error;
pub mod event;
pub mod filter;
pub mod scan;
pub mod task;
pub mod paths;
pub mod transactions;

pub use error::XmlError;
pub use event::{XmlEvent, XmlEventReader, XmlEventWriter};
pub use filter::{ComponentOutcome, ElementComponent, ElementMatcher, FilterSummary, XmlFilter};
pub use scan::{scan, ElementCollector, XmlElement};
pub use task::XmlFilterTask;
pub use paths::{MapPathResolver, PathResolver, ReferencedPath, ReferencedPathCollector, ReferencedPathsTask};
pub use transactions::TransactionsObjectStoreMigration;
