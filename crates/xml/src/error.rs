//! XML engine errors.

use confmig_core::MigrationError;
use quick_xml::events::attributes::AttrError;
use std::path::Path;
use thiserror::Error;

/// Failure of a filter or scan pass.
///
/// Every variant aborts the pass; nothing is written back.
#[derive(Debug, Error)]
pub enum XmlError {
    /// The document is not well formed
    #[error("malformed XML at byte {position}: {source}")]
    Malformed {
        /// Reader position
        position: u64,
        /// Parser error
        #[source]
        source: quick_xml::Error,
    },

    /// An attribute could not be parsed
    #[error("malformed attribute: {0}")]
    Attribute(#[from] AttrError),

    /// The document ended inside an element
    #[error("unexpected end of document inside <{element}>")]
    UnexpectedEof {
        /// Element left open
        element: String,
    },

    /// A name or value is not valid UTF-8
    #[error("invalid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// A component read events and then declined the element
    #[error("component '{component}' consumed {consumed} events and then declared itself not applicable")]
    ConsumedNotApplicable {
        /// Component name
        component: String,
        /// Events consumed or written before declining
        consumed: usize,
    },

    /// Writer failure
    #[error("XML writer error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl XmlError {
    /// Attach the document path.
    pub fn for_document(self, path: &Path) -> MigrationError {
        MigrationError::document(path, self)
    }
}
