//! Read-only scans - observe matching elements across a whole document.

use crate::{ElementMatcher, XmlError, XmlEvent, XmlEventReader};
use std::io::BufRead;
use tracing::debug;

/// A matched element as a collector sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    /// Namespace URI
    pub namespace: Option<String>,
    /// Local name
    pub local_name: String,
    /// Attributes in document order, values unescaped
    pub attributes: Vec<(String, String)>,
    /// Nesting depth, the document element being 0
    pub depth: usize,
}

impl XmlElement {
    fn from_event(event: &XmlEvent, depth: usize) -> Result<Option<Self>, XmlError> {
        let Some(start) = event.start() else {
            return Ok(None);
        };
        let mut attributes = Vec::new();
        for attribute in start.attributes() {
            let attribute = attribute?;
            let key = std::str::from_utf8(attribute.key.as_ref())?.to_string();
            attributes.push((key, attribute.unescape_value()?.into_owned()));
        }
        Ok(Some(Self {
            namespace: event.namespace().map(str::to_string),
            local_name: std::str::from_utf8(start.local_name().into_inner())?.to_string(),
            attributes,
            depth,
        }))
    }

    /// Get an attribute value.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Observes matching elements; acts only once the scan is over.
pub trait ElementCollector {
    /// Elements this collector is shown.
    fn matcher(&self) -> &ElementMatcher;

    /// Observe one matching element.
    fn process_element(&mut self, element: &XmlElement);
}

/// Show every matching element of a document to the collectors.
///
/// Returns the number of elements shown. Nothing is written.
pub fn scan(input: &mut dyn BufRead, collectors: &mut [&mut dyn ElementCollector]) -> Result<usize, XmlError> {
    let mut reader = XmlEventReader::new(input);
    let mut depth = 0usize;
    let mut shown = 0;
    loop {
        let event = reader.next_event()?;
        if event.is_eof() {
            break;
        }
        if event.start().is_some() {
            let mut element = None;
            for collector in collectors.iter_mut() {
                if !collector.matcher().matches(&event) {
                    continue;
                }
                if element.is_none() {
                    element = XmlElement::from_event(&event, depth)?;
                }
                if let Some(element) = &element {
                    collector.process_element(element);
                    shown += 1;
                }
            }
        }
        match event.event() {
            quick_xml::events::Event::Start(_) => depth += 1,
            quick_xml::events::Event::End(_) => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    debug!(events = reader.consumed(), shown, "scan finished");
    Ok(shown)
}
