//! Owned parser events and the reader/writer pair a filter pass runs on.

use crate::XmlError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::{NsReader, Writer};
use std::io::{BufRead, Write};

/// A parser event with its resolved namespace.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlEvent {
    namespace: Option<String>,
    event: Event<'static>,
}

impl XmlEvent {
    /// Create an event.
    pub fn new(namespace: Option<String>, event: Event<'static>) -> Self {
        Self { namespace, event }
    }

    /// Create an event in no namespace.
    pub fn unbound(event: Event<'static>) -> Self {
        Self::new(None, event)
    }

    /// Namespace URI of an element event.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Get the parser event.
    pub fn event(&self) -> &Event<'static> {
        &self.event
    }

    /// Take the parser event.
    pub fn into_event(self) -> Event<'static> {
        self.event
    }

    /// The start tag of a start or empty element.
    pub fn start(&self) -> Option<&BytesStart<'static>> {
        match &self.event {
            Event::Start(start) | Event::Empty(start) => Some(start),
            _ => None,
        }
    }

    /// Local name of a start, empty or end element.
    pub fn local_name(&self) -> Option<&[u8]> {
        match &self.event {
            Event::Start(start) | Event::Empty(start) => Some(start.local_name().into_inner()),
            Event::End(end) => Some(end.local_name().into_inner()),
            _ => None,
        }
    }

    /// Whether this is an element with local name `name`.
    pub fn is_named(&self, name: &str) -> bool {
        self.local_name() == Some(name.as_bytes())
    }

    /// Unescaped value of an attribute of a start or empty element.
    pub fn attribute(&self, name: &str) -> Result<Option<String>, XmlError> {
        let Some(start) = self.start() else {
            return Ok(None);
        };
        match start.try_get_attribute(name)? {
            Some(attribute) => Ok(Some(attribute.unescape_value()?.into_owned())),
            None => Ok(None),
        }
    }

    /// Whether this is the end of the document.
    pub fn is_eof(&self) -> bool {
        matches!(self.event, Event::Eof)
    }
}

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Reads owned, namespace-resolved events and counts them.
pub struct XmlEventReader<'a> {
    reader: NsReader<&'a mut dyn BufRead>,
    buf: Vec<u8>,
    consumed: usize,
    bom: bool,
}

impl<'a> XmlEventReader<'a> {
    /// Create a reader over a document.
    pub fn new(input: &'a mut dyn BufRead) -> Self {
        // A read error here resurfaces on the first event.
        let bom = input.fill_buf().map(|head| head.starts_with(UTF8_BOM)).unwrap_or(false);
        Self {
            reader: NsReader::from_reader(input),
            buf: Vec::new(),
            consumed: 0,
            bom,
        }
    }

    /// Whether the document starts with a UTF-8 byte order mark.
    ///
    /// The parser drops the mark, so no event carries it.
    pub fn has_bom(&self) -> bool {
        self.bom
    }

    /// Read the next event; `Eof` once the document is exhausted.
    pub fn next_event(&mut self) -> Result<XmlEvent, XmlError> {
        self.buf.clear();
        let event = match self.reader.read_resolved_event_into(&mut self.buf) {
            Ok((namespace, event)) => {
                let namespace = match namespace {
                    ResolveResult::Bound(namespace) => Some(std::str::from_utf8(namespace.as_ref())?.to_string()),
                    _ => None,
                };
                XmlEvent::new(namespace, event.into_owned())
            }
            Err(source) => {
                return Err(XmlError::Malformed {
                    position: self.reader.buffer_position() as u64,
                    source,
                })
            }
        };
        self.consumed += 1;
        Ok(event)
    }

    /// Number of events read so far.
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// Read the rest of the element `start` opened, up to and including its
    /// end event. An empty element has nothing left to read.
    pub fn read_subtree(&mut self, start: &XmlEvent) -> Result<Vec<XmlEvent>, XmlError> {
        let mut events = Vec::new();
        self.walk_subtree(start, |event| events.push(event))?;
        Ok(events)
    }

    /// Discard the rest of the element `start` opened, returning how many
    /// events were skipped.
    pub fn skip_to_end(&mut self, start: &XmlEvent) -> Result<usize, XmlError> {
        let mut skipped = 0;
        self.walk_subtree(start, |_| skipped += 1)?;
        Ok(skipped)
    }

    fn walk_subtree(&mut self, start: &XmlEvent, mut visit: impl FnMut(XmlEvent)) -> Result<(), XmlError> {
        if !matches!(start.event(), Event::Start(_)) {
            return Ok(());
        }
        let mut depth = 1usize;
        loop {
            let event = self.next_event()?;
            match event.event() {
                Event::Start(_) => depth += 1,
                Event::End(_) => depth -= 1,
                Event::Eof => {
                    return Err(XmlError::UnexpectedEof {
                        element: String::from_utf8_lossy(start.local_name().unwrap_or_default()).into_owned(),
                    })
                }
                _ => {}
            }
            visit(event);
            if depth == 0 {
                return Ok(());
            }
        }
    }
}

/// Writes events and tracks whether the output differs from the input.
pub struct XmlEventWriter<'a> {
    writer: Writer<&'a mut dyn Write>,
    written: usize,
    changes: usize,
}

impl<'a> XmlEventWriter<'a> {
    /// Create a writer.
    pub fn new(output: &'a mut dyn Write) -> Self {
        Self {
            writer: Writer::new(output),
            written: 0,
            changes: 0,
        }
    }

    /// Write one event.
    pub fn write(&mut self, event: &XmlEvent) -> Result<(), XmlError> {
        self.write_event(event.event().borrow())
    }

    /// Write a parser event built by a component.
    pub fn write_event(&mut self, event: Event<'_>) -> Result<(), XmlError> {
        self.writer.write_event(event)?;
        self.written += 1;
        Ok(())
    }

    /// Write a sequence of events.
    pub fn write_all<'e>(&mut self, events: impl IntoIterator<Item = &'e XmlEvent>) -> Result<(), XmlError> {
        for event in events {
            self.write(event)?;
        }
        Ok(())
    }

    /// Write a UTF-8 byte order mark; not counted as an event.
    pub fn write_bom(&mut self) -> Result<(), XmlError> {
        self.writer.get_mut().write_all(UTF8_BOM)?;
        Ok(())
    }

    /// Note that the output no longer matches the input.
    pub fn record_change(&mut self) {
        self.changes += 1;
    }

    /// Number of events written.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Number of recorded changes.
    pub fn changes(&self) -> usize {
        self.changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<server xmlns="urn:jboss:domain:4.0"><profile><subsystem xmlns="urn:jboss:domain:jmx:1.3"><expose-resolved-model/></subsystem></profile></server>"#;

    #[test]
    fn test_namespaces_are_resolved() {
        let mut input = DOC.as_bytes();
        let mut reader = XmlEventReader::new(&mut input);
        let server = reader.next_event().unwrap();
        assert!(server.is_named("server"));
        assert_eq!(server.namespace(), Some("urn:jboss:domain:4.0"));
        reader.next_event().unwrap();
        let subsystem = reader.next_event().unwrap();
        assert_eq!(subsystem.namespace(), Some("urn:jboss:domain:jmx:1.3"));
        assert_eq!(reader.consumed(), 3);
    }

    #[test]
    fn test_read_subtree_is_balanced() {
        let mut input = DOC.as_bytes();
        let mut reader = XmlEventReader::new(&mut input);
        let server = reader.next_event().unwrap();
        let profile = reader.next_event().unwrap();
        let subtree = reader.read_subtree(&profile).unwrap();
        assert_eq!(subtree.len(), 4);
        assert!(subtree.last().unwrap().is_named("profile"));
        assert_eq!(reader.skip_to_end(&server).unwrap(), 1);
        assert!(reader.next_event().unwrap().is_eof());
    }

    #[test]
    fn test_truncated_subtree_is_an_error() {
        let mut input = "<a><b><c/></b>".as_bytes();
        let mut reader = XmlEventReader::new(&mut input);
        let a = reader.next_event().unwrap();
        assert!(matches!(
            reader.read_subtree(&a),
            Err(XmlError::UnexpectedEof { .. } | XmlError::Malformed { .. })
        ));
    }

    #[test]
    fn test_mismatched_end_is_malformed() {
        let mut input = "<a><b></a>".as_bytes();
        let mut reader = XmlEventReader::new(&mut input);
        let a = reader.next_event().unwrap();
        assert!(matches!(reader.skip_to_end(&a), Err(XmlError::Malformed { .. })));
    }

    #[test]
    fn test_copying_events_reproduces_the_document() {
        let doc = "<?xml version=\"1.0\"?>\n<!-- c -->\n<a x='1'  y=\"&amp;\">\n  text &lt; <b/>\n</a>\n";
        let mut input = doc.as_bytes();
        let mut output = Vec::new();
        {
            let mut reader = XmlEventReader::new(&mut input);
            let mut writer = XmlEventWriter::new(&mut output);
            loop {
                let event = reader.next_event().unwrap();
                if event.is_eof() {
                    break;
                }
                writer.write(&event).unwrap();
            }
            assert_eq!(writer.changes(), 0);
        }
        assert_eq!(String::from_utf8(output).unwrap(), doc);
    }

    #[test]
    fn test_attribute_values_are_unescaped() {
        let mut input = r#"<core-environment path="a&amp;b"/>"#.as_bytes();
        let mut reader = XmlEventReader::new(&mut input);
        let event = reader.next_event().unwrap();
        assert_eq!(event.attribute("path").unwrap(), Some("a&b".to_string()));
        assert_eq!(event.attribute("relative-to").unwrap(), None);
    }

    #[test]
    fn test_byte_order_mark_is_reported_and_rewritten() {
        let doc = "\u{feff}<?xml version=\"1.0\"?>\n<server/>\n";
        let mut input = doc.as_bytes();
        let mut output = Vec::new();
        {
            let mut reader = XmlEventReader::new(&mut input);
            let mut writer = XmlEventWriter::new(&mut output);
            assert!(reader.has_bom());
            writer.write_bom().unwrap();
            loop {
                let event = reader.next_event().unwrap();
                if event.is_eof() {
                    break;
                }
                writer.write(&event).unwrap();
            }
            assert_eq!(writer.written(), reader.consumed() - 1);
        }
        assert_eq!(output, doc.as_bytes());

        let mut plain = "<server/>".as_bytes();
        assert!(!XmlEventReader::new(&mut plain).has_bom());
    }
}
