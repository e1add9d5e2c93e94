//! The filter pass - copy everything, hand matched elements to components.
//!
//! The pass is a two-state machine. In DEFAULT every event is copied to the
//! output. A start (or empty) element accepted by a component's matcher moves
//! it to MATCHED, where the component is given the element and may consume
//! and write as many events as it likes. Returning
//! [`ComponentOutcome::Continue`] means the component has handled the element
//! through its end and the pass goes back to DEFAULT.
//! [`ComponentOutcome::NotApplicable`] means the component did nothing: the
//! next matching component is tried, and if none is left the element is
//! copied as in DEFAULT.

use crate::{XmlError, XmlEvent, XmlEventReader, XmlEventWriter};
use tracing::{debug, trace};

/// Accepts elements by namespace prefix and local name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementMatcher {
    namespace_prefix: String,
    local_name: String,
}

impl ElementMatcher {
    /// Match `local_name` in any namespace starting with `namespace_prefix`.
    pub fn new(namespace_prefix: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self {
            namespace_prefix: namespace_prefix.into(),
            local_name: local_name.into(),
        }
    }

    /// Whether `event` starts a matching element.
    pub fn matches(&self, event: &XmlEvent) -> bool {
        event.start().is_some()
            && event.is_named(&self.local_name)
            && event
                .namespace()
                .unwrap_or_default()
                .starts_with(&self.namespace_prefix)
    }
}

impl std::fmt::Display for ElementMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{{}*}}{}", self.namespace_prefix, self.local_name)
    }
}

/// What a component did with a matched element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentOutcome {
    /// The element was handled through its end
    Continue,
    /// The component declined; nothing was read or written
    NotApplicable,
}

/// Rewrites matched elements.
pub trait ElementComponent {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Elements this component is offered.
    fn matcher(&self) -> &ElementMatcher;

    /// Handle a matched element.
    ///
    /// `start` has already been read but not written. On `Continue` the
    /// component must have consumed the element's subtree and written
    /// whatever replaces it; on `NotApplicable` it must not touch either
    /// stream.
    fn process(
        &mut self,
        start: &XmlEvent,
        reader: &mut XmlEventReader<'_>,
        writer: &mut XmlEventWriter<'_>,
    ) -> Result<ComponentOutcome, XmlError>;
}

/// Counters of one filter pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterSummary {
    /// Events read
    pub events: usize,
    /// Elements handled by a component
    pub handled: usize,
    /// Changes recorded by components
    pub changes: usize,
}

impl FilterSummary {
    /// Whether the output differs from the input.
    pub fn is_modified(&self) -> bool {
        self.changes > 0
    }
}

enum FilterState {
    Default,
    Matched { start: XmlEvent, next: usize },
}

/// A set of components applied in one streaming pass.
#[derive(Default)]
pub struct XmlFilter {
    components: Vec<Box<dyn ElementComponent>>,
}

impl XmlFilter {
    /// Create a filter without components.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a component; earlier components are offered an element first.
    pub fn with_component(mut self, component: impl ElementComponent + 'static) -> Self {
        self.components.push(Box::new(component));
        self
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Whether there are no components.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Run the pass until the end of the document.
    pub fn run(
        &mut self,
        reader: &mut XmlEventReader<'_>,
        writer: &mut XmlEventWriter<'_>,
    ) -> Result<FilterSummary, XmlError> {
        let mut summary = FilterSummary::default();
        if reader.has_bom() {
            writer.write_bom()?;
        }
        let mut state = FilterState::Default;
        loop {
            state = match state {
                FilterState::Default => {
                    let event = reader.next_event()?;
                    if event.is_eof() {
                        break;
                    }
                    if self.components.iter().any(|c| c.matcher().matches(&event)) {
                        FilterState::Matched { start: event, next: 0 }
                    } else {
                        writer.write(&event)?;
                        FilterState::Default
                    }
                }
                FilterState::Matched { start, next } => {
                    let candidate = (next..self.components.len()).find(|&i| self.components[i].matcher().matches(&start));
                    let Some(index) = candidate else {
                        trace!(element = ?start.local_name().map(String::from_utf8_lossy), "no component applies");
                        writer.write(&start)?;
                        state = FilterState::Default;
                        continue;
                    };
                    let component = &mut self.components[index];
                    let (read, written) = (reader.consumed(), writer.written());
                    match component.process(&start, reader, writer)? {
                        ComponentOutcome::Continue => {
                            debug!(component = component.name(), events = reader.consumed() - read, "element handled");
                            summary.handled += 1;
                            FilterState::Default
                        }
                        ComponentOutcome::NotApplicable => {
                            let touched = (reader.consumed() - read) + (writer.written() - written);
                            if touched > 0 {
                                return Err(XmlError::ConsumedNotApplicable {
                                    component: component.name().to_string(),
                                    consumed: touched,
                                });
                            }
                            FilterState::Matched { start, next: index + 1 }
                        }
                    }
                }
            };
        }
        summary.events = reader.consumed();
        summary.changes = writer.changes();
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quick_xml::events::{BytesStart, Event};

    /// Copies the subtree untouched.
    struct Passthrough(ElementMatcher);

    impl ElementComponent for Passthrough {
        fn name(&self) -> &str {
            "passthrough"
        }

        fn matcher(&self) -> &ElementMatcher {
            &self.0
        }

        fn process(
            &mut self,
            start: &XmlEvent,
            reader: &mut XmlEventReader<'_>,
            writer: &mut XmlEventWriter<'_>,
        ) -> Result<ComponentOutcome, XmlError> {
            let subtree = reader.read_subtree(start)?;
            writer.write(start)?;
            writer.write_all(&subtree)?;
            Ok(ComponentOutcome::Continue)
        }
    }

    /// Declines, optionally after reading one event.
    struct Declines {
        matcher: ElementMatcher,
        peek: bool,
    }

    impl ElementComponent for Declines {
        fn name(&self) -> &str {
            "declines"
        }

        fn matcher(&self) -> &ElementMatcher {
            &self.matcher
        }

        fn process(
            &mut self,
            _start: &XmlEvent,
            reader: &mut XmlEventReader<'_>,
            _writer: &mut XmlEventWriter<'_>,
        ) -> Result<ComponentOutcome, XmlError> {
            if self.peek {
                reader.next_event()?;
            }
            Ok(ComponentOutcome::NotApplicable)
        }
    }

    /// Replaces the element with an empty `<removed/>`.
    struct Replace(ElementMatcher);

    impl ElementComponent for Replace {
        fn name(&self) -> &str {
            "replace"
        }

        fn matcher(&self) -> &ElementMatcher {
            &self.0
        }

        fn process(
            &mut self,
            start: &XmlEvent,
            reader: &mut XmlEventReader<'_>,
            writer: &mut XmlEventWriter<'_>,
        ) -> Result<ComponentOutcome, XmlError> {
            reader.skip_to_end(start)?;
            writer.write_event(Event::Empty(BytesStart::new("removed")))?;
            writer.record_change();
            Ok(ComponentOutcome::Continue)
        }
    }

    const DOC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<server xmlns="urn:jboss:domain:4.0">
    <!-- unknown vendor extension -->
    <vendor:thing xmlns:vendor="urn:example:vendor" weird = 'yes'>keep &amp; me</vendor:thing>
    <profile>
        <subsystem xmlns="urn:jboss:domain:transactions:3.0">
            <core-environment node-identifier="a"   >
                <process-id><uuid/></process-id>
            </core-environment>
        </subsystem>
        <subsystem xmlns="urn:jboss:domain:jmx:1.3"/>
    </profile>
</server>
"#;

    fn filter(filter: &mut XmlFilter, doc: &str) -> Result<(String, FilterSummary), XmlError> {
        let mut input = doc.as_bytes();
        let mut output = Vec::new();
        let summary = {
            let mut reader = XmlEventReader::new(&mut input);
            let mut writer = XmlEventWriter::new(&mut output);
            filter.run(&mut reader, &mut writer)?
        };
        Ok((String::from_utf8(output).unwrap(), summary))
    }

    fn transactions() -> ElementMatcher {
        ElementMatcher::new("urn:jboss:domain:transactions:", "subsystem")
    }

    #[test]
    fn test_matcher_uses_namespace_prefix() {
        let mut input = r#"<subsystem xmlns="urn:jboss:domain:transactions:1.5"/>"#.as_bytes();
        let event = XmlEventReader::new(&mut input).next_event().unwrap();
        assert!(transactions().matches(&event));
        assert!(!ElementMatcher::new("urn:jboss:domain:jmx:", "subsystem").matches(&event));
        assert!(!ElementMatcher::new("urn:jboss:domain:transactions:", "profile").matches(&event));
    }

    #[test]
    fn test_no_match_reproduces_document() {
        let mut f = XmlFilter::new().with_component(Replace(ElementMatcher::new("urn:jboss:domain:messaging:", "subsystem")));
        let (output, summary) = filter(&mut f, DOC).unwrap();
        assert_eq!(output, DOC);
        assert_eq!(summary.handled, 0);
        assert!(!summary.is_modified());
    }

    #[test]
    fn test_non_mutating_component_reproduces_subtree() {
        let mut f = XmlFilter::new().with_component(Passthrough(transactions()));
        let (output, summary) = filter(&mut f, DOC).unwrap();
        assert_eq!(output, DOC);
        assert_eq!(summary.handled, 1);
    }

    #[test]
    fn test_replacing_component_leaves_siblings_intact() {
        let mut f = XmlFilter::new().with_component(Replace(transactions()));
        let (output, summary) = filter(&mut f, DOC).unwrap();
        assert!(summary.is_modified());
        assert!(output.contains("<profile>\n        <removed/>\n        <subsystem xmlns=\"urn:jboss:domain:jmx:1.3\"/>"));
        assert!(output.contains("<vendor:thing xmlns:vendor=\"urn:example:vendor\" weird = 'yes'>keep &amp; me</vendor:thing>"));
        assert!(!output.contains("core-environment"));
    }

    #[test]
    fn test_not_applicable_falls_through_to_next_component() {
        let mut f = XmlFilter::new()
            .with_component(Declines { matcher: transactions(), peek: false })
            .with_component(Replace(transactions()));
        let (output, _) = filter(&mut f, DOC).unwrap();
        assert!(output.contains("<removed/>"));

        let mut f = XmlFilter::new().with_component(Declines { matcher: transactions(), peek: false });
        assert_eq!(filter(&mut f, DOC).unwrap().0, DOC);
    }

    #[test]
    fn test_consuming_then_declining_is_an_error() {
        let mut f = XmlFilter::new().with_component(Declines { matcher: transactions(), peek: true });
        assert!(matches!(
            filter(&mut f, DOC),
            Err(XmlError::ConsumedNotApplicable { consumed: 1, .. })
        ));
    }

    #[test]
    fn test_malformed_document_aborts() {
        let mut f = XmlFilter::new().with_component(Passthrough(transactions()));
        let broken = r#"<server><subsystem xmlns="urn:jboss:domain:transactions:3.0"></server>"#;
        assert!(matches!(filter(&mut f, broken), Err(XmlError::Malformed { .. })));
    }

    #[test]
    fn test_byte_order_mark_survives_the_pass() {
        let doc = format!("\u{feff}{}", DOC);
        let mut f = XmlFilter::new().with_component(Passthrough(transactions()));
        let (output, summary) = filter(&mut f, &doc).unwrap();
        assert_eq!(output.as_bytes(), doc.as_bytes());
        assert!(!summary.is_modified());

        let mut f = XmlFilter::new().with_component(Replace(transactions()));
        let (output, _) = filter(&mut f, &doc).unwrap();
        assert!(output.starts_with("\u{feff}<?xml"));

        let (output, _) = filter(&mut XmlFilter::new(), DOC).unwrap();
        assert_eq!(output, DOC);
    }
}
