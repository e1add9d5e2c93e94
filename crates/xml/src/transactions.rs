//! Transactions subsystem: move the object store location out of
//! `core-environment`.
//!
//! Older schemas keep the object store location on `core-environment`:
//!
//! ```xml
//! <core-environment path="tx-object-store" relative-to="jboss.server.data.dir">
//! ```
//!
//! Newer ones expect a dedicated sibling:
//!
//! ```xml
//! <core-environment/>
//! <object-store path="tx-object-store" relative-to="jboss.server.data.dir"/>
//! ```

use crate::{ComponentOutcome, ElementComponent, ElementMatcher, XmlError, XmlEvent, XmlEventReader, XmlEventWriter};
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesStart, Event};
use tracing::debug;

const NAMESPACE_PREFIX: &str = "urn:jboss:domain:transactions:";
const CORE_ENVIRONMENT: &str = "core-environment";
const OBJECT_STORE: &str = "object-store";
const MOVED_ATTRIBUTES: [&str; 2] = ["path", "relative-to"];
/// Children the object store follows, in schema order.
const PRECEDING: [&str; 3] = ["core-environment", "recovery-environment", "coordinator-environment"];

/// Element component performing the object store move.
///
/// The subsystem is copied unchanged when it already has an `object-store`
/// child or when `core-environment` carries neither attribute.
#[derive(Debug, Clone)]
pub struct TransactionsObjectStoreMigration {
    matcher: ElementMatcher,
}

impl TransactionsObjectStoreMigration {
    /// Create the component.
    pub fn new() -> Self {
        Self {
            matcher: ElementMatcher::new(NAMESPACE_PREFIX, "subsystem"),
        }
    }
}

impl Default for TransactionsObjectStoreMigration {
    fn default() -> Self {
        Self::new()
    }
}

/// A direct child of the subsystem, as indexes into its events.
struct Child {
    start: usize,
    end: usize,
}

fn direct_children(events: &[XmlEvent]) -> Vec<Child> {
    let mut children = Vec::new();
    let mut depth = 0usize;
    let mut open = 0;
    for (i, event) in events.iter().enumerate() {
        match event.event() {
            Event::Start(_) => {
                if depth == 0 {
                    open = i;
                }
                depth += 1;
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    children.push(Child { start: open, end: i });
                }
            }
            Event::Empty(_) if depth == 0 => children.push(Child { start: i, end: i }),
            _ => {}
        }
    }
    children
}

/// Append `attribute` to `target` under `key`.
///
/// The raw value is kept unless it holds a `"`, which only a single-quoted
/// value can; that one is unescaped and escaped again for double quotes.
fn push_attribute(target: &mut BytesStart<'static>, key: &[u8], attribute: &Attribute<'_>) -> Result<(), XmlError> {
    if attribute.value.contains(&b'"') {
        let key = std::str::from_utf8(key)?;
        let value = attribute.unescape_value()?;
        target.push_attribute((key, value.as_ref()));
    } else {
        target.push_attribute(Attribute::from((key, attribute.value.as_ref())));
    }
    Ok(())
}

/// Copy of `start` without the attributes in `dropped`.
fn without_attributes(start: &BytesStart<'_>, dropped: &[&str]) -> Result<BytesStart<'static>, XmlError> {
    let name = std::str::from_utf8(start.name().as_ref())?.to_string();
    let mut copy = BytesStart::new(name);
    for attribute in start.attributes() {
        let attribute = attribute?;
        if dropped.iter().any(|d| attribute.key.as_ref() == d.as_bytes()) {
            continue;
        }
        push_attribute(&mut copy, attribute.key.as_ref(), &attribute)?;
    }
    Ok(copy)
}

/// Move the attributes into a new `object-store`; returns whether anything
/// changed. `children` excludes the subsystem's own end tag.
fn migrate(children: &mut Vec<XmlEvent>) -> Result<bool, XmlError> {
    let layout = direct_children(children);
    if layout.iter().any(|c| children[c.start].is_named(OBJECT_STORE)) {
        debug!("object-store already present");
        return Ok(false);
    }
    let Some(core) = layout.iter().find(|c| children[c.start].is_named(CORE_ENVIRONMENT)) else {
        return Ok(false);
    };
    let core_event = &children[core.start];
    let Some(core_start) = core_event.start() else {
        return Ok(false);
    };

    let mut object_store = BytesStart::new(core_start.name().as_ref().strip_suffix(CORE_ENVIRONMENT.as_bytes()).map_or_else(
        || OBJECT_STORE.to_string(),
        |prefix| format!("{}{}", String::from_utf8_lossy(prefix), OBJECT_STORE),
    ));
    let mut moved = 0;
    for name in MOVED_ATTRIBUTES {
        if let Some(attribute) = core_start.try_get_attribute(name)? {
            push_attribute(&mut object_store, name.as_bytes(), &attribute)?;
            moved += 1;
        }
    }
    if moved == 0 {
        return Ok(false);
    }

    let stripped = without_attributes(core_start, &MOVED_ATTRIBUTES)?;
    let stripped = match core_event.event() {
        Event::Start(_) => Event::Start(stripped),
        _ => Event::Empty(stripped),
    };
    let namespace = core_event.namespace().map(str::to_string);

    let indentation = core
        .start
        .checked_sub(1)
        .map(|i| &children[i])
        .filter(|e| matches!(e.event(), Event::Text(t) if t.iter().all(u8::is_ascii_whitespace)))
        .cloned();
    let after = layout
        .iter()
        .filter(|c| PRECEDING.iter().any(|name| children[c.start].is_named(name)))
        .map(|c| c.end)
        .max()
        .unwrap_or(core.end);

    let core_index = core.start;
    children[core_index] = XmlEvent::new(namespace.clone(), stripped);
    let mut inserted: Vec<XmlEvent> = indentation.into_iter().collect();
    inserted.push(XmlEvent::new(namespace, Event::Empty(object_store)));
    children.splice(after + 1..after + 1, inserted);
    Ok(true)
}

impl ElementComponent for TransactionsObjectStoreMigration {
    fn name(&self) -> &str {
        "transactions-object-store"
    }

    fn matcher(&self) -> &ElementMatcher {
        &self.matcher
    }

    fn process(
        &mut self,
        start: &XmlEvent,
        reader: &mut XmlEventReader<'_>,
        writer: &mut XmlEventWriter<'_>,
    ) -> Result<ComponentOutcome, XmlError> {
        if !matches!(start.event(), Event::Start(_)) {
            return Ok(ComponentOutcome::NotApplicable);
        }
        let mut children = reader.read_subtree(start)?;
        let end = children.pop();
        let changed = migrate(&mut children)?;

        writer.write(start)?;
        writer.write_all(&children)?;
        writer.write_all(&end)?;
        if changed {
            debug!(namespace = ?start.namespace(), "moved object store location out of core-environment");
            writer.record_change();
        }
        Ok(ComponentOutcome::Continue)
    }
}
