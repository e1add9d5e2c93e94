//! Files referenced from a configuration document.
//!
//! Collecting is a read-only scan; the files are migrated by one deferred
//! task after the scan, once per resolved location, however many elements
//! point at them.

use crate::{scan, ElementCollector, ElementMatcher, XmlElement};
use confmig_core::{MigrationError, Result, TaskName, TaskResult};
use confmig_execution::{Task, TaskContext, TaskFn};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, warn};

/// Turns a path and an optional named base location into a filesystem path.
pub trait PathResolver {
    /// Resolve; `None` when the base is unknown or the path stays relative.
    fn resolve(&self, path: &str, relative_to: Option<&str>) -> Option<PathBuf>;
}

/// Resolver backed by a map of base location names.
#[derive(Debug, Clone, Default)]
pub struct MapPathResolver {
    aliases: BTreeMap<String, PathBuf>,
}

impl MapPathResolver {
    /// Create a resolver without aliases.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a named base location.
    pub fn with_alias(mut self, alias: impl Into<String>, base: impl Into<PathBuf>) -> Self {
        self.aliases.insert(alias.into(), base.into());
        self
    }
}

impl PathResolver for MapPathResolver {
    fn resolve(&self, path: &str, relative_to: Option<&str>) -> Option<PathBuf> {
        match relative_to {
            Some(alias) => self.aliases.get(alias).map(|base| base.join(path)),
            None if Path::new(path).is_absolute() => Some(PathBuf::from(path)),
            None => None,
        }
    }
}

/// A `path`/`relative-to` pair found in a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReferencedPath {
    /// The path
    pub path: String,
    /// Name of the base location
    pub relative_to: Option<String>,
}

impl std::fmt::Display for ReferencedPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.relative_to {
            Some(base) => write!(f, "{}/{}", base, self.path),
            None => f.write_str(&self.path),
        }
    }
}

/// Collects the distinct `path`/`relative-to` pairs of matching elements.
#[derive(Debug, Clone)]
pub struct ReferencedPathCollector {
    matcher: ElementMatcher,
    paths: Vec<ReferencedPath>,
}

impl ReferencedPathCollector {
    /// Create a collector.
    pub fn new(matcher: ElementMatcher) -> Self {
        Self {
            matcher,
            paths: Vec::new(),
        }
    }

    /// Pairs collected so far, in document order.
    pub fn paths(&self) -> &[ReferencedPath] {
        &self.paths
    }

    /// Take the collected pairs.
    pub fn into_paths(self) -> Vec<ReferencedPath> {
        self.paths
    }
}

impl ElementCollector for ReferencedPathCollector {
    fn matcher(&self) -> &ElementMatcher {
        &self.matcher
    }

    fn process_element(&mut self, element: &XmlElement) {
        let Some(path) = element.attribute("path") else {
            return;
        };
        let referenced = ReferencedPath {
            path: path.to_string(),
            relative_to: element.attribute("relative-to").map(str::to_string),
        };
        if !self.paths.contains(&referenced) {
            self.paths.push(referenced);
        }
    }
}

type MigrateFn = dyn Fn(&ReferencedPath, &Path, &mut TaskContext<'_>) -> Result<TaskResult>;

/// Scans a document for referenced files, then migrates each file once.
///
/// Every file becomes a subtask. A reference that cannot be resolved yields
/// a FAILED subtask; the others still run.
pub struct ReferencedPathsTask {
    name: TaskName,
    document: PathBuf,
    matchers: Vec<ElementMatcher>,
    resolver: Rc<dyn PathResolver>,
    migrate: Rc<MigrateFn>,
}

impl ReferencedPathsTask {
    /// Create a task over `document`.
    pub fn new<F>(name: impl Into<TaskName>, document: impl Into<PathBuf>, resolver: Rc<dyn PathResolver>, migrate: F) -> Self
    where
        F: Fn(&ReferencedPath, &Path, &mut TaskContext<'_>) -> Result<TaskResult> + 'static,
    {
        Self {
            name: name.into(),
            document: document.into(),
            matchers: Vec::new(),
            resolver,
            migrate: Rc::new(migrate),
        }
    }

    /// Collect references from elements accepted by `matcher`.
    pub fn with_matcher(mut self, matcher: ElementMatcher) -> Self {
        self.matchers.push(matcher);
        self
    }

    fn collect(&self) -> Result<Vec<ReferencedPath>> {
        let mut collectors: Vec<ReferencedPathCollector> =
            self.matchers.iter().cloned().map(ReferencedPathCollector::new).collect();
        let file = File::open(&self.document).map_err(|e| MigrationError::document(&self.document, e))?;
        {
            let mut views: Vec<&mut dyn ElementCollector> = collectors
                .iter_mut()
                .map(|c| c as &mut dyn ElementCollector)
                .collect();
            scan(&mut BufReader::new(file), &mut views).map_err(|e| e.for_document(&self.document))?;
        }

        let mut paths = Vec::new();
        for referenced in collectors.into_iter().flat_map(ReferencedPathCollector::into_paths) {
            if !paths.contains(&referenced) {
                paths.push(referenced);
            }
        }
        Ok(paths)
    }
}

impl Task for ReferencedPathsTask {
    fn name(&self) -> &TaskName {
        &self.name
    }

    fn run(&self, context: &mut TaskContext<'_>) -> Result<TaskResult> {
        let mut migrated = BTreeSet::new();
        for referenced in self.collect()? {
            let name = TaskName::new(format!("{}.file", self.name.name())).with_attribute("path", referenced.to_string());
            let Some(resolved) = self.resolver.resolve(&referenced.path, referenced.relative_to.as_deref()) else {
                warn!(path = %referenced, "cannot resolve referenced path");
                let reason = format!("cannot resolve {}", referenced);
                context.execute(&TaskFn::new(name, move |_: &mut TaskContext<'_>| {
                    Ok(TaskResult::failed(reason.clone()))
                }))?;
                continue;
            };
            if !migrated.insert(resolved.clone()) {
                debug!(path = %resolved.display(), "already migrated");
                continue;
            }
            let migrate = Rc::clone(&self.migrate);
            context.execute(&TaskFn::new(name, move |context: &mut TaskContext<'_>| {
                migrate(&referenced, &resolved, context)
            }))?;
        }
        Ok(context.result())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use confmig_core::{Environment, TaskStatus};
    use std::cell::RefCell;
    use std::fs;

    #[test]
    fn test_map_resolver() {
        let resolver = MapPathResolver::new().with_alias("jboss.server.data.dir", "/opt/server/data");
        assert_eq!(
            resolver.resolve("tx-object-store", Some("jboss.server.data.dir")),
            Some(PathBuf::from("/opt/server/data/tx-object-store"))
        );
        assert_eq!(resolver.resolve("x", Some("unknown.dir")), None);
        assert_eq!(resolver.resolve("relative", None), None);
        assert_eq!(resolver.resolve("/abs/file", None), Some(PathBuf::from("/abs/file")));
    }

    #[test]
    fn test_each_file_is_migrated_once() {
        let source = tempfile::tempdir().unwrap();
        let target = tempfile::tempdir().unwrap();
        fs::write(source.path().join("keystore.jks"), b"keys").unwrap();
        fs::write(source.path().join("users.properties"), b"admin=x").unwrap();

        let document = source.path().join("standalone.xml");
        fs::write(
            &document,
            r#"<server xmlns="urn:jboss:domain:4.0">
    <security-realm><keystore path="keystore.jks" relative-to="config.dir"/></security-realm>
    <security-realm><keystore path="keystore.jks" relative-to="config.dir"/></security-realm>
    <security-realm><properties path="users.properties" relative-to="config.dir"/></security-realm>
    <security-realm><properties path="missing.properties" relative-to="unknown.dir"/></security-realm>
</server>"#,
        )
        .unwrap();

        let copied = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&copied);
        let target_dir = target.path().to_path_buf();
        let task = ReferencedPathsTask::new(
            "copy-referenced-files",
            &document,
            Rc::new(MapPathResolver::new().with_alias("config.dir", source.path())),
            move |referenced, resolved, _| {
                fs::copy(resolved, target_dir.join(&referenced.path))?;
                log.borrow_mut().push(referenced.path.clone());
                Ok(TaskResult::success())
            },
        )
        .with_matcher(ElementMatcher::new("urn:jboss:domain:", "keystore"))
        .with_matcher(ElementMatcher::new("urn:jboss:domain:", "properties"));

        let mut environment = Environment::new();
        let mut context = TaskContext::new(&mut environment);
        let result = context.execute(&task).unwrap();

        assert!(result.is_success());
        assert_eq!(*copied.borrow(), vec!["keystore.jks", "users.properties"]);
        assert_eq!(fs::read(target.path().join("keystore.jks")).unwrap(), b"keys");
        let subtasks = &context.executions()[0].subtasks;
        assert_eq!(subtasks.len(), 3);
        assert_eq!(subtasks[2].result.status(), TaskStatus::Failed);
        assert_eq!(
            subtasks[2].name.attribute("path"),
            Some("unknown.dir/missing.properties")
        );
    }

    #[test]
    fn test_document_without_references_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let document = dir.path().join("host.xml");
        fs::write(&document, "<host xmlns=\"urn:jboss:domain:4.0\"/>").unwrap();
        let task = ReferencedPathsTask::new(
            "copy-referenced-files",
            &document,
            Rc::new(MapPathResolver::new()),
            |_, _, _| Ok(TaskResult::success()),
        )
        .with_matcher(ElementMatcher::new("urn:jboss:domain:", "keystore"));

        let result = TaskContext::new(&mut Environment::new()).execute(&task).unwrap();
        assert_eq!(result, TaskResult::skipped());
    }
}
