//! # Element Link Resolution
//!
//! `Resolver` is the entry point of the library. Given a parsed source
//! document and the project/language it belongs to, it walks every link
//! element in the language-scoped content, in document order, and for each:
//!
//! 1. parses the reference string (`reference::parse_reference`);
//! 2. builds the target-element query (id match or parsed query);
//! 3. loads the target document through the session cache (`loader`);
//! 4. selects the matched elements below the target's content scope;
//! 5. inlines every match according to the link's directives (`links`);
//! 6. writes the outcome status onto the link element.
//!
//! Steps that fail for a single link only change that link's status. Errors
//! escape `resolve` when they concern the resolution tree as a whole: cycles
//! and the depth, target-count and deadline limits.
//!
//! Section links are discovered and reported but not expanded.
//!
//! ## Example
//!
//! ```no_run
//! use fragment_link::{ProjectContext, Resolver};
//! use xot::Xot;
//!
//! # fn main() -> fragment_link::Result<()> {
//! let config = fragment_link::config::from_file("fragment-link.yaml")?;
//! let resolver = Resolver::from_config(&config)?;
//!
//! let mut xot = Xot::new();
//! let document = xot.parse(&std::fs::read_to_string("content/annual.xml")?)
//!     .map_err(fragment_link::Error::xml)?;
//! let context = ProjectContext::new("7", "en").with_source("annual.xml");
//! resolver.resolve(&mut xot, document, &context, "content".as_ref())?;
//! # Ok(())
//! # }
//! ```

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use log::{debug, warn};
use serde::Serialize;
use xot::{Node, Xot};

use crate::cleanup::cleanup_links;
use crate::config::{Config, Limits, Markup};
use crate::document::content_scope;
use crate::error::Result;
use crate::links::{
    discover_links, inline, mark_resolved, Directives, InlineMode, LinkElement, LinkKind,
    LinkStatus,
};
use crate::loader::TargetOutcome;
use crate::project::{ProjectContext, ProjectPathResolver, ProjectRegistry};
use crate::query::Query;
use crate::reference::{parse_reference, SelectorType, TargetDescriptor};
use crate::session::{ResolutionSession, TargetKey};
use crate::store::{ContentStore, DiskStore};
use crate::sync::Collaborators;

/// Outcome for one link element of the source document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkReport {
    pub reference: String,
    pub kind: LinkKind,
    /// `None` for section links, which are not resolved
    pub status: Option<LinkStatus>,
}

/// What a resolution did to the source document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionReport {
    pub links: Vec<LinkReport>,
    /// Distinct target documents read during the whole resolution tree
    pub targets_loaded: usize,
}

impl ResolutionReport {
    /// Number of element links with the given status
    pub fn count(&self, status: LinkStatus) -> usize {
        self.links
            .iter()
            .filter(|link| link.status == Some(status))
            .count()
    }

    /// Whether every element link resolved
    pub fn all_ok(&self) -> bool {
        self.links
            .iter()
            .filter_map(|link| link.status)
            .all(|status| status.is_ok())
    }
}

/// Resolves element links against stored fragments
pub struct Resolver {
    pub(crate) projects: Arc<dyn ProjectPathResolver>,
    pub(crate) store: Arc<dyn ContentStore>,
    pub(crate) collaborators: Collaborators,
    pub(crate) markup: Markup,
    pub(crate) limits: Limits,
}

impl Resolver {
    /// Resolver reading from disk with no-op synchronization stages
    pub fn new(projects: Arc<dyn ProjectPathResolver>) -> Self {
        Self {
            projects,
            store: Arc::new(DiskStore),
            collaborators: Collaborators::default(),
            markup: Markup::default(),
            limits: Limits::default(),
        }
    }

    /// Resolver with the projects, markup, limits and caches of a configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            projects: Arc::new(ProjectRegistry::from_config(config)),
            store: Arc::new(DiskStore),
            collaborators: Collaborators::from_config(config)?,
            markup: config.markup.clone(),
            limits: config.limits,
        })
    }

    pub fn with_store(mut self, store: Arc<dyn ContentStore>) -> Self {
        self.store = store;
        self
    }

    pub fn with_collaborators(mut self, collaborators: Collaborators) -> Self {
        self.collaborators = collaborators;
        self
    }

    pub fn with_markup(mut self, markup: Markup) -> Self {
        self.markup = markup;
        self
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn markup(&self) -> &Markup {
        &self.markup
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Resolve every link of `document` in place and return it.
    ///
    /// `content_folder` is the content root of `project.project_id`. Targets
    /// in other projects are located through the project path resolver.
    pub fn resolve(
        &self,
        xot: &mut Xot,
        document: Node,
        project: &ProjectContext,
        content_folder: &Path,
    ) -> Result<Node> {
        self.resolve_report(xot, document, project, content_folder)?;
        Ok(document)
    }

    /// Like `resolve`, returning the per-link outcomes
    pub fn resolve_report(
        &self,
        xot: &mut Xot,
        document: Node,
        project: &ProjectContext,
        content_folder: &Path,
    ) -> Result<ResolutionReport> {
        let mut session = ResolutionSession::new(self.limits);
        if let Some(source) = &project.source_reference {
            session.enter_source(TargetKey::new(&project.project_id, source));
        }
        let resolved = self.resolve_with_session(xot, document, project, content_folder, &mut session);
        let targets_loaded = session.loads();
        let released = session.release(xot);
        let links = resolved?;
        released?;
        Ok(ResolutionReport {
            links,
            targets_loaded,
        })
    }

    /// Resolve the links of `document` within an existing session.
    ///
    /// The loader calls this for every target it synchronizes, so the whole
    /// resolution tree shares one cache and one in-progress path.
    pub fn resolve_with_session(
        &self,
        xot: &mut Xot,
        document: Node,
        project: &ProjectContext,
        content_folder: &Path,
        session: &mut ResolutionSession,
    ) -> Result<Vec<LinkReport>> {
        let Some(scope) = content_scope(xot, document, &self.markup, &project.lang) else {
            debug!("No '{}' content to resolve", project.lang);
            return Ok(Vec::new());
        };

        let links = discover_links(xot, scope, &self.markup);
        // Link ancestors are taken from the intact tree: text-only inlining
        // drops everything below a link, including links nested in it.
        let enclosing = enclosing_links(xot, &links);
        let mut replaced: HashSet<Node> = HashSet::new();
        let mut reports = Vec::with_capacity(links.len());
        for (link, ancestors) in links.into_iter().zip(enclosing) {
            if ancestors.iter().any(|ancestor| replaced.contains(ancestor)) {
                debug!("Link '{}' was replaced with its parent's content", link.reference);
                replaced.insert(link.node);
                continue;
            }
            session.check_deadline()?;

            let status = match link.kind {
                LinkKind::Element => {
                    let outcome =
                        self.resolve_element_link(xot, &link, project, content_folder, session)?;
                    if outcome.replaced_content {
                        replaced.insert(link.node);
                    }
                    mark_resolved(xot, link.node, outcome.status, &self.markup);
                    if !outcome.status.is_ok() {
                        debug!("Link '{}' resolved with status {}", link.reference, outcome.status);
                    }
                    Some(outcome.status)
                }
                LinkKind::Section => {
                    self.resolve_section_link(&link);
                    None
                }
            };
            reports.push(LinkReport {
                reference: link.reference,
                kind: link.kind,
                status,
            });
        }
        Ok(reports)
    }

    /// Reverse the resolution markers of `document` before it is saved
    pub fn cleanup(&self, xot: &mut Xot, document: Node, project: &ProjectContext) -> Result<Node> {
        cleanup_links(xot, document, &self.markup, &project.lang)?;
        Ok(document)
    }

    fn resolve_element_link(
        &self,
        xot: &mut Xot,
        link: &LinkElement,
        project: &ProjectContext,
        content_folder: &Path,
        session: &mut ResolutionSession,
    ) -> Result<ElementOutcome> {
        let target = parse_reference(&link.reference);
        if target.is_malformed() {
            return Ok(LinkStatus::WrongFormat.into());
        }

        let query = match self.target_query(&target) {
            Ok(query) => query,
            Err(err) => {
                debug!("Link '{}': {}", link.reference, err);
                return Ok(LinkStatus::WrongFormat.into());
            }
        };

        let target_document = match self.load_target(xot, &target, project, content_folder, session)? {
            TargetOutcome::Loaded(document) => document,
            TargetOutcome::NotAvailable => return Ok(LinkStatus::TargetSectionNotAvailable.into()),
            TargetOutcome::Failed => return Ok(LinkStatus::TargetSectionError.into()),
        };

        let matches = match content_scope(xot, target_document, &self.markup, &project.lang) {
            Some(scope) => query.select(xot, scope),
            None => Vec::new(),
        };
        if matches.is_empty() {
            return Ok(LinkStatus::TargetElementNotFound.into());
        }

        let directives = Directives::read(xot, link.node, &self.markup);
        let replaced_content = directives.mode() == InlineMode::Text;
        for matched in matches {
            if let Err(err) = inline(xot, link.node, matched, &directives, &self.markup) {
                warn!("Failed to inline '{}': {}", link.reference, err);
                return Ok(ElementOutcome {
                    status: LinkStatus::TargetSectionError,
                    replaced_content,
                });
            }
        }
        Ok(ElementOutcome {
            status: LinkStatus::Ok,
            replaced_content,
        })
    }

    /// Extension point for whole-fragment inclusion
    fn resolve_section_link(&self, link: &LinkElement) {
        debug!(
            "Section link '{}' left as is: section inclusion is not supported",
            link.reference
        );
    }

    fn target_query(&self, target: &TargetDescriptor) -> Result<Query> {
        match target.selector_type {
            SelectorType::Id => Ok(Query::id_match(&self.markup.id_attributes, &target.selector)),
            SelectorType::Xpath => Query::parse(&target.selector),
        }
    }
}

/// Status of one element link, and whether its original children are gone
struct ElementOutcome {
    status: LinkStatus,
    replaced_content: bool,
}

impl From<LinkStatus> for ElementOutcome {
    fn from(status: LinkStatus) -> Self {
        Self {
            status,
            replaced_content: false,
        }
    }
}

/// For every link, the links among `links` that contain it
fn enclosing_links(xot: &Xot, links: &[LinkElement]) -> Vec<Vec<Node>> {
    let nodes: HashSet<Node> = links.iter().map(|link| link.node).collect();
    links
        .iter()
        .map(|link| {
            xot.ancestors(link.node)
                .skip(1)
                .filter(|ancestor| nodes.contains(ancestor))
                .collect()
        })
        .collect()
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("markup", &self.markup)
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{attribute, serialize};
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// In-memory fragments keyed by absolute path
    #[derive(Default)]
    struct MemoryStore {
        files: HashMap<PathBuf, String>,
        reads: Mutex<Vec<PathBuf>>,
    }

    impl MemoryStore {
        fn with(mut self, path: &str, xml: &str) -> Self {
            self.files.insert(PathBuf::from(path), xml.to_string());
            self
        }
    }

    impl ContentStore for MemoryStore {
        fn exists(&self, path: &Path) -> bool {
            self.files.contains_key(path)
        }

        fn read_to_string(&self, path: &Path) -> Result<String> {
            self.reads.lock().unwrap().push(path.to_path_buf());
            Ok(self.files[path].clone())
        }
    }

    fn resolver(store: MemoryStore) -> Resolver {
        let mut projects = ProjectRegistry::new();
        projects.insert("7", "/p7/content");
        projects.insert("42", "/p42/content");
        Resolver::new(Arc::new(projects)).with_store(Arc::new(store))
    }

    fn source(xot: &mut Xot, body: &str) -> Node {
        xot.parse(&format!(r#"<data><content lang="en">{}</content></data>"#, body))
            .unwrap()
    }

    fn first_link(xot: &Xot, document: Node) -> Node {
        xot.descendants(document)
            .find(|node| attribute(xot, *node, "elementlink").is_some())
            .unwrap()
    }

    #[test]
    fn test_report_counts_statuses() {
        let store = MemoryStore::default().with(
            "/p7/content/a.xml",
            r#"<data><content lang="en"><p id="x">X</p></content></data>"#,
        );
        let resolver = resolver(store);
        let mut xot = Xot::new();
        let document = source(
            &mut xot,
            r#"<p elementlink="a.xml#x"/><p elementlink="bad"/><p elementlink="a.xml#nope"/><p sectionlink="a.xml#x"/>"#,
        );

        let report = resolver
            .resolve_report(&mut xot, document, &ProjectContext::new("7", "en"), "/p7/content".as_ref())
            .unwrap();

        assert_eq!(report.links.len(), 4);
        assert_eq!(report.count(LinkStatus::Ok), 1);
        assert_eq!(report.count(LinkStatus::WrongFormat), 1);
        assert_eq!(report.count(LinkStatus::TargetElementNotFound), 1);
        assert_eq!(report.links[3].kind, LinkKind::Section);
        assert_eq!(report.links[3].status, None);
        assert_eq!(report.targets_loaded, 1);
        assert!(!report.all_ok());
    }

    #[test]
    fn test_xpath_selector_applies_below_content_scope() {
        let store = MemoryStore::default().with(
            "/p7/content/a.xml",
            r#"<data><content lang="en"><table id="t1"><tr/></table><table id="t2"/></content><content lang="nl"><table id="t1"/></content></data>"#,
        );
        let resolver = resolver(store);
        let mut xot = Xot::new();
        let document = source(&mut xot, r#"<div elementlink="a.xml/table[@id='t1']"/>"#);

        resolver
            .resolve(&mut xot, document, &ProjectContext::new("7", "en"), "/p7/content".as_ref())
            .unwrap();

        let link = first_link(&xot, document);
        assert_eq!(attribute(&xot, link, "data-linkstatus").as_deref(), Some("ok"));
        assert_eq!(
            serialize(&xot, link).unwrap(),
            r#"<div elementlink="a.xml/table[@id=&apos;t1&apos;]" data-linkstatus="ok" contenteditable="false" class="non-editable"><table id="t1"><tr/></table></div>"#
        );
    }

    #[test]
    fn test_xpath_boolean_and_function_predicates() {
        let store = MemoryStore::default().with(
            "/p7/content/report.xml",
            r#"<data><content lang="en"><p class="a" id="b">hit</p><p>miss</p><div><p id="c">nested</p></div></content></data>"#,
        );
        let resolver = resolver(store);
        let selectors = [
            ("report.xml/p[@class='a' and @id='b']", "hit"),
            ("report.xml/p[@id='b' or @id='zzz']", "hit"),
            ("report.xml/p[text()='hit']", "hit"),
            ("report.xml/p[not(@class)]", "miss"),
            ("report.xml/*[self::p][1]", "hit"),
            ("report.xml/div/p[starts-with(@id, 'c')]", "nested"),
        ];

        for (reference, expected) in selectors {
            let mut xot = Xot::new();
            let document = source(
                &mut xot,
                &format!(r#"<span elementlink="{}" data-textonly="true"/>"#, reference),
            );
            resolver
                .resolve(&mut xot, document, &ProjectContext::new("7", "en"), "/p7/content".as_ref())
                .unwrap();

            let link = first_link(&xot, document);
            assert_eq!(
                attribute(&xot, link, "data-linkstatus").as_deref(),
                Some("ok"),
                "{}",
                reference
            );
            assert_eq!(crate::document::text_content(&xot, link), expected, "{}", reference);
        }
    }

    #[test]
    fn test_xpath_selector_with_no_node_result_is_wrong_format() {
        let resolver = resolver(MemoryStore::default());
        let mut xot = Xot::new();
        let document = source(&mut xot, r#"<div elementlink="a.xml/p = 'x'"/>"#);

        resolver
            .resolve(&mut xot, document, &ProjectContext::new("7", "en"), "/p7/content".as_ref())
            .unwrap();

        let link = first_link(&xot, document);
        assert_eq!(
            attribute(&xot, link, "data-linkstatus").as_deref(),
            Some("wrong-format")
        );
    }

    #[test]
    fn test_links_inside_text_only_link_are_skipped() {
        let store = MemoryStore::default().with(
            "/p7/content/report.xml",
            r#"<data><content lang="en"><p id="x">outer</p><p id="y">inner</p></content></data>"#,
        );
        let resolver = resolver(store);
        let mut xot = Xot::new();
        let document = source(
            &mut xot,
            r#"<span elementlink="report.xml#x" data-textonly="true"><b elementlink="report.xml#y"/></span><i elementlink="report.xml#y"/>"#,
        );

        let report = resolver
            .resolve_report(&mut xot, document, &ProjectContext::new("7", "en"), "/p7/content".as_ref())
            .unwrap();

        assert_eq!(report.links.len(), 2);
        assert!(report.all_ok());
        let xml = xot.to_string(document).unwrap();
        assert!(xml.contains(r#"class="non-editable">outer</span>"#));
        assert!(xml.contains(r#"class="non-editable"><p id="y">inner</p></i>"#));
        assert!(!xml.contains("<b "));
    }

    #[test]
    fn test_links_inside_unresolved_text_only_link_are_resolved() {
        let store = MemoryStore::default().with(
            "/p7/content/report.xml",
            r#"<data><content lang="en"><p id="y">inner</p></content></data>"#,
        );
        let resolver = resolver(store);
        let mut xot = Xot::new();
        let document = source(
            &mut xot,
            r#"<span elementlink="report.xml#missing" data-textonly="true"><b elementlink="report.xml#y" data-textonly="true"/></span>"#,
        );

        let report = resolver
            .resolve_report(&mut xot, document, &ProjectContext::new("7", "en"), "/p7/content".as_ref())
            .unwrap();

        assert_eq!(report.count(LinkStatus::TargetElementNotFound), 1);
        assert_eq!(report.count(LinkStatus::Ok), 1);
        assert!(xot
            .to_string(document)
            .unwrap()
            .contains(r#"class="non-editable">inner</b>"#));
    }

    /// Records every document the customer hook sees
    #[derive(Default)]
    struct RecordingStage {
        seen: Arc<Mutex<Vec<Node>>>,
    }

    impl crate::sync::SyncStage for RecordingStage {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn sync(
            &self,
            _xot: &mut Xot,
            document: Node,
            _input: &crate::sync::StageInput<'_>,
        ) -> Result<()> {
            self.seen.lock().unwrap().push(document);
            Ok(())
        }
    }

    #[test]
    fn test_resolve_leaves_only_the_source_in_the_arena() {
        let store = MemoryStore::default()
            .with(
                "/p7/content/a.xml",
                r#"<data><content lang="en"><p id="x" elementlink="b.xml#y"/></content></data>"#,
            )
            .with(
                "/p7/content/b.xml",
                r#"<data><content lang="en"><p id="y">deep</p></content></data>"#,
            );
        let stage = RecordingStage::default();
        let seen = stage.seen.clone();
        let resolver = resolver(store).with_collaborators(Collaborators {
            customer_hook: Box::new(stage),
            ..Collaborators::default()
        });
        let mut xot = Xot::new();
        let document = source(&mut xot, r#"<div elementlink="a.xml#x"/>"#);

        resolver
            .resolve(&mut xot, document, &ProjectContext::new("7", "en"), "/p7/content".as_ref())
            .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        for target in seen.iter() {
            assert!(xot.is_removed(*target));
        }
        assert!(!xot.is_removed(document));
        assert!(xot.to_string(document).unwrap().contains("deep"));
    }

    #[test]
    fn test_equivalent_spellings_load_once() {
        let store = Arc::new(MemoryStore::default().with(
            "/p7/content/a.xml",
            r#"<data><content lang="en"><p id="x">X</p></content></data>"#,
        ));
        let mut projects = ProjectRegistry::new();
        projects.insert("7", "/p7/content");
        let resolver = Resolver::new(Arc::new(projects)).with_store(store.clone());
        let mut xot = Xot::new();
        let document = source(
            &mut xot,
            r#"<p elementlink="a.xml#x"/><p elementlink="./a.xml#x"/><p elementlink="7|sub/../a.xml#x"/>"#,
        );

        let report = resolver
            .resolve_report(&mut xot, document, &ProjectContext::new("7", "en"), "/p7/content".as_ref())
            .unwrap();

        assert!(report.all_ok());
        assert_eq!(report.targets_loaded, 1);
        assert_eq!(store.reads.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_unparseable_query_is_wrong_format() {
        let resolver = resolver(MemoryStore::default());
        let mut xot = Xot::new();
        let document = source(&mut xot, r#"<div elementlink="a.xml/table[@id"/>"#);

        resolver
            .resolve(&mut xot, document, &ProjectContext::new("7", "en"), "/p7/content".as_ref())
            .unwrap();

        let link = first_link(&xot, document);
        assert_eq!(
            attribute(&xot, link, "data-linkstatus").as_deref(),
            Some("wrong-format")
        );
    }

    #[test]
    fn test_multiple_matches_are_all_inlined() {
        let store = MemoryStore::default().with(
            "/p7/content/a.xml",
            r#"<data><content lang="en"><li>one</li><li>two</li></content></data>"#,
        );
        let resolver = resolver(store);
        let mut xot = Xot::new();
        let document = source(&mut xot, r#"<ul elementlink="a.xml/li"/>"#);

        resolver
            .resolve(&mut xot, document, &ProjectContext::new("7", "en"), "/p7/content".as_ref())
            .unwrap();

        let link = first_link(&xot, document);
        let xml = serialize(&xot, link).unwrap();
        assert!(xml.ends_with("><li>one</li><li>two</li></ul>"));
    }

    #[test]
    fn test_text_only_with_multiple_matches_keeps_last() {
        let store = MemoryStore::default().with(
            "/p7/content/a.xml",
            r#"<data><content lang="en"><li>one</li><li>two</li></content></data>"#,
        );
        let resolver = resolver(store);
        let mut xot = Xot::new();
        let document = source(&mut xot, r#"<span elementlink="a.xml/li" data-textonly="true"/>"#);

        resolver
            .resolve(&mut xot, document, &ProjectContext::new("7", "en"), "/p7/content".as_ref())
            .unwrap();

        let link = first_link(&xot, document);
        assert!(serialize(&xot, link).unwrap().ends_with(">two</span>"));
    }

    #[test]
    fn test_source_reference_registers_cycle_start() {
        let store = MemoryStore::default().with(
            "/p7/content/b.xml",
            r#"<data><content lang="en"><p id="b" elementlink="a.xml#a"/></content></data>"#,
        );
        let resolver = resolver(store);
        let mut xot = Xot::new();
        let document = source(&mut xot, r#"<p id="a" elementlink="b.xml#b"/>"#);
        let context = ProjectContext::new("7", "en").with_source("a.xml");

        let err = resolver
            .resolve(&mut xot, document, &context, "/p7/content".as_ref())
            .unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("7:a.xml -> 7:b.xml -> 7:a.xml"));
    }

    #[test]
    fn test_document_without_language_scope_is_untouched() {
        let resolver = resolver(MemoryStore::default());
        let mut xot = Xot::new();
        let xml = r#"<data><content lang="nl"><p elementlink="a.xml#x"/></content></data>"#;
        let document = xot.parse(xml).unwrap();

        let report = resolver
            .resolve_report(&mut xot, document, &ProjectContext::new("7", "en"), "/p7/content".as_ref())
            .unwrap();
        assert!(report.links.is_empty());
        assert_eq!(xot.to_string(document).unwrap(), xml);
    }
}
