//! Synchronization stages applied to every loaded target document
//!
//! Before a target's content is inlined anywhere, it is brought in line with
//! the authoritative caches. The loader runs the stages in a fixed order:
//!
//! 1. external-table cache
//! 2. structured-fact cache
//! 3. footnote cache
//! 4. nested link resolution (run by the resolver itself, not a `SyncStage`)
//! 5. image processing
//! 6. graph processing
//! 7. customer-specific hook
//!
//! Each stage works on its own copy of the document. A stage that fails is
//! logged and its copy dropped, so the document moves on to the next stage
//! exactly as it was before the failing one.
//!
//! `Collaborators` defaults to no-op stages. `Collaborators::from_config`
//! wires the cache-backed implementations in this module to the JSON files
//! named in the configuration.

pub mod facts;
pub mod footnotes;
pub mod images;
pub mod markup_cache;

use std::collections::HashMap;
use std::path::Path;

use xot::{Node, Xot};

use crate::config::{Config, Markup};
use crate::document::attribute;
use crate::error::Result;
use crate::project::ProjectContext;

pub use facts::FactCacheSync;
pub use footnotes::FootnoteCacheSync;
pub use images::ImageSync;
pub use markup_cache::MarkupCacheSync;

/// Everything a stage may need to know about the document it synchronizes
#[derive(Debug, Clone, Copy)]
pub struct StageInput<'a> {
    /// Project and language of the target document
    pub project: &'a ProjectContext,
    /// Absolute path of the target file
    pub file_path: &'a Path,
    /// Content root of the target's project
    pub content_folder: &'a Path,
    /// Image root of the target's project
    pub images_root: &'a Path,
    pub markup: &'a Markup,
}

/// One step of the synchronization chain
pub trait SyncStage: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &'static str;

    /// Update `document` in place.
    fn sync(&self, xot: &mut Xot, document: Node, input: &StageInput<'_>) -> Result<()>;

    /// Stages that never change anything are skipped without copying the
    /// document.
    fn is_noop(&self) -> bool {
        false
    }
}

/// A stage that leaves documents untouched
#[derive(Debug, Clone, Copy)]
pub struct NoOpStage {
    name: &'static str,
}

impl NoOpStage {
    pub fn new(name: &'static str) -> Self {
        Self { name }
    }
}

impl SyncStage for NoOpStage {
    fn name(&self) -> &'static str {
        self.name
    }

    fn sync(&self, _xot: &mut Xot, _document: Node, _input: &StageInput<'_>) -> Result<()> {
        Ok(())
    }

    fn is_noop(&self) -> bool {
        true
    }
}

/// The stages of the synchronization chain, one slot per collaborator
pub struct Collaborators {
    pub external_tables: Box<dyn SyncStage>,
    pub facts: Box<dyn SyncStage>,
    pub footnotes: Box<dyn SyncStage>,
    pub images: Box<dyn SyncStage>,
    pub graphs: Box<dyn SyncStage>,
    pub customer_hook: Box<dyn SyncStage>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            external_tables: Box::new(NoOpStage::new("external-tables")),
            facts: Box::new(NoOpStage::new("facts")),
            footnotes: Box::new(NoOpStage::new("footnotes")),
            images: Box::new(NoOpStage::new("images")),
            graphs: Box::new(NoOpStage::new("graphs")),
            customer_hook: Box::new(NoOpStage::new("customer-hook")),
        }
    }
}

impl Collaborators {
    /// Build the chain from the cache files named in the configuration.
    ///
    /// Caches that are not configured keep their no-op stage. Image checking
    /// is always enabled.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut collaborators = Self {
            images: Box::new(ImageSync),
            ..Self::default()
        };
        if let Some(path) = &config.caches.tables {
            collaborators.external_tables = Box::new(MarkupCacheSync::external_tables(
                load_string_map(path)?,
            ));
        }
        if let Some(path) = &config.caches.facts {
            collaborators.facts = Box::new(FactCacheSync::from_file(path)?);
        }
        if let Some(path) = &config.caches.footnotes {
            collaborators.footnotes = Box::new(FootnoteCacheSync::from_file(path)?);
        }
        if let Some(path) = &config.caches.graphs {
            collaborators.graphs = Box::new(MarkupCacheSync::graphs(load_string_map(path)?));
        }
        Ok(collaborators)
    }

    /// Stages that run before nested link resolution, in order
    pub fn before_nested(&self) -> [&dyn SyncStage; 3] {
        [
            self.external_tables.as_ref(),
            self.facts.as_ref(),
            self.footnotes.as_ref(),
        ]
    }

    /// Stages that run after nested link resolution, in order
    pub fn after_nested(&self) -> [&dyn SyncStage; 3] {
        [
            self.images.as_ref(),
            self.graphs.as_ref(),
            self.customer_hook.as_ref(),
        ]
    }
}

/// Read a flat `{ "key": "value" }` JSON file
pub fn load_string_map(path: &Path) -> Result<HashMap<String, String>> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Elements below `root` that carry `name`, with the attribute value
pub(crate) fn elements_with_attribute(xot: &Xot, root: Node, name: &str) -> Vec<(Node, String)> {
    xot.descendants(root)
        .filter(|node| xot.is_element(*node))
        .filter_map(|node| attribute(xot, node, name).map(|value| (node, value)))
        .collect()
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::PathBuf;

    use super::*;

    /// Owned values behind a `StageInput`
    pub struct StageFixture {
        pub project: ProjectContext,
        pub file_path: PathBuf,
        pub content_folder: PathBuf,
        pub images_root: PathBuf,
        pub markup: Markup,
    }

    impl StageFixture {
        pub fn new(images_root: impl Into<PathBuf>) -> Self {
            Self {
                project: ProjectContext::new("7", "en"),
                file_path: PathBuf::from("/content/a.xml"),
                content_folder: PathBuf::from("/content"),
                images_root: images_root.into(),
                markup: Markup::default(),
            }
        }

        pub fn input(&self) -> StageInput<'_> {
            StageInput {
                project: &self.project,
                file_path: &self.file_path,
                content_folder: &self.content_folder,
                images_root: &self.images_root,
                markup: &self.markup,
            }
        }
    }
}
