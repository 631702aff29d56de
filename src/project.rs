//! Project context and cross-project path resolution
//!
//! The resolver never consults an ambient "current project". Each call gets a
//! `ProjectContext` value, and references into other projects are resolved
//! through a `ProjectPathResolver`, which yields that project's own content
//! root.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use crate::config::{Config, ProjectEntry};
use crate::error::{Error, Result};

/// The project and language a document is resolved for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectContext {
    pub project_id: String,
    /// Language of the content scope (`<content lang="...">`)
    pub lang: String,
    /// Data reference of the document being resolved, when it is a stored
    /// fragment. Registering it lets a target that links straight back to it
    /// be reported as a cycle.
    pub source_reference: Option<String>,
}

impl ProjectContext {
    pub fn new(project_id: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            lang: lang.into(),
            source_reference: None,
        }
    }

    /// Set the data reference of the source document
    pub fn with_source(mut self, data_reference: impl Into<String>) -> Self {
        self.source_reference = Some(data_reference.into());
        self
    }

    /// Context for a document in another project, keeping the language
    pub fn for_project(&self, project_id: &str) -> Self {
        Self {
            project_id: project_id.to_string(),
            lang: self.lang.clone(),
            source_reference: None,
        }
    }
}

/// Resolves a project id to the absolute root of its regular content.
pub trait ProjectPathResolver: Send + Sync {
    fn content_root(&self, project_id: &str) -> Result<PathBuf>;

    /// Root folder for images of a project
    fn images_root(&self, project_id: &str) -> Result<PathBuf> {
        Ok(self
            .content_root(project_id)?
            .parent()
            .map(|parent| parent.join("images"))
            .unwrap_or_else(|| PathBuf::from("images")))
    }
}

/// Project table built from configuration
#[derive(Debug, Clone, Default)]
pub struct ProjectRegistry {
    projects: BTreeMap<String, ProjectEntry>,
}

impl ProjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            projects: config.projects.clone(),
        }
    }

    /// Register or replace a project
    pub fn insert(&mut self, project_id: impl Into<String>, content_root: impl Into<PathBuf>) {
        self.projects.insert(
            project_id.into(),
            ProjectEntry {
                content_root: content_root.into(),
                images_root: None,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }
}

impl ProjectPathResolver for ProjectRegistry {
    fn content_root(&self, project_id: &str) -> Result<PathBuf> {
        self.projects
            .get(project_id)
            .map(|entry| entry.content_root.clone())
            .ok_or_else(|| Error::UnknownProject {
                project_id: project_id.to_string(),
            })
    }

    fn images_root(&self, project_id: &str) -> Result<PathBuf> {
        self.projects
            .get(project_id)
            .map(ProjectEntry::images_root)
            .ok_or_else(|| Error::UnknownProject {
                project_id: project_id.to_string(),
            })
    }
}

/// Lexically normalize a data reference.
///
/// `.` segments are dropped, `..` cancels the segment before it and
/// separators become `/`, so `./notes/../a.xml` and `a.xml` name the same
/// fragment. Returns `None` when the reference is absolute, climbs out of the
/// root, or names nothing.
///
/// ```
/// use fragment_link::project::normalize_data_reference;
///
/// assert_eq!(normalize_data_reference("./notes/../a.xml").as_deref(), Some("a.xml"));
/// assert_eq!(normalize_data_reference("../a.xml"), None);
/// ```
pub fn normalize_data_reference(data_reference: &str) -> Option<String> {
    let mut segments: Vec<String> = Vec::new();
    for component in Path::new(data_reference).components() {
        match component {
            Component::Normal(segment) => segments.push(segment.to_string_lossy().into_owned()),
            Component::CurDir => {}
            Component::ParentDir => {
                segments.pop()?;
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if segments.is_empty() {
        return None;
    }
    Some(segments.join("/"))
}

/// Join a data reference onto a content root.
///
/// Returns `None` when the reference is absolute or climbs out of the root
/// with `..`; such references can never name a fragment of the project.
pub fn data_path(content_root: &Path, data_reference: &str) -> Option<PathBuf> {
    normalize_data_reference(data_reference).map(|relative| content_root.join(relative))
}
