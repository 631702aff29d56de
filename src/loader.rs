//! # Target Loading and Synchronization
//!
//! Loads the target document of a reference, at most once per resolution
//! tree, and runs the synchronization chain on it before anything is inlined.
//!
//! ## Lookup order
//!
//! 1. Session cache: a document already loaded in this session is returned
//!    as is, with no read and no re-synchronization.
//! 2. Content root: the current project's folder, or the other project's root
//!    from the `ProjectPathResolver`. An unknown project is "not available".
//! 3. Cycle check: a target still being synchronized higher up the tree is a
//!    cycle, whether or not its file exists.
//! 4. Existence: a missing file is "not available" and nothing is cached.
//! 5. Read, parse and synchronize. The result is cached on success. Read or
//!    parse failures are "error" and are not cached, so a later link may
//!    retry.
//!
//! ## Stage isolation
//!
//! Every stage runs on its own copy of the document. When a stage fails the
//! copy is dropped and the previous document moves on to the next stage.
//! Fatal errors (cycles and resolution limits) are the exception: they
//! propagate out of the chain and end the whole resolution.

use std::path::{Path, PathBuf};

use log::{debug, warn};
use xot::{Node, Xot};

use crate::document::parse_document;
use crate::error::{Error, Result};
use crate::project::{data_path, ProjectContext};
use crate::reference::TargetDescriptor;
use crate::resolver::Resolver;
use crate::session::{ResolutionSession, TargetKey};
use crate::sync::{StageInput, SyncStage};

/// Name of the nested link resolution step in logs
const NESTED_STAGE: &str = "nested-links";

/// Result of looking up a target document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetOutcome {
    /// The synchronized target document
    Loaded(Node),
    /// The project or file does not exist
    NotAvailable,
    /// The file exists but could not be read or parsed
    Failed,
}

/// Where a target lives and the context it is synchronized in
struct TargetLocation {
    project: ProjectContext,
    content_folder: PathBuf,
    images_root: PathBuf,
    file_path: PathBuf,
}

impl Resolver {
    /// Load and synchronize the target of `target`, using the session cache.
    pub fn load_target(
        &self,
        xot: &mut Xot,
        target: &TargetDescriptor,
        project: &ProjectContext,
        content_folder: &Path,
        session: &mut ResolutionSession,
    ) -> Result<TargetOutcome> {
        let project_id = target.project_or(&project.project_id);
        let key = TargetKey::new(project_id, &target.data_reference);

        if let Some(document) = session.get(&key) {
            debug!("Reusing {} from the session cache", key);
            return Ok(TargetOutcome::Loaded(document));
        }

        let Some(location) = self.locate(target, project, content_folder) else {
            return Ok(TargetOutcome::NotAvailable);
        };

        session.check_cycle(&key)?;

        if !self.store.exists(&location.file_path) {
            debug!("Target {} not found at {}", key, location.file_path.display());
            return Ok(TargetOutcome::NotAvailable);
        }

        session.begin(&key)?;
        let loaded = self.load_and_sync(xot, &location, session);
        session.finish(&key);

        match loaded {
            Ok(document) => {
                session.insert(key, document);
                Ok(TargetOutcome::Loaded(document))
            }
            Err(err) if err.is_fatal() => Err(err),
            Err(err) => {
                warn!("Failed to load target {}: {}", key, err);
                Ok(TargetOutcome::Failed)
            }
        }
    }

    fn locate(
        &self,
        target: &TargetDescriptor,
        project: &ProjectContext,
        content_folder: &Path,
    ) -> Option<TargetLocation> {
        let project_id = target.project_or(&project.project_id);
        let (target_project, target_folder) = if project_id == project.project_id {
            (project.for_project(project_id), content_folder.to_path_buf())
        } else {
            match self.projects.content_root(project_id) {
                Ok(root) => (project.for_project(project_id), root),
                Err(err) => {
                    debug!("Cannot resolve project of '{}': {}", target.data_reference, err);
                    return None;
                }
            }
        };

        let Some(file_path) = data_path(&target_folder, &target.data_reference) else {
            debug!(
                "Data reference '{}' does not name a file below {}",
                target.data_reference,
                target_folder.display()
            );
            return None;
        };

        let images_root = self
            .projects
            .images_root(project_id)
            .unwrap_or_else(|_| default_images_root(&target_folder));

        Some(TargetLocation {
            project: target_project.with_source(target.data_reference.clone()),
            content_folder: target_folder,
            images_root,
            file_path,
        })
    }

    fn load_and_sync(
        &self,
        xot: &mut Xot,
        location: &TargetLocation,
        session: &mut ResolutionSession,
    ) -> Result<Node> {
        let text = self.store.read_to_string(&location.file_path)?;
        let path_label = location.file_path.display().to_string();
        let mut document = parse_document(xot, &text, Some(&path_label))?;
        debug!("Loaded {}", path_label);

        let input = StageInput {
            project: &location.project,
            file_path: &location.file_path,
            content_folder: &location.content_folder,
            images_root: &location.images_root,
            markup: &self.markup,
        };

        for stage in self.collaborators.before_nested() {
            document = run_stage(xot, document, stage, &input)?;
        }

        document = isolated(xot, document, NESTED_STAGE, &location.file_path, |xot, copy| {
            self.resolve_with_session(
                xot,
                copy,
                &location.project,
                &location.content_folder,
                session,
            )
            .map(|_| ())
        })?;

        for stage in self.collaborators.after_nested() {
            document = run_stage(xot, document, stage, &input)?;
        }
        Ok(document)
    }
}

/// Run one synchronization stage with failure isolation
pub(crate) fn run_stage(
    xot: &mut Xot,
    document: Node,
    stage: &dyn SyncStage,
    input: &StageInput<'_>,
) -> Result<Node> {
    if stage.is_noop() {
        return Ok(document);
    }
    isolated(xot, document, stage.name(), input.file_path, |xot, copy| {
        stage.sync(xot, copy, input)
    })
}

/// Apply `step` to a copy of `document`.
///
/// Returns the updated copy, or the untouched original when the step fails
/// with a non-fatal error. Whichever document is not returned is removed from
/// the arena; on a fatal error both are.
fn isolated<F>(xot: &mut Xot, document: Node, name: &str, file_path: &Path, step: F) -> Result<Node>
where
    F: FnOnce(&mut Xot, Node) -> Result<()>,
{
    let copy = xot.clone_node(document);
    match step(xot, copy) {
        Ok(()) => {
            xot.remove(document).map_err(Error::xml)?;
            Ok(copy)
        }
        Err(err) if err.is_fatal() => {
            xot.remove(copy).map_err(Error::xml)?;
            xot.remove(document).map_err(Error::xml)?;
            Err(err)
        }
        Err(err) => {
            warn!(
                "Stage '{}' failed for {}, keeping the document unchanged: {}",
                name,
                file_path.display(),
                err
            );
            xot.remove(copy).map_err(Error::xml)?;
            Ok(document)
        }
    }
}

fn default_images_root(content_folder: &Path) -> PathBuf {
    content_folder
        .parent()
        .map(|parent| parent.join("images"))
        .unwrap_or_else(|| content_folder.join("images"))
}
