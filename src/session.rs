//! Per-resolution state shared by every recursive resolver call
//!
//! One `ResolutionSession` is created for each top-level resolution and passed
//! by `&mut` into every nested call, including the nested link resolution run
//! by the synchronization chain of each target. It holds:
//!
//! - the document cache: target key → loaded and synchronized document, so a
//!   target is read and synchronized at most once per resolution tree;
//! - the in-progress path: targets whose synchronization has started but not
//!   finished. Requesting one of those again means the references form a
//!   cycle, which is reported as `Error::CycleDetected` instead of recursing;
//! - the bounds from `Limits`: nesting depth, number of distinct loads, and
//!   the deadline.
//!
//! Sessions are not shared between top-level resolutions, so independent
//! documents can be resolved in parallel with one session each.

use std::collections::HashMap;
use std::fmt;
use std::time::Instant;

use xot::{Node, Xot};

use crate::config::Limits;
use crate::error::{Error, Result};
use crate::project::normalize_data_reference;

/// Identity of a target document within a resolution tree
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetKey {
    pub project_id: String,
    pub data_reference: String,
}

impl TargetKey {
    /// Key for `data_reference` in `project_id`. Equivalent spellings of the
    /// same path (`a.xml`, `./a.xml`) give the same key.
    pub fn new(project_id: &str, data_reference: &str) -> Self {
        Self {
            project_id: project_id.to_string(),
            data_reference: normalize_data_reference(data_reference)
                .unwrap_or_else(|| data_reference.to_string()),
        }
    }
}

impl fmt::Display for TargetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.project_id, self.data_reference)
    }
}

/// Cache, in-progress path and limits for one resolution tree
#[derive(Debug)]
pub struct ResolutionSession {
    documents: HashMap<TargetKey, Node>,
    in_progress: Vec<TargetKey>,
    open_targets: usize,
    loads: usize,
    limits: Limits,
    started: Instant,
}

impl ResolutionSession {
    pub fn new(limits: Limits) -> Self {
        Self {
            documents: HashMap::new(),
            in_progress: Vec::new(),
            open_targets: 0,
            loads: 0,
            limits,
            started: Instant::now(),
        }
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// A synchronized document already loaded in this session
    pub fn get(&self, key: &TargetKey) -> Option<Node> {
        self.documents.get(key).copied()
    }

    pub fn insert(&mut self, key: TargetKey, document: Node) {
        self.documents.insert(key, document);
    }

    pub fn contains(&self, key: &TargetKey) -> bool {
        self.documents.contains_key(key)
    }

    /// Remove every cached document from the arena and empty the cache.
    ///
    /// Called when the resolution tree is done: nodes inlined into the source
    /// are copies, so nothing outside the session refers to these documents.
    pub fn release(&mut self, xot: &mut Xot) -> Result<()> {
        for (_, document) in self.documents.drain() {
            xot.remove(document).map_err(Error::xml)?;
        }
        Ok(())
    }

    /// Number of cached documents
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Number of target loads started in this session
    pub fn loads(&self) -> usize {
        self.loads
    }

    /// Current nesting of target documents below the source document
    pub fn depth(&self) -> usize {
        self.open_targets
    }

    /// Whether `key` is somewhere on the current resolution path
    pub fn is_in_progress(&self, key: &TargetKey) -> bool {
        self.in_progress.contains(key)
    }

    /// Put the source document on the path so links back to it are cycles.
    pub fn enter_source(&mut self, key: TargetKey) {
        self.in_progress.push(key);
    }

    /// Fail once the deadline has passed
    pub fn check_deadline(&self) -> Result<()> {
        if let Some(deadline) = self.limits.deadline() {
            if self.started.elapsed() > deadline {
                return Err(Error::DeadlineExceeded {
                    limit_ms: self.limits.deadline_ms.unwrap_or_default(),
                });
            }
        }
        Ok(())
    }

    /// Start loading `key`, enforcing cycle detection and every limit.
    ///
    /// Each successful `begin` must be paired with `finish` for the same key.
    pub fn begin(&mut self, key: &TargetKey) -> Result<()> {
        self.check_cycle(key)?;

        if self.open_targets >= self.limits.max_depth {
            return Err(Error::DepthExceeded {
                depth: self.open_targets + 1,
                limit: self.limits.max_depth,
                path: self.path_with(key),
            });
        }

        if self.loads >= self.limits.max_targets {
            return Err(Error::TargetLimitExceeded {
                limit: self.limits.max_targets,
            });
        }

        self.check_deadline()?;

        self.in_progress.push(key.clone());
        self.open_targets += 1;
        self.loads += 1;
        Ok(())
    }

    /// Fail when `key` is already on the in-progress path
    pub fn check_cycle(&self, key: &TargetKey) -> Result<()> {
        if let Some(position) = self.in_progress.iter().position(|open| open == key) {
            let mut cycle: Vec<String> = self.in_progress[position..]
                .iter()
                .map(ToString::to_string)
                .collect();
            cycle.push(key.to_string());
            return Err(Error::CycleDetected {
                cycle: cycle.join(" -> "),
            });
        }
        Ok(())
    }

    /// Take `key` off the in-progress path
    pub fn finish(&mut self, key: &TargetKey) {
        if let Some(position) = self.in_progress.iter().rposition(|open| open == key) {
            self.in_progress.remove(position);
            self.open_targets = self.open_targets.saturating_sub(1);
        }
    }

    fn path_with(&self, key: &TargetKey) -> String {
        self.in_progress
            .iter()
            .chain(std::iter::once(key))
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}
