//! Shared test utilities for integration and E2E tests.
//!
//! This module provides project fixtures on a temporary directory and helpers
//! for building resolvers and reading back resolved documents.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = ProjectFixture::new().with_fragment("7", "a.xml", &fragment("<p id='x'/>"));
//!     // ... test code
//! }
//! ```

#![allow(dead_code)]

use assert_fs::prelude::*;
use assert_fs::TempDir;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use fragment_link::store::{ContentStore, DiskStore};
use fragment_link::{ProjectRegistry, Resolver};
use xot::{Node, Xot};

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    #[allow(unused_imports)]
    pub use assert_cmd::cargo::cargo_bin_cmd;
    #[allow(unused_imports)]
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use predicates::prelude::*;

    pub use super::{fragment, fragment_in, link_status, CountingStore, ProjectFixture};
}

/// Wrap `body` in a fragment document with English content
pub fn fragment(body: &str) -> String {
    fragment_in("en", body)
}

/// Wrap `body` in a fragment document with content in `lang`
pub fn fragment_in(lang: &str, body: &str) -> String {
    format!(r#"<data><content lang="{}">{}</content></data>"#, lang, body)
}

/// Status attribute of the first element carrying `elementlink="reference"`
pub fn link_status(xot: &Xot, document: Node, reference: &str) -> Option<String> {
    let link = find_link(xot, document, reference)?;
    attribute(xot, link, "data-linkstatus")
}

/// The first element link with the given reference
pub fn find_link(xot: &Xot, document: Node, reference: &str) -> Option<Node> {
    xot.descendants(document)
        .find(|node| attribute(xot, *node, "elementlink").as_deref() == Some(reference))
}

pub fn attribute(xot: &Xot, node: Node, name: &str) -> Option<String> {
    fragment_link::document::attribute(xot, node, name)
}

/// Projects "7" and "42" laid out as `<temp>/<id>/content` with an `images`
/// folder next to each content root.
pub struct ProjectFixture {
    pub temp: TempDir,
}

impl ProjectFixture {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp directory");
        for project in ["7", "42"] {
            temp.child(project)
                .child("content")
                .create_dir_all()
                .expect("Failed to create content root");
            temp.child(project)
                .child("images")
                .create_dir_all()
                .expect("Failed to create images root");
        }
        Self { temp }
    }

    /// Write a fragment below a project's content root
    pub fn with_fragment(self, project: &str, data_reference: &str, xml: &str) -> Self {
        self.write_fragment(project, data_reference, xml);
        self
    }

    pub fn write_fragment(&self, project: &str, data_reference: &str, xml: &str) {
        self.temp
            .child(project)
            .child("content")
            .child(data_reference)
            .write_str(xml)
            .expect("Failed to write fragment");
    }

    /// Write a file below a project's images root
    pub fn with_image(self, project: &str, name: &str) -> Self {
        self.temp
            .child(project)
            .child("images")
            .child(name)
            .write_binary(b"\x89PNG")
            .expect("Failed to write image");
        self
    }

    pub fn content_root(&self, project: &str) -> PathBuf {
        self.temp.path().join(project).join("content")
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    pub fn registry(&self) -> ProjectRegistry {
        let mut registry = ProjectRegistry::new();
        for project in ["7", "42"] {
            registry.insert(project, self.content_root(project));
        }
        registry
    }

    pub fn resolver(&self) -> Resolver {
        Resolver::new(Arc::new(self.registry()))
    }

    /// YAML configuration naming both projects
    pub fn config_yaml(&self) -> String {
        format!(
            "projects:\n  \"7\":\n    content_root: {}\n  \"42\":\n    content_root: {}\n",
            self.content_root("7").display(),
            self.content_root("42").display()
        )
    }
}

impl Default for ProjectFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Disk store that counts reads
#[derive(Default)]
pub struct CountingStore {
    reads: AtomicUsize,
}

impl CountingStore {
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl ContentStore for CountingStore {
    fn exists(&self, path: &Path) -> bool {
        DiskStore.exists(path)
    }

    fn read_to_string(&self, path: &Path) -> fragment_link::Result<String> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        DiskStore.read_to_string(path)
    }
}
