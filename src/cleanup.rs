//! # Cleanup before save
//!
//! Resolution injects content and markers into link elements that must never
//! reach the stored fragment. The cleanup pass reverses that: every element
//! link in the language-scoped content loses its status attribute, editable
//! hint and non-editable class, and its content is replaced by a single
//! placeholder comment so the element never serializes as self-closing.
//!
//! Discovery and stripping repeat until a pass finds nothing left to clean.
//!
//! `save_document` is the persistence path: it always runs the cleanup pass
//! before writing.

use std::path::Path;

use log::debug;
use xot::{Node, Xot};

use crate::config::Markup;
use crate::document::{content_scope, outermost, serialize};
use crate::error::{Error, Result};
use crate::links::{clear_link, discover_links, needs_cleanup, LinkKind};

/// Strip resolution artifacts from every element link. Returns the number of
/// link elements that were cleaned.
pub fn cleanup_links(xot: &mut Xot, document: Node, markup: &Markup, lang: &str) -> Result<usize> {
    let Some(scope) = content_scope(xot, document, markup, lang) else {
        return Ok(0);
    };

    let mut cleaned = 0;
    let mut passes = 0;
    loop {
        let dirty: Vec<Node> = discover_links(xot, scope, markup)
            .into_iter()
            .filter(|link| link.kind == LinkKind::Element)
            .map(|link| link.node)
            .filter(|node| needs_cleanup(xot, *node, markup))
            .collect();
        if dirty.is_empty() {
            break;
        }
        passes += 1;

        // Links nested in a dirty link are dropped with its content
        for node in outermost(xot, &dirty) {
            clear_link(xot, node, markup)?;
            cleaned += 1;
        }
    }

    debug!("Cleaned {} link elements in {} passes", cleaned, passes);
    Ok(cleaned)
}

/// Clean `document` and write it to `path`, creating parent directories.
pub fn save_document(
    xot: &mut Xot,
    document: Node,
    markup: &Markup,
    lang: &str,
    path: &Path,
) -> Result<()> {
    cleanup_links(xot, document, markup, lang)?;
    let xml = serialize(xot, document)?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| Error::Filesystem {
                message: format!("Failed to create directory '{}': {}", parent.display(), e),
            })?;
        }
    }
    std::fs::write(path, xml).map_err(|e| Error::Filesystem {
        message: format!("Failed to write '{}': {}", path.display(), e),
    })
}
