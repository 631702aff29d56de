//! Cached markup for external tables and generated graphs
//!
//! Both caches map an id to a ready-made XML fragment: the rendered table for
//! an externally sourced table, the chart markup for a graph. Placeholder
//! elements carry the id in a stage-specific attribute and have their children
//! replaced by a copy of the cached fragment. A cached fragment that is not
//! well-formed fails the whole stage, leaving the document as it was.

use std::collections::HashMap;

use log::debug;
use xot::{Node, Xot};

use super::{elements_with_attribute, StageInput, SyncStage};
use crate::config::Markup;
use crate::document::{clear_children, parse_fragment};
use crate::error::{Error, Result};

/// Which placeholders a markup cache fills
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placeholder {
    ExternalTable,
    Graph,
}

impl Placeholder {
    fn attribute(self, markup: &Markup) -> &str {
        match self {
            Placeholder::ExternalTable => &markup.external_table_attribute,
            Placeholder::Graph => &markup.graph_attribute,
        }
    }
}

/// Replaces placeholder content with cached fragments
#[derive(Debug, Clone)]
pub struct MarkupCacheSync {
    name: &'static str,
    placeholder: Placeholder,
    fragments: HashMap<String, String>,
}

impl MarkupCacheSync {
    /// Stage for externally sourced tables
    pub fn external_tables(fragments: HashMap<String, String>) -> Self {
        Self {
            name: "external-tables",
            placeholder: Placeholder::ExternalTable,
            fragments,
        }
    }

    /// Stage for generated graphs
    pub fn graphs(fragments: HashMap<String, String>) -> Self {
        Self {
            name: "graphs",
            placeholder: Placeholder::Graph,
            fragments,
        }
    }
}

impl SyncStage for MarkupCacheSync {
    fn name(&self) -> &'static str {
        self.name
    }

    fn sync(&self, xot: &mut Xot, document: Node, input: &StageInput<'_>) -> Result<()> {
        let attribute = self.placeholder.attribute(input.markup);
        for (element, id) in elements_with_attribute(xot, document, attribute) {
            let Some(fragment) = self.fragments.get(&id) else {
                debug!(
                    "No cached {} entry '{}' for {}",
                    self.name,
                    id,
                    input.file_path.display()
                );
                continue;
            };
            let copy = parse_fragment(xot, fragment).map_err(|err| Error::Stage {
                stage: self.name.to_string(),
                message: format!("cached entry '{}' is not well-formed: {}", id, err),
            })?;
            clear_children(xot, element)?;
            xot.append(element, copy).map_err(Error::xml)?;
        }
        Ok(())
    }
}
