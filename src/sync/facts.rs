//! Structured fact (SDE) values
//!
//! Elements tagged with the fact id attribute (`data-fact-id` by default)
//! display a value owned by the fact
//! cache. The stage overwrites their text with the cached value so inlined
//! content never shows a stale figure.

use std::collections::HashMap;
use std::path::Path;

use log::debug;
use xot::{Node, Xot};

use super::{elements_with_attribute, load_string_map, StageInput, SyncStage};
use crate::document::set_text;
use crate::error::Result;

/// Refreshes fact values from an in-memory copy of the fact cache
#[derive(Debug, Clone, Default)]
pub struct FactCacheSync {
    values: HashMap<String, String>,
}

impl FactCacheSync {
    pub fn new(values: HashMap<String, String>) -> Self {
        Self { values }
    }

    /// Load `{ "<fact id>": "<value>" }` from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        Ok(Self::new(load_string_map(path)?))
    }
}

impl SyncStage for FactCacheSync {
    fn name(&self) -> &'static str {
        "facts"
    }

    fn sync(&self, xot: &mut Xot, document: Node, input: &StageInput<'_>) -> Result<()> {
        for (element, fact_id) in elements_with_attribute(xot, document, &input.markup.fact_id_attribute) {
            match self.values.get(&fact_id) {
                Some(value) => set_text(xot, element, value)?,
                None => debug!(
                    "Fact '{}' in {} (project {}) is not in the fact cache",
                    fact_id,
                    input.file_path.display(),
                    input.project.project_id
                ),
            }
        }
        Ok(())
    }
}
