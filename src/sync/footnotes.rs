//! Footnote text for the active language
//!
//! Footnote elements carry `data-footnote-id`; their text lives in a cache
//! keyed by language. Only the content scope of the target's language is
//! touched.

use std::collections::HashMap;
use std::path::Path;

use log::debug;
use xot::{Node, Xot};

use super::{elements_with_attribute, StageInput, SyncStage};
use crate::document::{content_scope, set_text};
use crate::error::Result;

/// Inlines footnote text from `{ "<lang>": { "<footnote id>": "<text>" } }`
#[derive(Debug, Clone, Default)]
pub struct FootnoteCacheSync {
    texts: HashMap<String, HashMap<String, String>>,
}

impl FootnoteCacheSync {
    pub fn new(texts: HashMap<String, HashMap<String, String>>) -> Self {
        Self { texts }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::new(serde_json::from_str(&content)?))
    }
}

impl SyncStage for FootnoteCacheSync {
    fn name(&self) -> &'static str {
        "footnotes"
    }

    fn sync(&self, xot: &mut Xot, document: Node, input: &StageInput<'_>) -> Result<()> {
        let lang = &input.project.lang;
        let Some(texts) = self.texts.get(lang) else {
            debug!("No cached footnotes for language '{}'", lang);
            return Ok(());
        };
        let Some(scope) = content_scope(xot, document, input.markup, lang) else {
            return Ok(());
        };

        for (element, footnote_id) in elements_with_attribute(xot, scope, &input.markup.footnote_id_attribute) {
            if let Some(text) = texts.get(&footnote_id) {
                set_text(xot, element, text)?;
            }
        }
        Ok(())
    }
}
