//! # Configuration Schema and Parsing
//!
//! This module defines the YAML configuration that drives a resolution run and
//! the logic for parsing it.
//!
//! ## Key Components
//!
//! - **`Config`**: The root of the file. Every section is optional and falls
//!   back to its defaults, so an empty file is a valid configuration.
//!
//! - **`ProjectEntry`**: Where one project's fragments live on disk. Cross
//!   project references (`42|report.xml#id`) are resolved through this table.
//!
//! - **`Limits`**: Bounds on a single resolution tree (nesting depth, number of
//!   distinct targets, wall-clock deadline).
//!
//! - **`Markup`**: The attribute and element names the resolver reads and
//!   writes. The defaults match the authoring editor; they are configurable so
//!   that other content models can use the same pipeline.
//!
//! - **`CacheFiles`**: Optional JSON files that back the fact, footnote,
//!   external-table and graph synchronization stages.
//!
//! ## Example
//!
//! ```yaml
//! projects:
//!   "7":
//!     content_root: /srv/reports/7/content
//!   "42":
//!     content_root: /srv/reports/42/content
//!     images_root: /srv/reports/42/images
//! limits:
//!   max_depth: 8
//! caches:
//!   facts: /srv/reports/cache/facts.json
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Root of the configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Known projects, keyed by project id
    pub projects: BTreeMap<String, ProjectEntry>,
    /// Bounds for one resolution tree
    pub limits: Limits,
    /// Attribute and element names used in fragment content
    pub markup: Markup,
    /// Backing files for the cache synchronization stages
    pub caches: CacheFiles,
}

/// Location of one project's content on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectEntry {
    /// Root folder of the project's regular content (data references are
    /// relative to this folder)
    pub content_root: PathBuf,
    /// Root folder for images referenced from content. Defaults to an
    /// `images` folder next to the content root.
    #[serde(default)]
    pub images_root: Option<PathBuf>,
}

impl ProjectEntry {
    /// The folder image references are checked against
    pub fn images_root(&self) -> PathBuf {
        match &self.images_root {
            Some(root) => root.clone(),
            None => self
                .content_root
                .parent()
                .map(|parent| parent.join("images"))
                .unwrap_or_else(|| PathBuf::from("images")),
        }
    }
}

/// Bounds applied to a single resolution tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Maximum nesting of target documents below the source document
    pub max_depth: usize,
    /// Maximum number of distinct target documents loaded
    pub max_targets: usize,
    /// Wall-clock budget for the whole tree, in milliseconds. `None` disables
    /// the deadline.
    pub deadline_ms: Option<u64>,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            max_targets: 1000,
            deadline_ms: Some(30_000),
        }
    }
}

impl Limits {
    /// The deadline as a `Duration`, if one is configured
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_ms.map(Duration::from_millis)
    }
}

/// Get the default maximum resolution depth
///
/// # Examples
///
/// ```
/// use fragment_link::config::default_max_depth;
///
/// assert_eq!(default_max_depth(), 16);
/// ```
pub fn default_max_depth() -> usize {
    16
}

/// Names of the attributes and elements the resolver works with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Markup {
    /// Element holding one language's content below the document element
    pub content_element: String,
    /// Attribute on the content element naming its language
    pub lang_attribute: String,
    /// Attribute carrying an element-level reference
    pub element_link: String,
    /// Attribute carrying a whole-fragment reference
    pub section_link: String,
    /// Comma-separated attribute names to strip from the imported root
    pub remove_attributes: String,
    /// Comma-separated `name:value` pairs to set on the imported root
    pub add_attributes: String,
    /// Flag: remove footnote markers from the imported subtree
    pub strip_footnotes: String,
    /// Tag name to rename the inserted element to
    pub rename_tag: String,
    /// Flag: inline the target's text instead of its structure
    pub text_only: String,
    /// Attribute receiving the link status
    pub status_attribute: String,
    /// Editable hint set to `false` on resolved links
    pub editable_attribute: String,
    /// Class token marking resolved links as non-editable
    pub non_editable_class: String,
    /// Attributes an id selector is matched against, in priority order
    pub id_attributes: Vec<String>,
    /// Element name of footnote reference superscripts
    pub footnote_marker_element: String,
    /// Class token a footnote superscript carries
    pub footnote_marker_class: String,
    /// Class token marking footnote content
    pub footnote_class: String,
    /// Text of the comment left inside cleaned link elements
    pub placeholder_comment: String,
    /// Attribute naming the structured fact an element displays
    pub fact_id_attribute: String,
    /// Attribute naming the footnote an element shows
    pub footnote_id_attribute: String,
    /// Attribute on external table placeholders
    pub external_table_attribute: String,
    /// Attribute on graph placeholders
    pub graph_attribute: String,
    /// Attribute flagging an image whose file is missing
    pub image_status_attribute: String,
}

impl Default for Markup {
    fn default() -> Self {
        Self {
            content_element: "content".to_string(),
            lang_attribute: "lang".to_string(),
            element_link: "elementlink".to_string(),
            section_link: "sectionlink".to_string(),
            remove_attributes: "data-removeattributes".to_string(),
            add_attributes: "data-addattributes".to_string(),
            strip_footnotes: "data-stripfootnotes".to_string(),
            rename_tag: "data-renametag".to_string(),
            text_only: "data-textonly".to_string(),
            status_attribute: "data-linkstatus".to_string(),
            editable_attribute: "contenteditable".to_string(),
            non_editable_class: "non-editable".to_string(),
            id_attributes: vec![
                "data-shareid".to_string(),
                "data-guid".to_string(),
                "id".to_string(),
            ],
            footnote_marker_element: "sup".to_string(),
            footnote_marker_class: "fn".to_string(),
            footnote_class: "footnote".to_string(),
            placeholder_comment: "linked content".to_string(),
            fact_id_attribute: "data-fact-id".to_string(),
            footnote_id_attribute: "data-footnote-id".to_string(),
            external_table_attribute: "data-external-table-id".to_string(),
            graph_attribute: "data-graph-id".to_string(),
            image_status_attribute: "data-image-status".to_string(),
        }
    }
}

/// JSON files backing the cache synchronization stages
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheFiles {
    /// `{ "<fact id>": "<value>" }`
    pub facts: Option<PathBuf>,
    /// `{ "<lang>": { "<footnote id>": "<text>" } }`
    pub footnotes: Option<PathBuf>,
    /// `{ "<table id>": "<xml fragment>" }`
    pub tables: Option<PathBuf>,
    /// `{ "<graph id>": "<xml fragment>" }`
    pub graphs: Option<PathBuf>,
}

/// Parses a YAML string into a `Config` and validates it.
pub fn parse(yaml_content: &str) -> Result<Config> {
    // An empty or comment-only file deserializes to `null`
    let config: Option<Config> = serde_yaml::from_str(yaml_content).map_err(Error::Yaml)?;
    let config = config.unwrap_or_default();
    validate(&config)?;
    Ok(config)
}

/// Reads and parses a configuration file
pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(Error::Io)?;
    parse(&content)
}

fn validate(config: &Config) -> Result<()> {
    for (id, entry) in &config.projects {
        if id.trim().is_empty() {
            return Err(Error::ConfigParse {
                message: "Project id must not be empty".to_string(),
                hint: None,
            });
        }
        if id.contains('|') {
            return Err(Error::ConfigParse {
                message: format!("Project id '{}' contains '|'", id),
                hint: Some("'|' separates the project id from the data reference".to_string()),
            });
        }
        if entry.content_root.as_os_str().is_empty() {
            return Err(Error::ConfigParse {
                message: format!("Project '{}' has an empty content_root", id),
                hint: Some("Add 'content_root:' to the project entry".to_string()),
            });
        }
    }

    if config.limits.max_depth == 0 || config.limits.max_targets == 0 {
        return Err(Error::ConfigParse {
            message: "limits.max_depth and limits.max_targets must be positive".to_string(),
            hint: None,
        });
    }

    if config.markup.element_link.is_empty() || config.markup.status_attribute.is_empty() {
        return Err(Error::ConfigParse {
            message: "markup.element_link and markup.status_attribute must not be empty"
                .to_string(),
            hint: None,
        });
    }

    Ok(())
}
