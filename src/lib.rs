//! # Fragment Link Library
//!
//! This library resolves cross-document references between stored XML
//! content fragments. A fragment can embed elements of another fragment,
//! possibly in another project, through link elements such as
//!
//! ```xml
//! <div elementlink="42|report.xml#sde-123" data-removeattributes="style"/>
//! ```
//!
//! Resolution inlines the referenced element into the link element in memory.
//! Before a resolved document is stored again, the cleanup pass removes
//! everything resolution injected.
//!
//! ## Quick Example
//!
//! ```
//! use fragment_link::reference::{parse_reference, SelectorType};
//! use fragment_link::config;
//!
//! // Parse an author-facing reference
//! let target = parse_reference("42|report.xml#sde-123");
//! assert_eq!(target.project_id, "42");
//! assert_eq!(target.selector_type, SelectorType::Id);
//!
//! // Parse a configuration
//! let config_yaml = r#"
//! projects:
//!   "7":
//!     content_root: /data/p7/content
//! "#;
//! let config = config::parse(config_yaml).unwrap();
//! assert_eq!(config.projects.len(), 1);
//! ```
//!
//! ## Core Concepts
//!
//! - **References (`reference`)**: The `[project|]file.xml#id` and
//!   `[project|]file.xml/query` grammar, parsed into a `TargetDescriptor`.
//! - **Queries (`query`)**: XPath 1.0 evaluated over the target's content
//!   scope to select elements. Values never get spliced into query text.
//! - **Link elements (`links`)**: Discovery of element and section links,
//!   their directive attributes, the three inlining modes and link status.
//! - **Resolution (`resolver`, `loader`, `session`)**: The traversal over link
//!   elements, target loading through a per-resolution session cache, and the
//!   cycle and limit guards of the session.
//! - **Synchronization (`sync`)**: The fixed chain of stages every loaded
//!   target goes through before it is inlined.
//! - **Cleanup (`cleanup`)**: The pass that runs before a document is saved.
//!
//! ## Execution Flow
//!
//! For every link element in the source document's language-scoped content:
//!
//! 1.  **Parse**: Turn the reference string into a target descriptor.
//! 2.  **Load**: Fetch the target document from the session cache, or read it
//!     and run the synchronization chain on it (which resolves the target's
//!     own links with the same session).
//! 3.  **Select**: Query the target's content for the referenced elements.
//! 4.  **Inline**: Insert text or a copy of each match, shaped by the link's
//!     directives.
//! 5.  **Mark**: Write the link status onto the link element.

pub mod cleanup;
pub mod config;
pub mod document;
pub mod error;
pub mod links;
pub mod loader;
pub mod project;
pub mod query;
pub mod reference;
pub mod resolver;
pub mod session;
pub mod store;
pub mod sync;

pub use error::{Error, Result};
pub use links::LinkStatus;
pub use project::{ProjectContext, ProjectPathResolver, ProjectRegistry};
pub use resolver::{LinkReport, ResolutionReport, Resolver};

#[cfg(test)]
mod reference_proptest;
