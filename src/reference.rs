//! Parsing of author-facing reference strings
//!
//! A reference names a fragment file and an element inside it:
//!
//! ```text
//! [projectId|]dataReference.xml#selector        id-based selector
//! [projectId|]dataReference.xml/xpath-suffix    query-based selector
//! ```
//!
//! Parsing never fails. Input that does not follow the grammar produces a
//! descriptor with an empty data reference and selector, which the resolver
//! reports as `wrong-format` on the link element.

use serde::Serialize;

/// How the selector part of a reference addresses the target element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectorType {
    /// Match on the share-id, global-unique-id or plain id attribute
    Id,
    /// Apply the selector as a query below the target's content root
    Xpath,
}

/// Structured form of a reference string
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetDescriptor {
    pub selector_type: SelectorType,
    /// Project holding the target; empty means the current project
    pub project_id: String,
    /// Fragment file, relative to the project's content root
    pub data_reference: String,
    pub selector: String,
}

impl TargetDescriptor {
    fn malformed(selector_type: SelectorType, project_id: String) -> Self {
        Self {
            selector_type,
            project_id,
            data_reference: String::new(),
            selector: String::new(),
        }
    }

    /// True when the reference did not follow the grammar
    pub fn is_malformed(&self) -> bool {
        self.data_reference.is_empty() || self.selector.is_empty()
    }

    /// The project the target lives in, falling back to `current`
    pub fn project_or<'a>(&'a self, current: &'a str) -> &'a str {
        if self.project_id.is_empty() {
            current
        } else {
            &self.project_id
        }
    }
}

/// Parse a raw reference string into a target descriptor.
///
/// # Examples
///
/// ```
/// use fragment_link::reference::{parse_reference, SelectorType};
///
/// let target = parse_reference("42|report.xml#sde-123");
/// assert_eq!(target.project_id, "42");
/// assert_eq!(target.data_reference, "report.xml");
/// assert_eq!(target.selector, "sde-123");
/// assert_eq!(target.selector_type, SelectorType::Id);
///
/// let target = parse_reference("report.xml/table[@id='t1']");
/// assert_eq!(target.selector, "/table[@id='t1']");
/// assert_eq!(target.selector_type, SelectorType::Xpath);
///
/// assert!(parse_reference("nofile#id").is_malformed());
/// ```
pub fn parse_reference(raw: &str) -> TargetDescriptor {
    let raw = raw.trim();

    let (project_id, rest) = match raw.split_once('|') {
        Some((project, rest)) => (project.trim().to_string(), rest),
        None => (String::new(), raw),
    };

    if let Some((data_reference, selector)) = rest.split_once('#') {
        if !data_reference.ends_with(".xml") {
            return TargetDescriptor::malformed(SelectorType::Id, project_id);
        }
        return TargetDescriptor {
            selector_type: SelectorType::Id,
            project_id,
            data_reference: data_reference.to_string(),
            selector: selector.to_string(),
        };
    }

    if let Some((data_reference, suffix)) = rest.split_once('/') {
        return TargetDescriptor {
            selector_type: SelectorType::Xpath,
            project_id,
            data_reference: data_reference.to_string(),
            selector: format!("/{}", suffix),
        };
    }

    TargetDescriptor::malformed(SelectorType::Id, project_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id_reference() {
        let target = parse_reference("report.xml#sde-123");
        assert_eq!(target.selector_type, SelectorType::Id);
        assert_eq!(target.project_id, "");
        assert_eq!(target.data_reference, "report.xml");
        assert_eq!(target.selector, "sde-123");
        assert!(!target.is_malformed());
    }

    #[test]
    fn test_parse_cross_project_reference() {
        let target = parse_reference("42|report.xml#sde-123");
        assert_eq!(target.project_id, "42");
        assert_eq!(target.data_reference, "report.xml");
        assert_eq!(target.project_or("7"), "42");
    }

    #[test]
    fn test_project_or_defaults_to_current() {
        let target = parse_reference("report.xml#x");
        assert_eq!(target.project_or("7"), "7");
    }

    #[test]
    fn test_parse_id_reference_splits_once() {
        let target = parse_reference("a.xml#b#c");
        assert_eq!(target.data_reference, "a.xml");
        assert_eq!(target.selector, "b#c");
    }

    #[test]
    fn test_parse_id_reference_in_subfolder() {
        let target = parse_reference("notes/a.xml#n1");
        assert_eq!(target.selector_type, SelectorType::Id);
        assert_eq!(target.data_reference, "notes/a.xml");
    }

    #[test]
    fn test_parse_missing_xml_suffix_is_malformed() {
        let target = parse_reference("nofile#id");
        assert!(target.is_malformed());
        assert!(target.data_reference.is_empty());
        assert!(target.selector.is_empty());
    }

    #[test]
    fn test_parse_empty_id_selector_is_malformed() {
        assert!(parse_reference("a.xml#").is_malformed());
    }

    #[test]
    fn test_parse_xpath_reference() {
        let target = parse_reference("report.xml/section/table[2]");
        assert_eq!(target.selector_type, SelectorType::Xpath);
        assert_eq!(target.data_reference, "report.xml");
        assert_eq!(target.selector, "/section/table[2]");
    }

    #[test]
    fn test_parse_xpath_descendant_reference() {
        let target = parse_reference("7|report.xml//p[@class='intro']");
        assert_eq!(target.project_id, "7");
        assert_eq!(target.selector, "//p[@class='intro']");
    }

    #[test]
    fn test_parse_without_separator_is_malformed() {
        let target = parse_reference("report.xml");
        assert!(target.is_malformed());
    }

    #[test]
    fn test_parse_empty_string_is_malformed() {
        assert!(parse_reference("").is_malformed());
        assert!(parse_reference("   ").is_malformed());
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let target = parse_reference("  report.xml#x  ");
        assert_eq!(target.data_reference, "report.xml");
        assert_eq!(target.selector, "x");

        let target = parse_reference("\n 42 |a.xml#x\t");
        assert_eq!(target.project_id, "42");
        assert_eq!(target.data_reference, "a.xml");
        assert_eq!(target.selector, "x");
    }

    #[test]
    fn test_descriptor_serializes_to_json() {
        let json = serde_json::to_string(&parse_reference("3|a.xml#b")).unwrap();
        assert!(json.contains("\"selector_type\":\"id\""));
        assert!(json.contains("\"project_id\":\"3\""));
    }
}
