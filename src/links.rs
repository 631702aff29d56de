//! Link elements: discovery, directives, inlining and status
//!
//! A link element is any element in the language-scoped content that carries
//! the element-link (or section-link) attribute. Besides the reference it can
//! carry directive attributes that shape how the target is inlined:
//!
//! | directive          | effect                                                  |
//! |--------------------|---------------------------------------------------------|
//! | remove attributes  | comma-separated names stripped from the imported root   |
//! | add attributes     | comma-separated `name:value` pairs set on it            |
//! | strip footnotes    | drop footnote markers and footnote content              |
//! | rename tag         | rename the inserted element                             |
//! | text only          | inline the target's text instead of its structure       |
//!
//! Attribute names come from `config::Markup`.

use std::fmt;

use log::warn;
use serde::Serialize;
use xot::{Node, Xot};

use crate::config::Markup;
use crate::document::{
    add_class, attribute, clear_children, flag, has_class, is_named, outermost, remove_attribute,
    rename, set_attribute, set_text, text_content,
};
use crate::error::{Error, Result};

/// Outcome of resolving one element link, written back onto the link element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkStatus {
    Ok,
    WrongFormat,
    TargetSectionNotAvailable,
    TargetSectionError,
    TargetElementNotFound,
}

impl LinkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkStatus::Ok => "ok",
            LinkStatus::WrongFormat => "wrong-format",
            LinkStatus::TargetSectionNotAvailable => "target-section-not-available",
            LinkStatus::TargetSectionError => "target-section-error",
            LinkStatus::TargetElementNotFound => "target-element-not-found",
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, LinkStatus::Ok)
    }
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which attribute made an element a link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkKind {
    /// Inlines matched elements of the target
    Element,
    /// Whole-fragment inclusion. Discovered and reported, not expanded yet.
    Section,
}

/// A discovered link element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkElement {
    pub node: Node,
    pub kind: LinkKind,
    pub reference: String,
}

/// Find every link element below `scope`, in document order.
///
/// An element carrying both attributes is an element link.
pub fn discover_links(xot: &Xot, scope: Node, markup: &Markup) -> Vec<LinkElement> {
    xot.descendants(scope)
        .filter(|node| xot.is_element(*node))
        .filter_map(|node| {
            if let Some(reference) = attribute(xot, node, &markup.element_link) {
                Some(LinkElement {
                    node,
                    kind: LinkKind::Element,
                    reference,
                })
            } else {
                attribute(xot, node, &markup.section_link).map(|reference| LinkElement {
                    node,
                    kind: LinkKind::Section,
                    reference,
                })
            }
        })
        .collect()
}

/// How a matched target element is inlined
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InlineMode {
    /// Replace the link element's content with the target's text
    Text,
    /// Append a new element with this name holding the target's text
    RenamedText(String),
    /// Append a deep copy of the target
    Structural,
}

/// Directive attributes read from a link element
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directives {
    pub remove_attributes: Vec<String>,
    pub add_attributes: Vec<(String, String)>,
    pub strip_footnotes: bool,
    pub rename_tag: Option<String>,
    pub text_only: bool,
}

impl Directives {
    pub fn read(xot: &Xot, link: Node, markup: &Markup) -> Self {
        let remove_attributes = attribute(xot, link, &markup.remove_attributes)
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let add_attributes = attribute(xot, link, &markup.add_attributes)
            .map(|list| parse_attribute_pairs(&list))
            .unwrap_or_default();

        let rename_tag = attribute(xot, link, &markup.rename_tag)
            .map(|tag| tag.trim().to_string())
            .filter(|tag| !tag.is_empty())
            .and_then(|tag| {
                if is_xml_name(&tag) {
                    Some(tag)
                } else {
                    warn!("Ignoring invalid rename tag '{}'", tag);
                    None
                }
            });

        Self {
            remove_attributes,
            add_attributes,
            strip_footnotes: flag(xot, link, &markup.strip_footnotes),
            rename_tag,
            text_only: flag(xot, link, &markup.text_only),
        }
    }

    pub fn mode(&self) -> InlineMode {
        match (self.text_only, &self.rename_tag) {
            (true, None) => InlineMode::Text,
            (true, Some(tag)) => InlineMode::RenamedText(tag.clone()),
            (false, _) => InlineMode::Structural,
        }
    }
}

/// Parse `name:value,name:value`. Entries without `:` or with an invalid
/// name are skipped.
fn parse_attribute_pairs(list: &str) -> Vec<(String, String)> {
    list.split(',')
        .filter_map(|entry| {
            let (name, value) = entry.split_once(':')?;
            let name = name.trim();
            if is_xml_name(name) {
                Some((name.to_string(), value.trim().to_string()))
            } else {
                warn!("Ignoring invalid attribute addition '{}'", entry.trim());
                None
            }
        })
        .collect()
}

/// Unprefixed XML name check
fn is_xml_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|ch| ch.is_alphanumeric() || matches!(ch, '_' | '-' | '.'))
}

/// Inline one matched target element into the link element
pub fn inline(
    xot: &mut Xot,
    link: Node,
    target: Node,
    directives: &Directives,
    markup: &Markup,
) -> Result<()> {
    match directives.mode() {
        InlineMode::Text => {
            let text = text_content(xot, target);
            set_text(xot, link, &text)
        }
        InlineMode::RenamedText(tag) => {
            let text = text_content(xot, target);
            let name = xot.add_name(&tag);
            let element = xot.new_element(name);
            set_text(xot, element, &text)?;
            xot.append(link, element).map_err(Error::xml)
        }
        InlineMode::Structural => {
            let imported = xot.clone_node(target);
            for name in &directives.remove_attributes {
                remove_attribute(xot, imported, name);
            }
            if directives.strip_footnotes {
                strip_footnotes(xot, imported, markup)?;
            }
            for (name, value) in &directives.add_attributes {
                set_attribute(xot, imported, name, value);
            }
            xot.append(link, imported).map_err(Error::xml)?;
            if let Some(tag) = &directives.rename_tag {
                rename(xot, imported, tag);
            }
            Ok(())
        }
    }
}

/// Remove footnote markers and footnote content below `root`
pub fn strip_footnotes(xot: &mut Xot, root: Node, markup: &Markup) -> Result<usize> {
    let matches: Vec<Node> = xot
        .descendants(root)
        .filter(|node| *node != root && xot.is_element(*node))
        .filter(|node| is_footnote(xot, *node, markup))
        .collect();

    // Markers inside footnote content go away with it
    let doomed = outermost(xot, &matches);
    for node in &doomed {
        xot.remove(*node).map_err(Error::xml)?;
    }
    Ok(doomed.len())
}

fn is_footnote(xot: &Xot, node: Node, markup: &Markup) -> bool {
    (is_named(xot, node, &markup.footnote_marker_element)
        && has_class(xot, node, &markup.footnote_marker_class))
        || has_class(xot, node, &markup.footnote_class)
}

/// Write the status onto a link element and mark it non-editable
pub fn mark_resolved(xot: &mut Xot, link: Node, status: LinkStatus, markup: &Markup) {
    set_attribute(xot, link, &markup.status_attribute, status.as_str());
    set_attribute(xot, link, &markup.editable_attribute, "false");
    add_class(xot, link, &markup.non_editable_class);
}

/// Whether a link element still carries anything the resolver injected
pub fn needs_cleanup(xot: &Xot, link: Node, markup: &Markup) -> bool {
    if attribute(xot, link, &markup.status_attribute).is_some()
        || attribute(xot, link, &markup.editable_attribute).is_some()
        || has_class(xot, link, &markup.non_editable_class)
    {
        return true;
    }
    let children: Vec<Node> = xot.children(link).collect();
    !(children.len() == 1 && xot.is_comment(children[0]))
}

/// Strip resolution markers and replace the content with the placeholder
pub fn clear_link(xot: &mut Xot, link: Node, markup: &Markup) -> Result<()> {
    remove_attribute(xot, link, &markup.status_attribute);
    remove_attribute(xot, link, &markup.editable_attribute);
    crate::document::remove_class(xot, link, &markup.non_editable_class);
    clear_children(xot, link)?;
    let placeholder = xot.new_comment(&markup.placeholder_comment);
    xot.append(link, placeholder).map_err(Error::xml)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{parse_document, serialize};

    fn parse(xot: &mut Xot, xml: &str) -> Node {
        let document = parse_document(xot, xml, None).unwrap();
        xot.document_element(document).unwrap()
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(LinkStatus::Ok.as_str(), "ok");
        assert_eq!(LinkStatus::WrongFormat.to_string(), "wrong-format");
        assert_eq!(
            LinkStatus::TargetSectionNotAvailable.as_str(),
            "target-section-not-available"
        );
        assert_eq!(LinkStatus::TargetSectionError.as_str(), "target-section-error");
        assert_eq!(
            LinkStatus::TargetElementNotFound.as_str(),
            "target-element-not-found"
        );
        assert_eq!(
            serde_json::to_string(&LinkStatus::TargetElementNotFound).unwrap(),
            "\"target-element-not-found\""
        );
    }

    #[test]
    fn test_discover_links_in_document_order() {
        let mut xot = Xot::new();
        let root = parse(
            &mut xot,
            r#"<content><p elementlink="a.xml#1"/><div><span sectionlink="b.xml#x"/><p elementlink="c.xml/p"/></div><p/></content>"#,
        );
        let links = discover_links(&xot, root, &Markup::default());
        let summary: Vec<(LinkKind, &str)> = links
            .iter()
            .map(|link| (link.kind, link.reference.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (LinkKind::Element, "a.xml#1"),
                (LinkKind::Section, "b.xml#x"),
                (LinkKind::Element, "c.xml/p"),
            ]
        );
    }

    #[test]
    fn test_directives_read_all_attributes() {
        let mut xot = Xot::new();
        let link = parse(
            &mut xot,
            r#"<p elementlink="a.xml#1" data-removeattributes="foo, bar,," data-addattributes="class:linked, data-x : 1 ,broken, 9bad:x" data-stripfootnotes="true" data-renametag="span" data-textonly="no"/>"#,
        );
        let directives = Directives::read(&xot, link, &Markup::default());
        assert_eq!(directives.remove_attributes, vec!["foo", "bar"]);
        assert_eq!(
            directives.add_attributes,
            vec![
                ("class".to_string(), "linked".to_string()),
                ("data-x".to_string(), "1".to_string())
            ]
        );
        assert!(directives.strip_footnotes);
        assert_eq!(directives.rename_tag.as_deref(), Some("span"));
        assert!(!directives.text_only);
        assert_eq!(directives.mode(), InlineMode::Structural);
    }

    #[test]
    fn test_directives_modes() {
        let text_only = Directives {
            text_only: true,
            ..Directives::default()
        };
        assert_eq!(text_only.mode(), InlineMode::Text);
        let renamed = Directives {
            text_only: true,
            rename_tag: Some("em".to_string()),
            ..Directives::default()
        };
        assert_eq!(renamed.mode(), InlineMode::RenamedText("em".to_string()));
    }

    #[test]
    fn test_invalid_rename_tag_is_ignored() {
        let mut xot = Xot::new();
        let link = parse(&mut xot, r#"<p data-renametag="1 bad"/>"#);
        assert!(Directives::read(&xot, link, &Markup::default())
            .rename_tag
            .is_none());
    }

    #[test]
    fn test_inline_text_replaces_content() {
        let mut xot = Xot::new();
        let link = parse(&mut xot, "<p>old<b>x</b></p>");
        let target = parse(&mut xot, "<div>Net <b>revenue</b></div>");
        let directives = Directives {
            text_only: true,
            ..Directives::default()
        };
        inline(&mut xot, link, target, &directives, &Markup::default()).unwrap();
        assert_eq!(serialize(&xot, link).unwrap(), "<p>Net revenue</p>");
    }

    #[test]
    fn test_inline_renamed_text_appends_element() {
        let mut xot = Xot::new();
        let link = parse(&mut xot, "<p/>");
        let target = parse(&mut xot, "<div>Net <b>revenue</b></div>");
        let directives = Directives {
            text_only: true,
            rename_tag: Some("em".to_string()),
            ..Directives::default()
        };
        inline(&mut xot, link, target, &directives, &Markup::default()).unwrap();
        assert_eq!(serialize(&xot, link).unwrap(), "<p><em>Net revenue</em></p>");
    }

    #[test]
    fn test_inline_structural_applies_directives() {
        let mut xot = Xot::new();
        let link = parse(&mut xot, "<p/>");
        let target = parse(
            &mut xot,
            r#"<table id="t1" foo="1" bar="2" keep="3"><tr><td>1<sup class="fn">a</sup></td></tr></table>"#,
        );
        let directives = Directives {
            remove_attributes: vec!["foo".to_string(), "bar".to_string()],
            add_attributes: vec![("data-linked".to_string(), "yes".to_string())],
            strip_footnotes: true,
            rename_tag: Some("figure".to_string()),
            text_only: false,
        };
        inline(&mut xot, link, target, &directives, &Markup::default()).unwrap();
        assert_eq!(
            serialize(&xot, link).unwrap(),
            r#"<p><figure id="t1" keep="3" data-linked="yes"><tr><td>1</td></tr></figure></p>"#
        );
        // The target itself is untouched
        assert!(serialize(&xot, target).unwrap().contains(r#"foo="1""#));
    }

    #[test]
    fn test_strip_footnotes_removes_markers_and_content() {
        let mut xot = Xot::new();
        let root = parse(
            &mut xot,
            r#"<div><p>a<sup class="fn">1</sup><sup>2</sup></p><div class="x footnote"><sup class="fn">3</sup></div></div>"#,
        );
        let removed = strip_footnotes(&mut xot, root, &Markup::default()).unwrap();
        assert_eq!(removed, 2);
        assert_eq!(
            serialize(&xot, root).unwrap(),
            "<div><p>a<sup>2</sup></p></div>"
        );
    }

    #[test]
    fn test_mark_and_clear_link() {
        let markup = Markup::default();
        let mut xot = Xot::new();
        let link = parse(&mut xot, r#"<p class="intro" elementlink="a.xml#1"><b>x</b></p>"#);

        mark_resolved(&mut xot, link, LinkStatus::Ok, &markup);
        assert_eq!(attribute(&xot, link, "data-linkstatus").as_deref(), Some("ok"));
        assert_eq!(attribute(&xot, link, "contenteditable").as_deref(), Some("false"));
        assert!(has_class(&xot, link, "non-editable"));
        assert!(needs_cleanup(&xot, link, &markup));

        clear_link(&mut xot, link, &markup).unwrap();
        assert!(!needs_cleanup(&xot, link, &markup));
        assert_eq!(
            serialize(&xot, link).unwrap(),
            r#"<p class="intro" elementlink="a.xml#1"><!--linked content--></p>"#
        );
    }

    #[test]
    fn test_empty_link_needs_cleanup() {
        let mut xot = Xot::new();
        let link = parse(&mut xot, r#"<p elementlink="a.xml#1"/>"#);
        assert!(needs_cleanup(&xot, link, &Markup::default()));
    }
}
