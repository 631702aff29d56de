//! Helpers over the `xot` tree for fragment documents
//!
//! Every document handled by one resolution lives in the same `Xot` arena, so
//! importing a target element into a source document is a deep clone within
//! the arena. These helpers take attribute and element names as strings and
//! intern them on demand; lookups of a name that was never interned simply
//! find nothing.

use std::collections::{HashMap, HashSet};

use xot::{Node, Xot};

use crate::config::Markup;
use crate::error::{Error, Result};

/// Parse XML text into a new document in `xot`
pub fn parse_document(xot: &mut Xot, xml: &str, path: Option<&str>) -> Result<Node> {
    xot.parse(xml).map_err(|err| match path {
        Some(path) => Error::xml_in(err, path),
        None => Error::xml(err),
    })
}

/// Serialize a document or element
pub fn serialize(xot: &Xot, node: Node) -> Result<String> {
    xot.to_string(node).map_err(Error::xml)
}

/// Read an attribute value
pub fn attribute(xot: &Xot, node: Node, name: &str) -> Option<String> {
    let name = xot.name(name)?;
    xot.attributes(node).get(name).map(|value| value.to_string())
}

/// Read an attribute as a boolean flag (`true`, `yes`, `1`, case-insensitive)
pub fn flag(xot: &Xot, node: Node, name: &str) -> bool {
    attribute(xot, node, name)
        .map(|value| {
            matches!(
                value.trim().to_ascii_lowercase().as_str(),
                "true" | "yes" | "1"
            )
        })
        .unwrap_or(false)
}

pub fn set_attribute(xot: &mut Xot, node: Node, name: &str, value: &str) {
    let name = xot.add_name(name);
    xot.attributes_mut(node).insert(name, value.to_string());
}

/// Remove an attribute, returning whether it was present
pub fn remove_attribute(xot: &mut Xot, node: Node, name: &str) -> bool {
    match xot.name(name) {
        Some(name) => xot.attributes_mut(node).remove(name).is_some(),
        None => false,
    }
}

/// Whether the whitespace-separated `class` attribute contains `token`
pub fn has_class(xot: &Xot, node: Node, token: &str) -> bool {
    attribute(xot, node, "class")
        .map(|classes| classes.split_whitespace().any(|class| class == token))
        .unwrap_or(false)
}

pub fn add_class(xot: &mut Xot, node: Node, token: &str) {
    if has_class(xot, node, token) {
        return;
    }
    let classes = match attribute(xot, node, "class") {
        Some(existing) if !existing.trim().is_empty() => {
            format!("{} {}", existing.trim(), token)
        }
        _ => token.to_string(),
    };
    set_attribute(xot, node, "class", &classes);
}

/// Remove a class token, dropping the `class` attribute once it is empty
pub fn remove_class(xot: &mut Xot, node: Node, token: &str) -> bool {
    let Some(existing) = attribute(xot, node, "class") else {
        return false;
    };
    let remaining: Vec<&str> = existing
        .split_whitespace()
        .filter(|class| *class != token)
        .collect();
    if remaining.len() == existing.split_whitespace().count() {
        return false;
    }
    if remaining.is_empty() {
        remove_attribute(xot, node, "class");
    } else {
        set_attribute(xot, node, "class", &remaining.join(" "));
    }
    true
}

/// Whether `node` is an element with the given local name
pub fn is_named(xot: &Xot, node: Node, name: &str) -> bool {
    match (xot.element(node), xot.name(name)) {
        (Some(element), Some(name)) => element.name() == name,
        _ => false,
    }
}

/// Concatenated text of all descendant text nodes, in document order
pub fn text_content(xot: &Xot, node: Node) -> String {
    xot.descendants(node)
        .filter_map(|descendant| xot.text_str(descendant))
        .collect()
}

/// Detach and drop every child of `node`
pub fn clear_children(xot: &mut Xot, node: Node) -> Result<()> {
    let children: Vec<Node> = xot.children(node).collect();
    for child in children {
        xot.remove(child).map_err(Error::xml)?;
    }
    Ok(())
}

/// Replace all children of `node` with a single text node
pub fn set_text(xot: &mut Xot, node: Node, text: &str) -> Result<()> {
    clear_children(xot, node)?;
    if !text.is_empty() {
        let text = xot.new_text(text);
        xot.append(node, text).map_err(Error::xml)?;
    }
    Ok(())
}

pub fn rename(xot: &mut Xot, node: Node, name: &str) {
    let name = xot.add_name(name);
    if let Some(element) = xot.element_mut(node) {
        element.set_name(name);
    }
}

/// Parse an XML fragment and return a detached copy of its root element.
///
/// The scratch document is removed from the arena once the copy is taken.
pub fn parse_fragment(xot: &mut Xot, xml: &str) -> Result<Node> {
    let document = parse_document(xot, xml, None)?;
    let root = match xot.document_element(document) {
        Ok(root) => root,
        Err(err) => {
            xot.remove(document).map_err(Error::xml)?;
            return Err(Error::xml(err));
        }
    };
    let copy = xot.clone_node(root);
    xot.remove(document).map_err(Error::xml)?;
    Ok(copy)
}

/// Find the language-scoped content element of a document.
///
/// This is the direct child of the document element named
/// `markup.content_element` whose language attribute equals `lang`.
pub fn content_scope(xot: &Xot, document: Node, markup: &Markup, lang: &str) -> Option<Node> {
    let root = xot.document_element(document).ok()?;
    xot.children(root).find(|child| {
        is_named(xot, *child, &markup.content_element)
            && attribute(xot, *child, &markup.lang_attribute).as_deref() == Some(lang)
    })
}

/// Keep only the nodes of `nodes` that have no ancestor in `nodes`.
///
/// Must be called before any of them is removed: removing an outer node
/// frees everything below it, and the arena may hand the freed slots to new
/// nodes.
pub fn outermost(xot: &Xot, nodes: &[Node]) -> Vec<Node> {
    let set: HashSet<Node> = nodes.iter().copied().collect();
    nodes
        .iter()
        .copied()
        .filter(|node| !xot.ancestors(*node).skip(1).any(|ancestor| set.contains(&ancestor)))
        .collect()
}

/// Preorder position of every node below `root`, attribute nodes included
pub fn document_order(xot: &Xot, root: Node) -> HashMap<Node, usize> {
    xot.all_descendants(root)
        .enumerate()
        .map(|(position, node)| (node, position))
        .collect()
}
