//! XPath 1.0 evaluation over a xot tree
//!
//! Evaluation is confined to one subtree, the scope. `/` denotes the scope
//! node and every axis result outside it is dropped, so a selector never
//! reaches into another language's content or past the document root.

use std::collections::{HashMap, HashSet};

use xot::{Axis, Node, Xot};

use crate::document::document_order;

use super::parser::{
    ArithmeticOp, CompareOp, Expr, Function, LocationPath, NameTest, NodeTest, Step,
};

/// Result of evaluating an expression
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Value {
    /// Node-set, kept in document order without duplicates
    Nodes(Vec<Node>),
    Boolean(bool),
    Number(f64),
    String(String),
}

#[derive(Debug, Clone, Copy)]
struct Focus {
    node: Node,
    position: usize,
    size: usize,
}

pub(crate) struct Evaluator<'a> {
    xot: &'a Xot,
    scope: Node,
    order: HashMap<Node, usize>,
    variables: &'a HashMap<String, String>,
}

impl<'a> Evaluator<'a> {
    pub(crate) fn new(xot: &'a Xot, scope: Node, variables: &'a HashMap<String, String>) -> Self {
        Self {
            xot,
            scope,
            order: document_order(xot, scope),
            variables,
        }
    }

    /// Evaluate `expr` with `context` as the context node
    pub(crate) fn evaluate(&self, expr: &Expr, context: Node) -> Value {
        self.eval(
            expr,
            Focus {
                node: context,
                position: 1,
                size: 1,
            },
        )
    }

    fn eval(&self, expr: &Expr, focus: Focus) -> Value {
        match expr {
            Expr::Or(left, right) => Value::Boolean(
                self.eval(left, focus).to_boolean() || self.eval(right, focus).to_boolean(),
            ),
            Expr::And(left, right) => Value::Boolean(
                self.eval(left, focus).to_boolean() && self.eval(right, focus).to_boolean(),
            ),
            Expr::Compare(op, left, right) => {
                let left = self.eval(left, focus);
                let right = self.eval(right, focus);
                Value::Boolean(self.compare(*op, &left, &right))
            }
            Expr::Arithmetic(op, left, right) => {
                let left = self.number(&self.eval(left, focus));
                let right = self.number(&self.eval(right, focus));
                Value::Number(match op {
                    ArithmeticOp::Add => left + right,
                    ArithmeticOp::Subtract => left - right,
                    ArithmeticOp::Multiply => left * right,
                    ArithmeticOp::Divide => left / right,
                    ArithmeticOp::Modulo => left % right,
                })
            }
            Expr::Negate(inner) => Value::Number(-self.number(&self.eval(inner, focus))),
            Expr::Union(left, right) => {
                let mut nodes = self.eval(left, focus).into_nodes();
                nodes.extend(self.eval(right, focus).into_nodes());
                Value::Nodes(self.sort_unique(nodes))
            }
            Expr::Path(path) => Value::Nodes(self.select_path(path, focus.node)),
            Expr::Filter {
                primary,
                predicates,
                steps,
            } => {
                let mut nodes = self.eval(primary, focus).into_nodes();
                for predicate in predicates {
                    nodes = self.filter(nodes, predicate);
                }
                Value::Nodes(self.apply_steps(nodes, steps))
            }
            Expr::Literal(value) => Value::String(value.clone()),
            Expr::Number(value) => Value::Number(*value),
            Expr::Variable(name) => {
                Value::String(self.variables.get(name).cloned().unwrap_or_default())
            }
            Expr::Call(function, args) => self.call(*function, args, focus),
        }
    }

    fn select_path(&self, path: &LocationPath, context: Node) -> Vec<Node> {
        let start = if path.absolute { self.scope } else { context };
        self.apply_steps(vec![start], &path.steps)
    }

    fn apply_steps(&self, mut nodes: Vec<Node>, steps: &[Step]) -> Vec<Node> {
        for step in steps {
            let mut next = Vec::new();
            for node in &nodes {
                next.extend(self.apply_step(*node, step));
            }
            nodes = self.sort_unique(next);
        }
        nodes
    }

    /// Nodes selected by one step from one context node, in axis order
    fn apply_step(&self, context: Node, step: &Step) -> Vec<Node> {
        let mut nodes: Vec<Node> = self
            .xot
            .axis(step.axis, context)
            .filter(|node| self.order.contains_key(node))
            .filter(|node| self.matches(*node, step.axis, &step.test))
            .collect();
        for predicate in &step.predicates {
            nodes = self.filter(nodes, predicate);
        }
        nodes
    }

    /// Keep the nodes for which `predicate` holds; positions follow the
    /// order of `nodes`
    fn filter(&self, nodes: Vec<Node>, predicate: &Expr) -> Vec<Node> {
        let size = nodes.len();
        nodes
            .into_iter()
            .enumerate()
            .filter(|(index, node)| {
                let focus = Focus {
                    node: *node,
                    position: index + 1,
                    size,
                };
                match self.eval(predicate, focus) {
                    Value::Number(position) => position == focus.position as f64,
                    other => other.to_boolean(),
                }
            })
            .map(|(_, node)| node)
            .collect()
    }

    fn sort_unique(&self, nodes: Vec<Node>) -> Vec<Node> {
        let mut seen = HashSet::new();
        let mut nodes: Vec<Node> = nodes.into_iter().filter(|node| seen.insert(*node)).collect();
        nodes.sort_by_key(|node| self.order.get(node).copied().unwrap_or(usize::MAX));
        nodes
    }

    fn matches(&self, node: Node, axis: Axis, test: &NodeTest) -> bool {
        match test {
            NodeTest::Node => true,
            NodeTest::Text => self.xot.is_text(node),
            NodeTest::Comment => self.xot.is_comment(node),
            NodeTest::ProcessingInstruction(target) => {
                self.xot.is_processing_instruction(node)
                    && target.as_deref().map_or(true, |target| {
                        self.xot
                            .node_name(node)
                            .is_some_and(|name| self.xot.local_name_str(name) == target)
                    })
            }
            NodeTest::Name(name_test) => {
                let principal = if axis == Axis::Attribute {
                    self.xot.is_attribute_node(node)
                } else {
                    self.xot.is_element(node)
                };
                principal && self.matches_name(node, name_test)
            }
        }
    }

    fn matches_name(&self, node: Node, test: &NameTest) -> bool {
        let Some(name) = self.xot.node_name(node) else {
            return false;
        };
        let namespace = self.xot.namespace_for_name(name);
        match test {
            NameTest::Any => true,
            NameTest::Prefix(prefix) => self.resolve_prefix(node, prefix) == Some(namespace),
            NameTest::Name {
                prefix: None,
                local,
            } => namespace == self.xot.no_namespace() && self.xot.local_name_str(name) == local,
            NameTest::Name {
                prefix: Some(prefix),
                local,
            } => {
                self.resolve_prefix(node, prefix) == Some(namespace)
                    && self.xot.local_name_str(name) == local
            }
        }
    }

    /// Namespace bound to `prefix` in scope at `node`
    fn resolve_prefix(&self, node: Node, prefix: &str) -> Option<xot::NamespaceId> {
        if prefix == "xml" {
            return Some(self.xot.xml_namespace());
        }
        let prefix = self.xot.prefix(prefix)?;
        let element = if self.xot.is_element(node) {
            node
        } else {
            self.xot.parent(node)?
        };
        self.xot.namespace_for_prefix(element, prefix)
    }

    fn string(&self, value: &Value) -> String {
        match value {
            Value::Nodes(nodes) => nodes
                .first()
                .map(|node| self.xot.string_value(*node))
                .unwrap_or_default(),
            Value::Boolean(value) => value.to_string(),
            Value::Number(value) => number_to_string(*value),
            Value::String(value) => value.clone(),
        }
    }

    fn number(&self, value: &Value) -> f64 {
        match value {
            Value::Number(value) => *value,
            Value::Boolean(value) => f64::from(u8::from(*value)),
            other => string_to_number(&self.string(other)),
        }
    }

    fn compare(&self, op: CompareOp, left: &Value, right: &Value) -> bool {
        match (left, right) {
            (Value::Nodes(left), Value::Nodes(right)) => {
                let right: Vec<Value> = right
                    .iter()
                    .map(|node| Value::String(self.xot.string_value(*node)))
                    .collect();
                left.iter().any(|node| {
                    let left = Value::String(self.xot.string_value(*node));
                    right.iter().any(|right| self.compare_atomic(op, &left, right))
                })
            }
            (Value::Nodes(nodes), other) => self.compare_node_set(op, nodes, other),
            (other, Value::Nodes(nodes)) => self.compare_node_set(op.flip(), nodes, other),
            (left, right) => self.compare_atomic(op, left, right),
        }
    }

    fn compare_node_set(&self, op: CompareOp, nodes: &[Node], other: &Value) -> bool {
        match other {
            Value::Boolean(_) => self.compare_atomic(op, &Value::Boolean(!nodes.is_empty()), other),
            Value::Number(_) => nodes.iter().any(|node| {
                let value = Value::Number(string_to_number(&self.xot.string_value(*node)));
                self.compare_atomic(op, &value, other)
            }),
            _ => nodes.iter().any(|node| {
                let value = Value::String(self.xot.string_value(*node));
                self.compare_atomic(op, &value, other)
            }),
        }
    }

    fn compare_atomic(&self, op: CompareOp, left: &Value, right: &Value) -> bool {
        match op {
            CompareOp::Eq | CompareOp::NotEq => {
                let equal = if matches!(left, Value::Boolean(_)) || matches!(right, Value::Boolean(_)) {
                    left.to_boolean() == right.to_boolean()
                } else if matches!(left, Value::Number(_)) || matches!(right, Value::Number(_)) {
                    self.number(left) == self.number(right)
                } else {
                    self.string(left) == self.string(right)
                };
                equal == (op == CompareOp::Eq)
            }
            CompareOp::Less => self.number(left) < self.number(right),
            CompareOp::LessEq => self.number(left) <= self.number(right),
            CompareOp::Greater => self.number(left) > self.number(right),
            CompareOp::GreaterEq => self.number(left) >= self.number(right),
        }
    }

    /// String value of the first argument, or of the context node
    fn string_arg(&self, args: &[Expr], focus: Focus) -> String {
        match args.first() {
            Some(arg) => self.string(&self.eval(arg, focus)),
            None => self.xot.string_value(focus.node),
        }
    }

    /// Node named by the first argument, or the context node
    fn node_arg(&self, args: &[Expr], focus: Focus) -> Option<Node> {
        match args.first() {
            Some(arg) => self.eval(arg, focus).into_nodes().first().copied(),
            None => Some(focus.node),
        }
    }

    fn call(&self, function: Function, args: &[Expr], focus: Focus) -> Value {
        let string_at = |index: usize| self.string(&self.eval(&args[index], focus));
        let number_at = |index: usize| self.number(&self.eval(&args[index], focus));

        match function {
            Function::Last => Value::Number(focus.size as f64),
            Function::Position => Value::Number(focus.position as f64),
            Function::Count => {
                Value::Number(self.eval(&args[0], focus).into_nodes().len() as f64)
            }
            Function::LocalName => Value::String(
                self.node_arg(args, focus)
                    .and_then(|node| self.xot.node_name(node))
                    .map(|name| self.xot.local_name_str(name).to_string())
                    .unwrap_or_default(),
            ),
            Function::NamespaceUri => Value::String(
                self.node_arg(args, focus)
                    .and_then(|node| self.xot.node_name(node))
                    .map(|name| {
                        let namespace = self.xot.namespace_for_name(name);
                        self.xot.namespace_str(namespace).to_string()
                    })
                    .unwrap_or_default(),
            ),
            Function::Name => Value::String(
                self.node_arg(args, focus)
                    .and_then(|node| self.qualified_name(node))
                    .unwrap_or_default(),
            ),
            Function::String => Value::String(self.string_arg(args, focus)),
            Function::Concat => Value::String((0..args.len()).map(string_at).collect()),
            Function::StartsWith => Value::Boolean(string_at(0).starts_with(&string_at(1))),
            Function::Contains => Value::Boolean(string_at(0).contains(&string_at(1))),
            Function::SubstringBefore => {
                let value = string_at(0);
                let pattern = string_at(1);
                Value::String(
                    value
                        .find(&pattern)
                        .map(|index| value[..index].to_string())
                        .unwrap_or_default(),
                )
            }
            Function::SubstringAfter => {
                let value = string_at(0);
                let pattern = string_at(1);
                Value::String(
                    value
                        .find(&pattern)
                        .map(|index| value[index + pattern.len()..].to_string())
                        .unwrap_or_default(),
                )
            }
            Function::Substring => {
                let length = (args.len() == 3).then(|| number_at(2));
                Value::String(substring(&string_at(0), number_at(1), length))
            }
            Function::StringLength => {
                Value::Number(self.string_arg(args, focus).chars().count() as f64)
            }
            Function::NormalizeSpace => Value::String(
                self.string_arg(args, focus)
                    .split_whitespace()
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
            Function::Translate => {
                let from: Vec<char> = string_at(1).chars().collect();
                let to: Vec<char> = string_at(2).chars().collect();
                Value::String(
                    string_at(0)
                        .chars()
                        .filter_map(|ch| match from.iter().position(|f| *f == ch) {
                            Some(index) => to.get(index).copied(),
                            None => Some(ch),
                        })
                        .collect(),
                )
            }
            Function::Boolean => Value::Boolean(self.eval(&args[0], focus).to_boolean()),
            Function::Not => Value::Boolean(!self.eval(&args[0], focus).to_boolean()),
            Function::True => Value::Boolean(true),
            Function::False => Value::Boolean(false),
            Function::Lang => Value::Boolean(self.lang_matches(focus.node, &string_at(0))),
            Function::Number => Value::Number(match args.first() {
                Some(arg) => self.number(&self.eval(arg, focus)),
                None => string_to_number(&self.xot.string_value(focus.node)),
            }),
            Function::Sum => Value::Number(
                self.eval(&args[0], focus)
                    .into_nodes()
                    .iter()
                    .map(|node| string_to_number(&self.xot.string_value(*node)))
                    .sum(),
            ),
            Function::Floor => Value::Number(number_at(0).floor()),
            Function::Ceiling => Value::Number(number_at(0).ceil()),
            Function::Round => Value::Number(round(number_at(0))),
        }
    }

    fn qualified_name(&self, node: Node) -> Option<String> {
        let name = self.xot.node_name(node)?;
        let element = if self.xot.is_element(node) {
            node
        } else {
            self.xot.parent(node).unwrap_or(node)
        };
        Some(
            self.xot
                .full_name(element, name)
                .unwrap_or_else(|_| self.xot.local_name_str(name).to_string()),
        )
    }

    fn lang_matches(&self, node: Node, lang: &str) -> bool {
        let Some(name) = self.xot.name_ns("lang", self.xot.xml_namespace()) else {
            return false;
        };
        let Some(declared) = self
            .xot
            .ancestors(node)
            .find_map(|ancestor| self.xot.get_attribute(ancestor, name))
        else {
            return false;
        };
        let declared = declared.to_lowercase();
        let lang = lang.to_lowercase();
        declared == lang
            || declared
                .strip_prefix(&lang)
                .is_some_and(|rest| rest.starts_with('-'))
    }
}

impl Value {
    pub(crate) fn into_nodes(self) -> Vec<Node> {
        match self {
            Value::Nodes(nodes) => nodes,
            _ => Vec::new(),
        }
    }

    fn to_boolean(&self) -> bool {
        match self {
            Value::Nodes(nodes) => !nodes.is_empty(),
            Value::Boolean(value) => *value,
            Value::Number(value) => *value != 0.0 && !value.is_nan(),
            Value::String(value) => !value.is_empty(),
        }
    }
}

fn number_to_string(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "Infinity".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// XPath number syntax only: optional minus, digits, optional fraction
fn string_to_number(value: &str) -> f64 {
    let trimmed = value.trim();
    let digits = trimmed.strip_prefix('-').unwrap_or(trimmed);
    let valid = !digits.is_empty()
        && digits.chars().any(|ch| ch.is_ascii_digit())
        && digits.chars().all(|ch| ch.is_ascii_digit() || ch == '.')
        && digits.matches('.').count() <= 1;
    if valid {
        trimmed.parse().unwrap_or(f64::NAN)
    } else {
        f64::NAN
    }
}

fn round(value: f64) -> f64 {
    if value.is_nan() || value.is_infinite() {
        value
    } else {
        (value + 0.5).floor()
    }
}

fn substring(value: &str, start: f64, length: Option<f64>) -> String {
    let first = round(start);
    let end = length.map(|length| first + round(length));
    value
        .chars()
        .enumerate()
        .filter(|(index, _)| {
            let position = (index + 1) as f64;
            position >= first && end.map_or(true, |end| position < end)
        })
        .map(|(_, ch)| ch)
        .collect()
}
