//! Element queries against fragment documents
//!
//! Query selectors are XPath 1.0 expressions, evaluated with the language
//! scoped content element as the root: `/section/p` starts at the content
//! element and no axis reaches outside it. An expression must select nodes;
//! only the element nodes it selects are returned.
//!
//! Selectors from reference strings are never spliced into query text. Id
//! selectors become a `Query` built directly from the configured id
//! attributes, with the selector value bound to the `$selector` variable, so
//! quotes or operators in the value are read as data.
//!
//! `xpath_literal` quotes a value for display in rendered queries, using
//! `concat()` when the value holds both quote characters.

mod eval;
mod parser;

use std::collections::HashMap;
use std::fmt;

use xot::{Axis, Node, Xot};

use crate::error::{Error, Result};

use self::eval::Evaluator;
use self::parser::{CompareOp, Expr, Function, LocationPath, NameTest, NodeTest, Step};

const SELECTOR_VARIABLE: &str = "selector";

/// A parsed or constructed element query
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    text: String,
    expr: Expr,
    variables: HashMap<String, String>,
}

impl Query {
    /// Query for any element below the context whose value for one of
    /// `attributes` equals `value`.
    pub fn id_match(attributes: &[String], value: &str) -> Self {
        let predicate = attributes
            .iter()
            .map(|name| {
                let attribute = Expr::Path(LocationPath {
                    absolute: false,
                    steps: vec![Step::new(
                        Axis::Attribute,
                        NodeTest::Name(NameTest::qualified(name)),
                    )],
                });
                Expr::Compare(
                    CompareOp::Eq,
                    Box::new(attribute),
                    Box::new(Expr::Variable(SELECTOR_VARIABLE.to_string())),
                )
            })
            .reduce(|left, right| Expr::Or(Box::new(left), Box::new(right)))
            .unwrap_or(Expr::Call(Function::False, Vec::new()));

        let mut elements = Step::new(Axis::Child, NodeTest::Name(NameTest::Any));
        elements.predicates.push(predicate);
        let expr = Expr::Path(LocationPath {
            absolute: true,
            steps: vec![Step::new(Axis::DescendantOrSelf, NodeTest::Node), elements],
        });

        let literal = xpath_literal(value);
        let condition = if attributes.is_empty() {
            "false()".to_string()
        } else {
            attributes
                .iter()
                .map(|name| format!("@{}={}", name, literal))
                .collect::<Vec<_>>()
                .join(" or ")
        };

        Self {
            text: format!("//*[{}]", condition),
            expr,
            variables: HashMap::from([(SELECTOR_VARIABLE.to_string(), value.to_string())]),
        }
    }

    /// Parse an XPath expression such as `/section//table[@id='t1'][1]`.
    pub fn parse(expression: &str) -> Result<Self> {
        let error = |message: String| Error::Query {
            expression: expression.to_string(),
            message,
        };

        let text = expression.trim();
        let expr = parser::parse(text).map_err(error)?;
        if expr.uses_variables() {
            return Err(error("variable references are not allowed".to_string()));
        }
        if !expr.returns_nodes() {
            return Err(error("expression does not select nodes".to_string()));
        }

        Ok(Self {
            text: text.to_string(),
            expr,
            variables: HashMap::new(),
        })
    }

    /// Evaluate the query with `context` as the root node.
    ///
    /// Results are distinct elements in document order.
    pub fn select(&self, xot: &Xot, context: Node) -> Vec<Node> {
        Evaluator::new(xot, context, &self.variables)
            .evaluate(&self.expr, context)
            .into_nodes()
            .into_iter()
            .filter(|node| xot.is_element(*node))
            .collect()
    }

    /// The query as XPath text, with every literal escaped
    pub fn to_xpath(&self) -> String {
        self.text.clone()
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Quote `value` as an XPath string literal.
///
/// # Examples
///
/// ```
/// use fragment_link::query::xpath_literal;
///
/// assert_eq!(xpath_literal("sde-1"), "'sde-1'");
/// assert_eq!(xpath_literal("it's"), "\"it's\"");
/// assert_eq!(xpath_literal("a'b\"c"), "concat('a', \"'\", 'b\"c')");
/// ```
pub fn xpath_literal(value: &str) -> String {
    if !value.contains('\'') {
        return format!("'{}'", value);
    }
    if !value.contains('"') {
        return format!("\"{}\"", value);
    }
    let parts: Vec<String> = value
        .split('\'')
        .map(|part| format!("'{}'", part))
        .collect();
    format!("concat({})", parts.join(", \"'\", "))
}
