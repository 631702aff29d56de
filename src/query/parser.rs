//! Tokenizer and recursive-descent parser for XPath 1.0 expressions
//!
//! The grammar follows XPath 1.0 section 3, including the lexical rule that
//! decides whether `*` and the names `and`, `or`, `div` and `mod` are
//! operators or name tests. The namespace axis and the `id()` function are not
//! supported.

use std::sync::LazyLock;

use regex::Regex;
use xot::Axis;

static NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\p{L}_][\w.\-]*(?::(?:[\p{L}_][\w.\-]*|\*))?").expect("valid name regex")
});

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:\d+(?:\.\d*)?|\.\d+)").expect("valid number regex"));

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Slash,
    DoubleSlash,
    LBracket,
    RBracket,
    LParen,
    RParen,
    At,
    Comma,
    Dot,
    DotDot,
    ColonColon,
    Pipe,
    Plus,
    Minus,
    Equals,
    NotEquals,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    Multiply,
    And,
    Or,
    Mod,
    Div,
    /// `*` as a name test
    Star,
    /// QName, or `prefix:*`
    Name(String),
    Literal(String),
    Number(f64),
    Variable(String),
}

impl Token {
    /// Whether a name or `*` after this token is a name test rather than an
    /// operator
    fn precedes_operand(&self) -> bool {
        matches!(
            self,
            Token::At
                | Token::ColonColon
                | Token::LParen
                | Token::LBracket
                | Token::Comma
                | Token::And
                | Token::Or
                | Token::Mod
                | Token::Div
                | Token::Multiply
                | Token::Slash
                | Token::DoubleSlash
                | Token::Pipe
                | Token::Plus
                | Token::Minus
                | Token::Equals
                | Token::NotEquals
                | Token::Less
                | Token::LessEq
                | Token::Greater
                | Token::GreaterEq
        )
    }
}

pub(crate) fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut tokens: Vec<Token> = Vec::new();
    let mut rest = input;

    loop {
        rest = rest.trim_start();
        let Some(ch) = rest.chars().next() else {
            break;
        };
        let offset = input.len() - rest.len();
        let operand_expected = tokens.last().map_or(true, Token::precedes_operand);

        let (token, length) = match ch {
            '/' if rest.starts_with("//") => (Token::DoubleSlash, 2),
            '/' => (Token::Slash, 1),
            '[' => (Token::LBracket, 1),
            ']' => (Token::RBracket, 1),
            '(' => (Token::LParen, 1),
            ')' => (Token::RParen, 1),
            '@' => (Token::At, 1),
            ',' => (Token::Comma, 1),
            '|' => (Token::Pipe, 1),
            '+' => (Token::Plus, 1),
            '-' => (Token::Minus, 1),
            '=' => (Token::Equals, 1),
            '!' if rest.starts_with("!=") => (Token::NotEquals, 2),
            '<' if rest.starts_with("<=") => (Token::LessEq, 2),
            '<' => (Token::Less, 1),
            '>' if rest.starts_with(">=") => (Token::GreaterEq, 2),
            '>' => (Token::Greater, 1),
            ':' if rest.starts_with("::") => (Token::ColonColon, 2),
            '*' if operand_expected => (Token::Star, 1),
            '*' => (Token::Multiply, 1),
            '.' if rest.starts_with("..") => (Token::DotDot, 2),
            '\'' | '"' => {
                let body = &rest[1..];
                let end = body
                    .find(ch)
                    .ok_or_else(|| format!("unterminated string literal at position {}", offset))?;
                (Token::Literal(body[..end].to_string()), end + 2)
            }
            '$' => {
                let name = NAME
                    .find(&rest[1..])
                    .ok_or_else(|| format!("expected a variable name at position {}", offset + 1))?;
                (Token::Variable(name.as_str().to_string()), name.end() + 1)
            }
            _ => {
                if let Some(number) = NUMBER.find(rest) {
                    let value = number
                        .as_str()
                        .parse()
                        .map_err(|_| format!("invalid number at position {}", offset))?;
                    (Token::Number(value), number.end())
                } else if ch == '.' {
                    (Token::Dot, 1)
                } else if let Some(name) = NAME.find(rest) {
                    let text = name.as_str();
                    let token = match text {
                        "and" if !operand_expected => Token::And,
                        "or" if !operand_expected => Token::Or,
                        "mod" if !operand_expected => Token::Mod,
                        "div" if !operand_expected => Token::Div,
                        _ => Token::Name(text.to_string()),
                    };
                    (token, name.end())
                } else {
                    return Err(format!("unexpected character '{}' at position {}", ch, offset));
                }
            }
        };
        tokens.push(token);
        rest = &rest[length..];
    }

    Ok(tokens)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CompareOp {
    Eq,
    NotEq,
    Less,
    LessEq,
    Greater,
    GreaterEq,
}

impl CompareOp {
    /// The operator with its operands swapped
    pub(crate) fn flip(self) -> Self {
        match self {
            CompareOp::Less => CompareOp::Greater,
            CompareOp::LessEq => CompareOp::GreaterEq,
            CompareOp::Greater => CompareOp::Less,
            CompareOp::GreaterEq => CompareOp::LessEq,
            other => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ArithmeticOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

/// Name part of a name test
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum NameTest {
    /// `*`
    Any,
    /// `prefix:*`
    Prefix(String),
    Name { prefix: Option<String>, local: String },
}

impl NameTest {
    pub(crate) fn qualified(name: &str) -> Self {
        match name.split_once(':') {
            Some((prefix, "*")) => NameTest::Prefix(prefix.to_string()),
            Some((prefix, local)) => NameTest::Name {
                prefix: Some(prefix.to_string()),
                local: local.to_string(),
            },
            None => NameTest::Name {
                prefix: None,
                local: name.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum NodeTest {
    Name(NameTest),
    Node,
    Text,
    Comment,
    ProcessingInstruction(Option<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Step {
    pub(crate) axis: Axis,
    pub(crate) test: NodeTest,
    pub(crate) predicates: Vec<Expr>,
}

impl Step {
    pub(crate) fn new(axis: Axis, test: NodeTest) -> Self {
        Self {
            axis,
            test,
            predicates: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LocationPath {
    pub(crate) absolute: bool,
    pub(crate) steps: Vec<Step>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Function {
    Last,
    Position,
    Count,
    LocalName,
    NamespaceUri,
    Name,
    String,
    Concat,
    StartsWith,
    Contains,
    SubstringBefore,
    SubstringAfter,
    Substring,
    StringLength,
    NormalizeSpace,
    Translate,
    Boolean,
    Not,
    True,
    False,
    Lang,
    Number,
    Sum,
    Floor,
    Ceiling,
    Round,
}

impl Function {
    /// Function and accepted argument counts for a core library name
    fn lookup(name: &str) -> Option<(Self, usize, Option<usize>)> {
        let entry = match name {
            "last" => (Function::Last, 0, Some(0)),
            "position" => (Function::Position, 0, Some(0)),
            "count" => (Function::Count, 1, Some(1)),
            "local-name" => (Function::LocalName, 0, Some(1)),
            "namespace-uri" => (Function::NamespaceUri, 0, Some(1)),
            "name" => (Function::Name, 0, Some(1)),
            "string" => (Function::String, 0, Some(1)),
            "concat" => (Function::Concat, 2, None),
            "starts-with" => (Function::StartsWith, 2, Some(2)),
            "contains" => (Function::Contains, 2, Some(2)),
            "substring-before" => (Function::SubstringBefore, 2, Some(2)),
            "substring-after" => (Function::SubstringAfter, 2, Some(2)),
            "substring" => (Function::Substring, 2, Some(3)),
            "string-length" => (Function::StringLength, 0, Some(1)),
            "normalize-space" => (Function::NormalizeSpace, 0, Some(1)),
            "translate" => (Function::Translate, 3, Some(3)),
            "boolean" => (Function::Boolean, 1, Some(1)),
            "not" => (Function::Not, 1, Some(1)),
            "true" => (Function::True, 0, Some(0)),
            "false" => (Function::False, 0, Some(0)),
            "lang" => (Function::Lang, 1, Some(1)),
            "number" => (Function::Number, 0, Some(1)),
            "sum" => (Function::Sum, 1, Some(1)),
            "floor" => (Function::Floor, 1, Some(1)),
            "ceiling" => (Function::Ceiling, 1, Some(1)),
            "round" => (Function::Round, 1, Some(1)),
            _ => return None,
        };
        Some(entry)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Compare(CompareOp, Box<Expr>, Box<Expr>),
    Arithmetic(ArithmeticOp, Box<Expr>, Box<Expr>),
    Negate(Box<Expr>),
    Union(Box<Expr>, Box<Expr>),
    Path(LocationPath),
    /// A primary expression filtered by predicates and followed by steps
    Filter {
        primary: Box<Expr>,
        predicates: Vec<Expr>,
        steps: Vec<Step>,
    },
    Literal(String),
    Number(f64),
    Variable(String),
    Call(Function, Vec<Expr>),
}

impl Expr {
    /// Whether the expression always evaluates to a node-set
    pub(crate) fn returns_nodes(&self) -> bool {
        match self {
            Expr::Path(_) => true,
            Expr::Union(left, right) => left.returns_nodes() && right.returns_nodes(),
            Expr::Filter { primary, .. } => primary.returns_nodes(),
            _ => false,
        }
    }

    /// Whether the expression refers to any variable
    pub(crate) fn uses_variables(&self) -> bool {
        let steps_use = |steps: &[Step]| {
            steps
                .iter()
                .flat_map(|step| &step.predicates)
                .any(Expr::uses_variables)
        };
        match self {
            Expr::Variable(_) => true,
            Expr::Or(left, right)
            | Expr::And(left, right)
            | Expr::Compare(_, left, right)
            | Expr::Arithmetic(_, left, right)
            | Expr::Union(left, right) => left.uses_variables() || right.uses_variables(),
            Expr::Negate(inner) => inner.uses_variables(),
            Expr::Path(path) => steps_use(&path.steps),
            Expr::Filter {
                primary,
                predicates,
                steps,
            } => {
                primary.uses_variables()
                    || predicates.iter().any(Expr::uses_variables)
                    || steps_use(steps)
            }
            Expr::Call(_, args) => args.iter().any(Expr::uses_variables),
            Expr::Literal(_) | Expr::Number(_) => false,
        }
    }
}

fn axis_by_name(name: &str) -> Result<Axis, String> {
    Ok(match name {
        "child" => Axis::Child,
        "descendant" => Axis::Descendant,
        "parent" => Axis::Parent,
        "ancestor" => Axis::Ancestor,
        "following-sibling" => Axis::FollowingSibling,
        "preceding-sibling" => Axis::PrecedingSibling,
        "following" => Axis::Following,
        "preceding" => Axis::Preceding,
        "attribute" => Axis::Attribute,
        "self" => Axis::Self_,
        "descendant-or-self" => Axis::DescendantOrSelf,
        "ancestor-or-self" => Axis::AncestorOrSelf,
        other => return Err(format!("unsupported axis '{}'", other)),
    })
}

fn is_node_type(name: &str) -> bool {
    matches!(name, "node" | "text" | "comment" | "processing-instruction")
}

/// Parse a complete expression
pub(crate) fn parse(input: &str) -> Result<Expr, String> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err("empty expression".to_string());
    }
    let mut parser = Parser { tokens, position: 0 };
    let expr = parser.parse_or()?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(format!("unexpected {:?}", token)),
    }
}

struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.position + offset)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.position += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token) -> Result<(), String> {
        match self.next() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(format!("expected {:?}, found {:?}", expected, token)),
            None => Err(format!("expected {:?} at end of expression", expected)),
        }
    }

    fn parse_or(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_and()?;
        while self.eat(&Token::Or) {
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_equality()?;
        while self.eat(&Token::And) {
            let right = self.parse_equality()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_relational()?;
        loop {
            let op = match self.peek() {
                Some(Token::Equals) => CompareOp::Eq,
                Some(Token::NotEquals) => CompareOp::NotEq,
                _ => return Ok(left),
            };
            self.position += 1;
            let right = self.parse_relational()?;
            left = Expr::Compare(op, Box::new(left), Box::new(right));
        }
    }

    fn parse_relational(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.peek() {
                Some(Token::Less) => CompareOp::Less,
                Some(Token::LessEq) => CompareOp::LessEq,
                Some(Token::Greater) => CompareOp::Greater,
                Some(Token::GreaterEq) => CompareOp::GreaterEq,
                _ => return Ok(left),
            };
            self.position += 1;
            let right = self.parse_additive()?;
            left = Expr::Compare(op, Box::new(left), Box::new(right));
        }
    }

    fn parse_additive(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => ArithmeticOp::Add,
                Some(Token::Minus) => ArithmeticOp::Subtract,
                _ => return Ok(left),
            };
            self.position += 1;
            let right = self.parse_multiplicative()?;
            left = Expr::Arithmetic(op, Box::new(left), Box::new(right));
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Multiply) => ArithmeticOp::Multiply,
                Some(Token::Div) => ArithmeticOp::Divide,
                Some(Token::Mod) => ArithmeticOp::Modulo,
                _ => return Ok(left),
            };
            self.position += 1;
            let right = self.parse_unary()?;
            left = Expr::Arithmetic(op, Box::new(left), Box::new(right));
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, String> {
        if self.eat(&Token::Minus) {
            return Ok(Expr::Negate(Box::new(self.parse_unary()?)));
        }
        self.parse_union()
    }

    fn parse_union(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_path_expr()?;
        while self.eat(&Token::Pipe) {
            let right = self.parse_path_expr()?;
            left = Expr::Union(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn starts_filter(&self) -> bool {
        match self.peek() {
            Some(Token::Variable(_) | Token::LParen | Token::Literal(_) | Token::Number(_)) => true,
            Some(Token::Name(name)) => {
                self.peek_at(1) == Some(&Token::LParen) && !is_node_type(name)
            }
            _ => false,
        }
    }

    fn starts_step(&self) -> bool {
        matches!(
            self.peek(),
            Some(Token::Name(_) | Token::Star | Token::At | Token::Dot | Token::DotDot)
        )
    }

    fn parse_path_expr(&mut self) -> Result<Expr, String> {
        if !self.starts_filter() {
            return Ok(Expr::Path(self.parse_location_path()?));
        }

        let primary = self.parse_primary()?;
        let predicates = self.parse_predicates()?;
        let mut steps = Vec::new();
        match self.peek() {
            Some(Token::Slash) => {
                self.position += 1;
                steps = self.parse_relative_path()?;
            }
            Some(Token::DoubleSlash) => {
                self.position += 1;
                steps.push(Step::new(Axis::DescendantOrSelf, NodeTest::Node));
                steps.extend(self.parse_relative_path()?);
            }
            _ => {}
        }

        if predicates.is_empty() && steps.is_empty() {
            Ok(primary)
        } else {
            Ok(Expr::Filter {
                primary: Box::new(primary),
                predicates,
                steps,
            })
        }
    }

    fn parse_location_path(&mut self) -> Result<LocationPath, String> {
        match self.peek() {
            Some(Token::Slash) => {
                self.position += 1;
                let steps = if self.starts_step() {
                    self.parse_relative_path()?
                } else {
                    Vec::new()
                };
                Ok(LocationPath {
                    absolute: true,
                    steps,
                })
            }
            Some(Token::DoubleSlash) => {
                self.position += 1;
                let mut steps = vec![Step::new(Axis::DescendantOrSelf, NodeTest::Node)];
                steps.extend(self.parse_relative_path()?);
                Ok(LocationPath {
                    absolute: true,
                    steps,
                })
            }
            _ => Ok(LocationPath {
                absolute: false,
                steps: self.parse_relative_path()?,
            }),
        }
    }

    fn parse_relative_path(&mut self) -> Result<Vec<Step>, String> {
        let mut steps = vec![self.parse_step()?];
        loop {
            match self.peek() {
                Some(Token::Slash) => {
                    self.position += 1;
                }
                Some(Token::DoubleSlash) => {
                    self.position += 1;
                    steps.push(Step::new(Axis::DescendantOrSelf, NodeTest::Node));
                }
                _ => return Ok(steps),
            }
            steps.push(self.parse_step()?);
        }
    }

    fn parse_step(&mut self) -> Result<Step, String> {
        if self.eat(&Token::Dot) {
            return Ok(Step::new(Axis::Self_, NodeTest::Node));
        }
        if self.eat(&Token::DotDot) {
            return Ok(Step::new(Axis::Parent, NodeTest::Node));
        }

        let axis = if self.eat(&Token::At) {
            Axis::Attribute
        } else if let (Some(Token::Name(name)), Some(Token::ColonColon)) =
            (self.peek(), self.peek_at(1))
        {
            let axis = axis_by_name(name)?;
            self.position += 2;
            axis
        } else {
            Axis::Child
        };

        let test = self.parse_node_test()?;
        let predicates = self.parse_predicates()?;
        Ok(Step {
            axis,
            test,
            predicates,
        })
    }

    fn parse_node_test(&mut self) -> Result<NodeTest, String> {
        match self.next() {
            Some(Token::Star) => Ok(NodeTest::Name(NameTest::Any)),
            Some(Token::Name(name)) if is_node_type(&name) && self.peek() == Some(&Token::LParen) => {
                self.position += 1;
                let test = match name.as_str() {
                    "node" => NodeTest::Node,
                    "text" => NodeTest::Text,
                    "comment" => NodeTest::Comment,
                    _ => match self.peek() {
                        Some(Token::Literal(target)) => {
                            let target = target.clone();
                            self.position += 1;
                            NodeTest::ProcessingInstruction(Some(target))
                        }
                        _ => NodeTest::ProcessingInstruction(None),
                    },
                };
                self.expect(Token::RParen)?;
                Ok(test)
            }
            Some(Token::Name(name)) => Ok(NodeTest::Name(NameTest::qualified(&name))),
            Some(token) => Err(format!("expected a node test, found {:?}", token)),
            None => Err("expected a node test at end of expression".to_string()),
        }
    }

    fn parse_predicates(&mut self) -> Result<Vec<Expr>, String> {
        let mut predicates = Vec::new();
        while self.eat(&Token::LBracket) {
            predicates.push(self.parse_or()?);
            self.expect(Token::RBracket)?;
        }
        Ok(predicates)
    }

    fn parse_primary(&mut self) -> Result<Expr, String> {
        match self.next() {
            Some(Token::Variable(name)) => Ok(Expr::Variable(name)),
            Some(Token::Literal(value)) => Ok(Expr::Literal(value)),
            Some(Token::Number(value)) => Ok(Expr::Number(value)),
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Name(name)) => {
                let (function, min, max) =
                    Function::lookup(&name).ok_or_else(|| format!("unknown function '{}'", name))?;
                self.expect(Token::LParen)?;
                let mut args = Vec::new();
                if !self.eat(&Token::RParen) {
                    loop {
                        args.push(self.parse_or()?);
                        if self.eat(&Token::RParen) {
                            break;
                        }
                        self.expect(Token::Comma)?;
                    }
                }
                if args.len() < min || max.is_some_and(|max| args.len() > max) {
                    return Err(format!(
                        "wrong number of arguments for {}(): {}",
                        name,
                        args.len()
                    ));
                }
                Ok(Expr::Call(function, args))
            }
            Some(token) => Err(format!("unexpected {:?}", token)),
            None => Err("unexpected end of expression".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn child(name: &str) -> Step {
        Step::new(Axis::Child, NodeTest::Name(NameTest::qualified(name)))
    }

    #[test]
    fn test_tokenize_operator_names_by_position() {
        assert_eq!(
            tokenize("div div div").unwrap(),
            vec![
                Token::Name("div".to_string()),
                Token::Div,
                Token::Name("div".to_string())
            ]
        );
        assert_eq!(
            tokenize("* * *").unwrap(),
            vec![Token::Star, Token::Multiply, Token::Star]
        );
        assert_eq!(
            tokenize("@and and @or").unwrap(),
            vec![
                Token::At,
                Token::Name("and".to_string()),
                Token::And,
                Token::At,
                Token::Name("or".to_string())
            ]
        );
    }

    #[test]
    fn test_tokenize_literals_numbers_and_axes() {
        assert_eq!(
            tokenize(r#"child::x:p[.5 != "a'b"]"#).unwrap(),
            vec![
                Token::Name("child".to_string()),
                Token::ColonColon,
                Token::Name("x:p".to_string()),
                Token::LBracket,
                Token::Number(0.5),
                Token::NotEquals,
                Token::Literal("a'b".to_string()),
                Token::RBracket,
            ]
        );
        assert_eq!(
            tokenize("../@x:*").unwrap(),
            vec![
                Token::DotDot,
                Token::Slash,
                Token::At,
                Token::Name("x:*".to_string())
            ]
        );
    }

    #[test]
    fn test_tokenize_errors() {
        assert!(tokenize("p[@a='x]").is_err());
        assert!(tokenize("p#q").is_err());
        assert!(tokenize("$").is_err());
    }

    #[test]
    fn test_parse_abbreviated_path() {
        let expr = parse("/section//table").unwrap();
        assert_eq!(
            expr,
            Expr::Path(LocationPath {
                absolute: true,
                steps: vec![
                    child("section"),
                    Step::new(Axis::DescendantOrSelf, NodeTest::Node),
                    child("table"),
                ],
            })
        );
    }

    #[test]
    fn test_parse_operator_precedence() {
        let expr = parse("@a = 1 or @b and not(@c)").unwrap();
        let Expr::Or(left, right) = expr else {
            panic!("expected or at the top");
        };
        assert!(matches!(*left, Expr::Compare(CompareOp::Eq, _, _)));
        assert!(matches!(*right, Expr::And(_, _)));

        let expr = parse("1 + 2 * 3").unwrap();
        let Expr::Arithmetic(ArithmeticOp::Add, _, right) = expr else {
            panic!("expected addition at the top");
        };
        assert!(matches!(*right, Expr::Arithmetic(ArithmeticOp::Multiply, _, _)));
    }

    #[test]
    fn test_parse_node_type_tests_and_functions() {
        let expr = parse("/p[text()='x'][last()]/comment()").unwrap();
        let Expr::Path(path) = expr else {
            panic!("expected a path");
        };
        assert_eq!(path.steps[0].predicates.len(), 2);
        assert_eq!(path.steps[1].test, NodeTest::Comment);
        assert_eq!(
            path.steps[0].predicates[1],
            Expr::Call(Function::Last, Vec::new())
        );
    }

    #[test]
    fn test_parse_filter_expression() {
        let expr = parse("(//p | //li)[1]/b").unwrap();
        assert!(expr.returns_nodes());
        assert!(matches!(expr, Expr::Filter { .. }));
        assert!(!parse("count(//p)").unwrap().returns_nodes());
        assert!(!parse("/p = 'x'").unwrap().returns_nodes());
    }

    #[test]
    fn test_parse_errors() {
        for invalid in [
            "/p[",
            "/p]",
            "/p[@id",
            "foo(1)",
            "count()",
            "namespace::x",
            "/p[1]]",
            "@",
            "/a*",
            "",
        ] {
            assert!(parse(invalid).is_err(), "{}", invalid);
        }
    }

    #[test]
    fn test_uses_variables() {
        assert!(parse("//p[@id = $value]").unwrap().uses_variables());
        assert!(!parse("//p[@id = 'value']").unwrap().uses_variables());
    }
}
