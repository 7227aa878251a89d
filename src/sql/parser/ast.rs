//! The Abstract Syntax Tree for a parsed query. The nodes are a pure
//! syntactic description: they only say what the query looks like, not what it
//! means or how to execute it. Display renders the tree for inspection.

use std::fmt;

/// A parsed SELECT query.
#[derive(Clone, Debug, PartialEq)]
pub struct Query {
    /// The SELECT projection.
    pub select: Select,
    /// The FROM tables, in source order. Never empty.
    pub from: Vec<Table>,
    /// The WHERE condition, if any.
    pub filter: Option<Expression>,
}

/// A SELECT projection.
#[derive(Clone, Debug, PartialEq)]
pub struct Select {
    /// The projected expressions, in source order. Never empty; a bare * is
    /// represented as a sole Expression::All field.
    pub fields: Vec<Expression>,
}

/// A FROM table, with an optional bare alias.
#[derive(Clone, Debug, PartialEq)]
pub struct Table {
    pub name: String,
    pub alias: Option<String>,
}

/// Expressions. A strict tree: parents exclusively own their children, and
/// binary operators always have both operands (there is no way to construct
/// one without).
#[derive(Clone, Debug, PartialEq)]
pub enum Expression {
    /// All columns, i.e. *.
    All,
    /// A column reference, optionally qualified by a table name or alias.
    Field(Option<String>, String),
    /// A literal value.
    Literal(Literal),
    /// A function call with its arguments, possibly empty.
    Function(String, Vec<Expression>),
    /// An operator applied to one or two operand expressions.
    Operator(Operator),
}

/// Literal values. Numbers keep their original source text rather than a
/// parsed value, so the tree preserves the exact representation.
#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Null,
    Boolean(bool),
    Number(String),
    String(String),
}

/// Operators. Binary variants hold the left operand first.
#[derive(Clone, Debug, PartialEq)]
pub enum Operator {
    Add(Box<Expression>, Box<Expression>),                // a + b
    And(Box<Expression>, Box<Expression>),                // a AND b
    Divide(Box<Expression>, Box<Expression>),             // a / b
    Equal(Box<Expression>, Box<Expression>),              // a = b
    GreaterThan(Box<Expression>, Box<Expression>),        // a > b
    GreaterThanOrEqual(Box<Expression>, Box<Expression>), // a >= b
    LessThan(Box<Expression>, Box<Expression>),           // a < b
    LessThanOrEqual(Box<Expression>, Box<Expression>),    // a <= b
    Multiply(Box<Expression>, Box<Expression>),           // a * b
    Not(Box<Expression>),                                 // NOT a
    NotEqual(Box<Expression>, Box<Expression>),           // a != b
    Or(Box<Expression>, Box<Expression>),                 // a OR b
    Subtract(Box<Expression>, Box<Expression>),           // a - b
}

impl From<Literal> for Expression {
    fn from(literal: Literal) -> Self {
        Self::Literal(literal)
    }
}

impl From<Operator> for Expression {
    fn from(operator: Operator) -> Self {
        Self::Operator(operator)
    }
}

/// Renders the query as a tree, visiting every node exactly once in the order
/// Select (fields in source order), From (tables in source order), then Where
/// if a filter is present. This is a pure read of the tree and is repeatable.
impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Query")?;

        let prefix = branch(f, "", false)?;
        write!(f, "Select")?;
        let fields = self.select.fields.len();
        for (i, field) in self.select.fields.iter().enumerate() {
            field.format(f, &prefix, i + 1 == fields)?;
        }

        let prefix = branch(f, "", self.filter.is_none())?;
        write!(f, "From")?;
        let tables = self.from.len();
        for (i, table) in self.from.iter().enumerate() {
            branch(f, &prefix, i + 1 == tables)?;
            write!(f, "{table}")?;
        }

        if let Some(filter) = &self.filter {
            let prefix = branch(f, "", true)?;
            write!(f, "Where")?;
            filter.format(f, &prefix, true)?;
        }
        Ok(())
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.alias {
            Some(alias) => write!(f, "Table: {} AS {alias}", self.name),
            None => write!(f, "Table: {}", self.name),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "Null"),
            Self::Boolean(b) => write!(f, "Boolean: {b}"),
            Self::Number(n) => write!(f, "Number: {n}"),
            Self::String(s) => write!(f, "String: \"{s}\""),
        }
    }
}

impl Expression {
    /// Recursively formats the expression as a branch of the tree, labeling
    /// each node with its variant and recursing into operands and arguments
    /// left to right.
    fn format(&self, f: &mut fmt::Formatter<'_>, prefix: &str, last: bool) -> fmt::Result {
        let prefix = branch(f, prefix, last)?;
        match self {
            Self::All => write!(f, "All"),
            Self::Field(None, name) => write!(f, "Field: {name}"),
            Self::Field(Some(table), name) => write!(f, "Field: {table}.{name}"),
            Self::Literal(literal) => write!(f, "{literal}"),
            Self::Function(name, args) => {
                write!(f, "Function: {name}")?;
                let count = args.len();
                for (i, arg) in args.iter().enumerate() {
                    arg.format(f, &prefix, i + 1 == count)?;
                }
                Ok(())
            }
            Self::Operator(operator) => operator.format(f, &prefix),
        }
    }
}

impl Operator {
    fn format(&self, f: &mut fmt::Formatter<'_>, prefix: &str) -> fmt::Result {
        let (label, operands) = match self {
            Self::Add(lhs, rhs) => ("Add", vec![lhs.as_ref(), rhs.as_ref()]),
            Self::And(lhs, rhs) => ("And", vec![lhs.as_ref(), rhs.as_ref()]),
            Self::Divide(lhs, rhs) => ("Divide", vec![lhs.as_ref(), rhs.as_ref()]),
            Self::Equal(lhs, rhs) => ("Equal", vec![lhs.as_ref(), rhs.as_ref()]),
            Self::GreaterThan(lhs, rhs) => ("GreaterThan", vec![lhs.as_ref(), rhs.as_ref()]),
            Self::GreaterThanOrEqual(lhs, rhs) => {
                ("GreaterThanOrEqual", vec![lhs.as_ref(), rhs.as_ref()])
            }
            Self::LessThan(lhs, rhs) => ("LessThan", vec![lhs.as_ref(), rhs.as_ref()]),
            Self::LessThanOrEqual(lhs, rhs) => {
                ("LessThanOrEqual", vec![lhs.as_ref(), rhs.as_ref()])
            }
            Self::Multiply(lhs, rhs) => ("Multiply", vec![lhs.as_ref(), rhs.as_ref()]),
            Self::Not(expr) => ("Not", vec![expr.as_ref()]),
            Self::NotEqual(lhs, rhs) => ("NotEqual", vec![lhs.as_ref(), rhs.as_ref()]),
            Self::Or(lhs, rhs) => ("Or", vec![lhs.as_ref(), rhs.as_ref()]),
            Self::Subtract(lhs, rhs) => ("Subtract", vec![lhs.as_ref(), rhs.as_ref()]),
        };
        write!(f, "{label}")?;
        let count = operands.len();
        for (i, operand) in operands.into_iter().enumerate() {
            operand.format(f, prefix, i + 1 == count)?;
        }
        Ok(())
    }
}

/// Writes a tree branch for a child node: a newline, the parent's prefix, and
/// a branch glyph. Returns the prefix for the child's own children.
fn branch(f: &mut fmt::Formatter<'_>, prefix: &str, last: bool) -> Result<String, fmt::Error> {
    writeln!(f)?;
    write!(f, "{prefix}")?;
    match last {
        true => {
            write!(f, "└─ ")?;
            Ok(format!("{prefix}   "))
        }
        false => {
            write!(f, "├─ ")?;
            Ok(format!("{prefix}│  "))
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::sql::parser::{Parser, Scanner};

    /// Scans, parses, and renders the input query.
    fn render(input: &str) -> String {
        let (tokens, errors) = Scanner::new(input).scan();
        assert_eq!(errors, Vec::new());
        let query = Parser::new(tokens).parse().expect("parse failed");
        format!("{query}")
    }

    #[test]
    fn renders_all_clauses() {
        assert_eq!(
            render("select t.x, f(a, b) from t, u alt where x > 1 and not done;"),
            [
                "Query",
                "├─ Select",
                "│  ├─ Field: t.x",
                "│  └─ Function: f",
                "│     ├─ Field: a",
                "│     └─ Field: b",
                "├─ From",
                "│  ├─ Table: t",
                "│  └─ Table: u AS alt",
                "└─ Where",
                "   └─ And",
                "      ├─ GreaterThan",
                "      │  ├─ Field: x",
                "      │  └─ Number: 1",
                "      └─ Not",
                "         └─ Field: done",
            ]
            .join("\n")
        );
    }

    #[test]
    fn renders_star_without_where() {
        assert_eq!(
            render("select * from t;"),
            ["Query", "├─ Select", "│  └─ All", "└─ From", "   └─ Table: t"].join("\n")
        );
    }

    #[test]
    fn renders_literals() {
        assert_eq!(
            render(r#"select 3.14, "hi", true, false, null from t;"#),
            [
                "Query",
                "├─ Select",
                "│  ├─ Number: 3.14",
                "│  ├─ String: \"hi\"",
                "│  ├─ Boolean: true",
                "│  ├─ Boolean: false",
                "│  └─ Null",
                "└─ From",
                "   └─ Table: t",
            ]
            .join("\n")
        );
    }

    #[test]
    fn rendering_is_repeatable() {
        let (tokens, _) = Scanner::new("select a - b - c from t where a or b;").scan();
        let query = Parser::new(tokens).parse().expect("parse failed");
        assert_eq!(format!("{query}"), format!("{query}"));
    }
}
