use super::ast;
use super::scanner::{Token, TokenKind, Value};
use crate::errparse;
use crate::error::Result;

/// The parser takes the token sequence produced by the scanner and parses it
/// into an Abstract Syntax Tree via recursive descent with one token of
/// lookahead. The AST only captures the syntactic structure of the query; it
/// doesn't know whether a table or column exists, and carries no execution
/// semantics.
///
/// A syntax error short-circuits the rule call chain via Result and ?, so no
/// partial tree escapes a failed parse. Before returning the error, the parser
/// synchronizes to the next statement-boundary token, bounding the damage of a
/// malformed query.
pub struct Parser {
    tokens: Vec<Token>,
    /// Index of the lookahead token.
    index: usize,
}

impl Parser {
    /// Creates a parser for the given token sequence. The scanner always
    /// terminates the sequence with an Eof token; hand-built sequences without
    /// one get one appended, so the lookahead never runs off the end.
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().map(|t| t.kind) != Some(TokenKind::Eof) {
            let line = tokens.last().map_or(1, |t| t.line);
            tokens.push(Token {
                kind: TokenKind::Eof,
                lexeme: String::new(),
                literal: None,
                line,
            });
        }
        Self { tokens, index: 0 }
    }

    /// Parses the token sequence as a single query with an optional trailing
    /// semicolon. On a syntax error the parser discards tokens up to the next
    /// statement-boundary token before returning the error, so a subsequent
    /// call can resume from there.
    pub fn parse(&mut self) -> Result<ast::Query> {
        let query = self.parse_query();
        if query.is_err() {
            self.synchronize();
        }
        query
    }

    /// The lookahead token.
    fn peek(&self) -> &Token {
        &self.tokens[self.index]
    }

    /// Consumes and returns the lookahead token. Never advances past Eof.
    fn next(&mut self) -> Token {
        let token = self.tokens[self.index].clone();
        if token.kind != TokenKind::Eof {
            self.index += 1;
        }
        token
    }

    /// Consumes the lookahead token if it has the given kind, returning true.
    fn next_is(&mut self, kind: TokenKind) -> bool {
        self.next_if(|k| k == kind).is_some()
    }

    /// Consumes and returns the lookahead token if its kind satisfies the
    /// predicate.
    fn next_if(&mut self, predicate: impl Fn(TokenKind) -> bool) -> Option<Token> {
        predicate(self.peek().kind).then(|| self.next())
    }

    /// Consumes and returns the lookahead token if it has the expected kind,
    /// or errors with the expected and found kinds.
    fn expect(&mut self, expect: TokenKind) -> Result<Token> {
        let token = self.peek();
        if token.kind != expect {
            return errparse!(token.line, "expected {expect}, found {}", token.kind);
        }
        Ok(self.next())
    }

    /// Consumes the lookahead token if it has the given kind. Equivalent to
    /// next_is(), but expresses intent better.
    fn skip(&mut self, kind: TokenKind) {
        self.next_is(kind);
    }

    /// Panic-mode recovery: discards tokens until the lookahead is a
    /// statement-boundary token (FROM, WHERE, or ;) or the input ends.
    fn synchronize(&mut self) {
        use TokenKind::*;
        while !matches!(self.peek().kind, From | Where | Semicolon | Eof) {
            self.next();
        }
    }

    /// Parses a query:
    ///
    /// Query → SELECT DISTINCT? Projection FROM TableList Where? ;?
    ///
    /// After the optional semicolon the input must be exhausted.
    fn parse_query(&mut self) -> Result<ast::Query> {
        self.expect(TokenKind::Select)?;
        let select = self.parse_select_clause()?;
        self.expect(TokenKind::From)?;
        let from = self.parse_from_clause()?;
        let filter = self.parse_where_clause()?;
        self.skip(TokenKind::Semicolon);
        let token = self.peek();
        if token.kind != TokenKind::Eof {
            return errparse!(token.line, "unexpected {}", token.kind);
        }
        Ok(ast::Query { select, from, filter })
    }

    /// Parses the SELECT projection. DISTINCT is accepted and consumed, but
    /// not represented in the AST. A bare * becomes the sole All field;
    /// otherwise the projection is a comma-separated expression list.
    fn parse_select_clause(&mut self) -> Result<ast::Select> {
        self.skip(TokenKind::Distinct);
        if self.next_is(TokenKind::Asterisk) {
            return Ok(ast::Select { fields: vec![ast::Expression::All] });
        }
        let mut fields = vec![self.parse_expression()?];
        while self.next_is(TokenKind::Comma) {
            fields.push(self.parse_expression()?);
        }
        Ok(ast::Select { fields })
    }

    /// Parses the FROM table list. Always yields at least one table.
    fn parse_from_clause(&mut self) -> Result<Vec<ast::Table>> {
        let mut from = vec![self.parse_table()?];
        while self.next_is(TokenKind::Comma) {
            from.push(self.parse_table()?);
        }
        Ok(from)
    }

    /// Parses a table name with an optional bare alias (no AS keyword).
    fn parse_table(&mut self) -> Result<ast::Table> {
        let name = self.expect(TokenKind::Ident)?.lexeme;
        let alias = self.next_if(|k| k == TokenKind::Ident).map(|t| t.lexeme);
        Ok(ast::Table { name, alias })
    }

    /// Parses the WHERE clause, if present.
    fn parse_where_clause(&mut self) -> Result<Option<ast::Expression>> {
        if !self.next_is(TokenKind::Where) {
            return Ok(None);
        }
        Ok(Some(self.parse_expression()?))
    }

    /// Parses an expression. Precedence is encoded by the nesting of the rule
    /// calls below: the innermost rule binds tightest, so OR has the lowest
    /// precedence and unary NOT the highest, besides grouping. Every binary
    /// rule accumulates its operator left-associatively, so a - b - c parses
    /// as (a - b) - c.
    fn parse_expression(&mut self) -> Result<ast::Expression> {
        self.parse_or()
    }

    /// LogicOr → LogicAnd (OR LogicAnd)*
    fn parse_or(&mut self) -> Result<ast::Expression> {
        let mut lhs = self.parse_and()?;
        while self.next_is(TokenKind::Or) {
            let rhs = self.parse_and()?;
            lhs = ast::Operator::Or(Box::new(lhs), Box::new(rhs)).into();
        }
        Ok(lhs)
    }

    /// LogicAnd → Equality (AND Equality)*
    fn parse_and(&mut self) -> Result<ast::Expression> {
        let mut lhs = self.parse_equality()?;
        while self.next_is(TokenKind::And) {
            let rhs = self.parse_equality()?;
            lhs = ast::Operator::And(Box::new(lhs), Box::new(rhs)).into();
        }
        Ok(lhs)
    }

    /// Equality → Comparison ((= | !=) Comparison)*
    fn parse_equality(&mut self) -> Result<ast::Expression> {
        use TokenKind::*;
        let mut lhs = self.parse_comparison()?;
        while let Some(token) = self.next_if(|k| matches!(k, Equal | NotEqual)) {
            let rhs = self.parse_comparison()?;
            let (lhs_, rhs) = (Box::new(lhs), Box::new(rhs));
            lhs = match token.kind {
                Equal => ast::Operator::Equal(lhs_, rhs).into(),
                _ => ast::Operator::NotEqual(lhs_, rhs).into(),
            };
        }
        Ok(lhs)
    }

    /// Comparison → Arithmetic ((< | <= | > | >=) Arithmetic)*
    fn parse_comparison(&mut self) -> Result<ast::Expression> {
        use TokenKind::*;
        let mut lhs = self.parse_arithmetic()?;
        while let Some(token) = self
            .next_if(|k| matches!(k, LessThan | LessThanOrEqual | GreaterThan | GreaterThanOrEqual))
        {
            let rhs = self.parse_arithmetic()?;
            let (lhs_, rhs) = (Box::new(lhs), Box::new(rhs));
            lhs = match token.kind {
                LessThan => ast::Operator::LessThan(lhs_, rhs).into(),
                LessThanOrEqual => ast::Operator::LessThanOrEqual(lhs_, rhs).into(),
                GreaterThan => ast::Operator::GreaterThan(lhs_, rhs).into(),
                _ => ast::Operator::GreaterThanOrEqual(lhs_, rhs).into(),
            };
        }
        Ok(lhs)
    }

    /// Arithmetic → Term ((+ | -) Term)*
    fn parse_arithmetic(&mut self) -> Result<ast::Expression> {
        use TokenKind::*;
        let mut lhs = self.parse_term()?;
        while let Some(token) = self.next_if(|k| matches!(k, Plus | Minus)) {
            let rhs = self.parse_term()?;
            let (lhs_, rhs) = (Box::new(lhs), Box::new(rhs));
            lhs = match token.kind {
                Plus => ast::Operator::Add(lhs_, rhs).into(),
                _ => ast::Operator::Subtract(lhs_, rhs).into(),
            };
        }
        Ok(lhs)
    }

    /// Term → Unary ((* | /) Unary)*
    fn parse_term(&mut self) -> Result<ast::Expression> {
        use TokenKind::*;
        let mut lhs = self.parse_unary()?;
        while let Some(token) = self.next_if(|k| matches!(k, Asterisk | Slash)) {
            let rhs = self.parse_unary()?;
            let (lhs_, rhs) = (Box::new(lhs), Box::new(rhs));
            lhs = match token.kind {
                Asterisk => ast::Operator::Multiply(lhs_, rhs).into(),
                _ => ast::Operator::Divide(lhs_, rhs).into(),
            };
        }
        Ok(lhs)
    }

    /// Unary → NOT Unary | Primary
    fn parse_unary(&mut self) -> Result<ast::Expression> {
        if self.next_is(TokenKind::Not) {
            let expr = self.parse_unary()?;
            return Ok(ast::Operator::Not(Box::new(expr)).into());
        }
        self.parse_atom()
    }

    /// Parses a primary expression. This is either:
    ///
    /// * A literal value.
    /// * A column reference, qualified as table.column or bare.
    /// * A function call.
    /// * A parenthesized expression, which returns the inner subtree.
    fn parse_atom(&mut self) -> Result<ast::Expression> {
        let token = self.next();
        Ok(match token.kind {
            TokenKind::Number => ast::Literal::Number(token.lexeme).into(),
            TokenKind::String => match token.literal {
                Some(Value::String(s)) => ast::Literal::String(s).into(),
                _ => return errparse!(token.line, "string token without a literal value"),
            },
            TokenKind::True => ast::Literal::Boolean(true).into(),
            TokenKind::False => ast::Literal::Boolean(false).into(),
            TokenKind::Null => ast::Literal::Null.into(),

            TokenKind::Ident if self.next_is(TokenKind::Period) => {
                let column = self.expect(TokenKind::Ident)?.lexeme;
                ast::Expression::Field(Some(token.lexeme), column)
            }
            TokenKind::Ident if self.next_is(TokenKind::OpenParen) => {
                let mut args = Vec::new();
                if self.peek().kind != TokenKind::CloseParen {
                    args.push(self.parse_expression()?);
                    while self.next_is(TokenKind::Comma) {
                        args.push(self.parse_expression()?);
                    }
                }
                self.expect(TokenKind::CloseParen)?;
                ast::Expression::Function(token.lexeme, args)
            }
            TokenKind::Ident => ast::Expression::Field(None, token.lexeme),

            TokenKind::OpenParen => {
                let expr = self.parse_expression()?;
                self.expect(TokenKind::CloseParen)?;
                expr
            }

            kind => return errparse!(token.line, "expected an expression, found {kind}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::sql::parser::ast::{Expression, Literal, Operator, Query, Select, Table};
    use crate::sql::parser::Scanner;

    /// Scans and parses the input, asserting it has no lexical errors.
    fn parse(input: &str) -> Result<Query> {
        let (tokens, errors) = Scanner::new(input).scan();
        assert_eq!(errors, Vec::new());
        Parser::new(tokens).parse()
    }

    fn field(name: &str) -> Expression {
        Expression::Field(None, name.to_string())
    }

    fn number(n: &str) -> Expression {
        Literal::Number(n.to_string()).into()
    }

    fn table(name: &str) -> Table {
        Table { name: name.to_string(), alias: None }
    }

    #[test]
    fn star_and_optional_clauses() {
        // A star-only projection, two tables, and no filter.
        assert_eq!(
            parse("select * from t1, t2;"),
            Ok(Query {
                select: Select { fields: vec![Expression::All] },
                from: vec![table("t1"), table("t2")],
                filter: None,
            })
        );
        // The trailing semicolon is optional.
        assert_eq!(parse("select * from t1, t2"), parse("select * from t1, t2;"));
    }

    #[test]
    fn qualified_fields_and_function_calls() {
        assert_eq!(
            parse("select t.x, f(a, b), now() from t;"),
            Ok(Query {
                select: Select {
                    fields: vec![
                        Expression::Field(Some("t".to_string()), "x".to_string()),
                        Expression::Function("f".to_string(), vec![field("a"), field("b")]),
                        Expression::Function("now".to_string(), Vec::new()),
                    ]
                },
                from: vec![table("t")],
                filter: None,
            })
        );
    }

    #[test]
    fn table_alias() {
        assert_eq!(
            parse("select * from movies m;"),
            Ok(Query {
                select: Select { fields: vec![Expression::All] },
                from: vec![Table { name: "movies".to_string(), alias: Some("m".to_string()) }],
                filter: None,
            })
        );
    }

    #[test]
    fn distinct_is_consumed_but_not_represented() {
        assert_eq!(parse("select distinct a from t;"), parse("select a from t;"));
    }

    #[test]
    fn subtraction_is_left_associative() {
        // a - b - c groups as (a - b) - c.
        assert_eq!(
            parse("select a - b - c from t;"),
            Ok(Query {
                select: Select {
                    fields: vec![Operator::Subtract(
                        Box::new(
                            Operator::Subtract(Box::new(field("a")), Box::new(field("b"))).into()
                        ),
                        Box::new(field("c")),
                    )
                    .into()]
                },
                from: vec![table("t")],
                filter: None,
            })
        );
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        // a + b * c groups as a + (b * c).
        assert_eq!(
            parse("select a + b * c from t;"),
            Ok(Query {
                select: Select {
                    fields: vec![Operator::Add(
                        Box::new(field("a")),
                        Box::new(
                            Operator::Multiply(Box::new(field("b")), Box::new(field("c"))).into()
                        ),
                    )
                    .into()]
                },
                from: vec![table("t")],
                filter: None,
            })
        );
    }

    #[test]
    fn or_has_lowest_precedence() {
        // not a and b or c = 1 groups as ((not a) and b) or (c = 1).
        assert_eq!(
            parse("select * from t where not a and b or c = 1;"),
            Ok(Query {
                select: Select { fields: vec![Expression::All] },
                from: vec![table("t")],
                filter: Some(
                    Operator::Or(
                        Box::new(
                            Operator::And(
                                Box::new(Operator::Not(Box::new(field("a"))).into()),
                                Box::new(field("b")),
                            )
                            .into()
                        ),
                        Box::new(
                            Operator::Equal(Box::new(field("c")), Box::new(number("1"))).into()
                        ),
                    )
                    .into()
                ),
            })
        );
    }

    #[test]
    fn grouping_overrides_precedence() {
        // (a + b) * c keeps the parenthesized subtree as the left operand.
        assert_eq!(
            parse("select (a + b) * c from t;"),
            Ok(Query {
                select: Select {
                    fields: vec![Operator::Multiply(
                        Box::new(Operator::Add(Box::new(field("a")), Box::new(field("b"))).into()),
                        Box::new(field("c")),
                    )
                    .into()]
                },
                from: vec![table("t")],
                filter: None,
            })
        );
    }

    #[test]
    fn literals() {
        assert_eq!(
            parse(r#"select 3.14, "hi", true, false, null from t;"#),
            Ok(Query {
                select: Select {
                    fields: vec![
                        number("3.14"),
                        Literal::String("hi".to_string()).into(),
                        Literal::Boolean(true).into(),
                        Literal::Boolean(false).into(),
                        Literal::Null.into(),
                    ]
                },
                from: vec![table("t")],
                filter: None,
            })
        );
    }

    #[test]
    fn numbers_preserve_their_source_text() {
        assert_eq!(
            parse("select 1.50, 1.5e2 from t;"),
            Ok(Query {
                select: Select { fields: vec![number("1.50"), number("1.5e2")] },
                from: vec![table("t")],
                filter: None,
            })
        );
    }

    #[test]
    fn parsing_is_idempotent() {
        let input = "select a, f(b) from t where a >= 1;";
        assert_eq!(parse(input), parse(input));
    }

    #[test]
    fn missing_from() {
        assert_eq!(parse("select a;"), Err(Error::parse(1, "expected FROM, found ;")));
    }

    #[test]
    fn missing_select() {
        assert_eq!(
            parse("a from t;"),
            Err(Error::parse(1, "expected SELECT, found identifier"))
        );
    }

    #[test]
    fn from_requires_an_identifier() {
        assert_eq!(
            parse("select * from 1;"),
            Err(Error::parse(1, "expected identifier, found number"))
        );
    }

    #[test]
    fn malformed_primary_expression() {
        assert_eq!(
            parse("select a + from t;"),
            Err(Error::parse(1, "expected an expression, found FROM"))
        );
    }

    #[test]
    fn unclosed_function_call() {
        assert_eq!(
            parse("select f(a from t;"),
            Err(Error::parse(1, "expected ), found FROM"))
        );
    }

    #[test]
    fn unclosed_grouping() {
        assert_eq!(
            parse("select * from t where (a = 1;"),
            Err(Error::parse(1, "expected ), found ;"))
        );
    }

    #[test]
    fn trailing_tokens_are_rejected() {
        assert_eq!(
            parse("select a from t; select"),
            Err(Error::parse(1, "unexpected SELECT"))
        );
    }

    #[test]
    fn errors_carry_the_source_line() {
        assert_eq!(
            parse("select a\nfrom t\nwhere ;"),
            Err(Error::parse(3, "expected an expression, found ;"))
        );
    }

    #[test]
    fn is_has_no_grammar_production() {
        // IS scans as a keyword, but the grammar has no IS [NOT] NULL rule.
        assert_eq!(
            parse("select * from t where a is null;"),
            Err(Error::parse(1, "unexpected IS"))
        );
    }

    #[test]
    fn synchronizes_at_a_statement_boundary() {
        // After a failed parse the lookahead sits at the next FROM, WHERE, or
        // semicolon, so a subsequent call resumes from there.
        let (tokens, errors) = Scanner::new("select + from t;").scan();
        assert_eq!(errors, Vec::new());
        let mut parser = Parser::new(tokens);
        assert!(parser.parse().is_err());
        assert_eq!(parser.peek().kind, TokenKind::From);
    }
}
