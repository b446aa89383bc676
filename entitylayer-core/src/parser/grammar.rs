//! Recursive-descent parser for the textual query grammar.
//!
//! The grammar classifies a query into one of select, delete, insert or
//! update by its leading keyword:
//!
//! ```text
//! select (* | field, ...) from family [where cond [and|or cond]...]
//!        [order by field [asc|desc], ...] [skip n] [limit n]
//! delete [field, ...] from family [where ...]
//! insert family (field = value, ...) [ttl n (ns|ms|s|m|h|d)]
//! update family (field = value, ...)
//! ```
//!
//! Values are quoted strings, numbers, booleans, bare tokens (treated as
//! strings) or `@name` parameter references. `and`/`or` chains combine
//! pairwise in source order with no precedence.

use bson::Bson;
use chrono::Duration;

use crate::{
    condition::{Condition, FieldCondition},
    delete::DeleteQuery,
    entity::{Entity, NamedField},
    error::{EntityStoreError, EntityStoreResult},
    observer::QueryObserver,
    query::SelectQuery,
    value::{Param, Value},
};

use super::lexer::{tokenize, Token};

/// One parsed statement, ready for dispatch to a manager.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Statement {
    Select(SelectQuery),
    Delete(DeleteQuery),
    Insert {
        entity: Entity,
        ttl: Option<Duration>,
    },
    Update(Entity),
}

/// The result of parsing: the statement plus every parameter reference it
/// declares, in source order.
#[derive(Debug, Clone)]
pub(crate) struct ParseOutput {
    pub statement: Statement,
    pub params: Vec<Param>,
}

/// Parses a query text, applying the observer to every entity and field
/// name.
///
/// # Errors
///
/// Returns [`EntityStoreError::Syntax`] for text outside the grammar and
/// [`EntityStoreError::InvalidArgument`] for structurally invalid operands
/// (negative skip/limit).
pub(crate) fn parse(
    text: &str,
    observer: &dyn QueryObserver,
) -> EntityStoreResult<ParseOutput> {
    let tokens = tokenize(text)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        params: Vec::new(),
        observer,
    };

    let statement = match parser.next_keyword()?.as_str() {
        "select" => parser.select()?,
        "delete" => parser.delete()?,
        "insert" => parser.insert()?,
        "update" => parser.update()?,
        other => {
            return Err(EntityStoreError::Syntax(format!(
                "expected select, delete, insert or update, found '{other}'"
            )));
        }
    };

    parser.expect_end()?;

    Ok(ParseOutput {
        statement,
        params: parser.params,
    })
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    params: Vec<Param>,
    observer: &'a dyn QueryObserver,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// Consumes the next token, which must be a bare word, and lowercases it.
    fn next_keyword(&mut self) -> EntityStoreResult<String> {
        match self.next() {
            Some(Token::Ident(word)) => Ok(word.to_ascii_lowercase()),
            Some(other) => Err(EntityStoreError::Syntax(format!(
                "expected a keyword, found {other:?}"
            ))),
            None => Err(EntityStoreError::Syntax("unexpected end of query".to_string())),
        }
    }

    /// Consumes the given keyword if it is next; returns whether it was.
    fn eat_keyword(&mut self, keyword: &str) -> bool {
        match self.peek() {
            Some(Token::Ident(word)) if word.eq_ignore_ascii_case(keyword) => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> EntityStoreResult<()> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(EntityStoreError::Syntax(format!(
                "expected '{keyword}', found {:?}",
                self.peek()
            )))
        }
    }

    fn expect_ident(&mut self, what: &str) -> EntityStoreResult<String> {
        match self.next() {
            Some(Token::Ident(word)) => Ok(word),
            Some(other) => Err(EntityStoreError::Syntax(format!(
                "expected {what}, found {other:?}"
            ))),
            None => Err(EntityStoreError::Syntax(format!(
                "expected {what}, found end of query"
            ))),
        }
    }

    fn expect_token(&mut self, expected: Token) -> EntityStoreResult<()> {
        match self.next() {
            Some(token) if token == expected => Ok(()),
            Some(other) => Err(EntityStoreError::Syntax(format!(
                "expected {expected:?}, found {other:?}"
            ))),
            None => Err(EntityStoreError::Syntax(format!(
                "expected {expected:?}, found end of query"
            ))),
        }
    }

    fn expect_end(&mut self) -> EntityStoreResult<()> {
        match self.peek() {
            None => Ok(()),
            Some(token) => Err(EntityStoreError::Syntax(format!(
                "unexpected trailing input at {token:?}"
            ))),
        }
    }

    fn field_name(&mut self) -> EntityStoreResult<String> {
        let name = self.expect_ident("a field name")?;
        Ok(self.observer.fire_field(&name))
    }

    fn family_name(&mut self) -> EntityStoreResult<String> {
        let name = self.expect_ident("a family name")?;
        Ok(self.observer.fire_entity(&name))
    }

    /// Parses a non-negative integer for skip/limit.
    fn window_bound(&mut self, clause: &str) -> EntityStoreResult<u64> {
        match self.next() {
            Some(Token::Int(value)) if value >= 0 => Ok(value as u64),
            Some(Token::Int(value)) => Err(EntityStoreError::InvalidArgument(format!(
                "{clause} must not be negative, found {value}"
            ))),
            other => Err(EntityStoreError::Syntax(format!(
                "expected a number after {clause}, found {other:?}"
            ))),
        }
    }

    fn select(&mut self) -> EntityStoreResult<Statement> {
        let mut builder = SelectQuery::builder();

        if let Some(Token::Star) = self.peek() {
            self.pos += 1;
        } else {
            builder = builder.projections(self.field_list()?);
        }

        self.expect_keyword("from")?;
        builder = builder.from(self.family_name()?);

        if self.eat_keyword("where") {
            builder = builder.filter(self.where_clause()?);
        }

        if self.eat_keyword("order") {
            self.expect_keyword("by")?;
            loop {
                let field = self.field_name()?;
                let sort = if self.eat_keyword("desc") {
                    crate::query::Sort::desc(field)
                } else {
                    self.eat_keyword("asc");
                    crate::query::Sort::asc(field)
                };
                builder = builder.sort(sort);

                if !matches!(self.peek(), Some(Token::Comma)) {
                    break;
                }
                self.pos += 1;
            }
        }

        if self.eat_keyword("skip") {
            builder = builder.skip(self.window_bound("skip")?);
        }

        if self.eat_keyword("limit") {
            builder = builder.limit(self.window_bound("limit")?);
        }

        Ok(Statement::Select(builder.build()?))
    }

    fn delete(&mut self) -> EntityStoreResult<Statement> {
        let mut builder = DeleteQuery::builder();

        if !matches!(self.peek(), Some(Token::Ident(word)) if word.eq_ignore_ascii_case("from"))
        {
            builder = builder.projections(self.field_list()?);
        }

        self.expect_keyword("from")?;
        builder = builder.from(self.family_name()?);

        if self.eat_keyword("where") {
            builder = builder.filter(self.where_clause()?);
        }

        Ok(Statement::Delete(builder.build()?))
    }

    fn insert(&mut self) -> EntityStoreResult<Statement> {
        let entity = self.assignments()?;

        let ttl = if self.eat_keyword("ttl") {
            Some(self.ttl()?)
        } else {
            None
        };

        Ok(Statement::Insert { entity, ttl })
    }

    fn update(&mut self) -> EntityStoreResult<Statement> {
        Ok(Statement::Update(self.assignments()?))
    }

    /// Parses `family (field = value, ...)`.
    fn assignments(&mut self) -> EntityStoreResult<Entity> {
        let family = self.family_name()?;
        self.expect_token(Token::LParen)?;

        let mut fields = Vec::new();
        loop {
            let name = self.field_name()?;
            self.expect_token(Token::Eq)?;
            let value = self.value()?;
            fields.push(NamedField::with_value(name, value));

            match self.next() {
                Some(Token::Comma) => continue,
                Some(Token::RParen) => break,
                other => {
                    return Err(EntityStoreError::Syntax(format!(
                        "expected ',' or ')', found {other:?}"
                    )));
                }
            }
        }

        Ok(Entity::of_fields(family, fields))
    }

    fn ttl(&mut self) -> EntityStoreResult<Duration> {
        let amount = self.window_bound("ttl")? as i64;
        let unit = self.expect_ident("a time unit")?;

        match unit.to_ascii_lowercase().as_str() {
            "ns" => Ok(Duration::nanoseconds(amount)),
            "ms" => Ok(Duration::milliseconds(amount)),
            "s" => Ok(Duration::seconds(amount)),
            "m" => Ok(Duration::minutes(amount)),
            "h" => Ok(Duration::hours(amount)),
            "d" => Ok(Duration::days(amount)),
            other => Err(EntityStoreError::Syntax(format!(
                "unknown time unit '{other}'"
            ))),
        }
    }

    fn field_list(&mut self) -> EntityStoreResult<Vec<String>> {
        let mut fields = vec![self.field_name()?];
        while matches!(self.peek(), Some(Token::Comma)) {
            self.pos += 1;
            fields.push(self.field_name()?);
        }
        Ok(fields)
    }

    /// Parses `cond (and|or cond)*`, combining left to right.
    fn where_clause(&mut self) -> EntityStoreResult<FieldCondition> {
        let mut condition = self.condition()?;

        loop {
            if self.eat_keyword("and") {
                condition = condition.and(self.condition()?);
            } else if self.eat_keyword("or") {
                condition = condition.or(self.condition()?);
            } else {
                return Ok(condition);
            }
        }
    }

    /// Parses `[not] field op operand`.
    fn condition(&mut self) -> EntityStoreResult<FieldCondition> {
        let negated = self.eat_keyword("not");
        let field = self.field_name()?;

        let condition = match self.next() {
            Some(Token::Eq) => self.point(field, Condition::Equals)?,
            Some(Token::Gt) => self.point(field, Condition::GreaterThan)?,
            Some(Token::Gte) => self.point(field, Condition::GreaterEqualsThan)?,
            Some(Token::Lt) => self.point(field, Condition::LesserThan)?,
            Some(Token::Lte) => self.point(field, Condition::LesserEqualsThan)?,
            Some(Token::Ident(word)) if word.eq_ignore_ascii_case("like") => {
                self.point(field, Condition::Like)?
            }
            Some(Token::Ident(word)) if word.eq_ignore_ascii_case("in") => {
                self.in_condition(field)?
            }
            Some(Token::Ident(word)) if word.eq_ignore_ascii_case("between") => {
                self.between_condition(field)?
            }
            other => {
                return Err(EntityStoreError::Syntax(format!(
                    "expected a condition operator, found {other:?}"
                )));
            }
        };

        Ok(if negated {
            condition.negate()
        } else {
            condition
        })
    }

    fn point(&mut self, field: String, condition: Condition) -> EntityStoreResult<FieldCondition> {
        let value = self.value()?;
        FieldCondition::new(NamedField::with_value(field, value), condition)
    }

    /// Parses `in (literal, ...)` or `in @param`.
    fn in_condition(&mut self, field: String) -> EntityStoreResult<FieldCondition> {
        if let Some(Token::Param(_)) = self.peek() {
            let value = self.value()?;
            return FieldCondition::new(NamedField::with_value(field, value), Condition::In);
        }

        self.expect_token(Token::LParen)?;
        let mut items = Vec::new();
        loop {
            items.push(self.literal()?);
            match self.next() {
                Some(Token::Comma) => continue,
                Some(Token::RParen) => break,
                other => {
                    return Err(EntityStoreError::Syntax(format!(
                        "expected ',' or ')', found {other:?}"
                    )));
                }
            }
        }

        FieldCondition::new(
            NamedField::of(field, Bson::Array(items)),
            Condition::In,
        )
    }

    /// Parses `between literal literal` or `between @param`.
    fn between_condition(&mut self, field: String) -> EntityStoreResult<FieldCondition> {
        if let Some(Token::Param(_)) = self.peek() {
            let value = self.value()?;
            return FieldCondition::new(NamedField::with_value(field, value), Condition::Between);
        }

        let from = self.literal()?;
        let to = self.literal()?;
        FieldCondition::new(
            NamedField::of(field, Bson::Array(vec![from, to])),
            Condition::Between,
        )
    }

    /// Parses a literal or parameter operand.
    fn value(&mut self) -> EntityStoreResult<Value> {
        if let Some(Token::Param(name)) = self.peek() {
            let name = name.clone();
            self.pos += 1;
            let param = Param::new(name);
            self.params.push(param.clone());
            return Ok(Value::Param(param));
        }

        Ok(Value::Scalar(self.literal()?))
    }

    /// Parses a literal operand: quoted string, number, boolean or bare
    /// token (treated as a string).
    fn literal(&mut self) -> EntityStoreResult<Bson> {
        match self.next() {
            Some(Token::Str(text)) => Ok(Bson::String(text)),
            Some(Token::Int(value)) => Ok(Bson::Int64(value)),
            Some(Token::Float(value)) => Ok(Bson::Double(value)),
            Some(Token::Ident(word)) if word.eq_ignore_ascii_case("true") => {
                Ok(Bson::Boolean(true))
            }
            Some(Token::Ident(word)) if word.eq_ignore_ascii_case("false") => {
                Ok(Bson::Boolean(false))
            }
            Some(Token::Ident(word)) => Ok(Bson::String(word)),
            other => Err(EntityStoreError::Syntax(format!(
                "expected a literal value, found {other:?}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::IdentityObserver;
    use crate::query::Sort;

    fn parsed(text: &str) -> ParseOutput {
        parse(text, &IdentityObserver).unwrap()
    }

    #[test]
    fn bare_select_has_no_constraints() {
        let output = parsed("select * from God");

        match output.statement {
            Statement::Select(query) => {
                assert_eq!(query.family(), "God");
                assert!(query.projections().is_empty());
                assert!(query.sorts().is_empty());
                assert!(query.condition().is_none());
                assert_eq!(query.skip(), 0);
                assert_eq!(query.limit(), 0);
            }
            other => panic!("expected a select, got {other:?}"),
        }
        assert!(output.params.is_empty());
    }

    #[test]
    fn full_select_clause_set() {
        let output = parsed(
            "select name, age from users where age > 10 and name = \"Ada Lovelace\" \
             order by name asc, age desc skip 2 limit 5",
        );

        match output.statement {
            Statement::Select(query) => {
                assert_eq!(query.projections(), &["name", "age"]);
                assert_eq!(query.sorts(), &[Sort::asc("name"), Sort::desc("age")]);
                assert_eq!(query.skip(), 2);
                assert_eq!(query.limit(), 5);

                let expected = FieldCondition::gt("age", 10i64)
                    .and(FieldCondition::eq("name", "Ada Lovelace"));
                assert_eq!(query.condition(), Some(&expected));
            }
            other => panic!("expected a select, got {other:?}"),
        }
    }

    #[test]
    fn in_between_like_and_not() {
        let output = parsed(
            "select * from users where name in (\"Ada\", \"Grace\") \
             or age between 10 20 or not name like \"A%\"",
        );

        match output.statement {
            Statement::Select(query) => {
                let expected = FieldCondition::in_list("name", ["Ada", "Grace"])
                    .or(FieldCondition::between("age", 10i64, 20i64))
                    .or(FieldCondition::like("name", "A%").negate());
                assert_eq!(query.condition(), Some(&expected));
            }
            other => panic!("expected a select, got {other:?}"),
        }
    }

    #[test]
    fn delete_with_projections() {
        let output = parsed("delete age, alias from users where name = Ada");

        match output.statement {
            Statement::Delete(query) => {
                assert_eq!(query.family(), "users");
                assert_eq!(query.projections(), &["age", "alias"]);
                assert_eq!(
                    query.condition(),
                    Some(&FieldCondition::eq("name", "Ada"))
                );
            }
            other => panic!("expected a delete, got {other:?}"),
        }
    }

    #[test]
    fn insert_builds_an_entity() {
        let output = parsed("insert God (name = \"Diana\", age = 10, hunter = true)");

        match output.statement {
            Statement::Insert { entity, ttl } => {
                assert_eq!(entity.name(), "God");
                assert_eq!(
                    entity.find_value::<String>("name").unwrap(),
                    Some("Diana".to_string())
                );
                assert_eq!(entity.find_value::<i64>("age").unwrap(), Some(10));
                assert_eq!(entity.find_value::<bool>("hunter").unwrap(), Some(true));
                assert!(ttl.is_none());
            }
            other => panic!("expected an insert, got {other:?}"),
        }
    }

    #[test]
    fn insert_with_ttl() {
        let output = parsed("insert God (name = \"Diana\") ttl 10 s");

        match output.statement {
            Statement::Insert { ttl, .. } => {
                assert_eq!(ttl, Some(Duration::seconds(10)));
            }
            other => panic!("expected an insert, got {other:?}"),
        }
    }

    #[test]
    fn params_are_collected_in_order() {
        let output = parse(
            "update users (name = @name, age = @age)",
            &IdentityObserver,
        )
        .unwrap();

        let names: Vec<_> = output
            .params
            .iter()
            .map(|param| param.name().to_string())
            .collect();
        assert_eq!(names, vec!["name", "age"]);
    }

    #[test]
    fn observer_rewrites_names() {
        struct Upper;

        impl QueryObserver for Upper {
            fn fire_entity(&self, name: &str) -> String {
                name.to_uppercase()
            }

            fn fire_field(&self, name: &str) -> String {
                name.to_uppercase()
            }
        }

        let output = parse("select name from god where age > 10", &Upper).unwrap();
        match output.statement {
            Statement::Select(query) => {
                assert_eq!(query.family(), "GOD");
                assert_eq!(query.projections(), &["NAME"]);
                assert_eq!(
                    query.condition(),
                    Some(&FieldCondition::gt("AGE", 10i64))
                );
            }
            other => panic!("expected a select, got {other:?}"),
        }
    }

    #[test]
    fn negative_window_bounds_are_invalid_arguments() {
        assert!(matches!(
            parse("select * from God skip -1", &IdentityObserver),
            Err(EntityStoreError::InvalidArgument(_))
        ));
        assert!(matches!(
            parse("select * from God limit -1", &IdentityObserver),
            Err(EntityStoreError::InvalidArgument(_))
        ));
    }

    #[test]
    fn malformed_queries_are_syntax_errors() {
        for text in [
            "",
            "drop family God",
            "select from God",
            "select * from",
            "select * from God where",
            "insert God name = 1",
            "select * from God trailing",
        ] {
            assert!(
                matches!(
                    parse(text, &IdentityObserver),
                    Err(EntityStoreError::Syntax(_))
                ),
                "expected a syntax error for {text:?}"
            );
        }
    }
}
