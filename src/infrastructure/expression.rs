//! Selection expression language: a small boolean language over the
//! addressing context, e.g. `priority == "URGENT" || (hour >= 9 && hour < 17)`.
//!
//! Variables: `priority` (name string), `priorityValue`, `hour` (0-23),
//! `dayOfWeek` (1 = Monday), `contentLength` (bytes). Operators: `||`/`or`,
//! `&&`/`and`, `==`, `!=`, `<`, `<=`, `>`, `>=`, `!`/`not`, parentheses.
//! Comparisons are typed; mixing types is an evaluation error, not a silent
//! false.

use std::fmt;

use crate::application::addressing::{
    EvaluationContext, ExpressionEvaluationError, SelectionExpressionEvaluator,
};

/// Stateless; expressions are short and parsed on every evaluation.
#[derive(Default)]
pub struct ExpressionLanguage;

impl ExpressionLanguage {
    pub fn new() -> Self {
        Self
    }
}

impl SelectionExpressionEvaluator for ExpressionLanguage {
    fn evaluate(
        &self,
        expression: &str,
        context: &EvaluationContext,
    ) -> Result<bool, ExpressionEvaluationError> {
        let tokens = lex(expression)?;
        let ast = parse(&tokens)?;
        match evaluate_node(&ast, context)? {
            Value::Bool(value) => Ok(value),
            other => Err(ExpressionEvaluationError(format!(
                "expression must produce a boolean, got {}",
                other.type_name()
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Value {
    Int(i64),
    Str(String),
    Bool(bool),
}

impl Value {
    fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "an integer",
            Value::Str(_) => "a string",
            Value::Bool(_) => "a boolean",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::Str(s) => write!(f, "\"{s}\""),
            Value::Bool(b) => write!(f, "{b}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Int(i64),
    Str(String),
    True,
    False,
    LParen,
    RParen,
    Or,
    And,
    Not,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(name) => write!(f, "{name}"),
            Token::Int(n) => write!(f, "{n}"),
            Token::Str(s) => write!(f, "\"{s}\""),
            Token::True => f.write_str("true"),
            Token::False => f.write_str("false"),
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
            Token::Or => f.write_str("||"),
            Token::And => f.write_str("&&"),
            Token::Not => f.write_str("!"),
            Token::Eq => f.write_str("=="),
            Token::Ne => f.write_str("!="),
            Token::Lt => f.write_str("<"),
            Token::Le => f.write_str("<="),
            Token::Gt => f.write_str(">"),
            Token::Ge => f.write_str(">="),
        }
    }
}

fn lex(input: &str) -> Result<Vec<Token>, ExpressionEvaluationError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '|' => {
                chars.next();
                if chars.next_if_eq(&'|').is_none() {
                    return Err(ExpressionEvaluationError(
                        "single '|' is not an operator, use '||'".into(),
                    ));
                }
                tokens.push(Token::Or);
            }
            '&' => {
                chars.next();
                if chars.next_if_eq(&'&').is_none() {
                    return Err(ExpressionEvaluationError(
                        "single '&' is not an operator, use '&&'".into(),
                    ));
                }
                tokens.push(Token::And);
            }
            '=' => {
                chars.next();
                if chars.next_if_eq(&'=').is_none() {
                    return Err(ExpressionEvaluationError(
                        "assignment is not supported, use '=='".into(),
                    ));
                }
                tokens.push(Token::Eq);
            }
            '!' => {
                chars.next();
                if chars.next_if_eq(&'=').is_some() {
                    tokens.push(Token::Ne);
                } else {
                    tokens.push(Token::Not);
                }
            }
            '<' => {
                chars.next();
                if chars.next_if_eq(&'=').is_some() {
                    tokens.push(Token::Le);
                } else {
                    tokens.push(Token::Lt);
                }
            }
            '>' => {
                chars.next();
                if chars.next_if_eq(&'=').is_some() {
                    tokens.push(Token::Ge);
                } else {
                    tokens.push(Token::Gt);
                }
            }
            quote @ ('\'' | '"') => {
                chars.next();
                let mut literal = String::new();
                loop {
                    match chars.next() {
                        Some('\\') => match chars.next() {
                            Some(escaped) => literal.push(escaped),
                            None => {
                                return Err(ExpressionEvaluationError(
                                    "unterminated string literal".into(),
                                ));
                            }
                        },
                        Some(c) if c == quote => break,
                        Some(c) => literal.push(c),
                        None => {
                            return Err(ExpressionEvaluationError(
                                "unterminated string literal".into(),
                            ));
                        }
                    }
                }
                tokens.push(Token::Str(literal));
            }
            c if c.is_ascii_digit() => {
                let mut digits = String::new();
                while let Some(digit) = chars.next_if(|c| c.is_ascii_digit()) {
                    digits.push(digit);
                }
                let value = digits.parse::<i64>().map_err(|_| {
                    ExpressionEvaluationError(format!("integer literal {digits} is out of range"))
                })?;
                tokens.push(Token::Int(value));
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut word = String::new();
                while let Some(c) = chars.next_if(|c| c.is_alphanumeric() || *c == '_') {
                    word.push(c);
                }
                tokens.push(match word.as_str() {
                    "or" => Token::Or,
                    "and" => Token::And,
                    "not" => Token::Not,
                    "true" => Token::True,
                    "false" => Token::False,
                    _ => Token::Ident(word),
                });
            }
            other => {
                return Err(ExpressionEvaluationError(format!(
                    "unexpected character '{other}'"
                )));
            }
        }
    }

    Ok(tokens)
}

#[derive(Debug, Clone)]
enum Expr {
    Literal(Value),
    Variable(String),
    Not(Box<Expr>),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

fn parse(tokens: &[Token]) -> Result<Expr, ExpressionEvaluationError> {
    let mut parser = Parser {
        tokens,
        position: 0,
    };
    let expression = parser.expression()?;
    match parser.peek() {
        None => Ok(expression),
        Some(trailing) => Err(ExpressionEvaluationError(format!(
            "unexpected '{trailing}' after the expression"
        ))),
    }
}

struct Parser<'a> {
    tokens: &'a [Token],
    position: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        self.position += 1;
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

    fn expression(&mut self) -> Result<Expr, ExpressionEvaluationError> {
        let mut left = self.conjunction()?;
        while self.eat(&Token::Or) {
            let right = self.conjunction()?;
            left = Expr::Binary {
                op: BinaryOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn conjunction(&mut self) -> Result<Expr, ExpressionEvaluationError> {
        let mut left = self.equality()?;
        while self.eat(&Token::And) {
            let right = self.equality()?;
            left = Expr::Binary {
                op: BinaryOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    // Equality and ordering do not chain: `1 < hour < 5` is a parse error.
    fn equality(&mut self) -> Result<Expr, ExpressionEvaluationError> {
        let left = self.comparison()?;
        let op = if self.eat(&Token::Eq) {
            BinaryOp::Eq
        } else if self.eat(&Token::Ne) {
            BinaryOp::Ne
        } else {
            return Ok(left);
        };
        let right = self.comparison()?;
        Ok(Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn comparison(&mut self) -> Result<Expr, ExpressionEvaluationError> {
        let left = self.unary()?;
        let op = if self.eat(&Token::Le) {
            BinaryOp::Le
        } else if self.eat(&Token::Lt) {
            BinaryOp::Lt
        } else if self.eat(&Token::Ge) {
            BinaryOp::Ge
        } else if self.eat(&Token::Gt) {
            BinaryOp::Gt
        } else {
            return Ok(left);
        };
        let right = self.unary()?;
        Ok(Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn unary(&mut self) -> Result<Expr, ExpressionEvaluationError> {
        if self.eat(&Token::Not) {
            let inner = self.unary()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, ExpressionEvaluationError> {
        match self.advance() {
            Some(Token::Int(value)) => Ok(Expr::Literal(Value::Int(value))),
            Some(Token::Str(value)) => Ok(Expr::Literal(Value::Str(value))),
            Some(Token::True) => Ok(Expr::Literal(Value::Bool(true))),
            Some(Token::False) => Ok(Expr::Literal(Value::Bool(false))),
            Some(Token::Ident(name)) => Ok(Expr::Variable(name)),
            Some(Token::LParen) => {
                let inner = self.expression()?;
                if !self.eat(&Token::RParen) {
                    return Err(ExpressionEvaluationError("missing closing ')'".into()));
                }
                Ok(inner)
            }
            Some(other) => Err(ExpressionEvaluationError(format!(
                "expected a value, found '{other}'"
            ))),
            None => Err(ExpressionEvaluationError(
                "expression ends where a value was expected".into(),
            )),
        }
    }
}

fn evaluate_node(
    expression: &Expr,
    context: &EvaluationContext,
) -> Result<Value, ExpressionEvaluationError> {
    match expression {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Variable(name) => variable(name, context),
        Expr::Not(inner) => match evaluate_node(inner, context)? {
            Value::Bool(value) => Ok(Value::Bool(!value)),
            other => Err(ExpressionEvaluationError(format!(
                "'!' expects a boolean, got {}",
                other.type_name()
            ))),
        },
        Expr::Binary { op, left, right } => match op {
            BinaryOp::Or => {
                // Short-circuiting; the right side is only touched when needed.
                match boolean(evaluate_node(left, context)?, "||")? {
                    true => Ok(Value::Bool(true)),
                    false => Ok(Value::Bool(boolean(evaluate_node(right, context)?, "||")?)),
                }
            }
            BinaryOp::And => match boolean(evaluate_node(left, context)?, "&&")? {
                false => Ok(Value::Bool(false)),
                true => Ok(Value::Bool(boolean(evaluate_node(right, context)?, "&&")?)),
            },
            BinaryOp::Eq | BinaryOp::Ne => {
                let left = evaluate_node(left, context)?;
                let right = evaluate_node(right, context)?;
                let equal = match (&left, &right) {
                    (Value::Int(a), Value::Int(b)) => a == b,
                    (Value::Str(a), Value::Str(b)) => a == b,
                    (Value::Bool(a), Value::Bool(b)) => a == b,
                    _ => {
                        return Err(ExpressionEvaluationError(format!(
                            "cannot compare {} with {}",
                            left.type_name(),
                            right.type_name()
                        )));
                    }
                };
                Ok(Value::Bool(if *op == BinaryOp::Eq { equal } else { !equal }))
            }
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                let left = evaluate_node(left, context)?;
                let right = evaluate_node(right, context)?;
                let (Value::Int(a), Value::Int(b)) = (&left, &right) else {
                    return Err(ExpressionEvaluationError(format!(
                        "ordering needs integers on both sides, got {} and {}",
                        left.type_name(),
                        right.type_name()
                    )));
                };
                Ok(Value::Bool(match op {
                    BinaryOp::Lt => a < b,
                    BinaryOp::Le => a <= b,
                    BinaryOp::Gt => a > b,
                    BinaryOp::Ge => a >= b,
                    _ => unreachable!(),
                }))
            }
        },
    }
}

fn boolean(value: Value, operator: &str) -> Result<bool, ExpressionEvaluationError> {
    match value {
        Value::Bool(value) => Ok(value),
        other => Err(ExpressionEvaluationError(format!(
            "'{operator}' expects booleans, got {}",
            other.type_name()
        ))),
    }
}

fn variable(
    name: &str,
    context: &EvaluationContext,
) -> Result<Value, ExpressionEvaluationError> {
    match name {
        "priority" => Ok(Value::Str(context.priority.as_str().to_owned())),
        "priorityValue" => Ok(Value::Int(i64::from(context.priority_value()))),
        "hour" => Ok(Value::Int(i64::from(context.hour()))),
        "dayOfWeek" => Ok(Value::Int(i64::from(context.day_of_week()))),
        "contentLength" => Ok(Value::Int(context.content_length as i64)),
        other => Err(ExpressionEvaluationError(format!(
            "unknown variable '{other}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Local, TimeZone};

    use super::*;
    use crate::domain::models::Priority;

    fn context(priority: Priority, hour: u32, content_length: usize) -> EvaluationContext {
        // 2025-03-05 is a Wednesday, so dayOfWeek is 3.
        let local = Local.with_ymd_and_hms(2025, 3, 5, hour, 30, 0).unwrap();
        EvaluationContext::new(priority, local.to_utc(), content_length)
    }

    fn eval(expression: &str, context: &EvaluationContext) -> Result<bool, ExpressionEvaluationError> {
        ExpressionLanguage::new().evaluate(expression, context)
    }

    #[test]
    fn literals_and_parentheses() {
        let ctx = context(Priority::Default, 12, 10);
        assert!(eval("true", &ctx).unwrap());
        assert!(!eval("false", &ctx).unwrap());
        assert!(eval("(true)", &ctx).unwrap());
        assert!(eval("!(false)", &ctx).unwrap());
        assert!(eval("not false", &ctx).unwrap());
    }

    #[test]
    fn priority_is_matched_by_name_or_value() {
        let ctx = context(Priority::Urgent, 12, 10);
        assert!(eval("priority == \"URGENT\"", &ctx).unwrap());
        assert!(eval("priority == 'URGENT'", &ctx).unwrap());
        assert!(!eval("priority == \"LOW\"", &ctx).unwrap());
        assert!(eval("priorityValue >= 30", &ctx).unwrap());
        assert!(eval("priority != 'MIN'", &ctx).unwrap());
    }

    #[test]
    fn office_hours_expression() {
        let expression = "priority == \"URGENT\" || (hour >= 9 && hour < 17)";
        assert!(eval(expression, &context(Priority::Low, 10, 10)).unwrap());
        assert!(eval(expression, &context(Priority::Urgent, 3, 10)).unwrap());
        assert!(!eval(expression, &context(Priority::Low, 3, 10)).unwrap());
    }

    #[test]
    fn word_operators_behave_like_symbols() {
        let ctx = context(Priority::High, 10, 10);
        assert!(eval("hour >= 9 and hour < 17", &ctx).unwrap());
        assert!(eval("hour < 9 or priority == 'HIGH'", &ctx).unwrap());
    }

    #[test]
    fn day_and_length_variables_are_bound() {
        let ctx = context(Priority::Default, 12, 600);
        assert!(eval("dayOfWeek == 3", &ctx).unwrap());
        assert!(eval("dayOfWeek <= 5", &ctx).unwrap());
        assert!(eval("contentLength > 512", &ctx).unwrap());
    }

    #[test]
    fn or_short_circuits_past_broken_right_sides() {
        let ctx = context(Priority::Default, 12, 10);
        assert!(eval("true || missingVariable == 1", &ctx).unwrap());
        assert!(!eval("false && missingVariable == 1", &ctx).unwrap());
        assert!(eval("false || hour == 12", &ctx).unwrap());
    }

    #[test]
    fn type_mismatches_are_errors_not_false() {
        let ctx = context(Priority::Default, 12, 10);
        assert!(eval("priority == 30", &ctx).is_err());
        assert!(eval("priority >= 'LOW'", &ctx).is_err());
        assert!(eval("hour && true", &ctx).is_err());
        assert!(eval("!hour", &ctx).is_err());
    }

    #[test]
    fn non_boolean_results_are_rejected() {
        let ctx = context(Priority::Default, 12, 10);
        assert!(eval("hour", &ctx).is_err());
        assert!(eval("'URGENT'", &ctx).is_err());
        assert!(eval("42", &ctx).is_err());
    }

    #[test]
    fn unknown_variables_are_reported_by_name() {
        let ctx = context(Priority::Default, 12, 10);
        let failure = eval("currentTemperature > 30", &ctx).unwrap_err();
        assert!(failure.to_string().contains("currentTemperature"));
    }

    #[test]
    fn malformed_expressions_fail_to_parse() {
        let ctx = context(Priority::Default, 12, 10);
        assert!(eval("", &ctx).is_err());
        assert!(eval("hour >", &ctx).is_err());
        assert!(eval("(hour > 5", &ctx).is_err());
        assert!(eval("hour > 5)", &ctx).is_err());
        assert!(eval("hour = 5", &ctx).is_err());
        assert!(eval("hour | 5", &ctx).is_err());
        assert!(eval("1 < hour < 5", &ctx).is_err());
        assert!(eval("'unterminated", &ctx).is_err());
        assert!(eval("hour # 5", &ctx).is_err());
    }

    #[test]
    fn escaped_quotes_inside_strings() {
        let ctx = context(Priority::Default, 12, 10);
        assert!(eval(r#"'it\'s' == "it's""#, &ctx).unwrap());
    }

    #[test]
    fn chained_boolean_operators_associate_left() {
        let ctx = context(Priority::Default, 12, 10);
        assert!(eval("true || false || false", &ctx).unwrap());
        assert!(!eval("true && true && false", &ctx).unwrap());
        assert!(eval("false || true && true", &ctx).unwrap());
    }
}
