//! Predicate expressions over named asset metrics
//!
//! Trigger conditions are supplied externally as text expressions and
//! compiled once at screener load. The grammar is deliberately small:
//!
//! ```text
//! expr       := and ( "||" and )*
//! and        := primary ( "&&" primary )*
//! primary    := "(" expr ")" | comparison
//! comparison := metric ( "<" | "<=" | ">" | ">=" | "==" | "!=" ) number
//! ```
//!
//! A comparison against a metric that is absent from the map evaluates to
//! false; evaluation is pure and allocation-free.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

/// Comparison operator in a predicate leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl CompareOp {
    fn apply(&self, left: f64, right: f64) -> bool {
        match self {
            CompareOp::Lt => left < right,
            CompareOp::Le => left <= right,
            CompareOp::Gt => left > right,
            CompareOp::Ge => left >= right,
            CompareOp::Eq => left == right,
            CompareOp::Ne => left != right,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
        };
        write!(f, "{symbol}")
    }
}

/// A compiled predicate over named metrics.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `metric OP number`
    Compare {
        metric: String,
        op: CompareOp,
        value: f64,
    },

    /// Conjunction: every child must hold
    All(Vec<Predicate>),

    /// Disjunction: any child may hold
    Any(Vec<Predicate>),
}

/// Expression parse failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    #[error("empty expression")]
    Empty,

    #[error("unexpected character '{0}' at offset {1}")]
    UnexpectedChar(char, usize),

    #[error("unexpected token '{0}'")]
    UnexpectedToken(String),

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("invalid number '{0}'")]
    InvalidNumber(String),
}

impl Predicate {
    /// Parse an expression into a predicate tree.
    pub fn parse(input: &str) -> Result<Self, ExprError> {
        let tokens = tokenize(input)?;
        if tokens.is_empty() {
            return Err(ExprError::Empty);
        }
        let mut parser = Parser { tokens, index: 0 };
        let predicate = parser.expr()?;
        match parser.peek() {
            Some(token) => Err(ExprError::UnexpectedToken(token.to_string())),
            None => Ok(predicate),
        }
    }

    /// Evaluate against a metric map. Missing metrics make their comparison
    /// false; the result depends on nothing but the arguments.
    pub fn evaluate(&self, metrics: &BTreeMap<String, f64>) -> bool {
        match self {
            Predicate::Compare { metric, op, value } => metrics
                .get(metric)
                .is_some_and(|observed| op.apply(*observed, *value)),
            Predicate::All(children) => children.iter().all(|c| c.evaluate(metrics)),
            Predicate::Any(children) => children.iter().any(|c| c.evaluate(metrics)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Number(f64),
    Op(CompareOp),
    AndAnd,
    OrOr,
    LParen,
    RParen,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(name) => write!(f, "{name}"),
            Token::Number(value) => write!(f, "{value}"),
            Token::Op(op) => write!(f, "{op}"),
            Token::AndAnd => write!(f, "&&"),
            Token::OrOr => write!(f, "||"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, ExprError> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i] as char;
        match c {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '&' => {
                if bytes.get(i + 1) == Some(&b'&') {
                    tokens.push(Token::AndAnd);
                    i += 2;
                } else {
                    return Err(ExprError::UnexpectedChar('&', i));
                }
            }
            '|' => {
                if bytes.get(i + 1) == Some(&b'|') {
                    tokens.push(Token::OrOr);
                    i += 2;
                } else {
                    return Err(ExprError::UnexpectedChar('|', i));
                }
            }
            '<' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push(Token::Op(CompareOp::Le));
                    i += 2;
                } else {
                    tokens.push(Token::Op(CompareOp::Lt));
                    i += 1;
                }
            }
            '>' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push(Token::Op(CompareOp::Ge));
                    i += 2;
                } else {
                    tokens.push(Token::Op(CompareOp::Gt));
                    i += 1;
                }
            }
            '=' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push(Token::Op(CompareOp::Eq));
                    i += 2;
                } else {
                    return Err(ExprError::UnexpectedChar('=', i));
                }
            }
            '!' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push(Token::Op(CompareOp::Ne));
                    i += 2;
                } else {
                    return Err(ExprError::UnexpectedChar('!', i));
                }
            }
            _ if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < bytes.len() {
                    let c = bytes[i] as char;
                    if c.is_ascii_alphanumeric() || c == '_' {
                        i += 1;
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(input[start..i].to_string()));
            }
            _ if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => {
                let start = i;
                i += 1;
                while i < bytes.len() {
                    let c = bytes[i] as char;
                    if c.is_ascii_digit() || c == '.' || c == 'e' || c == 'E' {
                        i += 1;
                    } else if (c == '-' || c == '+')
                        && matches!(bytes[i - 1] as char, 'e' | 'E')
                    {
                        i += 1;
                    } else {
                        break;
                    }
                }
                let text = &input[start..i];
                let value: f64 = text
                    .parse()
                    .map_err(|_| ExprError::InvalidNumber(text.to_string()))?;
                tokens.push(Token::Number(value));
            }
            other => return Err(ExprError::UnexpectedChar(other, i)),
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    index: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.index)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.index).cloned();
        if token.is_some() {
            self.index += 1;
        }
        token
    }

    fn expr(&mut self) -> Result<Predicate, ExprError> {
        let mut children = vec![self.and()?];
        while self.peek() == Some(&Token::OrOr) {
            self.index += 1;
            children.push(self.and()?);
        }
        if children.len() == 1 {
            Ok(children.remove(0))
        } else {
            Ok(Predicate::Any(children))
        }
    }

    fn and(&mut self) -> Result<Predicate, ExprError> {
        let mut children = vec![self.primary()?];
        while self.peek() == Some(&Token::AndAnd) {
            self.index += 1;
            children.push(self.primary()?);
        }
        if children.len() == 1 {
            Ok(children.remove(0))
        } else {
            Ok(Predicate::All(children))
        }
    }

    fn primary(&mut self) -> Result<Predicate, ExprError> {
        match self.next() {
            Some(Token::LParen) => {
                let inner = self.expr()?;
                match self.next() {
                    Some(Token::RParen) => Ok(inner),
                    Some(token) => Err(ExprError::UnexpectedToken(token.to_string())),
                    None => Err(ExprError::UnexpectedEnd),
                }
            }
            Some(Token::Ident(metric)) => {
                let op = match self.next() {
                    Some(Token::Op(op)) => op,
                    Some(token) => return Err(ExprError::UnexpectedToken(token.to_string())),
                    None => return Err(ExprError::UnexpectedEnd),
                };
                let value = match self.next() {
                    Some(Token::Number(value)) => value,
                    Some(token) => return Err(ExprError::UnexpectedToken(token.to_string())),
                    None => return Err(ExprError::UnexpectedEnd),
                };
                Ok(Predicate::Compare { metric, op, value })
            }
            Some(token) => Err(ExprError::UnexpectedToken(token.to_string())),
            None => Err(ExprError::UnexpectedEnd),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs
            .iter()
            .map(|(name, value)| (name.to_string(), *value))
            .collect()
    }

    #[test]
    fn test_parse_single_comparison() {
        let predicate = Predicate::parse("pe_ratio < 15").expect("parse");
        assert_eq!(
            predicate,
            Predicate::Compare {
                metric: "pe_ratio".to_string(),
                op: CompareOp::Lt,
                value: 15.0,
            }
        );
    }

    #[test]
    fn test_parse_negative_and_decimal_numbers() {
        let predicate = Predicate::parse("price_change_30d <= -20.5").expect("parse");
        assert!(predicate.evaluate(&metrics(&[("price_change_30d", -25.0)])));
        assert!(!predicate.evaluate(&metrics(&[("price_change_30d", -10.0)])));
    }

    #[test]
    fn test_and_or_precedence() {
        // && binds tighter than ||
        let predicate = Predicate::parse("a > 1 || b > 1 && c > 1").expect("parse");
        assert!(predicate.evaluate(&metrics(&[("a", 2.0), ("b", 0.0), ("c", 0.0)])));
        assert!(predicate.evaluate(&metrics(&[("a", 0.0), ("b", 2.0), ("c", 2.0)])));
        assert!(!predicate.evaluate(&metrics(&[("a", 0.0), ("b", 2.0), ("c", 0.0)])));
    }

    #[test]
    fn test_parentheses_override_precedence() {
        let predicate = Predicate::parse("(a > 1 || b > 1) && c > 1").expect("parse");
        assert!(!predicate.evaluate(&metrics(&[("a", 2.0), ("b", 0.0), ("c", 0.0)])));
        assert!(predicate.evaluate(&metrics(&[("a", 2.0), ("b", 0.0), ("c", 2.0)])));
    }

    #[test]
    fn test_missing_metric_is_false() {
        let predicate = Predicate::parse("roe > 10").expect("parse");
        assert!(!predicate.evaluate(&metrics(&[("pe_ratio", 12.0)])));
    }

    #[test]
    fn test_equality_operators() {
        let predicate = Predicate::parse("flag == 1 && other != 3").expect("parse");
        assert!(predicate.evaluate(&metrics(&[("flag", 1.0), ("other", 2.0)])));
        assert!(!predicate.evaluate(&metrics(&[("flag", 1.0), ("other", 3.0)])));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(Predicate::parse(""), Err(ExprError::Empty));
        assert_eq!(Predicate::parse("   "), Err(ExprError::Empty));
        assert!(matches!(
            Predicate::parse("a <"),
            Err(ExprError::UnexpectedEnd)
        ));
        assert!(matches!(
            Predicate::parse("a & b"),
            Err(ExprError::UnexpectedChar('&', _))
        ));
        assert!(matches!(
            Predicate::parse("a > 1 extra"),
            Err(ExprError::UnexpectedToken(_))
        ));
        assert!(matches!(
            Predicate::parse("a > 1.2.3"),
            Err(ExprError::InvalidNumber(_))
        ));
        assert!(matches!(
            Predicate::parse("(a > 1"),
            Err(ExprError::UnexpectedEnd)
        ));
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        let predicate = Predicate::parse("x >= 0 && y < 100 || z == 5").expect("parse");
        let m = metrics(&[("x", 1.0), ("y", 50.0)]);
        let first = predicate.evaluate(&m);
        for _ in 0..10 {
            assert_eq!(predicate.evaluate(&m), first);
        }
    }
}
