use std::fmt;

use derive_more::Display;
use once_cell::sync::Lazy;
use phf::phf_map;
use regex::Regex;

use crate::bounded::BoundedParser;
use crate::errors::{LexerError, LexerResult};
use crate::stateful::{ParseStatus, ParserFlags, StatefulParser};

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s+").unwrap());
static INTEGER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?[0-9]+").unwrap());
static IDENTIFIER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z_0-9]+").unwrap());
static OPERATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(!=|==|=|!|<=|<|>=|>|&&|\|\|)").unwrap());

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum Operator {
    #[display("!")]
    Not,
    #[display("==")]
    Eq,
    #[display("!=")]
    Ne,
    #[display("<")]
    Lt,
    #[display("<=")]
    Le,
    #[display(">")]
    Gt,
    #[display(">=")]
    Ge,
    #[display("&&")]
    And,
    #[display("||")]
    Or,
}

static OPERATORS: phf::Map<&'static str, Operator> = phf_map! {
    "!" => Operator::Not,
    "=" => Operator::Eq,
    "==" => Operator::Eq,
    "!=" => Operator::Ne,
    "<" => Operator::Lt,
    "<=" => Operator::Le,
    ">" => Operator::Gt,
    ">=" => Operator::Ge,
    "&&" => Operator::And,
    "||" => Operator::Or,
};

impl Operator {
    pub fn is_unary(&self) -> bool {
        matches!(self, Operator::Not)
    }

    pub fn is_equality(&self) -> bool {
        matches!(self, Operator::Eq | Operator::Ne)
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, Operator::And | Operator::Or)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    Int(i64),
    /// A bare word: either a reserved literal or a settings key.
    Ident(String),
    /// Contents of a quoted string, escapes left as written.
    Str(String),
    Op(Operator),
    /// A parenthesized sub-expression.
    Group(Vec<Token>),
}

impl Token {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Token::Int(_) => "integer",
            Token::Ident(_) => "identifier",
            Token::Str(_) => "string",
            Token::Op(_) => "operator",
            Token::Group(_) => "parenthetical",
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Int(v) => write!(f, "{v}"),
            Token::Ident(v) => write!(f, "{v}"),
            Token::Str(v) => write!(f, "\"{v}\""),
            Token::Op(op) => write!(f, "{op}"),
            Token::Group(inner) => {
                write!(f, "(")?;
                for (idx, token) in inner.iter().enumerate() {
                    if idx > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{token}")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Run a bounded parser over the start of `text`, returning the captured span and the number
/// of bytes it consumed.
fn take_bounded(mut parser: BoundedParser, text: &str) -> Option<(String, usize)> {
    match parser.parse(text) {
        Ok(ParseStatus::Finished) => {
            let consumed = text.len() - parser.remaining_text().len();
            Some((parser.parsed_text().to_string(), consumed))
        }
        _ => None,
    }
}

/// Split a conditional expression into tokens. Parenthesized sub-expressions are lexed
/// recursively into [`Token::Group`].
pub fn lex_expression(text: &str) -> LexerResult<Vec<Token>> {
    let mut tokens = vec![];
    let mut rest = text;

    while !rest.is_empty() {
        if let Some(m) = WHITESPACE_RE.find(rest) {
            rest = &rest[m.end()..];
        } else if let Some(m) = INTEGER_RE.find(rest) {
            let value = m
                .as_str()
                .parse::<i64>()
                .map_err(|_| LexerError::MalformedInteger(m.as_str().to_string()))?;
            tokens.push(Token::Int(value));
            rest = &rest[m.end()..];
        } else if let Some(m) = IDENTIFIER_RE.find(rest) {
            tokens.push(Token::Ident(m.as_str().to_string()));
            rest = &rest[m.end()..];
        } else if let Some(m) = OPERATOR_RE.find(rest) {
            let op = OPERATORS
                .get(m.as_str())
                .copied()
                .ok_or_else(|| LexerError::BadExpression(rest.to_string()))?;
            tokens.push(Token::Op(op));
            rest = &rest[m.end()..];
        } else if rest.starts_with('(') {
            let parser = BoundedParser::new('(', ')', ParserFlags::MULTI_LEVEL);
            let (inner, consumed) =
                take_bounded(parser, rest).ok_or(LexerError::MalformedParenthetical)?;
            tokens.push(Token::Group(lex_expression(&inner)?));
            rest = &rest[consumed..];
        } else if let Some(quote @ ('"' | '\'')) = rest.chars().next() {
            let parser = BoundedParser::quoted(quote, ParserFlags::NONE);
            let (inner, consumed) =
                take_bounded(parser, rest).ok_or(LexerError::MalformedString)?;
            tokens.push(Token::Str(inner));
            rest = &rest[consumed..];
        } else {
            return Err(LexerError::BadExpression(rest.to_string()));
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod test {
    use crate::{LexerError, Operator, Token, lex_expression};
    use pretty_assertions::assert_eq;

    fn ident(s: &str) -> Token {
        Token::Ident(s.to_string())
    }

    #[test]
    fn simple() {
        assert_eq!(
            lex_expression("  a <= -12 ").unwrap(),
            vec![ident("a"), Token::Op(Operator::Le), Token::Int(-12)]
        );
        assert_eq!(
            lex_expression("sel=1").unwrap(),
            vec![ident("sel"), Token::Op(Operator::Eq), Token::Int(1)]
        );
        assert_eq!(
            lex_expression("!FLAG||b").unwrap(),
            vec![
                Token::Op(Operator::Not),
                ident("FLAG"),
                Token::Op(Operator::Or),
                ident("b")
            ]
        );
    }

    #[test]
    fn groups_and_strings() {
        assert_eq!(
            lex_expression(r#"TRUE && ((s == "a)b") || 'x')"#).unwrap(),
            vec![
                ident("TRUE"),
                Token::Op(Operator::And),
                Token::Group(vec![
                    Token::Group(vec![
                        ident("s"),
                        Token::Op(Operator::Eq),
                        Token::Str("a)b".to_string())
                    ]),
                    Token::Op(Operator::Or),
                    Token::Str("x".to_string()),
                ]),
            ]
        );
        assert_eq!(lex_expression("''").unwrap(), vec![Token::Str(String::new())]);
    }

    #[test]
    fn malformed() {
        assert_eq!(
            lex_expression("(a || b").unwrap_err(),
            LexerError::MalformedParenthetical
        );
        assert_eq!(lex_expression("'abc").unwrap_err(), LexerError::MalformedString);
        assert_eq!(
            lex_expression("a ~ b").unwrap_err().to_string(),
            "Bad expression: ~ b"
        );
        assert_eq!(
            lex_expression("99999999999999999999").unwrap_err(),
            LexerError::MalformedInteger("99999999999999999999".to_string())
        );
    }

    #[test]
    fn display() {
        let tokens = lex_expression("(a != 'b')").unwrap();
        assert_eq!(tokens[0].to_string(), "(a != \"b\")");
        assert_eq!(tokens[0].kind_name(), "parenthetical");
    }
}
