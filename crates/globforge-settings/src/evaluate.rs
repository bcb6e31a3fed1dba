use globforge_lexer::{Operator, Token, lex_expression};
use tracing::trace;

use crate::errors::{SettingsError, SettingsResult};
use crate::settings::Settings;
use crate::value::{RESERVED_FALSE, RESERVED_TRUE, Value, ValueType};

/// A resolved value along with the text it came from, for error messages.
#[derive(Clone, Debug)]
struct Operand {
    text: String,
    value: Value,
}

/// An operator waiting for its right-hand side.
#[derive(Debug)]
struct Pending {
    op: Operator,
    lhs: Option<Operand>,
}

/// Left-to-right reduction over a token stream: one held value and at most one pending
/// operator at any time.
#[derive(Debug, Default)]
struct Reducer {
    held: Option<Operand>,
    pending: Option<Pending>,
}

impl Reducer {
    fn push_operator(&mut self, op: Operator) -> SettingsResult<()> {
        if let Some(pending) = &self.pending {
            return Err(SettingsError::SpuriousOperator {
                op,
                prev: pending.op,
            });
        }

        let lhs = if op.is_unary() {
            if self.held.is_some() {
                return Err(SettingsError::UnexpectedOperator(op));
            }
            None
        } else {
            Some(self.held.take().ok_or(SettingsError::MissingValue(op))?)
        };

        self.pending = Some(Pending { op, lhs });
        Ok(())
    }

    fn push_operand(&mut self, operand: Operand, kind: &'static str) -> SettingsResult<()> {
        match self.pending.take() {
            Some(pending) => {
                self.held = Some(apply(pending, operand)?);
                Ok(())
            }
            None if self.held.is_some() => Err(SettingsError::UnexpectedToken(kind)),
            None => {
                self.held = Some(operand);
                Ok(())
            }
        }
    }

    fn finish(self) -> SettingsResult<Operand> {
        if let Some(pending) = self.pending {
            return Err(SettingsError::MissingArgument(pending.op));
        }
        self.held.ok_or(SettingsError::Empty)
    }
}

fn apply(pending: Pending, rhs: Operand) -> SettingsResult<Operand> {
    let op = pending.op;
    let Some(lhs) = pending.lhs else {
        // Only `!` is unary
        return match rhs.value {
            Value::Bool(b) => Ok(Operand {
                text: format!("{op}{}", rhs.text),
                value: Value::Bool(!b),
            }),
            _ => Err(SettingsError::NotBoolOperand(rhs.text)),
        };
    };

    let text = format!("({} {op} {})", lhs.text, rhs.text);

    if op.is_logical() {
        let (Value::Bool(a), Value::Bool(b)) = (&lhs.value, &rhs.value) else {
            let culprit = if matches!(lhs.value, Value::Bool(_)) {
                rhs.text
            } else {
                lhs.text
            };
            return Err(SettingsError::NotBoolean(culprit));
        };
        let value = match op {
            Operator::And => *a && *b,
            _ => *a || *b,
        };
        return Ok(Operand {
            text,
            value: Value::Bool(value),
        });
    }

    let (lhs_type, rhs_type) = (lhs.value.value_type(), rhs.value.value_type());
    if lhs_type != rhs_type {
        return Err(SettingsError::TypeMismatch {
            lhs: lhs.text,
            lhs_type,
            op,
            rhs: rhs.text,
            rhs_type,
        });
    }

    if lhs_type == ValueType::Str && !op.is_equality() {
        return Err(SettingsError::UnsupportedOperator { ty: lhs_type, op });
    }

    let ordering = match (&lhs.value, &rhs.value) {
        (Value::Int(a), Value::Int(b)) => a.cmp(b),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Str(a), Value::Str(b)) => a.cmp(b),
        _ => unreachable!("operand types already checked"),
    };

    let value = match op {
        Operator::Eq => ordering.is_eq(),
        Operator::Ne => ordering.is_ne(),
        Operator::Lt => ordering.is_lt(),
        Operator::Le => ordering.is_le(),
        Operator::Gt => ordering.is_gt(),
        Operator::Ge => ordering.is_ge(),
        Operator::Not | Operator::And | Operator::Or => unreachable!("handled above"),
    };

    Ok(Operand {
        text,
        value: Value::Bool(value),
    })
}

fn resolve_identifier(settings: &Settings, ident: &str) -> SettingsResult<Value> {
    match ident {
        RESERVED_TRUE => Ok(Value::Bool(true)),
        RESERVED_FALSE => Ok(Value::Bool(false)),
        _ => settings.get_typed(ident),
    }
}

fn reduce(settings: &Settings, tokens: Vec<Token>) -> SettingsResult<Operand> {
    let mut reducer = Reducer::default();

    for token in tokens {
        trace!(%token, held = ?reducer.held, "reduce");
        let kind = token.kind_name();
        let operand = match token {
            Token::Op(op) => {
                reducer.push_operator(op)?;
                continue;
            }
            Token::Int(v) => Operand {
                text: v.to_string(),
                value: Value::Int(v),
            },
            Token::Str(s) => Operand {
                text: format!("\"{s}\""),
                value: Value::Str(s),
            },
            Token::Ident(ident) => Operand {
                value: resolve_identifier(settings, &ident)?,
                text: ident,
            },
            Token::Group(inner) => {
                let result = reduce(settings, inner)?;
                Operand {
                    value: Value::Bool(to_bool(&result)?),
                    text: result.text,
                }
            }
        };
        reducer.push_operand(operand, kind)?;
    }

    reducer.finish()
}

fn to_bool(operand: &Operand) -> SettingsResult<bool> {
    match &operand.value {
        Value::Bool(b) => Ok(*b),
        Value::Int(v) => Ok(*v != 0),
        other => Err(SettingsError::NotConvertible(other.value_type())),
    }
}

/// Evaluate `expr` against `settings`. See the crate docs for the expression language.
pub fn evaluate_expression(settings: &Settings, expr: &str) -> SettingsResult<bool> {
    let tokens = lex_expression(expr)?;
    let result = reduce(settings, tokens)?;
    to_bool(&result)
}

#[cfg(test)]
mod test {
    use crate::{Settings, SettingsError};
    use maplit::btreemap;

    #[test]
    fn integer_truthiness() {
        let s = Settings::from_pairs(btreemap! {"N" => "0", "M" => "3"}).unwrap();
        assert!(!s.evaluate("N").unwrap());
        assert!(s.evaluate("M").unwrap());
        assert!(s.evaluate("(M)").unwrap());
    }

    #[test]
    fn empty_expression() {
        let s = Settings::new();
        assert_eq!(s.evaluate("   ").unwrap_err(), SettingsError::Empty);
        assert_eq!(s.evaluate("()").unwrap_err(), SettingsError::Empty);
    }
}
