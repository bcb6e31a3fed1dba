use globforge_lexer::{LexerError, Operator};
use thiserror::Error;

use crate::value::ValueType;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    #[error(transparent)]
    Lexer(#[from] LexerError),

    #[error("{0} not defined")]
    NotDefined(String),

    #[error("Identifier {0} is reserved")]
    Reserved(String),

    #[error("Malformed config value {0}")]
    MalformedValue(String),

    #[error("Unexpected {0}")]
    UnexpectedToken(&'static str),

    #[error("Spurious operator '{op}' after operator '{prev}'")]
    SpuriousOperator { op: Operator, prev: Operator },

    #[error("Unexpected operator '{0}'")]
    UnexpectedOperator(Operator),

    #[error("Operator '{0}' missing value")]
    MissingValue(Operator),

    #[error("Operator '{0}' missing argument")]
    MissingArgument(Operator),

    #[error("Type mismatch: {lhs}({lhs_type}) {op} {rhs}({rhs_type})")]
    TypeMismatch {
        lhs: String,
        lhs_type: ValueType,
        op: Operator,
        rhs: String,
        rhs_type: ValueType,
    },

    #[error("Type '{ty}' cannot be used with operator '{op}'")]
    UnsupportedOperator { ty: ValueType, op: Operator },

    #[error("{0} is not a boolean value")]
    NotBoolean(String),

    #[error("{0} must be 'bool'")]
    NotBoolOperand(String),

    #[error("Expression of type '{0}' is not convertible to bool")]
    NotConvertible(ValueType),

    #[error("Cannot evaluate expression")]
    Empty,
}

pub type SettingsResult<T> = Result<T, SettingsError>;
