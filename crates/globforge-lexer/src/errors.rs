use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LexerError {
    #[error("Received data after finished parsing")]
    DataAfterFinish,

    #[error("Unexpected text '{0}'")]
    UnexpectedText(String),

    #[error("Unexpected text before '{0}'")]
    UnexpectedTextBefore(char),

    #[error("Unexpected '{0}'")]
    UnexpectedBoundary(char),

    #[error("Malformed parenthetical in expression")]
    MalformedParenthetical,

    #[error("Malformed string in expression")]
    MalformedString,

    #[error("Malformed integer '{0}'")]
    MalformedInteger(String),

    #[error("Bad expression: {0}")]
    BadExpression(String),
}

pub type LexerResult<T> = Result<T, LexerError>;
