pub mod bounded;
pub mod errors;
pub mod expression;
pub mod stateful;

pub use bounded::BoundedParser;
pub use errors::{LexerError, LexerResult};
pub use expression::{Operator, Token, lex_expression};
pub use stateful::{ParseStatus, ParserCore, ParserFlags, StatefulParser};
