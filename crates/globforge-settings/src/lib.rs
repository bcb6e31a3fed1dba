//!
//! ## Introduction
//! Settings are the flat `KEY -> raw value` map produced by merging a project's layer configs.
//! They are consulted by manifest conditionals (`:if(...)`) and to pick out the definitions
//! relevant to a build.
//!
//! ## Values
//! Raw values are untyped strings. The type is decided from the value's shape when it is used
//! in an expression:
//!
//! ```text
//! FLAG=TRUE       ; bool (TRUE/FALSE are reserved)
//! COUNT=42        ; int
//! NAME="widget"   ; string, quotes are stripped
//! BAD=123abc      ; error when referenced
//! ```
//!
//! ## Expressions
//! Expressions combine integers, identifiers, quoted strings (either quote character) and
//! parenthesized sub-expressions with `!`, `==` (or `=`), `!=`, `<`, `<=`, `>`, `>=`, `&&` and
//! `||`.
//!
//! There is no operator precedence. Operators apply strictly left to right as soon as they
//! have their operands, so
//!
//! ```text
//! FALSE || FALSE == FALSE || TRUE
//! ```
//!
//! reads as `((FALSE || FALSE) == FALSE) || TRUE`. Parentheses are the only way to group
//! differently.
//!
//! Both sides of a comparison must have the same type. Strings only support `==` and `!=`,
//! and `&&`/`||` only take booleans. The overall result must be a bool, or an int (nonzero is
//! true).
//!
//! ## Layering
//! [`Settings::extend`] overlays another set on top of this one; later layers win.

pub mod errors;
pub mod evaluate;
pub mod settings;
pub mod value;

pub use errors::{SettingsError, SettingsResult};
pub use settings::Settings;
pub use value::{Value, ValueType};

#[cfg(test)]
mod tests;
