use derive_more::Display;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::{SettingsError, SettingsResult};

static STRING_VALUE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"^"(.*)"$"#).unwrap());
static INT_VALUE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?[0-9]+$").unwrap());

pub const RESERVED_TRUE: &str = "TRUE";
pub const RESERVED_FALSE: &str = "FALSE";

pub fn is_reserved(ident: &str) -> bool {
    ident == RESERVED_TRUE || ident == RESERVED_FALSE
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum ValueType {
    #[display("bool")]
    Bool,
    #[display("int")]
    Int,
    #[display("string")]
    Str,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl Value {
    /// Infer a typed value from the raw text of a setting.
    pub fn from_config(raw: &str) -> SettingsResult<Value> {
        match raw {
            RESERVED_TRUE => return Ok(Value::Bool(true)),
            RESERVED_FALSE => return Ok(Value::Bool(false)),
            _ => {}
        }

        if let Some(c) = STRING_VALUE_RE.captures(raw) {
            return Ok(Value::Str(c[1].to_string()));
        }

        if INT_VALUE_RE.is_match(raw) {
            if let Ok(v) = raw.parse::<i64>() {
                return Ok(Value::Int(v));
            }
        }

        Err(SettingsError::MalformedValue(raw.to_string()))
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Bool(_) => ValueType::Bool,
            Value::Int(_) => ValueType::Int,
            Value::Str(_) => ValueType::Str,
        }
    }
}

#[cfg(test)]
mod test {
    use crate::{SettingsError, Value, ValueType};

    #[test]
    fn inference() {
        assert_eq!(Value::from_config("TRUE").unwrap(), Value::Bool(true));
        assert_eq!(Value::from_config("FALSE").unwrap(), Value::Bool(false));
        assert_eq!(Value::from_config("-7").unwrap(), Value::Int(-7));
        assert_eq!(
            Value::from_config("\"Text A\"").unwrap(),
            Value::Str("Text A".to_string())
        );
        assert_eq!(Value::from_config("\"\"").unwrap().value_type(), ValueType::Str);
        assert_eq!(
            Value::from_config("123abc").unwrap_err(),
            SettingsError::MalformedValue("123abc".to_string())
        );
        // Lowercase literals are not reserved
        assert!(Value::from_config("true").is_err());
    }
}
