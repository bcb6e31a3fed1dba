use std::fmt;

use indexmap::IndexMap;
use tracing::debug;

use crate::errors::{SettingsError, SettingsResult};
use crate::evaluate::evaluate_expression;
use crate::value::{Value, is_reserved};

/// Flat, ordered map of setting identifiers to their raw (untyped) values.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Settings {
    values: IndexMap<String, String>,
}

impl Settings {
    pub fn new() -> Self {
        Settings::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> SettingsResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut settings = Settings::new();
        for (k, v) in pairs {
            settings.set(k, v)?;
        }
        Ok(settings)
    }

    /// Set `key`, replacing any previous value.
    pub fn set<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) -> SettingsResult<()> {
        let key = key.into();
        if is_reserved(&key) {
            return Err(SettingsError::Reserved(key));
        }
        self.values.insert(key, value.into());
        Ok(())
    }

    pub fn get_value(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Look up `key` and infer its typed value.
    pub fn get_typed(&self, key: &str) -> SettingsResult<Value> {
        match self.get_value(key) {
            Some(raw) => Value::from_config(raw),
            None => Err(SettingsError::NotDefined(key.to_string())),
        }
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Overlay `other` on top of these settings; its values win on conflict.
    pub fn extend(&mut self, other: &Settings) {
        for (k, v) in &other.values {
            if let Some(prev) = self.values.insert(k.clone(), v.clone()) {
                if &prev != v {
                    debug!("override {k}: {prev} -> {v}");
                }
            }
        }
    }

    /// Evaluate a conditional expression against these settings.
    pub fn evaluate(&self, expr: &str) -> SettingsResult<bool> {
        let result = evaluate_expression(self, expr);
        debug!("EVAL '{expr}' = {result:?}");
        result
    }
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (k, v) in &self.values {
            writeln!(f, "{k}={v}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use crate::{Settings, SettingsError};
    use maplit::btreemap;
    use pretty_assertions::assert_eq;

    #[test]
    fn reserved_keys() {
        let mut s = Settings::new();
        assert_eq!(
            s.set("TRUE", "1").unwrap_err(),
            SettingsError::Reserved("TRUE".to_string())
        );
        assert!(s.is_empty());
    }

    #[test]
    fn extend_overrides() {
        let mut base = Settings::from_pairs(btreemap! {"A" => "1", "B" => "2"}).unwrap();
        let top = Settings::from_pairs(btreemap! {"B" => "3", "C" => "4"}).unwrap();
        base.extend(&top);

        assert_eq!(base.get_value("A"), Some("1"));
        assert_eq!(base.get_value("B"), Some("3"));
        assert_eq!(base.get_value("C"), Some("4"));
        assert_eq!(base.keys().collect::<Vec<_>>(), vec!["A", "B", "C"]);
        assert_eq!(base.to_string(), "A=1\nB=3\nC=4\n");
    }
}
