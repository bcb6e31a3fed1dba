use std::fmt;

use derive_more::Display;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
pub enum ParamType {
    #[display("BOOL")]
    Bool,
    #[display("STRING")]
    String,
    #[display("INT")]
    Int,
    #[display("FLOAT")]
    Float,
    #[display("ENUM")]
    Enum,
}

impl ParamType {
    /// Parse a type name, ignoring case.
    pub fn validate_type(text: &str) -> Option<ParamType> {
        match text.to_ascii_uppercase().as_str() {
            "BOOL" => Some(ParamType::Bool),
            "STRING" => Some(ParamType::String),
            "INT" => Some(ParamType::Int),
            "FLOAT" => Some(ParamType::Float),
            "ENUM" => Some(ParamType::Enum),
            _ => None,
        }
    }

    /// Check `text` against this type. Enum values are only checked for being non-empty here;
    /// membership in the choice list is checked once the choices are known.
    pub fn validate_value(&self, text: &str) -> Option<ParamValue> {
        match self {
            ParamType::Bool => match text.to_ascii_uppercase().as_str() {
                "TRUE" => Some(ParamValue::Bool(true)),
                "FALSE" => Some(ParamValue::Bool(false)),
                _ => None,
            },
            ParamType::String => Some(ParamValue::Str(text.to_string())),
            ParamType::Int => text.trim().parse().ok().map(ParamValue::Int),
            ParamType::Float => text.trim().parse().ok().map(ParamValue::Float),
            ParamType::Enum => {
                let text = text.trim();
                (!text.is_empty()).then(|| ParamValue::Enum(text.to_string()))
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ParamValue {
    Bool(bool),
    Str(String),
    Int(i64),
    Float(f64),
    /// Identifier of the selected choice.
    Enum(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(true) => write!(f, "TRUE"),
            ParamValue::Bool(false) => write!(f, "FALSE"),
            ParamValue::Str(s) | ParamValue::Enum(s) => write!(f, "{s}"),
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Float(v) => write!(f, "{v}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Choice {
    pub id: String,
    pub text: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnumMetadata {
    /// Identifier which receives the number of choices.
    pub count: Option<String>,
    pub choices: Vec<Choice>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub id: String,
    pub title: String,
    pub ptype: ParamType,
    pub description: String,
    pub default: Option<ParamValue>,
    pub metadata: Option<EnumMetadata>,
}

impl Param {
    pub fn new<S: Into<String>>(id: S, ptype: ParamType) -> Self {
        Param {
            id: id.into(),
            title: String::new(),
            ptype,
            description: String::new(),
            default: None,
            metadata: None,
        }
    }

    pub fn with_title<S: Into<String>>(mut self, title: S) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_default(mut self, default: ParamValue) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_metadata(mut self, metadata: EnumMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Display text: the title, or the identifier when there is none.
    pub fn text(&self) -> &str {
        if self.title.is_empty() {
            &self.id
        } else {
            &self.title
        }
    }

    /// Constants implied by an enum: each choice's ordinal, then the choice count.
    pub fn implicit_values(&self) -> Vec<(String, String)> {
        let Some(metadata) = &self.metadata else {
            return vec![];
        };

        let mut out: Vec<_> = metadata
            .choices
            .iter()
            .enumerate()
            .map(|(idx, choice)| (choice.id.clone(), idx.to_string()))
            .collect();
        if let Some(count) = &metadata.count {
            out.push((count.clone(), metadata.choices.len().to_string()));
        }
        out
    }
}

impl AsRef<Param> for Param {
    fn as_ref(&self) -> &Param {
        self
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut fields = vec![];
        if !self.id.is_empty() {
            fields.push(format!("id={}", self.id));
        }
        fields.push(format!("type={}", self.ptype));
        if !self.title.is_empty() {
            fields.push(format!("title={}", self.title));
        }
        if let Some(default) = &self.default {
            fields.push(format!("default={default}"));
        }
        if !self.description.is_empty() {
            fields.push(format!("desc={}", self.description));
        }
        if let Some(metadata) = &self.metadata {
            if let Some(count) = &metadata.count {
                fields.push(format!("count={count}"));
            }
            for choice in &metadata.choices {
                fields.push(format!("choice={},{}", choice.id, choice.text));
            }
        }
        write!(f, "{}", fields.join(" "))
    }
}
