use derive_more::Display;
use globforge_lexer::LexerError;
use globforge_settings::SettingsError;
use globforge_util::LineInfo;
use thiserror::Error;

/// Broad classification of a failure, used to pick the process exit code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum ErrorCategory {
    /// Malformed or contradictory input files.
    #[display("BUILD")]
    Build,
    /// Bad command line or file arguments.
    #[display("INPUT")]
    Input,
    /// Internal misuse.
    #[display("RUNTIME")]
    Runtime,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("Project name already set to {0}")]
    ProjectRedefined(String),

    #[error("Duplicate layer {0}")]
    DuplicateLayer(String),

    #[error("Duplicate variant {variant} in layer {layer}")]
    DuplicateVariant { layer: String, variant: String },

    #[error("Duplicate dependency {0}")]
    DuplicateDependency(String),

    #[error("Duplicate value {0}")]
    DuplicateValue(String),

    #[error("Unknown layer {0}")]
    UnknownLayer(String),

    #[error("Unknown variant {variant} for layer {layer}")]
    UnknownVariant { layer: String, variant: String },

    #[error("Malformed setting {0}")]
    MalformedSetting(String),

    #[error("Conflicting/Duplicate setting {0}")]
    ConflictingSetting(String),

    #[error("Must specify variant for layer {0}")]
    MissingVariant(String),

    #[error("Unknown label {0}")]
    UnknownLabel(String),

    #[error("Output '{0}' is outside the output directory")]
    OutputOutsideOutDir(String),

    #[error("Undefined value {0}")]
    UndefinedValue(String),

    #[error("Generator for format '{0}' must be handled by a callback")]
    UnhandledGenerator(String),

    #[error("Checksum mismatch for '{file}': expected {expected}, got {actual}")]
    ChecksumMismatch {
        file: String,
        expected: String,
        actual: String,
    },

    #[error("Cannot extract '{0}' automatically")]
    CannotExtract(String),

    #[error("Dependency action '{0}' needs a destination")]
    MissingDestination(String),
}

impl BuildError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            BuildError::UnknownLayer(_)
            | BuildError::UnknownVariant { .. }
            | BuildError::MalformedSetting(_)
            | BuildError::ConflictingSetting(_)
            | BuildError::MissingVariant(_) => ErrorCategory::Input,
            BuildError::UnknownLabel(_) | BuildError::MissingDestination(_) => ErrorCategory::Runtime,
            _ => ErrorCategory::Build,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Lexer(#[from] LexerError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("Bad grammar")]
    BadGrammar,

    #[error("Bad directive")]
    BadDirective,

    #[error("{0} is not allowed in this scope")]
    NotAllowed(String),

    #[error("Redefinition of {0}")]
    Redefinition(&'static str),

    #[error("default must appear after type")]
    DefaultBeforeType,

    #[error("Invalid type {0}")]
    InvalidType(String),

    #[error("Invalid value '{value}' for type {ty}")]
    InvalidValue { value: String, ty: String },

    #[error("Invalid choice '{0}'")]
    InvalidChoice(String),

    #[error("Invalid identifier")]
    InvalidIdentifier,

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Missing type for config {0}")]
    MissingType(String),

    #[error("Missing choices for enum {0}")]
    MissingChoices(String),

    #[error("{block} requires {field}")]
    MissingField {
        block: &'static str,
        field: &'static str,
    },

    #[error("end must be at the end of a block")]
    UnexpectedEnd,

    #[error("Unterminated block started at {0}")]
    Unterminated(String),

    #[error("Missing label for entry")]
    MissingLabel,

    #[error("Invalid label name {0}")]
    InvalidLabel(String),

    #[error("Malformed condition")]
    MalformedCondition,

    #[error("Unexpected text after expression")]
    TextAfterExpression,

    #[error("Expected end of expression")]
    ExpectedEndOfExpression,

    #[error("{0} must be inside a condition block")]
    OutsideCondition(&'static str),

    #[error("'{0}' is not a file")]
    NotAFile(String),

    #[error("'{0}' is not a directory")]
    NotADirectory(String),

    #[error("'{0}' matched no files")]
    NoMatches(String),

    #[error("Invalid pattern '{0}'")]
    BadPattern(String),

    #[error("Unknown generator format '{0}'")]
    UnknownGenerator(String),

    #[error("Projects have no parameters")]
    ProjectParameters,

    #[error("Cannot define multiple projects")]
    MultipleProjects,

    #[error("Unknown action '{action}' for dependency {dependency}")]
    UnknownAction { action: String, dependency: String },
}

impl ParseErrorKind {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ParseErrorKind::Build(err) => err.category(),
            _ => ErrorCategory::Build,
        }
    }
}

/// A failure tied to the line that caused it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{line_info}: {kind}")]
pub struct ParseError {
    pub line_info: LineInfo,
    pub kind: ParseErrorKind,
}

impl ParseError {
    pub fn new<K: Into<ParseErrorKind>>(line_info: &LineInfo, kind: K) -> Self {
        ParseError {
            line_info: line_info.clone(),
            kind: kind.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        self.kind.category()
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Find the category of the first categorized error in `err`'s chain. Uncategorized errors
/// (I/O and the like) count as input errors.
pub fn categorize(err: &anyhow::Error) -> ErrorCategory {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<ParseError>() {
            return e.category();
        }
        if let Some(e) = cause.downcast_ref::<BuildError>() {
            return e.category();
        }
    }
    ErrorCategory::Input
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_error_carries_location() {
        let info = LineInfo::new("prj.gfp", 12, ":layer");
        let err = ParseError::new(&info, ParseErrorKind::Redefinition("prefix"));
        assert_eq!(err.to_string(), "prj.gfp:12: Redefinition of prefix");
        assert_eq!(err.category(), ErrorCategory::Build);

        let err = ParseError::new(&info, SettingsError::NotDefined("X".into()));
        assert_eq!(err.to_string(), "prj.gfp:12: X not defined");
    }

    #[test]
    fn categories() {
        let err = anyhow::Error::new(BuildError::MissingVariant("L".into()));
        assert_eq!(categorize(&err), ErrorCategory::Input);

        let info = LineInfo::new("x", 1, "");
        let err = anyhow::Error::new(ParseError::new(&info, BuildError::DuplicateLayer("L".into())))
            .context("while building");
        assert_eq!(categorize(&err), ErrorCategory::Build);

        let err = anyhow::anyhow!("disk on fire");
        assert_eq!(categorize(&err), ErrorCategory::Input);
    }
}
