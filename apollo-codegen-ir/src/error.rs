//! Errors raised while building the intermediate representation.
//!
//! Every error is fatal to the whole build. Errors carry names (operation, fragment, response
//! name, type names) but no source locations: the compiler driver calling into this crate owns the
//! documents and attaches locations to its diagnostics.

use std::fmt::Display;
use std::fmt::Formatter;

use apollo_compiler::Name;
use itertools::Itertools;
use strum_macros::EnumIter;
use strum_macros::IntoStaticStr;

/// Create an internal error.
///
/// # Example
/// ```rust,ignore
/// use crate::internal_error;
/// use crate::error::IrError;
/// # fn may_be_none() -> Option<()> { None }
///
/// const NAME: &str = "the thing";
/// let result: Result<(), IrError> = may_be_none()
///     .ok_or_else(|| internal_error!("Expected {NAME} to be Some"));
/// ```
#[macro_export]
macro_rules! internal_error {
    ( $( $arg:tt )+ ) => {
        $crate::error::IrError::internal(format!( $( $arg )+ ))
    }
}

/// Break out of the current function, returning an internal error.
#[macro_export]
macro_rules! bail {
    ( $( $arg:tt )+ ) => {
        return Err($crate::internal_error!( $( $arg )+ ).into())
    }
}

/// A safe assertion: in debug mode, it panicks on failure, and in production, it returns an
/// internal error.
///
/// Treat this as an assertion. It must only be used for conditions that *should never happen*
/// in normal operation.
#[macro_export]
macro_rules! ensure {
    ( $expr:expr, $( $arg:tt )+ ) => {
        #[cfg(debug_assertions)]
        {
            assert!($expr, $( $arg )+);
        }

        #[cfg(not(debug_assertions))]
        if !$expr {
            $crate::bail!( $( $arg )+ );
        }
    }
}

/// The kind of schema or document element a name failed to resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
pub enum SchemaElement {
    #[strum(serialize = "type")]
    Type,
    #[strum(serialize = "composite type")]
    CompositeType,
    #[strum(serialize = "field")]
    Field,
    #[strum(serialize = "argument")]
    Argument,
    #[strum(serialize = "fragment")]
    Fragment,
    #[strum(serialize = "root operation type")]
    RootOperation,
    #[strum(serialize = "operation name")]
    OperationName,
}

impl Display for SchemaElement {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.into())
    }
}

/// What two field declarations sharing a response name disagree on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
pub enum ConflictKind {
    #[strum(serialize = "field names")]
    FieldName,
    #[strum(serialize = "types")]
    Type,
    #[strum(serialize = "arguments")]
    Arguments,
}

impl Display for ConflictKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IrError {
    #[error("An internal error has occurred, please report this bug to Apollo.\n\nDetails: {message}")]
    Internal { message: String },
    #[error("Cannot resolve {element} \"{name}\"{}", in_type_suffix(.parent_type))]
    SchemaResolution {
        element: SchemaElement,
        name: String,
        parent_type: Option<Name>,
    },
    #[error(
        "Fields \"{response_name}\" conflict because they have differing {kind}: \"{first}\" and \"{second}\". Use different aliases on the fields to fetch both if this was intentional."
    )]
    FieldConflict {
        response_name: Name,
        kind: ConflictKind,
        first: String,
        second: String,
    },
    #[error("Duplicate @skip/@include condition `{condition}` on \"{selection}\"")]
    DuplicateCondition { selection: String, condition: String },
    #[error("Fragment \"{fragment}\" spreads itself: {}", display_path(.path))]
    FragmentCycle { fragment: Name, path: Vec<Name> },
    #[error(
        "The \"if\" argument of @{directive} must be a boolean literal or a variable, got {value}"
    )]
    InvalidDirectiveArgument { directive: Name, value: String },
    #[error("{definition}: {source}")]
    InDefinition {
        definition: String,
        source: Box<IrError>,
    },
}

fn in_type_suffix(parent_type: &Option<Name>) -> String {
    match parent_type {
        Some(parent_type) => format!(" on type \"{parent_type}\""),
        None => String::new(),
    }
}

fn display_path(path: &[Name]) -> String {
    path.iter().join(" -> ")
}

impl IrError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub(crate) fn unknown(element: SchemaElement, name: impl Into<String>) -> Self {
        Self::SchemaResolution {
            element,
            name: name.into(),
            parent_type: None,
        }
    }

    /// Attach the name of the operation or fragment being built.
    ///
    /// Errors that already name their definition are returned untouched, so the innermost
    /// definition wins when fragments are built on demand from an operation.
    pub(crate) fn in_definition(self, definition: impl Display) -> Self {
        match self {
            Self::InDefinition { .. } => self,
            other => Self::InDefinition {
                definition: definition.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// The error without any definition context.
    pub fn root_cause(&self) -> &IrError {
        match self {
            Self::InDefinition { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// The operation or fragment the error was raised in, if known.
    pub fn definition(&self) -> Option<&str> {
        match self {
            Self::InDefinition { definition, .. } => Some(definition),
            _ => None,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self.root_cause() {
            Self::Internal { .. } => ErrorCode::Internal,
            Self::SchemaResolution { .. } => ErrorCode::SchemaResolution,
            Self::FieldConflict { .. } => ErrorCode::FieldConflict,
            Self::DuplicateCondition { .. } => ErrorCode::DuplicateCondition,
            Self::FragmentCycle { .. } => ErrorCode::FragmentCycle,
            Self::InvalidDirectiveArgument { .. } => ErrorCode::InvalidDirectiveArgument,
            // root_cause() never returns the wrapper
            Self::InDefinition { .. } => ErrorCode::Internal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr, EnumIter, strum_macros::Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    Internal,
    SchemaResolution,
    FieldConflict,
    DuplicateCondition,
    FragmentCycle,
    InvalidDirectiveArgument,
}

impl ErrorCode {
    pub fn definition(&self) -> &'static str {
        match self {
            Self::Internal => "An internal error, the IR builder broke one of its own invariants.",
            Self::SchemaResolution => {
                "A type, field, argument or fragment referenced by the document cannot be found."
            }
            Self::FieldConflict => {
                "Two selections share a response name but select different fields, types or arguments."
            }
            Self::DuplicateCondition => {
                "The same @skip/@include condition is declared twice on one selection."
            }
            Self::FragmentCycle => "A fragment spreads itself, directly or transitively.",
            Self::InvalidDirectiveArgument => {
                "The `if` argument of @skip/@include is neither a boolean literal nor a variable."
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use apollo_compiler::name;
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn error_codes_are_unique() {
        let codes: Vec<String> = ErrorCode::iter().map(|code| code.to_string()).collect();
        assert_eq!(codes.iter().unique().count(), codes.len());
        assert!(codes.contains(&"FIELD_CONFLICT".to_string()));
    }

    #[test]
    fn root_cause_unwraps_definition_context() {
        let error = IrError::FragmentCycle {
            fragment: name!("A"),
            path: vec![name!("A"), name!("B"), name!("A")],
        }
        .in_definition("fragment \"A\"")
        .in_definition("query \"Outer\"");
        assert_eq!(error.definition(), Some("fragment \"A\""));
        assert_eq!(error.code(), ErrorCode::FragmentCycle);
        assert_eq!(
            error.to_string(),
            "fragment \"A\": Fragment \"A\" spreads itself: A -> B -> A"
        );
    }

    #[test]
    fn schema_resolution_message_names_parent_type() {
        let error = IrError::SchemaResolution {
            element: SchemaElement::Argument,
            name: "first".to_string(),
            parent_type: Some(name!("Query")),
        };
        assert_eq!(
            error.to_string(),
            "Cannot resolve argument \"first\" on type \"Query\""
        );
    }
}
