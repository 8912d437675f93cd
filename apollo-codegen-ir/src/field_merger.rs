//! Merges field declarations sharing a response name.
//!
//! The same response name can be selected several times for one shape: directly, in inline
//! fragments, in named fragments. All those declarations become a single field of the shape. Their
//! sub-selections are only concatenated here; they are merged when the field itself is expanded.
use apollo_compiler::Name;
use apollo_compiler::executable::Selection;
use indexmap::IndexMap;
use itertools::Itertools;

use crate::conditions::BooleanExpression;
use crate::error::ConflictKind;
use crate::error::IrError;
use crate::ir::FieldInfo;
use crate::ir::IrArgument;

/// A selection beneath a field, with the named fragments that were being expanded when it was
/// found.
#[derive(Debug, Clone)]
pub(crate) struct ChildSelection<'doc> {
    pub(crate) selection: &'doc Selection,
    /// Outermost first.
    pub(crate) fragment_path: Vec<Name>,
}

impl<'doc> ChildSelection<'doc> {
    pub(crate) fn new(selection: &'doc Selection, fragment_path: Vec<Name>) -> Self {
        Self {
            selection,
            fragment_path,
        }
    }
}

/// One selection of a field, as found along one selection path.
#[derive(Debug, Clone)]
pub(crate) struct FieldDeclaration<'doc> {
    pub(crate) info: FieldInfo,
    /// The field's own condition combined with the conditions of the fragments enclosing it.
    pub(crate) condition: BooleanExpression,
    pub(crate) selections: Vec<ChildSelection<'doc>>,
}

#[derive(Debug, Clone)]
pub(crate) struct MergedField<'doc> {
    pub(crate) info: FieldInfo,
    pub(crate) condition: BooleanExpression,
    pub(crate) selections: Vec<ChildSelection<'doc>>,
}

impl PartialEq for MergedField<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.info == other.info
            && self.condition == other.condition
            && self.selections.len() == other.selections.len()
            && self
                .selections
                .iter()
                .zip(&other.selections)
                .all(|(a, b)| std::ptr::eq(a.selection, b.selection))
    }
}

/// Merges declarations by response name, keeping the order in which response names are first
/// seen.
///
/// # Errors
/// Returns [`IrError::FieldConflict`] if two declarations of a response name select different
/// fields, or the same field with a different type or different arguments.
pub(crate) fn merge<'doc>(
    declarations: impl IntoIterator<Item = FieldDeclaration<'doc>>,
) -> Result<Vec<MergedField<'doc>>, IrError> {
    let mut by_response_name: IndexMap<Name, Vec<FieldDeclaration<'doc>>> = IndexMap::default();
    for declaration in declarations {
        by_response_name
            .entry(declaration.info.response_name().clone())
            .or_default()
            .push(declaration);
    }

    by_response_name
        .into_values()
        .map(merge_same_response_name)
        .collect()
}

fn merge_same_response_name<'doc>(
    declarations: Vec<FieldDeclaration<'doc>>,
) -> Result<MergedField<'doc>, IrError> {
    let mut declarations = declarations.into_iter();
    let Some(first) = declarations.next() else {
        crate::bail!("Cannot merge an empty list of field declarations");
    };
    let mut merged = MergedField {
        info: first.info,
        condition: first.condition,
        selections: Vec::new(),
    };
    push_selections(&mut merged.selections, first.selections);

    for declaration in declarations {
        check_same_field(&merged.info, &declaration.info)?;
        merged.condition = merged.condition.or(declaration.condition);
        push_selections(&mut merged.selections, declaration.selections);
    }
    Ok(merged)
}

/// Appends selections, skipping the ones already present: a fragment spread twice contributes its
/// selections once.
fn push_selections<'doc>(
    target: &mut Vec<ChildSelection<'doc>>,
    selections: Vec<ChildSelection<'doc>>,
) {
    for selection in selections {
        if !target
            .iter()
            .any(|existing| std::ptr::eq(existing.selection, selection.selection))
        {
            target.push(selection);
        }
    }
}

fn check_same_field(first: &FieldInfo, other: &FieldInfo) -> Result<(), IrError> {
    let response_name = first.response_name().clone();
    if first.name != other.name {
        return Err(IrError::FieldConflict {
            response_name,
            kind: ConflictKind::FieldName,
            first: first.name.to_string(),
            second: other.name.to_string(),
        });
    }
    if first.ty != other.ty {
        return Err(IrError::FieldConflict {
            response_name,
            kind: ConflictKind::Type,
            first: first.ty.to_string(),
            second: other.ty.to_string(),
        });
    }
    if first.arguments != other.arguments {
        return Err(IrError::FieldConflict {
            response_name,
            kind: ConflictKind::Arguments,
            first: display_arguments(&first.arguments),
            second: display_arguments(&other.arguments),
        });
    }
    Ok(())
}

fn display_arguments(arguments: &[IrArgument]) -> String {
    format!(
        "({})",
        arguments
            .iter()
            .map(|argument| format!("{}: {}", argument.name, argument.value))
            .join(", ")
    )
}
