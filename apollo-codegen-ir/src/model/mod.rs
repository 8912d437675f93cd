//! The model graph: the value types an emitter generates for each field.
//!
//! Every composite field gets an [`IrModelGroup`] with one model per shape of the field. Models of
//! more general shapes are interfaces implemented by the models of narrower shapes; a shape that
//! both has narrower shapes and types of its own also gets a concrete "Other" model for those
//! types.

use std::fmt;
use std::fmt::Display;

use apollo_compiler::Name;
use serde::Serialize;

use crate::conditions::BooleanExpression;
use crate::display_helpers::DisplayList;
use crate::display_helpers::State;
use crate::display_helpers::write_indented_lines;
use crate::ir::FieldInfo;
use crate::type_set::PossibleTypes;
use crate::type_set::TypeSet;

mod builder;
mod naming;

pub(crate) use builder::FragmentInterfaces;
pub(crate) use builder::ModelGroupBuilder;
pub(crate) use naming::flatten;

/// The operation or fragment pass a model tree belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ModelRoot {
    Operation(Name),
    FragmentInterface(Name),
    FragmentImplementation(Name),
}

impl Display for ModelRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Operation(name) => write!(f, "{name}"),
            Self::FragmentInterface(name) => write!(f, "{name}#interface"),
            Self::FragmentImplementation(name) => write!(f, "{name}#implementation"),
        }
    }
}

/// Identifies a model by where it sits in its tree: the root model name, then the response name
/// and model name of every nested property group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ModelId {
    pub root: ModelRoot,
    pub path: Vec<String>,
}

impl ModelId {
    pub(crate) fn new(root: ModelRoot, path: Vec<String>) -> Self {
        Self { root, path }
    }

    /// The model name, last element of the path.
    pub fn name(&self) -> &str {
        self.path.last().map(String::as_str).unwrap_or_default()
    }
}

impl Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root)?;
        self.path.iter().try_for_each(|segment| write!(f, ".{segment}"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IrModel {
    pub id: ModelId,
    pub name: String,
    pub type_set: TypeSet,
    pub possible_types: PossibleTypes,
    pub properties: Vec<IrProperty>,
    pub accessors: Vec<IrAccessor>,
    /// The interface models this model implements.
    pub implements: Vec<ModelId>,
    pub is_interface: bool,
    /// The model of the field's own type.
    pub is_base: bool,
    /// The concrete model for the possible types of the field's own type that no narrower shape
    /// covers.
    pub is_fallback: bool,
}

impl IrModel {
    pub fn property(&self, response_name: &str) -> Option<&IrProperty> {
        self.properties
            .iter()
            .find(|property| property.info.response_name().as_str() == response_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IrProperty {
    pub info: FieldInfo,
    pub condition: BooleanExpression,
    /// Whether a model this one implements declares the same property.
    pub is_override: bool,
    /// `None` for leaf fields.
    pub model_group: Option<IrModelGroup>,
}

/// Downcasts from a model to a more specific one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum IrAccessor {
    /// Reads the value as a named fragment, returning the base model of the fragment's interface.
    Fragment {
        fragment_name: Name,
        return_model_id: ModelId,
    },
    /// Reads the value as a narrower shape of the same field.
    Subtype {
        type_set: TypeSet,
        return_model_id: ModelId,
    },
}

impl IrAccessor {
    pub fn return_model_id(&self) -> &ModelId {
        match self {
            Self::Fragment {
                return_model_id, ..
            }
            | Self::Subtype {
                return_model_id, ..
            } => return_model_id,
        }
    }
}

/// The models of one field, in the order of the field's shapes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IrModelGroup {
    pub base_model_id: ModelId,
    pub models: Vec<IrModel>,
}

impl IrModelGroup {
    pub fn model(&self, id: &ModelId) -> Option<&IrModel> {
        self.models.iter().find(|model| &model.id == id)
    }

    pub fn model_named(&self, name: &str) -> Option<&IrModel> {
        self.models.iter().find(|model| model.name == name)
    }

    pub fn base_model(&self) -> Option<&IrModel> {
        self.model(&self.base_model_id)
    }
}

/// A model name that is unique across a whole operation or fragment tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlatModel {
    pub id: ModelId,
    pub name: String,
}

impl Display for IrModelGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut state = State::new(f);
        for (index, model) in self.models.iter().enumerate() {
            if index > 0 {
                state.new_line()?;
            }
            write_model(&mut state, model)?;
        }
        Ok(())
    }
}

fn write_model(state: &mut State<'_, '_>, model: &IrModel) -> fmt::Result {
    let kind = if model.is_interface {
        "interface"
    } else if model.is_fallback {
        "fallback"
    } else {
        "model"
    };
    write!(
        state,
        "{kind} {} {} -> {}",
        model.name,
        DisplayList(&model.type_set),
        DisplayList(&model.possible_types)
    )?;
    state.indent_no_new_line();
    for id in &model.implements {
        state.new_line()?;
        write!(state, "implements {id}")?;
    }
    for accessor in &model.accessors {
        state.new_line()?;
        match accessor {
            IrAccessor::Fragment {
                fragment_name,
                return_model_id,
            } => write!(state, "as ...{fragment_name} -> {return_model_id}")?,
            IrAccessor::Subtype {
                type_set,
                return_model_id,
            } => write!(state, "as {} -> {return_model_id}", DisplayList(type_set))?,
        }
    }
    for property in &model.properties {
        state.new_line()?;
        write_property(state, property)?;
    }
    state.dedent_no_new_line();
    Ok(())
}

fn write_property(state: &mut State<'_, '_>, property: &IrProperty) -> fmt::Result {
    write!(state, "{}: {}", property.info.response_name(), property.info.ty)?;
    if !property.condition.is_true() {
        write!(state, " if {}", property.condition)?;
    }
    if property.is_override {
        state.write(" (override)")?;
    }
    if let Some(group) = &property.model_group {
        state.write(" {")?;
        write_indented_lines(state, &group.models, write_model)?;
        state.new_line()?;
        state.write("}")?;
    }
    Ok(())
}
