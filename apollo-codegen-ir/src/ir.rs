//! The intermediate representation handed to code emitters.
//!
//! Everything in here is built once, bottom-up, and never mutated afterwards. Identity is
//! structural: two IR values built from the same inputs compare equal.

use std::fmt::Display;
use std::fmt::Formatter;

use apollo_compiler::Name;
use apollo_compiler::ast::OperationType;
use apollo_compiler::ast::Value;
use indexmap::IndexSet;
use serde::Serialize;

use crate::conditions::BooleanExpression;
use crate::model::FlatModel;
use crate::model::IrModelGroup;
use crate::type_set::PossibleTypes;
use crate::type_set::TypeSet;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum IrType {
    NonNull(Box<IrType>),
    List(Box<IrType>),
    Scalar(Name),
    Enum(Name),
    Object(Name),
    Interface(Name),
    Union(Name),
    InputObject(Name),
}

impl IrType {
    /// The named type at the bottom of the list and non-null wrappers.
    pub fn raw_type_name(&self) -> &Name {
        match self {
            Self::NonNull(inner) | Self::List(inner) => inner.raw_type_name(),
            Self::Scalar(name)
            | Self::Enum(name)
            | Self::Object(name)
            | Self::Interface(name)
            | Self::Union(name)
            | Self::InputObject(name) => name,
        }
    }

    pub fn is_composite(&self) -> bool {
        match self {
            Self::NonNull(inner) | Self::List(inner) => inner.is_composite(),
            Self::Object(_) | Self::Interface(_) | Self::Union(_) => true,
            Self::Scalar(_) | Self::Enum(_) | Self::InputObject(_) => false,
        }
    }

    pub fn is_list(&self) -> bool {
        match self {
            Self::NonNull(inner) => inner.is_list(),
            Self::List(_) => true,
            _ => false,
        }
    }
}

impl Display for IrType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonNull(inner) => write!(f, "{inner}!"),
            Self::List(inner) => write!(f, "[{inner}]"),
            named => write!(f, "{}", named.raw_type_name()),
        }
    }
}

/// A GraphQL value as written in the document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum IrValue {
    Null,
    Boolean(bool),
    Int(String),
    Float(String),
    String(String),
    Enum(Name),
    Variable(Name),
    List(Vec<IrValue>),
    Object(Vec<(Name, IrValue)>),
}

impl From<&Value> for IrValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Boolean(value) => Self::Boolean(*value),
            Value::Int(value) => Self::Int(value.as_str().to_string()),
            Value::Float(value) => Self::Float(value.as_str().to_string()),
            Value::String(value) => Self::String(value.to_string()),
            Value::Enum(value) => Self::Enum(value.clone()),
            Value::Variable(value) => Self::Variable(value.clone()),
            Value::List(values) => Self::List(values.iter().map(|value| (&**value).into()).collect()),
            Value::Object(fields) => Self::Object(
                fields
                    .iter()
                    .map(|(name, value)| (name.clone(), (&**value).into()))
                    .collect(),
            ),
        }
    }
}

impl IrValue {
    /// Variables referenced anywhere in this value.
    pub fn variables(&self) -> Vec<&Name> {
        match self {
            Self::Variable(name) => vec![name],
            Self::List(values) => values.iter().flat_map(Self::variables).collect(),
            Self::Object(fields) => fields.iter().flat_map(|(_, value)| value.variables()).collect(),
            _ => Vec::new(),
        }
    }
}

impl Display for IrValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Boolean(value) => write!(f, "{value}"),
            Self::Int(value) | Self::Float(value) => write!(f, "{value}"),
            Self::String(value) => write!(f, "{value:?}"),
            Self::Enum(value) => write!(f, "{value}"),
            Self::Variable(value) => write!(f, "${value}"),
            Self::List(values) => {
                write!(f, "[")?;
                for (index, value) in values.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{value}")?;
                }
                write!(f, "]")
            }
            Self::Object(fields) => {
                write!(f, "{{")?;
                for (index, (name, value)) in fields.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{name}: {value}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct IrArgument {
    pub name: Name,
    pub value: IrValue,
    /// The type the schema declares for this argument.
    #[serde(rename = "type")]
    pub ty: IrType,
}

/// Everything about a field that does not depend on where it was selected from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FieldInfo {
    pub name: Name,
    pub alias: Option<Name>,
    /// Sorted by name, so that argument order in the document does not matter.
    pub arguments: Vec<IrArgument>,
    #[serde(rename = "type")]
    pub ty: IrType,
    pub description: Option<String>,
    pub deprecation_reason: Option<String>,
}

impl FieldInfo {
    pub fn response_name(&self) -> &Name {
        self.alias.as_ref().unwrap_or(&self.name)
    }

    pub fn raw_type_name(&self) -> &Name {
        self.ty.raw_type_name()
    }
}

/// A field of the response, with one field set per shape its value can take.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IrField {
    pub info: FieldInfo,
    pub condition: BooleanExpression,
    /// Empty for leaf (scalar and enum) fields.
    pub field_sets: Vec<IrFieldSet>,
    /// Fragments spread directly in this field's selection set.
    pub fragments: IndexSet<Name>,
}

impl IrField {
    pub fn response_name(&self) -> &Name {
        self.info.response_name()
    }

    /// The field set of the field's own type.
    pub fn base_field_set(&self) -> Option<&IrFieldSet> {
        self.field_sets.iter().find(|field_set| field_set.type_set.len() == 1)
    }

    pub fn field_set(&self, type_set: &TypeSet) -> Option<&IrFieldSet> {
        self.field_sets
            .iter()
            .find(|field_set| &field_set.type_set == type_set)
    }
}

/// The fields selected for one shape of a composite field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IrFieldSet {
    pub type_set: TypeSet,
    /// Every possible type of the field for the base shape. For any other shape, the types
    /// matching its type conditions and no other, so field sets never partially overlap.
    pub possible_types: PossibleTypes,
    pub fields: Vec<IrField>,
    /// Fragments spread at a place that applies to this shape.
    pub fragments: IndexSet<Name>,
}

impl IrFieldSet {
    pub fn field(&self, response_name: &str) -> Option<&IrField> {
        self.fields
            .iter()
            .find(|field| field.response_name().as_str() == response_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IrVariable {
    pub name: Name,
    #[serde(rename = "type")]
    pub ty: IrType,
    pub default_value: Option<IrValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IrOperation {
    pub name: Name,
    #[serde(serialize_with = "serialize_operation_type")]
    pub operation_type: OperationType,
    pub variables: Vec<IrVariable>,
    /// The root field, named `data`, typed with the root operation type.
    pub data_field: IrField,
    pub data_model_group: IrModelGroup,
    /// Every fragment the operation uses, directly or through other fragments, sorted by name.
    pub fragment_names: Vec<Name>,
    /// The operation text followed by the text of every fragment it uses.
    pub source_with_fragments: String,
    /// Collision-free names for every model of the operation, when flattening is enabled.
    pub flattened_models: Option<Vec<FlatModel>>,
}

fn serialize_operation_type<S: serde::Serializer>(
    operation_type: &OperationType,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(operation_type_name(*operation_type))
}

pub(crate) fn operation_type_name(operation_type: OperationType) -> &'static str {
    match operation_type {
        OperationType::Query => "query",
        OperationType::Mutation => "mutation",
        OperationType::Subscription => "subscription",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IrNamedFragment {
    pub name: Name,
    pub type_condition: Name,
    pub data_field: IrField,
    /// Models every spread of the fragment implements.
    pub interface_model_group: IrModelGroup,
    /// Concrete models used to read the fragment on its own.
    pub implementation_model_group: Option<IrModelGroup>,
    pub fragment_names: Vec<Name>,
    pub source: String,
    pub flattened_models: Option<Vec<FlatModel>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IrEnum {
    pub name: Name,
    pub description: Option<String>,
    pub values: Vec<IrEnumValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IrEnumValue {
    pub name: Name,
    pub description: Option<String>,
    pub deprecation_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IrInputObject {
    pub name: Name,
    pub description: Option<String>,
    pub fields: Vec<IrInputField>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IrInputField {
    pub name: Name,
    #[serde(rename = "type")]
    pub ty: IrType,
    pub description: Option<String>,
    pub default_value: Option<IrValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IrCustomScalar {
    pub name: Name,
    pub description: Option<String>,
}

/// The output of the builder: everything a code emitter needs for one document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct IntermediateRepresentation {
    pub operations: Vec<IrOperation>,
    pub fragments: Vec<IrNamedFragment>,
    pub input_objects: Vec<IrInputObject>,
    pub enums: Vec<IrEnum>,
    pub custom_scalars: Vec<IrCustomScalar>,
}

impl IntermediateRepresentation {
    pub fn operation(&self, name: &str) -> Option<&IrOperation> {
        self.operations
            .iter()
            .find(|operation| operation.name.as_str() == name)
    }

    pub fn fragment(&self, name: &str) -> Option<&IrNamedFragment> {
        self.fragments.iter().find(|fragment| fragment.name.as_str() == name)
    }
}
