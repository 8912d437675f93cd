use apollo_compiler::Name;
use apollo_compiler::Schema;
use apollo_compiler::ast::DirectiveList;
use apollo_compiler::ast::OperationType;
use apollo_compiler::ast::Type;
use apollo_compiler::ast::Value;
use apollo_compiler::schema::ExtendedType;
use apollo_compiler::validation::Valid;
use indexmap::IndexMap;

use crate::error::IrError;
use crate::error::SchemaElement;
use crate::ir::IrType;
use crate::ir::operation_type_name;
use crate::type_set::PossibleTypes;

/// A read-only view of the schema with the possible runtime types of every composite type
/// computed up front.
#[derive(Debug, Clone)]
pub struct CodegenSchema {
    schema: Valid<Schema>,
    /// Object types that can be returned for each object, interface or union type, sorted by name.
    possible_runtime_types: IndexMap<Name, PossibleTypes>,
}

impl CodegenSchema {
    pub fn new(schema: Valid<Schema>) -> Self {
        let mut possible_runtime_types: IndexMap<Name, PossibleTypes> = IndexMap::default();
        for (type_name, type_) in &schema.types {
            match type_ {
                ExtendedType::Object(_) | ExtendedType::Interface(_) | ExtendedType::Union(_) => {
                    possible_runtime_types.insert(type_name.clone(), PossibleTypes::new());
                }
                _ => {}
            }
        }
        for (type_name, type_) in &schema.types {
            match type_ {
                ExtendedType::Object(object) => {
                    let supertypes = std::iter::once(type_name)
                        .chain(object.implements_interfaces.iter().map(|i| &i.name));
                    for supertype in supertypes {
                        if let Some(objects) = possible_runtime_types.get_mut(supertype) {
                            objects.insert(type_name.clone());
                        }
                    }
                }
                ExtendedType::Union(union_) => {
                    for member in &union_.members {
                        if let Some(ExtendedType::Object(_)) = schema.types.get(&member.name) {
                            if let Some(objects) = possible_runtime_types.get_mut(type_name) {
                                objects.insert(member.name.clone());
                            }
                        }
                    }
                }
                _ => {}
            }
        }
        Self {
            schema,
            possible_runtime_types,
        }
    }

    pub fn schema(&self) -> &Valid<Schema> {
        &self.schema
    }

    pub(crate) fn get_type(&self, type_name: &str) -> Result<&ExtendedType, IrError> {
        self.schema
            .types
            .get(type_name)
            .ok_or_else(|| IrError::unknown(SchemaElement::Type, type_name))
    }

    pub(crate) fn is_composite(&self, type_name: &str) -> bool {
        self.possible_runtime_types.contains_key(type_name)
    }

    pub(crate) fn is_abstract(&self, type_name: &str) -> bool {
        matches!(
            self.schema.types.get(type_name),
            Some(ExtendedType::Interface(_) | ExtendedType::Union(_))
        )
    }

    /// The object types a value of this composite type can have at runtime.
    pub(crate) fn possible_runtime_types(&self, type_name: &str) -> Result<PossibleTypes, IrError> {
        self.possible_runtime_types
            .get(type_name)
            .cloned()
            .ok_or_else(|| IrError::unknown(SchemaElement::CompositeType, type_name))
    }

    pub(crate) fn root_type(&self, operation_type: OperationType) -> Result<&Name, IrError> {
        self.schema
            .root_operation(operation_type)
            .ok_or_else(|| {
                IrError::unknown(
                    SchemaElement::RootOperation,
                    operation_type_name(operation_type),
                )
            })
    }

    /// Converts a type reference of the document into the IR type.
    pub(crate) fn ir_type(&self, ty: &Type) -> Result<IrType, IrError> {
        Ok(match ty {
            Type::Named(name) => self.named_ir_type(name)?,
            Type::NonNullNamed(name) => IrType::NonNull(Box::new(self.named_ir_type(name)?)),
            Type::List(inner) => IrType::List(Box::new(self.ir_type(inner)?)),
            Type::NonNullList(inner) => {
                IrType::NonNull(Box::new(IrType::List(Box::new(self.ir_type(inner)?))))
            }
        })
    }

    fn named_ir_type(&self, name: &Name) -> Result<IrType, IrError> {
        Ok(match self.get_type(name)? {
            ExtendedType::Scalar(_) => IrType::Scalar(name.clone()),
            ExtendedType::Enum(_) => IrType::Enum(name.clone()),
            ExtendedType::Object(_) => IrType::Object(name.clone()),
            ExtendedType::Interface(_) => IrType::Interface(name.clone()),
            ExtendedType::Union(_) => IrType::Union(name.clone()),
            ExtendedType::InputObject(_) => IrType::InputObject(name.clone()),
        })
    }
}

const DEPRECATED_DIRECTIVE: &str = "deprecated";
const DEFAULT_DEPRECATION_REASON: &str = "No longer supported";

/// The reason given by `@deprecated` on a schema element, if it carries one.
pub(crate) fn deprecation_reason(directives: &DirectiveList) -> Option<String> {
    let directive = directives.get(DEPRECATED_DIRECTIVE)?;
    let reason = directive
        .arguments
        .iter()
        .find(|argument| argument.name == "reason")
        .and_then(|argument| match &*argument.value {
            Value::String(reason) => Some(reason.to_string()),
            _ => None,
        });
    Some(reason.unwrap_or_else(|| DEFAULT_DEPRECATION_REASON.to_string()))
}
