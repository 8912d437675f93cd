//! The schema types generated code needs besides the models: enums, input objects and custom
//! scalars referenced by the document.

use apollo_compiler::Name;
use apollo_compiler::schema::ExtendedType;
use indexmap::IndexSet;

use crate::error::IrError;
use crate::ir::IrCustomScalar;
use crate::ir::IrEnum;
use crate::ir::IrEnumValue;
use crate::ir::IrField;
use crate::ir::IrInputField;
use crate::ir::IrInputObject;
use crate::ir::IrType;
use crate::ir::IrValue;
use crate::schema::CodegenSchema;
use crate::schema::deprecation_reason;

const BUILT_IN_SCALARS: [&str; 5] = ["Int", "Float", "String", "Boolean", "ID"];

#[derive(Debug, Default)]
pub(crate) struct UsedTypes {
    names: IndexSet<Name>,
}

impl UsedTypes {
    /// Records the types of a field, of its arguments and of every field beneath it.
    pub(crate) fn add_field(&mut self, schema: &CodegenSchema, field: &IrField) -> Result<(), IrError> {
        self.add_type(schema, &field.info.ty)?;
        for argument in &field.info.arguments {
            self.add_type(schema, &argument.ty)?;
        }
        for field_set in &field.field_sets {
            for child in &field_set.fields {
                self.add_field(schema, child)?;
            }
        }
        Ok(())
    }

    /// Records a type, and the types of the fields of input objects.
    pub(crate) fn add_type(&mut self, schema: &CodegenSchema, ty: &IrType) -> Result<(), IrError> {
        match ty {
            IrType::NonNull(inner) | IrType::List(inner) => self.add_type(schema, inner),
            IrType::Scalar(name) | IrType::Enum(name) => {
                self.names.insert(name.clone());
                Ok(())
            }
            IrType::InputObject(name) => {
                if !self.names.insert(name.clone()) {
                    return Ok(());
                }
                if let ExtendedType::InputObject(input_object) = schema.get_type(name)? {
                    for field in input_object.fields.values() {
                        self.add_type(schema, &schema.ir_type(&field.ty)?)?;
                    }
                }
                Ok(())
            }
            IrType::Object(_) | IrType::Interface(_) | IrType::Union(_) => Ok(()),
        }
    }

    /// The recorded types, each list in schema declaration order.
    pub(crate) fn into_ir(
        self,
        schema: &CodegenSchema,
    ) -> Result<(Vec<IrInputObject>, Vec<IrEnum>, Vec<IrCustomScalar>), IrError> {
        let mut input_objects = Vec::new();
        let mut enums = Vec::new();
        let mut custom_scalars = Vec::new();
        for (name, ty) in &schema.schema().types {
            if !self.names.contains(name) {
                continue;
            }
            match ty {
                ExtendedType::Enum(enum_) => enums.push(IrEnum {
                    name: name.clone(),
                    description: enum_.description.as_ref().map(|d| d.to_string()),
                    values: enum_
                        .values
                        .values()
                        .map(|value| IrEnumValue {
                            name: value.value.clone(),
                            description: value.description.as_ref().map(|d| d.to_string()),
                            deprecation_reason: deprecation_reason(&value.directives),
                        })
                        .collect(),
                }),
                ExtendedType::InputObject(input_object) => {
                    let fields = input_object
                        .fields
                        .values()
                        .map(|field| {
                            Ok(IrInputField {
                                name: field.name.clone(),
                                ty: schema.ir_type(&field.ty)?,
                                description: field.description.as_ref().map(|d| d.to_string()),
                                default_value: field
                                    .default_value
                                    .as_ref()
                                    .map(|value| IrValue::from(&**value)),
                            })
                        })
                        .collect::<Result<Vec<_>, IrError>>()?;
                    input_objects.push(IrInputObject {
                        name: name.clone(),
                        description: input_object.description.as_ref().map(|d| d.to_string()),
                        fields,
                    });
                }
                ExtendedType::Scalar(scalar) if !BUILT_IN_SCALARS.contains(&name.as_str()) => {
                    custom_scalars.push(IrCustomScalar {
                        name: name.clone(),
                        description: scalar.description.as_ref().map(|d| d.to_string()),
                    });
                }
                _ => {}
            }
        }
        Ok((input_objects, enums, custom_scalars))
    }
}
