use std::collections::BTreeSet;

use apollo_codegen_ir::IntermediateRepresentation;
use apollo_codegen_ir::IrBuilder;
use apollo_codegen_ir::IrBuilderConfig;
use apollo_codegen_ir::IrError;
use apollo_codegen_ir::ir::IrField;
use apollo_compiler::ExecutableDocument;
use apollo_compiler::Schema;
use apollo_compiler::schema::ExtendedType;

pub(crate) const ANIMALS_SDL: &str = r#"
    type Query {
      animal: Animal
      animals: [Animal!]!
      pet: Pet
      search(term: String!): [SearchResult!]
      creature: Creature
    }

    interface Animal {
      name: String!
      friends: [Animal!]!
    }

    interface Pet {
      owner: String
    }

    type Dog implements Animal & Pet {
      name: String!
      friends: [Animal!]!
      owner: String
      breed: String
    }

    type Cat implements Animal & Pet {
      name: String!
      friends: [Animal!]!
      owner: String
      livesLeft: Int
    }

    type Lion implements Animal {
      name: String!
      friends: [Animal!]!
      pride: Int
    }

    type Fish implements Pet {
      owner: String
      fins: Int
    }

    union SearchResult = Dog | Cat | Fish

    union Creature = Dog | Cat | Lion | Fish
"#;

/// Builds a document that passes validation.
pub(crate) fn build(sdl: &str, query: &str) -> Result<IntermediateRepresentation, IrError> {
    build_with(sdl, query, IrBuilderConfig::default())
}

pub(crate) fn build_with(
    sdl: &str,
    query: &str,
    config: IrBuilderConfig,
) -> Result<IntermediateRepresentation, IrError> {
    let schema = Schema::parse_and_validate(sdl, "schema.graphql").unwrap();
    let document = ExecutableDocument::parse_and_validate(&schema, query, "query.graphql").unwrap();
    IrBuilder::new(schema, config).build(&document)
}

/// Builds a document without validating it first, for documents the validator would reject.
pub(crate) fn build_unvalidated(
    sdl: &str,
    query: &str,
) -> Result<IntermediateRepresentation, IrError> {
    let schema = Schema::parse_and_validate(sdl, "schema.graphql").unwrap();
    let document = ExecutableDocument::parse(&schema, query, "query.graphql").unwrap();
    IrBuilder::new(schema, IrBuilderConfig::default()).build(&document)
}

/// Follows a path of response names from an operation's root, through base field sets.
pub(crate) fn field<'a>(ir: &'a IntermediateRepresentation, operation: &str, path: &[&str]) -> &'a IrField {
    let mut field = &ir.operation(operation).unwrap().data_field;
    for response_name in path {
        field = field
            .base_field_set()
            .unwrap()
            .field(response_name)
            .unwrap_or_else(|| panic!("no field {response_name}"));
    }
    field
}

pub(crate) fn names<'a>(names: impl IntoIterator<Item = &'a apollo_compiler::Name>) -> Vec<&'a str> {
    names.into_iter().map(|name| name.as_str()).collect()
}

/// The object types a value of a composite type can have, straight from the schema.
pub(crate) fn schema_possible_types(sdl: &str, type_name: &str) -> BTreeSet<String> {
    let schema = Schema::parse_and_validate(sdl, "schema.graphql").unwrap();
    let mut types = BTreeSet::new();
    match schema.types.get(type_name) {
        Some(ExtendedType::Object(_)) => {
            types.insert(type_name.to_string());
        }
        Some(ExtendedType::Interface(_)) => {
            for (name, ty) in &schema.types {
                if let ExtendedType::Object(object) = ty {
                    if object.implements_interfaces.iter().any(|i| i.name.as_str() == type_name) {
                        types.insert(name.to_string());
                    }
                }
            }
        }
        Some(ExtendedType::Union(union_)) => {
            types.extend(union_.members.iter().map(|member| member.name.to_string()));
        }
        _ => {}
    }
    types
}

/// Every composite field of an operation, depth first.
pub(crate) fn composite_fields(field: &IrField) -> Vec<&IrField> {
    let mut fields = Vec::new();
    if !field.field_sets.is_empty() {
        fields.push(field);
    }
    for field_set in &field.field_sets {
        for child in &field_set.fields {
            fields.extend(composite_fields(child));
        }
    }
    fields
}
