//! ## Usage
//!
//! This crate builds the response-based intermediate representation used by GraphQL client code
//! generators. Given a schema and a validated executable document, [`IrBuilder::build`] computes
//! the shapes every polymorphic selection can take and the model graph (interfaces, concrete
//! models, fallbacks, downcast accessors) that represents them as statically typed values.
//!
//! Parsing and validating documents is left to `apollo-compiler`, and emitting code from the
//! [`IntermediateRepresentation`] is left to the caller.
//!
//! ```rust
//! use apollo_codegen_ir::IrBuilder;
//! use apollo_codegen_ir::IrBuilderConfig;
//! use apollo_compiler::ExecutableDocument;
//! use apollo_compiler::Schema;
//!
//! let schema = Schema::parse_and_validate(
//!     "type Query { hello: String }",
//!     "schema.graphql",
//! )
//! .unwrap();
//! let document =
//!     ExecutableDocument::parse_and_validate(&schema, "query Hello { hello }", "hello.graphql")
//!         .unwrap();
//! let builder = IrBuilder::new(schema, IrBuilderConfig::default());
//! let ir = builder.build(&document).unwrap();
//! assert_eq!(ir.operations[0].data_model_group.models[0].name, "Data");
//! ```
//!
//! ## Crate versioning
//!
//! The `apollo-codegen-ir` crate does **not** adhere to [Semantic Versioning](https://semver.org/).
//! Any version may have breaking API changes.

#![warn(
    rustdoc::broken_intra_doc_links,
    unreachable_pub,
    unreachable_patterns,
    unused,
    unused_qualifications,
    dead_code,
    while_true,
    unconditional_panic,
    clippy::all
)]

mod collector;
pub mod conditions;
pub mod config;
mod display_helpers;
pub mod error;
mod field_merger;
mod fragments;
pub mod ir;
pub mod model;
pub mod schema;
pub mod type_set;
mod used_types;
pub(crate) mod utils;

use apollo_compiler::ExecutableDocument;
use apollo_compiler::Name;
use apollo_compiler::Node;
use apollo_compiler::Schema;
use apollo_compiler::executable::Fragment;
use apollo_compiler::executable::Operation;
use apollo_compiler::validation::Valid;
use tracing::debug;

use crate::collector::SelectionCollector;
pub use crate::config::AddTypename;
pub use crate::config::IrBuilderConfig;
pub use crate::error::ErrorCode;
pub use crate::error::IrError;
use crate::error::SchemaElement;
use crate::fragments::FragmentRegistry;
pub use crate::ir::IntermediateRepresentation;
use crate::ir::IrNamedFragment;
use crate::ir::IrOperation;
use crate::ir::IrValue;
use crate::ir::IrVariable;
use crate::ir::operation_type_name;
use crate::model::FragmentInterfaces;
use crate::model::ModelGroupBuilder;
use crate::model::ModelRoot;
use crate::model::flatten;
use crate::schema::CodegenSchema;
use crate::used_types::UsedTypes;
use crate::utils::logging::snapshot;

const DATA_MODEL_NAME: &str = "Data";

/// Builds the intermediate representation of documents against one schema.
///
/// The builder holds no state between builds: every call to [`IrBuilder::build`] starts from
/// scratch and returns structurally identical output for identical input.
#[derive(Debug, Clone)]
pub struct IrBuilder {
    schema: CodegenSchema,
    config: IrBuilderConfig,
}

impl IrBuilder {
    pub fn new(schema: Valid<Schema>, config: IrBuilderConfig) -> Self {
        Self {
            schema: CodegenSchema::new(schema),
            config,
        }
    }

    pub fn schema(&self) -> &CodegenSchema {
        &self.schema
    }

    pub fn config(&self) -> &IrBuilderConfig {
        &self.config
    }

    /// Builds every operation and named fragment of `document`.
    ///
    /// The document is expected to be valid against the schema. Named fragments are built first,
    /// then operations, each in document order.
    ///
    /// # Errors
    /// Any error is fatal and no partial result is returned. Errors raised while building an
    /// operation or a fragment are wrapped in [`IrError::InDefinition`], naming it.
    #[cfg_attr(
        feature = "snapshot_tracing",
        tracing::instrument(level = "trace", skip_all, name = "IrBuilder::build")
    )]
    pub fn build(
        &self,
        document: &ExecutableDocument,
    ) -> Result<IntermediateRepresentation, IrError> {
        if document.operations.anonymous.is_some() {
            return Err(
                IrError::unknown(SchemaElement::OperationName, "<anonymous>")
                    .in_definition("anonymous operation"),
            );
        }

        let mut registry = FragmentRegistry::new(&self.schema, document, &self.config);
        registry.populate()?;

        let mut used_types = UsedTypes::default();
        let mut fragments = Vec::with_capacity(document.fragments.len());
        for fragment in document.fragments.values() {
            let fragment = self
                .build_fragment(&registry, fragment)
                .map_err(|error| error.in_definition(format_args!("fragment \"{}\"", fragment.name)))?;
            used_types.add_field(&self.schema, &fragment.data_field)?;
            fragments.push(fragment);
        }

        let mut operations = Vec::with_capacity(document.operations.named.len());
        for (name, operation) in &document.operations.named {
            let kind = operation_type_name(operation.operation_type);
            let operation = self
                .build_operation(&registry, document, name, operation)
                .map_err(|error| error.in_definition(format_args!("{kind} \"{name}\"")))?;
            used_types.add_field(&self.schema, &operation.data_field)?;
            for variable in &operation.variables {
                used_types.add_type(&self.schema, &variable.ty)?;
            }
            operations.push(operation);
        }

        let (input_objects, enums, custom_scalars) = used_types.into_ir(&self.schema)?;
        debug!(
            operations = operations.len(),
            fragments = fragments.len(),
            "built intermediate representation"
        );
        Ok(IntermediateRepresentation {
            operations,
            fragments,
            input_objects,
            enums,
            custom_scalars,
        })
    }

    fn build_operation(
        &self,
        registry: &FragmentRegistry<'_>,
        document: &ExecutableDocument,
        name: &Name,
        operation: &Node<Operation>,
    ) -> Result<IrOperation, IrError> {
        let root_type = self.schema.root_type(operation.operation_type)?;
        let collector = SelectionCollector::new(&self.schema, document, self.config.add_typename);
        let data_field =
            collector.collect_root(root_type, &operation.selection_set.selections, Vec::new())?;
        snapshot!(data_field, "collected operation fields");

        let data_model_group = ModelGroupBuilder::new(
            registry,
            ModelRoot::Operation(name.clone()),
            DATA_MODEL_NAME.to_string(),
            &data_field,
            false,
            Vec::new(),
        )
        .build()?;
        snapshot!(
            "IrModelGroup",
            data_model_group.to_string(),
            "built operation model group"
        );

        let variables = operation
            .variables
            .iter()
            .map(|variable| {
                Ok(IrVariable {
                    name: variable.name.clone(),
                    ty: self.schema.ir_type(&variable.ty)?,
                    default_value: variable
                        .default_value
                        .as_ref()
                        .map(|value| IrValue::from(&**value)),
                })
            })
            .collect::<Result<Vec<_>, IrError>>()?;

        let fragment_names: Vec<Name> = registry.used_fragments(&data_field)?.into_iter().collect();
        let source_with_fragments = std::iter::once(operation.serialize().to_string())
            .chain(
                fragment_names
                    .iter()
                    .filter_map(|fragment_name| document.fragments.get(fragment_name))
                    .map(|fragment| fragment.serialize().to_string()),
            )
            .collect::<Vec<_>>()
            .join("\n");
        let flattened_models = self
            .config
            .flatten_models
            .then(|| flatten(&data_model_group));

        debug!(
            operation = %name,
            models = data_model_group.models.len(),
            fragments = fragment_names.len(),
            "built operation"
        );
        Ok(IrOperation {
            name: name.clone(),
            operation_type: operation.operation_type,
            variables,
            data_field,
            data_model_group,
            fragment_names,
            source_with_fragments,
            flattened_models,
        })
    }

    fn build_fragment(
        &self,
        registry: &FragmentRegistry<'_>,
        fragment: &Node<Fragment>,
    ) -> Result<IrNamedFragment, IrError> {
        let name = &fragment.name;
        let data_field = registry.data_field(name)?.clone();
        let interface_model_group = registry.interface_group(name)?.clone();
        let implementation_model_group = registry.implementation_group(name).cloned();
        let fragment_names = registry.used_fragments(&data_field)?.into_iter().collect();
        let flattened_models = self.config.flatten_models.then(|| {
            flatten(
                implementation_model_group
                    .as_ref()
                    .unwrap_or(&interface_model_group),
            )
        });
        Ok(IrNamedFragment {
            name: name.clone(),
            type_condition: fragment.type_condition().clone(),
            data_field,
            interface_model_group,
            implementation_model_group,
            fragment_names,
            source: fragment.serialize().to_string(),
            flattened_models,
        })
    }
}
