//! Turns the selection set of a field into one field set per shape.
//!
//! Selections are first flattened: every field selected beneath the field, through any number of
//! inline fragments and fragment spreads, is recorded with the type conditions and the
//! `@skip`/`@include` conditions along its path. The shapes of the field follow from the type
//! conditions met on the way. Each shape then receives the fields whose path applies to it, merged
//! by response name, and every composite field is expanded the same way, recursively.

use apollo_compiler::ExecutableDocument;
use apollo_compiler::Name;
use apollo_compiler::ast::Type;
use apollo_compiler::executable;
use apollo_compiler::executable::Selection;
use apollo_compiler::name;
use indexmap::IndexSet;
use tracing::trace;

use crate::conditions::BooleanExpression;
use crate::config::AddTypename;
use crate::error::IrError;
use crate::error::SchemaElement;
use crate::field_merger;
use crate::field_merger::ChildSelection;
use crate::field_merger::FieldDeclaration;
use crate::field_merger::MergedField;
use crate::ir::FieldInfo;
use crate::ir::IrArgument;
use crate::ir::IrField;
use crate::ir::IrFieldSet;
use crate::ir::IrType;
use crate::schema::CodegenSchema;
use crate::schema::deprecation_reason;
use crate::type_set::PossibleTypes;
use crate::type_set::Shape;
use crate::type_set::TypeSet;
use crate::type_set::compute_shapes;
use crate::type_set::implements;
use crate::type_set::possible_types_of;
use crate::type_set::sort_shapes;
use crate::utils::logging::snapshot;

const TYPENAME_FIELD: Name = name!("__typename");

pub(crate) struct SelectionCollector<'doc> {
    schema: &'doc CodegenSchema,
    document: &'doc ExecutableDocument,
    add_typename: AddTypename,
}

/// Where a selection sits beneath the field being expanded.
#[derive(Debug, Clone)]
struct Scope {
    /// The field's raw type and every type condition on the way.
    type_set: TypeSet,
    /// The innermost type condition.
    parent_type: Name,
    condition: BooleanExpression,
}

impl Scope {
    fn root(raw_type: &Name) -> Self {
        Self {
            type_set: TypeSet::from([raw_type.clone()]),
            parent_type: raw_type.clone(),
            condition: BooleanExpression::True,
        }
    }

    /// A type condition that every possible type of the field satisfies adds nothing to the
    /// type set.
    fn nested(
        &self,
        type_condition: Name,
        covers_field: bool,
        condition: BooleanExpression,
    ) -> Self {
        let mut type_set = self.type_set.clone();
        if !covers_field {
            type_set.insert(type_condition.clone());
        }
        Self {
            type_set,
            parent_type: type_condition,
            condition: self.condition.clone().and(condition),
        }
    }
}

struct FlatField<'doc> {
    scope: Scope,
    field: &'doc executable::Field,
    fragment_path: Vec<Name>,
}

struct FlatSpread {
    /// The scope's type set, including the fragment's own type condition.
    type_set: TypeSet,
    fragment_name: Name,
}

/// The selections of one field, with fragments expanded.
#[derive(Default)]
struct FlatSelections<'doc> {
    /// The possible types of the field itself.
    field_types: PossibleTypes,
    /// Type conditions that narrow the field's possible types.
    type_conditions: IndexSet<Name>,
    /// The type sets of every inline fragment and fragment spread.
    declared_type_sets: IndexSet<TypeSet>,
    fields: Vec<FlatField<'doc>>,
    /// Spreads that are not nested in another named fragment.
    direct_spreads: Vec<FlatSpread>,
    /// Fragments already expanded, with the type set and condition they were expanded under.
    expanded_spreads: IndexSet<(Name, TypeSet, BooleanExpression)>,
}

impl<'doc> SelectionCollector<'doc> {
    pub(crate) fn new(
        schema: &'doc CodegenSchema,
        document: &'doc ExecutableDocument,
        add_typename: AddTypename,
    ) -> Self {
        Self {
            schema,
            document,
            add_typename,
        }
    }

    /// Expands the root selection set of an operation or a named fragment into its `data` field.
    ///
    /// `fragment_path` lists the named fragments being expanded already, so a fragment is built
    /// with its own name in it.
    pub(crate) fn collect_root(
        &self,
        raw_type: &Name,
        selections: &'doc [Selection],
        fragment_path: Vec<Name>,
    ) -> Result<IrField, IrError> {
        let info = FieldInfo {
            name: name!("data"),
            alias: None,
            arguments: Vec::new(),
            ty: self.schema.ir_type(&Type::NonNullNamed(raw_type.clone()))?,
            description: None,
            deprecation_reason: None,
        };
        let selections = selections
            .iter()
            .map(|selection| ChildSelection::new(selection, fragment_path.clone()))
            .collect();
        self.build_field(MergedField {
            info,
            condition: BooleanExpression::True,
            selections,
        })
    }

    fn build_field(&self, merged: MergedField<'doc>) -> Result<IrField, IrError> {
        let MergedField {
            info,
            condition,
            selections,
        } = merged;
        if !self.schema.is_composite(info.raw_type_name()) {
            return Ok(IrField {
                info,
                condition,
                field_sets: Vec::new(),
                fragments: IndexSet::default(),
            });
        }

        let raw_type = info.raw_type_name().clone();
        let flat = self.flatten(&raw_type, &selections)?;
        let shapes = self.shapes(&raw_type, &flat)?;
        trace!(
            field = %info.response_name(),
            shapes = shapes.len(),
            "collected selections"
        );
        snapshot!(shapes, "computed shapes");

        let is_polymorphic = shapes.len() > 1 || self.schema.is_abstract(&raw_type);
        let add_typename = self.add_typename.applies(is_polymorphic);
        let field_sets = shapes
            .into_iter()
            .map(|shape| self.build_field_set(shape, &flat, add_typename))
            .collect::<Result<Vec<_>, _>>()?;
        let fragments = flat
            .direct_spreads
            .iter()
            .map(|spread| spread.fragment_name.clone())
            .collect();
        Ok(IrField {
            info,
            condition,
            field_sets,
            fragments,
        })
    }

    fn flatten(
        &self,
        raw_type: &Name,
        selections: &[ChildSelection<'doc>],
    ) -> Result<FlatSelections<'doc>, IrError> {
        let mut flat = FlatSelections {
            field_types: self.schema.possible_runtime_types(raw_type)?,
            ..Default::default()
        };
        let root = Scope::root(raw_type);
        for child in selections {
            let mut fragment_path = child.fragment_path.clone();
            let depth = fragment_path.len();
            self.flatten_selection(child.selection, &root, &mut fragment_path, depth, &mut flat)?;
        }
        Ok(flat)
    }

    /// `direct_depth` is the length of the fragment path at the field itself: spreads found at
    /// that depth are not nested in another named fragment.
    fn flatten_selection(
        &self,
        selection: &'doc Selection,
        scope: &Scope,
        fragment_path: &mut Vec<Name>,
        direct_depth: usize,
        flat: &mut FlatSelections<'doc>,
    ) -> Result<(), IrError> {
        match selection {
            Selection::Field(field) => {
                let condition = BooleanExpression::from_directives(
                    &field.directives,
                    field.response_key().as_str(),
                )?;
                flat.fields.push(FlatField {
                    scope: Scope {
                        condition: scope.condition.clone().and(condition),
                        ..scope.clone()
                    },
                    field,
                    fragment_path: fragment_path.clone(),
                });
            }
            Selection::InlineFragment(inline) => {
                let type_condition = inline
                    .type_condition
                    .clone()
                    .unwrap_or_else(|| scope.parent_type.clone());
                let condition = BooleanExpression::from_directives(
                    &inline.directives,
                    &format!("... on {type_condition}"),
                )?;
                let Some(scope) = self.enter(scope, type_condition, condition, flat)? else {
                    return Ok(());
                };
                for selection in &inline.selection_set.selections {
                    self.flatten_selection(selection, &scope, fragment_path, direct_depth, flat)?;
                }
            }
            Selection::FragmentSpread(spread) => {
                let fragment_name = &spread.fragment_name;
                let fragment = self
                    .document
                    .fragments
                    .get(fragment_name)
                    .ok_or_else(|| IrError::unknown(SchemaElement::Fragment, fragment_name.as_str()))?;
                if fragment_path.contains(fragment_name) {
                    let mut path = fragment_path.clone();
                    path.push(fragment_name.clone());
                    return Err(IrError::FragmentCycle {
                        fragment: fragment_name.clone(),
                        path,
                    });
                }
                let condition = BooleanExpression::from_directives(
                    &spread.directives,
                    &format!("...{fragment_name}"),
                )?;
                let type_condition = fragment.type_condition().clone();
                let Some(scope) = self.enter(scope, type_condition, condition, flat)? else {
                    return Ok(());
                };
                if fragment_path.len() == direct_depth {
                    flat.direct_spreads.push(FlatSpread {
                        type_set: scope.type_set.clone(),
                        fragment_name: fragment_name.clone(),
                    });
                }
                // Fragments reached again through another path select the same fields.
                let expansion = (
                    fragment_name.clone(),
                    scope.type_set.clone(),
                    scope.condition.clone(),
                );
                if !flat.expanded_spreads.insert(expansion) {
                    trace!(fragment = %fragment_name, "fragment already expanded");
                    return Ok(());
                }
                fragment_path.push(fragment_name.clone());
                for selection in &fragment.selection_set.selections {
                    self.flatten_selection(selection, &scope, fragment_path, direct_depth, flat)?;
                }
                fragment_path.pop();
            }
        }
        Ok(())
    }

    /// Enters an inline fragment or a fragment spread. Returns `None` when it can never be
    /// selected.
    fn enter(
        &self,
        scope: &Scope,
        type_condition: Name,
        condition: BooleanExpression,
        flat: &mut FlatSelections<'doc>,
    ) -> Result<Option<Scope>, IrError> {
        let covers_field = self
            .schema
            .possible_runtime_types(&type_condition)?
            .is_superset(&flat.field_types);
        let scope = scope.nested(type_condition.clone(), covers_field, condition);
        if scope.condition.is_false() {
            return Ok(None);
        }
        if !covers_field {
            flat.type_conditions.insert(type_condition);
        }
        flat.declared_type_sets.insert(scope.type_set.clone());
        Ok(Some(scope))
    }

    /// The shapes derived from the possible types, plus the type sets declared in the document
    /// that are not one of them but can still match some object.
    ///
    /// Every object matching a declared type set belongs to a more specific shape, so a declared
    /// shape has no possible types of its own.
    fn shapes(&self, raw_type: &Name, flat: &FlatSelections<'doc>) -> Result<Vec<Shape>, IrError> {
        let mut shapes = compute_shapes(self.schema, raw_type, &flat.type_conditions)?;
        for type_set in &flat.declared_type_sets {
            if shapes.iter().any(|shape| &shape.type_set == type_set) {
                continue;
            }
            if possible_types_of(self.schema, raw_type, type_set)?.is_empty() {
                continue;
            }
            shapes.push(Shape {
                type_set: type_set.clone(),
                possible_types: PossibleTypes::new(),
            });
        }
        sort_shapes(&mut shapes);
        Ok(shapes)
    }

    fn build_field_set(
        &self,
        shape: Shape,
        flat: &FlatSelections<'doc>,
        add_typename: bool,
    ) -> Result<IrFieldSet, IrError> {
        let declarations = flat
            .fields
            .iter()
            .filter(|field| implements(&shape.type_set, &field.scope.type_set))
            .map(|field| self.declaration(field))
            .collect::<Result<Vec<_>, _>>()?;
        let merged = field_merger::merge(declarations)?;

        let mut fields = Vec::with_capacity(merged.len() + 1);
        if add_typename
            && !merged
                .iter()
                .any(|field| field.info.response_name() == &TYPENAME_FIELD)
        {
            fields.push(typename_field());
        }
        for field in merged {
            if field.condition.is_false() {
                continue;
            }
            fields.push(self.build_field(field)?);
        }

        let fragments = flat
            .direct_spreads
            .iter()
            .filter(|spread| implements(&shape.type_set, &spread.type_set))
            .map(|spread| spread.fragment_name.clone())
            .collect();
        Ok(IrFieldSet {
            type_set: shape.type_set,
            possible_types: shape.possible_types,
            fields,
            fragments,
        })
    }

    fn declaration(&self, flat: &FlatField<'doc>) -> Result<FieldDeclaration<'doc>, IrError> {
        let selections = flat
            .field
            .selection_set
            .selections
            .iter()
            .map(|selection| ChildSelection::new(selection, flat.fragment_path.clone()))
            .collect();
        Ok(FieldDeclaration {
            info: self.field_info(flat.field, &flat.scope.parent_type)?,
            condition: flat.scope.condition.clone(),
            selections,
        })
    }

    fn field_info(&self, field: &executable::Field, parent_type: &Name) -> Result<FieldInfo, IrError> {
        let definition = &field.definition;
        let mut arguments = field
            .arguments
            .iter()
            .map(|argument| {
                let argument_definition = definition
                    .arguments
                    .iter()
                    .find(|candidate| candidate.name == argument.name)
                    .ok_or_else(|| IrError::SchemaResolution {
                        element: SchemaElement::Argument,
                        name: format!("{}({}:)", field.name, argument.name),
                        parent_type: Some(parent_type.clone()),
                    })?;
                Ok(IrArgument {
                    name: argument.name.clone(),
                    value: (&*argument.value).into(),
                    ty: self.schema.ir_type(&argument_definition.ty)?,
                })
            })
            .collect::<Result<Vec<_>, IrError>>()?;
        arguments.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(FieldInfo {
            name: field.name.clone(),
            alias: field.alias.clone(),
            arguments,
            ty: self.schema.ir_type(&definition.ty)?,
            description: definition
                .description
                .as_ref()
                .map(|description| description.to_string()),
            deprecation_reason: deprecation_reason(&definition.directives),
        })
    }
}

fn typename_field() -> IrField {
    IrField {
        info: FieldInfo {
            name: TYPENAME_FIELD,
            alias: None,
            arguments: Vec::new(),
            ty: IrType::NonNull(Box::new(IrType::Scalar(name!("String")))),
            description: None,
            deprecation_reason: None,
        },
        condition: BooleanExpression::True,
        field_sets: Vec::new(),
        fragments: IndexSet::default(),
    }
}
