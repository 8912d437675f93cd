use apollo_compiler::Name;
use indexmap::IndexMap;

use super::IrAccessor;
use super::IrModel;
use super::IrModelGroup;
use super::IrProperty;
use super::ModelId;
use super::ModelRoot;
use super::naming::NameAllocator;
use super::naming::base_model_name;
use super::naming::other_model_name;
use super::naming::shape_model_name;
use crate::error::IrError;
use crate::internal_error;
use crate::ir::IrField;
use crate::ir::IrFieldSet;
use crate::type_set::Keep;
use crate::type_set::PossibleTypes;
use crate::type_set::Shape;
use crate::type_set::TypeSet;
use crate::type_set::covered_types;
use crate::type_set::own_possible_types;
use crate::type_set::reduction;
use crate::type_set::strictly_implements;

/// Where the builder finds the interface model groups of named fragments.
pub(crate) trait FragmentInterfaces {
    fn interface_group(&self, fragment_name: &Name) -> Result<&IrModelGroup, IrError>;
}

/// One model per shape and role: a shape can have both an interface model and a concrete "Other"
/// model.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ModelKey {
    type_set: TypeSet,
    is_interface: bool,
    is_other: bool,
}

#[derive(Debug)]
struct PlannedModel {
    id: ModelId,
    name: String,
    /// Index of the shape in the field's field sets.
    shape: usize,
    possible_types: PossibleTypes,
}

/// Builds the model group of one composite field, and recursively the groups of its composite
/// properties.
pub(crate) struct ModelGroupBuilder<'a> {
    fragments: &'a dyn FragmentInterfaces,
    root: ModelRoot,
    /// Path of the property holding the field, empty for a root field.
    prefix: Vec<String>,
    base_name: String,
    field: &'a IrField,
    /// Whether every model is an interface, as in a fragment's interface pass or beneath an
    /// interface model.
    interface_mode: bool,
    /// Groups whose models the models of this group implement: the same-named property groups of
    /// every model the parent model implements.
    super_groups: Vec<IrModelGroup>,
}

impl<'a> ModelGroupBuilder<'a> {
    pub(crate) fn new(
        fragments: &'a dyn FragmentInterfaces,
        root: ModelRoot,
        base_name: String,
        field: &'a IrField,
        interface_mode: bool,
        super_groups: Vec<IrModelGroup>,
    ) -> Self {
        Self {
            fragments,
            root,
            prefix: Vec::new(),
            base_name,
            field,
            interface_mode,
            super_groups,
        }
    }

    pub(crate) fn build(self) -> Result<IrModelGroup, IrError> {
        let plan = self.plan()?;
        let base_model_id = plan
            .iter()
            .find(|(key, _)| key.type_set.len() == 1 && !key.is_other)
            .map(|(_, planned)| planned.id.clone())
            .ok_or_else(|| {
                internal_error!(
                    "Field \"{}\" has no base shape",
                    self.field.response_name()
                )
            })?;

        // Supers are more general shapes, which come first in the plan
        let mut models: Vec<IrModel> = Vec::with_capacity(plan.len());
        for (key, planned) in &plan {
            let model = self.build_model(&plan, key, planned, &models)?;
            models.push(model);
        }
        crate::ensure!(
            models.iter().filter(|model| model.is_base).count() == 1,
            "Field \"{}\" must have exactly one base model",
            self.field.response_name()
        );
        Ok(IrModelGroup {
            base_model_id,
            models,
        })
    }

    /// Decides which models the field gets and names them, in shape order.
    fn plan(&self) -> Result<IndexMap<ModelKey, PlannedModel>, IrError> {
        let field_sets = &self.field.field_sets;
        if field_sets.is_empty() {
            crate::bail!(
                "Cannot build models for leaf field \"{}\"",
                self.field.response_name()
            );
        }
        let exact: Vec<Shape> = field_sets
            .iter()
            .map(|field_set| Shape {
                type_set: field_set.type_set.clone(),
                possible_types: field_set.possible_types.clone(),
            })
            .collect();
        // A model stands for every type its shape applies to, narrower shapes included
        let shapes: Vec<Shape> = exact
            .iter()
            .map(|shape| Shape {
                type_set: shape.type_set.clone(),
                possible_types: covered_types(&shape.type_set, &exact),
            })
            .collect();
        let raw_type = self.field.info.raw_type_name();

        let mut names = NameAllocator::default();
        let mut plan: IndexMap<ModelKey, PlannedModel> = IndexMap::default();
        for (index, shape) in shapes.iter().enumerate() {
            let shape_name = shape_model_name(&shape.type_set, raw_type, &self.base_name);
            let has_narrower = self.has_narrower_shape(&shape.type_set);
            let own_types = own_possible_types(shape, &shapes);
            let needs_fallback = !self.interface_mode && has_narrower && !own_types.is_empty();
            let mut add = |is_interface: bool, is_other: bool, name: String, possible_types| {
                let name = names.allocate(name);
                plan.insert(
                    ModelKey {
                        type_set: shape.type_set.clone(),
                        is_interface,
                        is_other,
                    },
                    PlannedModel {
                        id: self.model_id(&name),
                        name,
                        shape: index,
                        possible_types,
                    },
                );
            };
            add(
                self.interface_mode || has_narrower,
                false,
                shape_name.clone(),
                shape.possible_types.clone(),
            );
            if needs_fallback {
                add(false, true, other_model_name(&shape_name), own_types);
            }
        }
        Ok(plan)
    }

    fn model_id(&self, name: &str) -> ModelId {
        let mut path = self.prefix.clone();
        path.push(name.to_string());
        ModelId::new(self.root.clone(), path)
    }

    fn has_narrower_shape(&self, type_set: &TypeSet) -> bool {
        self.narrower_field_sets(type_set).next().is_some()
    }

    fn narrower_field_sets<'s>(
        &'s self,
        type_set: &'s TypeSet,
    ) -> impl Iterator<Item = &'a IrFieldSet> + 's {
        self.field
            .field_sets
            .iter()
            .filter(move |field_set| strictly_implements(&field_set.type_set, type_set))
    }

    fn build_model(
        &self,
        plan: &IndexMap<ModelKey, PlannedModel>,
        key: &ModelKey,
        planned: &PlannedModel,
        built: &[IrModel],
    ) -> Result<IrModel, IrError> {
        let field_set = self.field.field_sets.get(planned.shape).ok_or_else(|| {
            internal_error!("Model \"{}\" has no field set", planned.id)
        })?;
        let supers = self.supers(plan, key, planned, field_set, built)?;
        let implements: Vec<ModelId> = supers.iter().map(|model| model.id.clone()).collect();

        let mut properties = Vec::with_capacity(field_set.fields.len());
        for field in &field_set.fields {
            properties.push(self.build_property(field, &planned.id, key.is_interface, &supers)?);
        }

        let is_base = key.type_set.len() == 1 && !key.is_other;
        let mut accessors = Vec::new();
        if is_base {
            for fragment_name in &self.field.fragments {
                accessors.push(IrAccessor::Fragment {
                    fragment_name: fragment_name.clone(),
                    return_model_id: self
                        .fragments
                        .interface_group(fragment_name)?
                        .base_model_id
                        .clone(),
                });
            }
        }
        if key.is_interface {
            for narrower in self.narrower_field_sets(&key.type_set) {
                accessors.push(IrAccessor::Subtype {
                    type_set: narrower.type_set.clone(),
                    return_model_id: primary_model(plan, &narrower.type_set)?.id.clone(),
                });
            }
        }

        Ok(IrModel {
            id: planned.id.clone(),
            name: planned.name.clone(),
            type_set: key.type_set.clone(),
            possible_types: planned.possible_types.clone(),
            properties,
            accessors,
            implements,
            is_interface: key.is_interface,
            is_base,
            is_fallback: key.type_set.len() == 1 && key.is_other,
        })
    }

    /// The models a model implements, without duplicates: the immediately more general shapes of
    /// the field, then the matching models of the fragments spread on the shape, then the matching
    /// models inherited from the parent.
    fn supers<'m>(
        &'m self,
        plan: &IndexMap<ModelKey, PlannedModel>,
        key: &ModelKey,
        planned: &PlannedModel,
        field_set: &IrFieldSet,
        built: &'m [IrModel],
    ) -> Result<Vec<&'m IrModel>, IrError> {
        let mut supers: Vec<&IrModel> = Vec::new();
        if key.is_other {
            let interface_key = ModelKey {
                is_interface: true,
                is_other: false,
                ..key.clone()
            };
            let interface = plan.get(&interface_key).ok_or_else(|| {
                internal_error!("Fallback model of {:?} has no interface", key.type_set)
            })?;
            supers.push(find_built(built, &interface.id)?);
            return Ok(supers);
        }

        let general_type_sets = self
            .field
            .field_sets
            .iter()
            .map(|general| &general.type_set)
            .filter(|general| strictly_implements(&key.type_set, general));
        for general in reduction(general_type_sets, Keep::Largest) {
            supers.push(find_built(built, &primary_model(plan, general)?.id)?);
        }
        for fragment_name in &field_set.fragments {
            let group = self.fragments.interface_group(fragment_name)?;
            supers.extend(most_specific_matches(group, &planned.possible_types));
        }
        for group in &self.super_groups {
            supers.extend(most_specific_matches(group, &planned.possible_types));
        }

        let mut unique: Vec<&IrModel> = Vec::with_capacity(supers.len());
        for model in supers {
            if !unique.iter().any(|existing| existing.id == model.id) {
                unique.push(model);
            }
        }
        Ok(unique)
    }

    fn build_property(
        &self,
        field: &IrField,
        model_id: &ModelId,
        is_interface: bool,
        supers: &[&IrModel],
    ) -> Result<IrProperty, IrError> {
        let response_name = field.response_name();
        let inherited: Vec<_> = supers
            .iter()
            .filter_map(|model| model.property(response_name.as_str()))
            .collect();

        let model_group = if field.field_sets.is_empty() {
            None
        } else {
            let mut prefix = model_id.path.clone();
            prefix.push(response_name.to_string());
            let builder = ModelGroupBuilder {
                fragments: self.fragments,
                root: self.root.clone(),
                prefix,
                base_name: base_model_name(response_name.as_str(), field.info.ty.is_list()),
                field,
                interface_mode: is_interface,
                super_groups: inherited
                    .iter()
                    .filter_map(|property| property.model_group.clone())
                    .collect(),
            };
            Some(builder.build()?)
        };

        Ok(IrProperty {
            info: field.info.clone(),
            condition: field.condition.clone(),
            is_override: !inherited.is_empty(),
            model_group,
        })
    }
}

/// The model standing for a shape when downcasting to it: its interface if it has narrower
/// shapes, its concrete model otherwise.
fn primary_model<'p>(
    plan: &'p IndexMap<ModelKey, PlannedModel>,
    type_set: &TypeSet,
) -> Result<&'p PlannedModel, IrError> {
    plan.iter()
        .find(|(key, _)| &key.type_set == type_set && !key.is_other)
        .map(|(_, planned)| planned)
        .ok_or_else(|| internal_error!("No model planned for shape {type_set:?}"))
}

fn find_built<'m>(built: &'m [IrModel], id: &ModelId) -> Result<&'m IrModel, IrError> {
    built
        .iter()
        .find(|model| &model.id == id)
        .ok_or_else(|| internal_error!("Model \"{id}\" is used before it is built"))
}

/// The interface models of `group` that cover `possible_types` and are not implied by another
/// one: the ones with the fewest possible types, and among those the most specific shapes.
fn most_specific_matches<'g>(
    group: &'g IrModelGroup,
    possible_types: &PossibleTypes,
) -> Vec<&'g IrModel> {
    let candidates: Vec<&IrModel> = group
        .models
        .iter()
        .filter(|model| model.is_interface && model.possible_types.is_superset(possible_types))
        .collect();
    let smallest = reduction(
        candidates.iter().copied().map(|model| &model.possible_types),
        Keep::Smallest,
    );
    let closest: Vec<&IrModel> = candidates
        .into_iter()
        .filter(|model| smallest.contains(&&model.possible_types))
        .collect();
    let most_specific = reduction(
        closest.iter().copied().map(|model| &model.type_set),
        Keep::Largest,
    );
    closest
        .into_iter()
        .filter(|model| most_specific.contains(&&model.type_set))
        .collect()
}
