//! Named fragments, built once per document before any operation.
//!
//! A fragment spread somewhere mixes the fragment's interface models into the models of the
//! spreading field, so fragment interfaces are needed while building other fragments and
//! operations. They are built on demand, memoized by fragment name and pass, and only read once
//! the registry is populated.

use std::collections::BTreeSet;

use apollo_compiler::ExecutableDocument;
use apollo_compiler::Name;
use indexmap::IndexMap;
use tracing::debug;

use crate::collector::SelectionCollector;
use crate::config::IrBuilderConfig;
use crate::error::IrError;
use crate::error::SchemaElement;
use crate::internal_error;
use crate::ir::IrField;
use crate::model::FragmentInterfaces;
use crate::model::IrModelGroup;
use crate::model::ModelGroupBuilder;
use crate::model::ModelRoot;
use crate::schema::CodegenSchema;
use crate::utils::logging::snapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum FragmentPass {
    Interface,
    Implementation,
}

#[derive(Debug)]
enum Slot {
    InConstruction,
    Built(IrModelGroup),
}

pub(crate) struct FragmentRegistry<'doc> {
    schema: &'doc CodegenSchema,
    document: &'doc ExecutableDocument,
    config: &'doc IrBuilderConfig,
    data_fields: IndexMap<Name, IrField>,
    groups: IndexMap<(Name, FragmentPass), Slot>,
}

impl<'doc> FragmentRegistry<'doc> {
    pub(crate) fn new(
        schema: &'doc CodegenSchema,
        document: &'doc ExecutableDocument,
        config: &'doc IrBuilderConfig,
    ) -> Self {
        Self {
            schema,
            document,
            config,
            data_fields: IndexMap::default(),
            groups: IndexMap::default(),
        }
    }

    /// Builds every fragment of the document, in document order.
    #[cfg_attr(
        feature = "snapshot_tracing",
        tracing::instrument(level = "trace", skip_all, name = "FragmentRegistry::populate")
    )]
    pub(crate) fn populate(&mut self) -> Result<(), IrError> {
        let document = self.document;
        for fragment_name in document.fragments.keys() {
            self.ensure(fragment_name, FragmentPass::Interface)?;
            if self.config.generate_fragment_implementations {
                self.ensure(fragment_name, FragmentPass::Implementation)?;
            }
        }
        Ok(())
    }

    pub(crate) fn data_field(&self, fragment_name: &Name) -> Result<&IrField, IrError> {
        self.data_fields
            .get(fragment_name)
            .ok_or_else(|| internal_error!("Fragment \"{fragment_name}\" is not built"))
    }

    pub(crate) fn implementation_group(&self, fragment_name: &Name) -> Option<&IrModelGroup> {
        match self
            .groups
            .get(&(fragment_name.clone(), FragmentPass::Implementation))
        {
            Some(Slot::Built(group)) => Some(group),
            _ => None,
        }
    }

    /// Every fragment spread beneath `field`, directly or through other fragments, sorted by
    /// name.
    pub(crate) fn used_fragments(&self, field: &IrField) -> Result<BTreeSet<Name>, IrError> {
        let mut used = BTreeSet::new();
        let mut pending: Vec<Name> = spread_fragments(field).into_iter().collect();
        while let Some(fragment_name) = pending.pop() {
            if used.insert(fragment_name.clone()) {
                pending.extend(spread_fragments(self.data_field(&fragment_name)?));
            }
        }
        Ok(used)
    }

    fn ensure(&mut self, fragment_name: &Name, pass: FragmentPass) -> Result<(), IrError> {
        let key = (fragment_name.clone(), pass);
        match self.groups.get(&key) {
            Some(Slot::Built(_)) => return Ok(()),
            Some(Slot::InConstruction) => {
                let mut path: Vec<Name> = self
                    .groups
                    .iter()
                    .filter(|((_, pass), slot)| {
                        *pass == FragmentPass::Interface && matches!(slot, Slot::InConstruction)
                    })
                    .map(|((name, _), _)| name.clone())
                    .collect();
                path.push(fragment_name.clone());
                return Err(IrError::FragmentCycle {
                    fragment: fragment_name.clone(),
                    path,
                });
            }
            None => {}
        }

        self.groups.insert(key.clone(), Slot::InConstruction);
        match self.build(fragment_name, pass) {
            Ok(group) => {
                debug!(fragment = %fragment_name, ?pass, models = group.models.len(), "built fragment");
                snapshot!("IrModelGroup", group.to_string(), "built fragment model group");
                self.groups.insert(key, Slot::Built(group));
                Ok(())
            }
            Err(error) => {
                self.groups.shift_remove(&key);
                Err(error.in_definition(format_args!("fragment \"{fragment_name}\"")))
            }
        }
    }

    fn build(&mut self, fragment_name: &Name, pass: FragmentPass) -> Result<IrModelGroup, IrError> {
        let data_field = self.collect(fragment_name)?;
        for spread in spread_fragments(&data_field) {
            self.ensure(&spread, FragmentPass::Interface)?;
        }
        let (root, interface_mode, super_groups) = match pass {
            FragmentPass::Interface => (
                ModelRoot::FragmentInterface(fragment_name.clone()),
                true,
                Vec::new(),
            ),
            FragmentPass::Implementation => {
                self.ensure(fragment_name, FragmentPass::Interface)?;
                (
                    ModelRoot::FragmentImplementation(fragment_name.clone()),
                    false,
                    vec![self.interface_group(fragment_name)?.clone()],
                )
            }
        };
        ModelGroupBuilder::new(
            &*self,
            root,
            fragment_name.to_string(),
            &data_field,
            interface_mode,
            super_groups,
        )
        .build()
    }

    fn collect(&mut self, fragment_name: &Name) -> Result<IrField, IrError> {
        if let Some(data_field) = self.data_fields.get(fragment_name) {
            return Ok(data_field.clone());
        }
        let fragment = self
            .document
            .fragments
            .get(fragment_name)
            .ok_or_else(|| IrError::unknown(SchemaElement::Fragment, fragment_name.as_str()))?;
        let collector =
            SelectionCollector::new(self.schema, self.document, self.config.add_typename);
        let data_field = collector.collect_root(
            fragment.type_condition(),
            &fragment.selection_set.selections,
            vec![fragment_name.clone()],
        )?;
        self.data_fields
            .insert(fragment_name.clone(), data_field.clone());
        Ok(data_field)
    }
}

impl FragmentInterfaces for FragmentRegistry<'_> {
    fn interface_group(&self, fragment_name: &Name) -> Result<&IrModelGroup, IrError> {
        match self
            .groups
            .get(&(fragment_name.clone(), FragmentPass::Interface))
        {
            Some(Slot::Built(group)) => Ok(group),
            Some(Slot::InConstruction) => Err(IrError::FragmentCycle {
                fragment: fragment_name.clone(),
                path: vec![fragment_name.clone(), fragment_name.clone()],
            }),
            None => Err(internal_error!(
                "Fragment \"{fragment_name}\" is used before it is built"
            )),
        }
    }
}

/// The fragments spread anywhere in `field`'s tree, not following the spreads.
fn spread_fragments(field: &IrField) -> BTreeSet<Name> {
    let mut spreads = BTreeSet::new();
    collect_spreads(field, &mut spreads);
    spreads
}

fn collect_spreads(field: &IrField, spreads: &mut BTreeSet<Name>) {
    spreads.extend(field.fragments.iter().cloned());
    for field_set in &field.field_sets {
        spreads.extend(field_set.fragments.iter().cloned());
        for child in &field_set.fields {
            collect_spreads(child, spreads);
        }
    }
}
