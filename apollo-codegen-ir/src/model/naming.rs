use apollo_compiler::Name;
use indexmap::IndexMap;
use indexmap::IndexSet;

use super::FlatModel;
use super::IrModelGroup;
use crate::type_set::TypeSet;

/// The name of the base model of a field: its response name, capitalized, and singularized when
/// the field is a list.
pub(crate) fn base_model_name(response_name: &str, is_list: bool) -> String {
    let name = if is_list {
        singularize(response_name)
    } else {
        response_name.to_string()
    };
    capitalize(&name)
}

/// The name of a shape's model: its type conditions, except the field's raw type, then the base
/// name.
pub(crate) fn shape_model_name(type_set: &TypeSet, raw_type: &Name, base_name: &str) -> String {
    let mut name: String = type_set
        .iter()
        .filter(|condition| *condition != raw_type)
        .map(|condition| capitalize(condition.as_str()))
        .collect();
    name.push_str(base_name);
    name
}

pub(crate) fn other_model_name(shape_name: &str) -> String {
    format!("Other{shape_name}")
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn singularize(name: &str) -> String {
    if let Some(stem) = name.strip_suffix("ies") {
        return format!("{stem}y");
    }
    match name.strip_suffix('s') {
        Some(stem) if !stem.ends_with('s') && !stem.ends_with('u') && !stem.is_empty() => {
            stem.to_string()
        }
        _ => name.to_string(),
    }
}

/// Hands out names, suffixing an incrementing integer to the ones already taken.
#[derive(Debug, Default)]
pub(crate) struct NameAllocator {
    taken: IndexSet<String>,
    next_suffix: IndexMap<String, usize>,
}

impl NameAllocator {
    pub(crate) fn allocate(&mut self, name: String) -> String {
        if self.taken.insert(name.clone()) {
            return name;
        }
        let suffix = self.next_suffix.entry(name.clone()).or_insert(2);
        loop {
            let candidate = format!("{name}{suffix}");
            *suffix += 1;
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}

/// Gives every model of a tree a name that is unique across the tree, visiting models depth
/// first in group order.
pub(crate) fn flatten(group: &IrModelGroup) -> Vec<FlatModel> {
    let mut names = NameAllocator::default();
    let mut flat = Vec::new();
    flatten_group(group, &mut names, &mut flat);
    flat
}

fn flatten_group(group: &IrModelGroup, names: &mut NameAllocator, flat: &mut Vec<FlatModel>) {
    for model in &group.models {
        flat.push(FlatModel {
            id: model.id.clone(),
            name: names.allocate(model.name.clone()),
        });
        for property in &model.properties {
            if let Some(group) = &property.model_group {
                flatten_group(group, names, flat);
            }
        }
    }
}
