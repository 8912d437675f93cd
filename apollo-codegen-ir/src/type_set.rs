//! Type sets and the shapes of polymorphic fields.
//!
//! A type set is the set of type conditions that hold for a value; the more conditions, the more
//! specific. For a given field, every concrete type it can return satisfies some subset of the
//! type conditions selected beneath the field, and concrete types satisfying the same subset are
//! indistinguishable for that selection: they form one shape.

use std::collections::BTreeSet;

use apollo_compiler::Name;
use indexmap::IndexMap;
use indexmap::IndexSet;
use serde::Serialize;

use crate::error::IrError;
use crate::schema::CodegenSchema;

/// A set of type condition names. The field's own raw type is always part of it.
pub type TypeSet = BTreeSet<Name>;

/// A set of concrete object type names.
pub type PossibleTypes = BTreeSet<Name>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Shape {
    pub type_set: TypeSet,
    pub possible_types: PossibleTypes,
}

/// Whether a value of type set `a` is always also a value of type set `b`.
pub(crate) fn implements(a: &TypeSet, b: &TypeSet) -> bool {
    a.is_superset(b)
}

pub(crate) fn strictly_implements(a: &TypeSet, b: &TypeSet) -> bool {
    a.len() > b.len() && a.is_superset(b)
}

/// Which end of the subset relation [`reduction`] keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Keep {
    /// Elements that are not a strict superset of another element.
    Smallest,
    /// Elements that are not a strict subset of another element.
    Largest,
}

/// Keeps only the extremal sets of `sets`, in their original order.
///
/// With type sets, [`Keep::Largest`] keeps the most specific ones and [`Keep::Smallest`] the most
/// general ones. With possible types it is the other way around.
pub(crate) fn reduction<'a, I>(sets: I, keep: Keep) -> Vec<&'a BTreeSet<Name>>
where
    I: IntoIterator<Item = &'a BTreeSet<Name>>,
{
    let sets: Vec<&BTreeSet<Name>> = sets.into_iter().collect();
    let mut reduced: Vec<&BTreeSet<Name>> = Vec::new();
    for &set in &sets {
        let dominated = sets.iter().any(|other| {
            other.len() != set.len()
                && match keep {
                    Keep::Smallest => set.is_superset(other),
                    Keep::Largest => set.is_subset(other),
                }
        });
        if !dominated && !reduced.contains(&set) {
            reduced.push(set);
        }
    }
    reduced
}

/// Computes the shapes of a field.
///
/// `type_conditions` are all the type conditions selected anywhere beneath the field, including
/// through fragments. The result always starts with the base shape (the raw type alone) and then
/// lists one shape per distinct set of conditions satisfied by some possible type, ordered from
/// the most general to the most specific.
///
/// The base shape's possible types are every possible type of the field. Any other shape has the
/// possible types satisfying exactly its conditions and no other, so two shapes never overlap
/// unless one of them is the base. [`covered_types`] gives the types a shape applies to.
pub(crate) fn compute_shapes(
    schema: &CodegenSchema,
    raw_type: &Name,
    type_conditions: &IndexSet<Name>,
) -> Result<Vec<Shape>, IrError> {
    let field_types = schema.possible_runtime_types(raw_type)?;

    let mut condition_types: IndexMap<&Name, PossibleTypes> = IndexMap::default();
    for condition in type_conditions {
        if condition == raw_type {
            continue;
        }
        let types = schema.possible_runtime_types(condition)?;
        condition_types.insert(
            condition,
            types.intersection(&field_types).cloned().collect(),
        );
    }

    // Concrete types grouped by the conditions they satisfy
    let mut groups: IndexMap<TypeSet, PossibleTypes> = IndexMap::default();
    for concrete_type in &field_types {
        let mut matched_supers = TypeSet::from([raw_type.clone()]);
        for (condition, types) in &condition_types {
            if types.contains(concrete_type) {
                matched_supers.insert((*condition).clone());
            }
        }
        groups
            .entry(matched_supers)
            .or_default()
            .insert(concrete_type.clone());
    }
    groups.entry(TypeSet::from([raw_type.clone()])).or_default();

    let mut shapes: Vec<Shape> = groups
        .into_iter()
        .map(|(type_set, possible_types)| {
            let possible_types = if type_set.len() == 1 {
                field_types.clone()
            } else {
                possible_types
            };
            Shape {
                type_set,
                possible_types,
            }
        })
        .collect();
    sort_shapes(&mut shapes);
    Ok(shapes)
}

/// Every possible type a value of `type_set` can have: the possible types of `type_set` and of
/// all the shapes more specific than it.
pub(crate) fn covered_types(type_set: &TypeSet, shapes: &[Shape]) -> PossibleTypes {
    shapes
        .iter()
        .filter(|shape| implements(&shape.type_set, type_set))
        .flat_map(|shape| shape.possible_types.iter().cloned())
        .collect()
}

/// Possible types of a type set declared by the user, for a field of type `raw_type`.
pub(crate) fn possible_types_of(
    schema: &CodegenSchema,
    raw_type: &Name,
    type_set: &TypeSet,
) -> Result<PossibleTypes, IrError> {
    let mut possible_types = schema.possible_runtime_types(raw_type)?;
    for condition in type_set {
        let types = schema.possible_runtime_types(condition)?;
        possible_types.retain(|name| types.contains(name));
    }
    Ok(possible_types)
}

/// Orders shapes from the most general to the most specific, then by name.
pub(crate) fn sort_shapes(shapes: &mut [Shape]) {
    shapes.sort_by(|a, b| {
        a.type_set
            .len()
            .cmp(&b.type_set.len())
            .then_with(|| a.type_set.cmp(&b.type_set))
    });
}

/// Possible types of `shape` not covered by any strictly more specific shape of `shapes`.
pub(crate) fn own_possible_types(shape: &Shape, shapes: &[Shape]) -> PossibleTypes {
    let mut own = shape.possible_types.clone();
    for other in shapes {
        if strictly_implements(&other.type_set, &shape.type_set) {
            own.retain(|name| !other.possible_types.contains(name));
        }
    }
    own
}

#[cfg(test)]
mod tests {
    use apollo_compiler::Schema;
    use pretty_assertions::assert_eq;

    use super::*;

    const SDL: &str = r#"
        type Query { animal: Animal, pet: Pet }
        interface Animal { name: String }
        interface Pet { owner: String }
        type Dog implements Animal & Pet { name: String, owner: String }
        type Cat implements Animal & Pet { name: String, owner: String }
        type Lion implements Animal { name: String }
        type Fish implements Pet { owner: String }
        union Everything = Dog | Cat | Lion | Fish
    "#;

    fn schema() -> CodegenSchema {
        CodegenSchema::new(Schema::parse_and_validate(SDL, "schema.graphql").unwrap())
    }

    fn set(names: &[&str]) -> BTreeSet<Name> {
        names.iter().map(|name| Name::new(name).unwrap()).collect()
    }

    fn conditions(names: &[&str]) -> IndexSet<Name> {
        names.iter().map(|name| Name::new(name).unwrap()).collect()
    }

    fn describe(shapes: &[Shape]) -> Vec<(Vec<&str>, Vec<&str>)> {
        shapes
            .iter()
            .map(|shape| {
                (
                    shape.type_set.iter().map(|name| name.as_str()).collect(),
                    shape.possible_types.iter().map(|name| name.as_str()).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn monomorphic_field_has_a_single_shape() {
        let shapes = compute_shapes(&schema(), &Name::new("Dog").unwrap(), &conditions(&[]))
            .unwrap();
        assert_eq!(describe(&shapes), vec![(vec!["Dog"], vec!["Dog"])]);
    }

    #[test]
    fn one_shape_per_object_condition() {
        let shapes = compute_shapes(
            &schema(),
            &Name::new("Animal").unwrap(),
            &conditions(&["Dog", "Cat"]),
        )
        .unwrap();
        assert_eq!(
            describe(&shapes),
            vec![
                (vec!["Animal"], vec!["Cat", "Dog", "Lion"]),
                (vec!["Animal", "Cat"], vec!["Cat"]),
                (vec!["Animal", "Dog"], vec!["Dog"]),
            ]
        );
    }

    #[test]
    fn interface_conditions_group_concrete_types() {
        let shapes = compute_shapes(
            &schema(),
            &Name::new("Animal").unwrap(),
            &conditions(&["Pet", "Dog"]),
        )
        .unwrap();
        assert_eq!(
            describe(&shapes),
            vec![
                (vec!["Animal"], vec!["Cat", "Dog", "Lion"]),
                (vec!["Animal", "Pet"], vec!["Cat"]),
                (vec!["Animal", "Dog", "Pet"], vec!["Dog"]),
            ]
        );
        assert_eq!(
            covered_types(&set(&["Animal", "Pet"]), &shapes),
            set(&["Cat", "Dog"])
        );
    }

    #[test]
    fn overlapping_interface_conditions_make_disjoint_shapes() {
        let shapes = compute_shapes(
            &schema(),
            &Name::new("Everything").unwrap(),
            &conditions(&["Animal", "Pet"]),
        )
        .unwrap();
        assert_eq!(
            describe(&shapes),
            vec![
                (vec!["Everything"], vec!["Cat", "Dog", "Fish", "Lion"]),
                (vec!["Animal", "Everything"], vec!["Lion"]),
                (vec!["Everything", "Pet"], vec!["Fish"]),
                (vec!["Animal", "Everything", "Pet"], vec!["Cat", "Dog"]),
            ]
        );
        assert_eq!(
            covered_types(&set(&["Everything", "Pet"]), &shapes),
            set(&["Cat", "Dog", "Fish"])
        );
        assert_eq!(own_possible_types(&shapes[0], &shapes), set(&[]));
    }

    #[test]
    fn conditions_outside_the_field_type_are_ignored() {
        let shapes = compute_shapes(
            &schema(),
            &Name::new("Pet").unwrap(),
            &conditions(&["Lion"]),
        )
        .unwrap();
        assert_eq!(
            describe(&shapes),
            vec![(vec!["Pet"], vec!["Cat", "Dog", "Fish"])]
        );
    }

    #[test]
    fn own_possible_types_exclude_narrower_shapes() {
        let shapes = compute_shapes(
            &schema(),
            &Name::new("Animal").unwrap(),
            &conditions(&["Dog"]),
        )
        .unwrap();
        assert_eq!(own_possible_types(&shapes[0], &shapes), set(&["Cat", "Lion"]));
        assert_eq!(own_possible_types(&shapes[1], &shapes), set(&["Dog"]));
    }

    #[test]
    fn reduction_keeps_extremal_sets() {
        let a = set(&["A"]);
        let ab = set(&["A", "B"]);
        let ac = set(&["A", "C"]);
        let abc = set(&["A", "B", "C"]);
        assert_eq!(reduction([&a, &ab, &ac, &abc], Keep::Smallest), vec![&a]);
        assert_eq!(reduction([&a, &ab, &ac, &abc], Keep::Largest), vec![&abc]);
        assert_eq!(reduction([&ab, &ac], Keep::Largest), vec![&ab, &ac]);
    }

    #[test]
    fn relations() {
        assert!(implements(&set(&["A", "B"]), &set(&["A"])));
        assert!(implements(&set(&["A"]), &set(&["A"])));
        assert!(!strictly_implements(&set(&["A"]), &set(&["A"])));
        assert!(!implements(&set(&["A"]), &set(&["A", "B"])));
    }

    #[test]
    fn possible_types_of_declared_type_sets() {
        let types = possible_types_of(
            &schema(),
            &Name::new("Animal").unwrap(),
            &set(&["Animal", "Pet"]),
        )
        .unwrap();
        assert_eq!(types, set(&["Cat", "Dog"]));
    }
}
