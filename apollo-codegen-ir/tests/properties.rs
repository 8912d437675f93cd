//! Properties every build must satisfy, checked over a handful of documents.

use std::collections::BTreeSet;

use apollo_codegen_ir::IntermediateRepresentation;
use apollo_codegen_ir::ir::IrField;
use apollo_codegen_ir::model::IrModelGroup;
use pretty_assertions::assert_eq;
use rstest::rstest;

use crate::support::ANIMALS_SDL;
use crate::support::build;
use crate::support::composite_fields;
use crate::support::schema_possible_types;

const QUERIES: &[&str] = &[
    "query Q { animal { name } }",
    "query Q { animal { name ... on Dog { breed } ... on Cat { livesLeft } } }",
    "query Q { animal { ... on Pet { owner ... on Dog { breed } } } }",
    "query Q { animals { friends { ... on Pet { owner } } } pet { ... on Animal { name } } }",
    r#"query Q { search(term: "rex") { ... on Animal { name } ... on Pet { owner } ... on Fish { fins } } }"#,
    r#"
    query Q { search(term: "rex") { ...AnimalName } pet { ...AnimalName ...Owner } }
    fragment AnimalName on Animal { name friends { ...Owner } }
    fragment Owner on Pet { owner }
    "#,
    "query Q { creature { ... on Animal { name } ... on Pet { owner } } }",
];

fn every_field(ir: &IntermediateRepresentation) -> Vec<&IrField> {
    ir.operations
        .iter()
        .map(|operation| &operation.data_field)
        .chain(ir.fragments.iter().map(|fragment| &fragment.data_field))
        .flat_map(composite_fields)
        .collect()
}

fn every_group(group: &IrModelGroup) -> Vec<&IrModelGroup> {
    let mut groups = vec![group];
    for model in &group.models {
        for property in &model.properties {
            if let Some(nested) = &property.model_group {
                groups.extend(every_group(nested));
            }
        }
    }
    groups
}

fn strings<'a>(names: impl IntoIterator<Item = &'a apollo_compiler::Name>) -> BTreeSet<String> {
    names.into_iter().map(ToString::to_string).collect()
}

#[rstest]
fn shapes_cover_the_possible_types(#[values(0, 1, 2, 3, 4, 5, 6)] query: usize) {
    let ir = build(ANIMALS_SDL, QUERIES[query]).unwrap();
    for field in every_field(&ir) {
        let covered = strings(
            field
                .field_sets
                .iter()
                .flat_map(|field_set| &field_set.possible_types),
        );
        assert_eq!(
            covered,
            schema_possible_types(ANIMALS_SDL, field.info.raw_type_name().as_str()),
            "field {}",
            field.response_name()
        );
    }
}

#[rstest]
fn shapes_are_disjoint_or_nested(#[values(0, 1, 2, 3, 4, 5, 6)] query: usize) {
    let ir = build(ANIMALS_SDL, QUERIES[query]).unwrap();
    for field in every_field(&ir) {
        for a in &field.field_sets {
            for b in &field.field_sets {
                let a = &a.possible_types;
                let b = &b.possible_types;
                assert!(
                    a.is_disjoint(b) || a.is_subset(b) || b.is_subset(a),
                    "field {}: {a:?} and {b:?} overlap",
                    field.response_name()
                );
            }
        }
    }
}

#[rstest]
fn every_group_has_one_base_model(#[values(0, 1, 2, 3, 4, 5, 6)] query: usize) {
    let ir = build(ANIMALS_SDL, QUERIES[query]).unwrap();
    let roots = ir
        .operations
        .iter()
        .map(|operation| &operation.data_model_group)
        .chain(ir.fragments.iter().flat_map(|fragment| {
            std::iter::once(&fragment.interface_model_group)
                .chain(fragment.implementation_model_group.as_ref())
        }));
    for root in roots {
        for group in every_group(root) {
            let bases: Vec<_> = group.models.iter().filter(|model| model.is_base).collect();
            assert_eq!(bases.len(), 1, "{}", group.base_model_id);
            assert_eq!(bases[0].id, group.base_model_id);
            assert_eq!(bases[0].type_set.len(), 1);
        }
    }
}

#[rstest]
fn builds_are_deterministic(#[values(0, 1, 2, 3, 4, 5, 6)] query: usize) {
    let first = build(ANIMALS_SDL, QUERIES[query]).unwrap();
    let second = build(ANIMALS_SDL, QUERIES[query]).unwrap();
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}
