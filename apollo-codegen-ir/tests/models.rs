use std::collections::BTreeSet;

use apollo_codegen_ir::IrBuilderConfig;
use apollo_codegen_ir::model::IrAccessor;
use apollo_codegen_ir::model::IrModelGroup;
use insta::assert_snapshot;
use pretty_assertions::assert_eq;

use crate::support::ANIMALS_SDL;
use crate::support::build;
use crate::support::build_with;

const PETS_SDL: &str = r#"
    type Query { pet: Pet }
    interface Animal { name: String! }
    type Dog implements Animal { name: String!, breed: String }
    type Cat implements Animal { name: String! }
    type Fish { fins: Int }
    union Pet = Dog | Cat | Fish
"#;

fn pet_group(group: &IrModelGroup) -> &IrModelGroup {
    group
        .base_model()
        .unwrap()
        .property("pet")
        .unwrap()
        .model_group
        .as_ref()
        .unwrap()
}

#[test]
fn fragment_on_an_interface_inside_a_union() {
    let ir = build(
        PETS_SDL,
        r#"
        query PetQuery { pet { ...AnimalName } }
        fragment AnimalName on Animal { name }
        "#,
    )
    .unwrap();
    let operation = ir.operation("PetQuery").unwrap();
    assert_snapshot!(operation.data_model_group.to_string(), @r###"
    model Data [Query] -> [Query]
      pet: Pet {
        interface Pet [Pet] -> [Cat, Dog, Fish]
          as ...AnimalName -> AnimalName#interface.AnimalName
          as [Animal, Pet] -> PetQuery.Data.pet.AnimalPet
          __typename: String!
        fallback OtherPet [Pet] -> [Fish]
          implements PetQuery.Data.pet.Pet
          __typename: String! (override)
        model AnimalPet [Animal, Pet] -> [Cat, Dog]
          implements PetQuery.Data.pet.Pet
          implements AnimalName#interface.AnimalName
          __typename: String! (override)
          name: String! (override)
      }
    "###);
    assert_eq!(
        pet_group(&operation.data_model_group).base_model_id.to_string(),
        "PetQuery.Data.pet.Pet"
    );
}

#[test]
fn uncovered_possible_types_get_a_fallback() {
    let ir = build(
        ANIMALS_SDL,
        "query Q { animal { name ... on Dog { breed } } }",
    )
    .unwrap();
    let group = ir.operation("Q").unwrap().data_model_group.clone();
    let animal = group
        .base_model()
        .unwrap()
        .property("animal")
        .unwrap()
        .model_group
        .clone()
        .unwrap();
    let names: Vec<&str> = animal.models.iter().map(|model| model.name.as_str()).collect();
    assert_eq!(names, ["Animal", "OtherAnimal", "DogAnimal"]);

    let base = animal.base_model().unwrap();
    assert!(base.is_base && base.is_interface && !base.is_fallback);
    let other = animal.model_named("OtherAnimal").unwrap();
    assert!(other.is_fallback && !other.is_base && !other.is_interface);
    assert_eq!(
        other.possible_types.iter().map(|name| name.as_str()).collect::<Vec<_>>(),
        ["Cat", "Lion"]
    );
    let dog = animal.model_named("DogAnimal").unwrap();
    assert_eq!(dog.id.to_string(), "Q.Data.animal.DogAnimal");
    assert_eq!(dog.implements, [base.id.clone()]);
}

#[test]
fn shapes_implementing_two_shapes_form_a_diamond() {
    let ir = build(
        ANIMALS_SDL,
        "query Q { animal { ... on Pet { owner } ... on Dog { breed } } }",
    )
    .unwrap();
    let group = &ir.operation("Q").unwrap().data_model_group;
    let animal = group
        .base_model()
        .unwrap()
        .property("animal")
        .unwrap()
        .model_group
        .as_ref()
        .unwrap();
    let names: Vec<&str> = animal.models.iter().map(|model| model.name.as_str()).collect();
    assert_eq!(
        names,
        [
            "Animal",
            "OtherAnimal",
            "DogAnimal",
            "PetAnimal",
            "OtherPetAnimal",
            "DogPetAnimal",
        ]
    );

    let dog_pet = animal.model_named("DogPetAnimal").unwrap();
    assert!(!dog_pet.is_interface);
    assert_eq!(
        dog_pet.implements,
        [
            animal.model_named("DogAnimal").unwrap().id.clone(),
            animal.model_named("PetAnimal").unwrap().id.clone(),
        ]
    );
    assert!(dog_pet.property("owner").unwrap().is_override);
    assert!(dog_pet.property("breed").unwrap().is_override);

    // every shape is reachable from the base model
    let base = animal.base_model().unwrap();
    let subtypes: Vec<String> = base
        .accessors
        .iter()
        .map(|accessor| accessor.return_model_id().name().to_string())
        .collect();
    assert_eq!(subtypes, ["DogAnimal", "PetAnimal", "DogPetAnimal"]);
}

#[test]
fn overlapping_interface_conditions_cover_their_shared_types() {
    let ir = build(
        ANIMALS_SDL,
        "query Q { creature { ... on Animal { name } ... on Pet { owner } } }",
    )
    .unwrap();
    let group = &ir.operation("Q").unwrap().data_model_group;
    let creature = group
        .base_model()
        .unwrap()
        .property("creature")
        .unwrap()
        .model_group
        .as_ref()
        .unwrap();
    let models: Vec<(&str, Vec<&str>)> = creature
        .models
        .iter()
        .map(|model| {
            (
                model.name.as_str(),
                model.possible_types.iter().map(|name| name.as_str()).collect(),
            )
        })
        .collect();
    assert_eq!(
        models,
        [
            ("Creature", vec!["Cat", "Dog", "Fish", "Lion"]),
            ("AnimalCreature", vec!["Cat", "Dog", "Lion"]),
            ("OtherAnimalCreature", vec!["Lion"]),
            ("PetCreature", vec!["Cat", "Dog", "Fish"]),
            ("OtherPetCreature", vec!["Fish"]),
            ("AnimalPetCreature", vec!["Cat", "Dog"]),
        ]
    );

    let both = creature.model_named("AnimalPetCreature").unwrap();
    assert!(!both.is_interface);
    assert_eq!(
        both.implements,
        [
            creature.model_named("AnimalCreature").unwrap().id.clone(),
            creature.model_named("PetCreature").unwrap().id.clone(),
        ]
    );
}

#[test]
fn fragment_accessors_live_on_the_base_model() {
    let ir = build(
        ANIMALS_SDL,
        r#"
        query Q { animal { ...Details ... on Dog { breed } } }
        fragment Details on Animal { name }
        "#,
    )
    .unwrap();
    let group = &ir.operation("Q").unwrap().data_model_group;
    let animal = group
        .base_model()
        .unwrap()
        .property("animal")
        .unwrap()
        .model_group
        .as_ref()
        .unwrap();
    for model in &animal.models {
        let fragment_accessors = model
            .accessors
            .iter()
            .filter(|accessor| matches!(accessor, IrAccessor::Fragment { .. }))
            .count();
        assert_eq!(fragment_accessors, usize::from(model.is_base), "{}", model.name);
    }
    let details = ir.fragment("Details").unwrap();
    assert!(
        animal
            .base_model()
            .unwrap()
            .implements
            .contains(&details.interface_model_group.base_model_id)
    );
}

#[test]
fn flattened_names_are_unique_across_the_tree() {
    let config = IrBuilderConfig {
        flatten_models: true,
        ..Default::default()
    };
    let ir = build_with(
        ANIMALS_SDL,
        "query Q { animal { friends { friends { name } } } }",
        config,
    )
    .unwrap();
    let flat = ir.operation("Q").unwrap().flattened_models.clone().unwrap();
    let flat: Vec<(String, String)> = flat
        .into_iter()
        .map(|model| (model.id.to_string(), model.name))
        .collect();
    assert_eq!(
        flat,
        [
            ("Q.Data".to_string(), "Data".to_string()),
            ("Q.Data.animal.Animal".to_string(), "Animal".to_string()),
            (
                "Q.Data.animal.Animal.friends.Friend".to_string(),
                "Friend".to_string()
            ),
            (
                "Q.Data.animal.Animal.friends.Friend.friends.Friend".to_string(),
                "Friend2".to_string()
            ),
        ]
    );
}

#[test]
fn flattening_is_off_by_default() {
    let ir = build(PETS_SDL, "query Q { pet { __typename } }").unwrap();
    let operation = ir.operation("Q").unwrap();
    assert!(operation.flattened_models.is_none());
    assert!(
        pet_group(&operation.data_model_group)
            .models
            .iter()
            .all(|model| !model.is_interface)
    );
}

#[test]
fn fragment_diamonds_yield_each_model_once() {
    let config = IrBuilderConfig {
        flatten_models: true,
        ..Default::default()
    };
    let ir = build_with(
        ANIMALS_SDL,
        r#"
        query Q { animal { ...Left ...Right } }
        fragment Left on Animal { ...Name }
        fragment Right on Animal { ...Name }
        fragment Name on Animal { name }
        "#,
        config,
    )
    .unwrap();
    let operation = ir.operation("Q").unwrap();
    let animal = operation
        .data_model_group
        .base_model()
        .unwrap()
        .property("animal")
        .unwrap()
        .model_group
        .as_ref()
        .unwrap();
    assert_eq!(animal.models.len(), 1);
    let base = animal.base_model().unwrap();
    let implements: BTreeSet<String> = base.implements.iter().map(ToString::to_string).collect();
    assert_eq!(implements.len(), base.implements.len());
    assert!(implements.contains(&"Left#interface.Left".to_string()));
    assert!(implements.contains(&"Right#interface.Right".to_string()));

    let flat = operation.flattened_models.as_ref().unwrap();
    let ids: BTreeSet<String> = flat.iter().map(|model| model.id.to_string()).collect();
    assert_eq!(ids.len(), flat.len());
    assert_eq!(
        ir.fragments
            .iter()
            .filter(|fragment| fragment.name.as_str() == "Name")
            .count(),
        1
    );
}
