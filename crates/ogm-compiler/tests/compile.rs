mod common;

use common::*;
use ogm_compiler::{MappingContext, SaveBatch, Statement, TransientRelationship};
use ogm_core::Identity;

#[test]
fn second_save_of_unchanged_graph_is_empty() {
    let meta = metadata();
    let mut mapping = MappingContext::new();
    let mut next_id = 100;
    let keanu = actor("Keanu");
    let carrie = actor("Carrie");
    let matrix = movie("The Matrix");
    co_star(&keanu, &carrie);
    cast(&keanu, &matrix, "Neo");

    let first = save(&meta, &mut mapping, &[keanu.clone()], -1, &mut next_id);
    assert_eq!(first.summary()["create_node"], 3);
    assert_eq!(first.summary()["create_relationship"], 2);
    assert!(keanu.id().is_some());
    assert_eq!(mapping.node_count(), 3);
    assert_eq!(mapping.relationship_entity_count(), 1);

    let second = save(&meta, &mut mapping, &[keanu], -1, &mut next_id);
    assert!(second.is_empty(), "unexpected statements: {:?}", second.statements());
}

#[test]
fn commit_assigns_native_ids_to_every_new_object() {
    let meta = metadata();
    let mut mapping = MappingContext::new();
    let mut next_id = 0;
    let keanu = actor("Keanu");
    let matrix = movie("The Matrix");
    let role = cast(&keanu, &matrix, "Neo");

    save(&meta, &mut mapping, &[keanu.clone()], -1, &mut next_id);

    let keanu_id = Identity(keanu.id().unwrap());
    let matrix_id = Identity(matrix.id().unwrap());
    let role_id = Identity(role.id().unwrap());
    assert_eq!(mapping.get_node_entity(keanu_id), Some(&keanu));
    assert_eq!(mapping.get_relationship_entity(role_id), Some(&role));
    assert!(mapping.contains_relationship(&TransientRelationship::rich(
        keanu_id, matrix_id, "ACTED_IN", role_id
    )));
}

#[test]
fn collection_roots_share_new_objects() {
    let meta = metadata();
    let mapping = MappingContext::new();
    let keanu = actor("Keanu");
    let carrie = actor("Carrie");
    let laurence = actor("Laurence");
    co_star(&keanu, &laurence);
    co_star(&carrie, &laurence);

    let contexts = compile(&meta, &mapping, &[keanu, carrie], -1);
    let batch = SaveBatch::from_contexts(&contexts).unwrap();

    // Laurence is reachable from both roots but created once.
    assert_eq!(batch.summary()["create_node"], 3);
    assert_eq!(batch.summary()["create_relationship"], 2);
}

#[test]
fn batch_orders_creates_before_the_edges_using_them() {
    let meta = metadata();
    let mapping = MappingContext::new();
    let keanu = actor("Keanu");
    let carrie = actor("Carrie");
    co_star(&keanu, &carrie);

    let contexts = compile(&meta, &mapping, &[keanu], -1);
    let batch = SaveBatch::from_contexts(&contexts).unwrap();

    let phases: Vec<&str> = batch
        .iter()
        .map(|s| match s {
            Statement::CreateNode { .. } => "node",
            Statement::CreateRelationship { .. } => "edge",
            _ => "other",
        })
        .collect();
    assert_eq!(phases, vec!["node", "node", "edge"]);
}

#[test]
fn replacing_a_co_star_deletes_and_creates() {
    let meta = metadata();
    let mut mapping = MappingContext::new();
    let mut next_id = 1;
    let keanu = actor("Keanu");
    let carrie = actor("Carrie");
    let hugo = actor("Hugo");
    co_star(&keanu, &carrie);
    save(&meta, &mut mapping, &[keanu.clone(), hugo.clone()], -1, &mut next_id);

    keanu.with_mut(|a: &mut Actor| a.co_stars = vec![hugo.clone()]);
    let batch = save(&meta, &mut mapping, &[keanu.clone()], 1, &mut next_id);

    let keanu_id = Identity(keanu.id().unwrap());
    let carrie_id = Identity(carrie.id().unwrap());
    let hugo_id = Identity(hugo.id().unwrap());
    assert_eq!(
        batch.statements(),
        &[
            Statement::DeleteRelationship {
                relationship: TransientRelationship::new(keanu_id, carrie_id, "WORKED_WITH"),
            },
            Statement::CreateRelationship {
                relationship: TransientRelationship::new(keanu_id, hugo_id, "WORKED_WITH"),
                properties: Default::default(),
            },
        ]
    );
    assert_eq!(mapping.relationships_for(carrie_id).len(), 0);
    assert_eq!(mapping.relationships_for(hugo_id).len(), 1);
}

#[test]
fn moved_role_gets_a_new_identity_after_commit() {
    let meta = metadata();
    let mut mapping = MappingContext::new();
    let mut next_id = 1;
    let keanu = actor("Keanu");
    let matrix = movie("The Matrix");
    let wick = movie("John Wick");
    let role = cast(&keanu, &matrix, "Neo");
    save(&meta, &mut mapping, &[keanu.clone(), wick.clone()], -1, &mut next_id);
    let old_id = Identity(role.id().unwrap());

    role.with_mut(|r: &mut Role| r.movie = wick.clone());
    save(&meta, &mut mapping, &[keanu.clone()], -1, &mut next_id);

    let new_id = Identity(role.id().unwrap());
    assert_ne!(old_id, new_id);
    assert!(mapping.get_relationship_entity(old_id).is_none());
    assert_eq!(mapping.get_relationship_entity(new_id), Some(&role));
    let matrix_id = Identity(matrix.id().unwrap());
    assert!(mapping.relationships_for(matrix_id).is_empty());
    assert_eq!(mapping.relationship_entity_count(), 1);
}
