#![allow(dead_code)]

use ogm_compiler::{
    CompileContext, EntityGraphMapper, MappingContext, ProvisionalIds, SaveBatch, SaveOutcome,
    Statement,
};
use ogm_core::{
    EntityDescriptor, GraphObject, Identity, MetaData, ObjectRef, Persistable, PropertyValue,
    Related, RelationshipField,
};

#[derive(Default)]
pub struct Actor {
    pub id: Option<i64>,
    pub name: String,
    pub co_stars: Vec<ObjectRef>,
    pub roles: Vec<ObjectRef>,
}

impl GraphObject for Actor {
    fn type_name(&self) -> &'static str {
        "Actor"
    }
    fn id(&self) -> Option<i64> {
        self.id
    }
    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }
    fn property(&self, field: &str) -> PropertyValue {
        match field {
            "name" => self.name.as_str().into(),
            _ => PropertyValue::Null,
        }
    }
    fn related(&self, field: &str) -> Related {
        match field {
            "co_stars" => (&self.co_stars).into(),
            "roles" => (&self.roles).into(),
            _ => Related::None,
        }
    }
}

impl Persistable for Actor {
    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::node("Actor")
            .property("name")
            .relationship_field(RelationshipField::outgoing("co_stars", "WORKED_WITH"))
            .relationship_field(RelationshipField::outgoing("roles", "ACTED_IN"))
    }
}

#[derive(Default)]
pub struct Movie {
    pub id: Option<i64>,
    pub title: String,
    pub released: Option<i64>,
}

impl GraphObject for Movie {
    fn type_name(&self) -> &'static str {
        "Movie"
    }
    fn id(&self) -> Option<i64> {
        self.id
    }
    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }
    fn property(&self, field: &str) -> PropertyValue {
        match field {
            "title" => self.title.as_str().into(),
            "released" => self.released.into(),
            _ => PropertyValue::Null,
        }
    }
    fn related(&self, _field: &str) -> Related {
        Related::None
    }
}

impl Persistable for Movie {
    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::node("Movie").properties(&["title", "released"])
    }
}

pub struct Role {
    pub id: Option<i64>,
    pub character: String,
    pub actor: ObjectRef,
    pub movie: ObjectRef,
}

impl GraphObject for Role {
    fn type_name(&self) -> &'static str {
        "Role"
    }
    fn id(&self) -> Option<i64> {
        self.id
    }
    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }
    fn property(&self, field: &str) -> PropertyValue {
        match field {
            "character" => self.character.as_str().into(),
            _ => PropertyValue::Null,
        }
    }
    fn related(&self, field: &str) -> Related {
        match field {
            "actor" => (&self.actor).into(),
            "movie" => (&self.movie).into(),
            _ => Related::None,
        }
    }
}

impl Persistable for Role {
    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::relationship("Role", "ACTED_IN", "actor", "movie").property("character")
    }
}

pub fn metadata() -> MetaData {
    let mut meta = MetaData::new();
    meta.register::<Actor>().unwrap();
    meta.register::<Movie>().unwrap();
    meta.register::<Role>().unwrap();
    meta
}

pub fn actor(name: &str) -> ObjectRef {
    ObjectRef::new(Actor {
        name: name.to_string(),
        ..Default::default()
    })
}

pub fn movie(title: &str) -> ObjectRef {
    ObjectRef::new(Movie {
        title: title.to_string(),
        ..Default::default()
    })
}

/// Create a role and add it to the actor's roles.
pub fn cast(actor: &ObjectRef, movie: &ObjectRef, character: &str) -> ObjectRef {
    let role = ObjectRef::new(Role {
        id: None,
        character: character.to_string(),
        actor: actor.clone(),
        movie: movie.clone(),
    });
    actor.with_mut(|a: &mut Actor| a.roles.push(role.clone()));
    role
}

pub fn co_star(a: &ObjectRef, b: &ObjectRef) {
    a.with_mut(|x: &mut Actor| x.co_stars.push(b.clone()));
}

/// Compile `roots` as one save call.
pub fn compile(
    meta: &MetaData,
    mapping: &MappingContext,
    roots: &[ObjectRef],
    depth: i32,
) -> Vec<CompileContext> {
    let mut ids = ProvisionalIds::new();
    roots
        .iter()
        .map(|root| {
            let mut ctx = EntityGraphMapper::new(meta, mapping, &mut ids)
                .map(root, depth)
                .unwrap();
            ctx.seal();
            ctx
        })
        .collect()
}

/// Stand-in executor: hands out native ids from `next_id` upwards.
pub fn execute(batch: &SaveBatch, next_id: &mut i64) -> SaveOutcome {
    let mut outcome = SaveOutcome::default();
    for statement in batch {
        match statement {
            Statement::CreateNode { node, .. } => {
                outcome.assign_node(*node, Identity(*next_id));
                *next_id += 1;
            }
            Statement::CreateRelationship { relationship, .. } => {
                if let Some(r) = relationship.rel_ref {
                    outcome.assign_relationship(r, Identity(*next_id));
                    *next_id += 1;
                }
            }
            _ => {}
        }
    }
    outcome
}

/// Compile, execute and commit `roots`; returns the batch that ran.
pub fn save(
    meta: &MetaData,
    mapping: &mut MappingContext,
    roots: &[ObjectRef],
    depth: i32,
    next_id: &mut i64,
) -> SaveBatch {
    let contexts = compile(meta, mapping, roots, depth);
    let batch = SaveBatch::from_contexts(&contexts).unwrap();
    let outcome = execute(&batch, next_id);
    for ctx in &contexts {
        ctx.commit(mapping, &outcome).unwrap();
    }
    batch
}
