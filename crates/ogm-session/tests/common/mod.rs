#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use ogm_core::{
    EntityDescriptor, EventListener, GraphObject, Lifecycle, MetaData, ObjectRef, Persistable,
    PersistenceEvent, PropertyValue, Related, RelationshipField,
};

#[derive(Default)]
pub struct Person {
    pub id: Option<i64>,
    pub name: String,
    pub employer: Option<ObjectRef>,
    pub friends: Vec<ObjectRef>,
    pub jobs: Vec<ObjectRef>,
}

impl GraphObject for Person {
    fn type_name(&self) -> &'static str {
        "Person"
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
            "employer" => (&self.employer).into(),
            "friends" => (&self.friends).into(),
            "jobs" => (&self.jobs).into(),
            _ => Related::None,
        }
    }
}

impl Persistable for Person {
    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::node("Person")
            .property("name")
            .relationship_field(RelationshipField::outgoing("employer", "WORKS_AT").single())
            .relationship_field(RelationshipField::outgoing("friends", "KNOWS"))
            .relationship_field(RelationshipField::outgoing("jobs", "EMPLOYED_BY"))
    }
}

#[derive(Default)]
pub struct Company {
    pub id: Option<i64>,
    pub name: String,
}

impl GraphObject for Company {
    fn type_name(&self) -> &'static str {
        "Company"
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
    fn related(&self, _field: &str) -> Related {
        Related::None
    }
}

impl Persistable for Company {
    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::node("Company").property("name")
    }
}

pub struct Employment {
    pub id: Option<i64>,
    pub title: String,
    pub person: ObjectRef,
    pub company: ObjectRef,
}

impl GraphObject for Employment {
    fn type_name(&self) -> &'static str {
        "Employment"
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
            _ => PropertyValue::Null,
        }
    }
    fn related(&self, field: &str) -> Related {
        match field {
            "person" => (&self.person).into(),
            "company" => (&self.company).into(),
            _ => Related::None,
        }
    }
}

impl Persistable for Employment {
    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::relationship("Employment", "EMPLOYED_BY", "person", "company")
            .property("title")
    }
}

/// A type the metadata never hears about.
pub struct Untracked;

impl GraphObject for Untracked {
    fn type_name(&self) -> &'static str {
        "Untracked"
    }
    fn id(&self) -> Option<i64> {
        None
    }
    fn set_id(&mut self, _id: i64) {}
    fn property(&self, _field: &str) -> PropertyValue {
        PropertyValue::Null
    }
    fn related(&self, _field: &str) -> Related {
        Related::None
    }
}

pub fn metadata() -> Arc<MetaData> {
    let mut meta = MetaData::new();
    meta.register::<Person>().unwrap();
    meta.register::<Company>().unwrap();
    meta.register::<Employment>().unwrap();
    Arc::new(meta)
}

pub fn person(name: &str) -> ObjectRef {
    ObjectRef::new(Person {
        name: name.to_string(),
        ..Default::default()
    })
}

pub fn company(name: &str) -> ObjectRef {
    ObjectRef::new(Company {
        id: None,
        name: name.to_string(),
    })
}

pub fn hire(person: &ObjectRef, company: &ObjectRef, title: &str) -> ObjectRef {
    let job = ObjectRef::new(Employment {
        id: None,
        title: title.to_string(),
        person: person.clone(),
        company: company.clone(),
    });
    person.with_mut(|p: &mut Person| p.jobs.push(job.clone()));
    job
}

pub fn set_employer(person: &ObjectRef, company: Option<&ObjectRef>) {
    person.with_mut(|p: &mut Person| p.employer = company.cloned());
}

pub fn befriend(a: &ObjectRef, b: &ObjectRef) {
    a.with_mut(|p: &mut Person| p.friends.push(b.clone()));
}

pub fn rename(person: &ObjectRef, name: &str) {
    person.with_mut(|p: &mut Person| p.name = name.to_string());
}

/// Records every event it receives.
#[derive(Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<(Lifecycle, ObjectRef)>>>,
}

impl EventLog {
    pub fn events(&self) -> Vec<(Lifecycle, ObjectRef)> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, lifecycle: Lifecycle, subject: &ObjectRef) -> usize {
        self.events()
            .iter()
            .filter(|(l, s)| *l == lifecycle && s == subject)
            .count()
    }

    pub fn lifecycles(&self) -> Vec<Lifecycle> {
        self.events().into_iter().map(|(l, _)| l).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().unwrap().is_empty()
    }
}

impl EventListener for EventLog {
    fn on_event(&self, event: &PersistenceEvent) -> anyhow::Result<()> {
        self.events
            .lock()
            .unwrap()
            .push((event.lifecycle, event.subject.clone()));
        Ok(())
    }
}
