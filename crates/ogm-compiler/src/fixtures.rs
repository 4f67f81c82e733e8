//! Small domain used by the unit tests.

use ogm_core::{
    EntityDescriptor, GraphObject, MetaData, ObjectRef, Persistable, PropertyValue, Related,
    RelationshipField,
};

#[derive(Default)]
pub struct Person {
    pub id: Option<i64>,
    pub name: String,
    pub age: Option<i64>,
    pub employer: Option<ObjectRef>,
    pub friends: Vec<ObjectRef>,
    pub employments: Vec<ObjectRef>,
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
            "age" => self.age.into(),
            _ => PropertyValue::Null,
        }
    }

    fn related(&self, field: &str) -> Related {
        match field {
            "employer" => (&self.employer).into(),
            "friends" => (&self.friends).into(),
            "employments" => (&self.employments).into(),
            _ => Related::None,
        }
    }
}

impl Persistable for Person {
    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::node("Person")
            .properties(&["name", "age"])
            .relationship_field(RelationshipField::outgoing("employer", "WORKS_AT").single())
            .relationship_field(RelationshipField::outgoing("friends", "KNOWS"))
            .relationship_field(RelationshipField::outgoing("employments", "EMPLOYED_BY"))
    }
}

#[derive(Default)]
pub struct Company {
    pub id: Option<i64>,
    pub name: String,
    pub employees: Vec<ObjectRef>,
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

    fn related(&self, field: &str) -> Related {
        match field {
            "employees" => (&self.employees).into(),
            _ => Related::None,
        }
    }
}

impl Persistable for Company {
    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::node("Company")
            .label("Organisation")
            .property("name")
            .relationship_field(RelationshipField::incoming("employees", "WORKS_AT"))
    }
}

#[derive(Default)]
pub struct Employment {
    pub id: Option<i64>,
    pub since: i64,
    pub person: Option<ObjectRef>,
    pub company: Option<ObjectRef>,
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
            "since" => self.since.into(),
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
            .property("since")
    }
}

/// Never registered.
pub struct Sticker;

impl GraphObject for Sticker {
    fn type_name(&self) -> &'static str {
        "Sticker"
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

pub fn metadata() -> MetaData {
    MetaData::new()
        .with::<Person>()
        .and_then(MetaData::with::<Company>)
        .and_then(MetaData::with::<Employment>)
        .unwrap()
}

pub fn person(name: &str) -> ObjectRef {
    ObjectRef::new(Person {
        name: name.to_string(),
        ..Default::default()
    })
}

pub fn company(name: &str) -> ObjectRef {
    ObjectRef::new(Company {
        name: name.to_string(),
        ..Default::default()
    })
}

pub fn employment(person: Option<&ObjectRef>, company: Option<&ObjectRef>, since: i64) -> ObjectRef {
    ObjectRef::new(Employment {
        id: None,
        since,
        person: person.cloned(),
        company: company.cloned(),
    })
}

pub fn set_employer(person: &ObjectRef, company: Option<&ObjectRef>) {
    person.with_mut(|p: &mut Person| p.employer = company.cloned());
}

pub fn add_friend(person: &ObjectRef, friend: &ObjectRef) {
    person.with_mut(|p: &mut Person| p.friends.push(friend.clone()));
}

pub fn add_employment(person: &ObjectRef, job: &ObjectRef) {
    person.with_mut(|p: &mut Person| p.employments.push(job.clone()));
}
