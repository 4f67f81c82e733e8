//! A small employment graph saved twice: once fresh, once after edits.

use std::sync::Arc;

use serde::Serialize;

use ogm_core::{
    EntityDescriptor, GraphObject, MetaData, ObjectRef, Persistable, PersistenceEvent,
    PropertyValue, Related, RelationshipField, SessionConfig,
};
use ogm_session::{RequestExecutor, SaveReport, Session};

// ── Domain ────────────────────────────────────────────────────────

#[derive(Default)]
pub struct Person {
    id: Option<i64>,
    name: String,
    age: Option<i64>,
    employer: Option<ObjectRef>,
    friends: Vec<ObjectRef>,
    jobs: Vec<ObjectRef>,
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
            "jobs" => (&self.jobs).into(),
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
            .relationship_field(RelationshipField::outgoing("jobs", "EMPLOYED_BY"))
    }
}

#[derive(Default)]
pub struct Company {
    id: Option<i64>,
    name: String,
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

/// `(Person)-[:EMPLOYED_BY {since}]->(Company)`.
pub struct Employment {
    id: Option<i64>,
    since: i64,
    person: ObjectRef,
    company: ObjectRef,
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

pub fn metadata() -> ogm_core::error::Result<MetaData> {
    MetaData::new()
        .with::<Person>()?
        .with::<Company>()?
        .with::<Employment>()
}

fn person(name: &str, age: i64) -> ObjectRef {
    ObjectRef::new(Person {
        name: name.to_string(),
        age: Some(age),
        ..Default::default()
    })
}

fn company(name: &str) -> ObjectRef {
    ObjectRef::new(Company {
        id: None,
        name: name.to_string(),
    })
}

// ── Run ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct DemoSave {
    pub label: &'static str,
    #[serde(flatten)]
    pub report: SaveReport,
}

/// Save the demo graph, edit it, and save it again.
pub async fn run<E: RequestExecutor>(
    executor: E,
    config: SessionConfig,
    depth: Option<i32>,
) -> anyhow::Result<Vec<DemoSave>> {
    let mut session = Session::with_config(Arc::new(metadata()?), executor, config);
    session.add_listener(|event: &PersistenceEvent| -> anyhow::Result<()> {
        tracing::info!(
            lifecycle = %event.lifecycle,
            subject = event.subject.type_name(),
            id = ?event.subject.id(),
            "Persistence event"
        );
        Ok(())
    });

    let ada = person("Ada", 36);
    let grace = person("Grace", 45);
    let acme = company("Acme");
    let globex = company("Globex");

    ada.with_mut(|p: &mut Person| {
        p.employer = Some(acme.clone());
        p.friends.push(grace.clone());
    });
    let job = ObjectRef::new(Employment {
        id: None,
        since: 2019,
        person: grace.clone(),
        company: acme.clone(),
    });
    grace.with_mut(|p: &mut Person| p.jobs.push(job.clone()));

    let mut saves = Vec::with_capacity(2);
    let report = save(&mut session, &ada, depth).await?;
    saves.push(DemoSave {
        label: "initial",
        report,
    });

    ada.with_mut(|p: &mut Person| {
        p.age = Some(37);
        p.employer = Some(globex.clone());
    });
    job.with_mut(|e: &mut Employment| e.since = 2021);

    let report = save(&mut session, &ada, depth).await?;
    saves.push(DemoSave {
        label: "after edits",
        report,
    });

    Ok(saves)
}

async fn save<E: RequestExecutor>(
    session: &mut Session<E>,
    root: &ObjectRef,
    depth: Option<i32>,
) -> anyhow::Result<SaveReport> {
    let report = match depth {
        Some(depth) => session.save_with_depth(root, depth).await?,
        None => session.save(root).await?,
    };
    Ok(report)
}
