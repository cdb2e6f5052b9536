use std::sync::{Arc, Mutex};

use kvobs_core::{ChangeRecord, Record, Value};

/// A `Person` record with `name` set and `manager`/`tags` absent
#[allow(dead_code)]
pub fn person(name: &str) -> Arc<Record> {
    Record::builder("Person")
        .attribute("name", name)
        .absent("manager")
        .absent("tags")
        .build()
}

/// A `Person` whose manager is `manager`
#[allow(dead_code)]
pub fn person_managed_by(name: &str, manager: &Arc<Record>) -> Arc<Record> {
    let person = person(name);
    person.set("manager", Value::object(manager)).unwrap();
    person
}

/// Shared log of every record delivered to an observer block
#[allow(dead_code)]
#[derive(Clone, Default)]
pub struct RecordLog {
    records: Arc<Mutex<Vec<ChangeRecord>>>,
}

#[allow(dead_code)]
impl RecordLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block that appends each record to this log
    pub fn block(&self) -> impl Fn(&ChangeRecord) + Send + Sync + 'static {
        let records = Arc::clone(&self.records);
        move |record: &ChangeRecord| records.lock().unwrap().push(record.clone())
    }

    pub fn records(&self) -> Vec<ChangeRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn clear(&self) {
        self.records.lock().unwrap().clear();
    }
}
