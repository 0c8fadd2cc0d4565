// Shared fixtures: an in-memory document store with failure injection,
// a recording mailer and seeding helpers.

#![allow(dead_code)]

use std::{
    cmp::Ordering,
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicBool, Ordering as AtomicOrdering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use servecta_portal::{
    db::{
        collection::Collection,
        repository::to_document,
        store::{document_id, Document, DocumentStore, Filter, FindQuery, Patch, SortOrder, StoreError},
    },
    models::{
        audit::Actor,
        auth::{ConsumerUser, Role, StaffUser, User, UserType},
    },
    services::mailer::{Email, MailError, Mailer},
    AppState, Config,
};

pub const PASSWORD: &str = "correct-horse-battery";

// =========================================================================
//  MEMORY STORE
// =========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Find,
    FindById,
    Insert,
    UpdateMany,
    DeleteById,
    DeleteMany,
}

#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<Collection, Vec<Document>>>,
    failures: Mutex<HashSet<(Collection, Op)>>,
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every subsequent `op` on `collection` fails.
    pub fn fail_on(&self, collection: Collection, op: Op) {
        self.failures.lock().unwrap().insert((collection, op));
    }

    fn check(&self, collection: Collection, op: Op) -> Result<(), StoreError> {
        if self.failures.lock().unwrap().contains(&(collection, op)) {
            return Err(StoreError::Unavailable(format!("injected {op:?} failure on {collection}")));
        }
        Ok(())
    }

    pub fn all(&self, collection: Collection) -> Vec<Document> {
        self.collections
            .lock()
            .unwrap()
            .get(&collection)
            .cloned()
            .unwrap_or_default()
    }

    pub fn get(&self, collection: Collection, id: Uuid) -> Option<Document> {
        self.all(collection)
            .into_iter()
            .find(|d| document_id(d) == Some(id))
    }

    pub fn put(&self, collection: Collection, doc: Value) -> Uuid {
        let doc = doc.as_object().cloned().expect("fixture must be an object");
        let id = document_id(&doc).expect("fixture needs an id");
        self.collections
            .lock()
            .unwrap()
            .entry(collection)
            .or_default()
            .push(doc);
        id
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find(&self, collection: Collection, query: &FindQuery) -> Result<Vec<Document>, StoreError> {
        self.check(collection, Op::Find)?;
        let mut docs: Vec<Document> = self
            .all(collection)
            .into_iter()
            .filter(|d| query.filter.matches(d))
            .collect();

        if let Some(sort) = &query.sort {
            docs.sort_by(|a, b| {
                let ord = compare(a.get(&sort.field), b.get(&sort.field));
                match sort.order {
                    SortOrder::Asc => ord,
                    SortOrder::Desc => ord.reverse(),
                }
            });
        }

        let docs = docs.into_iter().skip(query.skip as usize);
        Ok(match query.limit {
            Some(limit) => docs.take(limit as usize).collect(),
            None => docs.collect(),
        })
    }

    async fn find_by_id(&self, collection: Collection, id: Uuid) -> Result<Option<Document>, StoreError> {
        self.check(collection, Op::FindById)?;
        Ok(self.get(collection, id))
    }

    async fn count(&self, collection: Collection, filter: &Filter) -> Result<u64, StoreError> {
        self.check(collection, Op::Find)?;
        Ok(self.all(collection).iter().filter(|d| filter.matches(d)).count() as u64)
    }

    async fn insert(&self, collection: Collection, doc: Document) -> Result<Document, StoreError> {
        self.check(collection, Op::Insert)?;
        if document_id(&doc).is_none() {
            return Err(StoreError::MissingId(collection));
        }
        self.collections
            .lock()
            .unwrap()
            .entry(collection)
            .or_default()
            .push(doc.clone());
        Ok(doc)
    }

    async fn update_by_id(
        &self,
        collection: Collection,
        id: Uuid,
        patch: &Patch,
    ) -> Result<Option<Document>, StoreError> {
        self.check(collection, Op::UpdateMany)?;
        let mut collections = self.collections.lock().unwrap();
        let docs = collections.entry(collection).or_default();
        Ok(docs.iter_mut().find(|d| document_id(d) == Some(id)).map(|d| {
            patch.apply(d);
            d.clone()
        }))
    }

    async fn update_many(&self, collection: Collection, filter: &Filter, patch: &Patch) -> Result<u64, StoreError> {
        self.check(collection, Op::UpdateMany)?;
        let mut collections = self.collections.lock().unwrap();
        let docs = collections.entry(collection).or_default();
        let mut touched = 0;
        for doc in docs.iter_mut().filter(|d| filter.matches(d)) {
            patch.apply(doc);
            touched += 1;
        }
        Ok(touched)
    }

    async fn delete_by_id(&self, collection: Collection, id: Uuid) -> Result<u64, StoreError> {
        self.check(collection, Op::DeleteById)?;
        let mut collections = self.collections.lock().unwrap();
        let docs = collections.entry(collection).or_default();
        let before = docs.len();
        docs.retain(|d| document_id(d) != Some(id));
        Ok((before - docs.len()) as u64)
    }

    async fn delete_many(&self, collection: Collection, filter: &Filter) -> Result<u64, StoreError> {
        self.check(collection, Op::DeleteMany)?;
        let mut collections = self.collections.lock().unwrap();
        let docs = collections.entry(collection).or_default();
        let before = docs.len();
        docs.retain(|d| !filter.matches(d));
        Ok((before - docs.len()) as u64)
    }
}

// =========================================================================
//  MAILER
// =========================================================================

#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<Email>>,
    failing: AtomicBool,
}

impl RecordingMailer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail(&self) {
        self.failing.store(true, AtomicOrdering::SeqCst);
    }

    pub fn sent(&self) -> Vec<Email> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        if self.failing.load(AtomicOrdering::SeqCst) {
            return Err(MailError::Rejected { status: 503, body: "provider down".into() });
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

// =========================================================================
//  APP STATE & FIXTURES
// =========================================================================

pub fn test_config() -> Config {
    Config {
        database_url: "memory://".to_string(),
        jwt_secret: "test-jwt-secret".to_string(),
        cron_secret: Some("test-cron-secret".to_string()),
        mail: None,
        bind_addr: "127.0.0.1:0".to_string(),
        db_max_connections: 1,
    }
}

pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<RecordingMailer>,
    pub state: AppState,
}

pub fn test_app() -> TestApp {
    let store = MemoryStore::new();
    let mailer = RecordingMailer::new();
    let state = AppState::from_parts(test_config(), store.clone(), mailer.clone());
    TestApp { store, mailer, state }
}

pub fn actor_for(user: &User) -> Actor {
    Actor::from_user(user, "203.0.113.7")
}

fn password_hash() -> String {
    bcrypt::hash(PASSWORD, 4).expect("bcrypt")
}

impl TestApp {
    pub fn staff(&self, role: Role, email: &str) -> User {
        let now = Utc::now();
        let staff = StaffUser {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: format!("{} Test", role.as_str()),
            role,
            password_hash: password_hash(),
            active: true,
            user_type: UserType::Staff,
            created_at: now,
            updated_at: now,
        };
        self.store.put(Collection::Staff, Value::Object(to_document(&staff).unwrap()));
        staff.into()
    }

    pub fn consumer(&self, customer_id: Uuid, email: &str) -> User {
        let now = Utc::now();
        let consumer = ConsumerUser {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: "Kunde Test".to_string(),
            role: Role::Kunde,
            customer_id,
            password_hash: password_hash(),
            active: true,
            user_type: UserType::Consumer,
            created_at: now,
            updated_at: now,
        };
        self.store.put(Collection::Consumers, Value::Object(to_document(&consumer).unwrap()));
        consumer.into()
    }

    pub fn token(&self, user: &User) -> String {
        self.state.auth_service.create_token(user).unwrap()
    }

    pub fn customer(&self, legal_name: &str) -> Uuid {
        self.store.put(
            Collection::Customers,
            json!({
                "id": Uuid::new_v4().to_string(),
                "legalName": legal_name,
                "status": "ACTIVE",
                "tags": [],
                "createdAt": Utc::now(),
                "updatedAt": Utc::now(),
            }),
        )
    }

    pub fn project(&self, customer_id: Uuid, assignee: Option<Uuid>) -> Uuid {
        let mut doc = json!({
            "id": Uuid::new_v4().to_string(),
            "customerId": customer_id.to_string(),
            "name": "Heizungssanierung",
            "status": "ACTIVE",
            "createdAt": Utc::now(),
            "updatedAt": Utc::now(),
        });
        if let Some(a) = assignee {
            doc["assigneeId"] = json!(a.to_string());
        }
        self.store.put(Collection::Projects, doc)
    }

    /// `owner` is `("projectId" | "customerId" | "parentTaskId", id)`.
    pub fn task(&self, owner: (&str, Uuid), assignee: Option<Uuid>, created_by: Uuid) -> Uuid {
        let mut doc = json!({
            "id": Uuid::new_v4().to_string(),
            "title": "Wartung",
            "status": "TODO",
            "priority": "MEDIUM",
            "createdById": created_by.to_string(),
            "createdAt": Utc::now(),
            "updatedAt": Utc::now(),
        });
        doc[owner.0] = json!(owner.1.to_string());
        if let Some(a) = assignee {
            doc["assigneeId"] = json!(a.to_string());
        }
        self.store.put(Collection::Tasks, doc)
    }

    pub fn ticket(&self, customer_id: Option<Uuid>, project_id: Option<Uuid>, created_by: Uuid) -> Uuid {
        let mut doc = json!({
            "id": Uuid::new_v4().to_string(),
            "title": "Heizung fällt aus",
            "description": "Seit gestern kalt",
            "status": "OPEN",
            "priority": "HIGH",
            "createdById": created_by.to_string(),
            "createdAt": Utc::now(),
            "updatedAt": Utc::now(),
        });
        if let Some(c) = customer_id {
            doc["customerId"] = json!(c.to_string());
        }
        if let Some(p) = project_id {
            doc["projectId"] = json!(p.to_string());
        }
        self.store.put(Collection::Tickets, doc)
    }

    pub fn comment(&self, entity_type: &str, entity_id: Uuid, author: &User) -> Uuid {
        self.store.put(
            Collection::Comments,
            json!({
                "id": Uuid::new_v4().to_string(),
                "entityType": entity_type,
                "entityId": entity_id.to_string(),
                "authorId": author.id.to_string(),
                "authorName": author.name,
                "content": "Erledigt.",
                "createdAt": Utc::now(),
                "updatedAt": Utc::now(),
            }),
        )
    }

    pub fn notification(&self, user_id: Uuid) -> Uuid {
        self.store.put(
            Collection::Notifications,
            json!({
                "id": Uuid::new_v4().to_string(),
                "userId": user_id.to_string(),
                "kind": "DEADLINE_APPROACHING",
                "title": "Frist naht: Wartung",
                "message": "Die Aufgabe ist morgen fällig.",
                "read": false,
                "createdAt": Utc::now(),
                "updatedAt": Utc::now(),
            }),
        )
    }

    pub fn child(&self, collection: Collection, customer_id: Uuid) -> Uuid {
        self.store.put(
            collection,
            json!({ "id": Uuid::new_v4().to_string(), "customerId": customer_id.to_string() }),
        )
    }

    pub fn audit_entries(&self) -> Vec<Document> {
        self.store.all(Collection::AuditLogs)
    }
}
