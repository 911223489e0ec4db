//! Contract of the remote document store the engines sync against.
//!
//! The store is a managed service: documents are schemaless JSON objects
//! grouped in named collections, and every subscriber receives the whole
//! (ordered) collection each time anything in it changes.

use std::{cmp::Ordering, fmt};

use async_trait::async_trait;
use futures::channel::mpsc;

use crate::{Error, Time};

pub type Fields = serde_json::Map<String, serde_json::Value>;

/// A full-collection snapshot, in the order requested at subscription time
pub type Snapshot = Vec<Document>;

/// Dropping the receiver unsubscribes
pub type SnapshotFeed = mpsc::UnboundedReceiver<Snapshot>;

/// Panics if `value` does not serialize to a JSON object
pub fn to_fields<T: serde::Serialize>(value: &T) -> Fields {
    match serde_json::to_value(value).expect("serializing document fields") {
        serde_json::Value::Object(fields) => fields,
        v => panic!("document fields serialized to a non-object: {v:?}"),
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Collection {
    Homework,
    Posts,
}

impl Collection {
    pub fn name(&self) -> &'static str {
        match self {
            Collection::Homework => "homework",
            Collection::Posts => "posts",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(
    Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub struct DocumentId(pub String);

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Document {
    pub id: DocumentId,
    pub fields: Fields,
}

impl Document {
    /// Deserialize the document into `T`, injecting its id as the `id` field
    pub fn decode<T>(&self) -> Result<T, Error>
    where
        T: for<'de> serde::Deserialize<'de>,
    {
        let mut fields = self.fields.clone();
        fields.insert(
            String::from("id"),
            serde_json::Value::from(self.id.0.clone()),
        );
        serde_json::from_value(serde_json::Value::Object(fields)).map_err(|e| {
            Error::InvalidDocument {
                id: self.id.0.clone(),
                reason: e.to_string(),
            }
        })
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OrderType {
    Asc,
    Desc,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub order: OrderType,
}

impl OrderBy {
    pub fn asc(field: &str) -> OrderBy {
        OrderBy {
            field: String::from(field),
            order: OrderType::Asc,
        }
    }

    pub fn desc(field: &str) -> OrderBy {
        OrderBy {
            field: String::from(field),
            order: OrderType::Desc,
        }
    }

    pub fn created_at_desc() -> OrderBy {
        OrderBy::desc("createdAt")
    }

    pub fn compare(&self, a: &Document, b: &Document) -> Ordering {
        let res = compare_values(a.fields.get(&self.field), b.fields.get(&self.field));
        match self.order {
            OrderType::Asc => res,
            OrderType::Desc => res.reverse(),
        }
    }

    pub fn sort(&self, docs: &mut [Document]) {
        docs.sort_by(|a, b| self.compare(a, b).then_with(|| a.id.cmp(&b.id)))
    }
}

// Missing values sort after present ones in ascending order
fn compare_values(a: Option<&serde_json::Value>, b: Option<&serde_json::Value>) -> Ordering {
    use serde_json::Value;
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(Value::String(a)), Some(Value::String(b))) => {
            match (a.parse::<Time>(), b.parse::<Time>()) {
                (Ok(a), Ok(b)) => a.cmp(&b),
                _ => a.cmp(b),
            }
        }
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(a), Some(b)) => a.to_string().cmp(&b.to_string()),
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    /// The current snapshot is delivered right away, then a new one after
    /// every write touching `collection`
    async fn subscribe(&self, collection: Collection, order: OrderBy)
        -> Result<SnapshotFeed, Error>;

    async fn add(&self, collection: Collection, fields: Fields) -> Result<DocumentId, Error>;

    /// Shallow merge: top-level fields present in `fields` are replaced wholesale
    async fn update(
        &self,
        collection: Collection,
        id: &DocumentId,
        fields: Fields,
    ) -> Result<(), Error>;

    /// Deleting a document that does not exist (anymore) succeeds
    async fn delete(&self, collection: Collection, id: &DocumentId) -> Result<(), Error>;
}
