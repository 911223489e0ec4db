use std::collections::BTreeMap;

use async_trait::async_trait;
use futures::channel::mpsc;
use kampus_api::{
    store::SnapshotFeed, Collection, Document, DocumentId, Error, Fields, OrderBy, Snapshot,
    Store,
};
use parking_lot::Mutex;
use uuid::Uuid;

/// In-memory document store with the push semantics of the real one: every
/// subscriber gets the whole collection again after each write.
pub struct MockStore(Mutex<State>);

#[derive(Debug, Default)]
struct State {
    docs: BTreeMap<Collection, BTreeMap<DocumentId, Fields>>,
    feeds: Vec<Feed>,
    journal: Vec<Attempt>,
    available: bool,
}

#[derive(Debug)]
struct Feed {
    collection: Collection,
    order: OrderBy,
    sender: mpsc::UnboundedSender<Snapshot>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Write {
    Add(Collection, DocumentId),
    Update(Collection, DocumentId, Fields),
    Delete(Collection, DocumentId),
}

/// A write as seen by the store, whether or not it went through
#[derive(Clone, Debug, PartialEq)]
pub struct Attempt {
    pub write: Write,
    pub succeeded: bool,
}

/// Serialized form of the whole store, as read and written by `kampus-ctl`
#[derive(Clone, Debug, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct StoreDump {
    #[serde(default)]
    pub homework: BTreeMap<DocumentId, Fields>,
    #[serde(default)]
    pub posts: BTreeMap<DocumentId, Fields>,
}

impl State {
    fn snapshot(&self, collection: Collection, order: &OrderBy) -> Snapshot {
        let mut docs = self
            .docs
            .get(&collection)
            .into_iter()
            .flat_map(|docs| docs.iter())
            .map(|(id, fields)| Document {
                id: id.clone(),
                fields: fields.clone(),
            })
            .collect::<Vec<_>>();
        order.sort(&mut docs);
        docs
    }

    fn relay(&mut self, collection: Collection) {
        let mut feeds = std::mem::take(&mut self.feeds);
        feeds.retain(|f| {
            if f.collection != collection {
                return !f.sender.is_closed();
            }
            let snapshot = self.snapshot(collection, &f.order);
            matches!(f.sender.unbounded_send(snapshot), Ok(()))
        });
        self.feeds = feeds;
    }

    /// `applies` is false when the write targets something that is not there
    fn record(&mut self, write: Write, applies: bool) -> Result<(), Error> {
        let succeeded = self.available && applies;
        self.journal.push(Attempt { write, succeeded });
        match self.available {
            true => Ok(()),
            false => Err(Error::unavailable("mock store is offline")),
        }
    }
}

impl MockStore {
    pub fn new() -> MockStore {
        MockStore(Mutex::new(State {
            available: true,
            ..State::default()
        }))
    }

    pub fn from_dump(dump: StoreDump) -> MockStore {
        let store = MockStore::new();
        {
            let mut state = store.0.lock();
            state.docs.insert(Collection::Homework, dump.homework);
            state.docs.insert(Collection::Posts, dump.posts);
        }
        store
    }

    pub fn dump(&self) -> StoreDump {
        let state = self.0.lock();
        let get = |c: Collection| state.docs.get(&c).cloned().unwrap_or_default();
        StoreDump {
            homework: get(Collection::Homework),
            posts: get(Collection::Posts),
        }
    }

    /// While unavailable, every write fails with `StoreUnavailable`; feeds
    /// keep working
    pub fn set_available(&self, available: bool) {
        self.0.lock().available = available;
    }

    /// Insert a document under a chosen id, without going through the journal
    pub fn test_insert(&self, collection: Collection, id: &str, fields: Fields) -> DocumentId {
        let id = DocumentId(String::from(id));
        let mut state = self.0.lock();
        state
            .docs
            .entry(collection)
            .or_default()
            .insert(id.clone(), fields);
        state.relay(collection);
        id
    }

    pub fn test_get(&self, collection: Collection, id: &DocumentId) -> Option<Fields> {
        self.0
            .lock()
            .docs
            .get(&collection)
            .and_then(|docs| docs.get(id))
            .cloned()
    }

    /// Every write attempted so far, in order
    pub fn test_journal(&self) -> Vec<Attempt> {
        self.0.lock().journal.clone()
    }

    /// Number of delete attempts against this document
    pub fn test_delete_attempts(&self, collection: Collection, id: &DocumentId) -> usize {
        self.0
            .lock()
            .journal
            .iter()
            .filter(|a| a.write == Write::Delete(collection, id.clone()))
            .count()
    }

    /// Number of feeds on this collection that still have a listener
    pub fn test_num_feeds(&self, collection: Collection) -> usize {
        self.0
            .lock()
            .feeds
            .iter()
            .filter(|f| f.collection == collection && !f.sender.is_closed())
            .count()
    }
}

impl Default for MockStore {
    fn default() -> MockStore {
        MockStore::new()
    }
}

#[async_trait]
impl Store for MockStore {
    async fn subscribe(
        &self,
        collection: Collection,
        order: OrderBy,
    ) -> Result<SnapshotFeed, Error> {
        let mut state = self.0.lock();
        let (sender, receiver) = mpsc::unbounded();
        let initial = state.snapshot(collection, &order);
        sender
            .unbounded_send(initial)
            .expect("receiver is still in scope");
        state.feeds.push(Feed {
            collection,
            order,
            sender,
        });
        Ok(receiver)
    }

    async fn add(&self, collection: Collection, fields: Fields) -> Result<DocumentId, Error> {
        let mut state = self.0.lock();
        let id = DocumentId(Uuid::new_v4().simple().to_string());
        state.record(Write::Add(collection, id.clone()), true)?;
        state
            .docs
            .entry(collection)
            .or_default()
            .insert(id.clone(), fields);
        state.relay(collection);
        Ok(id)
    }

    async fn update(
        &self,
        collection: Collection,
        id: &DocumentId,
        fields: Fields,
    ) -> Result<(), Error> {
        let mut state = self.0.lock();
        let exists = state
            .docs
            .get(&collection)
            .map_or(false, |docs| docs.contains_key(id));
        let write = Write::Update(collection, id.clone(), fields.clone());
        state.record(write, exists)?;
        let doc = state
            .docs
            .get_mut(&collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| Error::not_found(format!("{collection}/{id}")))?;
        doc.extend(fields);
        state.relay(collection);
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: &DocumentId) -> Result<(), Error> {
        let mut state = self.0.lock();
        state.record(Write::Delete(collection, id.clone()), true)?;
        let existed = state
            .docs
            .get_mut(&collection)
            .and_then(|docs| docs.remove(id))
            .is_some();
        if existed {
            state.relay(collection);
        } else {
            tracing::debug!(%collection, %id, "deleting a document that is already gone");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use serde_json::json;

    use super::*;

    fn fields(v: serde_json::Value) -> Fields {
        v.as_object().cloned().unwrap()
    }

    fn ids(snapshot: &Snapshot) -> Vec<&str> {
        snapshot.iter().map(|d| d.id.0.as_str()).collect()
    }

    #[tokio::test]
    async fn feed_receives_ordered_snapshots() {
        let store = MockStore::new();
        store.test_insert(
            Collection::Posts,
            "old",
            fields(json!({ "createdAt": "2024-01-01T00:00:00Z" })),
        );
        let mut feed = store
            .subscribe(Collection::Posts, OrderBy::created_at_desc())
            .await
            .unwrap();
        assert_eq!(ids(&feed.next().await.unwrap()), vec!["old"]);

        let new = store
            .add(
                Collection::Posts,
                fields(json!({ "createdAt": "2024-02-01T00:00:00Z" })),
            )
            .await
            .unwrap();
        assert_eq!(
            ids(&feed.next().await.unwrap()),
            vec![new.0.as_str(), "old"]
        );
    }

    #[tokio::test]
    async fn writes_only_wake_their_collection() {
        let store = MockStore::new();
        let mut homework = store
            .subscribe(Collection::Homework, OrderBy::created_at_desc())
            .await
            .unwrap();
        homework.next().await.unwrap();
        store.add(Collection::Posts, Fields::new()).await.unwrap();
        assert!(
            homework.try_next().is_err(),
            "no snapshot should be pending"
        );
    }

    #[tokio::test]
    async fn update_merges_top_level_fields() {
        let store = MockStore::new();
        let id = store
            .add(Collection::Posts, fields(json!({ "likes": 1, "title": "t" })))
            .await
            .unwrap();
        store
            .update(Collection::Posts, &id, fields(json!({ "likes": 2 })))
            .await
            .unwrap();
        assert_eq!(
            store.test_get(Collection::Posts, &id).unwrap(),
            fields(json!({ "likes": 2, "title": "t" }))
        );

        let missing = DocumentId(String::from("missing"));
        assert!(matches!(
            store.update(Collection::Posts, &missing, Fields::new()).await,
            Err(Error::NotFound(_))
        ));
        let journal = store.test_journal();
        let succeeded = journal.iter().map(|a| a.succeeded).collect::<Vec<_>>();
        assert_eq!(succeeded, vec![true, true, false]);
        assert!(store.test_get(Collection::Posts, &missing).is_none());
    }

    #[tokio::test]
    async fn offline_writes_fail_and_are_journaled() {
        let store = MockStore::new();
        let id = store.test_insert(Collection::Homework, "h", Fields::new());
        store.set_available(false);
        assert!(matches!(
            store.delete(Collection::Homework, &id).await,
            Err(Error::StoreUnavailable(_))
        ));
        assert!(store.test_get(Collection::Homework, &id).is_some());
        store.set_available(true);
        store.delete(Collection::Homework, &id).await.unwrap();
        store.delete(Collection::Homework, &id).await.unwrap();
        assert_eq!(store.test_delete_attempts(Collection::Homework, &id), 3);
        let succeeded = store
            .test_journal()
            .iter()
            .map(|a| a.succeeded)
            .collect::<Vec<_>>();
        assert_eq!(succeeded, vec![false, true, true]);
    }

    #[tokio::test]
    async fn dropped_feeds_are_forgotten() {
        let store = MockStore::new();
        let feed = store
            .subscribe(Collection::Homework, OrderBy::created_at_desc())
            .await
            .unwrap();
        assert_eq!(store.test_num_feeds(Collection::Homework), 1);
        drop(feed);
        assert_eq!(store.test_num_feeds(Collection::Homework), 0);
        store.add(Collection::Homework, Fields::new()).await.unwrap();
        assert_eq!(store.0.lock().feeds.len(), 0);
    }

    #[test]
    fn dump_roundtrips_through_json() {
        let store = MockStore::new();
        store.test_insert(Collection::Homework, "h1", fields(json!({ "subject": "s" })));
        store.test_insert(Collection::Posts, "p1", fields(json!({ "title": "t" })));
        let json = serde_json::to_string(&store.dump()).unwrap();
        let reloaded = MockStore::from_dump(serde_json::from_str(&json).unwrap());
        assert_eq!(reloaded.dump(), store.dump());
    }
}
