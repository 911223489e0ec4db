use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;

use crate::{
    api::{
        Collection, CompletionFilter, Document, DocumentId, Error, Fields, HomeworkId,
        HomeworkItem, NewHomework, OrderBy, Store, Time, Viewer,
    },
    feed::{self, Feed},
};

/// What one snapshot delivery boils down to
#[derive(Clone, Debug, PartialEq)]
pub struct Sweep {
    /// Live items, in store order
    pub items: Vec<HomeworkItem>,

    /// Items more than a day past their deadline, to be deleted
    pub expired: Vec<HomeworkId>,
}

pub fn sweep(snapshot: &[Document], now: Time) -> Sweep {
    let mut items = Vec::with_capacity(snapshot.len());
    let mut expired = Vec::new();
    for doc in snapshot {
        // expiry needs nothing but the deadline
        let deadline = HomeworkItem::stored_deadline(&doc.fields);
        if deadline.map_or(false, |d| HomeworkItem::deadline_expired(d, now)) {
            expired.push(HomeworkId(doc.id.0.clone()));
            continue;
        }
        match doc.decode::<HomeworkItem>() {
            Ok(item) => items.push(item),
            Err(err) => tracing::warn!(?err, "skipping malformed homework document"),
        }
    }
    Sweep { items, expired }
}

/// The items `viewer` gets to see under `filter`, soonest deadline first
pub fn visible(
    items: &[HomeworkItem],
    viewer: &Viewer,
    filter: CompletionFilter,
) -> Vec<HomeworkItem> {
    let mut res = items
        .iter()
        .filter(|h| h.is_visible_to(&viewer.name))
        .filter(|h| filter.matches(h, &viewer.name))
        .filter(|h| h.subgroup.includes(viewer.subgroup))
        .cloned()
        .collect::<Vec<_>>();
    res.sort_by_key(|h| h.deadline);
    res
}

async fn delete_expired<S>(store: &S, expired: Vec<HomeworkId>)
where
    S: ?Sized + Store,
{
    // a failure here is retried on the next snapshot, which still carries the item
    for id in expired {
        match store
            .delete(Collection::Homework, &DocumentId::from(&id))
            .await
        {
            Ok(()) => tracing::info!(%id, "deleted expired homework"),
            Err(err) => tracing::error!(%id, ?err, "failed deleting expired homework"),
        }
    }
}

/// Live view of the homework collection, plus the operations acting on it
pub struct HomeworkBoard<S: ?Sized> {
    store: Arc<S>,
    items: watch::Receiver<Arc<Vec<HomeworkItem>>>,
    feed: Feed,
}

impl<S> HomeworkBoard<S>
where
    S: 'static + ?Sized + Store,
{
    pub async fn start(store: Arc<S>) -> Result<HomeworkBoard<S>, Error> {
        let snapshots = store
            .subscribe(Collection::Homework, OrderBy::created_at_desc())
            .await?;
        let (publish, items) = watch::channel(Arc::new(Vec::new()));
        let expirer = store.clone();
        let feed = Feed::spawn("homework", snapshots, move |snapshot| {
            let Sweep { items, expired } = sweep(&snapshot, Utc::now());
            tracing::debug!(
                num_items = items.len(),
                num_expired = expired.len(),
                "received homework snapshot"
            );
            publish.send_replace(Arc::new(items));
            let store = expirer.clone();
            async move { delete_expired(&*store, expired).await }
        });
        Ok(HomeworkBoard { store, items, feed })
    }

    /// Idempotent. The last published items stay readable.
    pub fn stop(&mut self) {
        self.feed.stop()
    }

    pub fn is_stopped(&self) -> bool {
        self.feed.is_stopped()
    }

    /// Every live item, in store order (newest first)
    pub fn items(&self) -> Arc<Vec<HomeworkItem>> {
        self.items.borrow().clone()
    }

    pub fn get(&self, id: &HomeworkId) -> Option<HomeworkItem> {
        self.items.borrow().iter().find(|h| h.id == *id).cloned()
    }

    pub fn visible(&self, viewer: &Viewer, filter: CompletionFilter) -> Vec<HomeworkItem> {
        visible(&self.items(), viewer, filter)
    }

    /// Waits for the next published list. `None` once the feed has ended.
    pub async fn next_update(&mut self) -> Option<Arc<Vec<HomeworkItem>>> {
        self.items.changed().await.ok()?;
        Some(self.items.borrow_and_update().clone())
    }

    /// Waits until the published list satisfies `pred`
    pub async fn wait_until<P>(&mut self, pred: P) -> Option<Arc<Vec<HomeworkItem>>>
    where
        P: FnMut(&Arc<Vec<HomeworkItem>>) -> bool,
    {
        feed::wait_until(&mut self.items, pred).await
    }

    pub async fn add(&self, homework: NewHomework) -> Result<HomeworkId, Error> {
        homework.validate()?;
        let subject = homework.subject.clone();
        match self
            .store
            .add(Collection::Homework, homework.into_fields(Utc::now()))
            .await
        {
            Ok(id) => {
                tracing::info!(%id, %subject, "added homework");
                Ok(HomeworkId(id.0))
            }
            Err(err) => {
                tracing::error!(?err, %subject, "failed adding homework");
                Err(err)
            }
        }
    }

    /// Flips whether `viewer` completed this item, rewriting the whole
    /// completion set. Concurrent toggles by others may be lost.
    pub async fn toggle_complete(&self, id: &HomeworkId, viewer: &Viewer) -> Result<(), Error> {
        let item = self
            .get(id)
            .ok_or_else(|| Error::not_found(format!("homework {id}")))?;
        let completed_by = item.toggled_completion(&viewer.name);
        let mut fields = Fields::new();
        fields.insert(String::from("completedBy"), serde_json::json!(completed_by));
        self.store
            .update(Collection::Homework, &DocumentId::from(id), fields)
            .await
            .map_err(|err| {
                tracing::error!(%id, ?err, "failed toggling homework completion");
                err
            })
    }

    /// Only whoever added the item may delete it
    pub async fn delete(&self, id: &HomeworkId, viewer: &Viewer) -> Result<(), Error> {
        let item = self
            .get(id)
            .ok_or_else(|| Error::not_found(format!("homework {id}")))?;
        if item.added_by != viewer.name {
            return Err(Error::PermissionDenied);
        }
        self.store
            .delete(Collection::Homework, &DocumentId::from(id))
            .await
            .map_err(|err| {
                tracing::error!(%id, ?err, "failed deleting homework");
                err
            })
    }
}
