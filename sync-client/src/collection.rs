//! Synced collections.
//!
//! A [`SyncedCollection`] is an ordered, sparse list of entities bound to a
//! server resource. Structural mutations (`add`, `remove`, `move_items`) are
//! applied locally at once and recorded in the collection's [`ChangeQueue`]
//! for delivery. Pages of identifiers fetched from the server fill positions
//! without being recorded.

use changeq_sync_core::{SparseError, SparseList, SyncOptions, SyncTarget};
use changeq_sync_types::{
    ChangeRecord, Method, PageResponse, SyncError, SyncFailure,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::sync::Arc;
use thiserror::Error;

use crate::config::{ClientConfig, PageConfig};
use crate::emitter::ListenerId;
use crate::queue::{ChangeQueue, FlushSummary, ItemId, QueueEvent};
use crate::syncer::Syncer;
use crate::transport::HttpTransport;

/// Collection errors.
#[derive(Debug, Error)]
pub enum CollectionError {
    /// The collection was destroyed and accepts no more mutations.
    #[error("collection has been destroyed")]
    Destroyed,

    /// A positional argument did not fit the local list.
    #[error(transparent)]
    Range(#[from] SparseError),

    /// A page response could not be parsed.
    #[error("invalid page response: {0}")]
    Page(#[from] SyncError),

    /// The transaction failed.
    #[error("sync failed: {0}")]
    Sync(#[from] SyncFailure),
}

/// Source of entities for identifiers received in page responses.
pub trait EntityRepository<Id, E> {
    /// The entity for `id`, if known.
    fn resolve(&self, id: &Id) -> Option<E>;
}

impl<Id, E, S> EntityRepository<Id, E> for HashMap<Id, E, S>
where
    Id: Eq + Hash,
    E: Clone,
    S: BuildHasher,
{
    fn resolve(&self, id: &Id) -> Option<E> {
        self.get(id).cloned()
    }
}

/// How a mutation is observed by the change queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MutationOptions {
    /// Apply locally without recording.
    pub silent: bool,
    /// Half of a move that is recorded separately.
    pub moving: bool,
}

impl MutationOptions {
    /// A mutation that is not recorded.
    pub fn silent() -> Self {
        Self {
            silent: true,
            ..Self::default()
        }
    }

    /// The remove or add half of a move.
    pub fn moving() -> Self {
        Self {
            moving: true,
            ..Self::default()
        }
    }

    fn records(self) -> bool {
        !self.silent && !self.moving
    }
}

type IdFn<E, Id> = Box<dyn Fn(&E) -> Id + Send + Sync>;

/// Ordered, sparse entity list whose structure is synced to `url`.
pub struct SyncedCollection<E, Id, T: HttpTransport> {
    url: String,
    items: SparseList<E>,
    id_of: IdFn<E, Id>,
    queue: ChangeQueue<Id, T>,
    page: PageConfig,
    destroyed: bool,
}

impl<E, Id, T> SyncedCollection<E, Id, T>
where
    Id: ItemId + DeserializeOwned,
    T: HttpTransport + 'static,
{
    /// An empty collection at `url`.
    ///
    /// `id_of` extracts the identifier recorded for an entity.
    pub fn new(
        syncer: Arc<Syncer<T>>,
        url: impl Into<String>,
        config: &ClientConfig,
        id_of: impl Fn(&E) -> Id + Send + Sync + 'static,
    ) -> Self {
        let url = url.into();
        Self {
            queue: ChangeQueue::new(syncer, url.clone(), config.queue.clone()),
            url,
            items: SparseList::new(),
            id_of: Box::new(id_of),
            page: config.page.clone(),
            destroyed: false,
        }
    }

    fn ensure_alive(&self) -> Result<(), CollectionError> {
        if self.destroyed {
            return Err(CollectionError::Destroyed);
        }
        Ok(())
    }

    /// Insert `items` at `at` (position 0 when `None`).
    ///
    /// Returns the insertion index, clamped to the local count.
    pub fn add(
        &mut self,
        items: Vec<E>,
        at: Option<usize>,
        options: MutationOptions,
    ) -> Result<usize, CollectionError> {
        self.ensure_alive()?;
        let ids: Vec<Id> = items.iter().map(|item| (self.id_of)(item)).collect();
        let index = self.items.insert(at.unwrap_or(0), items);
        if options.records() && !ids.is_empty() {
            self.queue.record(ChangeRecord::add(ids, index));
        }
        Ok(index)
    }

    /// Append `items` after the last local position.
    pub fn push(&mut self, items: Vec<E>, options: MutationOptions) -> Result<usize, CollectionError> {
        let end = self.items.count();
        self.add(items, Some(end), options)
    }

    /// Remove `len` positions starting at `at`, returning the loaded items.
    ///
    /// Holes in the range are removed too but carry no identifier.
    pub fn remove(
        &mut self,
        at: usize,
        len: usize,
        options: MutationOptions,
    ) -> Result<Vec<E>, CollectionError> {
        self.ensure_alive()?;
        let removed: Vec<E> = self.items.remove(at, len)?.into_iter().flatten().collect();
        let ids: Vec<Id> = removed.iter().map(|item| (self.id_of)(item)).collect();
        if options.records() && !ids.is_empty() {
            self.queue.record(ChangeRecord::remove(ids, at));
        }
        Ok(removed)
    }

    /// Remove the loaded entity whose identifier is `id`.
    pub fn remove_item(
        &mut self,
        id: &Id,
        options: MutationOptions,
    ) -> Result<Option<E>, CollectionError> {
        self.ensure_alive()?;
        let Some(index) = self.position_of(id) else {
            return Ok(None);
        };
        Ok(self.remove(index, 1, options)?.pop())
    }

    /// Move `len` positions starting at `from` so they start at `to`.
    ///
    /// `to` indexes the list with the range taken out. Returns the actual
    /// destination.
    pub fn move_items(
        &mut self,
        from: usize,
        len: usize,
        to: usize,
        options: MutationOptions,
    ) -> Result<usize, CollectionError> {
        self.ensure_alive()?;
        let ids: Vec<Id> = self
            .items
            .checked_range(from, len)?
            .filter_map(|i| self.items.get(i))
            .map(|item| (self.id_of)(item))
            .collect();
        let dest = self.items.move_range(from, len, to)?;
        if !options.silent && !ids.is_empty() {
            self.queue.record(ChangeRecord::moved(ids, dest));
        }
        Ok(dest)
    }

    /// Fill positions from a page response body.
    ///
    /// Identifiers unknown to `repository` leave their positions as they
    /// were. Nothing is recorded. A page starting past both the local count
    /// and the known total item count is rejected.
    pub fn parse_page<R>(
        &mut self,
        body: &Value,
        repository: &R,
    ) -> Result<PageResponse<Id>, CollectionError>
    where
        R: EntityRepository<Id, E> + ?Sized,
    {
        self.ensure_alive()?;
        let page: PageResponse<Id> =
            PageResponse::from_value(body, &self.page.ids_key, &self.page.total_key)?;
        let limit = self.items.count().max(self.items.total_item_count());
        if page.offset > limit {
            return Err(SyncError::InvalidData(format!(
                "page offset {} past collection end {}",
                page.offset, limit
            ))
            .into());
        }

        let resolved: Vec<Option<E>> = page.ids.iter().map(|id| repository.resolve(id)).collect();
        let missing = resolved.iter().filter(|e| e.is_none()).count();
        if missing > 0 {
            tracing::debug!("{} id(s) in page at {} not in repository", missing, page.offset);
        }
        self.items.fill_partial(page.offset, resolved)?;
        if let Some(total) = page.total {
            self.items.set_total_item_count(total);
        }
        Ok(page)
    }

    /// Fetch and apply the page starting at `offset`.
    pub async fn fetch_page<R>(
        &mut self,
        offset: usize,
        repository: &R,
    ) -> Result<PageResponse<Id>, CollectionError>
    where
        R: EntityRepository<Id, E> + ?Sized,
    {
        self.ensure_alive()?;
        let options = SyncOptions::new()
            .with_body(json!({"offset": offset, "limit": self.page.page_size}));
        let syncer = Arc::clone(self.queue.syncer());
        let success = syncer.sync(Method::Read, &*self, options).await?;
        let body = success
            .data
            .ok_or_else(|| SyncError::InvalidData("empty page response".into()))?;
        self.parse_page(&body, repository)
    }

    /// Fetch the page starting at the first unloaded position.
    pub async fn fetch_next_page<R>(
        &mut self,
        repository: &R,
    ) -> Result<PageResponse<Id>, CollectionError>
    where
        R: EntityRepository<Id, E> + ?Sized,
    {
        let offset = self.items.next_unloaded(0);
        self.fetch_page(offset, repository).await
    }

    /// Flush recorded changes now.
    pub async fn flush(&self) -> Result<FlushSummary, CollectionError> {
        self.ensure_alive()?;
        Ok(self.queue.flush().await?)
    }

    /// Drop pending changes and listeners without flushing.
    ///
    /// Later mutations fail with [`CollectionError::Destroyed`].
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        let dropped = self.queue.len();
        self.queue.discard();
        tracing::debug!("collection {} destroyed, {} change(s) dropped", self.url, dropped);
    }

    /// Whether [`destroy`](Self::destroy) was called.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Listen to change queue signals.
    pub fn on(&self, listener: impl Fn(&QueueEvent<Id>) + Send + Sync + 'static) -> ListenerId {
        self.queue.on(listener)
    }

    /// Stop listening.
    pub fn off(&self, id: ListenerId) -> bool {
        self.queue.off(id)
    }

    /// The change queue.
    pub fn queue(&self) -> &ChangeQueue<Id, T> {
        &self.queue
    }

    /// Entity at `index`, if loaded.
    pub fn get(&self, index: usize) -> Option<&E> {
        self.items.get(index)
    }

    /// Identifiers by position, `None` for holes.
    pub fn ids(&self) -> Vec<Option<Id>> {
        self.items
            .iter()
            .map(|slot| slot.map(|item| (self.id_of)(item)))
            .collect()
    }

    fn position_of(&self, id: &Id) -> Option<usize> {
        self.items
            .loaded()
            .find(|(_, item)| (self.id_of)(item) == *id)
            .map(|(index, _)| index)
    }

    /// Number of local positions, holes included.
    pub fn count(&self) -> usize {
        self.items.count()
    }

    /// Server-reported size.
    pub fn total_item_count(&self) -> usize {
        self.items.total_item_count()
    }

    /// Whether the server holds positions not fetched yet.
    pub fn has_more_items(&self) -> bool {
        self.items.has_more_items()
    }
}

impl<E, Id, T> SyncTarget for SyncedCollection<E, Id, T>
where
    Id: ItemId + DeserializeOwned,
    T: HttpTransport + 'static,
{
    fn url(&self) -> String {
        self.url.clone()
    }

    fn serialize(&self) -> Value {
        let ids: Vec<Id> = self.items.loaded().map(|(_, item)| (self.id_of)(item)).collect();
        serde_json::to_value(ids).unwrap_or(Value::Null)
    }

    fn is_new(&self) -> bool {
        false
    }
}

impl<E, Id, T: HttpTransport> fmt::Debug for SyncedCollection<E, Id, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncedCollection")
            .field("url", &self.url)
            .field("count", &self.items.count())
            .field("total", &self.items.total_item_count())
            .field("destroyed", &self.destroyed)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QueueConfig;
    use crate::transport::{MockTransport, TransportError};
    use changeq_sync_types::{ChangeAction, StatusText, Verb};
    use parking_lot::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    struct Photo {
        id: u64,
        title: String,
    }

    fn photo(id: u64) -> Photo {
        Photo {
            id,
            title: format!("photo {id}"),
        }
    }

    type Album = SyncedCollection<Photo, u64, MockTransport>;

    fn album() -> (Album, MockTransport) {
        let transport = MockTransport::new();
        let syncer = Arc::new(Syncer::new(transport.clone()));
        let config = ClientConfig {
            queue: QueueConfig::default().with_auto_sync(false),
            ..ClientConfig::default()
        };
        let album = SyncedCollection::new(syncer, "/albums/1/photos", &config, |p: &Photo| p.id);
        (album, transport)
    }

    fn repository(ids: &[u64]) -> HashMap<u64, Photo> {
        ids.iter().map(|&id| (id, photo(id))).collect()
    }

    fn actions(album: &Album) -> Vec<ChangeAction> {
        album.queue().records().iter().map(|r| r.action).collect()
    }

    // ===========================================
    // Recording mutations
    // ===========================================

    #[test]
    fn add_move_remove_records_three_changes_in_order() {
        let (mut album, _transport) = album();

        album
            .add(vec![photo(100), photo(101)], Some(0), MutationOptions::default())
            .unwrap();
        album.move_items(1, 1, 0, MutationOptions::default()).unwrap();
        album.remove(0, 1, MutationOptions::default()).unwrap();

        let records = album.queue().records();
        assert_eq!(records.len(), 3);
        assert_eq!(
            actions(&album),
            vec![ChangeAction::Add, ChangeAction::Move, ChangeAction::Remove]
        );
        assert_eq!(records[0], ChangeRecord::add(vec![100, 101], 0));
        assert_eq!(records[1], ChangeRecord::moved(vec![101], 0));
        assert_eq!(records[2], ChangeRecord::remove(vec![101], 0));
        assert_eq!(album.ids(), vec![Some(100)]);
    }

    #[test]
    fn add_without_index_inserts_at_front() {
        let (mut album, _transport) = album();
        album.push(vec![photo(1)], MutationOptions::silent()).unwrap();

        let at = album.add(vec![photo(2)], None, MutationOptions::default()).unwrap();

        assert_eq!(at, 0);
        assert_eq!(album.ids(), vec![Some(2), Some(1)]);
        assert_eq!(album.queue().records(), vec![ChangeRecord::add(vec![2], 0)]);
    }

    #[test]
    fn push_records_actual_index() {
        let (mut album, _transport) = album();
        album.push(vec![photo(1), photo(2)], MutationOptions::default()).unwrap();
        album.push(vec![photo(3)], MutationOptions::default()).unwrap();

        let records = album.queue().records();
        assert_eq!(records[1], ChangeRecord::add(vec![3], 2));
    }

    #[test]
    fn silent_and_moving_mutations_are_not_recorded() {
        let (mut album, _transport) = album();

        album.add(vec![photo(1), photo(2)], None, MutationOptions::silent()).unwrap();
        album.remove(0, 1, MutationOptions::moving()).unwrap();
        album.add(vec![photo(1)], Some(1), MutationOptions::moving()).unwrap();
        album.move_items(0, 1, 1, MutationOptions::silent()).unwrap();

        assert!(album.queue().is_empty());
        assert_eq!(album.ids(), vec![Some(1), Some(2)]);
    }

    #[test]
    fn remove_item_by_id() {
        let (mut album, _transport) = album();
        album
            .push(vec![photo(1), photo(2), photo(3)], MutationOptions::silent())
            .unwrap();

        let removed = album.remove_item(&2, MutationOptions::default()).unwrap();

        assert_eq!(removed, Some(photo(2)));
        assert_eq!(album.queue().records(), vec![ChangeRecord::remove(vec![2], 1)]);
        assert_eq!(album.remove_item(&9, MutationOptions::default()).unwrap(), None);
    }

    #[test]
    fn out_of_range_remove_is_error() {
        let (mut album, _transport) = album();
        album.push(vec![photo(1)], MutationOptions::silent()).unwrap();

        let err = album.remove(0, 3, MutationOptions::default()).unwrap_err();

        assert!(matches!(err, CollectionError::Range(SparseError::OutOfRange { .. })));
        assert_eq!(album.count(), 1);
        assert!(album.queue().is_empty());
    }

    // ===========================================
    // Pages
    // ===========================================

    #[test]
    fn parse_page_fills_only_its_range() {
        let (mut album, _transport) = album();
        let repo = repository(&[1, 2, 3, 20, 21]);

        album
            .parse_page(&json!({"offset": 0, "itemIds": [1, 2, 3], "totalItemCount": 30}), &repo)
            .unwrap();
        album
            .parse_page(&json!({"offset": 20, "itemIds": [20, 21]}), &repo)
            .unwrap();

        assert_eq!(album.count(), 22);
        assert_eq!(album.total_item_count(), 30);
        assert!(album.has_more_items());
        assert_eq!(album.get(2), Some(&photo(3)));
        assert_eq!(album.get(10), None);
        assert_eq!(album.get(21), Some(&photo(21)));
        assert!(album.queue().is_empty());
    }

    #[test]
    fn parse_page_skips_unknown_ids() {
        let (mut album, _transport) = album();
        album
            .parse_page(&json!({"offset": 0, "itemIds": [1, 7]}), &repository(&[1]))
            .unwrap();

        assert_eq!(album.ids(), vec![Some(1), None]);
        assert!(!album.has_more_items());
    }

    #[test]
    fn parse_page_rejects_missing_offset() {
        let (mut album, _transport) = album();
        let err = album
            .parse_page(&json!({"itemIds": [1]}), &repository(&[1]))
            .unwrap_err();
        assert!(matches!(err, CollectionError::Page(_)));
    }

    #[test]
    fn parse_page_rejects_offsets_past_the_end() {
        let (mut album, _transport) = album();
        let repo = repository(&[1]);

        for offset in [json!(u64::MAX), json!(1_000_000_000_000u64)] {
            let err = album
                .parse_page(&json!({"offset": offset, "itemIds": [1]}), &repo)
                .unwrap_err();
            assert!(matches!(err, CollectionError::Page(SyncError::InvalidData(_))));
        }
        assert_eq!(album.count(), 0);
        assert_eq!(album.total_item_count(), 0);
    }

    #[test]
    fn overflowing_move_is_out_of_range() {
        let (mut album, _transport) = album();
        album.push(vec![photo(1), photo(2)], MutationOptions::silent()).unwrap();

        let err = album
            .move_items(1, usize::MAX, 0, MutationOptions::default())
            .unwrap_err();

        assert!(matches!(err, CollectionError::Range(SparseError::OutOfRange { .. })));
        assert_eq!(album.ids(), vec![Some(1), Some(2)]);
        assert!(album.queue().is_empty());
    }

    #[tokio::test]
    async fn fetch_page_reads_with_offset_and_limit() {
        let (mut album, transport) = album();
        transport.queue_json(
            200,
            json!({"offset": 0, "itemIds": [1, 2], "totalItemCount": 4}),
        );

        let page = album.fetch_page(0, &repository(&[1, 2])).await.unwrap();

        assert_eq!(page.ids, vec![1, 2]);
        let sent = transport.last_sent().unwrap();
        assert_eq!(sent.verb, Verb::Get);
        assert_eq!(sent.url, "/albums/1/photos");
        assert!(sent.process_data);
        assert_eq!(sent.body_json(), Some(json!({"offset": 0, "limit": 50})));
        assert!(album.has_more_items());
    }

    #[tokio::test]
    async fn fetch_next_page_starts_at_first_hole() {
        let (mut album, transport) = album();
        album
            .parse_page(&json!({"offset": 0, "itemIds": [1, 2], "totalItemCount": 4}), &repository(&[1, 2]))
            .unwrap();
        transport.queue_json(200, json!({"offset": 2, "itemIds": [3, 4]}));

        album.fetch_next_page(&repository(&[3, 4])).await.unwrap();

        assert_eq!(
            transport.last_sent().unwrap().body_json().unwrap()["offset"],
            json!(2)
        );
        assert_eq!(album.count(), 4);
        assert!(!album.has_more_items());
    }

    #[tokio::test]
    async fn failed_fetch_leaves_items_untouched() {
        let (mut album, transport) = album();
        album.push(vec![photo(1)], MutationOptions::silent()).unwrap();
        transport.queue_error(TransportError::Timeout);

        let err = album.fetch_page(0, &repository(&[])).await.unwrap_err();

        assert!(matches!(err, CollectionError::Sync(ref f) if f.status == StatusText::Timeout));
        assert_eq!(album.ids(), vec![Some(1)]);
    }

    #[tokio::test]
    async fn empty_page_body_is_invalid() {
        let (mut album, _transport) = album();
        let err = album.fetch_page(0, &repository(&[])).await.unwrap_err();
        assert!(matches!(err, CollectionError::Page(SyncError::InvalidData(_))));
    }

    // ===========================================
    // Flush and destroy
    // ===========================================

    #[tokio::test]
    async fn flush_sends_recorded_changes() {
        let (mut album, transport) = album();
        album.push(vec![photo(5)], MutationOptions::default()).unwrap();

        let summary = album.flush().await.unwrap();

        assert_eq!(summary.records, 1);
        assert_eq!(transport.last_sent().unwrap().verb, Verb::Put);
        assert!(album.queue().is_empty());
    }

    #[tokio::test]
    async fn failed_flush_keeps_local_contents() {
        let (mut album, transport) = album();
        album.push(vec![photo(5), photo(6)], MutationOptions::default()).unwrap();
        transport.queue_error(TransportError::ConnectionFailed("down".into()));

        assert!(album.flush().await.is_err());
        assert_eq!(album.ids(), vec![Some(5), Some(6)]);
        assert_eq!(album.queue().len(), 1);
    }

    #[test]
    fn destroy_drops_changes_and_rejects_mutations() {
        let (mut album, transport) = album();
        let seen = Arc::new(Mutex::new(0usize));
        let sink = Arc::clone(&seen);
        album.on(move |_| *sink.lock() += 1);
        album.push(vec![photo(1)], MutationOptions::default()).unwrap();

        album.destroy();

        assert!(album.is_destroyed());
        assert!(album.queue().is_empty());
        assert!(matches!(
            album.push(vec![photo(2)], MutationOptions::default()),
            Err(CollectionError::Destroyed)
        ));
        assert_eq!(*seen.lock(), 1);
        assert_eq!(transport.request_count(), 0);
    }

    #[test]
    fn serializes_loaded_ids() {
        let (mut album, _transport) = album();
        let repo = repository(&[8, 9]);
        album
            .parse_page(&json!({"offset": 0, "itemIds": [7], "totalItemCount": 3}), &repo)
            .unwrap();
        album
            .parse_page(&json!({"offset": 1, "itemIds": [8, 9]}), &repo)
            .unwrap();

        assert_eq!(album.serialize(), json!([8, 9]));
        assert!(!album.is_new());
        assert_eq!(SyncTarget::url(&album), "/albums/1/photos");
    }
}
