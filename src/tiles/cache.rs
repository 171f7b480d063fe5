use super::loader::{TileFetcher, TileImage};
use super::source::TileSource;
use crate::core::geo::TileCoord;
use crate::prelude::Arc;
use crate::runtime;
use futures::future::{self, BoxFuture, FutureExt, Shared};
use fxhash::FxBuildHasher;
use lru::LruCache;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, Weak};

/// Future resolving to a tile image, or `None` if the fetch failed
pub type TileLoad = BoxFuture<'static, Option<TileImage>>;

type SharedLoad = Shared<TileLoad>;

/// Public view of a cache entry
#[derive(Debug, Clone)]
pub enum TileEntry {
    Pending,
    Ready(TileImage),
    Failed,
}

impl TileEntry {
    pub fn is_ready(&self) -> bool {
        matches!(self, TileEntry::Ready(_))
    }

    pub fn image(&self) -> Option<&TileImage> {
        match self {
            TileEntry::Ready(image) => Some(image),
            _ => None,
        }
    }
}

/// Counts of entries by state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub pending: usize,
    pub ready: usize,
    pub failed: usize,
}

enum Slot {
    /// `id` identifies the fetch so a completion never overwrites an entry
    /// that was cleared and re-requested in the meantime
    Pending { id: u64, load: SharedLoad },
    Ready(TileImage),
    Failed,
}

impl Slot {
    fn is_pending(&self) -> bool {
        matches!(self, Slot::Pending { .. })
    }

    fn view(&self) -> TileEntry {
        match self {
            Slot::Pending { .. } => TileEntry::Pending,
            Slot::Ready(image) => TileEntry::Ready(image.clone()),
            Slot::Failed => TileEntry::Failed,
        }
    }
}

struct CacheState {
    entries: LruCache<TileCoord, Slot, FxBuildHasher>,
    capacity: Option<NonZeroUsize>,
    next_load_id: u64,
}

impl CacheState {
    /// Evicts least recently used settled entries until the bound holds.
    /// Pending entries are skipped: dropping one would allow a second fetch.
    fn enforce_capacity(&mut self) {
        let Some(capacity) = self.capacity else {
            return;
        };
        while self.entries.len() > capacity.get() {
            let victim = self
                .entries
                .iter()
                .rev()
                .find(|(_, slot)| !slot.is_pending())
                .map(|(key, _)| *key);
            match victim {
                Some(key) => {
                    log::trace!("evicting tile {}", key);
                    self.entries.pop(&key);
                }
                None => break,
            }
        }
    }
}

/// Memoizing tile store with single-flight fetches and ancestor fallback.
///
/// Cloning yields another handle to the same entries. Entries move
/// Pending → Ready or Pending → Failed and never regress; a Failed tile is
/// not retried unless [`TileCache::forget`] or [`TileCache::clear`] drops it.
#[derive(Clone)]
pub struct TileCache {
    state: Arc<Mutex<CacheState>>,
    fetcher: Arc<dyn TileFetcher>,
    min_zoom: u8,
}

impl TileCache {
    /// Creates an unbounded cache; entries are never evicted
    pub fn new(min_zoom: u8, fetcher: Arc<dyn TileFetcher>) -> Self {
        Self::build(min_zoom, fetcher, None)
    }

    /// Creates a cache holding at most `capacity` settled entries, evicting
    /// the least recently used first
    pub fn with_capacity(min_zoom: u8, fetcher: Arc<dyn TileFetcher>, capacity: usize) -> Self {
        Self::build(min_zoom, fetcher, NonZeroUsize::new(capacity))
    }

    fn build(min_zoom: u8, fetcher: Arc<dyn TileFetcher>, capacity: Option<NonZeroUsize>) -> Self {
        Self {
            state: Arc::new(Mutex::new(CacheState {
                entries: LruCache::unbounded_with_hasher(FxBuildHasher::default()),
                capacity,
                next_load_id: 0,
            })),
            fetcher,
            min_zoom,
        }
    }

    pub fn min_zoom(&self) -> u8 {
        self.min_zoom
    }

    /// Synchronous lookup without side effects
    pub fn get(&self, key: TileCoord) -> Option<TileEntry> {
        self.lock().entries.peek(&key).map(Slot::view)
    }

    /// Returns the tile for `key`, starting a fetch only if no entry exists.
    ///
    /// The fetch is spawned on the installed runtime before this returns, so
    /// the entry settles even if every returned future is dropped. Concurrent
    /// callers for the same key share that one fetch.
    pub fn request(&self, key: TileCoord, source: &dyn TileSource) -> TileLoad {
        let load = {
            let mut state = self.lock();
            match state.entries.get(&key) {
                Some(Slot::Ready(image)) => return future::ready(Some(image.clone())).boxed(),
                Some(Slot::Failed) => return future::ready(None).boxed(),
                Some(Slot::Pending { load, .. }) => return load.clone().boxed(),
                None => {}
            }
            self.begin_load(&mut state, key, source)
        };

        // Spawned outside the lock: an inline spawner settles the entry
        // before returning
        runtime::spawn(load.clone().map(|_| ()));
        load.boxed()
    }

    fn begin_load(
        &self,
        state: &mut CacheState,
        key: TileCoord,
        source: &dyn TileSource,
    ) -> SharedLoad {
        let id = state.next_load_id;
        state.next_load_id += 1;

        let url = source.url(key);
        let fetcher = Arc::clone(&self.fetcher);
        let weak_state = Arc::downgrade(&self.state);
        let load: SharedLoad = async move {
            let image = match fetcher.fetch(key, &url).await {
                Ok(image) => Some(image),
                Err(e) => {
                    log::warn!("failed to load tile {} from {}: {}", key, url, e);
                    None
                }
            };
            settle(&weak_state, key, id, image.clone());
            image
        }
        .boxed()
        .shared();

        state.entries.put(
            key,
            Slot::Pending {
                id,
                load: load.clone(),
            },
        );
        state.enforce_capacity();
        load
    }

    /// Nearest Ready tile covering `key`: the tile itself or an ancestor no
    /// coarser than the minimum zoom. Returns the image and the key it
    /// belongs to.
    pub fn find_best_available(&self, key: TileCoord) -> Option<(TileImage, TileCoord)> {
        let mut state = self.lock();
        let mut current = Some(key);
        while let Some(coord) = current {
            if coord.z < self.min_zoom {
                break;
            }
            if let Some(Slot::Ready(image)) = state.entries.get(&coord) {
                return Some((image.clone(), coord));
            }
            current = coord.parent();
        }
        None
    }

    /// Drops every entry. In-flight fetches finish but are not recorded.
    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    /// Drops one entry so the next request fetches it again
    pub fn forget(&self, key: TileCoord) -> Option<TileEntry> {
        self.lock().entries.pop(&key).map(|slot| slot.view())
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.lock();
        let mut stats = CacheStats::default();
        for (_, slot) in state.entries.iter() {
            match slot {
                Slot::Pending { .. } => stats.pending += 1,
                Slot::Ready(_) => stats.ready += 1,
                Slot::Failed => stats.failed += 1,
            }
        }
        stats
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Configured bound, `None` when unbounded
    pub fn capacity(&self) -> Option<usize> {
        self.lock().capacity.map(NonZeroUsize::get)
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        lock_state(&self.state)
    }
}

impl fmt::Debug for TileCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TileCache")
            .field("min_zoom", &self.min_zoom)
            .field("stats", &self.stats())
            .finish()
    }
}

fn lock_state(state: &Mutex<CacheState>) -> MutexGuard<'_, CacheState> {
    match state.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Records the outcome of fetch `id`, unless its entry is gone or belongs to
/// a newer fetch
fn settle(state: &Weak<Mutex<CacheState>>, key: TileCoord, id: u64, image: Option<TileImage>) {
    let Some(state) = state.upgrade() else {
        return;
    };
    let mut state = lock_state(&state);
    let Some(slot) = state.entries.get_mut(&key) else {
        log::trace!("tile {} settled after its entry was dropped", key);
        return;
    };
    if !matches!(slot, Slot::Pending { id: pending, .. } if *pending == id) {
        return;
    }
    *slot = match image {
        Some(image) => Slot::Ready(image),
        None => Slot::Failed,
    };
    state.enforce_capacity();
}
