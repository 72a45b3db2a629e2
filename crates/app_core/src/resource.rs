//! Cache of scaled image resources (textures, resized bitmaps)

/// Identifies one image at one on-screen size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScaleKey {
    pub image: u64,
    pub width: u32,
    pub height: u32,
}

impl ScaleKey {
    pub fn new(image: u64, width: f32, height: f32) -> Self {
        Self {
            image,
            width: width.round().max(1.0) as u32,
            height: height.round().max(1.0) as u32,
        }
    }
}

/// Simple LRU cache
struct LruCache<K, V> {
    capacity: usize,
    entries: Vec<(K, V, usize)>, // key, value, access_order
    order_counter: usize,
}

impl<K: Eq + Clone, V> LruCache<K, V> {
    fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Vec::with_capacity(capacity),
            order_counter: 0,
        }
    }

    /// Mark `key` as most recently used and return its slot
    fn touch(&mut self, key: &K) -> Option<usize> {
        let idx = self.entries.iter().position(|(k, _, _)| k == key)?;
        self.order_counter += 1;
        self.entries[idx].2 = self.order_counter;
        Some(idx)
    }

    /// Insert a new key, evicting the least recently used entry when full
    fn insert(&mut self, key: K, value: V) -> usize {
        self.order_counter += 1;

        if let Some(idx) = self.entries.iter().position(|(k, _, _)| k == &key) {
            self.entries[idx].1 = value;
            self.entries[idx].2 = self.order_counter;
            return idx;
        }

        if self.entries.len() >= self.capacity {
            if let Some((idx, _)) = self
                .entries
                .iter()
                .enumerate()
                .min_by_key(|(_, (_, _, order))| order)
            {
                self.entries.remove(idx);
            }
        }

        self.entries.push((key, value, self.order_counter));
        self.entries.len() - 1
    }

    fn value_at(&self, idx: usize) -> &V {
        &self.entries[idx].1
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.order_counter = 0;
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Per-session cache keyed by (image, target size).
///
/// Everything is dropped on viewport resize, since every target size changes.
pub struct ScaleCache<V> {
    entries: LruCache<ScaleKey, V>,
    viewport: Option<(u32, u32)>,
    hits: u64,
    misses: u64,
}

impl<V> ScaleCache<V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: LruCache::new(capacity),
            viewport: None,
            hits: 0,
            misses: 0,
        }
    }

    /// Record the current viewport; clears the cache if it changed
    pub fn set_viewport(&mut self, width: f32, height: f32) -> bool {
        let size = (width.round() as u32, height.round() as u32);
        if self.viewport == Some(size) {
            return false;
        }
        if self.viewport.is_some() {
            tracing::debug!(
                "Viewport resized to {}x{}, dropping {} scaled resources",
                size.0,
                size.1,
                self.entries.len()
            );
        }
        self.entries.clear();
        self.viewport = Some(size);
        true
    }

    /// Fetch a cached resource or build it with `make`
    pub fn get_or_insert_with<E>(
        &mut self,
        key: ScaleKey,
        make: impl FnOnce(ScaleKey) -> Result<V, E>,
    ) -> Result<&V, E> {
        let idx = match self.entries.touch(&key) {
            Some(idx) => {
                self.hits += 1;
                idx
            }
            None => {
                self.misses += 1;
                let value = make(key)?;
                self.entries.insert(key, value)
            }
        };
        Ok(self.entries.value_at(idx))
    }

    pub fn invalidate_all(&mut self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits,
            misses: self.misses,
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}
