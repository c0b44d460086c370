use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemoStats {
    pub hits: u64,
    pub misses: u64,
}

/// Single-slot cache: keeps the value computed for the most recent key.
#[derive(Debug)]
pub struct Memo<K, V> {
    name: &'static str,
    slot: Option<(K, Arc<V>)>,
    stats: MemoStats,
}

impl<K: PartialEq, V> Memo<K, V> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            slot: None,
            stats: MemoStats::default(),
        }
    }

    pub fn get_or_compute(&mut self, key: K, compute: impl FnOnce() -> V) -> Arc<V> {
        if let Some((cached_key, value)) = &self.slot {
            if *cached_key == key {
                self.stats.hits += 1;
                tracing::debug!(stage = self.name, "derived view cache hit");
                return Arc::clone(value);
            }
        }

        self.stats.misses += 1;
        tracing::debug!(stage = self.name, "derived view cache miss");
        let value = Arc::new(compute());
        self.slot = Some((key, Arc::clone(&value)));
        value
    }

    pub fn stats(&self) -> MemoStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recomputes_only_when_key_changes() {
        let mut memo = Memo::new("test");
        let mut calls = 0;

        let first = memo.get_or_compute(1, || {
            calls += 1;
            "one"
        });
        let again = memo.get_or_compute(1, || {
            calls += 1;
            "uno"
        });
        let second = memo.get_or_compute(2, || {
            calls += 1;
            "two"
        });

        assert_eq!(*first, "one");
        assert_eq!(*again, "one");
        assert_eq!(*second, "two");
        assert_eq!(calls, 2);
        assert_eq!(memo.stats(), MemoStats { hits: 1, misses: 2 });
    }
}
