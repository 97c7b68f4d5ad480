//! Memory pool for record allocations
//!
//! Provides object pooling for records to keep the steady-state
//! acquire/release path allocation-free. The pool grows on demand and never
//! shrinks; released records are cleared before they are retained.

use crate::record::Record;

/// Configuration for the record pool
#[derive(Debug, Clone)]
pub struct RecordPoolConfig {
    /// Number of records pre-allocated at construction
    pub capacity: usize,
    /// Whether pooling is enabled
    pub enabled: bool,
}

impl Default for RecordPoolConfig {
    fn default() -> Self {
        RecordPoolConfig {
            capacity: 256,
            enabled: true,
        }
    }
}

impl RecordPoolConfig {
    /// Create a new pool configuration
    pub fn new(capacity: usize) -> Self {
        RecordPoolConfig {
            capacity,
            enabled: true,
        }
    }

    /// Disable pooling (for debugging)
    pub fn disabled() -> Self {
        RecordPoolConfig {
            capacity: 0,
            enabled: false,
        }
    }
}

/// Memory pool for record allocations
#[derive(Debug)]
pub struct RecordPool {
    free: Vec<Record>,
    config: RecordPoolConfig,
    allocated: usize,
    acquired: usize,
}

impl Default for RecordPool {
    fn default() -> Self {
        RecordPool::new(RecordPoolConfig::default())
    }
}

impl RecordPool {
    /// Create a new record pool with the given configuration
    pub fn new(config: RecordPoolConfig) -> Self {
        let capacity = if config.enabled { config.capacity } else { 0 };
        let mut free = Vec::with_capacity(capacity);
        for _ in 0..capacity {
            free.push(Record::new());
        }

        RecordPool {
            free,
            config,
            allocated: capacity,
            acquired: 0,
        }
    }

    /// Acquire a cleared record from the pool
    ///
    /// If the free list is empty, allocates a new record (automatic growth).
    /// Acquire always succeeds.
    pub fn acquire(&mut self) -> Record {
        self.acquired += 1;

        if !self.config.enabled {
            self.allocated += 1;
            return Record::new();
        }

        match self.free.pop() {
            Some(record) => record,
            None => {
                self.allocated += 1;
                Record::new()
            }
        }
    }

    /// Clear a record and return it to the free list
    ///
    /// The pool retains every released record: growth is monotonic and the
    /// pool never shrinks. If pooling is disabled, the record is dropped.
    pub fn release(&mut self, mut record: Record) {
        if !self.config.enabled {
            return;
        }

        record.clear();
        self.free.push(record);
    }

    /// Get pool statistics
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            capacity: self.config.capacity,
            available: self.free.len(),
            allocated: self.allocated,
            acquired: self.acquired,
            enabled: self.config.enabled,
        }
    }

    /// Check if the pool is enabled
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Get the current number of free records
    pub fn available(&self) -> usize {
        self.free.len()
    }
}

/// Pool statistics
#[derive(Debug, Clone)]
pub struct PoolStats {
    /// Initial pool capacity
    pub capacity: usize,
    /// Records currently on the free list
    pub available: usize,
    /// Total records allocated (including auto-growth)
    pub allocated: usize,
    /// Total acquire operations
    pub acquired: usize,
    /// Whether pooling is enabled
    pub enabled: bool,
}

impl PoolStats {
    /// Calculate hit rate (percentage of acquires served from the free list)
    pub fn hit_rate(&self) -> f64 {
        if self.acquired == 0 {
            return 0.0;
        }
        let misses = self.allocated.saturating_sub(self.capacity);
        let hits = self.acquired.saturating_sub(misses);
        (hits as f64 / self.acquired as f64) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::Label;
    use crate::prediction::Prediction;

    #[test]
    fn test_pool_acquire_release() {
        let mut pool = RecordPool::new(RecordPoolConfig::new(10));

        let record = pool.acquire();
        assert_eq!(pool.available(), 9);

        pool.release(record);
        assert_eq!(pool.available(), 10);
    }

    #[test]
    fn test_pool_growth_never_shrinks() {
        let mut pool = RecordPool::new(RecordPoolConfig::new(2));

        let r1 = pool.acquire();
        let r2 = pool.acquire();
        assert_eq!(pool.available(), 0);

        // Exhausted pool auto-grows
        let r3 = pool.acquire();
        assert_eq!(pool.available(), 0);

        pool.release(r1);
        pool.release(r2);
        pool.release(r3);

        // All three retained
        assert_eq!(pool.available(), 3);
        assert!(pool.stats().allocated >= 3);
    }

    #[test]
    fn test_release_clears_record() {
        let mut pool = RecordPool::new(RecordPoolConfig::new(1));

        let mut record = pool.acquire();
        record.push_feature(b'a', 5, 1.0);
        record.label = Label::Multiclass { class: 2, weight: 1.0 };
        record.prediction = Prediction::Scalar(0.9);
        record.tag = "t".to_string();
        record.sorted = true;
        record.end_pass = true;
        pool.release(record);

        let again = pool.acquire();
        assert!(again.groups().is_empty());
        assert_eq!(again.label, Label::None);
        assert_eq!(again.prediction, Prediction::None);
        assert!(again.tag.is_empty());
        assert!(!again.sorted);
        assert!(!again.end_pass);
    }

    #[test]
    fn test_pool_disabled() {
        let mut pool = RecordPool::new(RecordPoolConfig::disabled());
        assert!(!pool.is_enabled());

        let r1 = pool.acquire();
        let r2 = pool.acquire();

        pool.release(r1);
        pool.release(r2);
        assert_eq!(pool.available(), 0);
    }

    #[test]
    fn test_disabled_pool_still_counts_acquires() {
        let mut pool = RecordPool::new(RecordPoolConfig::disabled());

        let r1 = pool.acquire();
        let r2 = pool.acquire();
        pool.release(r1);
        pool.release(r2);

        let stats = pool.stats();
        assert_eq!(stats.acquired, 2);
        assert_eq!(stats.allocated, 2);
        // Every acquire allocates when pooling is off.
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_pool_stats_hit_rate() {
        let mut pool = RecordPool::new(RecordPoolConfig::new(2));

        let r1 = pool.acquire();
        let r2 = pool.acquire();
        pool.release(r1);
        pool.release(r2);

        let stats = pool.stats();
        assert_eq!(stats.acquired, 2);
        assert!(stats.hit_rate() >= 99.0);

        let r1 = pool.acquire();
        let r2 = pool.acquire();
        let r3 = pool.acquire(); // miss, allocates

        let stats = pool.stats();
        assert!(stats.hit_rate() < 100.0);

        pool.release(r1);
        pool.release(r2);
        pool.release(r3);
    }

    #[test]
    fn test_steady_state_reuse() {
        let mut pool = RecordPool::new(RecordPoolConfig::new(4));

        for _ in 0..1000 {
            let record = pool.acquire();
            pool.release(record);
        }

        let stats = pool.stats();
        assert_eq!(stats.acquired, 1000);
        assert_eq!(stats.allocated, 4); // no growth on the steady-state path
        assert_eq!(stats.available, 4);
    }
}
