//! Read-only view of an external asset cache, surfaced in loader reports

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub entry_count: u64,
    pub size_bytes: u64,
    pub capacity_bytes: u64,
}

impl CacheStats {
    /// Fraction of capacity in use, 0.0 for an unbounded or empty cache
    pub fn utilization(&self) -> f64 {
        if self.capacity_bytes == 0 {
            return 0.0;
        }
        (self.size_bytes as f64 / self.capacity_bytes as f64).min(1.0)
    }
}

pub trait CacheReporter: Send + Sync {
    fn stats(&self) -> CacheStats;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utilization_is_fraction_of_capacity() {
        let stats = CacheStats {
            entry_count: 3,
            size_bytes: 256,
            capacity_bytes: 1024,
        };
        assert!((stats.utilization() - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_capacity_reports_zero() {
        let stats = CacheStats {
            entry_count: 1,
            size_bytes: 10,
            capacity_bytes: 0,
        };
        assert_eq!(stats.utilization(), 0.0);
    }

    #[test]
    fn overfull_cache_clamps_to_one() {
        let stats = CacheStats {
            entry_count: 1,
            size_bytes: 2048,
            capacity_bytes: 1024,
        };
        assert_eq!(stats.utilization(), 1.0);
    }
}
