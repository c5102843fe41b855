//! Content-addressed forecast cache
//!
//! Entries are keyed by a SHA-256 digest over the series values, the
//! horizon and the serialized method configuration, so two calls hit the
//! same entry only when all three agree bit for bit. The cache is explicit:
//! nothing is memoised unless an orchestrator is given one.
//!
//! # Thread Safety
//!
//! The map sits behind a [`RwLock`] and can be shared across threads with
//! `Arc`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use sha2::{Digest, Sha256};

use forecast_spi::{ForecastConfig, TimeSeries};

type Digest32 = [u8; 32];

#[derive(Debug, Clone)]
struct Entry {
    series: Digest32,
    values: Vec<f64>,
}

/// Hit and miss counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// Forecast vectors keyed by (series, horizon, config)
#[derive(Debug, Default)]
pub struct ForecastCache {
    entries: RwLock<HashMap<Digest32, Entry>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ForecastCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn series_digest(series: &TimeSeries) -> Digest32 {
        let mut hasher = Sha256::new();
        hasher.update(series.to_le_bytes());
        hasher.finalize().into()
    }

    fn entry_key(series: &Digest32, horizon: usize, config: &ForecastConfig) -> Option<Digest32> {
        let config = serde_json::to_vec(config).ok()?;
        let mut hasher = Sha256::new();
        hasher.update(series);
        hasher.update((horizon as u64).to_le_bytes());
        hasher.update(&config);
        Some(hasher.finalize().into())
    }

    /// Cached forecast, if any
    pub fn get(
        &self,
        series: &TimeSeries,
        horizon: usize,
        config: &ForecastConfig,
    ) -> Option<Vec<f64>> {
        let key = Self::entry_key(&Self::series_digest(series), horizon, config)?;
        let found = self.entries.read().get(&key).map(|e| e.values.clone());
        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Store a forecast, replacing any previous entry for the same key
    pub fn insert(
        &self,
        series: &TimeSeries,
        horizon: usize,
        config: &ForecastConfig,
        values: Vec<f64>,
    ) {
        let digest = Self::series_digest(series);
        if let Some(key) = Self::entry_key(&digest, horizon, config) {
            self.entries.write().insert(
                key,
                Entry {
                    series: digest,
                    values,
                },
            );
        }
    }

    /// Drop every entry computed from `series`; returns how many were removed
    pub fn invalidate_series(&self, series: &TimeSeries) -> usize {
        let digest = Self::series_digest(series);
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.series != digest);
        before - entries.len()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
