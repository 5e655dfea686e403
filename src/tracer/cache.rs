//! Кэш трассировок по хэшу входных данных.

use log::{debug, warn};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};

use crate::scene::{OpticalComponent, Overrides};

use super::{trace, TraceConfig, TraceResult};

pub const DEFAULT_CACHE_CAPACITY: usize = 256;

#[derive(Serialize)]
struct CacheKeyInput<'a> {
    components: &'a [OpticalComponent],
    overrides: &'a Overrides,
    config: &'a TraceConfig,
}

#[derive(Default)]
struct CacheEntries {
    results: HashMap<String, Arc<TraceResult>>,
    order: VecDeque<String>,
}

/// Потокобезопасный кэш перед [`trace`]. Одинаковые входы делят один результат.
#[derive(Clone)]
pub struct TraceCache {
    entries: Arc<RwLock<CacheEntries>>,
    capacity: usize,
}

impl Default for TraceCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl TraceCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(CacheEntries::default())),
            capacity: capacity.max(1),
        }
    }

    /// SHA-256 от JSON входных данных; `None`, если их нельзя сериализовать
    pub fn key(components: &[OpticalComponent], overrides: &Overrides, config: &TraceConfig) -> Option<String> {
        let input = CacheKeyInput {
            components,
            overrides,
            config,
        };
        let json = match serde_json::to_string(&input) {
            Ok(json) => json,
            Err(e) => {
                warn!("Trace inputs are not serializable, skipping cache: {}", e);
                return None;
            }
        };
        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        Some(format!("{:x}", hasher.finalize()))
    }

    pub fn trace(
        &self,
        components: &[OpticalComponent],
        overrides: &Overrides,
        config: &TraceConfig,
    ) -> Arc<TraceResult> {
        let Some(key) = Self::key(components, overrides, config) else {
            return Arc::new(trace(components, overrides, config));
        };

        if let Ok(entries) = self.entries.read() {
            if let Some(hit) = entries.results.get(&key) {
                debug!("Trace cache hit {}", &key[..12]);
                return Arc::clone(hit);
            }
        }

        let result = Arc::new(trace(components, overrides, config));
        if let Ok(mut entries) = self.entries.write() {
            if !entries.results.contains_key(&key) {
                while entries.order.len() >= self.capacity {
                    if let Some(oldest) = entries.order.pop_front() {
                        entries.results.remove(&oldest);
                    }
                }
                entries.order.push_back(key.clone());
            }
            entries.results.insert(key, Arc::clone(&result));
        }
        result
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.results.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.results.clear();
            entries.order.clear();
        }
    }
}
