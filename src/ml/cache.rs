//! Process-wide model cache.
//!
//! One slot per [`ModelKind`]. A slot is filled on the first successful load
//! and emptied only by [`ModelCache::invalidate_all`]. Missing or broken
//! artifacts are never cached, so every call retries the store until a load
//! succeeds.

use crate::adapters::fs::LocalArtifactStore;
use crate::domain::model::ModelKind;
use crate::domain::ports::{ArtifactStore, ModelSettings};
use crate::ml::artifact::ModelHandle;
use crate::utils::error::PredictionError;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

pub struct ModelCache {
    store: Arc<dyn ArtifactStore>,
    extension: String,
    slots: RwLock<HashMap<ModelKind, Arc<ModelHandle>>>,
}

impl ModelCache {
    pub fn new(store: Arc<dyn ArtifactStore>, extension: impl Into<String>) -> Self {
        Self {
            store,
            extension: extension.into(),
            slots: RwLock::new(HashMap::new()),
        }
    }

    pub fn from_settings<C: ModelSettings + ?Sized>(settings: &C) -> Self {
        let store = LocalArtifactStore::new(settings.model_path());
        Self::new(Arc::new(store), settings.artifact_extension())
    }

    /// 取得模型，失敗時回傳 `None` (錯誤已記錄)
    pub fn load(&self, kind: ModelKind) -> Option<Arc<ModelHandle>> {
        self.try_load(kind).ok()
    }

    pub fn try_load(&self, kind: ModelKind) -> Result<Arc<ModelHandle>, PredictionError> {
        if let Some(handle) = self.slots.read().get(&kind) {
            return Ok(Arc::clone(handle));
        }

        // 讀檔期間不持有鎖；同時第一次載入會重複解碼，最後寫入者勝出
        let name = kind.file_name(&self.extension);
        if !self.store.exists(&name) {
            tracing::warn!(
                "⚠️ {} model not found at {}",
                kind,
                self.store.location(&name)
            );
            return Err(PredictionError::ModelUnavailable { kind });
        }

        let bytes = self.store.read(&name).map_err(|e| {
            tracing::error!("❌ Error loading {} model: {}", kind, e);
            PredictionError::ArtifactLoad {
                kind,
                message: e.to_string(),
            }
        })?;

        let handle = ModelHandle::decode(kind, &bytes).map_err(|e| {
            tracing::error!("❌ Error loading {} model: {}", kind, e);
            e
        })?;
        let handle = Arc::new(handle);

        self.slots.write().insert(kind, Arc::clone(&handle));
        tracing::info!(
            "✅ {} model loaded successfully ({:?})",
            kind,
            handle.capabilities()
        );
        Ok(handle)
    }

    pub fn invalidate_all(&self) {
        self.slots.write().clear();
        tracing::info!("🧹 Model cache cleared");
    }

    pub fn is_loaded(&self, kind: ModelKind) -> bool {
        self.slots.read().contains_key(&kind)
    }

    pub fn loaded_kinds(&self) -> Vec<ModelKind> {
        let slots = self.slots.read();
        ModelKind::ALL
            .into_iter()
            .filter(|kind| slots.contains_key(kind))
            .collect()
    }

    /// 模型檔在儲存端的位置，供診斷輸出使用
    pub fn artifact_location(&self, kind: ModelKind) -> String {
        self.store.location(&kind.file_name(&self.extension))
    }
}

impl std::fmt::Debug for ModelCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelCache")
            .field("extension", &self.extension)
            .field("loaded", &self.loaded_kinds())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::{Result, RiskError};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingStore {
        files: Mutex<HashMap<String, Vec<u8>>>,
        reads: AtomicUsize,
    }

    impl CountingStore {
        fn put(&self, name: &str, body: &str) {
            self.files.lock().insert(name.to_string(), body.as_bytes().to_vec());
        }

        fn reads(&self) -> usize {
            self.reads.load(Ordering::SeqCst)
        }
    }

    impl ArtifactStore for CountingStore {
        fn exists(&self, name: &str) -> bool {
            self.files.lock().contains_key(name)
        }

        fn read(&self, name: &str) -> Result<Vec<u8>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.files
                .lock()
                .get(name)
                .cloned()
                .ok_or_else(|| RiskError::NotFound {
                    entity: "artifact".to_string(),
                    id: name.to_string(),
                })
        }

        fn location(&self, name: &str) -> String {
            format!("memory://{}", name)
        }
    }

    const RISK_MODEL: &str = r#"{"type": "linear", "weights": [0.1, 0.1], "bias": 0.0}"#;

    fn cache_with_store() -> (ModelCache, Arc<CountingStore>) {
        let store = Arc::new(CountingStore::default());
        let cache = ModelCache::new(store.clone(), "json");
        (cache, store)
    }

    #[test]
    fn test_second_load_returns_same_handle_without_reading() {
        let (cache, store) = cache_with_store();
        store.put("risk_model.json", RISK_MODEL);

        let first = cache.load(ModelKind::Risk).unwrap();
        let second = cache.load(ModelKind::Risk).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.reads(), 1);
        assert!(cache.is_loaded(ModelKind::Risk));
    }

    #[test]
    fn test_invalidate_forces_fresh_read() {
        let (cache, store) = cache_with_store();
        store.put("risk_model.json", RISK_MODEL);

        let first = cache.load(ModelKind::Risk).unwrap();
        cache.invalidate_all();
        assert!(cache.loaded_kinds().is_empty());

        let second = cache.load(ModelKind::Risk).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(store.reads(), 2);
    }

    #[test]
    fn test_missing_artifact_is_retried_every_call() {
        let (cache, store) = cache_with_store();

        assert_eq!(
            cache.try_load(ModelKind::Trend).unwrap_err(),
            PredictionError::ModelUnavailable {
                kind: ModelKind::Trend
            }
        );
        assert!(!cache.is_loaded(ModelKind::Trend));

        store.put("trend_model.json", RISK_MODEL);
        assert!(cache.load(ModelKind::Trend).is_some());
    }

    #[test]
    fn test_corrupt_artifact_is_not_cached() {
        let (cache, store) = cache_with_store();
        store.put("scaler.json", "{ not json");

        assert!(matches!(
            cache.try_load(ModelKind::Scaler),
            Err(PredictionError::ArtifactLoad {
                kind: ModelKind::Scaler,
                ..
            })
        ));
        assert!(cache.load(ModelKind::Scaler).is_none());
        assert_eq!(store.reads(), 2);
    }

    #[test]
    fn test_slots_are_independent() {
        let (cache, store) = cache_with_store();
        store.put("risk_model.json", RISK_MODEL);
        store.put(
            "scaler.json",
            r#"{"type": "standard_scaler", "mean": [0.0], "scale": [1.0]}"#,
        );

        cache.load(ModelKind::Risk).unwrap();
        cache.load(ModelKind::Scaler).unwrap();
        assert_eq!(
            cache.loaded_kinds(),
            vec![ModelKind::Risk, ModelKind::Scaler]
        );
    }

    #[test]
    fn test_concurrent_first_loads_all_succeed() {
        let (cache, store) = cache_with_store();
        store.put("risk_model.json", RISK_MODEL);
        let cache = Arc::new(cache);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || cache.load(ModelKind::Risk).is_some())
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap());
        }
        assert!(cache.is_loaded(ModelKind::Risk));
        assert!(store.reads() >= 1);
    }
}
