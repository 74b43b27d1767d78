//! Parsed-document cache keyed by source, with TTL and content-hash revalidation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::PipelineError;
use crate::load::Source;
use crate::pipeline::{ParsedSchema, Pipeline};

/// Default time a cached document is trusted without reloading it.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

struct CacheEntry {
    hash: String,
    stored_at: Instant,
    schema: Arc<ParsedSchema>,
}

/// Caches [`ParsedSchema`]s. Within the TTL a hit skips loading entirely;
/// after it the document is reloaded and the cached result is kept only if
/// the content hash is unchanged.
pub struct SchemaCache {
    enabled: bool,
    ttl: Duration,
    entries: HashMap<String, CacheEntry>,
}

impl Default for SchemaCache {
    fn default() -> Self {
        Self::new(true, DEFAULT_TTL)
    }
}

impl SchemaCache {
    pub fn new(enabled: bool, ttl: Duration) -> Self {
        Self {
            enabled,
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn disabled() -> Self {
        Self::new(false, Duration::ZERO)
    }

    pub fn get_or_build(
        &mut self,
        pipeline: &Pipeline,
        source: &Source,
    ) -> Result<Arc<ParsedSchema>, PipelineError> {
        self.get_or_build_at(pipeline, source, Instant::now())
    }

    /// [`get_or_build`](Self::get_or_build) with an explicit clock.
    pub fn get_or_build_at(
        &mut self,
        pipeline: &Pipeline,
        source: &Source,
        now: Instant,
    ) -> Result<Arc<ParsedSchema>, PipelineError> {
        if !self.enabled {
            return Ok(Arc::new(pipeline.run(source)?));
        }

        let key = source.to_string();
        if let Some(entry) = self.entries.get(&key) {
            if now.saturating_duration_since(entry.stored_at) < self.ttl {
                log::debug!("cache hit for {key}");
                return Ok(Arc::clone(&entry.schema));
            }
        }

        let doc = pipeline.load(source)?;
        if let Some(entry) = self.entries.get_mut(&key) {
            if entry.hash == doc.hash {
                log::debug!("cache revalidated {key}");
                entry.stored_at = now;
                return Ok(Arc::clone(&entry.schema));
            }
        }

        let schema = Arc::new(pipeline.process(&doc)?);
        log::debug!("cache miss for {key}");
        self.entries.insert(
            key,
            CacheEntry {
                hash: doc.hash,
                stored_at: now,
                schema: Arc::clone(&schema),
            },
        );
        Ok(schema)
    }

    /// Drop one source. Returns whether it was cached.
    pub fn invalidate(&mut self, source: &Source) -> bool {
        self.entries.remove(&source.to_string()).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn contains(&self, source: &Source) -> bool {
        self.entries.contains_key(&source.to_string())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    const DOC: &str = r#"{"openapi": "3.0.3", "info": {"title": "One", "version": "1"}, "paths": {}}"#;
    const CHANGED: &str = r#"{"openapi": "3.0.3", "info": {"title": "Two", "version": "1"}, "paths": {}}"#;

    #[test]
    fn test_hit_within_ttl_skips_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("api.json");
        fs::write(&path, DOC).unwrap();
        let source = Source::Path(path.clone());
        let pipeline = Pipeline::default();
        let mut cache = SchemaCache::new(true, Duration::from_secs(60));
        let start = Instant::now();

        let first = cache.get_or_build_at(&pipeline, &source, start).unwrap();
        fs::write(&path, CHANGED).unwrap();
        let second = cache
            .get_or_build_at(&pipeline, &source, start + Duration::from_secs(30))
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.title(), "One");
    }

    #[test]
    fn test_expired_entry_revalidates_by_hash() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("api.json");
        fs::write(&path, DOC).unwrap();
        let source = Source::Path(path.clone());
        let pipeline = Pipeline::default();
        let mut cache = SchemaCache::new(true, Duration::from_secs(60));
        let start = Instant::now();

        let first = cache.get_or_build_at(&pipeline, &source, start).unwrap();
        let same = cache
            .get_or_build_at(&pipeline, &source, start + Duration::from_secs(120))
            .unwrap();
        assert!(Arc::ptr_eq(&first, &same));

        fs::write(&path, CHANGED).unwrap();
        let rebuilt = cache
            .get_or_build_at(&pipeline, &source, start + Duration::from_secs(240))
            .unwrap();
        assert!(!Arc::ptr_eq(&first, &rebuilt));
        assert_eq!(rebuilt.title(), "Two");
    }

    #[test]
    fn test_disabled_cache_always_rebuilds() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("api.json");
        fs::write(&path, DOC).unwrap();
        let source = Source::Path(path);
        let pipeline = Pipeline::default();
        let mut cache = SchemaCache::disabled();

        let first = cache.get_or_build(&pipeline, &source).unwrap();
        let second = cache.get_or_build(&pipeline, &source).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_invalidate_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("api.json");
        fs::write(&path, DOC).unwrap();
        let source = Source::Path(path);
        let pipeline = Pipeline::default();
        let mut cache = SchemaCache::default();

        cache.get_or_build(&pipeline, &source).unwrap();
        assert!(cache.contains(&source));
        assert!(cache.invalidate(&source));
        assert!(!cache.invalidate(&source));

        cache.get_or_build(&pipeline, &source).unwrap();
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_load_errors_are_not_cached() {
        let pipeline = Pipeline::default();
        let mut cache = SchemaCache::default();
        let source = Source::parse("/definitely/not/here/api.yaml");
        assert!(cache.get_or_build(&pipeline, &source).is_err());
        assert!(cache.is_empty());
    }
}
