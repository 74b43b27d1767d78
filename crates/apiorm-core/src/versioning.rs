//! Timestamped snapshots of schema documents on disk.
//!
//! Layout: `{root}/{schema}/{version}.json` next to `{version}.meta.json`.
//! Version ids are UTC timestamps `YYYY_MM_DD_HHMMSS`, suffixed `_N` when a
//! second snapshot lands in the same second.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::VersionError;
use crate::load::content_hash;

/// Version of this crate, recorded in every snapshot's metadata.
pub const GENERATOR_VERSION: &str = env!("CARGO_PKG_VERSION");

const META_SUFFIX: &str = ".meta.json";

/// Sidecar metadata for one stored version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionMeta {
    pub version: String,
    pub schema_name: String,
    pub created_at: DateTime<Utc>,
    pub size: u64,
    pub hash: String,
    pub generator_version: String,
}

/// How two versions are compared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompareStrategy {
    /// Content hashes.
    #[default]
    Hash,
    /// Structural JSON diff.
    Content,
    /// Creation time only.
    Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Removed,
    Changed,
}

/// One difference found by a content comparison, located by JSON pointer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentChange {
    pub pointer: String,
    pub kind: ChangeKind,
}

/// Result of comparing two stored versions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VersionDiff {
    pub strategy: CompareStrategy,
    pub from: String,
    pub to: String,
    pub changed: bool,
    /// Filled by the content strategy only.
    pub changes: Vec<ContentChange>,
}

/// File-backed version store rooted at one directory.
#[derive(Debug, Clone)]
pub struct VersionStore {
    root: PathBuf,
}

impl VersionStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Store a snapshot stamped with the current time.
    pub fn store(
        &self,
        schema: &str,
        document: &serde_json::Value,
    ) -> Result<VersionMeta, VersionError> {
        self.store_at(schema, document, Utc::now())
    }

    /// Store a snapshot stamped with `now`.
    pub fn store_at(
        &self,
        schema: &str,
        document: &serde_json::Value,
        now: DateTime<Utc>,
    ) -> Result<VersionMeta, VersionError> {
        let dir = self.schema_dir(schema);
        fs::create_dir_all(&dir).map_err(io_at(&dir))?;

        let stamp = now.format("%Y_%m_%d_%H%M%S").to_string();
        let mut version = stamp.clone();
        let mut n = 1;
        while self.document_path(schema, &version).exists() {
            version = format!("{stamp}_{n}");
            n += 1;
        }

        let bytes = serde_json::to_vec_pretty(document)?;
        let meta = VersionMeta {
            version: version.clone(),
            schema_name: schema.to_string(),
            created_at: now,
            size: bytes.len() as u64,
            hash: content_hash(&bytes),
            generator_version: GENERATOR_VERSION.to_string(),
        };

        let doc_path = self.document_path(schema, &version);
        fs::write(&doc_path, &bytes).map_err(io_at(&doc_path))?;
        let meta_path = self.meta_path(schema, &version);
        fs::write(&meta_path, serde_json::to_vec_pretty(&meta)?).map_err(io_at(&meta_path))?;

        log::info!("stored {schema} version {version} ({} bytes)", meta.size);
        Ok(meta)
    }

    /// Store a snapshot unless it matches the latest one under `strategy`.
    /// The timestamp strategy always stores.
    pub fn store_if_changed(
        &self,
        schema: &str,
        document: &serde_json::Value,
        strategy: CompareStrategy,
    ) -> Result<Option<VersionMeta>, VersionError> {
        let Some(latest) = self.latest(schema)? else {
            return self.store(schema, document).map(Some);
        };
        let unchanged = match strategy {
            CompareStrategy::Hash => {
                content_hash(&serde_json::to_vec_pretty(document)?) == latest.hash
            }
            CompareStrategy::Content => self.load(schema, &latest.version)? == *document,
            CompareStrategy::Timestamp => false,
        };
        if unchanged {
            log::debug!("{schema} unchanged since {}", latest.version);
            return Ok(None);
        }
        self.store(schema, document).map(Some)
    }

    /// Every stored version of a schema, oldest first.
    pub fn list(&self, schema: &str) -> Result<Vec<VersionMeta>, VersionError> {
        let dir = self.schema_dir(schema);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut metas = Vec::new();
        for entry in fs::read_dir(&dir).map_err(io_at(&dir))? {
            let path = entry.map_err(io_at(&dir))?.path();
            let is_meta = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(META_SUFFIX));
            if is_meta {
                let content = fs::read(&path).map_err(io_at(&path))?;
                metas.push(serde_json::from_slice::<VersionMeta>(&content)?);
            }
        }
        metas.sort_by_key(|m| version_sort_key(&m.version));
        Ok(metas)
    }

    pub fn latest(&self, schema: &str) -> Result<Option<VersionMeta>, VersionError> {
        Ok(self.list(schema)?.pop())
    }

    /// The stored document of one version.
    pub fn load(&self, schema: &str, version: &str) -> Result<serde_json::Value, VersionError> {
        let path = self.document_path(schema, version);
        let content = self.read_existing(schema, version, &path)?;
        Ok(serde_json::from_slice(&content)?)
    }

    pub fn meta(&self, schema: &str, version: &str) -> Result<VersionMeta, VersionError> {
        let path = self.meta_path(schema, version);
        let content = self.read_existing(schema, version, &path)?;
        Ok(serde_json::from_slice(&content)?)
    }

    pub fn compare(
        &self,
        schema: &str,
        from: &str,
        to: &str,
        strategy: CompareStrategy,
    ) -> Result<VersionDiff, VersionError> {
        let from_meta = self.meta(schema, from)?;
        let to_meta = self.meta(schema, to)?;
        let mut changes = Vec::new();
        let changed = match strategy {
            CompareStrategy::Hash => from_meta.hash != to_meta.hash,
            CompareStrategy::Content => {
                diff_values(&self.load(schema, from)?, &self.load(schema, to)?, "", &mut changes);
                !changes.is_empty()
            }
            CompareStrategy::Timestamp => from_meta.created_at != to_meta.created_at,
        };
        Ok(VersionDiff {
            strategy,
            from: from.to_string(),
            to: to.to_string(),
            changed,
            changes,
        })
    }

    /// Keep the newest `keep` versions and delete the rest. Returns the
    /// deleted version ids, oldest first.
    pub fn prune(&self, schema: &str, keep: usize) -> Result<Vec<String>, VersionError> {
        let metas = self.list(schema)?;
        let excess = metas.len().saturating_sub(keep);
        let mut removed = Vec::with_capacity(excess);
        for meta in metas.into_iter().take(excess) {
            for path in [
                self.document_path(schema, &meta.version),
                self.meta_path(schema, &meta.version),
            ] {
                if path.exists() {
                    fs::remove_file(&path).map_err(io_at(&path))?;
                }
            }
            removed.push(meta.version);
        }
        if !removed.is_empty() {
            log::info!("pruned {} versions of {schema}", removed.len());
        }
        Ok(removed)
    }

    fn schema_dir(&self, schema: &str) -> PathBuf {
        self.root.join(schema)
    }

    fn document_path(&self, schema: &str, version: &str) -> PathBuf {
        self.schema_dir(schema).join(format!("{version}.json"))
    }

    fn meta_path(&self, schema: &str, version: &str) -> PathBuf {
        self.schema_dir(schema).join(format!("{version}{META_SUFFIX}"))
    }

    fn read_existing(
        &self,
        schema: &str,
        version: &str,
        path: &Path,
    ) -> Result<Vec<u8>, VersionError> {
        match fs::read(path) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(VersionError::NotFound {
                schema: schema.to_string(),
                version: version.to_string(),
            }),
            Err(e) => Err(io_at(path)(e)),
        }
    }
}

fn io_at(path: &Path) -> impl Fn(std::io::Error) -> VersionError + '_ {
    move |cause| VersionError::Io {
        path: path.display().to_string(),
        cause,
    }
}

/// `2024_01_02_030405_10` sorts after `2024_01_02_030405_9`.
fn version_sort_key(version: &str) -> (String, u32) {
    let parts: Vec<&str> = version.split('_').collect();
    if parts.len() == 5 {
        if let Ok(n) = parts[4].parse() {
            return (parts[..4].join("_"), n);
        }
    }
    (version.to_string(), 0)
}

fn diff_values(
    from: &serde_json::Value,
    to: &serde_json::Value,
    pointer: &str,
    out: &mut Vec<ContentChange>,
) {
    use serde_json::Value;

    let push = |out: &mut Vec<ContentChange>, pointer: String, kind| {
        out.push(ContentChange { pointer, kind });
    };
    match (from, to) {
        (Value::Object(a), Value::Object(b)) => {
            for (key, value) in a {
                let child = format!("{pointer}/{}", escape(key));
                match b.get(key) {
                    Some(other) => diff_values(value, other, &child, out),
                    None => push(out, child, ChangeKind::Removed),
                }
            }
            for key in b.keys().filter(|k| !a.contains_key(*k)) {
                push(out, format!("{pointer}/{}", escape(key)), ChangeKind::Added);
            }
        }
        (Value::Array(a), Value::Array(b)) => {
            for i in 0..a.len().max(b.len()) {
                let child = format!("{pointer}/{i}");
                match (a.get(i), b.get(i)) {
                    (Some(x), Some(y)) => diff_values(x, y, &child, out),
                    (Some(_), None) => push(out, child, ChangeKind::Removed),
                    (None, Some(_)) => push(out, child, ChangeKind::Added),
                    (None, None) => {}
                }
            }
        }
        (a, b) if a != b => push(out, pointer.to_string(), ChangeKind::Changed),
        _ => {}
    }
}

fn escape(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    fn at(secs: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, secs).unwrap()
    }

    #[test]
    fn test_store_writes_document_and_meta() {
        let dir = tempfile::tempdir().unwrap();
        let store = VersionStore::new(dir.path());
        let meta = store.store_at("petstore", &json!({"a": 1}), at(5)).unwrap();

        assert_eq!(meta.version, "2024_03_09_120005");
        assert_eq!(meta.schema_name, "petstore");
        assert_eq!(meta.generator_version, GENERATOR_VERSION);
        assert!(dir.path().join("petstore/2024_03_09_120005.json").is_file());
        assert!(dir.path().join("petstore/2024_03_09_120005.meta.json").is_file());
        assert_eq!(store.meta("petstore", &meta.version).unwrap(), meta);
        assert_eq!(store.load("petstore", &meta.version).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn test_same_second_versions_get_suffixes() {
        let dir = tempfile::tempdir().unwrap();
        let store = VersionStore::new(dir.path());
        let versions: Vec<String> = (0..3)
            .map(|i| store.store_at("s", &json!({"i": i}), at(0)).unwrap().version)
            .collect();
        assert_eq!(
            versions,
            vec!["2024_03_09_120000", "2024_03_09_120000_1", "2024_03_09_120000_2"]
        );
        let listed: Vec<String> = store.list("s").unwrap().into_iter().map(|m| m.version).collect();
        assert_eq!(listed, versions);
    }

    #[test]
    fn test_list_of_unknown_schema_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = VersionStore::new(dir.path());
        assert!(store.list("nothing").unwrap().is_empty());
        assert!(store.latest("nothing").unwrap().is_none());
    }

    #[test]
    fn test_missing_version_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = VersionStore::new(dir.path());
        let err = store.load("s", "2020_01_01_000000").unwrap_err();
        assert!(matches!(err, VersionError::NotFound { .. }));
    }

    #[test]
    fn test_store_if_changed_by_hash_and_content() {
        let dir = tempfile::tempdir().unwrap();
        let store = VersionStore::new(dir.path());
        let doc = json!({"openapi": "3.0.3"});

        assert!(store.store_if_changed("s", &doc, CompareStrategy::Hash).unwrap().is_some());
        assert!(store.store_if_changed("s", &doc, CompareStrategy::Hash).unwrap().is_none());
        assert!(store.store_if_changed("s", &doc, CompareStrategy::Content).unwrap().is_none());
        assert!(store
            .store_if_changed("s", &json!({"openapi": "3.1.0"}), CompareStrategy::Content)
            .unwrap()
            .is_some());
        assert!(store.store_if_changed("s", &doc, CompareStrategy::Timestamp).unwrap().is_some());
    }

    #[test]
    fn test_compare_strategies() {
        let dir = tempfile::tempdir().unwrap();
        let store = VersionStore::new(dir.path());
        let a = store
            .store_at("s", &json!({"info": {"title": "A"}, "tags": ["x"], "old": 1}), at(1))
            .unwrap();
        let b = store
            .store_at("s", &json!({"info": {"title": "B"}, "tags": ["x", "y"], "new": 2}), at(2))
            .unwrap();

        let hash = store.compare("s", &a.version, &b.version, CompareStrategy::Hash).unwrap();
        assert!(hash.changed);
        assert!(hash.changes.is_empty());

        let content = store
            .compare("s", &a.version, &b.version, CompareStrategy::Content)
            .unwrap();
        assert_eq!(
            content.changes,
            vec![
                ContentChange { pointer: "/info/title".into(), kind: ChangeKind::Changed },
                ContentChange { pointer: "/tags/1".into(), kind: ChangeKind::Added },
                ContentChange { pointer: "/old".into(), kind: ChangeKind::Removed },
                ContentChange { pointer: "/new".into(), kind: ChangeKind::Added },
            ]
        );

        let same = store
            .compare("s", &a.version, &a.version, CompareStrategy::Timestamp)
            .unwrap();
        assert!(!same.changed);
    }

    #[test]
    fn test_prune_keeps_newest() {
        let dir = tempfile::tempdir().unwrap();
        let store = VersionStore::new(dir.path());
        for secs in 0..4 {
            store.store_at("s", &json!({"n": secs}), at(secs)).unwrap();
        }
        let removed = store.prune("s", 1).unwrap();
        assert_eq!(
            removed,
            vec!["2024_03_09_120000", "2024_03_09_120001", "2024_03_09_120002"]
        );
        let left = store.list("s").unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].version, "2024_03_09_120003");
    }
}
