//! Document Loader: fetch raw schema bytes from a path or URL and deserialize
//! them into an untyped document tree.

use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use sha2::{Digest, Sha256};

use crate::error::LoadError;

/// Default remote fetch timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default maximum document size (10 MiB).
pub const DEFAULT_MAX_BYTES: u64 = 10 * 1024 * 1024;

/// Where a schema document lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Source {
    Path(PathBuf),
    Url(String),
}

impl Source {
    /// Classify a source string: absolute `http(s)` URLs are remote, everything else is a path.
    pub fn parse(source: &str) -> Self {
        let lower = source.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Source::Url(source.to_string())
        } else {
            Source::Path(PathBuf::from(source))
        }
    }

    /// Resolve a relative reference (e.g. the document part of an external `$ref`)
    /// against this source.
    pub fn join(&self, relative: &str) -> Source {
        let candidate = Source::parse(relative);
        match (&candidate, self) {
            (Source::Url(_), _) => candidate,
            (Source::Path(p), _) if p.is_absolute() => candidate,
            (Source::Path(_), Source::Path(base)) => {
                let dir = base.parent().unwrap_or_else(|| Path::new(""));
                Source::Path(dir.join(relative))
            }
            (Source::Path(_), Source::Url(base)) => {
                let dir = match base.rfind('/') {
                    Some(idx) if idx > base.find("://").map_or(0, |i| i + 2) => &base[..=idx],
                    _ => base.as_str(),
                };
                let dir = if dir.ends_with('/') {
                    dir.to_string()
                } else {
                    format!("{dir}/")
                };
                Source::Url(format!("{dir}{}", relative.trim_start_matches("./")))
            }
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Path(p) => write!(f, "{}", p.display()),
            Source::Url(u) => write!(f, "{u}"),
        }
    }
}

/// The deserialized document as loaded: untyped tree plus provenance.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub source: Source,
    pub value: serde_json::Value,
    pub bytes: Vec<u8>,
    /// Hex sha256 of `bytes`.
    pub hash: String,
}

impl RawDocument {
    /// Deserialize raw bytes: JSON first, then YAML.
    pub fn from_bytes(source: Source, bytes: Vec<u8>) -> Result<Self, LoadError> {
        let value = match serde_json::from_slice::<serde_json::Value>(&bytes) {
            Ok(value) => value,
            Err(json_err) => serde_yaml_ng::from_slice::<serde_json::Value>(&bytes).map_err(
                |yaml_err| LoadError::MalformedDocument {
                    source_name: source.to_string(),
                    json: json_err.to_string(),
                    yaml: yaml_err.to_string(),
                },
            )?,
        };
        let hash = content_hash(&bytes);
        Ok(Self {
            source,
            value,
            bytes,
            hash,
        })
    }
}

/// Hex-encoded sha256 of a byte slice.
pub fn content_hash(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Limits applied while loading.
#[derive(Debug, Clone, Copy)]
pub struct LoaderOptions {
    pub timeout: Duration,
    pub max_bytes: u64,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }
}

/// Loads schema documents. Holds no state besides its limits; caching is the caller's call.
#[derive(Debug, Clone, Default)]
pub struct DocumentLoader {
    options: LoaderOptions,
}

impl DocumentLoader {
    pub fn new(options: LoaderOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &LoaderOptions {
        &self.options
    }

    pub fn load(&self, source: &Source) -> Result<RawDocument, LoadError> {
        let bytes = match source {
            Source::Path(path) => self.read_path(path)?,
            Source::Url(url) => self.fetch_url(url)?,
        };
        log::debug!("loaded {} bytes from {}", bytes.len(), source);
        RawDocument::from_bytes(source.clone(), bytes)
    }

    fn read_path(&self, path: &Path) -> Result<Vec<u8>, LoadError> {
        let name = path.display().to_string();
        let meta = fs::metadata(path).map_err(|e| io_to_load_error(&name, e))?;
        if meta.is_dir() {
            return Err(LoadError::SourceUnreadable {
                source_name: name,
                reason: "is a directory".to_string(),
            });
        }
        if meta.len() > self.options.max_bytes {
            return Err(LoadError::SourceTooLarge {
                source_name: name,
                limit: self.options.max_bytes,
            });
        }
        fs::read(path).map_err(|e| io_to_load_error(&name, e))
    }

    fn fetch_url(&self, url: &str) -> Result<Vec<u8>, LoadError> {
        log::info!("fetching schema document {url}");
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(self.options.timeout))
            .build();
        let agent = ureq::Agent::new_with_config(config);

        let mut response = agent
            .get(url)
            .call()
            .map_err(|e| http_to_load_error(url, e, self.options.max_bytes))?;

        let declared = response
            .headers()
            .get("content-length")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        if declared.is_some_and(|len| len > self.options.max_bytes) {
            return Err(LoadError::SourceTooLarge {
                source_name: url.to_string(),
                limit: self.options.max_bytes,
            });
        }

        response
            .body_mut()
            .with_config()
            .limit(self.options.max_bytes)
            .read_to_vec()
            .map_err(|e| http_to_load_error(url, e, self.options.max_bytes))
    }
}

fn io_to_load_error(name: &str, err: std::io::Error) -> LoadError {
    match err.kind() {
        ErrorKind::NotFound => LoadError::SourceNotFound(name.to_string()),
        _ => LoadError::SourceUnreadable {
            source_name: name.to_string(),
            reason: err.to_string(),
        },
    }
}

fn http_to_load_error(url: &str, err: ureq::Error, limit: u64) -> LoadError {
    match err {
        ureq::Error::StatusCode(404) => LoadError::SourceNotFound(url.to_string()),
        ureq::Error::BodyExceedsLimit(_) => LoadError::SourceTooLarge {
            source_name: url.to_string(),
            limit,
        },
        other => LoadError::SourceUnreadable {
            source_name: url.to_string(),
            reason: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_parse() {
        assert_eq!(
            Source::parse("https://api.example.com/openapi.json"),
            Source::Url("https://api.example.com/openapi.json".to_string())
        );
        assert_eq!(
            Source::parse("specs/openapi.yaml"),
            Source::Path(PathBuf::from("specs/openapi.yaml"))
        );
    }

    #[test]
    fn test_join_relative_path() {
        let base = Source::Path(PathBuf::from("specs/openapi.yaml"));
        assert_eq!(
            base.join("common.yaml"),
            Source::Path(PathBuf::from("specs/common.yaml"))
        );
    }

    #[test]
    fn test_join_relative_url() {
        let base = Source::Url("https://example.com/v1/openapi.json".to_string());
        assert_eq!(
            base.join("./common.json"),
            Source::Url("https://example.com/v1/common.json".to_string())
        );
        assert_eq!(
            base.join("https://other.com/x.json"),
            Source::Url("https://other.com/x.json".to_string())
        );
    }

    #[test]
    fn test_json_preferred_over_yaml() {
        let doc = RawDocument::from_bytes(
            Source::parse("inline.json"),
            br#"{"openapi": "3.0.0"}"#.to_vec(),
        )
        .unwrap();
        assert_eq!(doc.value["openapi"], "3.0.0");
        assert_eq!(doc.hash.len(), 64);
    }

    #[test]
    fn test_yaml_fallback() {
        let doc =
            RawDocument::from_bytes(Source::parse("inline.yaml"), b"openapi: 3.1.0\n".to_vec())
                .unwrap();
        assert_eq!(doc.value["openapi"], "3.1.0");
    }

    #[test]
    fn test_malformed_document() {
        let err = RawDocument::from_bytes(Source::parse("bad.yaml"), b"{ [ : ".to_vec())
            .unwrap_err();
        assert!(matches!(err, LoadError::MalformedDocument { .. }));
    }

    #[test]
    fn test_content_hash_stable() {
        assert_eq!(content_hash(b"abc"), content_hash(b"abc"));
        assert_ne!(content_hash(b"abc"), content_hash(b"abd"));
    }
}
