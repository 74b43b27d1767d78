use serde::Deserialize;

/// A component object written inline, or a `$ref` pointing at one.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RefOr<T> {
    Ref {
        #[serde(rename = "$ref")]
        ref_path: String,
    },
    Item(T),
}

impl<T> RefOr<T> {
    /// The inline object, or the pointer still waiting to be resolved.
    pub fn item(&self) -> Result<&T, &str> {
        match self {
            RefOr::Item(item) => Ok(item),
            RefOr::Ref { ref_path } => Err(ref_path),
        }
    }

    pub fn is_ref(&self) -> bool {
        matches!(self, RefOr::Ref { .. })
    }
}
