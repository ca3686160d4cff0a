//! Upload results returned by the object store.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::Attachment;
use crate::error::Result;

/// Keys that may carry the canonical reference, in resolution order.
pub const REFERENCE_KEYS: [&str; 4] = ["url", "path", "file", "location"];

/// Metadata returned by the store after an upload.
///
/// Deployments name the reference field differently; [`UploadInfo::reference`]
/// hides that behind one fixed-priority rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UploadInfo {
    /// Preferred reference field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Storage path of the object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// File identifier of the object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Location of the object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Any other backend-specific fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UploadInfo {
    /// Resolves the canonical reference.
    ///
    /// Tries `url`, `path`, `file` and `location` in that order and returns
    /// the first one that is present and non-empty.
    pub fn reference(&self) -> Option<&str> {
        [&self.url, &self.path, &self.file, &self.location]
            .into_iter()
            .filter_map(|field| field.as_deref())
            .find(|value| !value.is_empty())
    }

    /// Builds an [`Attachment`] pointing at the uploaded object.
    pub fn to_attachment(
        &self,
        title: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Result<Attachment> {
        Attachment::new(title, self.reference().map(str::to_owned), mime_type)
    }
}
