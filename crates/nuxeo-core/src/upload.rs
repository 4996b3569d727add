//! Batch upload descriptors and blob references

use serde::{Deserialize, Deserializer, Serialize};

/// Server answer to batch creation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchInfo {
    pub batch_id: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadType {
    Normal,
    Chunked,
}

impl UploadType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Chunked => "chunked",
        }
    }
}

/// Where a file of a batch stands
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UploadState {
    InProgress { chunks: usize },
    Complete,
}

/// One file of a batch as reported by the Server.
///
/// The Server sends numbers as strings on some endpoints; both forms are
/// accepted. `uploaded_chunk_ids` is kept sorted and free of duplicates.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchUpload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub file_idx: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_type: Option<UploadType>,
    #[serde(default, deserialize_with = "lenient::flag", skip_serializing_if = "Option::is_none")]
    pub uploaded: Option<bool>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub uploaded_size: Option<u64>,
    #[serde(default, deserialize_with = "lenient::chunk_ids")]
    pub uploaded_chunk_ids: Vec<u64>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub chunk_count: Option<u64>,
}

impl BatchUpload {
    pub fn is_chunked(&self) -> bool {
        self.upload_type == Some(UploadType::Chunked)
    }

    pub fn state(&self) -> UploadState {
        match (self.upload_type, self.chunk_count) {
            (Some(UploadType::Chunked), Some(count))
                if (self.uploaded_chunk_ids.len() as u64) < count =>
            {
                UploadState::InProgress {
                    chunks: self.uploaded_chunk_ids.len(),
                }
            }
            _ => UploadState::Complete,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.state() == UploadState::Complete
    }
}

/// Reference to an uploaded file, usable as a document property value
/// (e.g. `file:content`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadInfo {
    #[serde(rename = "upload-batch")]
    pub batch_id: String,
    #[serde(rename = "upload-fileId")]
    pub file_idx: String,
}

impl UploadInfo {
    pub fn new(batch_id: impl Into<String>, file_idx: impl Into<String>) -> Self {
        Self {
            batch_id: batch_id.into(),
            file_idx: file_idx.into(),
        }
    }
}

/// Metadata of a blob property as returned inside documents
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "mime-type", default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub encoding: Option<String>,
    #[serde(default)]
    pub digest_algorithm: Option<String>,
    #[serde(default)]
    pub digest: Option<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub length: Option<u64>,
    /// Download URL
    #[serde(default)]
    pub data: Option<String>,
}

mod lenient {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Number(u64),
        Bool(bool),
        Text(String),
    }

    pub fn number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
        match Option::<Scalar>::deserialize(d)? {
            None => Ok(None),
            Some(Scalar::Number(n)) => Ok(Some(n)),
            Some(Scalar::Text(s)) if s.is_empty() => Ok(None),
            Some(Scalar::Text(s)) => s.parse().map(Some).map_err(serde::de::Error::custom),
            Some(Scalar::Bool(b)) => Err(serde::de::Error::custom(format!(
                "expected a number, got {}",
                b
            ))),
        }
    }

    pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(Option::<Scalar>::deserialize(d)?.map(|s| match s {
            Scalar::Number(n) => n.to_string(),
            Scalar::Bool(b) => b.to_string(),
            Scalar::Text(s) => s,
        }))
    }

    pub fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
        match Option::<Scalar>::deserialize(d)? {
            None => Ok(None),
            Some(Scalar::Bool(b)) => Ok(Some(b)),
            Some(Scalar::Text(s)) => s.parse().map(Some).map_err(serde::de::Error::custom),
            Some(Scalar::Number(n)) => Ok(Some(n != 0)),
        }
    }

    pub fn chunk_ids<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u64>, D::Error> {
        let raw = Option::<Vec<Scalar>>::deserialize(d)?.unwrap_or_default();
        let mut ids = raw
            .into_iter()
            .map(|s| match s {
                Scalar::Number(n) => Ok(n),
                Scalar::Text(t) => t.parse().map_err(serde::de::Error::custom),
                Scalar::Bool(_) => Err(serde::de::Error::custom("chunk id must be a number")),
            })
            .collect::<Result<Vec<u64>, D::Error>>()?;
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }
}
