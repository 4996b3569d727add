//! Per-call request options encoded as headers.
//!
//! Every option maps onto one header; unset options contribute nothing.
//! Options are merged in two layers: the client defaults first, then the
//! per-call record, the latter winning.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, Result};

pub const REPOSITORY_HEADER: &str = "X-NXRepository";
pub const VERSIONING_HEADER: &str = "X-Versioning-Option";
pub const TRANSACTION_TIMEOUT_HEADER: &str = "Nuxeo-Transaction-Timeout";
pub const TIMEOUT_HEADER: &str = "timeout";
pub const DEPTH_HEADER: &str = "depth";
pub const PROPERTIES_HEADER: &str = "properties";

/// Seconds added to the transaction timeout to derive the HTTP timeout
const TIMEOUT_GRACE_SECS: u64 = 5;

/// Version increment applied on save
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VersioningOption {
    None,
    Minor,
    Major,
}

impl VersioningOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Minor => "MINOR",
            Self::Major => "MAJOR",
        }
    }
}

/// Header-encoded options of one call
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestOptions {
    /// Repository scope (`X-NXRepository`)
    pub repository: Option<String>,
    /// Extra headers sent verbatim
    pub headers: BTreeMap<String, String>,
    /// Enrichers keyed by entity kind (`enrichers-<kind>`)
    pub enrichers: BTreeMap<String, Vec<String>>,
    /// Properties to resolve keyed by entity kind (`fetch-<kind>`)
    pub fetch_properties: BTreeMap<String, Vec<String>>,
    /// Properties to translate keyed by entity kind (`translate-<kind>`)
    pub translate_properties: BTreeMap<String, Vec<String>>,
    /// Schemas to return (`properties`)
    pub schemas: Vec<String>,
    /// Tree depth, ignored when zero
    pub depth: u32,
    pub versioning: Option<VersioningOption>,
    /// Server-side transaction timeout, advisory. Sent in whole seconds,
    /// rounded up.
    #[serde(with = "opt_secs")]
    pub transaction_timeout: Option<Duration>,
    /// Client-side deadline, sent to the Server as `timeout`
    #[serde(with = "opt_secs")]
    pub http_timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn repository(mut self, name: impl Into<String>) -> Self {
        self.repository = Some(name.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn enricher(mut self, kind: impl Into<String>, name: impl Into<String>) -> Self {
        self.enrichers.entry(kind.into()).or_default().push(name.into());
        self
    }

    pub fn fetch_property(mut self, kind: impl Into<String>, name: impl Into<String>) -> Self {
        self.fetch_properties
            .entry(kind.into())
            .or_default()
            .push(name.into());
        self
    }

    pub fn translate_property(mut self, kind: impl Into<String>, name: impl Into<String>) -> Self {
        self.translate_properties
            .entry(kind.into())
            .or_default()
            .push(name.into());
        self
    }

    pub fn schema(mut self, name: impl Into<String>) -> Self {
        self.schemas.push(name.into());
        self
    }

    pub fn schemas<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.schemas.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }

    pub fn versioning(mut self, option: VersioningOption) -> Self {
        self.versioning = Some(option);
        self
    }

    pub fn transaction_timeout(mut self, timeout: Duration) -> Self {
        self.transaction_timeout = Some(timeout);
        self
    }

    pub fn http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = Some(timeout);
        self
    }

    /// Layer `overrides` on top of `self`.
    pub fn merged(&self, overrides: &RequestOptions) -> RequestOptions {
        let mut merged = self.clone();
        if overrides.repository.is_some() {
            merged.repository = overrides.repository.clone();
        }
        merged.headers.extend(overrides.headers.clone());
        merged.enrichers.extend(overrides.enrichers.clone());
        merged.fetch_properties.extend(overrides.fetch_properties.clone());
        merged
            .translate_properties
            .extend(overrides.translate_properties.clone());
        if !overrides.schemas.is_empty() {
            merged.schemas = overrides.schemas.clone();
        }
        if overrides.depth > 0 {
            merged.depth = overrides.depth;
        }
        if overrides.versioning.is_some() {
            merged.versioning = overrides.versioning;
        }
        if non_zero(overrides.transaction_timeout).is_some() {
            merged.transaction_timeout = overrides.transaction_timeout;
        }
        if non_zero(overrides.http_timeout).is_some() {
            merged.http_timeout = overrides.http_timeout;
        }
        merged
    }

    /// HTTP deadline: the explicit one, else the transaction timeout plus
    /// a grace period.
    pub fn effective_http_timeout(&self) -> Option<Duration> {
        non_zero(self.http_timeout).or_else(|| {
            non_zero(self.transaction_timeout)
                .map(|tx| tx + Duration::from_secs(TIMEOUT_GRACE_SECS))
        })
    }

    /// Write the options into `headers`.
    pub fn apply(&self, headers: &mut HeaderMap) -> Result<()> {
        if let Some(repository) = &self.repository {
            insert(headers, REPOSITORY_HEADER, repository)?;
        }
        for (name, value) in &self.headers {
            insert(headers, name, value)?;
        }
        for (prefix, per_kind) in [
            ("enrichers", &self.enrichers),
            ("fetch", &self.fetch_properties),
            ("translate", &self.translate_properties),
        ] {
            for (kind, values) in per_kind {
                if !values.is_empty() {
                    insert(headers, &format!("{}-{}", prefix, kind), &values.join(","))?;
                }
            }
        }
        if !self.schemas.is_empty() {
            insert(headers, PROPERTIES_HEADER, &self.schemas.join(","))?;
        }
        if self.depth > 0 {
            insert(headers, DEPTH_HEADER, &self.depth.to_string())?;
        }
        if let Some(versioning) = self.versioning {
            insert(headers, VERSIONING_HEADER, versioning.as_str())?;
        }
        if let Some(tx) = non_zero(self.transaction_timeout) {
            insert(headers, TRANSACTION_TIMEOUT_HEADER, &whole_secs(tx).to_string())?;
        }
        if let Some(timeout) = self.effective_http_timeout() {
            insert(headers, TIMEOUT_HEADER, &whole_secs(timeout).to_string())?;
        }
        Ok(())
    }
}

fn non_zero(duration: Option<Duration>) -> Option<Duration> {
    duration.filter(|d| !d.is_zero())
}

// rounds up so a sub-second timeout never reaches the Server as 0
fn whole_secs(duration: Duration) -> u64 {
    duration.as_secs() + u64::from(duration.subsec_nanos() > 0)
}

fn insert(headers: &mut HeaderMap, name: &str, value: &str) -> Result<()> {
    let name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| ClientError::Config(format!("invalid header name: {}", name)))?;
    let value = HeaderValue::from_str(value)
        .map_err(|_| ClientError::Config(format!("invalid value for header {}", name)))?;
    headers.insert(name, value);
    Ok(())
}

mod opt_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&d.as_secs()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_secs))
    }
}
