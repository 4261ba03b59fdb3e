//! Shared request and response types.
//!
//! Scan results are deliberately schemaless: [`ResultRecord`] carries the
//! server's JSON object through untouched so the client never has to track
//! the evolving result format.

use crate::error::CoreError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::OnceLock;

/// Visibility of a newly submitted scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Listed publicly on urlscan.io
    Public,
    /// Only visible to the submitter
    Private,
    /// Not listed, but visible to urlscan security researchers
    Unlisted,
}

impl Visibility {
    /// Wire name of the visibility.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
            Self::Unlisted => "unlisted",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Visibility {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Self::Public),
            "private" => Ok(Self::Private),
            "unlisted" => Ok(Self::Unlisted),
            other => Err(CoreError::Validation(format!(
                "visibility must be public, private or unlisted, got '{other}'"
            ))),
        }
    }
}

/// Visibility that can be applied to an existing scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateVisibility {
    /// Make public
    Public,
    /// Make private
    Private,
    /// Make unlisted
    Unlisted,
    /// Hide the scan entirely
    Deleted,
}

/// Who besides the owner may see or edit a Pro resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Permission {
    /// Readable by every urlscan Pro user
    #[serde(rename = "public:read")]
    PublicRead,
    /// Readable by the team
    #[serde(rename = "team:read")]
    TeamRead,
    /// Editable by the team
    #[serde(rename = "team:write")]
    TeamWrite,
}

/// How often notifications are sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    /// As soon as something matches
    Live,
    /// Hourly digest
    Hourly,
    /// Daily digest
    Daily,
}

/// Day of the week notifications are generated on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum WeekDay {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

/// Traffic Light Protocol marking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tlp {
    /// TLP:RED
    Red,
    /// TLP:AMBER+STRICT
    #[serde(rename = "amber+strict")]
    AmberStrict,
    /// TLP:AMBER
    Amber,
    /// TLP:GREEN
    Green,
    /// TLP:CLEAR
    Clear,
}

/// Visibility of the scans an incident triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncidentVisibility {
    /// Not listed
    Unlisted,
    /// Only visible to the owner
    Private,
}

/// Data source of a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchDataSource {
    /// urlscan.io scans
    Scans,
    /// Observed hostnames (Pro)
    Hostnames,
    /// Incidents (Pro)
    Incidents,
    /// Notifications (Pro)
    Notifications,
    /// Certificates (Pro)
    Certificates,
}

impl SearchDataSource {
    /// Wire name used as the `datasource` query parameter.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scans => "scans",
            Self::Hostnames => "hostnames",
            Self::Incidents => "incidents",
            Self::Notifications => "notifications",
            Self::Certificates => "certificates",
        }
    }
}

impl std::str::FromStr for SearchDataSource {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scans" => Ok(Self::Scans),
            "hostnames" => Ok(Self::Hostnames),
            "incidents" => Ok(Self::Incidents),
            "notifications" => Ok(Self::Notifications),
            "certificates" => Ok(Self::Certificates),
            other => Err(CoreError::Validation(format!(
                "unknown search datasource '{other}'"
            ))),
        }
    }
}

/// Resource kinds served by a live scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveScanResourceType {
    /// Scan result JSON
    Result,
    /// Screenshot PNG
    Screenshot,
    /// Rendered DOM
    Dom,
    /// Raw response body, addressed by SHA256
    Response,
    /// Downloaded file, addressed by SHA256
    Download,
}

impl LiveScanResourceType {
    /// Path segment for the resource type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Result => "result",
            Self::Screenshot => "screenshot",
            Self::Dom => "dom",
            Self::Response => "response",
            Self::Download => "download",
        }
    }
}

/// A single scan result or search hit.
///
/// The wrapped object is exactly what the server returned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultRecord(Map<String, Value>);

impl ResultRecord {
    /// Wrap a JSON object.
    #[must_use]
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Look up a top-level field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Look up a nested field by JSON pointer, e.g. `/task/uuid`.
    ///
    /// `~1` and `~0` in a segment stand for `/` and `~`. The empty pointer
    /// would name the record itself and yields `None`.
    #[must_use]
    pub fn pointer(&self, pointer: &str) -> Option<&Value> {
        let mut parts = pointer.strip_prefix('/')?.splitn(2, '/');
        let first = parts.next()?;
        let value = if first.contains('~') {
            self.0.get(&first.replace("~1", "/").replace("~0", "~"))?
        } else {
            self.0.get(first)?
        };
        match parts.next() {
            Some(rest) => value.pointer(&format!("/{rest}")),
            None => Some(value),
        }
    }

    /// Identifier of the record: search hits carry `_id`, results carry `task.uuid`.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.get("_id")
            .or_else(|| self.pointer("/task/uuid"))
            .and_then(Value::as_str)
    }

    /// Borrow the underlying object.
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consume the record and return the underlying object.
    #[must_use]
    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl TryFrom<Value> for ResultRecord {
    type Error = CoreError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(fields) => Ok(Self(fields)),
            other => Err(CoreError::Validation(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }
}

impl From<ResultRecord> for Value {
    fn from(record: ResultRecord) -> Self {
        Value::Object(record.0)
    }
}

/// Options for submitting a scan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanOptions {
    /// Requested visibility
    pub visibility: Visibility,
    /// Tags attached to the scan
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Custom user agent for the scanning browser
    #[serde(rename = "customagent", skip_serializing_if = "Option::is_none")]
    pub custom_agent: Option<String>,
    /// Referer header for the scanning browser
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referer: Option<String>,
    /// Disables reclassification of URLs that may contain PII
    #[serde(rename = "overrideSafety", skip_serializing_if = "Option::is_none")]
    pub override_safety: Option<Value>,
    /// Two-letter country the scan runs from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl ScanOptions {
    /// Options with the given visibility and nothing else set.
    #[must_use]
    pub fn new(visibility: Visibility) -> Self {
        Self {
            visibility,
            tags: Vec::new(),
            custom_agent: None,
            referer: None,
            override_safety: None,
            country: None,
        }
    }

    /// Attach a tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Set a custom user agent.
    #[must_use]
    pub fn with_custom_agent(mut self, agent: impl Into<String>) -> Self {
        self.custom_agent = Some(agent.into());
        self
    }

    /// Set the referer.
    #[must_use]
    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self
    }

    /// Set the `overrideSafety` flag.
    #[must_use]
    pub fn with_override_safety(mut self, value: Value) -> Self {
        self.override_safety = Some(value);
        self
    }

    /// Set the scanning country (ISO 3166-1 alpha-2).
    ///
    /// # Errors
    /// Returns error if the code is not two ASCII letters.
    pub fn with_country(mut self, country: impl Into<String>) -> Result<Self, CoreError> {
        let country = country.into().to_ascii_lowercase();
        validate_country(&country)?;
        self.country = Some(country);
        Ok(self)
    }
}

fn validate_country(code: &str) -> Result<(), CoreError> {
    static COUNTRY_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = COUNTRY_REGEX.get_or_init(|| Regex::new(r"^[a-z]{2}$").expect("valid regex"));

    if regex.is_match(code) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "invalid country: must be a two-letter ISO 3166-1 code, got '{code}'"
        )))
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
