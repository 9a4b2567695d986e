//! Badge models

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use serde_with::{serde_as, BoolFromInt};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Badge identifier: local ids are integers, external registries may use text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum BadgeId {
    Int(i64),
    Text(String),
}

impl BadgeId {
    /// The local store id, when this identifier can be one
    pub fn as_local(&self) -> Option<i64> {
        match self {
            BadgeId::Int(id) => Some(*id),
            BadgeId::Text(text) => text.trim().parse().ok(),
        }
    }
}

impl std::fmt::Display for BadgeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BadgeId::Int(id) => write!(f, "{}", id),
            BadgeId::Text(text) => write!(f, "{}", text),
        }
    }
}

/// Where a badge came from. Assigned at aggregation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BadgeSource {
    Local,
    External,
    ExternalPrincipaux,
}

impl std::fmt::Display for BadgeSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            BadgeSource::Local => "local",
            BadgeSource::External => "external",
            BadgeSource::ExternalPrincipaux => "external_principaux",
        };
        write!(f, "{}", label)
    }
}

/// Which sources contribute to a listing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SourceScope {
    #[default]
    All,
    Local,
    External,
    ExternalPrincipaux,
    /// An unrecognized source name, matching nothing
    Unknown,
}

impl SourceScope {
    /// Parse a `source=` value. Unknown names select no source.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "" | "all" => SourceScope::All,
            "local" => SourceScope::Local,
            "external" => SourceScope::External,
            "external_principaux" => SourceScope::ExternalPrincipaux,
            _ => SourceScope::Unknown,
        }
    }

    pub fn includes(self, source: BadgeSource) -> bool {
        matches!(
            (self, source),
            (SourceScope::All, _)
                | (SourceScope::Local, BadgeSource::Local)
                | (SourceScope::External, BadgeSource::External)
                | (SourceScope::ExternalPrincipaux, BadgeSource::ExternalPrincipaux)
        )
    }
}

/// Row of the `badges` table
#[derive(Debug, Clone, FromRow)]
pub struct BadgeRow {
    pub id: i64,
    pub last_name: String,
    pub first_name: String,
    pub validated: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Badge as returned to the front-end, whatever its source
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Badge {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<BadgeId>,
    /// Last name
    #[serde(rename = "nom")]
    pub last_name: String,
    /// First name
    #[serde(rename = "prenom")]
    pub first_name: String,
    /// Validation flag, 0 or 1 on the wire
    #[serde(rename = "valide")]
    #[serde_as(as = "BoolFromInt")]
    #[schema(value_type = i32)]
    pub validated: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub source: BadgeSource,
}

impl Badge {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Case-insensitive substring match on last name, first name or id.
    /// Records from source A are also matched on their email.
    pub fn matches_search(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        if self.last_name.to_lowercase().contains(&needle)
            || self.first_name.to_lowercase().contains(&needle)
        {
            return true;
        }
        if let Some(id) = &self.id {
            if id.to_string().contains(&needle) {
                return true;
            }
        }
        self.source == BadgeSource::External
            && self
                .email
                .as_deref()
                .is_some_and(|email| email.to_lowercase().contains(&needle))
    }
}

impl From<BadgeRow> for Badge {
    fn from(row: BadgeRow) -> Self {
        Self {
            id: Some(BadgeId::Int(row.id)),
            last_name: row.last_name,
            first_name: row.first_name,
            validated: row.validated,
            created_at: Some(row.created_at),
            updated_at: Some(row.updated_at),
            email: None,
            source: BadgeSource::Local,
        }
    }
}

/// Listing query parameters, taken as text and parsed leniently
#[derive(Debug, Default, Clone, Deserialize, IntoParams, ToSchema)]
pub struct BadgeQuery {
    /// Keep only badges with this validation flag (0 or 1). Non-integers are ignored.
    #[param(value_type = Option<i32>)]
    #[schema(value_type = Option<i32>)]
    pub valide: Option<String>,
    /// Case-insensitive substring over names and id
    pub search: Option<String>,
    /// `all`, `local`, `external` or `external_principaux`. Other names list nothing.
    pub source: Option<String>,
}

/// Predicates applied by the aggregator
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BadgeFilter {
    pub validated: Option<bool>,
    pub search: Option<String>,
    pub scope: SourceScope,
}

impl From<BadgeQuery> for BadgeFilter {
    fn from(query: BadgeQuery) -> Self {
        Self {
            validated: query
                .valide
                .and_then(|v| v.trim().parse::<i64>().ok())
                .map(|v| v != 0),
            search: query.search.filter(|s| !s.is_empty()),
            scope: query.source.as_deref().map(SourceScope::parse).unwrap_or_default(),
        }
    }
}

impl BadgeFilter {
    /// Whether a badge survives the filter.
    ///
    /// Source B listings never apply the validation filter: its registry
    /// has always been listed that way and clients rely on it.
    pub fn accepts(&self, badge: &Badge) -> bool {
        if badge.source != BadgeSource::ExternalPrincipaux {
            if let Some(validated) = self.validated {
                if badge.validated != validated {
                    return false;
                }
            }
        }
        match &self.search {
            Some(needle) => badge.matches_search(needle),
            None => true,
        }
    }
}

/// Payload accepted by create, update and print endpoints.
///
/// The front-end sends either `nom`/`prenom` or `last_name`/`first_name`;
/// the French keys win when both are present.
#[derive(Debug, Default, Clone, Deserialize, ToSchema)]
pub struct BadgePayload {
    #[schema(value_type = Option<String>)]
    pub id: Option<BadgeId>,
    pub nom: Option<String>,
    pub prenom: Option<String>,
    pub last_name: Option<String>,
    pub first_name: Option<String>,
    /// 0/1, true/false or "oui"/"non"
    #[serde(default, deserialize_with = "deserialize_flag")]
    #[schema(value_type = Option<i32>)]
    pub valide: Option<bool>,
}

impl BadgePayload {
    pub fn last_name(&self) -> Option<&str> {
        self.nom.as_deref().or(self.last_name.as_deref())
    }

    pub fn first_name(&self) -> Option<&str> {
        self.prenom.as_deref().or(self.first_name.as_deref())
    }

    /// Build a creation request, rejecting missing or empty names
    pub fn into_create(self, default_validated: bool) -> AppResult<CreateBadge> {
        let create = CreateBadge {
            last_name: self.last_name().unwrap_or_default().to_string(),
            first_name: self.first_name().unwrap_or_default().to_string(),
            validated: self.valide.unwrap_or(default_validated),
        };
        create.check()?;
        Ok(create)
    }

    /// Build an update request. Absent names are kept, empty names rejected.
    pub fn into_update(self) -> AppResult<UpdateBadge> {
        let last_name = self.last_name().map(str::to_string);
        let first_name = self.first_name().map(str::to_string);
        if [&last_name, &first_name]
            .into_iter()
            .flatten()
            .any(|name| name.trim().is_empty())
        {
            return Err(AppError::Validation(
                "last_name and first_name cannot be empty".to_string(),
            ));
        }
        Ok(UpdateBadge {
            last_name,
            first_name,
            validated: self.valide,
        })
    }
}

/// Create badge request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateBadge {
    #[validate(length(min = 1, message = "last name is required"))]
    pub last_name: String,
    #[validate(length(min = 1, message = "first name is required"))]
    pub first_name: String,
    #[serde(default)]
    pub validated: bool,
}

impl CreateBadge {
    pub fn new(last_name: impl Into<String>, first_name: impl Into<String>, validated: bool) -> Self {
        Self {
            last_name: last_name.into(),
            first_name: first_name.into(),
            validated,
        }
    }

    pub fn check(&self) -> AppResult<()> {
        if self.last_name.is_empty() || self.first_name.is_empty() {
            return Err(AppError::Validation(
                "last_name and first_name are required".to_string(),
            ));
        }
        self.validate()?;
        Ok(())
    }
}

/// Update badge request
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateBadge {
    pub last_name: Option<String>,
    pub first_name: Option<String>,
    pub validated: Option<bool>,
}

/// Body of `POST /api/validate/{id}`
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ValidateBadge {
    /// Defaults to 1 when omitted
    #[serde(default, deserialize_with = "deserialize_flag")]
    #[schema(value_type = Option<i32>)]
    pub valide: Option<bool>,
}

/// Badge record from an external registry, decoded leniently.
///
/// Registries disagree on key names and value types, so every field is
/// optional and looked up under each known spelling.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExternalBadgeRecord {
    pub id: Option<BadgeId>,
    pub last_name: Option<String>,
    pub first_name: Option<String>,
    pub validated: Option<bool>,
    pub email: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

const LAST_NAME_KEYS: &[&str] = &["nom", "last_name", "lastname", "Nom"];
const FIRST_NAME_KEYS: &[&str] = &["prenom", "first_name", "firstname", "Prénom", "prénom"];
const VALIDATED_KEYS: &[&str] = &["valide", "validated", "Validé"];

impl ExternalBadgeRecord {
    /// Decode one JSON object. Non-objects yield `None`.
    pub fn from_json(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        Some(Self {
            id: object.get("id").and_then(badge_id),
            last_name: text_field(object, LAST_NAME_KEYS),
            first_name: text_field(object, FIRST_NAME_KEYS),
            validated: VALIDATED_KEYS
                .iter()
                .find_map(|key| object.get(*key).and_then(flag_value)),
            email: text_field(object, &["email"]),
            created_at: object.get("created_at").and_then(timestamp),
            updated_at: object.get("updated_at").and_then(timestamp),
        })
    }

    /// Normalize into a badge. Missing names become empty, missing flag is false.
    pub fn into_badge(self, source: BadgeSource) -> Badge {
        Badge {
            id: self.id,
            last_name: self.last_name.unwrap_or_default(),
            first_name: self.first_name.unwrap_or_default(),
            validated: self.validated.unwrap_or(false),
            created_at: self.created_at,
            updated_at: self.updated_at,
            email: self.email,
            source,
        }
    }
}

fn badge_id(value: &Value) -> Option<BadgeId> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .map(BadgeId::Int)
            .or_else(|| Some(BadgeId::Text(n.to_string()))),
        Value::String(s) if !s.is_empty() => Some(BadgeId::Text(s.clone())),
        _ => None,
    }
}

fn text_field(object: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match object.get(*key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let text = value.as_str()?;
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

/// Interpret a loosely typed boolean (1, true, "oui", "yes", ...)
pub fn flag_value(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => Some(is_truthy(s)),
        _ => None,
    }
}

/// Spreadsheet and payload spellings of "validated"
pub fn is_truthy(text: &str) -> bool {
    matches!(
        text.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "oui" | "validé"
    )
}

fn deserialize_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(flag_value))
}
