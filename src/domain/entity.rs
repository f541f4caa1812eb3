// Monitored entity an SLO is defined against
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Application,
    Website,
    Synthetic,
    Infrastructure,
    Unknown,
}

impl EntityType {
    pub const KNOWN: [EntityType; 4] = [
        Self::Application,
        Self::Website,
        Self::Synthetic,
        Self::Infrastructure,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Application => "application",
            Self::Website => "website",
            Self::Synthetic => "synthetic",
            Self::Infrastructure => "infrastructure",
            Self::Unknown => "unknown",
        }
    }

    /// Map a raw type tag onto a known type; unrecognised tags are `Unknown`
    pub fn from_tag(tag: &str) -> Self {
        let tag = tag.trim();
        Self::KNOWN
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(tag))
            .unwrap_or(Self::Unknown)
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw entity reference as delivered by the SLO list endpoint.
///
/// The backend is inconsistent about which field carries the type: newer
/// payloads use `type`, older ones `entityType`, and some omit both and only
/// populate an identifier. Any field may also hold the literal string
/// `"null"`, which is normalised to `None` on deserialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SloEntity {
    #[serde(
        rename = "type",
        default,
        deserialize_with = "null_literal_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub type_tag: Option<String>,
    #[serde(
        default,
        deserialize_with = "null_literal_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub entity_type: Option<String>,
    #[serde(
        default,
        deserialize_with = "null_literal_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub infra_type: Option<String>,
    #[serde(
        default,
        deserialize_with = "null_literal_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub application_id: Option<String>,
    #[serde(
        default,
        deserialize_with = "null_literal_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub website_id: Option<String>,
    #[serde(
        default,
        deserialize_with = "null_literals_dropped",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub synthetic_test_ids: Vec<String>,
}

impl SloEntity {
    #[cfg(test)]
    pub fn with_type(tag: &str) -> Self {
        Self {
            entity_type: normalize(Some(tag.to_string())),
            ..Self::default()
        }
    }

    /// Explicit tag if present and non-empty, otherwise inferred from the
    /// first populated identifier (application, website, synthetic, infra).
    pub fn entity_type(&self) -> EntityType {
        if let Some(tag) = self.explicit_tag() {
            return EntityType::from_tag(tag);
        }

        if is_populated(&self.application_id) {
            EntityType::Application
        } else if is_populated(&self.website_id) {
            EntityType::Website
        } else if !self.synthetic_test_ids.is_empty() {
            EntityType::Synthetic
        } else if is_populated(&self.infra_type) {
            EntityType::Infrastructure
        } else {
            EntityType::Unknown
        }
    }

    /// Type-specific identifier of the monitored resource
    pub fn entity_id(&self) -> Option<&str> {
        match self.entity_type() {
            EntityType::Application => non_empty(&self.application_id),
            EntityType::Website => non_empty(&self.website_id),
            EntityType::Synthetic => self.synthetic_test_ids.first().map(String::as_str),
            EntityType::Infrastructure | EntityType::Unknown => None,
        }
    }

    fn explicit_tag(&self) -> Option<&str> {
        [&self.entity_type, &self.type_tag]
            .into_iter()
            .find_map(non_empty)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn is_populated(value: &Option<String>) -> bool {
    non_empty(value).is_some()
}

fn normalize(value: Option<String>) -> Option<String> {
    value.filter(|v| v != "null")
}

fn null_literal_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(normalize(Option::<String>::deserialize(deserializer)?))
}

fn null_literals_dropped<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<Option<String>>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(normalize)
        .filter(|id| !id.trim().is_empty())
        .collect())
}
