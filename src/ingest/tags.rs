use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::IngestError;

/// Header rename mapping chosen by the operator at upload time
///
/// Maps an original CSV header to a canonical channel name. Headers tagged
/// [`TagMapping::DISCONNECTED`] are dropped; untagged headers keep their
/// own name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagMapping {
    tags: HashMap<String, String>,
}

impl TagMapping {
    /// Tag for sensor columns that were not wired during the test
    pub const DISCONNECTED: &'static str = "Disconnected";

    /// Tags offered to operators; other names are accepted as passthrough
    pub const KNOWN_TAGS: &'static [&'static str] = &[
        "Tank",
        "Chamber",
        "Manifold",
        "Fill",
        "Cross",
        "Pneumatics",
        "Disconnected",
        "Time",
        "TankLC",
        "ThrustLC",
    ];

    pub fn new(tags: HashMap<String, String>) -> Result<Self, IngestError> {
        let tags: HashMap<String, String> = tags
            .into_iter()
            .map(|(header, tag)| (header.trim().to_string(), tag.trim().to_string()))
            .filter(|(_, tag)| !tag.is_empty())
            .collect();

        let mut owners: HashMap<&str, &str> = HashMap::new();
        let mut sorted: Vec<(&String, &String)> = tags.iter().collect();
        sorted.sort();
        for (header, tag) in sorted {
            if tag == Self::DISCONNECTED {
                continue;
            }
            if !Self::is_known_tag(tag) {
                tracing::debug!("Tag '{}' on '{}' is not a known channel, kept as-is", tag, header);
            }
            if let Some(first) = owners.insert(tag, header) {
                return Err(IngestError::DuplicateTag {
                    tag: tag.clone(),
                    first: first.to_string(),
                    second: header.clone(),
                });
            }
        }

        Ok(Self { tags })
    }

    /// Parse the JSON object sent alongside an upload
    pub fn from_json(json: &str) -> Result<Self, IngestError> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        let tags: HashMap<String, String> =
            serde_json::from_str(json).map_err(|e| IngestError::InvalidTags(e.to_string()))?;
        Self::new(tags)
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn is_known_tag(tag: &str) -> bool {
        Self::KNOWN_TAGS.contains(&tag)
    }

    /// Canonical name for `header`, or `None` when the column is dropped
    pub fn resolve<'a>(&'a self, header: &'a str) -> Option<&'a str> {
        match self.tags.get(header.trim()) {
            Some(tag) if tag == Self::DISCONNECTED => None,
            Some(tag) => Some(tag.as_str()),
            None => Some(header.trim()),
        }
    }

    /// Rename a header row
    ///
    /// Fails when two columns end up with the same canonical name, e.g. an
    /// untagged `Tank` column next to another column tagged `Tank`.
    pub fn apply(&self, headers: &[String]) -> Result<Vec<Option<String>>, IngestError> {
        let mut seen: HashMap<String, &str> = HashMap::new();
        let mut renamed = Vec::with_capacity(headers.len());

        for header in headers {
            let resolved = self.resolve(header).map(str::to_string);
            if let Some(name) = &resolved {
                if let Some(first) = seen.insert(name.clone(), header.as_str()) {
                    return Err(IngestError::DuplicateTag {
                        tag: name.clone(),
                        first: first.to_string(),
                        second: header.clone(),
                    });
                }
            }
            renamed.push(resolved);
        }

        Ok(renamed)
    }
}
