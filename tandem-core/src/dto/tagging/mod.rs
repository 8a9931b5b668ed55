//! Tagging service DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Everything the tagging service records about one processed artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRequest {
    pub repo_name: String,
    pub branch: String,
    pub tag: String,
    pub run_number: u64,
    pub build_url: Option<String>,
    pub build_updated_at: Option<DateTime<Utc>>,
    pub artifact_name: String,
    pub storage_url: String,
    pub artifact_created_at: Option<DateTime<Utc>>,
}

/// Body of `PUT .../tags/{tag}/artifacts/{artifact}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedArtifact {
    #[serde(rename = "type")]
    pub kind: String,
    /// Epoch milliseconds
    pub update_time: Option<i64>,
    pub url: String,
    pub build_id: u64,
    pub build_url: Option<String>,
    pub build_update_time: Option<i64>,
}

impl From<&TagRequest> for TaggedArtifact {
    fn from(req: &TagRequest) -> Self {
        Self {
            kind: "file".to_string(),
            update_time: req.artifact_created_at.map(|t| t.timestamp_millis()),
            url: req.storage_url.clone(),
            build_id: req.run_number,
            build_url: req.build_url.clone(),
            build_update_time: req.build_updated_at.map(|t| t.timestamp_millis()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_tagged_artifact_uses_epoch_millis() {
        let created = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        let req = TagRequest {
            repo_name: "proton-builder".to_string(),
            branch: "main".to_string(),
            tag: "untested".to_string(),
            run_number: 12,
            build_url: None,
            build_updated_at: None,
            artifact_name: "dist".to_string(),
            storage_url: "http://store/proton-builder/main/12/dist.zip".to_string(),
            artifact_created_at: Some(created),
        };
        let body = TaggedArtifact::from(&req);
        assert_eq!(body.update_time, Some(created.timestamp_millis()));

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["type"], "file");
        assert_eq!(json["build_id"], 12);
    }
}
