//! Content-storage DTOs

use serde::{Deserialize, Serialize};

/// Where an artifact's bytes go in the content store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreTarget {
    pub repo_name: String,
    pub branch: String,
    pub run_number: u64,
    pub artifact_name: String,
}

impl StoreTarget {
    /// File name under which the artifact archive is stored
    pub fn file_name(&self) -> String {
        format!("{}.zip", self.artifact_name)
    }

    /// Path segments below the store's base URL, unescaped:
    /// `<repo>/<branch>/<run_number>/<artifact>.zip`
    pub fn segments(&self) -> [String; 4] {
        [
            self.repo_name.clone(),
            self.branch.clone(),
            self.run_number.to_string(),
            self.file_name(),
        ]
    }
}

/// Reference to stored content, returned by a successful upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageRef {
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_path_layout() {
        let target = StoreTarget {
            repo_name: "proton-builder".to_string(),
            branch: "main".to_string(),
            run_number: 12,
            artifact_name: "python-3.9-pkgs".to_string(),
        };
        assert_eq!(
            target.segments(),
            ["proton-builder", "main", "12", "python-3.9-pkgs.zip"].map(String::from)
        );
    }
}
