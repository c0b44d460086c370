use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::{DataSource, LoadError, RawBody, Resource};

/// Reads exported JSON files from a local directory.
#[derive(Debug, Clone)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, resource: Resource) -> PathBuf {
        self.root.join(resource.file_name())
    }
}

#[async_trait]
impl DataSource for DirSource {
    fn describe(&self) -> String {
        self.root.display().to_string()
    }

    async fn fetch(&self, resource: Resource) -> Result<RawBody, LoadError> {
        let path = self.path_for(resource);
        let location = path.display().to_string();
        let text = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| LoadError::Io {
                resource,
                location: location.clone(),
                source,
            })?;

        Ok(RawBody {
            location,
            status: None,
            text,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;
    use crate::{LoadOptions, load_dataset};

    #[tokio::test]
    async fn dir_source_reads_exported_files() {
        let temp = tempdir().expect("tempdir");
        fs::write(temp.path().join("summary.json"), r#"{"rows": 10}"#).expect("write summary");
        fs::write(
            temp.path().join("anomalies.json"),
            r#"[{"price_amt": 5, "anomaly_method": "IQR"}]"#,
        )
        .expect("write anomalies");

        let source = DirSource::new(temp.path());
        let dataset = load_dataset(&source, LoadOptions::default())
            .await
            .expect("load dataset");

        assert_eq!(dataset.len(), 1);
        assert!(!dataset.groups().is_present());
    }

    #[tokio::test]
    async fn missing_required_file_is_an_io_error() {
        let temp = tempdir().expect("tempdir");
        fs::write(temp.path().join("anomalies.json"), "[]").expect("write anomalies");

        let source = DirSource::new(temp.path());
        let err = load_dataset(&source, LoadOptions::default())
            .await
            .expect_err("expected missing summary");

        assert!(matches!(
            err,
            LoadError::Io {
                resource: Resource::Summary,
                ..
            }
        ));
        assert!(err.to_string().contains("summary.json"));
    }

    #[tokio::test]
    async fn invalid_group_file_is_ignored() {
        let temp = tempdir().expect("tempdir");
        fs::write(temp.path().join("summary.json"), "{}").expect("write summary");
        fs::write(temp.path().join("anomalies.json"), "[]").expect("write anomalies");
        fs::write(temp.path().join("top_groups.json"), "{not json").expect("write groups");

        let source = DirSource::new(temp.path());
        let dataset = load_dataset(&source, LoadOptions::default())
            .await
            .expect("load dataset");

        assert!(!dataset.groups().is_present());
    }
}
