//! The on-disk job description corpus.
//!
//! The corpus is a JSON array of `{"title", "jd"}` objects and is the single
//! source of truth for JD content; the vector index is derived from it.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::error::{RecommendError, Result};

/// A job description keyed by its title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JdRecord {
    pub title: String,
    pub jd: String,
}

impl JdRecord {
    pub fn new(title: impl Into<String>, jd: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            jd: jd.into(),
        }
    }

    /// Whether this record's title matches `title`, ignoring case.
    pub fn has_title(&self, title: &str) -> bool {
        self.title.to_lowercase() == title.to_lowercase()
    }
}

/// Replace any record whose title matches case-insensitively and append
/// `record` at the end.
///
/// Returns `true` if at least one record was replaced.
pub fn upsert_record(records: &mut Vec<JdRecord>, record: JdRecord) -> bool {
    let before = records.len();
    records.retain(|existing| !existing.has_title(&record.title));
    let replaced = records.len() != before;
    records.push(record);
    replaced
}

/// Handle to the corpus file.
#[derive(Debug, Clone)]
pub struct CorpusFile {
    path: PathBuf,
}

impl CorpusFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the corpus for indexing.
    ///
    /// A missing file is [`RecommendError::CorpusNotFound`]; content that is
    /// not a JSON array of records is [`RecommendError::MalformedCorpus`].
    pub async fn load(&self) -> Result<Vec<JdRecord>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(RecommendError::CorpusNotFound(self.path.clone()));
            }
            Err(e) => return Err(e.into()),
        };

        let records: Vec<JdRecord> =
            serde_json::from_str(&content).map_err(|source| RecommendError::MalformedCorpus {
                path: self.path.clone(),
                source,
            })?;

        debug!(
            "Found {} job descriptions in {}",
            records.len(),
            self.path.display()
        );
        Ok(records)
    }

    /// Load the corpus ahead of an edit.
    ///
    /// A missing file is an empty corpus. A malformed file is an error so its
    /// content is not silently overwritten; with `force` it is treated as
    /// empty and the next save replaces it.
    pub async fn load_for_edit(&self, force: bool) -> Result<Vec<JdRecord>> {
        match self.load().await {
            Ok(records) => Ok(records),
            Err(RecommendError::CorpusNotFound(_)) => Ok(Vec::new()),
            Err(RecommendError::MalformedCorpus { path, source }) if force => {
                warn!(
                    "Discarding malformed corpus {}: {source}",
                    path.display()
                );
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    /// Write the full corpus, pretty-printed with 2-space indentation.
    pub async fn save(&self, records: &[JdRecord]) -> Result<()> {
        let content = serde_json::to_string_pretty(records)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, content).await?;
        fs::rename(&temp_path, &self.path).await?;

        info!(
            "Saved {} job descriptions to {}",
            records.len(),
            self.path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_upsert_replaces_case_insensitively() {
        let mut records = vec![
            JdRecord::new("Backend Developer", "old"),
            JdRecord::new("Data Scientist", "models"),
        ];

        let replaced = upsert_record(&mut records, JdRecord::new("backend DEVELOPER", "new"));

        assert!(replaced);
        assert_eq!(
            records,
            vec![
                JdRecord::new("Data Scientist", "models"),
                JdRecord::new("backend DEVELOPER", "new"),
            ]
        );
    }

    #[test]
    fn test_upsert_appends_new_title() {
        let mut records = vec![JdRecord::new("Backend Developer", "Build APIs.")];
        assert!(!upsert_record(&mut records, JdRecord::new("QA Engineer", "Test.")));
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].title, "QA Engineer");
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let corpus = CorpusFile::new(dir.path().join("jds.json"));

        assert!(matches!(
            corpus.load().await,
            Err(RecommendError::CorpusNotFound(_))
        ));
        assert!(corpus.load_for_edit(false).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_file_needs_force() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("jds.json");
        std::fs::write(&path, "{not json").unwrap();
        let corpus = CorpusFile::new(&path);

        assert!(matches!(
            corpus.load_for_edit(false).await,
            Err(RecommendError::MalformedCorpus { .. })
        ));
        assert!(corpus.load_for_edit(true).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_is_pretty_printed() {
        let dir = TempDir::new().unwrap();
        let corpus = CorpusFile::new(dir.path().join("data").join("jds.json"));
        let records = vec![JdRecord::new("Backend Developer", "Build APIs.")];

        corpus.save(&records).await.unwrap();

        let written = std::fs::read_to_string(corpus.path()).unwrap();
        assert_eq!(
            written,
            "[\n  {\n    \"title\": \"Backend Developer\",\n    \"jd\": \"Build APIs.\"\n  }\n]"
        );
        assert_eq!(corpus.load().await.unwrap(), records);
    }
}
