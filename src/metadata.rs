use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};

use crate::error::{Error, Result};
use crate::fs_util::write_atomic;

/// The `{"episodes": [...]}` document kept next to the audio files.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct MetadataIndex {
    #[serde(default)]
    pub episodes: Vec<EpisodeRecord>,
    #[serde(flatten)]
    pub extra: Map<String, Json>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeRecord {
    pub filename: String,
    pub upload_date: String,
    #[serde(flatten)]
    pub extra: Map<String, Json>,
}

pub struct MetadataFile {
    path: PathBuf,
}

impl MetadataFile {
    pub fn new(path: PathBuf) -> Self {
        MetadataFile { path }
    }

    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// A missing file is an empty index. Malformed JSON is an error.
    pub fn load(&self) -> Result<MetadataIndex> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "metadata index not found, treating as empty");
                return Ok(MetadataIndex::default());
            }
            Err(err) => return Err(Error::io(&self.path, err)),
        };

        serde_json::from_str(&raw).map_err(|source| Error::Metadata {
            path: self.path.clone(),
            source,
        })
    }

    pub fn save(&self, index: &MetadataIndex) -> Result<()> {
        let mut json = serde_json::to_vec_pretty(index).map_err(|source| Error::Metadata {
            path: self.path.clone(),
            source,
        })?;
        json.push(b'\n');
        write_atomic(&self.path, &json).map_err(|err| Error::io(&self.path, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_loads_as_empty_index() {
        let dir = tempfile::tempdir().unwrap();
        let file = MetadataFile::new(dir.path().join("episodes.json"));
        let index = file.load().unwrap();
        assert!(index.episodes.is_empty());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("episodes.json");
        fs::write(&path, "{\"episodes\": [").unwrap();
        let err = MetadataFile::new(path).load().unwrap_err();
        assert!(matches!(err, Error::Metadata { .. }));
    }

    #[test]
    fn save_preserves_unknown_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("episodes.json");
        fs::write(
            &path,
            r#"{"show":"daily","episodes":[{"filename":"2025-01-01.mp3","uploadDate":"2025-01-01","title":"New Year"}]}"#,
        )
        .unwrap();

        let file = MetadataFile::new(path.clone());
        let index = file.load().unwrap();
        assert_eq!(index.episodes[0].upload_date, "2025-01-01");
        file.save(&index).unwrap();

        let saved: Json = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved["show"], "daily");
        assert_eq!(saved["episodes"][0]["title"], "New Year");
        assert_eq!(saved["episodes"][0]["uploadDate"], "2025-01-01");
    }
}
