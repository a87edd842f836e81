use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::byte_size::humanize_byte_size;
use crate::episode::{parse_upload_date, sort_newest_first, Episode, Retention};
use crate::error::{Error, Result};
use crate::fs_util::is_plain_file_name;
use crate::metadata::{EpisodeRecord, MetadataFile};

/// Where the list of episodes comes from.
pub enum EpisodeSource {
    /// `YYYY-MM-DD.mp3` names in the content directory.
    Directory,
    /// Records in a metadata index; dates come from `uploadDate`.
    Metadata(MetadataFile),
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    pub deleted: usize,
    pub remaining: usize,
    pub failed: usize,
    pub freed_bytes: u64,
}

#[derive(Debug, PartialEq, Eq)]
pub enum FileSize {
    Known(u64),
    /// The file disappeared after it was listed.
    Gone,
    Unknown,
}

enum Removal {
    Deleted(u64),
    AlreadyGone,
    Failed,
}

pub struct Library {
    content_dir: PathBuf,
    source: EpisodeSource,
}

impl Library {
    pub fn new(content_dir: PathBuf, source: EpisodeSource) -> Self {
        Library {
            content_dir,
            source,
        }
    }

    pub fn content_dir(&self) -> &Path {
        self.content_dir.as_path()
    }

    /// Valid episodes, newest first.
    pub fn episodes(&self) -> Result<Vec<Episode>> {
        let mut episodes: Vec<Episode> = match &self.source {
            EpisodeSource::Directory => self
                .entry_names(true)?
                .iter()
                .filter_map(|name| Episode::from_file_name(name))
                .collect(),
            EpisodeSource::Metadata(file) => file
                .load()?
                .episodes
                .iter()
                .filter_map(record_to_episode)
                .collect(),
        };
        sort_newest_first(&mut episodes);
        Ok(episodes)
    }

    pub fn file_size(&self, file_name: &str) -> FileSize {
        match fs::metadata(self.content_dir.join(file_name)) {
            Ok(meta) => FileSize::Known(meta.len()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => FileSize::Gone,
            Err(err) => {
                tracing::warn!(file = file_name, error = %err, "could not read episode size");
                FileSize::Unknown
            }
        }
    }

    pub fn cleanup(&self, retention: &Retention) -> Result<CleanupReport> {
        tracing::info!(
            content_dir = %self.content_dir.display(),
            cutoff = %retention.cutoff(),
            "starting cleanup"
        );

        let report = match &self.source {
            EpisodeSource::Directory => self.cleanup_directory(retention)?,
            EpisodeSource::Metadata(file) => self.cleanup_index(file, retention)?,
        };

        tracing::info!(
            deleted = report.deleted,
            remaining = report.remaining,
            failed = report.failed,
            freed = %humanize_byte_size(report.freed_bytes),
            "cleanup complete"
        );
        Ok(report)
    }

    fn cleanup_directory(&self, retention: &Retention) -> Result<CleanupReport> {
        let mut report = CleanupReport::default();

        for file_name in self.entry_names(false)? {
            if !retention.is_old_episode(&file_name) {
                if Episode::from_file_name(&file_name).is_some() {
                    report.remaining += 1;
                }
                continue;
            }

            match self.remove(&file_name) {
                Removal::Deleted(size) => {
                    report.deleted += 1;
                    report.freed_bytes += size;
                }
                Removal::AlreadyGone => {}
                Removal::Failed => {
                    report.failed += 1;
                    report.remaining += 1;
                }
            }
        }

        Ok(report)
    }

    fn cleanup_index(&self, file: &MetadataFile, retention: &Retention) -> Result<CleanupReport> {
        let mut index = file.load()?;
        let mut report = CleanupReport::default();
        let before = index.episodes.len();

        let mut kept = Vec::with_capacity(before);
        for record in index.episodes.drain(..) {
            let expired = match record_to_episode(&record) {
                Some(episode) => retention.is_expired(episode.date),
                None => false,
            };

            if !expired {
                kept.push(record);
                continue;
            }

            match self.remove(&record.filename) {
                Removal::Deleted(size) => {
                    report.deleted += 1;
                    report.freed_bytes += size;
                }
                Removal::AlreadyGone => {}
                Removal::Failed => {
                    report.failed += 1;
                    kept.push(record);
                }
            }
        }

        let changed = kept.len() != before;
        index.episodes = kept;
        report.remaining = index.episodes.len();

        if changed {
            file.save(&index)?;
            tracing::info!(
                path = %file.path().display(),
                removed = before - report.remaining,
                "metadata index updated"
            );
        }

        Ok(report)
    }

    fn remove(&self, file_name: &str) -> Removal {
        let path = self.content_dir.join(file_name);
        let size = fs::metadata(&path).map(|meta| meta.len()).unwrap_or(0);

        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!(file = file_name, "deleted old episode");
                Removal::Deleted(size)
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::info!(file = file_name, "old episode already removed");
                Removal::AlreadyGone
            }
            Err(err) => {
                tracing::warn!(file = file_name, error = %err, "failed to delete old episode");
                Removal::Failed
            }
        }
    }

    /// Entry names in the content directory, optionally only regular files.
    /// A missing directory has no entries.
    fn entry_names(&self, files_only: bool) -> Result<Vec<String>> {
        let iter = match self.content_dir.read_dir() {
            Ok(iter) => iter,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::info!(
                    content_dir = %self.content_dir.display(),
                    "content directory does not exist"
                );
                return Ok(vec![]);
            }
            Err(err) => return Err(Error::io(&self.content_dir, err)),
        };

        Ok(iter
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| !files_only || path.is_file())
            .filter_map(|path| {
                path.file_name()
                    .and_then(|os_str| os_str.to_str())
                    .map(str::to_owned)
            })
            .collect())
    }
}

fn record_to_episode(record: &EpisodeRecord) -> Option<Episode> {
    if !is_plain_file_name(&record.filename) {
        tracing::warn!(file = %record.filename, "ignoring metadata record with unsafe file name");
        return None;
    }
    match parse_upload_date(&record.upload_date) {
        Some(date) => Some(Episode::new(record.filename.clone(), date)),
        None => {
            tracing::warn!(
                file = %record.filename,
                upload_date = %record.upload_date,
                "ignoring metadata record with invalid upload date"
            );
            None
        }
    }
}
