use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use url::Url;

use crate::config::{Channel, Config, EpisodeText};
use crate::episode::Retention;
use crate::error::{Error, Result};
use crate::feed::{project_items, FeedRenderer};
use crate::fs_util::write_atomic;
use crate::library::{CleanupReport, EpisodeSource, Library};
use crate::metadata::MetadataFile;

/// Both flows over one content directory.
pub struct Podcast {
    library: Library,
    renderer: FeedRenderer,
    channel: Channel,
    episode_text: EpisodeText,
    base_url: Url,
    feed_path: PathBuf,
}

#[derive(Debug)]
pub struct FeedSummary {
    pub path: PathBuf,
    pub episodes: usize,
}

impl Podcast {
    pub fn new(config: &Config) -> Result<Self> {
        let source = match &config.metadata_path {
            Some(path) => EpisodeSource::Metadata(MetadataFile::new(path.clone())),
            None => EpisodeSource::Directory,
        };

        Ok(Podcast {
            library: Library::new(config.content_dir.clone(), source),
            renderer: FeedRenderer::new()?,
            channel: config.channel.clone(),
            episode_text: config.episode.clone(),
            base_url: config.base_url.clone(),
            feed_path: config.feed_path.clone(),
        })
    }

    pub fn feed_path(&self) -> &Path {
        self.feed_path.as_path()
    }

    /// Cleanup with a cutoff of today (UTC) minus the retention window.
    pub fn cleanup(&self) -> Result<CleanupReport> {
        self.cleanup_with(&Retention::now())
    }

    pub fn cleanup_with(&self, retention: &Retention) -> Result<CleanupReport> {
        self.library.cleanup(retention)
    }

    pub fn render_feed(&self) -> Result<String> {
        self.render().map(|(xml, _)| xml)
    }

    pub fn write_feed(&self) -> Result<FeedSummary> {
        let (xml, episodes) = self.render()?;
        write_atomic(&self.feed_path, xml.as_bytes())
            .map_err(|err| Error::io(&self.feed_path, err))?;

        tracing::info!(path = %self.feed_path.display(), episodes, "feed generated");
        Ok(FeedSummary {
            path: self.feed_path.clone(),
            episodes,
        })
    }

    /// The last written feed document.
    pub fn cached_feed(&self) -> io::Result<String> {
        fs::read_to_string(&self.feed_path)
    }

    fn render(&self) -> Result<(String, usize)> {
        let items = project_items(&self.library, &self.base_url, &self.episode_text)?;
        let xml = self.renderer.render(&self.channel, &items)?;
        Ok((xml, items.len()))
    }
}
