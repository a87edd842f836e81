use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

const DEFAULT_BASE_URL: &str = "https://sa-news-podcast.vercel.app/";

/// How `GET /api/podcast-feed` produces its body.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeedServing {
    /// Serve the file written by the last feed generation.
    Static,
    /// Render from the current episodes on every request.
    Dynamic,
}

/// Channel-level fields of the feed document.
#[derive(Clone, Debug, Serialize)]
pub struct Channel {
    pub title: String,
    pub link: String,
    pub language: String,
    pub description: String,
    pub author: String,
    pub owner_name: Option<String>,
    pub owner_email: Option<String>,
    pub image_url: String,
    pub category: String,
    pub explicit: bool,
}

/// Fixed text used for every feed item.
#[derive(Clone, Debug)]
pub struct EpisodeText {
    pub title_prefix: String,
    pub description: String,
    pub duration: String,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub content_dir: PathBuf,
    pub feed_path: PathBuf,
    pub metadata_path: Option<PathBuf>,
    pub base_url: Url,
    pub feed_serving: FeedServing,
    pub cleanup_key: Option<String>,
    pub port: u16,
    pub channel: Channel,
    pub episode: EpisodeText,
}

#[derive(Deserialize)]
struct Secrets {
    #[serde(default)]
    cleanup: Option<CleanupSecrets>,
}

#[derive(Deserialize)]
struct CleanupSecrets {
    secret_key: String,
}

impl Config {
    pub fn from_env() -> Result<Config> {
        Config::from_vars(|key| dotenv::var(key).ok())
    }

    pub fn from_vars<F>(var: F) -> Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| var(key).filter(|value| !value.trim().is_empty());
        let or = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_owned());

        let content_dir = PathBuf::from(or("CONTENT_DIR", "public"));
        let feed_path = var("FEED_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| content_dir.join("feed.xml"));
        let metadata_path = var("METADATA_PATH").map(PathBuf::from);

        let base_url = parse_base_url(&or("BASE_URL", DEFAULT_BASE_URL))?;

        let feed_serving = match or("FEED_SERVING", "static").to_ascii_lowercase().as_str() {
            "static" => FeedServing::Static,
            "dynamic" => FeedServing::Dynamic,
            other => {
                return Err(Error::config(
                    "FEED_SERVING",
                    format!("expected `static` or `dynamic`, got `{}`", other),
                ))
            }
        };

        let port: u16 = or("PORT", "3000")
            .parse()
            .map_err(|err| Error::config("PORT", format!("{}", err)))?;

        let cleanup_key = match var("CLEANUP_SECRET_KEY") {
            Some(key) => Some(key),
            None => match var("SECRETS_FILE").map(PathBuf::from).or_else(default_secrets_path) {
                Some(path) => read_secret_key(&path)?,
                None => None,
            },
        };

        let channel = Channel {
            title: or("CHANNEL_TITLE", "Mzansi Lowdown: South African Daily News"),
            link: or("CHANNEL_LINK", base_url.as_str().trim_end_matches('/')),
            language: or("CHANNEL_LANGUAGE", "en-za"),
            description: or(
                "CHANNEL_DESCRIPTION",
                "Stay informed on South Africa's most important stories with our concise daily \
                 news podcast. In just 3-5 minutes each day, our AI podcast service collects & \
                 delivers headlines and key developments from trusted local news sources, \
                 including the Daily Maverick, Sunday Times, and Mail & Guardian.",
            ),
            author: or("CHANNEL_AUTHOR", "Let's Talk AI Tools"),
            owner_name: var("CHANNEL_OWNER_NAME"),
            owner_email: var("CHANNEL_OWNER_EMAIL"),
            image_url: var("CHANNEL_IMAGE_URL").unwrap_or_else(|| {
                format!("{}daily_news_icon.jpg", base_url.as_str())
            }),
            category: or("CHANNEL_CATEGORY", "News"),
            explicit: parse_bool("CHANNEL_EXPLICIT", &or("CHANNEL_EXPLICIT", "false"))?,
        };

        let episode = EpisodeText {
            title_prefix: or("EPISODE_TITLE_PREFIX", "SA News for"),
            description: or(
                "EPISODE_DESCRIPTION",
                "Your daily update on South African news.",
            ),
            duration: or("EPISODE_DURATION", "00:05:00"),
        };

        Ok(Config {
            content_dir,
            feed_path,
            metadata_path,
            base_url,
            feed_serving,
            cleanup_key,
            port,
            channel,
            episode,
        })
    }
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw).map_err(|err| Error::config("BASE_URL", err.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(Error::config("BASE_URL", "must be an absolute http(s) URL"));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn parse_bool(key: &'static str, raw: &str) -> Result<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        other => Err(Error::config(key, format!("expected a boolean, got `{}`", other))),
    }
}

fn default_secrets_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("sa-podcast").join("secrets.json"))
}

/// A missing secrets file or `cleanup` section means no key. An unreadable or
/// malformed file is an error.
fn read_secret_key(path: &Path) -> Result<Option<String>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(Error::io(path, err)),
    };

    let secrets: Secrets = serde_json::from_str(&raw)
        .map_err(|err| Error::config("SECRETS_FILE", format!("{}: {}", path.display(), err)))?;

    Ok(secrets
        .cleanup
        .map(|cleanup| cleanup.secret_key)
        .filter(|key| !key.trim().is_empty()))
}
