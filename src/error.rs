use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid value for {key}: {message}")]
    Config { key: &'static str, message: String },

    #[error("failed to access {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("malformed metadata index {}: {source}", .path.display())]
    Metadata {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to register feed template: {0}")]
    Template(#[from] Box<handlebars::TemplateError>),

    #[error("failed to render feed: {0}")]
    Render(#[from] handlebars::RenderError),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub fn config(key: &'static str, message: impl Into<String>) -> Self {
        Error::Config {
            key,
            message: message.into(),
        }
    }
}
