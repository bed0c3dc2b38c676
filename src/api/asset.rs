//! Purpose: Resolve asset references and implement the file/HTTP hero sources.
//! Exports: `AssetRef`, `FileSource`, `HttpSource`, `open_source`, `default_asset_ref`.
//! Role: Stable boundary between the store and where the seed records live.
//! Invariants: Refs starting with http:// or https:// are URLs; anything else is a path.
//! Invariants: Fetch failures carry kinds the store can log and swallow.
#![allow(clippy::result_large_err)]

use std::path::PathBuf;

use url::Url;

use crate::core::error::{Error, ErrorKind};
use crate::core::hero::Hero;
use crate::core::source::{HeroSource, parse_document};

/// The asset path the original catalog shipped its records under.
pub const DEFAULT_ASSET_PATH: &str = "assets/db.json";

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AssetRef {
    Path(PathBuf),
    Url(String),
}

impl AssetRef {
    pub fn parse(raw: &str) -> Self {
        if raw.starts_with("http://") || raw.starts_with("https://") {
            AssetRef::Url(raw.to_string())
        } else {
            AssetRef::Path(PathBuf::from(raw))
        }
    }

    pub fn describe(&self) -> String {
        match self {
            AssetRef::Path(path) => path.display().to_string(),
            AssetRef::Url(url) => url.clone(),
        }
    }
}

pub fn default_asset_ref() -> AssetRef {
    match std::env::var("HERODEX_DB") {
        Ok(value) if !value.is_empty() => AssetRef::parse(&value),
        _ => AssetRef::Path(PathBuf::from(DEFAULT_ASSET_PATH)),
    }
}

pub fn open_source(asset: &AssetRef) -> Result<Box<dyn HeroSource + Send + Sync>, Error> {
    match asset {
        AssetRef::Path(path) => Ok(Box::new(FileSource::new(path.clone()))),
        AssetRef::Url(raw) => Ok(Box::new(HttpSource::new(raw)?)),
    }
}

pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl HeroSource for FileSource {
    fn fetch_heroes(&self) -> Result<Vec<Hero>, Error> {
        let bytes = std::fs::read(&self.path).map_err(|err| {
            Error::new(map_io_error_kind(&err))
                .with_message("failed to read hero asset")
                .with_path(&self.path)
                .with_source(err)
        })?;
        parse_document(&bytes).map_err(|err| err.with_path(&self.path))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[derive(Debug)]
pub struct HttpSource {
    url: Url,
    agent: ureq::Agent,
}

impl HttpSource {
    pub fn new(raw: &str) -> Result<Self, Error> {
        let url = Url::parse(raw).map_err(|err| {
            Error::new(ErrorKind::Usage)
                .with_message("invalid asset url")
                .with_source(err)
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(
                Error::new(ErrorKind::Usage).with_message("asset url must use http or https")
            );
        }
        Ok(Self {
            url,
            agent: ureq::AgentBuilder::new().build(),
        })
    }
}

impl HeroSource for HttpSource {
    fn fetch_heroes(&self) -> Result<Vec<Hero>, Error> {
        let response = self
            .agent
            .request("GET", self.url.as_str())
            .set("Accept", "application/json")
            .call();
        let response = match response {
            Ok(resp) => resp,
            Err(ureq::Error::Status(code, _)) => {
                return Err(Error::new(ErrorKind::Fetch)
                    .with_message(format!("asset request returned status {code}")));
            }
            Err(ureq::Error::Transport(err)) => {
                return Err(Error::new(ErrorKind::Fetch)
                    .with_message("asset request failed")
                    .with_source(err));
            }
        };
        let body = response.into_string().map_err(|err| {
            Error::new(ErrorKind::Fetch)
                .with_message("failed to read asset response body")
                .with_source(err)
        })?;
        parse_document(body.as_bytes())
    }

    fn describe(&self) -> String {
        self.url.to_string()
    }
}

fn map_io_error_kind(err: &std::io::Error) -> ErrorKind {
    match err.kind() {
        std::io::ErrorKind::NotFound => ErrorKind::NotFound,
        _ => ErrorKind::Io,
    }
}
