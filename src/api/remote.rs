//! Purpose: Provide an HTTP client for the herodex serve protocol (JSON).
//! Exports: `RemoteClient`.
//! Role: Mirrors the local store operations against a running server.
//! Invariants: Request/response envelopes align with the serve routes.
//! Invariants: Server error envelopes decode back into `Error` values.
#![allow(clippy::result_large_err)]

use serde::Deserialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::core::error::{Error, ErrorKind};
use crate::core::hero::{Hero, ensure_hero_id};

type ApiResult<T> = Result<T, Error>;

#[derive(Clone)]
pub struct RemoteClient {
    base_url: Url,
    agent: ureq::Agent,
}

#[derive(Deserialize)]
struct HeroesEnvelope {
    heroes: Vec<Hero>,
}

#[derive(Deserialize)]
struct HeroEnvelope {
    hero: Hero,
}

#[derive(Deserialize)]
struct DeletedEnvelope {
    deleted: bool,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: RemoteError,
}

#[derive(Deserialize)]
struct RemoteError {
    kind: String,
    message: Option<String>,
    hint: Option<String>,
    path: Option<String>,
    id: Option<String>,
}

impl RemoteClient {
    pub fn new(base_url: impl Into<String>) -> ApiResult<Self> {
        let base_url = normalize_base_url(base_url.into())?;
        Ok(Self {
            base_url,
            agent: ureq::AgentBuilder::new().build(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn list_heroes(&self) -> ApiResult<Vec<Hero>> {
        let url = build_url(&self.base_url, &["v0", "heroes"])?;
        let envelope: HeroesEnvelope = self.request_json("GET", &url, None::<&Hero>)?;
        Ok(envelope.heroes)
    }

    pub fn get_hero(&self, id: &str) -> ApiResult<Hero> {
        ensure_hero_id(id)?;
        let url = build_url(&self.base_url, &["v0", "heroes", id])?;
        let envelope: HeroEnvelope = self
            .request_json("GET", &url, None::<&Hero>)
            .map_err(|err| err.with_id(id))?;
        Ok(envelope.hero)
    }

    /// Create a record server-side. Any id on the input is ignored; the
    /// server assigns one and returns the stored record.
    pub fn add_hero(&self, hero: &Hero) -> ApiResult<Hero> {
        let url = build_url(&self.base_url, &["v0", "heroes"])?;
        let envelope: HeroEnvelope = self.request_json("POST", &url, Some(hero))?;
        Ok(envelope.hero)
    }

    pub fn update_hero(&self, hero: &Hero) -> ApiResult<Hero> {
        ensure_hero_id(&hero.id)?;
        let url = build_url(&self.base_url, &["v0", "heroes", &hero.id])?;
        let envelope: HeroEnvelope = self
            .request_json("PUT", &url, Some(hero))
            .map_err(|err| err.with_id(hero.id.clone()))?;
        Ok(envelope.hero)
    }

    pub fn delete_hero(&self, id: &str) -> ApiResult<bool> {
        ensure_hero_id(id)?;
        let url = build_url(&self.base_url, &["v0", "heroes", id])?;
        let envelope: DeletedEnvelope = self
            .request_json("DELETE", &url, None::<&Hero>)
            .map_err(|err| err.with_id(id))?;
        Ok(envelope.deleted)
    }

    pub fn suggest(&self, query: &str) -> ApiResult<Vec<Hero>> {
        let mut url = build_url(&self.base_url, &["v0", "suggest"])?;
        url.query_pairs_mut().append_pair("q", query);
        let envelope: HeroesEnvelope = self.request_json("GET", &url, None::<&Hero>)?;
        Ok(envelope.heroes)
    }

    fn request_json<T, R>(&self, method: &str, url: &Url, body: Option<&T>) -> ApiResult<R>
    where
        T: serde::Serialize,
        R: DeserializeOwned,
    {
        let request = self
            .agent
            .request(method, url.as_str())
            .set("Accept", "application/json");
        let response = match body {
            None => request.call(),
            Some(body) => {
                let payload = serde_json::to_string(body).map_err(|err| {
                    Error::new(ErrorKind::Internal)
                        .with_message("failed to encode request json")
                        .with_source(err)
                })?;
                request
                    .set("Content-Type", "application/json")
                    .send_string(&payload)
            }
        };

        match response {
            Ok(resp) => read_json_response(resp),
            Err(ureq::Error::Status(code, resp)) => Err(parse_error_response(code, resp)),
            Err(ureq::Error::Transport(err)) => Err(Error::new(ErrorKind::Fetch)
                .with_message("request failed")
                .with_source(err)),
        }
    }
}

fn normalize_base_url(raw: String) -> ApiResult<Url> {
    let mut url = Url::parse(&raw).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message("invalid remote base url")
            .with_source(err)
    })?;
    let scheme = url.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("remote base url must use http or https scheme"));
    }
    if url.path() != "/" && !url.path().is_empty() {
        return Err(
            Error::new(ErrorKind::Usage).with_message("remote base url must not include a path")
        );
    }
    url.set_path("/");
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

fn build_url(base_url: &Url, segments: &[&str]) -> ApiResult<Url> {
    let mut url = base_url.clone();
    {
        let mut path = url.path_segments_mut().map_err(|_| {
            Error::new(ErrorKind::Usage).with_message("remote base url cannot be a base")
        })?;
        path.clear();
        for segment in segments {
            path.push(segment);
        }
    }
    Ok(url)
}

fn read_json_response<R>(response: ureq::Response) -> ApiResult<R>
where
    R: DeserializeOwned,
{
    let body = response.into_string().map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to read response body")
            .with_source(err)
    })?;
    serde_json::from_str(&body).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("invalid response json")
            .with_source(err)
    })
}

fn parse_error_response(status: u16, response: ureq::Response) -> Error {
    let body = response.into_string().unwrap_or_default();
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(&body) {
        return error_from_remote(envelope.error);
    }
    let kind = error_kind_from_status(status);
    Error::new(kind).with_message(format!("remote error status {status}"))
}

fn error_from_remote(remote: RemoteError) -> Error {
    let mut err = Error::new(parse_error_kind(&remote.kind));
    if let Some(message) = remote.message {
        err = err.with_message(message);
    }
    if let Some(hint) = remote.hint {
        err = err.with_hint(hint);
    }
    if let Some(path) = remote.path {
        err = err.with_path(path);
    }
    if let Some(id) = remote.id {
        err = err.with_id(id);
    }
    err
}

fn parse_error_kind(kind: &str) -> ErrorKind {
    match kind {
        "Usage" => ErrorKind::Usage,
        "NotFound" => ErrorKind::NotFound,
        "Fetch" => ErrorKind::Fetch,
        "Parse" => ErrorKind::Parse,
        "Io" => ErrorKind::Io,
        _ => ErrorKind::Internal,
    }
}

fn error_kind_from_status(status: u16) -> ErrorKind {
    match status {
        400 => ErrorKind::Usage,
        404 => ErrorKind::NotFound,
        502 => ErrorKind::Fetch,
        _ => ErrorKind::Internal,
    }
}
