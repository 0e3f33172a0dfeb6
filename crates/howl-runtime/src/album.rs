//! Rotating image urls backed by an imgur album.
//!
//! The album keeps an immutable snapshot of urls. A background task refreshes
//! it (hourly by default) and swaps in a new snapshot; readers clone the
//! current `Arc` and never observe a half-written list. Conditional requests
//! (`If-None-Match`) keep unchanged albums cheap.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use rand::Rng;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, ETAG, IF_NONE_MATCH};
use serde::Deserialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{AlbumConfig, album_id};
use crate::error::{RuntimeError, RuntimeResult};

/// What one refresh attempt did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// New urls were installed.
    Updated(usize),
    /// The album has not changed since the last fetch.
    NotModified,
    /// The album answered with no images; the old snapshot stays.
    Empty,
    /// The API answered with an unexpected status.
    Unexpected(u16),
    /// The request itself failed.
    Failed,
    /// No valid album is configured.
    Skipped,
}

#[derive(Deserialize)]
struct AlbumResponse {
    data: AlbumData,
}

#[derive(Deserialize)]
struct AlbumData {
    #[serde(default)]
    images: Vec<AlbumImage>,
}

#[derive(Deserialize)]
struct AlbumImage {
    link: String,
}

struct AlbumState {
    source: Option<AlbumSource>,
    urls: RwLock<Arc<[String]>>,
    etag: Mutex<Option<String>>,
    last_index: AtomicUsize,
}

struct AlbumSource {
    url: String,
    endpoint: String,
    client_id: String,
    http: reqwest::Client,
}

/// A rotating set of image urls.
///
/// Cheap to clone; clones share the same snapshot and cursor.
#[derive(Clone)]
pub struct ImageAlbum {
    state: Arc<AlbumState>,
}

impl ImageAlbum {
    /// Creates an album from configuration. Until the first refresh it serves
    /// only the fallback url.
    pub fn from_config(config: &AlbumConfig) -> RuntimeResult<Self> {
        let source = match config.url.as_deref() {
            Some(url) => match album_id(url) {
                Some(id) => {
                    let http = reqwest::Client::builder()
                        .timeout(Duration::from_secs(30))
                        .build()
                        .map_err(|e| RuntimeError::Http(e.to_string()))?;
                    Some(AlbumSource {
                        url: url.to_string(),
                        endpoint: format!("{}/album/{id}", config.api_base.trim_end_matches('/')),
                        client_id: config.client_id.clone(),
                        http,
                    })
                }
                None => {
                    error!(url, "Not a valid imgur album url");
                    None
                }
            },
            None => None,
        };

        Ok(Self::with_source(source, vec![config.fallback_url.clone()]))
    }

    /// Creates a fixed album that never refreshes.
    pub fn fixed<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_source(None, urls.into_iter().map(Into::into).collect())
    }

    fn with_source(source: Option<AlbumSource>, urls: Vec<String>) -> Self {
        Self {
            state: Arc::new(AlbumState {
                source,
                urls: RwLock::new(urls.into()),
                etag: Mutex::new(None),
                last_index: AtomicUsize::new(usize::MAX),
            }),
        }
    }

    /// The current snapshot.
    pub fn urls(&self) -> Arc<[String]> {
        Arc::clone(&self.state.urls.read())
    }

    pub fn len(&self) -> usize {
        self.state.urls.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.urls.read().is_empty()
    }

    /// The url at `index`, or the first url when `index` is out of range.
    pub fn get(&self, index: usize) -> Option<String> {
        let urls = self.urls();
        urls.get(index).or_else(|| urls.first()).cloned()
    }

    /// Advances the cursor and returns the url under it, wrapping to the start.
    pub fn next(&self) -> Option<String> {
        let urls = self.urls();
        if urls.is_empty() {
            return None;
        }
        let len = urls.len();
        let previous = self
            .state
            .last_index
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
                Some(advance(last, len))
            })
            .unwrap_or_else(|last| last);
        urls.get(advance(previous, len)).cloned()
    }

    /// A uniformly random url. The cursor moves to it.
    pub fn random(&self) -> Option<String> {
        let urls = self.urls();
        if urls.is_empty() {
            return None;
        }
        let index = rand::rng().random_range(0..urls.len());
        self.state.last_index.store(index, Ordering::Release);
        urls.get(index).cloned()
    }

    /// The index last served by [`next`](Self::next) or [`random`](Self::random).
    pub fn last_index(&self) -> Option<usize> {
        match self.state.last_index.load(Ordering::Acquire) {
            usize::MAX => None,
            index => Some(index),
        }
    }

    pub fn set_last_index(&self, index: usize) {
        self.state.last_index.store(index, Ordering::Release);
    }

    /// Fetches the album once and installs new urls if it changed.
    pub async fn refresh(&self) -> RefreshOutcome {
        let Some(source) = &self.state.source else {
            return RefreshOutcome::Skipped;
        };

        let mut request = source
            .http
            .get(&source.endpoint)
            .header(AUTHORIZATION, format!("Client-ID {}", source.client_id));
        let etag = self.state.etag.lock().clone();
        if let Some(etag) = etag {
            request = request.header(IF_NONE_MATCH, etag);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                error!(album = %source.url, error = %e, "Imgur down? Could not fetch imgur album");
                return RefreshOutcome::Failed;
            }
        };

        match response.status() {
            StatusCode::OK => {
                let etag = response
                    .headers()
                    .get(ETAG)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                let body: AlbumResponse = match response.json().await {
                    Ok(body) => body,
                    Err(e) => {
                        error!(album = %source.url, error = %e, "Malformed imgur album response");
                        return RefreshOutcome::Failed;
                    }
                };

                let urls: Vec<String> = body.data.images.into_iter().map(|i| i.link).collect();
                if urls.is_empty() {
                    warn!(album = %source.url, "Imgur album has no images, keeping current urls");
                    return RefreshOutcome::Empty;
                }

                let count = urls.len();
                *self.state.urls.write() = urls.into();
                *self.state.etag.lock() = etag;
                info!(album = %source.url, images = count, "Refreshed imgur album, new data found");
                RefreshOutcome::Updated(count)
            }
            StatusCode::NOT_MODIFIED => {
                info!(album = %source.url, "Refreshed imgur album, no update");
                RefreshOutcome::NotModified
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                warn!(
                    album = %source.url,
                    status = status.as_u16(),
                    body = %body,
                    "Unexpected http status for imgur album request"
                );
                RefreshOutcome::Unexpected(status.as_u16())
            }
        }
    }

    /// Refreshes now and then every `interval` until `shutdown` is cancelled.
    ///
    /// Returns `None` when there is no album to refresh.
    pub fn spawn_refresh(
        &self,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> Option<JoinHandle<()>> {
        self.state.source.as_ref()?;
        let album = self.clone();

        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        debug!("Album refresher stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        album.refresh().await;
                    }
                }
            }
        }))
    }
}

impl std::fmt::Debug for ImageAlbum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageAlbum")
            .field("source", &self.state.source.as_ref().map(|s| &s.url))
            .field("len", &self.len())
            .finish()
    }
}

fn advance(last: usize, len: usize) -> usize {
    match last.checked_add(1) {
        Some(next) if next < len => next,
        _ => 0,
    }
}
