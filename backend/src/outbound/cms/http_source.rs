//! Reqwest-backed CMS source adapter.
//!
//! Owns transport details only: URL building, WordPress-style paging, timeout
//! and status mapping, and JSON decoding. Row normalisation is shared with the
//! CSV adapter.

use std::time::Duration;

use reqwest::header::{ACCEPT, HeaderMap};
use reqwest::{Client, StatusCode, Url};
use tracing::{debug, warn};

use super::dto::CmsPageDto;
use crate::domain::EntityKind;
use crate::domain::ports::RosterSourceError;
use crate::domain::source_rows::{NormaliseOptions, RawRow, SourceBatch, normalise_rows};

const DEFAULT_USER_AGENT: &str = "roster-sync/0.1";
const TOTAL_PAGES_HEADER: &str = "x-wp-totalpages";
/// Upper bound on pages fetched per collection.
const MAX_PAGES: u32 = 500;

/// CMS adapter fetching `{base}/{organizations|teams|memberships}`.
pub struct CmsHttpSource {
    client: Client,
    base_url: Url,
    page_size: u32,
    options: NormaliseOptions,
}

impl CmsHttpSource {
    /// Build an adapter using a reqwest client with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(
        base_url: Url,
        page_size: u32,
        timeout: Duration,
        options: NormaliseOptions,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(DEFAULT_USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            base_url: with_trailing_slash(base_url),
            page_size: page_size.clamp(1, 100),
            options,
        })
    }

    /// Fetch every page of `kind` and normalise the items.
    ///
    /// # Errors
    ///
    /// Transport and status failures map to
    /// [`RosterSourceError::Unavailable`]; undecodable pages, and collections
    /// still full after the page limit, to [`RosterSourceError::Decode`].
    pub async fn fetch(&self, kind: EntityKind) -> Result<SourceBatch, RosterSourceError> {
        let endpoint = collection_url(&self.base_url, kind)?;
        let mut rows: Vec<RawRow> = Vec::new();
        let mut complete = false;
        let mut advertised = None;

        for page in 1..=MAX_PAGES {
            let response = self
                .client
                .get(endpoint.clone())
                .header(ACCEPT, "application/json")
                .query(&[("page", page), ("per_page", self.page_size)])
                .send()
                .await
                .map_err(map_transport_error)?;

            let status = response.status();
            let total_pages = total_pages(response.headers());
            advertised = total_pages.or(advertised);
            let body = response.bytes().await.map_err(map_transport_error)?;
            if page > 1 && status == StatusCode::BAD_REQUEST {
                // WordPress answers 400 once `page` passes the last page.
                complete = true;
                break;
            }
            if !status.is_success() {
                return Err(map_status_error(status, body.as_ref()));
            }

            let decoded: CmsPageDto = serde_json::from_slice(body.as_ref()).map_err(|error| {
                RosterSourceError::decode(format!("invalid CMS {kind} page {page}: {error}"))
            })?;
            if decoded.items.is_empty() {
                complete = true;
                break;
            }
            let offset = rows.len();
            rows.extend(
                decoded
                    .items
                    .into_iter()
                    .enumerate()
                    .map(|(index, item)| item.into_raw_row(offset + index + 1)),
            );
            if total_pages.is_some_and(|total| page >= total) {
                complete = true;
                break;
            }
        }

        if !complete {
            let error = page_limit_error(kind, advertised);
            warn!(%kind, fetched = rows.len(), %error, "CMS collection truncated");
            return Err(error);
        }

        debug!(%kind, rows = rows.len(), "fetched CMS collection");
        Ok(normalise_rows(kind, rows, &self.options))
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

fn collection_url(base_url: &Url, kind: EntityKind) -> Result<Url, RosterSourceError> {
    base_url.join(kind.as_str()).map_err(|error| {
        RosterSourceError::unavailable(format!("invalid CMS endpoint for {kind}: {error}"))
    })
}

fn total_pages(headers: &HeaderMap) -> Option<u32> {
    headers
        .get(TOTAL_PAGES_HEADER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

fn page_limit_error(kind: EntityKind, advertised: Option<u32>) -> RosterSourceError {
    let advertised = advertised.map_or_else(|| "unknown".to_owned(), |total| total.to_string());
    RosterSourceError::decode(format!(
        "CMS {kind} collection exceeds {MAX_PAGES} pages (advertised {advertised})"
    ))
}

fn map_transport_error(error: reqwest::Error) -> RosterSourceError {
    if error.is_timeout() {
        RosterSourceError::unavailable(format!("CMS request timed out: {error}"))
    } else {
        RosterSourceError::unavailable(format!("CMS request failed: {error}"))
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> RosterSourceError {
    let preview = body_preview(body);
    if preview.is_empty() {
        RosterSourceError::unavailable(format!("CMS returned status {}", status.as_u16()))
    } else {
        RosterSourceError::unavailable(format!(
            "CMS returned status {}: {preview}",
            status.as_u16()
        ))
    }
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}
