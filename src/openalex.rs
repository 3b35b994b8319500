//! OpenAlex catalog client.
//!
//! Query construction and cursor-paginated retrieval of the works
//! attributable to the home institution.
//!
//! API notes (per OpenAlex docs):
//! - `cursor=*` requests the first page; each response carries the
//!   single-use cursor for the next one
//! - `per-page=200` is the maximum page size
//! - a `mailto` parameter opts into the polite pool (better rate limits)

use crate::cancel::CancelFlag;
use crate::error::{AlexError, Result};
use crate::models::{Work, WorksPage};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, info, warn};

/// OpenAlex API base URL
pub const OPENALEX_API_BASE: &str = "https://api.openalex.org";

/// Home institution ROR id, as used in filter expressions
pub const HOME_ROR_ID: &str = "0020snb74";

/// Home institution ROR identifier as the full URL found in authorship records
pub const HOME_ROR_URL: &str = "https://ror.org/0020snb74";

/// Maximum results per page (OpenAlex limit)
const PER_PAGE: usize = 200;

/// Cursor sentinel requesting the first page
const FIRST_CURSOR: &str = "*";

/// Fields requested from the works endpoint
const SELECT_FIELDS: &str = "display_name,publication_year,doi,authorships,topics";

/// Attempts per page before giving up on it
const MAX_ATTEMPTS: u32 = 3;

/// Build the `publication_year` filter value for a year range.
///
/// A single year when `end` is omitted, otherwise the OR-list of every
/// year in `[start, end]` inclusive.
///
/// # Errors
///
/// Returns `AlexError::InvalidRange` when `start > end`.
pub fn publication_year_filter(start: i32, end: Option<i32>) -> Result<String> {
    let Some(end) = end else {
        return Ok(start.to_string());
    };

    if start > end {
        return Err(AlexError::InvalidRange { start, end });
    }

    let years: Vec<String> = (start..=end).map(|y| y.to_string()).collect();
    Ok(years.join("|"))
}

/// Build the works filter expression: home institution plus year range.
///
/// # Errors
///
/// Returns `AlexError::InvalidRange` when `start > end`.
pub fn works_filter(start: i32, end: Option<i32>) -> Result<String> {
    let years = publication_year_filter(start, end)?;
    Ok(format!(
        "authorships.institutions.ror:{},publication_year:{}",
        HOME_ROR_ID, years
    ))
}

/// Assemble the works listing URL for a filter, without pagination parameters
fn works_url(base_url: &str, filter: &str, mailto: Option<&str>) -> String {
    let mut url = format!(
        "{}/works?filter={}&select={}",
        base_url, filter, SELECT_FIELDS
    );
    if let Some(email) = mailto {
        url.push_str(&format!("&mailto={}", urlencoding::encode(email)));
    }
    url
}

/// OpenAlex works API client.
///
/// Walks the cursor-paginated listing one page at a time, in
/// cursor-delivery order. Transport failures degrade to a partial result
/// rather than aborting a long-running retrieval.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    client: Client,
    base_url: String,
    mailto: Option<String>,
}

impl CatalogClient {
    /// Create a client against the production OpenAlex API
    pub fn new() -> Result<Self> {
        Self::with_base_url(OPENALEX_API_BASE)
    }

    /// Create a client against a custom base URL (used by tests)
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("rustalex/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AlexError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            mailto: None,
        })
    }

    /// Set the polite-pool contact email
    pub fn with_mailto(mut self, email: impl Into<String>) -> Self {
        self.mailto = Some(email.into());
        self
    }

    /// Fetch every work matching `filter`, following cursors to exhaustion.
    ///
    /// The cancel flag is polled once per iteration, before each page
    /// request; a cancelled run returns the records accumulated so far.
    /// A page that still fails after retries also terminates the walk with
    /// the partial result - a network blip should not discard the records
    /// already gathered.
    ///
    /// Records are returned in arrival order across pages.
    pub async fn fetch_works(&self, filter: &str, cancel: &CancelFlag) -> Result<Vec<Work>> {
        let base = works_url(&self.base_url, filter, self.mailto.as_deref());

        let mut all_works: Vec<Work> = Vec::new();
        let mut cursor = FIRST_CURSOR.to_string();
        let mut pages = 0usize;

        loop {
            if cancel.is_cancelled() {
                info!(records = all_works.len(), "Fetch cancelled, stopping before next page");
                break;
            }

            let page_url = format!(
                "{}&per-page={}&cursor={}",
                base,
                PER_PAGE,
                urlencoding::encode(&cursor)
            );
            debug!(page = pages + 1, "Fetching works page");

            let page = match self.fetch_page(&page_url).await {
                Ok(page) => page,
                Err(e) => {
                    warn!(
                        error = %e,
                        records = all_works.len(),
                        "Page fetch failed, keeping records gathered so far"
                    );
                    break;
                }
            };

            if page.results.is_empty() {
                break;
            }

            pages += 1;
            all_works.extend(page.results);

            match page.meta.next_cursor {
                Some(next) => cursor = next,
                None => break,
            }
        }

        info!(total = all_works.len(), pages = pages, "OpenAlex fetch complete");
        Ok(all_works)
    }

    /// Fetch a single page, retrying transient failures with backoff
    async fn fetch_page(&self, url: &str) -> Result<WorksPage> {
        let mut backoff = Duration::from_millis(500);

        for attempt in 1..=MAX_ATTEMPTS {
            match self.request_page(url).await {
                Ok(page) => return Ok(page),
                Err(e) if attempt < MAX_ATTEMPTS && is_transient(&e) => {
                    let wait = match &e {
                        AlexError::RateLimited(secs) => Duration::from_secs(*secs).max(backoff),
                        _ => backoff,
                    };
                    warn!(
                        attempt = attempt,
                        wait_ms = wait.as_millis() as u64,
                        error = %e,
                        "Transient fetch error, backing off"
                    );
                    tokio::time::sleep(wait).await;
                    backoff *= 2;
                }
                Err(e) => return Err(e),
            }
        }

        unreachable!("retry loop returns on the final attempt")
    }

    /// Single request attempt
    async fn request_page(&self, url: &str) -> Result<WorksPage> {
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(AlexError::RateLimited(5));
        }

        if !status.is_success() {
            return Err(AlexError::Api {
                code: status.as_u16(),
                message: format!("OpenAlex API error: {}", status),
            });
        }

        response
            .json::<WorksPage>()
            .await
            .map_err(|e| AlexError::Parse(format!("Failed to parse works page: {}", e)))
    }
}

/// Whether a page error is worth retrying before the partial-result fallback
fn is_transient(err: &AlexError) -> bool {
    match err {
        AlexError::RateLimited(_) => true,
        AlexError::Api { code, .. } => (500..600).contains(code),
        AlexError::Network(e) => e.is_timeout() || e.is_connect(),
        _ => false,
    }
}
