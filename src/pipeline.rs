//! The four user-facing pipeline operations.
//!
//! Each operation composes the same stages - build the filter, walk the
//! paginated listing, reduce, hand the aggregate to the report sink - and
//! returns what it wrote. The filter is rebuilt from the year range on
//! every run, so an invalid range fails before any network traffic.

use crate::aggregate::{self, TOP_TOPICS};
use crate::cancel::CancelFlag;
use crate::error::{AlexError, Result};
use crate::openalex::{works_filter, CatalogClient};
use crate::report;
use std::path::{Path, PathBuf};
use tracing::info;

/// A validated inclusive year range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearRange {
    start: i32,
    end: i32,
}

impl YearRange {
    /// Build a range, rejecting `start > end`.
    ///
    /// # Errors
    ///
    /// Returns `AlexError::InvalidRange` when the bounds are reversed.
    pub fn new(start: i32, end: i32) -> Result<Self> {
        if start > end {
            return Err(AlexError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// A range covering a single year
    pub fn single(year: i32) -> Self {
        Self { start: year, end: year }
    }

    /// First year of the range
    pub fn start(&self) -> i32 {
        self.start
    }

    /// Last year of the range
    pub fn end(&self) -> i32 {
        self.end
    }
}

/// What a completed pipeline run produced
#[derive(Debug)]
pub struct RunOutcome {
    /// Records fetched from the catalog
    pub records: usize,
    /// Artifact files written
    pub artifacts: Vec<PathBuf>,
}

/// Fetch all matching works and retrieve the records gathered for a run.
///
/// Shared head of every operation. A run whose cancel flag is set by the
/// time the fetch returns is reported as `Interrupted`: the user asked for
/// the stop, so no artifacts are written for it.
async fn fetch_stage(
    client: &CatalogClient,
    range: YearRange,
    cancel: &CancelFlag,
) -> Result<Vec<crate::models::Work>> {
    let filter = works_filter(range.start, Some(range.end))?;
    let works = client.fetch_works(&filter, cancel).await?;

    if cancel.is_cancelled() {
        return Err(AlexError::Interrupted);
    }

    Ok(works)
}

/// Retrieve the publications for the range and write the export table CSVs
pub async fn fetch_works(
    client: &CatalogClient,
    range: YearRange,
    cancel: &CancelFlag,
    out_dir: &Path,
) -> Result<RunOutcome> {
    let works = fetch_stage(client, range, cancel).await?;
    let rows = aggregate::export_rows(&works);
    let artifacts = report::write_publications(out_dir, &rows)?;

    info!(records = works.len(), "Publications export complete");
    Ok(RunOutcome { records: works.len(), artifacts })
}

/// List every collaborating country for the range as a ranked CSV
pub async fn list_collaborators(
    client: &CatalogClient,
    range: YearRange,
    cancel: &CancelFlag,
    out_dir: &Path,
) -> Result<RunOutcome> {
    let works = fetch_stage(client, range, cancel).await?;
    let countries = aggregate::count_countries(&works);

    let path = out_dir.join("collaborating_countries.csv");
    report::write_ranked_csv(&path, &countries, "country", None)?;

    info!(
        records = works.len(),
        countries = countries.len(),
        "Collaborator listing complete"
    );
    Ok(RunOutcome { records: works.len(), artifacts: vec![path] })
}

/// Generate the top-10 collaborating-countries report document
pub async fn country_report(
    client: &CatalogClient,
    range: YearRange,
    cancel: &CancelFlag,
    out_dir: &Path,
) -> Result<RunOutcome> {
    let works = fetch_stage(client, range, cancel).await?;
    let countries = aggregate::count_countries(&works);

    let path = report::write_country_report(out_dir, &countries, range.start, range.end)?;

    info!(records = works.len(), "Country report complete");
    Ok(RunOutcome { records: works.len(), artifacts: vec![path] })
}

/// Rank the topics of works co-authored with a partner institution.
///
/// # Errors
///
/// Propagates `AlexError::InvalidCollaborator` when no co-authored record
/// carries a topic (see [`aggregate::count_collaboration_topics`]).
pub async fn collaboration_topics(
    client: &CatalogClient,
    partner_ror: &str,
    range: YearRange,
    cancel: &CancelFlag,
    out_dir: &Path,
) -> Result<RunOutcome> {
    let works = fetch_stage(client, range, cancel).await?;
    let topics = aggregate::count_collaboration_topics(&works, partner_ror)?;

    let path = out_dir.join("collaboration_topics.csv");
    report::write_ranked_csv(&path, &topics, "topic", Some(TOP_TOPICS))?;

    info!(
        records = works.len(),
        topics = topics.len(),
        partner = partner_ror,
        "Collaboration topic analysis complete"
    );
    Ok(RunOutcome { records: works.len(), artifacts: vec![path] })
}
