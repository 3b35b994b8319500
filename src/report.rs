//! Report sink: CSV and Markdown artifacts.
//!
//! Aggregates are rendered to plain files in a caller-supplied output
//! directory: the publications export split into fixed-size CSV chunks,
//! ranked count tables as two-column CSVs, and the country report as a
//! Markdown document with the ranked table inline.

use crate::aggregate::{CountTable, ExportRow, TOP_COUNTRIES};
use crate::error::Result;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::info;

/// Rows per publications CSV chunk
pub const ROWS_PER_FILE: usize = 1000;

/// Write the publications export table, split into chunks of
/// [`ROWS_PER_FILE`] rows (`publications_1.csv`, `publications_2.csv`, ...).
///
/// Returns the paths written, in order. An empty row list writes nothing.
pub fn write_publications(dir: &Path, rows: &[ExportRow]) -> Result<Vec<PathBuf>> {
    if rows.is_empty() {
        info!("No publications to save");
        return Ok(Vec::new());
    }

    let mut paths = Vec::new();

    for (index, chunk) in rows.chunks(ROWS_PER_FILE).enumerate() {
        let path = dir.join(format!("publications_{}.csv", index + 1));

        let mut wtr = csv::WriterBuilder::new()
            .has_headers(true)
            .from_path(&path)?;
        for row in chunk {
            wtr.serialize(row)?;
        }
        wtr.flush()?;

        paths.push(path);
    }

    info!(
        rows = rows.len(),
        files = paths.len(),
        "Saved publications export"
    );
    Ok(paths)
}

/// Write a ranked count table as a two-column CSV.
///
/// `key_header` names the first column ("country", "topic"); the second is
/// always the publication count. `limit` truncates to a top-N listing.
pub fn write_ranked_csv(
    path: &Path,
    table: &CountTable,
    key_header: &str,
    limit: Option<usize>,
) -> Result<()> {
    let entries = match limit {
        Some(n) => table.top(n),
        None => table.ranked(),
    };

    let mut wtr = csv::WriterBuilder::new().from_path(path)?;
    wtr.write_record([key_header, "publications"])?;
    for (key, count) in &entries {
        wtr.write_record([key.as_str(), &count.to_string()])?;
    }
    wtr.flush()?;

    info!(path = %path.display(), entries = entries.len(), "Saved ranked table");
    Ok(())
}

/// Write the country collaboration report document.
///
/// A Markdown document with the top-10 collaborating countries for the
/// year range, standing in for the original chart-plus-document artifact.
pub fn write_country_report(
    dir: &Path,
    table: &CountTable,
    start_year: i32,
    end_year: i32,
) -> Result<PathBuf> {
    let top = table.top(TOP_COUNTRIES);

    let mut doc = String::new();
    doc.push_str("# International Collaboration Analysis\n\n");
    let _ = writeln!(
        doc,
        "The table below shows the top {} countries collaborating on \
         publications from {} to {}.\n",
        TOP_COUNTRIES, start_year, end_year
    );
    doc.push_str("| Rank | Country | Publications |\n");
    doc.push_str("|------|---------|--------------|\n");
    for (rank, (country, count)) in top.iter().enumerate() {
        let _ = writeln!(doc, "| {} | {} | {} |", rank + 1, country, count);
    }

    let path = dir.join("collaboration_report.md");
    std::fs::write(&path, doc)?;

    info!(path = %path.display(), countries = top.len(), "Saved country report");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::ExportRow;

    fn row(n: usize) -> ExportRow {
        ExportRow {
            title: format!("Paper {}", n),
            year: "2021".to_string(),
            doi: format!("https://doi.org/10.1/{}", n),
        }
    }

    #[test]
    fn test_publications_chunking() {
        let dir = tempfile::tempdir().expect("tempdir");
        let rows: Vec<ExportRow> = (0..ROWS_PER_FILE + 1).map(row).collect();

        let paths = write_publications(dir.path(), &rows).expect("write ok");
        assert_eq!(paths.len(), 2);
        assert!(paths[0].ends_with("publications_1.csv"));
        assert!(paths[1].ends_with("publications_2.csv"));

        // Header plus a full chunk in the first file, one row in the second
        let first = std::fs::read_to_string(&paths[0]).expect("read");
        assert_eq!(first.lines().count(), ROWS_PER_FILE + 1);
        let second = std::fs::read_to_string(&paths[1]).expect("read");
        assert_eq!(second.lines().count(), 2);
    }

    #[test]
    fn test_empty_publications_writes_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = write_publications(dir.path(), &[]).expect("write ok");
        assert!(paths.is_empty());
    }

    #[test]
    fn test_ranked_csv_ordering() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut table = CountTable::new();
        for country in ["CA", "FR", "FR", "US"] {
            table.increment(country);
        }

        let path = dir.path().join("countries.csv");
        write_ranked_csv(&path, &table, "country", None).expect("write ok");

        let content = std::fs::read_to_string(&path).expect("read");
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "country,publications");
        assert_eq!(lines[1], "FR,2");
        assert_eq!(lines[2], "CA,1");
        assert_eq!(lines[3], "US,1");
    }

    #[test]
    fn test_ranked_csv_limit() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut table = CountTable::new();
        for key in ["a", "b", "c"] {
            table.increment(key);
        }

        let path = dir.path().join("top.csv");
        write_ranked_csv(&path, &table, "topic", Some(2)).expect("write ok");

        let content = std::fs::read_to_string(&path).expect("read");
        assert_eq!(content.lines().count(), 3);
    }

    #[test]
    fn test_country_report_document() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut table = CountTable::new();
        table.increment("CA");
        table.increment("CA");
        table.increment("FR");

        let path = write_country_report(dir.path(), &table, 2019, 2023).expect("write ok");
        let doc = std::fs::read_to_string(&path).expect("read");

        assert!(doc.contains("# International Collaboration Analysis"));
        assert!(doc.contains("from 2019 to 2023"));
        assert!(doc.contains("| 1 | CA | 2 |"));
        assert!(doc.contains("| 2 | FR | 1 |"));
    }
}
