//! Pure reducers over a fetched record sequence.
//!
//! Three aggregations feed the report artifacts: the export-ready
//! publications table, collaborating-country counts, and collaboration
//! topic counts. All of them are deterministic for a given input sequence:
//! ranking sorts by descending count with ties broken by first-seen order.

use crate::error::{AlexError, Result};
use crate::models::Work;
use crate::openalex::HOME_ROR_URL;
use serde::Serialize;
use std::collections::HashMap;

/// Placeholder for fields missing from a record
pub const UNAVAILABLE: &str = "Not available";

/// How many countries the country report ranks
pub const TOP_COUNTRIES: usize = 10;

/// How many topics the collaboration analysis ranks
pub const TOP_TOPICS: usize = 20;

/// Key -> occurrence count table that remembers first-insertion order.
///
/// The order memory is what makes ranking deterministic: `ranked` uses a
/// stable sort on descending count, so equal counts keep the order their
/// keys first appeared in the input.
#[derive(Debug, Default)]
pub struct CountTable {
    counts: HashMap<String, u64>,
    order: Vec<String>,
}

impl CountTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment a key's count, registering it on first sight
    pub fn increment(&mut self, key: &str) {
        match self.counts.get_mut(key) {
            Some(count) => *count += 1,
            None => {
                self.counts.insert(key.to_string(), 1);
                self.order.push(key.to_string());
            }
        }
    }

    /// Count for a key, zero if never seen
    pub fn get(&self, key: &str) -> u64 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the table holds no keys
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// All entries ranked by descending count, first-seen order on ties
    pub fn ranked(&self) -> Vec<(String, u64)> {
        let mut entries: Vec<(String, u64)> = self
            .order
            .iter()
            .map(|key| (key.clone(), self.get(key)))
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        entries
    }

    /// The `n` highest-ranked entries
    pub fn top(&self, n: usize) -> Vec<(String, u64)> {
        let mut entries = self.ranked();
        entries.truncate(n);
        entries
    }
}

/// One row of the publications export table
#[derive(Debug, Clone, Serialize)]
pub struct ExportRow {
    /// Publication title
    pub title: String,
    /// Publication year, or the unavailable marker
    pub year: String,
    /// DOI link, or the unavailable marker
    pub doi: String,
}

/// Flatten records into export rows sorted ascending by year.
///
/// Missing fields become the [`UNAVAILABLE`] marker. Rows whose year does
/// not parse as a number sort after all numeric years, keeping their
/// relative input order; the sort itself can never fail.
pub fn export_rows(works: &[Work]) -> Vec<ExportRow> {
    let mut rows: Vec<ExportRow> = works
        .iter()
        .map(|work| ExportRow {
            title: work
                .display_name
                .clone()
                .unwrap_or_else(|| UNAVAILABLE.to_string()),
            year: work
                .publication_year
                .map(|y| y.to_string())
                .unwrap_or_else(|| UNAVAILABLE.to_string()),
            doi: work.doi.clone().unwrap_or_else(|| UNAVAILABLE.to_string()),
        })
        .collect();

    // Unparseable years coerce to the back of the ascending sort
    rows.sort_by_key(|row| match row.year.parse::<i64>() {
        Ok(year) => (false, year),
        Err(_) => (true, 0),
    });

    rows
}

/// Count collaborating countries across every institution of every authorship.
///
/// Each institution carrying a country code contributes one increment; a
/// record with several authors from the same country counts that country
/// once per institution entry (no per-record de-duplication).
pub fn count_countries(works: &[Work]) -> CountTable {
    let mut table = CountTable::new();

    for work in works {
        for authorship in &work.authorships {
            for institution in &authorship.institutions {
                if let Some(country) = institution.country_code.as_deref() {
                    table.increment(country);
                }
            }
        }
    }

    table
}

/// Count topics over records co-authored by the home institution and `partner_ror`.
///
/// A record is retained only when both ROR URLs appear somewhere among its
/// authorships' institutions - not necessarily on the same author. Retained
/// records contribute one increment per topic entry, duplicates included.
///
/// # Errors
///
/// Returns `AlexError::InvalidCollaborator` when no retained record carries
/// a topic, which is also what an unknown partner identifier looks like.
pub fn count_collaboration_topics(works: &[Work], partner_ror: &str) -> Result<CountTable> {
    let mut table = CountTable::new();

    for work in works {
        let rors = work.institution_rors();
        if !(rors.contains(HOME_ROR_URL) && rors.contains(partner_ror)) {
            continue;
        }

        for topic in &work.topics {
            if let Some(name) = topic.display_name.as_deref() {
                table.increment(name);
            }
        }
    }

    if table.is_empty() {
        return Err(AlexError::InvalidCollaborator(partner_ror.to_string()));
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Authorship, Institution, Topic};

    fn institution(ror: Option<&str>, country: Option<&str>) -> Institution {
        Institution {
            ror: ror.map(String::from),
            country_code: country.map(String::from),
        }
    }

    fn work_with_institutions(institutions: Vec<Institution>) -> Work {
        Work {
            authorships: vec![Authorship { institutions }],
            ..Default::default()
        }
    }

    fn topic(name: &str) -> Topic {
        Topic {
            display_name: Some(name.to_string()),
        }
    }

    const PARTNER: &str = "https://ror.org/02feahw73";

    #[test]
    fn test_count_countries_per_institution_entry() {
        let works = vec![
            work_with_institutions(vec![institution(None, Some("CA"))]),
            work_with_institutions(vec![
                institution(None, Some("CA")),
                institution(None, Some("FR")),
            ]),
        ];

        let table = count_countries(&works);
        assert_eq!(table.get("CA"), 2);
        assert_eq!(table.get("FR"), 1);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_count_countries_skips_missing_codes() {
        let works = vec![work_with_institutions(vec![
            institution(Some(HOME_ROR_URL), None),
            institution(None, Some("DE")),
        ])];

        let table = count_countries(&works);
        assert_eq!(table.get("DE"), 1);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_empty_input_yields_empty_table() {
        let table = count_countries(&[]);
        assert!(table.is_empty());
        assert!(table.ranked().is_empty());
        assert!(export_rows(&[]).is_empty());
    }

    #[test]
    fn test_ranked_breaks_ties_by_first_seen() {
        let mut table = CountTable::new();
        table.increment("US");
        table.increment("FR");
        table.increment("CA");
        table.increment("CA");

        let ranked = table.ranked();
        assert_eq!(ranked[0], ("CA".to_string(), 2));
        // US and FR tie at 1; US was seen first
        assert_eq!(ranked[1], ("US".to_string(), 1));
        assert_eq!(ranked[2], ("FR".to_string(), 1));
    }

    #[test]
    fn test_top_truncates() {
        let mut table = CountTable::new();
        for key in ["a", "b", "c"] {
            table.increment(key);
        }
        assert_eq!(table.top(2).len(), 2);
        assert_eq!(table.top(10).len(), 3);
    }

    #[test]
    fn test_export_rows_sorted_by_year_missing_last() {
        let works = vec![
            Work {
                display_name: Some("Recent".into()),
                publication_year: Some(2023),
                doi: Some("https://doi.org/10.1/recent".into()),
                ..Default::default()
            },
            Work {
                display_name: Some("Undated".into()),
                publication_year: None,
                doi: None,
                ..Default::default()
            },
            Work {
                display_name: Some("Older".into()),
                publication_year: Some(2019),
                doi: Some("https://doi.org/10.1/older".into()),
                ..Default::default()
            },
        ];

        let rows = export_rows(&works);
        assert_eq!(rows[0].title, "Older");
        assert_eq!(rows[1].title, "Recent");
        assert_eq!(rows[2].title, "Undated");
        assert_eq!(rows[2].year, UNAVAILABLE);
        assert_eq!(rows[2].doi, UNAVAILABLE);
    }

    #[test]
    fn test_topic_counter_requires_both_institutions() {
        let mut home_only = work_with_institutions(vec![institution(Some(HOME_ROR_URL), None)]);
        home_only.topics = vec![topic("Robotics")];

        let mut joint = Work {
            authorships: vec![
                Authorship {
                    institutions: vec![institution(Some(HOME_ROR_URL), Some("CA"))],
                },
                Authorship {
                    institutions: vec![institution(Some(PARTNER), Some("FR"))],
                },
            ],
            ..Default::default()
        };
        joint.topics = vec![topic("Optics"), topic("Optics"), topic("Photonics")];

        let table =
            count_collaboration_topics(&[home_only, joint], PARTNER).expect("one joint record");

        // Home-only record contributes nothing; duplicate topic entries both count
        assert_eq!(table.get("Robotics"), 0);
        assert_eq!(table.get("Optics"), 2);
        assert_eq!(table.get("Photonics"), 1);
    }

    #[test]
    fn test_topic_counter_empty_is_invalid_collaborator() {
        let works = vec![work_with_institutions(vec![institution(
            Some(HOME_ROR_URL),
            Some("CA"),
        )])];

        let err = count_collaboration_topics(&works, PARTNER).expect_err("no joint records");
        assert!(matches!(err, AlexError::InvalidCollaborator(ror) if ror == PARTNER));
    }

    #[test]
    fn test_topic_counter_ignores_unnamed_topics() {
        let mut joint = work_with_institutions(vec![
            institution(Some(HOME_ROR_URL), None),
            institution(Some(PARTNER), None),
        ]);
        joint.topics = vec![Topic { display_name: None }, topic("Acoustics")];

        let table = count_collaboration_topics(&[joint], PARTNER).expect("named topic present");
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("Acoustics"), 1);
    }
}
