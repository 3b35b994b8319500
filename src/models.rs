//! Data model for the OpenAlex works payload.
//!
//! Every leaf field the API may omit is an `Option`, and list fields default
//! to empty, so a sparse or partial record deserializes cleanly instead of
//! failing the whole page. Aggregators treat absence as a handled case.

use serde::Deserialize;
use std::collections::HashSet;

/// One publication record from the works listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Work {
    /// Publication title
    pub display_name: Option<String>,
    /// Publication year
    pub publication_year: Option<i64>,
    /// DOI link (full `https://doi.org/...` URL)
    pub doi: Option<String>,
    /// One entry per contributing author
    #[serde(default)]
    pub authorships: Vec<Authorship>,
    /// Topics assigned to the work
    #[serde(default)]
    pub topics: Vec<Topic>,
}

impl Work {
    /// Distinct institution ROR URLs across all authorships of this work.
    ///
    /// Institutions without a ROR identifier are skipped.
    pub fn institution_rors(&self) -> HashSet<&str> {
        self.authorships
            .iter()
            .flat_map(|a| a.institutions.iter())
            .filter_map(|i| i.ror.as_deref())
            .collect()
    }
}

/// Association between a work and one contributing author
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Authorship {
    /// Institutions the author was affiliated with at publication time
    #[serde(default)]
    pub institutions: Vec<Institution>,
}

/// An author's affiliated institution
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Institution {
    /// ROR identifier as a full `https://ror.org/...` URL
    pub ror: Option<String>,
    /// ISO 3166-1 alpha-2 country code
    pub country_code: Option<String>,
}

/// A topic assigned to a work
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Topic {
    /// Human-readable topic name
    pub display_name: Option<String>,
}

/// One page of the cursor-paginated works listing
#[derive(Debug, Default, Deserialize)]
pub struct WorksPage {
    /// Records on this page, in catalog delivery order
    #[serde(default)]
    pub results: Vec<Work>,
    /// Pagination metadata
    #[serde(default)]
    pub meta: PageMeta,
}

/// Pagination metadata attached to a works page.
///
/// `next_cursor == None` means no further pages exist.
#[derive(Debug, Default, Deserialize)]
pub struct PageMeta {
    /// Opaque single-use token for the next page
    pub next_cursor: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sparse_work_deserializes() {
        let work: Work = serde_json::from_str(r#"{"display_name": "A title"}"#)
            .expect("sparse record should deserialize");

        assert_eq!(work.display_name.as_deref(), Some("A title"));
        assert!(work.publication_year.is_none());
        assert!(work.authorships.is_empty());
        assert!(work.topics.is_empty());
    }

    #[test]
    fn test_page_without_meta() {
        let page: WorksPage =
            serde_json::from_str(r#"{"results": []}"#).expect("page without meta should deserialize");

        assert!(page.results.is_empty());
        assert!(page.meta.next_cursor.is_none());
    }

    #[test]
    fn test_institution_rors_are_distinct() {
        let work: Work = serde_json::from_str(
            r#"{
                "authorships": [
                    {"institutions": [
                        {"ror": "https://ror.org/0020snb74", "country_code": "CA"},
                        {"country_code": "FR"}
                    ]},
                    {"institutions": [
                        {"ror": "https://ror.org/0020snb74", "country_code": "CA"},
                        {"ror": "https://ror.org/02feahw73", "country_code": "FR"}
                    ]}
                ]
            }"#,
        )
        .expect("valid record");

        let rors = work.institution_rors();
        assert_eq!(rors.len(), 2);
        assert!(rors.contains("https://ror.org/0020snb74"));
        assert!(rors.contains("https://ror.org/02feahw73"));
    }
}
