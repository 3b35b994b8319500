//! # rustalex
//!
//! OpenAlex Institution Collaboration Pipeline - Rust Microservice
//!
//! ## Modules
//!
//! - [`openalex`] - Query construction and cursor-paginated works retrieval
//! - [`aggregate`] - Pure reducers: export table, country and topic counts
//! - [`report`] - CSV/Markdown report sink
//! - [`pipeline`] - The four user-facing operations
//! - [`cancel`] - Cooperative cancellation token
//! - [`models`] - OpenAlex works data model
//! - [`error`] - Custom error types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rustalex::{cancel::CancelFlag, openalex::CatalogClient, pipeline};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = CatalogClient::new()?;
//!     let range = pipeline::YearRange::new(2019, 2023)?;
//!     let cancel = CancelFlag::new();
//!     let outcome =
//!         pipeline::fetch_works(&client, range, &cancel, std::path::Path::new("./output")).await?;
//!     println!("Fetched {} records", outcome.records);
//!     Ok(())
//! }
//! ```

pub mod aggregate;
pub mod cancel;
pub mod error;
pub mod models;
pub mod openalex;
pub mod pipeline;
pub mod report;

pub use error::{AlexError, Result};
