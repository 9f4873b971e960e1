//! reportcase - Generate XML report test cases from spreadsheet requests
//!
//! This crate reads an uploaded spreadsheet of `(report, fund, date)` requests,
//! matches each row against report-run statistics fetched from a data store,
//! and writes one XML test-case descriptor per selected run into a ZIP archive.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::fs::File;
//! use reportcase::{CsvSource, GeneratorBuilder};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Create a generator with default settings
//!     let generator = GeneratorBuilder::new().build()?;
//!
//!     // Upload and candidate snapshot
//!     let upload = File::open("requests.xlsx")?;
//!     let source = CsvSource::from_path("report_statistics.csv");
//!
//!     // Write the archive
//!     let output = File::create("generated_xmls.zip")?;
//!     let summary = generator.generate(upload, &source, output)?;
//!     println!("{} entries written", summary.entries_written);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Custom Data Store
//!
//! Any type implementing [`CandidateSource`] can supply candidate records.
//!
//! ```rust
//! use std::io::Cursor;
//! use reportcase::{CandidateQuery, CandidateRecord, CandidateSource, GeneratorBuilder, RequestDate, RequestRow};
//!
//! struct Fixed(Vec<CandidateRecord>);
//!
//! impl CandidateSource for Fixed {
//!     fn fetch(&self, query: &CandidateQuery) -> reportcase::Result<Vec<CandidateRecord>> {
//!         Ok(self.0.iter().filter(|r| query.admits(r)).cloned().collect())
//!     }
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let generator = GeneratorBuilder::new().build()?;
//! let source = Fixed(vec![CandidateRecord::new(
//!     "/Finance/NAV.rox",
//!     "fund: F1",
//!     "PDF",
//!     "2024-01-03 10:15:00",
//! )]);
//! let requests = vec![RequestRow::new("nav", "F1", RequestDate::Absent)];
//!
//! let (summary, archive) = generator.process(&requests, &source)?;
//! assert_eq!(summary.entries, vec!["nav_F1_2024-01-03_10-15_1.xml".to_string()]);
//! let bytes = archive.unwrap().write_to(Cursor::new(Vec::new()))?.into_inner();
//! assert!(!bytes.is_empty());
//! # Ok(())
//! # }
//! ```
//!
//! # Custom Configuration
//!
//! ```rust,no_run
//! use reportcase::{CollisionPolicy, Compression, EscapeMode, GeneratorBuilder, SheetSelector};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let generator = GeneratorBuilder::new()
//!         .with_sheet_selector(SheetSelector::Name("Requests".to_string()))
//!         .with_escape_mode(EscapeMode::Xml)  // Well-formed XML for any value
//!         .with_collision_policy(CollisionPolicy::Disambiguate)  // Keep every document
//!         .with_compression(Compression::Stored)
//!         .build()?;
//!
//!     let upload = std::fs::read("requests.xlsx")?;
//!     let source = reportcase::CsvSource::from_path("report_statistics.csv");
//!     let (summary, bytes) = generator.generate_to_bytes(upload.as_slice(), &source)?;
//!     if let Some(bytes) = bytes {
//!         std::fs::write("generated_xmls.zip", bytes)?;
//!     }
//!     println!("{:?}", summary.status);
//!
//!     Ok(())
//! }
//! ```

mod api;
mod builder;
mod error;
pub mod matcher;
pub mod normalize;
pub mod output;
mod parser;
pub mod render;
mod security;
pub mod source;
mod types;

// 公開API
pub use api::{CollisionPolicy, Compression, EscapeMode, SheetSelector};
pub use builder::{Generator, GeneratorBuilder, RunStatus, RunSummary};
pub use error::{ReportCaseError, Result};
pub use source::{CandidateQuery, CandidateSource, CsvSource, InMemorySource};
pub use types::{CandidateRecord, RequestDate, RequestRow};
