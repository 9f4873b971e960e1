//! Integration Tests for reportcase
//!
//! Uploads are generated in memory with rust_xlsxwriter, candidates come from
//! `InMemorySource` / `CsvSource`, and archives are read back with `zip::ZipArchive`.

use quick_xml::events::Event;
use quick_xml::Reader as XmlReader;
use reportcase::{
    CandidateRecord, CollisionPolicy, CsvSource, EscapeMode, GeneratorBuilder, InMemorySource,
    ReportCaseError, RunStatus, SheetSelector,
};
use rust_xlsxwriter::*;
use std::io::{Cursor, Read};

// Helper module for generating test fixtures
mod fixtures {
    use super::*;

    /// Generate an upload with the given `(report, fund, date)` rows
    pub fn generate_upload(rows: &[(&str, &str, Option<&str>)]) -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();

        // Header row
        worksheet.write_string(0, 0, "report")?;
        worksheet.write_string(0, 1, "fund")?;
        worksheet.write_string(0, 2, "date")?;

        for (i, (report, fund, date)) in rows.iter().enumerate() {
            let row = i as u32 + 1;
            worksheet.write_string(row, 0, *report)?;
            worksheet.write_string(row, 1, *fund)?;
            if let Some(date) = date {
                worksheet.write_string(row, 2, *date)?;
            }
        }

        Ok(workbook.save_to_buffer()?)
    }

    /// Generate an upload whose date column holds an Excel serial number
    pub fn generate_serial_date_upload() -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();

        worksheet.write_string(0, 0, "report")?;
        worksheet.write_string(0, 1, "fund")?;
        worksheet.write_string(0, 2, "date")?;

        worksheet.write_string(1, 0, "nav")?;
        worksheet.write_string(1, 1, "F1")?;
        // 2024-01-01
        worksheet.write_number(1, 2, 45292.0)?;

        Ok(workbook.save_to_buffer()?)
    }

    /// Generate a workbook where the requests live on the second sheet
    pub fn generate_multi_sheets() -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();

        let notes = workbook.add_worksheet();
        notes.set_name("Notes")?;
        notes.write_string(0, 0, "Upload created by finance team")?;

        let requests = workbook.add_worksheet();
        requests.set_name("Requests")?;
        requests.write_string(0, 0, "report")?;
        requests.write_string(0, 1, "fund")?;
        requests.write_string(1, 0, "nav")?;
        requests.write_string(1, 1, "F1")?;

        Ok(workbook.save_to_buffer()?)
    }

    /// Candidate records used by most tests
    pub fn candidates() -> Vec<CandidateRecord> {
        vec![
            CandidateRecord::new(
                "/Finance/Monthly/NAV.rox",
                "fund: F1; currency: EUR",
                "PDF",
                "2024-01-02 09:00:00",
            ),
            CandidateRecord::new(
                "/Finance/Monthly/NAV.rox",
                "fund: F1; currency: EUR",
                "PDF",
                "2024-01-03 10:15:00",
            ),
            CandidateRecord::new(
                "/Finance/Monthly/NAV.rox",
                "fund: F1; currency: USD",
                "XLSX",
                "2024-01-03 08:30:00",
            ),
            CandidateRecord::new(
                "/Risk/Balance.rox",
                "fund: F2",
                "PDF",
                "2024-01-01 12:00:00",
            ),
        ]
    }
}

/// Read every entry of an archive in order
fn read_entries(bytes: &[u8]) -> Vec<(String, String)> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    (0..archive.len())
        .map(|i| {
            let mut file = archive.by_index(i).unwrap();
            let mut body = String::new();
            file.read_to_string(&mut body).unwrap();
            (file.name().to_string(), body)
        })
        .collect()
}

/// Check that a document parses as XML from start to end
fn assert_well_formed(xml: &str) {
    let mut reader = XmlReader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => panic!("Document is not well-formed: {} in\n{}", e, xml),
        }
    }
}

#[test]
fn test_most_recent_date_selected_and_ranked() {
    let upload = fixtures::generate_upload(&[("nav", "F1", None)]).unwrap();
    let generator = GeneratorBuilder::new().build().unwrap();
    let source = InMemorySource::new(fixtures::candidates());

    let (summary, bytes) = generator
        .generate_to_bytes(Cursor::new(upload), &source)
        .unwrap();
    let entries = read_entries(&bytes.unwrap());

    assert_eq!(summary.status, RunStatus::Generated);
    assert_eq!(summary.request_rows, 1);
    assert_eq!(summary.candidates_fetched, 3);
    let names: Vec<&str> = entries.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(
        names,
        vec!["nav_F1_2024-01-03_10-15_1.xml", "nav_F1_2024-01-03_08-30_2.xml"]
    );
}

#[test]
fn test_document_layout() {
    let upload = fixtures::generate_upload(&[("nav", "F1", None)]).unwrap();
    let generator = GeneratorBuilder::new().build().unwrap();
    let source = InMemorySource::new(fixtures::candidates());

    let (_, bytes) = generator
        .generate_to_bytes(Cursor::new(upload), &source)
        .unwrap();
    let entries = read_entries(&bytes.unwrap());

    let expected = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
<reportTestcase name=\"nav\" format=\"PDF\" pfad=\"/Finance/Monthly\">\n\
  <parameter name=\"fund\">\n\
    <value>F1</value>\n\
  </parameter>\n\
  <parameter name=\"currency\">\n\
    <value>EUR</value>\n\
  </parameter>\n\
</reportTestcase>";
    assert_eq!(entries[0].1, expected);
}

#[test]
fn test_explicit_date_selects_that_day() {
    let upload = fixtures::generate_upload(&[("nav", "F1", Some("2024-01-02"))]).unwrap();
    let generator = GeneratorBuilder::new().build().unwrap();
    let source = InMemorySource::new(fixtures::candidates());

    let (summary, _) = generator
        .generate_to_bytes(Cursor::new(upload), &source)
        .unwrap();

    assert_eq!(summary.entries, vec!["nav_F1_2024-01-02_09-00_1.xml".to_string()]);
}

#[test]
fn test_excel_serial_date_column() {
    let upload = fixtures::generate_serial_date_upload().unwrap();
    let generator = GeneratorBuilder::new().build().unwrap();
    let source = InMemorySource::new(vec![
        CandidateRecord::new("/r/nav.rox", "fund: F1", "PDF", "2024-01-01 07:45:00"),
        CandidateRecord::new("/r/nav.rox", "fund: F1", "PDF", "2024-01-05 07:45:00"),
    ]);

    let (summary, _) = generator
        .generate_to_bytes(Cursor::new(upload), &source)
        .unwrap();

    assert_eq!(summary.entries, vec!["nav_F1_2024-01-01_07-45_1.xml".to_string()]);
}

#[test]
fn test_malformed_date_falls_back_to_most_recent() {
    let upload = fixtures::generate_upload(&[("nav", "F1", Some("next tuesday"))]).unwrap();
    let generator = GeneratorBuilder::new().build().unwrap();
    let source = InMemorySource::new(fixtures::candidates());

    let (summary, _) = generator
        .generate_to_bytes(Cursor::new(upload), &source)
        .unwrap();

    assert_eq!(summary.status, RunStatus::Generated);
    assert_eq!(summary.entries[0], "nav_F1_2024-01-03_10-15_1.xml");
}

#[test]
fn test_rank_restarts_for_each_request() {
    let upload = fixtures::generate_upload(&[("nav", "F1", None), ("balance", "F2", None)]).unwrap();
    let generator = GeneratorBuilder::new().build().unwrap();
    let source = InMemorySource::new(fixtures::candidates());

    let (summary, _) = generator
        .generate_to_bytes(Cursor::new(upload), &source)
        .unwrap();

    assert_eq!(summary.matched_requests, 2);
    assert_eq!(
        summary.entries,
        vec![
            "nav_F1_2024-01-03_10-15_1.xml".to_string(),
            "nav_F1_2024-01-03_08-30_2.xml".to_string(),
            "balance_F2_2024-01-01_12-00_1.xml".to_string(),
        ]
    );
}

#[test]
fn test_report_name_is_normalized() {
    let upload = fixtures::generate_upload(&[("  NAV  ", " F1 ", None)]).unwrap();
    let generator = GeneratorBuilder::new().build().unwrap();
    let source = InMemorySource::new(fixtures::candidates());

    let (summary, _) = generator
        .generate_to_bytes(Cursor::new(upload), &source)
        .unwrap();

    assert!(summary.entries[0].starts_with("nav_F1_"));
}

#[test]
fn test_no_candidates_writes_nothing() {
    let upload = fixtures::generate_upload(&[("unknown", "F9", None)]).unwrap();
    let generator = GeneratorBuilder::new().build().unwrap();
    let source = InMemorySource::new(fixtures::candidates());

    let mut output = Cursor::new(Vec::new());
    let summary = generator
        .generate(Cursor::new(upload), &source, &mut output)
        .unwrap();

    assert_eq!(summary.status, RunStatus::NoCandidates);
    assert!(output.into_inner().is_empty());
}

#[test]
fn test_no_matches_writes_empty_archive() {
    let upload = fixtures::generate_upload(&[("nav", "F1", Some("1999-12-31"))]).unwrap();
    let generator = GeneratorBuilder::new().build().unwrap();
    let source = InMemorySource::new(fixtures::candidates());

    let (summary, bytes) = generator
        .generate_to_bytes(Cursor::new(upload), &source)
        .unwrap();

    assert_eq!(summary.status, RunStatus::NoMatches);
    assert!(read_entries(&bytes.unwrap()).is_empty());
}

#[test]
fn test_header_only_upload_has_no_requests() {
    let upload = fixtures::generate_upload(&[]).unwrap();
    let generator = GeneratorBuilder::new().build().unwrap();
    let source = InMemorySource::new(fixtures::candidates());

    let (summary, bytes) = generator
        .generate_to_bytes(Cursor::new(upload), &source)
        .unwrap();

    assert_eq!(summary.status, RunStatus::NoRequests);
    assert!(bytes.is_none());
}

#[test]
fn test_sheet_selection_by_name_and_index() {
    let upload = fixtures::generate_multi_sheets().unwrap();
    let source = InMemorySource::new(fixtures::candidates());

    for selector in [
        SheetSelector::Name("Requests".to_string()),
        SheetSelector::Index(1),
    ] {
        let generator = GeneratorBuilder::new()
            .with_sheet_selector(selector)
            .build()
            .unwrap();
        let (summary, _) = generator
            .generate_to_bytes(Cursor::new(upload.clone()), &source)
            .unwrap();
        assert_eq!(summary.status, RunStatus::Generated);
    }

    // 先頭シートにはヘッダーがない
    let generator = GeneratorBuilder::new().build().unwrap();
    let result = generator.generate_to_bytes(Cursor::new(upload), &source);
    assert!(matches!(result, Err(ReportCaseError::MissingColumn { .. })));
}

#[test]
fn test_unknown_sheet_is_config_error() {
    let upload = fixtures::generate_upload(&[("nav", "F1", None)]).unwrap();
    let generator = GeneratorBuilder::new()
        .with_sheet_selector(SheetSelector::Name("Missing".to_string()))
        .build()
        .unwrap();
    let source = InMemorySource::default();

    match generator.generate_to_bytes(Cursor::new(upload), &source) {
        Err(ReportCaseError::Config(msg)) => assert!(msg.contains("Missing")),
        other => panic!("Expected Config error, got {:?}", other),
    }
}

#[test]
fn test_escape_mode_produces_well_formed_xml() {
    let upload = fixtures::generate_upload(&[("nav", "F1", None)]).unwrap();
    let source = InMemorySource::new(vec![CandidateRecord::new(
        "/R&D/nav.rox",
        "fund: F1; filter: a < b & c",
        "PDF",
        "2024-01-03 10:15:00",
    )]);

    let raw = GeneratorBuilder::new().build().unwrap();
    let (_, bytes) = raw.generate_to_bytes(Cursor::new(upload.clone()), &source).unwrap();
    let raw_body = read_entries(&bytes.unwrap()).remove(0).1;
    assert!(raw_body.contains("<value>a < b & c</value>"));
    assert!(raw_body.contains("pfad=\"/R&D\""));

    let escaped = GeneratorBuilder::new()
        .with_escape_mode(EscapeMode::Xml)
        .build()
        .unwrap();
    let (_, bytes) = escaped.generate_to_bytes(Cursor::new(upload), &source).unwrap();
    let escaped_body = read_entries(&bytes.unwrap()).remove(0).1;
    assert!(escaped_body.contains("<value>a &lt; b &amp; c</value>"));
    assert_well_formed(&escaped_body);
}

#[test]
fn test_duplicate_rows_with_disambiguation() {
    let upload = fixtures::generate_upload(&[("nav", "F1", None), ("nav", "F1", None)]).unwrap();
    let source = InMemorySource::new(fixtures::candidates());

    let overwrite = GeneratorBuilder::new().build().unwrap();
    let (summary, _) = overwrite
        .generate_to_bytes(Cursor::new(upload.clone()), &source)
        .unwrap();
    assert_eq!(summary.entries_written, 2);
    assert_eq!(summary.entries_overwritten, 2);

    let disambiguate = GeneratorBuilder::new()
        .with_collision_policy(CollisionPolicy::Disambiguate)
        .build()
        .unwrap();
    let (summary, bytes) = disambiguate
        .generate_to_bytes(Cursor::new(upload), &source)
        .unwrap();
    assert_eq!(summary.entries_written, 4);
    assert_eq!(read_entries(&bytes.unwrap()).len(), 4);
}

#[test]
fn test_output_is_idempotent() {
    let upload = fixtures::generate_upload(&[("nav", "F1", None), ("balance", "F2", None)]).unwrap();
    let generator = GeneratorBuilder::new().build().unwrap();
    let source = InMemorySource::new(fixtures::candidates());

    let (_, first) = generator
        .generate_to_bytes(Cursor::new(upload.clone()), &source)
        .unwrap();
    let (_, second) = generator
        .generate_to_bytes(Cursor::new(upload), &source)
        .unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_csv_source_end_to_end() {
    let csv = "\
RS_REPORT,RS_PARAMETERS,RS_FORMAT,RS_START,RS_STATUS,RS_ENGINE
/Finance/Monthly/NAV.rox,fund: F1; currency: EUR,PDF,2024-01-03 10:15:00,succeeded,actuate
/Finance/Monthly/NAV.rox,fund: F1; currency: EUR,PDF,2024-01-03 11:15:00,failed,actuate
/Finance/Monthly/NAV.rox,fund: F1; currency: EUR,PDF,2024-01-03 12:15:00,succeeded,birt
";
    let upload = fixtures::generate_upload(&[("nav", "F1", None)]).unwrap();
    let generator = GeneratorBuilder::new().build().unwrap();
    let source = CsvSource::from_bytes(csv);

    let (summary, _) = generator
        .generate_to_bytes(Cursor::new(upload), &source)
        .unwrap();

    assert_eq!(summary.candidates_fetched, 1);
    assert_eq!(summary.entries, vec!["nav_F1_2024-01-03_10-15_1.xml".to_string()]);
}
