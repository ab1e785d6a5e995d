//! CSV export of the ranked table and import of uploaded lead lists.

use crate::errors::{AppError, ResultExt};
use crate::models::{DiscoveryStrategy, LeadRecord, UNKNOWN};
use csv::{ReaderBuilder, Trim, WriterBuilder};
use serde::{Deserialize, Serialize};

/// Fixed export column set, in order.
pub const EXPORT_HEADERS: [&str; 7] = [
    "Score",
    "Name",
    "Title",
    "Company",
    "Location",
    "Has_Recent_Paper",
    "Recent_Funding",
];

#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    #[serde(rename = "Score")]
    score: Option<u8>,
    #[serde(rename = "Name")]
    name: &'a str,
    #[serde(rename = "Title")]
    title: Option<&'a str>,
    #[serde(rename = "Company")]
    company: &'a str,
    #[serde(rename = "Location")]
    location: Option<&'a str>,
    #[serde(rename = "Has_Recent_Paper")]
    has_recent_paper: Option<bool>,
    #[serde(rename = "Recent_Funding")]
    recent_funding: Option<bool>,
}

impl<'a> From<&'a LeadRecord> for ExportRow<'a> {
    fn from(record: &'a LeadRecord) -> Self {
        Self {
            score: record.score,
            name: &record.name,
            title: record.title.as_deref(),
            company: &record.company,
            location: record.location.as_deref(),
            has_recent_paper: record.has_recent_paper,
            recent_funding: record.recent_funding,
        }
    }
}

/// Loose import row: every column optional, unknown columns ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ImportRow {
    #[serde(rename = "Score", alias = "score")]
    score: Option<String>,
    #[serde(rename = "Name", alias = "name")]
    name: Option<String>,
    #[serde(rename = "Title", alias = "title")]
    title: Option<String>,
    #[serde(rename = "Company", alias = "company")]
    company: Option<String>,
    #[serde(rename = "Location", alias = "location")]
    location: Option<String>,
    #[serde(rename = "Has_Recent_Paper", alias = "has_recent_paper")]
    has_recent_paper: Option<String>,
    #[serde(rename = "Paper_Count", alias = "paper_count")]
    paper_count: Option<String>,
    #[serde(rename = "Recent_Funding", alias = "recent_funding")]
    recent_funding: Option<String>,
}

fn parse_flag(value: Option<&str>) -> Option<bool> {
    match value?.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

/// Cell text as written, minus surrounding whitespace; blank cells are `None`.
fn cell(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl ImportRow {
    fn into_record(self) -> Option<LeadRecord> {
        let name = cell(self.name)?;
        let company = cell(self.company).unwrap_or_else(|| UNKNOWN.to_string());

        let mut record = LeadRecord::new(name, company).with_strategy(DiscoveryStrategy::Uploaded);
        record.title = cell(self.title);
        record.location = cell(self.location);
        record.score = self
            .score
            .as_deref()
            .and_then(|s| s.trim().parse::<u8>().ok())
            .map(|s| s.min(100));
        record.has_recent_paper = parse_flag(self.has_recent_paper.as_deref());
        record.paper_count = self
            .paper_count
            .as_deref()
            .and_then(|c| c.trim().parse().ok());
        record.recent_funding = parse_flag(self.recent_funding.as_deref());
        Some(record)
    }
}

/// Serializes the table with the fixed column set; absent values are empty cells.
pub fn to_csv(records: &[LeadRecord]) -> Result<String, AppError> {
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(Vec::new());
    writer
        .write_record(EXPORT_HEADERS)
        .context("Failed to write CSV header")?;

    for record in records {
        writer
            .serialize(ExportRow::from(record))
            .with_context(|| format!("Failed to write CSV row for {}", record.name))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::ExportError(format!("Failed to flush CSV: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| AppError::ExportError(format!("CSV is not UTF-8: {}", e)))
}

/// Parses an uploaded lead list; rows without a name are skipped.
pub fn from_csv(input: &str) -> Result<Vec<LeadRecord>, AppError> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(input.as_bytes());

    let headers = reader.headers().context("Failed to read CSV header")?.clone();
    if !headers
        .iter()
        .any(|h| h.eq_ignore_ascii_case("name"))
    {
        return Err(AppError::BadRequest(
            "CSV must contain a Name column".to_string(),
        ));
    }

    let mut records = Vec::new();
    for (index, row) in reader.deserialize::<ImportRow>().enumerate() {
        let row = row.with_context(|| format!("Malformed CSV row {}", index + 2))?;
        match row.into_record() {
            Some(record) => records.push(record),
            None => tracing::warn!("Skipping CSV row {}: missing Name", index + 2),
        }
    }

    tracing::info!("Imported {} leads from CSV", records.len());
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(name: &str, company: &str, score: u8) -> LeadRecord {
        let mut record = LeadRecord::new(name, company)
            .with_title("Director of Toxicology")
            .with_location("Boston, MA");
        record.has_recent_paper = Some(true);
        record.paper_count = Some(4);
        record.recent_funding = Some(false);
        record.score = Some(score);
        record
    }

    #[test]
    fn test_export_header_and_rows() {
        let csv = to_csv(&[scored("Jane Doe", "Acme, Inc.", 80)]).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("Score,Name,Title,Company,Location,Has_Recent_Paper,Recent_Funding")
        );
        assert_eq!(
            lines.next(),
            Some("80,Jane Doe,Director of Toxicology,\"Acme, Inc.\",\"Boston, MA\",true,false")
        );
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_export_absent_values_are_empty() {
        let csv = to_csv(&[LeadRecord::new("Bare", "Unknown")]).unwrap();
        assert_eq!(csv.lines().nth(1), Some(",Bare,,Unknown,,,"));
    }

    #[test]
    fn test_export_empty_table_has_header() {
        let csv = to_csv(&[]).unwrap();
        assert_eq!(csv.lines().count(), 1);
    }

    #[test]
    fn test_round_trip_preserves_table_columns() {
        let original = vec![scored("Jane Doe", "Acme, Inc.", 80), scored("Li \"Max\" Wu", "MIT", 40)];
        let restored = from_csv(&to_csv(&original).unwrap()).unwrap();

        assert_eq!(restored.len(), 2);
        for (a, b) in original.iter().zip(&restored) {
            assert_eq!(a.name, b.name);
            assert_eq!(a.company, b.company);
            assert_eq!(a.title, b.title);
            assert_eq!(a.location, b.location);
            assert_eq!(a.score, b.score);
            assert_eq!(a.has_recent_paper, b.has_recent_paper);
            assert_eq!(a.recent_funding, b.recent_funding);
        }
    }

    #[test]
    fn test_round_trip_keeps_inner_whitespace() {
        let mut record = LeadRecord::new("Jane  Doe", "Acme   Bio")
            .with_title("Head of  Safety")
            .with_location("Boston,  MA");
        record.score = Some(30);

        let restored = from_csv(&to_csv(&[record.clone()]).unwrap()).unwrap();

        assert_eq!(restored[0].name, "Jane  Doe");
        assert_eq!(restored[0].company, "Acme   Bio");
        assert_eq!(restored[0].title.as_deref(), Some("Head of  Safety"));
        assert_eq!(restored[0].location.as_deref(), Some("Boston,  MA"));
        assert_eq!(restored[0].score, Some(30));
    }

    #[test]
    fn test_import_minimal_upload() {
        let input = "Name,Company\nJane Doe,Acme\n  ,Nobody Inc\nJohn Smith,\n";
        let records = from_csv(input).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "Jane Doe");
        assert_eq!(records[0].title, None);
        assert_eq!(records[0].discovery_strategy, DiscoveryStrategy::Uploaded);
        assert_eq!(records[1].company, UNKNOWN);
        assert!(!records[0].is_enriched());
    }

    #[test]
    fn test_import_paper_count_and_extra_columns() {
        let input = "Name,Company,Paper_Count,Email\nJane,Acme,3,jane@acme.com\n";
        let records = from_csv(input).unwrap();
        assert_eq!(records[0].paper_count, Some(3));
    }

    #[test]
    fn test_import_requires_name_column() {
        let err = from_csv("Company,Title\nAcme,CTO\n").unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
