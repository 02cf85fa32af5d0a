// Cleaner payout report built from completed assignments, exportable as CSV or an Excel-readable workbook

use crate::models::DisbursementRecord;
use anyhow::Context;
use chrono::NaiveDate;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::string::FromUtf8Error;
use thiserror::Error;
use tracing::info;

pub const SHEET_NAME: &str = "Disbursements";

const COLUMNS: [(&str, u32); 9] = [
    ("Cleaner Name", 20),
    ("Phone Number", 15),
    ("Service Type", 20),
    ("Service Details", 20),
    ("Amount ($)", 12),
    ("Booking Reference", 18),
    ("Status", 12),
    ("Bank Name", 20),
    ("Account Number", 18),
];

// Excel column widths are in points; one character is roughly seven
const POINTS_PER_CHAR: u32 = 7;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("No completed disbursements to export")]
    Empty,

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("Encoding error: {0}")]
    Encoding(#[from] FromUtf8Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PayoutRow {
    pub cleaner_name: String,
    pub phone_number: String,
    pub service_type: String,
    pub service_details: String,
    pub amount: f64,
    pub booking_reference: String,
    pub status: String,
    pub bank_name: String,
    pub account_number: String,
}

impl PayoutRow {
    fn from_record(record: &DisbursementRecord) -> Self {
        let booking = &record.cleaner_info.booking;
        let bank = record.bank_details.as_ref();

        Self {
            cleaner_name: record.worker_info.full_name.clone(),
            phone_number: record.worker_info.phone_number.clone().unwrap_or_default(),
            service_type: format_service_name(
                booking.service_type.as_deref().unwrap_or(&booking.services),
            ),
            service_details: booking.services.clone(),
            amount: record.worker_info.wallet.unwrap_or(0.0),
            booking_reference: booking.booking_reference.clone().unwrap_or_default(),
            status: record.cleaner_info.status.clone(),
            bank_name: bank
                .and_then(|bank| bank.bank_name.clone())
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| "No bank".to_string()),
            account_number: bank
                .and_then(|bank| bank.account_number.clone())
                .filter(|number| !number.is_empty())
                .unwrap_or_else(|| "N/A".to_string()),
        }
    }

    fn cells(&self) -> [String; 9] {
        [
            self.cleaner_name.clone(),
            self.phone_number.clone(),
            self.service_type.clone(),
            self.service_details.clone(),
            self.amount.to_string(),
            self.booking_reference.clone(),
            self.status.clone(),
            self.bank_name.clone(),
            self.account_number.clone(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PayoutSummary {
    pub total_records: usize,
    pub total_amount: f64,
    pub generated_on: NaiveDate,
}

impl PayoutSummary {
    // Label/value pairs shown under the table
    fn lines(&self) -> [(&'static str, String); 3] {
        [
            ("Total Records:", self.total_records.to_string()),
            ("Total Amount:", format!("${}", self.total_amount)),
            ("Generated on:", self.generated_on.format("%-m/%-d/%Y").to_string()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PayoutReport {
    pub rows: Vec<PayoutRow>,
    pub summary: PayoutSummary,
}

// "move-in-out" -> "Move In Out"
pub fn format_service_name(service: &str) -> String {
    let mut formatted = String::with_capacity(service.len());
    let mut word_start = true;

    for c in service.chars() {
        let c = if c == '-' { ' ' } else { c };
        if word_start && c.is_alphanumeric() {
            formatted.extend(c.to_uppercase());
        } else {
            formatted.push(c);
        }
        word_start = !(c.is_alphanumeric() || c == '_');
    }
    formatted
}

fn padded_row(label: &str, value: String) -> Vec<String> {
    let mut row = vec![String::new(); COLUMNS.len()];
    row[0] = label.to_string();
    row[1] = value;
    row
}

impl PayoutReport {
    // Only assignments the cleaner has completed are owed a payout
    pub fn from_records(records: &[DisbursementRecord], generated_on: NaiveDate) -> Self {
        let rows: Vec<PayoutRow> = records
            .iter()
            .filter(|record| record.cleaner_info.status == "completed")
            .map(PayoutRow::from_record)
            .collect();

        let summary = PayoutSummary {
            total_records: rows.len(),
            total_amount: rows.iter().map(|row| row.amount).sum(),
            generated_on,
        };

        Self { rows, summary }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn file_stem(&self) -> String {
        format!(
            "darimaid-disbursements-{}",
            self.summary.generated_on.format("%Y-%m-%d")
        )
    }

    fn ensure_rows(&self) -> Result<(), ReportError> {
        if self.is_empty() {
            Err(ReportError::Empty)
        } else {
            Ok(())
        }
    }

    pub fn to_csv(&self) -> Result<String, ReportError> {
        self.ensure_rows()?;

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(COLUMNS.iter().map(|(header, _)| *header))?;
        for row in &self.rows {
            writer.write_record(row.cells())?;
        }

        writer.write_record(vec![String::new(); COLUMNS.len()])?;
        writer.write_record(padded_row("SUMMARY", String::new()))?;
        for (label, value) in self.summary.lines() {
            writer.write_record(padded_row(label, value))?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| ReportError::Io(std::io::Error::new(e.error().kind(), e.error().to_string())))?;
        Ok(String::from_utf8(bytes)?)
    }

    // Single-sheet SpreadsheetML 2003 workbook
    pub fn to_spreadsheet_xml(&self) -> Result<String, ReportError> {
        self.ensure_rows()?;

        let mut rows = Vec::with_capacity(self.rows.len() + 6);
        rows.push(XmlRow::strings(COLUMNS.iter().map(|(header, _)| header.to_string())));
        for row in &self.rows {
            let mut cells: Vec<XmlCell> = row.cells().into_iter().map(XmlCell::string).collect();
            cells[4] = XmlCell::number(row.amount);
            rows.push(XmlRow { cells });
        }
        rows.push(XmlRow { cells: Vec::new() });
        rows.push(XmlRow::strings(padded_row("SUMMARY", String::new())));
        for (label, value) in self.summary.lines() {
            rows.push(XmlRow::strings(padded_row(label, value)));
        }

        let workbook = XmlWorkbook {
            xmlns: "urn:schemas-microsoft-com:office:spreadsheet",
            xmlns_ss: "urn:schemas-microsoft-com:office:spreadsheet",
            worksheet: XmlWorksheet {
                name: SHEET_NAME.to_string(),
                table: XmlTable {
                    columns: COLUMNS
                        .iter()
                        .map(|(_, chars)| XmlColumn {
                            width: chars * POINTS_PER_CHAR,
                        })
                        .collect(),
                    rows,
                },
            },
        };

        let body = quick_xml::se::to_string(&workbook)
            .map_err(|e| ReportError::Xml(e.to_string()))?;
        Ok(format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<?mso-application progid=\"Excel.Sheet\"?>\n{}",
            body
        ))
    }

    // Writes both exports next to each other and returns their paths
    pub fn write_to_dir(&self, dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
        let stem = self.file_stem();
        let csv_path = dir.join(format!("{}.csv", stem));
        let xls_path = dir.join(format!("{}.xls", stem));

        std::fs::write(&csv_path, self.to_csv()?)
            .with_context(|| format!("Failed to write {}", csv_path.display()))?;
        std::fs::write(&xls_path, self.to_spreadsheet_xml()?)
            .with_context(|| format!("Failed to write {}", xls_path.display()))?;

        info!(
            "Exported {} disbursements ({}) to {}",
            self.summary.total_records,
            self.summary.total_amount,
            dir.display()
        );
        Ok(vec![csv_path, xls_path])
    }
}

#[derive(Debug, PartialEq, Serialize)]
#[serde(rename = "Workbook")]
struct XmlWorkbook {
    #[serde(rename = "@xmlns")]
    xmlns: &'static str,
    #[serde(rename = "@xmlns:ss")]
    xmlns_ss: &'static str,
    #[serde(rename = "Worksheet")]
    worksheet: XmlWorksheet,
}

#[derive(Debug, PartialEq, Serialize)]
struct XmlWorksheet {
    #[serde(rename = "@ss:Name")]
    name: String,
    #[serde(rename = "Table")]
    table: XmlTable,
}

#[derive(Debug, PartialEq, Serialize)]
struct XmlTable {
    #[serde(rename = "Column")]
    columns: Vec<XmlColumn>,
    #[serde(rename = "Row")]
    rows: Vec<XmlRow>,
}

#[derive(Debug, PartialEq, Serialize)]
struct XmlColumn {
    #[serde(rename = "@ss:Width")]
    width: u32,
}

#[derive(Debug, PartialEq, Serialize)]
struct XmlRow {
    #[serde(rename = "Cell")]
    cells: Vec<XmlCell>,
}

impl XmlRow {
    fn strings<I: IntoIterator<Item = String>>(values: I) -> Self {
        Self {
            cells: values.into_iter().map(XmlCell::string).collect(),
        }
    }
}

#[derive(Debug, PartialEq, Serialize)]
struct XmlCell {
    #[serde(rename = "Data")]
    data: XmlData,
}

impl XmlCell {
    fn string(value: String) -> Self {
        Self {
            data: XmlData {
                kind: "String",
                value,
            },
        }
    }

    fn number(value: f64) -> Self {
        Self {
            data: XmlData {
                kind: "Number",
                value: value.to_string(),
            },
        }
    }
}

#[derive(Debug, PartialEq, Serialize)]
struct XmlData {
    #[serde(rename = "@ss:Type")]
    kind: &'static str,
    #[serde(rename = "$text")]
    value: String,
}
