//! Inventory and membership loaders for delimited text files.
//!
//! Bicycle files come from the shop's inventory sheet and are usually
//! pipe-delimited, with rates written like `15/day` and purchase dates as
//! `dd/mm/yyyy`. Member files are plain CSV. Rows that cannot be turned into
//! records are collected as rejections instead of aborting the whole load.

use std::io::Read;

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, Trim};
use engine::{
    Bicycle, BicycleCondition, BicycleStatus, EngineError, Member, MemberStatus, MembershipType,
    Money,
};
use serde::{Deserialize, de::DeserializeOwned};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("delimiter must be a single ASCII character, got {0:?}")]
    Delimiter(char),
    #[error("line {line}: {reason}")]
    Row { line: u64, reason: String },
}

/// Records read from a file plus the rows that were rejected.
#[derive(Debug)]
pub struct Parsed<T> {
    pub records: Vec<T>,
    pub rejected: Vec<ImportError>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BicycleRow {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Brand")]
    brand: String,
    #[serde(rename = "Type")]
    kind: String,
    #[serde(rename = "Frame Size")]
    frame_size: String,
    #[serde(rename = "Rental Rate")]
    rental_rate: String,
    #[serde(rename = "Purchase Date")]
    purchase_date: String,
    #[serde(rename = "Condition")]
    condition: String,
    #[serde(rename = "Status")]
    status: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MemberRow {
    #[serde(rename = "MemberID")]
    id: String,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Email")]
    email: String,
    #[serde(rename = "Phone")]
    phone: String,
    #[serde(rename = "MembershipType")]
    membership_type: String,
    #[serde(rename = "Status")]
    status: String,
    #[serde(rename = "RegistrationDate")]
    registration_date: String,
    #[serde(rename = "RentalLimit")]
    rental_limit: String,
    #[serde(rename = "MembershipEndDate")]
    membership_end_date: String,
}

/// Picks the delimiter: the explicit one if given, otherwise `|` when the
/// header line contains one and `,` if not.
pub fn delimiter(content: &str, explicit: Option<char>) -> Result<u8, ImportError> {
    match explicit {
        Some(ch) => u8::try_from(ch)
            .ok()
            .filter(u8::is_ascii)
            .ok_or(ImportError::Delimiter(ch)),
        None => {
            let header = content.lines().next().unwrap_or_default();
            Ok(if header.contains('|') { b'|' } else { b',' })
        }
    }
}

/// Parses a daily rate, accepting a trailing `/day` or `per day`.
pub fn parse_rate(raw: &str) -> Result<Money, EngineError> {
    let lowered = raw.trim().to_ascii_lowercase();
    let amount = lowered
        .strip_suffix("/day")
        .or_else(|| lowered.strip_suffix("per day"))
        .unwrap_or(&lowered);
    amount.parse()
}

/// Parses `dd/mm/yyyy`, falling back to ISO `yyyy-mm-dd`.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%d/%m/%Y")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .ok()
}

fn optional(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}

fn read_rows<R, T, U, F>(reader: R, delimiter: u8, mut convert: F) -> Result<Parsed<U>, ImportError>
where
    R: Read,
    T: DeserializeOwned,
    F: FnMut(T, u64) -> Result<U, String>,
{
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(Trim::All)
        .from_reader(reader);
    let headers = reader.headers()?.clone();

    let mut parsed = Parsed {
        records: Vec::new(),
        rejected: Vec::new(),
    };
    let mut record = StringRecord::new();
    while reader.read_record(&mut record)? {
        let line = record.position().map_or(0, csv::Position::line);
        let row = record
            .deserialize::<T>(Some(&headers))
            .map_err(|err| err.to_string())
            .and_then(|row| convert(row, line));
        match row {
            Ok(value) => parsed.records.push(value),
            Err(reason) => parsed.rejected.push(ImportError::Row { line, reason }),
        }
    }
    Ok(parsed)
}

fn bicycle_from_row(row: BicycleRow, line: u64) -> Result<Bicycle, String> {
    let (Some(id), Some(brand), Some(kind)) = (
        optional(&row.id),
        optional(&row.brand),
        optional(&row.kind),
    ) else {
        return Err("ID, Brand and Type are required".to_string());
    };
    let id: i32 = id.parse().map_err(|_| format!("invalid ID: {id}"))?;
    let rate = parse_rate(&row.rental_rate).map_err(|err| err.to_string())?;

    let mut bicycle =
        Bicycle::new(id, brand, kind, &row.frame_size, rate).map_err(|err| err.to_string())?;
    if let Some(condition) = optional(&row.condition) {
        let condition = BicycleCondition::try_from(condition).map_err(|err| err.to_string())?;
        bicycle = bicycle.with_condition(condition);
    }
    if let Some(status) = optional(&row.status) {
        let status = BicycleStatus::try_from(status).map_err(|err| err.to_string())?;
        bicycle = bicycle.with_status(status);
    }
    if let Some(raw) = optional(&row.purchase_date) {
        match parse_date(raw) {
            Some(date) => bicycle = bicycle.purchased_on(date),
            None => tracing::warn!("line {line}: unreadable purchase date {raw:?}, left empty"),
        }
    }
    Ok(bicycle)
}

fn member_from_row(row: MemberRow, today: NaiveDate) -> Result<Member, String> {
    let (Some(id), Some(limit)) = (optional(&row.id), optional(&row.rental_limit)) else {
        return Err("MemberID and RentalLimit are required".to_string());
    };
    let id: i32 = id.parse().map_err(|_| format!("invalid MemberID: {id}"))?;
    let limit: u32 = limit
        .parse()
        .map_err(|_| format!("invalid RentalLimit: {limit}"))?;
    let end_date = optional(&row.membership_end_date)
        .and_then(parse_date)
        .ok_or_else(|| format!("invalid MembershipEndDate: {:?}", row.membership_end_date))?;
    let registration_date = match optional(&row.registration_date) {
        Some(raw) => parse_date(raw).ok_or_else(|| format!("invalid RegistrationDate: {raw}"))?,
        None => today,
    };

    let name = optional(&row.name).map_or_else(|| format!("Member {id}"), str::to_string);
    let mut member = Member::new(id, &name, registration_date, end_date)
        .map_err(|err| err.to_string())?
        .contact(optional(&row.email), optional(&row.phone))
        .rental_limit(limit);
    if let Some(kind) = optional(&row.membership_type) {
        member = member
            .membership_type(MembershipType::try_from(kind).map_err(|err| err.to_string())?);
    }
    if let Some(status) = optional(&row.status) {
        member = member.status(MemberStatus::try_from(status).map_err(|err| err.to_string())?);
    }
    Ok(member)
}

/// Reads bicycles. Unreadable purchase dates are logged and left empty.
pub fn read_bicycles<R: Read>(reader: R, delimiter: u8) -> Result<Parsed<Bicycle>, ImportError> {
    read_rows(reader, delimiter, bicycle_from_row)
}

/// Reads members. A missing registration date defaults to `today`.
pub fn read_members<R: Read>(
    reader: R,
    delimiter: u8,
    today: NaiveDate,
) -> Result<Parsed<Member>, ImportError> {
    read_rows(reader, delimiter, |row: MemberRow, _| {
        member_from_row(row, today)
    })
}
