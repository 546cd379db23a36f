use std::fmt;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Deserializer};
use validator::{Validate, ValidationErrors};

use super::domain::{ListingType, PropertyType};
use super::listings::ListingInput;

#[derive(Debug)]
pub enum ListingImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    InvalidRow {
        line: u64,
        source: ValidationErrors,
    },
}

impl fmt::Display for ListingImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListingImportError::Io(err) => write!(f, "failed to read listing export: {err}"),
            ListingImportError::Csv(err) => write!(f, "invalid listing CSV data: {err}"),
            ListingImportError::InvalidRow { line, source } => {
                write!(f, "listing on line {line} failed validation: {source}")
            }
        }
    }
}

impl std::error::Error for ListingImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ListingImportError::Io(err) => Some(err),
            ListingImportError::Csv(err) => Some(err),
            ListingImportError::InvalidRow { source, .. } => Some(source),
        }
    }
}

impl From<std::io::Error> for ListingImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for ListingImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

#[derive(Debug, Deserialize)]
struct ListingRow {
    title: String,
    description: String,
    price: u64,
    property_type: PropertyType,
    listing_type: ListingType,
    bedrooms: u8,
    bathrooms: u8,
    #[serde(default, deserialize_with = "empty_as_none")]
    square_feet: Option<u32>,
    address: String,
    city: String,
    state: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    zip_code: Option<String>,
    #[serde(default, deserialize_with = "semicolon_list")]
    features: Vec<String>,
    #[serde(default, deserialize_with = "semicolon_list")]
    images: Vec<String>,
}

impl From<ListingRow> for ListingInput {
    fn from(row: ListingRow) -> Self {
        ListingInput {
            title: row.title,
            description: row.description,
            price: row.price,
            property_type: row.property_type,
            listing_type: row.listing_type,
            bedrooms: row.bedrooms,
            bathrooms: row.bathrooms,
            square_feet: row.square_feet,
            address: row.address,
            city: row.city,
            state: row.state,
            zip_code: row.zip_code,
            features: row.features,
            images: row.images,
        }
    }
}

fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

fn semicolon_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .split(';')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect())
}

/// Reads listing rows from a CSV export and validates each one.
pub struct ListingImporter;

impl ListingImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<ListingInput>, ListingImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<ListingInput>, ListingImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers = csv_reader.headers()?.clone();
        let mut listings = Vec::new();

        for record in csv_reader.records() {
            let record = record?;
            // quoted fields may span lines, so take the reader's position
            let line = record.position().map_or(0, |position| position.line());
            let row: ListingRow = record.deserialize(Some(&headers))?;
            let input = ListingInput::from(row);
            if let Err(source) = input.validate() {
                return Err(ListingImportError::InvalidRow { line, source });
            }
            listings.push(input);
        }

        Ok(listings)
    }
}
