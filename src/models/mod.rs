use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Placeholder stored for any field no rule matched
pub const SENTINEL: &str = "N/A";

/// Name of the timestamp column appended after the declared fields
pub const TIMESTAMP_COLUMN: &str = "Scraped_Date";

/// Declared fields of a property record, in export column order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Field {
    #[serde(rename = "Property_Title")]
    Title,
    #[serde(rename = "Property_URL")]
    Url,
    #[serde(rename = "Location")]
    Location,
    #[serde(rename = "Address")]
    Address,
    #[serde(rename = "Price")]
    Price,
    #[serde(rename = "Rate_per_sqft")]
    RatePerSqft,
    #[serde(rename = "Deposit")]
    Deposit,
    #[serde(rename = "Property_Type")]
    PropertyType,
    #[serde(rename = "Room_Type")]
    RoomType,
    #[serde(rename = "Bedrooms")]
    Bedrooms,
    #[serde(rename = "Bathrooms")]
    Bathrooms,
    #[serde(rename = "Balconies")]
    Balconies,
    #[serde(rename = "Furnishing")]
    Furnishing,
    #[serde(rename = "Carpet_Area")]
    CarpetArea,
    #[serde(rename = "Available_From")]
    AvailableFrom,
    #[serde(rename = "Available_For")]
    AvailableFor,
    #[serde(rename = "Posted_By")]
    PostedBy,
    #[serde(rename = "Posted_Date")]
    PostedDate,
    #[serde(rename = "Rating")]
    Rating,
    #[serde(rename = "Nearby_Places")]
    NearbyPlaces,
}

impl Field {
    pub const ALL: [Field; 20] = [
        Field::Title,
        Field::Url,
        Field::Location,
        Field::Address,
        Field::Price,
        Field::RatePerSqft,
        Field::Deposit,
        Field::PropertyType,
        Field::RoomType,
        Field::Bedrooms,
        Field::Bathrooms,
        Field::Balconies,
        Field::Furnishing,
        Field::CarpetArea,
        Field::AvailableFrom,
        Field::AvailableFor,
        Field::PostedBy,
        Field::PostedDate,
        Field::Rating,
        Field::NearbyPlaces,
    ];

    /// Column name used in exports
    pub fn column(self) -> &'static str {
        match self {
            Field::Title => "Property_Title",
            Field::Url => "Property_URL",
            Field::Location => "Location",
            Field::Address => "Address",
            Field::Price => "Price",
            Field::RatePerSqft => "Rate_per_sqft",
            Field::Deposit => "Deposit",
            Field::PropertyType => "Property_Type",
            Field::RoomType => "Room_Type",
            Field::Bedrooms => "Bedrooms",
            Field::Bathrooms => "Bathrooms",
            Field::Balconies => "Balconies",
            Field::Furnishing => "Furnishing",
            Field::CarpetArea => "Carpet_Area",
            Field::AvailableFrom => "Available_From",
            Field::AvailableFor => "Available_For",
            Field::PostedBy => "Posted_By",
            Field::PostedDate => "Posted_Date",
            Field::Rating => "Rating",
            Field::NearbyPlaces => "Nearby_Places",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// One scraped property. Every declared field is always present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyRecord {
    fields: BTreeMap<Field, String>,
    pub scraped_at: DateTime<Local>,
}

impl PropertyRecord {
    /// Create a record for `url` with every other field at the sentinel
    pub fn new(url: &str, scraped_at: DateTime<Local>) -> Self {
        let mut fields: BTreeMap<Field, String> = Field::ALL
            .iter()
            .map(|field| (*field, SENTINEL.to_string()))
            .collect();
        fields.insert(Field::Url, url.to_string());

        Self { fields, scraped_at }
    }

    pub fn get(&self, field: Field) -> &str {
        self.fields
            .get(&field)
            .map(String::as_str)
            .unwrap_or(SENTINEL)
    }

    /// Store a value; blank values are kept as the sentinel
    pub(crate) fn set(&mut self, field: Field, value: impl Into<String>) {
        let value = value.into();
        let value = if value.trim().is_empty() {
            SENTINEL.to_string()
        } else {
            value
        };
        self.fields.insert(field, value);
    }

    /// Values in column order, timestamp last
    pub fn row(&self) -> Vec<String> {
        let mut row: Vec<String> = Field::ALL
            .iter()
            .map(|field| self.get(*field).to_string())
            .collect();
        row.push(self.scraped_at.format("%Y-%m-%d %H:%M:%S").to_string());
        row
    }

    /// Header matching [`PropertyRecord::row`]
    pub fn header() -> Vec<&'static str> {
        let mut header: Vec<&'static str> = Field::ALL.iter().map(|field| field.column()).collect();
        header.push(TIMESTAMP_COLUMN);
        header
    }
}
