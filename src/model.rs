//! Row types for the raw IMDb tables and the derived aggregate tables.
//!
//! Raw types carry the source's `\N` null sentinel through serialization so
//! locally persisted TSV files re-parse identically. Derived types use plain
//! `Option` fields: the csv crate writes them as empty fields and serde_json
//! renders them as nulls for the warehouse.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::warehouse::{ColumnKind, ColumnSpec, WarehouseRow};

/// Marker the source files use for an absent value.
pub const NULL_SENTINEL: &str = "\\N";

/// One row of the titles dataset. Columns in the source file that have no
/// field here (`originalTitle`, `isAdult`, `endYear`) are ignored on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TitleRecord {
    pub tconst: String,
    #[serde(
        rename = "titleType",
        deserialize_with = "de_opt_string",
        serialize_with = "ser_opt"
    )]
    pub title_type: Option<String>,
    #[serde(
        rename = "primaryTitle",
        deserialize_with = "de_opt_string",
        serialize_with = "ser_opt"
    )]
    pub primary_title: Option<String>,
    #[serde(
        rename = "startYear",
        deserialize_with = "de_opt_number",
        serialize_with = "ser_opt"
    )]
    pub start_year: Option<i32>,
    #[serde(
        rename = "runtimeMinutes",
        deserialize_with = "de_opt_number",
        serialize_with = "ser_opt"
    )]
    pub runtime_minutes: Option<u32>,
    #[serde(deserialize_with = "de_opt_string", serialize_with = "ser_opt")]
    pub genres: Option<String>,
}

/// One row of the ratings dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingRecord {
    pub tconst: String,
    #[serde(rename = "averageRating")]
    pub average_rating: f64,
    #[serde(rename = "numVotes")]
    pub num_votes: u64,
}

/// The named collection of raw tables one extraction run produces.
#[derive(Debug, Default)]
pub struct RawTables {
    pub movies: Vec<TitleRecord>,
    pub ratings: Vec<RatingRecord>,
}

/// Left join of titles and ratings; one row per title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieDetail {
    pub tconst: String,
    pub title_type: Option<String>,
    pub primary_title: Option<String>,
    pub start_year: Option<i32>,
    pub runtime_minutes: Option<u32>,
    pub genres: Option<String>,
    pub average_rating: Option<f64>,
    pub num_votes: Option<u64>,
}

impl MovieDetail {
    /// Splits the comma-joined genre list. Empty when genres are unknown.
    pub fn genre_list(&self) -> impl Iterator<Item = &str> {
        self.genres
            .as_deref()
            .into_iter()
            .flat_map(|g| g.split(','))
            .filter(|g| !g.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearlyAggregate {
    pub start_year: i32,
    pub title_count: u64,
    pub mean_rating: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearGenreAggregate {
    pub start_year: i32,
    pub genre: String,
    pub title_count: u64,
    pub mean_rating: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeBucketCount {
    pub bucket: String,
    pub title_count: u64,
}

/// All four derived tables of a run, handed from transform to load.
#[derive(Debug, Default)]
pub struct DerivedTables {
    pub movies_detailed: Vec<MovieDetail>,
    pub yearly_aggregates: Vec<YearlyAggregate>,
    pub year_genre_aggregates: Vec<YearGenreAggregate>,
    pub runtime_distribution: Vec<RuntimeBucketCount>,
}

impl WarehouseRow for MovieDetail {
    const COLUMNS: &'static [ColumnSpec] = &[
        ColumnSpec::new("tconst", ColumnKind::String),
        ColumnSpec::new("title_type", ColumnKind::String),
        ColumnSpec::new("primary_title", ColumnKind::String),
        ColumnSpec::new("start_year", ColumnKind::Integer),
        ColumnSpec::new("runtime_minutes", ColumnKind::Integer),
        ColumnSpec::new("genres", ColumnKind::String),
        ColumnSpec::new("average_rating", ColumnKind::Float),
        ColumnSpec::new("num_votes", ColumnKind::Integer),
    ];
}

impl WarehouseRow for YearlyAggregate {
    const COLUMNS: &'static [ColumnSpec] = &[
        ColumnSpec::new("start_year", ColumnKind::Integer),
        ColumnSpec::new("title_count", ColumnKind::Integer),
        ColumnSpec::new("mean_rating", ColumnKind::Float),
    ];
}

impl WarehouseRow for YearGenreAggregate {
    const COLUMNS: &'static [ColumnSpec] = &[
        ColumnSpec::new("start_year", ColumnKind::Integer),
        ColumnSpec::new("genre", ColumnKind::String),
        ColumnSpec::new("title_count", ColumnKind::Integer),
        ColumnSpec::new("mean_rating", ColumnKind::Float),
    ];
}

impl WarehouseRow for RuntimeBucketCount {
    const COLUMNS: &'static [ColumnSpec] = &[
        ColumnSpec::new("bucket", ColumnKind::String),
        ColumnSpec::new("title_count", ColumnKind::Integer),
    ];
}

fn de_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(if raw.is_empty() || raw == NULL_SENTINEL {
        None
    } else {
        Some(raw)
    })
}

fn de_opt_number<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = String::deserialize(deserializer)?;
    if raw.is_empty() || raw == NULL_SENTINEL {
        return Ok(None);
    }
    raw.parse::<T>().map(Some).map_err(serde::de::Error::custom)
}

fn ser_opt<T, S>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
where
    T: std::fmt::Display,
    S: Serializer,
{
    match value {
        Some(v) => serializer.collect_str(v),
        None => serializer.serialize_str(NULL_SENTINEL),
    }
}
