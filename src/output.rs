//! Local file persistence for the standalone extract/transform invocations.
//!
//! Raw tables are written as unquoted TSV with the source's null sentinel so
//! the files re-parse exactly like a downloaded payload. Derived tables are
//! written as ordinary CSV. The end-to-end pipeline run never touches disk.

use std::fs::{self, File};
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::info;

use crate::error::EtlError;
use crate::fetch;
use crate::model::{DerivedTables, RawTables};

pub const MOVIES_RAW_FILE: &str = "movies.tsv";
pub const RATINGS_RAW_FILE: &str = "ratings.tsv";

pub const MOVIES_DETAILED_FILE: &str = "movies_detailed.csv";
pub const YEARLY_AGGREGATES_FILE: &str = "yearly_aggregates.csv";
pub const YEAR_GENRE_AGGREGATES_FILE: &str = "year_genre_aggregates.csv";
pub const RUNTIME_DISTRIBUTION_FILE: &str = "runtime_distribution.csv";

pub fn write_raw_tables(raw: &RawTables, dir: &Path) -> Result<(), EtlError> {
    fs::create_dir_all(dir).map_err(|e| EtlError::io(dir, e))?;
    write_tsv(&dir.join(MOVIES_RAW_FILE), &raw.movies)?;
    write_tsv(&dir.join(RATINGS_RAW_FILE), &raw.ratings)?;
    info!(
        dir = %dir.display(),
        movies = raw.movies.len(),
        ratings = raw.ratings.len(),
        "raw tables written"
    );
    Ok(())
}

pub fn read_raw_tables(dir: &Path) -> Result<RawTables, EtlError> {
    let movies = read_tsv(&dir.join(MOVIES_RAW_FILE))?;
    let ratings = read_tsv(&dir.join(RATINGS_RAW_FILE))?;
    Ok(RawTables { movies, ratings })
}

pub fn write_derived_tables(tables: &DerivedTables, dir: &Path) -> Result<(), EtlError> {
    fs::create_dir_all(dir).map_err(|e| EtlError::io(dir, e))?;
    write_csv(&dir.join(MOVIES_DETAILED_FILE), &tables.movies_detailed)?;
    write_csv(&dir.join(YEARLY_AGGREGATES_FILE), &tables.yearly_aggregates)?;
    write_csv(
        &dir.join(YEAR_GENRE_AGGREGATES_FILE),
        &tables.year_genre_aggregates,
    )?;
    write_csv(
        &dir.join(RUNTIME_DISTRIBUTION_FILE),
        &tables.runtime_distribution,
    )?;
    info!(
        dir = %dir.display(),
        movies_detailed = tables.movies_detailed.len(),
        yearly_aggregates = tables.yearly_aggregates.len(),
        year_genre_aggregates = tables.year_genre_aggregates.len(),
        runtime_distribution = tables.runtime_distribution.len(),
        "derived tables written"
    );
    Ok(())
}

/// The source format carries no quoting, so the writer must not introduce any.
fn write_tsv<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), EtlError> {
    let file = File::create(path).map_err(|e| EtlError::io(path, e))?;
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(csv::QuoteStyle::Never)
        .from_writer(file);
    write_rows(&mut writer, rows, path)
}

fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), EtlError> {
    let file = File::create(path).map_err(|e| EtlError::io(path, e))?;
    let mut writer = csv::WriterBuilder::new().from_writer(file);
    write_rows(&mut writer, rows, path)
}

fn write_rows<T: Serialize>(
    writer: &mut csv::Writer<File>,
    rows: &[T],
    path: &Path,
) -> Result<(), EtlError> {
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| EtlError::parse(path.display().to_string(), e))?;
    }
    writer.flush().map_err(|e| EtlError::io(path, e))
}

fn read_tsv<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, EtlError> {
    let bytes = fs::read(path).map_err(|e| EtlError::io(path, e))?;
    fetch::parse_table(&bytes, &path.display().to_string())
}
