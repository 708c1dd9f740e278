//! HTTP download and tabular decoding of the source datasets.
//!
//! The source files are tab-separated, unquoted, gzip-compressed, and use
//! `\N` for absent values.

use std::io::Read;

use async_trait::async_trait;
use flate2::read::GzDecoder;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::EtlError;

#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response>;
}

/// Plain reqwest-backed client; one instance shares its connection pool
/// across all requests issued through it.
pub struct BasicClient(reqwest::Client);

impl BasicClient {
    pub fn new() -> Self {
        Self(reqwest::Client::new())
    }
}

impl Default for BasicClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for BasicClient {
    async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        self.0.execute(req).await
    }
}

/// Downloads `url` and parses the body as a TSV table.
///
/// # Errors
///
/// `Network` for transport failures and non-2xx statuses, `Parse` if the
/// body is not a well-formed table.
pub async fn fetch_table<C, T>(client: &C, url: &str) -> Result<Vec<T>, EtlError>
where
    C: HttpClient,
    T: DeserializeOwned,
{
    let parsed_url: reqwest::Url = url.parse().map_err(|e| EtlError::network(url, e))?;
    let req = reqwest::Request::new(reqwest::Method::GET, parsed_url);

    let resp = client
        .execute(req)
        .await
        .map_err(|e| EtlError::network(url, e))?
        .error_for_status()
        .map_err(|e| EtlError::network(url, e))?;

    let body = resp.bytes().await.map_err(|e| EtlError::network(url, e))?;
    debug!(url, bytes = body.len(), "dataset downloaded");

    parse_table(&body, url)
}

/// Parses a table from raw bytes, transparently decompressing gzip payloads.
pub fn parse_table<T: DeserializeOwned>(bytes: &[u8], input: &str) -> Result<Vec<T>, EtlError> {
    if is_gzip(bytes) {
        read_table(GzDecoder::new(bytes), input)
    } else {
        read_table(bytes, input)
    }
}

fn read_table<R: Read, T: DeserializeOwned>(reader: R, input: &str) -> Result<Vec<T>, EtlError> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .quoting(false)
        .from_reader(reader);

    let mut rows = Vec::new();
    for record in rdr.deserialize() {
        rows.push(record.map_err(|e| EtlError::parse(input, e))?);
    }
    Ok(rows)
}

fn is_gzip(bytes: &[u8]) -> bool {
    bytes.starts_with(&[0x1f, 0x8b])
}
