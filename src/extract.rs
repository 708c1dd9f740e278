//! Concurrent download of all required source datasets.

use tracing::info;

use crate::config::SourceConfig;
use crate::error::EtlError;
use crate::fetch::{self, HttpClient};
use crate::model::{RatingRecord, RawTables, TitleRecord};

/// Downloads every required dataset over one shared client.
///
/// Both downloads run concurrently and are joined before returning; the
/// first failure aborts the whole step and the remaining in-flight download
/// is dropped rather than left dangling. No partial result is ever produced.
pub async fn extract_all<C: HttpClient>(
    client: &C,
    source: &SourceConfig,
) -> Result<RawTables, EtlError> {
    let movies_url = source.movies_url();
    let ratings_url = source.ratings_url();
    info!(%movies_url, %ratings_url, "starting dataset downloads");

    let (movies, ratings) = tokio::try_join!(
        fetch::fetch_table::<C, TitleRecord>(client, &movies_url),
        fetch::fetch_table::<C, RatingRecord>(client, &ratings_url),
    )?;

    info!(
        movies = movies.len(),
        ratings = ratings.len(),
        "all datasets downloaded"
    );
    Ok(RawTables { movies, ratings })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RATINGS_DATASET;
    use async_trait::async_trait;
    use flate2::{Compression, write::GzEncoder};
    use std::io::Write;

    const MOVIES_TSV: &str = "tconst\ttitleType\tprimaryTitle\tstartYear\truntimeMinutes\tgenres\n\
        tt0000001\tmovie\tSample\t2000\t90\tDrama\n";
    const RATINGS_TSV: &str = "tconst\taverageRating\tnumVotes\ntt0000001\t7.0\t100\n";

    fn gzip(data: &str) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data.as_bytes()).unwrap();
        encoder.finish().unwrap()
    }

    struct CannedClient {
        fail_ratings: bool,
    }

    #[async_trait]
    impl HttpClient for CannedClient {
        async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
            let path = req.url().path().to_string();
            let (status, body) = if path.ends_with(RATINGS_DATASET) {
                if self.fail_ratings {
                    (503, Vec::new())
                } else {
                    (200, gzip(RATINGS_TSV))
                }
            } else {
                (200, gzip(MOVIES_TSV))
            };

            let response = http::Response::builder().status(status).body(body).unwrap();
            Ok(response.into())
        }
    }

    fn source() -> SourceConfig {
        SourceConfig {
            base_url: "https://datasets.example.com/".to_string(),
        }
    }

    #[tokio::test]
    async fn downloads_and_parses_both_datasets() {
        let client = CannedClient {
            fail_ratings: false,
        };
        let raw = extract_all(&client, &source()).await.unwrap();
        assert_eq!(raw.movies.len(), 1);
        assert_eq!(raw.ratings.len(), 1);
        assert_eq!(raw.movies[0].tconst, raw.ratings[0].tconst);
    }

    #[tokio::test]
    async fn one_failing_download_aborts_the_whole_extraction() {
        let client = CannedClient { fail_ratings: true };
        let err = extract_all(&client, &source()).await.unwrap_err();
        assert!(matches!(err, EtlError::Network { .. }));
    }
}
