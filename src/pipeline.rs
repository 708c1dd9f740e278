//! End-to-end pipeline driver.
//!
//! Sequences extract, transform, and load, logging stage boundaries and row
//! counts. Any failure in any stage absorbs the run into [`Stage::Failed`];
//! the error is logged exactly once here and not raised further.

use std::fmt;

use tracing::{error, info};

use crate::config::{Config, SinkConfig};
use crate::error::EtlError;
use crate::extract;
use crate::fetch::HttpClient;
use crate::load;
use crate::transform;
use crate::warehouse::Warehouse;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extracting,
    Transforming,
    Loading,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Extracting => "extracting",
            Stage::Transforming => "transforming",
            Stage::Loading => "loading",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

pub struct Pipeline<'a, C: HttpClient> {
    http: &'a C,
    warehouse: &'a dyn Warehouse,
    config: &'a Config,
    sink: &'a SinkConfig,
}

impl<'a, C: HttpClient> Pipeline<'a, C> {
    pub fn new(
        http: &'a C,
        warehouse: &'a dyn Warehouse,
        config: &'a Config,
        sink: &'a SinkConfig,
    ) -> Self {
        Self {
            http,
            warehouse,
            config,
            sink,
        }
    }

    /// Runs the pipeline to completion, returning the terminal stage.
    pub async fn run(&self) -> Stage {
        info!("pipeline started");

        info!(stage = %Stage::Extracting, "stage started");
        let raw = match extract::extract_all(self.http, &self.config.source).await {
            Ok(raw) => raw,
            Err(err) => return fail(Stage::Extracting, &err),
        };
        info!(
            stage = %Stage::Extracting,
            movies = raw.movies.len(),
            ratings = raw.ratings.len(),
            "stage finished"
        );

        info!(stage = %Stage::Transforming, "stage started");
        let derived = transform::transform(&raw, &self.config.runtime_buckets, self.config.max_year);
        info!(
            stage = %Stage::Transforming,
            movies_detailed = derived.movies_detailed.len(),
            yearly_aggregates = derived.yearly_aggregates.len(),
            year_genre_aggregates = derived.year_genre_aggregates.len(),
            runtime_distribution = derived.runtime_distribution.len(),
            "stage finished"
        );

        info!(stage = %Stage::Loading, "stage started");
        if let Err(err) = load::load_tables(self.warehouse, self.sink, &derived).await {
            return fail(Stage::Loading, &err);
        }
        info!(stage = %Stage::Loading, "stage finished");

        info!("pipeline completed");
        Stage::Done
    }
}

fn fail(stage: Stage, err: &EtlError) -> Stage {
    error!(stage = %stage, error = %err, "pipeline failed");
    Stage::Failed
}
