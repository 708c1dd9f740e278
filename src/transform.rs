//! Pure derivations from the raw tables.
//!
//! No I/O happens here; every output is fully determined by the inputs and
//! the passed parameters. Accumulators are `BTreeMap`s so the derived tables
//! come out in a stable order.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::model::{
    DerivedTables, MovieDetail, RatingRecord, RawTables, RuntimeBucketCount, TitleRecord,
    YearGenreAggregate, YearlyAggregate,
};

/// Computes all four derived tables from one set of raw tables.
pub fn transform(raw: &RawTables, runtime_buckets: &[u32], max_year: i32) -> DerivedTables {
    let movies_detailed = movies_detailed(&raw.movies, &raw.ratings);
    let yearly_aggregates = yearly_aggregates(&movies_detailed, max_year);
    let year_genre_aggregates = year_genre_aggregates(&movies_detailed, max_year);
    let runtime_distribution = runtime_distribution(&movies_detailed, runtime_buckets);

    debug!(
        movies_detailed = movies_detailed.len(),
        yearly_aggregates = yearly_aggregates.len(),
        year_genre_aggregates = year_genre_aggregates.len(),
        runtime_distribution = runtime_distribution.len(),
        "derived tables computed"
    );

    DerivedTables {
        movies_detailed,
        yearly_aggregates,
        year_genre_aggregates,
        runtime_distribution,
    }
}

/// Left join of titles and ratings on `tconst`. Never drops a title.
pub fn movies_detailed(movies: &[TitleRecord], ratings: &[RatingRecord]) -> Vec<MovieDetail> {
    let by_id: HashMap<&str, &RatingRecord> =
        ratings.iter().map(|r| (r.tconst.as_str(), r)).collect();

    movies
        .iter()
        .map(|title| {
            let rating = by_id.get(title.tconst.as_str());
            MovieDetail {
                tconst: title.tconst.clone(),
                title_type: title.title_type.clone(),
                primary_title: title.primary_title.clone(),
                start_year: title.start_year,
                runtime_minutes: title.runtime_minutes,
                genres: title.genres.clone(),
                average_rating: rating.map(|r| r.average_rating),
                num_votes: rating.map(|r| r.num_votes),
            }
        })
        .collect()
}

#[derive(Default)]
struct RatingAccumulator {
    titles: u64,
    rated: u64,
    rating_sum: f64,
}

impl RatingAccumulator {
    fn add(&mut self, rating: Option<f64>) {
        self.titles += 1;
        if let Some(r) = rating {
            self.rated += 1;
            self.rating_sum += r;
        }
    }

    /// Mean over the rated titles only; absent when none are rated.
    fn mean(&self) -> Option<f64> {
        (self.rated > 0).then(|| self.rating_sum / self.rated as f64)
    }
}

/// Title count and mean rating per release year. Titles without a year, or
/// dated after `max_year`, contribute nothing.
pub fn yearly_aggregates(detailed: &[MovieDetail], max_year: i32) -> Vec<YearlyAggregate> {
    let mut groups: BTreeMap<i32, RatingAccumulator> = BTreeMap::new();
    for movie in detailed {
        let Some(year) = movie.start_year else {
            continue;
        };
        if year > max_year {
            continue;
        }
        groups.entry(year).or_default().add(movie.average_rating);
    }

    groups
        .into_iter()
        .map(|(year, acc)| YearlyAggregate {
            start_year: year,
            title_count: acc.titles,
            mean_rating: acc.mean(),
        })
        .collect()
}

/// Title count and mean rating per (year, genre). A title contributes one
/// row per genre it carries.
pub fn year_genre_aggregates(detailed: &[MovieDetail], max_year: i32) -> Vec<YearGenreAggregate> {
    let mut groups: BTreeMap<(i32, String), RatingAccumulator> = BTreeMap::new();
    for movie in detailed {
        let Some(year) = movie.start_year else {
            continue;
        };
        if year > max_year {
            continue;
        }
        for genre in movie.genre_list() {
            groups
                .entry((year, genre.to_string()))
                .or_default()
                .add(movie.average_rating);
        }
    }

    groups
        .into_iter()
        .map(|((year, genre), acc)| YearGenreAggregate {
            start_year: year,
            genre,
            title_count: acc.titles,
            mean_rating: acc.mean(),
        })
        .collect()
}

/// Histogram of titles over runtime buckets. `bounds` are the upper bucket
/// boundaries; everything at or above the last boundary lands in a trailing
/// open-ended bucket. Titles with unknown runtime are not counted.
pub fn runtime_distribution(detailed: &[MovieDetail], bounds: &[u32]) -> Vec<RuntimeBucketCount> {
    let mut counts = vec![0u64; bounds.len() + 1];
    for movie in detailed {
        let Some(runtime) = movie.runtime_minutes else {
            continue;
        };
        let idx = bounds
            .iter()
            .position(|b| runtime < *b)
            .unwrap_or(bounds.len());
        counts[idx] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(idx, title_count)| RuntimeBucketCount {
            bucket: bucket_label(bounds, idx),
            title_count,
        })
        .collect()
}

fn bucket_label(bounds: &[u32], idx: usize) -> String {
    let lower = if idx == 0 { 0 } else { bounds[idx - 1] };
    match bounds.get(idx) {
        Some(upper) => format!("{lower}-{}", upper - 1),
        None => format!("{lower}+"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX_YEAR: i32 = 2030;

    fn title(
        tconst: &str,
        year: Option<i32>,
        runtime: Option<u32>,
        genres: Option<&str>,
    ) -> TitleRecord {
        TitleRecord {
            tconst: tconst.to_string(),
            title_type: Some("movie".to_string()),
            primary_title: Some(format!("Title {tconst}")),
            start_year: year,
            runtime_minutes: runtime,
            genres: genres.map(str::to_string),
        }
    }

    fn rating(tconst: &str, average_rating: f64, num_votes: u64) -> RatingRecord {
        RatingRecord {
            tconst: tconst.to_string(),
            average_rating,
            num_votes,
        }
    }

    fn sample_raw() -> RawTables {
        RawTables {
            movies: vec![
                title("tt1", Some(2000), Some(90), Some("Action,Drama")),
                title("tt2", Some(2000), Some(150), Some("Drama")),
            ],
            ratings: vec![rating("tt1", 7.0, 120)],
        }
    }

    #[test]
    fn detailed_join_never_drops_titles() {
        let raw = sample_raw();
        let detailed = movies_detailed(&raw.movies, &raw.ratings);
        assert_eq!(detailed.len(), raw.movies.len());
        assert_eq!(detailed[0].average_rating, Some(7.0));
        assert_eq!(detailed[0].num_votes, Some(120));
        assert_eq!(detailed[1].average_rating, None);
        assert_eq!(detailed[1].num_votes, None);
    }

    #[test]
    fn yearly_counts_all_titles_but_averages_only_rated_ones() {
        let raw = sample_raw();
        let detailed = movies_detailed(&raw.movies, &raw.ratings);
        let yearly = yearly_aggregates(&detailed, MAX_YEAR);

        assert_eq!(
            yearly,
            vec![YearlyAggregate {
                start_year: 2000,
                title_count: 2,
                mean_rating: Some(7.0),
            }]
        );
    }

    #[test]
    fn yearly_mean_is_absent_for_a_fully_unrated_year() {
        let detailed = movies_detailed(&[title("tt9", Some(1950), None, None)], &[]);
        let yearly = yearly_aggregates(&detailed, MAX_YEAR);
        assert_eq!(yearly.len(), 1);
        assert_eq!(yearly[0].title_count, 1);
        assert_eq!(yearly[0].mean_rating, None);
    }

    #[test]
    fn year_genre_explodes_multi_valued_genres() {
        let raw = sample_raw();
        let detailed = movies_detailed(&raw.movies, &raw.ratings);
        let by_genre = year_genre_aggregates(&detailed, MAX_YEAR);

        assert_eq!(
            by_genre,
            vec![
                YearGenreAggregate {
                    start_year: 2000,
                    genre: "Action".to_string(),
                    title_count: 1,
                    mean_rating: Some(7.0),
                },
                YearGenreAggregate {
                    start_year: 2000,
                    genre: "Drama".to_string(),
                    title_count: 2,
                    mean_rating: Some(7.0),
                },
            ]
        );

        let fanned_out: u64 = by_genre.iter().map(|g| g.title_count).sum();
        assert!(fanned_out >= raw.movies.len() as u64);
    }

    #[test]
    fn titles_without_year_or_genres_stay_out_of_aggregates() {
        let detailed = movies_detailed(
            &[
                title("tt1", None, Some(90), Some("Drama")),
                title("tt2", Some(2000), Some(90), None),
            ],
            &[],
        );
        assert_eq!(year_genre_aggregates(&detailed, MAX_YEAR), vec![]);
        assert_eq!(yearly_aggregates(&detailed, MAX_YEAR).len(), 1);
    }

    #[test]
    fn future_dated_titles_are_excluded_from_year_aggregates() {
        let detailed = movies_detailed(
            &[
                title("tt1", Some(2000), None, Some("Drama")),
                title("tt2", Some(2099), None, Some("Drama")),
            ],
            &[],
        );
        let yearly = yearly_aggregates(&detailed, MAX_YEAR);
        assert_eq!(yearly.len(), 1);
        assert_eq!(yearly[0].start_year, 2000);
        assert_eq!(year_genre_aggregates(&detailed, MAX_YEAR).len(), 1);
    }

    #[test]
    fn runtime_buckets_are_half_open_with_a_trailing_open_bucket() {
        let detailed = movies_detailed(
            &[
                title("tt1", Some(2000), Some(29), None),
                title("tt2", Some(2000), Some(30), None),
                title("tt3", Some(2000), Some(59), None),
                title("tt4", Some(2000), Some(200), None),
                title("tt5", Some(2000), None, None),
            ],
            &[],
        );
        let histogram = runtime_distribution(&detailed, &[30, 60]);

        assert_eq!(
            histogram,
            vec![
                RuntimeBucketCount {
                    bucket: "0-29".to_string(),
                    title_count: 1,
                },
                RuntimeBucketCount {
                    bucket: "30-59".to_string(),
                    title_count: 2,
                },
                RuntimeBucketCount {
                    bucket: "60+".to_string(),
                    title_count: 1,
                },
            ]
        );
    }

    #[test]
    fn transform_is_deterministic() {
        let raw = sample_raw();
        let first = transform(&raw, &[30, 60, 90, 120, 150, 180], MAX_YEAR);
        let second = transform(&raw, &[30, 60, 90, 120, 150, 180], MAX_YEAR);
        assert_eq!(first.movies_detailed, second.movies_detailed);
        assert_eq!(first.yearly_aggregates, second.yearly_aggregates);
        assert_eq!(first.year_genre_aggregates, second.year_genre_aggregates);
        assert_eq!(first.runtime_distribution, second.runtime_distribution);
    }
}
