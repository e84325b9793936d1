//! Resident registration population by single-year age (주민등록 인구 및
//! 세대현황 연령별 export).
//!
//! Columns are `행정구역`, then per reporting month `{period}_계_총인구수`,
//! `{period}_계_연령구간인구수`, `{period}_계_0세` … `{period}_계_100세 이상`,
//! followed by the same blocks for 남 and 여. Counts may be plain integers or
//! quoted with thousands separators.

use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use census::PopulationRow;
use polars::prelude::*;
use thiserror::Error;

use crate::getter::PopulationSource;

pub const DEFAULT_LABEL_COLUMN: &str = "행정구역";
pub const DEFAULT_PERIOD: &str = "2025년03월";

#[derive(Debug, Error)]
pub enum PopulationError {
    #[error("population table has no column {0:?}")]
    MissingColumn(String),
    #[error("column {column:?} has a non-numeric count {value:?}")]
    BadCount { column: String, value: String },
    #[error(transparent)]
    Polars(#[from] PolarsError),
}

enum ColumnKind {
    Total,
    Age(u32),
}

fn classify_column(name: &str, prefix: &str) -> Option<ColumnKind> {
    let rest = name.strip_prefix(prefix)?;
    if rest == "총인구수" {
        return Some(ColumnKind::Total);
    }
    let age = rest
        .strip_suffix("세 이상")
        .or_else(|| rest.strip_suffix('세'))?;
    age.trim().parse().ok().map(ColumnKind::Age)
}

fn parse_count(column: &str, cell: Option<&str>) -> Result<u64, PopulationError> {
    let Some(cell) = cell else {
        return Ok(0);
    };
    let digits: String = cell.chars().filter(|c| *c != ',').collect();
    let digits = digits.trim();
    if digits.is_empty() {
        return Ok(0);
    }
    digits.parse().map_err(|_| PopulationError::BadCount {
        column: column.to_string(),
        value: cell.to_string(),
    })
}

fn column_counts(series: &Series) -> Result<Vec<u64>, PopulationError> {
    match series.dtype() {
        DataType::Utf8 => series
            .utf8()?
            .into_iter()
            .map(|cell| parse_count(series.name(), cell))
            .collect(),
        _ => {
            let cast = series.cast(&DataType::Int64)?;
            let counts = cast
                .i64()?
                .into_iter()
                .map(|v| v.unwrap_or(0).max(0) as u64)
                .collect();
            Ok(counts)
        }
    }
}

fn required_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Series, PopulationError> {
    df.column(name)
        .map_err(|_| PopulationError::MissingColumn(name.to_string()))
}

/// Converts the frame into one [`PopulationRow`] per table row, reading the
/// `계` (both sexes) columns of `period`.
pub fn rows_from_frame(
    df: &DataFrame,
    period: &str,
    label_column: &str,
) -> Result<Vec<PopulationRow>, PopulationError> {
    let prefix = format!("{period}_계_");
    let labels: Vec<String> = required_column(df, label_column)?
        .cast(&DataType::Utf8)?
        .utf8()?
        .into_iter()
        .map(|label| label.unwrap_or_default().to_string())
        .collect();

    let mut total = None;
    let mut ages = Vec::new();
    for name in df.get_column_names() {
        match classify_column(name, &prefix) {
            Some(ColumnKind::Total) => total = Some(column_counts(df.column(name)?)?),
            Some(ColumnKind::Age(age)) => ages.push((age, column_counts(df.column(name)?)?)),
            None => {}
        }
    }
    let total = total.ok_or_else(|| PopulationError::MissingColumn(format!("{prefix}총인구수")))?;
    if ages.is_empty() {
        tracing::warn!(period, "population table has no single-year age columns");
    }

    let rows = labels
        .into_iter()
        .enumerate()
        .map(|(i, label)| {
            ages.iter().fold(PopulationRow::new(label, total[i]), |row, (age, counts)| {
                row.with_band(*age, counts[i])
            })
        })
        .collect();
    Ok(rows)
}

/// Population table read from a local CSV file.
#[derive(Clone, Debug)]
pub struct CsvPopulation {
    path: PathBuf,
    period: String,
    label_column: String,
}

impl CsvPopulation {
    pub fn new(path: impl Into<PathBuf>, period: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            period: period.into(),
            label_column: DEFAULT_LABEL_COLUMN.to_string(),
        }
    }

    pub fn label_column(mut self, label_column: impl Into<String>) -> Self {
        self.label_column = label_column.into();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Vec<PopulationRow>, PopulationError> {
        // Scan every row: a column only becomes numeric if no cell is quoted.
        let df = CsvReader::from_path(&self.path)?
            .has_header(true)
            .infer_schema(None)
            .finish()?;
        tracing::debug!(rows = df.height(), columns = df.width(), "read population table");
        rows_from_frame(&df, &self.period, &self.label_column)
    }
}

#[async_trait]
impl PopulationSource for CsvPopulation {
    async fn population(&self) -> anyhow::Result<Vec<PopulationRow>> {
        let source = self.clone();
        let rows = tokio::task::spawn_blocking(move || source.load())
            .await
            .context("population loader panicked")?
            .with_context(|| format!("reading population table {}", self.path.display()))?;
        tracing::info!(rows = rows.len(), period = %self.period, "loaded population table");
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use census::AgeRange;

    use super::*;

    const CSV: &str = "\
행정구역,2025년03월_계_총인구수,2025년03월_계_연령구간인구수,2025년03월_계_10세,2025년03월_계_11세,2025년03월_계_19세,2025년03월_계_100세 이상,2025년03월_남_10세
\"서울특별시  (1100000000)\",\"9,335,444\",\"9,335,444\",\"61,234\",\"60,001\",\"70,010\",\"1,009\",\"31,000\"
\"서울특별시 종로구 청운효자동(1111051500)\",\"11,000\",\"11,000\",120,130,\"1,050\",3,60
\"서울특별시 종로구 무인동(1111099900)\",0,0,,0,0,0,0
";

    fn csv_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CSV.as_bytes()).unwrap();
        file
    }

    #[test]
    fn classifies_columns() {
        let prefix = "2025년03월_계_";
        assert!(matches!(
            classify_column("2025년03월_계_총인구수", prefix),
            Some(ColumnKind::Total)
        ));
        assert!(matches!(
            classify_column("2025년03월_계_7세", prefix),
            Some(ColumnKind::Age(7))
        ));
        assert!(matches!(
            classify_column("2025년03월_계_100세 이상", prefix),
            Some(ColumnKind::Age(100))
        ));
        assert!(classify_column("2025년03월_계_연령구간인구수", prefix).is_none());
        assert!(classify_column("2025년03월_남_7세", prefix).is_none());
        assert!(classify_column("2025년02월_계_7세", prefix).is_none());
    }

    #[test]
    fn parses_separated_counts() {
        assert_eq!(parse_count("c", Some("9,335,444")).unwrap(), 9_335_444);
        assert_eq!(parse_count("c", Some(" 12 ")).unwrap(), 12);
        assert_eq!(parse_count("c", Some("")).unwrap(), 0);
        assert_eq!(parse_count("c", None).unwrap(), 0);
        assert!(matches!(
            parse_count("c", Some("n/a")),
            Err(PopulationError::BadCount { .. })
        ));
    }

    #[test]
    fn loads_csv_export() {
        let file = csv_file();
        let rows = CsvPopulation::new(file.path(), DEFAULT_PERIOD).load().unwrap();
        assert_eq!(rows.len(), 3);

        let row = &rows[1];
        assert_eq!(row.raw_label, "서울특별시 종로구 청운효자동(1111051500)");
        assert_eq!(row.total_population, 11_000);
        assert_eq!(row.age_band_counts.get(&10), Some(&120));
        assert_eq!(row.age_band_counts.get(&19), Some(&1_050));
        assert_eq!(row.age_band_counts.get(&100), Some(&3));
        assert_eq!(row.count_in(AgeRange::YOUTH), 1_300);

        assert_eq!(rows[2].total_population, 0);
        assert_eq!(rows[2].age_band_counts.get(&10), Some(&0));
    }

    #[test]
    fn other_period_is_missing() {
        let file = csv_file();
        let err = CsvPopulation::new(file.path(), "2024년12월").load().unwrap_err();
        assert!(matches!(err, PopulationError::MissingColumn(c) if c == "2024년12월_계_총인구수"));
    }

    #[test]
    fn integer_frame() {
        let df = df!(
            "동" => &["종로구 사직동", "종로구 삼청동"],
            "2025년03월_계_총인구수" => &[100i64, 50],
            "2025년03월_계_15세" => &[10i64, 5],
        )
        .unwrap();
        let rows = rows_from_frame(&df, DEFAULT_PERIOD, "동").unwrap();
        assert_eq!(rows[0].count_in(AgeRange::YOUTH), 10);
        assert_eq!(rows[1].total_population, 50);

        assert!(matches!(
            rows_from_frame(&df, DEFAULT_PERIOD, DEFAULT_LABEL_COLUMN),
            Err(PopulationError::MissingColumn(_))
        ));
    }

    #[tokio::test]
    async fn population_source() {
        let file = csv_file();
        let source = CsvPopulation::new(file.path(), DEFAULT_PERIOD);
        let rows = source.population().await.unwrap();
        assert_eq!(rows.len(), 3);
    }
}
