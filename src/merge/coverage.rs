use polars::prelude::DataFrame;
use serde::Serialize;

/// Share of non-missing values in one column of the merged table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnCoverage {
    pub column: String,
    pub non_null: usize,
    pub fraction: f64,
}

/// Non-null coverage of every column, best covered first.
///
/// Columns with equal coverage keep their table order. An empty table
/// reports a fraction of zero for every column.
pub fn coverage(df: &DataFrame) -> Vec<ColumnCoverage> {
    let rows = df.height();
    let mut report: Vec<ColumnCoverage> = df
        .get_columns()
        .iter()
        .map(|column| {
            let non_null = column.len() - column.null_count();
            let fraction = match rows {
                0 => 0.0,
                _ => non_null as f64 / rows as f64,
            };
            ColumnCoverage {
                column: column.name().to_string(),
                non_null,
                fraction,
            }
        })
        .collect();
    report.sort_by(|a, b| b.fraction.total_cmp(&a.fraction));
    report
}
