//! Folding freshly fetched rows into a persisted raw archive.

use crate::archive::error::ArchiveError;
use crate::frame::columns::{has_column, keep_first, string_values, stringify};
use crate::types::source::Source;
use log::info;
use polars::prelude::*;
use serde::Serialize;

/// Column flagging HVO rows whose notice differs from the previous row.
pub const NEW_NOTICE_COLUMN: &str = "new_notice";

const ROW_INDEX: &str = "__archive_row";

/// Counts describing one append.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AppendSummary {
    pub source: Source,
    pub existing_rows: usize,
    pub batch_rows: usize,
    pub added_rows: usize,
    pub total_rows: usize,
}

/// The new archive contents together with what changed.
#[derive(Debug, Clone)]
pub struct AppendOutcome {
    pub frame: DataFrame,
    pub summary: AppendSummary,
}

/// Appends `batch` to `existing`, keeping only rows with an unseen archive key.
///
/// Rows are compared on [`Source::archive_key`] after both frames are read as
/// text, datetime columns as ISO-8601 UTC like the persisted archive. Existing rows come first and win over batch rows with the same key,
/// so previously persisted rows are never replaced and their order never
/// changes. Columns only one side has are filled with nulls on the other.
/// Appending the same batch twice leaves the archive unchanged.
///
/// For [`Source::Hvo`] every added row gets a `new_notice` flag, true when
/// its `noticeId` differs from the row before it in the archive.
///
/// # Errors
///
/// Returns [`ArchiveError::MissingKeyColumn`] if a non-empty side lacks one
/// of the key columns.
pub fn append_deduplicated(
    existing: Option<&DataFrame>,
    batch: &DataFrame,
    source: Source,
) -> Result<AppendOutcome, ArchiveError> {
    let key = source.archive_key();
    let existing = match existing {
        Some(df) if df.height() > 0 => {
            check_key(df, source, key, "archive")?;
            stringify(df)?
        }
        _ => DataFrame::empty(),
    };
    let existing_rows = existing.height();
    if batch.height() == 0 {
        return Ok(AppendOutcome {
            summary: AppendSummary {
                source,
                existing_rows,
                batch_rows: 0,
                added_rows: 0,
                total_rows: existing_rows,
            },
            frame: existing,
        });
    }
    check_key(batch, source, key, "batch")?;
    let batch = stringify(batch)?;

    let combined = if existing_rows == 0 {
        batch.clone()
    } else {
        let (existing, batch) = align_columns(&existing, &batch)?;
        concat([existing.lazy(), batch.lazy()], UnionArgs::default())?.collect()?
    };

    let indexed = keep_first(&combined.with_row_index(ROW_INDEX.into(), None)?, key)?;
    let kept_existing = indexed
        .column(ROW_INDEX)?
        .idx()?
        .into_iter()
        .flatten()
        .filter(|row| (*row as usize) < existing_rows)
        .count();
    let mut frame = indexed.drop(ROW_INDEX)?;
    let added_rows = frame.height() - kept_existing;

    if source == Source::Hvo && added_rows > 0 {
        flag_new_notices(&mut frame, kept_existing)?;
    }

    info!(
        "{} archive: {} existing rows, {} fetched, {} new, {} total",
        source.display_name(),
        existing_rows,
        batch.height(),
        added_rows,
        frame.height()
    );
    Ok(AppendOutcome {
        summary: AppendSummary {
            source,
            existing_rows,
            batch_rows: batch.height(),
            added_rows,
            total_rows: frame.height(),
        },
        frame,
    })
}

fn check_key(
    df: &DataFrame,
    source: Source,
    key: &[&str],
    side: &'static str,
) -> Result<(), ArchiveError> {
    match key.iter().find(|column| !has_column(df, column)) {
        Some(column) => Err(ArchiveError::MissingKeyColumn {
            provider: source,
            column: column.to_string(),
            side,
        }),
        None => Ok(()),
    }
}

/// Gives both frames the union of their columns, archive columns first.
fn align_columns(
    existing: &DataFrame,
    batch: &DataFrame,
) -> PolarsResult<(DataFrame, DataFrame)> {
    let mut order: Vec<PlSmallStr> = existing.get_column_names().into_iter().cloned().collect();
    for name in batch.get_column_names() {
        if !order.contains(name) {
            order.push(name.clone());
        }
    }
    let fill = |df: &DataFrame| -> PolarsResult<DataFrame> {
        let mut df = df.clone();
        for name in &order {
            if !has_column(&df, name.as_str()) {
                df.with_column(Series::full_null(name.clone(), df.height(), &DataType::String))?;
            }
        }
        df.select(order.iter().cloned())
    };
    Ok((fill(existing)?, fill(batch)?))
}

/// Sets `new_notice` on the rows after the first `kept_existing` ones.
fn flag_new_notices(frame: &mut DataFrame, kept_existing: usize) -> PolarsResult<()> {
    let ids = string_values(frame, "noticeId")?;
    let mut flags: Vec<Option<String>> = if has_column(frame, NEW_NOTICE_COLUMN) {
        string_values(frame, NEW_NOTICE_COLUMN)?
    } else {
        vec![None; frame.height()]
    };
    for row in kept_existing..frame.height() {
        let is_new = row == 0 || ids[row] != ids[row - 1];
        flags[row] = Some(is_new.to_string());
    }
    frame.with_column(Series::new(NEW_NOTICE_COLUMN.into(), flags))?;
    Ok(())
}
