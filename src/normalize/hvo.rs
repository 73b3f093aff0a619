use crate::frame::columns::{
    datetime_series, drop_null_timestamps, has_column, keep_first, sort_by_timestamp,
    string_values, timestamp_first, timestamp_millis,
};
use crate::frame::TIMESTAMP_COLUMN;
use crate::normalize::error::NormalizeError;
use crate::normalize::{require_columns, Normalizer};
use crate::types::source::Source;
use log::info;
use polars::prelude::*;

/// Notice fields holding timestamps besides the pull time.
pub const NOTICE_TIME_FIELDS: [&str; 2] = ["alertDate", "colorDate"];

/// Hawaiian Volcano Observatory status notices.
///
/// Each notice is kept once. After sorting by pull time two flags record
/// whether the alert level or the aviation color code differs from the
/// previous notice.
#[derive(Debug, Clone)]
pub struct HvoNormalizer {
    pub identity_key: &'static [&'static str],
}

impl Default for HvoNormalizer {
    fn default() -> Self {
        Self {
            identity_key: &["noticeId"],
        }
    }
}

impl Normalizer for HvoNormalizer {
    fn source(&self) -> Source {
        Source::Hvo
    }

    fn identity_key(&self) -> &[&'static str] {
        self.identity_key
    }

    fn normalize(&self, raw: DataFrame) -> Result<DataFrame, NormalizeError> {
        require_columns(
            &raw,
            Source::Hvo,
            &[TIMESTAMP_COLUMN, "alertLevel", "colorCode"],
        )?;
        require_columns(&raw, Source::Hvo, self.identity_key)?;
        let mut df = raw;

        let pulled = timestamp_millis(&df, TIMESTAMP_COLUMN)?;
        df.with_column(datetime_series(TIMESTAMP_COLUMN, pulled))?;
        for field in NOTICE_TIME_FIELDS {
            if has_column(&df, field) {
                let parsed = timestamp_millis(&df, field)?;
                df.with_column(datetime_series(field, parsed))?;
            }
        }

        let df = drop_null_timestamps(&df, Source::Hvo.display_name())?;
        let df = keep_first(&df, self.identity_key)?;
        let mut df = timestamp_first(&sort_by_timestamp(&df)?)?;

        let alert_change = change_flags(&string_values(&df, "alertLevel")?);
        let color_change = change_flags(&string_values(&df, "colorCode")?);
        df.with_column(Series::new("alert_change".into(), alert_change))?;
        df.with_column(Series::new("color_change".into(), color_change))?;

        info!(
            "{} cleaned: {} notices, {} columns",
            Source::Hvo.display_name(),
            df.height(),
            df.width()
        );
        Ok(df)
    }
}

/// State carried from one notice to the next.
#[derive(Clone, Copy)]
enum Prior<'a> {
    /// No notice seen yet; the first notice always counts as a change.
    Nothing,
    Seen(Option<&'a str>),
}

/// Flags every position whose value differs from the one before it.
///
/// The first position is always a change. Missing values compare equal, so
/// a missing value after another missing value is not a change, while a
/// missing value after a present one (or the reverse) is.
fn change_flags(values: &[Option<String>]) -> Vec<bool> {
    let mut prior = Prior::Nothing;
    values
        .iter()
        .map(|current| {
            let current = current.as_deref();
            let changed = match prior {
                Prior::Nothing => true,
                Prior::Seen(previous) => previous != current,
            };
            prior = Prior::Seen(current);
            changed
        })
        .collect()
}
