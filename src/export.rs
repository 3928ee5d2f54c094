use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to serialize row: {0}")]
    Serialize(#[from] csv::Error),
    #[error("failed to flush csv output: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv output was not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// Serialize rows to CSV text. The header row is the first row's field order,
/// every cell is double-quoted (embedded quotes doubled), rows end with a
/// Unix newline. An empty slice is a no-op yielding an empty string.
pub fn to_csv<T: Serialize>(rows: &[T]) -> Result<String, ExportError> {
    if rows.is_empty() {
        return Ok(String::new());
    }

    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    for row in rows {
        writer.serialize(row)?;
    }
    let bytes = writer.into_inner().map_err(|err| err.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

pub fn dated_filename(prefix: &str, date: NaiveDate) -> String {
    format!("{prefix}_{date}.csv")
}

pub fn comments_filename(date: NaiveDate) -> String {
    dated_filename("advisor_comments", date)
}
