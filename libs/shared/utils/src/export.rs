use axum::{
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
};
use chrono::Utc;

use shared_models::error::AppError;

/// Renders rows as a CSV attachment named `<prefix>_<YYYYMMDD>.csv`.
pub fn csv_attachment(
    filename_prefix: &str,
    columns: &[&str],
    rows: Vec<Vec<String>>,
) -> Result<Response, AppError> {
    let body = render_csv(columns, rows)?;
    let filename = format!("{}_{}.csv", filename_prefix, Utc::now().format("%Y%m%d"));

    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename))
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("text/csv; charset=utf-8")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

pub fn render_csv(columns: &[&str], rows: Vec<Vec<String>>) -> Result<Vec<u8>, AppError> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer
        .write_record(columns)
        .map_err(|e| AppError::Internal(format!("CSV export failed: {}", e)))?;

    for row in rows {
        writer
            .write_record(&row)
            .map_err(|e| AppError::Internal(format!("CSV export failed: {}", e)))?;
    }

    writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("CSV export failed: {}", e)))
}
