use calamine::{Data, Reader, open_workbook_auto};
use camino::Utf8Path;

use crate::domain::Cnpj;
use crate::error::EnrichError;

/// Reads the identifier column from a csv file or a spreadsheet workbook and
/// normalizes every value. The first row is the header.
pub fn load_identifiers(
    path: &Utf8Path,
    column: &str,
    sheet: Option<&str>,
) -> Result<Vec<Cnpj>, EnrichError> {
    let values = match path.extension().map(|ext| ext.to_ascii_lowercase()) {
        Some(ext) if ext == "csv" => read_csv_column(path, column)?,
        _ => read_workbook_column(path, column, sheet)?,
    };
    Ok(values.iter().map(|raw| Cnpj::normalized(raw)).collect())
}

fn read_csv_column(path: &Utf8Path, column: &str) -> Result<Vec<String>, EnrichError> {
    let input_error = |message: String| EnrichError::InputRead {
        path: path.to_path_buf(),
        message,
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path.as_std_path())
        .map_err(|err| input_error(err.to_string()))?;
    let headers = reader
        .headers()
        .map_err(|err| input_error(err.to_string()))?
        .clone();
    let index = find_column(headers.iter(), column).ok_or_else(|| EnrichError::MissingColumn {
        path: path.to_path_buf(),
        column: column.to_string(),
    })?;

    let mut values = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|err| input_error(err.to_string()))?;
        values.push(record.get(index).unwrap_or_default().to_string());
    }
    Ok(values)
}

fn read_workbook_column(
    path: &Utf8Path,
    column: &str,
    sheet: Option<&str>,
) -> Result<Vec<String>, EnrichError> {
    let input_error = |message: String| EnrichError::InputRead {
        path: path.to_path_buf(),
        message,
    };

    let mut workbook =
        open_workbook_auto(path.as_std_path()).map_err(|err| input_error(err.to_string()))?;
    let sheet_name = match sheet {
        Some(name) => name.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| input_error("workbook has no sheets".to_string()))?,
    };
    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|err| input_error(format!("sheet {sheet_name:?}: {err}")))?;

    let mut rows = range.rows();
    let header = rows
        .next()
        .ok_or_else(|| input_error(format!("sheet {sheet_name:?} is empty")))?;
    let header_text = header.iter().map(cell_to_string).collect::<Vec<_>>();
    let index = find_column(header_text.iter().map(String::as_str), column).ok_or_else(|| {
        EnrichError::MissingColumn {
            path: path.to_path_buf(),
            column: column.to_string(),
        }
    })?;

    Ok(rows
        .map(|row| row.get(index).map(cell_to_string).unwrap_or_default())
        .collect())
}

fn find_column<'a>(headers: impl Iterator<Item = &'a str>, column: &str) -> Option<usize> {
    let wanted = column.trim();
    headers
        .map(str::trim)
        .position(|header| header.eq_ignore_ascii_case(wanted))
}

/// Text form of a cell. Numeric identifiers stored as floats lose their
/// trailing `.0` so the digits survive normalization unchanged.
pub fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(value) => value.clone(),
        Data::Int(value) => value.to_string(),
        Data::Float(value) if value.fract() == 0.0 && value.abs() < 1e17 => {
            format!("{value:.0}")
        }
        other => other.to_string(),
    }
}
