//! CSV reading and writing with encoding and delimiter auto-detection.
//!
//! Converts delimited text into a [`Table`]. No library-specific logic here.

use std::fs::File;
use std::path::Path;

use crate::error::{CsvError, CsvResult};
use crate::models::{Table, Value};

/// Delimiters tried by [`detect_delimiter`], in tie-break order.
const DELIMITERS: [char; 4] = [',', ';', '\t', '|'];

/// Result of parsing with metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Parsed rows
    pub table: Table,
    /// Detected encoding
    pub encoding: String,
    /// Detected delimiter
    pub delimiter: char,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "" | "ascii" | "utf-8" | "utf8" | "utf-8-sig" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding
pub fn decode_content(bytes: &[u8], encoding: &str) -> CsvResult<String> {
    let decoded = match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => match std::str::from_utf8(bytes) {
            Ok(s) => s.to_string(),
            Err(e) => return Err(CsvError::EncodingError(e.to_string())),
        },
        "iso-8859-1" | "latin-1" | "latin1" => {
            encoding_rs::ISO_8859_15.decode(bytes).0.into_owned()
        }
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        // Unknown charset: best effort
        _ => String::from_utf8_lossy(bytes).into_owned(),
    };
    // A BOM would otherwise end up glued to the first header.
    Ok(decoded.trim_start_matches('\u{feff}').to_string())
}

/// Detect the delimiter by counting occurrences in the first line
///
/// Falls back to `,` when no candidate appears.
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let mut best_sep = DELIMITERS[0];
    let mut best_count = 0;

    for &sep in &DELIMITERS {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Parse CSV text with an explicit delimiter.
///
/// The first row is the header. Blank cells become [`Value::Null`]; rows with
/// too few cells are padded with nulls. A row with more cells than the header
/// is a [`CsvError::ParseError`].
///
/// # Example
/// ```ignore
/// use libadmin::parser::parse_str;
///
/// let table = parse_str("fscs_id,name\nKY0069,Library 1", ',').unwrap();
/// assert_eq!(table.len(), 1);
/// assert_eq!(table.columns(), &["fscs_id", "name"]);
/// ```
pub fn parse_str(content: &str, delimiter: char) -> CsvResult<Table> {
    if content.trim().is_empty() {
        return Err(CsvError::EmptyFile);
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter_byte(delimiter)?)
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(CsvError::NoHeaders);
    }

    let width = headers.len();
    let mut table = Table::new(headers);
    for record in reader.records() {
        let record = record?;
        if record.len() > width {
            return Err(CsvError::ParseError {
                line: record.position().map(|p| p.line() as usize).unwrap_or(0),
                message: format!("expected {} fields, saw {}", width, record.len()),
            });
        }
        table.push_row(record.iter().map(Value::from_cell).collect());
    }

    Ok(table)
}

/// Parse CSV bytes with auto-detection of encoding and delimiter.
pub fn parse_bytes_auto(bytes: &[u8]) -> CsvResult<ParseResult> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding)?;
    let delimiter = detect_delimiter(&content);
    let table = parse_str(&content, delimiter)?;

    Ok(ParseResult {
        table,
        encoding,
        delimiter,
    })
}

/// Parse CSV file with auto-detection of encoding and delimiter.
///
/// # Example
/// ```ignore
/// let result = read_csv_file("libraries.csv")?;
/// println!("Encoding: {}, Delimiter: '{}'", result.encoding, result.delimiter);
/// println!("Rows: {}", result.table.len());
/// ```
pub fn read_csv_file<P: AsRef<Path>>(path: P) -> CsvResult<ParseResult> {
    let bytes = std::fs::read(path.as_ref())?;
    parse_bytes_auto(&bytes)
}

/// Write a table as comma-separated UTF-8 with a header row and no index column.
pub fn write_csv_file<P: AsRef<Path>>(path: P, table: &Table) -> CsvResult<()> {
    let file = File::create(path.as_ref())?;
    let mut writer = csv::Writer::from_writer(file);

    writer
        .write_record(table.columns())
        .map_err(|e| CsvError::WriteError(e.to_string()))?;
    for row in table.rows() {
        writer
            .write_record(row.iter().map(Value::as_cell))
            .map_err(|e| CsvError::WriteError(e.to_string()))?;
    }
    writer.flush()?;
    Ok(())
}

fn delimiter_byte(delimiter: char) -> CsvResult<u8> {
    u8::try_from(delimiter)
        .ok()
        .filter(u8::is_ascii)
        .ok_or_else(|| CsvError::ParseError {
            line: 0,
            message: format!("Unsupported delimiter '{}'", delimiter),
        })
}
