//! Readers for the external catalog files: a JSON record list and a delimited table.

use std::fs;
use std::io::Read;
use std::path::Path;

use serde_json::Value;

use super::{load, Catalog, RawCarRecord};
use crate::config::{CatalogConfig, CatalogFormat};
use crate::errors::ApplicationError;

const COMPANY_HEADERS: &[&str] = &["company", "brand", "شرکت"];
const NAME_HEADERS: &[&str] = &["car_name", "model_name", "name", "نام ماشین"];
const PRICE_HEADERS: &[&str] = &["price", "current_price", "قیمت"];
const SPECS_HEADERS: &[&str] = &["technical_specs", "specs", "مشخصات فنی"];
const ADVANTAGES_HEADERS: &[&str] = &["advantages", "pros", "مزایا"];
const DISADVANTAGES_HEADERS: &[&str] = &["disadvantages", "cons", "معایب"];

pub fn load_configured(config: &CatalogConfig) -> Result<Catalog, ApplicationError> {
    load_path(&config.path, config.format, config.csv_delimiter)
}

pub fn load_path(
    path: &Path,
    format: CatalogFormat,
    delimiter: char,
) -> Result<Catalog, ApplicationError> {
    let raw = fs::read_to_string(path).map_err(|error| {
        ApplicationError::CatalogSource(format!("could not read `{}`: {error}", path.display()))
    })?;

    let records = match format {
        CatalogFormat::Json => parse_json(&raw)?,
        CatalogFormat::Csv => parse_delimited(raw.as_bytes(), delimiter)?,
    };

    tracing::info!(
        event_name = "catalog.source.read",
        path = %path.display(),
        format = ?format,
        records = records.len(),
        "catalog source parsed"
    );

    Ok(load(records))
}

/// Accepts either a top-level array of records or an object wrapping the array under
/// `cars`. Elements that are not record objects are skipped.
pub fn parse_json(raw: &str) -> Result<Vec<RawCarRecord>, ApplicationError> {
    let document: Value = serde_json::from_str(raw).map_err(|error| {
        ApplicationError::CatalogSource(format!("invalid catalog JSON: {error}"))
    })?;

    let items = match document {
        Value::Array(items) => items,
        Value::Object(mut object) => match object.remove("cars") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(ApplicationError::CatalogSource(
                    "catalog JSON object must contain a `cars` array".to_string(),
                ))
            }
        },
        _ => {
            return Err(ApplicationError::CatalogSource(
                "catalog JSON must be an array of records".to_string(),
            ))
        }
    };

    let mut records = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<RawCarRecord>(item) {
            Ok(record) => records.push(record),
            Err(error) => tracing::warn!(
                event_name = "catalog.source.record_skipped",
                index,
                reason = %error,
                "skipping malformed JSON record"
            ),
        }
    }

    Ok(records)
}

pub fn parse_delimited<R: Read>(
    reader: R,
    delimiter: char,
) -> Result<Vec<RawCarRecord>, ApplicationError> {
    let delimiter = u8::try_from(delimiter).map_err(|_| {
        ApplicationError::CatalogSource(format!("delimiter `{delimiter}` is not a single byte"))
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|error| {
            ApplicationError::CatalogSource(format!("could not read catalog header row: {error}"))
        })?
        .clone();

    let column = |candidates: &[&str]| {
        headers.iter().position(|header| {
            let header = header.trim_start_matches('\u{FEFF}').trim().to_lowercase();
            candidates.iter().any(|candidate| header == *candidate)
        })
    };

    let name_column = column(NAME_HEADERS).ok_or_else(|| {
        ApplicationError::CatalogSource("catalog table has no car name column".to_string())
    })?;
    let company_column = column(COMPANY_HEADERS);
    let price_column = column(PRICE_HEADERS);
    let specs_column = column(SPECS_HEADERS);
    let advantages_column = column(ADVANTAGES_HEADERS);
    let disadvantages_column = column(DISADVANTAGES_HEADERS);

    let mut records = Vec::new();
    for (index, row) in reader.records().enumerate() {
        let row = match row {
            Ok(row) => row,
            Err(error) => {
                tracing::warn!(
                    event_name = "catalog.source.record_skipped",
                    index,
                    reason = %error,
                    "skipping malformed table row"
                );
                continue;
            }
        };

        let cell = |position: Option<usize>| {
            position.and_then(|position| row.get(position)).map(str::to_string)
        };

        records.push(RawCarRecord {
            brand: cell(company_column),
            model_name: cell(Some(name_column)),
            full_car_name: None,
            price: cell(price_column).map(Value::String),
            technical_specs: cell(specs_column),
            advantages: cell(advantages_column),
            disadvantages: cell(disadvantages_column),
        });
    }

    Ok(records)
}

pub fn parse_price_value(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number.as_u64().or_else(|| {
            number
                .as_f64()
                .filter(|price| price.is_finite() && *price >= 0.0)
                .map(|price| price as u64)
        }),
        Value::String(text) => parse_price_text(text),
        _ => None,
    }
}

/// Parses a price written as digits, optionally with Persian or Arabic-Indic digits,
/// thousands separators and a trailing currency word such as `تومان`.
pub fn parse_price_text(text: &str) -> Option<u64> {
    let cleaned: String = text
        .chars()
        .filter(|ch| !matches!(ch, ',' | '٬' | '،' | '_') && !ch.is_whitespace())
        .map(ascii_digit)
        .collect();

    let digits_end = cleaned.find(|ch: char| !ch.is_ascii_digit()).unwrap_or(cleaned.len());
    let (digits, rest) = cleaned.split_at(digits_end);
    if digits.is_empty() || !rest.chars().all(char::is_alphabetic) {
        return None;
    }

    digits.parse().ok()
}

fn ascii_digit(ch: char) -> char {
    match ch {
        '\u{06F0}'..='\u{06F9}' => char::from(b'0' + (ch as u32 - 0x06F0) as u8),
        '\u{0660}'..='\u{0669}' => char::from(b'0' + (ch as u32 - 0x0660) as u8),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use serde_json::json;
    use tempfile::TempDir;

    use super::{load_path, parse_delimited, parse_json, parse_price_text, parse_price_value};
    use crate::config::CatalogFormat;
    use crate::errors::ApplicationError;

    #[test]
    fn price_text_accepts_separators_and_localized_digits() {
        assert_eq!(parse_price_text("1,250,000,000"), Some(1_250_000_000));
        assert_eq!(parse_price_text("۸۵۰٬۰۰۰٬۰۰۰ تومان"), Some(850_000_000));
        assert_eq!(parse_price_text(" 42 "), Some(42));
        assert_eq!(parse_price_text(""), None);
        assert_eq!(parse_price_text("12.5"), None);
        assert_eq!(parse_price_text("تماس بگیرید"), None);
    }

    #[test]
    fn price_value_handles_numbers_strings_and_null() {
        assert_eq!(parse_price_value(&json!(480_000_000u64)), Some(480_000_000));
        assert_eq!(parse_price_value(&json!("530000000")), Some(530_000_000));
        assert_eq!(parse_price_value(&json!(null)), None);
        assert_eq!(parse_price_value(&json!(-1)), None);
        assert_eq!(parse_price_value(&json!(true)), None);
    }

    #[test]
    fn json_list_and_wrapped_object_are_both_accepted() {
        let listed = parse_json(r#"[{"car_name": "Tiba 2", "current_price": "520000000"}]"#)
            .expect("array should parse");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].model_name.as_deref(), Some("Tiba 2"));

        let wrapped = parse_json(
            r#"{"cars": [{"brand": "Saipa", "car_name": "Shahin", "advantages": "cheap parts"}]}"#,
        )
        .expect("wrapped object should parse");
        assert_eq!(wrapped[0].brand.as_deref(), Some("Saipa"));
        assert_eq!(wrapped[0].advantages.as_deref(), Some("cheap parts"));
    }

    #[test]
    fn json_non_list_is_a_source_error() {
        let error = parse_json(r#""just a string""#).expect_err("should fail");
        assert!(matches!(error, ApplicationError::CatalogSource(_)));
    }

    #[test]
    fn json_skips_elements_that_are_not_records() {
        let records =
            parse_json(r#"[42, {"car_name": "Dena"}, "x"]"#).expect("array should parse");
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn pipe_table_with_persian_headers_is_parsed() {
        let table = "شرکت|نام ماشین|مشخصات فنی|مزایا|معایب\n\
                     ایران خودرو|دنا پلاس|موتور توربو|شتاب خوب|مصرف بالا\n\
                     سایپا|شاهین|موتور ۱.۵|قیمت مناسب|\n";

        let records = parse_delimited(table.as_bytes(), '|').expect("table should parse");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].brand.as_deref(), Some("ایران خودرو"));
        assert_eq!(records[0].model_name.as_deref(), Some("دنا پلاس"));
        assert_eq!(records[0].technical_specs.as_deref(), Some("موتور توربو"));
        assert_eq!(records[1].disadvantages.as_deref(), Some(""));
        assert!(records[1].price.is_none());
    }

    #[test]
    fn table_without_name_column_is_rejected() {
        let error = parse_delimited("company|price\nSaipa|1\n".as_bytes(), '|')
            .expect_err("missing name column should fail");
        assert!(matches!(error, ApplicationError::CatalogSource(_)));
    }

    #[test]
    fn load_path_reads_csv_file_into_catalog() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("cars.csv");
        fs::write(&path, "company,car_name,price\nSaipa,Tiba 2,520000000\nSaipa,,1\n")
            .expect("write fixture");

        let catalog = load_path(&path, CatalogFormat::Csv, ',').expect("catalog should load");
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.listings()[0].full_name, "Saipa Tiba 2");
        assert_eq!(catalog.listings()[0].price, Some(520_000_000));
    }

    #[test]
    fn missing_file_is_a_source_error() {
        let dir = TempDir::new().expect("temp dir");
        let error = load_path(&dir.path().join("absent.json"), CatalogFormat::Json, '|')
            .expect_err("missing file should fail");
        assert!(matches!(error, ApplicationError::CatalogSource(_)));
    }
}
