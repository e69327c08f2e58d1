//! Column access and type coercion for Arrow record batches
//!
//! Claims files in the wild disagree on physical types: identifiers arrive as
//! strings or integers, months as `Date32` or `YYYY-MM` text, and amounts as any
//! numeric type. These helpers normalize a column to the one representation the
//! aggregation code works with.

use arrow::array::{Array, ArrayRef, Date32Array, Date64Array, Float64Array, StringArray};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use chrono::{Datelike, NaiveDate};

use crate::error::{Result, RiskEngineError};

/// Fetch a column by name
///
/// # Errors
/// Returns `Schema` if the batch has no such column
pub fn column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a ArrayRef> {
    batch
        .column_by_name(name)
        .ok_or_else(|| RiskEngineError::Schema(format!("Column '{name}' not found in record batch")))
}

fn downcast_owned<T: Array + Clone + 'static>(array: &ArrayRef, name: &str, expected: &str) -> Result<T> {
    array.as_any().downcast_ref::<T>().cloned().ok_or_else(|| {
        RiskEngineError::Schema(format!("Column '{name}' could not be read as {expected}"))
    })
}

/// Cast any numeric column to `Float64`
///
/// # Arguments
/// * `array` - The source column
/// * `name` - Column name, used in diagnostics
///
/// # Returns
/// A `Float64Array` of the same length; nulls are preserved
pub fn as_f64_array(array: &ArrayRef, name: &str) -> Result<Float64Array> {
    if !array.data_type().is_numeric() {
        return Err(RiskEngineError::Schema(format!(
            "Column '{name}' has non-numeric type {}",
            array.data_type()
        )));
    }
    let casted = cast(array, &DataType::Float64)?;
    downcast_owned(&casted, name, "Float64")
}

/// Cast an identifier or code column to `Utf8`
pub fn as_string_array(array: &ArrayRef, name: &str) -> Result<StringArray> {
    let casted = match array.data_type() {
        DataType::Utf8 => array.clone(),
        DataType::LargeUtf8 | DataType::Utf8View | DataType::Dictionary(_, _) => {
            cast(array, &DataType::Utf8)?
        }
        dt if dt.is_integer() => cast(array, &DataType::Utf8)?,
        other => {
            return Err(RiskEngineError::Schema(format!(
                "Column '{name}' has unsupported identifier type {other}"
            )));
        }
    };
    downcast_owned(&casted, name, "Utf8")
}

/// Months are indexed as `year * 12 + (month - 1)` so that consecutive
/// calendar months are consecutive integers.
#[must_use]
pub fn month_index(date: NaiveDate) -> i32 {
    date.year() * 12 + date.month0() as i32
}

/// First day of the month with the given index
#[must_use]
pub fn month_from_index(index: i32) -> Option<NaiveDate> {
    let year = index.div_euclid(12);
    let month = index.rem_euclid(12) as u32 + 1;
    NaiveDate::from_ymd_opt(year, month, 1)
}

/// Calendar year of a month index
#[must_use]
pub const fn year_of_index(index: i32) -> i32 {
    index.div_euclid(12)
}

/// Parse `YYYY-MM` or `YYYY-MM-DD` into a month index
#[must_use]
pub fn parse_month(s: &str) -> Option<i32> {
    let s = s.trim();
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(month_index(date));
    }
    let (year, month) = s.split_once('-')?;
    if year.len() != 4 || month.is_empty() || month.len() > 2 {
        return None;
    }
    let year: i32 = year.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, 1).map(month_index)
}

/// Read a month column as month indices
///
/// Accepts `Date32`, `Date64` and string columns. Unparseable strings become
/// `None` and are counted in a debug message rather than failing the batch.
pub fn month_indices(array: &ArrayRef, name: &str) -> Result<Vec<Option<i32>>> {
    match array.data_type() {
        DataType::Date32 => {
            let dates: Date32Array = downcast_owned(array, name, "Date32")?;
            Ok((0..dates.len())
                .map(|i| {
                    if dates.is_null(i) {
                        None
                    } else {
                        dates.value_as_date(i).map(month_index)
                    }
                })
                .collect())
        }
        DataType::Date64 => {
            let dates: Date64Array = downcast_owned(array, name, "Date64")?;
            Ok((0..dates.len())
                .map(|i| {
                    if dates.is_null(i) {
                        None
                    } else {
                        dates.value_as_date(i).map(month_index)
                    }
                })
                .collect())
        }
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => {
            let strings = as_string_array(array, name)?;
            let mut unparsed = 0usize;
            let months = strings
                .iter()
                .map(|value| {
                    let parsed = value.and_then(parse_month);
                    if value.is_some() && parsed.is_none() {
                        unparsed += 1;
                    }
                    parsed
                })
                .collect();
            if unparsed > 0 {
                log::debug!("{unparsed} unparseable month values in column '{name}'");
            }
            Ok(months)
        }
        other => Err(RiskEngineError::Schema(format!(
            "Column '{name}' has unsupported month type {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::array::{Int32Array, Int64Array};

    use super::*;

    #[test]
    fn test_month_index_round_trip_across_year_boundary() {
        let dec = NaiveDate::from_ymd_opt(2021, 12, 1).unwrap();
        let jan = NaiveDate::from_ymd_opt(2022, 1, 15).unwrap();
        assert_eq!(month_index(jan) - month_index(dec), 1);
        assert_eq!(month_from_index(month_index(jan)), NaiveDate::from_ymd_opt(2022, 1, 1));
        assert_eq!(year_of_index(month_index(dec)), 2021);
    }

    #[test]
    fn test_parse_month_formats() {
        assert_eq!(parse_month("2023-04"), parse_month("2023-04-01"));
        assert!(parse_month("2023-4").is_some());
        assert_eq!(parse_month("2023-13"), None);
        assert_eq!(parse_month("April 2023"), None);
    }

    #[test]
    fn test_numeric_and_identifier_casts() {
        let ints: ArrayRef = Arc::new(Int32Array::from(vec![Some(3), None]));
        let floats = as_f64_array(&ints, "claims").unwrap();
        assert_eq!(floats.value(0), 3.0);
        assert!(floats.is_null(1));

        let ids: ArrayRef = Arc::new(Int64Array::from(vec![1_234_567_890]));
        assert_eq!(as_string_array(&ids, "npi").unwrap().value(0), "1234567890");

        let text: ArrayRef = Arc::new(StringArray::from(vec!["x"]));
        assert!(as_f64_array(&text, "paid").is_err());
    }
}
