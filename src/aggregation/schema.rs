//! Claims fact-table schema handling

use arrow::array::{Array, Float64Array, StringArray};
use arrow::datatypes::Schema;
use arrow::record_batch::RecordBatch;

use crate::config::ClaimsColumns;
use crate::error::{Result, RiskEngineError};
use crate::utils::arrow::{as_f64_array, as_string_array, column, month_indices};

/// Names of every column the engine reads, in a fixed order
#[must_use]
pub fn required_columns(columns: &ClaimsColumns) -> [&str; 7] {
    [
        columns.billing.as_str(),
        columns.servicing.as_str(),
        columns.code.as_str(),
        columns.month.as_str(),
        columns.beneficiaries.as_str(),
        columns.claims.as_str(),
        columns.paid.as_str(),
    ]
}

/// Check that a schema carries every required column
///
/// # Errors
/// Returns `Schema` listing all missing columns
pub fn validate_schema(schema: &Schema, columns: &ClaimsColumns) -> Result<()> {
    let missing: Vec<&str> = required_columns(columns)
        .into_iter()
        .filter(|name| schema.index_of(name).is_err())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(RiskEngineError::Schema(format!(
            "Claims table is missing columns: {}",
            missing.join(", ")
        )))
    }
}

/// Typed, normalized view of one claims record batch
pub struct ClaimsBatchView {
    pub billing: StringArray,
    pub servicing: StringArray,
    pub code: StringArray,
    /// Month indices, see [`crate::utils::arrow::month_index`]
    pub months: Vec<Option<i32>>,
    pub beneficiaries: Float64Array,
    pub claims: Float64Array,
    pub paid: Float64Array,
}

impl ClaimsBatchView {
    /// Normalize the required columns of a batch
    pub fn try_new(batch: &RecordBatch, columns: &ClaimsColumns) -> Result<Self> {
        validate_schema(batch.schema_ref(), columns)?;
        Ok(Self {
            billing: as_string_array(column(batch, &columns.billing)?, &columns.billing)?,
            servicing: as_string_array(column(batch, &columns.servicing)?, &columns.servicing)?,
            code: as_string_array(column(batch, &columns.code)?, &columns.code)?,
            months: month_indices(column(batch, &columns.month)?, &columns.month)?,
            beneficiaries: as_f64_array(
                column(batch, &columns.beneficiaries)?,
                &columns.beneficiaries,
            )?,
            claims: as_f64_array(column(batch, &columns.claims)?, &columns.claims)?,
            paid: as_f64_array(column(batch, &columns.paid)?, &columns.paid)?,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.billing.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Billing identity, `None` for null or blank
    #[must_use]
    pub fn billing(&self, row: usize) -> Option<&str> {
        non_blank(&self.billing, row)
    }

    #[must_use]
    pub fn servicing(&self, row: usize) -> Option<&str> {
        non_blank(&self.servicing, row)
    }

    #[must_use]
    pub fn code(&self, row: usize) -> Option<&str> {
        non_blank(&self.code, row)
    }

    #[must_use]
    pub fn month(&self, row: usize) -> Option<i32> {
        self.months.get(row).copied().flatten()
    }

    #[must_use]
    pub fn paid(&self, row: usize) -> f64 {
        amount(&self.paid, row)
    }

    #[must_use]
    pub fn claims(&self, row: usize) -> f64 {
        amount(&self.claims, row)
    }

    #[must_use]
    pub fn beneficiaries(&self, row: usize) -> f64 {
        amount(&self.beneficiaries, row)
    }
}

fn non_blank(array: &StringArray, row: usize) -> Option<&str> {
    if array.is_null(row) {
        return None;
    }
    let value = array.value(row).trim();
    (!value.is_empty()).then_some(value)
}

// Nulls and non-finite amounts count as zero.
fn amount(array: &Float64Array, row: usize) -> f64 {
    if array.is_null(row) {
        return 0.0;
    }
    let value = array.value(row);
    if value.is_finite() { value } else { 0.0 }
}
