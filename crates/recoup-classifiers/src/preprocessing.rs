//! Categorical-to-numeric feature encoding.
//!
//! `fit_encoder` learns, per categorical column, the imputation fill value and
//! the sorted set of observed levels. The first level is dropped as the
//! reference and the remaining levels become one binary column each. The
//! resulting `FittedEncoder` owns the full column layout, so every later
//! `transform` (training, held-out or unseen records) yields the same columns
//! in the same order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::data_handling::{CategoricalColumn, Record, NUMERIC_COLUMNS};
use crate::error::{RecoupError, Result};
use crate::math::Array2;

/// Fit-time state of one categorical column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryEncoding {
    pub column: CategoricalColumn,
    /// Most frequent level at fit time, substituted for missing values.
    pub fill_value: String,
    /// Lexically first level; encoded as all zeros.
    pub reference: String,
    /// Levels that get their own column, sorted.
    pub levels: Vec<String>,
}

impl CategoryEncoding {
    fn feature_names(&self) -> impl Iterator<Item = String> + '_ {
        self.levels
            .iter()
            .map(move |level| format!("{}_{}", self.column.name(), level))
    }
}

/// Encoder state produced by [`fit_encoder`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedEncoder {
    categories: Vec<CategoryEncoding>,
    feature_names: Vec<String>,
}

/// Learn the categorical layout from training records.
///
/// # Errors
///
/// * `InsufficientData` when `records` is empty.
/// * `Schema` when a categorical column has no value in any record.
pub fn fit_encoder(records: &[Record]) -> Result<FittedEncoder> {
    if records.is_empty() {
        return Err(RecoupError::InsufficientData(
            "cannot fit the feature encoder on zero records".to_string(),
        ));
    }

    let mut categories = Vec::with_capacity(CategoricalColumn::ALL.len());
    for column in CategoricalColumn::ALL {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for record in records {
            if let Some(value) = column.value(record) {
                *counts.entry(value).or_insert(0) += 1;
            }
        }

        // BTreeMap iterates in lexical order, so a strict comparison keeps the
        // smallest level among equally frequent ones.
        let mut fill: Option<(&str, usize)> = None;
        for (&level, &count) in counts.iter() {
            if fill.map_or(true, |(_, best)| count > best) {
                fill = Some((level, count));
            }
        }
        let Some((fill_value, _)) = fill else {
            return Err(RecoupError::Schema(format!(
                "column '{}' has no values in the training records",
                column.name()
            )));
        };

        let mut levels = counts.keys().map(|s| s.to_string());
        let reference = levels.next().unwrap_or_default();
        let encoding = CategoryEncoding {
            column,
            fill_value: fill_value.to_string(),
            reference,
            levels: levels.collect(),
        };
        log::debug!(
            "encoder: {} -> {} level(s) + reference '{}', fill '{}'",
            column.name(),
            encoding.levels.len(),
            encoding.reference,
            encoding.fill_value
        );
        categories.push(encoding);
    }

    let feature_names = categories
        .iter()
        .flat_map(|c| c.feature_names())
        .chain(NUMERIC_COLUMNS.iter().map(|s| s.to_string()))
        .collect();

    Ok(FittedEncoder {
        categories,
        feature_names,
    })
}

/// Fit on `records` and encode them in one call.
pub fn fit_transform(records: &[Record]) -> Result<(FittedEncoder, Array2<f64>)> {
    let encoder = fit_encoder(records)?;
    let x = encoder.transform(records)?;
    Ok((encoder, x))
}

impl FittedEncoder {
    /// Encode `records` with the fitted layout.
    ///
    /// Missing categorical values take the fit-time fill value. Levels unseen
    /// at fit time (and the reference level) encode as all zeros.
    ///
    /// # Errors
    ///
    /// `Schema` if a numeric value is not finite.
    pub fn transform(&self, records: &[Record]) -> Result<Array2<f64>> {
        let ncols = self.feature_names.len();
        let mut x = Array2::zeros(records.len(), ncols);

        for (row, record) in records.iter().enumerate() {
            let mut offset = 0;
            for category in &self.categories {
                let value = category
                    .column
                    .value(record)
                    .unwrap_or(category.fill_value.as_str());
                if let Ok(pos) = category.levels.binary_search_by(|l| l.as_str().cmp(value)) {
                    x[(row, offset + pos)] = 1.0;
                }
                offset += category.levels.len();
            }

            if !record.debt_value.is_finite() {
                return Err(RecoupError::Schema(format!(
                    "record {} has a non-finite debt value",
                    record.client_id
                )));
            }
            x[(row, offset)] = record.days_overdue as f64;
            x[(row, offset + 1)] = record.debt_value;
        }

        Ok(x)
    }

    /// Expanded column names: `<column>_<level>` blocks, then the numeric columns.
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    pub fn categories(&self) -> &[CategoryEncoding] {
        &self.categories
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(channel: Option<&str>, days: u32, value: f64) -> Record {
        Record {
            client_id: days as u64,
            days_overdue: days,
            debt_value: value,
            channel: channel.map(str::to_string),
            response: None,
            risk_band: Some("Baixo".to_string()),
            delay_band: Some("<15 dias".to_string()),
            channel_group: Some("Digital".to_string()),
            value_band: Some("Alto".to_string()),
            response_positive: 0,
        }
    }

    #[test]
    fn drops_lexically_first_level() {
        let records = vec![
            record(Some("SMS"), 1, 10.0),
            record(Some("WhatsApp"), 2, 20.0),
            record(Some("Call"), 3, 30.0),
        ];
        let encoder = fit_encoder(&records).unwrap();
        let channel = &encoder.categories()[0];
        assert_eq!(channel.reference, "Call");
        assert_eq!(channel.levels, vec!["SMS".to_string(), "WhatsApp".to_string()]);
        assert_eq!(
            &encoder.feature_names()[..2],
            &["canal_utilizado_SMS".to_string(), "canal_utilizado_WhatsApp".to_string()]
        );
        // single-level columns contribute no columns, numeric columns close the row
        assert_eq!(encoder.n_features(), 4);
        assert_eq!(encoder.feature_names()[2], "dias_em_atraso");
        assert_eq!(encoder.feature_names()[3], "valor_divida");
    }

    #[test]
    fn unseen_level_encodes_as_zeros() {
        let records = vec![
            record(Some("SMS"), 1, 10.0),
            record(Some("WhatsApp"), 2, 20.0),
            record(Some("Call"), 3, 30.0),
        ];
        let encoder = fit_encoder(&records).unwrap();
        let x = encoder.transform(&[record(Some("Agency"), 9, 99.5)]).unwrap();
        assert_eq!(x.row_slice(0), &[0.0, 0.0, 9.0, 99.5]);
    }

    #[test]
    fn missing_value_takes_most_frequent_level() {
        let records = vec![
            record(Some("SMS"), 1, 10.0),
            record(Some("WhatsApp"), 2, 20.0),
            record(Some("WhatsApp"), 3, 30.0),
            record(None, 4, 40.0),
        ];
        let encoder = fit_encoder(&records).unwrap();
        assert_eq!(encoder.categories()[0].fill_value, "WhatsApp");
        let x = encoder.transform(&records[3..]).unwrap();
        // levels: reference SMS, encoded [WhatsApp]
        assert_eq!(x[(0, 0)], 1.0);
    }

    #[test]
    fn fill_value_ties_break_lexically() {
        let records = vec![record(Some("b"), 1, 1.0), record(Some("a"), 2, 2.0)];
        let encoder = fit_encoder(&records).unwrap();
        assert_eq!(encoder.categories()[0].fill_value, "a");
    }

    #[test]
    fn column_without_values_is_a_schema_error() {
        let records = vec![record(None, 1, 1.0), record(None, 2, 2.0)];
        assert!(matches!(fit_encoder(&records), Err(RecoupError::Schema(_))));
    }

    #[test]
    fn empty_input_is_insufficient() {
        assert!(matches!(
            fit_encoder(&[]),
            Err(RecoupError::InsufficientData(_))
        ));
    }

    #[test]
    fn repeated_transform_is_identical() {
        let records = vec![
            record(Some("SMS"), 1, 10.0),
            record(Some("Call"), 2, 20.0),
        ];
        let (encoder, first) = fit_transform(&records).unwrap();
        let second = encoder.transform(&records).unwrap();
        assert_eq!(first, second);
    }
}
