//! Record model and train/test partitioning.
//!
//! This module defines `Record` (one collections case), the categorical and
//! numeric column layout shared by the encoder and the CSV reader, and the
//! stratified splitter used to hold out a test partition.
use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::{RecoupError, Result};
use crate::math::Array2;

/// On-disk column names of the enriched record schema.
pub mod columns {
    pub const CLIENT_ID: &str = "cliente_id";
    pub const DAYS_OVERDUE: &str = "dias_em_atraso";
    pub const DEBT_VALUE: &str = "valor_divida";
    pub const CHANNEL: &str = "canal_utilizado";
    pub const RESPONSE: &str = "resposta_cliente";
    pub const RISK_BAND: &str = "faixa_risco";
    pub const DELAY_BAND: &str = "faixa_atraso";
    pub const RESPONSE_POSITIVE: &str = "resposta_positiva";
    pub const CHANNEL_GROUP: &str = "canal_grupo";
    pub const VALUE_BAND: &str = "valor_faixa";
}

/// Numeric feature columns, appended after the one-hot block in this order.
pub const NUMERIC_COLUMNS: [&str; 2] = [columns::DAYS_OVERDUE, columns::DEBT_VALUE];

/// One collections case. Categorical values are kept as raw strings so that
/// levels never seen during fitting still reach the encoder; `None` marks a
/// missing value. Serde names follow the on-disk column names and field order
/// follows the file's column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "cliente_id")]
    pub client_id: u64,
    #[serde(rename = "dias_em_atraso")]
    pub days_overdue: u32,
    #[serde(rename = "valor_divida")]
    pub debt_value: f64,
    #[serde(rename = "canal_utilizado")]
    pub channel: Option<String>,
    #[serde(rename = "resposta_cliente")]
    pub response: Option<String>,
    #[serde(rename = "faixa_risco")]
    pub risk_band: Option<String>,
    #[serde(rename = "faixa_atraso")]
    pub delay_band: Option<String>,
    #[serde(rename = "resposta_positiva")]
    pub response_positive: u8,
    #[serde(rename = "canal_grupo")]
    pub channel_group: Option<String>,
    #[serde(rename = "valor_faixa")]
    pub value_band: Option<String>,
}

/// Every column an enriched record file must carry.
pub const RECORD_COLUMNS: [&str; 10] = [
    columns::CLIENT_ID,
    columns::DAYS_OVERDUE,
    columns::DEBT_VALUE,
    columns::CHANNEL,
    columns::RESPONSE,
    columns::RISK_BAND,
    columns::DELAY_BAND,
    columns::RESPONSE_POSITIVE,
    columns::CHANNEL_GROUP,
    columns::VALUE_BAND,
];

/// The categorical source columns, in encoding order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoricalColumn {
    Channel,
    RiskBand,
    DelayBand,
    ChannelGroup,
    ValueBand,
}

impl CategoricalColumn {
    pub const ALL: [CategoricalColumn; 5] = [
        CategoricalColumn::Channel,
        CategoricalColumn::RiskBand,
        CategoricalColumn::DelayBand,
        CategoricalColumn::ChannelGroup,
        CategoricalColumn::ValueBand,
    ];

    /// Column name as it appears in the input files and in expanded feature names.
    pub fn name(self) -> &'static str {
        match self {
            CategoricalColumn::Channel => columns::CHANNEL,
            CategoricalColumn::RiskBand => columns::RISK_BAND,
            CategoricalColumn::DelayBand => columns::DELAY_BAND,
            CategoricalColumn::ChannelGroup => columns::CHANNEL_GROUP,
            CategoricalColumn::ValueBand => columns::VALUE_BAND,
        }
    }

    pub fn value(self, record: &Record) -> Option<&str> {
        let value = match self {
            CategoricalColumn::Channel => &record.channel,
            CategoricalColumn::RiskBand => &record.risk_band,
            CategoricalColumn::DelayBand => &record.delay_band,
            CategoricalColumn::ChannelGroup => &record.channel_group,
            CategoricalColumn::ValueBand => &record.value_band,
        };
        value.as_deref()
    }
}

/// Extract the binary target of every record.
pub fn labels(records: &[Record]) -> Vec<u8> {
    records.iter().map(|r| r.response_positive).collect()
}

pub fn log_label_summary(labels: &[u8]) {
    let positives = labels.iter().filter(|&&l| l == 1).count();
    log::info!(
        "{} records: {} positive responses, {} negative ({:.1}% positive)",
        labels.len(),
        positives,
        labels.len() - positives,
        if labels.is_empty() {
            0.0
        } else {
            100.0 * positives as f64 / labels.len() as f64
        }
    );
}

/// Row indices assigned to the train and test partitions, both ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitPlan {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

impl SplitPlan {
    /// Stratified random partition of `labels`.
    ///
    /// Within each class the row indices are shuffled with a ChaCha8 RNG
    /// seeded by `seed`, and the first `round(class_size * train_fraction)`
    /// rows go to train. That count is clamped to `[1, class_size - 1]` so
    /// every class is represented on both sides.
    ///
    /// # Errors
    ///
    /// * `Config` if `train_fraction` is not strictly between 0 and 1.
    /// * `InsufficientData` if either class has fewer than 2 rows.
    pub fn stratified(labels: &[u8], train_fraction: f64, seed: u64) -> Result<Self> {
        if !(train_fraction > 0.0 && train_fraction < 1.0) {
            return Err(RecoupError::Config(format!(
                "train_fraction must be in (0, 1), got {}",
                train_fraction
            )));
        }

        let mut by_class: BTreeMap<u8, Vec<usize>> = BTreeMap::new();
        by_class.entry(0).or_default();
        by_class.entry(1).or_default();
        for (i, &label) in labels.iter().enumerate() {
            by_class.entry(label).or_default().push(i);
        }

        if let Some((label, rows)) = by_class.iter().find(|(_, rows)| rows.len() < 2) {
            return Err(RecoupError::InsufficientData(format!(
                "class {} has {} row(s); stratified split needs at least 2 per class",
                label,
                rows.len()
            )));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut train = Vec::with_capacity(labels.len());
        let mut test = Vec::with_capacity(labels.len());
        for (label, rows) in by_class.iter_mut() {
            rows.shuffle(&mut rng);
            let n_train = ((rows.len() as f64 * train_fraction).round() as usize)
                .clamp(1, rows.len() - 1);
            log::debug!(
                "class {}: {} train / {} test",
                label,
                n_train,
                rows.len() - n_train
            );
            train.extend_from_slice(&rows[..n_train]);
            test.extend_from_slice(&rows[n_train..]);
        }
        train.sort_unstable();
        test.sort_unstable();

        Ok(SplitPlan { train, test })
    }

    /// Copy the planned rows out of a row-aligned slice.
    pub fn select<T: Clone>(&self, items: &[T]) -> (Vec<T>, Vec<T>) {
        let pick = |idx: &[usize]| idx.iter().map(|&i| items[i].clone()).collect::<Vec<T>>();
        (pick(&self.train), pick(&self.test))
    }
}

/// One side of a split: features, labels and the originating row indices.
#[derive(Debug, Clone)]
pub struct Partition {
    pub x: Array2<f64>,
    pub y: Vec<u8>,
    pub rows: Vec<usize>,
}

impl Partition {
    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    pub fn positives(&self) -> usize {
        self.y.iter().filter(|&&l| l == 1).count()
    }
}

#[derive(Debug, Clone)]
pub struct Split {
    pub train: Partition,
    pub test: Partition,
}

/// Encoded train and test partitions with the column names that produced them.
#[derive(Debug, Clone)]
pub struct EncodedSplit {
    pub feature_names: Vec<String>,
    pub train: Partition,
    pub test: Partition,
}

/// Stratified train/test split of an encoded matrix.
///
/// See [`SplitPlan::stratified`] for the partitioning rule and errors.
pub fn stratified_split(
    x: &Array2<f64>,
    y: &[u8],
    train_fraction: f64,
    seed: u64,
) -> Result<Split> {
    if x.nrows() != y.len() {
        return Err(RecoupError::Schema(format!(
            "feature matrix has {} rows but {} labels were given",
            x.nrows(),
            y.len()
        )));
    }
    let plan = SplitPlan::stratified(y, train_fraction, seed)?;
    let (y_train, y_test) = plan.select(y);
    Ok(Split {
        train: Partition {
            x: x.select_rows(&plan.train),
            y: y_train,
            rows: plan.train.clone(),
        },
        test: Partition {
            x: x.select_rows(&plan.test),
            y: y_test,
            rows: plan.test,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ten_rows_thirty_percent_positive() {
        let labels = vec![1, 1, 1, 0, 0, 0, 0, 0, 0, 0];
        let plan = SplitPlan::stratified(&labels, 0.7, 42).unwrap();
        let train_pos = plan.train.iter().filter(|&&i| labels[i] == 1).count();
        let test_pos = plan.test.iter().filter(|&&i| labels[i] == 1).count();
        assert_eq!(train_pos, 2);
        assert_eq!(test_pos, 1);
        assert_eq!(plan.train.len(), 7);
        assert_eq!(plan.test.len(), 3);
    }

    #[test]
    fn same_seed_same_plan() {
        let labels: Vec<u8> = (0..50).map(|i| (i % 3 == 0) as u8).collect();
        let a = SplitPlan::stratified(&labels, 0.7, 7).unwrap();
        let b = SplitPlan::stratified(&labels, 0.7, 7).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn single_row_class_is_rejected() {
        let labels = vec![1, 0, 0, 0];
        let err = SplitPlan::stratified(&labels, 0.7, 1).unwrap_err();
        assert!(matches!(err, RecoupError::InsufficientData(_)));
    }

    #[test]
    fn missing_class_is_rejected() {
        let labels = vec![0, 0, 0, 0];
        assert!(matches!(
            SplitPlan::stratified(&labels, 0.7, 1),
            Err(RecoupError::InsufficientData(_))
        ));
    }

    #[test]
    fn fraction_outside_unit_interval_is_rejected() {
        let labels = vec![0, 0, 1, 1];
        assert!(matches!(
            SplitPlan::stratified(&labels, 1.0, 1),
            Err(RecoupError::Config(_))
        ));
    }

    #[test]
    fn two_row_class_lands_on_both_sides() {
        let labels = vec![1, 1, 0, 0, 0, 0, 0, 0, 0, 0];
        let plan = SplitPlan::stratified(&labels, 0.9, 3).unwrap();
        assert_eq!(plan.test.iter().filter(|&&i| labels[i] == 1).count(), 1);
    }
}
