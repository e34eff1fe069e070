//! Seeded generator of synthetic collections records for demos and tests.

use rand::distributions::WeightedIndex;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::data_handling::Record;
use crate::enrichment::{enrich_all, RawRecord};

const NAMES: [&str; 24] = [
    "Carlos", "Julia", "Fernanda", "Rafael", "Marina", "João", "Bianca", "André", "Lucas",
    "Paula", "Renata", "Diego", "Tatiane", "Gabriel", "Luana", "Vinicius", "Roberta", "Felipe",
    "Patrícia", "Leonardo", "Amanda", "Gustavo", "Camila", "Eduardo",
];

pub const CHANNELS: [&str; 4] = ["SMS", "WhatsApp", "Ligação", "Assessoria"];

pub const RESPONSES: [&str; 5] = [
    "Sem resposta",
    "Prometeu pagar",
    "Negocia desconto",
    "Ignorou",
    "Recusou contato",
];

/// Response weights for human channels on debts at most 60 days overdue.
const HUMAN_EARLY_WEIGHTS: [u32; 5] = [1, 2, 3, 1, 1];

fn risk_band(days_overdue: u32, debt_value: f64) -> &'static str {
    if days_overdue > 90 || debt_value > 20_000.0 {
        "Muito Alto"
    } else if days_overdue > 60 || debt_value > 10_000.0 {
        "Alto"
    } else if days_overdue > 30 || debt_value > 5_000.0 {
        "Médio"
    } else {
        "Baixo"
    }
}

/// Generate `n` raw records with ids `1..=n`.
pub fn generate_raw(n: usize, seed: u64) -> Vec<RawRecord> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    // weights are constant and non-zero
    let human_early = WeightedIndex::new(HUMAN_EARLY_WEIGHTS).ok();

    (1..=n as u64)
        .map(|client_id| {
            let name = NAMES[rng.gen_range(0..NAMES.len())];
            let days_overdue = rng.gen_range(1..=120u32);
            let debt_value = (rng.gen_range(100.0..=30_000.0f64) * 100.0).round() / 100.0;
            let channel = CHANNELS[rng.gen_range(0..CHANNELS.len())];

            let human = matches!(channel, "Ligação" | "Assessoria");
            let response = match (&human_early, human && days_overdue <= 60) {
                (Some(dist), true) => RESPONSES[dist.sample(&mut rng)],
                _ => RESPONSES[rng.gen_range(0..RESPONSES.len())],
            };

            RawRecord {
                client_id,
                name: Some(name.to_string()),
                days_overdue,
                debt_value,
                channel: Some(channel.to_string()),
                response: Some(response.to_string()),
                risk_band: Some(risk_band(days_overdue, debt_value).to_string()),
            }
        })
        .collect()
}

/// Generate `n` enriched records.
pub fn generate(n: usize, seed: u64) -> Vec<Record> {
    enrich_all(&generate_raw(n, seed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_records() {
        assert_eq!(generate_raw(50, 9), generate_raw(50, 9));
        assert_ne!(generate_raw(50, 9), generate_raw(50, 10));
    }

    #[test]
    fn values_stay_in_range() {
        for r in generate_raw(200, 1) {
            assert!((1..=120).contains(&r.days_overdue));
            assert!((100.0..=30_000.0).contains(&r.debt_value));
            assert_eq!((r.debt_value * 100.0).round() / 100.0, r.debt_value);
            assert_eq!(
                r.risk_band.as_deref(),
                Some(risk_band(r.days_overdue, r.debt_value))
            );
        }
    }

    #[test]
    fn risk_band_thresholds() {
        assert_eq!(risk_band(91, 100.0), "Muito Alto");
        assert_eq!(risk_band(10, 20_000.01), "Muito Alto");
        assert_eq!(risk_band(61, 100.0), "Alto");
        assert_eq!(risk_band(31, 100.0), "Médio");
        assert_eq!(risk_band(30, 5_000.0), "Baixo");
    }

    #[test]
    fn generated_records_have_both_classes() {
        let records = generate(250, 42);
        let positives = records.iter().filter(|r| r.response_positive == 1).count();
        assert!(positives > 0 && positives < records.len());
    }
}
