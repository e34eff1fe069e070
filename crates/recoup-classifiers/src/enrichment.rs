//! Derived columns for raw collections records.
//!
//! Each derived value is a pure function of one raw field, so enrichment is a
//! per-row mapping with no fitted state.

use serde::{Deserialize, Serialize};

use crate::data_handling::Record;

/// A record as produced by the collections system, before enrichment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(rename = "cliente_id")]
    pub client_id: u64,
    #[serde(rename = "nome", default)]
    pub name: Option<String>,
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
}

/// Responses counted as a positive outcome.
pub const POSITIVE_RESPONSES: [&str; 2] = ["Prometeu pagar", "Negocia desconto"];

/// Channels grouped as `Digital`; every other channel is `Humano`.
pub const DIGITAL_CHANNELS: [&str; 2] = ["SMS", "WhatsApp"];

pub fn delay_band(days_overdue: u32) -> &'static str {
    match days_overdue {
        0..=14 => "<15 dias",
        15..=29 => "15-30 dias",
        30..=59 => "30-60 dias",
        _ => ">60 dias",
    }
}

pub fn is_positive_response(response: &str) -> bool {
    POSITIVE_RESPONSES.contains(&response)
}

pub fn channel_group(channel: &str) -> &'static str {
    if DIGITAL_CHANNELS.contains(&channel) {
        "Digital"
    } else {
        "Humano"
    }
}

/// Right-closed value bins: (0, 500], (500, 1500], (1500, inf).
/// Non-positive and non-finite values have no band.
pub fn value_band(debt_value: f64) -> Option<&'static str> {
    if !debt_value.is_finite() || debt_value <= 0.0 {
        None
    } else if debt_value <= 500.0 {
        Some("Baixo")
    } else if debt_value <= 1500.0 {
        Some("Médio")
    } else {
        Some("Alto")
    }
}

/// Add the derived columns to one raw record.
pub fn enrich(raw: &RawRecord) -> Record {
    Record {
        client_id: raw.client_id,
        days_overdue: raw.days_overdue,
        debt_value: raw.debt_value,
        channel: raw.channel.clone(),
        response: raw.response.clone(),
        risk_band: raw.risk_band.clone(),
        delay_band: Some(delay_band(raw.days_overdue).to_string()),
        response_positive: raw
            .response
            .as_deref()
            .map_or(0, |r| is_positive_response(r) as u8),
        // a missing channel is not digital
        channel_group: Some(channel_group(raw.channel.as_deref().unwrap_or_default()).to_string()),
        value_band: value_band(raw.debt_value).map(str::to_string),
    }
}

pub fn enrich_all(raw: &[RawRecord]) -> Vec<Record> {
    let records: Vec<Record> = raw.iter().map(enrich).collect();
    log::info!("enriched {} records", records.len());
    records
}
