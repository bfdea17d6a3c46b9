//! Business-context phrasing for direct responses.
//!
//! Text is assembled from a fixed phrase bank keyed by intent plus figures
//! derived from the served records. Nothing here is generated freely, so the
//! same records always produce the same text.

use std::fmt::Write as _;

use windfarm_routing::{EntityMap, Intent};
use windfarm_types::{subject_label, ResultRecord, ResultType};

/// Hours in a (non-leap) year.
pub const HOURS_PER_YEAR: f64 = 8760.0;

/// Grid CO2 displaced per MWh of wind generation, in tonnes.
pub const CO2_TONNES_PER_MWH: f64 = 0.5;

/// Metric name carrying a capacity factor.
const CAPACITY_FACTOR_METRIC: &str = "capacity_factor";

/// Fixed sentence for each intent.
pub fn phrase(intent: Intent) -> &'static str {
    match intent {
        Intent::Performance => {
            "Forecast accuracy sets how much reserve capacity the grid operator must hold back."
        }
        Intent::PhysicalCharacteristics => {
            "Capacity factor and power-curve shape set the realistic energy yield of each farm."
        }
        Intent::Temporal => {
            "Predictable daily and seasonal cycles let operators plan balancing and maintenance ahead."
        }
        Intent::BusinessImpact => {
            "Better forecasts displace fossil balancing generation, cutting both cost and CO2 emissions."
        }
        Intent::Uncertainty => {
            "Calibrated prediction intervals let traders and operators size their risk buffers."
        }
        Intent::ErrorDiagnosis => {
            "Systematic errors point to fixable model gaps rather than irreducible weather noise."
        }
        Intent::Comparison => "Model choice trades accuracy against complexity and operating cost.",
        Intent::DataQuality => {
            "Data gaps and outliers bound how far any downstream result can be trusted."
        }
        Intent::FeatureImportance => {
            "Knowing which inputs drive the forecast focuses data collection where it pays off."
        }
        Intent::General => "Pre-computed results cover the core wind-farm analyses.",
    }
}

/// Annual generation in MWh per MW installed for a capacity factor.
pub fn annual_generation_mwh_per_mw(capacity_factor: f64) -> f64 {
    capacity_factor * HOURS_PER_YEAR
}

/// CO2 displaced in tonnes for a given generation.
pub fn co2_displaced_tonnes(generation_mwh: f64) -> f64 {
    generation_mwh * CO2_TONNES_PER_MWH
}

/// Scale a metric by an improvement percentage.
pub fn scaled_by_percentage(value: f64, percentage: f64) -> f64 {
    value * percentage / 100.0
}

/// Build the business-context text for a direct response.
pub fn business_context(intents: &[Intent], records: &[ResultRecord], entities: &EntityMap) -> String {
    let mut out = intents
        .iter()
        .map(|i| phrase(*i))
        .collect::<Vec<_>>()
        .join(" ");

    for record in records {
        let label = subject_label(record.subject.as_ref());

        if let Some(cf) = record.number(CAPACITY_FACTOR_METRIC) {
            let generation = annual_generation_mwh_per_mw(cf);
            let _ = write!(
                out,
                "\n{label}: capacity factor {cf} yields {generation:.1} MWh per MW per year \
                 and displaces {:.1} t CO2 per MW per year.",
                co2_displaced_tonnes(generation)
            );
        }

        if record.result_type == ResultType::BusinessImpact {
            for pct in &entities.percentages {
                for (metric, value) in &record.metrics {
                    if let Some(v) = value.as_f64() {
                        let _ = write!(
                            out,
                            "\n{label}: {metric} at {pct}% improvement: {:.2}",
                            scaled_by_percentage(v, *pct)
                        );
                    }
                }
            }
        }
    }

    out
}
