use crate::domain::model::DataSource;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::fmt;

/// A value shown with a fixed number of decimals. Serializes as the
/// formatted string (`"100.00"`), which is what report tables consume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fixed {
    value: f64,
    decimals: usize,
}

impl Fixed {
    pub fn new(value: f64, decimals: usize) -> Self {
        Self { value, decimals }
    }

    pub fn percent(value: f64) -> Self {
        Self::new(value, 2)
    }

    pub fn zero(decimals: usize) -> Self {
        Self::new(0.0, decimals)
    }

    /// `numerator / denominator * 100`, or zero when the denominator is not positive.
    pub fn ratio_percent(numerator: f64, denominator: f64) -> Self {
        if denominator > 0.0 {
            Self::percent(numerator / denominator * 100.0)
        } else {
            Self::percent(0.0)
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// The value as it reads once formatted.
    pub fn rounded(&self) -> f64 {
        self.to_string().parse().unwrap_or(self.value)
    }
}

/// 四捨五入（.5 遠離零進位），與報表前端的 toFixed 一致
fn round_half_up(value: f64, decimals: usize) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    let scaled = value * factor;
    if !scaled.is_finite() {
        return value;
    }
    scaled.round() / factor
}

impl fmt::Display for Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.*}", self.decimals, round_half_up(self.value, self.decimals))
    }
}

impl Serialize for Fixed {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceTier {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl PerformanceTier {
    fn from_thresholds(rate: f64, excellent: f64, good: f64, fair: f64) -> Self {
        if rate >= excellent {
            PerformanceTier::Excellent
        } else if rate >= good {
            PerformanceTier::Good
        } else if rate >= fair {
            PerformanceTier::Fair
        } else {
            PerformanceTier::Poor
        }
    }

    /// 成功率門檻偏低：實際資料多落在個位數百分比
    pub fn for_success_rate(rate: Fixed) -> Self {
        Self::from_thresholds(rate.rounded(), 10.0, 5.0, 1.0)
    }

    pub fn for_collection_rate(rate: Fixed) -> Self {
        Self::from_thresholds(rate.rounded(), 20.0, 10.0, 5.0)
    }
}

impl fmt::Display for PerformanceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PerformanceTier::Excellent => "excellent",
            PerformanceTier::Good => "good",
            PerformanceTier::Fair => "fair",
            PerformanceTier::Poor => "poor",
        };
        f.write_str(label)
    }
}

/// Owned, table-ready view of one strategy group.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategySummary {
    pub id: String,
    pub name: String,
    pub tipo_envio: String,
    pub banco: String,
    pub record_count: usize,
    pub total_monto: f64,
    pub total_cobrado: f64,
    pub success_count: usize,
    pub success_rate: Fixed,
    pub collection_rate: Fixed,
    pub average_amount: Fixed,
}

/// Portfolio-wide figures derived from all strategy groups.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioOverview {
    pub total_records: usize,
    pub strategy_count: usize,
    pub successful_records: usize,
    pub overall_success_rate: Fixed,
    pub average_success_rate: Fixed,
    pub total_monto: f64,
    pub total_cobrado: Fixed,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonRow {
    pub strategy: String,
    pub success_rate: Fixed,
    pub collection_rate: Fixed,
    pub total_records: usize,
    pub average_amount: Fixed,
    pub total_cobrado: Fixed,
    pub success_tier: PerformanceTier,
    pub collection_tier: PerformanceTier,
}

impl From<&StrategySummary> for ComparisonRow {
    fn from(summary: &StrategySummary) -> Self {
        Self {
            strategy: summary.name.clone(),
            success_rate: summary.success_rate,
            collection_rate: summary.collection_rate,
            total_records: summary.record_count,
            average_amount: summary.average_amount,
            total_cobrado: Fixed::new(summary.total_cobrado, 2),
            success_tier: PerformanceTier::for_success_rate(summary.success_rate),
            collection_tier: PerformanceTier::for_collection_rate(summary.collection_rate),
        }
    }
}

pub fn comparison_matrix(summaries: &[StrategySummary]) -> Vec<ComparisonRow> {
    summaries.iter().map(ComparisonRow::from).collect()
}

/// Everything the transform step produces; consumed by the load step.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyReport {
    pub generated_at: DateTime<Utc>,
    pub source: DataSource,
    pub overview: PortfolioOverview,
    pub strategies: Vec<StrategySummary>,
    pub comparison: Vec<ComparisonRow>,
    #[serde(skip)]
    pub csv_output: String,
    #[serde(skip)]
    pub tsv_output: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_formats_and_serializes_as_string() {
        let rate = Fixed::percent(100.0);
        assert_eq!(rate.to_string(), "100.00");
        assert_eq!(serde_json::to_string(&rate).unwrap(), r#""100.00""#);

        assert_eq!(Fixed::new(12333.333, 0).to_string(), "12333");
        assert_eq!(Fixed::zero(2).to_string(), "0.00");
        assert_eq!(rate.value(), 100.0);
    }

    #[test]
    fn test_fixed_rounds_ties_up() {
        assert_eq!(Fixed::new(100.5, 0).to_string(), "101");
        assert_eq!(Fixed::new(2.5, 0).to_string(), "3");
        assert_eq!(Fixed::new(100.125, 2).to_string(), "100.13");
        assert_eq!(Fixed::new(-2.5, 0).to_string(), "-3");
        assert_eq!(Fixed::ratio_percent(1.0, 800.0).to_string(), "0.13");
        // 1.005 實際上略小於 1.005
        assert_eq!(Fixed::new(1.005, 2).to_string(), "1.00");
        assert_eq!(Fixed::new(100.125, 2).rounded(), 100.13);
    }

    #[test]
    fn test_ratio_percent_guards_zero_denominator() {
        assert_eq!(Fixed::ratio_percent(5.0, 0.0).to_string(), "0.00");
        assert_eq!(Fixed::ratio_percent(5.0, -10.0).to_string(), "0.00");
        assert_eq!(Fixed::ratio_percent(1.0, 3.0).to_string(), "33.33");
    }

    #[test]
    fn test_performance_tiers() {
        assert_eq!(
            PerformanceTier::for_success_rate(Fixed::percent(12.0)),
            PerformanceTier::Excellent
        );
        assert_eq!(
            PerformanceTier::for_success_rate(Fixed::percent(5.0)),
            PerformanceTier::Good
        );
        assert_eq!(
            PerformanceTier::for_success_rate(Fixed::percent(1.5)),
            PerformanceTier::Fair
        );
        assert_eq!(
            PerformanceTier::for_success_rate(Fixed::percent(0.4)),
            PerformanceTier::Poor
        );

        assert_eq!(
            PerformanceTier::for_collection_rate(Fixed::percent(20.0)),
            PerformanceTier::Excellent
        );
        assert_eq!(
            PerformanceTier::for_collection_rate(Fixed::percent(12.5)),
            PerformanceTier::Good
        );
        assert_eq!(
            PerformanceTier::for_collection_rate(Fixed::percent(4.99)),
            PerformanceTier::Poor
        );
    }

    #[test]
    fn test_comparison_row_projection() {
        let summary = StrategySummary {
            id: "ACH_BBVA".to_string(),
            name: "ACH - BBVA".to_string(),
            tipo_envio: "ACH".to_string(),
            banco: "BBVA".to_string(),
            record_count: 4,
            total_monto: 40000.0,
            total_cobrado: 10000.5,
            success_count: 1,
            success_rate: Fixed::percent(25.0),
            collection_rate: Fixed::ratio_percent(10000.5, 40000.0),
            average_amount: Fixed::new(10000.0, 2),
        };

        let matrix = comparison_matrix(std::slice::from_ref(&summary));
        assert_eq!(matrix.len(), 1);
        assert_eq!(matrix[0].strategy, "ACH - BBVA");
        assert_eq!(matrix[0].total_records, 4);
        assert_eq!(matrix[0].total_cobrado.to_string(), "10000.50");
        assert_eq!(matrix[0].success_tier, PerformanceTier::Excellent);
        assert_eq!(matrix[0].collection_tier, PerformanceTier::Excellent);
    }
}
