use crate::domain::model::{CollectionAttempt, RawRecord};
use crate::domain::report::{Fixed, PortfolioOverview, StrategySummary};
use std::collections::HashMap;

pub const DEFAULT_AVERAGE_DECIMALS: usize = 2;

/// Records sharing one (delivery channel, bank) pair.
#[derive(Debug, Clone)]
pub struct StrategyGroup<'a> {
    pub id: String,
    pub name: String,
    pub tipo_envio: String,
    pub banco: String,
    pub records: Vec<&'a RawRecord>,
    pub total_monto: f64,
    pub total_cobrado: f64,
    pub success_count: usize,
}

impl<'a> StrategyGroup<'a> {
    fn open(attempt: &CollectionAttempt<'_>) -> Self {
        Self {
            id: attempt.strategy_key(),
            name: attempt.strategy_name(),
            tipo_envio: attempt.tipo_envio.to_string(),
            banco: attempt.banco.to_string(),
            records: Vec::new(),
            total_monto: 0.0,
            total_cobrado: 0.0,
            success_count: 0,
        }
    }

    fn add(&mut self, record: &'a RawRecord, attempt: &CollectionAttempt<'_>) {
        self.records.push(record);
        self.total_monto += attempt.monto_base;
        self.total_cobrado += attempt.monto_cobrado;
        if attempt.is_successful() {
            self.success_count += 1;
        }
    }

    pub fn success_rate(&self) -> Fixed {
        Fixed::ratio_percent(self.success_count as f64, self.records.len() as f64)
    }

    pub fn collection_rate(&self) -> Fixed {
        Fixed::ratio_percent(self.total_cobrado, self.total_monto)
    }

    pub fn average_amount(&self, decimals: usize) -> Fixed {
        if self.records.is_empty() {
            Fixed::zero(decimals)
        } else {
            Fixed::new(self.total_monto / self.records.len() as f64, decimals)
        }
    }

    pub fn summary(&self, average_decimals: usize) -> StrategySummary {
        StrategySummary {
            id: self.id.clone(),
            name: self.name.clone(),
            tipo_envio: self.tipo_envio.clone(),
            banco: self.banco.clone(),
            record_count: self.records.len(),
            total_monto: self.total_monto,
            total_cobrado: self.total_cobrado,
            success_count: self.success_count,
            success_rate: self.success_rate(),
            collection_rate: self.collection_rate(),
            average_amount: self.average_amount(average_decimals),
        }
    }
}

/// Result of one aggregation run. Groups borrow the input records and are
/// ordered by first appearance of their key.
#[derive(Debug, Clone)]
pub struct StrategyBook<'a> {
    groups: Vec<StrategyGroup<'a>>,
    total_records: usize,
}

impl<'a> StrategyBook<'a> {
    pub fn groups(&self) -> &[StrategyGroup<'a>] {
        &self.groups
    }

    pub fn get(&self, id: &str) -> Option<&StrategyGroup<'a>> {
        self.groups.iter().find(|group| group.id == id)
    }

    pub fn total_records(&self) -> usize {
        self.total_records
    }

    pub fn successful_records(&self) -> usize {
        self.groups.iter().map(|group| group.success_count).sum()
    }

    pub fn summaries(&self, average_decimals: usize) -> Vec<StrategySummary> {
        self.groups
            .iter()
            .map(|group| group.summary(average_decimals))
            .collect()
    }

    pub fn overview(&self) -> PortfolioOverview {
        let total_cobrado: f64 = self.groups.iter().map(|group| group.total_cobrado).sum();
        let total_monto: f64 = self.groups.iter().map(|group| group.total_monto).sum();

        // 各策略成功率的平均值，以四捨五入後的數值計算
        let average_success_rate = if self.groups.is_empty() {
            Fixed::percent(0.0)
        } else {
            let sum: f64 = self
                .groups
                .iter()
                .map(|group| group.success_rate().rounded())
                .sum();
            Fixed::percent(sum / self.groups.len() as f64)
        };

        PortfolioOverview {
            total_records: self.total_records,
            strategy_count: self.groups.len(),
            successful_records: self.successful_records(),
            overall_success_rate: Fixed::ratio_percent(
                self.successful_records() as f64,
                self.total_records as f64,
            ),
            average_success_rate,
            total_monto,
            total_cobrado: Fixed::new(total_cobrado, 2),
        }
    }
}

/// Groups records by `TipoEnvio_BancoSimplificado`, classifies every
/// attempt and accumulates amounts. Never fails: missing or unparseable
/// fields fall back to their defaults.
pub fn aggregate(records: &[RawRecord]) -> StrategyBook<'_> {
    let mut groups: Vec<StrategyGroup<'_>> = Vec::new();
    let mut index_by_key: HashMap<String, usize> = HashMap::new();

    for record in records {
        let attempt = CollectionAttempt::from_record(record);
        let key = attempt.strategy_key();

        let slot = match index_by_key.get(&key) {
            Some(&slot) => slot,
            None => {
                groups.push(StrategyGroup::open(&attempt));
                index_by_key.insert(key, groups.len() - 1);
                groups.len() - 1
            }
        };
        groups[slot].add(record, &attempt);
    }

    for group in &groups {
        tracing::debug!(
            "{}: {}/{} = {}%",
            group.name,
            group.success_count,
            group.records.len(),
            group.success_rate()
        );
    }

    StrategyBook {
        groups,
        total_records: records.len(),
    }
}
