use regex::Regex;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;

pub const FIELD_TIPO_ENVIO: &str = "TipoEnvio";
pub const FIELD_BANCO: &str = "BancoSimplificado";
pub const FIELD_MONTO_COBRAR: &str = "montoCobrar";
pub const FIELD_MONTO_EXIGIBLE: &str = "montoExigible";
pub const FIELD_MONTO_COBRADO: &str = "montoCobrado";
pub const FIELD_COBRO_EXITOSO: &str = "CobroExitoso";
pub const FIELD_RESPUESTA_BANCO: &str = "idRespuestaBanco";

/// Bank response codes that mark an attempt as approved.
pub const SUCCESS_RESPONSE_CODES: [&str; 4] = ["OK", "SUCCESS", "EXITOSO", "APROBADO"];

/// One accepted CSV data line: header name -> value, in column order.
///
/// Serialized as a JSON object so the parsed dataset can be cached and
/// reloaded without re-reading the CSV.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    fields: Vec<(String, String)>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// 相同欄名時以後者覆蓋，位置保持首次出現的欄位
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        let column = column.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(name, _)| *name == column) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = RawRecord::new();
        for (column, value) in iter {
            record.insert(column, value);
        }
        record
    }
}

impl Serialize for RawRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for RawRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(RawRecordVisitor)
    }
}

struct RawRecordVisitor;

impl<'de> Visitor<'de> for RawRecordVisitor {
    type Value = RawRecord;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an object of column names to scalar values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut record = RawRecord::new();
        while let Some((column, value)) = access.next_entry::<String, serde_json::Value>()? {
            record.insert(column, scalar_to_string(value));
        }
        Ok(record)
    }
}

/// 快取資料可能混有布林或數字，統一轉成字串
fn scalar_to_string(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

/// Where a dataset came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "location", rename_all = "lowercase")]
pub enum DataSource {
    Cache(String),
    File(String),
    Url(String),
    Sample,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Cache(key) => write!(f, "cache '{}'", key),
            DataSource::File(path) => write!(f, "file {}", path),
            DataSource::Url(url) => write!(f, "url {}", url),
            DataSource::Sample => f.write_str("sample data"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Dataset {
    pub records: Vec<RawRecord>,
    pub source: DataSource,
}

/// Explicit success flag as exported by the collection system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SuccessFlag {
    True,
    False,
    Unknown,
}

impl SuccessFlag {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "true" | "1" => SuccessFlag::True,
            "false" | "0" => SuccessFlag::False,
            _ => SuccessFlag::Unknown,
        }
    }

    pub fn is_true(self) -> bool {
        self == SuccessFlag::True
    }
}

static NUMBER_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?").expect("number prefix regex")
});

/// Reads the longest leading decimal number of `raw`, ignoring surrounding
/// whitespace. Returns `None` when nothing numeric leads the value or the
/// result is not finite.
pub fn parse_number(raw: &str) -> Option<f64> {
    let matched = NUMBER_PREFIX.find(raw.trim_start())?;
    matched
        .as_str()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

/// 零值、空字串與無法解析皆視為缺值
fn non_zero_amount(raw: Option<&str>) -> Option<f64> {
    raw.and_then(parse_number).filter(|value| *value != 0.0)
}

/// Typed view of a [`RawRecord`] with one documented default per field:
/// text fields default to `""`, amounts to `0.0`, the flag to `Unknown`.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionAttempt<'a> {
    pub tipo_envio: &'a str,
    pub banco: &'a str,
    pub monto_base: f64,
    pub monto_cobrado: f64,
    pub cobro_exitoso: SuccessFlag,
    pub respuesta_banco: Option<&'a str>,
}

impl<'a> CollectionAttempt<'a> {
    pub fn from_record(record: &'a RawRecord) -> Self {
        // montoCobrar 優先，缺值時才退回 montoExigible
        let monto_base = non_zero_amount(record.get(FIELD_MONTO_COBRAR))
            .or_else(|| non_zero_amount(record.get(FIELD_MONTO_EXIGIBLE)))
            .unwrap_or(0.0);

        Self {
            tipo_envio: record.get(FIELD_TIPO_ENVIO).unwrap_or(""),
            banco: record.get(FIELD_BANCO).unwrap_or(""),
            monto_base,
            monto_cobrado: non_zero_amount(record.get(FIELD_MONTO_COBRADO)).unwrap_or(0.0),
            cobro_exitoso: record
                .get(FIELD_COBRO_EXITOSO)
                .map(SuccessFlag::parse)
                .unwrap_or(SuccessFlag::Unknown),
            respuesta_banco: record
                .get(FIELD_RESPUESTA_BANCO)
                .filter(|code| !code.is_empty()),
        }
    }

    pub fn strategy_key(&self) -> String {
        format!("{}_{}", self.tipo_envio, self.banco)
    }

    pub fn strategy_name(&self) -> String {
        format!("{} - {}", self.tipo_envio, self.banco)
    }

    pub fn has_approved_response(&self) -> bool {
        self.respuesta_banco.is_some_and(|code| {
            SUCCESS_RESPONSE_CODES
                .iter()
                .any(|approved| code.eq_ignore_ascii_case(approved))
        })
    }

    /// Any single signal is enough: the explicit flag, money actually
    /// collected, or an approving bank response.
    pub fn is_successful(&self) -> bool {
        self.cobro_exitoso.is_true() || self.monto_cobrado > 0.0 || self.has_approved_response()
    }
}
