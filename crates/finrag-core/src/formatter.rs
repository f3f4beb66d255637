//! Typed financial items and their normalization into [`Record`]s.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::types::{Metadata, Record};

/// Category of incoming data; doubles as the target namespace name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataType {
    News,
    Earnings,
    StockData,
    Sentiment,
    Other(String),
}

impl DataType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::News => "news",
            Self::Earnings => "earnings",
            Self::StockData => "stock_data",
            Self::Sentiment => "sentiment",
            Self::Other(s) => s,
        }
    }

    pub fn namespace(&self) -> &str {
        self.as_str()
    }
}

impl From<&str> for DataType {
    fn from(s: &str) -> Self {
        match s {
            "news" => Self::News,
            "earnings" => Self::Earnings,
            "stock_data" => Self::StockData,
            "sentiment" => Self::Sentiment,
            other => Self::Other(other.to_string()),
        }
    }
}

impl FromStr for DataType {
    type Err = std::convert::Infallible;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every field is raw JSON: feeds disagree on whether `symbol` is `"2330"`
/// or `2330`, and formatting must accept both.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsItem {
    pub title: Option<Value>,
    pub summary: Option<Value>,
    pub source: Option<Value>,
    pub link: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EarningsItem {
    pub name: Option<Value>,
    pub symbol: Option<Value>,
    pub date: Option<Value>,
    pub eps_estimate: Option<Value>,
    pub reported_eps: Option<Value>,
    pub surprise_pct: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StockQuote {
    pub name: Option<Value>,
    pub symbol: Option<Value>,
    pub country: Option<Value>,
    pub price: Option<Value>,
    pub change_pct: Option<Value>,
    pub volume: Option<Value>,
    pub market_cap: Option<Value>,
}

/// `key_indicators` must be an array when present. Entries are usually
/// `{"headline": ...}` objects; bare scalars are taken as the headline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentimentItem {
    pub overall_sentiment: Option<Value>,
    pub sentiment_score: Option<Value>,
    pub key_indicators: Option<Vec<Value>>,
}

impl SentimentItem {
    pub fn headlines(&self) -> Vec<String> {
        self.key_indicators
            .iter()
            .flatten()
            .map(|k| match k {
                Value::Object(fields) => render(fields.get("headline")),
                other => render(Some(other)),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FinancialItem {
    News(NewsItem),
    Earnings(EarningsItem),
    StockData(StockQuote),
    Sentiment(SentimentItem),
    Generic(Value),
}

impl FinancialItem {
    /// Interprets a raw JSON item according to `data_type`. Unknown data types
    /// accept any JSON value.
    pub fn from_json(data_type: &DataType, value: Value) -> Result<Self> {
        if let DataType::Other(_) = data_type {
            return Ok(Self::Generic(value));
        }
        if !value.is_object() {
            return Err(Error::InvalidRecordShape(format!("{data_type} item must be a JSON object, got {}", kind_of(&value))));
        }
        let shape = |e: serde_json::Error| Error::InvalidRecordShape(format!("{data_type} item: {e}"));
        Ok(match data_type {
            DataType::News => Self::News(serde_json::from_value(value).map_err(shape)?),
            DataType::Earnings => Self::Earnings(serde_json::from_value(value).map_err(shape)?),
            DataType::StockData => Self::StockData(serde_json::from_value(value).map_err(shape)?),
            DataType::Sentiment => Self::Sentiment(serde_json::from_value(value).map_err(shape)?),
            DataType::Other(_) => Self::Generic(value),
        })
    }
}

fn kind_of(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Renders a scalar for interpolation: strings verbatim, null/missing as "".
fn render(v: Option<&Value>) -> String {
    match v {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn text(v: &Option<Value>) -> String {
    render(v.as_ref())
}

/// Metadata keeps the item's own value; a missing field becomes "".
fn field(v: &Option<Value>) -> Value {
    v.clone().unwrap_or_else(|| Value::from(""))
}

fn meta(entries: impl IntoIterator<Item = (&'static str, Value)>) -> Metadata {
    entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

fn opt_value(v: &Option<Value>) -> Value {
    v.clone().unwrap_or(Value::Null)
}

/// Turns an item into a `(content, metadata)` record. Total: missing fields
/// render empty. `data_type` only matters for [`FinancialItem::Generic`],
/// whose metadata `type` is the data type string.
pub fn format(item: &FinancialItem, data_type: &DataType) -> Record {
    match item {
        FinancialItem::News(n) => Record::new(
            format!("Title: {}\n\nSummary: {}\n\nSource: {}", text(&n.title), text(&n.summary), text(&n.source)),
            meta([
                ("type", Value::from("news")),
                ("source", field(&n.source)),
                ("link", field(&n.link)),
                ("title", field(&n.title)),
            ]),
        ),
        FinancialItem::Earnings(e) => {
            let company = render(e.name.as_ref().or(e.symbol.as_ref()));
            Record::new(
                format!(
                    "Company: {}\n\nSymbol: {}\n\nEPS Estimate: {}\n\nReported EPS: {}\n\nSurprise: {}%",
                    company,
                    text(&e.symbol),
                    render(e.eps_estimate.as_ref()),
                    render(e.reported_eps.as_ref()),
                    render(e.surprise_pct.as_ref()),
                ),
                meta([
                    ("type", Value::from("earnings")),
                    ("symbol", field(&e.symbol)),
                    ("date", field(&e.date)),
                    ("surprise_pct", opt_value(&e.surprise_pct)),
                ]),
            )
        }
        FinancialItem::StockData(q) => {
            let company = render(q.name.as_ref().or(q.symbol.as_ref()));
            Record::new(
                format!(
                    "Company: {}\n\nSymbol: {}\n\nPrice: {}\n\nChange: {}%\n\nVolume: {}\n\nMarket Cap: {}",
                    company,
                    text(&q.symbol),
                    render(q.price.as_ref()),
                    render(q.change_pct.as_ref()),
                    render(q.volume.as_ref()),
                    render(q.market_cap.as_ref()),
                ),
                meta([
                    ("type", Value::from("stock_data")),
                    ("symbol", field(&q.symbol)),
                    ("country", field(&q.country)),
                    ("change_pct", opt_value(&q.change_pct)),
                ]),
            )
        }
        FinancialItem::Sentiment(s) => {
            let headlines = s.headlines().join(", ");
            Record::new(
                format!(
                    "Overall Sentiment: {}\n\nSentiment Score: {}\n\nKey Indicators: {}",
                    text(&s.overall_sentiment),
                    render(s.sentiment_score.as_ref()),
                    headlines,
                ),
                meta([
                    ("type", Value::from("sentiment")),
                    ("sentiment", field(&s.overall_sentiment)),
                    ("score", opt_value(&s.sentiment_score)),
                ]),
            )
        }
        FinancialItem::Generic(v) => Record::new(v.to_string(), meta([("type", Value::from(data_type.as_str()))])),
    }
}
