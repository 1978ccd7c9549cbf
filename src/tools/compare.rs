//! `compare_companies` tool
//!
//! Fetches both profiles, keeps a fixed metric set and renders a side-by-side
//! insight. Every failure becomes an error result; nothing is raised.

use super::ToolResult;
use crate::market_data::{CompanyProfile, MarketDataProvider};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

pub const TOOL_NAME: &str = "compare_companies";

/// Marker used for any metric the provider did not report
pub const NOT_AVAILABLE: &str = "N/A";

/// Arguments accepted by the tool (mirrors its declared JSON schema)
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompareArgs {
    pub ticker1: String,
    pub ticker2: String,
}

/// Fixed metric set extracted for each company
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CompanyMetrics {
    pub short_name: Value,
    pub sector: Value,
    pub market_cap: Value,
    pub current_price: Value,
    pub revenue_growth: Value,
    pub gross_margins: Value,
    pub profit_margins: Value,
    #[serde(rename = "trailingPE")]
    pub trailing_pe: Value,
    pub dividend_yield: Value,
}

impl CompanyMetrics {
    fn from_profile(profile: &CompanyProfile) -> Self {
        let metric = |key: &str| {
            profile
                .get(key)
                .filter(|v| !v.is_null())
                .cloned()
                .unwrap_or_else(|| Value::String(NOT_AVAILABLE.to_string()))
        };

        Self {
            short_name: metric("shortName"),
            sector: metric("sector"),
            market_cap: metric("marketCap"),
            current_price: metric("currentPrice"),
            revenue_growth: metric("revenueGrowth"),
            gross_margins: metric("grossMargins"),
            profit_margins: metric("profitMargins"),
            trailing_pe: metric("trailingPE"),
            dividend_yield: metric("dividendYield"),
        }
    }
}

/// Successful comparison payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComparisonData {
    pub company1: CompanyMetrics,
    pub company2: CompanyMetrics,
    pub insight: String,
}

/// JSON-Schema contract advertised to the model backend
pub fn definition() -> Value {
    json!({
        "type": "function",
        "function": {
            "name": TOOL_NAME,
            "description": "Use this tool to compare two companies' financial performance using Yahoo Finance data.",
            "parameters": {
                "type": "object",
                "properties": {
                    "ticker1": {
                        "type": "string",
                        "description": "Stock ticker symbol of the first company (e.g., 'AAPL')"
                    },
                    "ticker2": {
                        "type": "string",
                        "description": "Stock ticker symbol of the second company (e.g., 'MSFT')"
                    }
                },
                "required": ["ticker1", "ticker2"],
                "additionalProperties": false
            }
        }
    })
}

pub struct CompareCompaniesTool {
    provider: Arc<dyn MarketDataProvider>,
}

impl CompareCompaniesTool {
    pub fn new(provider: Arc<dyn MarketDataProvider>) -> Self {
        Self { provider }
    }

    pub async fn compare(&self, ticker1: &str, ticker2: &str) -> ToolResult {
        let (ticker1, ticker2) = (ticker1.trim(), ticker2.trim());
        if ticker1.is_empty() || ticker2.is_empty() {
            return ToolResult::error("Both ticker symbols must be provided.");
        }

        let (first, second) = tokio::join!(
            self.provider.profile(ticker1),
            self.provider.profile(ticker2)
        );

        let (first, second) = match (first, second) {
            (Ok(first), Ok(second)) => (first, second),
            (Err(e), _) | (_, Err(e)) => {
                warn!(ticker1, ticker2, error = %e, "Market data lookup failed");
                return ToolResult::error(format!("An unexpected error occurred: {}", e));
            }
        };

        let Some(first) = first.filter(has_short_name) else {
            return ToolResult::error(invalid_ticker(ticker1));
        };
        let Some(second) = second.filter(has_short_name) else {
            return ToolResult::error(invalid_ticker(ticker2));
        };

        let company1 = CompanyMetrics::from_profile(&first);
        let company2 = CompanyMetrics::from_profile(&second);
        let insight = render_insight(&company1, &company2);

        info!(ticker1, ticker2, "Comparison data assembled");

        ToolResult::Comparison(ComparisonData {
            company1,
            company2,
            insight,
        })
    }
}

fn has_short_name(profile: &CompanyProfile) -> bool {
    profile.get("shortName").map_or(false, |v| !v.is_null())
}

fn invalid_ticker(ticker: &str) -> String {
    format!(
        "Could not retrieve data for '{}'. Please check the ticker symbol.",
        ticker
    )
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn render_insight(a: &CompanyMetrics, b: &CompanyMetrics) -> String {
    let rows = [
        ("Sector", &a.sector, &b.sector),
        ("Market Cap", &a.market_cap, &b.market_cap),
        ("Profit Margin", &a.profit_margins, &b.profit_margins),
        ("P/E Ratio", &a.trailing_pe, &b.trailing_pe),
        ("Dividend Yield", &a.dividend_yield, &b.dividend_yield),
    ];

    let mut out = format!("{} vs {}\n", display(&a.short_name), display(&b.short_name));
    for (label, left, right) in rows {
        out.push_str(&format!("{}: {} | {}\n", label, display(left), display(right)));
    }
    out
}
