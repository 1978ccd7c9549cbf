//! Market data provider
//!
//! Looks up company profiles by ticker. The Yahoo Finance implementation reads
//! the `quoteSummary` endpoint and flattens its modules into a single mapping
//! keyed like the Yahoo `info` dictionary (`shortName`, `marketCap`, ...).

use crate::error::AgentError;
use crate::Result;
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub const DEFAULT_BASE_URL: &str = "https://query2.finance.yahoo.com";

/// Hands out the session cookie the crumb is bound to
pub const DEFAULT_COOKIE_URL: &str = "https://fc.yahoo.com";

const QUOTE_SUMMARY_MODULES: &str = "price,summaryProfile,financialData,summaryDetail";

/// Flat mapping of metric name to value for one company
pub type CompanyProfile = Map<String, Value>;

/// Trait for a market data source
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// `Ok(None)` when the provider has no profile for the symbol.
    async fn profile(&self, symbol: &str) -> Result<Option<CompanyProfile>>;
}

/// Yahoo Finance `quoteSummary` client.
///
/// Yahoo only answers quote requests that carry a session cookie and the
/// matching `crumb` query parameter. The first lookup performs that handshake;
/// the crumb is cached and fetched again once when Yahoo answers 401.
#[derive(Clone)]
pub struct YahooFinanceProvider {
    client: Client,
    base_url: String,
    cookie_url: String,
    crumb: Arc<Mutex<Option<String>>>,
}

impl YahooFinanceProvider {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(8)
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .cookie_store(true)
            .user_agent("Mozilla/5.0 (compatible; company-comparison-agent)")
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            cookie_url: DEFAULT_COOKIE_URL.to_string(),
            crumb: Arc::new(Mutex::new(None)),
        })
    }

    pub fn with_cookie_url(mut self, cookie_url: impl Into<String>) -> Self {
        self.cookie_url = cookie_url.into();
        self
    }

    /// `base_url` joined with path segments; each segment is percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url).map_err(|e| {
            AgentError::ConfigError(format!("Invalid market data URL '{}': {}", self.base_url, e))
        })?;

        url.path_segments_mut()
            .map_err(|_| {
                AgentError::ConfigError(format!(
                    "Market data URL '{}' cannot take a path",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(segments);

        Ok(url)
    }

    async fn crumb(&self, refresh: bool) -> Result<String> {
        let mut cached = self.crumb.lock().await;
        if !refresh {
            if let Some(crumb) = cached.as_ref() {
                return Ok(crumb.clone());
            }
        }

        let crumb = self.fetch_crumb().await?;
        *cached = Some(crumb.clone());
        Ok(crumb)
    }

    async fn fetch_crumb(&self) -> Result<String> {
        // The cookie endpoint answers 404 while still setting the cookie.
        if let Err(e) = self.client.get(&self.cookie_url).send().await {
            warn!(url = %self.cookie_url, error = %e, "Session cookie request failed");
        }

        let response = self
            .client
            .get(self.endpoint(&["v1", "test", "getcrumb"])?)
            .send()
            .await
            .map_err(|e| AgentError::DataProviderError(format!("Crumb request failed: {}", e)))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let crumb = body.trim();

        if !status.is_success() || crumb.is_empty() {
            return Err(AgentError::DataProviderError(format!(
                "Crumb request returned {}: {}",
                status, crumb
            )));
        }

        info!("Market data session established");
        Ok(crumb.to_string())
    }

    async fn quote_summary(&self, symbol: &str, crumb: &str) -> Result<Response> {
        let url = self.endpoint(&["v10", "finance", "quoteSummary", symbol])?;

        self.client
            .get(url)
            .query(&[("modules", QUOTE_SUMMARY_MODULES), ("crumb", crumb)])
            .send()
            .await
            .map_err(|e| {
                AgentError::DataProviderError(format!(
                    "Quote summary request failed for {}: {}",
                    symbol, e
                ))
            })
    }
}

#[async_trait]
impl MarketDataProvider for YahooFinanceProvider {
    async fn profile(&self, symbol: &str) -> Result<Option<CompanyProfile>> {
        debug!(symbol, "Fetching quote summary");

        let crumb = self.crumb(false).await?;
        let mut response = self.quote_summary(symbol, &crumb).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            warn!(symbol, "Crumb rejected, refreshing session");
            let crumb = self.crumb(true).await?;
            response = self.quote_summary(symbol, &crumb).await?;
        }

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            warn!(symbol, "No quote summary for symbol");
            return Ok(None);
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AgentError::DataProviderError(format!(
                "Market data API returned {} for {}: {}",
                status, symbol, error_text
            )));
        }

        let body = response.json::<Value>().await.map_err(|e| {
            AgentError::DataProviderError(format!("Invalid JSON response: {}", e))
        })?;

        Ok(flatten_quote_summary(&body))
    }
}

/// Merge every module of the first `quoteSummary` result into one mapping.
///
/// Formatted numbers (`{"raw": 0.25, "fmt": "25.00%"}`) collapse to their raw
/// value; empty objects mean "absent" and are dropped.
fn flatten_quote_summary(body: &Value) -> Option<CompanyProfile> {
    let result = body
        .get("quoteSummary")?
        .get("result")?
        .as_array()?
        .first()?
        .as_object()?;

    let mut profile = CompanyProfile::new();
    for module in result.values().filter_map(Value::as_object) {
        for (key, value) in module {
            if let Some(value) = unwrap_metric(value) {
                profile.entry(key.clone()).or_insert(value);
            }
        }
    }

    if profile.is_empty() {
        None
    } else {
        Some(profile)
    }
}

fn unwrap_metric(value: &Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Object(map) if map.is_empty() => None,
        Value::Object(map) => map.get("raw").cloned(),
        other => Some(other.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, path_regex, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn apple_summary() -> Value {
        json!({
            "quoteSummary": {
                "result": [{
                    "price": {
                        "shortName": "Apple Inc.",
                        "marketCap": {"raw": 3_000_000_000_000_i64, "fmt": "3T"}
                    },
                    "summaryProfile": {"sector": "Technology"},
                    "financialData": {
                        "currentPrice": {"raw": 190.5, "fmt": "190.50"},
                        "profitMargins": {"raw": 0.25, "fmt": "25.00%"},
                        "revenueGrowth": {}
                    },
                    "summaryDetail": {
                        "trailingPE": {"raw": 29.1, "fmt": "29.10"},
                        "dividendYield": {"raw": 0.005, "fmt": "0.50%"}
                    }
                }],
                "error": null
            }
        })
    }

    #[test]
    fn test_flatten_quote_summary() {
        let profile = flatten_quote_summary(&apple_summary()).unwrap();

        assert_eq!(profile["shortName"], "Apple Inc.");
        assert_eq!(profile["sector"], "Technology");
        assert_eq!(profile["marketCap"], json!(3_000_000_000_000_i64));
        assert_eq!(profile["profitMargins"], json!(0.25));
        assert!(!profile.contains_key("revenueGrowth"));
    }

    #[test]
    fn test_flatten_empty_result() {
        let body = json!({"quoteSummary": {"result": null, "error": {"code": "Not Found"}}});
        assert!(flatten_quote_summary(&body).is_none());
    }

    const CRUMB: &str = "crumb-1";

    /// Server with the cookie and crumb endpoints of a Yahoo session
    async fn yahoo_server() -> MockServer {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/session"))
            .respond_with(ResponseTemplate::new(404).insert_header("set-cookie", "A3=session; Path=/"))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/v1/test/getcrumb"))
            .respond_with(ResponseTemplate::new(200).set_body_string(CRUMB))
            .mount(&server)
            .await;

        server
    }

    fn provider(server: &MockServer) -> YahooFinanceProvider {
        YahooFinanceProvider::new(&server.uri())
            .unwrap()
            .with_cookie_url(format!("{}/session", server.uri()))
    }

    #[tokio::test]
    async fn test_profile_fetch() {
        let server = yahoo_server().await;

        Mock::given(method("GET"))
            .and(path("/v10/finance/quoteSummary/AAPL"))
            .and(query_param("modules", QUOTE_SUMMARY_MODULES))
            .and(query_param("crumb", CRUMB))
            .and(header("cookie", "A3=session"))
            .respond_with(ResponseTemplate::new(200).set_body_json(apple_summary()))
            .expect(1)
            .mount(&server)
            .await;

        let provider = provider(&server);
        let profile = provider.profile("AAPL").await.unwrap().unwrap();

        assert_eq!(profile["shortName"], "Apple Inc.");
        assert_eq!(profile["trailingPE"], json!(29.1));
    }

    #[tokio::test]
    async fn test_crumb_is_cached_between_lookups() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/test/getcrumb"))
            .respond_with(ResponseTemplate::new(200).set_body_string(CRUMB))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path_regex("^/v10/finance/quoteSummary/"))
            .and(query_param("crumb", CRUMB))
            .respond_with(ResponseTemplate::new(200).set_body_json(apple_summary()))
            .expect(2)
            .mount(&server)
            .await;

        let provider = provider(&server);
        assert!(provider.profile("AAPL").await.unwrap().is_some());
        assert!(provider.profile("MSFT").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_rejected_crumb_is_refreshed_once() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/test/getcrumb"))
            .respond_with(ResponseTemplate::new(200).set_body_string("stale"))
            .up_to_n_times(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/v1/test/getcrumb"))
            .respond_with(ResponseTemplate::new(200).set_body_string("fresh"))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/v10/finance/quoteSummary/AAPL"))
            .and(query_param("crumb", "stale"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Invalid Crumb"))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/v10/finance/quoteSummary/AAPL"))
            .and(query_param("crumb", "fresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(apple_summary()))
            .expect(1)
            .mount(&server)
            .await;

        let profile = provider(&server).profile("AAPL").await.unwrap().unwrap();
        assert_eq!(profile["shortName"], "Apple Inc.");
    }

    #[tokio::test]
    async fn test_missing_crumb_is_provider_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/test/getcrumb"))
            .respond_with(ResponseTemplate::new(429).set_body_string("Too Many Requests"))
            .mount(&server)
            .await;

        let err = provider(&server).profile("AAPL").await.unwrap_err();
        assert!(matches!(err, AgentError::DataProviderError(_)));
        assert!(err.to_string().contains("429"));
    }

    #[tokio::test]
    async fn test_symbol_is_escaped_in_path() {
        let server = yahoo_server().await;

        Mock::given(method("GET"))
            .and(path("/v10/finance/quoteSummary/AAPL"))
            .respond_with(ResponseTemplate::new(200).set_body_json(apple_summary()))
            .expect(0)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path_regex("^/v10/finance/quoteSummary/"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let provider = provider(&server);
        assert!(provider.profile("AAPL#NOTREAL").await.unwrap().is_none());
        assert!(provider.profile("AAPL?modules=price").await.unwrap().is_none());
        assert!(provider.profile("AAPL/../MSFT").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_symbol_is_none() {
        let server = yahoo_server().await;

        Mock::given(method("GET"))
            .and(path("/v10/finance/quoteSummary/BOGUSTICKER"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "quoteSummary": {
                    "result": null,
                    "error": {"code": "Not Found", "description": "Quote not found for symbol: BOGUSTICKER"}
                }
            })))
            .mount(&server)
            .await;

        assert!(provider(&server).profile("BOGUSTICKER").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_server_error_is_provider_error() {
        let server = yahoo_server().await;

        Mock::given(method("GET"))
            .and(path_regex("^/v10/finance/quoteSummary/"))
            .respond_with(ResponseTemplate::new(503).set_body_string("<html>Service Unavailable</html>"))
            .mount(&server)
            .await;

        let err = provider(&server).profile("AAPL").await.unwrap_err();

        assert!(matches!(err, AgentError::DataProviderError(_)));
        let message = err.to_string();
        assert!(message.contains("503"));
        assert!(message.contains("Service Unavailable"));
        assert!(!message.contains("Invalid JSON"));
    }
}
