//! SX.bet REST API client and the order source abstraction.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use super::types::{League, Market, MarketData};
use crate::config::Config;
use crate::error::MarketError;
use crate::metrics;
use crate::orderbook::Order;

/// Market hashes per `/orders` request.
const ORDERS_BATCH_SIZE: usize = 20;

/// Provides full order sets for markets.
///
/// Each returned order belongs to one of the requested markets; callers group
/// them by `market_id` and treat every group as a full replacement.
#[async_trait]
pub trait OrderSource: Send + Sync {
    /// Fetch every resting order for the given markets.
    async fn fetch_orders(&self, market_ids: &[String]) -> Result<Vec<Order>, MarketError>;
}

/// Response envelope used by every endpoint.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ActiveMarkets {
    #[serde(default)]
    markets: Vec<MarketData>,
}

/// Order as returned by the `/orders` endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiOrder {
    /// Order hash.
    pub order_hash: String,
    /// Market hash.
    pub market_hash: String,
    /// Whether the maker backs outcome one.
    pub is_maker_betting_outcome_one: bool,
    /// Maker implied probability numerator (decimal string over 1e20).
    pub percentage_odds: Option<String>,
    /// Maker stake in base token minor units.
    pub total_bet_size: String,
    /// Filled portion of the maker stake.
    pub fill_amount: Option<String>,
}

impl TryFrom<ApiOrder> for Order {
    type Error = String;

    fn try_from(raw: ApiOrder) -> Result<Self, Self::Error> {
        fn int(field: &str, value: &str) -> Result<i128, String> {
            value
                .trim()
                .parse()
                .map_err(|_| format!("{field} '{value}' is not an integer"))
        }

        let implied_probability = raw
            .percentage_odds
            .as_deref()
            .map(|v| int("percentageOdds", v))
            .transpose()?;
        let total_size = int("totalBetSize", &raw.total_bet_size)?;
        let filled_size = match raw.fill_amount.as_deref() {
            Some(v) => int("fillAmount", v)?,
            None => 0,
        };

        Ok(Order {
            order_id: raw.order_hash,
            market_id: raw.market_hash,
            maker_is_betting_outcome_one: raw.is_maker_betting_outcome_one,
            implied_probability,
            total_size,
            filled_size,
        })
    }
}

/// SX.bet REST API client.
#[derive(Debug, Clone)]
pub struct SxBetClient {
    /// HTTP client for API requests.
    http: reqwest::Client,
    /// Base URL of the REST API.
    base_url: String,
    /// Token orders are filtered by.
    base_token: String,
    /// Sport scanned.
    sport_id: u32,
    /// Only request main-line markets.
    only_main_line: bool,
    /// Maximum in-flight order requests.
    max_concurrent_requests: usize,
}

impl SxBetClient {
    /// Create a new client from config.
    pub fn new(config: &Config) -> Result<Self, MarketError> {
        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(key) = config.sxbet_api_key.as_deref() {
            let value = reqwest::header::HeaderValue::from_str(key)
                .map_err(|e| MarketError::ParseError(format!("invalid API key header: {e}")))?;
            headers.insert("x-api-key", value);
        }

        let http = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .connect_timeout(Duration::from_secs(5))
            .tcp_nodelay(true)
            .pool_idle_timeout(Duration::from_secs(90))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            base_url: config.sxbet_api_url.trim_end_matches('/').to_string(),
            base_token: config.base_token.clone(),
            sport_id: config.sport_id,
            only_main_line: config.only_main_line,
            max_concurrent_requests: config.max_concurrent_requests.max(1),
        })
    }

    /// Get the REST base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET an endpoint and unwrap its `{status, data}` envelope.
    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<T, MarketError> {
        let start = Instant::now();
        let url = format!("{}{}", self.base_url, endpoint);

        let result = async {
            let response = self.http.get(&url).query(query).send().await.map_err(|e| {
                MarketError::RequestFailed {
                    endpoint: endpoint.to_string(),
                    reason: e.to_string(),
                }
            })?;

            if !response.status().is_success() {
                return Err(MarketError::RequestFailed {
                    endpoint: endpoint.to_string(),
                    reason: format!("HTTP {}", response.status()),
                });
            }

            let envelope: Envelope<T> = response.json().await.map_err(|e| {
                MarketError::ParseError(format!("{endpoint}: {e}"))
            })?;

            if envelope.status != "success" {
                return Err(MarketError::ApiStatus {
                    endpoint: endpoint.to_string(),
                    status: envelope.status,
                });
            }

            envelope
                .data
                .ok_or_else(|| MarketError::ParseError(format!("{endpoint}: missing data")))
        }
        .await;

        metrics::record_http_latency(start, endpoint);
        if result.is_err() {
            metrics::inc_http_errors(endpoint);
        }
        result
    }

    /// Fetch active markets for the configured sport.
    #[instrument(skip(self), fields(sport_id = self.sport_id))]
    pub async fn fetch_active_markets(&self) -> Result<Vec<Market>, MarketError> {
        let data: ActiveMarkets = self
            .get(
                "/markets/active",
                &[
                    ("sportIds", self.sport_id.to_string()),
                    ("onlyMainLine", self.only_main_line.to_string()),
                ],
            )
            .await?;

        let total = data.markets.len();
        let markets: Vec<Market> = data
            .markets
            .into_iter()
            .filter_map(MarketData::into_market)
            .collect();

        if markets.len() < total {
            warn!(dropped = total - markets.len(), "Markets without hash or event id");
        }
        debug!(count = markets.len(), "Fetched active markets");

        Ok(markets)
    }

    /// Fetch active leagues for the configured sport.
    #[instrument(skip(self), fields(sport_id = self.sport_id))]
    pub async fn fetch_active_leagues(&self) -> Result<Vec<League>, MarketError> {
        let leagues: Vec<League> = self
            .get("/leagues/active", &[("sportId", self.sport_id.to_string())])
            .await?;
        debug!(count = leagues.len(), "Fetched active leagues");
        Ok(leagues)
    }

    /// Fetch one batch of market hashes.
    async fn fetch_orders_batch(&self, market_ids: &[String]) -> Result<Vec<Order>, MarketError> {
        let raw: Vec<ApiOrder> = self
            .get(
                "/orders",
                &[
                    ("marketHashes", market_ids.join(",")),
                    ("baseToken", self.base_token.clone()),
                ],
            )
            .await?;

        Ok(raw
            .into_iter()
            .filter_map(|order| {
                let order_hash = order.order_hash.clone();
                match Order::try_from(order) {
                    Ok(order) => Some(order),
                    Err(reason) => {
                        warn!(order_id = %order_hash, %reason, "Dropping unparseable order");
                        None
                    }
                }
            })
            .collect())
    }
}

#[async_trait]
impl OrderSource for SxBetClient {
    /// Orders are requested in batches with bounded concurrency. Any failed
    /// batch fails the whole call.
    #[instrument(skip(self, market_ids), fields(markets = market_ids.len()))]
    async fn fetch_orders(&self, market_ids: &[String]) -> Result<Vec<Order>, MarketError> {
        let _timer = metrics::timer_order_fetch();

        let batch_futures: Vec<_> = market_ids
            .chunks(ORDERS_BATCH_SIZE)
            .map(|batch| self.fetch_orders_batch(batch))
            .collect();
        let batches: Vec<Vec<Order>> = stream::iter(batch_futures)
            .buffer_unordered(self.max_concurrent_requests)
            .try_collect()
            .await?;

        let orders: Vec<Order> = batches.into_iter().flatten().collect();
        debug!(count = orders.len(), "Fetched orders");
        Ok(orders)
    }
}
