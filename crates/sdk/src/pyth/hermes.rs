use std::fmt;

use reqwest::{Client, IntoUrl, Url};

use super::{Attestation, Identifier, PullOracle};

/// Default base URL for Hermes.
pub const DEFAULT_HERMES_BASE: &str = "https://hermes.pyth.network";

/// The endpoint of price updates at a given publish time.
pub const PRICE_AT: &str = "/v2/updates/price";

/// The endpoint of latest price update.
pub const PRICE_LATEST: &str = "/v2/updates/price/latest";

/// Hermes Client.
#[derive(Debug, Clone)]
pub struct Hermes {
    base: Url,
    client: Client,
}

impl Hermes {
    /// Create a new hermes client with the given base URL.
    pub fn try_new(base: impl IntoUrl) -> crate::Result<Self> {
        Ok(Self {
            base: base.into_url()?,
            client: Client::new(),
        })
    }

    /// Returns the base URL.
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Get the price updates valid as of `publish_time`.
    pub async fn price_updates_at(
        &self,
        feed_ids: impl IntoIterator<Item = &Identifier>,
        publish_time: i64,
        encoding: Option<EncodingType>,
    ) -> crate::Result<PriceUpdate> {
        let url = self.base.join(&format!("{PRICE_AT}/{publish_time}"))?;
        self.get(url, get_query(feed_ids, encoding)).await
    }

    /// Get latest price updates.
    pub async fn latest_price_updates(
        &self,
        feed_ids: impl IntoIterator<Item = &Identifier>,
        encoding: Option<EncodingType>,
    ) -> crate::Result<PriceUpdate> {
        let url = self.base.join(PRICE_LATEST)?;
        self.get(url, get_query(feed_ids, encoding)).await
    }

    async fn get(
        &self,
        url: Url,
        params: Vec<(&'static str, String)>,
    ) -> crate::Result<PriceUpdate> {
        tracing::debug!(%url, ?params, "requesting price updates");
        let response = self.client.get(url).query(&params).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(crate::Error::no_attestation_data(format!(
                "hermes responded with {status}: {body}"
            )));
        }
        serde_json::from_str(&body).map_err(|err| {
            crate::Error::no_attestation_data(format!("malformed hermes response: {err}"))
        })
    }
}

impl PullOracle for Hermes {
    async fn fetch_attestation(
        &self,
        feed_id: &Identifier,
        publish_time: i64,
    ) -> crate::Result<Attestation> {
        let update = self
            .price_updates_at([feed_id], publish_time, Some(EncodingType::Base64))
            .await?;
        for parsed in update.parsed() {
            let price = parsed.price();
            tracing::debug!(
                feed_id = parsed.id(),
                price = price.price(),
                conf = price.conf(),
                expo = price.expo(),
                publish_time = price.publish_time(),
                "fetched price update"
            );
        }
        let data = update.binary().decode()?;
        if data.is_empty() {
            return Err(crate::Error::no_attestation_data(
                "hermes returned an empty data array",
            ));
        }
        Ok(Attestation::new(*feed_id, publish_time, data))
    }
}

/// Price Update.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct PriceUpdate {
    binary: BinaryPriceUpdate,
    #[serde(default)]
    parsed: Vec<ParsedPriceUpdate>,
}

impl PriceUpdate {
    /// Get the parsed price udpate.
    pub fn parsed(&self) -> &[ParsedPriceUpdate] {
        &self.parsed
    }

    /// Min timestamp.
    pub fn min_timestamp(&self) -> Option<i64> {
        self.parsed
            .iter()
            .map(|update| update.price.publish_time)
            .min()
    }

    /// Get the binary price update.
    pub fn binary(&self) -> &BinaryPriceUpdate {
        &self.binary
    }
}

/// Encoded accumulator update datas.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BinaryPriceUpdate {
    encoding: EncodingType,
    #[serde(default)]
    data: Vec<String>,
}

impl BinaryPriceUpdate {
    /// Get the encoding.
    pub fn encoding(&self) -> EncodingType {
        self.encoding
    }

    /// Decode the datas.
    pub fn decode(&self) -> crate::Result<Vec<Vec<u8>>> {
        self.data
            .iter()
            .map(|data| match self.encoding {
                EncodingType::Base64 => crate::utils::decode_base64(data).map_err(|err| {
                    crate::Error::no_attestation_data(format!("undecodable update data: {err}"))
                }),
                EncodingType::Hex => hex::decode(data.trim_start_matches("0x")).map_err(|err| {
                    crate::Error::no_attestation_data(format!("undecodable update data: {err}"))
                }),
            })
            .collect()
    }
}

/// Encoding of the binary price update.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub enum EncodingType {
    /// Hex.
    #[default]
    #[serde(rename = "hex")]
    Hex,
    /// Base64.
    #[serde(rename = "base64")]
    Base64,
}

impl fmt::Display for EncodingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hex => write!(f, "hex"),
            Self::Base64 => write!(f, "base64"),
        }
    }
}

/// Parsed price update.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct ParsedPriceUpdate {
    id: String,
    price: Price,
    ema_price: Price,
    #[serde(default)]
    metadata: Metadata,
}

impl ParsedPriceUpdate {
    /// Get the feed id.
    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    /// Get price.
    pub fn price(&self) -> &Price {
        &self.price
    }

    /// Get EMA Price.
    pub fn ema_price(&self) -> &Price {
        &self.ema_price
    }

    /// Get metadata.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }
}

/// Price.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct Price {
    /// Price.
    #[serde(with = "pyth_sdk::utils::as_string")]
    price: i64,
    /// Confidence.
    #[serde(with = "pyth_sdk::utils::as_string")]
    conf: u64,
    /// Exponent of the price.
    expo: i32,
    /// Publish unix timestamp (secs) of the price.
    publish_time: i64,
}

impl Price {
    /// Get (raw) price.
    pub fn price(&self) -> i64 {
        self.price
    }

    /// Get the confidence of the price.
    pub fn conf(&self) -> u64 {
        self.conf
    }

    /// Get the exponent of the price.
    pub fn expo(&self) -> i32 {
        self.expo
    }

    /// Get the publish time (unix timestamp in secs).
    pub fn publish_time(&self) -> i64 {
        self.publish_time
    }
}

/// Metadata of a price update.
#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct Metadata {
    slot: Option<u64>,
    proof_available_time: Option<i64>,
    prev_publish_time: Option<i64>,
}

impl Metadata {
    /// Get slot.
    pub fn slot(&self) -> Option<u64> {
        self.slot
    }

    /// Get proof available time.
    pub fn proof_available_time(&self) -> Option<i64> {
        self.proof_available_time
    }

    /// Get previous publish time.
    pub fn prev_publish_time(&self) -> Option<i64> {
        self.prev_publish_time
    }
}

fn get_query<'a>(
    feed_ids: impl IntoIterator<Item = &'a Identifier>,
    encoding: Option<EncodingType>,
) -> Vec<(&'static str, String)> {
    let encoding = encoding.unwrap_or(EncodingType::Base64);
    feed_ids
        .into_iter()
        .map(|id| ("ids[]", id.to_hex()))
        .chain([
            ("encoding", encoding.to_string()),
            ("parsed", "true".to_string()),
        ])
        .collect()
}
