use std::{fmt, str::FromStr};

use url::Url;

#[cfg(client)]
use solana_client::nonblocking::rpc_client::RpcClient;
#[cfg(client)]
use solana_sdk::commitment_config::CommitmentConfig;

/// Cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum Cluster {
    /// Mainnet.
    #[default]
    Mainnet,
    /// Devnet.
    Devnet,
    /// Testnet.
    Testnet,
    /// Localnet.
    Localnet,
    /// Custom cluster with the given http url and websocket url.
    Custom(String, String),
}

impl Cluster {
    /// Get the http url of the cluster.
    pub fn url(&self) -> &str {
        match self {
            Self::Mainnet => "https://api.mainnet-beta.solana.com",
            Self::Devnet => "https://api.devnet.solana.com",
            Self::Testnet => "https://api.testnet.solana.com",
            Self::Localnet => "http://127.0.0.1:8899",
            Self::Custom(url, _) => url,
        }
    }

    /// Get the websocket url of the cluster.
    pub fn ws_url(&self) -> &str {
        match self {
            Self::Mainnet => "wss://api.mainnet-beta.solana.com",
            Self::Devnet => "wss://api.devnet.solana.com",
            Self::Testnet => "wss://api.testnet.solana.com",
            Self::Localnet => "ws://127.0.0.1:8900",
            Self::Custom(_, ws_url) => ws_url,
        }
    }

    /// Create a nonblocking Solana RPC client for this cluster.
    #[cfg(client)]
    pub fn rpc(&self, commitment: CommitmentConfig) -> RpcClient {
        RpcClient::new_with_commitment(self.url().to_string(), commitment)
    }
}

impl FromStr for Cluster {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "m" | "mainnet" | "mainnet-beta" => Ok(Self::Mainnet),
            "d" | "devnet" => Ok(Self::Devnet),
            "t" | "testnet" => Ok(Self::Testnet),
            "l" | "localnet" => Ok(Self::Localnet),
            _ if s.starts_with("http") => {
                let mut ws_url = Url::parse(s)?;
                if let Some(port) = ws_url.port() {
                    ws_url
                        .set_port(Some(port + 1))
                        .map_err(|_| crate::Error::ParseCluster("unable to set port"))?;
                }
                let scheme = if ws_url.scheme() == "https" {
                    "wss"
                } else {
                    "ws"
                };
                ws_url
                    .set_scheme(scheme)
                    .map_err(|_| crate::Error::ParseCluster("unable to set scheme"))?;
                Ok(Self::Custom(s.to_string(), ws_url.to_string()))
            }
            _ => Err(crate::Error::ParseCluster(
                "expected `mainnet`, `devnet`, `testnet`, `localnet` or an http url",
            )),
        }
    }
}

impl fmt::Display for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mainnet => write!(f, "mainnet"),
            Self::Devnet => write!(f, "devnet"),
            Self::Testnet => write!(f, "testnet"),
            Self::Localnet => write!(f, "localnet"),
            Self::Custom(url, _) => write!(f, "{url}"),
        }
    }
}

#[cfg(serde)]
impl serde::Serialize for Cluster {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(serde)]
impl<'de> serde::Deserialize<'de> for Cluster {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = std::borrow::Cow::<'de, str>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
