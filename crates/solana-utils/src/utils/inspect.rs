use base64::{prelude::BASE64_STANDARD, Engine};
use solana_sdk::transaction::VersionedTransaction;
use url::form_urlencoded;

use crate::cluster::Cluster;

const INSPECTOR_URL: &str = "https://explorer.solana.com/tx/inspector";

/// Explorer inspector URL replaying the message of `transaction` on `cluster`.
///
/// Only the message is encoded, so the URL is the same before and after signing.
pub fn inspector_url(transaction: &VersionedTransaction, cluster: &Cluster) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    query.append_pair(
        "message",
        &BASE64_STANDARD.encode(transaction.message.serialize()),
    );
    match cluster {
        Cluster::Mainnet => {}
        Cluster::Devnet | Cluster::Testnet => {
            query.append_pair("cluster", &cluster.to_string());
        }
        Cluster::Localnet | Cluster::Custom(..) => {
            query
                .append_pair("cluster", "custom")
                .append_pair("customUrl", cluster.url());
        }
    }
    format!("{INSPECTOR_URL}?{}", query.finish())
}
