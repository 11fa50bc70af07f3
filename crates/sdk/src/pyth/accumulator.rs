//! Decoding of the accumulator update format served by Hermes.
//!
//! All integers are big-endian. Layout of an update:
//!
//! ```text
//! magic "PNAU" | major u8 | minor u8 | trailing (u8 len) | proof tag u8 | proof
//! proof (WormholeMerkle) = vaa (u16 len) | updates (u8 count) x { message (u16 len) | path (u8 count) x [u8; 20] }
//! ```

use std::io::Read;

use borsh::BorshSerialize;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use super::Identifier;

/// Magic bytes of an accumulator update.
pub const ACCUMULATOR_MAGIC: &[u8; 4] = b"PNAU";

/// Supported major version.
pub const MAJOR_VERSION: u8 = 1;

/// Price feed message variant.
pub const PRICE_FEED_MESSAGE_VARIANT: u8 = 0;

const WORMHOLE_MERKLE_PROOF: u8 = 0;

/// Length of a merkle path node.
pub const MERKLE_NODE_LEN: usize = 20;

/// Decoded accumulator update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccumulatorUpdateData {
    /// Major version.
    pub major_version: u8,
    /// Minor version.
    pub minor_version: u8,
    /// Trailing header bytes.
    pub trailing: Vec<u8>,
    /// Proof.
    pub proof: Proof,
}

/// Proof of an accumulator update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Proof {
    /// A Wormhole VAA signing the merkle root of the updates.
    WormholeMerkle {
        /// Raw VAA.
        vaa: Vec<u8>,
        /// Price updates with their merkle paths.
        updates: Vec<MerklePriceUpdate>,
    },
}

/// A message with its merkle path.
///
/// The borsh layout matches the argument of the receiver's `post_update`.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize)]
pub struct MerklePriceUpdate {
    /// Serialized message.
    pub message: Vec<u8>,
    /// Merkle path.
    pub proof: Vec<[u8; MERKLE_NODE_LEN]>,
}

/// Price feed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceFeedMessage {
    /// Feed id.
    pub feed_id: [u8; 32],
    /// Price.
    pub price: i64,
    /// Confidence.
    pub conf: u64,
    /// Exponent.
    pub exponent: i32,
    /// Publish time.
    pub publish_time: i64,
    /// Previous publish time.
    pub prev_publish_time: i64,
    /// EMA price.
    pub ema_price: i64,
    /// EMA confidence.
    pub ema_conf: u64,
}

fn truncated(what: &str) -> crate::Error {
    crate::Error::no_attestation_data(format!("truncated accumulator update: {what}"))
}

fn read_u8(buf: &mut &[u8], what: &str) -> crate::Result<u8> {
    buf.read_u8().map_err(|_| truncated(what))
}

fn read_u16(buf: &mut &[u8], what: &str) -> crate::Result<u16> {
    buf.read_u16::<BigEndian>().map_err(|_| truncated(what))
}

fn read_i64(buf: &mut &[u8], what: &str) -> crate::Result<i64> {
    buf.read_i64::<BigEndian>().map_err(|_| truncated(what))
}

fn read_u64(buf: &mut &[u8], what: &str) -> crate::Result<u64> {
    buf.read_u64::<BigEndian>().map_err(|_| truncated(what))
}

fn read_bytes(buf: &mut &[u8], len: usize, what: &str) -> crate::Result<Vec<u8>> {
    let mut bytes = vec![0; len];
    buf.read_exact(&mut bytes).map_err(|_| truncated(what))?;
    Ok(bytes)
}

fn read_array<const N: usize>(buf: &mut &[u8], what: &str) -> crate::Result<[u8; N]> {
    let mut bytes = [0; N];
    buf.read_exact(&mut bytes).map_err(|_| truncated(what))?;
    Ok(bytes)
}

impl AccumulatorUpdateData {
    /// Decode from bytes.
    pub fn try_from_slice(data: &[u8]) -> crate::Result<Self> {
        let mut buf = data;
        let magic = read_array::<4>(&mut buf, "magic")?;
        if magic != *ACCUMULATOR_MAGIC {
            return Err(crate::Error::no_attestation_data(
                "not an accumulator update: bad magic",
            ));
        }
        let major_version = read_u8(&mut buf, "major version")?;
        if major_version != MAJOR_VERSION {
            return Err(crate::Error::no_attestation_data(format!(
                "unsupported accumulator major version {major_version}"
            )));
        }
        let minor_version = read_u8(&mut buf, "minor version")?;
        let trailing_len = read_u8(&mut buf, "trailing length")?;
        let trailing = read_bytes(&mut buf, usize::from(trailing_len), "trailing")?;
        let proof = match read_u8(&mut buf, "proof type")? {
            WORMHOLE_MERKLE_PROOF => {
                let vaa_len = read_u16(&mut buf, "vaa length")?;
                let vaa = read_bytes(&mut buf, usize::from(vaa_len), "vaa")?;
                let num_updates = read_u8(&mut buf, "number of updates")?;
                let updates = (0..num_updates)
                    .map(|_| MerklePriceUpdate::read(&mut buf))
                    .collect::<crate::Result<Vec<_>>>()?;
                Proof::WormholeMerkle { vaa, updates }
            }
            kind => {
                return Err(crate::Error::no_attestation_data(format!(
                    "unsupported proof type {kind}"
                )))
            }
        };
        Ok(Self {
            major_version,
            minor_version,
            trailing,
            proof,
        })
    }

    /// Encode to bytes.
    pub fn to_bytes(&self) -> crate::Result<Vec<u8>> {
        let mut data = ACCUMULATOR_MAGIC.to_vec();
        data.push(self.major_version);
        data.push(self.minor_version);
        data.push(encode_len::<u8>(self.trailing.len(), "trailing")?);
        data.extend_from_slice(&self.trailing);
        match &self.proof {
            Proof::WormholeMerkle { vaa, updates } => {
                data.push(WORMHOLE_MERKLE_PROOF);
                data.write_u16::<BigEndian>(encode_len::<u16>(vaa.len(), "vaa")?)?;
                data.extend_from_slice(vaa);
                data.push(encode_len::<u8>(updates.len(), "updates")?);
                for update in updates {
                    update.write(&mut data)?;
                }
            }
        }
        Ok(data)
    }

    /// Returns the raw VAA.
    pub fn vaa(&self) -> &[u8] {
        match &self.proof {
            Proof::WormholeMerkle { vaa, .. } => vaa,
        }
    }

    /// Returns the merkle price updates.
    pub fn updates(&self) -> &[MerklePriceUpdate] {
        match &self.proof {
            Proof::WormholeMerkle { updates, .. } => updates,
        }
    }

    /// Find the update carrying the price feed message of `feed_id`.
    ///
    /// Updates that are not price feed messages are skipped.
    pub fn find_price_update(&self, feed_id: &Identifier) -> Option<&MerklePriceUpdate> {
        self.updates().iter().find(|update| {
            update
                .price_feed_message()
                .is_ok_and(|message| message.feed_id == feed_id.to_bytes())
        })
    }
}

fn encode_len<T: TryFrom<usize>>(len: usize, what: &str) -> crate::Result<T> {
    T::try_from(len).map_err(|_| crate::Error::invalid_argument(format!("{what} is too long")))
}

impl MerklePriceUpdate {
    fn read(buf: &mut &[u8]) -> crate::Result<Self> {
        let message_len = read_u16(buf, "message length")?;
        let message = read_bytes(buf, usize::from(message_len), "message")?;
        let num_nodes = read_u8(buf, "merkle path length")?;
        let proof = (0..num_nodes)
            .map(|_| read_array::<MERKLE_NODE_LEN>(buf, "merkle path"))
            .collect::<crate::Result<Vec<_>>>()?;
        Ok(Self { message, proof })
    }

    fn write(&self, data: &mut Vec<u8>) -> crate::Result<()> {
        data.write_u16::<BigEndian>(encode_len::<u16>(self.message.len(), "message")?)?;
        data.extend_from_slice(&self.message);
        data.push(encode_len::<u8>(self.proof.len(), "merkle path")?);
        for node in self.proof.iter() {
            data.extend_from_slice(node);
        }
        Ok(())
    }

    /// Decode the message as a price feed message.
    pub fn price_feed_message(&self) -> crate::Result<PriceFeedMessage> {
        PriceFeedMessage::try_from_slice(&self.message)
    }
}

impl PriceFeedMessage {
    /// Serialized length including the variant byte.
    pub const LEN: usize = 1 + 32 + 8 + 8 + 4 + 8 + 8 + 8 + 8;

    /// Decode from a message, including the variant byte.
    pub fn try_from_slice(message: &[u8]) -> crate::Result<Self> {
        let mut buf = message;
        let variant = read_u8(&mut buf, "message variant")?;
        if variant != PRICE_FEED_MESSAGE_VARIANT {
            return Err(crate::Error::no_attestation_data(
                "it is not a price feed message",
            ));
        }
        let feed_id = read_array::<32>(&mut buf, "feed id")?;
        let price = read_i64(&mut buf, "price")?;
        let conf = read_u64(&mut buf, "conf")?;
        let exponent = buf
            .read_i32::<BigEndian>()
            .map_err(|_| truncated("exponent"))?;
        let publish_time = read_i64(&mut buf, "publish time")?;
        let prev_publish_time = read_i64(&mut buf, "prev publish time")?;
        let ema_price = read_i64(&mut buf, "ema price")?;
        let ema_conf = read_u64(&mut buf, "ema conf")?;
        Ok(Self {
            feed_id,
            price,
            conf,
            exponent,
            publish_time,
            prev_publish_time,
            ema_price,
            ema_conf,
        })
    }

    /// Encode to a message, including the variant byte.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(Self::LEN);
        data.push(PRICE_FEED_MESSAGE_VARIANT);
        data.extend_from_slice(&self.feed_id);
        data.extend_from_slice(&self.price.to_be_bytes());
        data.extend_from_slice(&self.conf.to_be_bytes());
        data.extend_from_slice(&self.exponent.to_be_bytes());
        data.extend_from_slice(&self.publish_time.to_be_bytes());
        data.extend_from_slice(&self.prev_publish_time.to_be_bytes());
        data.extend_from_slice(&self.ema_price.to_be_bytes());
        data.extend_from_slice(&self.ema_conf.to_be_bytes());
        data
    }
}

/// Get the guardian set index from a VAA.
pub fn guardian_set_index(vaa: &[u8]) -> crate::Result<u32> {
    let mut buf = vaa.get(1..).unwrap_or_default();
    buf.read_u32::<BigEndian>()
        .map_err(|_| crate::Error::no_attestation_data("invalid vaa"))
}
