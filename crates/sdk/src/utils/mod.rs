/// Base64 helpers.
pub mod base64;


pub use self::base64::{decode_base64, encode_base64};
