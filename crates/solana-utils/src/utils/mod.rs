/// Transaction size estimation.
pub mod transaction_size;

/// Explorer inspector URLs.
pub mod inspect;

pub use self::{inspect::inspector_url, transaction_size::transaction_size};
