//! HTTP adapters for partner bank APIs.
//!
//! Every configured bank speaks the same JSON contract: a client-credentials token endpoint plus
//! `proposals` and `simulations` resources under its base URL.

pub mod client;
pub mod payload;
pub mod registry;
pub mod status;

pub use client::HttpBankClient;
pub use registry::{build_gateways, AdapterError};
pub use status::classify_status;
