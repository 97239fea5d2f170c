pub(crate) const SERVICE_NAME: &str = "Proof-of-work ledger node";
pub(crate) const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");
pub(crate) const DEFAULT_LISTEN: &str = "0.0.0.0:8000";
pub(crate) const DEFAULT_NETWORK: &str = "testnet";
