//! Observer adapters.

mod http_rpc;

pub use http_rpc::HttpEvmRpc;
