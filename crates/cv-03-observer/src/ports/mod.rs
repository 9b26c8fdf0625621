//! Observer ports.

mod rpc;

pub use rpc::{EvmRpcApi, MockEvmRpc};
