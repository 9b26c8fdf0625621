//! Consensus domain entities.

mod block;
mod state;

pub use block::{
    BlockGovernance, ExecutionProof, RawValidatorBlock, ReplicationHeader, ValidatorBlock,
};
pub use state::{CommitResult, ConsensusState, BLOCK_CACHE_CAPACITY};
