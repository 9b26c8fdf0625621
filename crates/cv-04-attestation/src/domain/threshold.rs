//! Quorum threshold policy.

/// Weight required for quorum: `ceil(2·total/3) + 1`, in whole weight units.
pub fn threshold_weight(total: u64) -> u64 {
    (2 * total).div_ceil(3) + 1
}
