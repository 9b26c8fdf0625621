//! BFT quorum threshold scenarios over the BLS scheme.

use cv_04_attestation::{
    threshold_weight, Attestation, AttestationStrategy, BlsAttestationStrategy, RosterEntry,
    ValidatorRoster,
};
use shared_crypto::BlsKeyPair;

fn network_of(n: usize) -> (Vec<BlsKeyPair>, ValidatorRoster) {
    let keypairs: Vec<BlsKeyPair> = (0..n).map(|_| BlsKeyPair::generate()).collect();
    let roster = ValidatorRoster::new(
        keypairs
            .iter()
            .enumerate()
            .map(|(i, kp)| RosterEntry {
                validator_id: format!("validator-{}", i + 1),
                public_key: kp.public_key().to_bytes().to_vec(),
                weight: 1,
            })
            .collect(),
    );
    (keypairs, roster)
}

fn strategy_for(
    index: usize,
    keypairs: &[BlsKeyPair],
    roster: &ValidatorRoster,
) -> BlsAttestationStrategy {
    BlsAttestationStrategy::new(
        format!("validator-{}", index + 1),
        BlsKeyPair::from_secret_bytes(&keypairs[index].secret_bytes()).unwrap(),
        roster.clone(),
    )
    .unwrap()
}

fn sign_with(count: usize, keypairs: &[BlsKeyPair], roster: &ValidatorRoster) -> Vec<Attestation> {
    (0..count)
        .map(|i| strategy_for(i, keypairs, roster).sign(b"bundle commitment").unwrap())
        .collect()
}

/// N=4, three valid weight-1 attestations: threshold ceil(8/3)+1 = 4 is not
/// met and the aggregate is not marked finalized.
#[test]
fn three_of_four_does_not_reach_quorum() {
    let (keypairs, roster) = network_of(4);
    let local = strategy_for(0, &keypairs, &roster);

    assert_eq!(threshold_weight(4), 4);
    let aggregated = local.aggregate(&sign_with(3, &keypairs, &roster)).unwrap();
    assert_eq!(aggregated.achieved_weight, 3);
    assert_eq!(aggregated.required_weight, 4);
    assert!(!aggregated.threshold_met);
}

/// N=4, four valid weight-1 attestations: threshold met and the aggregate
/// cryptographically verifies.
#[test]
fn four_of_four_reaches_quorum_and_verifies() {
    let (keypairs, roster) = network_of(4);
    let local = strategy_for(0, &keypairs, &roster);

    let aggregated = local.aggregate(&sign_with(4, &keypairs, &roster)).unwrap();
    assert_eq!(aggregated.achieved_weight, 4);
    assert!(aggregated.threshold_met);
    assert!(local.verify_aggregated(&aggregated));
}

/// Exactly at the threshold passes; one below fails. Weighted roster.
#[test]
fn weighted_threshold_boundary() {
    let keypairs: Vec<BlsKeyPair> = (0..3).map(|_| BlsKeyPair::generate()).collect();
    let roster = ValidatorRoster::new(
        keypairs
            .iter()
            .enumerate()
            .map(|(i, kp)| RosterEntry {
                validator_id: format!("validator-{}", i + 1),
                public_key: kp.public_key().to_bytes().to_vec(),
                weight: [5u64, 3, 1][i],
            })
            .collect(),
    );
    // total 9 -> threshold ceil(18/3)+1 = 7
    assert_eq!(threshold_weight(9), 7);
    let local = strategy_for(0, &keypairs, &roster);

    // 5 + 1 = 6: one unit below.
    let below = local
        .aggregate(&[
            strategy_for(0, &keypairs, &roster).sign(b"m").unwrap(),
            strategy_for(2, &keypairs, &roster).sign(b"m").unwrap(),
        ])
        .unwrap();
    assert_eq!(below.achieved_weight, 6);
    assert!(!below.threshold_met);

    // 5 + 3 = 8: above.
    let above = local
        .aggregate(&[
            strategy_for(0, &keypairs, &roster).sign(b"m").unwrap(),
            strategy_for(1, &keypairs, &roster).sign(b"m").unwrap(),
        ])
        .unwrap();
    assert_eq!(above.achieved_weight, 8);
    assert!(above.threshold_met);
}

/// An empty attestation set rejects; no threshold can be met.
#[test]
fn empty_set_cannot_aggregate() {
    let (keypairs, roster) = network_of(4);
    let local = strategy_for(0, &keypairs, &roster);
    assert!(local.aggregate(&[]).is_err());
}
