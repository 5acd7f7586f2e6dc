//! Group/member share generation and reconstruction.
//!
//! A secret is split into up to 16 group shares (group threshold `Gt` of
//! `Gn`), and each group share is split again into up to 16 member shares
//! (member threshold `Mt` of `Mn`). A threshold of 1 is the degenerate case
//! where every share at that level equals the value being split, rather
//! than going through `gf256` interpolation over a constant polynomial.

use crate::encrypt::{decrypt_value, encrypt_value};
use crate::mnemonic::{decode_mnemonic, encode_mnemonic, ShareFields};
use crate::shamir::{reconstruct_secret, split_secret, Share};
use crate::ShardError;
use rand::RngCore;

/// One group's member-threshold configuration.
#[derive(Debug, Clone, Copy)]
pub struct GroupSpec {
    pub member_threshold: u8,
    pub member_count: u8,
}

fn split_level(value: &[u8], threshold: u8, total: u8) -> Result<Vec<Share>, ShardError> {
    if threshold == 0 || total == 0 || threshold > total {
        return Err(ShardError::InvalidMnemonic(format!(
            "invalid threshold {threshold} of {total}"
        )));
    }
    if threshold == 1 {
        return Ok((1..=total)
            .map(|index| Share { index, data: value.to_vec() })
            .collect());
    }
    split_secret(value, threshold, total).map_err(|e| ShardError::InvalidMnemonic(e.to_string()))
}

fn recover_level(shares: &[Share], threshold: u8) -> Result<Vec<u8>, ShardError> {
    if shares.len() < threshold as usize {
        return Err(ShardError::InsufficientShards);
    }
    if threshold == 1 {
        return Ok(shares[0].data.clone());
    }
    reconstruct_secret(shares).map_err(|e| ShardError::InvalidMnemonic(e.to_string()))
}

/// Split `secret` into `group_threshold`-of-`groups.len()` SLIP-39 mnemonic
/// sets. Returns one `Vec<String>` of member mnemonics per group.
pub fn generate_mnemonics(
    group_threshold: u8,
    groups: &[GroupSpec],
    secret: &[u8],
    passphrase: Option<&str>,
    iteration_exponent: u8,
    extendable: bool,
    rng: &mut impl RngCore,
) -> Result<Vec<Vec<String>>, ShardError> {
    if groups.is_empty() || groups.len() > 16 {
        return Err(ShardError::InvalidMnemonic("group count must be 1..=16".into()));
    }
    if group_threshold == 0 || group_threshold as usize > groups.len() {
        return Err(ShardError::InvalidMnemonic("invalid group threshold".into()));
    }
    if secret.is_empty() {
        return Err(ShardError::InvalidMnemonic("secret must not be empty".into()));
    }

    let mut id_bytes = [0u8; 2];
    rng.fill_bytes(&mut id_bytes);
    let identifier = u16::from_be_bytes(id_bytes) & 0x7fff;

    let encrypted = encrypt_value(identifier, extendable, iteration_exponent, passphrase, secret);
    let group_shares = split_level(&encrypted, group_threshold, groups.len() as u8)?;

    let mut result = Vec::with_capacity(groups.len());
    for (group_share, spec) in group_shares.iter().zip(groups.iter()) {
        if spec.member_count == 0 || spec.member_count > 16 || spec.member_threshold == 0 || spec.member_threshold > spec.member_count {
            return Err(ShardError::InvalidMnemonic("invalid member threshold/count".into()));
        }
        let member_shares = split_level(&group_share.data, spec.member_threshold, spec.member_count)?;

        let mut phrases = Vec::with_capacity(member_shares.len());
        for member_share in &member_shares {
            let fields = ShareFields {
                identifier,
                extendable,
                iteration_exponent,
                group_index: group_share.index - 1,
                group_threshold,
                group_count: groups.len() as u8,
                member_index: member_share.index - 1,
                member_threshold: spec.member_threshold,
                value: member_share.data.clone(),
            };
            phrases.push(encode_mnemonic(&fields)?);
        }
        result.push(phrases);
    }

    Ok(result)
}

/// Reconstruct the original secret from a set of SLIP-39 mnemonic phrases
/// spanning a quorum of groups and members.
pub fn combine_mnemonics(phrases: &[String], passphrase: Option<&str>) -> Result<Vec<u8>, ShardError> {
    if phrases.is_empty() {
        return Err(ShardError::InsufficientShards);
    }

    let fields: Vec<ShareFields> = phrases.iter().map(|p| decode_mnemonic(p)).collect::<Result<_, _>>()?;

    let first = &fields[0];
    for f in &fields[1..] {
        if f.identifier != first.identifier
            || f.extendable != first.extendable
            || f.iteration_exponent != first.iteration_exponent
            || f.group_threshold != first.group_threshold
            || f.group_count != first.group_count
        {
            return Err(ShardError::MismatchedFamily);
        }
    }

    let mut by_group: std::collections::BTreeMap<u8, Vec<ShareFields>> = std::collections::BTreeMap::new();
    for f in fields {
        by_group.entry(f.group_index).or_default().push(f);
    }

    if by_group.len() < first.group_threshold as usize {
        return Err(ShardError::InsufficientShards);
    }

    let mut group_shares = Vec::with_capacity(by_group.len());
    for (group_index, members) in by_group.iter().take(first.group_threshold as usize) {
        let member_threshold = members[0].member_threshold;
        for m in members {
            if m.member_threshold != member_threshold {
                return Err(ShardError::MismatchedFamily);
            }
        }
        let shares: Vec<Share> = members
            .iter()
            .map(|m| Share { index: m.member_index + 1, data: m.value.clone() })
            .collect();
        let group_value = recover_level(&shares, member_threshold)?;
        group_shares.push(Share { index: group_index + 1, data: group_value });
    }

    let encrypted = recover_level(&group_shares, first.group_threshold)?;
    Ok(decrypt_value(first.identifier, first.extendable, first.iteration_exponent, passphrase, &encrypted))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn single_group_threshold_one_round_trips() {
        let secret: Vec<u8> = (0u8..16).collect();
        let mut rng = OsRng;
        let groups = [GroupSpec { member_threshold: 2, member_count: 3 }];
        let sets = generate_mnemonics(1, &groups, &secret, Some("pw"), 0, false, &mut rng).unwrap();
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].len(), 3);

        let chosen = vec![sets[0][0].clone(), sets[0][2].clone()];
        let recovered = combine_mnemonics(&chosen, Some("pw")).unwrap();
        assert_eq!(recovered, secret);
    }

    #[test]
    fn multi_group_threshold_round_trips() {
        let secret: Vec<u8> = (0u8..32).collect();
        let mut rng = OsRng;
        let groups = [
            GroupSpec { member_threshold: 1, member_count: 1 },
            GroupSpec { member_threshold: 2, member_count: 3 },
            GroupSpec { member_threshold: 3, member_count: 5 },
        ];
        let sets = generate_mnemonics(2, &groups, &secret, None, 0, false, &mut rng).unwrap();

        let chosen = vec![sets[0][0].clone(), sets[1][0].clone(), sets[1][1].clone()];
        let recovered = combine_mnemonics(&chosen, None).unwrap();
        assert_eq!(recovered, secret);
    }

    #[test]
    fn insufficient_shards_rejected() {
        let secret: Vec<u8> = (0u8..16).collect();
        let mut rng = OsRng;
        let groups = [GroupSpec { member_threshold: 3, member_count: 5 }];
        let sets = generate_mnemonics(1, &groups, &secret, None, 0, false, &mut rng).unwrap();

        let chosen = vec![sets[0][0].clone(), sets[0][1].clone()];
        assert!(matches!(combine_mnemonics(&chosen, None), Err(ShardError::InsufficientShards)));
    }

    #[test]
    fn wrong_passphrase_yields_wrong_secret() {
        let secret: Vec<u8> = (0u8..16).collect();
        let mut rng = OsRng;
        let groups = [GroupSpec { member_threshold: 2, member_count: 3 }];
        let sets = generate_mnemonics(1, &groups, &secret, Some("right"), 0, false, &mut rng).unwrap();

        let chosen = vec![sets[0][0].clone(), sets[0][1].clone()];
        let recovered = combine_mnemonics(&chosen, Some("wrong")).unwrap();
        assert_ne!(recovered, secret);
    }
}
