//! `Shard` record type and the interactive reconstruction protocol.
//!
//! A `Shard` pairs an operator-chosen name with an encrypted SLIP-39
//! mnemonic phrase. `ShardSelector` implements the step-by-step quorum
//! assembly protocol: shards are added one at a time, family/parameter
//! consistency is checked as each one arrives, and reconstruction is only
//! attempted once a full quorum (enough groups, each with enough members)
//! is present.

use crate::mnemonic::{decode_mnemonic, ShareFields};
use crate::split::combine_mnemonics;
use crate::ShardError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single named shard: an operator-facing label over an encrypted SLIP-39
/// mnemonic phrase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shard {
    pub name: String,
    pub mnemonic: String,
}

impl Shard {
    pub fn new(name: impl Into<String>, mnemonic: impl Into<String>) -> Self {
        Self { name: name.into(), mnemonic: mnemonic.into() }
    }

    fn fields(&self) -> Result<ShareFields, ShardError> {
        decode_mnemonic(&self.mnemonic)
    }
}

/// Accumulates shards offered by the operator one at a time, validating
/// family consistency as they arrive, until a reconstructable quorum exists.
#[derive(Debug, Default)]
pub struct ShardSelector {
    shards: Vec<Shard>,
}

impl ShardSelector {
    pub fn new() -> Self {
        Self { shards: Vec::new() }
    }

    /// Offer one more shard. Rejects shards from a different family
    /// (mismatched identifier/extendable/iteration-exponent/group layout)
    /// up front, rather than waiting until reconstruction is attempted.
    pub fn add_shard(&mut self, shard: Shard) -> Result<(), ShardError> {
        let fields = shard.fields()?;
        if let Some(existing) = self.shards.first() {
            let existing_fields = existing.fields()?;
            if existing_fields.identifier != fields.identifier
                || existing_fields.extendable != fields.extendable
                || existing_fields.iteration_exponent != fields.iteration_exponent
                || existing_fields.group_threshold != fields.group_threshold
                || existing_fields.group_count != fields.group_count
            {
                return Err(ShardError::MismatchedFamily);
            }
        }
        self.shards.push(shard);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.shards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.is_empty()
    }

    /// Distinct groups represented so far, and how many distinct members
    /// have been offered within each.
    pub fn group_progress(&self) -> Result<BTreeMap<u8, usize>, ShardError> {
        let mut progress: BTreeMap<u8, std::collections::BTreeSet<u8>> = BTreeMap::new();
        for shard in &self.shards {
            let fields = shard.fields()?;
            progress.entry(fields.group_index).or_default().insert(fields.member_index);
        }
        Ok(progress.into_iter().map(|(g, members)| (g, members.len())).collect())
    }

    /// True once enough groups, each with enough members, have been
    /// offered that reconstruction should succeed.
    pub fn is_complete(&self) -> Result<bool, ShardError> {
        if self.shards.is_empty() {
            return Ok(false);
        }
        let first = self.shards[0].fields()?;
        let mut complete_groups = 0usize;

        // A group is satisfied once the distinct member count for that
        // group meets that group's own member_threshold.
        let mut by_group: BTreeMap<u8, Vec<ShareFields>> = BTreeMap::new();
        for shard in &self.shards {
            by_group.entry(shard.fields()?.group_index).or_default().push(shard.fields()?);
        }
        for (_, members) in &by_group {
            let threshold = members[0].member_threshold;
            let distinct: std::collections::BTreeSet<u8> = members.iter().map(|m| m.member_index).collect();
            if distinct.len() >= threshold as usize {
                complete_groups += 1;
            }
        }
        Ok(complete_groups >= first.group_threshold as usize)
    }

    /// Attempt reconstruction with the shards offered so far.
    pub fn reconstruct(&self, passphrase: Option<&str>) -> Result<Vec<u8>, ShardError> {
        let phrases: Vec<String> = self.shards.iter().map(|s| s.mnemonic.clone()).collect();
        combine_mnemonics(&phrases, passphrase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::split::{generate_mnemonics, GroupSpec};
    use rand::rngs::OsRng;

    #[test]
    fn selector_reports_progress_and_completes() {
        let secret: Vec<u8> = (0u8..16).collect();
        let mut rng = OsRng;
        let groups = [GroupSpec { member_threshold: 2, member_count: 3 }];
        let sets = generate_mnemonics(1, &groups, &secret, None, 0, false, &mut rng).unwrap();

        let mut selector = ShardSelector::new();
        assert!(!selector.is_complete().unwrap());
        selector.add_shard(Shard::new("alice", sets[0][0].clone())).unwrap();
        assert!(!selector.is_complete().unwrap());
        selector.add_shard(Shard::new("bob", sets[0][1].clone())).unwrap();
        assert!(selector.is_complete().unwrap());

        let recovered = selector.reconstruct(None).unwrap();
        assert_eq!(recovered, secret);
    }

    #[test]
    fn selector_rejects_mismatched_family() {
        let mut rng = OsRng;
        let groups = [GroupSpec { member_threshold: 2, member_count: 3 }];
        let set_a = generate_mnemonics(1, &groups, &[1u8; 16], None, 0, false, &mut rng).unwrap();
        let set_b = generate_mnemonics(1, &groups, &[2u8; 16], None, 0, false, &mut rng).unwrap();

        let mut selector = ShardSelector::new();
        selector.add_shard(Shard::new("a", set_a[0][0].clone())).unwrap();
        assert!(matches!(
            selector.add_shard(Shard::new("b", set_b[0][0].clone())),
            Err(ShardError::MismatchedFamily)
        ));
    }
}
