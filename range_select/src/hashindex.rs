//! `build_hash`: a simple seeded bucket-hash table over a column's physical
//! positions, in the spirit of `ph`'s seeded-hash-family levels but without the
//! minimal-perfect-hash machinery -- a select kernel's equality hash index is
//! built once and probed many times for one value, not evaluated per key.

use seedable_hash::{BuildSeededHasher, BuildWyHash};
use dyn_size_of::GetSize;

use crate::value::ColumnValue;

const SEED: u32 = 0x5345_4c45; // arbitrary fixed seed: deterministic across calls, per §5 (no global state, reproducible)

/// CSR-style bucket table: `positions[bucket_start[b]..bucket_start[b+1]]` holds
/// the physical positions whose value hashes into bucket `b`.
pub struct HashIndex {
    mask: u64,
    bucket_start: Box<[u32]>,
    positions: Box<[u32]>,
}

impl HashIndex {
    pub fn build<T: ColumnValue>(values: &[T]) -> Self {
        let hasher = BuildWyHash::default();
        let buckets = values.len().max(1).next_power_of_two();
        let mask = buckets as u64 - 1;

        let mut counts = vec![0u32; buckets + 1];
        let bucket_of: Vec<u32> = values.iter()
            .map(|v| (v.seeded_hash(&hasher, SEED) & mask) as u32)
            .collect();
        for &b in &bucket_of {
            counts[b as usize + 1] += 1;
        }
        for i in 0..buckets {
            counts[i + 1] += counts[i];
        }
        let mut cursor = counts.clone();
        let mut positions = vec![0u32; values.len()];
        for (pos, &b) in bucket_of.iter().enumerate() {
            let slot = &mut cursor[b as usize];
            positions[*slot as usize] = pos as u32;
            *slot += 1;
        }
        Self { mask, bucket_start: counts.into_boxed_slice(), positions: positions.into_boxed_slice() }
    }

    /// Physical positions whose value hashes into the same bucket as `value`.
    /// Callers must still compare the actual value (hash collisions are possible).
    pub fn probe<T: ColumnValue>(&self, value: T) -> &[u32] {
        let hasher = BuildWyHash::default();
        let bucket = (value.seeded_hash(&hasher, SEED) & self.mask) as usize;
        &self.positions[self.bucket_start[bucket] as usize..self.bucket_start[bucket + 1] as usize]
    }
}

impl GetSize for HashIndex {
    fn size_bytes_dyn(&self) -> usize {
        self.bucket_start.size_bytes_dyn() + self.positions.size_bytes_dyn()
    }
    const USES_DYN_MEM: bool = true;
}
