//! Estimation of preprocessing parameters from raw reads.
//!
//! The target length is taken to be the most common read length. Adapters are the longest
//! prefix and suffix on which reads of the target length agree: scanning inward from each end,
//! a position belongs to the adapter while its most common base is shared by at least
//! `CONSENSUS_THRESHOLD` of the reads.

use std::cmp::Reverse;

use itertools::Itertools;

/// Minimum fraction of reads that must share the most common base at an adapter position.
pub const CONSENSUS_THRESHOLD: f64 = 0.5;

/// Most common read length. Ties resolve to the shorter length.
pub fn estimate_target_length<S: AsRef<str>>(reads: &[S]) -> Option<usize> {
    reads
        .iter()
        .map(|read| read.as_ref().len())
        .counts()
        .into_iter()
        .max_by_key(|&(len, count)| (count, Reverse(len)))
        .map(|(len, _)| len)
}

/// Most common byte at `pos`, if it is shared by enough reads.
fn consensus_base(reads: &[&[u8]], pos: usize) -> Option<u8> {
    let mut counts = [0usize; 256];
    for read in reads {
        counts[read[pos] as usize] += 1;
    }

    let (base, count) = counts
        .iter()
        .enumerate()
        .max_by_key(|&(base, count)| (*count, Reverse(base)))?;

    (*count as f64 / reads.len() as f64 >= CONSENSUS_THRESHOLD).then_some(base as u8)
}

/// Estimate forward and reverse adapters from reads of exactly `target_length`.
pub fn estimate_adapters<S: AsRef<str>>(
    reads: &[S],
    target_length: usize,
) -> Option<(String, String)> {
    let reads: Vec<&[u8]> = reads
        .iter()
        .map(|read| read.as_ref().as_bytes())
        .filter(|read| read.len() == target_length)
        .collect();

    if reads.is_empty() {
        return None;
    }

    let mut fwd_adapter = Vec::new();
    for pos in 0..target_length {
        match consensus_base(&reads, pos) {
            Some(base) => fwd_adapter.push(base),
            None => break,
        }
    }

    let mut rev_adapter = Vec::new();
    for pos in (fwd_adapter.len()..target_length).rev() {
        match consensus_base(&reads, pos) {
            Some(base) => rev_adapter.push(base),
            None => break,
        }
    }
    rev_adapter.reverse();

    Some((
        String::from_utf8_lossy(&fwd_adapter).into_owned(),
        String::from_utf8_lossy(&rev_adapter).into_owned(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_target_length() {
        let reads = ["AAAA", "CCCC", "GGG", "UUUUU"];
        assert_eq!(estimate_target_length(&reads), Some(4));

        // ties go to the shorter length
        let reads = ["AAA", "CCCC"];
        assert_eq!(estimate_target_length(&reads), Some(3));

        let reads: [&str; 0] = [];
        assert_eq!(estimate_target_length(&reads), None);
    }

    #[test]
    fn test_estimate_adapters() {
        let reads = [
            "AUCGAUAGC",
            "AUCGCUAGC",
            "AUCGGUAGC",
            "AUCGUUAGC",
            "AUCGAUAGCA",
        ];

        let (fwd, rev) = estimate_adapters(&reads, 9).unwrap();
        assert_eq!(fwd, "AUCG");
        assert_eq!(rev, "UAGC");
    }

    #[test]
    fn test_estimate_adapters_do_not_overlap() {
        let reads = ["ACGU", "ACGU"];

        let (fwd, rev) = estimate_adapters(&reads, 4).unwrap();
        assert_eq!(fwd, "ACGU");
        assert_eq!(rev, "");
    }

    #[test]
    fn test_estimate_adapters_without_matching_reads() {
        let reads = ["ACGU"];
        assert_eq!(estimate_adapters(&reads, 5), None);
    }
}
