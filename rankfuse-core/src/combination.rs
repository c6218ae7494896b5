/// Enumeration of k-subsets.
///
/// Uses the lexicographic index-array algorithm: keep `k` ascending indices,
/// advance the rightmost one, and backtrack with carry when it runs off the end.
use crate::error::{RankFuseError, Result};

/// All k-element subsets of `elements`, without repetition.
///
/// Each subset keeps the input order of its members and subsets come out in
/// lexicographic index order. Exactly C(n, k) subsets are returned, so the
/// caller owns the capacity problem: the k = 2..=n sweep done by the
/// scheduler is 2^n - n - 1 subsets in total.
pub fn combinations<T: Clone>(elements: &[T], k: usize) -> Result<Vec<Vec<T>>> {
    let n = elements.len();
    if k > n {
        return Err(RankFuseError::InvalidCombination { n, k });
    }
    if k == 0 {
        return Ok(vec![Vec::new()]);
    }

    let mut result = Vec::with_capacity(binomial(n, k));
    let mut indices: Vec<usize> = (0..k).collect();

    loop {
        result.push(indices.iter().map(|&i| elements[i].clone()).collect());

        // Rightmost position that can still move forward.
        let Some(pos) = (0..k).rev().find(|&r| indices[r] < n - k + r) else {
            break;
        };

        indices[pos] += 1;
        for r in pos + 1..k {
            indices[r] = indices[r - 1] + 1;
        }
    }

    Ok(result)
}

/// Every subset of size 2..=n, grouped by size in ascending order.
pub fn all_combinations<T: Clone>(elements: &[T]) -> Vec<Vec<T>> {
    (2..=elements.len())
        .flat_map(|k| combinations(elements, k).unwrap_or_default())
        .collect()
}

/// Binomial coefficient C(n, k), saturating at `usize::MAX`.
pub fn binomial(n: usize, k: usize) -> usize {
    if k > n {
        return 0;
    }
    let k = k.min(n - k);
    let mut acc: u128 = 1;
    for i in 0..k {
        // Exact at every step: acc * (n - i) is divisible by (i + 1).
        acc = acc * (n - i) as u128 / (i + 1) as u128;
        if acc > usize::MAX as u128 {
            return usize::MAX;
        }
    }
    acc as usize
}
