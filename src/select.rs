// Copyright 2023 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Order-statistic selection over slices of doubles, the computational engine
//! shared by the solvers. Two variants are provided: randomized quickselect
//! (expected linear time, following Sedgewick/Wayne's QuickPedantic) and a
//! deterministic median-of-medians selection (worst-case linear time) for the
//! solver that needs the hard guarantee.

use rand::seq::SliceRandom;
use rand::Rng;

/// Rearranges `a` so that `a[k]` holds the `k`-th smallest value (0-indexed),
/// everything to its left is not larger and everything to its right is not
/// smaller, and returns that value. Expected linear time; the worst case is
/// quadratic, which is acceptable here since inputs are not adversarial.
///
/// The source of randomness is an explicit parameter so that results are
/// reproducible under a fixed seed.
///
/// # Panics
///
/// Panics if `k` is out of bounds.
pub fn select(a: &mut [f64], k: usize, rng: &mut impl Rng) -> f64 {
    assert!(
        k < a.len(),
        "selection rank {k} out of bounds for length {}",
        a.len()
    );
    a.shuffle(rng);
    let mut lo = 0;
    let mut hi = a.len() - 1;
    while hi > lo {
        let i = partition(a, lo, hi);
        if i > k {
            hi = i - 1;
        } else if i < k {
            lo = i + 1;
        } else {
            return a[i];
        }
    }
    a[lo]
}

// Partitions a[lo..=hi] around a[lo], returning an index j such that
// a[lo..j] <= a[j] <= a[j+1..=hi].
fn partition(a: &mut [f64], lo: usize, hi: usize) -> usize {
    let v = a[lo];
    let mut i = lo;
    let mut j = hi + 1;
    loop {
        i += 1;
        while a[i] < v && i < hi {
            i += 1;
        }
        j -= 1;
        while v < a[j] && j > lo {
            j -= 1;
        }
        if i >= j {
            break;
        }
        a.swap(i, j);
    }
    a.swap(lo, j);
    j
}

/// Like [`select`], but deterministic: median-of-medians pivoting guarantees
/// worst-case linear time regardless of the input order.
///
/// # Panics
///
/// Panics if `k` is out of bounds.
pub fn select_deterministic(a: &mut [f64], k: usize) -> f64 {
    assert!(
        k < a.len(),
        "selection rank {k} out of bounds for length {}",
        a.len()
    );
    let mut lo = 0;
    let mut hi = a.len();
    let mut k = k;
    loop {
        if hi - lo <= 5 {
            a[lo..hi].sort_by(f64::total_cmp);
            return a[lo + k];
        }
        let pivot = median_of_medians(&mut a[lo..hi]);
        let (lt, gt) = partition_three_way(&mut a[lo..hi], pivot);
        if k < lt {
            hi = lo + lt;
        } else if k < gt {
            return pivot;
        } else {
            k -= gt;
            lo += gt;
        }
    }
}

/// Returns the lower median of `a`, i.e. the element of rank `len / 2 - 1`
/// for `len >= 2`, rearranging `a` in the process. Deterministic and
/// worst-case linear. Callers partition around the result, and the lower
/// median guarantees at least one element lands strictly on each side.
pub fn median(a: &mut [f64]) -> f64 {
    if a.len() == 1 {
        a[0]
    } else {
        select_deterministic(a, a.len() / 2 - 1)
    }
}

// Gathers the median of each group of 5 into the prefix of `a` and recurses
// on that prefix to pick the pivot.
fn median_of_medians(a: &mut [f64]) -> f64 {
    let n = a.len();
    let groups = n.div_ceil(5);
    for g in 0..groups {
        let start = 5 * g;
        let end = usize::min(start + 5, n);
        a[start..end].sort_by(f64::total_cmp);
        a.swap(g, start + (end - start) / 2);
    }
    select_deterministic(&mut a[..groups], groups / 2)
}

// Dutch-flag partition of `a` by the pivot value: returns (lt, gt) such that
// a[..lt] < pivot, a[lt..gt] == pivot, and a[gt..] > pivot.
fn partition_three_way(a: &mut [f64], pivot: f64) -> (usize, usize) {
    let mut lt = 0;
    let mut i = 0;
    let mut gt = a.len();
    while i < gt {
        if a[i] < pivot {
            a.swap(lt, i);
            lt += 1;
            i += 1;
        } else if a[i] > pivot {
            gt -= 1;
            a.swap(i, gt);
        } else {
            i += 1;
        }
    }
    (lt, gt)
}
