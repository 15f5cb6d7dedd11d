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

//! Expected linear-time apportionment solver based on sandwich bounds, after
//! Reitzig & Wild, "A Practical and Worst-Case Efficient Algorithm for
//! Divide-and-Round Apportionment" (arXiv:1504.06475).
//!
//! The solver brackets the unit size `a*` in a provably correct interval
//! `[a_under, a_over]` computed in one linear pass, materializes only the
//! candidate values falling inside that interval (a buffer of size O(n)), and
//! rank-selects the answer from the buffer.

use crate::apportionment::{ApportionmentInstance, Error, Solver, SolverStats, UnitSize};
use crate::fuzzy::{self, EPSILON};
use crate::method::DivisorMethod;
use crate::select;
use log::{debug, trace};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Sandwich bounds bracketing the unit size, together with the contributing
/// set that produced them.
#[derive(Debug, Clone, PartialEq)]
pub struct SandwichBounds {
    /// Lower bound on `a*`.
    pub a_under: f64,
    /// Upper bound on `a*`.
    pub a_over: f64,
    /// Indices of the parties that would receive at least one seat at the
    /// threshold the bounds were estimated from.
    pub contributing: Vec<usize>,
    /// Total vote mass of the contributing set.
    pub sigma: f64,
}

/// Computes sandwich bounds for `a*` from a feasible threshold `x_over`, in
/// one pass over the votes (Pukelsheim-style min-max inequality; the bounds
/// are proven, not heuristic).
///
/// With `refined_lower` set, the lower bound uses the method's `beta_lower`
/// instead of being derived from the upper bound, which is tighter for
/// methods whose offset envelope is wide.
pub fn estimate_bounds<M: DivisorMethod>(
    instance: &ApportionmentInstance,
    method: &M,
    x_over: f64,
    refined_lower: bool,
) -> SandwichBounds {
    let alpha = method.alpha();
    let k = instance.k as f64;

    let mut contributing = Vec::with_capacity(instance.votes.len());
    let mut sigma = 0.0;
    for (i, &v) in instance.votes.iter().enumerate() {
        if v > method.d(0) / x_over {
            contributing.push(i);
            sigma += v;
        }
    }

    let n_i = contributing.len() as f64;
    let a_over = (alpha * k + method.beta_upper() * n_i) / sigma;
    let a_under = if refined_lower {
        ((alpha * k - (alpha - method.beta_lower()) * n_i) / sigma).max(0.0)
    } else {
        (a_over - (alpha + method.beta_upper()) * n_i / sigma).max(0.0)
    };
    SandwichBounds {
        a_under,
        a_over,
        contributing,
        sigma,
    }
}

/// Candidate values generated inside a sandwich window, with the selection
/// rank adjusted for the entries skipped below the window.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidates {
    /// Sequence entries falling inside `[a_under, a_over]`, per contributing
    /// party.
    pub buffer: Vec<f64>,
    /// Rank of `a*` within the buffer, 1-based: `k` minus the number of
    /// entries skipped below the window.
    pub k_hat: i64,
}

/// Materializes, for every contributing party, exactly the sequence entries
/// `d(j)/votes[i]` whose values fall inside the sandwich window. The true
/// `k`-th order statistic of the full candidate set is guaranteed to be among
/// them.
pub fn generate_candidates<M: DivisorMethod>(
    instance: &ApportionmentInstance,
    method: &M,
    bounds: &SandwichBounds,
) -> Candidates {
    let capacity = (2.0 * (1.0 + method.beta_upper() / method.alpha())
        * bounds.contributing.len() as f64)
        .ceil() as usize;
    let mut buffer = Vec::with_capacity(capacity);
    let mut k_hat = instance.k as i64;

    for &i in &bounds.contributing {
        let v = instance.votes[i];
        // A party whose cheapest entry already exceeds the window contributes
        // nothing, and its inverse below is not meaningful.
        if method.d(0) / v > bounds.a_over {
            continue;
        }
        let real_min_j = method.delta_inv_raw(v * bounds.a_under);
        let min_j = if real_min_j <= 0.0 {
            0
        } else {
            fuzzy::fuzzy_ceil(real_min_j) as u32
        };
        // The guard above ensures the inverse at the upper edge is at worst a
        // rounding error below zero.
        let max_j = fuzzy::fuzzy_floor(method.delta_inv_raw(v * bounds.a_over).max(0.0)) as u32;
        for j in min_j..=max_j {
            buffer.push(method.d(j) / v);
        }
        // Entries 0, 1, ..., min_j - 1 are missing from the buffer.
        k_hat -= min_j as i64;
    }
    Candidates { buffer, k_hat }
}

// Rank of the threshold x, together with the rank just below x: the number of
// candidate values <= x, and < x. They differ exactly when x is itself a jump
// site of some party's sequence.
fn rank_pair<M: DivisorMethod>(instance: &ApportionmentInstance, method: &M, x: f64) -> (i64, i64) {
    let mut rank_at = 0;
    let mut rank_below = 0;
    for &v in &instance.votes {
        if method.d(0) / v > x {
            continue;
        }
        let delta_inv = method.delta_inv_raw(v * x);
        match fuzzy::as_integer(delta_inv) {
            // x is a jump site of this sequence: the rank at x includes the
            // jump, the rank just below does not.
            Some(j) => {
                rank_at += j + 1;
                rank_below += j;
            }
            None => {
                let floored = delta_inv.floor() as i64;
                rank_at += floored + 1;
                rank_below += floored + 1;
            }
        }
    }
    (rank_at, rank_below)
}

// A threshold is exactly optimal when its rank reaches k while the rank of
// its immediate predecessor does not.
fn is_optimal<M: DivisorMethod>(instance: &ApportionmentInstance, method: &M, x: f64) -> bool {
    let (rank_at, rank_below) = rank_pair(instance, method, x);
    rank_at >= instance.k as i64 && rank_below < instance.k as i64
}

/// The Sandwich/Select solver: estimate bounds, generate candidates, select.
///
/// Works for any almost-linear divisor method. Expected linear time; the
/// randomness of the underlying selection is owned by the solver and seeded
/// explicitly, so runs are reproducible.
pub struct SandwichSelect<R> {
    rng: R,
    /// Test whether the trivial largest-party threshold is already optimal
    /// before estimating any bounds, and return it directly if so.
    pub optimality_check: bool,
    /// Re-estimate bounds with `a_over` as the new threshold while the
    /// contributing set strictly shrinks. Tightens the window, but
    /// measurements showed the extra passes are not worth it; kept as a
    /// configuration because the termination argument (the set size is a
    /// strictly decreasing non-negative integer) makes it safe.
    pub iterate_bounds: bool,
}

impl<R: Rng> SandwichSelect<R> {
    /// Creates a solver drawing pivots from the given generator.
    pub fn new(rng: R) -> Self {
        SandwichSelect {
            rng,
            optimality_check: false,
            iterate_bounds: false,
        }
    }
}

impl SandwichSelect<ChaCha8Rng> {
    /// Creates a solver with a deterministic generator for the given seed.
    pub fn seeded(seed: u64) -> Self {
        SandwichSelect::new(ChaCha8Rng::seed_from_u64(seed))
    }
}

impl<R: Rng> Solver for SandwichSelect<R> {
    fn unit_size<M: DivisorMethod>(
        &mut self,
        instance: &ApportionmentInstance,
        method: &M,
    ) -> Result<UnitSize, Error> {
        let max_votes = instance.votes.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
        // Clearly feasible but suboptimal threshold: the value of the k-th
        // seat if the largest party took every seat.
        let x_raw = method.d((instance.k - 1) as u32) / max_votes;

        if self.optimality_check && is_optimal(instance, method, x_raw) {
            trace!("largest-party threshold {x_raw} is already optimal");
            return Ok(UnitSize {
                astar: x_raw,
                stats: SolverStats::default(),
            });
        }

        // Nudged away from the boundary to avoid exact-equality edge cases in
        // the contributing-set test.
        let mut x_over = x_raw + 5.0 * EPSILON;

        let mut bound_iterations = 1;
        let mut bounds = estimate_bounds(instance, method, x_over, self.iterate_bounds);
        if self.iterate_bounds {
            // Feed a_over back in as a new threshold as long as the
            // contributing set strictly shrinks.
            while {
                x_over = bounds.a_over;
                let next = estimate_bounds(instance, method, x_over, true);
                bound_iterations += 1;
                let shrunk = next.contributing.len() < bounds.contributing.len();
                bounds = next;
                shrunk
            } {}
        }
        trace!(
            "sandwich bounds [{}, {}] from {} contributing parties",
            bounds.a_under,
            bounds.a_over,
            bounds.contributing.len()
        );

        let candidates = generate_candidates(instance, method, &bounds);
        let Candidates { mut buffer, k_hat } = candidates;
        assert!(
            k_hat >= 1 && k_hat as usize <= buffer.len(),
            "selection rank {k_hat} outside the generated window of {} candidates",
            buffer.len()
        );
        debug!(
            "selecting rank {k_hat} among {} candidates from {} contributing parties",
            buffer.len(),
            bounds.contributing.len()
        );

        let astar = select::select(&mut buffer, k_hat as usize - 1, &mut self.rng);
        Ok(UnitSize {
            astar,
            stats: SolverStats {
                contributing: bounds.contributing.len(),
                candidates: buffer.len(),
                bound_iterations,
            },
        })
    }

    fn name(&self) -> &'static str {
        "SandwichSelect"
    }
}
