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

//! Worst-case linear-time apportionment solver after Cheng & Eppstein,
//! "Linear-time Algorithms for Proportional Apportionment" (ISAAC 2014).
//!
//! Instead of bracketing the answer with closed-form bounds, this solver
//! works directly on the lazy per-party sequences in three phases: find the
//! sequences that contribute seats at all, find a coarse threshold whose rank
//! is below `k`, then iteratively narrow a bracket around the exact answer
//! using deterministic median selection. No randomization is involved.
//!
//! The paper claims the approach extends to almost-linear methods, but the
//! first phase does not terminate reliably on them, so non-linear methods are
//! rejected up front.

use crate::apportionment::{ApportionmentInstance, Error, Solver, SolverStats, UnitSize};
use crate::fuzzy;
use crate::method::{DivisorMethod, LinearParams};
use crate::select;
use log::trace;

/// Lazy view of one party's candidate sequence `j -> d(j)/v`, queried
/// arithmetically and never materialized.
#[derive(Debug, Clone, Copy)]
struct Sequence {
    v: f64,
    alpha: f64,
    beta: f64,
}

impl Sequence {
    fn new(v: f64, params: LinearParams) -> Self {
        Sequence {
            v,
            alpha: params.alpha,
            beta: params.beta,
        }
    }

    // The j-th sequence entry. Indices below zero are a caller bug.
    fn jth(&self, j: i64) -> f64 {
        assert!(j >= 0, "negative sequence index {j}");
        (self.alpha * j as f64 + self.beta) / self.v
    }

    /// Cheapest entry of the sequence.
    fn x_a(&self) -> f64 {
        self.beta / self.v
    }

    /// Density of the sequence: the gap between consecutive entries.
    fn y_a(&self) -> f64 {
        self.alpha / self.v
    }

    /// Number of entries at or below `x`.
    fn r(&self, x: f64) -> i64 {
        if x >= self.x_a() {
            1 + fuzzy::fuzzy_floor((x - self.x_a()) / self.y_a())
        } else {
            0
        }
    }

    /// Nearest entry strictly below `u`, or negative infinity if the whole
    /// sequence is at or above `u`.
    fn nearest_below(&self, u: f64) -> f64 {
        if u <= self.jth(0) {
            return f64::NEG_INFINITY;
        }
        let j = self.r(u) - 1;
        if self.jth(j) < u {
            self.jth(j)
        } else {
            self.jth(j - 1)
        }
    }

    /// Nearest entry above `l`. Entries fuzzily counted by `r(l)` are treated
    /// as at-or-below, so a threshold sitting exactly on an entry moves on to
    /// the next one.
    fn nearest_above(&self, l: f64) -> f64 {
        let j = self.r(l) - 1;
        if j == -1 {
            self.jth(0)
        } else if self.jth(j) > l {
            self.jth(j)
        } else {
            self.jth(j + 1)
        }
    }
}

// Total rank of threshold x over a set of sequences.
fn rank(x: f64, sequences: &[Sequence]) -> i64 {
    sequences.iter().map(|a| a.r(x)).sum()
}

// Continuous relaxation of the rank: total fractional number of entries
// below x.
fn s(x: f64, sequences: &[Sequence]) -> f64 {
    sequences
        .iter()
        .filter(|a| x >= a.x_a())
        .map(|a| (x - a.x_a()) / a.y_a())
        .sum()
}

// Closed-form inverse of the rank relaxation: the threshold at which the
// contributing sequences hold k fractional entries, a weighted harmonic
// combination of their cheapest entries and densities.
fn s_inv(contributing: &[Sequence], k: usize) -> f64 {
    let mut y_sum = 0.0;
    let mut xy_sum = 0.0;
    for a in contributing {
        y_sum += 1.0 / a.y_a();
        xy_sum += a.x_a() / a.y_a();
    }
    (k as f64 + xy_sum) / y_sum
}

// Phase 1: split the sequences into those contributing at least one seat and
// the rest, by repeated median partitioning on the cheapest entries. Every
// round discards or settles at least the median element, so the loop
// terminates.
fn find_contributing(mut remaining: Vec<Sequence>, k: usize) -> Vec<Sequence> {
    let mut contributing = Vec::with_capacity(remaining.len());
    while !remaining.is_empty() {
        let mut cheapest: Vec<f64> = remaining.iter().map(|a| a.x_a()).collect();
        let x = select::median(&mut cheapest);
        if s(x, &remaining) > k as f64 {
            // Too many fractional entries below x: nothing at or above the
            // median can contribute.
            remaining.retain(|a| a.x_a() < x);
        } else {
            // Everything at or below the median contributes.
            let mut rest = Vec::with_capacity(remaining.len());
            for a in remaining {
                if a.x_a() <= x {
                    contributing.push(a);
                } else {
                    rest.push(a);
                }
            }
            remaining = rest;
        }
    }
    contributing
}

// Phase 2: shrink an initial estimate until its rank drops below k, moving
// through medians of the nearest-below values and discarding sequences whose
// contribution is fully accounted for.
fn lower_coarse(mut sequences: Vec<Sequence>, mut k: i64, coarse: f64) -> f64 {
    debug_assert!(rank(coarse, &sequences) >= k);
    debug_assert!(k > 0);

    let mut u = coarse;
    let n = sequences.len() as i64;
    loop {
        let mut below: Vec<f64> = sequences.iter().map(|a| a.nearest_below(u)).collect();
        let x = select::median(&mut below);
        let rank_x = rank(x, &sequences);
        if rank_x >= k {
            u = x;
        } else if rank_x < k - n {
            // x is too coarse a cut: settle every sequence whose entries
            // below u are all at or below x, and account for their ranks.
            let mut settled = 0;
            sequences.retain(|a| {
                if a.nearest_below(u) <= x {
                    settled += a.r(x);
                    false
                } else {
                    true
                }
            });
            k -= settled;
        } else {
            return x;
        }
    }
}

// Phase 3: narrow the bracket [l, u) around the exact answer. The counter m
// tracks sequences removed while their next entry was tied with u, so the
// termination test can credit those ranks.
fn refine(mut sequences: Vec<Sequence>, mut k: i64, coarse: f64) -> f64 {
    debug_assert!(rank(coarse, &sequences) < k);
    debug_assert!(k > 0);

    let mut l = coarse;
    let mut u = f64::INFINITY;
    let mut m: i64 = 0;

    let mut next_entries: Vec<f64> = sequences.iter().map(|a| a.nearest_above(l)).collect();
    loop {
        let x = select::median(&mut next_entries);
        if rank(x, &sequences) < k {
            l = x;
        } else {
            u = x;
            m = 0;
        }

        // Keep sequences whose next entry is below u, and exactly one
        // representative of those tied with u; account for the rest.
        let mut kept = Vec::with_capacity(sequences.len());
        let mut settled = 0;
        let mut ties_with_u = 0;
        let mut picked_tie = false;
        for a in &sequences {
            let next = a.nearest_above(l);
            if fuzzy::close_to_equal(next, u) {
                ties_with_u += 1;
                if !picked_tie {
                    kept.push(*a);
                    picked_tie = true;
                } else {
                    settled += a.r(l);
                }
            } else if next < u {
                kept.push(*a);
            } else {
                settled += a.r(l);
            }
        }
        if ties_with_u >= 1 {
            m += ties_with_u - 1;
        }
        sequences = kept;
        k -= settled;

        // Loop until the remaining next entries collapse to a single fuzzy
        // value t whose rank certifies the answer.
        next_entries = sequences.iter().map(|a| a.nearest_above(l)).collect();
        let mut single_value = true;
        let mut t = None;
        for &entry in &next_entries {
            match t {
                None => t = Some(entry),
                Some(first) => {
                    if !fuzzy::close_to_equal(entry, first) {
                        single_value = false;
                        break;
                    }
                }
            }
        }
        if single_value {
            let t = t.expect("no sequences left while refining");
            let rank_t = rank(t, &sequences);
            if rank_t >= k || (fuzzy::close_to_equal(t, u) && rank_t >= k - m) {
                return t;
            }
        }
    }
}

/// The Cheng-Eppstein solver. Deterministic, worst-case linear time,
/// restricted to exactly linear divisor methods.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChengEppstein;

impl Solver for ChengEppstein {
    fn unit_size<M: DivisorMethod>(
        &mut self,
        instance: &ApportionmentInstance,
        method: &M,
    ) -> Result<UnitSize, Error> {
        let Some(params) = method.linear_params() else {
            return Err(Error::UnsupportedMethod {
                solver: self.name(),
                requirement: "linear",
            });
        };

        let sequences: Vec<Sequence> = instance
            .votes
            .iter()
            .map(|&v| Sequence::new(v, params))
            .collect();
        let k = instance.k as i64;

        let contributing = find_contributing(sequences.clone(), instance.k);
        let mut coarse = s_inv(&contributing, instance.k);
        trace!(
            "{} of {} sequences contribute, coarse estimate {coarse}",
            contributing.len(),
            sequences.len()
        );

        if rank(coarse, &sequences) >= k {
            coarse = lower_coarse(sequences.clone(), k, coarse);
        }
        // Phase 2 establishes the entry invariant of phase 3.
        assert!(
            rank(coarse, &sequences) < k,
            "coarse bound {coarse} does not have rank below {k}"
        );

        let astar = refine(sequences, k, coarse);
        Ok(UnitSize {
            astar,
            stats: SolverStats {
                contributing: contributing.len(),
                ..SolverStats::default()
            },
        })
    }

    fn name(&self) -> &'static str {
        "ChengEppstein"
    }
}
