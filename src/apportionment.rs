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

//! Apportionment problem instances and results, and the top-level
//! [`apportion`] entry point that turns a solver's unit size into seat counts
//! and tie sets.

use crate::fuzzy;
use crate::method::DivisorMethod;
use log::debug;
use std::fmt::{self, Display};
use thiserror::Error;

/// Errors reported by [`apportion`] and the solvers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// The instance is malformed. These are caller errors; no partial work is
    /// attempted.
    #[error("invalid instance: {0}")]
    InvalidInput(&'static str),
    /// The solver does not support the given divisor method. Reported before
    /// any computation, as a documented limitation rather than a degraded
    /// fallback.
    #[error("{solver} only works for {requirement} divisor sequences")]
    UnsupportedMethod {
        /// Name of the rejecting solver.
        solver: &'static str,
        /// Shape of divisor sequence the solver requires.
        requirement: &'static str,
    },
}

/// An instance of the apportionment problem: party weights and a house size.
#[derive(Debug, Clone, PartialEq)]
pub struct ApportionmentInstance {
    /// Vote (or population) count of each party, all positive.
    pub votes: Vec<f64>,
    /// Number of seats to distribute.
    pub k: usize,
}

impl ApportionmentInstance {
    /// Validates and creates an instance.
    pub fn new(votes: Vec<f64>, k: usize) -> Result<Self, Error> {
        if votes.is_empty() {
            return Err(Error::InvalidInput("votes must not be empty"));
        }
        if votes.iter().any(|&v| !(v > 0.0)) {
            return Err(Error::InvalidInput("all votes must be positive"));
        }
        if k == 0 {
            return Err(Error::InvalidInput("house size must be positive"));
        }
        if u32::try_from(k).is_err() {
            return Err(Error::InvalidInput("house size must fit in 32 bits"));
        }
        Ok(ApportionmentInstance { votes, k })
    }
}

impl Display for ApportionmentInstance {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Instance(votes={:?}, k={})", self.votes, self.k)
    }
}

/// Diagnostics reported by a solver run. Purely informational; returned
/// alongside the result rather than exposed as mutable solver state.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SolverStats {
    /// Size of the contributing set the solver worked with.
    pub contributing: usize,
    /// Number of candidate values materialized, if the solver materializes
    /// any.
    pub candidates: usize,
    /// Number of bound-estimation iterations performed.
    pub bound_iterations: usize,
}

/// A unit size together with the diagnostics of its computation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitSize {
    /// The reciprocal proportionality constant `a*`.
    pub astar: f64,
    /// Solver diagnostics.
    pub stats: SolverStats,
}

/// A solver computes the unit size `a*` such that rounding every party's
/// votes against it yields exactly `k` seats. Solvers never assign seats
/// themselves; only [`apportion`] derives seats and ties.
pub trait Solver {
    /// Computes the unit size for the given instance.
    fn unit_size<M: DivisorMethod>(
        &mut self,
        instance: &ApportionmentInstance,
        method: &M,
    ) -> Result<UnitSize, Error>;

    /// Name of this solver, for error messages and logs.
    fn name(&self) -> &'static str;
}

/// Result of an apportionment, representing every seat assignment that is
/// valid with respect to the divisor method.
///
/// Invariant: `sum(seats) <= k <= sum(seats) + count(tied_seats)`. Parties
/// with `tied_seats[i]` set are tied at value `astar` for the remaining
/// `k - sum(seats)` seats, which may be assigned to any of them.
#[derive(Debug, Clone)]
pub struct Apportionment {
    /// House size of the solved instance.
    pub k: usize,
    /// Seats certainly assigned to each party.
    pub seats: Vec<u32>,
    /// Which parties are tied for the remaining seats.
    pub tied_seats: Vec<bool>,
    /// The unit size (reciprocal proportionality constant).
    pub astar: f64,
}

impl Apportionment {
    /// Total number of seats certainly assigned.
    pub fn assigned_seats(&self) -> usize {
        self.seats.iter().map(|&s| s as usize).sum()
    }

    /// Number of seats left to distribute among the tied parties.
    pub fn open_seats(&self) -> usize {
        self.k - self.assigned_seats()
    }

    /// Enumerates every valid final seat assignment, i.e. every way of giving
    /// one extra seat to [`open_seats`](Apportionment::open_seats) of the tied
    /// parties. The iterator is finite and restartable; each yielded vector
    /// sums to exactly `k`.
    pub fn assignments(&self) -> Assignments<'_> {
        let tied: Vec<usize> = (0..self.tied_seats.len())
            .filter(|&i| self.tied_seats[i])
            .collect();
        let open = self.open_seats();
        assert!(
            open <= tied.len(),
            "more open seats ({open}) than tied parties ({})",
            tied.len()
        );
        Assignments {
            apportionment: self,
            positions: Some((0..open).collect()),
            tied,
        }
    }
}

/// Equality of apportionments compares the unit size fuzzily, since different
/// algorithms arrive at `a*` through different arithmetic.
impl PartialEq for Apportionment {
    fn eq(&self, other: &Apportionment) -> bool {
        self.k == other.k
            && self.seats == other.seats
            && self.tied_seats == other.tied_seats
            && fuzzy::close_to_equal(self.astar, other.astar)
    }
}

impl Display for Apportionment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Apportionment(seats={:?}, tied={:?}, astar={})",
            self.seats, self.tied_seats, self.astar
        )
    }
}

/// Iterator over the tie-break combinations of an [`Apportionment`].
pub struct Assignments<'a> {
    apportionment: &'a Apportionment,
    /// Indices of tied parties.
    tied: Vec<usize>,
    /// Current combination, as sorted positions into `tied`; `None` when
    /// exhausted.
    positions: Option<Vec<usize>>,
}

impl Iterator for Assignments<'_> {
    type Item = Vec<u32>;

    fn next(&mut self) -> Option<Vec<u32>> {
        let positions = self.positions.as_ref()?;
        let mut seats = self.apportionment.seats.clone();
        for &p in positions {
            seats[self.tied[p]] += 1;
        }

        // Advance to the next combination in lexicographic order.
        let t = self.tied.len();
        let r = positions.len();
        let mut next = positions.clone();
        let mut exhausted = true;
        for i in (0..r).rev() {
            if next[i] < t - r + i {
                next[i] += 1;
                for j in i + 1..r {
                    next[j] = next[j - 1] + 1;
                }
                exhausted = false;
                break;
            }
        }
        self.positions = if exhausted { None } else { Some(next) };

        Some(seats)
    }
}

/// Finds the apportionment for the given instance: computes the unit size
/// with the given solver, then derives seat counts and identifies the parties
/// tied for the marginal seats.
pub fn apportion<M: DivisorMethod>(
    instance: &ApportionmentInstance,
    method: &M,
    solver: &mut impl Solver,
) -> Result<Apportionment, Error> {
    let UnitSize { astar, stats } = solver.unit_size(instance, method)?;
    debug!(
        "{} computed astar = {astar} for {instance} ({stats:?})",
        solver.name()
    );

    let n = instance.votes.len();

    // Round every party independently against astar. This assigns a seat to
    // *every* party whose marginal value equals astar, which may exceed k.
    let mut seats = vec![0u32; n];
    for i in 0..n {
        seats[i] = (method.d_round(instance.votes[i] * astar) + 1) as u32;
    }

    // Identify ties for the last few seats: tentatively revoke every seat
    // whose value equals astar.
    let mut tied_seats = vec![false; n];
    let mut num_ties = 0;
    let mut last_tie = 0;
    for i in 0..n {
        if seats[i] == 0 {
            // A zero-seat party whose cheapest entry ties with astar cannot
            // arise from a correct unit size.
            assert!(
                !fuzzy::close_to_equal(method.d(0) / instance.votes[i], astar),
                "party {i} has no seats but is tied with astar = {astar}"
            );
        } else if fuzzy::close_to_equal(method.d(seats[i] - 1) / instance.votes[i], astar) {
            tied_seats[i] = true;
            seats[i] -= 1;
            num_ties += 1;
            last_tie = i;
        }
    }
    // A single "tie" has no alternative: it is just the marginal seat, not a
    // contested one.
    if num_ties == 1 {
        tied_seats[last_tie] = false;
        seats[last_tie] += 1;
    }

    let result = Apportionment {
        k: instance.k,
        seats,
        tied_seats,
        astar,
    };
    debug_assert!(result.assigned_seats() <= instance.k);
    debug_assert!(
        instance.k <= result.assigned_seats() + result.tied_seats.iter().filter(|&&t| t).count()
    );
    Ok(result)
}
