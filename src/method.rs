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

//! Divisor methods, i.e. the per-seat cost sequences `d(j)` that parameterize
//! an apportionment and the inverses needed to query them lazily.

use crate::fuzzy;

/// Parameters of an exactly linear divisor sequence `d(j) = alpha*j + beta`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearParams {
    /// Slope of the sequence.
    pub alpha: f64,
    /// Offset of the sequence.
    pub beta: f64,
}

/// A divisor method, defined by a strictly increasing cost sequence `d(j)`
/// for `j >= 0` and the inverse of its canonical continuation.
///
/// The sequence index is unsigned by construction: there is no `d(-1)`. A
/// single sentinel value for "below the sequence" cannot behave consistently
/// in every downstream min/max computation, so call sites branch explicitly on
/// the zero-seat case instead.
pub trait DivisorMethod {
    /// Returns the `j`-th value of the divisor sequence.
    fn d(&self, j: u32) -> f64;

    /// Computes the inverse of the canonical continuation of
    /// [`d`](DivisorMethod::d), i.e. the real `x` such that `d(x) = y`.
    fn delta_inv_raw(&self, y: f64) -> f64;

    /// Slope of the sequence, or of its linear envelope for almost-linear
    /// methods. Only used to size candidate buffers and derive bounds.
    fn alpha(&self) -> f64;

    /// Upper bound on the sequence offset, i.e. `d(j) <= alpha*j + beta_upper`
    /// for all `j`.
    fn beta_upper(&self) -> f64;

    /// Lower bound on the sequence offset, i.e. `d(j) >= alpha*j + beta_lower`
    /// for all `j`.
    fn beta_lower(&self) -> f64;

    /// Whether the method is stationary, i.e. `0 <= beta/alpha <= 1`.
    fn is_stationary(&self) -> bool;

    /// Returns the exact linear parameters if the sequence is exactly linear.
    /// Solvers whose correctness argument needs strict linearity gate on this.
    fn linear_params(&self) -> Option<LinearParams> {
        None
    }

    /// Like [`delta_inv_raw`](DivisorMethod::delta_inv_raw), but truncating
    /// the image to `[-1, infinity)`.
    fn delta_inv(&self, x: f64) -> f64 {
        self.delta_inv_raw(x).max(-1.0)
    }

    /// Rounds `x` according to the rounding rule implied by this divisor
    /// sequence: the result `j >= -1` satisfies `d(j) <= x < d(j+1)`, where
    /// `j = -1` means `x` lies below `d(0)`. A value a hair below `d(0)` due
    /// to rounding error counts as `0`.
    fn d_round(&self, x: f64) -> i64 {
        let j = self.delta_inv(x);
        if j >= 0.0 {
            fuzzy::fuzzy_floor(j)
        } else if fuzzy::close_to_equal(j, 0.0) {
            0
        } else {
            -1
        }
    }
}

/// A divisor method whose sequence is exactly `d(j) = alpha*j + beta`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Linear {
    alpha: f64,
    beta: f64,
}

impl Linear {
    /// Creates a linear divisor method with sequence `alpha*j + beta`.
    ///
    /// # Panics
    ///
    /// Panics unless `alpha > 0` and `beta >= 0`.
    pub fn new(alpha: f64, beta: f64) -> Self {
        assert!(
            alpha > 0.0 && beta >= 0.0,
            "illegal method parameters alpha={alpha}, beta={beta}"
        );
        Linear { alpha, beta }
    }

    /// Sainte-Laguë / Webster, divisors 1, 3, 5, ...
    pub fn sainte_lague() -> Self {
        Linear::new(2.0, 1.0)
    }

    /// Greatest divisors / D'Hondt / Jefferson, divisors 1, 2, 3, ...
    pub fn greatest_divisors() -> Self {
        Linear::new(1.0, 1.0)
    }

    /// Smallest divisors / Adams, divisors 0, 1, 2, ...
    pub fn smallest_divisors() -> Self {
        Linear::new(1.0, 0.0)
    }

    /// Danish method, divisors 1, 4, 7, ...
    pub fn danish() -> Self {
        Linear::new(3.0, 1.0)
    }

    /// Imperiali method, divisors 2, 3, 4, ...
    pub fn imperiali() -> Self {
        Linear::new(1.0, 2.0)
    }
}

impl DivisorMethod for Linear {
    fn d(&self, j: u32) -> f64 {
        self.alpha * j as f64 + self.beta
    }

    fn delta_inv_raw(&self, y: f64) -> f64 {
        (y - self.beta) / self.alpha
    }

    fn alpha(&self) -> f64 {
        self.alpha
    }

    fn beta_upper(&self) -> f64 {
        self.beta
    }

    fn beta_lower(&self) -> f64 {
        self.beta
    }

    fn is_stationary(&self) -> bool {
        self.beta / self.alpha <= 1.0
    }

    fn linear_params(&self) -> Option<LinearParams> {
        Some(LinearParams {
            alpha: self.alpha,
            beta: self.beta,
        })
    }
}

/// Modified Sainte-Laguë, divisors 1.4, 3, 5, ... The first step has a
/// shallower slope, so the sequence is only almost linear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModifiedSainteLague;

impl DivisorMethod for ModifiedSainteLague {
    fn d(&self, j: u32) -> f64 {
        if j < 1 {
            1.6 * j as f64 + 1.4
        } else {
            2.0 * j as f64 + 1.0
        }
    }

    fn delta_inv_raw(&self, y: f64) -> f64 {
        if y >= 3.0 {
            0.5 * (y - 1.0)
        } else {
            -0.625 * (1.4 - y)
        }
    }

    fn alpha(&self) -> f64 {
        2.0
    }

    fn beta_upper(&self) -> f64 {
        1.4
    }

    fn beta_lower(&self) -> f64 {
        1.0
    }

    fn is_stationary(&self) -> bool {
        false
    }
}

/// Equal proportions / Hill-Huntington: `d(j)` is the geometric mean of `j`
/// and `j + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EqualProportions;

impl DivisorMethod for EqualProportions {
    fn d(&self, j: u32) -> f64 {
        let j = j as f64;
        (j * (j + 1.0)).sqrt()
    }

    fn delta_inv_raw(&self, y: f64) -> f64 {
        0.5 * (-1.0 + (1.0 + 4.0 * y * y).sqrt())
    }

    fn alpha(&self) -> f64 {
        1.0
    }

    fn beta_upper(&self) -> f64 {
        0.5
    }

    fn beta_lower(&self) -> f64 {
        0.0
    }

    fn is_stationary(&self) -> bool {
        false
    }
}

/// Harmonic mean / Dean: `d(j)` is the harmonic mean of `j` and `j + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HarmonicMean;

impl DivisorMethod for HarmonicMean {
    fn d(&self, j: u32) -> f64 {
        let j = j as f64;
        2.0 * j * (j + 1.0) / (2.0 * j + 1.0)
    }

    fn delta_inv_raw(&self, y: f64) -> f64 {
        0.5 * (-1.0 + y + (1.0 + y * y).sqrt())
    }

    fn alpha(&self) -> f64 {
        1.0
    }

    fn beta_upper(&self) -> f64 {
        0.5
    }

    fn beta_lower(&self) -> f64 {
        0.0
    }

    fn is_stationary(&self) -> bool {
        false
    }
}
