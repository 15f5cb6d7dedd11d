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

//! Epsilon-tolerant floating-point primitives. Every rounding decision made on
//! a computed [`f64`] value goes through this module, because repeated
//! division accumulates rounding error and exact comparisons would spuriously
//! break or miss ties.

/// Absolute tolerance governing all comparisons between computed values.
pub const EPSILON: f64 = 1e-14;

/// Number of units in the last place by which [`fuzzy_floor`] and
/// [`fuzzy_ceil`] nudge their argument before rounding. Unlike an additive
/// epsilon, a mantissa nudge scales with the magnitude of the argument, which
/// is what compensating for division error requires.
const MANTISSA_EPSILON: u64 = 16;

/// Returns true iff `x` and `y` are within [`EPSILON`] of each other.
pub fn close_to_equal(x: f64, y: f64) -> bool {
    (x - y).abs() < EPSILON
}

/// Returns true iff `x < y - EPSILON`. A value within [`EPSILON`] of `y` is
/// never fuzzy less.
pub fn fuzzy_less(x: f64, y: f64) -> bool {
    x < y - EPSILON
}

/// Returns true iff `x > y + EPSILON`. A value within [`EPSILON`] of `y` is
/// never fuzzy greater.
pub fn fuzzy_greater(x: f64, y: f64) -> bool {
    x > y + EPSILON
}

/// Returns true iff `x` is within [`EPSILON`] of an integer.
pub fn close_to_integer(x: f64) -> bool {
    (x + EPSILON).floor() != (x - EPSILON).floor()
}

/// Returns the nearby integer if `x` is within [`EPSILON`] of one.
pub fn as_integer(x: f64) -> Option<i64> {
    close_to_integer(x).then(|| (x + EPSILON).floor() as i64)
}

/// Computes `floor(x * (1 + eps))` for a small relative `eps` covering
/// potential rounding error in `x`, so that a value a few ULPs below an exact
/// integer still floors to that integer.
///
/// # Panics
///
/// Panics if `x < 0`.
pub fn fuzzy_floor(x: f64) -> i64 {
    assert!(x >= 0.0, "fuzzy_floor only works for x >= 0, got {x}");
    // -0.0 passes the assert but its bit pattern must not be nudged: the
    // sign bit would turn the nudge into a negative subnormal.
    if x == 0.0 {
        return 0;
    }
    f64::from_bits(x.to_bits() + MANTISSA_EPSILON).floor() as i64
}

/// Computes `ceil(x * (1 - eps))` for a small relative `eps` covering
/// potential rounding error in `x`, so that a value a few ULPs above an exact
/// integer still ceils to that integer.
///
/// # Panics
///
/// Panics if `x < 0`.
pub fn fuzzy_ceil(x: f64) -> i64 {
    assert!(x >= 0.0, "fuzzy_ceil only works for x >= 0, got {x}");
    // -0.0: subtracting from the sign-bit pattern would land on a NaN.
    if x == 0.0 {
        return 0;
    }
    f64::from_bits(x.to_bits().saturating_sub(MANTISSA_EPSILON)).ceil() as i64
}
