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

//! Seat apportionment by divisor methods, with solvers running in (expected
//! or worst-case) linear time.
//!
//! An apportionment instance is a list of party vote counts and a house size
//! `k`. A divisor method turns each party's votes into a sequence of
//! candidate values, and the `k` globally cheapest candidates win the seats.
//! The solvers in this crate compute the threshold value `a*` separating
//! winning candidates from losing ones without materializing the sequences:
//!
//! - [`sandwich::SandwichSelect`] brackets `a*` with closed-form bounds and
//!   selects it from a linear-size candidate set (expected linear time);
//! - [`cheng_eppstein::ChengEppstein`] narrows in on `a*` by repeated median
//!   partitioning (worst-case linear time, linear divisor methods only).
//!
//! [`apportionment::apportion`] turns the threshold into per-party seat
//! counts and reports the parties tied for the marginal seats.

#![forbid(unsafe_code)]

pub mod apportionment;
pub mod cheng_eppstein;
pub mod fuzzy;
pub mod method;
pub mod sandwich;
pub mod select;
pub mod util;
