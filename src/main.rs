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

//! Command-line program for divisor-method seat apportionment.

#![deny(missing_docs)]
#![forbid(unsafe_code)]

use apportion_rs::apportionment::{apportion, Apportionment, ApportionmentInstance};
use apportion_rs::cheng_eppstein::ChengEppstein;
use apportion_rs::method::{
    DivisorMethod, EqualProportions, HarmonicMean, Linear, ModifiedSainteLague,
};
use apportion_rs::sandwich::SandwichSelect;
use clap::Parser;
use log::info;
use std::error::Error;
use std::io::{self, Write};

/// Rust implementation of divisor-method seat apportionment.
#[derive(Parser, Debug, PartialEq)]
struct Cli {
    /// Number of seats to distribute.
    #[arg(long)]
    seats: usize,

    /// Divisor method to apportion by.
    #[arg(long, value_enum)]
    method: Method,

    /// Algorithm computing the unit size.
    #[arg(long, value_enum, default_value = "sandwich")]
    algorithm: Algorithm,

    /// Seed for the randomized selection step.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Vote counts, one per party.
    #[arg(required = true)]
    votes: Vec<f64>,
}

/// Divisor method defining each party's sequence of candidate values.
#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Method {
    /// Sainte-Laguë/Webster, d(j) = 2j + 1.
    SainteLague,
    /// D'Hondt/Jefferson, d(j) = j + 1.
    GreatestDivisors,
    /// Adams, d(j) = j.
    SmallestDivisors,
    /// Danish method, d(j) = 3j + 1.
    Danish,
    /// Imperiali method, d(j) = j + 2.
    Imperiali,
    /// Sainte-Laguë with a raised first divisor of 1.4.
    ModifiedSainteLague,
    /// Hill/Huntington, d(j) = sqrt(j * (j + 1)).
    EqualProportions,
    /// Dean, d(j) = 2j(j + 1) / (2j + 1).
    HarmonicMean,
}

/// Algorithm computing the unit size.
#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Algorithm {
    /// Randomized sandwich-bound selection, expected linear time.
    Sandwich,
    /// Sandwich-bound selection with iterated bound refinement.
    SandwichIterated,
    /// Cheng-Eppstein median partitioning, worst-case linear time. Only
    /// supports linear divisor methods.
    ChengEppstein,
}

impl Cli {
    /// Apportions the seats given on the command line and writes the result.
    fn run(&self, w: &mut impl Write) -> Result<(), Box<dyn Error>> {
        let instance = ApportionmentInstance::new(self.votes.clone(), self.seats)?;
        info!(
            "apportioning {} seats among {} parties with {:?}/{:?}",
            self.seats,
            self.votes.len(),
            self.method,
            self.algorithm
        );
        let result = match self.method {
            Method::SainteLague => self.solve(&instance, &Linear::sainte_lague()),
            Method::GreatestDivisors => self.solve(&instance, &Linear::greatest_divisors()),
            Method::SmallestDivisors => self.solve(&instance, &Linear::smallest_divisors()),
            Method::Danish => self.solve(&instance, &Linear::danish()),
            Method::Imperiali => self.solve(&instance, &Linear::imperiali()),
            Method::ModifiedSainteLague => self.solve(&instance, &ModifiedSainteLague),
            Method::EqualProportions => self.solve(&instance, &EqualProportions),
            Method::HarmonicMean => self.solve(&instance, &HarmonicMean),
        }?;

        writeln!(w, "{result}")?;
        if result.open_seats() > 0 {
            writeln!(w, "Possible assignments:")?;
            for assignment in result.assignments() {
                writeln!(w, "  {assignment:?}")?;
            }
        }
        Ok(())
    }

    fn solve<M: DivisorMethod>(
        &self,
        instance: &ApportionmentInstance,
        method: &M,
    ) -> Result<Apportionment, apportion_rs::apportionment::Error> {
        match self.algorithm {
            Algorithm::Sandwich => {
                apportion(instance, method, &mut SandwichSelect::seeded(self.seed))
            }
            Algorithm::SandwichIterated => {
                let mut solver = SandwichSelect::seeded(self.seed);
                solver.iterate_bounds = true;
                apportion(instance, method, &mut solver)
            }
            Algorithm::ChengEppstein => apportion(instance, method, &mut ChengEppstein),
        }
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    cli.run(&mut io::stdout().lock()).unwrap();
}
