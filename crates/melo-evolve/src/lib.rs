//! Evolutionary engine for melodies.
//!
//! Random generation, mutation and crossover operate on single melodies;
//! `generation_step` turns one population into the next by shuffling,
//! mutating a fraction, ranking by fitness and replacing the weakest with
//! crossover children of the survivors. All randomness comes from an
//! explicit, seedable generator.

pub mod sampling;
pub mod mutation;
pub mod generation;

pub use sampling::{random_population, random_sequence, sample_note};
pub use mutation::{crossover, mutate};
pub use generation::{evaluate_generation, generation_step, Breeder};
