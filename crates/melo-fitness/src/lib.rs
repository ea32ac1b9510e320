//! Fitness heuristics for monophonic melodies.
//!
//! Two layers:
//! - `metrics`: pure functions mapping a melody to a real number
//! - `expression`: a declarative list of target-matching terms over those
//!   metrics, compiled into a single scalar objective

pub mod metrics;
pub mod expression;

pub use expression::{build_objective, FitnessExpression, FitnessTerm, Metric, MetricArgs, Objective};

use melo_core::Music;

/// Anything that scores a melody. Higher is better.
pub trait Fitness {
    fn score(&self, music: &Music) -> f64;
}

impl<F> Fitness for F
where
    F: Fn(&Music) -> f64,
{
    fn score(&self, music: &Music) -> f64 {
        self(music)
    }
}
