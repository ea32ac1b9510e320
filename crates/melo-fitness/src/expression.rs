//! Declarative fitness expressions.
//!
//! A fitness expression is a list of terms, each naming a metric, a target
//! value (`bias`) and a `weight`. The compiled objective scores a melody as
//! `sum(-|metric(music) - bias| * weight)`, so 0 is the best attainable
//! score and every term pulls its metric towards the target.
//!
//! Metric names are resolved against a closed registry when the objective
//! is built; an unknown name or an argument the metric does not take is an
//! error before any melody is scored.

use crate::metrics::{self, DEFAULT_DISTANCE, DEFAULT_INTERVALS};
use crate::Fitness;
use melo_core::{Error, Music, PitchClassSet, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// Registry of available metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Silent,
    NewNotes,
    RepeatedNotes,
    RepeatedPrecisely,
    NoteMean,
    NoteVariance,
    ConsecutiveIntervals,
    Syncopation,
    InScale,
    LengthMean,
    LengthVariance,
}

impl Metric {
    pub const ALL: [Metric; 11] = [
        Metric::Silent,
        Metric::NewNotes,
        Metric::RepeatedNotes,
        Metric::RepeatedPrecisely,
        Metric::NoteMean,
        Metric::NoteVariance,
        Metric::ConsecutiveIntervals,
        Metric::Syncopation,
        Metric::InScale,
        Metric::LengthMean,
        Metric::LengthVariance,
    ];

    /// Stable key used in fitness expressions.
    pub fn key(self) -> &'static str {
        match self {
            Metric::Silent => "silent",
            Metric::NewNotes => "new_notes",
            Metric::RepeatedNotes => "repeated_notes",
            Metric::RepeatedPrecisely => "repeated_precisely",
            Metric::NoteMean => "note_mean",
            Metric::NoteVariance => "note_variance",
            Metric::ConsecutiveIntervals => "consecutive_intervals",
            Metric::Syncopation => "syncopation",
            Metric::InScale => "in_scale",
            Metric::LengthMean => "length_mean",
            Metric::LengthVariance => "length_variance",
        }
    }

    /// Bind keyword arguments, checking they are ones this metric accepts.
    fn bind(self, args: &MetricArgs) -> Result<BoundMetric> {
        let reject = |name: &str| Error::InvalidArgument {
            metric: self.key().to_string(),
            reason: format!("unexpected argument '{}'", name),
        };
        let allowed: &[&str] = match self {
            Metric::RepeatedNotes | Metric::RepeatedPrecisely => &["dist"],
            Metric::ConsecutiveIntervals => &["intervals"],
            Metric::Syncopation => &["modulus"],
            Metric::InScale => &["scale"],
            _ => &[],
        };
        if let Some(name) = args.provided().into_iter().find(|name| !allowed.contains(name)) {
            return Err(reject(name));
        }

        let dist = args.dist.unwrap_or(DEFAULT_DISTANCE);
        let bound = match self {
            Metric::Silent => BoundMetric::Silent,
            Metric::NewNotes => BoundMetric::NewNotes,
            Metric::RepeatedNotes => BoundMetric::RepeatedNotes { dist },
            Metric::RepeatedPrecisely => BoundMetric::RepeatedPrecisely { dist },
            Metric::NoteMean => BoundMetric::NoteMean,
            Metric::NoteVariance => BoundMetric::NoteVariance,
            Metric::ConsecutiveIntervals => BoundMetric::ConsecutiveIntervals {
                intervals: args.intervals.unwrap_or(DEFAULT_INTERVALS),
            },
            Metric::Syncopation => BoundMetric::Syncopation {
                modulus: args.modulus.unwrap_or(0),
            },
            Metric::InScale => BoundMetric::InScale {
                scale: args.scale.ok_or_else(|| Error::InvalidArgument {
                    metric: self.key().to_string(),
                    reason: "missing required argument 'scale'".to_string(),
                })?,
            },
            Metric::LengthMean => BoundMetric::LengthMean,
            Metric::LengthVariance => BoundMetric::LengthVariance,
        };
        Ok(bound)
    }
}

impl FromStr for Metric {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        Metric::ALL
            .into_iter()
            .find(|metric| metric.key() == name)
            .ok_or_else(|| Error::UnknownMetric(name.to_string()))
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Keyword arguments of a fitness term.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricArgs {
    /// Window for `repeated_notes` and `repeated_precisely`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dist: Option<usize>,
    /// Bar length in steps for `syncopation`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modulus: Option<usize>,
    /// Pitch classes for `in_scale`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<PitchClassSet>,
    /// Interval score table for `consecutive_intervals`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intervals: Option<[f64; 12]>,
}

impl MetricArgs {
    fn provided(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.dist.is_some() {
            names.push("dist");
        }
        if self.modulus.is_some() {
            names.push("modulus");
        }
        if self.scale.is_some() {
            names.push("scale");
        }
        if self.intervals.is_some() {
            names.push("intervals");
        }
        names
    }

    pub fn with_dist(dist: usize) -> Self {
        Self {
            dist: Some(dist),
            ..Default::default()
        }
    }

    pub fn with_scale(scale: PitchClassSet) -> Self {
        Self {
            scale: Some(scale),
            ..Default::default()
        }
    }
}

/// One target-matching term of a fitness expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitnessTerm {
    /// Registry key of the metric
    pub function: String,
    /// Target value of the metric
    pub bias: f64,
    /// Penalty per unit of deviation from the target
    pub weight: f64,
    #[serde(default)]
    pub args: MetricArgs,
}

impl FitnessTerm {
    pub fn new(metric: Metric, bias: f64, weight: f64) -> Self {
        Self {
            function: metric.key().to_string(),
            bias,
            weight,
            args: MetricArgs::default(),
        }
    }

    pub fn with_args(mut self, args: MetricArgs) -> Self {
        self.args = args;
        self
    }
}

/// Ordered list of fitness terms, as read from JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FitnessExpression {
    pub terms: Vec<FitnessTerm>,
}

impl FitnessExpression {
    pub fn new(terms: Vec<FitnessTerm>) -> Self {
        Self { terms }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn build(&self) -> Result<Objective> {
        build_objective(&self.terms)
    }

    /// A general-purpose objective for lively, mostly stepwise melodies in
    /// C major with some rhythmic variety.
    pub fn default_melody() -> Self {
        Self::new(vec![
            FitnessTerm::new(Metric::Silent, 0.0, 1.0),
            FitnessTerm::new(Metric::NewNotes, 0.75, 1.0),
            FitnessTerm::new(Metric::RepeatedPrecisely, 0.5, 40.0)
                .with_args(MetricArgs::with_dist(4)),
            FitnessTerm::new(Metric::ConsecutiveIntervals, 0.33, 1.0),
            FitnessTerm::new(Metric::InScale, 1.0, 5.0)
                .with_args(MetricArgs::with_scale(PitchClassSet::major(60))),
            FitnessTerm::new(Metric::Syncopation, 1.0, 1.0),
            FitnessTerm::new(Metric::RepeatedNotes, 0.0, 1.0).with_args(MetricArgs::with_dist(1)),
            FitnessTerm::new(Metric::LengthMean, 1.25, 1.0),
            FitnessTerm::new(Metric::LengthVariance, 1.0, 1.0),
        ])
    }
}

/// A metric with its arguments resolved.
#[derive(Debug, Clone, PartialEq)]
enum BoundMetric {
    Silent,
    NewNotes,
    RepeatedNotes { dist: usize },
    RepeatedPrecisely { dist: usize },
    NoteMean,
    NoteVariance,
    ConsecutiveIntervals { intervals: [f64; 12] },
    Syncopation { modulus: usize },
    InScale { scale: PitchClassSet },
    LengthMean,
    LengthVariance,
}

impl BoundMetric {
    fn evaluate(&self, music: &Music) -> f64 {
        match self {
            BoundMetric::Silent => metrics::fraction_silent(music),
            BoundMetric::NewNotes => metrics::fraction_new_notes(music),
            BoundMetric::RepeatedNotes { dist } => metrics::fraction_repeated_notes(music, *dist),
            BoundMetric::RepeatedPrecisely { dist } => {
                metrics::fraction_repeated_precisely(music, *dist)
            }
            BoundMetric::NoteMean => metrics::note_mean(music),
            BoundMetric::NoteVariance => metrics::note_variance(music),
            BoundMetric::ConsecutiveIntervals { intervals } => {
                metrics::consecutive_intervals(music, intervals)
            }
            BoundMetric::Syncopation { modulus } => metrics::syncopation(music, *modulus),
            BoundMetric::InScale { scale } => metrics::fraction_in_scale(music, scale),
            BoundMetric::LengthMean => metrics::length_mean(music),
            BoundMetric::LengthVariance => metrics::length_variance(music),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct ObjectiveTerm {
    metric: Metric,
    bound: BoundMetric,
    bias: f64,
    weight: f64,
}

impl ObjectiveTerm {
    fn evaluate(&self, music: &Music) -> f64 {
        -(self.bound.evaluate(music) - self.bias).abs() * self.weight
    }
}

/// A compiled fitness expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Objective {
    terms: Vec<ObjectiveTerm>,
}

impl Objective {
    /// Total score, at most 0 for non-negative weights.
    pub fn evaluate(&self, music: &Music) -> f64 {
        self.terms.iter().map(|term| term.evaluate(music)).sum()
    }

    /// Contribution of each term, in expression order.
    pub fn breakdown(&self, music: &Music) -> Vec<(Metric, f64)> {
        self.terms
            .iter()
            .map(|term| (term.metric, term.evaluate(music)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

impl Fitness for Objective {
    fn score(&self, music: &Music) -> f64 {
        self.evaluate(music)
    }
}

/// Compile fitness terms into an objective, resolving every metric name and
/// argument up front.
pub fn build_objective(terms: &[FitnessTerm]) -> Result<Objective> {
    let terms = terms
        .iter()
        .map(|term| {
            let metric: Metric = term.function.parse()?;
            if !term.bias.is_finite() || !term.weight.is_finite() {
                return Err(Error::InvalidArgument {
                    metric: metric.key().to_string(),
                    reason: "bias and weight must be finite".to_string(),
                });
            }
            Ok(ObjectiveTerm {
                metric,
                bound: metric.bind(&term.args)?,
                bias: term.bias,
                weight: term.weight,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    debug!("Built objective with {} terms", terms.len());
    Ok(Objective { terms })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn music(codes: &[i32]) -> Music {
        Music::from_codes(codes).unwrap()
    }

    #[test]
    fn test_parse_expression() {
        let json = r#"[
            {"function": "silent", "bias": 0.5, "weight": 1},
            {"function": "new_notes", "bias": 0, "weight": 1},
            {"function": "repeated_precisely", "bias": 1, "weight": 2, "args": {"dist": 2}}
        ]"#;
        let objective = FitnessExpression::from_json(json).unwrap().build().unwrap();
        let fitness = objective.evaluate(&music(&[-1, -2, 5, 4, 3, 4]));
        let expected = -(2.0f64 / 6.0 - 0.5).abs() - (4.0f64 / 6.0).abs() - 2.0 * (0.5f64 - 1.0).abs();
        assert!((fitness - expected).abs() < 1e-9, "{} != {}", fitness, expected);
    }

    #[test]
    fn test_unknown_metric_fails_at_build() {
        let expression = FitnessExpression::new(vec![FitnessTerm {
            function: "loudness".to_string(),
            bias: 0.0,
            weight: 1.0,
            args: MetricArgs::default(),
        }]);
        assert!(matches!(expression.build(), Err(Error::UnknownMetric(name)) if name == "loudness"));
    }

    #[test]
    fn test_unexpected_argument_rejected() {
        let term = FitnessTerm::new(Metric::NoteMean, 60.0, 1.0).with_args(MetricArgs::with_dist(2));
        assert!(matches!(
            build_objective(&[term]),
            Err(Error::InvalidArgument { .. })
        ));

        // Unknown argument names are rejected while parsing.
        let json = r#"[{"function": "silent", "bias": 0, "weight": 1, "args": {"depth": 3}}]"#;
        assert!(FitnessExpression::from_json(json).is_err());
    }

    #[test]
    fn test_in_scale_requires_scale() {
        let term = FitnessTerm::new(Metric::InScale, 1.0, 1.0);
        assert!(build_objective(&[term]).is_err());

        let json = r#"[{"function": "in_scale", "bias": 1, "weight": 1, "args": {"scale": [0, 2, 4, 5, 7, 9, 11]}}]"#;
        let objective = FitnessExpression::from_json(json).unwrap().build().unwrap();
        let score = objective.evaluate(&music(&[12, 26, 5, 25, 37]));
        assert!((score - -0.4).abs() < 1e-9);
    }

    #[test]
    fn test_metric_keys_round_trip() {
        for metric in Metric::ALL {
            assert_eq!(metric.key().parse::<Metric>().unwrap(), metric);
        }
        assert!("fraction_silent".parse::<Metric>().is_err());
    }

    #[test]
    fn test_breakdown_preserves_order() {
        let objective = FitnessExpression::new(vec![
            FitnessTerm::new(Metric::NewNotes, 1.0, 2.0),
            FitnessTerm::new(Metric::Silent, 0.0, 1.0),
        ])
        .build()
        .unwrap();
        let melody = music(&[60, -1, 62, -2]);
        let breakdown = objective.breakdown(&melody);
        assert_eq!(breakdown.len(), 2);
        assert_eq!(breakdown[0].0, Metric::NewNotes);
        assert!((breakdown[0].1 - -1.0).abs() < 1e-9);
        assert_eq!(breakdown[1].0, Metric::Silent);
        assert!((breakdown[1].1 - -0.25).abs() < 1e-9);
        let total: f64 = breakdown.iter().map(|(_, score)| score).sum();
        assert!((objective.evaluate(&melody) - total).abs() < 1e-12);
    }

    #[test]
    fn test_empty_expression_scores_zero() {
        let objective = build_objective(&[]).unwrap();
        assert!(objective.is_empty());
        assert_eq!(objective.evaluate(&music(&[60, 62])), 0.0);
    }

    #[test]
    fn test_default_melody_builds() {
        let objective = FitnessExpression::default_melody().build().unwrap();
        assert_eq!(objective.len(), 9);
        assert!(objective.evaluate(&music(&[60, 62, 64, 65, -2, 67, -1, 60])) <= 0.0);
    }

    #[test]
    fn test_expression_serialization() {
        let expression = FitnessExpression::default_melody();
        let json = serde_json::to_string(&expression).unwrap();
        let back = FitnessExpression::from_json(&json).unwrap();
        assert_eq!(back, expression);
    }
}
