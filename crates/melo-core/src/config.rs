//! Configuration types for evolution runs.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Per-generation evolution parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    /// Per-position replacement probability for mutated individuals (0.0 to 1.0)
    pub mutation_chance: f64,
    /// Fraction of the population mutated each generation (0.0 to 1.0)
    pub mutation_fraction: f64,
    /// Fraction of the lowest-scoring individuals replaced by crossover children
    pub crossover_fraction: f64,
    /// Random seed for reproducibility
    pub seed: u64,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            mutation_chance: 0.125,
            mutation_fraction: 0.25,
            crossover_fraction: 0.25,
            seed: 0,
        }
    }
}

impl EvolutionConfig {
    pub fn validate(&self) -> Result<()> {
        check_unit("mutation_chance", self.mutation_chance)?;
        check_unit("mutation_fraction", self.mutation_fraction)?;
        check_unit("crossover_fraction", self.crossover_fraction)?;
        if self.crossover_fraction >= 1.0 {
            return Err(Error::InvalidConfig(
                "crossover_fraction of 1.0 leaves no parents to breed from".to_string(),
            ));
        }
        Ok(())
    }
}

/// Check that a probability or fraction lies in `[0, 1]`.
pub fn check_unit(name: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(Error::InvalidConfig(format!(
            "{} must be within [0, 1], got {}",
            name, value
        )));
    }
    Ok(())
}

/// MIDI rendering parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Tempo, one time step per beat
    pub tempo_bpm: u16,
    /// Note-on velocity
    pub velocity: u8,
    /// Directory rendered MIDI files are written to
    pub output_dir: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            tempo_bpm: 240, // quarter of a second per step
            velocity: 63,
            output_dir: "./output".to_string(),
        }
    }
}

impl RenderConfig {
    /// Slowest tempo whose beat length fits a 24-bit MIDI tempo event.
    pub const MIN_TEMPO_BPM: u16 = 4;

    pub fn validate(&self) -> Result<()> {
        if self.tempo_bpm < Self::MIN_TEMPO_BPM {
            return Err(Error::InvalidConfig(format!(
                "tempo_bpm must be at least {}, got {}",
                Self::MIN_TEMPO_BPM,
                self.tempo_bpm
            )));
        }
        // Velocity 0 on a note-on is a note-off.
        if !(1..=127).contains(&self.velocity) {
            return Err(Error::InvalidConfig(format!(
                "velocity must be within [1, 127], got {}",
                self.velocity
            )));
        }
        Ok(())
    }
}

/// Driver configuration for a full run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Number of melodies in the population
    pub population_size: usize,
    /// Time steps per melody
    pub sequence_length: usize,
    /// Number of epochs; the best melody is rendered after each one
    pub epochs: usize,
    /// Generations per epoch
    pub generations_per_epoch: usize,
    /// Lowest pitch (inclusive) notes are drawn from
    pub pitch_low: i32,
    /// Highest pitch (exclusive) notes are drawn from
    pub pitch_high: i32,
    /// JSON fitness expression; the built-in objective is used when absent
    pub fitness_path: Option<String>,
    pub evolution: EvolutionConfig,
    pub render: RenderConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            population_size: 100,
            sequence_length: 32,
            epochs: 4,
            generations_per_epoch: 200,
            pitch_low: 60,
            pitch_high: 84, // two octaves above middle C
            fitness_path: None,
            evolution: EvolutionConfig::default(),
            render: RenderConfig::default(),
        }
    }
}

impl RunConfig {
    /// Load a run configuration from a JSON file. Missing fields take defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: RunConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.population_size == 0 {
            return Err(Error::InvalidConfig("population_size must be positive".to_string()));
        }
        if self.pitch_low < 0 || self.pitch_high <= self.pitch_low {
            return Err(Error::InvalidConfig(format!(
                "invalid pitch range {}..{}",
                self.pitch_low, self.pitch_high
            )));
        }
        self.evolution.validate()?;
        self.render.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_configs() {
        let evolution = EvolutionConfig::default();
        assert_eq!(evolution.mutation_chance, 0.125);
        assert!(evolution.validate().is_ok());

        let run = RunConfig::default();
        assert_eq!(run.population_size, 100);
        assert_eq!(run.sequence_length, 32);
        assert!(run.validate().is_ok());
    }

    #[test]
    fn test_invalid_fractions() {
        let config = EvolutionConfig {
            mutation_fraction: 1.5,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let config = EvolutionConfig {
            crossover_fraction: 1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_run_config_deserialization() {
        let config: RunConfig =
            serde_json::from_str(r#"{"epochs": 2, "evolution": {"seed": 7}}"#).unwrap();
        assert_eq!(config.epochs, 2);
        assert_eq!(config.evolution.seed, 7);
        assert_eq!(config.evolution.mutation_fraction, 0.25);
        assert_eq!(config.population_size, 100);
    }

    #[test]
    fn test_render_config_bounds() {
        assert!(RenderConfig::default().validate().is_ok());

        let slow = RenderConfig {
            tempo_bpm: 3,
            ..Default::default()
        };
        assert!(matches!(slow.validate(), Err(Error::InvalidConfig(_))));
        let slowest = RenderConfig {
            tempo_bpm: RenderConfig::MIN_TEMPO_BPM,
            ..Default::default()
        };
        assert!(slowest.validate().is_ok());

        for velocity in [0, 128] {
            let config = RenderConfig {
                velocity,
                ..Default::default()
            };
            assert!(config.validate().is_err(), "velocity {} accepted", velocity);
        }
    }

    #[test]
    fn test_run_config_checks_render() {
        let config: RunConfig =
            serde_json::from_str(r#"{"render": {"velocity": 0}}"#).unwrap();
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_invalid_pitch_range() {
        let config = RunConfig {
            pitch_low: 70,
            pitch_high: 60,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
