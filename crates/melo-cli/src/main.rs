//! Command-line driver: evolve a population of melodies and render the best
//! one to MIDI after every epoch.
//!
//! Usage:
//!   melo [--config run.json] [--fitness fitness.json] [--seed N] [--epochs N]
//!        [--generations N] [--output DIR] [--log-json]

mod render;
mod telemetry;

use anyhow::{anyhow, bail, Result};
use melo_core::{Music, RunConfig, Scale};
use melo_evolve::Breeder;
use melo_fitness::{FitnessExpression, Objective};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();

    telemetry::init_telemetry(args.iter().any(|a| a == "--log-json"))?;

    let config = load_config(&args)?;
    info!(
        population = config.population_size,
        length = config.sequence_length,
        epochs = config.epochs,
        seed = config.evolution.seed,
        "Starting Melo"
    );

    let expression = match &config.fitness_path {
        Some(path) => {
            info!("Loading fitness expression from {}", path);
            FitnessExpression::load(Path::new(path))?
        }
        None => FitnessExpression::default_melody(),
    };
    let objective = expression.build()?;

    let scale = Scale::range(config.pitch_low, config.pitch_high)?;
    let mut breeder = Breeder::new(config.evolution.clone(), Some(scale))?;
    let mut population = breeder.random_population(config.population_size, config.sequence_length);

    if let Some((_, score)) = best_of(&population, &objective) {
        info!("Initial fitness = {:.4}", score);
    }

    let output_dir = PathBuf::from(&config.render.output_dir);
    std::fs::create_dir_all(&output_dir)?;

    for epoch in 0..config.epochs {
        population = breeder.evolve(population, &objective, config.generations_per_epoch)?;

        let Some((choice, score)) = best_of(&population, &objective) else {
            break;
        };
        info!("Fitness #{} = {:.4}: {}", epoch, score, choice);
        for (metric, contribution) in objective.breakdown(choice) {
            debug!(%metric, contribution, "Term contribution");
        }

        let path = output_dir.join(format!("epoch_{:02}.mid", epoch));
        render::write_midi(choice, &config.render, &path)?;
        info!("Wrote {}", path.display());
    }

    Ok(())
}

/// Load the run configuration, then apply command-line overrides.
fn load_config(args: &[String]) -> Result<RunConfig> {
    let mut config = match parse_flag::<String>(args, "--config")? {
        Some(path) => RunConfig::load(Path::new(&path))?,
        None => RunConfig::default(),
    };

    if let Some(path) = parse_flag::<String>(args, "--fitness")? {
        config.fitness_path = Some(path);
    }
    if let Some(seed) = parse_flag(args, "--seed")? {
        config.evolution.seed = seed;
    }
    if let Some(epochs) = parse_flag(args, "--epochs")? {
        config.epochs = epochs;
    }
    if let Some(generations) = parse_flag(args, "--generations")? {
        config.generations_per_epoch = generations;
    }
    if let Some(dir) = parse_flag::<String>(args, "--output")? {
        config.render.output_dir = dir;
    }

    config.validate()?;
    Ok(config)
}

/// Highest-scoring melody of a population.
fn best_of<'a>(population: &'a [Music], objective: &Objective) -> Option<(&'a Music, f64)> {
    population
        .iter()
        .map(|music| (music, objective.evaluate(music)))
        .max_by(|a, b| a.1.total_cmp(&b.1))
}

/// Value following `flag`, if the flag is present. A flag with a missing or
/// unparsable value is an error.
fn parse_flag<T>(args: &[String], flag: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let Some(index) = args.iter().position(|a| a == flag) else {
        return Ok(None);
    };
    let Some(value) = args.get(index + 1) else {
        bail!("{} expects a value", flag);
    };
    value
        .parse()
        .map(Some)
        .map_err(|e| anyhow!("invalid value '{}' for {}: {}", value, flag, e))
}
