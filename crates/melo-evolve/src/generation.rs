//! Per-generation selection and replacement.

use crate::mutation::{crossover, mutate};
use crate::sampling::random_population;
use melo_core::{Error, EvolutionConfig, Music, Population, Result, Scale};
use melo_fitness::Fitness;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, instrument};

/// Run one generation and keep the scores.
///
/// 1. Shuffle the population.
/// 2. Mutate the first `floor(size * mutation_fraction)` individuals.
/// 3. Score everyone and sort ascending (stable).
/// 4. Replace the lowest `floor(size * crossover_fraction)` entries with
///    children of two parents drawn with replacement from the rest.
///
/// Children are scored as they are created and the result is sorted again,
/// so the returned pairs are ascending by their true score.
#[instrument(skip_all, fields(size = population.len()))]
pub fn evaluate_generation<R, F>(
    rng: &mut R,
    mut population: Population,
    objective: &F,
    config: &EvolutionConfig,
    scale: Option<&Scale>,
) -> Result<Vec<(Music, f64)>>
where
    R: Rng + ?Sized,
    F: Fitness + ?Sized,
{
    let size = population.len();
    if size == 0 {
        return Err(Error::EmptyPopulation);
    }
    config.validate()?;
    let length = population[0].len();
    if let Some(odd) = population.iter().find(|music| music.len() != length) {
        return Err(Error::LengthMismatch {
            left: length,
            right: odd.len(),
        });
    }

    let to_replace = (size as f64 * config.crossover_fraction).floor() as usize;
    if to_replace >= size {
        return Err(Error::InvalidConfig(format!(
            "crossover would replace all {} individuals, leaving no parents",
            size
        )));
    }

    population.shuffle(rng);

    let to_mutate = (size as f64 * config.mutation_fraction).floor() as usize;
    for individual in population.iter_mut().take(to_mutate) {
        *individual = mutate(rng, individual, config.mutation_chance, scale)?;
    }

    let mut scored: Vec<(Music, f64)> = population
        .into_iter()
        .map(|music| {
            let score = objective.score(&music);
            (music, score)
        })
        .collect();
    scored.sort_by(|a, b| a.1.total_cmp(&b.1));

    for i in 0..to_replace {
        let left = rng.gen_range(to_replace..size);
        let right = rng.gen_range(to_replace..size);
        let child = crossover(rng, &scored[left].0, &scored[right].0)?;
        let score = objective.score(&child);
        scored[i] = (child, score);
    }
    scored.sort_by(|a, b| a.1.total_cmp(&b.1));

    debug!(
        mutated = to_mutate,
        replaced = to_replace,
        best = scored[size - 1].1,
        worst = scored[0].1,
        "Generation complete"
    );

    Ok(scored)
}

/// Turn one population into the next. The result has the same size and
/// melody length, ordered from worst to best.
pub fn generation_step<R, F>(
    rng: &mut R,
    population: Population,
    objective: &F,
    config: &EvolutionConfig,
    scale: Option<&Scale>,
) -> Result<Population>
where
    R: Rng + ?Sized,
    F: Fitness + ?Sized,
{
    let scored = evaluate_generation(rng, population, objective, config, scale)?;
    Ok(scored.into_iter().map(|(music, _)| music).collect())
}

/// Owns the evolution parameters, the note scale and a seeded generator,
/// and drives populations through successive generations.
pub struct Breeder {
    config: EvolutionConfig,
    scale: Option<Scale>,
    rng: ChaCha8Rng,
    generation: u64,
}

impl Breeder {
    pub fn new(config: EvolutionConfig, scale: Option<Scale>) -> Result<Self> {
        config.validate()?;
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Ok(Self {
            config,
            scale,
            rng,
            generation: 0,
        })
    }

    /// Number of generations run so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Seed a population of random melodies drawn from this breeder's scale.
    pub fn random_population(&mut self, size: usize, length: usize) -> Population {
        random_population(&mut self.rng, size, length, self.scale.as_ref())
    }

    /// Run a single generation, keeping scores.
    pub fn step_scored<F>(&mut self, population: Population, objective: &F) -> Result<Vec<(Music, f64)>>
    where
        F: Fitness + ?Sized,
    {
        let scored = evaluate_generation(
            &mut self.rng,
            population,
            objective,
            &self.config,
            self.scale.as_ref(),
        )?;
        self.generation += 1;
        Ok(scored)
    }

    /// Run a single generation.
    pub fn step<F>(&mut self, population: Population, objective: &F) -> Result<Population>
    where
        F: Fitness + ?Sized,
    {
        let scored = self.step_scored(population, objective)?;
        Ok(scored.into_iter().map(|(music, _)| music).collect())
    }

    /// Run `generations` generations; the returned population is sorted from
    /// worst to best as of the last one.
    #[instrument(skip(self, population, objective), fields(size = population.len()))]
    pub fn evolve<F>(
        &mut self,
        mut population: Population,
        objective: &F,
        generations: usize,
    ) -> Result<Population>
    where
        F: Fitness + ?Sized,
    {
        let mut best = None;
        for _ in 0..generations {
            let scored = self.step_scored(population, objective)?;
            best = scored.last().map(|(_, score)| *score);
            population = scored.into_iter().map(|(music, _)| music).collect();
        }

        if let Some(best) = best {
            info!(
                "Generation {}: best score {:.4}",
                self.generation, best
            );
        }
        Ok(population)
    }
}
