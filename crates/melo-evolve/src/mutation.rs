//! Mutation and crossover operators for melodies.

use crate::sampling::sample_note;
use melo_core::{check_unit, Error, Music, Result, Scale};
use rand::Rng;

/// Copy `music`, redrawing each step independently with probability `chance`.
pub fn mutate<R: Rng + ?Sized>(
    rng: &mut R,
    music: &Music,
    chance: f64,
    scale: Option<&Scale>,
) -> Result<Music> {
    check_unit("mutation_chance", chance)?;
    Ok(music
        .iter()
        .map(|note| {
            if rng.gen_bool(chance) {
                sample_note(rng, scale)
            } else {
                note
            }
        })
        .collect())
}

/// Uniform crossover: each step comes from either parent with equal odds.
pub fn crossover<R: Rng + ?Sized>(rng: &mut R, left: &Music, right: &Music) -> Result<Music> {
    if left.len() != right.len() {
        return Err(Error::LengthMismatch {
            left: left.len(),
            right: right.len(),
        });
    }

    Ok(left
        .iter()
        .zip(right.iter())
        .map(|(l, r)| if rng.gen_bool(0.5) { l } else { r })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn music(codes: &[i32]) -> Music {
        Music::from_codes(codes).unwrap()
    }

    #[test]
    fn test_mutate_zero_chance_is_identity() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let original = music(&[60, -2, -1, 62, 64, -2]);
        let mutated = mutate(&mut rng, &original, 0.0, None).unwrap();
        assert_eq!(mutated, original);
    }

    #[test]
    fn test_mutate_full_chance_redraws_from_scale() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        // Nothing in the original is in the scale, so every surviving
        // pitch proves a redraw.
        let original = music(&[1; 64]);
        let scale = Scale::new(vec![60]).unwrap();
        let mutated = mutate(&mut rng, &original, 1.0, Some(&scale)).unwrap();
        assert_eq!(mutated.len(), original.len());
        assert!(mutated.iter().all(|note| note.raw() != 1));
    }

    #[test]
    fn test_mutate_rejects_bad_chance() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        assert!(matches!(
            mutate(&mut rng, &music(&[60]), 1.5, None),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_crossover_mixes_parents() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let left = music(&[60; 32]);
        let right = music(&[-1; 32]);
        let child = crossover(&mut rng, &left, &right).unwrap();
        assert_eq!(child.len(), 32);
        assert!(child.iter().any(|note| note.raw() == 60));
        assert!(child.iter().any(|note| note.is_rest()));
    }

    #[test]
    fn test_crossover_length_mismatch() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let result = crossover(&mut rng, &music(&[60, 62]), &music(&[60]));
        assert!(matches!(result, Err(Error::LengthMismatch { left: 2, right: 1 })));
    }

    fn codes() -> impl Strategy<Value = Vec<i32>> {
        prop::collection::vec(-2i32..128, 0..64)
    }

    proptest! {
        #[test]
        fn prop_mutate_preserves_length(codes in codes(), chance in 0.0f64..=1.0, seed in any::<u64>()) {
            let original = Music::from_codes(&codes).unwrap();
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mutated = mutate(&mut rng, &original, chance, None).unwrap();
            prop_assert_eq!(mutated.len(), original.len());
        }

        #[test]
        fn prop_mutate_zero_is_identity(codes in codes(), seed in any::<u64>()) {
            let original = Music::from_codes(&codes).unwrap();
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            prop_assert_eq!(mutate(&mut rng, &original, 0.0, None).unwrap(), original);
        }

        #[test]
        fn prop_crossover_with_self_is_identity(codes in codes(), seed in any::<u64>()) {
            let parent = Music::from_codes(&codes).unwrap();
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            prop_assert_eq!(crossover(&mut rng, &parent, &parent).unwrap(), parent);
        }

        #[test]
        fn prop_crossover_takes_each_step_from_a_parent(
            pair in codes().prop_flat_map(|left| {
                let len = left.len();
                (Just(left), prop::collection::vec(-2i32..128, len))
            }),
            seed in any::<u64>(),
        ) {
            let (left, right) = pair;
            let left = Music::from_codes(&left).unwrap();
            let right = Music::from_codes(&right).unwrap();
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let child = crossover(&mut rng, &left, &right).unwrap();
            prop_assert_eq!(child.len(), left.len());
            for (i, note) in child.iter().enumerate() {
                prop_assert!(Some(note) == left.get(i) || Some(note) == right.get(i));
            }
        }
    }
}
