//! Random note and melody generation.

use melo_core::{Music, NoteCode, Population, Scale, MAX_PITCH};
use rand::Rng;

/// Draw a single step. One in six draws is a continuation, one in six a
/// rest, and the rest are note-ons picked uniformly from `scale` (or from
/// the whole MIDI range without one).
pub fn sample_note<R: Rng + ?Sized>(rng: &mut R, scale: Option<&Scale>) -> NoteCode {
    match rng.gen_range(0..6) {
        0 => NoteCode::HOLD,
        1 => NoteCode::REST,
        _ => {
            let pitch = match scale {
                Some(scale) => {
                    let pitches = scale.pitches();
                    pitches[rng.gen_range(0..pitches.len())]
                }
                None => rng.gen_range(0..=MAX_PITCH),
            };
            // Scale pitches are validated to lie in the MIDI range.
            NoteCode::pitch(pitch as u8)
        }
    }
}

/// A melody of `length` independent draws.
pub fn random_sequence<R: Rng + ?Sized>(rng: &mut R, length: usize, scale: Option<&Scale>) -> Music {
    (0..length).map(|_| sample_note(rng, scale)).collect()
}

/// `size` random melodies of equal length.
pub fn random_population<R: Rng + ?Sized>(
    rng: &mut R,
    size: usize,
    length: usize,
    scale: Option<&Scale>,
) -> Population {
    (0..size).map(|_| random_sequence(rng, length, scale)).collect()
}
