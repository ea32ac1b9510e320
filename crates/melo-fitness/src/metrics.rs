//! Musical heuristics over a single melody.
//!
//! Every metric is total: a melody with nothing to measure (no steps, no
//! note-ons, no transitions) scores 0 rather than dividing by zero.

use melo_core::{Music, NoteCode, PitchClassSet};
use std::collections::{HashMap, VecDeque};

/// Default window for the repetition metrics.
pub const DEFAULT_DISTANCE: usize = 4;

/// Default score per interval class (semitones mod 12). Unison, thirds,
/// fourths, fifths and sixths are rewarded; minor seconds and major sevenths
/// score nothing.
pub const DEFAULT_INTERVALS: [f64; 12] = [0.5, 0.0, 0.2, 0.2, 0.5, 0.4, 0.4, 1.0, 0.5, 0.2, 0.2, 0.0];

fn ratio(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance (divides by the count).
fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}

/// The pitch sounding at each step, `None` where the step is silent.
///
/// A note-on starts a pitch, a rest clears it, a continuation keeps
/// whatever the previous step had.
fn sounding(music: &Music) -> impl Iterator<Item = Option<i32>> + '_ {
    music.iter().scan(None, |current, note| {
        if let Some(pitch) = note.as_pitch() {
            *current = Some(pitch);
        } else if note.is_rest() {
            *current = None;
        }
        Some(*current)
    })
}

fn note_pitches(music: &Music) -> Vec<f64> {
    music.iter().filter_map(NoteCode::as_pitch).map(f64::from).collect()
}

/// Durations of every held note (a note-on plus the continuations after it).
fn note_lengths(music: &Music) -> Vec<f64> {
    let mut lengths = Vec::new();
    let mut run = 0usize;
    let mut run_is_note = false;

    for note in music.iter() {
        if !note.is_hold() {
            if run_is_note && run > 0 {
                lengths.push(run as f64);
            }
            run = 0;
            run_is_note = note.is_note_on();
        }
        run += 1;
    }
    if run_is_note && run > 0 {
        lengths.push(run as f64);
    }

    lengths
}

/// Fraction of steps during which nothing sounds.
pub fn fraction_silent(music: &Music) -> f64 {
    let silent = sounding(music).filter(Option::is_none).count();
    ratio(silent, music.len())
}

/// Fraction of steps that start a new note.
pub fn fraction_new_notes(music: &Music) -> f64 {
    let new = music.iter().filter(|note| note.is_note_on()).count();
    ratio(new, music.len())
}

/// Fraction of note-ons whose pitch occurred among the previous `dist`
/// note-ons.
pub fn fraction_repeated_notes(music: &Music, dist: usize) -> f64 {
    let mut window: VecDeque<i32> = VecDeque::with_capacity(dist + 1);
    let mut counts: HashMap<i32, usize> = HashMap::new();
    let mut repeated = 0;
    let mut total = 0;

    for pitch in music.iter().filter_map(NoteCode::as_pitch) {
        total += 1;
        if counts.get(&pitch).copied().unwrap_or(0) > 0 {
            repeated += 1;
        }

        window.push_back(pitch);
        *counts.entry(pitch).or_insert(0) += 1;
        if window.len() > dist {
            if let Some(oldest) = window.pop_front() {
                if let Some(count) = counts.get_mut(&oldest) {
                    *count -= 1;
                }
            }
        }
    }

    ratio(repeated, total)
}

/// Fraction of note-on positions whose code recurs exactly `dist` steps
/// later. Positions holding a rest or continuation are not counted.
pub fn fraction_repeated_precisely(music: &Music, dist: usize) -> f64 {
    let notes = music.notes();
    if notes.len() <= dist {
        return 0.0;
    }

    let mut eligible = 0;
    let mut repeated = 0;
    for (i, note) in notes[..notes.len() - dist].iter().enumerate() {
        if !note.is_note_on() {
            continue;
        }
        eligible += 1;
        if *note == notes[i + dist] {
            repeated += 1;
        }
    }

    ratio(repeated, eligible)
}

/// Mean pitch of all note-ons.
pub fn note_mean(music: &Music) -> f64 {
    mean(&note_pitches(music))
}

/// Variance of the pitches of all note-ons.
pub fn note_variance(music: &Music) -> f64 {
    variance(&note_pitches(music))
}

/// Average score of the intervals between consecutive note-ons, looked up
/// in `intervals` by semitone distance mod 12. A rest breaks the chain.
pub fn consecutive_intervals(music: &Music, intervals: &[f64; 12]) -> f64 {
    let mut previous: Option<i32> = None;
    let mut transitions = 0;
    let mut score = 0.0;

    for note in music.iter() {
        if note.is_rest() {
            previous = None;
            continue;
        }
        let Some(pitch) = note.as_pitch() else {
            continue;
        };
        if let Some(prev) = previous {
            transitions += 1;
            score += intervals[(pitch - prev).rem_euclid(12) as usize];
        }
        previous = Some(pitch);
    }

    if transitions == 0 {
        0.0
    } else {
        score / transitions as f64
    }
}

fn bit_length(value: usize) -> u32 {
    usize::BITS - value.leading_zeros()
}

/// Off-beat weight of a step: reverse the bits of its position in the bar
/// and take the bit length. The downbeat weighs 0, the finest subdivisions
/// weigh the most.
fn syncopation_weight(index: usize, modulus: usize) -> u32 {
    let width = bit_length(modulus - 1);
    if width == 0 {
        return 0;
    }
    let position = index % modulus;
    let reversed = position.reverse_bits() >> (usize::BITS - width);
    bit_length(reversed)
}

/// Share of the total off-beat weight that falls on note-ons. `modulus` is
/// the bar length in steps; 0 means the whole melody is one bar.
pub fn syncopation(music: &Music, modulus: usize) -> f64 {
    let modulus = if modulus == 0 { music.len() } else { modulus };
    if modulus == 0 {
        return 0.0;
    }

    let mut on_notes = 0u64;
    let mut total = 0u64;
    for (i, note) in music.iter().enumerate() {
        let weight = syncopation_weight(i, modulus) as u64;
        total += weight;
        if note.is_note_on() {
            on_notes += weight;
        }
    }

    if total == 0 {
        0.0
    } else {
        on_notes as f64 / total as f64
    }
}

/// Fraction of sounding steps whose pitch class belongs to `scale`.
pub fn fraction_in_scale(music: &Music, scale: &PitchClassSet) -> f64 {
    let mut active = 0;
    let mut in_scale = 0;
    for pitch in sounding(music).flatten() {
        active += 1;
        if scale.contains(pitch) {
            in_scale += 1;
        }
    }
    ratio(in_scale, active)
}

/// Mean duration of held notes, in steps.
pub fn length_mean(music: &Music) -> f64 {
    mean(&note_lengths(music))
}

/// Variance of held-note durations.
pub fn length_variance(music: &Music) -> f64 {
    variance(&note_lengths(music))
}
