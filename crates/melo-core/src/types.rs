//! Core type definitions for note sequences.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Highest MIDI pitch; unbiased note generation draws from `0..=MAX_PITCH`.
pub const MAX_PITCH: i32 = 127;

/// One time step of a melody.
///
/// Non-negative codes are note-on events at that pitch, `-1` is a rest
/// (note-off) and `-2` continues whatever the previous step was doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct NoteCode(i32);

impl NoteCode {
    pub const REST: NoteCode = NoteCode(-1);
    pub const HOLD: NoteCode = NoteCode(-2);

    /// Validate a raw code. Anything below `-2` is rejected.
    pub fn new(raw: i32) -> Result<Self> {
        if raw < Self::HOLD.0 {
            return Err(Error::InvalidNote(raw));
        }
        Ok(Self(raw))
    }

    /// Note-on at a MIDI pitch.
    pub fn pitch(pitch: u8) -> Self {
        Self(pitch as i32)
    }

    pub fn raw(self) -> i32 {
        self.0
    }

    pub fn is_note_on(self) -> bool {
        self.0 >= 0
    }

    pub fn is_rest(self) -> bool {
        self == Self::REST
    }

    pub fn is_hold(self) -> bool {
        self == Self::HOLD
    }

    /// Pitch of a note-on event, `None` for rests and continuations.
    pub fn as_pitch(self) -> Option<i32> {
        self.is_note_on().then_some(self.0)
    }
}

impl TryFrom<i32> for NoteCode {
    type Error = Error;

    fn try_from(raw: i32) -> Result<Self> {
        NoteCode::new(raw)
    }
}

impl From<NoteCode> for i32 {
    fn from(code: NoteCode) -> i32 {
        code.0
    }
}

impl fmt::Display for NoteCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            NoteCode::REST => write!(f, "."),
            NoteCode::HOLD => write!(f, "-"),
            NoteCode(pitch) => write!(f, "{}", pitch),
        }
    }
}

/// A fixed-length monophonic melody, one code per time step.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Music(Vec<NoteCode>);

impl Music {
    /// Build a melody from raw integer codes, validating each one.
    pub fn from_codes(codes: &[i32]) -> Result<Self> {
        codes
            .iter()
            .map(|&raw| NoteCode::new(raw))
            .collect::<Result<Vec<_>>>()
            .map(Self)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn notes(&self) -> &[NoteCode] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = NoteCode> + '_ {
        self.0.iter().copied()
    }

    pub fn get(&self, index: usize) -> Option<NoteCode> {
        self.0.get(index).copied()
    }

    pub fn codes(&self) -> Vec<i32> {
        self.iter().map(NoteCode::raw).collect()
    }
}

impl FromIterator<NoteCode> for Music {
    fn from_iter<I: IntoIterator<Item = NoteCode>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for Music {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, note) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", note)?;
        }
        Ok(())
    }
}

/// A population of equal-length melodies.
pub type Population = Vec<Music>;

/// Concrete MIDI pitches that note generation draws from. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<i32>", into = "Vec<i32>")]
pub struct Scale(Vec<i32>);

impl Scale {
    pub fn new(pitches: Vec<i32>) -> Result<Self> {
        if pitches.is_empty() {
            return Err(Error::EmptyScale);
        }
        if let Some(&bad) = pitches.iter().find(|&&p| !(0..=MAX_PITCH).contains(&p)) {
            return Err(Error::InvalidNote(bad));
        }
        Ok(Self(pitches))
    }

    /// Every pitch in `low..high`.
    pub fn range(low: i32, high: i32) -> Result<Self> {
        Self::new((low..high).collect())
    }

    /// Full MIDI range, equivalent to drawing without a scale.
    pub fn chromatic() -> Self {
        Self((0..=MAX_PITCH).collect())
    }

    pub fn pitches(&self) -> &[i32] {
        &self.0
    }
}

impl TryFrom<Vec<i32>> for Scale {
    type Error = Error;

    fn try_from(pitches: Vec<i32>) -> Result<Self> {
        Scale::new(pitches)
    }
}

impl From<Scale> for Vec<i32> {
    fn from(scale: Scale) -> Vec<i32> {
        scale.0
    }
}

/// A set of pitch classes (pitches modulo 12).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Vec<i32>", into = "Vec<i32>")]
pub struct PitchClassSet(u16);

impl PitchClassSet {
    const MAJOR_STEPS: [i32; 7] = [0, 2, 4, 5, 7, 9, 11];

    pub fn new<I: IntoIterator<Item = i32>>(pitches: I) -> Self {
        let mask = pitches
            .into_iter()
            .fold(0u16, |mask, p| mask | (1 << p.rem_euclid(12)));
        Self(mask)
    }

    /// Major scale rooted at `tonic`.
    pub fn major(tonic: i32) -> Self {
        Self::new(Self::MAJOR_STEPS.iter().map(|step| tonic + step))
    }

    pub fn contains(&self, pitch: i32) -> bool {
        self.0 & (1 << pitch.rem_euclid(12)) != 0
    }

    pub fn classes(&self) -> impl Iterator<Item = i32> + '_ {
        (0..12).filter(move |&pc| self.contains(pc))
    }
}

impl From<Vec<i32>> for PitchClassSet {
    fn from(pitches: Vec<i32>) -> Self {
        PitchClassSet::new(pitches)
    }
}

impl From<PitchClassSet> for Vec<i32> {
    fn from(set: PitchClassSet) -> Vec<i32> {
        set.classes().collect()
    }
}
