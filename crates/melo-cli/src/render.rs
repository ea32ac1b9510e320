//! MIDI output for melodies.
//!
//! Writes a single-track Standard MIDI File in which every time step lasts
//! one beat at the configured tempo. A note-on step releases whatever was
//! sounding and strikes the new pitch, a rest releases without striking, and
//! a continuation emits nothing, so held notes are never re-triggered.

use anyhow::{bail, Result};
use melo_core::{Error, Music, RenderConfig, MAX_PITCH};
use midly::{
    num::{u15, u24, u28, u4, u7},
    Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind,
};
use std::path::Path;

/// Ticks per time step (one beat).
const TICKS_PER_STEP: u16 = 480;

const CHANNEL: u8 = 0;

/// Render a melody and write it to `path`.
pub fn write_midi(music: &Music, config: &RenderConfig, path: &Path) -> Result<()> {
    let smf = music_to_smf(music, config)?;
    smf.save(path)?;
    Ok(())
}

fn midi_key(pitch: i32) -> Result<u7> {
    if !(0..=MAX_PITCH).contains(&pitch) {
        return Err(Error::InvalidNote(pitch).into());
    }
    Ok(u7::new(pitch as u8))
}

/// Build an in-memory SMF for a melody.
pub fn music_to_smf(music: &Music, config: &RenderConfig) -> Result<Smf<'static>> {
    config.validate()?;
    let tempo_microseconds = 60_000_000 / config.tempo_bpm as u32;
    if tempo_microseconds > u24::max_value().as_int() {
        bail!("tempo of {} bpm does not fit a MIDI tempo event", config.tempo_bpm);
    }
    // Deltas never exceed the final tick, so bounding it bounds them all.
    let end_tick = music
        .len()
        .checked_mul(TICKS_PER_STEP as usize)
        .and_then(|ticks| u32::try_from(ticks).ok())
        .filter(|&ticks| ticks <= u28::max_value().as_int());
    let Some(end_tick) = end_tick else {
        bail!("melody of {} steps is too long for a MIDI track", music.len());
    };

    let channel = u4::new(CHANNEL);
    let velocity = u7::new(config.velocity);

    let mut track: Track<'static> = Vec::new();
    let mut last_tick: u32 = 0;
    let mut push = |track: &mut Track<'static>, tick: u32, kind: TrackEventKind<'static>| {
        track.push(TrackEvent {
            delta: u28::new(tick - last_tick),
            kind,
        });
        last_tick = tick;
    };

    push(
        &mut track,
        0,
        TrackEventKind::Meta(MetaMessage::Tempo(u24::new(tempo_microseconds))),
    );

    let mut sounding: Option<u7> = None;
    for (step, note) in music.iter().enumerate() {
        if note.is_hold() {
            continue;
        }
        let tick = step as u32 * TICKS_PER_STEP as u32;

        if let Some(key) = sounding.take() {
            push(
                &mut track,
                tick,
                TrackEventKind::Midi {
                    channel,
                    message: MidiMessage::NoteOff { key, vel: u7::new(0) },
                },
            );
        }

        if let Some(pitch) = note.as_pitch() {
            let key = midi_key(pitch)?;
            push(
                &mut track,
                tick,
                TrackEventKind::Midi {
                    channel,
                    message: MidiMessage::NoteOn { key, vel: velocity },
                },
            );
            sounding = Some(key);
        }
    }

    if let Some(key) = sounding.take() {
        push(
            &mut track,
            end_tick,
            TrackEventKind::Midi {
                channel,
                message: MidiMessage::NoteOff { key, vel: u7::new(0) },
            },
        );
    }
    push(&mut track, end_tick, TrackEventKind::Meta(MetaMessage::EndOfTrack));

    let mut smf = Smf::new(Header::new(
        Format::SingleTrack,
        Timing::Metrical(u15::new(TICKS_PER_STEP)),
    ));
    smf.tracks.push(track);
    Ok(smf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use melo_core::NoteCode;

    /// (absolute tick, is note-on, key) for every note event.
    fn note_events(smf: &Smf) -> Vec<(u32, bool, u8)> {
        let mut tick = 0;
        let mut events = Vec::new();
        for event in &smf.tracks[0] {
            tick += event.delta.as_int();
            if let TrackEventKind::Midi { message, .. } = &event.kind {
                match message {
                    MidiMessage::NoteOn { key, .. } => events.push((tick, true, key.as_int())),
                    MidiMessage::NoteOff { key, .. } => events.push((tick, false, key.as_int())),
                    _ => {}
                }
            }
        }
        events
    }

    fn render(codes: &[i32]) -> Smf<'static> {
        music_to_smf(&Music::from_codes(codes).unwrap(), &RenderConfig::default()).unwrap()
    }

    #[test]
    fn test_held_note_not_retriggered() {
        let smf = render(&[60, -2, -1, 62, -2, -2]);
        assert_eq!(
            note_events(&smf),
            vec![(0, true, 60), (960, false, 60), (1440, true, 62), (2880, false, 62)]
        );
    }

    #[test]
    fn test_new_note_releases_previous() {
        let smf = render(&[60, 64]);
        assert_eq!(
            note_events(&smf),
            vec![(0, true, 60), (480, false, 60), (480, true, 64), (960, false, 64)]
        );
    }

    #[test]
    fn test_silence_emits_nothing() {
        let smf = render(&[-2, -1, -2, -1]);
        assert!(note_events(&smf).is_empty());
    }

    #[test]
    fn test_out_of_range_pitch_rejected() {
        let music = Music::from_codes(&[200]).unwrap();
        assert!(music_to_smf(&music, &RenderConfig::default()).is_err());
    }

    #[test]
    fn test_slowest_tempo_written_exactly() {
        let config = RenderConfig {
            tempo_bpm: RenderConfig::MIN_TEMPO_BPM,
            ..Default::default()
        };
        let smf = music_to_smf(&Music::from_codes(&[60, -2]).unwrap(), &config).unwrap();
        let tempo = smf.tracks[0].iter().find_map(|event| match &event.kind {
            TrackEventKind::Meta(MetaMessage::Tempo(tempo)) => Some(tempo.as_int()),
            _ => None,
        });
        assert_eq!(tempo, Some(15_000_000));
    }

    #[test]
    fn test_tempo_too_slow_rejected() {
        let config = RenderConfig {
            tempo_bpm: 3,
            ..Default::default()
        };
        let music = Music::from_codes(&[60, -2]).unwrap();
        assert!(music_to_smf(&music, &config).is_err());
    }

    #[test]
    fn test_zero_velocity_rejected() {
        let config = RenderConfig {
            velocity: 0,
            ..Default::default()
        };
        let music = Music::from_codes(&[60, -2]).unwrap();
        assert!(music_to_smf(&music, &config).is_err());
    }

    #[test]
    fn test_overlong_melody_rejected() {
        let steps = (u28::max_value().as_int() / TICKS_PER_STEP as u32) as usize + 1;
        let music: Music = std::iter::repeat(NoteCode::HOLD).take(steps).collect();
        assert!(music_to_smf(&music, &RenderConfig::default()).is_err());
    }

    #[test]
    fn test_written_file_parses() {
        let smf = render(&[60, -2, 62, -1]);
        let mut buf = Vec::new();
        smf.write_std(&mut buf).unwrap();
        let parsed = Smf::parse(&buf).unwrap();
        assert_eq!(parsed.tracks.len(), 1);
        assert_eq!(note_events(&parsed), note_events(&smf));
    }
}
