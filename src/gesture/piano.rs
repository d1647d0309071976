//! Piano-note sequences

use crate::error::{GestureVaultError, Result};

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// A key on the keyboard, as a MIDI note number (60 = C4)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PianoNote(pub u8);

impl PianoNote {
    pub fn is_black(&self) -> bool {
        matches!(self.0 % 12, 1 | 3 | 6 | 8 | 10)
    }

    /// Scientific pitch name, e.g. `C#4`
    pub fn name(&self) -> String {
        let octave = self.0 as i32 / 12 - 1;
        format!("{}{}", NOTE_NAMES[(self.0 % 12) as usize], octave)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        let split = text
            .find(|c: char| c.is_ascii_digit() || c == '-')
            .ok_or_else(|| GestureVaultError::InvalidGesture(format!("bad note '{}'", text)))?;
        let (pitch, octave) = text.split_at(split);

        let pitch = pitch.to_uppercase();
        let pitch = match pitch.as_str() {
            "DB" => "C#",
            "EB" => "D#",
            "GB" => "F#",
            "AB" => "G#",
            "BB" => "A#",
            other => other,
        };
        let index = NOTE_NAMES
            .iter()
            .position(|n| *n == pitch)
            .ok_or_else(|| GestureVaultError::InvalidGesture(format!("bad note '{}'", text)))?;
        let octave: i32 = octave
            .parse()
            .map_err(|_| GestureVaultError::InvalidGesture(format!("bad octave in '{}'", text)))?;

        let midi = (octave + 1) * 12 + index as i32;
        u8::try_from(midi)
            .ok()
            .filter(|m| *m <= 127)
            .map(PianoNote)
            .ok_or_else(|| GestureVaultError::InvalidGesture(format!("note '{}' out of range", text)))
    }
}

/// An ordered sequence of played notes; repeats are allowed
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PianoGesture {
    pub notes: Vec<PianoNote>,
}

impl PianoGesture {
    pub fn new(notes: Vec<PianoNote>) -> Self {
        Self { notes }
    }

    pub(crate) fn canonical(&self) -> String {
        let names: Vec<String> = self.notes.iter().map(PianoNote::name).collect();
        names.join(",")
    }

    pub(crate) fn parse(text: &str) -> Result<Self> {
        let notes = text
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(PianoNote::parse)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { notes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_names() {
        assert_eq!(PianoNote(60).name(), "C4");
        assert_eq!(PianoNote(61).name(), "C#4");
        assert_eq!(PianoNote(69).name(), "A4");
        assert!(PianoNote(61).is_black());
        assert!(!PianoNote(64).is_black());
    }

    #[test]
    fn test_parse_accepts_flats() {
        assert_eq!(PianoNote::parse("Eb4").unwrap(), PianoNote(63));
        assert_eq!(PianoNote::parse("c4").unwrap(), PianoNote(60));
        assert!(PianoNote::parse("H4").is_err());
    }

    #[test]
    fn test_sequence_canonical() {
        let g = PianoGesture::parse("C4, E4,G4,C4").unwrap();
        assert_eq!(g.notes.len(), 4);
        assert_eq!(g.canonical(), "C4,E4,G4,C4");
    }
}
