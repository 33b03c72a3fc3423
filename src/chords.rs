//! Notes, chords and the keyboard chord table
//!
//! Chords are immutable once built. The table maps the home row and bottom
//! row letter keys to chords diatonic to C major.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Maximum notes in a chord
pub const MAX_CHORD_NOTES: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NoteError {
    #[error("empty note name")]
    Empty,
    #[error("unknown pitch letter '{0}'")]
    UnknownPitch(char),
    #[error("invalid octave in '{0}'")]
    InvalidOctave(String),
    #[error("note '{0}' is outside the MIDI range")]
    OutOfRange(String),
    #[error("a chord needs 1 to {MAX_CHORD_NOTES} notes, got {0}")]
    ChordSize(usize),
}

/// Pitch class (sharps only; flats are normalized on parse)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PitchClass {
    C,
    CSharp,
    D,
    DSharp,
    E,
    F,
    FSharp,
    G,
    GSharp,
    A,
    ASharp,
    B,
}

impl PitchClass {
    const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::CSharp,
        PitchClass::D,
        PitchClass::DSharp,
        PitchClass::E,
        PitchClass::F,
        PitchClass::FSharp,
        PitchClass::G,
        PitchClass::GSharp,
        PitchClass::A,
        PitchClass::ASharp,
        PitchClass::B,
    ];

    /// Semitones above C
    pub const fn semitone(self) -> u8 {
        self as u8
    }

    pub fn from_semitone(semitone: u8) -> Self {
        Self::ALL[(semitone % 12) as usize]
    }

    pub fn name(self) -> &'static str {
        match self {
            PitchClass::C => "C",
            PitchClass::CSharp => "C#",
            PitchClass::D => "D",
            PitchClass::DSharp => "D#",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::FSharp => "F#",
            PitchClass::G => "G",
            PitchClass::GSharp => "G#",
            PitchClass::A => "A",
            PitchClass::ASharp => "A#",
            PitchClass::B => "B",
        }
    }
}

/// A pitched note in scientific pitch notation (C4 = MIDI 60)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Note {
    midi: u8,
}

impl Note {
    /// Build a note from pitch class and octave (-1..=9)
    pub const fn new(pitch: PitchClass, octave: i8) -> Self {
        let midi = (octave as i16 + 1) * 12 + pitch.semitone() as i16;
        let midi = if midi < 0 {
            0
        } else if midi > 127 {
            127
        } else {
            midi
        };
        Self { midi: midi as u8 }
    }

    pub const fn from_midi(midi: u8) -> Self {
        Self { midi }
    }

    pub const fn midi(self) -> u8 {
        self.midi
    }

    pub fn pitch(self) -> PitchClass {
        PitchClass::from_semitone(self.midi % 12)
    }

    pub fn octave(self) -> i8 {
        (self.midi / 12) as i8 - 1
    }

    /// Same pitch class moved to another octave
    pub fn with_octave(self, octave: i8) -> Self {
        Self::new(self.pitch(), octave.clamp(-1, 9))
    }

    /// Equal-tempered frequency, A4 = 440 Hz
    pub fn frequency(self) -> f32 {
        midi_to_hz(self.midi as f32)
    }
}

/// Convert a (fractional) MIDI note number to Hz
#[inline]
pub fn midi_to_hz(midi: f32) -> f32 {
    440.0 * 2.0_f32.powf((midi - 69.0) / 12.0)
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.pitch().name(), self.octave())
    }
}

impl FromStr for Note {
    type Err = NoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let mut chars = s.chars();
        let letter = chars.next().ok_or(NoteError::Empty)?;
        let base: i16 = match letter.to_ascii_uppercase() {
            'C' => 0,
            'D' => 2,
            'E' => 4,
            'F' => 5,
            'G' => 7,
            'A' => 9,
            'B' => 11,
            other => return Err(NoteError::UnknownPitch(other)),
        };

        let rest = chars.as_str();
        let (accidental, octave_str) = match rest.chars().next() {
            Some('#') => (1, &rest[1..]),
            Some('b') => (-1, &rest[1..]),
            _ => (0, rest),
        };
        let octave: i16 = octave_str
            .parse()
            .map_err(|_| NoteError::InvalidOctave(s.to_string()))?;

        let midi = octave
            .checked_add(1)
            .and_then(|o| o.checked_mul(12))
            .and_then(|m| m.checked_add(base + accidental))
            .filter(|m| (0..=127).contains(m))
            .ok_or_else(|| NoteError::OutOfRange(s.to_string()))?;
        Ok(Note::from_midi(midi as u8))
    }
}

/// Ordered, immutable set of 1-4 notes played together
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Chord {
    notes: Vec<Note>,
}

impl Chord {
    pub fn new(notes: Vec<Note>) -> Result<Self, NoteError> {
        if notes.is_empty() || notes.len() > MAX_CHORD_NOTES {
            return Err(NoteError::ChordSize(notes.len()));
        }
        Ok(Self { notes })
    }

    /// Parse note names, e.g. `["C5", "E5", "G5"]`
    pub fn parse(names: &[&str]) -> Result<Self, NoteError> {
        let notes = names
            .iter()
            .map(|name| name.parse())
            .collect::<Result<Vec<Note>, _>>()?;
        Self::new(notes)
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn frequencies(&self) -> impl Iterator<Item = f32> + '_ {
        self.notes.iter().map(|n| n.frequency())
    }
}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, note) in self.notes.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{note}")?;
        }
        Ok(())
    }
}

/// Default key bindings: home row sevenths, bottom row triads
const DEFAULT_TABLE: [(char, &[Note]); 12] = {
    use PitchClass::*;
    [
        ('a', &[Note::new(C, 5), Note::new(E, 5), Note::new(G, 5), Note::new(B, 5)]),
        ('s', &[Note::new(D, 5), Note::new(F, 5), Note::new(A, 5), Note::new(C, 6)]),
        ('d', &[Note::new(E, 5), Note::new(G, 5), Note::new(B, 5), Note::new(D, 6)]),
        ('f', &[Note::new(F, 5), Note::new(A, 5), Note::new(C, 6), Note::new(E, 6)]),
        ('g', &[Note::new(G, 5), Note::new(B, 5), Note::new(D, 6), Note::new(F, 6)]),
        ('h', &[Note::new(A, 5), Note::new(C, 6), Note::new(E, 6), Note::new(G, 6)]),
        ('z', &[Note::new(C, 4), Note::new(E, 4), Note::new(G, 4)]),
        ('x', &[Note::new(D, 4), Note::new(F, 4), Note::new(A, 4)]),
        ('c', &[Note::new(E, 4), Note::new(G, 4), Note::new(B, 4)]),
        ('v', &[Note::new(F, 4), Note::new(A, 4), Note::new(C, 5)]),
        ('b', &[Note::new(G, 4), Note::new(B, 4), Note::new(D, 5)]),
        ('n', &[Note::new(A, 4), Note::new(C, 5), Note::new(E, 5)]),
    ]
};

/// Key to chord lookup
#[derive(Debug, Clone)]
pub struct ChordTable {
    entries: Vec<(char, Chord)>,
}

impl Default for ChordTable {
    fn default() -> Self {
        Self {
            entries: DEFAULT_TABLE
                .iter()
                .map(|(key, notes)| {
                    (
                        *key,
                        Chord {
                            notes: notes.to_vec(),
                        },
                    )
                })
                .collect(),
        }
    }
}

impl ChordTable {
    /// Build a table from explicit bindings (keys are lower-cased)
    pub fn from_entries(entries: impl IntoIterator<Item = (char, Chord)>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(key, chord)| (key.to_ascii_lowercase(), chord))
                .collect(),
        }
    }

    /// Chord bound to a single-character key, case-insensitive
    pub fn chord_for_key(&self, key: &str) -> Option<&Chord> {
        let mut chars = key.chars();
        let c = chars.next()?.to_ascii_lowercase();
        if chars.next().is_some() {
            return None;
        }
        self.entries
            .iter()
            .find(|(k, _)| *k == c)
            .map(|(_, chord)| chord)
    }

    /// Bindings in table order
    pub fn entries(&self) -> impl Iterator<Item = (char, &Chord)> {
        self.entries.iter().map(|(k, chord)| (*k, chord))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::PitchClass::*;
    use super::*;

    #[test]
    fn test_note_parse_and_display() {
        let c4: Note = "C4".parse().unwrap();
        assert_eq!(c4.midi(), 60);
        assert_eq!(c4.to_string(), "C4");

        let bb3: Note = "Bb3".parse().unwrap();
        assert_eq!(bb3.midi(), 58);
        assert_eq!(bb3.to_string(), "A#3");

        let fs5: Note = "f#5".parse().unwrap();
        assert_eq!(fs5, Note::new(PitchClass::FSharp, 5));
    }

    #[test]
    fn test_note_parse_errors() {
        assert_eq!("".parse::<Note>(), Err(NoteError::Empty));
        assert_eq!("H4".parse::<Note>(), Err(NoteError::UnknownPitch('H')));
        assert!(matches!("C".parse::<Note>(), Err(NoteError::InvalidOctave(_))));
        assert!(matches!("G10".parse::<Note>(), Err(NoteError::OutOfRange(_))));
        assert!(matches!("C3000".parse::<Note>(), Err(NoteError::OutOfRange(_))));
        assert!(matches!("Cb-32768".parse::<Note>(), Err(NoteError::OutOfRange(_))));
    }

    #[test]
    fn test_frequency() {
        assert!((Note::new(A, 4).frequency() - 440.0).abs() < 1e-3);
        assert!((Note::new(A, 5).frequency() - 880.0).abs() < 1e-2);
        assert!((Note::new(C, 4).frequency() - 261.626).abs() < 1e-2);
    }

    #[test]
    fn test_with_octave() {
        let e4 = Note::new(E, 4);
        assert_eq!(e4.with_octave(6), Note::new(E, 6));
        assert_eq!(e4.with_octave(6).pitch(), PitchClass::E);
    }

    #[test]
    fn test_chord_size_limits() {
        assert_eq!(Chord::new(vec![]), Err(NoteError::ChordSize(0)));
        let five = vec![Note::new(C, 4); 5];
        assert_eq!(Chord::new(five), Err(NoteError::ChordSize(5)));
        assert!(Chord::parse(&["C4"]).is_ok());
    }

    #[test]
    fn test_table_key_a_is_cmaj7() {
        let table = ChordTable::default();
        let chord = table.chord_for_key("a").unwrap();
        assert_eq!(chord, &Chord::parse(&["C5", "E5", "G5", "B5"]).unwrap());
        assert_eq!(chord.to_string(), "C5 E5 G5 B5");
    }

    #[test]
    fn test_table_case_insensitive_and_unknown() {
        let table = ChordTable::default();
        assert_eq!(table.chord_for_key("A"), table.chord_for_key("a"));
        assert!(table.chord_for_key("q").is_none());
        assert!(table.chord_for_key("Enter").is_none());
        assert!(table.chord_for_key("").is_none());
    }

    #[test]
    fn test_table_is_diatonic_to_c_major() {
        let table = ChordTable::default();
        assert_eq!(table.len(), 12);
        for (_, chord) in table.entries() {
            assert!((3..=4).contains(&chord.len()));
            for note in chord.notes() {
                let name = note.pitch().name();
                assert!(!name.contains('#'), "{note} is not in C major");
            }
        }
    }
}
