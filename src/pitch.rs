//! Piano key numbering: key 49 is A4 (440 Hz), key 0 sits 49 semitones below.

pub const REFERENCE_KEY: usize = 49;
pub const REFERENCE_FREQUENCY: f32 = 440.0;

/// Equal-tempered frequency of a piano-roll key.
pub fn key_to_frequency(key: usize) -> f32 {
    let semitones = key as f32 - REFERENCE_KEY as f32;
    REFERENCE_FREQUENCY * 2.0_f32.powf(semitones / 12.0)
}

/// MIDI note number for a key (key 49 = note 69).
pub fn key_to_midi(key: usize) -> i32 {
    key as i32 + 20
}

pub fn key_name(key: usize) -> String {
    let note_names = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];
    let note = key_to_midi(key);
    let octave = note.div_euclid(12) - 1;
    let note_index = note.rem_euclid(12) as usize;
    format!("{}{}", note_names[note_index], octave)
}

/// Inverse of `key_name`, e.g. "A4" -> 49, "c#5" -> 53.
pub fn parse_key_name(name: &str) -> Option<usize> {
    let name = name.trim().to_uppercase();
    let mut chars = name.chars();
    let base = match chars.next()? {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };
    let rest = chars.as_str();
    let (offset, octave_str) = if let Some(r) = rest.strip_prefix('#') {
        (1, r)
    } else if let Some(r) = rest.strip_prefix('B') {
        (-1, r)
    } else {
        (0, rest)
    };
    let octave: i32 = octave_str.parse().ok()?;
    let midi = (octave + 1) * 12 + base + offset;
    usize::try_from(midi - 20).ok()
}
