//! Humdrum `**kern` reader and writer.
//!
//! Covers the monophonic subset used by folk song collections such as the
//! Essen corpus: one `**kern` spine, reciprocal durations with dots, pitch
//! letters with octave repetition, accidentals, rests, barlines, meter and
//! key interpretations. Decorations (slurs, beams, phrases, ties,
//! ornaments) are accepted and dropped; tied notes remain separate events.

use std::fmt;

use crate::types::{Event, EventKind, Key, Mode, Score};

/// Reference record holding the title.
const TITLE_RECORD: &str = "!!!OTL:";

/// Spine operators that change the column layout.
const SPINE_OPERATORS: &[&str] = &["*^", "*v", "*+", "*x"];

/// Durations a single kern token can express, with their reciprocal text.
/// Descending, so a greedy split finds the largest piece first.
const WRITABLE_DURATIONS: &[(f64, &str)] = &[
    (6.0, "1."),
    (4.0, "1"),
    (3.0, "2."),
    (2.0, "2"),
    (1.5, "4."),
    (1.0, "4"),
    (0.75, "8."),
    (0.5, "8"),
    (0.375, "16."),
    (0.25, "16"),
    (0.1875, "32."),
    (0.125, "32"),
    (0.0625, "64"),
];

/// Pitch-class spellings for writing, sharps only.
const KERN_PITCH_NAMES: [(char, &str); 12] = [
    ('c', ""),
    ('c', "#"),
    ('d', ""),
    ('d', "#"),
    ('e', ""),
    ('f', ""),
    ('f', "#"),
    ('g', ""),
    ('g', "#"),
    ('a', ""),
    ('a', "#"),
    ('b', ""),
];

/// Error produced while reading kern text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernParseError {
    /// 1-based line number, 0 when the error concerns the whole file.
    pub line: usize,
    pub message: String,
}

impl KernParseError {
    fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

impl fmt::Display for KernParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line == 0 {
            write!(f, "{}", self.message)
        } else {
            write!(f, "line {}: {}", self.line, self.message)
        }
    }
}

impl std::error::Error for KernParseError {}

/// Parses kern text into a Score.
pub fn parse_kern(text: &str) -> Result<Score, KernParseError> {
    let mut score = Score::default();
    let mut spine: Option<usize> = None;
    let mut terminated = false;

    for (index, raw) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = raw.trim_end_matches('\r');

        if line.trim().is_empty() {
            continue;
        }

        if let Some(title) = line.strip_prefix(TITLE_RECORD) {
            score.title = Some(title.trim().to_string());
            continue;
        }
        if line.starts_with('!') {
            continue;
        }
        if terminated {
            continue;
        }

        let columns: Vec<&str> = line.split('\t').collect();

        let Some(column) = spine else {
            if columns.iter().any(|c| c.starts_with("**")) {
                let found = columns.iter().position(|c| *c == "**kern").ok_or_else(|| {
                    KernParseError::new(line_no, "no **kern spine in exclusive interpretation")
                })?;
                spine = Some(found);
                continue;
            }
            return Err(KernParseError::new(
                line_no,
                "data before the **kern exclusive interpretation",
            ));
        };

        if columns.iter().any(|c| SPINE_OPERATORS.contains(c)) {
            return Err(KernParseError::new(
                line_no,
                "spine split/join operators are not supported",
            ));
        }

        let token = columns.get(column).copied().ok_or_else(|| {
            KernParseError::new(line_no, format!("missing spine column {}", column + 1))
        })?;

        if token.starts_with('*') {
            if token == "*-" {
                terminated = true;
            } else {
                apply_interpretation(&mut score, token);
            }
            continue;
        }
        if token.starts_with('=') || token == "." || token.starts_with('!') {
            continue;
        }
        if token.contains(' ') {
            return Err(KernParseError::new(line_no, "chords are not supported"));
        }

        match parse_note_token(token) {
            Ok(Some(event)) => score.events.push(event),
            Ok(None) => {}
            Err(message) => return Err(KernParseError::new(line_no, message)),
        }
    }

    if spine.is_none() {
        return Err(KernParseError::new(0, "no **kern spine found"));
    }

    Ok(score)
}

/// Records meter and key interpretations; everything else is ignored.
fn apply_interpretation(score: &mut Score, token: &str) {
    if let Some(meter) = token.strip_prefix("*M") {
        if meter.chars().next().is_some_and(|c| c.is_ascii_digit()) {
            score.meter = Some(meter.to_string());
        }
        return;
    }
    if let Some(key) = parse_key_interpretation(token) {
        score.key = Some(key);
    }
}

/// Parses a key interpretation such as `*G:`, `*e:`, `*B-:` or `*f#:`.
pub fn parse_key_interpretation(token: &str) -> Option<Key> {
    let body = token.strip_prefix('*')?.strip_suffix(':')?;
    let mut chars = body.chars();
    let letter = chars.next()?;
    let base = letter_pitch_class(letter.to_ascii_lowercase())?;

    let mut alter = 0i32;
    for c in chars {
        match c {
            '#' => alter += 1,
            '-' => alter -= 1,
            _ => return None,
        }
    }

    let mode = if letter.is_ascii_uppercase() {
        Mode::Major
    } else {
        Mode::Minor
    };
    Some(Key::new(base as i32 + alter, mode))
}

fn letter_pitch_class(letter: char) -> Option<u8> {
    match letter {
        'c' => Some(0),
        'd' => Some(2),
        'e' => Some(4),
        'f' => Some(5),
        'g' => Some(7),
        'a' => Some(9),
        'b' => Some(11),
        _ => None,
    }
}

/// Parses one note or rest token. Grace notes yield `Ok(None)`.
fn parse_note_token(token: &str) -> Result<Option<Event>, String> {
    let mut recip = String::new();
    let mut dots = 0u32;
    let mut letter: Option<char> = None;
    let mut letter_count = 0i32;
    let mut alter = 0i32;
    let mut rest = false;

    for c in token.chars() {
        match c {
            '0'..='9' => {
                if dots > 0 || letter.is_some() {
                    return Err(format!("misplaced duration in '{}'", token));
                }
                recip.push(c);
            }
            '.' => dots += 1,
            'a'..='g' | 'A'..='G' => match letter {
                None => {
                    letter = Some(c);
                    letter_count = 1;
                }
                Some(l) if l == c => letter_count += 1,
                Some(_) => return Err(format!("mixed pitch letters in '{}'", token)),
            },
            '#' => alter += 1,
            '-' => alter -= 1,
            'n' => {}
            'r' => rest = true,
            'q' | 'Q' => return Ok(None),
            _ => {}
        }
    }

    if recip.is_empty() {
        return Err(format!("missing duration in '{}'", token));
    }
    let duration = reciprocal_to_quarter_length(&recip, dots)
        .ok_or_else(|| format!("invalid duration in '{}'", token))?;

    if rest {
        return Ok(Some(Event::rest(duration)));
    }

    let letter = letter.ok_or_else(|| format!("missing pitch in '{}'", token))?;
    let pitch_class = letter_pitch_class(letter.to_ascii_lowercase())
        .ok_or_else(|| format!("invalid pitch letter in '{}'", token))?;
    let octave = if letter.is_ascii_lowercase() {
        3 + letter_count
    } else {
        4 - letter_count
    };
    let midi = 12 * (octave + 1) + pitch_class as i32 + alter;
    if !(0..=127).contains(&midi) {
        return Err(format!("pitch out of MIDI range in '{}'", token));
    }

    Ok(Some(Event::note(midi as u8, duration)))
}

/// Converts a kern reciprocal (`4`, `8`, `0` = breve, `00` = longa) and a
/// dot count into quarter lengths.
fn reciprocal_to_quarter_length(recip: &str, dots: u32) -> Option<f64> {
    let base = match recip {
        "0" => 8.0,
        "00" => 16.0,
        _ => {
            let n: u32 = recip.parse().ok()?;
            if n == 0 {
                return None;
            }
            4.0 / n as f64
        }
    };
    Some(base * (2.0 - 0.5f64.powi(dots as i32)))
}

/// Splits a duration into writable pieces, largest first.
///
/// Any remainder below the shortest writable value is dropped.
fn split_duration(duration: f64) -> Vec<&'static str> {
    let mut pieces = Vec::new();
    let mut remaining = duration;
    for &(value, recip) in WRITABLE_DURATIONS {
        while remaining + 1e-9 >= value {
            pieces.push(recip);
            remaining -= value;
        }
    }
    pieces
}

fn pitch_to_kern(pitch: u8) -> String {
    let (letter, accidental) = KERN_PITCH_NAMES[(pitch % 12) as usize];
    let octave = pitch as i32 / 12 - 1;
    let letters = if octave >= 4 {
        letter.to_string().repeat((octave - 3) as usize)
    } else {
        letter
            .to_ascii_uppercase()
            .to_string()
            .repeat((4 - octave) as usize)
    };
    format!("{}{}", letters, accidental)
}

fn key_to_interpretation(key: &Key) -> String {
    let (letter, accidental) = KERN_PITCH_NAMES[key.tonic as usize % 12];
    let letter = match key.mode {
        Mode::Major => letter.to_ascii_uppercase(),
        Mode::Minor => letter,
    };
    format!("*{}{}:", letter, accidental)
}

/// Writes a Score as single-spine kern text.
///
/// Note durations that no single (dotted) value expresses are written as
/// tied notes.
pub fn write_kern(score: &Score) -> String {
    let mut lines = Vec::new();

    if let Some(title) = &score.title {
        lines.push(format!("{} {}", TITLE_RECORD, title));
    }
    lines.push("**kern".to_string());
    if let Some(meter) = &score.meter {
        lines.push(format!("*M{}", meter));
    }
    if let Some(key) = &score.key {
        lines.push(key_to_interpretation(key));
    }

    for event in &score.events {
        let pieces = split_duration(event.duration);
        match event.kind {
            EventKind::Rest => {
                for recip in pieces {
                    lines.push(format!("{}r", recip));
                }
            }
            EventKind::Note(pitch) => {
                let name = pitch_to_kern(pitch);
                let last = pieces.len().saturating_sub(1);
                for (i, recip) in pieces.iter().enumerate() {
                    let (open, close) = match (pieces.len(), i) {
                        (1, _) => ("", ""),
                        (_, 0) => ("[", ""),
                        (_, i) if i == last => ("", "]"),
                        _ => ("", "_"),
                    };
                    lines.push(format!("{}{}{}{}", open, recip, name, close));
                }
            }
        }
    }

    lines.push("==".to_string());
    lines.push("*-".to_string());
    let mut text = lines.join("\n");
    text.push('\n');
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    const ESSEN_SAMPLE: &str = "!!!OTL: Schlaf, Kindlein, schlaf
!!!ARE: Europa, Mitteleuropa, Deutschland
**kern
*ICvox
*Ivox
*M3/4
*k[f#]
*G:
{8g
=1
4b
8.a
16g
4f#}
=2
(2r
4dd)
==
*-
!!!AMT: simple triple
";

    #[test]
    fn parses_essen_layout() {
        let score = parse_kern(ESSEN_SAMPLE).unwrap();
        assert_eq!(score.title.as_deref(), Some("Schlaf, Kindlein, schlaf"));
        assert_eq!(score.meter.as_deref(), Some("3/4"));
        assert_eq!(score.key, Some(Key::new(7, Mode::Major)));
        assert_eq!(
            score.events,
            vec![
                Event::note(67, 0.5),
                Event::note(71, 1.0),
                Event::note(69, 0.75),
                Event::note(67, 0.25),
                Event::note(66, 1.0),
                Event::rest(2.0),
                Event::note(74, 1.0),
            ]
        );
    }

    #[test]
    fn octave_letters() {
        let score = parse_kern("**kern\n4c\n4cc\n4C\n4CC\n4B-\n4e#\n*-\n").unwrap();
        let pitches: Vec<u8> = score.pitches().collect();
        assert_eq!(pitches, vec![60, 72, 48, 36, 58, 65]);
    }

    #[test]
    fn durations_and_dots() {
        assert_eq!(reciprocal_to_quarter_length("4", 0), Some(1.0));
        assert_eq!(reciprocal_to_quarter_length("4", 1), Some(1.5));
        assert_eq!(reciprocal_to_quarter_length("2", 2), Some(3.5));
        assert_eq!(reciprocal_to_quarter_length("16", 0), Some(0.25));
        assert_eq!(reciprocal_to_quarter_length("0", 0), Some(8.0));
        assert_eq!(reciprocal_to_quarter_length("3", 0), Some(4.0 / 3.0));
    }

    #[test]
    fn grace_notes_are_dropped() {
        let score = parse_kern("**kern\n8qa\n4g\n*-\n").unwrap();
        assert_eq!(score.events, vec![Event::note(67, 1.0)]);
    }

    #[test]
    fn key_interpretations() {
        assert_eq!(parse_key_interpretation("*C:"), Some(Key::C_MAJOR));
        assert_eq!(parse_key_interpretation("*a:"), Some(Key::A_MINOR));
        assert_eq!(
            parse_key_interpretation("*B-:"),
            Some(Key::new(10, Mode::Major))
        );
        assert_eq!(
            parse_key_interpretation("*f#:"),
            Some(Key::new(6, Mode::Minor))
        );
        assert_eq!(parse_key_interpretation("*k[f#]"), None);
        assert_eq!(parse_key_interpretation("*MM120"), None);
    }

    #[test]
    fn first_kern_spine_is_read() {
        let text = "**text\t**kern\n*\t*C:\nla\t4c\nle\t4d\n*-\t*-\n";
        let score = parse_kern(text).unwrap();
        assert_eq!(score.pitches().collect::<Vec<_>>(), vec![60, 62]);
        assert_eq!(score.key, Some(Key::C_MAJOR));
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(parse_kern("4c\n").is_err());
        assert!(parse_kern("**mens\n4c\n").is_err());
        assert!(parse_kern("").is_err());
        assert!(parse_kern("**kern\ncc\n*-\n").is_err());
        assert!(parse_kern("**kern\n4c 4e\n*-\n").is_err());
        assert!(parse_kern("**kern\n*^\n4c\t4d\n*-\n").is_err());

        let err = parse_kern("**kern\n4c\n4x\n*-\n").unwrap_err();
        assert_eq!(err.line, 3);
    }

    #[test]
    fn writes_tied_notes_for_irregular_durations() {
        let score = Score::from_events(vec![Event::note(60, 1.25), Event::rest(0.5)]);
        let text = write_kern(&score);
        assert!(text.contains("[4c\n16c]"));
        assert!(text.contains("\n8r\n"));
    }

    #[test]
    fn write_then_read_preserves_events() {
        let score = Score {
            title: Some("Test".to_string()),
            meter: Some("4/4".to_string()),
            key: Some(Key::A_MINOR),
            events: vec![
                Event::note(57, 1.5),
                Event::note(71, 0.5),
                Event::rest(1.0),
                Event::note(45, 4.0),
            ],
        };
        let parsed = parse_kern(&write_kern(&score)).unwrap();
        assert_eq!(parsed, score);
    }
}
