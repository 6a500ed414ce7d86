//! Command grammar parser.
//!
//! Splits one recognized utterance into an ordered chain of atomic
//! commands. Matching is an explicit tokenizer plus longest-phrase-first
//! keyword lookup, so precedence ("turn left" over "left") is a rule of
//! the grammar rather than an artifact of substring search order.

use crate::command::{AtomicCommand, CommandChain, CommandKind, Direction};
use crate::config::Defaults;
use crate::error::ParseError;
use crate::voice::number::{resolve_magnitude, Quantity};

/// Chain separator phrases, longest first so "after that" wins over a
/// hypothetical bare "after". A comma separates on its own.
const SEPARATORS: &[&[&str]] = &[
    &["after", "that"],
    &["followed", "by"],
    &["then"],
    &["and"],
    &["next"],
    &["afterward"],
    &[","],
];

/// Command keyword phrases, longest first. Order within the same length
/// is irrelevant because matching is token-exact.
const KEYWORDS: &[(&[&str], CommandKind, Option<Direction>)] = &[
    (&["turn", "left"], CommandKind::Rotate, Some(Direction::TurnLeft)),
    (&["rotate", "left"], CommandKind::Rotate, Some(Direction::TurnLeft)),
    (&["turn", "right"], CommandKind::Rotate, Some(Direction::TurnRight)),
    (&["rotate", "right"], CommandKind::Rotate, Some(Direction::TurnRight)),
    (&["take", "off"], CommandKind::Takeoff, None),
    (&["power", "off"], CommandKind::Shutdown, None),
    (&["shut", "down"], CommandKind::Shutdown, None),
    (&["come", "home"], CommandKind::Return, None),
    (&["takeoff"], CommandKind::Takeoff, None),
    (&["shutdown"], CommandKind::Shutdown, None),
    (&["stop"], CommandKind::Stop, None),
    (&["return"], CommandKind::Return, None),
    (&["home"], CommandKind::Return, None),
    (&["land"], CommandKind::Land, None),
    (&["disarm"], CommandKind::Disarm, None),
    (&["arm"], CommandKind::Arm, None),
    (&["forward"], CommandKind::Move, Some(Direction::Forward)),
    (&["backward"], CommandKind::Move, Some(Direction::Backward)),
    (&["left"], CommandKind::Move, Some(Direction::Left)),
    (&["right"], CommandKind::Move, Some(Direction::Right)),
    (&["up"], CommandKind::Move, Some(Direction::Up)),
    (&["down"], CommandKind::Move, Some(Direction::Down)),
];

/// Words carrying no command meaning, stripped before keyword matching
const FILLER: &[&str] = &["drone", "the", "please", "go", "now", "a"];

fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let mut tokens = Vec::new();
    for raw in lowered.split_whitespace() {
        let trimmed = raw.trim_matches(|c: char| c == '.' || c == '!' || c == '?');
        let had_comma = trimmed.ends_with(',');
        let word = trimmed.trim_matches(',');
        if !word.is_empty() {
            tokens.push(word.to_string());
        }
        if had_comma {
            tokens.push(",".to_string());
        }
    }
    tokens
}

/// Split token stream into segments on separator phrases
fn split_segments(tokens: &[String]) -> Vec<Vec<String>> {
    let mut segments = Vec::new();
    let mut current = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        let mut matched_len = 0;
        for sep in SEPARATORS {
            if tokens.len() - i >= sep.len()
                && sep.iter().zip(&tokens[i..]).all(|(a, b)| *a == b)
            {
                matched_len = sep.len();
                break;
            }
        }
        if matched_len > 0 {
            if !current.is_empty() {
                segments.push(std::mem::take(&mut current));
            }
            i += matched_len;
        } else {
            current.push(tokens[i].clone());
            i += 1;
        }
    }
    if !current.is_empty() {
        segments.push(current);
    }
    segments
}

/// Match a keyword phrase anywhere in the segment, longest phrase first
/// at each position. Returns the match plus the leftover tokens, which
/// feed the magnitude resolver.
fn match_keyword(tokens: &[String]) -> Option<(CommandKind, Option<Direction>, Vec<String>)> {
    for pos in 0..tokens.len() {
        for (phrase, kind, direction) in KEYWORDS {
            if tokens.len() - pos >= phrase.len()
                && phrase.iter().zip(&tokens[pos..]).all(|(a, b)| *a == b)
            {
                let mut rest: Vec<String> = tokens[..pos].to_vec();
                rest.extend_from_slice(&tokens[pos + phrase.len()..]);
                return Some((*kind, *direction, rest));
            }
        }
    }
    None
}

fn segment_to_command(
    segment: &[String],
    defaults: &Defaults,
    raw_text: &str,
    recognized_at_ms: u64,
) -> Result<AtomicCommand, ParseError> {
    let filtered: Vec<String> = segment
        .iter()
        .filter(|t| !FILLER.contains(&t.as_str()))
        .cloned()
        .collect();

    let (kind, direction, rest) = match_keyword(&filtered).ok_or_else(|| ParseError {
        segment: segment.join(" "),
    })?;

    let rest_refs: Vec<&str> = rest.iter().map(|s| s.as_str()).collect();
    let magnitude = match kind {
        CommandKind::Move => Some(
            resolve_magnitude(&rest_refs, Quantity::Distance).unwrap_or(defaults.move_distance_m),
        ),
        CommandKind::Rotate => Some(
            resolve_magnitude(&rest_refs, Quantity::Rotation).unwrap_or(defaults.rotate_angle_deg),
        ),
        CommandKind::Takeoff => Some(
            resolve_magnitude(&rest_refs, Quantity::Distance).unwrap_or(defaults.takeoff_altitude_m),
        ),
        _ => None,
    };

    Ok(AtomicCommand {
        kind,
        direction,
        magnitude,
        raw_text: raw_text.to_string(),
        recognized_at_ms,
    })
}

/// Parse one recognized utterance into a command chain.
///
/// Unmatched segments are returned as `ParseError`s and dropped; they do
/// not abort the rest of the chain. "stop" anywhere collapses the whole
/// utterance to a single STOP command, because it is a safety interrupt.
pub fn parse_utterance(
    text: &str,
    defaults: &Defaults,
    recognized_at_ms: u64,
) -> (CommandChain, Vec<ParseError>) {
    let tokens = tokenize(text);

    if tokens.iter().any(|t| t == "stop") {
        let stop = AtomicCommand {
            kind: CommandKind::Stop,
            direction: None,
            magnitude: None,
            raw_text: text.to_string(),
            recognized_at_ms,
        };
        return (CommandChain::new(vec![stop]), Vec::new());
    }

    let mut commands = Vec::new();
    let mut errors = Vec::new();
    for segment in split_segments(&tokens) {
        let raw = segment.join(" ");
        match segment_to_command(&segment, defaults, &raw, recognized_at_ms) {
            Ok(cmd) => commands.push(cmd),
            Err(e) => errors.push(e),
        }
    }

    (CommandChain::new(commands), errors)
}
