//! Number-word and unit resolution.
//!
//! Turns spoken numeric tokens ("23", "twenty three") and unit tokens
//! ("feet", "deg") into a single magnitude in canonical units: meters
//! for distance, degrees for rotation.

/// Physical quantity a command's magnitude is measured in. Decides the
/// canonical unit: meters for distance, degrees for rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantity {
    Distance,
    Rotation,
}

/// Cardinal word values. Homophones the recognizer commonly produces
/// ("to", "for") are accepted as their numeric twins.
fn word_value(word: &str) -> Option<u32> {
    let v = match word {
        "zero" => 0,
        "one" => 1,
        "two" | "to" => 2,
        "three" => 3,
        "four" | "for" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" => 8,
        "nine" => 9,
        "ten" => 10,
        "eleven" => 11,
        "twelve" => 12,
        "thirteen" => 13,
        "fourteen" => 14,
        "fifteen" => 15,
        "sixteen" => 16,
        "seventeen" => 17,
        "eighteen" => 18,
        "nineteen" => 19,
        "twenty" => 20,
        "thirty" => 30,
        "forty" => 40,
        "fifty" => 50,
        "sixty" => 60,
        "seventy" => 70,
        "eighty" => 80,
        "ninety" => 90,
        "hundred" => 100,
        _ => return None,
    };
    Some(v)
}

/// Conversion factor from a unit token into the canonical unit.
/// Unknown tokens fall back to 1.0 rather than discarding the command.
pub fn unit_factor(unit: &str) -> f64 {
    match unit.to_ascii_lowercase().as_str() {
        "inch" | "inches" | "in" => 0.0254,
        "foot" | "feet" | "ft" => 0.3048,
        "yard" | "yards" | "yd" => 0.9144,
        "meter" | "meters" | "metre" | "metres" | "m" => 1.0,
        "degree" | "degrees" | "deg" => 1.0,
        _ => 1.0,
    }
}

fn is_unit_token(token: &str) -> bool {
    matches!(
        token.to_ascii_lowercase().as_str(),
        "inch"
            | "inches"
            | "in"
            | "foot"
            | "feet"
            | "ft"
            | "yard"
            | "yards"
            | "yd"
            | "meter"
            | "meters"
            | "metre"
            | "metres"
            | "m"
            | "degree"
            | "degrees"
            | "deg"
    )
}

/// Scan tokens for a numeric value. Digit tokens win; otherwise word
/// numbers are accumulated left to right ("one hundred twenty" -> 120,
/// "twenty three" -> 23), stopping at the first non-number word after
/// the run begins.
fn extract_value(tokens: &[&str]) -> Option<f64> {
    for token in tokens {
        if token.chars().all(|c| c.is_ascii_digit()) && !token.is_empty() {
            if let Ok(v) = token.parse::<u64>() {
                return Some(v as f64);
            }
        }
    }

    let mut total: u64 = 0;
    let mut started = false;
    for token in tokens {
        match word_value(token) {
            Some(100) if started => total *= 100,
            Some(v) => {
                total += v as u64;
                started = true;
            }
            None if started => break,
            None => {}
        }
    }
    if started && total > 0 {
        Some(total as f64)
    } else {
        None
    }
}

/// Resolve a magnitude from the tokens left over after keyword matching,
/// already converted into the canonical unit for `quantity`.
///
/// Returns `None` when no numeric token is present; that is not an
/// error, callers substitute the command-specific default. An absent or
/// unrecognized unit resolves to the canonical unit itself.
pub fn resolve_magnitude(tokens: &[&str], quantity: Quantity) -> Option<f64> {
    let value = extract_value(tokens)?;

    let factor = match quantity {
        Quantity::Distance => tokens
            .iter()
            .find(|t| is_unit_token(t))
            .map(|t| unit_factor(t))
            .unwrap_or(1.0),
        // Angles are always spoken in degrees, the canonical unit
        Quantity::Rotation => 1.0,
    };

    Some(value * factor)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(s: &str) -> Vec<&str> {
        s.split_whitespace().collect()
    }

    #[test]
    fn test_unit_factors_exact() {
        assert_eq!(unit_factor("inches") * 12.0, 0.3048);
        assert_eq!(unit_factor("yards") * 2.0, 1.8288);
        assert_eq!(unit_factor("feet"), 0.3048);
        assert_eq!(unit_factor("meters"), 1.0);
        assert_eq!(unit_factor("degrees"), 1.0);
    }

    #[test]
    fn test_unknown_unit_falls_back_to_canonical() {
        assert_eq!(unit_factor("cubits"), 1.0);
    }

    #[test]
    fn test_digit_tokens() {
        let m = resolve_magnitude(&toks("23 meters"), Quantity::Distance).unwrap();
        assert_eq!(m, 23.0);
    }

    #[test]
    fn test_word_numbers() {
        let m = resolve_magnitude(&toks("twenty three"), Quantity::Distance).unwrap();
        assert_eq!(m, 23.0);
        let m = resolve_magnitude(&toks("five"), Quantity::Distance).unwrap();
        assert_eq!(m, 5.0);
    }

    #[test]
    fn test_compound_hundreds() {
        let m = resolve_magnitude(&toks("one hundred twenty"), Quantity::Distance).unwrap();
        assert_eq!(m, 120.0);
    }

    #[test]
    fn test_homophones() {
        let m = resolve_magnitude(&toks("to meters"), Quantity::Distance).unwrap();
        assert_eq!(m, 2.0);
    }

    #[test]
    fn test_unit_conversion_applied() {
        let m = resolve_magnitude(&toks("12 inches"), Quantity::Distance).unwrap();
        assert_eq!(m, 0.3048);
        let m = resolve_magnitude(&toks("two yards"), Quantity::Distance).unwrap();
        assert_eq!(m, 1.8288);
    }

    #[test]
    fn test_rotation_ignores_distance_units() {
        let m = resolve_magnitude(&toks("ninety degrees"), Quantity::Rotation).unwrap();
        assert_eq!(m, 90.0);
        let m = resolve_magnitude(&toks("ninety feet"), Quantity::Rotation).unwrap();
        assert_eq!(m, 90.0);
    }

    #[test]
    fn test_no_magnitude_is_none_not_error() {
        assert_eq!(resolve_magnitude(&toks(""), Quantity::Distance), None);
        assert_eq!(resolve_magnitude(&toks("quickly"), Quantity::Rotation), None);
    }

    #[test]
    fn test_missing_unit_defaults_to_canonical() {
        let m = resolve_magnitude(&toks("5"), Quantity::Distance).unwrap();
        assert_eq!(m, 5.0);
        let m = resolve_magnitude(&toks("ninety"), Quantity::Rotation).unwrap();
        assert_eq!(m, 90.0);
    }
}
