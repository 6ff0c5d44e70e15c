use crate::document::Activity;

/// Numeric answers closer than this are the same answer ("3.0" vs "3").
pub const NUMERIC_EPSILON: f64 = 1e-3;

/// Which rule decided a verdict. Everything but `Incorrect` counts as correct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    IndexMatch,
    TextMatch,
    NumericMatch,
    Incorrect,
}

impl Verdict {
    pub fn is_correct(self) -> bool {
        !matches!(self, Verdict::Incorrect)
    }
}

/// Grades a chosen option. Rules run in priority order; the first that matches wins:
/// authoritative index, normalized text, numeric tolerance.
pub fn verify(
    chosen: &str,
    correct_answer: Option<&str>,
    correct_index: Option<i64>,
    options: &[String],
) -> Verdict {
    if let Some(index) = correct_index.and_then(|i| usize::try_from(i).ok())
        && index < options.len()
        && position_of(chosen, options) == Some(index)
    {
        return Verdict::IndexMatch;
    }

    let Some(correct_answer) = correct_answer else {
        return Verdict::Incorrect;
    };

    let chosen = normalize_answer(chosen);
    let correct = normalize_answer(correct_answer);
    if chosen == correct {
        return Verdict::TextMatch;
    }

    match (leading_float(&chosen), leading_float(&correct)) {
        (Some(a), Some(b)) if (a - b).abs() < NUMERIC_EPSILON => Verdict::NumericMatch,
        _ => Verdict::Incorrect,
    }
}

pub fn verify_activity(activity: &Activity, chosen: &str) -> Verdict {
    verify(
        chosen,
        activity.correct_answer.as_deref(),
        activity.correct_answer_index,
        activity.options(),
    )
}

/// Strips `$ * _` and backticks plus all whitespace, then lower-cases.
pub fn normalize_answer(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, '$' | '*' | '_' | '`') && !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Reads the longest decimal prefix of `raw` as a float, ignoring whatever
/// follows it, so `"12.5%"` reads as 12.5 and `"5cm"` as 5.
pub fn leading_float(raw: &str) -> Option<f64> {
    let raw = raw.trim_start();
    let bytes = raw.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    let int_start = end;
    while bytes.get(end).is_some_and(u8::is_ascii_digit) {
        end += 1;
    }
    let mut digits = end - int_start;
    if bytes.get(end) == Some(&b'.') {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while bytes.get(frac_end).is_some_and(u8::is_ascii_digit) {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        end = frac_end;
    }
    if digits == 0 {
        return None;
    }
    // An exponent only counts when at least one digit follows it.
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while bytes.get(exp_end).is_some_and(u8::is_ascii_digit) {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }
    raw[..end].parse().ok()
}

// Exact option text first; a learner string that only differs by surrounding
// whitespace still identifies its option.
fn position_of(chosen: &str, options: &[String]) -> Option<usize> {
    options
        .iter()
        .position(|o| o == chosen)
        .or_else(|| options.iter().position(|o| o.trim() == chosen.trim()))
}
