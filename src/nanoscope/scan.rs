//! Value extraction from free-text Nanoscope header lines.
//!
//! Header lines look like `\@4:Ramp size: V [Sens. Zsens] (0.0068 V/LSB) 300.0 V`:
//! the key ends at the first `": "` and numbers are embedded in prose.

/// Text after the first `": "`, up to the next one
pub fn string_value(line: &str) -> Option<&str> {
    let line = line.trim_end_matches(['\r', '\n']);
    line.split(": ").nth(1)
}

/// Everything after the first `": "`
pub fn raw_value(line: &str) -> Option<&str> {
    let line = line.trim_end_matches(['\r', '\n']);
    line.split_once(": ").map(|(_, value)| value)
}

fn number_at(bytes: &[u8], start: usize) -> Option<usize> {
    let digits = |mut i: usize| {
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        i
    };

    let mut i = start;
    if bytes.get(i) == Some(&b'-') {
        i += 1;
    }
    if !bytes.get(i).is_some_and(u8::is_ascii_digit) {
        return None;
    }
    i = digits(i);

    if bytes.get(i) == Some(&b'.') && bytes.get(i + 1).is_some_and(u8::is_ascii_digit) {
        i = digits(i + 1);
    }

    if matches!(bytes.get(i), Some(b'e') | Some(b'E')) {
        let mut j = i + 1;
        if matches!(bytes.get(j), Some(b'-') | Some(b'+')) {
            j += 1;
        }
        if bytes.get(j).is_some_and(u8::is_ascii_digit) {
            i = digits(j);
        }
    }
    Some(i)
}

/// Every signed decimal embedded in `text`, in order
pub fn numbers(text: &str) -> Vec<f64> {
    let bytes = text.as_bytes();
    let mut found = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        // a '-' glued to a word ("Tip-1") is not a sign
        let sign_ok = bytes[i] != b'-' || i == 0 || !bytes[i - 1].is_ascii_alphanumeric();
        match number_at(bytes, i).filter(|_| sign_ok) {
            Some(end) => {
                if let Ok(value) = text[i..end].parse::<f64>() {
                    found.push(value);
                }
                i = end;
            }
            None => i += 1,
        }
    }
    found
}

/// First signed decimal embedded in `text`
pub fn first_number(text: &str) -> Option<f64> {
    numbers(text).into_iter().next()
}

/// Length unit of a value such as `5.000 5.000 ~m`, as metres per unit
pub fn length_unit(text: &str) -> Option<f64> {
    let token = text
        .split_whitespace()
        .find(|token| token.parse::<f64>().is_err())?;
    let unit: String = token
        .chars()
        .take_while(|c| c.is_ascii_lowercase() || *c == '~')
        .collect();
    match unit.as_str() {
        "nm" => Some(1e-9),
        // Nanoscope writes µ as '~'
        "~m" | "um" => Some(1e-6),
        "m" => Some(1.0),
        _ => None,
    }
}
