//! ISBN validation and normalization

/// Strip hyphens/spaces and uppercase any check character.
fn canonical(isbn: &str) -> String {
    isbn.chars()
        .filter(|c| c.is_ascii_digit() || *c == 'X' || *c == 'x')
        .collect::<String>()
        .to_uppercase()
}

/// Strict ISBN validation: correct length and checksum.
pub fn is_valid_isbn(isbn: &str) -> bool {
    let normalized = canonical(isbn);
    match normalized.len() {
        10 => validate_isbn10(&normalized),
        13 => validate_isbn13(&normalized),
        _ => false,
    }
}

/// Convert an ISBN to 13-digit form.
///
/// ISBN-10 inputs gain the `978` bookland prefix and a recomputed check
/// digit. ISBN-13 inputs are returned without separators. Inputs of any
/// other length are returned canonicalized but otherwise unchanged.
pub fn to_isbn13(isbn: &str) -> String {
    let normalized = canonical(isbn);
    match normalized.len() {
        13 => normalized,
        10 => {
            let core = format!("978{}", &normalized[..9]);
            let check = isbn13_check_digit(&core);
            format!("{core}{check}")
        }
        _ => normalized,
    }
}

fn isbn13_check_digit(first12: &str) -> u32 {
    let sum: u32 = first12
        .chars()
        .enumerate()
        .map(|(i, c)| {
            let value = c.to_digit(10).unwrap_or(0);
            if i % 2 == 0 {
                value
            } else {
                value * 3
            }
        })
        .sum();
    (10 - sum % 10) % 10
}

fn validate_isbn10(isbn: &str) -> bool {
    let chars: Vec<char> = isbn.chars().collect();
    for (i, &c) in chars.iter().enumerate() {
        if i < 9 {
            if !c.is_ascii_digit() {
                return false;
            }
        } else if !c.is_ascii_digit() && c != 'X' {
            return false;
        }
    }
    let sum: u32 = chars
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            let value = if c == 'X' {
                10
            } else {
                c.to_digit(10).unwrap_or(0)
            };
            value * (10 - i as u32)
        })
        .sum();
    sum % 11 == 0
}

fn validate_isbn13(isbn: &str) -> bool {
    if !isbn.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    let sum: u32 = isbn
        .chars()
        .enumerate()
        .map(|(i, c)| {
            let value = c.to_digit(10).unwrap_or(0);
            if i % 2 == 0 {
                value
            } else {
                value * 3
            }
        })
        .sum();
    sum % 10 == 0
}
