use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

/// slugify
///
/// Derives a URL-safe identifier from a title: lowercase ASCII letters and digits
/// separated by single hyphens. Diacritics are stripped (NFD decomposition, combining
/// marks dropped) and every other character acts as a separator.
///
/// The output alphabet is `[a-z0-9-]` with no leading, trailing or doubled hyphen,
/// so `slugify(slugify(x)) == slugify(x)`.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_separator = false;

    for c in fold_chars(input) {
        if c.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            slug.push(c.to_ascii_lowercase());
            pending_separator = false;
        } else {
            pending_separator = true;
        }
    }

    slug
}

/// fold
///
/// Lowercased, diacritic-free form of `input`, used for accent-insensitive search.
/// Unlike `slugify` it keeps whitespace and punctuation.
pub fn fold(input: &str) -> String {
    fold_chars(input).flat_map(char::to_lowercase).collect()
}

fn fold_chars(input: &str) -> impl Iterator<Item = char> + '_ {
    input
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(|c| {
            // Letters that do not decompose under NFD.
            let expanded: &'static [char] = match c {
                'œ' => &['o', 'e'],
                'Œ' => &['O', 'E'],
                'æ' => &['a', 'e'],
                'Æ' => &['A', 'E'],
                'ß' => &['s', 's'],
                'ø' => &['o'],
                'Ø' => &['O'],
                'đ' => &['d'],
                'Đ' => &['D'],
                'ł' => &['l'],
                'Ł' => &['L'],
                _ => return Expanded::One(Some(c)),
            };
            Expanded::Many(expanded.iter())
        })
}

enum Expanded {
    One(Option<char>),
    Many(std::slice::Iter<'static, char>),
}

impl Iterator for Expanded {
    type Item = char;

    fn next(&mut self) -> Option<char> {
        match self {
            Expanded::One(c) => c.take(),
            Expanded::Many(iter) => iter.next().copied(),
        }
    }
}

/// with_suffix
///
/// Candidate slug for the `attempt`-th collision: `base`, `base-2`, `base-3`, ...
pub fn with_suffix(base: &str, attempt: usize) -> String {
    if attempt <= 1 {
        base.to_string()
    } else {
        format!("{base}-{attempt}")
    }
}
