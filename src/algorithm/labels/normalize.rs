//! Name and identifier normalization for registry matching

/// Canonical form of an organization or person name
///
/// Uppercases, spells out `&` as `AND`, turns every other non-alphanumeric
/// character into a space and collapses runs of whitespace.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    let mut spaced = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch == '&' {
            spaced.push_str(" AND ");
        } else if ch.is_alphanumeric() {
            spaced.extend(ch.to_uppercase());
        } else {
            spaced.push(' ');
        }
    }
    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Canonical jurisdiction code
#[must_use]
pub fn normalize_jurisdiction(jurisdiction: Option<&str>) -> String {
    jurisdiction.map(|j| j.trim().to_uppercase()).unwrap_or_default()
}

/// A usable identifier: exactly `len` ASCII digits and not all zeros
#[must_use]
pub fn valid_identifier(identifier: Option<&str>, len: usize) -> Option<&str> {
    let id = identifier?.trim();
    let well_formed = id.len() == len && id.bytes().all(|b| b.is_ascii_digit());
    (well_formed && id.bytes().any(|b| b != b'0')).then_some(id)
}

/// Match key for an organization name, if long enough to be distinctive
#[must_use]
pub fn organization_key(name: Option<&str>, jurisdiction: &str, min_len: usize) -> Option<String> {
    let normalized = normalize_name(name?);
    (normalized.len() >= min_len).then(|| format!("{normalized}|{jurisdiction}"))
}

/// Match key for a person, requiring both name parts
#[must_use]
pub fn person_key(last: Option<&str>, first: Option<&str>, jurisdiction: &str) -> Option<String> {
    let last = normalize_name(last?);
    let first = normalize_name(first?);
    (!last.is_empty() && !first.is_empty()).then(|| format!("{last}|{first}|{jurisdiction}"))
}
