use std::collections::HashMap;

/// Convert a string to a fixed-size byte array for FixedString columns.
/// Pads with zeros if shorter, truncates if longer.
#[must_use]
pub fn string_to_fixed_bytes<const N: usize>(s: &str) -> [u8; N] {
    let mut result = [0u8; N];
    let bytes = s.as_bytes();
    let len = bytes.len().min(N);
    result[..len].copy_from_slice(&bytes[..len]);
    result
}

/// Read a FixedString column back, dropping zero padding. An all-zero value
/// (absent trace correlation) comes back as the empty string.
#[must_use]
pub fn fixed_bytes_to_string(bytes: &[u8]) -> String {
    let end = bytes
        .iter()
        .position(|&b| b == 0)
        .unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// Convert an attribute map to the store's `Map(String, String)` wire form,
/// ordered by key so identical records produce identical rows.
#[must_use]
pub fn map_to_pairs<S: ::std::hash::BuildHasher>(
    map: HashMap<String, String, S>,
) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = map.into_iter().collect();
    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    pairs
}

/// Inverse of [`map_to_pairs`] for rows read back from the store.
#[must_use]
pub fn pairs_to_map(pairs: Vec<(String, String)>) -> HashMap<String, String> {
    pairs.into_iter().collect()
}
