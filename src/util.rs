/// Splits the first `N` bytes off as an array, returning the rest
#[inline]
pub(crate) fn get_split<const N: usize>(data: &[u8]) -> Option<([u8; N], &[u8])> {
    if data.len() < N {
        return None;
    }

    let (head, rest) = data.split_at(N);
    let mut out = [0u8; N];
    out.copy_from_slice(head);
    Some((out, rest))
}

/// Uppercases the first character of `s`, leaving the rest untouched
pub(crate) fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Case insensitive (ascii) substring search
pub(crate) fn contains_ignore_ascii_case(haystack: &str, needle: &str) -> bool {
    let needle = needle.as_bytes();
    if needle.is_empty() {
        return true;
    }

    haystack
        .as_bytes()
        .windows(needle.len())
        .any(|window| window.eq_ignore_ascii_case(needle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    #[test]
    fn test_get_split() {
        let data = [1u8, 2, 3, 4, 5];
        assert_eq!(get_split::<2>(&data), Some(([1, 2], &data[2..])));
        assert_eq!(get_split::<5>(&data), Some(([1, 2, 3, 4, 5], &data[5..])));
        assert_eq!(get_split::<6>(&data), None);
    }

    #[rstest]
    #[case("coin442_41", "Coin442_41")]
    #[case("Shell2_1957", "Shell2_1957")]
    #[case("", "")]
    #[case("ärger", "Ärger")]
    fn test_capitalize_first(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(capitalize_first(input), expected);
    }

    #[rstest]
    #[case("A1FastTravelPipeCap", "pipecap", true)]
    #[case("PIPECAP12_2", "pipecap", true)]
    #[case("Pipesystem_3", "pipecap", false)]
    #[case("", "", true)]
    fn test_contains_ignore_case(
        #[case] haystack: &str,
        #[case] needle: &str,
        #[case] expected: bool,
    ) {
        assert_eq!(contains_ignore_ascii_case(haystack, needle), expected);
    }
}
