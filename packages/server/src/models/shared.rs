/// Tokens that turn `include_hidden` on. Everything else, including an absent
/// parameter, leaves it off.
pub const INCLUDE_HIDDEN_TOKENS: [&str; 4] = ["1", "true", "True", "yes"];

/// Interpret the `include_hidden` query parameter.
///
/// Matching is exact: `"TRUE"`, `"on"`, `" 1"` and the empty string are all false.
pub fn parse_include_hidden(value: Option<&str>) -> bool {
    value.is_some_and(|v| INCLUDE_HIDDEN_TOKENS.contains(&v))
}

/// Parse a boolean form field such as `hidden`.
///
/// Returns `None` for anything outside the accepted spellings so the caller
/// can report a validation error instead of guessing.
pub fn parse_form_bool(value: &str) -> Option<bool> {
    match value.trim() {
        "true" | "True" | "TRUE" | "1" | "yes" | "on" => Some(true),
        "false" | "False" | "FALSE" | "0" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
