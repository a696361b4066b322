/// Parse a numeric literal of the program source: decimal or `0x` hex, with
/// an optional leading minus.
pub fn parse_literal(s: &str) -> Option<i64> {
    if let Ok(r) = s.parse() {
        return Some(r);
    }
    let (sign, body) = match s.strip_prefix('-') {
        Some(body) => ("-", body),
        None => ("", s),
    };
    let hex = body.strip_prefix("0x")?;
    if hex.is_empty() || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    i64::from_str_radix(&format!("{sign}{hex}"), 16).ok()
}
