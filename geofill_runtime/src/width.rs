const FULLWIDTH_START: u32 = 0xFF01;
const FULLWIDTH_END: u32 = 0xFF5E;
const FULLWIDTH_OFFSET: u32 = 0xFEE0;
const IDEOGRAPHIC_SPACE: char = '\u{3000}';

/// Fold full-width ASCII presentation forms (U+FF01..=U+FF5E) to their ASCII
/// equivalents and the ideographic space to a regular space.
pub fn to_halfwidth(input: &str) -> String {
    input
        .chars()
        .map(|ch| {
            let code = ch as u32;
            if (FULLWIDTH_START..=FULLWIDTH_END).contains(&code) {
                char::from_u32(code - FULLWIDTH_OFFSET).unwrap_or(ch)
            } else if ch == IDEOGRAPHIC_SPACE {
                ' '
            } else {
                ch
            }
        })
        .collect()
}
