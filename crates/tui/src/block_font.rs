use std::collections::HashMap;

use once_cell::sync::Lazy;

const FONT_HEIGHT: usize = 5;
const FILL_CHAR: char = '█';

type Glyph = [&'static str; FONT_HEIGHT];

// Only the letters the banner actually uses.
static GLYPHS: Lazy<HashMap<char, Glyph>> = Lazy::new(|| {
    HashMap::from([
        ('B', ["1111 ", "1   1", "1111 ", "1   1", "1111 "]),
        ('I', ["11111", "  1  ", "  1  ", "  1  ", "11111"]),
        ('N', ["1   1", "11  1", "1 1 1", "1  11", "1   1"]),
        ('G', [" 1111", "1    ", "1  11", "1   1", " 111 "]),
        ('O', [" 111 ", "1   1", "1   1", "1   1", " 111 "]),
        (' ', ["     ", "     ", "     ", "     ", "     "]),
    ])
});

/// Render the provided text using the chunky block font, one string per
/// canvas row. Characters without a glyph render as blanks.
pub fn render(text: &str) -> Vec<String> {
    let content: Vec<char> = text.chars().map(|c| c.to_ascii_uppercase()).collect();
    let mut rows = vec![String::new(); FONT_HEIGHT];

    for (index, ch) in content.iter().enumerate() {
        let glyph = GLYPHS.get(ch).or_else(|| GLYPHS.get(&' ')).unwrap();
        for (row_idx, pattern) in glyph.iter().enumerate() {
            if index > 0 {
                rows[row_idx].push_str("  ");
            }
            for symbol in pattern.chars() {
                let painted = if symbol == '1' { FILL_CHAR } else { ' ' };
                // double width for a square-ish aspect ratio
                rows[row_idx].push(painted);
                rows[row_idx].push(painted);
            }
        }
    }

    rows.iter()
        .map(|row| row.trim_end().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_constant_height() {
        let lines = render("BINGO");
        assert_eq!(lines.len(), FONT_HEIGHT);
        assert!(lines.iter().any(|line| line.contains(FILL_CHAR)));
    }

    #[test]
    fn unknown_characters_render_blank() {
        let lines = render("@");
        assert!(lines.iter().all(|line| !line.contains(FILL_CHAR)));
    }
}
