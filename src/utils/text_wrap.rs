//! Ecology text formatting for hover tooltips
//!
//! Descriptions are greedily wrapped to a fixed character width and joined
//! with `<br>` so the plotting layer can render them as multi-line labels.

use textwrap::word_splitters::split_words;
use textwrap::{WordSeparator, WordSplitter};

/// Line width (in characters) used for hover descriptions
pub const HOVER_LINE_WIDTH: usize = 65;

/// Text shown when a species has no ecology description
pub const ECOLOGY_UNAVAILABLE: &str = "Description écologique non disponible.";

/// Format an optional description for hover display
///
/// Blank or missing descriptions fall back to [`ECOLOGY_UNAVAILABLE`].
pub fn format_ecology_for_hover(text: Option<&str>) -> String {
    match text {
        Some(t) if !t.trim().is_empty() => wrap_text(t, HOVER_LINE_WIDTH).join("<br>"),
        _ => ECOLOGY_UNAVAILABLE.to_string(),
    }
}

/// Tab stops used when expanding tabs before wrapping
const TAB_SIZE: usize = 8;

/// Greedy word wrap
///
/// Words are separated by spaces and split after hyphens between letters.
/// Whitespace inside a line is kept as written and dropped at line breaks.
/// A word longer than `width` first fills the remaining space on the current
/// line, then is cut into `width`-sized pieces.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let text = expand_whitespace(text);

    let splitter = WordSplitter::HyphenSplitter;
    let fragments = split_words(WordSeparator::AsciiSpace.find_words(&text), &splitter);

    let mut lines = Vec::new();
    let mut line = String::new();
    let mut line_len = 0usize;
    let mut line_open = false;
    let mut gap = "";

    for fragment in fragments {
        let mut rest: Vec<char> = fragment.word.chars().collect();

        loop {
            let gap_len = if line_open { gap.chars().count() } else { 0 };
            if line_len + gap_len + rest.len() <= width {
                if line_open {
                    line.push_str(gap);
                }
                line.extend(rest.iter());
                line_len += gap_len + rest.len();
                line_open = true;
                break;
            }

            if rest.len() > width {
                let space_left = width.saturating_sub(line_len + gap_len);
                if space_left > 0 {
                    if line_open {
                        line.push_str(gap);
                    }
                    line.extend(rest.drain(..space_left));
                }
            }

            if !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            line_len = 0;
            line_open = false;
        }

        gap = fragment.whitespace;
    }

    if !line.is_empty() {
        lines.push(line);
    }

    lines
}

/// Expand tabs to the next tab stop and turn other whitespace controls into spaces
fn expand_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut column = 0usize;

    for ch in text.chars() {
        match ch {
            '\t' => {
                let pad = TAB_SIZE - column % TAB_SIZE;
                out.extend(std::iter::repeat(' ').take(pad));
                column += pad;
            }
            '\n' | '\r' => {
                out.push(' ');
                column = 0;
            }
            '\u{0B}' | '\u{0C}' => {
                out.push(' ');
                column += 1;
            }
            c => {
                out.push(c);
                column += 1;
            }
        }
    }

    out
}
