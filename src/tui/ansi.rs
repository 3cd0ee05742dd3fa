//! Converting SGR-styled strings into ratatui lines for drawing.

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

use crate::text::escape_len;

pub(crate) fn ansi_line(raw: &str, base: Style) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut style = base;
    let mut buf = String::new();
    let mut idx = 0usize;
    while idx < raw.len() {
        if let Some(len) = escape_len(raw, idx) {
            let code = &raw[idx..idx + len];
            if let Some(params) = code.strip_prefix("\u{1b}[").and_then(|c| c.strip_suffix('m')) {
                if !buf.is_empty() {
                    spans.push(Span::styled(std::mem::take(&mut buf), style));
                }
                style = apply_sgr(style, params, base);
            }
            idx += len;
            continue;
        }
        let Some(ch) = raw[idx..].chars().next() else {
            break;
        };
        buf.push(ch);
        idx += ch.len_utf8();
    }
    if !buf.is_empty() {
        spans.push(Span::styled(buf, style));
    }
    if spans.is_empty() {
        return Line::from("");
    }
    Line::from(spans)
}

fn basic_color(code: u8) -> Color {
    match code {
        0 => Color::Black,
        1 => Color::Red,
        2 => Color::Green,
        3 => Color::Yellow,
        4 => Color::Blue,
        5 => Color::Magenta,
        6 => Color::Cyan,
        _ => Color::Gray,
    }
}

fn bright_color(code: u8) -> Color {
    match code {
        0 => Color::DarkGray,
        1 => Color::LightRed,
        2 => Color::LightGreen,
        3 => Color::LightYellow,
        4 => Color::LightBlue,
        5 => Color::LightMagenta,
        6 => Color::LightCyan,
        _ => Color::White,
    }
}

/// Reads the colour following a `38`/`48` introducer: `5;n` or `2;r;g;b`.
fn extended_color<'a>(parts: &mut impl Iterator<Item = &'a str>) -> Option<Color> {
    match parts.next()?.parse::<u8>().ok()? {
        5 => Some(Color::Indexed(parts.next()?.parse().ok()?)),
        2 => {
            let r = parts.next()?.parse().ok()?;
            let g = parts.next()?.parse().ok()?;
            let b = parts.next()?.parse().ok()?;
            Some(Color::Rgb(r, g, b))
        }
        _ => None,
    }
}

fn apply_sgr(current: Style, sgr: &str, base: Style) -> Style {
    let mut style = current;
    let sgr = if sgr.is_empty() { "0" } else { sgr };
    let mut parts = sgr.split(';');
    while let Some(part) = parts.next() {
        let Ok(code) = part.parse::<u8>() else {
            continue;
        };
        match code {
            0 => style = base,
            1 => style = style.add_modifier(Modifier::BOLD),
            2 => style = style.add_modifier(Modifier::DIM),
            3 => style = style.add_modifier(Modifier::ITALIC),
            4 => style = style.add_modifier(Modifier::UNDERLINED),
            7 => style = style.add_modifier(Modifier::REVERSED),
            9 => style = style.add_modifier(Modifier::CROSSED_OUT),
            22 => style = style.remove_modifier(Modifier::BOLD | Modifier::DIM),
            23 => style = style.remove_modifier(Modifier::ITALIC),
            24 => style = style.remove_modifier(Modifier::UNDERLINED),
            27 => style = style.remove_modifier(Modifier::REVERSED),
            29 => style = style.remove_modifier(Modifier::CROSSED_OUT),
            30..=37 => style = style.fg(basic_color(code - 30)),
            38 => {
                if let Some(color) = extended_color(&mut parts) {
                    style = style.fg(color);
                }
            }
            39 => style = style.fg(base.fg.unwrap_or(Color::Reset)),
            40..=47 => style = style.bg(basic_color(code - 40)),
            48 => {
                if let Some(color) = extended_color(&mut parts) {
                    style = style.bg(color);
                }
            }
            49 => style = style.bg(base.bg.unwrap_or(Color::Reset)),
            90..=97 => style = style.fg(bright_color(code - 90)),
            100..=107 => style = style.bg(bright_color(code - 100)),
            _ => {}
        }
    }
    style
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(line: &Line<'_>) -> String {
        line.spans.iter().map(|span| span.content.as_ref()).collect()
    }

    #[test]
    fn parses_basic_colour_sequence() {
        let line = ansi_line("\u{1b}[31merror\u{1b}[0m ok", Style::default());
        assert_eq!(line.spans.len(), 2);
        assert_eq!(line.spans[0].content.as_ref(), "error");
        assert_eq!(line.spans[0].style.fg, Some(Color::Red));
        assert_eq!(line.spans[1].content.as_ref(), " ok");
        assert_eq!(line.spans[1].style, Style::default());
    }

    #[test]
    fn understands_theme_backgrounds_and_strikethrough() {
        let line = ansi_line("\u{1b}[40m\u{1b}[37m web \u{1b}[0m", Style::default());
        assert_eq!(line.spans[0].style.bg, Some(Color::Black));
        assert_eq!(line.spans[0].style.fg, Some(Color::Gray));

        let line = ansi_line("\u{1b}[9mqueue\u{1b}[29m!", Style::default());
        assert!(line.spans[0].style.add_modifier.contains(Modifier::CROSSED_OUT));
        assert!(!line.spans[1].style.add_modifier.contains(Modifier::CROSSED_OUT));
    }

    #[test]
    fn reads_indexed_and_rgb_colours() {
        let line = ansi_line("\u{1b}[38;5;208mo\u{1b}[48;2;1;2;3mx", Style::default());
        assert_eq!(line.spans[0].style.fg, Some(Color::Indexed(208)));
        assert_eq!(line.spans[1].style.bg, Some(Color::Rgb(1, 2, 3)));
    }

    #[test]
    fn skips_non_sgr_sequences() {
        let line = ansi_line("\u{1b}[2K\u{1b}[1Ahello \u{1b}[31mred\u{1b}[0m", Style::default());
        assert_eq!(text(&line), "hello red");
    }
}
