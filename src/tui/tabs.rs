//! Fitting the tab bar into the terminal width.

use crate::text::{pad, pad_left, truncate, visible_width};
use crate::theme::Theme;

/// Columns reserved for a `(← n)` or `(n →)` indicator.
pub const INDICATOR_WIDTH: usize = 6;
/// The right-hand peek at the next hidden tab needs more than this many
/// spare columns to be drawn.
const PEEK_MIN_COLUMNS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabDescriptor {
    pub label: String,
    pub focused: bool,
    pub stopped: bool,
}

impl TabDescriptor {
    pub fn new(name: &str, focused: bool, stopped: bool) -> Self {
        Self {
            label: format!(" {name} "),
            focused,
            stopped,
        }
    }

    pub fn width(&self) -> usize {
        visible_width(&self.label)
    }
}

/// Visible window `[start, end]` (inclusive) and the number of tabs hidden on
/// each side of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TabLayout {
    pub start: usize,
    pub end: usize,
    pub hidden_left: usize,
    pub hidden_right: usize,
}

impl TabLayout {
    fn new(start: usize, end: usize, total: usize) -> Self {
        Self {
            start,
            end,
            hidden_left: start,
            hidden_right: total.saturating_sub(end + 1),
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn contains(&self, index: usize) -> bool {
        (self.start..=self.end).contains(&index)
    }
}

fn span_width(widths: &[usize], start: usize, end: usize) -> usize {
    widths[start..=end].iter().sum::<usize>() + (end - start)
}

/// Grows a window around `focused` within `budget`, always taking the
/// nearest hidden neighbour first and favouring the left on ties.
fn grow(widths: &[usize], focused: usize, budget: usize) -> (usize, usize) {
    let (mut start, mut end) = (focused, focused);
    loop {
        let left = start.checked_sub(1);
        let right = (end + 1 < widths.len()).then_some(end + 1);
        let fits_left = left.filter(|idx| span_width(widths, *idx, end) <= budget);
        let fits_right = right.filter(|idx| span_width(widths, start, *idx) <= budget);

        match (fits_left, fits_right) {
            (None, None) => return (start, end),
            (Some(idx), None) => start = idx,
            (None, Some(idx)) => end = idx,
            (Some(l), Some(r)) => {
                if focused - l <= r - focused {
                    start = l;
                } else {
                    end = r;
                }
            }
        }
    }
}

/// Left-anchored window: from tab 0 rightwards, showing `focused`.
fn anchored_left(widths: &[usize], focused: usize, budget: usize) -> Option<(usize, usize)> {
    let mut end = None;
    for idx in 0..widths.len() {
        if span_width(widths, 0, idx) > budget {
            break;
        }
        end = Some(idx);
    }
    end.filter(|end| *end >= focused).map(|end| (0, end))
}

/// Right-anchored window: from the last tab leftwards, showing `focused`.
fn anchored_right(widths: &[usize], focused: usize, budget: usize) -> Option<(usize, usize)> {
    let last = widths.len() - 1;
    let mut start = None;
    for idx in (0..=last).rev() {
        if span_width(widths, idx, last) > budget {
            break;
        }
        start = Some(idx);
    }
    start.filter(|start| *start <= focused).map(|start| (start, last))
}

/// Picks which tabs fit in `max_width` columns. The focused tab is always
/// part of the window, even when it alone is wider than the terminal.
pub fn layout_tabs(widths: &[usize], focused: usize, max_width: usize) -> TabLayout {
    if widths.is_empty() {
        return TabLayout::default();
    }
    let total = widths.len();
    let focused = focused.min(total - 1);

    let (mut reserve_left, mut reserve_right) = (false, false);
    let (start, end) = loop {
        let budget = max_width
            .saturating_sub(if reserve_left { INDICATOR_WIDTH } else { 0 })
            .saturating_sub(if reserve_right { INDICATOR_WIDTH } else { 0 });
        let (start, end) = grow(widths, focused, budget);

        let overflow_left = start > 0 && !reserve_left;
        let overflow_right = end + 1 < total && !reserve_right;
        if !overflow_left && !overflow_right {
            break (start, end);
        }
        // Restart with room for the newly discovered indicators.
        reserve_left |= start > 0;
        reserve_right |= end + 1 < total;
    };

    let mut layout = TabLayout::new(start, end, total);
    if layout.hidden_left > 0 && layout.hidden_right > 0 {
        // Hugging one edge frees the columns of the other indicator.
        let budget = max_width.saturating_sub(INDICATOR_WIDTH);
        let snapped = [
            anchored_left(widths, focused, budget),
            anchored_right(widths, focused, budget),
        ]
        .into_iter()
        .flatten()
        .map(|(start, end)| TabLayout::new(start, end, total))
        .fold(None::<TabLayout>, |best, candidate| match best {
            Some(best) if best.len() >= candidate.len() => Some(best),
            _ => Some(candidate),
        });
        if let Some(snapped) = snapped.filter(|snapped| snapped.len() > layout.len()) {
            layout = snapped;
        }
    }
    layout
}

fn style_tab(theme: &dyn Theme, tab: &TabDescriptor, text: &str) -> String {
    let text = if tab.stopped {
        theme.tab_stopped(text)
    } else {
        text.to_owned()
    };
    if tab.focused {
        theme.tab_focused(&text)
    } else {
        theme.tab_blurred(&text)
    }
}

/// Renders the tab row, at most `width` columns wide.
pub fn render_tab_bar(theme: &dyn Theme, tabs: &[TabDescriptor], width: usize) -> String {
    if tabs.is_empty() {
        return String::new();
    }
    let focused = tabs.iter().position(|tab| tab.focused).unwrap_or(0);
    let widths = tabs.iter().map(TabDescriptor::width).collect::<Vec<usize>>();
    let layout = layout_tabs(&widths, focused, width);

    let mut bar = String::new();
    if layout.hidden_left > 0 {
        bar.push_str(&theme.tab_more(&pad(
            &format!("(← {})", layout.hidden_left),
            INDICATOR_WIDTH,
        )));
    }
    let shown = tabs[layout.start..=layout.end]
        .iter()
        .map(|tab| style_tab(theme, tab, &tab.label))
        .collect::<Vec<String>>()
        .join(" ");
    bar.push_str(&shown);

    if layout.hidden_right > 0 {
        let more = pad_left(&format!("({} →)", layout.hidden_right), INDICATOR_WIDTH);
        let remaining = width as isize - visible_width(&bar) as isize - visible_width(&more) as isize;
        if remaining > PEEK_MIN_COLUMNS as isize {
            let peek = &tabs[layout.end + 1];
            let truncated = format!("{} ", truncate(&peek.label, remaining as usize - 1));
            bar.push_str(&style_tab(theme, peek, &truncated));
        } else if remaining > 0 {
            bar.push_str(&" ".repeat(remaining as usize));
        }
        bar.push_str(&theme.tab_more(&more));
    }

    if visible_width(&bar) > width {
        return truncate(&bar, width);
    }
    bar
}
