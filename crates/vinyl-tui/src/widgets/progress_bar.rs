//! Smooth Unicode progress bar widget.

use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use vinyl_proto::track::format_clock;

use crate::theme::{C_MUTED, C_PLAYING, C_SECONDARY};

const BLOCKS: [char; 9] = [' ', '▏', '▎', '▍', '▌', '▋', '▊', '▉', '█'];

/// Build a bar of exactly `width` cells filled to `percent` (0–100) with
/// eighth-block resolution.
pub fn bar(percent: f64, width: usize) -> String {
    let eighths = (percent.clamp(0.0, 100.0) / 100.0 * width as f64 * 8.0) as usize;
    let full = (eighths / 8).min(width);
    let partial = eighths % 8;

    let mut out = String::with_capacity(width * 3);
    out.extend(std::iter::repeat('█').take(full));
    if full < width {
        out.push(BLOCKS[partial]);
        out.extend(std::iter::repeat(' ').take(width - full - 1));
    }
    out
}

/// Render `elapsed ▕bar▏ total` in `area`.
pub fn draw_progress(frame: &mut Frame, area: Rect, percent: f64, elapsed: f64, duration: f64) {
    if area.width < 4 || area.height == 0 {
        return;
    }

    let left = format_clock(elapsed);
    let right = format_clock(duration);
    let label_w = left.len() + right.len() + 2;
    let bar_w = (area.width as usize).saturating_sub(label_w).max(4);

    let spans = vec![
        Span::styled(format!("{} ", left), Style::default().fg(C_SECONDARY)),
        Span::styled(bar(percent, bar_w), Style::default().fg(C_PLAYING)),
        Span::styled(format!(" {}", right), Style::default().fg(C_MUTED)),
    ];
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
