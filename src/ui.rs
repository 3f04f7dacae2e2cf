use anyhow::{Result, anyhow};
use arboard::Clipboard;
use ratatui::{
    Frame,
    prelude::*,
    style::Style,
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Tabs, Wrap},
};

use crate::dashboard::{Card, Dashboard, Tab};
use crate::models::{BOOK_PALETTE_SIZE, LINK_PALETTE_SIZE, PASTEL_PALETTE_SIZE};

const COLOR_INK: Color = Color::Rgb(0xF0, 0xEC, 0xE3);
const COLOR_MUTED: Color = Color::Rgb(0x66, 0x66, 0x66);
const COLOR_PANEL: Color = Color::Rgb(0x14, 0x14, 0x14);
const COLOR_PAPER: Color = Color::Rgb(0x1A, 0x1A, 0x1A);

const LINK_COLORS: [Color; LINK_PALETTE_SIZE] = [
    Color::Rgb(0xC0, 0x84, 0xFC),
    Color::Rgb(0x67, 0xE8, 0xF9),
    Color::Rgb(0x86, 0xEF, 0xAC),
    Color::Rgb(0xFB, 0xBF, 0x24),
    Color::Rgb(0xF8, 0x71, 0x71),
    Color::Rgb(0xA7, 0x8B, 0xFA),
    Color::Rgb(0x34, 0xD3, 0x99),
    Color::Rgb(0xFB, 0x92, 0x3C),
    Color::Rgb(0xE8, 0x79, 0xF9),
    Color::Rgb(0x60, 0xA5, 0xFA),
];

/// Sticky-note paper and accent.
const PASTEL: [(Color, Color); PASTEL_PALETTE_SIZE] = [
    (Color::Rgb(0xFE, 0xF3, 0xC7), Color::Rgb(0xF5, 0x9E, 0x0B)),
    (Color::Rgb(0xFC, 0xE7, 0xF3), Color::Rgb(0xEC, 0x48, 0x99)),
    (Color::Rgb(0xE0, 0xF2, 0xFE), Color::Rgb(0x0E, 0xA5, 0xE9)),
    (Color::Rgb(0xDC, 0xFC, 0xE7), Color::Rgb(0x22, 0xC5, 0x5E)),
    (Color::Rgb(0xF3, 0xE8, 0xFF), Color::Rgb(0xA8, 0x55, 0xF7)),
    (Color::Rgb(0xFF, 0xF7, 0xED), Color::Rgb(0xF9, 0x73, 0x16)),
    (Color::Rgb(0xEC, 0xFE, 0xFF), Color::Rgb(0x06, 0xB6, 0xD4)),
];

/// Book spine and page fold.
const BOOK_COLORS: [(Color, Color); BOOK_PALETTE_SIZE] = [
    (Color::Rgb(0xC0, 0x84, 0xFC), Color::Rgb(0xE9, 0xD5, 0xFF)),
    (Color::Rgb(0x67, 0xE8, 0xF9), Color::Rgb(0xA5, 0xF3, 0xFC)),
    (Color::Rgb(0x86, 0xEF, 0xAC), Color::Rgb(0xBB, 0xF7, 0xD0)),
    (Color::Rgb(0xFB, 0xBF, 0x24), Color::Rgb(0xFD, 0xE6, 0x8A)),
    (Color::Rgb(0xF8, 0x71, 0x71), Color::Rgb(0xFC, 0xA5, 0xA5)),
];

#[derive(Clone, Copy)]
struct OverlayTheme {
    border: Color,
    title: Color,
    text: Color,
    bg: Color,
}

fn themed_overlay(title: &str) -> OverlayTheme {
    match title {
        "Confirm delete" => OverlayTheme {
            border: Color::Rgb(0xF8, 0x71, 0x71),
            title: Color::Rgb(0xFB, 0x92, 0x3C),
            text: COLOR_INK,
            bg: COLOR_PANEL,
        },
        "Confirm quit" => OverlayTheme {
            border: Color::Rgb(0xFB, 0xBF, 0x24),
            title: COLOR_INK,
            text: COLOR_INK,
            bg: COLOR_PANEL,
        },
        t if t.starts_with("Edit") => OverlayTheme {
            border: Color::Rgb(0x67, 0xE8, 0xF9),
            title: COLOR_INK,
            text: COLOR_INK,
            bg: COLOR_PANEL,
        },
        _ => OverlayTheme {
            border: Color::Rgb(0xC0, 0x84, 0xFC),
            title: COLOR_INK,
            text: COLOR_INK,
            bg: COLOR_PANEL,
        },
    }
}

fn centered_overlay_area(frame_size: Rect, lines: &[String]) -> Rect {
    let widest = lines.iter().map(|s| s.chars().count()).max().unwrap_or(0);
    let maxw = u16::try_from(widest).unwrap_or(u16::MAX).saturating_add(4);
    let maxh = u16::try_from(lines.len()).unwrap_or(u16::MAX).saturating_add(2);
    Rect::new(
        (frame_size.width.saturating_sub(maxw)) / 2,
        (frame_size.height.saturating_sub(maxh)) / 2,
        maxw.min(frame_size.width),
        maxh.min(frame_size.height),
    )
}

fn render_overlay(f: &mut Frame<'_>, lines: &[String], title: &str) {
    let area = centered_overlay_area(f.size(), lines);
    let theme = themed_overlay(title);
    let paragraph = Paragraph::new(
        lines
            .iter()
            .map(|l| Line::from(l.as_str()))
            .collect::<Vec<Line>>(),
    )
    .style(Style::default().fg(theme.text).bg(theme.bg))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(Span::styled(
                title,
                Style::default().fg(theme.title).add_modifier(Modifier::BOLD),
            ))
            .border_style(Style::default().fg(theme.border).add_modifier(Modifier::BOLD))
            .style(Style::default().bg(theme.bg)),
    );
    f.render_widget(Clear, area);
    f.render_widget(paragraph, area);
}

const ASCII_BANNER: [&str; 6] = [
    "███╗   ███╗██╗███╗   ██╗███████╗",
    "████╗ ████║██║████╗  ██║██╔════╝",
    "██╔████╔██║██║██╔██╗ ██║█████╗  ",
    "██║╚██╔╝██║██║██║╚██╗██║██╔══╝  ",
    "██║ ╚═╝ ██║██║██║ ╚████║███████╗",
    "╚═╝     ╚═╝╚═╝╚═╝  ╚═══╝╚══════╝",
];

/// Horizontal offsets of the rejected-passphrase shake, one per tick.
pub const SHAKE_OFFSETS: [i16; 6] = [-3, 3, -2, 2, -1, 1];

pub struct GateView<'a> {
    pub status: String,
    pub input_display: &'a str,
    pub input_visible: bool,
    pub shake_offset: i16,
    pub rejected: bool,
}

pub struct DashboardView<'a> {
    pub dashboard: &'a Dashboard,
    pub tab: Tab,
    pub selected: usize,
    pub persistent: bool,
    pub overlay: Option<Vec<String>>,
    pub overlay_title: Option<String>,
    pub delete_overlay: Option<String>,
    pub quit_overlay: Option<Vec<String>>,
    pub status: String,
}

/// Swatch colour of a card's stored variant.
pub fn variant_color(tab: Tab, variant: usize) -> Color {
    match tab {
        Tab::Links => LINK_COLORS[variant % LINK_COLORS.len()],
        Tab::Reminders => PASTEL[variant % PASTEL.len()].1,
        Tab::Roadmap => BOOK_COLORS[variant % BOOK_COLORS.len()].0,
    }
}

pub fn draw_gate(f: &mut Frame<'_>, state: &GateView) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6),
            Constraint::Length(8),
            Constraint::Length(6),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(f.size());

    let banner_lines: Vec<Line> = ASCII_BANNER
        .iter()
        .enumerate()
        .map(|(row, l)| {
            let color = LINK_COLORS[row % LINK_COLORS.len()];
            Line::from(Span::styled(
                *l,
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ))
        })
        .collect();
    let banner = Paragraph::new(banner_lines).alignment(Alignment::Center);
    f.render_widget(banner, layout[1]);

    let box_width: u16 = 40;
    let input_area = layout[2];
    let w = box_width.min(input_area.width);
    let centered_x = input_area.x + input_area.width.saturating_sub(w) / 2;
    let x = centered_x
        .saturating_add_signed(state.shake_offset)
        .min(input_area.x + input_area.width.saturating_sub(w));
    let label_area = Rect::new(centered_x, input_area.y, w, 1);
    let box_area = Rect::new(x, input_area.y + 1, w, 3);

    let label = Paragraph::new("Enter the passphrase")
        .alignment(Alignment::Center)
        .style(Style::default().fg(COLOR_INK).add_modifier(Modifier::BOLD));
    f.render_widget(label, label_area);

    let border = if state.rejected {
        Color::Rgb(0xF8, 0x71, 0x71)
    } else {
        COLOR_MUTED
    };
    let prompt = Paragraph::new(Span::styled(
        format!("> {}", state.input_display),
        Style::default().fg(COLOR_INK),
    ))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border))
            .title(if state.input_visible {
                "Passphrase (visible)"
            } else {
                "Passphrase (hidden)"
            }),
    );
    f.render_widget(prompt, box_area);

    let footer = Paragraph::new(state.status.clone()).block(Block::default().borders(Borders::ALL));
    f.render_widget(footer, layout[4]);
}

pub fn draw_dashboard(f: &mut Frame<'_>, state: &DashboardView) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .split(f.size());

    let titles: Vec<Line> = Tab::ALL
        .iter()
        .enumerate()
        .map(|(i, t)| Line::from(format!("{} {}", i + 1, t.title())))
        .collect();
    let mode = if state.persistent { "saved" } else { "memory only" };
    let tabs = Tabs::new(titles)
        .select(state.tab.index())
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Mine ({mode})")),
        )
        .style(Style::default().fg(COLOR_MUTED))
        .highlight_style(
            Style::default()
                .fg(COLOR_INK)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        );
    f.render_widget(tabs, layout[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(layout[1]);

    let cards = state.dashboard.cards(state.tab);
    draw_card_list(f, body[0], state.tab, &cards, state.selected);
    let selected = cards.get(state.selected.min(cards.len().saturating_sub(1)));
    draw_card_detail(f, body[1], state.tab, selected, state.selected);

    let footer = Paragraph::new(state.status.clone()).block(Block::default().borders(Borders::ALL));
    f.render_widget(footer, layout[2]);

    if let Some(lines) = &state.overlay {
        let title = state.overlay_title.as_deref().unwrap_or("Overlay");
        render_overlay(f, lines, title);
    }

    if let Some(lines) = &state.quit_overlay {
        render_overlay(f, lines, "Confirm quit");
    }

    if let Some(label) = &state.delete_overlay {
        let text = vec![
            "Delete this?".to_string(),
            format!("\"{label}\" will be gone forever"),
            "".to_string(),
            "[y] Yes, delete   [n] Cancel".to_string(),
        ];
        render_overlay(f, &text, "Confirm delete");
    }
}

fn draw_card_list(f: &mut Frame<'_>, area: Rect, tab: Tab, cards: &[Card], selected: usize) {
    let items: Vec<ListItem> = if cards.is_empty() {
        vec![ListItem::new(empty_hint(tab))]
    } else {
        cards
            .iter()
            .enumerate()
            .map(|(i, card)| {
                let swatch = Span::styled("■ ", Style::default().fg(variant_color(tab, card.variant)));
                let label = match tab {
                    Tab::Roadmap => format!("Chapter {}  {}", i + 1, card.label),
                    _ => card.label.clone(),
                };
                let mut spans = vec![swatch, Span::raw(label)];
                if tab == Tab::Links {
                    let host = card.host.as_deref().unwrap_or("-");
                    spans.push(Span::styled(
                        format!("  {host}"),
                        Style::default().fg(COLOR_MUTED),
                    ));
                }
                ListItem::new(Line::from(spans))
            })
            .collect()
    };

    let mut list_state = ListState::default();
    if !cards.is_empty() {
        list_state.select(Some(selected.min(cards.len() - 1)));
    }
    let list = List::new(items)
        .block(Block::default().title(tab.title()).borders(Borders::ALL))
        .highlight_symbol("▶ ")
        .highlight_style(
            Style::default()
                .bg(Color::Rgb(40, 40, 40))
                .add_modifier(Modifier::BOLD),
        );
    f.render_stateful_widget(list, area, &mut list_state);
}

fn draw_card_detail(f: &mut Frame<'_>, area: Rect, tab: Tab, card: Option<&Card>, idx: usize) {
    let Some(card) = card else {
        let empty = Paragraph::new("Nothing selected.")
            .block(Block::default().title("Card").borders(Borders::ALL));
        f.render_widget(empty, area);
        return;
    };

    let (paper, ink, accent, edge, title) = match tab {
        Tab::Links => {
            let color = variant_color(tab, card.variant);
            (COLOR_PAPER, COLOR_INK, color, color, "Link".to_string())
        }
        Tab::Reminders => {
            let (bg, accent) = PASTEL[card.variant % PASTEL.len()];
            (bg, Color::Rgb(0x1C, 0x19, 0x17), accent, accent, "Reminder".to_string())
        }
        Tab::Roadmap => {
            let (spine, fold) = BOOK_COLORS[card.variant % BOOK_COLORS.len()];
            (
                Color::Rgb(0xFA, 0xF8, 0xF4),
                Color::Rgb(0x29, 0x25, 0x24),
                spine,
                fold,
                format!("Chapter {}", idx + 1),
            )
        }
    };

    let mut lines = vec![
        Line::from(Span::styled(
            card.label.clone(),
            Style::default().fg(accent).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];
    match tab {
        Tab::Links => {
            lines.push(Line::from(card.detail.clone()));
            let host = card.host.as_deref().unwrap_or("(no icon: unrecognised address)");
            lines.push(Line::from(Span::styled(
                format!("Host: {host}"),
                Style::default().fg(COLOR_MUTED),
            )));
        }
        _ => lines.extend(card.detail.lines().map(|l| Line::from(l.to_string()))),
    }

    let detail = Paragraph::new(lines)
        .style(Style::default().fg(ink).bg(paper))
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(Style::default().fg(edge)),
        );
    f.render_widget(detail, area);
}

fn empty_hint(tab: Tab) -> &'static str {
    match tab {
        Tab::Links => "No links yet. Press n to add one.",
        Tab::Reminders => "No reminders. Press n to add one.",
        Tab::Roadmap => "The book is empty. Press n to write a chapter.",
    }
}

pub fn copy_url_to_clipboard(url: &str) -> Result<()> {
    let mut clipboard = Clipboard::new().map_err(|e| anyhow!("Clipboard unavailable: {e}"))?;
    clipboard
        .set_text(url.to_string())
        .map_err(|e| anyhow!("Failed to set clipboard: {e}"))
}

pub fn open_in_browser(url: &str) -> Result<()> {
    open::that(url).map_err(|e| anyhow!("Could not open {url}: {e}"))
}

#[cfg(test)]
mod tests {
    use ratatui::backend::TestBackend;

    use super::*;
    use crate::app::GATE_REJECTED;

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        buffer.content().iter().map(|cell| cell.symbol()).collect()
    }

    #[test]
    fn test_variant_color_wraps_out_of_range() {
        assert_eq!(variant_color(Tab::Links, 10), LINK_COLORS[0]);
        assert_eq!(variant_color(Tab::Reminders, 8), PASTEL[1].1);
        assert_eq!(variant_color(Tab::Roadmap, 4), BOOK_COLORS[4].0);
    }

    #[test]
    fn test_overlay_area_fits_frame() {
        let lines = vec!["x".repeat(200)];
        let area = centered_overlay_area(Rect::new(0, 0, 80, 24), &lines);
        assert!(area.width <= 80);
        assert_eq!(area.height, 3);
    }

    #[test]
    fn test_overlay_area_handles_huge_lines() {
        let lines = vec!["x".repeat(70_000); 3];
        let area = centered_overlay_area(Rect::new(0, 0, 80, 24), &lines);
        assert_eq!((area.x, area.width), (0, 80));
        assert_eq!(area.height, 5);
    }

    #[test]
    fn test_dashboard_renders_links_with_hosts() {
        let dashboard = Dashboard::in_memory();
        let mut terminal = Terminal::new(TestBackend::new(100, 24)).unwrap();
        terminal
            .draw(|f| {
                let view = DashboardView {
                    dashboard: &dashboard,
                    tab: Tab::Links,
                    selected: 0,
                    persistent: false,
                    overlay: None,
                    overlay_title: None,
                    delete_overlay: Some("GitHub".into()),
                    quit_overlay: None,
                    status: "ready".into(),
                };
                draw_dashboard(f, &view);
            })
            .unwrap();

        let text = screen_text(&terminal);
        assert!(text.contains("memory only"));
        assert!(text.contains("LinkedIn"));
        assert!(text.contains("github.com"));
        assert!(text.contains("will be gone forever"));
    }

    #[test]
    fn test_gate_masks_input() {
        let mut terminal = Terminal::new(TestBackend::new(80, 30)).unwrap();
        terminal
            .draw(|f| {
                let view = GateView {
                    status: GATE_REJECTED.into(),
                    input_display: "•••",
                    input_visible: false,
                    shake_offset: SHAKE_OFFSETS[0],
                    rejected: true,
                };
                draw_gate(f, &view);
            })
            .unwrap();

        let text = screen_text(&terminal);
        assert!(text.contains("Passphrase (hidden)"));
        assert!(text.contains("Wrong password"));
    }
}
