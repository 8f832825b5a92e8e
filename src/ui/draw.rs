use anyhow::Result;
use ratatui::backend::Backend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols::line::NORMAL as LINE;
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use ratatui_image::{Resize, StatefulImage};
use tui_widgets::popup::Popup;

use crate::breed::BreedRecord;
use crate::config::RgbColor;
use crate::state::{Displayed, LoadState};

use super::app::App;

const SEARCH_LABEL: &str = "SEARCH: ";
const SEARCH_BUTTON: &str = "SEARCH";
const SEARCH_BUTTON_WIDTH: u16 = 10;
const MAX_SUGGESTION_ROWS: u16 = 8;
const HELP_FOOTER: &str = "Any key: close";
const INPUT_HELP: &str = "Type a breed name  Enter: search  F1: help  Esc: quit";
const SUGGESTION_HELP: &str = "Up/Down: choose  Enter: search/pick  Esc: close list  Click: pick";

pub fn render<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    terminal.draw(|frame| draw_frame(frame, app))?;
    Ok(())
}

fn draw_frame(frame: &mut Frame<'_>, app: &mut App) {
    app.regions.clear();

    let size = frame.area();
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(size);

    draw_header(frame, layout[0], app);
    let input_area = draw_search_bar(frame, layout[1], app);
    draw_content(frame, layout[2], app);
    draw_footer(frame, layout[3], app);
    // Overlays last so they sit on top of the card.
    draw_suggestions(frame, input_area, layout[2], app);
    draw_help_modal(frame, size, app);
}

fn draw_header(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let style = header_text_style(app);
    let status = match app.state.load_state() {
        LoadState::Pending => "LOADING BREEDS".to_string(),
        LoadState::Loaded(count) => format!("{count} BREEDS"),
    };
    let line = Line::from(vec![
        Span::styled("BREEDSEARCH", style.add_modifier(Modifier::BOLD)),
        Span::raw("   "),
        Span::styled(status, style),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

/// Draws the input and button; returns the input box area.
fn draw_search_bar(frame: &mut Frame<'_>, area: Rect, app: &mut App) -> Rect {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Length(SEARCH_BUTTON_WIDTH)])
        .split(area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(app));
    let inner = block.inner(chunks[0]);
    frame.render_widget(block, chunks[0]);

    if inner.width > 0 && inner.height > 0 {
        let label_width = SEARCH_LABEL.len();
        let available = (inner.width as usize).saturating_sub(label_width + 1);
        let scroll = app.search_input.visual_scroll(available);
        let value: String = app.search_input.value().chars().skip(scroll).collect();
        let line = Line::from(vec![
            Span::styled(SEARCH_LABEL, header_text_style(app)),
            Span::raw(value),
        ]);
        frame.render_widget(Paragraph::new(line), inner);

        let column = label_width + app.search_input.visual_cursor().saturating_sub(scroll);
        let x = inner
            .x
            .saturating_add(column as u16)
            .min(inner.x + inner.width.saturating_sub(1));
        frame.set_cursor_position((x, inner.y));
    }

    let button = Paragraph::new(SEARCH_BUTTON)
        .alignment(Alignment::Center)
        .style(selection_style(app).add_modifier(Modifier::BOLD))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style(app)),
        );
    frame.render_widget(button, chunks[1]);
    app.regions.search_button = Some(chunks[1]);

    chunks[0]
}

fn draw_suggestions(frame: &mut Frame<'_>, input_area: Rect, body: Rect, app: &mut App) {
    let count = app.state.suggestions().len();
    if count == 0 || body.height < 3 {
        return;
    }

    let rows = (count as u16).min(MAX_SUGGESTION_ROWS).min(body.height - 2);
    let area = Rect {
        x: input_area.x,
        y: body.y,
        width: input_area.width,
        height: rows + 2,
    };

    frame.render_widget(Clear, area);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(app));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let items: Vec<ListItem> = app
        .state
        .suggestions()
        .iter()
        .map(|name| ListItem::new(Line::from(name.clone())))
        .collect();
    let list = List::new(items)
        .highlight_style(selection_style(app))
        .highlight_symbol(" ")
        .repeat_highlight_symbol(false);

    let mut state = ListState::default();
    state.select(app.state.highlighted());
    frame.render_stateful_widget(list, inner, &mut state);

    app.regions.suggestions = Some(area);
    app.regions.suggestion_rows = Some(inner);
    app.regions.suggestion_offset = state.offset();
    app.regions.suggestion_count = count;
}

fn draw_content(frame: &mut Frame<'_>, area: Rect, app: &mut App) {
    let image_width = app.image_pane_width().min(area.width / 2);
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Length(image_width)])
        .split(area);

    let image_height = app.image_pane_height().min(chunks[1].height);
    let image_area = Rect {
        height: image_height,
        ..chunks[1]
    };

    let (title, record) = match app.state.displayed() {
        Displayed::Popular(record) => ("POPULAR BREED", record.clone()),
        Displayed::Match(record) => ("RESULT", record.clone()),
        // Zero matches: nothing is drawn.
        Displayed::Empty => return,
    };

    draw_card(frame, chunks[0], app, title, &record);
    draw_image(frame, image_area, app);
}

fn draw_card(frame: &mut Frame<'_>, area: Rect, app: &App, title: &str, record: &BreedRecord) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(app))
        .title(Span::styled(title.to_string(), header_text_style(app)));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.width == 0 || inner.height == 0 {
        return;
    }

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(0)])
        .split(inner);

    let name = Line::from(Span::styled(
        record.name.to_uppercase(),
        header_text_style(app).add_modifier(Modifier::BOLD),
    ));
    draw_name_rule(frame, app, area, inner, name);

    let fields = record.card_fields();
    let label_width = fields
        .iter()
        .map(|(label, _)| label.len() + 1)
        .max()
        .unwrap_or(0);

    let mut lines: Vec<Line> = vec![
        Line::from(Span::styled(
            record.temperament.clone(),
            Style::default().add_modifier(Modifier::ITALIC),
        )),
        Line::from(""),
    ];
    for (label, value) in fields {
        lines.push(Line::from(vec![
            Span::styled(
                format!("{:<width$} ", format!("{label}:"), width = label_width),
                header_text_style(app),
            ),
            Span::raw(value),
        ]));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(record.description.clone()));

    frame.render_widget(
        Paragraph::new(lines).wrap(Wrap { trim: true }),
        layout[1],
    );
}

fn draw_image(frame: &mut Frame<'_>, area: Rect, app: &mut App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(app))
        .title("Image");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.width == 0 || inner.height == 0 {
        return;
    }

    frame.render_widget(Clear, inner);

    let render_area = photo_area(app, inner);

    if let Some(state) = app.profile_image_state() {
        let widget = StatefulImage::new(None).resize(Resize::Fit);
        frame.render_stateful_widget(widget, render_area, state);
        return;
    }

    if let Some(error) = app.photo_error() {
        draw_notice(frame, inner, error);
        return;
    }

    if app.photo_pending() {
        draw_notice(frame, inner, "LOADING IMAGE");
    } else {
        draw_notice(frame, inner, "NO IMAGE AVAILABLE");
    }
}

/// Photo size in cells, shrunk to fit `area` and centered in it.
fn photo_area(app: &App, area: Rect) -> Rect {
    let (font_w, font_h) = app.image_font_size();
    let Some(photo) = app.photo_data.as_ref() else {
        return area;
    };
    if area.is_empty() || font_w == 0 || font_h == 0 {
        return area;
    }

    let cols = photo.image().width().div_ceil(u32::from(font_w)).max(1) as f64;
    let rows = photo.image().height().div_ceil(u32::from(font_h)).max(1) as f64;
    let scale = (f64::from(area.width) / cols)
        .min(f64::from(area.height) / rows)
        .min(1.0);

    let width = ((cols * scale).round() as u16).clamp(1, area.width);
    let height = ((rows * scale).round() as u16).clamp(1, area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn draw_footer(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let message = if app.show_help {
        HELP_FOOTER
    } else if app.state.suggestions().is_empty() {
        INPUT_HELP
    } else {
        SUGGESTION_HELP
    };
    let colors = app.ui_colors();
    let style = Style::default()
        .fg(color(colors.status_fg))
        .bg(color(colors.status_bg));

    let background = Block::default().style(Style::default().bg(color(colors.status_bg)));
    frame.render_widget(background, area);

    frame.render_widget(Paragraph::new(message).style(style), area);
}

fn draw_help_modal(frame: &mut Frame<'_>, area: Rect, app: &mut App) {
    if !app.show_help {
        return;
    }

    let header_style = header_text_style(app);
    let action_width = 20usize;
    let mut lines: Vec<Line> = Vec::new();

    let sections = app.help_entries();
    for (section_idx, section) in sections.iter().enumerate() {
        lines.push(Line::from(Span::styled(
            format!("{} {}", LINE.horizontal.repeat(2), section.title),
            header_style,
        )));
        for entry in &section.entries {
            lines.push(Line::from(vec![
                Span::raw(format!("{:<width$}", entry.action, width = action_width)),
                Span::styled(entry.keys.clone(), header_style),
            ]));
        }
        if section_idx < sections.len() - 1 {
            lines.push(Line::from(""));
        }
    }

    let title_line = Line::from(Span::styled("HELP", header_style));
    let popup = Popup::new(Text::from(lines))
        .title(title_line)
        .border_style(border_style(app));

    frame.render_stateful_widget_ref(popup, area, &mut app.modal_popup);
}

fn selection_style(app: &App) -> Style {
    let colors = app.ui_colors();
    Style::default()
        .fg(color(colors.selection_fg))
        .bg(color(colors.selection_bg))
}

fn border_style(app: &App) -> Style {
    let colors = app.ui_colors();
    Style::default().fg(color(colors.border))
}

fn header_text_style(app: &App) -> Style {
    let colors = app.ui_colors();
    Style::default().fg(color(colors.separator))
}

fn separator_style(app: &App) -> Style {
    let colors = app.ui_colors();
    Style::default().fg(color(colors.separator))
}

/// One word per line, centered in `area`.
fn draw_notice(frame: &mut Frame<'_>, area: Rect, text: &str) {
    let lines: Vec<Line> = text
        .split_whitespace()
        .take(usize::from(area.height))
        .map(Line::from)
        .collect();
    let height = lines.len() as u16;
    if height == 0 {
        return;
    }

    let target = Rect {
        y: area.y + (area.height - height) / 2,
        height,
        ..area
    };
    frame.render_widget(Paragraph::new(lines).alignment(Alignment::Center), target);
}

/// Breed name on the first inner row, then a rule joining the card's side borders.
fn draw_name_rule(frame: &mut Frame<'_>, app: &App, card: Rect, inner: Rect, name: Line<'static>) {
    frame.render_widget(Paragraph::new(name), Rect { height: 1, ..inner });
    if inner.height < 2 {
        return;
    }

    let rule = format!(
        "{}{}{}",
        LINE.vertical_right,
        LINE.horizontal.repeat(usize::from(card.width.saturating_sub(2))),
        LINE.vertical_left
    );
    let row = Rect {
        x: card.x,
        y: inner.y + 1,
        width: card.width,
        height: 1,
    };
    frame.render_widget(
        Paragraph::new(Span::styled(rule, separator_style(app))),
        row,
    );
}

fn color(rgb: RgbColor) -> Color {
    Color::Rgb(rgb.r, rgb.g, rgb.b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breed::breed;
    use crate::config::Config;
    use crate::ui::photo::PhotoData;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use ratatui::backend::TestBackend;
    use image::DynamicImage;
    use ratatui_image::picker::Picker;
    use std::sync::mpsc;

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let width = usize::from(buffer.area.width.max(1));
        let mut text = String::new();
        for row in buffer.content.chunks(width) {
            for cell in row {
                text.push_str(cell.symbol());
            }
            text.push('\n');
        }
        text
    }

    fn loaded_app(config: &Config) -> App<'_> {
        let (tx, rx) = mpsc::channel();
        tx.send(vec![breed(1, "Pug"), breed(2, "Poodle")]).unwrap();
        let mut app = App::new(config, rx, Picker::new((8, 16)));
        app.poll_background();
        app
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.handle_key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
                .unwrap();
        }
    }

    #[test]
    fn initial_screen_shows_popular_breed() {
        let config = Config::default();
        let mut app = loaded_app(&config);
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();

        render(&mut terminal, &mut app).unwrap();
        let text = screen_text(&terminal);

        assert!(text.contains("LABRADOR RETRIEVER"), "{text}");
        assert!(text.contains("2 BREEDS"), "{text}");
        assert!(text.contains("Sporting"), "{text}");
        assert!(app.regions.search_button.is_some());
        assert!(app.regions.suggestions.is_none());
    }

    #[test]
    fn suggestions_overlay_records_hit_regions() {
        let config = Config::default();
        let mut app = loaded_app(&config);
        type_text(&mut app, "p");
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();

        render(&mut terminal, &mut app).unwrap();
        let text = screen_text(&terminal);

        assert!(text.contains("Poodle"), "{text}");
        assert_eq!(app.regions.suggestion_count, 2);
        let rows = app.regions.suggestion_rows.unwrap();
        assert_eq!(rows.height, 2);
    }

    #[test]
    fn zero_match_search_leaves_card_empty() {
        let config = Config::default();
        let mut app = loaded_app(&config);
        type_text(&mut app, "zz");
        app.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE))
            .unwrap();
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();

        render(&mut terminal, &mut app).unwrap();
        let text = screen_text(&terminal);

        assert!(!text.contains("LABRADOR"), "{text}");
        assert!(!text.contains("RESULT"), "{text}");
        assert!(!text.contains("Breed Group"), "{text}");
        assert!(!text.contains("Image"), "{text}");
    }

    #[test]
    fn photo_area_keeps_cell_size_and_centers() {
        let config = Config::default();
        let mut app = loaded_app(&config);
        app.photo_data = Some(PhotoData::new(DynamicImage::new_rgb8(80, 160)));

        let roomy = photo_area(&app, Rect::new(5, 3, 30, 14));
        assert_eq!(roomy, Rect::new(15, 5, 10, 10));

        let cramped = photo_area(&app, Rect::new(0, 0, 6, 4));
        assert_eq!(cramped, Rect::new(1, 0, 4, 4));
    }

    #[test]
    fn tiny_terminal_does_not_panic() {
        let config = Config::default();
        let mut app = loaded_app(&config);
        type_text(&mut app, "p");
        let mut terminal = Terminal::new(TestBackend::new(12, 5)).unwrap();

        render(&mut terminal, &mut app).unwrap();
    }
}
