use std::io::stdout;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent,
    MouseEventKind,
};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use ratatui_image::{picker::Picker, protocol::StatefulProtocol};
use tracing::{debug, info};
use tui_input::backend::crossterm::EventHandler;
use tui_input::Input;
use tui_widgets::popup::PopupState;

use crate::breed::BreedRecord;
use crate::config::{Config, UiColors};
use crate::state::SearchState;

use super::draw;
use super::photo::{self, PhotoData, PhotoResult};
use super::pointer::{HitRegions, MouseCapture, PointerTarget};

const DEFAULT_FONT_SIZE: (u16, u16) = (8, 16);

pub fn create_image_picker() -> Picker {
    let mut picker = base_picker();
    picker.guess_protocol();
    picker
}

#[cfg(unix)]
fn base_picker() -> Picker {
    Picker::from_termios().unwrap_or_else(|_| Picker::new(DEFAULT_FONT_SIZE))
}

#[cfg(not(unix))]
fn base_picker() -> Picker {
    Picker::new(DEFAULT_FONT_SIZE)
}

/// A section in the help popup
pub struct HelpSection {
    pub title: &'static str,
    pub entries: Vec<HelpEntry>,
}

/// A single help entry (action name + key bindings)
pub struct HelpEntry {
    pub action: &'static str,
    pub keys: String,
}

pub struct App<'a> {
    config: &'a Config,
    pub state: SearchState,
    pub search_input: Input,
    // Regions from the last draw, for mouse hit testing
    pub regions: HitRegions,
    pub show_help: bool,
    pub modal_popup: PopupState,
    breeds_rx: Option<Receiver<Vec<BreedRecord>>>,
    image_picker: Picker,
    image_state: Option<Box<dyn StatefulProtocol>>,
    pub photo_data: Option<PhotoData>,
    pub photo_error: Option<String>,
    // Image URL of the displayed card, once a fetch has been started for it
    photo_url: Option<String>,
    photo_rx: Option<Receiver<PhotoResult>>,
}

impl<'a> App<'a> {
    pub fn new(
        config: &'a Config,
        breeds_rx: Receiver<Vec<BreedRecord>>,
        image_picker: Picker,
    ) -> Self {
        Self {
            config,
            state: SearchState::new(),
            search_input: Input::default(),
            regions: HitRegions::default(),
            show_help: false,
            modal_popup: PopupState::default(),
            breeds_rx: Some(breeds_rx),
            image_picker,
            image_state: None,
            photo_data: None,
            photo_error: None,
            photo_url: None,
            photo_rx: None,
        }
    }

    pub fn run(&mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = stdout();
        stdout.execute(EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let result = match MouseCapture::subscribe() {
            Ok(capture) => {
                let result = self.event_loop(&mut terminal);
                drop(capture);
                result
            }
            Err(err) => Err(err),
        };

        disable_raw_mode()?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop<B>(&mut self, terminal: &mut Terminal<B>) -> Result<()>
    where
        B: ratatui::backend::Backend,
    {
        loop {
            self.poll_background();
            self.sync_photo();
            draw::render(terminal, self)?;

            if event::poll(Duration::from_millis(250))? {
                match event::read()? {
                    Event::Key(key) if key.kind != KeyEventKind::Release => {
                        if self.handle_key(key)? {
                            break;
                        }
                    }
                    Event::Mouse(mouse) => self.handle_mouse(mouse),
                    _ => {}
                }
            }
        }
        Ok(())
    }

    /// Drain finished background work without blocking.
    pub fn poll_background(&mut self) {
        if let Some(rx) = &self.breeds_rx {
            match rx.try_recv() {
                Ok(breeds) => {
                    info!(count = breeds.len(), "breed list ready");
                    self.state.finish_load(breeds);
                    self.breeds_rx = None;
                }
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => {
                    self.state.finish_load(Vec::new());
                    self.breeds_rx = None;
                }
            }
        }

        if let Some(rx) = &self.photo_rx {
            match rx.try_recv() {
                Ok(result) => {
                    self.photo_rx = None;
                    self.apply_photo(result);
                }
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => self.photo_rx = None,
            }
        }
    }

    /// Start fetching the image of the displayed card when it changed.
    fn sync_photo(&mut self) {
        let wanted = self
            .state
            .displayed()
            .record()
            .map(|record| record.image.trim().to_string())
            .filter(|url| !url.is_empty());

        if wanted == self.photo_url {
            return;
        }

        self.set_photo(None);
        self.photo_error = None;
        self.photo_url = wanted.clone();
        self.photo_rx = wanted.map(photo::spawn_fetch);
    }

    fn apply_photo(&mut self, result: PhotoResult) {
        if self.photo_url.as_deref() != Some(result.url.as_str()) {
            debug!(url = %result.url, "dropping stale card image");
            return;
        }
        match result.photo {
            Ok(photo) => {
                self.photo_error = None;
                self.set_photo(Some(photo));
            }
            Err(_) => {
                self.photo_error = Some("NO IMAGE AVAILABLE".to_string());
                self.set_photo(None);
            }
        }
    }

    fn set_photo(&mut self, photo: Option<PhotoData>) {
        match photo {
            Some(photo) => {
                let protocol = self.image_picker.new_resize_protocol(photo.image().clone());
                self.image_state = Some(protocol);
                self.photo_data = Some(photo);
            }
            None => {
                self.image_state = None;
                self.photo_data = None;
            }
        }
    }

    pub fn photo_pending(&self) -> bool {
        self.photo_rx.is_some()
    }

    /// Returns `true` when the app should quit.
    pub fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        // Ctrl+C always quits (hardcoded for safety)
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('C'))
        {
            return Ok(true);
        }

        if self.show_help {
            self.show_help = false;
            return Ok(false);
        }

        let global = &self.config.keys.global;
        let search = &self.config.keys.search;

        if key_matches_any(&key, &global.help) {
            self.modal_popup = PopupState::default();
            self.show_help = true;
            return Ok(false);
        }

        if !self.state.suggestions().is_empty() {
            if key_matches_any(&key, &search.next) {
                self.state.highlight_next();
                return Ok(false);
            }
            if key_matches_any(&key, &search.prev) {
                self.state.highlight_prev();
                return Ok(false);
            }
            if key_matches_any(&key, &search.dismiss) {
                self.state.dismiss_suggestions();
                return Ok(false);
            }
        }

        if key_matches_any(&key, &search.confirm) {
            self.state.confirm();
            self.sync_input_from_state();
            return Ok(false);
        }

        if key_matches_any(&key, &global.quit) {
            return Ok(true);
        }

        if let Some(change) = self.search_input.handle_event(&Event::Key(key)) {
            if change.value {
                self.state.set_query(self.search_input.value());
            }
        }
        Ok(false)
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent) {
        let MouseEventKind::Down(MouseButton::Left) = mouse.kind else {
            return;
        };
        if self.show_help {
            self.show_help = false;
            return;
        }
        let target = self.regions.target(mouse.column, mouse.row);

        if !self.state.suggestions().is_empty() {
            match target {
                PointerTarget::Suggestion(index) => {
                    if let Some(name) = self.state.suggestions().get(index).cloned() {
                        self.state.select_suggestion(&name);
                        self.sync_input_from_state();
                    }
                    return;
                }
                PointerTarget::SuggestionList => return,
                PointerTarget::SearchButton | PointerTarget::Elsewhere => {
                    self.state.dismiss_suggestions();
                }
            }
        }

        if target == PointerTarget::SearchButton {
            self.state.execute_search();
        }
    }

    fn sync_input_from_state(&mut self) {
        if self.search_input.value() != self.state.query() {
            self.search_input = Input::new(self.state.query().to_string());
        }
    }

    pub fn ui_colors(&self) -> &UiColors {
        &self.config.ui.colors
    }

    pub fn image_pane_width(&self) -> u16 {
        self.config.ui.pane.image.width
    }

    pub fn image_pane_height(&self) -> u16 {
        self.config.ui.pane.image.height
    }

    pub fn profile_image_state(&mut self) -> Option<&mut Box<dyn StatefulProtocol>> {
        self.image_state.as_mut()
    }

    pub fn image_font_size(&self) -> (u16, u16) {
        self.image_picker.font_size
    }

    pub fn photo_error(&self) -> Option<&str> {
        self.photo_error.as_deref()
    }

    pub fn help_entries(&self) -> Vec<HelpSection> {
        let keys = &self.config.keys;
        vec![
            HelpSection {
                title: "GLOBAL",
                entries: vec![
                    HelpEntry {
                        action: "Quit",
                        keys: format!("{}, Ctrl+C", keys.global.quit.join(", ")),
                    },
                    HelpEntry {
                        action: "Help",
                        keys: keys.global.help.join(", "),
                    },
                ],
            },
            HelpSection {
                title: "SEARCH",
                entries: vec![
                    HelpEntry {
                        action: "Search / pick",
                        keys: keys.search.confirm.join(", "),
                    },
                    HelpEntry {
                        action: "Next suggestion",
                        keys: keys.search.next.join(", "),
                    },
                    HelpEntry {
                        action: "Prev suggestion",
                        keys: keys.search.prev.join(", "),
                    },
                    HelpEntry {
                        action: "Close suggestions",
                        keys: keys.search.dismiss.join(", "),
                    },
                ],
            },
        ]
    }
}

/// Check if the key event matches any of the bindings in the list
pub fn key_matches_any(event: &KeyEvent, bindings: &[String]) -> bool {
    bindings.iter().any(|b| key_matches_single(event, b))
}

/// Check if the key event matches a single binding string
pub fn key_matches_single(event: &KeyEvent, binding: &str) -> bool {
    let trimmed = binding.trim();
    if trimmed.is_empty() {
        return false;
    }

    // Ctrl/Alt/Super chords are not bindable
    let disallowed = KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER;
    if event.modifiers.intersects(disallowed) {
        return false;
    }

    match trimmed.to_ascii_lowercase().as_str() {
        "enter" => matches!(event.code, KeyCode::Enter),
        "tab" => matches!(event.code, KeyCode::Tab),
        "backtab" | "shift+tab" => matches!(event.code, KeyCode::BackTab),
        "backspace" => matches!(event.code, KeyCode::Backspace),
        "esc" | "escape" => matches!(event.code, KeyCode::Esc),
        "up" => matches!(event.code, KeyCode::Up),
        "down" => matches!(event.code, KeyCode::Down),
        "left" => matches!(event.code, KeyCode::Left),
        "right" => matches!(event.code, KeyCode::Right),
        "pageup" | "page_up" => matches!(event.code, KeyCode::PageUp),
        "pagedown" | "page_down" => matches!(event.code, KeyCode::PageDown),
        "home" => matches!(event.code, KeyCode::Home),
        "end" => matches!(event.code, KeyCode::End),
        name => match name.strip_prefix('f').and_then(|n| n.parse::<u8>().ok()) {
            Some(number) => (1..=12).contains(&number) && event.code == KeyCode::F(number),
            // Typeable characters belong to the search input
            None => false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breed::breed;
    use crate::state::Displayed;
    use ratatui::layout::Rect;
    use std::sync::mpsc;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn click(column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    fn app_with(config: &Config, names: &[&str]) -> App<'static> {
        // Leak the config so the app can outlive this helper in tests.
        let config: &'static Config = Box::leak(Box::new(config.clone()));
        let (tx, rx) = mpsc::channel();
        let breeds = names
            .iter()
            .enumerate()
            .map(|(index, name)| breed(index as u64 + 1, name))
            .collect();
        tx.send(breeds).unwrap();
        let mut app = App::new(config, rx, Picker::new(DEFAULT_FONT_SIZE));
        app.poll_background();
        app
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.handle_key(key(KeyCode::Char(c))).unwrap();
        }
    }

    fn shown_name(app: &App) -> Option<String> {
        app.state.displayed().record().map(|r| r.name.clone())
    }

    #[test]
    fn typing_updates_suggestions() {
        let mut app = app_with(&Config::default(), &["Pug", "Poodle"]);
        type_text(&mut app, "oo");

        assert_eq!(app.search_input.value(), "oo");
        assert_eq!(app.state.suggestions(), ["Poodle"]);
        assert_eq!(shown_name(&app).as_deref(), Some("Labrador Retriever"));
    }

    #[test]
    fn enter_searches_typed_query() {
        let mut app = app_with(&Config::default(), &["Pug", "Poodle"]);
        type_text(&mut app, "oo");
        app.handle_key(key(KeyCode::Enter)).unwrap();

        assert_eq!(shown_name(&app).as_deref(), Some("Poodle"));
        assert_eq!(app.search_input.value(), "oo");
    }

    #[test]
    fn arrow_and_enter_pick_suggestion() {
        let mut app = app_with(&Config::default(), &["Pug", "Poodle"]);
        type_text(&mut app, "p");
        app.handle_key(key(KeyCode::Down)).unwrap();
        app.handle_key(key(KeyCode::Down)).unwrap();
        app.handle_key(key(KeyCode::Enter)).unwrap();

        assert_eq!(app.search_input.value(), "Poodle");
        assert_eq!(app.state.query(), "Poodle");
        assert_eq!(shown_name(&app).as_deref(), Some("Poodle"));
    }

    #[test]
    fn escape_dismisses_then_quits() {
        let mut app = app_with(&Config::default(), &["Pug"]);
        type_text(&mut app, "pu");

        assert!(!app.handle_key(key(KeyCode::Esc)).unwrap());
        assert!(app.state.suggestions().is_empty());
        assert!(app.handle_key(key(KeyCode::Esc)).unwrap());
    }

    #[test]
    fn ctrl_c_always_quits() {
        let mut app = app_with(&Config::default(), &[]);
        app.show_help = true;
        let quit = app
            .handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL))
            .unwrap();
        assert!(quit);
    }

    #[test]
    fn help_opens_and_any_key_closes() {
        let mut app = app_with(&Config::default(), &[]);
        app.handle_key(key(KeyCode::F(1))).unwrap();
        assert!(app.show_help);

        assert!(!app.handle_key(key(KeyCode::Esc)).unwrap());
        assert!(!app.show_help);
        assert_eq!(app.search_input.value(), "");
    }

    #[test]
    fn click_outside_dismisses_suggestions() {
        let mut app = app_with(&Config::default(), &["Pug", "Poodle"]);
        type_text(&mut app, "p");
        app.regions.suggestions = Some(Rect::new(0, 4, 20, 4));
        app.regions.suggestion_rows = Some(Rect::new(1, 5, 18, 2));
        app.regions.suggestion_count = 2;

        app.handle_mouse(click(40, 20));

        assert!(app.state.suggestions().is_empty());
        assert!(!app.state.search_performed());
    }

    #[test]
    fn click_inside_selects_suggestion() {
        let mut app = app_with(&Config::default(), &["Pug", "Poodle"]);
        type_text(&mut app, "p");
        app.regions.suggestions = Some(Rect::new(0, 4, 20, 4));
        app.regions.suggestion_rows = Some(Rect::new(1, 5, 18, 2));
        app.regions.suggestion_count = 2;

        app.handle_mouse(click(3, 6));

        assert_eq!(app.search_input.value(), "Poodle");
        assert_eq!(shown_name(&app).as_deref(), Some("Poodle"));
    }

    #[test]
    fn click_on_dropdown_border_keeps_it_open() {
        let mut app = app_with(&Config::default(), &["Pug", "Poodle"]);
        type_text(&mut app, "p");
        app.regions.suggestions = Some(Rect::new(0, 4, 20, 4));
        app.regions.suggestion_rows = Some(Rect::new(1, 5, 18, 2));
        app.regions.suggestion_count = 2;

        app.handle_mouse(click(0, 4));

        assert_eq!(app.state.suggestions(), ["Pug", "Poodle"]);
    }

    #[test]
    fn search_button_click_searches() {
        let mut app = app_with(&Config::default(), &["Pug", "Poodle"]);
        type_text(&mut app, "zz");
        app.regions.search_button = Some(Rect::new(50, 1, 10, 3));

        app.handle_mouse(click(52, 2));

        assert!(app.state.search_performed());
        assert_eq!(app.state.displayed(), Displayed::Empty);
    }

    #[test]
    fn click_closes_help_without_acting() {
        let mut app = app_with(&Config::default(), &["Pug", "Poodle"]);
        type_text(&mut app, "p");
        app.regions.suggestions = Some(Rect::new(0, 4, 20, 4));
        app.regions.suggestion_rows = Some(Rect::new(1, 5, 18, 2));
        app.regions.suggestion_count = 2;
        app.regions.search_button = Some(Rect::new(50, 1, 10, 3));
        app.handle_key(key(KeyCode::F(1))).unwrap();

        app.handle_mouse(click(3, 6));
        assert!(!app.show_help);
        assert_eq!(app.search_input.value(), "p");
        assert!(!app.state.search_performed());

        app.handle_key(key(KeyCode::F(1))).unwrap();
        app.handle_mouse(click(52, 2));
        assert!(!app.show_help);
        assert!(!app.state.search_performed());
        assert_eq!(app.state.suggestions(), ["Pug", "Poodle"]);
    }

    #[test]
    fn right_click_is_ignored() {
        let mut app = app_with(&Config::default(), &["Pug"]);
        type_text(&mut app, "p");
        let mut event = click(40, 20);
        event.kind = MouseEventKind::Down(MouseButton::Right);

        app.handle_mouse(event);

        assert_eq!(app.state.suggestions(), ["Pug"]);
    }

    #[test]
    fn dropped_loader_counts_as_empty_load() {
        let (tx, rx) = mpsc::channel::<Vec<BreedRecord>>();
        drop(tx);
        let config = Config::default();
        let mut app = App::new(&config, rx, Picker::new(DEFAULT_FONT_SIZE));
        app.poll_background();

        assert_eq!(
            app.state.load_state(),
            crate::state::LoadState::Loaded(0)
        );
    }

    #[test]
    fn key_binding_names() {
        assert!(key_matches_single(&key(KeyCode::Enter), "Enter"));
        assert!(key_matches_single(&key(KeyCode::Esc), "esc"));
        assert!(key_matches_single(&key(KeyCode::BackTab), "Shift+Tab"));
        assert!(key_matches_single(&key(KeyCode::F(10)), "F10"));
        assert!(!key_matches_single(&key(KeyCode::F(13)), "F13"));
        assert!(!key_matches_single(&key(KeyCode::Char('q')), "q"));
        assert!(!key_matches_single(&key(KeyCode::Char(' ')), "space"));
        assert!(!key_matches_single(&key(KeyCode::Enter), ""));
    }

    #[test]
    fn modified_keys_never_match() {
        let alt_enter = KeyEvent::new(KeyCode::Enter, KeyModifiers::ALT);
        assert!(!key_matches_single(&alt_enter, "Enter"));
        let shift_tab = KeyEvent::new(KeyCode::BackTab, KeyModifiers::SHIFT);
        assert!(key_matches_single(&shift_tab, "Backtab"));
    }

    #[test]
    fn every_letter_reaches_the_input() {
        let mut app = app_with(&Config::default(), &["Basque Shepherd"]);
        type_text(&mut app, "basque shepherd jkq");

        assert_eq!(app.search_input.value(), "basque shepherd jkq");
        assert_eq!(app.state.query(), "basque shepherd jkq");
    }
}
