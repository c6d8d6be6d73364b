use std::{io, thread, time::Duration};

use anyhow::{Context, Result};
use bingo_core::{
    share, AppConfig, BingoCard, CardRecord, CellPosition, CardStore, ImportOutcome,
    COLUMN_LETTERS, FREE_LABEL, GRID_SIZE, MAX_SAVED_CARDS,
};
use chrono::{Local, Utc};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::block_font;

const TICK_RATE: Duration = Duration::from_millis(250);
const MAX_CELL_TEXT_LEN: usize = 60;
const MAX_LINK_LEN: usize = 4096;

#[derive(Debug, Clone)]
struct Theme {
    accent: Color,
    muted: Color,
    selection_bg: Color,
    selection_fg: Color,
    success: Color,
    warning: Color,
    danger: Color,
    free_bg: Color,
    letters: [Color; GRID_SIZE],
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            accent: Color::Cyan,
            muted: Color::DarkGray,
            selection_bg: Color::DarkGray,
            selection_fg: Color::White,
            success: Color::Green,
            warning: Color::Yellow,
            danger: Color::Red,
            free_bg: Color::Magenta,
            letters: [
                Color::Blue,
                Color::Red,
                Color::Yellow,
                Color::Green,
                Color::Magenta,
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    Create,
    Cards,
}

#[derive(Debug, Clone)]
enum PromptKind {
    EditCell(CellPosition),
    ImportLink,
}

/// Single-line text editor used by the cell-edit and import modals.
#[derive(Debug, Clone)]
struct TextPrompt {
    title: String,
    input: String,
    cursor: usize,
    max_len: usize,
    kind: PromptKind,
}

impl TextPrompt {
    fn edit_cell(pos: CellPosition, current: &str) -> Self {
        Self {
            title: format!(
                "Edit cell {}{}",
                COLUMN_LETTERS[pos.column],
                pos.row + 1
            ),
            input: current.to_string(),
            cursor: current.chars().count(),
            max_len: MAX_CELL_TEXT_LEN,
            kind: PromptKind::EditCell(pos),
        }
    }

    fn import_link() -> Self {
        Self {
            title: "Paste a share link".to_string(),
            input: String::new(),
            cursor: 0,
            max_len: MAX_LINK_LEN,
            kind: PromptKind::ImportLink,
        }
    }

    // The cursor counts characters, not bytes: imported cards may
    // carry non-ASCII cell text.
    fn char_count(&self) -> usize {
        self.input.chars().count()
    }

    fn byte_index(&self) -> usize {
        self.input
            .char_indices()
            .nth(self.cursor)
            .map(|(index, _)| index)
            .unwrap_or(self.input.len())
    }

    fn move_cursor(&mut self, delta: isize) {
        let len = self.char_count() as isize;
        self.cursor = (self.cursor as isize + delta).clamp(0, len) as usize;
    }

    fn move_home(&mut self) {
        self.cursor = 0;
    }

    fn move_end(&mut self) {
        self.cursor = self.char_count();
    }

    fn insert(&mut self, ch: char) {
        if self.char_count() >= self.max_len {
            return;
        }
        if !ch.is_control() {
            let index = self.byte_index();
            self.input.insert(index, ch);
            self.cursor += 1;
        }
    }

    fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let index = self.byte_index();
            self.input.remove(index);
        }
    }

    fn delete(&mut self) {
        if self.cursor < self.char_count() {
            let index = self.byte_index();
            self.input.remove(index);
        }
    }

    fn value(&self) -> String {
        self.input.trim().to_string()
    }
}

/// A saved card opened from the list, with enough context to write
/// edits back to its record on exit.
struct DetailView {
    record: CardRecord,
    card: BingoCard,
    original_grid: Vec<Vec<String>>,
    cursor: CellPosition,
    play_mode: bool,
}

impl DetailView {
    fn new(record: CardRecord) -> Self {
        let card = BingoCard::from_record(&record);
        let original_grid = card.grid().to_vec();
        Self {
            record,
            card,
            original_grid,
            cursor: CellPosition::new(0, 0),
            play_mode: false,
        }
    }

    fn has_changes(&self) -> bool {
        if self.card.grid() != &self.original_grid[..] {
            return true;
        }
        let saved = self.record.marked_cells.clone().unwrap_or_default();
        self.card.marked_positions() != saved
    }
}

enum AppEvent {
    Input(Event),
    Tick,
}

/// High-level application state for the terminal frontend.
pub struct BingoApp {
    config: AppConfig,
    store: CardStore,
    screen: Screen,
    card: BingoCard,
    cursor: CellPosition,
    play_mode: bool,
    cards_cursor: usize,
    detail: Option<DetailView>,
    prompt: Option<TextPrompt>,
    share_view: Option<String>,
    confirm_delete: Option<Uuid>,
    status: String,
    should_quit: bool,
    theme: Theme,
}

impl BingoApp {
    pub fn new(config: AppConfig, store: CardStore) -> Self {
        Self {
            config,
            store,
            screen: Screen::Create,
            card: BingoCard::new(),
            cursor: CellPosition::new(0, 0),
            play_mode: false,
            cards_cursor: 0,
            detail: None,
            prompt: None,
            share_view: None,
            confirm_delete: None,
            status: String::new(),
            should_quit: false,
            theme: Theme::default(),
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        self.status = format!(
            "Loaded {} saved card(s). Tap any box to add custom text.",
            self.store.cards().len()
        );

        let mut stdout = io::stdout();
        enable_raw_mode().context("failed to enter raw mode")?;
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to create terminal")?;
        terminal.hide_cursor()?;
        terminal.clear()?;

        let (event_tx, mut event_rx) = mpsc::channel::<AppEvent>(128);
        spawn_input_thread(event_tx);

        loop {
            terminal.draw(|frame| self.draw(frame))?;
            if self.should_quit {
                break;
            }

            let maybe_event = event_rx.recv().await;
            if !self.process_app_event(maybe_event) {
                break;
            }

            if self.should_quit {
                break;
            }
        }

        restore_terminal(&mut terminal)?;
        Ok(())
    }

    fn process_app_event(&mut self, maybe_event: Option<AppEvent>) -> bool {
        match maybe_event {
            Some(AppEvent::Input(event)) => {
                if let Event::Key(key) = event {
                    if let Err(err) = self.handle_key(key) {
                        warn!(?err, "Key handling failed");
                        self.status = format!("Error: {err}");
                    }
                }
                true
            }
            Some(AppEvent::Tick) => true,
            None => false,
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.close_detail();
            self.should_quit = true;
            return Ok(());
        }

        if self.share_view.is_some() {
            if matches!(key.code, KeyCode::Esc | KeyCode::Enter | KeyCode::Char(_)) {
                self.share_view = None;
            }
            return Ok(());
        }

        if self.confirm_delete.is_some() {
            return self.handle_confirm_key(key);
        }

        if self.prompt.is_some() {
            return self.handle_prompt_key(key);
        }

        // Global keys.
        match key.code {
            KeyCode::Char('q') => {
                // Flush any open detail view so pending edits reach
                // the store before the loop exits.
                self.close_detail();
                self.should_quit = true;
                return Ok(());
            }
            KeyCode::Tab => {
                self.switch_screen(match self.screen {
                    Screen::Create => Screen::Cards,
                    Screen::Cards => Screen::Create,
                });
                return Ok(());
            }
            KeyCode::Char('1') => {
                self.switch_screen(Screen::Create);
                return Ok(());
            }
            KeyCode::Char('2') => {
                self.switch_screen(Screen::Cards);
                return Ok(());
            }
            _ => {}
        }

        if self.detail.is_some() {
            return self.handle_detail_key(key);
        }
        match self.screen {
            Screen::Create => self.handle_create_key(key),
            Screen::Cards => self.handle_cards_key(key),
        }
    }

    fn switch_screen(&mut self, screen: Screen) {
        if self.screen == screen {
            return;
        }
        self.close_detail();
        self.screen = screen;
        self.status = match screen {
            Screen::Create => {
                if self.play_mode {
                    "Play mode: press Enter on a cell to mark it complete.".to_string()
                } else {
                    "Create: move with arrows, Enter edits the selected cell.".to_string()
                }
            }
            Screen::Cards => format!(
                "My Cards: {}/{MAX_SAVED_CARDS} saved. Enter opens, i imports a link.",
                self.store.cards().len()
            ),
        };
    }

    fn handle_create_key(&mut self, key: KeyEvent) -> Result<()> {
        if let Some(moved) = movement(key.code) {
            apply_movement(&mut self.cursor, moved);
            return Ok(());
        }
        match key.code {
            KeyCode::Enter | KeyCode::Char(' ') => {
                if self.play_mode {
                    self.card.toggle_mark(self.cursor);
                } else if key.code == KeyCode::Enter {
                    self.open_cell_editor();
                }
            }
            KeyCode::Char('e') if !self.play_mode => self.open_cell_editor(),
            KeyCode::Char('c') if !self.play_mode => {
                self.card.clear();
                self.status = "Card cleared.".to_string();
            }
            KeyCode::Char('p') => self.toggle_play_mode(),
            KeyCode::Char('s') if !self.play_mode => self.save_working_card()?,
            KeyCode::Char('x') => {
                let record = CardRecord {
                    id: self.card.id(),
                    grid: self.card.grid().to_vec(),
                    date_created: Utc::now(),
                    marked_cells: None,
                };
                self.open_share_view(&record);
            }
            KeyCode::Esc if self.play_mode => {
                self.play_mode = false;
                self.status = "Back to editing.".to_string();
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_cards_key(&mut self, key: KeyEvent) -> Result<()> {
        let count = self.store.cards().len();
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.cards_cursor = self.cards_cursor.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if count > 0 && self.cards_cursor + 1 < count {
                    self.cards_cursor += 1;
                }
            }
            KeyCode::Enter | KeyCode::Char('o') => {
                if let Some(record) = self.store.cards().get(self.cards_cursor) {
                    self.detail = Some(DetailView::new(record.clone()));
                    self.status =
                        "Card opened. p plays, x shares, d deletes, Esc goes back.".to_string();
                }
            }
            KeyCode::Char('i') => {
                self.prompt = Some(TextPrompt::import_link());
            }
            KeyCode::Char('d') => {
                if let Some(record) = self.store.cards().get(self.cards_cursor) {
                    self.confirm_delete = Some(record.id);
                }
            }
            KeyCode::Char('x') => {
                if let Some(record) = self.store.cards().get(self.cards_cursor) {
                    // Shares carry the grid and creation date, never marks.
                    let record = CardRecord {
                        marked_cells: None,
                        ..record.clone()
                    };
                    self.open_share_view(&record);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_detail_key(&mut self, key: KeyEvent) -> Result<()> {
        let Some(detail) = self.detail.as_mut() else {
            return Ok(());
        };
        if let Some(moved) = movement(key.code) {
            apply_movement(&mut detail.cursor, moved);
            return Ok(());
        }
        match key.code {
            KeyCode::Enter | KeyCode::Char(' ') => {
                if detail.play_mode {
                    detail.card.toggle_mark(detail.cursor);
                } else if key.code == KeyCode::Enter {
                    let pos = detail.cursor;
                    if pos.is_center() {
                        self.status = format!("The {FREE_LABEL} square cannot be edited.");
                    } else {
                        let current = detail.card.value(pos).to_string();
                        self.prompt = Some(TextPrompt::edit_cell(pos, &current));
                    }
                }
            }
            KeyCode::Char('e') if !detail.play_mode => {
                let pos = detail.cursor;
                if pos.is_center() {
                    self.status = format!("The {FREE_LABEL} square cannot be edited.");
                } else {
                    let current = detail.card.value(pos).to_string();
                    self.prompt = Some(TextPrompt::edit_cell(pos, &current));
                }
            }
            KeyCode::Char('p') => {
                if detail.play_mode {
                    detail.play_mode = false;
                    self.status = "Back to editing.".to_string();
                } else if detail.card.is_filled() {
                    detail.play_mode = true;
                    self.status = "Play mode: press Enter on a cell to mark it complete.".to_string();
                } else {
                    self.status = "Fill every cell before playing.".to_string();
                }
            }
            KeyCode::Char('x') => {
                let record = CardRecord {
                    id: detail.record.id,
                    grid: detail.card.grid().to_vec(),
                    date_created: detail.record.date_created,
                    marked_cells: None,
                };
                self.open_share_view(&record);
            }
            KeyCode::Char('d') => {
                self.confirm_delete = Some(detail.record.id);
            }
            KeyCode::Esc => {
                if detail.play_mode {
                    detail.play_mode = false;
                    self.status = "Back to editing.".to_string();
                } else {
                    self.close_detail();
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_confirm_key(&mut self, key: KeyEvent) -> Result<()> {
        let Some(id) = self.confirm_delete else {
            return Ok(());
        };
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                self.confirm_delete = None;
                self.store.delete_card(id)?;
                if self
                    .detail
                    .as_ref()
                    .is_some_and(|detail| detail.record.id == id)
                {
                    self.detail = None;
                }
                let count = self.store.cards().len();
                if self.cards_cursor >= count {
                    self.cards_cursor = count.saturating_sub(1);
                }
                info!(%id, "Card deleted");
                self.status = format!("Card deleted ({count}/{MAX_SAVED_CARDS} saved).");
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                self.confirm_delete = None;
                self.status = "Delete cancelled.".to_string();
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_prompt_key(&mut self, key: KeyEvent) -> Result<()> {
        let Some(prompt) = self.prompt.as_mut() else {
            return Ok(());
        };
        match key.code {
            KeyCode::Esc => {
                self.prompt = None;
            }
            KeyCode::Enter => {
                let prompt = self.prompt.take().expect("prompt present");
                match prompt.kind {
                    PromptKind::EditCell(pos) => self.commit_cell_edit(pos, prompt.value()),
                    PromptKind::ImportLink => self.import_link(&prompt.value())?,
                }
            }
            KeyCode::Left => prompt.move_cursor(-1),
            KeyCode::Right => prompt.move_cursor(1),
            KeyCode::Home => prompt.move_home(),
            KeyCode::End => prompt.move_end(),
            KeyCode::Backspace => prompt.backspace(),
            KeyCode::Delete => prompt.delete(),
            KeyCode::Char(ch) => prompt.insert(ch),
            _ => {}
        }
        Ok(())
    }

    fn open_cell_editor(&mut self) {
        if self.cursor.is_center() {
            self.status = format!("The {FREE_LABEL} square cannot be edited.");
            return;
        }
        let current = self.card.value(self.cursor).to_string();
        self.prompt = Some(TextPrompt::edit_cell(self.cursor, &current));
    }

    fn commit_cell_edit(&mut self, pos: CellPosition, value: String) {
        if let Some(detail) = self.detail.as_mut() {
            detail.card.set_value(pos, value);
        } else {
            self.card.set_value(pos, value);
        }
    }

    fn toggle_play_mode(&mut self) {
        if self.play_mode {
            self.play_mode = false;
            self.status = "Back to editing.".to_string();
        } else if self.card.is_filled() {
            self.play_mode = true;
            self.status = "Play mode: press Enter on a cell to mark it complete.".to_string();
        } else {
            self.status = "Fill every cell before playing.".to_string();
        }
    }

    fn save_working_card(&mut self) -> Result<()> {
        match self.store.save_card(&self.card)? {
            Some(record) => {
                info!(id = %record.id, "Card saved");
                self.status = format!(
                    "Card saved ({}/{MAX_SAVED_CARDS}).",
                    self.store.cards().len()
                );
            }
            None => {
                self.status = format!(
                    "You can only save up to {MAX_SAVED_CARDS} cards. \
                     Delete a card from My Cards to save a new one."
                );
            }
        }
        Ok(())
    }

    fn open_share_view(&mut self, record: &CardRecord) {
        match share::encode(record) {
            Ok(link) => {
                info!(id = %record.id, "Share link generated");
                self.share_view = Some(share::share_message(
                    &link,
                    self.config.share_footer.as_deref(),
                ));
            }
            Err(err) => {
                warn!(?err, "Share encoding failed");
                self.status = format!("Could not create share link: {err}");
            }
        }
    }

    fn import_link(&mut self, link: &str) -> Result<()> {
        if link.is_empty() {
            self.status = "Nothing to import.".to_string();
            return Ok(());
        }
        let record = match share::decode(link) {
            Ok(record) => record,
            Err(err) => {
                self.status = format!("Could not import card: {err}");
                return Ok(());
            }
        };
        let id = record.id;
        match self.store.import_record(record)? {
            ImportOutcome::Added => {
                info!(%id, "Card imported from share link");
                self.cards_cursor = self.store.cards().len().saturating_sub(1);
                self.status = format!(
                    "Card added ({}/{MAX_SAVED_CARDS}).",
                    self.store.cards().len()
                );
            }
            ImportOutcome::AlreadySaved => {
                self.status = "That card is already in your collection.".to_string();
            }
            ImportOutcome::LimitReached => {
                self.status = format!(
                    "You can only save up to {MAX_SAVED_CARDS} cards. \
                     Delete a card from My Cards to add a new one."
                );
            }
        }
        Ok(())
    }

    fn close_detail(&mut self) {
        let Some(detail) = self.detail.take() else {
            return;
        };
        if detail.has_changes() {
            match self.store.update_card(&detail.card, detail.record.id) {
                Ok(true) => {
                    info!(id = %detail.record.id, "Card changes saved");
                    self.status = "Changes saved.".to_string();
                }
                Ok(false) => {
                    self.status = "Card no longer exists; changes discarded.".to_string();
                }
                Err(err) => {
                    warn!(?err, "Failed to save card changes");
                    self.status = format!("Failed to save changes: {err}");
                }
            }
        }
    }

    // --- rendering ---

    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.size();
        let show_banner = area.height >= 24;
        let constraints = if show_banner {
            vec![
                Constraint::Length(6),
                Constraint::Length(1),
                Constraint::Min(12),
                Constraint::Length(4),
            ]
        } else {
            vec![
                Constraint::Length(1),
                Constraint::Min(12),
                Constraint::Length(4),
            ]
        };
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(area);

        let mut next = 0;
        if show_banner {
            self.render_banner(frame, layout[next]);
            next += 1;
        }
        self.render_tabs(frame, layout[next]);
        let content = layout[next + 1];
        let status = layout[next + 2];

        if self.detail.is_some() {
            self.render_detail(frame, content);
        } else {
            match self.screen {
                Screen::Create => self.render_create(frame, content),
                Screen::Cards => self.render_cards(frame, content),
            }
        }
        self.render_status(frame, status);

        if let Some(message) = self.share_view.clone() {
            self.render_share(frame, area, &message);
        }
        if let Some(prompt) = self.prompt.clone() {
            self.render_prompt(frame, area, &prompt);
        }
        if self.confirm_delete.is_some() {
            self.render_confirm(frame, area);
        }
    }

    fn render_banner(&self, frame: &mut Frame, area: Rect) {
        let lines: Vec<Line> = block_font::render("BINGO")
            .into_iter()
            .map(|line| Line::from(Span::styled(line, Style::default().fg(self.theme.accent))))
            .collect();
        let paragraph = Paragraph::new(lines).alignment(Alignment::Center);
        frame.render_widget(paragraph, area);
    }

    fn render_tabs(&self, frame: &mut Frame, area: Rect) {
        let active = Style::default()
            .fg(self.theme.accent)
            .add_modifier(Modifier::BOLD);
        let inactive = Style::default().fg(self.theme.muted);
        let (create_style, cards_style) = match self.screen {
            Screen::Create => (active, inactive),
            Screen::Cards => (inactive, active),
        };
        let line = Line::from(vec![
            Span::styled(" [1] Create ", create_style),
            Span::raw("  "),
            Span::styled(
                format!(
                    " [2] My Cards {}/{MAX_SAVED_CARDS} ",
                    self.store.cards().len()
                ),
                cards_style,
            ),
        ]);
        frame.render_widget(Paragraph::new(line).alignment(Alignment::Center), area);
    }

    fn render_create(&self, frame: &mut Frame, area: Rect) {
        let layout = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(40), Constraint::Length(34)])
            .split(area);

        let title = if self.play_mode {
            "Play Card"
        } else {
            "Create Card"
        };
        self.render_card_grid(
            frame,
            layout[0],
            title,
            &self.card,
            Some(self.cursor),
            self.play_mode,
        );
        self.render_create_sidebar(frame, layout[1]);
    }

    fn render_create_sidebar(&self, frame: &mut Frame, area: Rect) {
        let mut lines = vec![
            Line::from(if self.play_mode {
                "Tap filled cells to mark them complete."
            } else {
                "Tap any box to add custom text."
            }),
            Line::from(""),
        ];
        let help: &[(&str, &str)] = if self.play_mode {
            &[
                ("arrows/hjkl", "move"),
                ("Enter/space", "toggle mark"),
                ("p/Esc", "back to editing"),
                ("x", "share card"),
                ("q", "quit"),
            ]
        } else {
            &[
                ("arrows/hjkl", "move"),
                ("Enter/e", "edit cell"),
                ("c", "clear card"),
                ("p", "play card"),
                ("s", "save card"),
                ("x", "share card"),
                ("q", "quit"),
            ]
        };
        for (keys, action) in help {
            lines.push(Line::from(vec![
                Span::styled(format!("{keys:>12}"), Style::default().fg(self.theme.accent)),
                Span::raw("  "),
                Span::raw(*action),
            ]));
        }
        lines.push(Line::from(""));
        if self.play_mode {
            lines.push(Line::from(format!(
                "{} cell(s) marked.",
                self.card.marked_count()
            )));
        } else if self.card.is_filled() {
            lines.push(Line::from(Span::styled(
                "Card filled. Ready to play.",
                Style::default().fg(self.theme.success),
            )));
        } else {
            lines.push(Line::from(Span::styled(
                "Fill every cell to unlock play mode.",
                Style::default().fg(self.theme.warning),
            )));
        }

        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Help"))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_cards(&self, frame: &mut Frame, area: Rect) {
        let layout = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(44), Constraint::Min(30)])
            .split(area);

        self.render_cards_list(frame, layout[0]);

        if let Some(record) = self.store.cards().get(self.cards_cursor) {
            let preview = BingoCard::from_record(record);
            self.render_card_grid(frame, layout[1], "Preview", &preview, None, false);
        } else {
            let paragraph = Paragraph::new(vec![
                Line::from("No cards yet."),
                Line::from(""),
                Line::from("Share a card or create one to get started."),
                Line::from("Press i to import a shared link."),
            ])
            .block(Block::default().borders(Borders::ALL).title("Preview"))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
            frame.render_widget(paragraph, layout[1]);
        }
    }

    fn render_cards_list(&self, frame: &mut Frame, area: Rect) {
        let items: Vec<ListItem> = self
            .store
            .cards()
            .iter()
            .enumerate()
            .map(|(index, record)| {
                let created = record
                    .date_created
                    .with_timezone(&Local)
                    .format("%b %e, %Y");
                let marks = record
                    .marked_cells
                    .as_ref()
                    .map(Vec::len)
                    .unwrap_or_default();
                let detail = if marks > 0 {
                    format!("created {created} • {marks} marked")
                } else {
                    format!("created {created}")
                };
                ListItem::new(vec![
                    Line::from(Span::styled(
                        format!("Card {}", index + 1),
                        Style::default().add_modifier(Modifier::BOLD),
                    )),
                    Line::from(Span::styled(detail, Style::default().fg(self.theme.muted))),
                ])
            })
            .collect();

        let title = format!("My Cards {}/{MAX_SAVED_CARDS}", self.store.cards().len());
        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title(title))
            .highlight_style(
                Style::default()
                    .bg(self.theme.selection_bg)
                    .fg(self.theme.selection_fg),
            )
            .highlight_symbol("» ");
        let mut state = ListState::default();
        if !self.store.cards().is_empty() {
            state.select(Some(self.cards_cursor.min(self.store.cards().len() - 1)));
        }
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn render_detail(&self, frame: &mut Frame, area: Rect) {
        let Some(detail) = self.detail.as_ref() else {
            return;
        };
        let layout = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(40), Constraint::Length(34)])
            .split(area);

        let title = if detail.play_mode {
            "Play Card"
        } else {
            "Card Details"
        };
        self.render_card_grid(
            frame,
            layout[0],
            title,
            &detail.card,
            Some(detail.cursor),
            detail.play_mode,
        );

        let created = detail
            .record
            .date_created
            .with_timezone(&Local)
            .format("%b %e, %Y %H:%M");
        let mut lines = vec![
            Line::from(format!("Created {created}")),
            Line::from(""),
        ];
        let help: &[(&str, &str)] = if detail.play_mode {
            &[
                ("arrows/hjkl", "move"),
                ("Enter/space", "toggle mark"),
                ("p/Esc", "back to editing"),
                ("x", "share card"),
            ]
        } else {
            &[
                ("arrows/hjkl", "move"),
                ("Enter/e", "edit cell"),
                ("p", "play card"),
                ("x", "share card"),
                ("d", "delete card"),
                ("Esc", "back (saves changes)"),
            ]
        };
        for (keys, action) in help {
            lines.push(Line::from(vec![
                Span::styled(format!("{keys:>12}"), Style::default().fg(self.theme.accent)),
                Span::raw("  "),
                Span::raw(*action),
            ]));
        }
        if detail.has_changes() {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                "Unsaved changes.",
                Style::default().fg(self.theme.warning),
            )));
        }
        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Card"))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, layout[1]);
    }

    fn render_card_grid(
        &self,
        frame: &mut Frame,
        area: Rect,
        title: &str,
        card: &BingoCard,
        cursor: Option<CellPosition>,
        play_mode: bool,
    ) {
        let block = Block::default().borders(Borders::ALL).title(title);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        if inner.height < 6 || inner.width < 15 {
            return;
        }

        let mut rows = vec![Constraint::Length(1)];
        rows.extend(std::iter::repeat(Constraint::Min(2)).take(GRID_SIZE));
        let row_areas = Layout::default()
            .direction(Direction::Vertical)
            .constraints(rows)
            .split(inner);

        let column_constraints = vec![Constraint::Ratio(1, GRID_SIZE as u32); GRID_SIZE];

        // Header letters.
        let header_areas = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(column_constraints.clone())
            .split(row_areas[0]);
        for (column, letter) in COLUMN_LETTERS.iter().enumerate() {
            let style = Style::default()
                .fg(Color::White)
                .bg(self.theme.letters[column])
                .add_modifier(Modifier::BOLD);
            let paragraph = Paragraph::new(Span::styled(*letter, style))
                .alignment(Alignment::Center)
                .style(style);
            frame.render_widget(paragraph, header_areas[column]);
        }

        for row in 0..GRID_SIZE {
            let cell_areas = Layout::default()
                .direction(Direction::Horizontal)
                .constraints(column_constraints.clone())
                .split(row_areas[row + 1]);
            for column in 0..GRID_SIZE {
                let pos = CellPosition::new(row, column);
                self.render_cell(frame, cell_areas[column], card, pos, cursor, play_mode);
            }
        }
    }

    fn render_cell(
        &self,
        frame: &mut Frame,
        area: Rect,
        card: &BingoCard,
        pos: CellPosition,
        cursor: Option<CellPosition>,
        play_mode: bool,
    ) {
        let selected = cursor == Some(pos);
        let marked = card.is_marked(pos);

        let mut style = Style::default();
        if pos.is_center() {
            style = style.bg(self.theme.free_bg).add_modifier(Modifier::BOLD);
        }
        if play_mode && marked {
            style = style.bg(self.theme.success).fg(Color::Black);
        }
        let border_style = if selected {
            Style::default()
                .fg(self.theme.accent)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(self.theme.muted)
        };

        let value = card.value(pos);
        let text = if marked {
            format!("✓ {value}")
        } else {
            value.to_string()
        };
        let paragraph = Paragraph::new(text)
            .style(style)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).border_style(border_style));
        frame.render_widget(paragraph, area);
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title("Status");
        let secondary = format!(
            "Cards saved: {}/{MAX_SAVED_CARDS}  •  store: {}",
            self.store.cards().len(),
            self.config.data_root.display()
        );
        let paragraph = Paragraph::new(vec![
            Line::from(self.status.clone()),
            Line::from(Span::styled(secondary, Style::default().fg(self.theme.muted))),
        ])
        .block(block)
        .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_prompt(&self, frame: &mut Frame, area: Rect, prompt: &TextPrompt) {
        let width = (area.width.saturating_sub(8)).min(70).max(30);
        let popup = centered_rect(width, 5, area);
        frame.render_widget(Clear, popup);

        let block = Block::default()
            .borders(Borders::ALL)
            .title(prompt.title.clone());
        let inner = block.inner(popup);
        frame.render_widget(block, popup);

        let visible_width = inner.width.saturating_sub(1) as usize;
        let skip = prompt.cursor.saturating_sub(visible_width);
        let shown: String = prompt.input.chars().skip(skip).take(visible_width).collect();
        let lines = vec![
            Line::from(shown),
            Line::from(Span::styled(
                "Enter confirms • Esc cancels",
                Style::default().fg(self.theme.muted),
            )),
        ];
        frame.render_widget(Paragraph::new(lines), inner);
        let cursor_x = inner.x + (prompt.cursor - skip) as u16;
        frame.set_cursor(cursor_x.min(inner.right().saturating_sub(1)), inner.y);
    }

    fn render_share(&self, frame: &mut Frame, area: Rect, message: &str) {
        let width = (area.width.saturating_sub(6)).min(76).max(30);
        let height = (area.height.saturating_sub(4)).min(12);
        let popup = centered_rect(width, height, area);
        frame.render_widget(Clear, popup);

        let mut lines: Vec<Line> = message.lines().map(|line| Line::from(line.to_string())).collect();
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Copy the link above, then press Esc to close.",
            Style::default().fg(self.theme.muted),
        )));
        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Share Card"))
            .wrap(Wrap { trim: false });
        frame.render_widget(paragraph, popup);
    }

    fn render_confirm(&self, frame: &mut Frame, area: Rect) {
        let popup = centered_rect(40, 5, area);
        frame.render_widget(Clear, popup);
        let paragraph = Paragraph::new(vec![
            Line::from("Delete this card?"),
            Line::from(Span::styled(
                "y deletes • n cancels",
                Style::default().fg(self.theme.muted),
            )),
        ])
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Confirm")
                .border_style(Style::default().fg(self.theme.danger)),
        );
        frame.render_widget(paragraph, popup);
    }
}

fn movement(code: KeyCode) -> Option<(isize, isize)> {
    match code {
        KeyCode::Up | KeyCode::Char('k') => Some((-1, 0)),
        KeyCode::Down | KeyCode::Char('j') => Some((1, 0)),
        KeyCode::Left | KeyCode::Char('h') => Some((0, -1)),
        KeyCode::Right | KeyCode::Char('l') => Some((0, 1)),
        _ => None,
    }
}

fn apply_movement(pos: &mut CellPosition, (dr, dc): (isize, isize)) {
    let max = GRID_SIZE as isize - 1;
    pos.row = (pos.row as isize + dr).clamp(0, max) as usize;
    pos.column = (pos.column as isize + dc).clamp(0, max) as usize;
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor()?;
    Ok(())
}

fn spawn_input_thread(sender: mpsc::Sender<AppEvent>) {
    thread::spawn(move || loop {
        match event::poll(TICK_RATE) {
            Ok(true) => match event::read() {
                Ok(evt) => {
                    if sender.blocking_send(AppEvent::Input(evt)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            Ok(false) => {
                if sender.blocking_send(AppEvent::Tick).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    });
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::tempdir;

    fn filled_card() -> BingoCard {
        let mut card = BingoCard::new();
        for row in 0..GRID_SIZE {
            for column in 0..GRID_SIZE {
                card.set_value(CellPosition::new(row, column), format!("cell {row}{column}"));
            }
        }
        card
    }

    fn test_app(dir: &Path) -> Result<BingoApp> {
        let config = AppConfig {
            data_root: dir.to_path_buf(),
            share_footer: None,
        };
        let store = CardStore::new(dir)?;
        Ok(BingoApp::new(config, store))
    }

    fn saved_record(dir: &Path) -> Result<CardRecord> {
        let mut store = CardStore::new(dir)?;
        let record = store
            .save_card(&filled_card())?
            .expect("store should have room");
        Ok(record)
    }

    #[test]
    fn quitting_saves_open_detail_edits() -> Result<()> {
        let dir = tempdir()?;
        let record = saved_record(dir.path())?;

        let mut app = test_app(dir.path())?;
        app.detail = Some(DetailView::new(record.clone()));
        app.commit_cell_edit(CellPosition::new(0, 0), "edited".to_string());

        app.handle_key(KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE))?;
        assert!(app.should_quit);
        assert!(app.detail.is_none());

        let reloaded = CardStore::new(dir.path())?;
        let saved = reloaded.card(record.id).expect("record present");
        assert_eq!(saved.grid[0][0], "edited");
        Ok(())
    }

    #[test]
    fn ctrl_c_saves_open_detail_edits() -> Result<()> {
        let dir = tempdir()?;
        let record = saved_record(dir.path())?;

        let mut app = test_app(dir.path())?;
        let mut detail = DetailView::new(record.clone());
        detail.card.toggle_mark(CellPosition::new(4, 4));
        app.detail = Some(detail);

        app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL))?;
        assert!(app.should_quit);

        let reloaded = CardStore::new(dir.path())?;
        let saved = reloaded.card(record.id).expect("record present");
        assert_eq!(
            saved.marked_cells.as_deref().map(<[_]>::len),
            Some(1)
        );
        Ok(())
    }

    #[test]
    fn prompt_accepts_non_ascii_text() {
        let mut prompt = TextPrompt::edit_cell(CellPosition::new(0, 0), "café");
        prompt.insert('é');
        assert_eq!(prompt.input, "caféé");
        prompt.backspace();
        assert_eq!(prompt.input, "café");

        prompt.move_home();
        prompt.move_cursor(3);
        prompt.delete();
        assert_eq!(prompt.input, "caf");

        prompt.insert('\u{7}');
        assert_eq!(prompt.input, "caf");
    }
}
