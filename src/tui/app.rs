use crate::service::NoteService;
use crate::service::clock::{HashIdGenerator, SystemClock};
use crate::service::projection;
use crate::storage::local_store::FileStorage;
use crate::storage::note::{Category, Note, NotePatch};
use anyhow::Result;
use crossterm::event::{KeyCode, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::*;

pub enum AppMode {
    List,
    Search,
    Form,
    DeleteConfirm,
    Help,
}

#[derive(Clone, Copy, PartialEq)]
pub enum FormFocus {
    Title,
    Content,
    Category,
}

pub struct App {
    pub service: NoteService,
    pub notes: Vec<Note>,
    pub filtered_notes: Vec<Note>,
    pub search_query: String,
    pub category_filter: Option<Category>,
    pub selected_index: usize,
    pub mode: AppMode,
    pub should_quit: bool,
    pub status_message: Option<String>,
    // Form state; `editing_id` is None when creating.
    pub editing_id: Option<String>,
    pub form_title: String,
    pub form_content: String,
    pub form_category: Category,
    pub form_focus: FormFocus,
}

impl App {
    pub fn new(data_dir: &std::path::Path) -> Result<Self> {
        let storage = FileStorage::new(data_dir);
        let mut service = NoteService::new(
            Box::new(storage),
            Box::new(SystemClock),
            Box::new(HashIdGenerator),
        );
        service.initialize()?;

        let mut app = App {
            service,
            notes: Vec::new(),
            filtered_notes: Vec::new(),
            search_query: String::new(),
            category_filter: None,
            selected_index: 0,
            mode: AppMode::List,
            should_quit: false,
            status_message: None,
            editing_id: None,
            form_title: String::new(),
            form_content: String::new(),
            form_category: Category::Personal,
            form_focus: FormFocus::Title,
        };
        app.refresh();
        Ok(app)
    }

    /// Recompute the sorted view and the displayed projection. Called after
    /// every mutation and whenever the query or category filter changes.
    fn refresh(&mut self) {
        self.notes = self.service.sorted_view();
        self.filtered_notes =
            projection::filter_notes(&self.notes, self.category_filter, &self.search_query);
        if self.selected_index >= self.filtered_notes.len() {
            self.selected_index = self.filtered_notes.len().saturating_sub(1);
        }
    }

    /// Surface a save failure from the last mutation, if there was one.
    fn check_persist_warning(&mut self) {
        if let Some(e) = self.service.take_persist_warning() {
            self.status_message = Some(format!("⚠ Saved in memory only: {}", e));
        }
    }

    pub fn handle_key(&mut self, key: KeyCode, modifiers: KeyModifiers) -> Result<()> {
        match self.mode {
            AppMode::List => self.handle_list_key(key)?,
            AppMode::Search => self.handle_search_key(key),
            AppMode::Form => self.handle_form_key(key, modifiers),
            AppMode::DeleteConfirm => self.handle_delete_confirm_key(key),
            AppMode::Help => self.handle_help_key(key),
        }
        Ok(())
    }

    fn handle_list_key(&mut self, key: KeyCode) -> Result<()> {
        match key {
            KeyCode::Esc => {
                if !self.search_query.is_empty() || self.category_filter.is_some() {
                    self.search_query.clear();
                    self.category_filter = None;
                    self.selected_index = 0;
                    self.refresh();
                } else {
                    self.should_quit = true;
                }
            }
            KeyCode::Char('q') => {
                self.should_quit = true;
            }
            KeyCode::Char('/') => {
                self.mode = AppMode::Search;
            }
            KeyCode::Char('f') => {
                // Cycle: all -> personal -> work -> idea -> todo -> all
                self.category_filter = match self.category_filter {
                    None => Some(Category::Personal),
                    Some(Category::Todo) => None,
                    Some(c) => Some(c.next()),
                };
                self.selected_index = 0;
                self.refresh();
            }
            KeyCode::Char('j') | KeyCode::Down => {
                let max_index = self.filtered_notes.len().saturating_sub(1);
                if self.selected_index < max_index {
                    self.selected_index += 1;
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                if self.selected_index > 0 {
                    self.selected_index -= 1;
                }
            }
            KeyCode::Char('n') => {
                self.editing_id = None;
                self.form_title = String::new();
                self.form_content = String::new();
                self.form_category = Category::Personal;
                self.form_focus = FormFocus::Title;
                self.mode = AppMode::Form;
            }
            KeyCode::Char('e') | KeyCode::Enter => {
                if let Some(note) = self.filtered_notes.get(self.selected_index) {
                    self.editing_id = Some(note.id.clone());
                    self.form_title = note.title.clone();
                    self.form_content = note.content.clone();
                    self.form_category = note.category;
                    self.form_focus = FormFocus::Title;
                    self.mode = AppMode::Form;
                }
            }
            KeyCode::Char('d') => {
                if self.filtered_notes.get(self.selected_index).is_some() {
                    self.mode = AppMode::DeleteConfirm;
                }
            }
            KeyCode::Char('x') => {
                let json = self.service.export_snapshot()?;
                std::fs::write("data.json", json)?;
                self.status_message = Some("✓ Exported to data.json".to_string());
            }
            KeyCode::Char('?') => {
                self.mode = AppMode::Help;
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_search_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Esc => {
                self.search_query.clear();
                self.mode = AppMode::List;
                self.refresh();
            }
            KeyCode::Enter => {
                // Keep the query applied and go back to the list.
                self.mode = AppMode::List;
            }
            KeyCode::Char(c) => {
                self.search_query.push(c);
                self.selected_index = 0;
                self.refresh();
            }
            KeyCode::Backspace => {
                self.search_query.pop();
                self.selected_index = 0;
                self.refresh();
            }
            _ => {}
        }
    }

    fn handle_form_key(&mut self, key: KeyCode, modifiers: KeyModifiers) {
        match key {
            KeyCode::Esc => {
                self.mode = AppMode::List;
            }
            KeyCode::Char('s') if modifiers.contains(KeyModifiers::CONTROL) => {
                self.save_form();
            }
            KeyCode::Tab => {
                self.form_focus = match self.form_focus {
                    FormFocus::Title => FormFocus::Content,
                    FormFocus::Content => FormFocus::Category,
                    FormFocus::Category => FormFocus::Title,
                };
            }
            KeyCode::Left | KeyCode::Right if self.form_focus == FormFocus::Category => {
                self.form_category = self.form_category.next();
            }
            KeyCode::Char(' ') if self.form_focus == FormFocus::Category => {
                self.form_category = self.form_category.next();
            }
            KeyCode::Char(c) => match self.form_focus {
                FormFocus::Title => self.form_title.push(c),
                FormFocus::Content => self.form_content.push(c),
                FormFocus::Category => {}
            },
            KeyCode::Enter if self.form_focus == FormFocus::Content => {
                self.form_content.push('\n');
            }
            KeyCode::Backspace => match self.form_focus {
                FormFocus::Title => {
                    self.form_title.pop();
                }
                FormFocus::Content => {
                    self.form_content.pop();
                }
                FormFocus::Category => {}
            },
            _ => {}
        }
    }

    fn save_form(&mut self) {
        let result = match self.editing_id.clone() {
            Some(id) => self.service.update(
                &id,
                NotePatch {
                    title: Some(self.form_title.clone()),
                    content: Some(self.form_content.clone()),
                    category: Some(self.form_category),
                },
            ),
            None => self.service.create(
                self.form_title.clone(),
                self.form_content.clone(),
                self.form_category,
            ),
        };

        match result {
            Ok(_) => {
                self.status_message = Some("✓ Note saved".to_string());
                self.check_persist_warning();
                self.mode = AppMode::List;
                self.refresh();
            }
            // Validation failures keep the form open for correction.
            Err(e) => {
                self.status_message = Some(format!("✗ {}", e));
            }
        }
    }

    fn handle_delete_confirm_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('y') | KeyCode::Enter => {
                if let Some(note) = self.filtered_notes.get(self.selected_index) {
                    let id = note.id.clone();
                    self.service.delete(&id);
                    self.status_message = Some("✓ Note deleted".to_string());
                    self.check_persist_warning();
                    self.refresh();
                }
                self.mode = AppMode::List;
            }
            KeyCode::Char('n') | KeyCode::Esc => {
                self.mode = AppMode::List;
            }
            _ => {}
        }
    }

    fn handle_help_key(&mut self, key: KeyCode) {
        if matches!(key, KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?')) {
            self.mode = AppMode::List;
        }
    }

    pub fn render(&self, frame: &mut Frame) {
        match self.mode {
            AppMode::List | AppMode::Search => self.render_list(frame),
            AppMode::Form => self.render_form(frame),
            AppMode::DeleteConfirm => self.render_delete_confirm(frame),
            AppMode::Help => self.render_help(frame),
        }
    }

    fn render_list(&self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(3),
            ])
            .split(frame.area());

        // Title bar shows the active filter and query.
        let mut title_text = "jotter".to_string();
        if let Some(cat) = self.category_filter {
            title_text.push_str(&format!(" - [{}]", cat));
        }
        if !self.search_query.is_empty() || matches!(self.mode, AppMode::Search) {
            title_text.push_str(&format!(" - search: {}", self.search_query));
            if matches!(self.mode, AppMode::Search) {
                title_text.push('_');
            }
        }
        let title = Paragraph::new(title_text)
            .block(Block::default().borders(Borders::ALL).title("jotter"))
            .style(Style::default().fg(Color::Cyan));
        frame.render_widget(title, chunks[0]);

        let items: Vec<ListItem> = self
            .filtered_notes
            .iter()
            .enumerate()
            .map(|(i, note)| self.note_list_item(i, note))
            .collect();

        let mut state = ListState::default();
        state.select(Some(self.selected_index));

        let list = List::new(items).block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Notes ({})", self.filtered_notes.len())),
        );
        frame.render_stateful_widget(list, chunks[1], &mut state);

        let hint = match self.status_message.as_deref() {
            Some(msg) => msg.to_string(),
            None => "n: new  e: edit  d: delete  /: search  f: filter  x: export  ?: help  q: quit"
                .to_string(),
        };
        let status = Paragraph::new(hint)
            .block(Block::default().borders(Borders::ALL))
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(status, chunks[2]);
    }

    fn note_list_item(&self, index: usize, note: &Note) -> ListItem<'_> {
        let is_selected = index == self.selected_index;
        let base_style = if is_selected {
            Style::default().fg(Color::Yellow).bg(Color::DarkGray)
        } else {
            Style::default()
        };

        let marker = if is_selected { "▶ " } else { "  " };
        let title_line = Line::from(vec![
            Span::styled(marker, Style::default().fg(Color::Cyan)),
            Span::styled(
                note.title.clone(),
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("  [{}]", note.category),
                Style::default().fg(category_color(note.category)),
            ),
        ]);

        let preview: String = note.content.lines().next().unwrap_or("").chars().take(60).collect();
        let date_str = chrono::DateTime::from_timestamp_millis(note.updated_at)
            .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        let meta_line = Line::from(vec![
            Span::styled(format!("  {}", preview), Style::default().fg(Color::Gray)),
            Span::styled(format!("  {}", date_str), Style::default().fg(Color::DarkGray)),
        ]);

        ListItem::new(vec![title_line, meta_line]).style(base_style)
    }

    fn render_form(&self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(5),
                Constraint::Length(3),
                Constraint::Length(3),
            ])
            .split(frame.area());

        let focused = |focus| {
            if self.form_focus == focus {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default()
            }
        };

        let title_field = Paragraph::new(self.form_title.as_str())
            .block(Block::default().borders(Borders::ALL).title("Title"))
            .style(focused(FormFocus::Title));
        frame.render_widget(title_field, chunks[0]);

        let content_field = Paragraph::new(self.form_content.as_str())
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).title("Content"))
            .style(focused(FormFocus::Content));
        frame.render_widget(content_field, chunks[1]);

        let categories = Category::ALL
            .iter()
            .map(|c| {
                if *c == self.form_category {
                    format!("[{}]", c)
                } else {
                    format!(" {} ", c)
                }
            })
            .collect::<Vec<_>>()
            .join(" ");
        let category_field = Paragraph::new(categories)
            .block(Block::default().borders(Borders::ALL).title("Category"))
            .style(focused(FormFocus::Category));
        frame.render_widget(category_field, chunks[2]);

        let heading = if self.editing_id.is_some() {
            "Edit note"
        } else {
            "New note"
        };
        let hint = match self.status_message.as_deref() {
            Some(msg) => format!("{} - {}", heading, msg),
            None => format!("{} - Tab: next field  Ctrl+S: save  Esc: cancel", heading),
        };
        let status = Paragraph::new(hint)
            .block(Block::default().borders(Borders::ALL))
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(status, chunks[3]);
    }

    fn render_delete_confirm(&self, frame: &mut Frame) {
        let title = self
            .filtered_notes
            .get(self.selected_index)
            .map(|n| n.title.as_str())
            .unwrap_or("");
        let text = format!("Delete \"{}\"?\n\ny: yes    n: no", title);
        let area = centered_rect(50, 20, frame.area());
        let confirm = Paragraph::new(text)
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title("Confirm delete"))
            .style(Style::default().fg(Color::Red));
        frame.render_widget(Clear, area);
        frame.render_widget(confirm, area);
    }

    fn render_help(&self, frame: &mut Frame) {
        let text = "\
j/k or arrows   move selection
n               new note
e or Enter      edit selected note
d               delete selected note (asks first)
/               search title and content
f               cycle category filter
x               export all notes to data.json
Esc             clear search/filter, then quit
q               quit";
        let help = Paragraph::new(text)
            .block(Block::default().borders(Borders::ALL).title("Help"))
            .style(Style::default().fg(Color::White));
        frame.render_widget(help, frame.area());
    }
}

fn category_color(category: Category) -> Color {
    match category {
        Category::Personal => Color::Green,
        Category::Work => Color::Blue,
        Category::Idea => Color::Magenta,
        Category::Todo => Color::Yellow,
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
