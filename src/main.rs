use std::{
    cell::Cell,
    env, fs, io,
    path::PathBuf,
    rc::Rc,
    sync::Mutex,
    time::{Duration, Instant},
};

use anyhow::{Context, Result, anyhow};
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers,
        MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Position, Rect},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap},
};
use tdoc::{Document, parse, writer::Writer};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use content_model_editor::{
    commands,
    convert::{document_from_model, model_from_document},
    editor::{Editor, EditorOptions, EditorPlugin, Key, KeyboardEvent, PluginEvent},
    format_state::{ConflictSolution, FormatState},
    model::{BlockGroup, SegmentFormat},
};

mod render;
mod theme;

use render::{CursorVisualPosition, LineOrigin, RenderResult, render_model};
use theme::Theme;

const STATUS_TIMEOUT: Duration = Duration::from_secs(4);
const LOG_ENV: &str = "CME_LOG";

fn main() -> Result<()> {
    run()
}

struct Args {
    path: PathBuf,
    default_format: SegmentFormat,
}

fn parse_args() -> Result<Option<Args>> {
    let mut args = env::args().skip(1);
    let mut path = None;
    let mut default_format = SegmentFormat::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--font-family" => {
                let value = args.next().context("--font-family needs a value")?;
                default_format.font_family = Some(value);
            }
            "--font-size" => {
                let value = args.next().context("--font-size needs a value")?;
                default_format.font_size = Some(value);
            }
            _ if path.is_none() => path = Some(PathBuf::from(arg)),
            other => return Err(anyhow!("unexpected argument {other}")),
        }
    }
    Ok(path.map(|path| Args { path, default_format }))
}

/// Logs go to the file named by `CME_LOG`; without it nothing is logged, as
/// the terminal belongs to the editor.
fn init_logging() -> Result<()> {
    let Ok(log_path) = env::var(LOG_ENV) else {
        return Ok(());
    };
    let file = fs::File::create(&log_path).with_context(|| format!("failed to create {log_path}"))?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|err| anyhow!(err))
        .context("failed to install log subscriber")
}

fn run() -> Result<()> {
    let Some(args) = parse_args()? else {
        eprintln!("Usage: cargo run -- <file.ftml> [--font-family NAME] [--font-size SIZE]");
        return Ok(());
    };
    init_logging()?;

    let (document, initial_status) = load_document(&args.path)?;
    let mut app = App::new(model_from_document(&document), args, initial_status);

    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture).context("failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal backend")?;
    terminal.clear().ok();

    let res = run_app(&mut terminal, &mut app).context("application error");

    disable_raw_mode().ok();
    execute!(terminal.backend_mut(), DisableMouseCapture, LeaveAlternateScreen).ok();
    terminal.show_cursor().ok();

    res
}

fn load_document(path: &PathBuf) -> Result<(Document, Option<String>)> {
    if path.exists() {
        let content = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
        match parse(std::io::Cursor::new(content)) {
            Ok(doc) => Ok((doc, None)),
            Err(err) => {
                warn!(path = %path.display(), "parse failed: {err}");
                let message = format!("Parse error: {err}. Starting with empty document.");
                Ok((Document::new(), Some(message)))
            }
        }
    } else {
        Ok((Document::new(), Some("New document".to_string())))
    }
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    while !app.should_quit() {
        terminal.draw(|frame| app.draw(frame)).context("failed to draw frame")?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if event::poll(timeout).context("event poll failed")? {
            let evt = event::read().context("failed to read event")?;
            app.handle_event(evt)?;
        }

        if last_tick.elapsed() >= tick_rate {
            app.on_tick();
            last_tick = Instant::now();
        }
    }

    Ok(())
}

/// Marks the document dirty whenever the editor commits a change.
struct ChangeTracker {
    dirty: Rc<Cell<bool>>,
}

impl EditorPlugin for ChangeTracker {
    fn name(&self) -> &str {
        "ChangeTracker"
    }

    fn on_plugin_event(&mut self, _editor: &mut Editor, event: &PluginEvent) {
        if let PluginEvent::ContentChanged(change) = event {
            debug!(source = %change.source, "content changed");
            self.dirty.set(true);
        }
    }
}

struct App {
    editor: Editor,
    theme: Theme,
    file_path: PathBuf,
    scroll_top: usize,
    last_view_height: usize,
    text_area: Rect,
    origins: Vec<Option<LineOrigin>>,
    should_quit: bool,
    dirty: Rc<Cell<bool>>,
    status_message: Option<(String, Instant)>,
    last_cursor_visual: Option<CursorVisualPosition>,
}

impl App {
    fn new(model: BlockGroup, args: Args, initial_status: Option<String>) -> Self {
        let dirty = Rc::new(Cell::new(false));
        let options = EditorOptions::default()
            .with_model(model)
            .with_default_format(args.default_format)
            .with_plugin(ChangeTracker {
                dirty: Rc::clone(&dirty),
            })
            .with_dispose_error_handler(|name, err| warn!(plugin = name, "dispose failed: {err:#}"));
        let editor = Editor::new(options);
        info!(path = %args.path.display(), "editor ready");

        Self {
            editor,
            theme: Theme::default(),
            file_path: args.path,
            scroll_top: 0,
            last_view_height: 1,
            text_area: Rect::default(),
            origins: Vec::new(),
            should_quit: false,
            dirty,
            status_message: initial_status.map(|msg| (msg, Instant::now())),
            last_cursor_visual: None,
        }
    }

    fn should_quit(&self) -> bool {
        self.should_quit
    }

    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.area();
        if area.height == 0 || area.width == 0 {
            return;
        }

        let status_height = if area.height > 1 { 2 } else { 1 };
        let vertical = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(status_height)])
            .split(area);

        let editor_area = vertical[0];
        let status_area = vertical[1];

        let horizontal = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(1), Constraint::Length(1)])
            .split(editor_area);
        let text_area = horizontal[0];
        let scrollbar_area = horizontal[1];
        self.text_area = text_area;

        let render = render_model(self.editor.model(), text_area.width.max(1) as usize, &self.theme);
        let cursor_visual = render.cursor;
        self.last_cursor_visual = cursor_visual;

        let viewport_height = text_area.height as usize;
        self.last_view_height = viewport_height.max(1);
        self.adjust_scroll(&render, viewport_height);

        let paragraph = Paragraph::new(Text::from(render.lines))
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::NONE))
            .scroll((self.scroll_top as u16, 0));
        frame.render_widget(paragraph, text_area);
        self.origins = render.origins;

        let mut scrollbar_state = ScrollbarState::new(render.total_lines).position(self.scroll_top);
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight);
        frame.render_stateful_widget(scrollbar, scrollbar_area, &mut scrollbar_state);

        if let Some(cursor) = cursor_visual
            && cursor.line >= self.scroll_top
            && cursor.line < self.scroll_top + viewport_height
        {
            let cursor_y = text_area.y + (cursor.line - self.scroll_top) as u16;
            let cursor_x = text_area.x + cursor.column.min(text_area.width - 1);
            frame.set_cursor_position(Position::new(cursor_x, cursor_y));
        }

        let status_widget = Paragraph::new(self.status_line(render.total_lines))
            .style(self.theme.status_bar_style())
            .block(Block::default().borders(Borders::TOP));
        frame.render_widget(status_widget, status_area);
    }

    fn status_line(&mut self, total_lines: usize) -> Line<'static> {
        self.prune_status_message();
        let mut spans = vec![Span::raw(format!("{} ", self.format_status_text()))];
        if self.editor.pending_format().is_some() {
            spans.push(Span::styled(" pending ", self.theme.pending_style()));
            spans.push(Span::raw(" "));
        }
        if let Some((message, _)) = &self.status_message {
            spans.push(Span::raw(format!("| {message}")));
            return Line::from(spans);
        }

        let marker = if self.dirty.get() { "*" } else { "" };
        spans.push(Span::raw("| "));
        spans.push(Span::styled(
            format!("{}{}", self.file_path.display(), marker),
            self.theme.filename_style(),
        ));
        spans.push(Span::raw(format!(
            " | Lines: {total_lines} | Alt-B/I/U/X style | Ctrl-T table | Ctrl-D rule | Ctrl-S save | Ctrl-Q quit"
        )));
        Line::from(spans)
    }

    fn prune_status_message(&mut self) {
        if let Some((_, instant)) = &self.status_message
            && instant.elapsed() > STATUS_TIMEOUT
        {
            self.status_message = None;
        }
    }

    fn adjust_scroll(&mut self, render: &RenderResult, viewport_height: usize) {
        let viewport = viewport_height.max(1);
        let max_scroll = render.total_lines.saturating_sub(viewport);
        if let Some(cursor) = &render.cursor {
            if cursor.line < self.scroll_top {
                self.scroll_top = cursor.line;
            } else if cursor.line >= self.scroll_top + viewport_height {
                self.scroll_top = cursor.line.saturating_add(1).saturating_sub(viewport);
            }
        }
        if self.scroll_top > max_scroll {
            self.scroll_top = max_scroll;
        }
    }

    fn handle_event(&mut self, event: Event) -> Result<()> {
        match event {
            Event::Key(KeyEvent {
                code,
                modifiers,
                kind: KeyEventKind::Press,
                ..
            }) => self.handle_key(code, modifiers),
            Event::Mouse(MouseEvent {
                kind: MouseEventKind::Up(MouseButton::Left),
                column,
                row,
                ..
            }) => self.handle_click(column, row),
            Event::Paste(text) => {
                self.editor.handle_text_input(&text)?;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> Result<()> {
        let ctrl = modifiers.contains(KeyModifiers::CONTROL);
        let alt = modifiers.contains(KeyModifiers::ALT);
        match code {
            KeyCode::Char('q') | KeyCode::Char('c') if ctrl => self.should_quit = true,
            KeyCode::Char('s') if ctrl => self.save()?,
            KeyCode::Char('t') if ctrl => {
                commands::insert_table(&mut self.editor, 2, 2)?;
            }
            KeyCode::Char('d') if ctrl => {
                commands::insert_divider(&mut self.editor)?;
            }
            KeyCode::Char('b') if alt => {
                commands::toggle_bold(&mut self.editor)?;
            }
            KeyCode::Char('i') if alt => {
                commands::toggle_italic(&mut self.editor)?;
            }
            KeyCode::Char('u') if alt => {
                commands::toggle_underline(&mut self.editor)?;
            }
            KeyCode::Char('x') if alt => {
                commands::toggle_strikethrough(&mut self.editor)?;
            }
            KeyCode::Up if ctrl => {
                self.scroll_top = self.scroll_top.saturating_sub(self.last_view_height);
            }
            KeyCode::Down if ctrl => {
                self.scroll_top += self.last_view_height;
            }
            _ => {
                if let Some(event) = keyboard_event(code, modifiers) {
                    self.editor.handle_key_down(event)?;
                }
            }
        }
        Ok(())
    }

    fn handle_click(&mut self, column: u16, row: u16) -> Result<()> {
        let area = self.text_area;
        if !area.contains(Position::new(column, row)) {
            return Ok(());
        }
        let line = self.scroll_top + usize::from(row - area.y);
        let Some(Some(origin)) = self.origins.get(line) else {
            return Ok(());
        };
        let position = origin.position_at(usize::from(column - area.x));
        self.editor.handle_mouse_up(&position)?;
        Ok(())
    }

    fn on_tick(&mut self) {
        self.prune_status_message();
    }

    fn save(&mut self) -> Result<()> {
        let document = document_from_model(self.editor.model());
        let writer = Writer::new();
        let contents = writer.write_to_string(&document).context("failed to render FTML")?;
        fs::write(&self.file_path, contents)
            .with_context(|| format!("failed to write {}", self.file_path.display()))?;

        info!(path = %self.file_path.display(), "saved");
        self.dirty.set(false);
        self.status_message = Some(("Saved".to_string(), Instant::now()));
        Ok(())
    }

    fn format_status_text(&self) -> String {
        let position = match self.last_cursor_visual {
            Some(position) => format!("[{},{}]", position.line + 1, usize::from(position.column) + 1),
            None => "[?,?]".to_string(),
        };
        let Ok(state) = self.editor.format_state(ConflictSolution::ReturnMultiple) else {
            return position;
        };
        let mut parts = vec![position];
        parts.extend(format_labels(&state));
        parts.join(" ")
    }
}

fn format_labels(state: &FormatState) -> Vec<String> {
    let mut labels = Vec::new();
    if let Some(level) = state.heading_level {
        labels.push(format!("H{level}"));
    }
    for (on, label) in [
        (state.is_bold, "B"),
        (state.is_italic, "I"),
        (state.is_underline, "U"),
        (state.is_strikethrough, "S"),
    ] {
        if on == Some(true) {
            labels.push(label.to_string());
        }
    }
    labels.extend(state.font_name.clone());
    labels.extend(state.font_size.clone());
    if state.is_in_table == Some(true) {
        labels.push("table".to_string());
    }
    labels
}

fn keyboard_event(code: KeyCode, modifiers: KeyModifiers) -> Option<KeyboardEvent> {
    let key = match code {
        KeyCode::Char(ch) => Key::Character(ch),
        KeyCode::Left => Key::ArrowLeft,
        KeyCode::Right => Key::ArrowRight,
        KeyCode::Up => Key::ArrowUp,
        KeyCode::Down => Key::ArrowDown,
        KeyCode::Home => Key::Home,
        KeyCode::End => Key::End,
        KeyCode::PageUp => Key::PageUp,
        KeyCode::PageDown => Key::PageDown,
        KeyCode::Enter => Key::Enter,
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Delete => Key::Delete,
        KeyCode::Tab => Key::Tab,
        KeyCode::Esc => Key::Escape,
        KeyCode::F(n) => Key::Other(format!("F{n}")),
        _ => return None,
    };
    let mut event = KeyboardEvent::new(key);
    event.ctrl = modifiers.contains(KeyModifiers::CONTROL);
    event.alt = modifiers.contains(KeyModifiers::ALT);
    event.meta = modifiers.contains(KeyModifiers::SUPER);
    event.shift = modifiers.contains(KeyModifiers::SHIFT);
    Some(event)
}
