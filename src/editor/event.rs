use crate::model::{Entity, Image};
use crate::selection::DomSelection;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Key {
    Character(char),
    /// IME composition in progress.
    Process,
    /// Android soft keyboards report most keys this way.
    Unidentified,
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    Home,
    End,
    PageUp,
    PageDown,
    Enter,
    Backspace,
    Delete,
    Tab,
    Escape,
    Other(String),
}

impl Key {
    pub fn is_cursor_moving(&self) -> bool {
        matches!(
            self,
            Key::ArrowLeft
                | Key::ArrowRight
                | Key::ArrowUp
                | Key::ArrowDown
                | Key::Home
                | Key::End
                | Key::PageUp
                | Key::PageDown
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyboardEvent {
    pub key: Key,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
    pub shift: bool,
}

impl KeyboardEvent {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            ctrl: false,
            alt: false,
            meta: false,
            shift: false,
        }
    }

    pub fn character(ch: char) -> Self {
        Self::new(Key::Character(ch))
    }

    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    /// A key that produces a single character of text.
    pub fn is_character_value(&self) -> bool {
        !self.ctrl && !self.meta && matches!(self.key, Key::Character(_))
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ContentChangedEvent {
    pub source: String,
    pub skip_undo_snapshot: bool,
    pub new_entities: Vec<Entity>,
    pub deleted_entities: Vec<Entity>,
    pub new_images: Vec<Image>,
}

/// Everything plugins get to observe, in the order the host produced it.
#[derive(Clone, Debug, PartialEq)]
pub enum PluginEvent {
    EditorReady,
    BeforeDispose,
    KeyDown(KeyboardEvent),
    /// Text was inserted. `data` is absent for deletions and breaks.
    Input { data: Option<String> },
    CompositionEnd { data: String },
    MouseUp,
    SelectionChanged(Option<DomSelection>),
    ContentChanged(ContentChangedEvent),
}
