use std::cell::RefCell;
use std::rc::Rc;

use super::*;
use crate::model::{BlockAddress, GroupPath};

type Log = Rc<RefCell<Vec<String>>>;

struct Recorder {
    name: &'static str,
    log: Log,
    fail_dispose: bool,
    echo_ready: bool,
    dispose_on_mouse_up: bool,
}

impl Recorder {
    fn new(name: &'static str, log: &Log) -> Self {
        Self {
            name,
            log: Rc::clone(log),
            fail_dispose: false,
            echo_ready: false,
            dispose_on_mouse_up: false,
        }
    }
}

impl EditorPlugin for Recorder {
    fn name(&self) -> &str {
        self.name
    }

    fn on_plugin_event(&mut self, editor: &mut Editor, event: &PluginEvent) {
        self.log.borrow_mut().push(format!("{}:{}", self.name, label(event)));
        if self.echo_ready && *event == PluginEvent::EditorReady {
            let _ = editor.trigger_event(PluginEvent::MouseUp);
        }
        if self.dispose_on_mouse_up && *event == PluginEvent::MouseUp {
            editor.dispose();
        }
    }

    fn dispose(&mut self) -> anyhow::Result<()> {
        self.log.borrow_mut().push(format!("{}:disposed", self.name));
        if self.fail_dispose {
            anyhow::bail!("{} refused to go", self.name);
        }
        Ok(())
    }
}

fn label(event: &PluginEvent) -> &'static str {
    match event {
        PluginEvent::EditorReady => "ready",
        PluginEvent::BeforeDispose => "before-dispose",
        PluginEvent::KeyDown(_) => "keydown",
        PluginEvent::Input { .. } => "input",
        PluginEvent::CompositionEnd { .. } => "composition",
        PluginEvent::MouseUp => "mouseup",
        PluginEvent::SelectionChanged(_) => "selection",
        PluginEvent::ContentChanged(_) => "changed",
    }
}

fn root(index: usize) -> BlockAddress {
    BlockAddress::new(GroupPath::root(), index)
}

fn two_lines() -> BlockGroup {
    BlockGroup::document()
        .with_block(Paragraph::new().with_segments(vec![Segment::text("ab"), Segment::marker(SegmentFormat::default())]))
        .with_block(Paragraph::new().with_segment(Segment::text("cd")))
}

fn first_paragraph(editor: &Editor) -> &Paragraph {
    editor.model().paragraph_at(&root(0)).expect("first paragraph")
}

#[test]
fn new_editor_has_a_caret_and_announces_itself() {
    let log = Log::default();
    let editor = Editor::new(EditorOptions::default().with_plugin(Recorder::new("rec", &log)));

    assert_eq!(
        editor.dom_selection().expect("alive"),
        Some(DomSelection::collapsed(DomPosition::new(root(0), 0)))
    );
    assert_eq!(log.borrow().as_slice(), ["rec:ready"]);
}

#[test]
fn events_raised_during_dispatch_are_queued() {
    let log = Log::default();
    let mut first = Recorder::new("a", &log);
    first.echo_ready = true;
    let _editor = Editor::new(
        EditorOptions::default()
            .with_plugin(first)
            .with_plugin(Recorder::new("b", &log)),
    );

    assert_eq!(log.borrow().as_slice(), ["a:ready", "b:ready", "a:mouseup", "b:mouseup"]);
}

#[test]
fn typed_character_takes_the_pending_format() {
    let mut editor = Editor::new(EditorOptions::default());
    editor.set_pending_format(SegmentFormat::bold()).expect("caret");

    assert!(editor.handle_key_down(KeyboardEvent::character('a')).expect("alive"));

    let paragraph = first_paragraph(&editor);
    assert_eq!(paragraph.segments[0].as_text(), Some("a"));
    assert!(paragraph.segments[0].format.is_bold());
    assert_eq!(editor.pending_format(), None);

    let state = editor.format_state(ConflictSolution::Remove).expect("alive");
    assert_eq!(state.is_bold, Some(true));
}

#[test]
fn typed_character_gets_the_default_format() {
    let arial = SegmentFormat {
        font_family: Some("Arial".to_string()),
        ..SegmentFormat::default()
    };
    let mut editor = Editor::new(EditorOptions::default().with_default_format(arial));

    editor.handle_key_down(KeyboardEvent::character('x')).expect("alive");

    let paragraph = first_paragraph(&editor);
    assert_eq!(paragraph.segments[0].as_text(), Some("x"));
    assert_eq!(paragraph.segments[0].format.font_family.as_deref(), Some("Arial"));
}

#[test]
fn cursor_keys_discard_the_pending_format() {
    let mut editor = Editor::new(EditorOptions::default());
    editor.set_pending_format(SegmentFormat::bold()).expect("caret");

    editor.handle_key_down(KeyboardEvent::new(Key::ArrowLeft)).expect("alive");

    assert_eq!(editor.pending_format(), None);
}

#[test]
fn clicking_elsewhere_discards_the_pending_format() {
    let mut editor = Editor::new(EditorOptions::default().with_model(two_lines()));
    editor.set_pending_format(SegmentFormat::bold()).expect("caret");

    editor.handle_mouse_up(&DomPosition::new(root(0), 2)).expect("alive");
    assert!(editor.pending_format().is_some());

    editor.handle_mouse_up(&DomPosition::new(root(1), 0)).expect("alive");
    assert_eq!(editor.pending_format(), None);
}

#[test]
fn unchanged_pass_is_not_committed() {
    let log = Log::default();
    let mut editor = Editor::new(EditorOptions::default().with_plugin(Recorder::new("rec", &log)));

    let changed = editor
        .format_content_model(
            |model, _| {
                model.blocks.clear();
                false
            },
            FormatContentModelOptions::new("noop"),
        )
        .expect("alive");

    assert!(!changed);
    assert_eq!(editor.model().blocks.len(), 1);
    assert!(!log.borrow().iter().any(|entry| entry == "rec:changed"));
}

#[test]
fn cached_model_is_edited_in_place() {
    let mut editor = Editor::new(EditorOptions::default().with_cache_model(true));

    editor
        .format_content_model(
            |model, _| {
                model.blocks.clear();
                false
            },
            FormatContentModelOptions::new("noop"),
        )
        .expect("alive");

    assert!(editor.model().blocks.is_empty());
}

#[test]
fn committed_pass_announces_the_change() {
    let log = Log::default();
    let mut editor = Editor::new(EditorOptions::default().with_plugin(Recorder::new("rec", &log)));

    let changed = editor
        .format_content_model(
            |model, context| {
                context.skip_undo_snapshot = true;
                model.blocks.push(Paragraph::new().with_segment(Segment::text("new")).into());
                true
            },
            FormatContentModelOptions::new("append"),
        )
        .expect("alive");

    assert!(changed);
    assert_eq!(editor.model().blocks.len(), 2);
    assert_eq!(log.borrow().last().map(String::as_str), Some("rec:changed"));
}

#[test]
fn enter_and_backspace_split_and_join() {
    let mut editor = Editor::new(EditorOptions::default().with_model(two_lines()));

    assert!(editor.handle_key_down(KeyboardEvent::new(Key::Enter)).expect("alive"));
    assert_eq!(editor.model().blocks.len(), 3);

    assert!(editor.handle_key_down(KeyboardEvent::new(Key::Backspace)).expect("alive"));
    assert_eq!(editor.model().blocks.len(), 2);
    assert_eq!(first_paragraph(&editor).text(), "ab");
}

#[test]
fn dispose_keeps_going_after_a_failure() {
    let log = Log::default();
    let failures = Rc::new(RefCell::new(Vec::new()));
    let seen = Rc::clone(&failures);
    let mut failing = Recorder::new("a", &log);
    failing.fail_dispose = true;
    let mut editor = Editor::new(
        EditorOptions::default()
            .with_plugin(failing)
            .with_plugin(Recorder::new("b", &log))
            .with_dispose_error_handler(move |name, _| seen.borrow_mut().push(name.to_string())),
    );

    editor.dispose();

    assert!(editor.is_disposed());
    assert_eq!(failures.borrow().as_slice(), ["a"]);
    assert!(log.borrow().iter().any(|entry| entry == "b:before-dispose"));
    assert_eq!(editor.format_state(ConflictSolution::Remove), Err(EditorError::Disposed));
    assert_eq!(editor.handle_text_input("x"), Err(EditorError::Disposed));
}

#[test]
fn plugin_can_dispose_the_editor_from_its_handler() {
    let log = Log::default();
    let mut closer = Recorder::new("a", &log);
    closer.dispose_on_mouse_up = true;
    let mut editor = Editor::new(
        EditorOptions::default()
            .with_plugin(closer)
            .with_plugin(Recorder::new("b", &log)),
    );

    editor.trigger_event(PluginEvent::MouseUp).expect("alive");

    assert!(editor.is_disposed());
    assert_eq!(
        log.borrow().as_slice(),
        [
            "a:ready",
            "b:ready",
            "a:mouseup",
            "b:mouseup",
            "a:before-dispose",
            "b:before-dispose",
            "b:disposed",
            "a:disposed",
        ]
    );
    assert_eq!(editor.trigger_event(PluginEvent::MouseUp), Err(EditorError::Disposed));

    drop(editor);
    assert_eq!(log.borrow().iter().filter(|entry| entry.ends_with(":disposed")).count(), 2);
}
