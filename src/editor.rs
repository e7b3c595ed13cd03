//! The editor façade: owns the content model, the pending format and the
//! plugin list, and turns host input into plugin events.

use std::collections::VecDeque;
use std::mem;

use tracing::{debug, info, trace, warn};

use crate::editing::{FormatContext, delete_backward, delete_forward, insert_paragraph_break, insert_text_at_marker};
use crate::error::EditorError;
use crate::format_plugin::FormatPlugin;
use crate::format_state::{ConflictSolution, FormatState, retrieve_model_format_state};
use crate::model::{BlockGroup, Paragraph, Segment, SegmentFormat};
use crate::pending_format::{PendingFormat, PendingFormatState};
use crate::selection::{
    CaretMove, DomPosition, DomSelection, clear_selection, dom_selection_of, move_caret, select_image, select_range,
    select_table_cells, set_caret,
};

mod event;
mod options;
mod plugin;

pub use event::{ContentChangedEvent, Key, KeyboardEvent, PluginEvent};
pub use options::{DisposeErrorHandler, EditorOptions, Environment};
pub use plugin::EditorPlugin;

/// Describes one call of [`Editor::format_content_model`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormatContentModelOptions {
    pub api_name: String,
    /// Reported as the source of the resulting content change.
    pub change_source: String,
}

impl FormatContentModelOptions {
    pub fn new(api_name: impl Into<String>) -> Self {
        Self {
            api_name: api_name.into(),
            change_source: "Format".to_string(),
        }
    }

    pub fn with_change_source(mut self, source: impl Into<String>) -> Self {
        self.change_source = source.into();
        self
    }
}

pub struct Editor {
    model: BlockGroup,
    cache_model: bool,
    pending: PendingFormatState,
    plugins: Vec<Box<dyn EditorPlugin>>,
    queue: VecDeque<PluginEvent>,
    dispatching: bool,
    lifecycle: Lifecycle,
    environment: Environment,
    default_format: SegmentFormat,
    dispose_error_handler: Option<DisposeErrorHandler>,
}

impl Editor {
    pub fn new(options: EditorOptions) -> Self {
        let EditorOptions {
            default_segment_format,
            initial_model,
            plugins,
            format_plugin,
            dispose_error_handler,
            cache_model,
            environment,
        } = options;

        let model = initial_model.unwrap_or_else(|| empty_model(&default_segment_format));
        let mut all_plugins: Vec<Box<dyn EditorPlugin>> = Vec::with_capacity(plugins.len() + 1);
        all_plugins.push(Box::new(FormatPlugin::new(default_segment_format.clone(), format_plugin)));
        all_plugins.extend(plugins);

        let mut editor = Self {
            model,
            cache_model,
            pending: PendingFormatState::default(),
            plugins: Vec::new(),
            queue: VecDeque::new(),
            dispatching: false,
            lifecycle: Lifecycle::Alive,
            environment,
            default_format: default_segment_format,
            dispose_error_handler,
        };
        for plugin in &mut all_plugins {
            plugin.initialize(&mut editor);
        }
        editor.plugins = all_plugins;
        info!(plugins = editor.plugins.len(), cache_model, "editor created");

        editor.queue.push_back(PluginEvent::EditorReady);
        editor.flush_events();
        editor
    }

    pub fn model(&self) -> &BlockGroup {
        &self.model
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn default_format(&self) -> &SegmentFormat {
        &self.default_format
    }

    pub fn is_disposed(&self) -> bool {
        self.lifecycle != Lifecycle::Alive
    }

    // ==== Model access ====

    /// Runs `formatter` against the model. Unless the editor caches its
    /// model, the formatter works on a copy that is only committed when it
    /// reports a change. A committed change is announced to plugins; a
    /// pending format left in the context is captured at the caret either
    /// way.
    pub fn format_content_model<F>(&mut self, formatter: F, options: FormatContentModelOptions) -> Result<bool, EditorError>
    where
        F: FnOnce(&mut BlockGroup, &mut FormatContext) -> bool,
    {
        self.ensure_alive()?;
        let mut context = FormatContext::default();
        let changed = if self.cache_model {
            formatter(&mut self.model, &mut context)
        } else {
            let mut model = self.model.clone();
            let changed = formatter(&mut model, &mut context);
            if changed {
                self.model = model;
            }
            changed
        };
        trace!(api = %options.api_name, changed, "format pass finished");

        if changed {
            debug!(api = %options.api_name, entities = context.new_entities.len(), "content model committed");
            self.queue.push_back(PluginEvent::ContentChanged(ContentChangedEvent {
                source: options.change_source,
                skip_undo_snapshot: context.skip_undo_snapshot,
                new_entities: context.new_entities,
                deleted_entities: context.deleted_entities,
                new_images: context.new_images,
            }));
        }
        if let Some(format) = context.new_pending_format {
            match self.caret() {
                Some(position) => self.pending.capture(format, position),
                None => self.pending.discard(),
            }
        }

        self.flush_events();
        Ok(changed)
    }

    pub fn format_state(&self, conflict: ConflictSolution) -> Result<FormatState, EditorError> {
        self.ensure_alive()?;
        Ok(retrieve_model_format_state(&self.model, self.pending.format(), conflict))
    }

    // ==== Selection ====

    pub fn dom_selection(&self) -> Result<Option<DomSelection>, EditorError> {
        self.ensure_alive()?;
        Ok(dom_selection_of(&self.model))
    }

    /// Places the selection; `None` removes it. Returns `false` when the
    /// selection does not fit the model.
    pub fn set_dom_selection(&mut self, selection: Option<DomSelection>) -> Result<bool, EditorError> {
        self.ensure_alive()?;
        let applied = match &selection {
            None => {
                clear_selection(&mut self.model);
                true
            }
            Some(DomSelection::Range { start, end }) if start == end => set_caret(&mut self.model, start),
            Some(DomSelection::Range { start, end }) => select_range(&mut self.model, start, end),
            Some(DomSelection::Image { image }) => select_image(&mut self.model, image),
            Some(DomSelection::Table {
                table,
                first_row,
                first_column,
                last_row,
                last_column,
            }) => select_table_cells(
                &mut self.model,
                table,
                (*first_row, *first_column),
                (*last_row, *last_column),
            ),
        };
        if applied {
            self.announce_selection();
        }
        Ok(applied)
    }

    fn caret(&self) -> Option<DomPosition> {
        dom_selection_of(&self.model).and_then(|selection| selection.caret().cloned())
    }

    fn announce_selection(&mut self) {
        let selection = dom_selection_of(&self.model);
        self.trigger(PluginEvent::SelectionChanged(selection));
    }

    // ==== Pending format ====

    pub fn pending_format(&self) -> Option<&SegmentFormat> {
        self.pending.format()
    }

    pub fn pending_format_state(&self) -> &PendingFormatState {
        &self.pending
    }

    /// Parks `format` at the current caret.
    pub fn set_pending_format(&mut self, format: SegmentFormat) -> Result<(), EditorError> {
        self.ensure_alive()?;
        let position = self.caret().ok_or(EditorError::NoSelection)?;
        self.pending.capture(format, position);
        Ok(())
    }

    pub fn take_pending_format(&mut self) -> Option<PendingFormat> {
        self.pending.consume()
    }

    pub fn clear_pending_format(&mut self) {
        self.pending.discard();
    }

    /// Drops the pending format if the caret has left the position it was
    /// captured at.
    pub fn retain_pending_format(&mut self) {
        let caret = self.caret();
        self.pending.retain_at(caret.as_ref());
    }

    // ==== Host input ====

    /// Announces the key to plugins, then performs its default editing
    /// action. Returns whether the model or the selection changed.
    pub fn handle_key_down(&mut self, event: KeyboardEvent) -> Result<bool, EditorError> {
        self.ensure_alive()?;
        self.trigger(PluginEvent::KeyDown(event.clone()));

        match &event.key {
            Key::Character(ch) if event.is_character_value() => {
                let data = ch.to_string();
                Ok(self.native_input(&data, PluginEvent::Input { data: Some(data.clone()) }))
            }
            Key::Enter => Ok(self.native_edit(insert_paragraph_break)),
            Key::Backspace => Ok(self.native_edit(delete_backward)),
            Key::Delete => Ok(self.native_edit(delete_forward)),
            key => match caret_move_for(key, event.ctrl) {
                Some(movement) => {
                    let moved = move_caret(&mut self.model, movement, event.shift);
                    if moved {
                        self.announce_selection();
                    }
                    Ok(moved)
                }
                None => Ok(false),
            },
        }
    }

    /// Text committed outside of composition, e.g. a paste of plain text.
    pub fn handle_text_input(&mut self, text: &str) -> Result<(), EditorError> {
        self.ensure_alive()?;
        let event = PluginEvent::Input {
            data: Some(text.to_string()),
        };
        if self.native_input(text, event) { Ok(()) } else { Err(EditorError::NoSelection) }
    }

    pub fn handle_composition_end(&mut self, text: &str) -> Result<(), EditorError> {
        self.ensure_alive()?;
        let event = PluginEvent::CompositionEnd { data: text.to_string() };
        if self.native_input(text, event) { Ok(()) } else { Err(EditorError::NoSelection) }
    }

    /// A click that put the caret at `position`.
    pub fn handle_mouse_up(&mut self, position: &DomPosition) -> Result<bool, EditorError> {
        self.ensure_alive()?;
        let placed = set_caret(&mut self.model, position);
        if placed {
            self.announce_selection();
        }
        self.trigger(PluginEvent::MouseUp);
        Ok(placed)
    }

    pub fn trigger_event(&mut self, event: PluginEvent) -> Result<(), EditorError> {
        self.ensure_alive()?;
        self.trigger(event);
        Ok(())
    }

    fn native_input(&mut self, text: &str, event: PluginEvent) -> bool {
        if !insert_text_at_marker(&mut self.model, text) {
            return false;
        }
        self.trigger(event);
        true
    }

    fn native_edit(&mut self, edit: fn(&mut BlockGroup) -> bool) -> bool {
        if !edit(&mut self.model) {
            return false;
        }
        self.trigger(PluginEvent::Input { data: None });
        true
    }

    // ==== Events ====

    fn trigger(&mut self, event: PluginEvent) {
        self.queue.push_back(event);
        self.flush_events();
    }

    /// Delivers queued events. Re-entrant calls only enqueue; the outermost
    /// call keeps draining until the queue is empty.
    fn flush_events(&mut self) {
        if self.dispatching {
            return;
        }
        self.dispatching = true;
        let mut plugins = mem::take(&mut self.plugins);
        while let Some(event) = self.queue.pop_front() {
            trace!(?event, "dispatching plugin event");
            for plugin in &mut plugins {
                plugin.on_plugin_event(self, &event);
            }
            if self.lifecycle == Lifecycle::DisposeRequested {
                self.queue.clear();
                break;
            }
        }
        self.plugins = plugins;
        self.dispatching = false;

        if self.lifecycle == Lifecycle::DisposeRequested {
            self.lifecycle = Lifecycle::Alive;
            self.dispose();
        }
    }

    fn ensure_alive(&self) -> Result<(), EditorError> {
        if self.is_disposed() { Err(EditorError::Disposed) } else { Ok(()) }
    }

    // ==== Lifecycle ====

    /// Tells plugins the editor is going away and disposes them in reverse
    /// registration order. Every plugin gets disposed even if some fail;
    /// failures go to the dispose error handler. Called from a plugin
    /// handler, teardown waits until the current dispatch has finished.
    pub fn dispose(&mut self) {
        if matches!(self.lifecycle, Lifecycle::TearingDown | Lifecycle::Disposed) {
            return;
        }
        if self.dispatching {
            debug!("dispose requested during dispatch");
            self.lifecycle = Lifecycle::DisposeRequested;
            return;
        }
        self.lifecycle = Lifecycle::TearingDown;
        self.trigger(PluginEvent::BeforeDispose);

        let mut handler = self.dispose_error_handler.take();
        let plugins = mem::take(&mut self.plugins);
        for mut plugin in plugins.into_iter().rev() {
            if let Err(error) = plugin.dispose() {
                match handler.as_mut() {
                    Some(handler) => handler(plugin.name(), &error),
                    None => warn!(plugin = plugin.name(), %error, "plugin failed to dispose"),
                }
            }
        }
        self.pending.discard();
        self.queue.clear();
        self.lifecycle = Lifecycle::Disposed;
        info!("editor disposed");
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Lifecycle {
    Alive,
    /// A plugin called `dispose` mid-dispatch; teardown runs once the
    /// plugins are back in place.
    DisposeRequested,
    TearingDown,
    Disposed,
}

impl Drop for Editor {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn empty_model(format: &SegmentFormat) -> BlockGroup {
    BlockGroup::document_with_format(format.clone())
        .with_block(Paragraph::new().with_segments(vec![Segment::marker(SegmentFormat::default()), Segment::br()]))
}

fn caret_move_for(key: &Key, ctrl: bool) -> Option<CaretMove> {
    let movement = match key {
        Key::ArrowLeft if ctrl => CaretMove::WordLeft,
        Key::ArrowLeft => CaretMove::Left,
        Key::ArrowRight if ctrl => CaretMove::WordRight,
        Key::ArrowRight => CaretMove::Right,
        Key::ArrowUp => CaretMove::Up,
        Key::ArrowDown => CaretMove::Down,
        Key::Home if ctrl => CaretMove::DocumentStart,
        Key::Home => CaretMove::LineStart,
        Key::End if ctrl => CaretMove::DocumentEnd,
        Key::End => CaretMove::LineEnd,
        Key::PageUp => CaretMove::DocumentStart,
        Key::PageDown => CaretMove::DocumentEnd,
        _ => return None,
    };
    Some(movement)
}

#[cfg(test)]
#[path = "editor_tests.rs"]
mod editor_tests;
