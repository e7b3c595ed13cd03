use super::{Editor, PluginEvent};

/// A participant in the editor's event stream. Plugins are called in
/// registration order; events they trigger while handling one are queued
/// and delivered after the current event has reached every plugin.
pub trait EditorPlugin {
    fn name(&self) -> &str;

    fn initialize(&mut self, _editor: &mut Editor) {}

    fn on_plugin_event(&mut self, editor: &mut Editor, event: &PluginEvent);

    /// A failing plugin does not stop the others from being disposed.
    fn dispose(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}
