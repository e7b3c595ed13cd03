use crate::format_plugin::FormatPluginOptions;
use crate::model::{BlockGroup, SegmentFormat};

use super::EditorPlugin;

/// Called with the plugin name for each plugin that fails to dispose.
pub type DisposeErrorHandler = Box<dyn FnMut(&str, &anyhow::Error)>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Environment {
    pub is_android: bool,
    pub is_mac: bool,
}

#[derive(Default)]
pub struct EditorOptions {
    /// Format new text gets when nothing more specific applies.
    pub default_segment_format: SegmentFormat,
    pub initial_model: Option<BlockGroup>,
    pub plugins: Vec<Box<dyn EditorPlugin>>,
    pub format_plugin: FormatPluginOptions,
    pub dispose_error_handler: Option<DisposeErrorHandler>,
    /// Format passes edit the live model instead of a copy that is only
    /// committed on change.
    pub cache_model: bool,
    pub environment: Environment,
}

impl EditorOptions {
    pub fn with_default_format(mut self, format: SegmentFormat) -> Self {
        self.default_segment_format = format;
        self
    }

    pub fn with_model(mut self, model: BlockGroup) -> Self {
        self.initial_model = Some(model);
        self
    }

    pub fn with_plugin(mut self, plugin: impl EditorPlugin + 'static) -> Self {
        self.plugins.push(Box::new(plugin));
        self
    }

    pub fn with_format_plugin(mut self, options: FormatPluginOptions) -> Self {
        self.format_plugin = options;
        self
    }

    pub fn with_dispose_error_handler(mut self, handler: impl FnMut(&str, &anyhow::Error) + 'static) -> Self {
        self.dispose_error_handler = Some(Box::new(handler));
        self
    }

    pub fn with_cache_model(mut self, cache_model: bool) -> Self {
        self.cache_model = cache_model;
        self
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }
}
