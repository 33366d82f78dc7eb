use serde::Deserialize;

/// Dispatch policy of an [`Engine`](super::Engine).
///
/// Deserializable, so it can live in an application's configuration file.
/// Missing fields take their default.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Redirect `/foo/` to `/foo` (or the reverse) when only the other form
    /// is registered. Default: `true`.
    pub redirect_trailing_slash: bool,

    /// On a miss, clean the path, then retry it case-insensitively and
    /// redirect to the registered spelling. Default: `false`.
    pub redirect_fixed_path: bool,

    /// Answer 405 with an `Allow` header when another method matches.
    /// Default: `true`.
    pub handle_method_not_allowed: bool,

    /// Clean the path before looking it up. Default: `false`.
    pub remove_extra_slash: bool,

    /// Percent-decode parameter values. Default: `true`.
    pub unescape_path_values: bool,

    /// Upper bound of recycled contexts kept around. Default: `1024`.
    pub max_idle_contexts: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            redirect_trailing_slash: true,
            redirect_fixed_path: false,
            handle_method_not_allowed: true,
            remove_extra_slash: false,
            unescape_path_values: true,
            max_idle_contexts: 1024,
        }
    }
}
