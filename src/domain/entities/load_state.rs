//! Per-instance loading state.

use super::ResolvedHandle;

/// Main-image state of one display instance.
#[derive(Debug, Default)]
pub enum LoadState {
    /// Nothing requested yet, or waiting for visibility.
    #[default]
    Idle,
    /// A resolve is in flight.
    Loading,
    /// A handle (cached or fallback) is ready for the renderer.
    Loaded(ResolvedHandle),
    /// The renderer failed to display the resolved image.
    Errored,
}

impl LoadState {
    /// Returns the handle-free status.
    #[must_use]
    pub const fn status(&self) -> LoadStatus {
        match self {
            Self::Idle => LoadStatus::Idle,
            Self::Loading => LoadStatus::Loading,
            Self::Loaded(_) => LoadStatus::Loaded,
            Self::Errored => LoadStatus::Errored,
        }
    }

    /// Returns the loaded handle, if any.
    #[must_use]
    pub const fn handle(&self) -> Option<&ResolvedHandle> {
        match self {
            Self::Loaded(handle) => Some(handle),
            _ => None,
        }
    }
}

/// Status reported to the rendering layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadStatus {
    /// Not started.
    #[default]
    Idle,
    /// Resolving.
    Loading,
    /// Ready to render.
    Loaded,
    /// Render failed.
    Errored,
}

impl LoadStatus {
    /// Returns true while a resolve is in flight.
    #[must_use]
    pub const fn is_loading(self) -> bool {
        matches!(self, Self::Loading)
    }

    /// Returns true once a handle is available.
    #[must_use]
    pub const fn is_loaded(self) -> bool {
        matches!(self, Self::Loaded)
    }
}

/// Snapshot of an instance's output, published to the rendering layer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImageView {
    /// Main-image status.
    pub status: LoadStatus,
    /// URI of the main handle (cached or fallback) once loaded.
    pub uri: Option<String>,
    /// URI of the preview handle, if a preview is configured.
    pub preview_uri: Option<String>,
    /// Set only when rendering the resolved image failed.
    pub has_error: bool,
    /// Set when the main image replaced a visible preview and should fade in.
    pub crossfade: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(LoadState::default().status(), LoadStatus::Idle);
        assert!(LoadState::Loading.status().is_loading());

        let loaded = LoadState::Loaded(ResolvedHandle::remote("https://x/a.png"));
        assert!(loaded.status().is_loaded());
        assert_eq!(loaded.handle().map(ResolvedHandle::uri), Some("https://x/a.png"));
        assert!(LoadState::Errored.handle().is_none());
    }
}
