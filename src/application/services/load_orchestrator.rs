//! Per-instance image loading lifecycle.
//!
//! A [`LoadOrchestrator`] drives one display instance through
//! `Idle -> Loading -> Loaded | Errored`. Resolves run as spawned tasks and
//! are never cancelled; instead every task re-checks the instance's liveness
//! token and generation before touching state, and hands its handle back for
//! release when the result is stale.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, trace, warn};

use super::CacheManager;
use crate::application::dto::{ImageRequest, PreviewSource};
use crate::domain::entities::{ImageView, LoadState, LoadStatus, ResolvedHandle};

struct Inner {
    request: ImageRequest,
    visible: bool,
    generation: u64,
    preview_generation: u64,
    state: LoadState,
    preview: Option<ResolvedHandle>,
    crossfade: bool,
}

impl Inner {
    fn view(&self) -> ImageView {
        ImageView {
            status: self.state.status(),
            uri: self.state.handle().map(|h| h.uri().to_string()),
            preview_uri: self.preview.as_ref().map(|h| h.uri().to_string()),
            has_error: matches!(self.state, LoadState::Errored),
            crossfade: self.crossfade,
        }
    }

    fn should_resolve(&self) -> bool {
        matches!(self.state, LoadState::Idle) && (!self.request.lazy || self.visible)
    }
}

struct Shared {
    inner: Mutex<Inner>,
    alive: AtomicBool,
    view_tx: watch::Sender<ImageView>,
}

impl Shared {
    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    fn publish(&self, inner: &Inner) {
        self.view_tx.send_replace(inner.view());
    }
}

/// Lifecycle controller for one image display instance.
///
/// Dropping the orchestrator unmounts it.
pub struct LoadOrchestrator {
    manager: Arc<CacheManager>,
    shared: Arc<Shared>,
}

impl LoadOrchestrator {
    /// Mounts an instance and starts resolving unless it is lazy.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn mount(manager: Arc<CacheManager>, request: ImageRequest) -> Self {
        let preview = request.preview.clone();
        let inner = Inner {
            request,
            visible: false,
            generation: 0,
            preview_generation: 0,
            state: LoadState::Idle,
            preview: None,
            crossfade: false,
        };
        let (view_tx, _) = watch::channel(inner.view());

        let orchestrator = Self {
            manager,
            shared: Arc::new(Shared {
                inner: Mutex::new(inner),
                alive: AtomicBool::new(true),
                view_tx,
            }),
        };

        if let Some(preview) = preview {
            orchestrator.load_preview(0, preview);
        }
        orchestrator.maybe_resolve();
        orchestrator
    }

    /// Returns the current output snapshot.
    #[must_use]
    pub fn view(&self) -> ImageView {
        self.shared.view_tx.borrow().clone()
    }

    /// Subscribes to output snapshots.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ImageView> {
        self.shared.view_tx.subscribe()
    }

    /// Returns the main-image status.
    #[must_use]
    pub fn status(&self) -> LoadStatus {
        self.view().status
    }

    /// Returns true until [`LoadOrchestrator::unmount`] is called.
    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.shared.is_alive()
    }

    /// Reports whether the instance intersects the viewport.
    ///
    /// A lazy instance resolves once, on its first visible report.
    pub fn set_visible(&self, visible: bool) {
        if !self.shared.is_alive() {
            return;
        }
        {
            let mut inner = self.shared.inner.lock();
            if inner.visible == visible {
                return;
            }
            trace!(key = %inner.request.key, visible, "Visibility changed");
            inner.visible = visible;
        }
        self.maybe_resolve();
    }

    /// Replaces the instance input.
    ///
    /// A new URI or key releases the current image and resolves again; other
    /// changes only update the stored input.
    pub fn set_source(&self, request: ImageRequest) {
        if !self.shared.is_alive() {
            return;
        }

        let (released, preview_released, preview_job) = {
            let mut inner = self.shared.inner.lock();

            let preview_job = if inner.request.preview == request.preview {
                None
            } else {
                inner.preview_generation += 1;
                Some((inner.preview_generation, request.preview.clone()))
            };
            let preview_released = preview_job.as_ref().and_then(|_| inner.preview.take());

            let released = if inner.request.same_target(&request) {
                None
            } else {
                debug!(from = %inner.request.key, to = %request.key, "Image source changed");
                inner.generation += 1;
                inner.crossfade = false;
                Some(std::mem::take(&mut inner.state))
            };

            inner.request = request;
            self.shared.publish(&inner);
            (released, preview_released, preview_job)
        };
        drop(released);
        drop(preview_released);

        if let Some((generation, Some(preview))) = preview_job {
            self.load_preview(generation, preview);
        }
        self.maybe_resolve();
    }

    /// Reports that the renderer failed to display the resolved image.
    pub fn report_render_error(&self) {
        if !self.shared.is_alive() {
            return;
        }
        let released = {
            let mut inner = self.shared.inner.lock();
            if !matches!(inner.state, LoadState::Loaded(_)) {
                return;
            }
            warn!(key = %inner.request.key, "Renderer failed to display image");
            inner.crossfade = false;
            let released = std::mem::replace(&mut inner.state, LoadState::Errored);
            self.shared.publish(&inner);
            released
        };
        drop(released);
    }

    /// Reports that the main image is on screen and the cross-fade finished.
    pub fn report_rendered(&self) {
        if !self.shared.is_alive() {
            return;
        }
        let mut inner = self.shared.inner.lock();
        if inner.crossfade {
            inner.crossfade = false;
            self.shared.publish(&inner);
        }
    }

    /// Tears the instance down, releasing held handles exactly once.
    ///
    /// In-flight resolves keep running; their results are released on arrival.
    pub fn unmount(&self) {
        let (state, preview) = {
            let mut inner = self.shared.inner.lock();
            if !self.shared.alive.swap(false, Ordering::AcqRel) {
                return;
            }
            debug!(key = %inner.request.key, "Unmounting image instance");
            (std::mem::take(&mut inner.state), inner.preview.take())
        };
        drop(state);
        drop(preview);
    }

    fn maybe_resolve(&self) {
        let job = {
            let mut inner = self.shared.inner.lock();
            if !inner.should_resolve() {
                return;
            }
            inner.state = LoadState::Loading;
            self.shared.publish(&inner);
            (
                inner.generation,
                inner.request.image.clone(),
                inner.request.key.clone(),
                inner.request.expires_in,
            )
        };
        let (generation, image, key, expires_in) = job;

        let manager = self.manager.clone();
        let shared = self.shared.clone();
        tokio::spawn(async move {
            let handle = manager.resolve(&image, &key, expires_in).await;

            let stale = {
                let mut inner = shared.inner.lock();
                if shared.is_alive() && inner.generation == generation {
                    inner.crossfade = inner.preview.is_some();
                    inner.state = LoadState::Loaded(handle);
                    shared.publish(&inner);
                    None
                } else {
                    Some(handle)
                }
            };

            if let Some(handle) = stale {
                debug!(key = %key, kind = %handle.kind(), "Discarding stale resolve");
                drop(handle);
            }
        });
    }

    fn load_preview(&self, generation: u64, preview: PreviewSource) {
        let manager = self.manager.clone();
        let shared = self.shared.clone();
        tokio::spawn(async move {
            let handle = manager
                .peek(&preview.key)
                .await
                .unwrap_or_else(|| ResolvedHandle::remote(&preview.uri));

            let stale = {
                let mut inner = shared.inner.lock();
                if shared.is_alive() && inner.preview_generation == generation {
                    trace!(key = %preview.key, kind = %handle.kind(), "Preview ready");
                    let replaced = inner.preview.replace(handle);
                    shared.publish(&inner);
                    replaced
                } else {
                    Some(handle)
                }
            };
            drop(stale);
        });
    }
}

impl Drop for LoadOrchestrator {
    fn drop(&mut self) {
        self.unmount();
    }
}

impl std::fmt::Debug for LoadOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadOrchestrator")
            .field("mounted", &self.is_mounted())
            .field("view", &self.view())
            .finish_non_exhaustive()
    }
}
