//! Renderer interface.
//!
//! The session engine never owns the render surface. It holds a [`Weak`]
//! back-reference in a [`RendererSlot`]; every callback is skipped when no renderer
//! is attached or it has already been dropped.

use std::sync::{Arc, RwLock, Weak};

use crate::protocol::{Board, Timestamp};

/// Callbacks the dispatchers make into the UI.
///
/// Called from background threads; implementations marshal to their own UI thread
/// if they need to.
pub trait Renderer: Send + Sync {
    fn update_board(&self, board: &Board);

    /// `winner` is `None` for a drawn game.
    fn show_game_over(&self, winner: Option<&str>);

    fn display_chat(&self, text: &str, timestamp: Timestamp);

    /// Enter the disconnected state and release resources. May be called more than once.
    fn shutdown(&self);
}

/// Optional, non-owning reference to the renderer.
#[derive(Default)]
pub struct RendererSlot {
    inner: RwLock<Option<Weak<dyn Renderer>>>,
}

impl RendererSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&self, renderer: &Arc<dyn Renderer>) {
        let mut slot = self.inner.write().unwrap_or_else(|e| e.into_inner());
        *slot = Some(Arc::downgrade(renderer));
    }

    pub fn detach(&self) {
        let mut slot = self.inner.write().unwrap_or_else(|e| e.into_inner());
        *slot = None;
    }

    /// Upgrade the reference, if a live renderer is attached.
    ///
    /// The lock is released before the caller uses the renderer.
    pub fn get(&self) -> Option<Arc<dyn Renderer>> {
        let slot = self.inner.read().unwrap_or_else(|e| e.into_inner());
        slot.as_ref().and_then(Weak::upgrade)
    }

    /// Run `f` against the renderer; no-op when absent.
    pub fn with<F: FnOnce(&dyn Renderer)>(&self, f: F) {
        if let Some(renderer) = self.get() {
            f(renderer.as_ref());
        }
    }

    pub fn is_attached(&self) -> bool {
        self.get().is_some()
    }
}

impl std::fmt::Debug for RendererSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RendererSlot")
            .field("attached", &self.is_attached())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingRenderer, RenderCall};

    #[test]
    fn test_absent_renderer_is_skipped() {
        let slot = RendererSlot::new();
        let mut called = false;
        slot.with(|_| called = true);
        assert!(!called);
        assert!(!slot.is_attached());
    }

    #[test]
    fn test_attached_renderer_receives_calls() {
        let recorder = Arc::new(RecordingRenderer::default());
        let renderer: Arc<dyn Renderer> = recorder.clone();
        let slot = RendererSlot::new();
        slot.attach(&renderer);

        slot.with(|r| r.show_game_over(Some("black")));
        assert_eq!(
            recorder.calls(),
            vec![RenderCall::GameOver(Some("black".to_string()))]
        );
    }

    #[test]
    fn test_dropped_renderer_is_skipped() {
        let slot = RendererSlot::new();
        {
            let renderer: Arc<dyn Renderer> = Arc::new(RecordingRenderer::default());
            slot.attach(&renderer);
            assert!(slot.is_attached());
        }
        assert!(!slot.is_attached());
        slot.with(|r| r.shutdown());
    }

    #[test]
    fn test_detach() {
        let renderer: Arc<dyn Renderer> = Arc::new(RecordingRenderer::default());
        let slot = RendererSlot::new();
        slot.attach(&renderer);
        slot.detach();
        assert!(!slot.is_attached());
    }
}
