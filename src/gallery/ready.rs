//! One-shot completion signal emitted by the render pipeline.
//!
//! Deep-link activation may start before the manifest has been read. Waiters
//! park on the signal instead of polling the image index.

use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderState {
    Pending,
    /// Rendering finished with this many images.
    Rendered(usize),
    /// The manifest could not be loaded; nothing will ever render.
    Failed,
}

/// Sending half, owned by whoever renders the gallery.
#[derive(Debug)]
pub struct RenderNotifier {
    tx: watch::Sender<RenderState>,
}

/// Receiving half; cheap to clone.
#[derive(Debug, Clone)]
pub struct ReadySignal {
    rx: watch::Receiver<RenderState>,
}

pub fn render_signal() -> (RenderNotifier, ReadySignal) {
    let (tx, rx) = watch::channel(RenderState::Pending);
    (RenderNotifier { tx }, ReadySignal { rx })
}

impl RenderNotifier {
    pub fn rendered(&self, image_count: usize) {
        self.tx.send_replace(RenderState::Rendered(image_count));
    }

    pub fn failed(&self) {
        self.tx.send_replace(RenderState::Failed);
    }
}

impl ReadySignal {
    pub fn state(&self) -> RenderState {
        *self.rx.borrow()
    }

    /// Waits until rendering settles. Returns the image count, or `None` when
    /// rendering failed or the notifier went away first.
    pub async fn wait(&mut self) -> Option<usize> {
        let state = self
            .rx
            .wait_for(|state| *state != RenderState::Pending)
            .await
            .ok()
            .map(|state| *state)?;
        match state {
            RenderState::Rendered(count) => Some(count),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_waiter_resumes_after_render() {
        let (notifier, signal) = render_signal();
        let mut waiter = signal.clone();
        let handle = tokio::spawn(async move { waiter.wait().await });

        tokio::task::yield_now().await;
        assert_eq!(signal.state(), RenderState::Pending);
        notifier.rendered(7);

        assert_eq!(handle.await.unwrap(), Some(7));
    }

    #[tokio::test]
    async fn test_late_waiter_sees_completed_state() {
        let (notifier, mut signal) = render_signal();
        notifier.rendered(2);
        assert_eq!(signal.wait().await, Some(2));
    }

    #[tokio::test]
    async fn test_failure_and_dropped_notifier() {
        let (notifier, mut signal) = render_signal();
        notifier.failed();
        assert_eq!(signal.wait().await, None);

        let (notifier, mut signal) = render_signal();
        drop(notifier);
        assert_eq!(signal.wait().await, None);
    }
}
