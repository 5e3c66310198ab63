//! 遮罩层控制
//!
//! 每次显示或隐藏之后固定等待一段过渡时间，让界面动画结束后再继续修改状态。
//! 重复显示同一个遮罩、或在没有遮罩时隐藏，都不会通知界面也不会等待。

use crate::im::thread::listener::ThreadViewListener;
use crate::im::thread::models::Overlay;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub struct OverlayController {
    current: Option<Overlay>,
    transition: Duration,
    listener: Arc<dyn ThreadViewListener>,
}

impl OverlayController {
    pub fn new(listener: Arc<dyn ThreadViewListener>, transition: Duration) -> Self {
        Self {
            current: None,
            transition,
            listener,
        }
    }

    pub fn current(&self) -> Option<Overlay> {
        self.current
    }

    pub async fn show(&mut self, overlay: Overlay) {
        if self.current == Some(overlay) {
            return;
        }
        debug!("[Overlay] 显示遮罩: {:?}", overlay);
        self.current = Some(overlay);
        self.listener.on_overlay_changed(Some(overlay)).await;
        self.settle().await;
    }

    pub async fn hide(&mut self) {
        let Some(previous) = self.current.take() else {
            return;
        };
        debug!("[Overlay] 隐藏遮罩: {:?}", previous);
        self.listener.on_overlay_changed(None).await;
        self.settle().await;
    }

    async fn settle(&self) {
        if !self.transition.is_zero() {
            tokio::time::sleep(self.transition).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::im::test_support::{Recorded, RecordingListener};
    use crate::im::thread::models::LoadingReason;

    #[tokio::test]
    async fn duplicate_show_and_idle_hide_are_silent() {
        let listener = Arc::new(RecordingListener::default());
        let mut overlay = OverlayController::new(listener.clone(), Duration::ZERO);

        overlay.hide().await;
        overlay.show(Overlay::Offline).await;
        overlay.show(Overlay::Offline).await;
        overlay
            .show(Overlay::Loading(LoadingReason::Connecting))
            .await;
        overlay.hide().await;
        overlay.hide().await;

        assert_eq!(
            listener.recorded(),
            vec![
                Recorded::Overlay(Some(Overlay::Offline)),
                Recorded::Overlay(Some(Overlay::Loading(LoadingReason::Connecting))),
                Recorded::Overlay(None),
            ]
        );
        assert_eq!(overlay.current(), None);
    }

    #[tokio::test]
    async fn transitions_wait_for_the_configured_delay() {
        let listener = Arc::new(RecordingListener::default());
        let mut overlay = OverlayController::new(listener, Duration::from_millis(30));

        let started = tokio::time::Instant::now();
        overlay.show(Overlay::Offline).await;
        overlay.hide().await;
        assert!(started.elapsed() >= Duration::from_millis(60));
    }
}
