//! 会话视图监听器回调接口

use crate::im::error::ChatAlert;
use crate::im::thread::models::{Overlay, ThreadViewSnapshot};
use async_trait::async_trait;

/// 会话视图监听器（由界面层实现）
#[async_trait]
pub trait ThreadViewListener: Send + Sync {
    /// 一次协调完成后的最新状态
    async fn on_view_state_changed(&self, snapshot: ThreadViewSnapshot);

    /// 遮罩层变化，`None` 表示隐藏
    async fn on_overlay_changed(&self, overlay: Option<Overlay>);

    /// 需要弹出提示框
    async fn on_alert(&self, alert: ChatAlert);

    /// 聊天窗口应当关闭
    async fn on_chat_dismissed(&self);
}

/// 空实现（默认监听器）
pub struct EmptyThreadViewListener;

#[async_trait]
impl ThreadViewListener for EmptyThreadViewListener {
    async fn on_view_state_changed(&self, _snapshot: ThreadViewSnapshot) {}
    async fn on_overlay_changed(&self, _overlay: Option<Overlay>) {}
    async fn on_alert(&self, _alert: ChatAlert) {}
    async fn on_chat_dismissed(&self) {}
}
