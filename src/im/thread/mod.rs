//! 会话视图模块
//!
//! 单个会话视图的状态协调：接收 SDK 事件与用户操作，串行地把它们合并成界面状态。

pub mod events;
pub mod listener;
pub mod models;
pub mod overlay;
pub mod reconciler;

// 重新导出主要类型
pub use events::ThreadEvent;
pub use listener::{EmptyThreadViewListener, ThreadViewListener};
pub use models::{
    EndConversationAction, LoadingReason, Overlay, ThreadViewConfig, ThreadViewSnapshot,
    ThreadViewState, UiPhase, DEFAULT_OVERLAY_TRANSITION,
};
pub use overlay::OverlayController;
pub use reconciler::{queue_position, ThreadHandle, ThreadStateReconciler};
