//! SDK 事件回调接口
//!
//! SDK 在自己的回调线程里调用这些方法，实现方必须可以并发、可重入地被调用。

use crate::im::types::{AgentInfo, ChatMode, ChatState, ThreadSnapshot};
use async_trait::async_trait;
use uuid::Uuid;

/// SDK 事件回调
#[async_trait]
pub trait ChatDelegate: Send + Sync {
    /// 聊天连接状态或会话模式变化
    async fn on_chat_updated(&self, state: ChatState, mode: ChatMode);

    /// 某个线程的快照发生变化
    async fn on_thread_updated(&self, thread: ThreadSnapshot);

    /// 坐席输入状态变化
    async fn on_agent_typing(&self, is_typing: bool, agent: AgentInfo, thread_id: Uuid);
}

/// 空回调实现（默认）
pub struct EmptyChatDelegate;

#[async_trait]
impl ChatDelegate for EmptyChatDelegate {
    async fn on_chat_updated(&self, _state: ChatState, _mode: ChatMode) {}
    async fn on_thread_updated(&self, _thread: ThreadSnapshot) {}
    async fn on_agent_typing(&self, _is_typing: bool, _agent: AgentInfo, _thread_id: Uuid) {}
}
