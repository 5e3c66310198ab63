//! 协调器的入站事件

use crate::im::client::OutgoingMessage;
use crate::im::types::{AgentInfo, ChatMode, ChatState, ThreadSnapshot};
use uuid::Uuid;

/// 协调器按到达顺序逐个处理的事件
#[derive(Debug, Clone)]
pub enum ThreadEvent {
    /// SDK：聊天状态或模式变化
    ChatStateChanged { state: ChatState, mode: ChatMode },
    /// SDK：线程快照变化
    ThreadChanged(ThreadSnapshot),
    /// SDK：坐席输入状态变化
    AgentTyping {
        is_typing: bool,
        agent: AgentInfo,
        thread_id: Uuid,
    },
    /// 应用回到前台，需要重新加载线程
    RefreshRequested,
    /// 用户发送消息
    SendMessage(OutgoingMessage),
    /// 用户上拉加载更早的消息
    LoadMore,
}

impl ThreadEvent {
    /// 日志中使用的事件名
    pub fn name(&self) -> &'static str {
        match self {
            ThreadEvent::ChatStateChanged { .. } => "ChatStateChanged",
            ThreadEvent::ThreadChanged(_) => "ThreadChanged",
            ThreadEvent::AgentTyping { .. } => "AgentTyping",
            ThreadEvent::RefreshRequested => "RefreshRequested",
            ThreadEvent::SendMessage(_) => "SendMessage",
            ThreadEvent::LoadMore => "LoadMore",
        }
    }
}
