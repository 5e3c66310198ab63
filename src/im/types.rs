//! SDK 侧共享类型定义
//!
//! 这些结构体对应外部聊天 SDK 回调中携带的数据（聊天状态、会话模式、线程快照），
//! 本 crate 只读取它们，不负责维护。

use crate::im::message::models::Message;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// SDK 的聊天连接状态（对应 `onChatUpdated` 回调的 state 参数）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum ChatState {
    /// 尚未初始化
    #[default]
    Initial,
    /// 正在准备（拉取渠道配置）
    Preparing,
    /// 已准备，尚未连接
    Prepared,
    /// 正在连接
    Connecting,
    /// 已连接，线程尚未就绪
    Connected,
    /// 已就绪，可以收发消息
    Ready,
    /// 服务不可用（live chat 无可用坐席 / 非营业时间）
    Offline,
}

impl ChatState {
    /// 是否已经可以操作线程
    pub fn is_ready(self) -> bool {
        matches!(self, ChatState::Ready)
    }

    /// 是否处于连接过程中
    pub fn is_connecting(self) -> bool {
        matches!(
            self,
            ChatState::Preparing
                | ChatState::Prepared
                | ChatState::Connecting
                | ChatState::Connected
        )
    }
}

/// 会话模式（对应 `onChatUpdated` 回调的 mode 参数）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum ChatMode {
    /// 单线程：客户只有一个持续的会话
    #[default]
    SingleThread,
    /// 多线程：客户可以同时拥有多个会话
    MultiThread,
    /// 实时聊天：基于排队和坐席分配
    LiveChat,
}

/// 线程状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum ThreadStatus {
    /// 本地新建，服务端尚未创建
    #[default]
    Pending,
    /// 元数据已加载，消息历史不完整
    Loaded,
    /// 完整可用
    Ready,
    /// 已关闭
    Closed,
}

/// 坐席信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentInfo {
    pub id: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub nickname: Option<String>,
}

impl AgentInfo {
    /// 展示名称：优先昵称，否则使用全名
    pub fn display_name(&self) -> String {
        match &self.nickname {
            Some(nickname) if !nickname.is_empty() => nickname.clone(),
            _ => format!("{} {}", self.first_name, self.last_name)
                .trim()
                .to_string(),
        }
    }
}

/// 线程快照（SDK 推送的只读副本）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadSnapshot {
    pub id: Uuid,
    #[serde(default)]
    pub status: ThreadStatus,
    /// 按时间顺序排列的消息
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub position_in_queue: Option<u32>,
    #[serde(default)]
    pub assigned_agent: Option<AgentInfo>,
    #[serde(default)]
    pub last_assigned_agent: Option<AgentInfo>,
    #[serde(default)]
    pub has_more_messages_to_load: bool,
}

impl ThreadSnapshot {
    /// 创建一个空的新线程快照
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            status: ThreadStatus::Pending,
            messages: Vec::new(),
            name: None,
            position_in_queue: None,
            assigned_agent: None,
            last_assigned_agent: None,
            has_more_messages_to_load: false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.status == ThreadStatus::Closed
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// 是否曾经分配过坐席
    pub fn has_agent(&self) -> bool {
        self.assigned_agent.is_some() || self.last_assigned_agent.is_some()
    }
}

/// 排队位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "value")]
pub enum QueuePosition {
    /// 位置未知（界面只显示“排队中”，不显示数字）
    Unknown,
    /// SDK 报告的具体位置
    Known(u32),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_display_name_prefers_nickname() {
        let mut agent = AgentInfo {
            id: "agent-1".to_string(),
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            nickname: None,
        };
        assert_eq!(agent.display_name(), "Jane Doe");

        agent.nickname = Some("JD".to_string());
        assert_eq!(agent.display_name(), "JD");

        agent.nickname = Some(String::new());
        assert_eq!(agent.display_name(), "Jane Doe");
    }

    #[test]
    fn thread_snapshot_deserializes_with_defaults() {
        let json = r#"{"id":"6f1c2a34-0b7e-4d1a-9c53-8e2f1a0b9c77","status":"loaded"}"#;
        let thread: ThreadSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(thread.status, ThreadStatus::Loaded);
        assert!(thread.messages.is_empty());
        assert!(!thread.has_more_messages_to_load);
        assert!(!thread.has_agent());
    }

    #[test]
    fn chat_state_classification() {
        assert!(ChatState::Ready.is_ready());
        assert!(ChatState::Connected.is_connecting());
        assert!(!ChatState::Offline.is_connecting());
        assert!(!ChatState::Initial.is_connecting());
    }
}
