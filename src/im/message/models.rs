//! 消息本地模型定义

use crate::im::message::types::ContentPart;
use crate::im::serialization::generate_msg_id;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 消息投递状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum DeliveryStatus {
    #[default]
    Sent,
    Delivered,
    Seen,
    Failed,
}

/// 消息发送者
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSender {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    /// 是否为坐席（或机器人）发出
    #[serde(default)]
    pub is_agent: bool,
}

impl MessageSender {
    pub fn agent(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            is_agent: true,
        }
    }

    pub fn customer(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            is_agent: false,
        }
    }

    /// 是否为本机用户（客户端一侧只有客户本人不是坐席）
    pub fn is_local_user(&self) -> bool {
        !self.is_agent
    }
}

/// 聊天消息（不可变记录）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub sender: MessageSender,
    /// 进入 UI 层的消息至少包含一个片段
    pub contents: Vec<ContentPart>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub status: DeliveryStatus,
}

impl Message {
    pub fn new(sender: MessageSender, contents: Vec<ContentPart>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: generate_msg_id(),
            sender,
            contents,
            created_at,
            status: DeliveryStatus::Sent,
        }
    }

    /// 是否只包含富内容（这类消息永远单独成组）
    pub fn is_rich_content_only(&self) -> bool {
        !self.contents.is_empty() && self.contents.iter().all(ContentPart::is_rich)
    }

    /// 返回附件在前、其他片段在后的副本（稳定排序，不改变同类片段的相对顺序）
    pub fn sorted_for_display(&self) -> Self {
        let mut sorted = self.clone();
        sorted.contents.sort_by_key(|part| !part.is_attachment());
        sorted
    }

    /// 用于日志的简短摘要
    pub fn summary(&self) -> String {
        self.contents
            .iter()
            .map(ContentPart::summary)
            .collect::<Vec<_>>()
            .join(" ")
    }
}
