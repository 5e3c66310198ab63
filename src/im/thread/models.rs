//! 会话视图的配置、工作状态与对外快照

use crate::im::message::attachment::FileRestrictions;
use crate::im::message::grouping::{MessageGroup, DEFAULT_GROUPING_INTERVAL};
use crate::im::serialization::{deserialize_duration_millis, deserialize_duration_secs};
use crate::im::thread::events::ThreadEvent;
use crate::im::types::{AgentInfo, ChatMode, ChatState, QueuePosition, ThreadSnapshot};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::time::Duration;
use uuid::Uuid;

/// 遮罩层过渡动画的默认等待时长
pub const DEFAULT_OVERLAY_TRANSITION: Duration = Duration::from_millis(500);

/// 会话视图配置
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThreadViewConfig {
    /// 消息分组间隔（JSON 中以秒表示）
    #[serde(
        rename = "groupingIntervalSecs",
        deserialize_with = "deserialize_duration_secs"
    )]
    pub grouping_interval: Duration,
    /// 遮罩层显示 / 隐藏后的等待时长（JSON 中以毫秒表示）
    #[serde(
        rename = "overlayTransitionMs",
        deserialize_with = "deserialize_duration_millis"
    )]
    pub overlay_transition: Duration,
    /// 每个线程只设置一次的自定义字段
    pub custom_fields: HashMap<String, String>,
    pub file_restrictions: FileRestrictions,
    /// 多线程模式下线程没有名称时的显示名
    pub default_thread_name: String,
}

impl Default for ThreadViewConfig {
    fn default() -> Self {
        Self {
            grouping_interval: DEFAULT_GROUPING_INTERVAL,
            overlay_transition: DEFAULT_OVERLAY_TRANSITION,
            custom_fields: HashMap::new(),
            file_restrictions: FileRestrictions::default(),
            default_thread_name: "新会话".to_string(),
        }
    }
}

impl ThreadViewConfig {
    /// 从 JSON 文件加载配置，缺失的字段使用默认值
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败: {}", path.display()))?;
        Self::from_json_str(&content)
            .with_context(|| format!("解析配置文件失败: {}", path.display()))
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }
}

/// 界面阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UiPhase {
    #[default]
    Idle,
    Connecting,
    Loading,
    Ready,
    Offline,
    Closed,
    Queued,
}

/// 加载遮罩的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadingReason {
    Connecting,
    CreatingThread,
    RecoveringThread,
}

/// 覆盖在消息列表上方的遮罩层
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Overlay {
    Loading(LoadingReason),
    Offline,
    EndConversation,
}

/// 会话结束后用户的选择
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndConversationAction {
    /// 开始新的会话
    StartNew,
    /// 关闭聊天窗口
    Close,
}

/// 推送给界面的只读快照
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ThreadViewSnapshot {
    pub thread_id: Option<Uuid>,
    pub phase: UiPhase,
    pub groups: Vec<MessageGroup>,
    pub input_enabled: bool,
    pub is_thread_closed: bool,
    pub position_in_queue: Option<QueuePosition>,
    pub display_name: Option<String>,
    pub agent_typing: Option<AgentInfo>,
    pub has_more_messages: bool,
    pub showing_inactivity_popup: bool,
    pub showing_end_conversation: bool,
}

/// 协调器的工作状态
///
/// 只由协调器修改；`permanently_closed` 一旦置位就不会再清除。
#[derive(Debug, Default)]
pub struct ThreadViewState {
    pub thread: Option<ThreadSnapshot>,
    pub chat_state: ChatState,
    pub mode: ChatMode,
    pub phase: UiPhase,
    pub input_enabled: bool,
    pub is_thread_closed: bool,
    pub showing_inactivity_popup: bool,
    pub showing_end_conversation: bool,
    pub is_recovering: bool,
    /// 应用回到前台后需要重新加载线程
    pub should_refresh: bool,
    pub position_in_queue: Option<QueuePosition>,
    pub display_name: Option<String>,
    pub agent_typing: Option<AgentInfo>,
    pub has_more_messages: bool,
    pub groups: Vec<MessageGroup>,
    permanently_closed: bool,
    custom_fields_applied: HashSet<Uuid>,
    pending: VecDeque<ThreadEvent>,
}

impl ThreadViewState {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前跟踪的线程 ID
    pub fn thread_id(&self) -> Option<Uuid> {
        self.thread.as_ref().map(|thread| thread.id)
    }

    pub fn is_permanently_closed(&self) -> bool {
        self.permanently_closed
    }

    pub(crate) fn mark_permanently_closed(&mut self) {
        self.permanently_closed = true;
    }

    /// 该线程是否还没有设置过自定义字段；返回 true 的同时记录为已设置
    pub(crate) fn claim_custom_fields(&mut self, thread_id: Uuid) -> bool {
        self.custom_fields_applied.insert(thread_id)
    }

    pub(crate) fn enqueue(&mut self, event: ThreadEvent) {
        self.pending.push_back(event);
    }

    pub(crate) fn dequeue(&mut self) -> Option<ThreadEvent> {
        self.pending.pop_front()
    }

    /// 排队等待处理的事件数
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn snapshot(&self) -> ThreadViewSnapshot {
        ThreadViewSnapshot {
            thread_id: self.thread_id(),
            phase: self.phase,
            groups: self.groups.clone(),
            input_enabled: self.input_enabled,
            is_thread_closed: self.is_thread_closed,
            position_in_queue: self.position_in_queue,
            display_name: self.display_name.clone(),
            agent_typing: self.agent_typing.clone(),
            has_more_messages: self.has_more_messages,
            showing_inactivity_popup: self.showing_inactivity_popup,
            showing_end_conversation: self.showing_end_conversation,
        }
    }
}
