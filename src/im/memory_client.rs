//! 内存版聊天 SDK
//!
//! 实现 [`ChatClient`]，线程数据保存在内存中，每次变化后通过 [`ChatDelegate`] 回调通知，
//! 行为与真实 SDK 的回调时序一致：回调发生在对应的异步方法返回之前。
//! 供测试和命令行演示使用，支持按操作名注入失败并记录调用顺序。

use crate::im::client::{ChatClient, OutgoingMessage};
use crate::im::delegate::ChatDelegate;
use crate::im::message::{ContentPart, DeliveryStatus, MediaElem, Message, MessageSender};
use crate::im::types::{AgentInfo, ChatMode, ChatState, ThreadSnapshot, ThreadStatus};
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tracing::{debug, info};
use uuid::Uuid;

struct InMemoryState {
    threads: Vec<ThreadSnapshot>,
    delegate: Option<Weak<dyn ChatDelegate>>,
    calls: Vec<String>,
    failing: HashSet<String>,
    custom_fields: HashMap<Uuid, HashMap<String, String>>,
    chat_state: ChatState,
    online: bool,
}

pub struct InMemoryChatClient {
    mode: ChatMode,
    customer: MessageSender,
    inner: Mutex<InMemoryState>,
}

impl InMemoryChatClient {
    pub fn new(mode: ChatMode) -> Self {
        Self {
            mode,
            customer: MessageSender::customer("customer", "访客"),
            inner: Mutex::new(InMemoryState {
                threads: Vec::new(),
                delegate: None,
                calls: Vec::new(),
                failing: HashSet::new(),
                custom_fields: HashMap::new(),
                chat_state: ChatState::Initial,
                online: true,
            }),
        }
    }

    /// 预置已有线程
    pub fn with_threads(self, threads: Vec<ThreadSnapshot>) -> Self {
        self.lock().threads = threads;
        self
    }

    pub fn mode(&self) -> ChatMode {
        self.mode
    }

    /// 设置回调对象（只保存弱引用，回调对象通常反过来持有本客户端）
    pub fn set_delegate(&self, delegate: &Arc<dyn ChatDelegate>) {
        self.lock().delegate = Some(Arc::downgrade(delegate));
    }

    /// 之后对该操作的调用都返回错误
    pub fn fail_on(&self, operation: &str) {
        self.lock().failing.insert(operation.to_string());
    }

    pub fn recover(&self, operation: &str) {
        self.lock().failing.remove(operation);
    }

    /// 按顺序记录的操作名
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn thread(&self, thread_id: Uuid) -> Option<ThreadSnapshot> {
        self.lock()
            .threads
            .iter()
            .find(|thread| thread.id == thread_id)
            .cloned()
    }

    pub fn custom_fields_for(&self, thread_id: Uuid) -> HashMap<String, String> {
        self.lock()
            .custom_fields
            .get(&thread_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn chat_state(&self) -> ChatState {
        self.lock().chat_state
    }

    /// 模拟坐席发来一条文本消息
    pub async fn push_agent_message(&self, thread_id: Uuid, agent: &AgentInfo, text: &str) -> Result<()> {
        let sender = MessageSender::agent(agent.id.clone(), agent.display_name());
        let message = Message::new(sender, vec![ContentPart::text(text)], Utc::now());
        self.update_thread(thread_id, |thread| thread.messages.push(message))
            .await
    }

    /// 模拟分配坐席，离开排队
    pub async fn assign_agent(&self, thread_id: Uuid, agent: AgentInfo) -> Result<()> {
        self.update_thread(thread_id, |thread| {
            thread.position_in_queue = None;
            thread.last_assigned_agent = Some(agent.clone());
            thread.assigned_agent = Some(agent);
        })
        .await
    }

    pub async fn set_queue_position(&self, thread_id: Uuid, position: Option<u32>) -> Result<()> {
        self.update_thread(thread_id, |thread| thread.position_in_queue = position)
            .await
    }

    /// 模拟坐席结束会话
    pub async fn close_thread(&self, thread_id: Uuid) -> Result<()> {
        self.update_thread(thread_id, |thread| {
            thread.status = ThreadStatus::Closed;
            thread.assigned_agent = None;
        })
        .await
    }

    pub async fn agent_typing(&self, thread_id: Uuid, agent: AgentInfo, is_typing: bool) {
        if let Some(delegate) = self.delegate() {
            delegate.on_agent_typing(is_typing, agent, thread_id).await;
        }
    }

    /// 切换服务可用性，已连接时立即通知新的聊天状态
    pub async fn set_availability(&self, online: bool) {
        let state = {
            let mut inner = self.lock();
            inner.online = online;
            if inner.chat_state == ChatState::Initial {
                return;
            }
            inner.chat_state = if online {
                ChatState::Ready
            } else {
                ChatState::Offline
            };
            inner.chat_state
        };
        info!("[MemoryClient] 🌐 服务可用性变化: online={}", online);
        self.emit_chat_state(state).await;
    }

    fn lock(&self) -> MutexGuard<'_, InMemoryState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn delegate(&self) -> Option<Arc<dyn ChatDelegate>> {
        self.lock().delegate.as_ref().and_then(Weak::upgrade)
    }

    /// 记录调用，命中失败注入时返回错误
    fn record(&self, operation: &str) -> Result<()> {
        let mut inner = self.lock();
        inner.calls.push(operation.to_string());
        if inner.failing.contains(operation) {
            debug!("[MemoryClient] 模拟失败: {}", operation);
            return Err(anyhow!("模拟的 SDK 错误: {}", operation));
        }
        Ok(())
    }

    async fn emit_chat_state(&self, state: ChatState) {
        if let Some(delegate) = self.delegate() {
            delegate.on_chat_updated(state, self.mode).await;
        }
    }

    async fn emit_thread(&self, thread: ThreadSnapshot) {
        if let Some(delegate) = self.delegate() {
            delegate.on_thread_updated(thread).await;
        }
    }

    /// 修改线程后把新快照回调出去（锁在回调之前释放）
    async fn update_thread<F>(&self, thread_id: Uuid, apply: F) -> Result<()>
    where
        F: FnOnce(&mut ThreadSnapshot),
    {
        let snapshot = {
            let mut inner = self.lock();
            let thread = inner
                .threads
                .iter_mut()
                .find(|thread| thread.id == thread_id)
                .ok_or_else(|| anyhow!("线程不存在: {}", thread_id))?;
            apply(thread);
            thread.clone()
        };
        self.emit_thread(snapshot).await;
        Ok(())
    }

    fn to_content(message: &OutgoingMessage) -> Vec<ContentPart> {
        let mut contents: Vec<ContentPart> = message
            .attachments
            .iter()
            .map(|upload| {
                let media = MediaElem {
                    url: upload.url.clone(),
                    file_name: upload.file_name.clone(),
                    mime_type: upload.mime_type.clone(),
                    size: upload.size_bytes,
                };
                match upload.mime_type.split_once('/').map(|(kind, _)| kind) {
                    Some("image") => ContentPart::Image(media),
                    Some("video") => ContentPart::Video(media),
                    Some("audio") => ContentPart::Audio(media),
                    _ => ContentPart::Document(media),
                }
            })
            .collect();
        if let Some(text) = message.text.as_deref().filter(|text| !text.trim().is_empty()) {
            contents.push(ContentPart::text(text));
        }
        contents
    }
}

#[async_trait]
impl ChatClient for InMemoryChatClient {
    async fn connect(&self) -> Result<()> {
        self.record("connect")?;
        info!("[MemoryClient] 🔗 连接中, mode={:?}", self.mode);
        let ready_state = {
            let mut inner = self.lock();
            inner.chat_state = ChatState::Connecting;
            if inner.online {
                ChatState::Ready
            } else {
                ChatState::Offline
            }
        };
        self.emit_chat_state(ChatState::Connecting).await;

        self.lock().chat_state = ready_state;
        info!("[MemoryClient] ✅ 连接完成: {:?}", ready_state);
        self.emit_chat_state(ready_state).await;
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.record("disconnect")?;
        info!("[MemoryClient] 🔌 断开连接");
        self.lock().chat_state = ChatState::Initial;
        self.emit_chat_state(ChatState::Initial).await;
        Ok(())
    }

    async fn get_threads(&self) -> Result<Vec<ThreadSnapshot>> {
        self.record("get_threads")?;
        Ok(self.lock().threads.clone())
    }

    async fn create_thread(&self, custom_fields: HashMap<String, String>) -> Result<ThreadSnapshot> {
        self.record("create_thread")?;
        let thread = {
            let mut inner = self.lock();
            let mut thread = ThreadSnapshot::new(Uuid::new_v4());
            thread.status = ThreadStatus::Ready;
            if self.mode == ChatMode::LiveChat {
                let waiting = inner
                    .threads
                    .iter()
                    .filter(|thread| !thread.is_closed() && !thread.has_agent())
                    .count();
                thread.position_in_queue = Some(waiting as u32 + 1);
            }
            inner.custom_fields.insert(thread.id, custom_fields);
            inner.threads.push(thread.clone());
            thread
        };
        info!("[MemoryClient] 🆕 创建线程: {}", thread.id);
        self.emit_thread(thread.clone()).await;
        Ok(thread)
    }

    async fn load_thread(&self, thread_id: Uuid) -> Result<()> {
        self.record("load_thread")?;
        self.update_thread(thread_id, |thread| {
            if matches!(thread.status, ThreadStatus::Pending | ThreadStatus::Loaded) {
                thread.status = ThreadStatus::Ready;
            }
        })
        .await
    }

    async fn load_more_messages(&self, thread_id: Uuid) -> Result<()> {
        self.record("load_more_messages")?;
        self.update_thread(thread_id, |thread| {
            thread.has_more_messages_to_load = false;
        })
        .await
    }

    async fn send_message(&self, thread_id: Uuid, message: OutgoingMessage) -> Result<()> {
        self.record("send_message")?;
        let contents = Self::to_content(&message);
        if contents.is_empty() {
            bail!("消息内容为空");
        }
        let mut outgoing = Message::new(self.customer.clone(), contents, Utc::now());
        outgoing.status = DeliveryStatus::Delivered;
        self.update_thread(thread_id, |thread| thread.messages.push(outgoing))
            .await
    }

    async fn mark_read(&self, thread_id: Uuid) -> Result<()> {
        self.record("mark_read")?;
        debug!("[MemoryClient] 线程已读: {}", thread_id);
        Ok(())
    }

    async fn set_custom_fields(
        &self,
        thread_id: Uuid,
        custom_fields: HashMap<String, String>,
    ) -> Result<()> {
        self.record("set_custom_fields")?;
        self.lock()
            .custom_fields
            .entry(thread_id)
            .or_default()
            .extend(custom_fields);
        Ok(())
    }
}
