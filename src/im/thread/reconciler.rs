//! 线程状态协调器
//!
//! 每个会话视图对应一个协调器任务，独占 [`ThreadViewState`]。SDK 回调和用户操作通过
//! [`ThreadHandle`] 投递 [`ThreadEvent`]，协调器按到达顺序逐个处理，一个事件（包括其中的
//! 异步等待）完全结束后才会取下一个，因此不会出现两次协调交错执行。
//!
//! 处理流程（`update_thread`）：
//! 1. 新快照为已关闭时设置永久关闭标记
//! 2. 替换当前跟踪的线程快照
//! 3. 按会话模式分派：决定是否恢复线程、是否显示加载遮罩，以及模式相关的附加状态
//! 4. 分派结果为 `Stop` 时跳过后续步骤，等待下一个事件
//! 5. 重新计算输入框 / 关闭状态、消息分组、一次性副作用，并推送快照

use crate::im::client::{ChatClient, OutgoingMessage};
use crate::im::delegate::ChatDelegate;
use crate::im::error::{ChatAlert, FailedOperation};
use crate::im::message::grouping::group_messages;
use crate::im::message::models::DeliveryStatus;
use crate::im::message::types::ContentPart;
use crate::im::thread::events::ThreadEvent;
use crate::im::thread::listener::ThreadViewListener;
use crate::im::thread::models::{
    LoadingReason, Overlay, ThreadViewConfig, ThreadViewState, UiPhase,
};
use crate::im::thread::overlay::OverlayController;
use crate::im::types::{
    AgentInfo, ChatMode, ChatState, QueuePosition, ThreadSnapshot, ThreadStatus,
};
use anyhow::Context;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// 模式处理器的分派结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

/// 计算 live chat 的排队位置
///
/// - 线程尚未创建：未知
/// - 线程已关闭，或已经 / 曾经分配过坐席：不显示
/// - 服务不可用：未知
/// - SDK 报告了位置：显示具体数字
/// - 其他情况：未知
pub fn queue_position(
    chat_state: ChatState,
    thread: Option<&ThreadSnapshot>,
    permanently_closed: bool,
) -> Option<QueuePosition> {
    let Some(thread) = thread else {
        return Some(QueuePosition::Unknown);
    };
    if permanently_closed || thread.is_closed() || thread.has_agent() {
        return None;
    }
    if chat_state == ChatState::Offline {
        return Some(QueuePosition::Unknown);
    }
    match thread.position_in_queue {
        Some(position) => Some(QueuePosition::Known(position)),
        None => Some(QueuePosition::Unknown),
    }
}

/// 协调器的事件入口，可以任意克隆并在任何任务中调用
#[derive(Clone)]
pub struct ThreadHandle {
    sender: mpsc::UnboundedSender<ThreadEvent>,
}

impl ThreadHandle {
    pub fn on_chat_updated(&self, state: ChatState, mode: ChatMode) {
        self.send(ThreadEvent::ChatStateChanged { state, mode });
    }

    pub fn on_thread_updated(&self, thread: ThreadSnapshot) {
        self.send(ThreadEvent::ThreadChanged(thread));
    }

    pub fn on_agent_typing(&self, is_typing: bool, agent: AgentInfo, thread_id: Uuid) {
        self.send(ThreadEvent::AgentTyping {
            is_typing,
            agent,
            thread_id,
        });
    }

    pub fn request_refresh(&self) {
        self.send(ThreadEvent::RefreshRequested);
    }

    pub fn send_message(&self, message: OutgoingMessage) {
        self.send(ThreadEvent::SendMessage(message));
    }

    pub fn load_more(&self) {
        self.send(ThreadEvent::LoadMore);
    }

    /// 协调器是否已经退出
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    fn send(&self, event: ThreadEvent) {
        if let Err(e) = self.sender.send(event) {
            warn!("[Thread] ⚠️ 会话视图已销毁，丢弃事件: {}", e.0.name());
        }
    }
}

#[async_trait]
impl ChatDelegate for ThreadHandle {
    async fn on_chat_updated(&self, state: ChatState, mode: ChatMode) {
        ThreadHandle::on_chat_updated(self, state, mode);
    }

    async fn on_thread_updated(&self, thread: ThreadSnapshot) {
        ThreadHandle::on_thread_updated(self, thread);
    }

    async fn on_agent_typing(&self, is_typing: bool, agent: AgentInfo, thread_id: Uuid) {
        ThreadHandle::on_agent_typing(self, is_typing, agent, thread_id);
    }
}

/// 线程状态协调器
pub struct ThreadStateReconciler {
    client: Arc<dyn ChatClient>,
    listener: Arc<dyn ThreadViewListener>,
    config: ThreadViewConfig,
    state: ThreadViewState,
    overlay: OverlayController,
}

impl ThreadStateReconciler {
    pub fn new(
        client: Arc<dyn ChatClient>,
        listener: Arc<dyn ThreadViewListener>,
        config: ThreadViewConfig,
    ) -> Self {
        let overlay = OverlayController::new(listener.clone(), config.overlay_transition);
        Self {
            client,
            listener,
            config,
            state: ThreadViewState::new(),
            overlay,
        }
    }

    /// 以指定线程作为初始跟踪对象（多线程模式下打开某个线程）
    pub fn with_thread(mut self, thread: ThreadSnapshot) -> Self {
        if thread.is_closed() {
            self.state.mark_permanently_closed();
        }
        self.state.thread = Some(thread);
        self
    }

    pub fn state(&self) -> &ThreadViewState {
        &self.state
    }

    /// 在当前 tokio 运行时中启动协调任务
    ///
    /// 所有 `ThreadHandle` 被释放且队列清空后任务结束，返回最终状态。
    pub fn spawn(self) -> (ThreadHandle, JoinHandle<ThreadViewState>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let task = tokio::spawn(self.run(receiver));
        (ThreadHandle { sender }, task)
    }

    /// 事件循环：每处理完一个事件再从队首取下一个
    pub async fn run(mut self, mut receiver: mpsc::UnboundedReceiver<ThreadEvent>) -> ThreadViewState {
        info!("[Thread] 🚀 会话视图协调器启动");
        while let Some(event) = receiver.recv().await {
            self.state.enqueue(event);
            Self::collect_pending(&mut self.state, &mut receiver);
            while let Some(event) = self.state.dequeue() {
                self.handle_event(event).await;
                Self::collect_pending(&mut self.state, &mut receiver);
            }
        }
        info!("[Thread] 🛑 会话视图协调器退出");
        self.state
    }

    fn collect_pending(
        state: &mut ThreadViewState,
        receiver: &mut mpsc::UnboundedReceiver<ThreadEvent>,
    ) {
        while let Ok(event) = receiver.try_recv() {
            state.enqueue(event);
        }
    }

    /// 处理单个事件直到完成
    pub async fn handle_event(&mut self, event: ThreadEvent) {
        debug!(
            "[Thread] 处理事件: {} (队列剩余 {})",
            event.name(),
            self.state.pending_len()
        );
        match event {
            ThreadEvent::ChatStateChanged { state, mode } => {
                info!("[Thread] 🔄 聊天状态变化: state={:?}, mode={:?}", state, mode);
                self.state.chat_state = state;
                self.state.mode = mode;
                let thread = self.state.thread.clone();
                self.update_thread(thread).await;
            }
            ThreadEvent::ThreadChanged(thread) => {
                if !self.accepts(&thread) {
                    debug!("[Thread] 忽略非当前线程的更新: {}", thread.id);
                    return;
                }
                self.update_thread(Some(thread)).await;
            }
            ThreadEvent::AgentTyping {
                is_typing,
                agent,
                thread_id,
            } => {
                if self.state.thread_id() != Some(thread_id) {
                    return;
                }
                self.state.agent_typing = is_typing.then_some(agent);
                self.publish().await;
            }
            ThreadEvent::RefreshRequested => {
                info!("[Thread] 🔁 应用回到前台，标记需要刷新");
                self.state.should_refresh = true;
                let thread = self.state.thread.clone();
                self.update_thread(thread).await;
            }
            ThreadEvent::SendMessage(message) => self.send_message(message).await,
            ThreadEvent::LoadMore => self.load_more().await,
        }
    }

    /// 当前没有跟踪线程时接受任意线程（首次引导），否则只接受同一线程
    fn accepts(&self, thread: &ThreadSnapshot) -> bool {
        match &self.state.thread {
            None => true,
            Some(current) => current.id == thread.id,
        }
    }

    async fn update_thread(&mut self, thread: Option<ThreadSnapshot>) {
        if let Some(thread) = &thread {
            if thread.is_closed() && !self.state.is_permanently_closed() {
                info!("[Thread] 🔒 线程 {} 已关闭，永久禁用输入", thread.id);
                self.state.mark_permanently_closed();
            }
        }
        if thread.is_some() {
            self.state.thread = thread;
        }

        let flow = match self.state.mode {
            ChatMode::SingleThread => self.handle_single_thread().await,
            ChatMode::MultiThread => self.handle_multi_thread().await,
            ChatMode::LiveChat => self.handle_live_chat().await,
        };
        if flow == Flow::Stop {
            // 不重新分组、不执行副作用，但输入框状态必须跟随聊天状态
            self.refresh_input_state();
            self.publish().await;
            return;
        }

        self.refresh_derived_state().await;
    }

    /// 聊天未就绪时显示对应遮罩并停止
    async fn ensure_chat_ready(&mut self) -> Flow {
        match self.state.chat_state {
            ChatState::Ready => Flow::Continue,
            ChatState::Offline => {
                self.overlay.show(Overlay::Offline).await;
                Flow::Stop
            }
            ChatState::Initial => Flow::Stop,
            state if state.is_connecting() => {
                self.overlay
                    .show(Overlay::Loading(LoadingReason::Connecting))
                    .await;
                Flow::Stop
            }
            _ => Flow::Stop,
        }
    }

    async fn handle_single_thread(&mut self) -> Flow {
        if self.ensure_chat_ready().await == Flow::Stop {
            return Flow::Stop;
        }
        let Some(thread) = self.state.thread.clone() else {
            self.bootstrap_thread(false).await;
            return Flow::Stop;
        };
        if self.needs_recovery(&thread) {
            self.recover_thread(thread.id).await;
            return Flow::Stop;
        }
        self.overlay.hide().await;
        Flow::Continue
    }

    async fn handle_multi_thread(&mut self) -> Flow {
        if self.ensure_chat_ready().await == Flow::Stop {
            return Flow::Stop;
        }
        let Some(thread) = self.state.thread.clone() else {
            error!("[Thread] ❌ 多线程模式下没有打开的线程，忽略本次协调");
            return Flow::Stop;
        };

        self.state.display_name = Some(
            thread
                .name
                .clone()
                .filter(|name| !name.trim().is_empty())
                .or_else(|| thread.assigned_agent.as_ref().map(AgentInfo::display_name))
                .unwrap_or_else(|| self.config.default_thread_name.clone()),
        );

        if self.needs_recovery(&thread) {
            self.recover_thread(thread.id).await;
            return Flow::Stop;
        }
        self.overlay.hide().await;
        Flow::Continue
    }

    async fn handle_live_chat(&mut self) -> Flow {
        self.state.position_in_queue = queue_position(
            self.state.chat_state,
            self.state.thread.as_ref(),
            self.state.is_permanently_closed(),
        );

        if self.ensure_chat_ready().await == Flow::Stop {
            return Flow::Stop;
        }
        let Some(thread) = self.state.thread.clone() else {
            self.bootstrap_thread(true).await;
            return Flow::Stop;
        };

        if thread.is_closed() || self.state.is_permanently_closed() {
            if !self.state.showing_end_conversation {
                info!("[Thread] 🏁 live chat 会话已结束，显示结束界面");
                self.state.showing_end_conversation = true;
                self.overlay.show(Overlay::EndConversation).await;
            }
            return Flow::Continue;
        }

        if self.needs_recovery(&thread) {
            self.recover_thread(thread.id).await;
            return Flow::Stop;
        }
        self.overlay.hide().await;
        Flow::Continue
    }

    fn needs_recovery(&self, thread: &ThreadSnapshot) -> bool {
        !self.state.is_recovering
            && (self.state.should_refresh || thread.status == ThreadStatus::Loaded)
    }

    /// 还没有跟踪线程：复用已有线程，没有则新建
    async fn bootstrap_thread(&mut self, skip_closed: bool) {
        let threads = match self.client.get_threads().await.context("获取线程列表失败") {
            Ok(threads) => threads,
            Err(e) => {
                error!("[Thread] ❌ {:#}", e);
                self.present_alert(ChatAlert::transport(FailedOperation::RecoverThread, &e))
                    .await;
                return;
            }
        };

        let existing = threads
            .into_iter()
            .find(|thread| !(skip_closed && thread.is_closed()));
        match existing {
            Some(thread) => {
                info!("[Thread] 📂 复用已有线程: {}", thread.id);
                let thread_id = thread.id;
                if thread.is_closed() {
                    self.state.mark_permanently_closed();
                }
                self.state.thread = Some(thread);
                self.recover_thread(thread_id).await;
            }
            None => self.create_thread().await,
        }
    }

    async fn create_thread(&mut self) {
        info!("[Thread] 🆕 创建新线程");
        self.overlay
            .show(Overlay::Loading(LoadingReason::CreatingThread))
            .await;
        match self
            .client
            .create_thread(self.config.custom_fields.clone())
            .await
            .context("创建会话失败")
        {
            Ok(thread) => {
                info!("[Thread] ✅ 线程创建成功: {}", thread.id);
                // 创建时已携带自定义字段
                self.state.claim_custom_fields(thread.id);
                if self.state.mode == ChatMode::LiveChat {
                    self.state.position_in_queue =
                        queue_position(self.state.chat_state, Some(&thread), false);
                }
                self.state.thread = Some(thread);
            }
            Err(e) => {
                error!("[Thread] ❌ {:#}", e);
                self.present_alert(ChatAlert::transport(FailedOperation::CreateThread, &e))
                    .await;
            }
        }
        self.overlay.hide().await;
    }

    /// 重新加载线程完整历史，同一时间最多一次
    async fn recover_thread(&mut self, thread_id: Uuid) {
        if self.state.is_recovering {
            debug!("[Thread] 恢复已在进行中，跳过");
            return;
        }
        info!("[Thread] 🔄 恢复线程: {}", thread_id);
        self.state.is_recovering = true;
        self.state.should_refresh = false;
        self.overlay
            .show(Overlay::Loading(LoadingReason::RecoveringThread))
            .await;

        if let Err(e) = self
            .client
            .load_thread(thread_id)
            .await
            .with_context(|| format!("加载线程失败: {}", thread_id))
        {
            error!("[Thread] ❌ {:#}", e);
            self.present_alert(ChatAlert::transport(FailedOperation::RecoverThread, &e))
                .await;
        }

        self.overlay.hide().await;
        self.state.is_recovering = false;
    }

    /// 第 5 步：重新计算派生状态并执行一次性副作用
    async fn refresh_derived_state(&mut self) {
        let Some(thread) = self.state.thread.clone() else {
            error!("[Thread] ❌ 协调完成时缺少线程引用");
            return;
        };

        let closed = self.refresh_input_state();
        self.state.groups = group_messages(&thread.messages, self.config.grouping_interval);
        self.state.showing_inactivity_popup = !closed
            && thread.last_message().is_some_and(|message| {
                message
                    .contents
                    .iter()
                    .any(|part| matches!(part, ContentPart::InactivityPopup(_)))
            });
        self.state.has_more_messages = thread.has_more_messages_to_load;

        self.apply_custom_fields(thread.id).await;
        self.mark_read_if_needed(&thread).await;
        self.publish().await;
    }

    /// 根据聊天状态和关闭标记更新输入框，返回线程是否已关闭
    fn refresh_input_state(&mut self) -> bool {
        let closed = self.state.is_permanently_closed()
            || self.state.thread.as_ref().is_some_and(ThreadSnapshot::is_closed);
        self.state.is_thread_closed = closed;
        self.state.input_enabled =
            self.state.chat_state.is_ready() && !closed && self.state.thread.is_some();
        closed
    }

    async fn apply_custom_fields(&mut self, thread_id: Uuid) {
        if self.config.custom_fields.is_empty() || !self.state.claim_custom_fields(thread_id) {
            return;
        }
        debug!("[Thread] 设置线程自定义字段: {}", thread_id);
        if let Err(e) = self
            .client
            .set_custom_fields(thread_id, self.config.custom_fields.clone())
            .await
        {
            warn!("[Thread] ⚠️ 设置自定义字段失败（忽略）: {:#}", e);
        }
    }

    async fn mark_read_if_needed(&self, thread: &ThreadSnapshot) {
        let Some(last) = thread.last_message() else {
            return;
        };
        if last.sender.is_local_user() || last.status == DeliveryStatus::Seen {
            return;
        }
        debug!("[Thread] 标记线程已读: {}", thread.id);
        if let Err(e) = self.client.mark_read(thread.id).await {
            warn!("[Thread] ⚠️ 标记已读失败（忽略）: {:#}", e);
        }
    }

    async fn send_message(&mut self, message: OutgoingMessage) {
        let Some(thread_id) = self.state.thread_id() else {
            error!("[Thread] ❌ 没有当前线程，无法发送消息");
            return;
        };
        if !self.state.input_enabled {
            warn!("[Thread] ⚠️ 输入已禁用，忽略发送");
            return;
        }
        if message.is_empty() {
            debug!("[Thread] 空消息，忽略发送");
            return;
        }
        if let Err(e) = self
            .config
            .file_restrictions
            .validate_all(&message.attachments)
        {
            warn!("[Thread] ⚠️ 附件校验失败: {}", e);
            self.present_alert(ChatAlert::Validation(e)).await;
            return;
        }

        info!("[Thread] 📤 发送消息到线程 {}", thread_id);
        if let Err(e) = self
            .client
            .send_message(thread_id, message)
            .await
            .context("发送消息失败")
        {
            error!("[Thread] ❌ {:#}", e);
            self.present_alert(ChatAlert::transport(FailedOperation::SendMessage, &e))
                .await;
        }
    }

    async fn load_more(&mut self) {
        let Some(thread_id) = self.state.thread_id() else {
            error!("[Thread] ❌ 没有当前线程，无法加载更多消息");
            return;
        };
        if !self.state.has_more_messages {
            debug!("[Thread] 没有更多消息");
            return;
        }
        if let Err(e) = self
            .client
            .load_more_messages(thread_id)
            .await
            .context("加载更多消息失败")
        {
            error!("[Thread] ❌ {:#}", e);
            self.present_alert(ChatAlert::transport(FailedOperation::LoadMoreMessages, &e))
                .await;
        }
    }

    fn compute_phase(&self) -> UiPhase {
        let state = &self.state;
        match state.chat_state {
            ChatState::Initial => return UiPhase::Idle,
            ChatState::Offline => return UiPhase::Offline,
            ChatState::Ready => {}
            chat_state if chat_state.is_connecting() => return UiPhase::Connecting,
            _ => return UiPhase::Idle,
        }
        let Some(thread) = &state.thread else {
            return UiPhase::Loading;
        };
        if state.is_permanently_closed() || thread.is_closed() {
            UiPhase::Closed
        } else if state.is_recovering || thread.status == ThreadStatus::Loaded {
            UiPhase::Loading
        } else if state.mode == ChatMode::LiveChat && state.position_in_queue.is_some() {
            UiPhase::Queued
        } else {
            UiPhase::Ready
        }
    }

    async fn publish(&mut self) {
        self.state.phase = self.compute_phase();
        self.listener
            .on_view_state_changed(self.state.snapshot())
            .await;
    }

    async fn present_alert(&self, alert: ChatAlert) {
        self.listener.on_alert(alert).await;
    }
}
