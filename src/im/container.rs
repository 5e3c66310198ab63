//! 聊天容器
//!
//! 作为 SDK 的 [`ChatDelegate`]，把回调转发给当前的会话视图，并处理连接、断开、
//! 前后台切换、提示框与会话结束界面的用户选择。
//! 单线程和 live chat 模式在第一次收到聊天状态时自动创建会话视图；
//! 多线程模式需要调用 [`ChatContainer::open_thread`] 打开具体线程。

use crate::im::client::{ChatClient, OutgoingMessage};
use crate::im::delegate::ChatDelegate;
use crate::im::error::{AlertResponse, ChatAlert, FailedOperation};
use crate::im::thread::listener::ThreadViewListener;
use crate::im::thread::models::{EndConversationAction, ThreadViewConfig};
use crate::im::thread::reconciler::{ThreadHandle, ThreadStateReconciler};
use crate::im::types::{AgentInfo, ChatMode, ChatState, ThreadSnapshot};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Default)]
struct ContainerState {
    thread_view: Option<ThreadHandle>,
    chat_state: ChatState,
    mode: ChatMode,
}

pub struct ChatContainer {
    client: Arc<dyn ChatClient>,
    listener: Arc<dyn ThreadViewListener>,
    config: ThreadViewConfig,
    inner: Mutex<ContainerState>,
}

impl ChatContainer {
    pub fn new(
        client: Arc<dyn ChatClient>,
        listener: Arc<dyn ThreadViewListener>,
        config: ThreadViewConfig,
    ) -> Self {
        Self {
            client,
            listener,
            config,
            inner: Mutex::new(ContainerState::default()),
        }
    }

    pub fn chat_state(&self) -> ChatState {
        self.lock().chat_state
    }

    pub fn mode(&self) -> ChatMode {
        self.lock().mode
    }

    /// 当前会话视图的事件入口
    pub fn current_thread_view(&self) -> Option<ThreadHandle> {
        self.lock().thread_view.clone()
    }

    /// 连接 SDK，失败时弹出提示框
    pub async fn connect(&self) {
        info!("[Container] 🔗 正在连接...");
        if let Err(e) = self.client.connect().await.context("连接失败") {
            error!("[Container] ❌ {:#}", e);
            self.listener
                .on_alert(ChatAlert::transport(FailedOperation::Connect, &e))
                .await;
        }
    }

    /// 断开连接并关闭聊天窗口
    pub async fn disconnect(&self) {
        info!("[Container] 🔌 断开连接");
        // 释放句柄后旧的协调任务在队列清空后自行退出
        self.lock().thread_view = None;
        if let Err(e) = self.client.disconnect().await.context("断开连接失败") {
            warn!("[Container] ⚠️ {:#}", e);
        }
        self.listener.on_chat_dismissed().await;
    }

    /// 应用回到前台：重新加载当前线程
    pub fn enter_foreground(&self) {
        match self.current_thread_view() {
            Some(view) => {
                info!("[Container] ☀️ 回到前台，请求刷新");
                view.request_refresh();
            }
            None => info!("[Container] ☀️ 回到前台，没有打开的会话"),
        }
    }

    /// 用户对提示框的选择
    pub async fn resolve_alert(&self, response: AlertResponse) {
        info!("[Container] 提示框选择: {:?}", response);
        match response {
            AlertResponse::Retry => match self.current_thread_view() {
                Some(view) => view.request_refresh(),
                None => self.connect().await,
            },
            AlertResponse::Disconnect => self.disconnect().await,
            AlertResponse::Dismiss => {}
        }
    }

    /// 用户在会话结束界面的选择
    pub async fn resolve_end_conversation(&self, action: EndConversationAction) {
        match action {
            EndConversationAction::StartNew => self.start_new_conversation(),
            EndConversationAction::Close => self.disconnect().await,
        }
    }

    /// 丢弃当前会话视图，用全新状态重新引导（会创建新线程）
    pub fn start_new_conversation(&self) {
        info!("[Container] 🆕 开始新的会话");
        let view = self.spawn_thread_view(None);
        let (state, mode) = {
            let inner = self.lock();
            (inner.chat_state, inner.mode)
        };
        view.on_chat_updated(state, mode);
    }

    /// 多线程模式：打开指定线程
    pub async fn open_thread(&self, thread_id: Uuid) -> Result<ThreadHandle> {
        let thread = self
            .client
            .get_threads()
            .await
            .context("获取线程列表失败")?
            .into_iter()
            .find(|thread| thread.id == thread_id)
            .ok_or_else(|| anyhow!("线程不存在: {}", thread_id))?;

        info!("[Container] 📂 打开线程: {}", thread_id);
        let view = self.spawn_thread_view(Some(thread));
        let (state, mode) = {
            let inner = self.lock();
            (inner.chat_state, inner.mode)
        };
        view.on_chat_updated(state, mode);
        Ok(view)
    }

    pub fn send_message(&self, message: OutgoingMessage) {
        match self.current_thread_view() {
            Some(view) => view.send_message(message),
            None => warn!("[Container] ⚠️ 没有打开的会话，无法发送消息"),
        }
    }

    pub fn load_more(&self) {
        match self.current_thread_view() {
            Some(view) => view.load_more(),
            None => warn!("[Container] ⚠️ 没有打开的会话，无法加载更多消息"),
        }
    }

    /// 创建新的会话视图并替换当前视图
    fn spawn_thread_view(&self, initial: Option<ThreadSnapshot>) -> ThreadHandle {
        let mut reconciler = ThreadStateReconciler::new(
            self.client.clone(),
            self.listener.clone(),
            self.config.clone(),
        );
        if let Some(thread) = initial {
            reconciler = reconciler.with_thread(thread);
        }
        let (view, _task) = reconciler.spawn();
        self.lock().thread_view = Some(view.clone());
        view
    }

    fn lock(&self) -> MutexGuard<'_, ContainerState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ChatDelegate for ChatContainer {
    async fn on_chat_updated(&self, state: ChatState, mode: ChatMode) {
        let existing = {
            let mut inner = self.lock();
            inner.chat_state = state;
            inner.mode = mode;
            inner.thread_view.clone()
        };
        let view = match existing {
            Some(view) => view,
            // 断开后不再创建视图；多线程模式等待用户打开线程
            None if state == ChatState::Initial || mode == ChatMode::MultiThread => return,
            None => self.spawn_thread_view(None),
        };
        view.on_chat_updated(state, mode);
    }

    async fn on_thread_updated(&self, thread: ThreadSnapshot) {
        if let Some(view) = self.current_thread_view() {
            view.on_thread_updated(thread);
        }
    }

    async fn on_agent_typing(&self, is_typing: bool, agent: AgentInfo, thread_id: Uuid) {
        if let Some(view) = self.current_thread_view() {
            view.on_agent_typing(is_typing, agent, thread_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::im::memory_client::InMemoryChatClient;
    use crate::im::test_support::{
        agent, agent_message, init_test_logger, thread_with, wait_until, Recorded,
        RecordingListener,
    };
    use crate::im::thread::models::{Overlay, ThreadViewSnapshot, UiPhase};
    use crate::im::types::{QueuePosition, ThreadStatus};
    use std::time::Duration;

    fn test_config() -> ThreadViewConfig {
        ThreadViewConfig {
            overlay_transition: Duration::ZERO,
            ..ThreadViewConfig::default()
        }
    }

    fn setup(
        client: InMemoryChatClient,
    ) -> (Arc<InMemoryChatClient>, Arc<RecordingListener>, Arc<ChatContainer>) {
        let client = Arc::new(client);
        let listener = Arc::new(RecordingListener::default());
        let container = Arc::new(ChatContainer::new(
            client.clone(),
            listener.clone(),
            test_config(),
        ));
        let delegate: Arc<dyn ChatDelegate> = container.clone();
        client.set_delegate(&delegate);
        (client, listener, container)
    }

    fn has_snapshot<F>(recorded: &[Recorded], predicate: F) -> bool
    where
        F: Fn(&ThreadViewSnapshot) -> bool,
    {
        recorded.iter().any(|entry| match entry {
            Recorded::Snapshot(snapshot) => predicate(snapshot),
            _ => false,
        })
    }

    #[tokio::test]
    async fn live_chat_full_flow() {
        init_test_logger();
        let (client, listener, container) = setup(InMemoryChatClient::new(ChatMode::LiveChat));

        container.connect().await;
        wait_until(&listener, |recorded| {
            has_snapshot(recorded, |snapshot| {
                snapshot.phase == UiPhase::Queued
                    && snapshot.position_in_queue == Some(QueuePosition::Known(1))
            })
        })
        .await;
        let thread_id = listener
            .snapshots()
            .iter()
            .rev()
            .find_map(|snapshot| snapshot.thread_id)
            .expect("应当已经创建线程");

        client.assign_agent(thread_id, agent()).await.unwrap();
        client
            .push_agent_message(thread_id, &agent(), "您好，请问有什么可以帮您？")
            .await
            .unwrap();
        wait_until(&listener, |recorded| {
            has_snapshot(recorded, |snapshot| {
                snapshot.phase == UiPhase::Ready && snapshot.groups.len() == 1
            })
        })
        .await;

        container.send_message(OutgoingMessage::text("我的订单没有到"));
        wait_until(&listener, |recorded| {
            has_snapshot(recorded, |snapshot| snapshot.groups.len() == 2)
        })
        .await;

        client.close_thread(thread_id).await.unwrap();
        wait_until(&listener, |recorded| {
            recorded.contains(&Recorded::Overlay(Some(Overlay::EndConversation)))
        })
        .await;

        container
            .resolve_end_conversation(EndConversationAction::StartNew)
            .await;
        wait_until(&listener, |recorded| {
            has_snapshot(recorded, |snapshot| {
                snapshot.thread_id.is_some_and(|id| id != thread_id)
                    && snapshot.phase == UiPhase::Queued
            })
        })
        .await;
        assert_eq!(
            client
                .calls()
                .iter()
                .filter(|call| call.as_str() == "create_thread")
                .count(),
            2
        );

        container
            .resolve_end_conversation(EndConversationAction::Close)
            .await;
        assert!(listener.dismissed());
        assert!(container.current_thread_view().is_none());
    }

    #[tokio::test]
    async fn connect_failure_alerts_and_retry_reconnects() {
        init_test_logger();
        let (client, listener, container) =
            setup(InMemoryChatClient::new(ChatMode::SingleThread));
        client.fail_on("connect");

        container.connect().await;
        assert!(matches!(
            listener.alerts().as_slice(),
            [ChatAlert::Generic {
                operation: FailedOperation::Connect,
                ..
            }]
        ));

        client.recover("connect");
        container.resolve_alert(AlertResponse::Retry).await;
        wait_until(&listener, |recorded| {
            has_snapshot(recorded, |snapshot| snapshot.phase == UiPhase::Ready)
        })
        .await;
        assert_eq!(container.chat_state(), ChatState::Ready);
    }

    #[tokio::test]
    async fn foreground_refresh_reloads_the_thread() {
        init_test_logger();
        let existing = thread_with(ThreadStatus::Ready, vec![agent_message(0, "hello")]);
        let (client, listener, container) = setup(
            InMemoryChatClient::new(ChatMode::SingleThread).with_threads(vec![existing.clone()]),
        );

        container.connect().await;
        wait_until(&listener, |recorded| {
            has_snapshot(recorded, |snapshot| snapshot.phase == UiPhase::Ready)
        })
        .await;
        let loads_before = client
            .calls()
            .iter()
            .filter(|call| call.as_str() == "load_thread")
            .count();

        container.enter_foreground();
        wait_until(&listener, |_| {
            client
                .calls()
                .iter()
                .filter(|call| call.as_str() == "load_thread")
                .count()
                == loads_before + 1
        })
        .await;
    }

    #[tokio::test]
    async fn multi_thread_waits_for_open_thread() {
        init_test_logger();
        let mut named = thread_with(ThreadStatus::Ready, vec![agent_message(0, "hi")]);
        named.name = Some("退款咨询".to_string());
        let (client, listener, container) = setup(
            InMemoryChatClient::new(ChatMode::MultiThread).with_threads(vec![named.clone()]),
        );

        container.connect().await;
        assert!(container.current_thread_view().is_none());
        assert!(listener.snapshots().is_empty());

        assert!(container.open_thread(Uuid::new_v4()).await.is_err());

        container.open_thread(named.id).await.unwrap();
        wait_until(&listener, |recorded| {
            has_snapshot(recorded, |snapshot| {
                snapshot.phase == UiPhase::Ready
                    && snapshot.display_name.as_deref() == Some("退款咨询")
            })
        })
        .await;
        assert!(!client.calls().contains(&"create_thread".to_string()));
    }

    #[tokio::test]
    async fn offline_service_shows_offline_overlay() {
        init_test_logger();
        let (client, listener, container) = setup(InMemoryChatClient::new(ChatMode::LiveChat));
        client.set_availability(false).await;

        container.connect().await;
        wait_until(&listener, |recorded| {
            recorded.contains(&Recorded::Overlay(Some(Overlay::Offline)))
        })
        .await;
        wait_until(&listener, |recorded| {
            has_snapshot(recorded, |snapshot| snapshot.phase == UiPhase::Offline)
        })
        .await;
        assert!(!client.calls().contains(&"create_thread".to_string()));
    }
}
