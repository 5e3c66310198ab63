//! 聊天组件 CLI（演示版）
//!
//! 非交互式 CLI，用于演示消息分组和会话视图状态协调
//! - `group`：读取 JSON 消息列表，输出分组结果
//! - `demo`：用内存版 SDK 跑一遍完整的会话流程，输出每次状态变化

use anyhow::{Context, Result};
use chat_widget_core::im::client::{ChatClient, OutgoingMessage};
use chat_widget_core::im::container::ChatContainer;
use chat_widget_core::im::delegate::ChatDelegate;
use chat_widget_core::im::error::ChatAlert;
use chat_widget_core::im::memory_client::InMemoryChatClient;
use chat_widget_core::im::message::{group_messages, Message};
use chat_widget_core::im::thread::{
    EndConversationAction, Overlay, ThreadViewConfig, ThreadViewListener, ThreadViewSnapshot,
};
use chat_widget_core::im::types::{AgentInfo, ChatMode};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};

/// 聊天组件 CLI
#[derive(Parser, Debug)]
#[command(name = "chat-widget-cli")]
#[command(about = "聊天组件 CLI - 用于演示消息分组和会话状态协调", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// 日志级别（默认: info,chat_widget_core=debug）
    #[arg(long, default_value = "info,chat_widget_core=debug")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 对 JSON 消息列表分组
    Group {
        /// 消息列表文件（JSON 数组）
        #[arg(short, long)]
        input: PathBuf,

        /// 分组间隔（秒）
        #[arg(long, default_value = "120")]
        interval: u64,
    },
    /// 使用内存版 SDK 演示完整会话流程
    Demo {
        /// 会话模式
        #[arg(short, long, value_enum, default_value = "live")]
        mode: DemoMode,

        /// 会话视图配置文件（JSON）
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// 流程结束后继续运行的时长（秒）
        #[arg(short, long, default_value = "1")]
        duration: u64,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum DemoMode {
    Single,
    Multi,
    Live,
}

impl From<DemoMode> for ChatMode {
    fn from(mode: DemoMode) -> Self {
        match mode {
            DemoMode::Single => ChatMode::SingleThread,
            DemoMode::Multi => ChatMode::MultiThread,
            DemoMode::Live => ChatMode::LiveChat,
        }
    }
}

/// 初始化日志（只输出到 stdout）
///
/// 演示命令每次运行时间很短，输出直接在终端查看，不写 debug.log 文件；
/// 需要保存时用 shell 重定向即可。
fn init_logger(log_level: &str) {
    use std::io;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    // 优先使用环境变量 RUST_LOG（如果设置了），否则使用命令行参数
    let filter_layer =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    // 输出到 stdout（控制台），保留 ANSI 颜色代码用于终端显示
    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stdout)
        .with_file(true)
        .with_line_number(true)
        .with_target(false)
        .with_ansi(true);

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(stdout_layer)
        .init();
}

/// 把所有界面回调输出到日志
struct CliThreadViewListener;

#[async_trait::async_trait]
impl ThreadViewListener for CliThreadViewListener {
    async fn on_view_state_changed(&self, snapshot: ThreadViewSnapshot) {
        info!(
            "[CLI/View] 🔄 phase={:?} | 输入框: {} | 分组: {} | 排队: {:?} | 名称: {:?}",
            snapshot.phase,
            if snapshot.input_enabled { "可用" } else { "禁用" },
            snapshot.groups.len(),
            snapshot.position_in_queue,
            snapshot.display_name,
        );
        for group in &snapshot.groups {
            let texts: Vec<String> = group.messages().iter().map(Message::summary).collect();
            info!(
                "[CLI/View]   - {}{}{} {}",
                if group.show_header { "[头] " } else { "" },
                group.sender().display_name,
                if group.show_footer { " [尾]" } else { "" },
                texts.join(" / ")
            );
        }
        if let Some(agent) = &snapshot.agent_typing {
            info!("[CLI/View] ⌨️ {} 正在输入...", agent.display_name());
        }
    }

    async fn on_overlay_changed(&self, overlay: Option<Overlay>) {
        match overlay {
            Some(overlay) => info!("[CLI/View] 🪟 显示遮罩: {:?}", overlay),
            None => info!("[CLI/View] 🪟 隐藏遮罩"),
        }
    }

    async fn on_alert(&self, alert: ChatAlert) {
        error!("[CLI/View] ❌ 提示框: {:?}", alert);
    }

    async fn on_chat_dismissed(&self) {
        info!("[CLI/View] 👋 聊天窗口已关闭");
    }
}

fn run_group(input: &Path, interval: u64) -> Result<()> {
    let content = std::fs::read_to_string(input)
        .with_context(|| format!("读取消息文件失败: {}", input.display()))?;
    let messages: Vec<Message> = serde_json::from_str(&content)
        .with_context(|| format!("解析消息文件失败: {}", input.display()))?;

    let groups = group_messages(&messages, Duration::from_secs(interval));
    info!(
        "[CLI] 📋 {} 条消息分为 {} 组（间隔 {} 秒）",
        messages.len(),
        groups.len(),
        interval
    );
    for (index, group) in groups.iter().enumerate() {
        info!(
            "[CLI]   #{} {} | {} 条 | 头: {} | 尾: {} | {}",
            index + 1,
            group.sender().display_name,
            group.messages().len(),
            group.show_header,
            group.show_footer,
            group.date().to_rfc3339()
        );
    }
    Ok(())
}

async fn run_demo(mode: ChatMode, config: ThreadViewConfig, duration: u64) -> Result<()> {
    // 每一步之后等待遮罩过渡结束
    let pause = config.overlay_transition * 4 + Duration::from_millis(200);
    let settle = || sleep(pause);
    let client = Arc::new(InMemoryChatClient::new(mode));
    let container = Arc::new(ChatContainer::new(
        client.clone(),
        Arc::new(CliThreadViewListener),
        config,
    ));
    let delegate: Arc<dyn ChatDelegate> = container.clone();
    client.set_delegate(&delegate);

    let agent = AgentInfo {
        id: "agent-1".to_string(),
        first_name: "小".to_string(),
        last_name: "王".to_string(),
        nickname: Some("客服小王".to_string()),
    };

    info!("[CLI] 🔗 正在连接...");
    container.connect().await;
    settle().await;

    let thread_id = if mode == ChatMode::MultiThread {
        let thread = client
            .create_thread(Default::default())
            .await
            .context("创建线程失败")?;
        container.open_thread(thread.id).await?;
        thread.id
    } else {
        wait_for_thread(&client).await?
    };
    settle().await;

    if mode == ChatMode::LiveChat {
        info!("[CLI] ⏳ 排队中，等待坐席接入");
        client.set_queue_position(thread_id, Some(1)).await?;
        settle().await;
        client.assign_agent(thread_id, agent.clone()).await?;
        settle().await;
    }

    client.agent_typing(thread_id, agent.clone(), true).await;
    client
        .push_agent_message(thread_id, &agent, "您好，请问有什么可以帮您？")
        .await?;
    client.agent_typing(thread_id, agent.clone(), false).await;
    settle().await;

    container.send_message(OutgoingMessage::text("我的订单还没有发货"));
    container.send_message(OutgoingMessage::text("订单号 20240501"));
    settle().await;

    info!("[CLI] ☀️ 模拟回到前台");
    container.enter_foreground();
    settle().await;

    if mode == ChatMode::LiveChat {
        client.close_thread(thread_id).await?;
        settle().await;
        container
            .resolve_end_conversation(EndConversationAction::Close)
            .await;
    } else {
        container.disconnect().await;
    }

    if duration > 0 {
        info!("[CLI] ⏰ {} 秒后退出", duration);
        sleep(Duration::from_secs(duration)).await;
    }
    Ok(())
}

/// 等待会话视图引导出线程
async fn wait_for_thread(client: &InMemoryChatClient) -> Result<uuid::Uuid> {
    for _ in 0..100 {
        if let Some(thread) = client.get_threads().await?.first() {
            return Ok(thread.id);
        }
        sleep(Duration::from_millis(100)).await;
    }
    anyhow::bail!("会话视图没有创建线程")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 初始化日志
    init_logger(&args.log_level);

    match args.command {
        Command::Group { input, interval } => run_group(&input, interval)?,
        Command::Demo {
            mode,
            config,
            duration,
        } => {
            let config = match config {
                Some(path) => ThreadViewConfig::from_json_file(&path)?,
                None => {
                    warn!("[CLI] ⚠️ 未指定配置文件，使用默认配置");
                    ThreadViewConfig::default()
                }
            };
            info!("[CLI] 🚀 演示模式: {:?}", mode);
            run_demo(mode.into(), config, duration).await?;
        }
    }

    info!("[CLI] 👋 程序退出");
    Ok(())
}
