pub mod im;

// 重新导出常用类型和函数，方便外部使用
pub use im::{
    container::ChatContainer,
    message::{group_messages, Message, MessageGroup},
    thread::{ThreadHandle, ThreadStateReconciler, ThreadViewConfig, ThreadViewListener},
    types::{ChatMode, ChatState, ThreadSnapshot},
};
