//! Kusina Server - 餐厅点餐后端
//!
//! # 架构概述
//!
//! - **订单** (`orders`): redb 存储的订单聚合，状态机校验与 CAS 更新
//! - **聊天** (`chat`): 按订单的聊天频道，日期闸门与已读水位
//! - **支付** (`payments`): 尾款凭证两阶段上传
//! - **协作服务** (`services`): 菜单、文件存储、优惠券、配送费、咨询通知
//! - **认证** (`auth`): JWT 身份解析
//! - **HTTP API** (`api`): RESTful 接口与 SSE 实时推送
//!
//! # 模块结构
//!
//! ```text
//! kusina-server/src/
//! ├── core/          # 配置、状态、服务器、错误
//! ├── auth/          # JWT 认证
//! ├── orders/        # 订单存储与管理器
//! ├── chat/          # 聊天存储与频道
//! ├── payments/      # 凭证暂存
//! ├── services/      # 外部协作者 trait 及默认实现
//! ├── message/       # 实时消息总线
//! ├── api/           # HTTP 路由和处理器
//! └── utils/         # 工具函数
//! ```

pub mod api;
pub mod auth;
pub mod chat;
pub mod core;
pub mod message;
pub mod orders;
pub mod payments;
pub mod services;
pub mod utils;

// Re-export 公共类型
pub use auth::{CurrentUser, JwtService};
pub use chat::{ChatChannel, ChatStorage};
pub use core::{Config, Server, ServerState};
pub use message::MessageBus;
pub use orders::{OrderStorage, OrdersManager};
pub use payments::ProofStaging;
pub use utils::{AppError, AppResult};

// Re-export unified error types from shared
pub use utils::{ApiResponse, ErrorCategory, ErrorCode};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

// Security logging macro - 支持 tracing 格式说明符
#[macro_export]
macro_rules! security_log {
    ($level:expr, $event:expr, $($key:ident = $value:expr),*) => {
        tracing::info!(
            target: "security",
            level = $level,
            event = $event,
            $($key = $value),*
        );
    };
}

/// 设置运行环境
///
/// 1. 加载 `.env` (不存在时忽略)
/// 2. 初始化日志 (`LOG_LEVEL`, `LOG_DIR`)
pub fn setup_environment() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    let log_level = std::env::var("LOG_LEVEL").ok();
    let log_dir = std::env::var("LOG_DIR").ok();
    init_logger_with_file(log_level.as_deref(), None, log_dir.as_deref());

    Ok(())
}

pub fn print_banner() {
    println!(
        r#"
    __ __           _
   / //_/_  _______(_)___  ____ _
  / ,< / / / / ___/ / __ \/ __ `/
 / /| / /_/ (__  ) / / / / /_/ /
/_/ |_\__,_/____/_/_/ /_/\__,_/
    "#
    );
}
