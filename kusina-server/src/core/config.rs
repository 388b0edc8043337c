use std::path::PathBuf;

use chrono_tz::Tz;

use crate::auth::JwtConfig;

/// 服务器配置
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | /var/lib/kusina | 工作目录 |
/// | HTTP_PORT | 3000 | HTTP 服务端口 |
/// | ENVIRONMENT | development | 运行环境 |
/// | BUSINESS_TIMEZONE | Asia/Manila | 业务时区 (聊天日期闸门、日期筛选) |
/// | PLATFORM_FEE | 10.0 | 每单平台费 |
/// | DOWNPAYMENT_RATIO | 0.5 | 默认定金比例 |
/// | REQUEST_TIMEOUT_MS | 30000 | 请求超时(毫秒) |
/// | PUBLIC_BASE_URL | http://localhost:3000 | 对外地址 (上传链接) |
/// | MENU_FILE | - | 菜单 JSON 文件 |
/// | VOUCHER_FILE | - | 优惠券 JSON 文件 |
/// | DELIVERY_ZONES | - | 配送费表 `keyword=fee;...` |
/// | INQUIRY_WEBHOOK_URL | - | 咨询转发地址 |
/// | LOG_LEVEL | info | 日志级别 |
/// | LOG_DIR | - | 日志目录 (存在时按天滚动) |
///
/// JWT 相关配置见 [`JwtConfig`]。
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/kusina HTTP_PORT=8080 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录，存储数据库、文件、暂存凭证
    pub work_dir: String,
    /// HTTP API 服务端口
    pub http_port: u16,
    /// JWT 认证配置
    pub jwt: JwtConfig,
    /// 运行环境: development | staging | production
    pub environment: String,

    // === 业务配置 ===
    /// 业务时区
    pub business_timezone: Tz,
    /// 平台费
    pub platform_fee: f64,
    /// 默认定金比例 (0, 1)
    pub downpayment_ratio: f64,
    /// 请求超时时间 (毫秒)
    pub request_timeout_ms: u64,
    /// 对外访问地址
    pub public_base_url: String,
    /// 菜单文件 (未设置时使用内置示例菜单)
    pub menu_file: Option<String>,
    /// 优惠券文件 (未设置时没有可用优惠券)
    pub voucher_file: Option<String>,
    /// 配送费表
    pub delivery_zones: String,
    /// 咨询转发 webhook (未设置时只记录日志)
    pub inquiry_webhook_url: Option<String>,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/kusina".into()),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            jwt: JwtConfig::default(),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),

            business_timezone: std::env::var("BUSINESS_TIMEZONE")
                .ok()
                .and_then(|tz| tz.parse().ok())
                .unwrap_or(chrono_tz::Asia::Manila),
            platform_fee: std::env::var("PLATFORM_FEE")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|fee: &f64| fee.is_finite() && *fee >= 0.0)
                .unwrap_or(10.0),
            downpayment_ratio: std::env::var("DOWNPAYMENT_RATIO")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(shared::order::payment::DEFAULT_DOWNPAYMENT_RATIO),
            request_timeout_ms: std::env::var("REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(30000),
            public_base_url: std::env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),
            menu_file: std::env::var("MENU_FILE").ok().filter(|s| !s.is_empty()),
            voucher_file: std::env::var("VOUCHER_FILE").ok().filter(|s| !s.is_empty()),
            delivery_zones: std::env::var("DELIVERY_ZONES").unwrap_or_default(),
            inquiry_webhook_url: std::env::var("INQUIRY_WEBHOOK_URL")
                .ok()
                .filter(|s| !s.is_empty()),
        }
    }

    /// 使用自定义值覆盖部分配置
    ///
    /// 常用于测试场景
    pub fn with_overrides(work_dir: impl Into<String>, http_port: u16) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.http_port = http_port;
        config
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// 是否开发环境
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    // ========== 目录结构 ==========

    /// 数据库目录: {work_dir}/database
    pub fn database_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("database")
    }

    /// 数据库文件: {work_dir}/database/kusina.redb
    pub fn database_path(&self) -> PathBuf {
        self.database_dir().join("kusina.redb")
    }

    /// 文件存储目录: {work_dir}/blobs
    pub fn blobs_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("blobs")
    }

    /// 尾款凭证暂存目录: {work_dir}/staging/remaining-proofs
    pub fn staging_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir)
            .join("staging")
            .join("remaining-proofs")
    }

    /// 确保工作目录结构存在
    pub fn ensure_work_dir_structure(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.database_dir())?;
        std::fs::create_dir_all(self.blobs_dir())?;
        std::fs::create_dir_all(self.staging_dir())?;
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
