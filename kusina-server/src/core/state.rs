use std::sync::Arc;

use anyhow::Context;

use crate::auth::JwtService;
use crate::chat::ChatChannel;
use crate::core::{Config, Result};
use crate::message::MessageBus;
use crate::orders::{OrderSettings, OrderStorage, OrdersManager};
use crate::payments::ProofStaging;
use crate::services::{
    BlobStore, Catalog, DeliveryFeeLookup, InMemoryCatalog, InquiryNotifier, LocalBlobStore,
    LogNotifier, VoucherRegistry, VoucherValidator, WebhookNotifier, ZoneFeeTable,
};

/// 服务器状态 - 持有所有服务的单例引用
///
/// 使用 Arc 实现浅拷贝，每个请求克隆一份。
///
/// # 服务组件
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | jwt_service | Arc<JwtService> | JWT 认证服务 |
/// | orders | Arc<OrdersManager> | 订单聚合存储 |
/// | chat | ChatChannel | 订单聊天 |
/// | staging | Arc<ProofStaging> | 尾款凭证暂存 |
/// | blob_store | Arc<dyn BlobStore> | 图片存储 |
/// | catalog | Arc<dyn Catalog> | 菜单 |
/// | vouchers | Arc<dyn VoucherValidator> | 优惠券 |
/// | delivery_fees | Arc<dyn DeliveryFeeLookup> | 配送费 |
/// | notifier | Arc<dyn InquiryNotifier> | 咨询转发 |
/// | message_bus | MessageBus | 实时推送 |
#[derive(Clone, Debug)]
pub struct ServerState {
    /// 服务器配置
    pub config: Config,
    /// JWT 认证服务 (Arc 共享所有权)
    pub jwt_service: Arc<JwtService>,
    pub orders: Arc<OrdersManager>,
    pub chat: ChatChannel,
    pub staging: Arc<ProofStaging>,
    pub blob_store: Arc<dyn BlobStore>,
    pub catalog: Arc<dyn Catalog>,
    pub vouchers: Arc<dyn VoucherValidator>,
    pub delivery_fees: Arc<dyn DeliveryFeeLookup>,
    pub notifier: Arc<dyn InquiryNotifier>,
    /// 消息总线 (SSE 订阅)
    pub message_bus: MessageBus,
}

impl ServerState {
    /// 初始化服务器状态
    ///
    /// 按顺序初始化：
    /// 1. 工作目录结构
    /// 2. 数据库 (work_dir/database/kusina.redb)，订单与聊天共用
    /// 3. 协作服务 (菜单、优惠券、配送费、咨询、文件存储)
    /// 4. 订单管理器、聊天频道、凭证暂存
    pub fn initialize(config: &Config) -> Result<Self> {
        // 0. Ensure work_dir structure exists
        config.ensure_work_dir_structure()?;

        // 1. Storage
        let storage = OrderStorage::open(config.database_path())?;
        let message_bus = MessageBus::new();

        // 2. Collaborators
        let catalog: Arc<dyn Catalog> = match &config.menu_file {
            Some(path) => Arc::new(
                InMemoryCatalog::from_file(path)
                    .with_context(|| format!("loading menu from {path}"))?,
            ),
            None => {
                tracing::info!("MENU_FILE not set, serving the sample menu");
                Arc::new(InMemoryCatalog::sample())
            }
        };

        let vouchers: Arc<dyn VoucherValidator> = match &config.voucher_file {
            Some(path) => Arc::new(
                VoucherRegistry::from_file(path)
                    .with_context(|| format!("loading vouchers from {path}"))?,
            ),
            None => Arc::new(VoucherRegistry::new()),
        };

        let zones = ZoneFeeTable::parse(&config.delivery_zones)
            .map_err(anyhow::Error::msg)
            .context("parsing DELIVERY_ZONES")?;
        tracing::info!(zones = zones.len(), "Delivery zones loaded");
        let delivery_fees: Arc<dyn DeliveryFeeLookup> = Arc::new(zones);

        let notifier: Arc<dyn InquiryNotifier> = match &config.inquiry_webhook_url {
            Some(url) => Arc::new(WebhookNotifier::new(url)),
            None => Arc::new(LogNotifier),
        };

        let blob_store: Arc<dyn BlobStore> = Arc::new(LocalBlobStore::new(
            config.blobs_dir(),
            &config.public_base_url,
        ));

        // 3. Stores
        let settings = OrderSettings {
            platform_fee: config.platform_fee,
            downpayment_ratio: config.downpayment_ratio,
            tz: config.business_timezone,
        };
        let mut manager = OrdersManager::new(storage.clone(), message_bus.clone(), settings);
        manager.set_catalog(catalog.clone());
        manager.set_vouchers(vouchers.clone());
        manager.set_delivery_fees(delivery_fees.clone());
        let orders = Arc::new(manager);

        let chat = ChatChannel::new(storage, message_bus.clone(), config.business_timezone)?;
        let staging = Arc::new(ProofStaging::new(
            config.staging_dir(),
            orders.clone(),
            blob_store.clone(),
        ));
        let jwt_service = Arc::new(JwtService::with_config(config.jwt.clone()));

        tracing::info!(
            work_dir = %config.work_dir,
            timezone = %config.business_timezone,
            "Server state initialized"
        );

        Ok(Self {
            config: config.clone(),
            jwt_service,
            orders,
            chat,
            staging,
            blob_store,
            catalog,
            vouchers,
            delivery_fees,
            notifier,
            message_bus,
        })
    }
}
