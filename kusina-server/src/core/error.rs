use thiserror::Error;

/// 服务器启动/运行期错误
///
/// 请求级错误使用 [`crate::AppError`]，这里只覆盖启动流程和监听循环。
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("存储初始化失败: {0}")]
    Storage(#[from] crate::orders::storage::StorageError),

    #[error("内部服务器错误: {0}")]
    Internal(#[from] anyhow::Error),
}

/// 启动流程的 Result 类型别名
pub type Result<T> = std::result::Result<T, ServerError>;
