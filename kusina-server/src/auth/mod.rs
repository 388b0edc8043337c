//! 认证模块
//!
//! - [`JwtService`] - JWT 令牌验证
//! - [`CurrentUser`] - 当前用户上下文
//! - [`require_auth`] - 认证中间件

pub mod extractor;
pub mod jwt;
pub mod middleware;

pub use jwt::{Claims, CurrentUser, JwtConfig, JwtError, JwtService};
pub use middleware::require_auth;
