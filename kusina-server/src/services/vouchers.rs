//! Voucher validation
//!
//! Codes are matched case-insensitively. A use is reserved before the order
//! transaction and released again if the order is not committed.

use dashmap::DashMap;
use shared::error::{AppError, ErrorCode};
use shared::models::{Voucher, VoucherCode, VoucherValidation};
use std::path::Path;
use thiserror::Error;
use validator::Validate;

#[derive(Debug, Error)]
pub enum VoucherError {
    #[error("Invalid voucher code format: {0}")]
    InvalidFormat(String),

    #[error("Voucher not found: {0}")]
    NotFound(String),

    #[error("Voucher usage limit reached: {0}")]
    Exhausted(String),

    #[error("Failed to load vouchers: {0}")]
    Load(String),
}

impl From<VoucherError> for AppError {
    fn from(err: VoucherError) -> Self {
        let code = match &err {
            VoucherError::InvalidFormat(_) => ErrorCode::ValidationFailed,
            VoucherError::NotFound(_) => ErrorCode::VoucherNotFound,
            VoucherError::Exhausted(_) => ErrorCode::VoucherInvalid,
            VoucherError::Load(_) => ErrorCode::ConfigError,
        };
        AppError::with_message(code, err.to_string())
    }
}

pub trait VoucherValidator: Send + Sync + std::fmt::Debug {
    /// Evaluate `code` against an order amount at time `now`
    fn validate(
        &self,
        code: &str,
        order_amount: f64,
        now: i64,
    ) -> Result<VoucherValidation, VoucherError>;

    /// Take one use of the voucher, failing with `Exhausted` at the limit
    fn redeem(&self, code: &str) -> Result<(), VoucherError>;

    /// Give back a use taken by [`redeem`](Self::redeem)
    fn release(&self, code: &str);
}

/// In-memory voucher registry keyed by normalized code
#[derive(Debug, Default)]
pub struct VoucherRegistry {
    vouchers: DashMap<String, Voucher>,
}

impl VoucherRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vouchers(vouchers: impl IntoIterator<Item = Voucher>) -> Self {
        let registry = Self::new();
        for voucher in vouchers {
            registry.insert(voucher);
        }
        registry
    }

    /// Load a JSON array of vouchers, skipping entries that fail validation
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, VoucherError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| VoucherError::Load(format!("{}: {}", path.display(), e)))?;
        let vouchers: Vec<Voucher> = serde_json::from_str(&raw)
            .map_err(|e| VoucherError::Load(format!("{}: {}", path.display(), e)))?;

        let registry = Self::new();
        for voucher in vouchers {
            if let Err(e) = voucher.validate() {
                tracing::warn!(code = %voucher.code, error = %e, "Skipping invalid voucher");
                continue;
            }
            registry.insert(voucher);
        }
        tracing::info!(path = %path.display(), count = registry.vouchers.len(), "Vouchers loaded");
        Ok(registry)
    }

    pub fn insert(&self, voucher: Voucher) {
        let key = VoucherCode::new(voucher.code.as_str()).normalized();
        self.vouchers.insert(key, voucher);
    }

    fn lookup_key(code: &str) -> Result<String, VoucherError> {
        let code = VoucherCode::new(code);
        code.validate()
            .map_err(|_| VoucherError::InvalidFormat(code.code.clone()))?;
        Ok(code.normalized())
    }
}

impl VoucherValidator for VoucherRegistry {
    fn validate(
        &self,
        code: &str,
        order_amount: f64,
        now: i64,
    ) -> Result<VoucherValidation, VoucherError> {
        let key = Self::lookup_key(code)?;
        let voucher = self
            .vouchers
            .get(&key)
            .ok_or_else(|| VoucherError::NotFound(code.to_string()))?;
        Ok(voucher.evaluate(order_amount, now))
    }

    fn redeem(&self, code: &str) -> Result<(), VoucherError> {
        let key = Self::lookup_key(code)?;
        let mut voucher = self
            .vouchers
            .get_mut(&key)
            .ok_or_else(|| VoucherError::NotFound(code.to_string()))?;
        // Check and increment under the same shard lock
        if voucher.is_exhausted() {
            return Err(VoucherError::Exhausted(code.to_string()));
        }
        voucher.usage_count += 1;
        Ok(())
    }

    fn release(&self, code: &str) {
        let Ok(key) = Self::lookup_key(code) else {
            return;
        };
        if let Some(mut voucher) = self.vouchers.get_mut(&key) {
            voucher.usage_count = voucher.usage_count.saturating_sub(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::VoucherType;

    fn voucher(code: &str, min: f64, limit: Option<u32>) -> Voucher {
        Voucher {
            code: code.to_string(),
            voucher_type: VoucherType::Fixed,
            value: 20.0,
            min_order_amount: min,
            max_discount: None,
            expires_at: None,
            usage_limit: limit,
            usage_count: 0,
            active: true,
        }
    }

    #[test]
    fn test_case_insensitive_lookup() {
        let registry = VoucherRegistry::with_vouchers([voucher("Kain20", 0.0, None)]);
        let result = registry.validate("  kain20 ", 100.0, 0).unwrap();
        assert!(result.valid);
        assert_eq!(result.discount, 20.0);
    }

    #[test]
    fn test_minimum_boundary_is_inclusive() {
        let registry = VoucherRegistry::with_vouchers([voucher("MIN200", 200.0, None)]);
        assert!(registry.validate("MIN200", 200.0, 0).unwrap().valid);
        assert!(!registry.validate("MIN200", 199.99, 0).unwrap().valid);
    }

    #[test]
    fn test_unknown_and_malformed_codes() {
        let registry = VoucherRegistry::new();
        assert!(matches!(
            registry.validate("NOPE", 100.0, 0),
            Err(VoucherError::NotFound(_))
        ));
        assert!(matches!(
            registry.validate("no spaces!", 100.0, 0),
            Err(VoucherError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_redeem_counts_usage() {
        let registry = VoucherRegistry::with_vouchers([voucher("ONCE", 0.0, Some(1))]);
        assert!(registry.validate("ONCE", 50.0, 0).unwrap().valid);
        registry.redeem("once").unwrap();
        assert!(!registry.validate("ONCE", 50.0, 0).unwrap().valid);
        assert!(matches!(
            registry.redeem("ONCE"),
            Err(VoucherError::Exhausted(_))
        ));

        registry.release("ONCE");
        assert!(registry.validate("ONCE", 50.0, 0).unwrap().valid);
    }

    #[test]
    fn test_concurrent_redeem_respects_limit() {
        use std::sync::{Arc, Barrier};

        let registry = Arc::new(VoucherRegistry::with_vouchers([voucher("TWICE", 0.0, Some(2))]));
        let barrier = Arc::new(Barrier::new(16));
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let registry = registry.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    registry.redeem("TWICE").is_ok()
                })
            })
            .collect();
        let redeemed = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(redeemed, 2);
    }

    #[test]
    fn test_exhausted_maps_to_voucher_invalid() {
        let err: AppError = VoucherError::Exhausted("ONCE".into()).into();
        assert_eq!(err.code, ErrorCode::VoucherInvalid);
    }

    #[test]
    fn test_from_file_skips_invalid_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vouchers.json");
        std::fs::write(
            &path,
            r#"[{"code":"GOOD","voucher_type":"fixed","value":10},
                {"code":"x","voucher_type":"fixed","value":10}]"#,
        )
        .unwrap();
        let registry = VoucherRegistry::from_file(&path).unwrap();
        assert!(registry.validate("GOOD", 10.0, 0).is_ok());
        assert!(registry.validate("xyz", 10.0, 0).is_err());
    }
}
