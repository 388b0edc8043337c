//! Two-phase remaining-proof upload
//!
//! `stage` keeps the selected image in a local write-ahead entry keyed by
//! order id, so a reload or restart does not lose it. Nothing reaches the
//! blob store until `confirm`, and `cancel` only drops the local entry.
//!
//! ```text
//! stage(order, file) ──> staging/<order_id>.json
//!                              │
//!            cancel ───────────┤ (remove entry)
//!                              │
//!           confirm ───> BlobStore::put ──> OrdersManager::attach_remaining_proof
//!                              └─ entry removed only after the order is patched
//! ```

use crate::auth::CurrentUser;
use crate::orders::{ManagerError, OrdersManager};
use crate::services::blob_store::{BlobError, BlobStore, validate_image};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use shared::error::{AppError, ErrorCode};
use shared::order::Order;
use shared::order::payment;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StagingError {
    #[error("No staged proof for order {0}")]
    NoStagedProof(String),

    #[error("Staged entry is unreadable: {0}")]
    Corrupt(String),

    #[error("Staging IO error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Blob(#[from] BlobError),

    #[error(transparent)]
    Manager(#[from] ManagerError),
}

impl From<StagingError> for AppError {
    fn from(err: StagingError) -> Self {
        match err {
            e @ StagingError::NoStagedProof(_) => {
                AppError::with_message(ErrorCode::NoStagedProof, e.to_string())
            }
            StagingError::Corrupt(msg) => {
                tracing::error!(error = %msg, "Staged proof entry is corrupt");
                AppError::with_message(ErrorCode::FileStorageFailed, msg)
            }
            StagingError::Io(e) => {
                tracing::error!(error = %e, "Staging IO failure");
                AppError::with_message(ErrorCode::FileStorageFailed, e.to_string())
            }
            StagingError::Blob(e) => e.into(),
            StagingError::Manager(e) => e.into(),
        }
    }
}

pub type StagingResult<T> = Result<T, StagingError>;

/// Staged file as returned to clients (without the bytes)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagedProof {
    pub order_id: String,
    pub file_name: String,
    pub content_type: String,
    pub size: usize,
    pub staged_at: i64,
}

/// On-disk entry: metadata plus base64 content
#[derive(Serialize, Deserialize)]
struct StagedEntry {
    #[serde(flatten)]
    meta: StagedProof,
    data: String,
}

#[derive(Debug)]
pub struct ProofStaging {
    dir: PathBuf,
    orders: Arc<OrdersManager>,
    blobs: Arc<dyn BlobStore>,
}

impl ProofStaging {
    pub fn new(
        dir: impl Into<PathBuf>,
        orders: Arc<OrdersManager>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            dir: dir.into(),
            orders,
            blobs,
        }
    }

    fn entry_path(&self, order_id: &str) -> StagingResult<PathBuf> {
        let safe = !order_id.is_empty()
            && order_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !safe {
            return Err(ManagerError::OrderNotFound(order_id.to_string()).into());
        }
        Ok(self.dir.join(format!("{order_id}.json")))
    }

    /// The order must exist, belong to the customer and still need a proof
    fn load_order(&self, actor: &CurrentUser, order_id: &str) -> StagingResult<Order> {
        if !actor.is_customer() {
            return Err(ManagerError::PermissionDenied(
                "payment proofs are uploaded by the customer".to_string(),
            )
            .into());
        }
        Ok(self.orders.get_order(actor, order_id)?)
    }

    fn read_entry(&self, order_id: &str) -> StagingResult<Option<StagedEntry>> {
        let path = self.entry_path(order_id)?;
        let raw = match std::fs::read(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&raw)
            .map(Some)
            .map_err(|e| StagingError::Corrupt(e.to_string()))
    }

    /// Stage (or replace) the proof image for an order
    pub fn stage(
        &self,
        actor: &CurrentUser,
        order_id: &str,
        file_name: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> StagingResult<StagedProof> {
        let order = self.load_order(actor, order_id)?;
        payment::check_remaining_proof_allowed(&order).map_err(ManagerError::from)?;
        let content_type = validate_image(bytes, content_type)?;

        let entry = StagedEntry {
            meta: StagedProof {
                order_id: order_id.to_string(),
                file_name: file_name.to_string(),
                content_type: content_type.to_string(),
                size: bytes.len(),
                staged_at: shared::util::now_millis(),
            },
            data: BASE64.encode(bytes),
        };
        let json = serde_json::to_vec(&entry).map_err(|e| StagingError::Corrupt(e.to_string()))?;

        let path = self.entry_path(order_id)?;
        std::fs::create_dir_all(&self.dir)?;
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &path)?;

        tracing::info!(order_id = %order_id, size = bytes.len(), "Remaining proof staged");
        Ok(entry.meta)
    }

    pub fn get_staged(&self, actor: &CurrentUser, order_id: &str) -> StagingResult<Option<StagedProof>> {
        self.load_order(actor, order_id)?;
        Ok(self.read_entry(order_id)?.map(|entry| entry.meta))
    }

    /// Drop the staged entry; returns whether one existed
    pub fn cancel(&self, actor: &CurrentUser, order_id: &str) -> StagingResult<bool> {
        self.load_order(actor, order_id)?;
        let path = self.entry_path(order_id)?;
        match std::fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!(order_id = %order_id, "Staged proof cancelled");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Upload the staged image and patch the order
    ///
    /// The entry survives any failure so the customer can retry.
    pub fn confirm(&self, actor: &CurrentUser, order_id: &str) -> StagingResult<Order> {
        self.load_order(actor, order_id)?;
        let entry = self
            .read_entry(order_id)?
            .ok_or_else(|| StagingError::NoStagedProof(order_id.to_string()))?;
        let bytes = BASE64
            .decode(entry.data.as_bytes())
            .map_err(|e| StagingError::Corrupt(e.to_string()))?;

        let blob_id = self.blobs.put(&bytes, &entry.meta.content_type)?;
        let url = self.blobs.resolve_url(&blob_id);
        let order = self.orders.attach_remaining_proof(actor, order_id, url)?;

        let path = self.entry_path(order_id)?;
        if let Err(e) = std::fs::remove_file(&path) {
            tracing::warn!(order_id = %order_id, error = %e, "Failed to remove confirmed staging entry");
        }
        tracing::info!(order_id = %order_id, blob_id = %blob_id, "Remaining proof confirmed");
        Ok(order)
    }
}
