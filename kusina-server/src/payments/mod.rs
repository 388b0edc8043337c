//! 尾款凭证上传 (两阶段: 暂存 → 确认)

pub mod staging;

pub use staging::{ProofStaging, StagedProof, StagingError, StagingResult};
