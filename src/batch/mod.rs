//! # 批量处理模块
//!
//! 能量面扫描等大量独立打分任务的并行执行。
//!
//! ## 依赖关系
//! - 被 `registration/scan.rs` 使用
//! - 使用 `rayon` 进行并行处理
//! - 使用 `indicatif` 显示进度

pub mod runner;

pub use runner::ScanRunner;
