//! # 配准模块
//!
//! 薄膜相对衬底的最优面内平移。
//!
//! ## 子模块
//! - `radii`: 原子半径表与半径类型选择
//! - `landscape`: 高斯和能量面及深度修正面
//! - `optimizer`: 种子 + Adam + mean-shift + 排名
//! - `scan`: 网格/界面距离扫描与可插拔打分器
//! - `export`: CSV 导出
//!
//! ## 依赖关系
//! - 被 `commands/` 使用
//! - 使用 `interface/`、`surface/layers.rs`、`batch/`

pub mod export;
pub mod landscape;
pub mod optimizer;
pub mod radii;
pub mod scan;

pub use landscape::{LandscapeConfig, RegistrationLandscapes};
pub use optimizer::{AdamConfig, Basin, RegistrationOptimizer, RegistrationResult};
pub use scan::{OverlapScorer, ScanConfig, ScanResult, ShiftScorer};
