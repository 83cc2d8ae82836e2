//! # scan 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/scan.rs`

use super::interface::InterfaceInputs;

use clap::Args;
use std::path::PathBuf;

/// scan 子命令参数
#[derive(Args, Debug)]
pub struct ScanArgs {
    #[command(flatten)]
    pub inputs: InterfaceInputs,

    /// In-plane grid points (nx ny)
    #[arg(long, num_args = 2, default_values_t = [20, 20])]
    pub grid: Vec<usize>,

    /// Scan these interfacial distances (Angstrom) instead of the in-plane grid
    #[arg(long, value_delimiter = ',')]
    pub distances: Option<Vec<f64>>,

    /// Number of parallel jobs (0 = auto)
    #[arg(short, long, default_value_t = 0)]
    pub jobs: usize,

    /// Output CSV file
    #[arg(short, long, default_value = "scan.csv")]
    pub output: PathBuf,
}
