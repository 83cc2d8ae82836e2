//! # miller 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/miller.rs`

use clap::Args;
use std::path::PathBuf;

/// miller 子命令参数
#[derive(Args, Debug)]
pub struct MillerArgs {
    /// Bulk structure file (POSCAR)
    pub input: PathBuf,

    /// Maximum absolute Miller index
    #[arg(short, long, default_value_t = 1)]
    pub max_index: i32,

    /// Symmetry tolerance in Angstrom
    #[arg(long, default_value_t = 1e-2)]
    pub symprec: f64,
}
