//! # surface 子命令 CLI 定义
//!
//! 从体相结构生成指定晶面的 slab。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/surface.rs`

use clap::Args;
use std::path::PathBuf;

/// surface 子命令参数
#[derive(Args, Debug)]
pub struct SurfaceArgs {
    /// Bulk structure file (POSCAR)
    pub input: PathBuf,

    /// Miller index of the surface plane (h k l)
    #[arg(long, num_args = 3, required = true, allow_negative_numbers = true)]
    pub miller: Vec<i32>,

    /// Number of bulk repeats along the surface normal
    #[arg(short, long, default_value_t = 3)]
    pub layers: usize,

    /// Vacuum thickness in Angstrom
    #[arg(short, long, default_value_t = 10.0)]
    pub vacuum: f64,

    /// Tolerance for grouping atoms into layers (Angstrom, default: auto)
    #[arg(long)]
    pub layer_tolerance: Option<f64>,

    /// Number of atomic layers to remove from the top
    #[arg(long, default_value_t = 0)]
    pub remove_top: usize,

    /// Number of atomic layers to remove from the bottom
    #[arg(long, default_value_t = 0)]
    pub remove_bottom: usize,

    /// Write the primitive slab instead of the conventional one
    #[arg(long, default_value_t = false)]
    pub primitive: bool,

    /// Symmetry tolerance in Angstrom
    #[arg(long, default_value_t = 1e-2)]
    pub symprec: f64,

    /// Output POSCAR file
    #[arg(short, long, default_value = "POSCAR_slab")]
    pub output: PathBuf,
}
