//! # interface 子命令 CLI 定义
//!
//! 界面输入参数（`InterfaceInputs`）同时被 `scan` 子命令复用。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs`、`cli/scan.rs` 使用
//! - 参数传递给 `commands/interface.rs`

use super::parse_radius;

use clap::Args;
use std::path::PathBuf;

// ─────────────────────────────────────────────────────────────
// 共享的界面输入
// ─────────────────────────────────────────────────────────────

/// 构建界面所需的输入
#[derive(Args, Debug, Clone)]
pub struct InterfaceInputs {
    /// Substrate bulk structure (POSCAR)
    #[arg(long)]
    pub substrate: PathBuf,

    /// Film bulk structure (POSCAR)
    #[arg(long)]
    pub film: PathBuf,

    /// Substrate Miller index (h k l)
    #[arg(long, num_args = 3, required = true, allow_negative_numbers = true)]
    pub sub_miller: Vec<i32>,

    /// Film Miller index (h k l)
    #[arg(long, num_args = 3, required = true, allow_negative_numbers = true)]
    pub film_miller: Vec<i32>,

    /// Substrate slab thickness in bulk repeats
    #[arg(long, default_value_t = 3)]
    pub sub_layers: usize,

    /// Film slab thickness in bulk repeats
    #[arg(long, default_value_t = 3)]
    pub film_layers: usize,

    /// Substrate in-plane supercell matrix (a b c d, row-major)
    #[arg(long, num_args = 4, default_values_t = [1, 0, 0, 1], allow_negative_numbers = true)]
    pub sub_matrix: Vec<i32>,

    /// Film in-plane supercell matrix (a b c d, row-major)
    #[arg(long, num_args = 4, default_values_t = [1, 0, 0, 1], allow_negative_numbers = true)]
    pub film_matrix: Vec<i32>,

    /// Linear strain along the two in-plane vectors
    #[arg(long, num_args = 2, default_values_t = [0.0, 0.0], allow_negative_numbers = true)]
    pub strain: Vec<f64>,

    /// Angle strain between the in-plane vectors
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub angle_diff: f64,

    /// Fraction of the strain carried by the substrate (0 = rigid substrate)
    #[arg(long, default_value_t = 0.0)]
    pub strain_frac: f64,

    /// Initial interfacial distance in Angstrom
    #[arg(short, long, default_value_t = 2.0)]
    pub distance: f64,

    /// Vacuum thickness of the interface cell in Angstrom
    #[arg(short, long, default_value_t = 40.0)]
    pub vacuum: f64,

    /// Move the interface plane to the middle of the cell
    #[arg(long, default_value_t = false)]
    pub center: bool,

    /// Symmetry tolerance in Angstrom
    #[arg(long, default_value_t = 1e-2)]
    pub symprec: f64,

    /// Custom atomic radius (repeatable, e.g. --radius Cu=1.28)
    #[arg(long = "radius", value_parser = parse_radius)]
    pub radii: Vec<(String, f64)>,

    /// Tolerance for grouping atoms into layers (Angstrom, default: auto)
    #[arg(long)]
    pub layer_tolerance: Option<f64>,
}

// ─────────────────────────────────────────────────────────────
// interface 子命令
// ─────────────────────────────────────────────────────────────

/// interface 子命令参数
#[derive(Args, Debug)]
pub struct InterfaceArgs {
    #[command(flatten)]
    pub inputs: InterfaceInputs,

    /// Optimize the in-plane registration of the film
    #[arg(long, default_value_t = false)]
    pub optimize: bool,

    /// Adam iterations for the registration search
    #[arg(long, default_value_t = 2000)]
    pub iterations: usize,

    /// Adam learning rate
    #[arg(long, default_value_t = 0.0075)]
    pub learning_rate: f64,

    /// Number of ranked basins to print
    #[arg(long, default_value_t = 5)]
    pub top_n: usize,

    /// Write the ranked basins to this CSV file
    #[arg(long)]
    pub basins_csv: Option<PathBuf>,

    /// Output POSCAR file
    #[arg(short, long, default_value = "POSCAR_interface")]
    pub output: PathBuf,
}
