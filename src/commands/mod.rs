//! # 命令执行模块
//!
//! 实现各子命令的业务逻辑。
//!
//! ## 依赖关系
//! - 被 `main.rs` 调用
//! - 使用 `cli/`, `parsers/`, `surface/`, `interface/`, `registration/`, `utils/`
//! - 子模块: miller, surface, interface, scan

pub mod interface;
pub mod miller;
pub mod scan;
pub mod surface;

use crate::cli::Commands;
use crate::error::{HeteroError, Result};
use crate::models::{Crystal, MillerIndex};
use crate::parsers;
use crate::utils::output;

use std::collections::BTreeMap;
use std::path::Path;

/// 执行命令
pub fn run(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Miller(args) => miller::execute(args),
        Commands::Surface(args) => surface::execute(args),
        Commands::Interface(args) => interface::execute(args),
        Commands::Scan(args) => scan::execute(args),
    }
}

/// 读取体相结构并打印概要
fn load_bulk(path: &Path) -> Result<Crystal> {
    let bulk = parsers::parse_structure_file(path)?;
    let (a, b, c, alpha, beta, gamma) = bulk.lattice.parameters();
    output::print_info(&format!("Loaded '{}'", path.display()));
    output::print_detail("Formula", &format!("{} ({} atoms)", bulk.formula(), bulk.len()));
    output::print_detail("a, b, c (Å)", &format!("{:.4}, {:.4}, {:.4}", a, b, c));
    output::print_detail("α, β, γ (°)", &format!("{:.2}, {:.2}, {:.2}", alpha, beta, gamma));
    if let Some(v) = bulk.volume_per_atom() {
        output::print_detail("Volume/atom (Å³)", &format!("{:.3}", v));
    }
    Ok(bulk)
}

fn miller_from(values: &[i32]) -> Result<MillerIndex> {
    match values {
        [h, k, l] => MillerIndex::new(*h, *k, *l),
        _ => Err(HeteroError::InvalidMillerIndex(format!(
            "expected 3 integers, got {}",
            values.len()
        ))),
    }
}

fn matrix_from(values: &[i32]) -> Result<[[i32; 2]; 2]> {
    match values {
        [a, b, c, d] => Ok([[*a, *b], [*c, *d]]),
        _ => Err(HeteroError::InvalidArgument(format!(
            "expected 4 integers for a 2x2 matrix, got {}",
            values.len()
        ))),
    }
}

fn custom_radii(radii: &[(String, f64)]) -> Option<BTreeMap<String, f64>> {
    if radii.is_empty() {
        None
    } else {
        Some(radii.iter().cloned().collect())
    }
}
