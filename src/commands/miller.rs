//! # miller 命令实现
//!
//! 列出体相结构中对称性不等价的晶面指数及其等价族大小。
//!
//! ## 依赖关系
//! - 使用 `cli/miller.rs` 定义的参数
//! - 使用 `miller`、`symmetry/`
//! - 使用 `utils/output.rs`

use super::load_bulk;
use crate::cli::miller::MillerArgs;
use crate::error::{HeteroError, Result};
use crate::miller::MillerIndexEnumerator;
use crate::symmetry::{SymmetryAnalyzer, SymmetryFinder};
use crate::utils::output;

use tabled::{Table, Tabled};

/// 表格行
#[derive(Debug, Clone, Tabled)]
struct FamilyRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "(hkl)")]
    miller: String,
    #[tabled(rename = "Equivalent planes")]
    multiplicity: usize,
    #[tabled(rename = "d (Å)")]
    spacing: String,
}

/// 执行 miller 命令
pub fn execute(args: MillerArgs) -> Result<()> {
    output::print_header("Symmetrically Distinct Miller Indices");

    let bulk = load_bulk(&args.input)?;
    let finder = SymmetryFinder::new(args.symprec);
    let operations = finder
        .point_group_operations(&bulk)
        .map_err(|e| HeteroError::InvalidMillerIndex(format!("unresolvable symmetry: {}", e)))?;
    output::print_info(&format!("Point group order: {}", operations.len()));

    let families = MillerIndexEnumerator::new(&bulk.lattice, &operations)?.families(args.max_index)?;
    let recip = bulk.lattice.reciprocal_crystallographic()?;

    let rows: Vec<FamilyRow> = families
        .iter()
        .enumerate()
        .map(|(i, family)| {
            let [h, k, l] = family.representative.as_array();
            let g = recip.frac_to_cart(&nalgebra::Vector3::new(h as f64, k as f64, l as f64));
            FamilyRow {
                index: i + 1,
                miller: family.representative.to_string(),
                multiplicity: family.members.len(),
                spacing: format!("{:.4}", 1.0 / g.norm()),
            }
        })
        .collect();

    println!("{}", Table::new(&rows));
    output::print_success(&format!(
        "{} distinct plane(s) with max index {}",
        rows.len(),
        args.max_index
    ));
    Ok(())
}
