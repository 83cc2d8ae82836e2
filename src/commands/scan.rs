//! # scan 命令实现
//!
//! 构建界面后在面内网格或一组界面距离上用重叠体积打分，结果写入 CSV。
//!
//! ## 依赖关系
//! - 使用 `cli/scan.rs` 定义的参数
//! - 使用 `commands/interface.rs` 构建界面
//! - 使用 `registration/scan.rs`、`registration/export.rs`

use super::custom_radii;
use super::interface::build_interface;
use crate::cli::scan::ScanArgs;
use crate::error::{HeteroError, Result};
use crate::registration::{export, radii, scan, OverlapScorer, ScanConfig, ShiftScorer};
use crate::utils::output;

use std::sync::Arc;

/// 执行 scan 命令
pub fn execute(args: ScanArgs) -> Result<()> {
    output::print_header("Interface Shift Scan");

    let interface = build_interface(&args.inputs)?;

    let radii = radii::interface_radii(
        &interface.substrate_species,
        &interface.film_species,
        custom_radii(&args.inputs.radii).as_ref(),
    )?;
    let scorer: Arc<dyn ShiftScorer> = Arc::new(OverlapScorer::new(radii));

    let config = ScanConfig {
        grid: match args.grid.as_slice() {
            [nx, ny] => (*nx, *ny),
            _ => {
                return Err(HeteroError::InvalidArgument(
                    "--grid expects two values".to_string(),
                ))
            }
        },
        jobs: args.jobs,
        show_progress: true,
    };

    let results = match &args.distances {
        Some(distances) => {
            output::print_info(&format!(
                "Scanning {} interfacial distance(s)",
                distances.len()
            ));
            scan::scan_distances(&interface, scorer, distances, &config)?
        }
        None => {
            output::print_info(&format!(
                "Scanning {}x{} in-plane grid",
                config.grid.0, config.grid.1
            ));
            scan::scan_grid(&interface, scorer, &config)?
        }
    };

    export::scan_to_csv(&results, &args.output)?;

    if let Some(best) = scan::best(&results) {
        output::print_info(&format!(
            "Lowest overlap {:.4} Å³ at shift ({:.4}, {:.4}, {:.4}) Å",
            best.score, best.cartesian.x, best.cartesian.y, best.cartesian.z
        ));
    }
    output::print_success(&format!(
        "{} scan point(s) written to '{}'",
        results.len(),
        args.output.display()
    ));
    Ok(())
}
