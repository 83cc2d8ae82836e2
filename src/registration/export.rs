//! # 配准数据导出
//!
//! 导出扫描结果和排名后的盆地到 CSV。
//!
//! ## 依赖关系
//! - 被 `commands/scan.rs`、`commands/interface.rs` 调用
//! - 使用 `csv` 库写入 CSV 文件

use super::optimizer::Basin;
use super::scan::ScanResult;
use crate::error::{HeteroError, Result};

use std::path::Path;

fn finish<W: std::io::Write>(mut wtr: csv::Writer<W>, output_path: &Path) -> Result<()> {
    wtr.flush().map_err(|e| HeteroError::FileWriteError {
        path: output_path.display().to_string(),
        source: e,
    })
}

/// 导出扫描结果
pub fn scan_to_csv(results: &[ScanResult], output_path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(output_path)?;

    wtr.write_record(["frac_x", "frac_y", "frac_z", "x", "y", "z", "score"])?;

    for r in results {
        wtr.write_record(&[
            format!("{:.6}", r.fractional.x),
            format!("{:.6}", r.fractional.y),
            format!("{:.6}", r.fractional.z),
            format!("{:.4}", r.cartesian.x),
            format!("{:.4}", r.cartesian.y),
            format!("{:.4}", r.cartesian.z),
            format!("{:.6}", r.score),
        ])?;
    }

    finish(wtr, output_path)
}

/// 导出排名后的盆地
pub fn basins_to_csv(basins: &[Basin], output_path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(output_path)?;

    wtr.write_record(["rank", "x", "y", "frac_x", "frac_y", "primary", "depth", "total"])?;

    for (i, b) in basins.iter().enumerate() {
        wtr.write_record(&[
            (i + 1).to_string(),
            format!("{:.4}", b.position.x),
            format!("{:.4}", b.position.y),
            format!("{:.6}", b.fractional.x),
            format!("{:.6}", b.fractional.y),
            format!("{:.6}", b.primary),
            format!("{:.6}", b.depth),
            format!("{:.6}", b.total()),
        ])?;
    }

    finish(wtr, output_path)
}
