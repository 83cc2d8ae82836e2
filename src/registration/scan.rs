//! # 平移扫描
//!
//! 在一组给定平移上对界面打分：面内网格扫描与界面距离扫描。
//! 打分器通过 [`ShiftScorer`] 接入，外部物理后端（静电、Born 排斥等）实现同一个 trait 即可。
//!
//! ## 依赖关系
//! - 被 `commands/scan.rs` 使用
//! - 使用 `batch/runner.rs` 并行执行，`registration/landscape.rs` 的重叠体积

use super::landscape::sphere_overlap;
use crate::batch::ScanRunner;
use crate::error::{HeteroError, Result};
use crate::geometry::PERIODIC_IMAGES;
use crate::interface::{Interface, MIN_INTERFACIAL_DISTANCE};
use crate::models::Crystal;

use nalgebra::Vector3;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// 对一个平移后的结构打分
pub trait ShiftScorer: Send + Sync {
    /// `film` 为薄膜原子索引，其余原子视为衬底
    fn score(&self, shifted: &Crystal, film: &[usize]) -> Result<f64>;
}

/// 薄膜与衬底原子球的总重叠体积 (Å³)
#[derive(Debug, Clone)]
pub struct OverlapScorer {
    radii: BTreeMap<String, f64>,
}

impl OverlapScorer {
    pub fn new(radii: BTreeMap<String, f64>) -> Self {
        Self { radii }
    }

    fn radius(&self, element: &str) -> Result<f64> {
        self.radii
            .get(element)
            .copied()
            .ok_or_else(|| HeteroError::UnknownRadius(element.to_string()))
    }
}

impl ShiftScorer for OverlapScorer {
    fn score(&self, shifted: &Crystal, film: &[usize]) -> Result<f64> {
        let lattice = &shifted.lattice;
        let a = lattice.vector(0);
        let b = lattice.vector(1);
        let film_set: BTreeSet<usize> = film.iter().copied().collect();
        let carts = shifted.cart_coords();

        let mut total = 0.0;
        for &i in film {
            let ri = self.radius(&shifted.atoms[i].element)?;
            for (j, atom) in shifted.atoms.iter().enumerate() {
                if film_set.contains(&j) {
                    continue;
                }
                let rj = self.radius(&atom.element)?;
                for (na, nb) in PERIODIC_IMAGES {
                    let image = carts[j] + a * na + b * nb;
                    total += sphere_overlap(ri, rj, (image - carts[i]).norm());
                }
            }
        }
        Ok(total)
    }
}

/// 一个扫描点
#[derive(Debug, Clone, PartialEq)]
pub struct ScanResult {
    pub fractional: Vector3<f64>,
    pub cartesian: Vector3<f64>,
    pub score: f64,
}

/// 扫描参数
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// 面内网格点数 (nx, ny)
    pub grid: (usize, usize),
    /// 工作线程数，0 表示全部 CPU
    pub jobs: usize,
    pub show_progress: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            grid: (20, 20),
            jobs: 0,
            show_progress: false,
        }
    }
}

impl ScanConfig {
    fn runner(&self) -> ScanRunner {
        ScanRunner::new(self.jobs).with_progress(self.show_progress)
    }
}

/// [0, 1] 上含端点的均匀网格
fn linspace(n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![0.0],
        _ => (0..n).map(|i| i as f64 / (n - 1) as f64).collect(),
    }
}

fn run_shifts(
    interface: &Interface,
    scorer: Arc<dyn ShiftScorer>,
    shifts: Vec<Vector3<f64>>,
    fractional: bool,
    runner: &ScanRunner,
) -> Result<Vec<ScanResult>> {
    let shared = Arc::new(interface.clone());
    let film = interface.film_indices();

    let scores = runner.run(&shifts, |shift| {
        let shifted = shared.shifted(shift, fractional)?;
        scorer.score(&shifted, &film)
    })?;

    let lattice = &interface.structure.lattice;
    Ok(shifts
        .into_iter()
        .zip(scores)
        .map(|(shift, score)| {
            let (fractional, cartesian) = if fractional {
                (shift, lattice.frac_to_cart(&shift))
            } else {
                (lattice.cart_to_frac(&shift), shift)
            };
            ScanResult {
                fractional,
                cartesian,
                score,
            }
        })
        .collect())
}

/// 面内网格扫描，分数平移取 [0, 1]² 上的 nx × ny 个点
pub fn scan_grid(
    interface: &Interface,
    scorer: Arc<dyn ShiftScorer>,
    config: &ScanConfig,
) -> Result<Vec<ScanResult>> {
    let (nx, ny) = config.grid;
    if nx == 0 || ny == 0 {
        return Err(HeteroError::InvalidArgument(
            "scan grid must have at least one point per direction".to_string(),
        ));
    }
    let xs = linspace(nx);
    let ys = linspace(ny);
    let shifts = xs
        .iter()
        .flat_map(|&x| ys.iter().map(move |&y| Vector3::new(x, y, 0.0)))
        .collect();
    run_shifts(interface, scorer, shifts, true, &config.runner())
}

/// 界面距离扫描，`distances` 为目标界面距离 (Å)
pub fn scan_distances(
    interface: &Interface,
    scorer: Arc<dyn ShiftScorer>,
    distances: &[f64],
    config: &ScanConfig,
) -> Result<Vec<ScanResult>> {
    if let Some(&distance) = distances.iter().find(|&&d| d < MIN_INTERFACIAL_DISTANCE) {
        return Err(HeteroError::InvalidShift { distance });
    }
    let shifts = distances
        .iter()
        .map(|d| Vector3::new(0.0, 0.0, d - interface.interfacial_distance))
        .collect();
    run_shifts(interface, scorer, shifts, false, &config.runner())
}

/// 取分数最低的扫描点
pub fn best(results: &[ScanResult]) -> Option<&ScanResult> {
    results.iter().min_by(|a, b| a.score.total_cmp(&b.score))
}
