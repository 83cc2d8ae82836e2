//! # 配准优化
//!
//! 在主能量面上寻找最优的薄膜面内平移：
//! 1. 每个高斯中心周围放 4 个偏离 15° 的种子点
//! 2. 全部种子同步执行固定步数的 Adam 下降（无提前停止）
//! 3. 终点展开到 9 个周期像，做 mean-shift 聚类，只保留落在晶胞内的聚类中心
//! 4. 按主能量、主能量与深度修正之和、到原点距离依次排序
//!
//! ## 依赖关系
//! - 被 `commands/interface.rs` 使用
//! - 使用 `registration/landscape.rs`

use super::landscape::{Landscape, RegistrationLandscapes};
use crate::error::{HeteroError, Result};
use crate::geometry::PERIODIC_IMAGES;
use crate::models::Lattice;

use nalgebra::{Vector2, Vector3};

/// 种子点相对高斯中心的偏转角 (度)
const SEED_ANGLE: f64 = 15.0;

const MEAN_SHIFT_MAX_ITER: usize = 300;

/// Adam 参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdamConfig {
    pub beta1: f64,
    pub beta2: f64,
    pub learning_rate: f64,
    pub epsilon: f64,
    pub iterations: usize,
}

impl Default for AdamConfig {
    fn default() -> Self {
        Self {
            beta1: 0.9,
            beta2: 0.999,
            learning_rate: 0.0075,
            epsilon: 1e-7,
            iterations: 2000,
        }
    }
}

/// 一个极小值盆地的代表点
#[derive(Debug, Clone, PartialEq)]
pub struct Basin {
    /// 笛卡尔面内平移 (Å)
    pub position: Vector2<f64>,
    pub fractional: Vector2<f64>,
    /// 主能量面取值
    pub primary: f64,
    /// 两个深度修正面取值之和
    pub depth: f64,
}

impl Basin {
    pub fn total(&self) -> f64 {
        self.primary + self.depth
    }
}

/// 优化结果，`basins` 已按排名排序
#[derive(Debug, Clone)]
pub struct RegistrationResult {
    pub shift: Vector2<f64>,
    pub basins: Vec<Basin>,
}

impl RegistrationResult {
    pub fn shift_array(&self) -> [f64; 2] {
        [self.shift.x, self.shift.y]
    }
}

fn round_to(x: f64, decimals: i32) -> f64 {
    let f = 10f64.powi(decimals);
    (x * f).round() / f
}

fn inplane_frac(lattice: &Lattice, p: &Vector2<f64>) -> Vector2<f64> {
    let f = lattice.cart_to_frac(&Vector3::new(p.x, p.y, 0.0));
    Vector2::new(f.x, f.y)
}

fn inplane_cart(lattice: &Lattice, f: &Vector2<f64>) -> Vector2<f64> {
    let c = lattice.frac_to_cart(&Vector3::new(f.x, f.y, 0.0));
    Vector2::new(c.x, c.y)
}

/// 配准优化器
#[derive(Debug, Clone, Default)]
pub struct RegistrationOptimizer {
    config: AdamConfig,
}

impl RegistrationOptimizer {
    pub fn new(config: AdamConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AdamConfig {
        &self.config
    }

    /// 种子点：只保留分数坐标落在 [0, 1]² 内的
    pub fn seeds(landscape: &Landscape, lattice: &Lattice) -> Vec<Vector2<f64>> {
        let (sin, cos) = SEED_ANGLE.to_radians().sin_cos();
        let mut seeds = Vec::with_capacity(4 * landscape.len());

        for g in &landscape.gaussians {
            let long = cos * g.sigma;
            let short = sin * g.sigma;
            let mu = g.center;
            for offset in [
                Vector2::new(-long, short),
                Vector2::new(short, long),
                Vector2::new(long, -short),
                Vector2::new(-short, -long),
            ] {
                let p = mu + offset;
                let f = inplane_frac(lattice, &p);
                if (0.0..=1.0).contains(&f.x) && (0.0..=1.0).contains(&f.y) {
                    seeds.push(p);
                }
            }
        }
        seeds
    }

    /// 全部种子同步执行 Adam，`on_step` 在每一步后调用
    pub fn descend(
        &self,
        landscape: &Landscape,
        seeds: &[Vector2<f64>],
        mut on_step: impl FnMut(usize),
    ) -> Vec<Vector2<f64>> {
        let AdamConfig {
            beta1,
            beta2,
            learning_rate,
            epsilon,
            iterations,
        } = self.config;

        let mut x = seeds.to_vec();
        let mut m = vec![Vector2::<f64>::zeros(); x.len()];
        let mut v = vec![Vector2::<f64>::zeros(); x.len()];

        for t in 1..=iterations {
            let c1 = 1.0 - beta1.powi(t as i32);
            let c2 = 1.0 - beta2.powi(t as i32);
            for ((xi, mi), vi) in x.iter_mut().zip(m.iter_mut()).zip(v.iter_mut()) {
                let g = landscape.gradient(xi);
                *mi = *mi * beta1 + g * (1.0 - beta1);
                *vi = *vi * beta2 + g.component_mul(&g) * (1.0 - beta2);
                let m_hat = *mi / c1;
                let v_hat = *vi / c2;
                xi.x -= learning_rate * m_hat.x / (v_hat.x.sqrt() + epsilon);
                xi.y -= learning_rate * m_hat.y / (v_hat.y.sqrt() + epsilon);
            }
            on_step(t);
        }
        x
    }

    /// 终点展开到 9 个周期像后聚类，返回晶胞内的聚类中心（笛卡尔）
    pub fn cluster(
        lattice: &Lattice,
        endpoints: &[Vector2<f64>],
        bandwidth: f64,
    ) -> Vec<Vector2<f64>> {
        let tiled: Vec<Vector2<f64>> = endpoints
            .iter()
            .flat_map(|p| {
                let f = inplane_frac(lattice, p);
                PERIODIC_IMAGES
                    .into_iter()
                    .map(move |(i, j)| Vector2::new(f.x + i, f.y + j))
            })
            .map(|f| inplane_cart(lattice, &f))
            .collect();

        mean_shift(&tiled, bandwidth)
            .into_iter()
            .filter(|c| {
                let f = inplane_frac(lattice, c);
                let (fx, fy) = (round_to(f.x, 2), round_to(f.y, 2));
                (0.0..1.0).contains(&fx) && (0.0..1.0).contains(&fy)
            })
            .collect()
    }

    /// 完整流程
    pub fn optimize(
        &self,
        landscapes: &RegistrationLandscapes,
        lattice: &Lattice,
    ) -> Result<RegistrationResult> {
        self.optimize_with(landscapes, lattice, |_| {})
    }

    pub fn optimize_with(
        &self,
        landscapes: &RegistrationLandscapes,
        lattice: &Lattice,
        on_step: impl FnMut(usize),
    ) -> Result<RegistrationResult> {
        let primary = &landscapes.primary;
        let bandwidth = primary.min_center_distance().ok_or_else(|| {
            HeteroError::NoInteractingLayers(
                "substrate and film layers do not overlap at any registration".to_string(),
            )
        })? / 3.0;

        let seeds = Self::seeds(primary, lattice);
        let endpoints = self.descend(primary, &seeds, on_step);
        let centers = Self::cluster(lattice, &endpoints, bandwidth);

        let basins: Vec<Basin> = centers
            .into_iter()
            .map(|position| Basin {
                position,
                fractional: inplane_frac(lattice, &position),
                primary: primary.value(&position),
                depth: landscapes.depth_value(&position),
            })
            .collect();

        let basins = rank(basins);
        let shift = basins.first().map(|b| b.position).ok_or_else(|| {
            HeteroError::NoInteractingLayers("optimization produced no basin".to_string())
        })?;
        Ok(RegistrationResult { shift, basins })
    }
}

/// 平坦核 mean-shift，密度高的模态优先保留
fn mean_shift(points: &[Vector2<f64>], bandwidth: f64) -> Vec<Vector2<f64>> {
    let neighbours = |c: &Vector2<f64>| -> (Vector2<f64>, usize) {
        points
            .iter()
            .filter(|p| (*p - c).norm() <= bandwidth)
            .fold((Vector2::zeros(), 0), |(sum, n), p| (sum + p, n + 1))
    };

    let mut modes: Vec<(Vector2<f64>, usize)> = points
        .iter()
        .map(|seed| {
            let mut center = *seed;
            for _ in 0..MEAN_SHIFT_MAX_ITER {
                let (sum, n) = neighbours(&center);
                if n == 0 {
                    break;
                }
                let next = sum / n as f64;
                let moved = (next - center).norm();
                center = next;
                if moved < 1e-3 * bandwidth {
                    break;
                }
            }
            (center, neighbours(&center).1)
        })
        .collect();

    modes.sort_by(|a, b| {
        b.1.cmp(&a.1)
            .then(a.0.x.total_cmp(&b.0.x))
            .then(a.0.y.total_cmp(&b.0.y))
    });

    let mut kept: Vec<Vector2<f64>> = Vec::new();
    for (center, _) in modes {
        if kept.iter().all(|k| (k - center).norm() > bandwidth) {
            kept.push(center);
        }
    }
    kept
}

/// 排名：主能量（4 位小数）升序，总和（4 位小数）降序，到原点距离升序，
/// 最后按分数坐标 (x, y) 升序
pub fn rank(mut basins: Vec<Basin>) -> Vec<Basin> {
    let key = |b: &Basin| (round_to(b.primary, 4), round_to(b.total(), 4));
    basins.sort_by(|a, b| {
        let (pa, ta) = key(a);
        let (pb, tb) = key(b);
        pa.total_cmp(&pb)
            .then(tb.total_cmp(&ta))
            .then(a.position.norm().total_cmp(&b.position.norm()))
            .then(a.fractional.x.total_cmp(&b.fractional.x))
            .then(a.fractional.y.total_cmp(&b.fractional.y))
    });
    basins
}
