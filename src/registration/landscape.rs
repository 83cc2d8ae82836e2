//! # 配准能量面
//!
//! 把薄膜相对衬底的面内平移映射为一个标量：所有衬底-薄膜原子对贡献一个二维高斯，
//! 中心为两原子的面内分离矢量，宽度为接触圆半径的 1/3，幅度为两球的重叠体积。
//!
//! 原子对在 3×3 个周期像上全部展开，保证能量面跨晶胞边界连续。
//!
//! 除主能量面（衬底顶层 vs 薄膜底层）外还构建两个深度修正面：
//! 衬底次顶层 vs 薄膜底层、衬底顶层 vs 薄膜次底层。次层按真实层间距下移/上移后参与计算。
//!
//! ## 依赖关系
//! - 被 `registration/optimizer.rs`、`commands/interface.rs` 使用
//! - 使用 `surface/layers.rs` 分层，`registration/radii.rs` 取半径

use super::radii;
use crate::error::{HeteroError, Result};
use crate::geometry::{wrap_frac, PERIODIC_IMAGES};
use crate::interface::Interface;
use crate::models::{Crystal, Lattice};
use crate::surface::layers::{group_layers, Layer};

use nalgebra::{Vector2, Vector3};
use std::collections::BTreeMap;
use std::f64::consts::PI;

/// 能量面构建参数
#[derive(Debug, Clone, Default)]
pub struct LandscapeConfig {
    /// 分层容差 (Å)，缺省按最短原子间距估计
    pub layer_tolerance: Option<f64>,
    /// 覆盖内置半径表的自定义半径
    pub custom_radii: Option<BTreeMap<String, f64>>,
}

/// 一个原子对贡献的高斯基函数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gaussian {
    /// 中心（笛卡尔面内坐标，Å）
    pub center: Vector2<f64>,
    pub sigma: f64,
    /// 峰值：重叠体积除以全局最大重叠体积
    pub scale: f64,
}

impl Gaussian {
    fn exponent(&self, p: &Vector2<f64>) -> f64 {
        let d = p - self.center;
        (-d.norm_squared() / (2.0 * self.sigma * self.sigma)).exp()
    }

    /// 峰值等于 `scale`，不除以 2πσ²
    pub fn value(&self, p: &Vector2<f64>) -> f64 {
        self.scale * self.exponent(p)
    }

    pub fn gradient(&self, p: &Vector2<f64>) -> Vector2<f64> {
        let d = p - self.center;
        -d * (self.scale * self.exponent(p) / (self.sigma * self.sigma))
    }
}

/// 高斯和构成的能量面
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Landscape {
    pub gaussians: Vec<Gaussian>,
}

impl Landscape {
    pub fn new(gaussians: Vec<Gaussian>) -> Self {
        Self { gaussians }
    }

    pub fn len(&self) -> usize {
        self.gaussians.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gaussians.is_empty()
    }

    /// 在笛卡尔面内位置求值
    pub fn value(&self, p: &Vector2<f64>) -> f64 {
        self.gaussians.iter().map(|g| g.value(p)).sum()
    }

    /// 解析梯度
    pub fn gradient(&self, p: &Vector2<f64>) -> Vector2<f64> {
        self.gaussians
            .iter()
            .fold(Vector2::zeros(), |acc, g| acc + g.gradient(p))
    }

    /// 高斯中心之间最小的非零距离
    pub fn min_center_distance(&self) -> Option<f64> {
        let mut shortest = f64::INFINITY;
        for (i, a) in self.gaussians.iter().enumerate() {
            for b in &self.gaussians[i + 1..] {
                let d = (a.center - b.center).norm();
                if d > 1e-8 && d < shortest {
                    shortest = d;
                }
            }
        }
        shortest.is_finite().then_some(shortest)
    }

    fn max_scale(&self) -> f64 {
        self.gaussians.iter().map(|g| g.scale).fold(0.0, f64::max)
    }

    fn normalize(&mut self, by: f64) {
        for g in &mut self.gaussians {
            g.scale /= by;
        }
    }
}

/// 两球在中心距 `d` 处的重叠体积
pub fn sphere_overlap(r1: f64, r2: f64, d: f64) -> f64 {
    if d >= r1 + r2 {
        return 0.0;
    }
    if d <= (r1 - r2).abs() {
        let r = r1.min(r2);
        return 4.0 / 3.0 * PI * r.powi(3);
    }
    PI * (r1 + r2 - d).powi(2)
        * (d * d + 2.0 * d * r1 + 2.0 * d * r2 + 6.0 * r1 * r2 - 3.0 * r1 * r1 - 3.0 * r2 * r2)
        / (12.0 * d)
}

/// 参与构建的一层原子：分数坐标、半径，以及附加的 z 偏移
struct Sites {
    positions: Vec<(Vector3<f64>, f64)>,
}

impl Sites {
    fn from_layer(
        crystal: &Crystal,
        layer: &Layer,
        radii: &BTreeMap<String, f64>,
        z_offset: f64,
    ) -> Result<Self> {
        let positions = layer
            .indices
            .iter()
            .map(|&i| {
                let atom = &crystal.atoms[i];
                let r = radii
                    .get(&atom.element)
                    .copied()
                    .ok_or_else(|| HeteroError::UnknownRadius(atom.element.clone()))?;
                let mut p = atom.position;
                p.z += z_offset;
                Ok((p, r))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { positions })
    }
}

/// 由衬底层与薄膜层构造未归一化的高斯集合
fn pair_gaussians(lattice: &Lattice, substrate: &Sites, film: &Sites) -> Landscape {
    let mut gaussians = Vec::new();

    for (ps, rs) in &substrate.positions {
        for (pf, rf) in &film.positions {
            let dx = wrap_frac(ps.x - pf.x);
            let dy = wrap_frac(ps.y - pf.y);
            let dz = ps.z - pf.z;
            let reach = rs + rf;

            for (ix, iy) in PERIODIC_IMAGES {
                let cart = lattice.frac_to_cart(&Vector3::new(dx + ix, dy + iy, dz));
                let d = cart.z.abs();
                if d >= reach {
                    continue;
                }
                let contact = (reach * reach - d * d).sqrt();
                gaussians.push(Gaussian {
                    center: Vector2::new(cart.x, cart.y),
                    sigma: contact / 3.0,
                    scale: sphere_overlap(*rs, *rf, d),
                });
            }
        }
    }

    Landscape::new(gaussians)
}

/// 一个界面的主能量面与两个深度修正面
#[derive(Debug, Clone, Default)]
pub struct RegistrationLandscapes {
    pub primary: Landscape,
    /// 衬底次顶层 vs 薄膜底层
    pub substrate_depth: Landscape,
    /// 衬底顶层 vs 薄膜次底层
    pub film_depth: Landscape,
}

impl RegistrationLandscapes {
    /// 从界面构建，三个能量面用同一个最大幅度归一化
    pub fn from_interface(interface: &Interface, config: &LandscapeConfig) -> Result<Self> {
        let structure = &interface.structure;
        let h = interface.interface_height;
        let radii = radii::interface_radii(
            &interface.substrate_species,
            &interface.film_species,
            config.custom_radii.as_ref(),
        )?;

        let layers = group_layers(structure, config.layer_tolerance);
        let below: Vec<&Layer> = layers.iter().filter(|l| l.height < h).collect();
        let above: Vec<&Layer> = layers.iter().filter(|l| l.height > h).collect();

        let (sub_top, film_bottom) = match (below.last(), above.first()) {
            (Some(s), Some(f)) => (*s, *f),
            _ => {
                return Err(HeteroError::NoInteractingLayers(format!(
                    "no substrate/film layers around interface height {:.4}",
                    h
                )))
            }
        };
        let sub_second = below.len().checked_sub(2).map(|i| below[i]);
        let film_second = above.get(1).copied();

        let lattice = &structure.lattice;
        let sub_sites = Sites::from_layer(structure, sub_top, &radii, 0.0)?;
        let film_sites = Sites::from_layer(structure, film_bottom, &radii, 0.0)?;

        let mut landscapes = Self {
            primary: pair_gaussians(lattice, &sub_sites, &film_sites),
            ..Self::default()
        };

        if let Some(layer) = sub_second {
            // 次层整体抬到顶层高度，只保留面内排布的影响
            let shift = sub_top.height - layer.height;
            let sites = Sites::from_layer(structure, layer, &radii, shift)?;
            landscapes.substrate_depth = pair_gaussians(lattice, &sites, &film_sites);
        }
        if let Some(layer) = film_second {
            let shift = film_bottom.height - layer.height;
            let sites = Sites::from_layer(structure, layer, &radii, shift)?;
            landscapes.film_depth = pair_gaussians(lattice, &sub_sites, &sites);
        }

        let max = landscapes
            .primary
            .max_scale()
            .max(landscapes.substrate_depth.max_scale())
            .max(landscapes.film_depth.max_scale());
        if max > 0.0 {
            landscapes.primary.normalize(max);
            landscapes.substrate_depth.normalize(max);
            landscapes.film_depth.normalize(max);
        }

        Ok(landscapes)
    }

    /// 深度修正项之和
    pub fn depth_value(&self, p: &Vector2<f64>) -> f64 {
        self.substrate_depth.value(p) + self.film_depth.value(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Atom;

    fn interface(atoms: Vec<Atom>, a: f64, height: f64) -> Interface {
        let lattice = Lattice::from_parameters(a, a, 20.0, 90.0, 90.0, 90.0).unwrap();
        Interface {
            structure: Crystal::new("test", lattice, atoms),
            interfacial_distance: 1.8,
            interface_height: height,
            substrate_species: ["Cu".to_string()].into_iter().collect(),
            film_species: ["Ag".to_string()].into_iter().collect(),
        }
    }

    fn unit_radii() -> LandscapeConfig {
        LandscapeConfig {
            layer_tolerance: Some(0.1),
            custom_radii: Some(
                [("Cu".to_string(), 1.0), ("Ag".to_string(), 1.0)]
                    .into_iter()
                    .collect(),
            ),
        }
    }

    #[test]
    fn test_sphere_overlap_limits() {
        assert_eq!(sphere_overlap(1.0, 1.0, 2.0), 0.0);
        let contained = sphere_overlap(2.0, 0.5, 0.5);
        assert!((contained - 4.0 / 3.0 * PI * 0.125).abs() < 1e-12);
        // 相切附近趋于零，重合时趋于较小球体积
        assert!(sphere_overlap(1.0, 1.0, 1.999) < 1e-5);
        let lens = sphere_overlap(1.0, 1.0, 1.0);
        assert!((lens - 5.0 * PI / 12.0).abs() < 1e-12);
    }

    #[test]
    fn test_gradient_matches_finite_difference() {
        let landscape = Landscape::new(vec![
            Gaussian { center: Vector2::new(0.0, 0.0), sigma: 0.4, scale: 1.0 },
            Gaussian { center: Vector2::new(0.5, 0.2), sigma: 0.3, scale: 0.5 },
        ]);
        let p = Vector2::new(0.2, -0.1);
        let h = 1e-6;
        let g = landscape.gradient(&p);
        let gx = (landscape.value(&(p + Vector2::new(h, 0.0)))
            - landscape.value(&(p - Vector2::new(h, 0.0))))
            / (2.0 * h);
        let gy = (landscape.value(&(p + Vector2::new(0.0, h)))
            - landscape.value(&(p - Vector2::new(0.0, h))))
            / (2.0 * h);
        assert!((g.x - gx).abs() < 1e-6);
        assert!((g.y - gy).abs() < 1e-6);
    }

    #[test]
    fn test_primary_landscape_from_single_pair() {
        // dz = 0.09 × 20 = 1.8 Å < 2.0 Å
        let atoms = vec![
            Atom::new("Cu", [0.0, 0.0, 0.40]),
            Atom::new("Ag", [0.3, 0.2, 0.49]),
        ];
        let landscapes = RegistrationLandscapes::from_interface(
            &interface(atoms, 6.0, 0.45),
            &unit_radii(),
        )
        .unwrap();

        assert_eq!(landscapes.primary.len(), 9);
        assert!(landscapes.substrate_depth.is_empty());
        assert!(landscapes.film_depth.is_empty());

        let sigma = (4.0f64 - 1.8 * 1.8).sqrt() / 3.0;
        for g in &landscapes.primary.gaussians {
            assert!((g.sigma - sigma).abs() < 1e-9);
            assert!((g.scale - 1.0).abs() < 1e-12);
        }
        // 中心像：(0 - 0.3, 0 - 0.2) 回卷到 (0.7, 0.8)
        assert!(landscapes
            .primary
            .gaussians
            .iter()
            .any(|g| (g.center - Vector2::new(4.2, 4.8)).norm() < 1e-9));
    }

    #[test]
    fn test_landscape_is_lattice_periodic() {
        let atoms = vec![
            Atom::new("Cu", [0.0, 0.0, 0.40]),
            Atom::new("Ag", [0.3, 0.2, 0.49]),
        ];
        let base = interface(atoms.clone(), 6.0, 0.45);
        let landscapes = RegistrationLandscapes::from_interface(&base, &unit_radii()).unwrap();

        // 所有原子平移一个面内晶格矢量，能量面不变
        let moved: Vec<Atom> = atoms
            .iter()
            .map(|a| Atom::new(a.element.clone(), a.position + Vector3::new(1.0, 0.0, 0.0)))
            .collect();
        let moved = RegistrationLandscapes::from_interface(
            &interface(moved, 6.0, 0.45),
            &unit_radii(),
        )
        .unwrap();

        let a = Vector2::new(6.0, 0.0);
        let b = Vector2::new(0.0, 6.0);
        for p in [Vector2::new(1.5, 1.5), Vector2::new(4.2, 4.5), Vector2::new(3.0, 0.5)] {
            let v = landscapes.primary.value(&p);
            assert!((moved.primary.value(&p) - v).abs() < 1e-12);
            // 在平移了晶格矢量的位置上查询得到相同的值
            assert!((landscapes.primary.value(&(p + a)) - v).abs() < 1e-9);
            assert!((landscapes.primary.value(&(p - b)) - v).abs() < 1e-9);
        }
    }

    #[test]
    fn test_depth_landscapes_use_second_layers() {
        let atoms = vec![
            Atom::new("Cu", [0.5, 0.5, 0.30]),
            Atom::new("Cu", [0.0, 0.0, 0.40]),
            Atom::new("Ag", [0.0, 0.0, 0.49]),
            Atom::new("Ag", [0.5, 0.5, 0.59]),
        ];
        let landscapes = RegistrationLandscapes::from_interface(
            &interface(atoms, 6.0, 0.45),
            &unit_radii(),
        )
        .unwrap();

        assert_eq!(landscapes.primary.len(), 9);
        assert_eq!(landscapes.substrate_depth.len(), 9);
        assert_eq!(landscapes.film_depth.len(), 9);
        // 次层被移到相邻层高度，形状与主面相同，仅中心错开半个晶胞
        let p = Vector2::new(3.0, 3.0);
        let primary_at_origin = landscapes.primary.value(&Vector2::zeros());
        assert!((landscapes.substrate_depth.value(&p) - primary_at_origin).abs() < 1e-9);
        assert!((landscapes.film_depth.value(&p) - primary_at_origin).abs() < 1e-9);
    }

    #[test]
    fn test_peak_heights_follow_overlap_volume() {
        // Cu 1.0 Å 下方，Ag 1.0 Å 与 Au 1.6 Å 同处 dz = 1.8 Å
        let atoms = vec![
            Atom::new("Cu", [0.0, 0.0, 0.40]),
            Atom::new("Ag", [0.5, 0.0, 0.49]),
            Atom::new("Au", [0.0, 0.5, 0.49]),
        ];
        let config = LandscapeConfig {
            layer_tolerance: Some(0.1),
            custom_radii: Some(
                [("Cu".to_string(), 1.0), ("Ag".to_string(), 1.0), ("Au".to_string(), 1.6)]
                    .into_iter()
                    .collect(),
            ),
        };
        let landscapes =
            RegistrationLandscapes::from_interface(&interface(atoms, 10.0, 0.45), &config)
                .unwrap();

        let ag = sphere_overlap(1.0, 1.0, 1.8);
        let au = sphere_overlap(1.0, 1.6, 1.8);
        assert!((ag / au - 0.0566).abs() < 1e-3);

        let primary = &landscapes.primary;
        assert_eq!(primary.len(), 18);
        for g in &primary.gaussians {
            assert!((g.value(&g.center) - g.scale).abs() < 1e-12);
        }
        assert!((primary.value(&Vector2::new(0.0, 5.0)) - 1.0).abs() < 1e-6);
        assert!((primary.value(&Vector2::new(5.0, 0.0)) - ag / au).abs() < 1e-6);
    }

    #[test]
    fn test_missing_film_layer_is_error() {
        let atoms = vec![Atom::new("Cu", [0.0, 0.0, 0.40])];
        let result =
            RegistrationLandscapes::from_interface(&interface(atoms, 6.0, 0.45), &unit_radii());
        assert!(matches!(result, Err(HeteroError::NoInteractingLayers(_))));
    }
}
