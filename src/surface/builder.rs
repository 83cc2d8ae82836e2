//! # Slab 构建
//!
//! 由体相与 Miller 指数生成表面 slab：
//! 1. 用扩展欧几里得算法求出面内两个整数方向与一个面外方向（幺模基）
//! 2. 将体相换到该基下，沿面外方向重复 `layers` 次
//! 3. 面外向量替换为其在表面法向上的投影，旋转到标准取向
//! 4. 面内回卷，按需加真空层并居中
//!
//! 原胞视图由对称性分析器从惯用 slab 求得。
//!
//! ## 依赖关系
//! - 被 `commands/surface.rs`、`commands/interface.rs` 调用
//! - 使用 `geometry::ext_gcd`、`symmetry::SymmetryAnalyzer`

use super::{SlabConfig, Surface};
use crate::error::{HeteroError, Result};
use crate::geometry::{angle_between, ext_gcd, gcd, wrap_frac};
use crate::models::{Atom, Crystal, Lattice, MillerIndex};
use crate::symmetry::SymmetryAnalyzer;

use nalgebra::{Matrix3, Vector3};

/// 以体相晶格基矢表示的表面基：前两行张成表面，第三行为面外方向
pub type Directions = [[i64; 3]; 3];

/// 求表面的晶体学方向
pub fn crystallographic_directions(bulk: &Lattice, miller: &MillerIndex) -> Directions {
    let [h, k, l] = miller.as_array().map(i64::from);

    match (h == 0, k == 0, l == 0) {
        (false, true, true) => return [[0, 1, 0], [0, 0, 1], [1, 0, 0]],
        (true, false, true) => return [[0, 0, 1], [1, 0, 0], [0, 1, 0]],
        (true, true, false) => return [[1, 0, 0], [0, 1, 0], [0, 0, 1]],
        _ => {}
    }

    let (mut p, mut q) = ext_gcd(k, l);
    let (a1, a2, a3) = (bulk.vector(0), bulk.vector(1), bulk.vector(2));
    let (hf, kf, lf) = (h as f64, k as f64, l as f64);

    // c1·c2 = k1 + i·k2，取使两者耦合最小的整数 i
    let u = a1 * kf - a2 * hf;
    let v = a1 * lf - a3 * hf;
    let w = a2 * lf - a3 * kf;
    let k1 = (u * p as f64 + v * q as f64).dot(&w);
    let k2 = (u * lf - v * kf).dot(&w);
    if k2.abs() > 1e-10 {
        let i = -(k1 / k2).round() as i64;
        p += i * l;
        q -= i * k;
    }

    let (a, b) = ext_gcd(p * k + q * l, h);
    let g = gcd(l, k);
    [
        [p * k + q * l, -p * h, -q * h],
        [0, l / g, -k / g],
        [b, a * p, a * q],
    ]
}

/// Slab 构建器
pub struct SurfaceBuilder<'a> {
    analyzer: &'a dyn SymmetryAnalyzer,
}

impl<'a> SurfaceBuilder<'a> {
    pub fn new(analyzer: &'a dyn SymmetryAnalyzer) -> Self {
        Self { analyzer }
    }

    /// 构建表面（惯用 + 原胞两个视图）
    pub fn build(&self, bulk: &Crystal, miller: MillerIndex, config: &SlabConfig) -> Result<Surface> {
        if config.layers == 0 {
            return Err(HeteroError::InvalidArgument(
                "a slab needs at least one layer".to_string(),
            ));
        }
        if config.vacuum < 0.0 {
            return Err(HeteroError::InvalidArgument(format!(
                "vacuum must be non-negative, got {}",
                config.vacuum
            )));
        }

        let directions = crystallographic_directions(&bulk.lattice, &miller);
        let conventional = slab_from_directions(bulk, &miller, &directions, config)?;
        let primitive = self
            .analyzer
            .conventional_standard(&self.analyzer.primitive(&conventional)?)?;

        Ok(Surface {
            bulk: bulk.clone(),
            miller,
            conventional,
            primitive,
            layers: config.layers,
            vacuum: config.vacuum,
            layer_tolerance: config.layer_tolerance,
            directions,
        })
    }
}

/// 在给定幺模基下切出 slab
fn slab_from_directions(
    bulk: &Crystal,
    miller: &MillerIndex,
    directions: &Directions,
    config: &SlabConfig,
) -> Result<Crystal> {
    let basis = Matrix3::from_fn(|i, j| directions[i][j] as f64);
    let to_basis = basis.transpose().try_inverse().ok_or_else(|| {
        HeteroError::InvalidLattice(format!("surface basis for {} is singular", miller))
    })?;
    let cell = basis * bulk.lattice.matrix();

    let layers = config.layers as f64;
    let a1 = cell.row(0).transpose();
    let a2 = cell.row(1).transpose();
    let a3 = cell.row(2).transpose() * layers;

    // 新基下的分数坐标（面外方向重复 layers 次）
    let scaled: Vec<Vector3<f64>> = bulk
        .atoms
        .iter()
        .map(|atom| (to_basis * atom.position).map(|x| x - (x + 1e-10).floor()))
        .collect();
    let mut sites: Vec<(String, Vector3<f64>)> = Vec::with_capacity(bulk.len() * config.layers);
    for n in 0..config.layers {
        for (atom, f) in bulk.atoms.iter().zip(&scaled) {
            let frac = Vector3::new(f.x, f.y, (f.z + n as f64) / layers);
            sites.push((atom.element.clone(), frac));
        }
    }

    // 面外向量投影到法向，保持笛卡尔坐标
    let normal = a1.cross(&a2);
    let c_perp = normal * (a3.dot(&normal) / normal.norm_squared());
    let stacked = Lattice::from_vectors(a1, a2, a3)?;
    let projected = Lattice::from_vectors(a1, a2, c_perp)?;
    let fracs: Vec<Vector3<f64>> = sites
        .iter()
        .map(|(_, f)| projected.cart_to_frac(&stacked.frac_to_cart(f)))
        .collect();

    // 标准取向：a ∥ x，b 在 xy 平面，c 沿 +z
    let gamma = angle_between(&a1, &a2).to_degrees();
    let c_len = c_perp.norm();
    let standard = Lattice::from_parameters(a1.norm(), a2.norm(), c_len, 90.0, 90.0, gamma)?;

    let (z_min, z_max) = fracs
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), f| {
            (lo.min(f.z), hi.max(f.z))
        });

    // 有真空层时 c = 厚度 + 真空，原子居中
    let (lattice, z_ref, z_scale, z_offset) = if config.vacuum > 0.0 {
        let thickness = (z_max - z_min) * c_len;
        let new_c = thickness + config.vacuum;
        let lattice = standard.with_vector(2, Vector3::new(0.0, 0.0, new_c))?;
        (lattice, z_min, c_len / new_c, 0.5 * config.vacuum / new_c)
    } else {
        (standard, 0.0, 1.0, 0.0)
    };

    let atoms = sites
        .into_iter()
        .zip(fracs)
        .map(|((element, _), f)| {
            let z = (f.z - z_ref) * z_scale + z_offset;
            Atom::new(element, [wrap_frac(f.x), wrap_frac(f.y), z])
        })
        .collect();

    Ok(Crystal::new(
        format!("{} {}", bulk.name, miller),
        lattice,
        atoms,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symmetry::SymmetryFinder;

    fn cubic_lattice(a: f64) -> Lattice {
        Lattice::from_parameters(a, a, a, 90.0, 90.0, 90.0).unwrap()
    }

    fn rock_salt() -> Crystal {
        let atoms = vec![
            Atom::new("Na", [0.0, 0.0, 0.0]),
            Atom::new("Na", [0.5, 0.5, 0.0]),
            Atom::new("Na", [0.5, 0.0, 0.5]),
            Atom::new("Na", [0.0, 0.5, 0.5]),
            Atom::new("Cl", [0.5, 0.0, 0.0]),
            Atom::new("Cl", [0.0, 0.5, 0.0]),
            Atom::new("Cl", [0.0, 0.0, 0.5]),
            Atom::new("Cl", [0.5, 0.5, 0.5]),
        ];
        Crystal::new("NaCl", cubic_lattice(4.0), atoms)
    }

    fn det(d: &Directions) -> i64 {
        d[0][0] * (d[1][1] * d[2][2] - d[1][2] * d[2][1])
            - d[0][1] * (d[1][0] * d[2][2] - d[1][2] * d[2][0])
            + d[0][2] * (d[1][0] * d[2][1] - d[1][1] * d[2][0])
    }

    #[test]
    fn test_axis_directions() {
        let lattice = cubic_lattice(3.0);
        let d = crystallographic_directions(&lattice, &MillerIndex::new(1, 0, 0).unwrap());
        assert_eq!(d, [[0, 1, 0], [0, 0, 1], [1, 0, 0]]);
        let d = crystallographic_directions(&lattice, &MillerIndex::new(0, 0, 1).unwrap());
        assert_eq!(d, [[1, 0, 0], [0, 1, 0], [0, 0, 1]]);
    }

    #[test]
    fn test_general_directions_are_unimodular_and_in_plane() {
        let lattice = cubic_lattice(3.0);
        for hkl in [[1, 1, 1], [1, 1, 0], [2, 1, 0], [0, 1, 1], [1, -1, 2]] {
            let miller = MillerIndex::from_array(hkl).unwrap();
            let d = crystallographic_directions(&lattice, &miller);
            assert_eq!(det(&d).abs(), 1, "{:?}", hkl);
            for row in &d[..2] {
                let dot: i64 = row.iter().zip(hkl).map(|(x, h)| x * h as i64).sum();
                assert_eq!(dot, 0, "{:?} {:?}", hkl, row);
            }
        }
    }

    #[test]
    fn test_simple_cubic_slab_geometry() {
        let bulk = Crystal::new("Po", cubic_lattice(3.0), vec![Atom::new("Po", [0.0, 0.0, 0.0])]);
        let finder = SymmetryFinder::default();
        let config = SlabConfig {
            layers: 3,
            vacuum: 10.0,
            layer_tolerance: None,
        };
        let surface = SurfaceBuilder::new(&finder)
            .build(&bulk, MillerIndex::new(0, 0, 1).unwrap(), &config)
            .unwrap();

        let slab = &surface.conventional;
        assert_eq!(slab.len(), 3);
        assert!((slab.lattice.vector(2).norm() - 16.0).abs() < 1e-9);
        assert!((surface.area() - 9.0).abs() < 1e-9);
        // 居中：最低层在 5 Å，最高层在 11 Å
        let zs: Vec<f64> = slab.cart_coords().iter().map(|r| r.z).collect();
        let lo = zs.iter().cloned().fold(f64::INFINITY, f64::min);
        let hi = zs.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        assert!((lo - 5.0).abs() < 1e-9);
        assert!((hi - 11.0).abs() < 1e-9);
    }

    #[test]
    fn test_rock_salt_slab_views() {
        let finder = SymmetryFinder::default();
        let config = SlabConfig {
            layers: 2,
            vacuum: 10.0,
            layer_tolerance: None,
        };
        let surface = SurfaceBuilder::new(&finder)
            .build(&rock_salt(), MillerIndex::new(1, 0, 0).unwrap(), &config)
            .unwrap();

        assert_eq!(surface.conventional.len(), 16);
        assert_eq!(surface.primitive.len(), 8);
        assert!((surface.area() - 16.0).abs() < 1e-9);
        assert!((surface.primitive.lattice.inplane_area() - 8.0).abs() < 1e-6);
        let termination: Vec<String> = surface.termination().into_iter().collect();
        assert_eq!(termination, vec!["Cl".to_string(), "Na".to_string()]);
    }

    #[test]
    fn test_polar_slab_has_single_species_termination() {
        let finder = SymmetryFinder::default();
        let surface = SurfaceBuilder::new(&finder)
            .build(&rock_salt(), MillerIndex::new(1, 1, 1).unwrap(), &SlabConfig::default())
            .unwrap();
        assert_eq!(surface.termination().len(), 1);
        assert_eq!(surface.conventional.len(), 8 * SlabConfig::default().layers);
    }

    #[test]
    fn test_zero_layers_rejected() {
        let finder = SymmetryFinder::default();
        let config = SlabConfig {
            layers: 0,
            ..SlabConfig::default()
        };
        assert!(SurfaceBuilder::new(&finder)
            .build(&rock_salt(), MillerIndex::new(1, 0, 0).unwrap(), &config)
            .is_err());
    }
}
