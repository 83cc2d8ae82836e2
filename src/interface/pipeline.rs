//! # 界面构建流水线
//!
//! 单向流水线，每一步产出一个不可变的中间结果：
//!
//! ```text
//! SupercellsPrepared → LatticeAligned → Stacked → Refined → Oriented → Interface
//! ```
//!
//! 1. 面内二维约化 → 扩胞 → 再约化
//! 2. 按应变分配比例插值共享面内晶格，两层各自保留面外向量
//! 3. 衬底在下、薄膜在上堆叠，中间隔 `interfacial_distance`，顶部加真空
//! 4. 约化 → 标准惯用胞 → 原胞；依据两侧独有元素重新判定上下
//! 5. 薄膜若在下方，绕面内轴旋转 180°
//! 6. 可选：把界面平移到 z = 0.5
//!
//! ## 依赖关系
//! - 被 `interface/mod.rs` 的 [`InterfaceBuilder`] 驱动
//! - 使用 `geometry::reduce_vectors`、`symmetry::SymmetryAnalyzer`

use super::{Interface, InterfaceConfig, LatticeMatch};
use crate::error::{HeteroError, Result};
use crate::geometry::{angle_between, reduce_vectors, rotate_z, wrap_frac};
use crate::models::{Atom, Crystal, Lattice};
use crate::surface::Surface;
use crate::symmetry::SymmetryAnalyzer;

use nalgebra::{Matrix3, Vector3};
use std::collections::BTreeSet;

/// 两侧参与界面的元素
#[derive(Debug, Clone)]
pub struct Components {
    /// 衬底体相元素
    pub substrate: BTreeSet<String>,
    /// 薄膜体相元素
    pub film: BTreeSet<String>,
}

impl Components {
    /// 去掉共有元素后两侧各自独有的元素
    pub fn exclusive(&self) -> Result<(BTreeSet<String>, BTreeSet<String>)> {
        let sub: BTreeSet<String> = self.substrate.difference(&self.film).cloned().collect();
        let film: BTreeSet<String> = self.film.difference(&self.substrate).cloned().collect();
        if sub.is_empty() || film.is_empty() {
            let shared: Vec<String> = self.substrate.intersection(&self.film).cloned().collect();
            return Err(HeteroError::IndistinguishableComponents {
                shared: shared.join(", "),
            });
        }
        Ok((sub, film))
    }
}

/// 第 1 步结果：约化后的衬底/薄膜超胞
#[derive(Debug, Clone)]
pub struct SupercellsPrepared {
    pub substrate: Crystal,
    pub film: Crystal,
    pub components: Components,
}

/// 第 2、3 步结果：共享面内晶格并重新定向后的两层
#[derive(Debug, Clone)]
pub struct LatticeAligned {
    pub substrate: Crystal,
    pub film: Crystal,
    /// 共享面内向量
    pub inplane: [Vector3<f64>; 2],
    pub components: Components,
}

/// 第 4 步结果：堆叠结构
#[derive(Debug, Clone)]
pub struct Stacked {
    pub structure: Crystal,
    pub interfacial_distance: f64,
    pub interface_height: f64,
    /// 衬底 + 薄膜超胞原子数
    pub expected_atoms: usize,
    pub components: Components,
}

/// 第 5 步结果：精修后的结构及两侧平均高度
#[derive(Debug, Clone)]
pub struct Refined {
    pub structure: Crystal,
    pub interfacial_distance: f64,
    pub interface_height: f64,
    pub substrate_mean_height: f64,
    pub film_mean_height: f64,
    pub components: Components,
}

/// 第 6 步结果：薄膜在上的结构
#[derive(Debug, Clone)]
pub struct Oriented {
    pub structure: Crystal,
    pub interfacial_distance: f64,
    pub interface_height: f64,
    pub components: Components,
}

/// 面内二维约化 → 扩胞 → 再约化
pub fn prepare_slab(slab: &Crystal, transform: &[[i32; 2]; 2]) -> Result<Crystal> {
    let det = transform[0][0] * transform[1][1] - transform[0][1] * transform[1][0];
    if det <= 0 {
        return Err(HeteroError::InvalidArgument(format!(
            "in-plane transformation {:?} must have a positive determinant",
            transform
        )));
    }

    let reduced = reduce_inplane(slab)?;
    let t = Matrix3::new(
        transform[0][0],
        transform[0][1],
        0,
        transform[1][0],
        transform[1][1],
        0,
        0,
        0,
        1,
    );
    reduce_inplane(&reduced.supercell(&t)?)
}

fn reduce_inplane(slab: &Crystal) -> Result<Crystal> {
    let lattice = &slab.lattice;
    let (a, b) = reduce_vectors(&lattice.vector(0), &lattice.vector(1));
    Ok(slab.recelled(Lattice::from_vectors(a, b, lattice.vector(2))?))
}

impl SupercellsPrepared {
    pub fn new(substrate: &Surface, film: &Surface, matching: &LatticeMatch) -> Result<Self> {
        Ok(Self {
            substrate: prepare_slab(&substrate.primitive, &matching.substrate_transformation)?,
            film: prepare_slab(&film.primitive, &matching.film_transformation)?,
            components: Components {
                substrate: substrate.bulk.species(),
                film: film.bulk.species(),
            },
        })
    }

    /// 求共享面内晶格，并把两层应变到该晶格上（各自保留 c）
    pub fn align(self, matching: &LatticeMatch, strain_fraction: f64) -> Result<LatticeAligned> {
        let a = self.substrate.lattice.vector(0);
        let b = self.substrate.lattice.vector(1);

        let inplane = if strain_fraction == 0.0 {
            [a, b]
        } else {
            let angle = angle_between(&a, &b) * (1.0 + strain_fraction * matching.angle_diff);
            let new_a = a * (1.0 + strain_fraction * matching.strain[0]);
            let new_b = rotate_z(&(a * (b.norm() / a.norm())), angle)
                * (1.0 + strain_fraction * matching.strain[1]);
            [new_a, new_b]
        };

        let reorient = |slab: &Crystal| -> Result<Crystal> {
            let lattice = Lattice::from_vectors(inplane[0], inplane[1], slab.lattice.vector(2))?;
            Ok(slab.strained(lattice))
        };

        Ok(LatticeAligned {
            substrate: reorient(&self.substrate)?,
            film: reorient(&self.film)?,
            inplane,
            components: self.components,
        })
    }
}

/// 分数 z 的最小值与最大值
fn z_extent(crystal: &Crystal) -> (f64, f64) {
    crystal
        .atoms
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), atom| {
            (lo.min(atom.position.z), hi.max(atom.position.z))
        })
}

impl LatticeAligned {
    /// 衬底在下、薄膜在上堆叠
    pub fn stack(self, interfacial_distance: f64, vacuum: f64) -> Result<Stacked> {
        if self.substrate.is_empty() || self.film.is_empty() {
            return Err(HeteroError::InvalidArgument(
                "cannot stack an empty slab".to_string(),
            ));
        }

        let (sub_min, sub_max) = z_extent(&self.substrate);
        let (film_min, film_max) = z_extent(&self.film);
        let sub_c = self.substrate.lattice.vector(2).norm();
        let film_c = self.film.lattice.vector(2).norm();

        let c_len = (sub_max - sub_min) * sub_c
            + (film_max - film_min) * film_c
            + vacuum
            + interfacial_distance;
        let sub_size = (sub_max - sub_min) * sub_c / c_len;
        let film_offset = sub_size + interfacial_distance / c_len;
        let interface_height = sub_size + 0.5 * interfacial_distance / c_len;

        let normal = self.inplane[0].cross(&self.inplane[1]).normalize();
        let lattice = Lattice::from_vectors(self.inplane[0], self.inplane[1], normal * c_len)?;

        let place = |atom: &Atom, z: f64| {
            Atom::new(
                atom.element.clone(),
                [wrap_frac(atom.position.x), wrap_frac(atom.position.y), wrap_frac(z)],
            )
        };
        let atoms: Vec<Atom> = self
            .substrate
            .atoms
            .iter()
            .map(|atom| place(atom, (atom.position.z - sub_min) * sub_c / c_len))
            .chain(self.film.atoms.iter().map(|atom| {
                place(atom, (atom.position.z - film_min) * film_c / c_len + film_offset)
            }))
            .collect();

        let expected_atoms = atoms.len();
        let name = format!("{}/{}", self.film.name, self.substrate.name);
        Ok(Stacked {
            structure: Crystal::new(name, lattice, atoms),
            interfacial_distance,
            interface_height,
            expected_atoms,
            components: self.components,
        })
    }
}

/// 指定元素原子的平均分数高度
fn mean_height(crystal: &Crystal, species: &BTreeSet<String>) -> Option<f64> {
    let zs: Vec<f64> = crystal
        .atoms
        .iter()
        .filter(|atom| species.contains(&atom.element))
        .map(|atom| atom.position.z)
        .collect();
    if zs.is_empty() {
        None
    } else {
        Some(zs.iter().sum::<f64>() / zs.len() as f64)
    }
}

impl Stacked {
    /// 约化 → 惯用 → 约化 → 原胞 → 标准取向，并重新判定两侧
    pub fn refine(self, analyzer: &dyn SymmetryAnalyzer) -> Result<Refined> {
        let (sub_only, film_only) = self.components.exclusive()?;

        let reduced = analyzer.reduced(&self.structure)?;
        let conventional = analyzer.conventional_standard(&reduced)?;
        let primitive = analyzer.primitive(&analyzer.reduced(&conventional)?)?;
        let structure = analyzer.conventional_standard(&primitive)?;

        if structure.len() != self.expected_atoms {
            return Err(HeteroError::RefinementChangedComposition {
                expected: self.expected_atoms,
                found: structure.len(),
            });
        }

        let indistinguishable = || HeteroError::IndistinguishableComponents {
            shared: self
                .components
                .substrate
                .intersection(&self.components.film)
                .cloned()
                .collect::<Vec<_>>()
                .join(", "),
        };
        let substrate_mean_height =
            mean_height(&structure, &sub_only).ok_or_else(indistinguishable)?;
        let film_mean_height = mean_height(&structure, &film_only).ok_or_else(indistinguishable)?;

        Ok(Refined {
            structure,
            interfacial_distance: self.interfacial_distance,
            interface_height: self.interface_height,
            substrate_mean_height,
            film_mean_height,
            components: self.components,
        })
    }
}

/// 绕 a 轴旋转 180°：(x, y, z) → (x, -y, -z)，b、c 取反后保持右手且 c 朝上
pub fn flip_structure(crystal: &Crystal) -> Result<Crystal> {
    let a = crystal.lattice.vector(0);
    let b = crystal.lattice.vector(1);
    let c = crystal.lattice.vector(2);
    let lattice = Lattice::from_vectors(
        a,
        Vector3::new(-b.x, b.y, b.z),
        Vector3::new(-c.x, c.y, c.z),
    )?;
    let atoms = crystal
        .atoms
        .iter()
        .map(|atom| {
            let p = atom.position;
            Atom::new(atom.element.clone(), [wrap_frac(p.x), wrap_frac(-p.y), wrap_frac(-p.z)])
        })
        .collect();
    Ok(Crystal::new(crystal.name.clone(), lattice, atoms))
}

impl Refined {
    /// 保证薄膜在衬底上方
    pub fn orient(self) -> Result<Oriented> {
        if self.film_mean_height < self.substrate_mean_height {
            Ok(Oriented {
                structure: flip_structure(&self.structure)?,
                interfacial_distance: self.interfacial_distance,
                interface_height: 1.0 - self.interface_height,
                components: self.components,
            })
        } else {
            Ok(Oriented {
                structure: self.structure,
                interfacial_distance: self.interfacial_distance,
                interface_height: self.interface_height,
                components: self.components,
            })
        }
    }
}

impl Oriented {
    /// 整体平移使界面位于 z = 0.5
    pub fn center(self) -> Oriented {
        let all: Vec<usize> = (0..self.structure.len()).collect();
        let shift = Vector3::new(0.0, 0.0, 0.5 - self.interface_height);
        Oriented {
            structure: self.structure.translated(&all, &shift),
            interface_height: 0.5,
            ..self
        }
    }

    pub fn finalize(self) -> Interface {
        Interface {
            structure: self.structure,
            interfacial_distance: self.interfacial_distance,
            interface_height: self.interface_height,
            substrate_species: self.components.substrate,
            film_species: self.components.film,
        }
    }
}

/// 界面构建器：按顺序驱动各阶段
pub struct InterfaceBuilder<'a> {
    analyzer: &'a dyn SymmetryAnalyzer,
    config: InterfaceConfig,
}

impl<'a> InterfaceBuilder<'a> {
    pub fn new(analyzer: &'a dyn SymmetryAnalyzer, config: InterfaceConfig) -> Self {
        Self { analyzer, config }
    }

    pub fn build(&self, substrate: &Surface, film: &Surface, matching: &LatticeMatch) -> Result<Interface> {
        if self.config.interfacial_distance <= 0.0 || self.config.vacuum < 0.0 {
            return Err(HeteroError::InvalidArgument(format!(
                "interfacial distance ({}) must be positive and vacuum ({}) non-negative",
                self.config.interfacial_distance, self.config.vacuum
            )));
        }

        let oriented = SupercellsPrepared::new(substrate, film, matching)?
            .align(matching, self.config.strain_fraction)?
            .stack(self.config.interfacial_distance, self.config.vacuum)?
            .refine(self.analyzer)?
            .orient()?;

        let oriented = if self.config.center {
            oriented.center()
        } else {
            oriented
        };
        Ok(oriented.finalize())
    }
}
