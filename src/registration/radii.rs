//! # 原子半径
//!
//! 界面打分所用的原子半径。每一侧（衬底/薄膜）按体相组成选用一类半径：
//! - 全部为金属元素：金属半径
//! - 否则若任意两元素电负性差 ≥ 1.7：平均离子半径
//! - 否则：共价半径
//!
//! 用户给出的半径表优先。
//!
//! ## 依赖关系
//! - 被 `registration/landscape.rs`、`registration/scan.rs`、`commands/` 使用

use crate::error::{HeteroError, Result};

use std::collections::{BTreeMap, BTreeSet};

/// 离子性判据：电负性差阈值
const IONIC_THRESHOLD: f64 = 1.7;

/// 元素数据 (Å)
#[derive(Debug, Clone, Copy)]
pub struct ElementData {
    pub symbol: &'static str,
    /// Pauling 电负性
    pub electronegativity: f64,
    pub covalent: f64,
    /// 仅金属元素有
    pub metallic: Option<f64>,
    pub ionic: Option<f64>,
}

const fn el(
    symbol: &'static str,
    electronegativity: f64,
    covalent: f64,
    metallic: Option<f64>,
    ionic: Option<f64>,
) -> ElementData {
    ElementData {
        symbol,
        electronegativity,
        covalent,
        metallic,
        ionic,
    }
}

#[rustfmt::skip]
const ELEMENTS: &[ElementData] = &[
    el("H",  2.20, 0.31, None,        Some(1.40)),
    el("Li", 0.98, 1.28, Some(1.52),  Some(0.90)),
    el("Be", 1.57, 0.96, Some(1.12),  Some(0.59)),
    el("B",  2.04, 0.84, None,        Some(0.41)),
    el("C",  2.55, 0.76, None,        Some(0.30)),
    el("N",  3.04, 0.71, None,        Some(1.46)),
    el("O",  3.44, 0.66, None,        Some(1.26)),
    el("F",  3.98, 0.57, None,        Some(1.19)),
    el("Na", 0.93, 1.66, Some(1.86),  Some(1.16)),
    el("Mg", 1.31, 1.41, Some(1.60),  Some(0.86)),
    el("Al", 1.61, 1.21, Some(1.43),  Some(0.675)),
    el("Si", 1.90, 1.11, None,        Some(0.54)),
    el("P",  2.19, 1.07, None,        Some(0.52)),
    el("S",  2.58, 1.05, None,        Some(1.70)),
    el("Cl", 3.16, 1.02, None,        Some(1.67)),
    el("K",  0.82, 2.03, Some(2.27),  Some(1.52)),
    el("Ca", 1.00, 1.76, Some(1.97),  Some(1.14)),
    el("Sc", 1.36, 1.70, Some(1.62),  Some(0.885)),
    el("Ti", 1.54, 1.60, Some(1.47),  Some(0.77)),
    el("V",  1.63, 1.53, Some(1.34),  Some(0.72)),
    el("Cr", 1.66, 1.39, Some(1.28),  Some(0.755)),
    el("Mn", 1.55, 1.39, Some(1.27),  Some(0.77)),
    el("Fe", 1.83, 1.32, Some(1.26),  Some(0.74)),
    el("Co", 1.88, 1.26, Some(1.25),  Some(0.73)),
    el("Ni", 1.91, 1.24, Some(1.24),  Some(0.77)),
    el("Cu", 1.90, 1.32, Some(1.28),  Some(0.80)),
    el("Zn", 1.65, 1.22, Some(1.34),  Some(0.88)),
    el("Ga", 1.81, 1.22, Some(1.35),  Some(0.76)),
    el("Ge", 2.01, 1.20, None,        Some(0.67)),
    el("As", 2.18, 1.19, None,        Some(0.60)),
    el("Se", 2.55, 1.20, None,        Some(1.84)),
    el("Br", 2.96, 1.20, None,        Some(1.82)),
    el("Rb", 0.82, 2.20, Some(2.48),  Some(1.66)),
    el("Sr", 0.95, 1.95, Some(2.15),  Some(1.32)),
    el("Y",  1.22, 1.90, Some(1.80),  Some(1.04)),
    el("Zr", 1.33, 1.75, Some(1.60),  Some(0.86)),
    el("Nb", 1.60, 1.64, Some(1.46),  Some(0.78)),
    el("Mo", 2.16, 1.54, Some(1.39),  Some(0.73)),
    el("Tc", 1.90, 1.47, Some(1.36),  Some(0.72)),
    el("Ru", 2.20, 1.46, Some(1.34),  Some(0.76)),
    el("Rh", 2.28, 1.42, Some(1.34),  Some(0.74)),
    el("Pd", 2.20, 1.39, Some(1.37),  Some(0.90)),
    el("Ag", 1.93, 1.45, Some(1.44),  Some(1.15)),
    el("Cd", 1.69, 1.44, Some(1.51),  Some(1.09)),
    el("In", 1.78, 1.42, Some(1.67),  Some(0.94)),
    el("Sn", 1.96, 1.39, Some(1.58),  Some(0.83)),
    el("Sb", 2.05, 1.39, None,        Some(0.90)),
    el("Te", 2.10, 1.38, None,        Some(1.00)),
    el("I",  2.66, 1.39, None,        Some(2.06)),
    el("Cs", 0.79, 2.44, Some(2.65),  Some(1.81)),
    el("Ba", 0.89, 2.15, Some(2.22),  Some(1.49)),
    el("La", 1.10, 2.07, Some(1.87),  Some(1.17)),
    el("Ce", 1.12, 2.04, Some(1.818), Some(1.10)),
    el("Pr", 1.13, 2.03, Some(1.824), Some(1.11)),
    el("Nd", 1.14, 2.01, Some(1.814), Some(1.12)),
    el("Sm", 1.17, 1.98, Some(1.804), Some(1.10)),
    el("Eu", 1.20, 1.98, Some(2.084), Some(1.17)),
    el("Gd", 1.20, 1.96, Some(1.804), Some(1.08)),
    el("Tb", 1.10, 1.94, Some(1.773), Some(1.03)),
    el("Dy", 1.22, 1.92, Some(1.781), Some(1.05)),
    el("Ho", 1.23, 1.92, Some(1.762), Some(1.04)),
    el("Er", 1.24, 1.89, Some(1.761), Some(1.03)),
    el("Yb", 1.10, 1.87, Some(1.940), Some(1.04)),
    el("Lu", 1.27, 1.87, Some(1.735), Some(1.00)),
    el("Hf", 1.30, 1.75, Some(1.59),  Some(0.85)),
    el("Ta", 1.50, 1.70, Some(1.46),  Some(0.78)),
    el("W",  2.36, 1.62, Some(1.39),  Some(0.74)),
    el("Re", 1.90, 1.51, Some(1.37),  Some(0.70)),
    el("Os", 2.20, 1.44, Some(1.35),  Some(0.69)),
    el("Ir", 2.20, 1.41, Some(1.355), Some(0.76)),
    el("Pt", 2.28, 1.36, Some(1.385), Some(0.80)),
    el("Au", 2.54, 1.36, Some(1.44),  Some(1.00)),
    el("Hg", 2.00, 1.32, Some(1.51),  Some(1.16)),
    el("Tl", 1.62, 1.45, Some(1.70),  Some(1.20)),
    el("Pb", 2.33, 1.46, Some(1.75),  Some(1.19)),
    el("Bi", 2.02, 1.48, Some(1.82),  Some(1.10)),
];

/// 查找元素数据
pub fn element(symbol: &str) -> Option<&'static ElementData> {
    ELEMENTS.iter().find(|e| e.symbol == symbol)
}

/// 半径类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadiusKind {
    Metallic,
    Ionic,
    Covalent,
}

/// 按组成选择半径类型
pub fn radius_kind(species: &BTreeSet<String>) -> Result<RadiusKind> {
    let data = species
        .iter()
        .map(|s| element(s).ok_or_else(|| HeteroError::UnknownRadius(s.clone())))
        .collect::<Result<Vec<_>>>()?;

    if data.iter().all(|e| e.metallic.is_some()) {
        return Ok(RadiusKind::Metallic);
    }

    let ionic = data.iter().enumerate().any(|(i, a)| {
        data[i + 1..]
            .iter()
            .any(|b| (a.electronegativity - b.electronegativity).abs() >= IONIC_THRESHOLD)
    });
    Ok(if ionic {
        RadiusKind::Ionic
    } else {
        RadiusKind::Covalent
    })
}

/// 一侧组分的半径表
pub fn component_radii(species: &BTreeSet<String>) -> Result<BTreeMap<String, f64>> {
    let kind = radius_kind(species)?;
    species
        .iter()
        .map(|s| {
            let data = element(s).ok_or_else(|| HeteroError::UnknownRadius(s.clone()))?;
            let radius = match kind {
                RadiusKind::Metallic => data.metallic,
                RadiusKind::Ionic => data.ionic,
                RadiusKind::Covalent => Some(data.covalent),
            };
            radius
                .map(|r| (s.clone(), r))
                .ok_or_else(|| HeteroError::UnknownRadius(s.clone()))
        })
        .collect()
}

/// 整个界面的半径表：薄膜覆盖衬底中的同名元素，自定义表覆盖一切
pub fn interface_radii(
    substrate: &BTreeSet<String>,
    film: &BTreeSet<String>,
    custom: Option<&BTreeMap<String, f64>>,
) -> Result<BTreeMap<String, f64>> {
    let custom = custom.cloned().unwrap_or_default();
    let mut radii = BTreeMap::new();

    for species in [substrate, film] {
        if species.iter().all(|s| custom.contains_key(s)) {
            continue;
        }
        radii.extend(component_radii(species)?);
    }
    radii.extend(custom);
    Ok(radii)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_radius_kind_rules() {
        assert_eq!(radius_kind(&set(&["Cu", "Au"])).unwrap(), RadiusKind::Metallic);
        assert_eq!(radius_kind(&set(&["Na", "Cl"])).unwrap(), RadiusKind::Ionic);
        assert_eq!(radius_kind(&set(&["Ga", "As"])).unwrap(), RadiusKind::Covalent);
        assert_eq!(radius_kind(&set(&["Si"])).unwrap(), RadiusKind::Covalent);
    }

    #[test]
    fn test_component_radii_values() {
        let radii = component_radii(&set(&["Na", "Cl"])).unwrap();
        assert!((radii["Na"] - 1.16).abs() < 1e-12);
        assert!((radii["Cl"] - 1.67).abs() < 1e-12);
    }

    #[test]
    fn test_film_and_custom_override() {
        let custom: BTreeMap<String, f64> = [("As".to_string(), 2.0)].into_iter().collect();
        let radii = interface_radii(&set(&["Ga", "As"]), &set(&["Ga"]), Some(&custom)).unwrap();
        // 薄膜为纯金属 Ga，覆盖衬底中的共价半径
        assert!((radii["Ga"] - 1.35).abs() < 1e-12);
        assert!((radii["As"] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_element() {
        assert!(matches!(
            component_radii(&set(&["Xx"])),
            Err(HeteroError::UnknownRadius(_))
        ));
        let custom: BTreeMap<String, f64> = [("Xx".to_string(), 1.0)].into_iter().collect();
        assert!(interface_radii(&set(&["Xx"]), &set(&["Cu"]), Some(&custom)).is_ok());
    }
}
