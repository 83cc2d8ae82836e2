//! # surface 命令实现
//!
//! ## 功能
//! - 生成指定晶面的惯用/原胞 slab
//! - 可选删除顶部或底部原子层
//! - 输出层结构概要与 POSCAR
//!
//! ## 依赖关系
//! - 使用 `cli/surface.rs` 定义的参数
//! - 使用 `surface/`、`symmetry/`、`parsers/`
//! - 使用 `utils/output.rs`

use super::{load_bulk, miller_from};
use crate::cli::surface::SurfaceArgs;
use crate::error::Result;
use crate::parsers;
use crate::surface::{SlabConfig, Surface, SurfaceBuilder};
use crate::symmetry::SymmetryFinder;
use crate::utils::output;

use tabled::{Table, Tabled};

#[derive(Debug, Clone, Tabled)]
struct LayerRow {
    #[tabled(rename = "Layer")]
    index: usize,
    #[tabled(rename = "Height (frac)")]
    height: String,
    #[tabled(rename = "Atoms")]
    atoms: usize,
    #[tabled(rename = "Species")]
    species: String,
}

/// 执行 surface 命令
pub fn execute(args: SurfaceArgs) -> Result<()> {
    output::print_header("Surface Slab Generation");

    let bulk = load_bulk(&args.input)?;
    let miller = miller_from(&args.miller)?;
    let finder = SymmetryFinder::new(args.symprec);
    let config = SlabConfig {
        layers: args.layers,
        vacuum: args.vacuum,
        layer_tolerance: args.layer_tolerance,
    };

    let mut surface = SurfaceBuilder::new(&finder).build(&bulk, miller, &config)?;
    output::print_info(&format!(
        "Surface basis: {:?}, area {:.4} Å²",
        surface.directions,
        surface.area()
    ));

    if args.remove_top > 0 {
        surface = surface.remove_layers(args.remove_top, true, None)?;
        output::print_info(&format!("Removed {} layer(s) from the top", args.remove_top));
    }
    if args.remove_bottom > 0 {
        surface = surface.remove_layers(args.remove_bottom, false, None)?;
        output::print_info(&format!(
            "Removed {} layer(s) from the bottom",
            args.remove_bottom
        ));
    }

    print_layers(&surface);

    let slab = if args.primitive {
        &surface.primitive
    } else {
        &surface.conventional
    };
    parsers::write_structure_file(slab, &args.output)?;

    output::print_separator();
    output::print_success(&format!(
        "{} slab {} ({} atoms, termination {}) written to '{}'",
        if args.primitive { "Primitive" } else { "Conventional" },
        slab.formula(),
        slab.len(),
        surface.termination().into_iter().collect::<Vec<_>>().join("-"),
        args.output.display()
    ));
    Ok(())
}

fn print_layers(surface: &Surface) {
    let slab = &surface.conventional;
    let rows: Vec<LayerRow> = surface
        .layer_groups(None)
        .iter()
        .enumerate()
        .map(|(i, layer)| {
            let mut species: Vec<&str> = layer
                .indices
                .iter()
                .map(|&j| slab.atoms[j].element.as_str())
                .collect();
            species.sort_unstable();
            species.dedup();
            LayerRow {
                index: i + 1,
                height: format!("{:.4}", layer.height),
                atoms: layer.indices.len(),
                species: species.join(" "),
            }
        })
        .collect();

    output::print_header(&format!("{} Atomic Layers (bottom to top)", rows.len()));
    println!("{}", Table::new(&rows));
}
