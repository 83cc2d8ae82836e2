//! # interface 命令实现
//!
//! ## 功能
//! - 读取衬底与薄膜体相，生成两侧 slab
//! - 按给定的面内超胞矩阵与应变构建界面
//! - 可选：构建配准能量面，Adam 搜索最优面内平移并应用到薄膜
//!
//! ## 依赖关系
//! - 使用 `cli/interface.rs` 定义的参数
//! - 使用 `surface/`、`interface/`、`registration/`
//! - 使用 `utils/output.rs`, `utils/progress.rs`

use super::{custom_radii, load_bulk, matrix_from, miller_from};
use crate::cli::interface::{InterfaceArgs, InterfaceInputs};
use crate::error::Result;
use crate::interface::{Interface, InterfaceBuilder, InterfaceConfig, LatticeMatch};
use crate::registration::{
    export, AdamConfig, LandscapeConfig, RegistrationLandscapes, RegistrationOptimizer,
    RegistrationResult,
};
use crate::surface::{SlabConfig, SurfaceBuilder};
use crate::symmetry::SymmetryFinder;
use crate::utils::{output, progress};

use tabled::{Table, Tabled};

#[derive(Debug, Clone, Tabled)]
struct BasinRow {
    #[tabled(rename = "Rank")]
    rank: usize,
    #[tabled(rename = "Shift x (Å)")]
    x: String,
    #[tabled(rename = "Shift y (Å)")]
    y: String,
    #[tabled(rename = "Fractional")]
    fractional: String,
    #[tabled(rename = "Primary")]
    primary: String,
    #[tabled(rename = "Primary + depth")]
    total: String,
}

/// 由命令行输入构建界面（`scan` 命令复用）
pub fn build_interface(inputs: &InterfaceInputs) -> Result<Interface> {
    let finder = SymmetryFinder::new(inputs.symprec);
    let builder = SurfaceBuilder::new(&finder);

    let sub_bulk = load_bulk(&inputs.substrate)?;
    let film_bulk = load_bulk(&inputs.film)?;

    let slab_config = |layers| SlabConfig {
        layers,
        layer_tolerance: inputs.layer_tolerance,
        ..SlabConfig::default()
    };
    let substrate = builder.build(
        &sub_bulk,
        miller_from(&inputs.sub_miller)?,
        &slab_config(inputs.sub_layers),
    )?;
    let film = builder.build(
        &film_bulk,
        miller_from(&inputs.film_miller)?,
        &slab_config(inputs.film_layers),
    )?;
    output::print_info(&format!(
        "Substrate {} {}: {} atoms (primitive), area {:.4} Å²",
        substrate.bulk.formula(),
        substrate.miller,
        substrate.primitive.len(),
        substrate.primitive.lattice.inplane_area()
    ));
    output::print_info(&format!(
        "Film {} {}: {} atoms (primitive), area {:.4} Å²",
        film.bulk.formula(),
        film.miller,
        film.primitive.len(),
        film.primitive.lattice.inplane_area()
    ));

    let matching = LatticeMatch {
        film_transformation: matrix_from(&inputs.film_matrix)?,
        substrate_transformation: matrix_from(&inputs.sub_matrix)?,
        strain: [inputs.strain[0], inputs.strain[1]],
        angle_diff: inputs.angle_diff,
    };
    let config = InterfaceConfig {
        strain_fraction: inputs.strain_frac,
        interfacial_distance: inputs.distance,
        vacuum: inputs.vacuum,
        center: inputs.center,
    };

    let interface = InterfaceBuilder::new(&finder, config).build(&substrate, &film, &matching)?;
    output::print_success(&format!(
        "Interface {}: {} atoms ({} substrate, {} film), height {:.4}, distance {:.3} Å",
        interface.structure.formula(),
        interface.structure.len(),
        interface.substrate_indices().len(),
        interface.film_indices().len(),
        interface.interface_height,
        interface.interfacial_distance
    ));
    Ok(interface)
}

/// 执行 interface 命令
pub fn execute(args: InterfaceArgs) -> Result<()> {
    output::print_header("Interface Construction");

    let mut interface = build_interface(&args.inputs)?;

    if args.optimize {
        let result = optimize(&interface, &args)?;
        interface.apply_registration(&result.shift_array())?;
        output::print_success(&format!(
            "Applied registration shift ({:.4}, {:.4}) Å",
            result.shift.x, result.shift.y
        ));
    }

    interface.write_poscar(&args.output)?;
    output::print_separator();
    output::print_success(&format!(
        "Interface written to '{}' (cell volume {:.2} Å³)",
        args.output.display(),
        interface.structure_volume()
    ));
    Ok(())
}

fn optimize(interface: &Interface, args: &InterfaceArgs) -> Result<RegistrationResult> {
    output::print_header("Registration Optimization");

    let landscape_config = LandscapeConfig {
        layer_tolerance: args.inputs.layer_tolerance,
        custom_radii: custom_radii(&args.inputs.radii),
    };
    let landscapes = RegistrationLandscapes::from_interface(interface, &landscape_config)?;
    output::print_info(&format!(
        "Landscape: {} primary, {} + {} depth Gaussians",
        landscapes.primary.len(),
        landscapes.substrate_depth.len(),
        landscapes.film_depth.len()
    ));
    if landscapes.substrate_depth.is_empty() || landscapes.film_depth.is_empty() {
        output::print_warning("Second substrate or film layer missing; depth correction is partial");
    }

    let optimizer = RegistrationOptimizer::new(AdamConfig {
        iterations: args.iterations,
        learning_rate: args.learning_rate,
        ..AdamConfig::default()
    });
    let pb = progress::create_progress_bar(args.iterations as u64, "Adam");
    let result =
        optimizer.optimize_with(&landscapes, &interface.structure.lattice, |_| pb.inc(1))?;
    pb.finish_and_clear();

    let rows: Vec<BasinRow> = result
        .basins
        .iter()
        .take(args.top_n)
        .enumerate()
        .map(|(i, b)| BasinRow {
            rank: i + 1,
            x: format!("{:.4}", b.position.x),
            y: format!("{:.4}", b.position.y),
            fractional: format!("({:.3}, {:.3})", b.fractional.x, b.fractional.y),
            primary: format!("{:.4}", b.primary),
            total: format!("{:.4}", b.total()),
        })
        .collect();
    output::print_header(&format!(
        "Top {} of {} Registration Basins",
        rows.len(),
        result.basins.len()
    ));
    println!("{}", Table::new(&rows));

    if let Some(path) = &args.basins_csv {
        export::basins_to_csv(&result.basins, path)?;
        output::print_success(&format!("Basins saved to '{}'", path.display()));
    }
    Ok(result)
}
