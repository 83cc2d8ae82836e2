//! # 统一错误处理模块
//!
//! 定义 heterostack 的所有错误类型，使用 `thiserror` 派生。
//!
//! ## 依赖关系
//! - 被所有其他模块使用
//! - 无外部模块依赖

use thiserror::Error;

/// heterostack 统一错误类型
#[derive(Error, Debug)]
pub enum HeteroError {
    // ─────────────────────────────────────────────────────────────
    // I/O 错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to read file: {path}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    FileWriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    // ─────────────────────────────────────────────────────────────
    // 解析错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to parse {format} file: {path}\nReason: {reason}")]
    ParseError {
        format: String,
        path: String,
        reason: String,
    },

    #[error("Invalid structure format: {0}")]
    InvalidFormat(String),

    // ─────────────────────────────────────────────────────────────
    // 晶体学 / 构建错误
    // ─────────────────────────────────────────────────────────────
    #[error("Invalid Miller index: {0}")]
    InvalidMillerIndex(String),

    #[error("Invalid lattice: {0}")]
    InvalidLattice(String),

    #[error("Symmetry analysis failed: {0}")]
    SymmetryError(String),

    #[error(
        "The film shift results in an interfacial distance of {distance:.3} Å (< 0.5 Å), which is non-physical"
    )]
    InvalidShift { distance: f64 },

    #[error(
        "Cannot distinguish film from substrate: every species is shared by both ({shared})"
    )]
    IndistinguishableComponents { shared: String },

    #[error("Cell refinement changed the number of sites: expected {expected}, found {found}")]
    RefinementChangedComposition { expected: usize, found: usize },

    #[error("Cannot build interaction landscape: {0}")]
    NoInteractingLayers(String),

    #[error("No radius available for element '{0}' (pass a custom radius)")]
    UnknownRadius(String),

    // ─────────────────────────────────────────────────────────────
    // 扫描错误
    // ─────────────────────────────────────────────────────────────
    #[error("Scan failed at sample {index}: {reason}")]
    ScanFailed { index: usize, reason: String },

    // ─────────────────────────────────────────────────────────────
    // 参数错误
    // ─────────────────────────────────────────────────────────────
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // ─────────────────────────────────────────────────────────────
    // CSV 错误
    // ─────────────────────────────────────────────────────────────
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    // ─────────────────────────────────────────────────────────────
    // 其他
    // ─────────────────────────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, HeteroError>;
