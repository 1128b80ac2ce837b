mod r#impl;
mod structs;

pub use r#impl::{get_config, init_config, init_config_from, init_config_with};
pub use structs::*;

/// TypeScript 类型导出路径
pub const TS_EXPORT_PATH: &str = "../frontend/src/api/types.generated.ts";
