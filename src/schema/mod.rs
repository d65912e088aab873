pub mod arrow;
pub mod layout;
pub mod registry;
pub mod types;
pub mod write;

pub use arrow::{build_arrow_schema, map_declared_type, target_type, TargetType};
pub use layout::parse_layout;
pub use registry::load_layouts;
pub use types::{ColumnSpec, Layout};
pub use write::write_layout_json;
