// curve-data: Serde structs for Vectornator / Linearity Curve JSON entries
pub mod model;
