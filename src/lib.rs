//! # Curve Reader
//!
//! Reads Vectornator and Linearity Curve documents into one version-independent
//! scene graph of artboards, layers, paths, text and images.
//!
//! ```no_run
//! use curve_reader::{open_document, DecodeOptions};
//!
//! let document = open_document("drawing.curve", &DecodeOptions::default())?;
//! for artboard in &document.artboards {
//!     println!("{}: {} layers", artboard.title, artboard.layers.len());
//! }
//! # Ok::<(), curve_reader::DecodeError>(())
//! ```

pub use curve_core::*;

/// Raw JSON entry structures.
pub mod data {
    pub use curve_data::model::*;
}
