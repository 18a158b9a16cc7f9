//! Layout pack catalog: data model, cross-run accumulation, and thumbnail normalization.

pub mod capture;
pub mod facets;
pub mod merge;
pub mod types;

pub use capture::{
    normalize_thumbnail, thumbnail_file_path, thumbnail_relative_path, write_thumbnail,
    ThumbnailSpec, THUMBNAIL_EXT,
};
pub use facets::{enrich_packs, placeholder_facets};
pub use merge::{accumulate, finalize, Accumulator, ThumbnailRewrite};
pub use types::*;
