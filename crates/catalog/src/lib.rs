//! # urbanheat Catalog
//!
//! Imagery source backed by a STAC ItemCollection on local disk.
//!
//! Each item describes one acquisition and carries one GeoTIFF asset per
//! band, keyed by band name (`SR_B4`, `ST_B10`, ...). [`LocalCatalog`]
//! filters items by collection, date range and footprint, then loads the
//! matching items as [`urbanheat_core::Image`]s.
//!
//! ```ignore
//! use urbanheat_catalog::LocalCatalog;
//! use urbanheat_core::io::{CollectionQuery, ImagerySource};
//!
//! let catalog = LocalCatalog::open("scenes/items.json")?;
//! let images = catalog.query_collection(&query)?;
//! ```

pub mod error;
pub mod local;
pub mod stac_models;

pub use error::{CatalogError, Result};
pub use local::LocalCatalog;
pub use stac_models::{StacAsset, StacItem, StacItemCollection, StacItemProperties, StacLink};
