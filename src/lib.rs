pub mod buffer;
pub mod cli;
pub mod clip;
pub mod crs;
pub mod encode;
pub mod error;
pub mod feature;
pub mod filter;
pub mod geojson;
pub mod mapper;
pub mod output;
pub mod query;
pub mod render;
pub mod request;
pub mod simplify;
pub mod style;

pub use crate::error::{EncodeError, Error, Result};
pub use crate::render::{AbortHandle, ImageMapEncoder};
pub use crate::request::{LayerRequest, MapRequest, read_request};
