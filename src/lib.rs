#![forbid(unsafe_code)]

pub mod assets;
pub mod blend;
pub mod blur;
pub mod compositor;
pub mod config;
pub mod error;
pub mod framing;
pub mod pipeline;
pub mod registry;
pub mod source;
pub mod surface;

pub use assets::{ASSET_NAMES, AssetSource, FsAssetSource, MemoryAssetSource, TokenAssets};
pub use blend::BlendMode;
pub use compositor::composite;
pub use config::{FramingMode, PipelineConfig, parse_hex_color};
pub use error::{TokenmillError, TokenmillResult};
pub use framing::{Framing, MAX_ZOOM, TOKEN_SIZE, auto_frame};
pub use pipeline::{FramingHost, NullFramingHost, NullPreview, Pipeline, PreviewSink, Status};
pub use registry::{Registry, Token};
pub use source::{PendingFile, decode_image};
pub use surface::Surface;
