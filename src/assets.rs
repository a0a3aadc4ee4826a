use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use anyhow::Context as _;

use crate::{
    error::{TokenmillError, TokenmillResult},
    source::decode_image,
    surface::Surface,
};

/// Logical names of the six compositing layers, in load order.
pub const ASSET_NAMES: [&str; 6] = [
    "erase_base",
    "erase_inner",
    "erase_outer",
    "erase_center",
    "shading_inner",
    "shading_outer",
];

/// Supplies raw bytes for the fixed logical layer names.
pub trait AssetSource {
    fn load(&self, name: &str) -> TokenmillResult<Vec<u8>>;
}

/// Reads `<root>/<name>.png`.
#[derive(Clone, Debug)]
pub struct FsAssetSource {
    root: PathBuf,
}

impl FsAssetSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl AssetSource for FsAssetSource {
    fn load(&self, name: &str) -> TokenmillResult<Vec<u8>> {
        let path = self.root.join(format!("{name}.png"));
        read_asset_file(&path)
    }
}

fn read_asset_file(path: &Path) -> TokenmillResult<Vec<u8>> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("read asset '{}'", path.display()))
        .map_err(|e| TokenmillError::asset_load(format!("{e:#}")))?;
    Ok(bytes)
}

/// In-memory source keyed by logical name; used by tests and embedders.
#[derive(Clone, Debug, Default)]
pub struct MemoryAssetSource {
    entries: HashMap<String, Vec<u8>>,
}

impl MemoryAssetSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, bytes: Vec<u8>) {
        self.entries.insert(name.into(), bytes);
    }
}

impl AssetSource for MemoryAssetSource {
    fn load(&self, name: &str) -> TokenmillResult<Vec<u8>> {
        self.entries
            .get(name)
            .cloned()
            .ok_or_else(|| TokenmillError::asset_load(format!("no asset named '{name}'")))
    }
}

/// The six decoded mask/shading layers, shared read-only once loaded.
#[derive(Clone, Debug)]
pub struct TokenAssets {
    pub erase_base: Surface,
    pub erase_inner: Surface,
    pub erase_outer: Surface,
    pub erase_center: Surface,
    pub shading_inner: Surface,
    pub shading_outer: Surface,
}

impl TokenAssets {
    /// Load and decode all six layers from `source`.
    ///
    /// Any missing or undecodable layer fails the whole load with
    /// [`TokenmillError::AssetLoad`].
    pub fn load(source: &dyn AssetSource) -> TokenmillResult<Self> {
        let load_one = |name: &str| -> TokenmillResult<Surface> {
            let bytes = source.load(name)?;
            decode_image(&bytes)
                .map_err(|e| TokenmillError::asset_load(format!("decode layer '{name}': {e}")))
        };

        Ok(Self {
            erase_base: load_one("erase_base")?,
            erase_inner: load_one("erase_inner")?,
            erase_outer: load_one("erase_outer")?,
            erase_center: load_one("erase_center")?,
            shading_inner: load_one("shading_inner")?,
            shading_outer: load_one("shading_outer")?,
        })
    }
}
