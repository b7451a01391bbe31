//! Block type registry: maps compact [`BlockId`] values to [`BlockTypeDef`] metadata.
//!
//! The registry is built once during startup and shared read-only afterwards.
//! Air is always ID 0 so that a freshly created chunk represents empty space.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::face_direction::FaceDirection;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Compact block-type identifier stored (via the palette) in every voxel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockId(pub u16);

impl BlockId {
    /// Empty space.
    pub const AIR: BlockId = BlockId(0);

    /// Returns `true` if this is [`BlockId::AIR`].
    pub const fn is_air(self) -> bool {
        self.0 == 0
    }
}

/// Grass block registered by [`BlockRegistry::with_defaults`].
pub const GRASS: BlockId = BlockId(1);
/// Stone block registered by [`BlockRegistry::with_defaults`].
pub const STONE: BlockId = BlockId(2);
/// Dirt block registered by [`BlockRegistry::with_defaults`].
pub const DIRT: BlockId = BlockId(3);
/// Sand block registered by [`BlockRegistry::with_defaults`].
pub const SAND: BlockId = BlockId(4);
/// Log block registered by [`BlockRegistry::with_defaults`].
pub const LOG: BlockId = BlockId(5);
/// Bedrock block registered by [`BlockRegistry::with_defaults`].
pub const BEDROCK: BlockId = BlockId(6);
/// Oak leaves block registered by [`BlockRegistry::with_defaults`].
pub const OAK_LEAVES: BlockId = BlockId(7);

/// Texture layer per face, indexed by [`FaceDirection`] discriminant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceTextures(pub [u16; 6]);

impl FaceTextures {
    /// The same texture on all six faces.
    pub const fn uniform(texture: u16) -> Self {
        Self([texture; 6])
    }

    /// Distinct top and bottom textures with a shared side texture.
    pub const fn top_bottom_side(top: u16, bottom: u16, side: u16) -> Self {
        // PosX, NegX, PosY, NegY, PosZ, NegZ
        Self([side, side, top, bottom, side, side])
    }

    /// Texture layer for the given face.
    pub const fn get(&self, direction: FaceDirection) -> u16 {
        self.0[direction.index()]
    }
}

/// Full descriptor for a block type.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BlockTypeDef {
    /// Human-readable name (e.g. "stone", "grass").
    pub name: String,
    /// Texture-array layer used for each face.
    pub face_textures: FaceTextures,
}

/// Errors that can occur during block type registration.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A type with the same name has already been registered.
    #[error("duplicate block type name: {0}")]
    DuplicateName(String),
    /// Every `u16` id has been handed out.
    #[error("block type registry is full (max 65536 types)")]
    RegistryFull,
}

// ---------------------------------------------------------------------------
// Default texture layers
// ---------------------------------------------------------------------------

const TEX_GRASS_TOP: u16 = 0;
const TEX_GRASS_SIDE: u16 = 1;
const TEX_DIRT: u16 = 2;
const TEX_STONE: u16 = 3;
const TEX_SAND: u16 = 4;
const TEX_LOG_TOP: u16 = 5;
const TEX_LOG_SIDE: u16 = 6;
const TEX_BEDROCK: u16 = 7;
const TEX_OAK_LEAVES: u16 = 8;

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Maps [`BlockId`] → [`BlockTypeDef`] with O(1) lookup by index and
/// O(1) reverse lookup by name.
pub struct BlockRegistry {
    /// Dense array where `index == BlockId.0`.
    types: Vec<BlockTypeDef>,
    /// Reverse lookup: name → ID.
    name_to_id: HashMap<String, BlockId>,
}

impl BlockRegistry {
    /// Creates a new registry with Air pre-registered as ID 0.
    pub fn new() -> Self {
        let air = BlockTypeDef {
            name: "air".to_string(),
            face_textures: FaceTextures::uniform(0),
        };

        let mut name_to_id = HashMap::new();
        name_to_id.insert("air".to_string(), BlockId::AIR);

        Self {
            types: vec![air],
            name_to_id,
        }
    }

    /// Creates a registry holding the built-in block set.
    ///
    /// Registration order matches the [`GRASS`], [`STONE`], [`DIRT`], [`SAND`],
    /// [`LOG`], [`BEDROCK`] and [`OAK_LEAVES`] constants.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        let defaults = [
            ("grass", FaceTextures::top_bottom_side(TEX_GRASS_TOP, TEX_DIRT, TEX_GRASS_SIDE)),
            ("stone", FaceTextures::uniform(TEX_STONE)),
            ("dirt", FaceTextures::uniform(TEX_DIRT)),
            ("sand", FaceTextures::uniform(TEX_SAND)),
            ("log", FaceTextures::top_bottom_side(TEX_LOG_TOP, TEX_LOG_TOP, TEX_LOG_SIDE)),
            ("bedrock", FaceTextures::uniform(TEX_BEDROCK)),
            ("oak_leaves", FaceTextures::uniform(TEX_OAK_LEAVES)),
        ];
        for (name, face_textures) in defaults {
            let id = BlockId(registry.types.len() as u16);
            registry.name_to_id.insert(name.to_string(), id);
            registry.types.push(BlockTypeDef {
                name: name.to_string(),
                face_textures,
            });
        }
        registry
    }

    /// Registers a new block type and returns its assigned ID.
    ///
    /// IDs are assigned sequentially (0 is Air).
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateName`] if a type with the same name
    /// already exists, or [`RegistryError::RegistryFull`] if all 65 536 ids
    /// are consumed.
    pub fn register(&mut self, def: BlockTypeDef) -> Result<BlockId, RegistryError> {
        if self.name_to_id.contains_key(&def.name) {
            return Err(RegistryError::DuplicateName(def.name));
        }
        if self.types.len() > u16::MAX as usize {
            return Err(RegistryError::RegistryFull);
        }

        let id = BlockId(self.types.len() as u16);
        self.name_to_id.insert(def.name.clone(), id);
        self.types.push(def);
        Ok(id)
    }

    /// Returns the definition for a given ID, or `None` if it was never registered.
    pub fn get(&self, id: BlockId) -> Option<&BlockTypeDef> {
        self.types.get(id.0 as usize)
    }

    /// Returns the ID for a named block type, or `None` if not found.
    pub fn lookup_by_name(&self, name: &str) -> Option<BlockId> {
        self.name_to_id.get(name).copied()
    }

    /// Texture layer for one face of a block type.
    ///
    /// Unregistered ids fall back to their raw value so that meshes of
    /// unknown blocks still render with a distinct layer.
    pub fn face_texture(&self, id: BlockId, direction: FaceDirection) -> u16 {
        match self.types.get(id.0 as usize) {
            Some(def) => def.face_textures.get(direction),
            None => id.0,
        }
    }

    /// Returns the total number of registered types (including Air).
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns `true` if only Air is registered.
    pub fn is_empty(&self) -> bool {
        self.types.len() <= 1
    }
}

impl Default for BlockRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
