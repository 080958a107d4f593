use bitflags::bitflags;

bitflags! {
    /// Flags controlling `load`'s post-processing pipeline.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LoadFlags: u32 {
        /// Bake every node's global transform into its meshes' vertex data,
        /// then reset the node matrices to identity.
        const APPLY_XFORM   = 0x0001;
        /// Synthesize tangents for every mesh that has texture coordinates.
        const GEN_TANGENTS  = 0x0002;
        /// Skip post-processing entirely (transform propagation and bounds
        /// are still computed; normal/tangent synthesis and apply-transform
        /// are not).
        const NOPROC        = 0x8000;
    }
}

impl Default for LoadFlags {
    fn default() -> Self {
        LoadFlags::empty()
    }
}

/// The format a scene should be saved as. `Auto` defers to an explicit
/// suffix match against the save path, falling back to OBJ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveFormat {
    #[default]
    Auto,
    Obj,
    Jtf,
    Gltf,
    ThreeDs,
    Stl,
}

impl SaveFormat {
    /// Suffixes recognized for this format, used both for auto-detection
    /// on save and (together with magic bytes, for binary formats) on
    /// load.
    pub fn suffixes(self) -> &'static [&'static str] {
        match self {
            SaveFormat::Auto => &[],
            SaveFormat::Obj => &["obj"],
            SaveFormat::Jtf => &["jtf"],
            SaveFormat::Gltf => &["gltf", "glb"],
            SaveFormat::ThreeDs => &["3ds"],
            SaveFormat::Stl => &["stl"],
        }
    }

    /// Picks a format by matching `path`'s suffix case-insensitively
    /// against every known format, falling back to OBJ if nothing
    /// matches (including no suffix at all).
    pub fn from_path_suffix(path: &str) -> SaveFormat {
        let suffix = path.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
        for fmt in [
            SaveFormat::Obj,
            SaveFormat::Jtf,
            SaveFormat::Gltf,
            SaveFormat::ThreeDs,
            SaveFormat::Stl,
        ] {
            if fmt.suffixes().iter().any(|s| *s == suffix) {
                return fmt;
            }
        }
        SaveFormat::Obj
    }
}
