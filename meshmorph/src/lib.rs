//! Flattens FBX scenes into one indexed triangle mesh.
//!
//! ```no_run
//! use meshmorph::prelude::*;
//!
//! let context = ImportContext::new();
//! let import = FbxImport::new(&context, "character.fbx", ImportSettings::default());
//! println!("{}", import.mesh());
//! ```

mod import;
mod settings;

pub use import::*;
pub use settings::*;

pub use meshmorph_math as math;
pub use meshmorph_scene as scene;
pub use meshmorph_utils as utils;

pub mod prelude {
    pub use crate::import::*;
    pub use crate::settings::*;
    pub use meshmorph_math::*;
    pub use meshmorph_scene::*;
    pub use meshmorph_utils::*;
}
