mod flattened;
mod mesh;

pub use flattened::*;
pub use mesh::*;
