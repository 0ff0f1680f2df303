mod animation;
mod axis;
mod collision;
mod flatten;
mod graph;
mod loaders;
mod lod;
mod objects;
mod skin;

pub use animation::*;
pub use axis::*;
pub use collision::*;
pub use flatten::*;
pub use graph::*;
pub use loaders::*;
pub use lod::*;
pub use objects::*;
pub use skin::*;

use meshmorph_math::*;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("could not read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },
    #[error("file had no file extension")]
    NoFileExtension,
    #[error("no file loader available for {0}")]
    NoFileLoader(String),
    #[error("invalid axis system: {0}")]
    InvalidAxisSystem(String),
    #[error("invalid node id {0}")]
    InvalidNodeId(usize),
    #[error("node {0} would become its own ancestor")]
    CyclicHierarchy(usize),
}

/// A loaded scene: node hierarchy, mesh payloads and the axis system the
/// transforms are currently expressed in.
#[derive(Debug, Clone)]
pub struct Scene {
    pub name: String,
    pub graph: NodeGraph,
    pub meshes: Vec<SceneMesh>,
    pub axis_system: AxisSystem,
    pub evaluator: SceneEvaluator,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new("scene")
    }
}

impl Scene {
    pub fn new<T: Into<String>>(name: T) -> Self {
        Self {
            name: name.into(),
            graph: NodeGraph::new(),
            meshes: Vec::new(),
            axis_system: AxisSystem::default(),
            evaluator: SceneEvaluator::new(),
        }
    }

    pub fn add_mesh(&mut self, mesh: SceneMesh) -> MeshId {
        let id = MeshId(self.meshes.len());
        meshmorph_utils::log::debug!("added mesh \"{}\" with id {}", mesh.name, id.0);
        self.meshes.push(mesh);
        id
    }

    pub fn mesh(&self, id: MeshId) -> Option<&SceneMesh> {
        self.meshes.get(id.0)
    }

    /// Mesh attached to `node`, if any.
    pub fn node_mesh(&self, node: NodeId) -> Option<&SceneMesh> {
        self.graph
            .get(node)
            .and_then(|n| n.mesh())
            .and_then(|m| self.meshes.get(m.0))
    }

    /// Re-expresses the scene in `target` and returns the applied conversion.
    /// The evaluator cache is reset in every case.
    pub fn convert_axis_system(&mut self, target: &AxisSystem) -> Result<AffineMatrix, SceneError> {
        let result = axis::convert_scene(&mut self.graph, &self.axis_system, target);
        if result.is_ok() {
            self.axis_system = *target;
        }
        self.evaluator.reset();
        result
    }

    /// Scene space transform of `node`, see [SceneEvaluator].
    pub fn global_transform(&mut self, node: NodeId, time: PoseTime) -> AffineMatrix {
        self.evaluator.global_transform(&self.graph, node, time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_are_readable() {
        let err = SceneError::NoFileLoader(String::from("obj"));
        assert_eq!(err.to_string(), "no file loader available for obj");
        let err = SceneError::Parse {
            path: PathBuf::from("a.fbx"),
            message: String::from("unexpected end of data"),
        };
        assert_eq!(err.to_string(), "could not parse a.fbx: unexpected end of data");
    }

    #[test]
    fn axis_conversion_resets_evaluator() {
        let mut scene = Scene::new("test");
        let node = scene
            .graph
            .add_child(
                scene.graph.root(),
                Node::new("node").with_trs(DVec3::Y, DVec3::ZERO, DVec3::ONE),
            )
            .unwrap();
        assert_eq!(scene.global_transform(node, PoseTime::Infinite).translation(), DVec3::Y);

        let target = AxisSystem::target(Handedness::RightHanded, Axis::X, Axis::Z);
        scene.convert_axis_system(&target).unwrap();
        assert_eq!(scene.evaluator.cached_len(), 0);
        assert_eq!(scene.axis_system, target);

        let converted = scene.global_transform(node, PoseTime::Infinite).translation();
        assert!(converted.abs_diff_eq(DVec3::Z, 1e-9));
    }
}
