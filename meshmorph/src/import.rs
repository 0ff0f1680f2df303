use crate::settings::ImportSettings;
use meshmorph_math::*;
use meshmorph_scene::{
    bake_pivots, collect_mesh_nodes, flatten_mesh_nodes, resolve_global_transforms,
    resolve_lod_root, CollisionModels, FlattenOptions, FlattenedMesh, NodeId, PoseTime, Scene,
    SceneError, SceneLoaders, TransformSource, PIVOT_BAKE_FRAME_RATE,
};
use meshmorph_utils::{
    log::{debug, error, info, warn},
    Timer,
};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error(transparent)]
    Scene(#[from] SceneError),
}

/// Shared state of sequential imports. Owns the file loaders.
#[derive(Debug, Default)]
pub struct ImportContext {
    loaders: SceneLoaders,
}

impl ImportContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_loaders(loaders: SceneLoaders) -> Self {
        Self { loaders }
    }

    pub fn loaders(&self) -> &SceneLoaders {
        &self.loaders
    }

    pub fn loaders_mut(&mut self) -> &mut SceneLoaders {
        &mut self.loaders
    }

    pub fn load<S: AsRef<Path>>(&self, path: S, name: &str) -> Result<Scene, SceneError> {
        self.loaders.load(path, name)
    }
}

/// Result of importing one scene file: the flattened mesh plus the scene
/// data it was derived from.
#[derive(Debug, Clone)]
pub struct FbxImport {
    id: u64,
    settings: ImportSettings,
    scene: Option<Scene>,
    root: Option<NodeId>,
    mesh: FlattenedMesh,
    mesh_nodes: Vec<NodeId>,
    collision_models: CollisionModels,
    global_transforms: HashMap<NodeId, AffineMatrix>,
    axis_conversion: AffineMatrix,
}

impl FbxImport {
    /// Imports `path`. Errors are logged and leave the import empty.
    pub fn new<S: AsRef<Path>>(context: &ImportContext, path: S, settings: ImportSettings) -> Self {
        let path = path.as_ref();
        let id = session_id(&settings);
        match Self::load_and_flatten(context, path, id, settings) {
            Ok(import) => import,
            Err(e) => {
                error!("could not import {}: {}", path.display(), e);
                Self::empty(id, settings)
            }
        }
    }

    pub fn try_new<S: AsRef<Path>>(
        context: &ImportContext,
        path: S,
        settings: ImportSettings,
    ) -> Result<Self, ImportError> {
        Self::load_and_flatten(context, path.as_ref(), session_id(&settings), settings)
    }

    fn load_and_flatten(
        context: &ImportContext,
        path: &Path,
        id: u64,
        settings: ImportSettings,
    ) -> Result<Self, ImportError> {
        let name = format!("meshmorph-scene-{}", id);

        let timer = Timer::new();
        let scene = context.load(path, &name)?;
        debug!("loaded {} in {:.2} ms", path.display(), timer.elapsed_in_millis());

        let import = Self::flatten(scene, id, settings);
        info!(
            "imported {}: {} vertices, {} triangles in {} groups",
            path.display(),
            import.mesh.vertex_count(),
            import.mesh.triangle_count(),
            import.mesh.group_count()
        );
        Ok(import)
    }

    fn empty(id: u64, settings: ImportSettings) -> Self {
        Self {
            id,
            settings,
            scene: None,
            root: None,
            mesh: FlattenedMesh::new(),
            mesh_nodes: Vec::new(),
            collision_models: CollisionModels::new(),
            global_transforms: HashMap::new(),
            axis_conversion: AffineMatrix::IDENTITY,
        }
    }

    /// Runs the flattening pipeline on an already loaded scene.
    pub fn from_scene(scene: Scene, settings: ImportSettings) -> Self {
        Self::flatten(scene, session_id(&settings), settings)
    }

    fn flatten(mut scene: Scene, id: u64, settings: ImportSettings) -> Self {
        let mut import = Self::empty(id, settings);
        let mut timer = Timer::new();

        if settings.convert_scene {
            let target = settings.axis_system();
            match scene.convert_axis_system(&target) {
                Ok(conversion) => import.axis_conversion = conversion,
                Err(e) => warn!("{}, keeping the scene's native axes", e),
            }
        }

        let collisions = &mut import.collision_models;
        let root = match resolve_lod_root(&scene.graph, &scene.meshes, collisions) {
            Some(root) => root,
            None => scene.graph.root(),
        };

        import.mesh_nodes = collect_mesh_nodes(&mut scene.graph, &scene.meshes, root, collisions);
        let baked = bake_pivots(&mut scene.graph, root, PIVOT_BAKE_FRAME_RATE);
        scene.evaluator.reset();
        import.global_transforms = resolve_global_transforms(
            &scene.graph,
            &scene.meshes,
            root,
            &AffineMatrix::IDENTITY,
            PoseTime::Infinite,
        );
        debug!(
            "prepared \"{}\" from root \"{}\": {} mesh nodes, {} baked pivots, {:.2} ms",
            scene.name,
            scene.graph[root].name,
            import.mesh_nodes.len(),
            baked,
            timer.lap()
        );

        let options = FlattenOptions {
            transform_source: if settings.convert_scene {
                TransformSource::Evaluator
            } else {
                TransformSource::GlobalTransformMap
            },
            pose_time: settings.pose_time(),
        };
        import.mesh = flatten_mesh_nodes(
            &mut scene,
            &import.mesh_nodes,
            &import.global_transforms,
            &options,
        );
        debug!("flattened \"{}\" in {:.2} ms", scene.name, timer.lap());

        import.root = Some(root);
        import.scene = Some(scene);
        import
    }

    /// Session id of this import, also part of the scene name. Taken from
    /// the settings when given, random otherwise.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn settings(&self) -> &ImportSettings {
        &self.settings
    }

    /// The loaded scene, `None` when loading failed.
    pub fn scene(&self) -> Option<&Scene> {
        self.scene.as_ref()
    }

    /// Node the import treated as scene root.
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn mesh(&self) -> &FlattenedMesh {
        &self.mesh
    }

    pub fn into_mesh(self) -> FlattenedMesh {
        self.mesh
    }

    /// Mesh nodes in flattening order; a node's index is its triangle group.
    pub fn mesh_nodes(&self) -> &[NodeId] {
        &self.mesh_nodes
    }

    pub fn collision_models(&self) -> &CollisionModels {
        &self.collision_models
    }

    pub fn global_transforms(&self) -> &HashMap<NodeId, AffineMatrix> {
        &self.global_transforms
    }

    /// Matrix that converted the scene to the requested axes, identity when
    /// nothing was converted.
    pub fn axis_conversion(&self) -> &AffineMatrix {
        &self.axis_conversion
    }
}

fn session_id(settings: &ImportSettings) -> u64 {
    settings.import_id.unwrap_or_else(rand::random)
}
