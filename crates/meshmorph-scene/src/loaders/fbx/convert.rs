use super::document::{object_name, FbxDocument, FbxNode, FbxProperty};
use crate::{
    animation::{ticks_to_seconds, AnimationCurve, ChannelCurves},
    axis::{Axis, AxisSystem, SignedAxis},
    graph::{InheritType, Node, NodeAttribute, NodeGraph, NodeId, QuaternionInterpolation},
    objects::{MeshId, SceneMesh},
    skin::{Cluster, LinkMode, Skin},
    Scene,
};
use meshmorph_math::*;
use meshmorph_utils::log::{debug, trace, warn};
use std::collections::HashMap;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Channel {
    Translation,
    Rotation,
    Scaling,
}

impl Channel {
    fn from_property(name: &str) -> Option<Self> {
        match name {
            "Lcl Translation" => Some(Channel::Translation),
            "Lcl Rotation" => Some(Channel::Rotation),
            "Lcl Scaling" => Some(Channel::Scaling),
            _ => None,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum AttributeKind {
    LodGroup,
    Null,
    Skeleton,
    Other,
}

/// A parsed `Connections/C` record.
#[derive(Debug, Clone)]
struct Connection {
    child: i64,
    parent: i64,
    property: Option<String>,
}

/// Objects of the document indexed by their FBX id.
#[derive(Default)]
struct Objects {
    models: HashMap<i64, NodeId>,
    geometries: HashMap<i64, MeshId>,
    attributes: HashMap<i64, AttributeKind>,
    skins: HashMap<i64, Skin>,
    clusters: HashMap<i64, Cluster>,
    curve_nodes: HashMap<i64, [Option<AnimationCurve>; 3]>,
    curves: HashMap<i64, AnimationCurve>,
}

/// `Definitions/ObjectType/PropertyTemplate` records holding the defaults of
/// each object type.
struct Templates<'a> {
    model: Option<&'a FbxNode>,
}

fn property_template<'a>(document: &'a FbxDocument, object_type: &str) -> Option<&'a FbxNode> {
    document
        .node("Definitions")?
        .children_named("ObjectType")
        .find(|t| t.property(0).and_then(|p| p.as_str()) == Some(object_type))?
        .child("PropertyTemplate")
}

/// Builds a [Scene] from a parsed FBX document.
pub fn build_scene(document: &FbxDocument, name: &str) -> Scene {
    let mut scene = Scene::new(name);
    scene.axis_system = read_axis_system(document);

    let templates = Templates {
        model: property_template(document, "Model"),
    };
    let mut objects = Objects::default();
    if let Some(node) = document.node("Objects") {
        for object in node.children.iter() {
            read_object(object, &templates, &mut scene, &mut objects);
        }
    }

    let connections = document
        .node("Connections")
        .map(read_connections)
        .unwrap_or_default();
    link_objects(&mut scene, &mut objects, &connections);

    debug!(
        "fbx document v{} produced {} nodes and {} meshes",
        document.version,
        scene.graph.len(),
        scene.meshes.len()
    );
    scene
}

fn object_id(object: &FbxNode) -> Option<i64> {
    object.property(0).and_then(|p| p.as_i64())
}

fn object_class(object: &FbxNode) -> &str {
    object.property(2).and_then(|p| p.as_str()).unwrap_or("")
}

fn object_display_name(object: &FbxNode) -> String {
    object
        .property(1)
        .and_then(|p| p.as_str())
        .map(|s| object_name(s).to_string())
        .unwrap_or_default()
}

fn read_object(object: &FbxNode, templates: &Templates, scene: &mut Scene, objects: &mut Objects) {
    let id = match object_id(object) {
        Some(id) => id,
        None => {
            trace!("skipping \"{}\" object without id", object.name);
            return;
        }
    };

    match (object.name.as_str(), object_class(object)) {
        ("Model", class) => {
            let node = read_model(object, templates.model, id, class);
            let node_id = scene.graph.add_node(node);
            objects.models.insert(id, node_id);
        }
        ("Geometry", "Mesh") => {
            let mesh = read_geometry(object, id);
            let mesh_id = scene.add_mesh(mesh);
            objects.geometries.insert(id, mesh_id);
        }
        ("NodeAttribute", class) => {
            let kind = match class {
                "LodGroup" => AttributeKind::LodGroup,
                "Null" => AttributeKind::Null,
                "LimbNode" | "Root" | "Limb" => AttributeKind::Skeleton,
                _ => AttributeKind::Other,
            };
            objects.attributes.insert(id, kind);
        }
        ("Deformer", "Skin") => {
            let skin = Skin {
                name: object_display_name(object),
                clusters: Vec::new(),
            };
            objects.skins.insert(id, skin);
        }
        ("Deformer", "Cluster") => {
            objects.clusters.insert(id, read_cluster(object));
        }
        ("AnimationCurveNode", _) => {
            objects.curve_nodes.insert(id, Default::default());
        }
        ("AnimationCurve", _) => {
            if let Some(curve) = read_curve(object) {
                objects.curves.insert(id, curve);
            }
        }
        (name, class) => trace!("ignoring fbx object {} ({})", name, class),
    }
}

/// Values of a `Properties70/P` record, which start after name, type, label
/// and flags.
fn p_values(p: &FbxNode) -> &[FbxProperty] {
    p.properties.get(4..).unwrap_or(&[])
}

fn p_vec3(p: &FbxNode) -> Option<DVec3> {
    let values = p_values(p);
    if values.len() < 3 {
        return None;
    }
    Some(DVec3::new(
        values[0].as_f64()?,
        values[1].as_f64()?,
        values[2].as_f64()?,
    ))
}

fn p_int(p: &FbxNode) -> Option<i64> {
    p_values(p).first().and_then(|v| v.as_i64())
}

fn p_name(p: &FbxNode) -> &str {
    p.property(0).and_then(|v| v.as_str()).unwrap_or("")
}

fn properties70(object: &FbxNode) -> impl Iterator<Item = &FbxNode> {
    object
        .child("Properties70")
        .into_iter()
        .flat_map(|props| props.children_named("P"))
}

fn read_model(object: &FbxNode, template: Option<&FbxNode>, id: i64, class: &str) -> Node {
    let mut node = Node::new(object_display_name(object)).with_unique_id(id as u64);
    node.attribute = match class {
        "Null" => NodeAttribute::Null,
        "LimbNode" | "Root" | "Limb" => NodeAttribute::Skeleton,
        "LodGroup" => NodeAttribute::LodGroup,
        _ => NodeAttribute::None,
    };

    // Template values come first so the model's own values override them.
    let properties = template
        .into_iter()
        .flat_map(properties70)
        .chain(properties70(object));

    let mut rotation_active = true;
    for p in properties {
        let pivots = &mut node.source_pivots;
        match p_name(p) {
            "Lcl Translation" => node.translation = p_vec3(p).unwrap_or(node.translation),
            "Lcl Rotation" => node.rotation = p_vec3(p).unwrap_or(node.rotation),
            "Lcl Scaling" => node.scaling = p_vec3(p).unwrap_or(node.scaling),
            "PreRotation" => pivots.pre_rotation = p_vec3(p).unwrap_or(DVec3::ZERO),
            "PostRotation" => pivots.post_rotation = p_vec3(p).unwrap_or(DVec3::ZERO),
            "RotationOffset" => pivots.rotation_offset = p_vec3(p).unwrap_or(DVec3::ZERO),
            "RotationPivot" => pivots.rotation_pivot = p_vec3(p).unwrap_or(DVec3::ZERO),
            "ScalingOffset" => pivots.scaling_offset = p_vec3(p).unwrap_or(DVec3::ZERO),
            "ScalingPivot" => pivots.scaling_pivot = p_vec3(p).unwrap_or(DVec3::ZERO),
            "GeometricTranslation" => {
                pivots.geometric_translation = p_vec3(p).unwrap_or(DVec3::ZERO)
            }
            "GeometricRotation" => pivots.geometric_rotation = p_vec3(p).unwrap_or(DVec3::ZERO),
            "GeometricScaling" => pivots.geometric_scaling = p_vec3(p).unwrap_or(DVec3::ONE),
            "RotationOrder" => {
                if let Some(order) = p_int(p).and_then(EulerOrder::from_index) {
                    pivots.rotation_order = order;
                }
            }
            "RotationActive" => rotation_active = p_int(p).map_or(true, |v| v != 0),
            "InheritType" => {
                if let Some(inherit) = p_int(p).and_then(InheritType::from_index) {
                    node.inherit_type = inherit;
                }
            }
            "QuaternionInterpolate" => {
                if let Some(mode) = p_int(p).and_then(QuaternionInterpolation::from_index) {
                    pivots.quaternion_interpolation = mode;
                }
            }
            _ => {}
        }
    }

    // Rotation order and pre/post rotation only apply while rotation is active.
    if !rotation_active {
        let pivots = &mut node.source_pivots;
        pivots.pre_rotation = DVec3::ZERO;
        pivots.post_rotation = DVec3::ZERO;
        pivots.rotation_order = EulerOrder::XYZ;
    }

    node
}

fn read_geometry(object: &FbxNode, id: i64) -> SceneMesh {
    let name = object_display_name(object);
    let vertices = object
        .child_value("Vertices")
        .and_then(|v| v.to_f64_array())
        .unwrap_or_default();
    let indices = object
        .child_value("PolygonVertexIndex")
        .and_then(|v| v.to_i32_array())
        .unwrap_or_default();

    let control_points = vertices
        .chunks_exact(3)
        .map(|c| DVec3::new(c[0], c[1], c[2]))
        .collect();
    let polygons = SceneMesh::polygons_from_fbx_indices(&indices);

    let mut mesh = SceneMesh::new(name, control_points, polygons);
    mesh.unique_id = id as u64;
    mesh
}

fn read_matrix(object: &FbxNode, name: &str) -> Option<AffineMatrix> {
    let values = object.child_value(name)?.to_f64_array()?;
    if values.len() != 16 {
        warn!("matrix \"{}\" has {} values, expected 16", name, values.len());
        return None;
    }

    let mut cols = [0.0; 16];
    cols.copy_from_slice(&values);
    Some(AffineMatrix::from_cols_array(&cols))
}

fn read_cluster(object: &FbxNode) -> Cluster {
    let link_mode = object
        .child_value("Mode")
        .and_then(|m| m.as_str())
        .and_then(LinkMode::from_name)
        .unwrap_or_default();

    Cluster {
        name: object_display_name(object),
        link: None,
        link_mode,
        indices: object
            .child_value("Indexes")
            .and_then(|v| v.to_i32_array())
            .unwrap_or_default(),
        weights: object
            .child_value("Weights")
            .and_then(|v| v.to_f64_array())
            .unwrap_or_default(),
        transform: read_matrix(object, "Transform").unwrap_or_default(),
        transform_link: read_matrix(object, "TransformLink").unwrap_or_default(),
        associate_model: None,
        transform_associate_model: read_matrix(object, "TransformAssociateModel")
            .unwrap_or_default(),
    }
}

fn read_curve(object: &FbxNode) -> Option<AnimationCurve> {
    let times = object
        .child_value("KeyTime")
        .and_then(|v| v.to_i64_array())
        .unwrap_or_default();
    let values = object
        .child_value("KeyValueFloat")
        .and_then(|v| v.to_f64_array())
        .unwrap_or_default();

    if times.is_empty() || values.is_empty() {
        // A curve without keys holds its default value.
        let default = object.child_value("Default").and_then(|v| v.as_f64())?;
        return Some(AnimationCurve::new(vec![0.0], vec![default]));
    }

    let times = times.into_iter().map(ticks_to_seconds).collect();
    Some(AnimationCurve::new(times, values))
}

fn read_connections(node: &FbxNode) -> Vec<Connection> {
    node.children_named("C")
        .filter_map(|c| {
            let kind = c.property(0)?.as_str()?;
            if kind != "OO" && kind != "OP" {
                return None;
            }
            Some(Connection {
                child: c.property(1)?.as_i64()?,
                parent: c.property(2)?.as_i64()?,
                property: c.property(3).and_then(|p| p.as_str()).map(String::from),
            })
        })
        .collect()
}

fn attach(graph: &mut NodeGraph, parent: NodeId, child: NodeId) {
    if let Err(e) = graph.attach(parent, child) {
        warn!("could not attach \"{}\": {}", graph[child].name, e);
    }
}

fn link_objects(scene: &mut Scene, objects: &mut Objects, connections: &[Connection]) {
    let root = scene.graph.root();

    // Hierarchy and node attributes.
    for c in connections.iter() {
        if let Some(&child) = objects.models.get(&c.child) {
            if c.parent == 0 {
                attach(&mut scene.graph, root, child);
            } else if let Some(&parent) = objects.models.get(&c.parent) {
                attach(&mut scene.graph, parent, child);
            }
            continue;
        }

        let model = match objects.models.get(&c.parent) {
            Some(model) => *model,
            None => continue,
        };
        if let Some(&mesh) = objects.geometries.get(&c.child) {
            scene.graph[model].attribute = NodeAttribute::Mesh(mesh);
        } else if let Some(kind) = objects.attributes.get(&c.child) {
            let node = &mut scene.graph[model];
            if node.mesh().is_none() {
                match kind {
                    AttributeKind::LodGroup => node.attribute = NodeAttribute::LodGroup,
                    AttributeKind::Null => node.attribute = NodeAttribute::Null,
                    AttributeKind::Skeleton => node.attribute = NodeAttribute::Skeleton,
                    AttributeKind::Other => {}
                }
            }
        }
    }

    // Models without a parent connection hang below the root.
    let mut orphans: Vec<NodeId> = objects
        .models
        .values()
        .copied()
        .filter(|id| scene.graph[*id].parent.is_none())
        .collect();
    orphans.sort();
    for id in orphans {
        attach(&mut scene.graph, root, id);
    }

    // Animation: curves into curve nodes, curve nodes onto model channels.
    for c in connections.iter() {
        let component = match c.property.as_deref() {
            Some("d|X") => 0,
            Some("d|Y") => 1,
            Some("d|Z") => 2,
            _ => continue,
        };
        let curve = objects.curves.get(&c.child);
        if let (Some(curve), Some(curve_node)) = (curve, objects.curve_nodes.get_mut(&c.parent)) {
            curve_node[component] = Some(curve.clone());
        }
    }
    for c in connections.iter() {
        let channel = match c.property.as_deref().and_then(Channel::from_property) {
            Some(channel) => channel,
            None => continue,
        };
        let curves = objects.curve_nodes.get(&c.child);
        let (curves, model) = match (curves, objects.models.get(&c.parent)) {
            (Some(curves), Some(model)) => (curves, *model),
            _ => continue,
        };

        let animation = &mut scene.graph[model].animation;
        let target: &mut ChannelCurves = match channel {
            Channel::Translation => &mut animation.translation,
            Channel::Rotation => &mut animation.rotation,
            Channel::Scaling => &mut animation.scaling,
        };
        if target.is_empty() {
            target.curves = curves.clone();
        }
    }

    // Skin clusters: link and associate models first, then clusters into skins
    // and skins onto geometry.
    for c in connections.iter() {
        let model = objects.models.get(&c.child);
        let (cluster, model) = match (objects.clusters.get_mut(&c.parent), model) {
            (Some(cluster), Some(model)) => (cluster, *model),
            _ => continue,
        };
        match c.property.as_deref() {
            Some("AssociateModel") => cluster.associate_model = Some(model),
            _ => cluster.link = Some(model),
        }
    }
    for c in connections.iter() {
        if let Some(cluster) = objects.clusters.get(&c.child) {
            if let Some(skin) = objects.skins.get_mut(&c.parent) {
                skin.clusters.push(cluster.clone());
            }
        }
    }
    for c in connections.iter() {
        let skin = objects.skins.get(&c.child);
        if let (Some(skin), Some(&mesh)) = (skin, objects.geometries.get(&c.parent)) {
            if let Some(mesh) = scene.meshes.get_mut(mesh.0) {
                mesh.skins.push(skin.clone());
            }
        }
    }
}

fn axis_setting(
    settings: &HashMap<&str, i64>,
    axis: &str,
    sign: &str,
    default: Axis,
) -> SignedAxis {
    let axis = settings
        .get(axis)
        .and_then(|v| Axis::from_index(*v))
        .unwrap_or(default);
    let positive = settings.get(sign).map_or(true, |s| *s >= 0);
    SignedAxis { axis, positive }
}

/// Axis system from `GlobalSettings`, defaulting to Y up, Z front and X as
/// coordinate axis.
pub fn read_axis_system(document: &FbxDocument) -> AxisSystem {
    let settings: HashMap<&str, i64> = document
        .node("GlobalSettings")
        .into_iter()
        .flat_map(properties70)
        .filter_map(|p| Some((p_name(p), p_int(p)?)))
        .collect();

    let up = axis_setting(&settings, "UpAxis", "UpAxisSign", Axis::Y);
    let front = axis_setting(&settings, "FrontAxis", "FrontAxisSign", Axis::Z);
    let coord = axis_setting(&settings, "CoordAxis", "CoordAxisSign", Axis::X);
    AxisSystem::from_global_settings(up, front, coord)
}
