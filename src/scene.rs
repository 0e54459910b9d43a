use crate::bsdf::{Diffuse, Emissive, Glass, Mirror, BSDF};
use crate::bvh::BVH;
use crate::camera::Camera;
use crate::color::RGB;
use crate::integrator::PathTracerConfig;
use crate::light::{DiffuseAreaLight, DirectionalLight, Light, PointLight};
use crate::matrix::Matrix4;
use crate::point::Point3;
use crate::primitive::{AnyPrimitive, Sphere, Triangle, TriangleMesh};
use crate::vector::Vector3;

use serde::Deserialize;
use std::{collections::HashMap, path, sync::Arc};
use thiserror::Error;
use wavefront_obj::obj;

pub struct Scene {
    pub logistics: Logistics,
    pub camera: Camera,
    pub bvh: BVH,
    pub lights: Vec<Light>,
}

#[derive(Deserialize)]
pub struct Logistics {
    pub resolution_x: u32,
    pub resolution_y: u32,
    #[serde(flatten)]
    pub path_tracer: PathTracerConfig,
}

#[derive(Error, Debug)]
pub enum SceneError {
    #[error("malformed scene JSON: {0}")]
    MalformedJson(#[from] serde_json::Error),
    #[error("required key '{0}' is missing from the scene spec")]
    MissingKey(String),
    #[error("unknown BSDF type '{0}'")]
    UnknownBSDF(String),
    #[error("unknown Light type '{0}'")]
    UnknownLight(String),
    #[error("unknown Shape type '{0}'")]
    UnknownShape(String),
    #[error("unknown Aggregate type '{0}'")]
    UnknownAggregate(String),
    #[error("Shape '{0}' references undefined BSDF '{1}'")]
    UndefinedBSDFReference(String, String),
    #[error("triangle vertex index {0} is out of range for mesh with {1} vertices")]
    TriangleIndexOutOfRange(usize, usize),
    #[error("invalid Logistics: {0}")]
    InvalidLogistics(String),
    #[error("failed to read scene resource: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse OBJ mesh: {0}")]
    ObjParse(#[from] wavefront_obj::ParseError),
    #[error("{0}")]
    Other(String),
}

pub fn deserialize(data: &str, spec_dir: &path::Path) -> Result<Scene, SceneError> {
    let top_level: serde_json::Value = serde_json::from_str(data)?;
    if !top_level.is_object() {
        return Err(SceneError::Other(String::from(
            "top level scene spec is not a JSON object",
        )));
    }

    let logistics_value = get_required_key(&top_level, "Logistics")?;
    let logistics: Logistics = serde_json::from_value(serde_json::Value::clone(logistics_value))?;
    validate_logistics(&logistics)?;

    let camera_value = get_required_key(&top_level, "Camera")?;
    let camera: Camera = serde_json::from_value(serde_json::Value::clone(camera_value))?;

    let bsdfs_value = get_required_key(&top_level, "BSDFs")?;
    if !bsdfs_value.is_object() {
        return Err(SceneError::Other(String::from(
            "'BSDFs' is not a JSON object",
        )));
    }
    let bsdf_descriptions: HashMap<String, BSDFDescription> =
        serde_json::from_value(serde_json::Value::clone(bsdfs_value))?;
    let mut bsdfs: HashMap<String, Arc<BSDF>> = HashMap::with_capacity(bsdf_descriptions.len());
    for (name, desc) in bsdf_descriptions {
        bsdfs.insert(name, Arc::new(desc.into_bsdf()?));
    }

    let lights_value = get_required_key(&top_level, "Lights")?;
    let light_descriptions: Vec<LightDescription> =
        serde_json::from_value(serde_json::Value::clone(lights_value))?;
    let lights: Vec<Light> = light_descriptions
        .into_iter()
        .map(|d| d.into_light())
        .collect();

    let shapes_value = get_required_key(&top_level, "Shapes")?;
    let shapes_json_vec = match shapes_value.as_array() {
        Some(s) => s,
        None => return Err(SceneError::Other(String::from("'Shapes' is not a JSON array"))),
    };
    let mut primitives: Vec<AnyPrimitive> = Vec::with_capacity(shapes_json_vec.len());
    for shape in shapes_json_vec {
        deserialize_shape(shape, spec_dir, &bsdfs, &mut primitives)?;
    }

    let aggregate_type = match get_required_key(&top_level, "Aggregate")?.as_str() {
        Some(t) => t,
        None => return Err(SceneError::Other(String::from("'Aggregate' is not a string"))),
    };
    if aggregate_type != "BVH" {
        return Err(SceneError::UnknownAggregate(String::from(aggregate_type)));
    }
    let bvh = BVH::new(primitives, logistics.path_tracer.max_leaf_size);

    Ok(Scene {
        logistics: logistics,
        camera: camera,
        bvh: bvh,
        lights: lights,
    })
}

fn validate_logistics(logistics: &Logistics) -> Result<(), SceneError> {
    if logistics.resolution_x == 0 || logistics.resolution_y == 0 {
        return Err(SceneError::InvalidLogistics(String::from(
            "resolution_x and resolution_y must both be greater than zero",
        )));
    }
    if logistics.path_tracer.ns_aa == 0 {
        return Err(SceneError::InvalidLogistics(String::from(
            "ns_aa must be greater than zero",
        )));
    }
    Ok(())
}

fn get_required_key<'a>(
    dict: &'a serde_json::Value,
    key: &str,
) -> Result<&'a serde_json::Value, SceneError> {
    dict.get(key)
        .ok_or_else(|| SceneError::MissingKey(String::from(key)))
}

// BSDFs
#[derive(Deserialize)]
#[serde(tag = "type")]
enum BSDFDescription {
    Diffuse { albedo: RGB },
    Mirror { reflectance: RGB },
    Glass {
        transmittance: RGB,
        reflectance: RGB,
        refractive_index: f64,
    },
    Emissive { radiance: RGB },
}

impl BSDFDescription {
    fn into_bsdf(self) -> Result<BSDF, SceneError> {
        Ok(match self {
            BSDFDescription::Diffuse { albedo } => BSDF::Diffuse(Diffuse { albedo }),
            BSDFDescription::Mirror { reflectance } => BSDF::Mirror(Mirror { reflectance }),
            BSDFDescription::Glass {
                transmittance,
                reflectance,
                refractive_index,
            } => BSDF::Glass(Glass {
                transmittance,
                reflectance,
                refractive_index,
            }),
            BSDFDescription::Emissive { radiance } => BSDF::Emissive(Emissive { radiance }),
        })
    }
}

// Lights
#[derive(Deserialize)]
#[serde(tag = "type")]
enum LightDescription {
    Point {
        position: Point3,
        intensity: RGB,
    },
    Directional {
        direction: Vector3,
        radiance: RGB,
    },
    DiffuseArea {
        position: Point3,
        radius: f64,
        radiance: RGB,
    },
}

impl LightDescription {
    fn into_light(self) -> Light {
        match self {
            LightDescription::Point {
                position,
                intensity,
            } => Light::Point(PointLight {
                position,
                intensity,
            }),
            LightDescription::Directional {
                direction,
                radiance,
            } => Light::Directional(DirectionalLight {
                direction: direction.normalized(),
                radiance,
            }),
            LightDescription::DiffuseArea {
                position,
                radius,
                radiance,
            } => Light::DiffuseArea(DiffuseAreaLight {
                position,
                radius,
                radiance,
            }),
        }
    }
}

// Shapes
#[derive(Deserialize)]
struct TransformDescription {
    #[serde(default = "Vector3::new_empty")]
    translate: Vector3,
    #[serde(default = "Vector3::new_empty")]
    rotate_degrees: Vector3,
    #[serde(default = "Vector3::new_identity")]
    scale: Vector3,
}

impl TransformDescription {
    fn to_matrix(&self) -> Matrix4 {
        let deg_to_rad = std::f64::consts::PI / 180.0_f64;
        Matrix4::new_translation(&self.translate)
            * Matrix4::new_rotation_z(self.rotate_degrees.z() * deg_to_rad)
            * Matrix4::new_rotation_y(self.rotate_degrees.y() * deg_to_rad)
            * Matrix4::new_rotation_x(self.rotate_degrees.x() * deg_to_rad)
            * Matrix4::new_scale(&self.scale)
    }
}

fn deserialize_shape(
    json: &serde_json::Value,
    spec_dir: &path::Path,
    bsdfs: &HashMap<String, Arc<BSDF>>,
    primitives: &mut Vec<AnyPrimitive>,
) -> Result<(), SceneError> {
    if !json.is_object() {
        return Err(SceneError::Other(String::from(
            "expected a JSON object in the Shapes array",
        )));
    }

    let shape_type = match get_required_key(json, "type")?.as_str() {
        Some(t) => t,
        None => return Err(SceneError::Other(String::from("Shape 'type' must be a string"))),
    };

    match shape_type {
        "Sphere" => deserialize_sphere(json, bsdfs, primitives),
        "Mesh" => deserialize_mesh(json, spec_dir, bsdfs, primitives),
        _ => Err(SceneError::UnknownShape(String::from(shape_type))),
    }
}

#[derive(Deserialize)]
struct SphereDescription {
    center: Point3,
    radius: f64,
    bsdf: String,
}

fn deserialize_sphere(
    json: &serde_json::Value,
    bsdfs: &HashMap<String, Arc<BSDF>>,
    primitives: &mut Vec<AnyPrimitive>,
) -> Result<(), SceneError> {
    let desc: SphereDescription = serde_json::from_value(serde_json::Value::clone(json))?;
    let bsdf = bsdfs
        .get(&desc.bsdf)
        .ok_or_else(|| SceneError::UndefinedBSDFReference(String::from("Sphere"), desc.bsdf.clone()))?;
    primitives.push(AnyPrimitive::Sphere(Sphere::new(
        desc.center,
        desc.radius,
        Arc::clone(bsdf),
    )));
    Ok(())
}

#[derive(Deserialize)]
struct MeshDescription {
    file_path: String,
    bsdf: String,
    #[serde(default)]
    transform: Option<TransformDescription>,
}

fn deserialize_mesh(
    json: &serde_json::Value,
    spec_dir: &path::Path,
    bsdfs: &HashMap<String, Arc<BSDF>>,
    primitives: &mut Vec<AnyPrimitive>,
) -> Result<(), SceneError> {
    let desc: MeshDescription = serde_json::from_value(serde_json::Value::clone(json))?;
    let bsdf = bsdfs
        .get(&desc.bsdf)
        .ok_or_else(|| SceneError::UndefinedBSDFReference(String::from("Mesh"), desc.bsdf.clone()))?;

    let transform = desc
        .transform
        .as_ref()
        .map(|t| t.to_matrix())
        .unwrap_or_else(Matrix4::new_identity);

    let obj_string = std::fs::read_to_string(spec_dir.join(&desc.file_path))?;
    let obj_set = obj::parse(obj_string)?;

    for object in obj_set.objects {
        let mut converted_vertices = Vec::with_capacity(object.vertices.len());
        for vert in object.vertices {
            converted_vertices.push(&transform * Point3::from(vert));
        }

        let num_vertices = converted_vertices.len();
        let t_mesh = Arc::new(TriangleMesh::new(converted_vertices, Arc::clone(bsdf)));

        for geom in object.geometry {
            for obj_shape in geom.shapes {
                match obj_shape.primitive {
                    obj::Primitive::Triangle(v0, v1, v2) => {
                        let (v_index0, _, _) = v0;
                        let (v_index1, _, _) = v1;
                        let (v_index2, _, _) = v2;

                        for idx in [v_index0, v_index1, v_index2].iter() {
                            if *idx >= num_vertices {
                                return Err(SceneError::TriangleIndexOutOfRange(
                                    *idx,
                                    num_vertices,
                                ));
                            }
                        }

                        primitives.push(AnyPrimitive::Triangle(Triangle::new(
                            Arc::clone(&t_mesh),
                            v_index0,
                            v_index1,
                            v_index2,
                        )));
                    }
                    _ => {
                        return Err(SceneError::Other(format!(
                            "only triangles are allowed in meshes, but file {}, object {} had another primitive type",
                            desc.file_path, object.name
                        )));
                    }
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod scene_tests {
    use super::*;

    #[test]
    fn missing_required_key_is_reported() {
        let v: serde_json::Value = serde_json::json!({"Logistics": {}});
        let err = get_required_key(&v, "Camera").unwrap_err();
        assert!(matches!(err, SceneError::MissingKey(_)));
    }

    #[test]
    fn logistics_with_zero_ns_aa_is_invalid() {
        let logistics = Logistics {
            resolution_x: 10,
            resolution_y: 10,
            path_tracer: PathTracerConfig {
                ns_aa: 0,
                ns_area_light: 1,
                max_ray_depth: 5,
                samples_per_batch: 1,
                max_tolerance: 0.05,
                confidence: 1.96,
                direct_hemisphere_sample: false,
                max_leaf_size: 4,
            },
        };
        assert!(validate_logistics(&logistics).is_err());
    }

    #[test]
    fn bsdf_description_converts_to_the_matching_bsdf_variant() {
        let desc = BSDFDescription::Diffuse {
            albedo: RGB::new(0.8, 0.8, 0.8),
        };
        match desc.into_bsdf().unwrap() {
            BSDF::Diffuse(d) => assert_eq!(d.albedo.r(), 0.8),
            _ => panic!("expected a Diffuse BSDF"),
        }
    }

    #[test]
    fn light_description_normalizes_directional_direction() {
        let desc = LightDescription::Directional {
            direction: Vector3::new(0.0, 5.0, 0.0),
            radiance: RGB::new(1.0, 1.0, 1.0),
        };
        match desc.into_light() {
            Light::Directional(l) => assert!((l.direction.length() - 1.0).abs() < 1e-9),
            _ => panic!("expected a Directional light"),
        }
    }
}
