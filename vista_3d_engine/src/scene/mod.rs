//! Scene graph module
//!
//! Node arena with inherited visibility/opacity, render attachments,
//! pickable volumes and ray picking.

mod aabb;
mod node;
mod pickable;
mod picker;
mod ray;
mod render_data;
mod scene;
mod scene_manager;
mod transform;

pub use aabb::AABB;
pub use node::{NodeDesc, NodeKey, SceneNode};
pub use pickable::{PickTarget, PickableVolume};
pub use picker::{PickHit, Picker};
pub use ray::Ray;
pub use render_data::{Material, RenderData, ShaderId};
pub use scene::{Children, Scene};
pub use scene_manager::SceneManager;
pub use transform::Transform;
