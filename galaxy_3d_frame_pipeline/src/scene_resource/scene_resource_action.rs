/// Create/update/destroy actions on scene resource objects and their
/// consolidation.

use crate::handles::SceneResourceHandle;

/// Kind of scene-owned object an action targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SceneResourceKind {
    RenderBuffer,
    RenderTarget,
    DataBuffer,
    TextureBuffer,
    UniformBuffer,
    VertexArray,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SceneResourceOperation {
    Create,
    Update,
    Destroy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SceneResourceAction {
    pub handle: SceneResourceHandle,
    pub kind: SceneResourceKind,
    pub operation: SceneResourceOperation,
}

impl SceneResourceAction {
    /// Create action
    pub fn create(kind: SceneResourceKind, handle: SceneResourceHandle) -> Self {
        Self { handle, kind, operation: SceneResourceOperation::Create }
    }

    /// Update action
    pub fn update(kind: SceneResourceKind, handle: SceneResourceHandle) -> Self {
        Self { handle, kind, operation: SceneResourceOperation::Update }
    }

    /// Destroy action
    pub fn destroy(kind: SceneResourceKind, handle: SceneResourceHandle) -> Self {
        Self { handle, kind, operation: SceneResourceOperation::Destroy }
    }

    /// Same object (kind and handle)
    pub fn targets_same_object(&self, other: &SceneResourceAction) -> bool {
        self.kind == other.kind && self.handle == other.handle
    }
}

/// Merge `new_actions` into `pending`, dropping redundant work
///
/// - a create is appended
/// - an update is appended unless an update of the same object is pending
/// - a destroy first drops pending updates of the object; it then cancels
///   the most recent pending create of the object, or is appended if there
///   is none
///
/// Surviving actions keep their relative order.
pub fn consolidate_scene_resource_actions(
    new_actions: &[SceneResourceAction],
    pending: &mut Vec<SceneResourceAction>,
) {
    for action in new_actions {
        match action.operation {
            SceneResourceOperation::Create => pending.push(*action),
            SceneResourceOperation::Update => {
                let already_pending = pending.iter().any(|p| {
                    p.operation == SceneResourceOperation::Update && p.targets_same_object(action)
                });
                if !already_pending {
                    pending.push(*action);
                }
            }
            SceneResourceOperation::Destroy => {
                pending.retain(|p| {
                    !(p.operation == SceneResourceOperation::Update && p.targets_same_object(action))
                });
                let pending_create = pending.iter().rposition(|p| {
                    p.operation == SceneResourceOperation::Create && p.targets_same_object(action)
                });
                match pending_create {
                    Some(index) => {
                        pending.remove(index);
                    }
                    None => pending.push(*action),
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "scene_resource_action_tests.rs"]
mod tests;
