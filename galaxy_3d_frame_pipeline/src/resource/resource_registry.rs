/// Registry of content-addressed client resources shared between scenes.
///
/// Each descriptor records which scenes reference it (one entry per
/// reference, so a scene referencing a hash twice must unreference it twice).
/// A descriptor whose last reference goes away leaves the registry at once;
/// if it already owns a device object it is parked in the "not in use" list
/// until the next upload pass deletes that object. Re-referencing a parked
/// hash before then revives the uploaded descriptor.

use rustc_hash::FxHashMap;
use slotmap::Key;
use crate::graphics_device::DeviceResourceHandle;
use crate::handles::SceneId;
use crate::{engine_trace, engine_warn};
use super::content_hash::ResourceContentHash;
use super::resource_data::{ResourceData, ResourceKind};

/// Upload lifecycle of a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceStatus {
    /// Referenced by a scene, payload not received yet
    Registered,
    /// Payload received, waiting for upload
    DataProvided,
    /// Handed to the effect upload thread
    ScheduledForUpload,
    Uploaded,
    /// Device rejected it; never retried automatically
    UploadFailed,
}

#[derive(Debug, Clone)]
pub struct ResourceDescriptor {
    pub hash: ResourceContentHash,
    pub status: ResourceStatus,
    /// Known once the payload is provided
    pub kind: Option<ResourceKind>,
    /// Valid only while `Uploaded`
    pub device_handle: DeviceResourceHandle,
    pub byte_size: usize,
    /// Present between `DataProvided` and the end of the upload
    pub data: Option<ResourceData>,
    scene_usage: Vec<SceneId>,
}

impl ResourceDescriptor {
    fn new(hash: ResourceContentHash) -> Self {
        Self {
            hash,
            status: ResourceStatus::Registered,
            kind: None,
            device_handle: DeviceResourceHandle::null(),
            byte_size: 0,
            data: None,
            scene_usage: Vec::new(),
        }
    }

    /// Total number of references across all scenes
    pub fn reference_count(&self) -> usize {
        self.scene_usage.len()
    }

    /// True when `scene` holds a reference
    pub fn is_referenced_by(&self, scene: SceneId) -> bool {
        self.scene_usage.contains(&scene)
    }

    /// Distinct referencing scenes, in first-reference order
    pub fn referencing_scenes(&self) -> Vec<SceneId> {
        let mut scenes: Vec<SceneId> = Vec::with_capacity(self.scene_usage.len());
        for scene in &self.scene_usage {
            if !scenes.contains(scene) {
                scenes.push(*scene);
            }
        }
        scenes
    }
}

const SOURCE: &str = "galaxy3d::ResourceRegistry";

pub struct ResourceRegistry {
    resources: FxHashMap<ResourceContentHash, ResourceDescriptor>,
    /// Hashes in `DataProvided`, in the order the data arrived
    provided: Vec<ResourceContentHash>,
    /// Unreferenced descriptors whose device object still has to be deleted
    not_in_use: Vec<ResourceDescriptor>,
}

impl ResourceRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self {
            resources: FxHashMap::default(),
            provided: Vec::new(),
            not_in_use: Vec::new(),
        }
    }

    /// Add one reference from `scene` to each hash, registering unknown hashes
    pub fn reference_resources_for_scene(&mut self, scene: SceneId, hashes: &[ResourceContentHash]) {
        for hash in hashes {
            if !self.resources.contains_key(hash) {
                let descriptor = match self.not_in_use.iter().position(|d| d.hash == *hash) {
                    Some(index) => {
                        engine_trace!(SOURCE, "resource {} is used again before its unload", hash);
                        self.not_in_use.swap_remove(index)
                    }
                    None => ResourceDescriptor::new(*hash),
                };
                self.resources.insert(*hash, descriptor);
            }
            if let Some(descriptor) = self.resources.get_mut(hash) {
                descriptor.scene_usage.push(scene);
            }
        }
    }

    /// Remove one reference from `scene` to each hash
    pub fn unreference_resources_for_scene(&mut self, scene: SceneId, hashes: &[ResourceContentHash]) {
        for hash in hashes {
            let Some(descriptor) = self.resources.get_mut(hash) else {
                engine_warn!(SOURCE, "{} unreferences unknown resource {}", scene, hash);
                continue;
            };
            let Some(index) = descriptor.scene_usage.iter().position(|s| *s == scene) else {
                engine_warn!(SOURCE, "{} unreferences resource {} it does not reference", scene, hash);
                continue;
            };
            descriptor.scene_usage.remove(index);
            if descriptor.scene_usage.is_empty() {
                self.release(*hash);
            }
        }
    }

    fn release(&mut self, hash: ResourceContentHash) {
        let Some(descriptor) = self.resources.remove(&hash) else {
            return;
        };
        self.provided.retain(|h| *h != hash);
        if descriptor.status == ResourceStatus::Uploaded && !descriptor.device_handle.is_null() {
            self.not_in_use.push(descriptor);
        }
    }

    /// Attach a payload to a `Registered` descriptor
    ///
    /// Returns false (and changes nothing) if the hash is unknown or the
    /// descriptor already got its data.
    pub fn provide_resource_data(&mut self, data: ResourceData) -> bool {
        let hash = data.hash();
        let Some(descriptor) = self.resources.get_mut(&hash) else {
            engine_warn!(SOURCE, "data provided for unregistered resource {}", hash);
            return false;
        };
        if descriptor.status != ResourceStatus::Registered {
            return false;
        }
        descriptor.kind = Some(data.kind());
        descriptor.byte_size = data.byte_size();
        descriptor.data = Some(data);
        descriptor.status = ResourceStatus::DataProvided;
        self.provided.push(hash);
        true
    }

    /// Mark a shader as handed to the async worker
    pub fn set_resource_scheduled_for_upload(&mut self, hash: ResourceContentHash) {
        if let Some(descriptor) = self.resources.get_mut(&hash) {
            debug_assert_eq!(descriptor.status, ResourceStatus::DataProvided);
            descriptor.status = ResourceStatus::ScheduledForUpload;
            self.provided.retain(|h| *h != hash);
        }
    }

    /// Record the device object of a resource; releases the payload
    pub fn set_resource_uploaded(&mut self, hash: ResourceContentHash, handle: DeviceResourceHandle) {
        if let Some(descriptor) = self.resources.get_mut(&hash) {
            debug_assert!(matches!(
                descriptor.status,
                ResourceStatus::DataProvided | ResourceStatus::ScheduledForUpload
            ));
            debug_assert!(!handle.is_null());
            descriptor.status = ResourceStatus::Uploaded;
            descriptor.device_handle = handle;
            descriptor.data = None;
            self.provided.retain(|h| *h != hash);
        }
    }

    /// Mark a resource as broken; releases the payload
    pub fn set_resource_upload_failed(&mut self, hash: ResourceContentHash) {
        if let Some(descriptor) = self.resources.get_mut(&hash) {
            descriptor.status = ResourceStatus::UploadFailed;
            descriptor.device_handle = DeviceResourceHandle::null();
            descriptor.data = None;
            self.provided.retain(|h| *h != hash);
        }
    }

    /// True when the hash is registered
    pub fn contains_resource(&self, hash: ResourceContentHash) -> bool {
        self.resources.contains_key(&hash)
    }

    /// Descriptor of a registered resource
    pub fn resource_descriptor(&self, hash: ResourceContentHash) -> Option<&ResourceDescriptor> {
        self.resources.get(&hash)
    }

    /// Status of a registered resource
    pub fn resource_status(&self, hash: ResourceContentHash) -> Option<ResourceStatus> {
        self.resources.get(&hash).map(|d| d.status)
    }

    /// Device handle of an uploaded resource
    pub fn resource_device_handle(&self, hash: ResourceContentHash) -> Option<DeviceResourceHandle> {
        self.resources
            .get(&hash)
            .filter(|d| d.status == ResourceStatus::Uploaded)
            .map(|d| d.device_handle)
    }

    /// Hashes waiting for upload, oldest first
    pub fn provided_resources(&self) -> &[ResourceContentHash] {
        &self.provided
    }

    /// Unreferenced uploaded resources whose device objects await deletion
    pub fn resources_not_in_use(&self) -> &[ResourceDescriptor] {
        &self.not_in_use
    }

    /// Drain uploaded resources no scene references anymore
    pub fn take_resources_not_in_use(&mut self) -> Vec<ResourceDescriptor> {
        std::mem::take(&mut self.not_in_use)
    }

    /// Every descriptor plus the parked ones, leaving the registry empty
    pub fn take_all_resources(&mut self) -> Vec<ResourceDescriptor> {
        self.provided.clear();
        let mut all: Vec<ResourceDescriptor> = self.resources.drain().map(|(_, d)| d).collect();
        all.append(&mut self.not_in_use);
        all
    }

    /// Hashes referenced by `scene`, sorted
    pub fn resources_in_use_by_scene(&self, scene: SceneId) -> Vec<ResourceContentHash> {
        let mut hashes: Vec<ResourceContentHash> = self
            .resources
            .values()
            .filter(|d| d.is_referenced_by(scene))
            .map(|d| d.hash)
            .collect();
        hashes.sort();
        hashes
    }

    /// True while a shader is still on the worker
    pub fn has_any_resources_scheduled_for_upload(&self) -> bool {
        self.resources.values().any(|d| d.status == ResourceStatus::ScheduledForUpload)
    }

    /// True when every given hash finished uploading (successfully or not)
    pub fn are_resources_settled(&self, hashes: &[ResourceContentHash]) -> bool {
        hashes.iter().all(|hash| {
            matches!(
                self.resource_status(*hash),
                Some(ResourceStatus::Uploaded) | Some(ResourceStatus::UploadFailed)
            )
        })
    }

    /// Number of registered resources
    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "resource_registry_tests.rs"]
mod tests;
