//! Unit tests for resource_data.rs

use crate::graphics_device::{IndexType, TextureFormat, TextureInfo, TextureKind};
use crate::resource::{EffectResource, ResourceContentHash, ResourceData, ResourceKind, ResourcePayload};
use glam::Vec3;

#[test]
fn test_identical_content_gives_identical_hash() {
    let a = ResourceData::vertex_buffer(&[Vec3::ZERO, Vec3::X, Vec3::Y]);
    let b = ResourceData::vertex_buffer(&[Vec3::ZERO, Vec3::X, Vec3::Y]);
    let c = ResourceData::vertex_buffer(&[Vec3::ZERO, Vec3::X, Vec3::Z]);

    assert_eq!(a.hash(), b.hash());
    assert_ne!(a.hash(), c.hash());
    assert!(a.hash().is_valid());
}

#[test]
fn test_vertex_buffer_bytes_are_cast_from_vertices() {
    let data = ResourceData::vertex_buffer(&[Vec3::new(1.0, 2.0, 3.0)]);
    assert_eq!(data.kind(), ResourceKind::VertexBuffer);
    assert_eq!(data.byte_size(), 12);
}

#[test]
fn test_index_buffer_kinds() {
    let small = ResourceData::index_buffer_u16(&[0, 1, 2]);
    let large = ResourceData::index_buffer_u32(&[0, 1, 2]);

    assert_eq!(small.byte_size(), 6);
    assert_eq!(large.byte_size(), 12);
    match small.payload() {
        ResourcePayload::IndexBuffer { index_type, .. } => assert_eq!(*index_type, IndexType::U16),
        other => panic!("unexpected payload {:?}", other),
    }
}

#[test]
fn test_texture_kind_follows_texture_info() {
    let mut info = TextureInfo::texture_2d(TextureFormat::Rgba8, 2, 2);
    info.kind = TextureKind::TextureCube;
    let data = ResourceData::texture(info, vec![vec![0u8; 16]]);

    assert_eq!(data.kind(), ResourceKind::TextureCube);
    assert_eq!(data.byte_size(), 16);
}

#[test]
fn test_effect_hash_depends_on_sources_only() {
    let a = EffectResource::new("a", "void main(){}", "void main(){}");
    let b = EffectResource::new("b", "void main(){}", "void main(){}");
    let geometry = EffectResource::with_geometry("a", "void main(){}", "void main(){}", Some("gs"));

    assert_eq!(a.hash, b.hash);
    assert_ne!(a.hash, geometry.hash);

    let data = ResourceData::effect(a.clone());
    assert_eq!(data.hash(), a.hash);
    assert_eq!(data.as_effect().map(|e| e.name.as_str()), Some("a"));
}

#[test]
fn test_hash_display_is_32_hex_digits() {
    let hash = ResourceContentHash::new(0xab, 0x1);
    assert_eq!(hash.to_string(), "000000000000000100000000000000ab");
}

#[test]
fn test_same_bytes_of_different_kinds_never_share_a_hash() {
    let vertices = ResourceData::vertex_buffer(&[1u16, 2, 3, 4]);
    let small = ResourceData::index_buffer_u16(&[1, 2, 3, 4]);
    let large = ResourceData::index_buffer_u32(&[0x0002_0001, 0x0004_0003]);

    assert_eq!(vertices.byte_size(), small.byte_size());
    assert_eq!(small.byte_size(), large.byte_size());
    assert_ne!(vertices.hash(), small.hash());
    assert_ne!(small.hash(), large.hash());
    assert_ne!(vertices.hash(), large.hash());
}

#[test]
fn test_texture_hash_covers_description() {
    let rgba = TextureInfo::texture_2d(TextureFormat::Rgba8, 2, 2);
    let mut cube = rgba;
    cube.kind = TextureKind::TextureCube;
    let mut rg = TextureInfo::texture_2d(TextureFormat::Rg8, 2, 4);
    rg.mip_levels = rgba.mip_levels;

    let base = ResourceData::texture(rgba, vec![vec![7u8; 16]]);
    assert_ne!(base.hash(), ResourceData::texture(cube, vec![vec![7u8; 16]]).hash());
    assert_ne!(base.hash(), ResourceData::texture(rg, vec![vec![7u8; 16]]).hash());
}

#[test]
fn test_same_bytes_of_different_kinds_keep_separate_registry_entries() {
    use crate::handles::SceneId;
    use crate::resource::{ResourceRegistry, ResourceStatus};

    let vertices = ResourceData::vertex_buffer(&[1u16, 2, 3, 4]);
    let indices = ResourceData::index_buffer_u16(&[1, 2, 3, 4]);
    let mut registry = ResourceRegistry::new();
    registry.reference_resources_for_scene(SceneId(1), &[indices.hash()]);
    registry.reference_resources_for_scene(SceneId(2), &[vertices.hash()]);
    registry.provide_resource_data(indices.clone());
    registry.provide_resource_data(vertices.clone());

    assert_eq!(registry.resource_count(), 2);
    assert_eq!(registry.resource_status(vertices.hash()), Some(ResourceStatus::DataProvided));
    assert_eq!(registry.resource_status(indices.hash()), Some(ResourceStatus::DataProvided));
}
