//! Unit tests for async_effect_uploader.rs

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use crate::graphics_device::mock_graphics_device::MockGraphicsDevice;
use crate::graphics_device::CompiledShader;
use crate::resource::{AsyncEffectUploader, CompiledEffect, EffectResource, ResourceContentHash};

fn effect(name: &str) -> Arc<EffectResource> {
    Arc::new(EffectResource::new(name, &format!("vs {}", name), "fs"))
}

/// Sync until `expected` results arrived (or a generous timeout elapsed)
fn collect_results(uploader: &AsyncEffectUploader, expected: usize) -> Vec<CompiledEffect> {
    let deadline = Instant::now() + Duration::from_secs(10);
    let mut results = Vec::new();
    while results.len() < expected && Instant::now() < deadline {
        uploader.sync(Vec::new(), &mut results);
        thread::sleep(Duration::from_millis(1));
    }
    results
}

#[test]
fn test_start_enables_context_and_stop_disables_it() {
    let mut device = MockGraphicsDevice::new();
    let mut uploader = AsyncEffectUploader::new();

    uploader.start(&mut device).unwrap();
    assert!(uploader.is_running());
    uploader.stop();
    assert!(!uploader.is_running());

    assert_eq!(device.context_calls(), vec!["enable", "disable"]);
}

#[test]
fn test_start_fails_without_upload_context() {
    let mut device = MockGraphicsDevice::new();
    device.no_upload_context = true;
    let mut uploader = AsyncEffectUploader::new();

    assert!(uploader.start(&mut device).is_err());
    assert!(!uploader.is_running());
}

#[test]
fn test_start_fails_when_context_cannot_be_enabled() {
    let mut device = MockGraphicsDevice::new();
    device.fail_context_enable = true;
    let mut uploader = AsyncEffectUploader::new();

    assert!(uploader.start(&mut device).is_err());
    assert!(!uploader.is_running());
}

#[test]
fn test_start_after_failed_handshake_uses_fresh_worker() {
    let mut device = MockGraphicsDevice::new();
    device.fail_context_enable = true;
    let mut uploader = AsyncEffectUploader::new();
    assert!(uploader.start(&mut device).is_err());

    device.fail_context_enable = false;
    uploader.start(&mut device).unwrap();
    assert!(uploader.is_running());
    uploader.submit(vec![effect("after_retry")]);
    assert_eq!(collect_results(&uploader, 1).len(), 1);
    uploader.stop();

    assert_eq!(
        device.context_calls(),
        vec!["enable", "enable", "upload_shader(after_retry)", "disable"]
    );
}

#[test]
fn test_start_twice_is_rejected() {
    let mut device = MockGraphicsDevice::new();
    let mut uploader = AsyncEffectUploader::new();
    uploader.start(&mut device).unwrap();

    assert!(uploader.start(&mut device).is_err());
}

#[test]
fn test_every_effect_appears_exactly_once_in_submission_order() {
    let mut device = MockGraphicsDevice::new();
    device.compile_delay = Duration::from_millis(1);
    let mut uploader = AsyncEffectUploader::new();
    uploader.start(&mut device).unwrap();

    let effects: Vec<Arc<EffectResource>> = (0..12).map(|i| effect(&format!("e{}", i))).collect();
    let mut results = Vec::new();
    uploader.submit(effects[0..3].to_vec());
    uploader.sync(effects[3..5].to_vec(), &mut results);
    uploader.submit(effects[5..6].to_vec());
    uploader.sync(effects[6..12].to_vec(), &mut results);

    let remaining = collect_results(&uploader, 12 - results.len());
    results.extend(remaining);
    uploader.stop();

    let hashes: Vec<ResourceContentHash> = results.iter().map(|r| r.hash).collect();
    let expected: Vec<ResourceContentHash> = effects.iter().map(|e| e.hash).collect();
    assert_eq!(hashes, expected);
    assert!(results.iter().all(|r| r.shader.is_some()));
}

#[test]
fn test_failed_compile_is_reported_not_dropped() {
    let mut device = MockGraphicsDevice::new();
    device.failing_effects.push("bad".to_string());
    let mut uploader = AsyncEffectUploader::new();
    uploader.start(&mut device).unwrap();

    uploader.submit(vec![effect("bad"), effect("good")]);
    let results = collect_results(&uploader, 2);
    uploader.stop();

    assert_eq!(results.len(), 2);
    assert!(results[0].shader.is_none());
    assert_eq!(results[1].shader.as_ref().map(|s| s.name().to_string()), Some("good".to_string()));
}

#[test]
fn test_sync_does_not_wait_for_slow_compiles() {
    let mut device = MockGraphicsDevice::new();
    device.compile_delay = Duration::from_millis(300);
    let mut uploader = AsyncEffectUploader::new();
    uploader.start(&mut device).unwrap();

    let mut results = Vec::new();
    let started = Instant::now();
    uploader.sync(vec![effect("slow")], &mut results);
    uploader.sync(Vec::new(), &mut results);

    assert!(started.elapsed() < Duration::from_millis(250));
    assert!(results.is_empty());

    let results = collect_results(&uploader, 1);
    assert_eq!(results.len(), 1);
}

#[test]
fn test_drop_joins_worker() {
    let mut device = MockGraphicsDevice::new();
    {
        let mut uploader = AsyncEffectUploader::new();
        uploader.start(&mut device).unwrap();
        uploader.submit(vec![effect("x")]);
    }
    assert_eq!(device.context_calls().last().map(String::as_str), Some("disable"));
}
