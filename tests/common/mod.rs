#![allow(dead_code)]

use std::path::Path;

use guarded_vfs::{Context, EngineConfig};

pub fn context(root: &Path) -> Context {
    Context::with_root(root).expect("ctx")
}

pub fn context_with(root: &Path, tweak: impl FnOnce(&mut EngineConfig)) -> Context {
    let mut config = EngineConfig::new(root);
    tweak(&mut config);
    Context::new(config).expect("ctx")
}

/// Writes `content` at the root-relative `relative`, creating parent directories.
pub fn put(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create_dir_all");
    }
    std::fs::write(&path, content).expect("write");
}

pub fn read_to_string(root: &Path, relative: &str) -> String {
    std::fs::read_to_string(root.join(relative)).expect("read")
}

/// Runs a raw JSON read and returns the serialized envelope.
pub fn read_json(ctx: &Context, request: serde_json::Value) -> serde_json::Value {
    serde_json::to_value(ctx.read_json(&request.to_string())).expect("serialize")
}

/// Runs a raw JSON write and returns the serialized envelope.
pub fn write_json(ctx: &Context, request: serde_json::Value) -> serde_json::Value {
    serde_json::to_value(ctx.write_json(&request.to_string())).expect("serialize")
}

pub fn error_code(envelope: &serde_json::Value) -> &str {
    envelope["error"]["code"].as_str().unwrap_or_else(|| {
        panic!("envelope has no error code: {envelope}");
    })
}
