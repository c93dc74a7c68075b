//! WGSL shader sources for the GPU blur pipelines.
//!
//! Pixels travel as one packed RGBA8 `u32` per pixel;
//! `unpack4x8unorm`/`pack4x8unorm` convert to and from normalized floats
//! inside the shader. Box weights are uniform, so they are computed
//! in-shader from the radius rather than uploaded as a weights buffer.

#![cfg_attr(not(feature = "wgpu"), allow(dead_code))]

/// Box blur (horizontal pass).
pub const BLUR_H: &str = r#"
@group(0) @binding(0) var<storage, read> src: array<u32>;
@group(0) @binding(1) var<storage, read_write> dst: array<u32>;
@group(0) @binding(2) var<uniform> dims: vec4<u32>;  // w, h, radius, 0

@compute @workgroup_size(256)
fn main(@builtin(global_invocation_id) id: vec3<u32>) {
    let px = id.x;
    let w = dims.x;
    let h = dims.y;
    let r = i32(dims.z);
    if px >= w * h { return; }

    let y = px / w;
    let x = px % w;
    let norm = 1.0 / f32(r * 2 + 1);

    var acc = vec4<f32>(0.0);
    for (var i = -r; i <= r; i = i + 1) {
        let sx = clamp(i32(x) + i, 0, i32(w) - 1);
        acc = acc + unpack4x8unorm(src[y * w + u32(sx)]);
    }
    dst[px] = pack4x8unorm(acc * norm);
}
"#;

/// Box blur (vertical pass).
pub const BLUR_V: &str = r#"
@group(0) @binding(0) var<storage, read> src: array<u32>;
@group(0) @binding(1) var<storage, read_write> dst: array<u32>;
@group(0) @binding(2) var<uniform> dims: vec4<u32>;  // w, h, radius, 0

@compute @workgroup_size(256)
fn main(@builtin(global_invocation_id) id: vec3<u32>) {
    let px = id.x;
    let w = dims.x;
    let h = dims.y;
    let r = i32(dims.z);
    if px >= w * h { return; }

    let y = px / w;
    let x = px % w;
    let norm = 1.0 / f32(r * 2 + 1);

    var acc = vec4<f32>(0.0);
    for (var i = -r; i <= r; i = i + 1) {
        let sy = clamp(i32(y) + i, 0, i32(h) - 1);
        acc = acc + unpack4x8unorm(src[u32(sy) * w + x]);
    }
    dst[px] = pack4x8unorm(acc * norm);
}
"#;
