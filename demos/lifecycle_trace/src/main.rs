// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame loop that exercises the lifecycle tracing pipeline.
//!
//! Drives 60 frames of a small scene over the instrumented in-memory
//! backend with a [`RecorderSink`](accretion_debug::recorder::RecorderSink)
//! installed in the device, replays the recording through a
//! [`PrettyPrintSink`](accretion_debug::pretty::PrettyPrintSink), then
//! exports a Chrome trace JSON file.

use std::fs::File;
use std::io::BufWriter;

use accretion_core::backend::{
    AccessMode, BindingKind, BufferBindingKind, BufferUsage, ShaderStage, StageSet, TextureFormat,
};
use accretion_core::binding::BindGroup;
use accretion_core::buffer::GpuBuffer;
use accretion_core::pipeline::RenderPipeline;
use accretion_core::shader::{
    BindingReflection, EntryPointReflection, GroupReflection, ShaderModule, ShaderReflection,
};
use accretion_core::texture::{CanvasTexture, RenderTargets};

use accretion_debug::pretty::PrettyPrintSink;
use accretion_debug::recorder::{RecorderSink, replay};
use accretion_harness::counting_device;
use accretion_render::{DrawCall, ExecutionContext, RenderPass, RenderStep};

const FRAME_COUNT: u64 = 60;

#[repr(C)]
#[derive(Clone, Copy, bytemuck::NoUninit)]
struct Vertex {
    position: [f32; 2],
    uv: [f32; 2],
}

const TRIANGLE: [Vertex; 3] = [
    Vertex {
        position: [0.0, 0.6],
        uv: [0.5, 0.0],
    },
    Vertex {
        position: [-0.6, -0.6],
        uv: [0.0, 1.0],
    },
    Vertex {
        position: [0.6, -0.6],
        uv: [1.0, 1.0],
    },
];

fn reflection() -> ShaderReflection {
    ShaderReflection {
        groups: vec![GroupReflection {
            index: 0,
            bindings: vec![BindingReflection {
                index: 0,
                name: "frame".into(),
                visibility: StageSet::VERTEX,
                access: AccessMode::Read,
                kind: BindingKind::Buffer {
                    kind: BufferBindingKind::Uniform,
                    min_size: 64,
                },
            }],
        }],
        entry_points: vec![
            EntryPointReflection {
                name: "vs_main".into(),
                stage: ShaderStage::Vertex,
                workgroup_size: [1, 1, 1],
                vertex_buffers: vec![],
            },
            EntryPointReflection {
                name: "fs_main".into(),
                stage: ShaderStage::Fragment,
                workgroup_size: [1, 1, 1],
                vertex_buffers: vec![],
            },
        ],
    }
}

fn main() {
    let (device, stats) = counting_device();

    // -- recorder ----------------------------------------------------------
    let recorder = RecorderSink::new();
    let recording = recorder.handle();
    device.set_trace_sink(Some(Box::new(recorder)));

    // -- scene -------------------------------------------------------------
    let shader = ShaderModule::new(&device, "mesh", reflection()).expect("shader setup failed");
    let canvas = CanvasTexture::new(&device, [800, 600], TextureFormat::Bgra8Unorm);
    let targets = RenderTargets::new(&device);
    targets
        .setup(|s| s.add_color(canvas.clone(), Some([0.05, 0.05, 0.08, 1.0])))
        .expect("targets setup failed");
    let pipeline =
        RenderPipeline::new(&shader, "vs_main", Some("fs_main"), &targets).expect("pipeline setup");

    let uniform = GpuBuffer::new(&device, 64, BufferUsage::UNIFORM.union(BufferUsage::COPY_DST));
    let group = BindGroup::new(&shader.group_layouts()[0]);
    group
        .set_data("frame", uniform.clone())
        .expect("binding data failed");
    let vertices = GpuBuffer::new(
        &device,
        size_of_val(&TRIANGLE) as u64,
        BufferUsage::VERTEX.union(BufferUsage::COPY_DST),
    );
    vertices
        .write_slice(0, &TRIANGLE)
        .expect("vertex upload failed");

    let mut pass = RenderPass::new(pipeline.targets());
    pass.add_step(RenderStep {
        pipeline,
        bind_groups: vec![(0, group)],
        vertex_buffers: vec![(0, vertices.clone())],
        index: None,
        draw: DrawCall::Vertices {
            vertex_count: 3,
            instance_count: 1,
        },
    });

    // -- frame loop --------------------------------------------------------
    for frame in 1..=FRAME_COUNT {
        device.start_new_frame();

        let t = frame as f32 / FRAME_COUNT as f32;
        uniform.write(0, &t.to_le_bytes()).expect("uniform write failed");

        // Mid-run window resize exercises the soft invalidation path.
        if frame == FRAME_COUNT / 2 {
            targets.resize(1280, 720).expect("resize failed");
        }

        let mut ctx = ExecutionContext::new();
        pass.execute(&mut ctx).expect("pass execution failed");
        device.submit(&ctx.finish());
    }

    // -- teardown ----------------------------------------------------------
    vertices.deconstruct();
    uniform.deconstruct();
    canvas.deconstruct();

    // -- replay the recording as pretty-printed lines ----------------------
    let bytes = recording.bytes();
    let mut pretty = PrettyPrintSink::new(Box::new(std::io::stdout()));
    replay(&bytes, &mut pretty);

    // -- export Chrome trace -----------------------------------------------
    let path = "trace.json";
    let file = File::create(path).expect("failed to create trace.json");
    let mut writer = BufWriter::new(file);
    accretion_debug::chrome::export(&bytes, &mut writer).expect("failed to write Chrome trace");

    println!(
        "Wrote {path} ({FRAME_COUNT} frames, {} recorded bytes)",
        bytes.len()
    );
    println!(
        "Backend: created={} destroyed={} alive={} submits={}",
        stats.created(),
        stats.destroyed(),
        stats.alive(),
        stats.submits()
    );
}
