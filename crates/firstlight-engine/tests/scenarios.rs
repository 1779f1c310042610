//! The two end-to-end scenarios: a vertex-buffer draw and a storage-buffer draw
//! of the same unit square.

use firstlight_engine::backend::{MemoryPlatform, RecordedCommand, WgpuPlatform};
use firstlight_engine::logging::{init_logging, LoggingConfig};
use firstlight_engine::resource::records::{self, Position3};
use firstlight_engine::{
    AcquireOptions, Backend, BindGroup, BufferDescriptor, Device, DrawRequest, Error,
    PipelineDescriptor, SequenceState, SlotBinding, StorageLayout, Surface, WgpuBackend,
};
use wgpu::BufferUsages as U;

const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Bgra8Unorm;

const VERTEX_SHADER: &str = r#"
@vertex
fn vs_main(@location(0) pos: vec3f) -> @builtin(position) vec4f {
    return vec4f(pos, 1.0);
}

@fragment
fn fs_main() -> @location(0) vec4f {
    return vec4f(1.0, 0.0, 0.0, 1.0);
}
"#;

const STORAGE_SHADER: &str = r#"
struct Vertex {
    pos: vec4f,
}

@group(0) @binding(0) var<storage, read> vertices: array<Vertex>;

@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> @builtin(position) vec4f {
    return vertices[index].pos;
}

@fragment
fn fs_main() -> @location(0) vec4f {
    return vec4f(0.0, 1.0, 0.0, 1.0);
}
"#;

fn scenario_a<B: Backend>(device: &Device<B>, surface: &Surface<B>) -> SequenceState {
    let vertices = device
        .create_buffer(&BufferDescriptor {
            label: Some("Cell vertices"),
            size: 72,
            usage: U::VERTEX | U::COPY_DST,
        })
        .unwrap();
    device
        .write_buffer(&vertices, 0, bytemuck::cast_slice(&records::UNIT_SQUARE))
        .unwrap();

    let shader = device.compile_shader(Some("Cell shader"), VERTEX_SHADER).unwrap();
    let pipeline = device
        .build_render_pipeline(
            &PipelineDescriptor::new(&shader, "vs_main", "fs_main", FORMAT)
                .with_label("Cell pipeline")
                .with_vertex_layout(Position3::layout()),
        )
        .unwrap();
    assert_eq!(pipeline.vertex_layout().map(|l| l.stride()), Some(12));

    device
        .record_and_submit(
            surface,
            &DrawRequest {
                pipeline: &pipeline,
                vertex_buffer: Some(&vertices),
                bind_group: None,
                vertex_count: 6,
                clear_color: wgpu::Color {
                    r: 0.0,
                    g: 0.0,
                    b: 0.3,
                    a: 1.0,
                },
            },
        )
        .unwrap()
}

#[test]
fn scenario_a_vertex_buffer() {
    init_logging(LoggingConfig::for_tests());
    let platform = MemoryPlatform::default();
    let device =
        pollster::block_on(platform.acquire_device(&AcquireOptions::default())).unwrap();
    let mut surface = platform.create_surface(512, 512);
    surface.configure(&device, FORMAT).unwrap();

    assert_eq!(scenario_a(&device, &surface), SequenceState::Submitted);

    let submissions = device.backend().submissions();
    assert_eq!(submissions.len(), 1);
    assert!(submissions[0].presented);

    let pass = &submissions[0].passes[0];
    assert_eq!(pass.clear.b, 0.3);
    assert_eq!(pass.format, FORMAT);
    let kinds: Vec<&str> = pass
        .commands
        .iter()
        .map(|c| match c {
            RecordedCommand::SetPipeline { .. } => "pipeline",
            RecordedCommand::SetVertexBuffer { slot: 0, .. } => "vertex buffer 0",
            RecordedCommand::SetVertexBuffer { .. } => "vertex buffer",
            RecordedCommand::SetBindGroup { .. } => "bind group",
            RecordedCommand::Draw { .. } => "draw",
        })
        .collect();
    assert_eq!(kinds, ["pipeline", "vertex buffer 0", "draw"]);
}

fn scenario_b<B: Backend>(
    device: &Device<B>,
    surface: &Surface<B>,
) -> (SequenceState, BindGroup<B>) {
    let layout = StorageLayout::for_struct(&[wgpu::VertexFormat::Float32x4]).unwrap();
    let storage = device
        .create_record_buffer(Some("Cell vertices"), &layout, 6, U::STORAGE | U::COPY_DST)
        .unwrap();
    assert_eq!(storage.size(), 96);
    let packed = layout
        .pack(bytemuck::cast_slice::<_, f32>(&records::UNIT_SQUARE_HOMOGENEOUS))
        .unwrap();
    device.write_records(&storage, 0, &packed).unwrap();

    let shader = device.compile_shader(Some("Cell shader"), STORAGE_SHADER).unwrap();
    let pipeline = device
        .build_render_pipeline(
            &PipelineDescriptor::new(&shader, "vs_main", "fs_main", FORMAT)
                .with_label("Cell pipeline"),
        )
        .unwrap();
    assert!(pipeline.vertex_layout().is_none());
    assert!(pipeline.binding_layout().is_derived());
    assert_eq!(pipeline.binding_layout().slots().len(), 1);

    let group = device
        .build_bind_group(Some("Cell bind group"), &pipeline, &[SlotBinding::new(0, &storage)])
        .unwrap();

    let state = device
        .record_and_submit(
            surface,
            &DrawRequest {
                pipeline: &pipeline,
                vertex_buffer: None,
                bind_group: Some(&group),
                vertex_count: 6,
                clear_color: wgpu::Color {
                    r: 0.3,
                    g: 0.3,
                    b: 0.3,
                    a: 1.0,
                },
            },
        )
        .unwrap();
    (state, group)
}

#[test]
fn scenario_b_storage_buffer() {
    init_logging(LoggingConfig::for_tests());
    let platform = MemoryPlatform::default();
    let device =
        pollster::block_on(platform.acquire_device(&AcquireOptions::default())).unwrap();
    let mut surface = platform.create_surface(512, 512);
    surface.configure(&device, FORMAT).unwrap();

    let (state, group) = scenario_b(&device, &surface);
    assert_eq!(state, SequenceState::Submitted);
    assert_eq!(
        group.raw().bound_bytes(0).as_deref(),
        Some(bytemuck::cast_slice::<_, u8>(&records::UNIT_SQUARE_HOMOGENEOUS))
    );

    let submissions = device.backend().submissions();
    let commands = &submissions[0].passes[0].commands;
    assert!(commands.contains(&RecordedCommand::SetBindGroup {
        index: 0,
        group: group.id()
    }));
    assert!(
        !commands
            .iter()
            .any(|c| matches!(c, RecordedCommand::SetVertexBuffer { .. }))
    );
    assert_eq!(
        commands.last(),
        Some(&RecordedCommand::Draw {
            vertices: 0..6,
            instances: 0..1
        })
    );
}

/// A device on whatever adapter the machine has. Machines without one
/// (headless CI) skip the wgpu scenarios.
fn wgpu_device() -> Option<(WgpuPlatform, Device<WgpuBackend>)> {
    init_logging(LoggingConfig::for_tests());
    let platform = WgpuPlatform::new().ok()?;
    let options = AcquireOptions::default();
    match pollster::block_on(platform.acquire_device(&options, None)) {
        Ok(device) => Some((platform, device)),
        Err(e) => {
            log::warn!("skipping wgpu scenario: {e}");
            None
        }
    }
}

#[test]
fn scenario_a_on_wgpu_offscreen() {
    let Some((platform, device)) = wgpu_device() else {
        return;
    };
    let mut surface = platform.offscreen_surface(64, 64).unwrap();
    surface.configure(&device, FORMAT).unwrap();
    assert_eq!(scenario_a(&device, &surface), SequenceState::Submitted);
}

#[test]
fn scenario_b_on_wgpu_offscreen() {
    let Some((platform, device)) = wgpu_device() else {
        return;
    };
    let mut surface = platform.offscreen_surface(64, 64).unwrap();
    surface.configure(&device, FORMAT).unwrap();
    let (state, _group) = scenario_b(&device, &surface);
    assert_eq!(state, SequenceState::Submitted);
}

#[test]
fn wgpu_rejections_come_back_as_errors() {
    let Some((platform, device)) = wgpu_device() else {
        return;
    };
    assert!(matches!(
        platform.offscreen_surface(0, 64),
        Err(Error::Configuration(_))
    ));

    let huge = BufferDescriptor {
        label: Some("huge"),
        size: 1 << 62,
        usage: U::STORAGE,
    };
    assert!(matches!(device.create_buffer(&huge), Err(Error::Configuration(_))));
    // Past the device-level check, wgpu's own validation still reports it.
    assert!(matches!(
        device.backend().create_buffer(&huge),
        Err(Error::Configuration(_))
    ));

    let shader = device
        .compile_shader(
            None,
            "@vertex fn vs_main() -> @builtin(position) vec4f { return vec4f(0.0); }
             @fragment fn fs_main() -> @location(0) vec4u { return vec4u(1u); }",
        )
        .unwrap();
    let pipeline = device.build_render_pipeline(&PipelineDescriptor::new(
        &shader,
        "vs_main",
        "fs_main",
        FORMAT,
    ));
    assert!(matches!(pipeline, Err(Error::IncompatibleLayout(_))));
}
