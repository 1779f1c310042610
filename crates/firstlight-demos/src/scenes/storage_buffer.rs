use anyhow::{Context, Result};
use firstlight_engine::resource::records::UNIT_SQUARE_HOMOGENEOUS;
use firstlight_engine::{Backend, Device, PipelineDescriptor, SlotBinding, StorageLayout};

use super::{Prepared, Scene};

const SHADER: &str = include_str!("shaders/storage_vertices.wgsl");

/// Unit square read by the vertex stage from a storage buffer, indexed by
/// `vertex_index`. No vertex buffers; the binding layout is derived from the
/// shader.
pub struct StorageBufferScene;

impl Scene for StorageBufferScene {
    fn name(&self) -> &'static str {
        "storage-buffer"
    }

    fn prepare<B: Backend>(
        &self,
        device: &Device<B>,
        format: wgpu::TextureFormat,
    ) -> Result<Prepared<B>> {
        // struct Vertex { pos: vec4f }
        let layout = StorageLayout::for_struct(&[wgpu::VertexFormat::Float32x4])?;
        let records = UNIT_SQUARE_HOMOGENEOUS.len() as u64;

        let storage = device
            .create_record_buffer(
                Some("Cell vertices"),
                &layout,
                records,
                wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            )
            .context("failed to create the storage buffer")?;
        let packed = layout.pack(bytemuck::cast_slice::<_, f32>(&UNIT_SQUARE_HOMOGENEOUS))?;
        device
            .write_records(&storage, 0, &packed)
            .context("failed to upload vertex records")?;

        let shader = device
            .compile_shader(Some("main"), SHADER)
            .context("failed to compile the storage shader")?;
        let pipeline = device
            .build_render_pipeline(
                &PipelineDescriptor::new(&shader, "vs_main", "fs_main", format).with_label("main"),
            )
            .context("failed to build the storage pipeline")?;

        let bind_group = device
            .build_bind_group(
                Some("main-bindgroup"),
                &pipeline,
                &[SlotBinding::new(0, &storage)],
            )
            .context("failed to bind the storage buffer")?;

        Ok(Prepared {
            pipeline,
            vertex_buffer: None,
            storage_buffer: Some(storage),
            bind_group: Some(bind_group),
            vertex_count: records as u32,
            clear_color: wgpu::Color {
                r: 0.3,
                g: 0.3,
                b: 0.3,
                a: 1.0,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenes::testing::{memory_target, FORMAT};
    use firstlight_engine::backend::RecordedCommand;
    use firstlight_engine::SequenceState;

    #[test]
    fn submits_through_bind_group_zero() {
        let (device, surface) = memory_target();
        let prepared = StorageBufferScene.prepare(&device, FORMAT).unwrap();
        assert!(prepared.pipeline.vertex_layout().is_none());
        assert_eq!(prepared.storage_buffer.as_ref().map(|b| b.size()), Some(96));

        assert_eq!(prepared.submit(&device, &surface).unwrap(), SequenceState::Submitted);

        let submissions = device.backend().submissions();
        let commands = &submissions[0].passes[0].commands;
        assert!(matches!(
            commands.as_slice(),
            [
                RecordedCommand::SetPipeline { .. },
                RecordedCommand::SetBindGroup { index: 0, .. },
                RecordedCommand::Draw { .. },
            ]
        ));
    }

    #[test]
    fn storage_records_match_the_shader_stride() {
        let (device, _) = memory_target();
        let prepared = StorageBufferScene.prepare(&device, FORMAT).unwrap();
        let slot = prepared.pipeline.binding_layout().slot(0).unwrap();
        assert_eq!(slot.record_stride, Some(16));
        assert_eq!(
            prepared.bind_group.as_ref().unwrap().raw().bound_bytes(0).map(|b| b.len()),
            Some(96)
        );
    }
}
