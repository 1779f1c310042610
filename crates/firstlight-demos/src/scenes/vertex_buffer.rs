use anyhow::{Context, Result};
use firstlight_engine::resource::records::UNIT_SQUARE;
use firstlight_engine::{Backend, BufferDescriptor, Device, PipelineDescriptor, VertexLayout};

use super::{Prepared, Scene};

const SHADER: &str = include_str!("shaders/inter_stage.wgsl");

/// Unit square fed through a vertex buffer, colored per vertex through an
/// inter-stage variable.
pub struct VertexBufferScene;

impl Scene for VertexBufferScene {
    fn name(&self) -> &'static str {
        "vertex-buffer"
    }

    fn prepare<B: Backend>(
        &self,
        device: &Device<B>,
        format: wgpu::TextureFormat,
    ) -> Result<Prepared<B>> {
        let vertices = device
            .create_buffer(&BufferDescriptor {
                label: Some("Cell vertices"),
                size: size_of_val(&UNIT_SQUARE) as u64,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            })
            .context("failed to create the vertex buffer")?;
        device
            .write_buffer(&vertices, 0, bytemuck::cast_slice(&UNIT_SQUARE))
            .context("failed to upload vertices")?;

        let shader = device
            .compile_shader(Some("Cell shader"), SHADER)
            .context("failed to compile the cell shader")?;

        // One float32x3 position at location 0, 12-byte stride.
        let layout = VertexLayout::packed(&[(0, wgpu::VertexFormat::Float32x3)]);
        let pipeline = device
            .build_render_pipeline(
                &PipelineDescriptor::new(&shader, "vertexMain", "fragmentMain", format)
                    .with_label("Cell pipeline")
                    .with_vertex_layout(layout),
            )
            .context("failed to build the cell pipeline")?;

        Ok(Prepared {
            pipeline,
            vertex_buffer: Some(vertices),
            storage_buffer: None,
            bind_group: None,
            vertex_count: UNIT_SQUARE.len() as u32,
            clear_color: wgpu::Color {
                r: 0.0,
                g: 0.0,
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
    fn submits_one_draw_of_six_vertices() {
        let (device, surface) = memory_target();
        let prepared = VertexBufferScene.prepare(&device, FORMAT).unwrap();
        assert_eq!(prepared.pipeline.vertex_layout().map(|l| l.stride()), Some(12));
        assert!(prepared.pipeline.binding_layout().is_empty());

        assert_eq!(prepared.submit(&device, &surface).unwrap(), SequenceState::Submitted);

        let submissions = device.backend().submissions();
        let pass = &submissions[0].passes[0];
        assert_eq!(pass.clear.b, 0.3);
        assert_eq!(
            pass.commands.last(),
            Some(&RecordedCommand::Draw {
                vertices: 0..6,
                instances: 0..1
            })
        );
    }

    #[test]
    fn vertex_buffer_holds_the_packed_square() {
        let (device, _) = memory_target();
        let prepared = VertexBufferScene.prepare(&device, FORMAT).unwrap();
        let buffer = prepared.vertex_buffer.as_ref().unwrap();
        assert_eq!(buffer.size(), 72);
        assert_eq!(
            device.read_buffer(buffer).as_deref(),
            Some(bytemuck::cast_slice::<_, u8>(&UNIT_SQUARE))
        );
    }
}
