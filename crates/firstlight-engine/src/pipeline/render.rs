use crate::backend::{Backend, PipelineRequest};
use crate::device::Device;
use crate::error::{Error, Result};
use crate::id::ResourceId;
use crate::resource::VertexLayout;

use super::binding::{BindingLayout, BindingLayoutMode};
use super::reflect::{EntryPointInfo, NumericKind, Stage};
use super::shader::ShaderProgram;

/// Everything needed to link a shader into a render pipeline.
pub struct PipelineDescriptor<'a, B: Backend> {
    pub label: Option<&'a str>,
    pub shader: &'a ShaderProgram<B>,
    pub vertex_entry: &'a str,
    pub fragment_entry: &'a str,
    /// `None` when the vertex stage fetches its own data (storage buffers,
    /// constants) instead of reading attributes.
    pub vertex_layout: Option<VertexLayout>,
    pub output_format: wgpu::TextureFormat,
    pub topology: wgpu::PrimitiveTopology,
    pub binding_layout: BindingLayoutMode,
}

impl<'a, B: Backend> PipelineDescriptor<'a, B> {
    /// Triangle-list pipeline with no vertex buffers and a derived binding layout.
    pub fn new(
        shader: &'a ShaderProgram<B>,
        vertex_entry: &'a str,
        fragment_entry: &'a str,
        output_format: wgpu::TextureFormat,
    ) -> Self {
        Self {
            label: None,
            shader,
            vertex_entry,
            fragment_entry,
            vertex_layout: None,
            output_format,
            topology: wgpu::PrimitiveTopology::TriangleList,
            binding_layout: BindingLayoutMode::DeriveFromShader,
        }
    }

    pub fn with_label(mut self, label: &'a str) -> Self {
        self.label = Some(label);
        self
    }

    pub fn with_vertex_layout(mut self, layout: VertexLayout) -> Self {
        self.vertex_layout = Some(layout);
        self
    }

    pub fn with_binding_layout(mut self, mode: BindingLayoutMode) -> Self {
        self.binding_layout = mode;
        self
    }
}

/// Immutable link of shader entry points to buffer layout, output format and
/// binding layout.
pub struct RenderPipeline<B: Backend> {
    id: ResourceId,
    label: Option<String>,
    shader: ShaderProgram<B>,
    vertex_layout: Option<VertexLayout>,
    output_format: wgpu::TextureFormat,
    bindings: BindingLayout,
    raw: B::Pipeline,
}

impl<B: Backend> RenderPipeline<B> {
    #[inline]
    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn shader(&self) -> &ShaderProgram<B> {
        &self.shader
    }

    pub fn vertex_layout(&self) -> Option<&VertexLayout> {
        self.vertex_layout.as_ref()
    }

    #[inline]
    pub fn output_format(&self) -> wgpu::TextureFormat {
        self.output_format
    }

    /// Slots of bind group 0.
    pub fn binding_layout(&self) -> &BindingLayout {
        &self.bindings
    }

    pub fn raw(&self) -> &B::Pipeline {
        &self.raw
    }
}

impl<B: Backend> Device<B> {
    /// Links `desc.shader` into an immutable render pipeline.
    ///
    /// Fails with `Error::IncompatibleLayout` when an entry point is missing,
    /// when the vertex stage reads `@location` inputs the vertex layout does not
    /// provide (or no layout is given at all), when the fragment output does
    /// not fit `output_format`, or when the binding layout does not fit what
    /// the shader uses.
    pub fn build_render_pipeline(
        &self,
        desc: &PipelineDescriptor<'_, B>,
    ) -> Result<RenderPipeline<B>> {
        let reflection = desc.shader.reflection();
        let vertex = find_entry(
            reflection.entry_point(desc.vertex_entry),
            desc.vertex_entry,
            Stage::Vertex,
        )?;
        let fragment = find_entry(
            reflection.entry_point(desc.fragment_entry),
            desc.fragment_entry,
            Stage::Fragment,
        )?;

        check_vertex_inputs(vertex, desc.vertex_layout.as_ref())?;
        if let Some(layout) = &desc.vertex_layout {
            let max = u64::from(self.limits().max_vertex_buffer_array_stride);
            if layout.stride() > max {
                return Err(Error::IncompatibleLayout(format!(
                    "vertex stride {} exceeds the device limit of {max}",
                    layout.stride()
                )));
            }
        }
        check_fragment_outputs(fragment, desc.output_format)?;

        let bindings = BindingLayout::resolve(
            &desc.binding_layout,
            [
                (vertex, wgpu::ShaderStages::VERTEX),
                (fragment, wgpu::ShaderStages::FRAGMENT),
            ],
        )?;

        let raw = self.backend().create_pipeline(&PipelineRequest {
            label: desc.label,
            shader: desc.shader.raw(),
            vertex_entry: desc.vertex_entry,
            fragment_entry: desc.fragment_entry,
            vertex_layout: desc.vertex_layout.as_ref(),
            output_format: desc.output_format,
            topology: desc.topology,
            bindings: &bindings,
        })?;

        let id = ResourceId::next();
        log::debug!(
            "pipeline {id} `{}`: {}/{} -> {:?}, {} vertex buffer(s), {} binding slot(s)",
            desc.label.unwrap_or("unlabelled"),
            desc.vertex_entry,
            desc.fragment_entry,
            desc.output_format,
            usize::from(desc.vertex_layout.is_some()),
            bindings.slots().len()
        );

        Ok(RenderPipeline {
            id,
            label: desc.label.map(str::to_string),
            shader: desc.shader.clone(),
            vertex_layout: desc.vertex_layout.clone(),
            output_format: desc.output_format,
            bindings,
            raw,
        })
    }
}

fn find_entry<'r>(
    entry: Option<&'r EntryPointInfo>,
    name: &str,
    stage: Stage,
) -> Result<&'r EntryPointInfo> {
    match entry {
        Some(ep) if ep.stage == stage => Ok(ep),
        Some(ep) => Err(Error::IncompatibleLayout(format!(
            "entry point `{name}` is a {:?} stage, expected {stage:?}",
            ep.stage
        ))),
        None => Err(Error::IncompatibleLayout(format!(
            "shader has no {stage:?} entry point named `{name}`"
        ))),
    }
}

fn check_vertex_inputs(vertex: &EntryPointInfo, layout: Option<&VertexLayout>) -> Result<()> {
    let Some(layout) = layout else {
        return match vertex.inputs.first() {
            Some(input) => Err(Error::IncompatibleLayout(format!(
                "vertex entry point `{}` reads @location({}) but no vertex layout was supplied",
                vertex.name, input.location
            ))),
            None => Ok(()),
        };
    };

    layout.validate()?;

    for input in &vertex.inputs {
        let Some(attr) = layout.attribute(input.location) else {
            return Err(Error::IncompatibleLayout(format!(
                "vertex entry point `{}` reads @location({}) which the vertex layout does not provide",
                vertex.name, input.location
            )));
        };
        let provided = NumericKind::of_vertex_format(attr.format);
        if provided != input.kind {
            return Err(Error::IncompatibleLayout(format!(
                "@location({}) is {:?} in the shader but {:?} ({provided:?}) in the layout",
                input.location, input.kind, attr.format
            )));
        }
    }
    Ok(())
}

/// The single color target sits at `@location(0)`; its numeric class must
/// match the target format.
fn check_fragment_outputs(fragment: &EntryPointInfo, format: wgpu::TextureFormat) -> Result<()> {
    let Some(target) = NumericKind::of_texture_format(format) else {
        return Err(Error::IncompatibleLayout(format!(
            "{format:?} cannot be used as a color target"
        )));
    };

    for output in &fragment.outputs {
        if output.location != 0 {
            return Err(Error::IncompatibleLayout(format!(
                "fragment entry point `{}` writes @location({}) but the pipeline has one color target",
                fragment.name, output.location
            )));
        }
        if output.kind != target {
            return Err(Error::IncompatibleLayout(format!(
                "fragment entry point `{}` writes {:?} values into a {format:?} target",
                fragment.name, output.kind
            )));
        }
    }
    Ok(())
}

