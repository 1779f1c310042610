//! Bind groups: concrete buffers for a pipeline's binding slots.

use crate::backend::Backend;
use crate::device::Device;
use crate::error::{Error, Result};
use crate::id::ResourceId;
use crate::pipeline::RenderPipeline;
use crate::resource::Buffer;

/// One `@binding(slot)` → buffer assignment.
pub struct SlotBinding<'a, B: Backend> {
    pub slot: u32,
    pub buffer: &'a Buffer<B>,
}

impl<'a, B: Backend> SlotBinding<'a, B> {
    pub fn new(slot: u32, buffer: &'a Buffer<B>) -> Self {
        Self { slot, buffer }
    }
}

/// Immutable set of buffers for bind group 0 of one pipeline.
pub struct BindGroup<B: Backend> {
    id: ResourceId,
    label: Option<String>,
    pipeline: ResourceId,
    raw: B::BindGroup,
}

impl<B: Backend> BindGroup<B> {
    #[inline]
    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// The pipeline whose layout this group was validated against.
    #[inline]
    pub fn pipeline(&self) -> ResourceId {
        self.pipeline
    }

    pub fn raw(&self) -> &B::BindGroup {
        &self.raw
    }
}

impl<B: Backend> Device<B> {
    /// Binds buffers to every slot of `pipeline`'s bind group 0.
    ///
    /// `slots` must cover exactly the declared slots, each buffer must carry the
    /// usage its slot needs, and buffers created with a record layout must use
    /// the record stride the shader indexes them with. Anything else is
    /// `Error::LayoutMismatch`.
    pub fn build_bind_group(
        &self,
        label: Option<&str>,
        pipeline: &RenderPipeline<B>,
        slots: &[SlotBinding<'_, B>],
    ) -> Result<BindGroup<B>> {
        let layout = pipeline.binding_layout();
        if layout.is_empty() {
            return Err(Error::LayoutMismatch(format!(
                "pipeline {} declares no binding slots",
                pipeline.id()
            )));
        }

        for (i, binding) in slots.iter().enumerate() {
            if slots[..i].iter().any(|b| b.slot == binding.slot) {
                return Err(Error::LayoutMismatch(format!(
                    "@binding({}) is bound twice",
                    binding.slot
                )));
            }
            let Some(declared) = layout.slot(binding.slot) else {
                return Err(Error::LayoutMismatch(format!(
                    "pipeline {} declares no @binding({})",
                    pipeline.id(),
                    binding.slot
                )));
            };

            let buffer = binding.buffer;
            let required = declared.kind.required_usage();
            if !buffer.usage().contains(required) {
                return Err(Error::LayoutMismatch(format!(
                    "buffer `{}` at @binding({}) lacks {required:?} usage (has {:?})",
                    buffer.display_label(),
                    binding.slot,
                    buffer.usage()
                )));
            }

            if let (Some(host), Some(shader)) = (buffer.record_layout(), declared.record_stride)
                && host.stride() != shader
            {
                return Err(Error::LayoutMismatch(format!(
                    "buffer `{}` holds {}-byte records but the shader indexes @binding({}) with stride {shader}",
                    buffer.display_label(),
                    host.stride(),
                    binding.slot
                )));
            }
        }

        if let Some(missing) = layout
            .slots()
            .iter()
            .find(|declared| !slots.iter().any(|b| b.slot == declared.binding))
        {
            return Err(Error::LayoutMismatch(format!(
                "@binding({}) of pipeline {} is not bound",
                missing.binding,
                pipeline.id()
            )));
        }

        let entries: Vec<(u32, &B::Buffer)> =
            slots.iter().map(|b| (b.slot, b.buffer.raw())).collect();
        let raw = self
            .backend()
            .create_bind_group(label, pipeline.raw(), &entries)?;

        let id = ResourceId::next();
        log::debug!(
            "bind group {id} `{}` for pipeline {}: {} slot(s)",
            label.unwrap_or("unlabelled"),
            pipeline.id(),
            entries.len()
        );

        Ok(BindGroup {
            id,
            label: label.map(str::to_string),
            pipeline: pipeline.id(),
            raw,
        })
    }
}
