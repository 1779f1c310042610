use crate::error::{Error, Result};

use super::reflect::{EntryPointInfo, ResourceUse};

/// Buffer binding type of one slot.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SlotKind {
    Storage { read_only: bool },
    Uniform,
}

impl SlotKind {
    /// Usage a buffer needs to be bound to a slot of this kind.
    pub fn required_usage(self) -> wgpu::BufferUsages {
        match self {
            Self::Storage { .. } => wgpu::BufferUsages::STORAGE,
            Self::Uniform => wgpu::BufferUsages::UNIFORM,
        }
    }

    pub(crate) fn as_wgpu(self) -> wgpu::BufferBindingType {
        match self {
            Self::Storage { read_only } => wgpu::BufferBindingType::Storage { read_only },
            Self::Uniform => wgpu::BufferBindingType::Uniform,
        }
    }
}

/// One slot of bind group 0.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BindingSlot {
    pub binding: u32,
    pub kind: SlotKind,
    pub visibility: wgpu::ShaderStages,
    /// Record stride the shader indexes this buffer with, when it declares a
    /// runtime-sized array here.
    pub record_stride: Option<u64>,
}

impl BindingSlot {
    pub fn new(binding: u32, kind: SlotKind, visibility: wgpu::ShaderStages) -> Self {
        Self {
            binding,
            kind,
            visibility,
            record_stride: None,
        }
    }
}

/// How a pipeline gets its binding layout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum BindingLayoutMode {
    /// Caller-declared slots. Every slot the shader uses must be among them.
    Explicit(Vec<BindingSlot>),
    /// Slots inferred from what the entry points use ("auto" layout).
    #[default]
    DeriveFromShader,
}

/// Resolved slots of bind group 0, sorted by binding index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingLayout {
    derived: bool,
    slots: Vec<BindingSlot>,
}

impl BindingLayout {
    pub fn slots(&self) -> &[BindingSlot] {
        &self.slots
    }

    pub fn slot(&self, binding: u32) -> Option<&BindingSlot> {
        self.slots.iter().find(|s| s.binding == binding)
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Whether the layout was inferred from the shader rather than declared.
    pub fn is_derived(&self) -> bool {
        self.derived
    }

    /// Resolves the layout for a vertex + fragment entry point pair.
    pub(crate) fn resolve(
        mode: &BindingLayoutMode,
        stages: [(&EntryPointInfo, wgpu::ShaderStages); 2],
    ) -> Result<Self> {
        let used = merged_uses(stages)?;

        match mode {
            BindingLayoutMode::DeriveFromShader => {
                log::debug!("derived {} binding slot(s) from shader", used.len());
                Ok(Self {
                    derived: true,
                    slots: used,
                })
            }
            BindingLayoutMode::Explicit(declared) => {
                let mut slots = declared.clone();
                slots.sort_by_key(|s| s.binding);
                if let Some(pair) = slots.windows(2).find(|w| w[0].binding == w[1].binding) {
                    return Err(Error::IncompatibleLayout(format!(
                        "@binding({}) is declared twice",
                        pair[0].binding
                    )));
                }

                for use_ in &used {
                    let Some(slot) = slots.iter_mut().find(|s| s.binding == use_.binding) else {
                        return Err(Error::IncompatibleLayout(format!(
                            "shader uses @group(0) @binding({}) but the layout does not declare it",
                            use_.binding
                        )));
                    };
                    if slot.kind != use_.kind {
                        return Err(Error::IncompatibleLayout(format!(
                            "@binding({}) is declared {:?} but the shader uses {:?}",
                            use_.binding, slot.kind, use_.kind
                        )));
                    }
                    if !slot.visibility.contains(use_.visibility) {
                        return Err(Error::IncompatibleLayout(format!(
                            "@binding({}) is not visible to {:?}",
                            use_.binding, use_.visibility
                        )));
                    }
                    slot.record_stride = slot.record_stride.or(use_.record_stride);
                }

                Ok(Self {
                    derived: false,
                    slots,
                })
            }
        }
    }
}

/// Buffer slots used by the given stages, merged by binding index.
fn merged_uses(stages: [(&EntryPointInfo, wgpu::ShaderStages); 2]) -> Result<Vec<BindingSlot>> {
    let mut slots: Vec<BindingSlot> = Vec::new();
    for (entry, stage) in stages {
        for res in &entry.resources {
            let ResourceUse {
                group,
                binding,
                kind,
                record_stride,
            } = *res;
            if group != 0 {
                return Err(Error::IncompatibleLayout(format!(
                    "`{}` uses @group({group}); only bind group 0 is supported",
                    entry.name
                )));
            }
            let Some(kind) = kind else {
                return Err(Error::IncompatibleLayout(format!(
                    "`{}` binds a non-buffer resource at @binding({binding})",
                    entry.name
                )));
            };

            match slots.iter_mut().find(|s| s.binding == binding) {
                Some(slot) if slot.kind != kind => {
                    return Err(Error::IncompatibleLayout(format!(
                        "@binding({binding}) is used as {:?} and {kind:?}",
                        slot.kind
                    )));
                }
                Some(slot) => slot.visibility |= stage,
                None => slots.push(BindingSlot {
                    binding,
                    kind,
                    visibility: stage,
                    record_stride,
                }),
            }
        }
    }
    slots.sort_by_key(|s| s.binding);
    Ok(slots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::reflect::Stage;

    fn entry(name: &str, stage: Stage, resources: Vec<ResourceUse>) -> EntryPointInfo {
        EntryPointInfo {
            name: name.to_string(),
            stage,
            inputs: Vec::new(),
            outputs: Vec::new(),
            resources,
        }
    }

    fn storage_use(binding: u32) -> ResourceUse {
        ResourceUse {
            group: 0,
            binding,
            kind: Some(SlotKind::Storage { read_only: true }),
            record_stride: Some(16),
        }
    }

    #[test]
    fn derived_layout_merges_visibility() {
        let vs = entry("vs", Stage::Vertex, vec![storage_use(0)]);
        let fs = entry("fs", Stage::Fragment, vec![storage_use(0)]);
        let layout = BindingLayout::resolve(
            &BindingLayoutMode::DeriveFromShader,
            [(&vs, wgpu::ShaderStages::VERTEX), (&fs, wgpu::ShaderStages::FRAGMENT)],
        )
        .unwrap();

        assert!(layout.is_derived());
        assert_eq!(layout.slots().len(), 1);
        assert_eq!(layout.slots()[0].visibility, wgpu::ShaderStages::VERTEX_FRAGMENT);
        assert_eq!(layout.slots()[0].record_stride, Some(16));
    }

    #[test]
    fn explicit_layout_must_cover_shader_uses() {
        let vs = entry("vs", Stage::Vertex, vec![storage_use(0)]);
        let fs = entry("fs", Stage::Fragment, vec![]);
        let mode = BindingLayoutMode::Explicit(vec![BindingSlot::new(
            1,
            SlotKind::Storage { read_only: true },
            wgpu::ShaderStages::VERTEX,
        )]);
        let err = BindingLayout::resolve(
            &mode,
            [(&vs, wgpu::ShaderStages::VERTEX), (&fs, wgpu::ShaderStages::FRAGMENT)],
        )
        .unwrap_err();
        assert!(matches!(err, Error::IncompatibleLayout(_)));
    }

    #[test]
    fn explicit_layout_picks_up_record_stride() {
        let vs = entry("vs", Stage::Vertex, vec![storage_use(0)]);
        let fs = entry("fs", Stage::Fragment, vec![]);
        let mode = BindingLayoutMode::Explicit(vec![BindingSlot::new(
            0,
            SlotKind::Storage { read_only: true },
            wgpu::ShaderStages::VERTEX,
        )]);
        let layout = BindingLayout::resolve(
            &mode,
            [(&vs, wgpu::ShaderStages::VERTEX), (&fs, wgpu::ShaderStages::FRAGMENT)],
        )
        .unwrap();
        assert!(!layout.is_derived());
        assert_eq!(layout.slot(0).and_then(|s| s.record_stride), Some(16));
    }

    #[test]
    fn only_group_zero_is_supported() {
        let mut res = storage_use(0);
        res.group = 1;
        let vs = entry("vs", Stage::Vertex, vec![res]);
        let fs = entry("fs", Stage::Fragment, vec![]);
        assert!(
            BindingLayout::resolve(
                &BindingLayoutMode::DeriveFromShader,
                [(&vs, wgpu::ShaderStages::VERTEX), (&fs, wgpu::ShaderStages::FRAGMENT)],
            )
            .is_err()
        );
    }
}
