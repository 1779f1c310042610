//! Interface reflection over a validated naga module.

use naga::{AddressSpace, Binding, ScalarKind, TypeInner};

use super::binding::SlotKind;

/// Pipeline stage of an entry point.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Stage {
    Vertex,
    Fragment,
    Compute,
    Other,
}

/// Numeric class of a location-bound value.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum NumericKind {
    Float,
    Sint,
    Uint,
    Other,
}

impl NumericKind {
    /// Class of the values a vertex format delivers to the shader.
    pub fn of_vertex_format(format: wgpu::VertexFormat) -> Self {
        use wgpu::VertexFormat as F;
        match format {
            F::Uint8
            | F::Uint8x2
            | F::Uint8x4
            | F::Uint16
            | F::Uint16x2
            | F::Uint16x4
            | F::Uint32
            | F::Uint32x2
            | F::Uint32x3
            | F::Uint32x4 => Self::Uint,
            F::Sint8
            | F::Sint8x2
            | F::Sint8x4
            | F::Sint16
            | F::Sint16x2
            | F::Sint16x4
            | F::Sint32
            | F::Sint32x2
            | F::Sint32x3
            | F::Sint32x4 => Self::Sint,
            _ => Self::Float,
        }
    }

    /// Class of the values a color target of `format` accepts. `None` for
    /// formats that cannot be color targets.
    pub fn of_texture_format(format: wgpu::TextureFormat) -> Option<Self> {
        match format.sample_type(None, None)? {
            wgpu::TextureSampleType::Float { .. } => Some(Self::Float),
            wgpu::TextureSampleType::Sint => Some(Self::Sint),
            wgpu::TextureSampleType::Uint => Some(Self::Uint),
            wgpu::TextureSampleType::Depth => None,
        }
    }
}

/// A `@location(n)` value read or written by an entry point.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LocationValue {
    pub location: u32,
    pub kind: NumericKind,
    pub components: u32,
}

/// A `@group(g) @binding(b)` resource an entry point actually uses.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ResourceUse {
    pub group: u32,
    pub binding: u32,
    /// `None` for non-buffer resources (textures, samplers).
    pub kind: Option<SlotKind>,
    /// Element stride of a runtime-sized array bound here.
    pub record_stride: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPointInfo {
    pub name: String,
    pub stage: Stage,
    pub inputs: Vec<LocationValue>,
    /// `@location` outputs; for fragment entry points, one per color target.
    pub outputs: Vec<LocationValue>,
    pub resources: Vec<ResourceUse>,
}

/// Entry points and their interfaces, as declared by the shader source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderReflection {
    entry_points: Vec<EntryPointInfo>,
}

impl ShaderReflection {
    pub fn entry_points(&self) -> &[EntryPointInfo] {
        &self.entry_points
    }

    pub fn entry_point(&self, name: &str) -> Option<&EntryPointInfo> {
        self.entry_points.iter().find(|ep| ep.name == name)
    }
}

pub(crate) fn reflect(module: &naga::Module, info: &naga::valid::ModuleInfo) -> ShaderReflection {
    let entry_points = module
        .entry_points
        .iter()
        .enumerate()
        .map(|(index, ep)| {
            let stage = match ep.stage {
                naga::ShaderStage::Vertex => Stage::Vertex,
                naga::ShaderStage::Fragment => Stage::Fragment,
                naga::ShaderStage::Compute => Stage::Compute,
                _ => Stage::Other,
            };

            let mut inputs: Vec<LocationValue> = ep
                .function
                .arguments
                .iter()
                .flat_map(|arg| location_values(module, arg.binding.as_ref(), arg.ty))
                .collect();
            inputs.sort_by_key(|i| i.location);

            let mut outputs: Vec<LocationValue> = ep
                .function
                .result
                .iter()
                .flat_map(|result| location_values(module, result.binding.as_ref(), result.ty))
                .collect();
            outputs.sort_by_key(|o| o.location);

            let function_info = info.get_entry_point(index);
            let resources = module
                .global_variables
                .iter()
                .filter(|(handle, _)| !function_info[*handle].is_empty())
                .filter_map(|(_, var)| {
                    let binding = var.binding.as_ref()?;
                    let kind = match var.space {
                        AddressSpace::Storage { access } => Some(SlotKind::Storage {
                            read_only: !access.contains(naga::StorageAccess::STORE),
                        }),
                        AddressSpace::Uniform => Some(SlotKind::Uniform),
                        _ => None,
                    };
                    Some(ResourceUse {
                        group: binding.group,
                        binding: binding.binding,
                        kind,
                        record_stride: runtime_array_stride(module, var.ty),
                    })
                })
                .collect();

            EntryPointInfo {
                name: ep.name.clone(),
                stage,
                inputs,
                outputs,
                resources,
            }
        })
        .collect();

    ShaderReflection { entry_points }
}

/// Location-bound values of one argument or result. Struct types without a
/// binding of their own contribute their members.
fn location_values(
    module: &naga::Module,
    binding: Option<&Binding>,
    ty: naga::Handle<naga::Type>,
) -> Vec<LocationValue> {
    match binding {
        Some(binding) => location_value(module, binding, ty).into_iter().collect(),
        None => match &module.types[ty].inner {
            TypeInner::Struct { members, .. } => members
                .iter()
                .filter_map(|m| {
                    m.binding
                        .as_ref()
                        .and_then(|b| location_value(module, b, m.ty))
                })
                .collect(),
            _ => Vec::new(),
        },
    }
}

fn location_value(
    module: &naga::Module,
    binding: &Binding,
    ty: naga::Handle<naga::Type>,
) -> Option<LocationValue> {
    let Binding::Location { location, .. } = binding else {
        return None;
    };
    let (kind, components) = match &module.types[ty].inner {
        TypeInner::Scalar(scalar) => (scalar.kind, 1),
        TypeInner::Vector { size, scalar } => (scalar.kind, *size as u32),
        _ => {
            return Some(LocationValue {
                location: *location,
                kind: NumericKind::Other,
                components: 0,
            });
        }
    };
    let kind = match kind {
        ScalarKind::Float | ScalarKind::AbstractFloat => NumericKind::Float,
        ScalarKind::Sint | ScalarKind::AbstractInt => NumericKind::Sint,
        ScalarKind::Uint => NumericKind::Uint,
        _ => NumericKind::Other,
    };
    Some(LocationValue {
        location: *location,
        kind,
        components,
    })
}

fn runtime_array_stride(module: &naga::Module, ty: naga::Handle<naga::Type>) -> Option<u64> {
    match &module.types[ty].inner {
        TypeInner::Array {
            size: naga::ArraySize::Dynamic,
            stride,
            ..
        } => Some(u64::from(*stride)),
        TypeInner::Struct { members, .. } => members
            .last()
            .and_then(|m| runtime_array_stride(module, m.ty)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reflect_source(source: &str) -> ShaderReflection {
        let module = naga::front::wgsl::parse_str(source).unwrap();
        let info = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::default(),
        )
        .validate(&module)
        .unwrap();
        reflect(&module, &info)
    }

    #[test]
    fn location_inputs_and_builtins() {
        let r = reflect_source(
            "@vertex fn vs(@location(1) uv: vec2f, @location(0) pos: vec3f, @builtin(vertex_index) i: u32) -> @builtin(position) vec4f { return vec4f(pos, uv.x); }
             @fragment fn fs() -> @location(0) vec4f { return vec4f(1.0); }",
        );
        let vs = r.entry_point("vs").unwrap();
        assert_eq!(vs.stage, Stage::Vertex);
        assert_eq!(
            vs.inputs,
            vec![
                LocationValue {
                    location: 0,
                    kind: NumericKind::Float,
                    components: 3,
                },
                LocationValue {
                    location: 1,
                    kind: NumericKind::Float,
                    components: 2,
                },
            ]
        );
        assert_eq!(r.entry_point("fs").unwrap().stage, Stage::Fragment);
    }

    #[test]
    fn struct_inputs_are_flattened() {
        let r = reflect_source(
            "struct In { @location(0) pos: vec4f, @location(2) id: u32 };
             @vertex fn vs(v: In) -> @builtin(position) vec4f { return v.pos; }",
        );
        let kinds: Vec<_> = r.entry_point("vs").unwrap().inputs.iter().map(|i| i.kind).collect();
        assert_eq!(kinds, vec![NumericKind::Float, NumericKind::Uint]);
    }

    #[test]
    fn used_storage_array_is_reflected_with_stride() {
        let r = reflect_source(
            "struct Vertex { pos: vec3f };
             @group(0) @binding(0) var<storage, read> vertices: array<Vertex>;
             @group(0) @binding(1) var<uniform> unused: vec4f;
             @vertex fn vs(@builtin(vertex_index) i: u32) -> @builtin(position) vec4f { return vec4f(vertices[i].pos, 1.0); }",
        );
        let vs = r.entry_point("vs").unwrap();
        assert!(vs.inputs.is_empty());
        assert_eq!(
            vs.resources,
            vec![ResourceUse {
                group: 0,
                binding: 0,
                kind: Some(SlotKind::Storage { read_only: true }),
                record_stride: Some(16),
            }]
        );
    }

    #[test]
    fn fragment_outputs_are_reflected() {
        let r = reflect_source(
            "struct Out { @location(0) color: vec4u, @builtin(frag_depth) depth: f32 };
             @fragment fn fs() -> Out { return Out(vec4u(1u), 0.5); }
             @fragment fn plain() -> @location(0) vec4f { return vec4f(1.0); }",
        );
        let kinds = |name: &str| -> Vec<(u32, NumericKind)> {
            r.entry_point(name)
                .unwrap()
                .outputs
                .iter()
                .map(|o| (o.location, o.kind))
                .collect()
        };
        assert_eq!(kinds("fs"), vec![(0, NumericKind::Uint)]);
        assert_eq!(kinds("plain"), vec![(0, NumericKind::Float)]);
    }

    #[test]
    fn texture_formats_map_to_numeric_kinds() {
        use wgpu::TextureFormat as T;
        assert_eq!(NumericKind::of_texture_format(T::Bgra8Unorm), Some(NumericKind::Float));
        assert_eq!(NumericKind::of_texture_format(T::Rgba8Uint), Some(NumericKind::Uint));
        assert_eq!(NumericKind::of_texture_format(T::R32Sint), Some(NumericKind::Sint));
        assert_eq!(NumericKind::of_texture_format(T::Depth32Float), None);
    }
}
