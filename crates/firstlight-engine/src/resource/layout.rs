use bytemuck::Pod;

use crate::error::{Error, Result};

const VERTEX_STRIDE_ALIGNMENT: u64 = 4;

/// Strided layout of one vertex buffer, consumed by fixed-function attribute fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexLayout {
    stride: u64,
    step_mode: wgpu::VertexStepMode,
    attributes: Vec<wgpu::VertexAttribute>,
}

impl VertexLayout {
    /// Describes per-vertex records of `stride` bytes.
    ///
    /// The layout is checked when a pipeline is built from it.
    pub fn new(stride: u64, attributes: impl Into<Vec<wgpu::VertexAttribute>>) -> Self {
        Self {
            stride,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: attributes.into(),
        }
    }

    /// Tightly packs `(shader_location, format)` pairs in order.
    pub fn packed(attributes: &[(u32, wgpu::VertexFormat)]) -> Self {
        let mut offset = 0;
        let attributes: Vec<_> = attributes
            .iter()
            .map(|&(shader_location, format)| {
                let attr = wgpu::VertexAttribute {
                    format,
                    offset,
                    shader_location,
                };
                offset += format.size();
                attr
            })
            .collect();
        Self::new(offset, attributes)
    }

    #[inline]
    pub fn stride(&self) -> u64 {
        self.stride
    }

    pub fn attributes(&self) -> &[wgpu::VertexAttribute] {
        &self.attributes
    }

    /// Returns the attribute feeding `@location(location)`.
    pub fn attribute(&self, location: u32) -> Option<&wgpu::VertexAttribute> {
        self.attributes.iter().find(|a| a.shader_location == location)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.attributes.is_empty() {
            return Err(Error::IncompatibleLayout(
                "vertex layout declares no attributes".to_string(),
            ));
        }
        if self.stride == 0 || self.stride % VERTEX_STRIDE_ALIGNMENT != 0 {
            return Err(Error::IncompatibleLayout(format!(
                "vertex stride {} is not a positive multiple of {VERTEX_STRIDE_ALIGNMENT}",
                self.stride
            )));
        }

        for (i, attr) in self.attributes.iter().enumerate() {
            let size = attr.format.size();
            if attr.offset % size.min(4) != 0 {
                return Err(Error::IncompatibleLayout(format!(
                    "attribute @location({}) offset {} is misaligned for {:?}",
                    attr.shader_location, attr.offset, attr.format
                )));
            }
            if attr.offset + size > self.stride {
                return Err(Error::IncompatibleLayout(format!(
                    "attribute @location({}) ends at byte {} past stride {}",
                    attr.shader_location,
                    attr.offset + size,
                    self.stride
                )));
            }
            if self.attributes[..i]
                .iter()
                .any(|a| a.shader_location == attr.shader_location)
            {
                return Err(Error::IncompatibleLayout(format!(
                    "@location({}) is declared twice",
                    attr.shader_location
                )));
            }
        }
        Ok(())
    }

    pub(crate) fn as_wgpu(&self) -> wgpu::VertexBufferLayout<'_> {
        wgpu::VertexBufferLayout {
            array_stride: self.stride,
            step_mode: self.step_mode,
            attributes: &self.attributes,
        }
    }
}

/// One field of a storage-buffer record.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct StorageField {
    pub format: wgpu::VertexFormat,
    pub offset: u64,
}

/// Host-side description of the records a shader reads from a storage buffer.
///
/// Offsets and stride follow WGSL's layout rules for structures in the storage
/// address space, so `struct { pos: vec3f }` occupies 16 bytes, not 12.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    stride: u64,
    fields: Vec<StorageField>,
}

impl StorageLayout {
    /// Lays out a WGSL structure whose members have the given formats, in order.
    ///
    /// Only 32-bit scalar and vector members are host-shareable here.
    pub fn for_struct(members: &[wgpu::VertexFormat]) -> Result<Self> {
        if members.is_empty() {
            return Err(Error::IncompatibleLayout(
                "storage record declares no fields".to_string(),
            ));
        }

        let mut fields = Vec::with_capacity(members.len());
        let mut end = 0u64;
        let mut struct_align = 0u64;
        for &format in members {
            let (size, align) = wgsl_size_align(format).ok_or_else(|| {
                Error::IncompatibleLayout(format!(
                    "{format:?} cannot be shared with a storage buffer structure"
                ))
            })?;
            let offset = end.next_multiple_of(align);
            fields.push(StorageField { format, offset });
            end = offset + size;
            struct_align = struct_align.max(align);
        }

        Ok(Self {
            stride: end.next_multiple_of(struct_align),
            fields,
        })
    }

    /// Distance in bytes between consecutive records (the WGSL array stride).
    #[inline]
    pub fn stride(&self) -> u64 {
        self.stride
    }

    pub fn fields(&self) -> &[StorageField] {
        &self.fields
    }

    /// Size in bytes of `records` consecutive records.
    #[inline]
    pub fn byte_len(&self, records: u64) -> u64 {
        self.stride * records
    }

    /// Packs unpadded field components into padded records.
    ///
    /// `values` holds every field's components, record after record, with no
    /// padding; the result has the padding the shader expects.
    pub fn pack<T: Pod>(&self, values: &[T]) -> Result<Vec<u8>> {
        if size_of::<T>() != 4 {
            return Err(Error::IncompatibleLayout(
                "storage records are packed from 32-bit components".to_string(),
            ));
        }

        let per_record: usize = self.fields.iter().map(|f| components(f.format)).sum();
        if per_record == 0 || values.len() % per_record != 0 {
            return Err(Error::OutOfBounds(format!(
                "{} components do not fill whole records of {per_record}",
                values.len()
            )));
        }

        let stride = self.stride as usize;
        let mut out = vec![0u8; values.len() / per_record * stride];
        for (record, chunk) in values.chunks_exact(per_record).enumerate() {
            let mut cursor = 0;
            for field in &self.fields {
                let n = components(field.format);
                let bytes: &[u8] = bytemuck::cast_slice(&chunk[cursor..cursor + n]);
                let start = record * stride + field.offset as usize;
                out[start..start + bytes.len()].copy_from_slice(bytes);
                cursor += n;
            }
        }
        Ok(out)
    }
}

/// WGSL (size, alignment) of a 32-bit member in the storage address space.
fn wgsl_size_align(format: wgpu::VertexFormat) -> Option<(u64, u64)> {
    use wgpu::VertexFormat as F;
    match format {
        F::Float32 | F::Uint32 | F::Sint32 => Some((4, 4)),
        F::Float32x2 | F::Uint32x2 | F::Sint32x2 => Some((8, 8)),
        F::Float32x3 | F::Uint32x3 | F::Sint32x3 => Some((12, 16)),
        F::Float32x4 | F::Uint32x4 | F::Sint32x4 => Some((16, 16)),
        _ => None,
    }
}

fn components(format: wgpu::VertexFormat) -> usize {
    (format.size() / 4) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use wgpu::VertexFormat as F;

    #[test]
    fn vec4_record_is_sixteen_bytes() {
        let layout = StorageLayout::for_struct(&[F::Float32x4]).unwrap();
        assert_eq!(layout.stride(), 16);
        assert_eq!(layout.byte_len(6), 96);
    }

    #[test]
    fn vec3_record_is_padded_to_sixteen_bytes() {
        let layout = StorageLayout::for_struct(&[F::Float32x3]).unwrap();
        assert_eq!(layout.stride(), 16);

        let packed = layout.pack(&[1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        assert_eq!(packed.len(), 32);
        let floats: &[f32] = bytemuck::cast_slice(&packed);
        assert_eq!(floats, &[1.0, 2.0, 3.0, 0.0, 4.0, 5.0, 6.0, 0.0]);
    }

    #[test]
    fn members_follow_wgsl_alignment() {
        let a = StorageLayout::for_struct(&[F::Float32x3, F::Float32]).unwrap();
        assert_eq!(a.fields()[1].offset, 12);
        assert_eq!(a.stride(), 16);

        let b = StorageLayout::for_struct(&[F::Float32, F::Float32x3]).unwrap();
        assert_eq!(b.fields()[1].offset, 16);
        assert_eq!(b.stride(), 32);

        let c = StorageLayout::for_struct(&[F::Float32x2, F::Uint32]).unwrap();
        assert_eq!(c.fields()[1].offset, 8);
        assert_eq!(c.stride(), 16);
    }

    #[test]
    fn non_shareable_members_are_rejected() {
        let err = StorageLayout::for_struct(&[F::Unorm8x4]).unwrap_err();
        assert!(matches!(err, Error::IncompatibleLayout(_)));
        assert!(StorageLayout::for_struct(&[]).is_err());
    }

    #[test]
    fn partial_records_are_out_of_bounds() {
        let layout = StorageLayout::for_struct(&[F::Float32x4]).unwrap();
        let err = layout.pack(&[0.0f32; 7]).unwrap_err();
        assert!(matches!(err, Error::OutOfBounds(_)));
    }

    #[test]
    fn packed_vertex_layout_matches_attr_array() {
        let layout = VertexLayout::packed(&[(0, F::Float32x3), (1, F::Float32x4)]);
        assert_eq!(layout.stride(), 28);
        assert_eq!(layout.attribute(1).map(|a| a.offset), Some(12));
        layout.validate().unwrap();
    }

    #[test]
    fn vertex_layout_rejects_overlong_attributes() {
        let layout = VertexLayout::new(
            8,
            vec![wgpu::VertexAttribute {
                format: F::Float32x3,
                offset: 0,
                shader_location: 0,
            }],
        );
        assert!(matches!(layout.validate(), Err(Error::IncompatibleLayout(_))));
    }

    #[test]
    fn vertex_layout_rejects_duplicate_locations() {
        let layout = VertexLayout::new(
            16,
            vec![
                wgpu::VertexAttribute { format: F::Float32x2, offset: 0, shader_location: 0 },
                wgpu::VertexAttribute { format: F::Float32x2, offset: 8, shader_location: 0 },
            ],
        );
        assert!(matches!(layout.validate(), Err(Error::IncompatibleLayout(_))));
    }
}
