use crate::backend::Backend;
use crate::device::Device;
use crate::error::{Error, Result};
use crate::id::ResourceId;

use super::StorageLayout;

/// Size, usage and label of a new buffer.
#[derive(Debug, Copy, Clone)]
pub struct BufferDescriptor<'a> {
    pub label: Option<&'a str>,
    pub size: u64,
    pub usage: wgpu::BufferUsages,
}

/// Fixed-size, fixed-usage allocation owned by a device.
///
/// Contents change only through `Device::write_buffer` / `Device::write_records`.
pub struct Buffer<B: Backend> {
    id: ResourceId,
    label: Option<String>,
    size: u64,
    usage: wgpu::BufferUsages,
    records: Option<StorageLayout>,
    raw: B::Buffer,
}

impl<B: Backend> Buffer<B> {
    #[inline]
    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    #[inline]
    pub fn usage(&self) -> wgpu::BufferUsages {
        self.usage
    }

    /// Record layout the buffer was created with, if it holds storage records.
    pub fn record_layout(&self) -> Option<&StorageLayout> {
        self.records.as_ref()
    }

    pub fn raw(&self) -> &B::Buffer {
        &self.raw
    }

    pub(crate) fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or("unlabelled")
    }

    pub(crate) fn require_usage(&self, required: wgpu::BufferUsages) -> Result<()> {
        if self.usage.contains(required) {
            Ok(())
        } else {
            Err(Error::MissingUsage {
                label: self.display_label().to_string(),
                required,
                actual: self.usage,
            })
        }
    }
}

impl<B: Backend> Device<B> {
    /// Allocates a buffer. Usage and size are fixed for its lifetime.
    ///
    /// Sizes above the device's `max_buffer_size` are a `Configuration` error.
    pub fn create_buffer(&self, desc: &BufferDescriptor<'_>) -> Result<Buffer<B>> {
        let label = desc.label.unwrap_or("unlabelled");
        if desc.usage.is_empty() {
            return Err(Error::Configuration(format!(
                "buffer `{label}` declares no usage"
            )));
        }
        let max = self.limits().max_buffer_size;
        if desc.size > max {
            return Err(Error::Configuration(format!(
                "buffer `{label}` asks for {} bytes, the device allows at most {max}",
                desc.size
            )));
        }

        let id = ResourceId::next();
        let raw = self.backend().create_buffer(desc)?;
        log::debug!("buffer {id} `{label}`: {} bytes, {:?}", desc.size, desc.usage);

        Ok(Buffer {
            id,
            label: desc.label.map(str::to_string),
            size: desc.size,
            usage: desc.usage,
            records: None,
            raw,
        })
    }

    /// Allocates room for `records` storage records laid out as `layout`.
    ///
    /// The layout stays attached to the buffer: record writes are checked
    /// against its stride and bind groups check it against the shader.
    pub fn create_record_buffer(
        &self,
        label: Option<&str>,
        layout: &StorageLayout,
        records: u64,
        usage: wgpu::BufferUsages,
    ) -> Result<Buffer<B>> {
        let mut buffer = self.create_buffer(&BufferDescriptor {
            label,
            size: layout.byte_len(records),
            usage,
        })?;
        buffer.records = Some(layout.clone());
        Ok(buffer)
    }

    /// Copies `data` into `buffer` starting at `offset`.
    ///
    /// Requires `COPY_DST` usage and `offset + data.len() <= buffer.size()`.
    /// Offset and length must be multiples of `wgpu::COPY_BUFFER_ALIGNMENT`,
    /// and of the record stride when the buffer holds storage records.
    pub fn write_buffer(&self, buffer: &Buffer<B>, offset: u64, data: &[u8]) -> Result<()> {
        buffer.require_usage(wgpu::BufferUsages::COPY_DST)?;

        let len = data.len() as u64;
        let fits = offset
            .checked_add(len)
            .is_some_and(|end| end <= buffer.size);
        if !fits {
            return Err(Error::OutOfBounds(format!(
                "write of {len} bytes at offset {offset} exceeds buffer `{}` ({} bytes)",
                buffer.display_label(),
                buffer.size
            )));
        }
        if offset % wgpu::COPY_BUFFER_ALIGNMENT != 0 || len % wgpu::COPY_BUFFER_ALIGNMENT != 0 {
            return Err(Error::OutOfBounds(format!(
                "write of {len} bytes at offset {offset} is not {}-byte aligned",
                wgpu::COPY_BUFFER_ALIGNMENT
            )));
        }
        if let Some(layout) = buffer.record_layout() {
            let stride = layout.stride();
            if offset % stride != 0 || len % stride != 0 {
                return Err(Error::OutOfBounds(format!(
                    "write of {len} bytes at offset {offset} does not cover whole \
                     {stride}-byte records of buffer `{}`",
                    buffer.display_label()
                )));
            }
        }

        self.backend().write_buffer(&buffer.raw, offset, data);
        log::debug!("buffer {} <- {len} bytes at {offset}", buffer.id);
        Ok(())
    }

    /// Writes whole records starting at record index `first_record`.
    ///
    /// `data` must be a whole number of records of the buffer's record stride.
    pub fn write_records(
        &self,
        buffer: &Buffer<B>,
        first_record: u64,
        data: &[u8],
    ) -> Result<()> {
        let Some(layout) = buffer.record_layout() else {
            return Err(Error::IncompatibleLayout(format!(
                "buffer `{}` was not created with a record layout",
                buffer.display_label()
            )));
        };

        let stride = layout.stride();
        let offset = first_record.checked_mul(stride).ok_or_else(|| {
            Error::OutOfBounds(format!("record index {first_record} overflows"))
        })?;

        self.write_buffer(buffer, offset, data)
    }

    /// Reads the whole buffer back, where the backend supports it.
    pub fn read_buffer(&self, buffer: &Buffer<B>) -> Option<Vec<u8>> {
        self.backend().read_buffer(&buffer.raw)
    }
}
