use std::sync::Arc;

use crate::backend::Backend;
use crate::device::Device;
use crate::error::{Error, Result};
use crate::id::ResourceId;

use super::reflect::{self, ShaderReflection};

/// Compiled WGSL with its reflected interface.
///
/// Cloning is cheap; every pipeline built from a program keeps it alive.
pub struct ShaderProgram<B: Backend> {
    inner: Arc<ShaderInner<B>>,
}

struct ShaderInner<B: Backend> {
    id: ResourceId,
    label: Option<String>,
    reflection: ShaderReflection,
    raw: B::Shader,
}

impl<B: Backend> Clone for ShaderProgram<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: Backend> ShaderProgram<B> {
    #[inline]
    pub fn id(&self) -> ResourceId {
        self.inner.id
    }

    pub fn label(&self) -> Option<&str> {
        self.inner.label.as_deref()
    }

    pub fn reflection(&self) -> &ShaderReflection {
        &self.inner.reflection
    }

    pub fn raw(&self) -> &B::Shader {
        &self.inner.raw
    }
}

impl<B: Backend> Device<B> {
    /// Parses and validates WGSL `source`, then hands it to the backend.
    ///
    /// Syntax and type errors come back as `Error::ShaderCompile` with the
    /// rendered diagnostics.
    pub fn compile_shader(&self, label: Option<&str>, source: &str) -> Result<ShaderProgram<B>> {
        let module = naga::front::wgsl::parse_str(source)
            .map_err(|e| Error::ShaderCompile(e.emit_to_string(source)))?;

        let info = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::default(),
        )
        .validate(&module)
        .map_err(|e| Error::ShaderCompile(e.emit_to_string(source)))?;

        let reflection = reflect::reflect(&module, &info);
        let raw = self.backend().create_shader(label, source);

        let id = ResourceId::next();
        log::debug!(
            "shader {id} `{}` compiled: entry points {:?}",
            label.unwrap_or("unlabelled"),
            reflection
                .entry_points()
                .iter()
                .map(|ep| ep.name.as_str())
                .collect::<Vec<_>>()
        );

        Ok(ShaderProgram {
            inner: Arc::new(ShaderInner {
                id,
                label: label.map(str::to_string),
                reflection,
                raw,
            }),
        })
    }
}
