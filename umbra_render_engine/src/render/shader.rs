/// Shader trait and shader stage sets

use std::sync::Arc;

/// Programmable pipeline stage a shader runs in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    TessellationControl,
    TessellationEvaluation,
    Geometry,
    Fragment,
}

/// Descriptor for creating a shader
///
/// The engine consumes precompiled SPIR-V blobs; compiling and
/// validating shader source is the loader's job, not the core's.
pub struct ShaderDesc {
    /// Precompiled shader bytecode
    pub code: Vec<u8>,
    /// Stage the shader runs in
    pub stage: ShaderStage,
    /// Entry point name, usually "main"
    pub entry_point: String,
}

impl ShaderDesc {
    pub fn new(code: Vec<u8>, stage: ShaderStage) -> Self {
        Self {
            code,
            stage,
            entry_point: "main".to_string(),
        }
    }
}

/// Shader module resource trait
pub trait Shader: Send + Sync {
    /// Stage this shader runs in
    fn stage(&self) -> ShaderStage;
}

/// A set of shaders to be used in one pipeline
///
/// One slot per programmable stage; `None` means the stage is unused.
/// Only the vertex stage is mandatory - the shadow pass pipeline, for
/// instance, runs with nothing else.
#[derive(Clone)]
pub struct ShaderSet {
    pub vertex: Arc<dyn Shader>,
    pub tessellation_control: Option<Arc<dyn Shader>>,
    pub tessellation_evaluation: Option<Arc<dyn Shader>>,
    pub geometry: Option<Arc<dyn Shader>>,
    pub fragment: Option<Arc<dyn Shader>>,
}

impl ShaderSet {
    /// A set with only a vertex stage
    pub fn vertex_only(vertex: Arc<dyn Shader>) -> Self {
        Self {
            vertex,
            tessellation_control: None,
            tessellation_evaluation: None,
            geometry: None,
            fragment: None,
        }
    }

    /// The common vertex + fragment pair
    pub fn vertex_fragment(vertex: Arc<dyn Shader>, fragment: Arc<dyn Shader>) -> Self {
        Self {
            vertex,
            tessellation_control: None,
            tessellation_evaluation: None,
            geometry: None,
            fragment: Some(fragment),
        }
    }

    /// All present shaders in pipeline-stage order
    pub fn stages(&self) -> Vec<Arc<dyn Shader>> {
        let mut stages = vec![self.vertex.clone()];
        if let Some(s) = &self.tessellation_control {
            stages.push(s.clone());
        }
        if let Some(s) = &self.tessellation_evaluation {
            stages.push(s.clone());
        }
        if let Some(s) = &self.geometry {
            stages.push(s.clone());
        }
        if let Some(s) = &self.fragment {
            stages.push(s.clone());
        }
        stages
    }

    /// Whether the set includes tessellation stages
    pub fn has_tessellation(&self) -> bool {
        self.tessellation_control.is_some() || self.tessellation_evaluation.is_some()
    }
}

#[cfg(test)]
#[path = "shader_tests.rs"]
mod tests;
