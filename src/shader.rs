mod reflect;

use std::path::Path;

use pollster::FutureExt as _;

use crate::error::Error;

/// Backend diagnostics are surfaced verbatim, but never more than this many
/// characters.
pub const MAX_LOG_LEN: usize = 4000;

/// A compiled stage: the backend module plus the naga IR it was checked
/// against, kept so the link step can reflect the stage interface.
pub struct CompiledShader {
    module: wgpu::ShaderModule,
    ir: naga::Module,
}

/// Reads a whole shader source file.
pub fn load_source(path: &Path) -> Result<String, Error> {
    std::fs::read_to_string(path).map_err(|source| Error::File {
        path: path.to_owned(),
        source,
    })
}

/// Compiles a single GLSL stage into a shader module.
///
/// The returned shader is owned by the caller and is expected to be handed to
/// [`link`], which releases it after the link attempt.
pub fn compile(
    device: &wgpu::Device,
    source: &str,
    stage: naga::ShaderStage,
) -> Result<CompiledShader, Error> {
    let label = match stage {
        naga::ShaderStage::Vertex => "vertex",
        naga::ShaderStage::Fragment => "fragment",
        naga::ShaderStage::Compute => "compute",
    };

    // Compilation errors are reported through the device's error sink, not as
    // a return value, so wrap the call in a validation error scope.
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Glsl {
            shader: source.into(),
            stage,
            defines: Default::default(),
        },
    });

    if let Some(error) = device.pop_error_scope().block_on() {
        return Err(Error::Compile(truncate_log(&error.to_string())));
    }

    let ir = reflect::parse(source, stage)?;

    Ok(CompiledShader { module, ir })
}

/// Links a vertex and a fragment shader into a render pipeline, which is where
/// the backend checks that the two stage interfaces match.
///
/// Vertex buffer layouts and color targets are synthesized from the shaders'
/// own interfaces so that only genuine inter-stage mismatches fail the check.
/// Both shaders are released once the attempt has been made, whatever the
/// outcome. The pipeline itself is never used for rendering; the caller drops
/// it after inspecting the result.
pub fn link(
    device: &wgpu::Device,
    vertex: CompiledShader,
    fragment: CompiledShader,
) -> Result<wgpu::RenderPipeline, Error> {
    // one interleaved buffer keeps the layout count within device limits
    let inputs = reflect::vertex_inputs(&vertex.ir);
    let mut attributes = Vec::with_capacity(inputs.len());
    let mut stride = 0;
    for input in &inputs {
        attributes.push(wgpu::VertexAttribute {
            format: input.format,
            offset: stride,
            shader_location: input.location,
        });
        stride += input.format.size();
    }
    let buffers = if attributes.is_empty() {
        Vec::new()
    } else {
        vec![wgpu::VertexBufferLayout {
            array_stride: stride,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &attributes,
        }]
    };

    let targets = reflect::color_targets(&fragment.ir);

    // a pipeline needs at least one attachment; a depth-only one stands in
    // when the fragment shader declares no color outputs
    let depth_stencil = if targets.is_empty() {
        Some(wgpu::DepthStencilState {
            format: wgpu::TextureFormat::Depth32Float,
            depth_write_enabled: false,
            depth_compare: wgpu::CompareFunction::Always,
            stencil: Default::default(),
            bias: Default::default(),
        })
    } else {
        None
    };

    device.push_error_scope(wgpu::ErrorFilter::Validation);

    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("glsl-check"),
        layout: None,
        vertex: wgpu::VertexState {
            module: &vertex.module,
            entry_point: "main",
            buffers: &buffers,
        },
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil,
        multisample: Default::default(),
        fragment: Some(wgpu::FragmentState {
            module: &fragment.module,
            entry_point: "main",
            targets: &targets,
        }),
        multiview: None,
    });

    let status = device.pop_error_scope().block_on();
    drop(vertex);
    drop(fragment);

    match status {
        None => Ok(pipeline),
        Some(error) => Err(Error::Link(truncate_log(&error.to_string()))),
    }
}

fn truncate_log(log: &str) -> String {
    log.chars().take(MAX_LOG_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn short_logs_are_untouched() {
        assert_eq!(truncate_log("0:3: 'vec3' : syntax error"), "0:3: 'vec3' : syntax error");
    }

    #[test]
    fn long_logs_are_capped() {
        let log = "x".repeat(MAX_LOG_LEN + 123);
        assert_eq!(truncate_log(&log).chars().count(), MAX_LOG_LEN);
    }

    #[test]
    fn truncation_never_splits_a_character() {
        let log = "é".repeat(MAX_LOG_LEN + 1);
        let truncated = truncate_log(&log);
        assert_eq!(truncated.chars().count(), MAX_LOG_LEN);
        assert!(truncated.chars().all(|c| c == 'é'));
    }

    #[test]
    fn loads_whole_files() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "#version 450\nvoid main() {{}}\n").unwrap();

        let source = load_source(file.path()).unwrap();
        assert!(source.starts_with("#version 450"));
        assert!(source.ends_with("void main() {}\n"));
    }

    #[test]
    fn missing_file_error_carries_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.frag");

        let error = load_source(&path).unwrap_err();
        assert!(matches!(error, Error::File { .. }));
        assert!(error.to_string().contains("nope.frag"));
    }
}
