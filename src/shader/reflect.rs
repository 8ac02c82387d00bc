//! Entry-point reflection used to synthesize pipeline state.
//!
//! The backend validates a render pipeline against concrete vertex buffer
//! layouts and color targets, so both are derived from the shaders' declared
//! interfaces instead of being hard-coded. A GL driver would accept any
//! attribute set without bound buffers; supplying layouts that mirror the
//! vertex inputs keeps that verdict.

use naga::ShaderStage;

use crate::error::Error;

/// A `location`-bound vertex stage input.
pub struct VertexInput {
    pub location: u32,
    pub format: wgpu::VertexFormat,
}

/// Parses one GLSL stage into naga IR for interface inspection.
pub fn parse(source: &str, stage: ShaderStage) -> Result<naga::Module, Error> {
    let options = naga::front::glsl::Options {
        stage,
        defines: Default::default(),
    };

    naga::front::glsl::Parser::default()
        .parse(&options, source)
        .map_err(|errors| {
            let log = errors
                .iter()
                .map(|error| error.to_string())
                .collect::<Vec<_>>()
                .join("\n");
            Error::Compile(super::truncate_log(&log))
        })
}

/// Lists the vertex entry point's attribute inputs. Builtins are skipped;
/// unused declarations never reach the entry interface.
pub fn vertex_inputs(module: &naga::Module) -> Vec<VertexInput> {
    let mut inputs = Vec::new();

    let entry = match entry_point(module, ShaderStage::Vertex) {
        Some(entry) => entry,
        None => return inputs,
    };

    for argument in &entry.function.arguments {
        match argument.binding {
            Some(naga::Binding::Location { location, .. }) => inputs.push(VertexInput {
                location,
                format: vertex_format(&module.types[argument.ty].inner),
            }),
            Some(naga::Binding::BuiltIn(_)) => {}
            None => {
                if let naga::TypeInner::Struct { ref members, .. } =
                    module.types[argument.ty].inner
                {
                    for member in members {
                        if let Some(naga::Binding::Location { location, .. }) = member.binding {
                            inputs.push(VertexInput {
                                location,
                                format: vertex_format(&module.types[member.ty].inner),
                            });
                        }
                    }
                }
            }
        }
    }

    inputs
}

/// Builds one color target per fragment output location, leaving gaps empty.
/// Target formats are single-component so that any output width of the same
/// scalar kind satisfies them.
pub fn color_targets(module: &naga::Module) -> Vec<Option<wgpu::ColorTargetState>> {
    let mut outputs = Vec::new();

    if let Some(entry) = entry_point(module, ShaderStage::Fragment) {
        if let Some(ref result) = entry.function.result {
            match result.binding {
                Some(naga::Binding::Location { location, .. }) => {
                    outputs.push((location, scalar_kind(&module.types[result.ty].inner)));
                }
                _ => {
                    if let naga::TypeInner::Struct { ref members, .. } =
                        module.types[result.ty].inner
                    {
                        for member in members {
                            if let Some(naga::Binding::Location { location, .. }) = member.binding
                            {
                                outputs
                                    .push((location, scalar_kind(&module.types[member.ty].inner)));
                            }
                        }
                    }
                }
            }
        }
    }

    let slots = outputs
        .iter()
        .map(|&(location, _)| location as usize + 1)
        .max()
        .unwrap_or(0);

    let mut targets = vec![None; slots];
    for (location, kind) in outputs {
        targets[location as usize] = Some(wgpu::ColorTargetState {
            format: target_format(kind),
            blend: None,
            write_mask: wgpu::ColorWrites::ALL,
        });
    }

    targets
}

fn entry_point(module: &naga::Module, stage: ShaderStage) -> Option<&naga::EntryPoint> {
    module.entry_points.iter().find(|entry| entry.stage == stage)
}

fn vertex_format(ty: &naga::TypeInner) -> wgpu::VertexFormat {
    use naga::{ScalarKind, TypeInner, VectorSize};
    use wgpu::VertexFormat;

    let (kind, size) = match *ty {
        TypeInner::Scalar { kind, .. } => (kind, None),
        TypeInner::Vector { size, kind, .. } => (kind, Some(size)),
        // matrix and array attributes have no single-format equivalent
        _ => (ScalarKind::Float, Some(VectorSize::Quad)),
    };

    match (kind, size) {
        (ScalarKind::Float, None) => VertexFormat::Float32,
        (ScalarKind::Float, Some(VectorSize::Bi)) => VertexFormat::Float32x2,
        (ScalarKind::Float, Some(VectorSize::Tri)) => VertexFormat::Float32x3,
        (ScalarKind::Float, Some(VectorSize::Quad)) => VertexFormat::Float32x4,
        (ScalarKind::Sint, None) => VertexFormat::Sint32,
        (ScalarKind::Sint, Some(VectorSize::Bi)) => VertexFormat::Sint32x2,
        (ScalarKind::Sint, Some(VectorSize::Tri)) => VertexFormat::Sint32x3,
        (ScalarKind::Sint, Some(VectorSize::Quad)) => VertexFormat::Sint32x4,
        (ScalarKind::Uint, None) => VertexFormat::Uint32,
        (ScalarKind::Uint, Some(VectorSize::Bi)) => VertexFormat::Uint32x2,
        (ScalarKind::Uint, Some(VectorSize::Tri)) => VertexFormat::Uint32x3,
        (ScalarKind::Uint, Some(VectorSize::Quad)) => VertexFormat::Uint32x4,
        _ => VertexFormat::Float32x4,
    }
}

fn scalar_kind(ty: &naga::TypeInner) -> naga::ScalarKind {
    match *ty {
        naga::TypeInner::Scalar { kind, .. } | naga::TypeInner::Vector { kind, .. } => kind,
        _ => naga::ScalarKind::Float,
    }
}

fn target_format(kind: naga::ScalarKind) -> wgpu::TextureFormat {
    match kind {
        naga::ScalarKind::Sint => wgpu::TextureFormat::R32Sint,
        naga::ScalarKind::Uint => wgpu::TextureFormat::R32Uint,
        _ => wgpu::TextureFormat::R32Float,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERT: &str = "\
#version 450
layout(location = 0) in vec3 position;
layout(location = 1) in vec2 uv;
layout(location = 2) in ivec4 bones;
layout(location = 0) out vec2 v_uv;
void main() {
    v_uv = uv;
    gl_Position = vec4(position, 1.0) + vec4(bones) + vec4(uv, 0.0, 0.0);
}
";

    #[test]
    fn vertex_attributes_cover_every_declared_input() {
        let module = parse(VERT, ShaderStage::Vertex).unwrap();

        let mut inputs = vertex_inputs(&module);
        inputs.sort_by_key(|input| input.location);

        assert_eq!(inputs.len(), 3);
        assert_eq!(inputs[0].location, 0);
        assert_eq!(inputs[0].format, wgpu::VertexFormat::Float32x3);
        assert_eq!(inputs[1].location, 1);
        assert_eq!(inputs[1].format, wgpu::VertexFormat::Float32x2);
        assert_eq!(inputs[2].location, 2);
        assert_eq!(inputs[2].format, wgpu::VertexFormat::Sint32x4);
    }

    #[test]
    fn builtins_are_not_vertex_attributes() {
        const BARE: &str = "#version 450\nvoid main() { gl_Position = vec4(0.0); }\n";
        let module = parse(BARE, ShaderStage::Vertex).unwrap();
        assert!(vertex_inputs(&module).is_empty());
    }

    #[test]
    fn single_output_fragment_gets_one_target() {
        const FRAG: &str = "\
#version 450
layout(location = 0) out vec4 color;
void main() { color = vec4(1.0); }
";
        let module = parse(FRAG, ShaderStage::Fragment).unwrap();

        let targets = color_targets(&module);
        assert_eq!(targets.len(), 1);
        assert_eq!(
            targets[0].as_ref().unwrap().format,
            wgpu::TextureFormat::R32Float
        );
    }

    #[test]
    fn mrt_outputs_get_one_target_per_location() {
        const FRAG: &str = "\
#version 450
layout(location = 0) out vec4 albedo;
layout(location = 1) out vec4 normal;
void main() {
    albedo = vec4(1.0);
    normal = vec4(0.0, 0.0, 1.0, 0.0);
}
";
        let module = parse(FRAG, ShaderStage::Fragment).unwrap();

        let targets = color_targets(&module);
        assert_eq!(targets.len(), 2);
        assert!(targets[0].is_some());
        assert!(targets[1].is_some());
    }

    #[test]
    fn output_locations_with_gaps_leave_unused_slots_empty() {
        const FRAG: &str = "\
#version 450
layout(location = 2) out uvec2 id;
void main() { id = uvec2(0u); }
";
        let module = parse(FRAG, ShaderStage::Fragment).unwrap();

        let targets = color_targets(&module);
        assert_eq!(targets.len(), 3);
        assert!(targets[0].is_none());
        assert!(targets[1].is_none());
        assert_eq!(
            targets[2].as_ref().unwrap().format,
            wgpu::TextureFormat::R32Uint
        );
    }

    #[test]
    fn parse_errors_become_compile_diagnostics() {
        let error = parse("#version 450\nvoid main() { this is not glsl }\n", ShaderStage::Vertex)
            .unwrap_err();
        assert!(matches!(error, Error::Compile(_)));
        assert!(!error.to_string().is_empty());
    }
}
