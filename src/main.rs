mod error;
mod gpu;
mod shader;

use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use gpu::GpuContext;
use winit::event_loop::EventLoop;

#[macro_use]
extern crate tracing;

/// Compile-and-link check for a GLSL vertex/fragment shader pair.
///
/// Intended as a CI lint step: exits with success if the pair compiles and
/// links, otherwise logs the backend's diagnostic and exits with failure.
#[derive(Debug, Parser)]
#[command(name = "glsl-check", version)]
struct Cli {
    /// Vertex shader source file
    #[arg(short, long)]
    vert: PathBuf,

    /// Fragment shader source file
    #[arg(short, long)]
    frag: PathBuf,
}

fn main() -> ExitCode {
    tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
                .add_directive("wgpu=warn".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => {
            info!("No shader compile errors");
            ExitCode::SUCCESS
        }
        Err(error) => {
            error!("Failure: {error:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let vertex_source = shader::load_source(&cli.vert)?;
    let fragment_source = shader::load_source(&cli.frag)?;

    // Compiling a shader needs a live device, which in turn needs a window to
    // pick a compatible adapter. The window stays hidden throughout.
    gpu::ensure_display_server()?;
    let event_loop = EventLoop::new();
    let context = GpuContext::new(&event_loop)?;

    let vertex = shader::compile(&context.device, &vertex_source, naga::ShaderStage::Vertex)?;
    let fragment = shader::compile(&context.device, &fragment_source, naga::ShaderStage::Fragment)?;

    // The pipeline only exists to trigger link-time validation.
    let pipeline = shader::link(&context.device, vertex, fragment)?;
    drop(pipeline);

    Ok(())
}
