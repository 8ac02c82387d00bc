use pollster::FutureExt as _;
use winit::{
    dpi::PhysicalSize,
    event_loop::EventLoop,
    window::{Window, WindowBuilder},
};

use crate::error::Error;

/// Checks that a display server can be reached before winit touches it.
///
/// winit 0.26 has no fallible event loop constructor and panics when no
/// backend is available, so probe the environment first to keep windowing
/// failures on the normal error path.
pub fn ensure_display_server() -> Result<(), Error> {
    #[cfg(all(unix, not(target_os = "macos")))]
    if std::env::var_os("DISPLAY").is_none() && std::env::var_os("WAYLAND_DISPLAY").is_none() {
        return Err(Error::ContextInit(
            "could not initialize windowing: no display server available \
             (DISPLAY and WAYLAND_DISPLAY are unset)"
                .into(),
        ));
    }

    Ok(())
}

/// A live graphics device backed by a hidden 1x1 window.
///
/// The window never becomes visible and nothing is rendered to it; it exists
/// only so a compatible adapter can be selected. It must stay alive for as
/// long as the device is in use.
pub struct GpuContext {
    pub device: wgpu::Device,
    _window: Window,
}

impl GpuContext {
    pub fn new(event_loop: &EventLoop<()>) -> Result<GpuContext, Error> {
        let window = WindowBuilder::new()
            .with_title("glsl-check")
            .with_inner_size(PhysicalSize::new(1u32, 1u32))
            .with_visible(false)
            .build(event_loop)
            .map_err(|error| Error::ContextInit(format!("could not create a window: {error}")))?;

        let instance = wgpu::Instance::new(wgpu::Backends::PRIMARY);
        let surface = unsafe { instance.create_surface(&window) };

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::LowPower,
                force_fallback_adapter: false,
                compatible_surface: Some(&surface),
            })
            .block_on()
            .ok_or_else(|| Error::ContextInit("could not get a graphics adapter".into()))?;

        let (device, _queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: None,
                    features: wgpu::Features::empty(),
                    limits: adapter.limits(),
                },
                None,
            )
            .block_on()
            .map_err(|error| {
                Error::ContextInit(format!("could not create a graphics device: {error}"))
            })?;

        Ok(GpuContext {
            device,
            _window: window,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(all(unix, not(target_os = "macos")))]
    #[test]
    fn missing_display_server_is_a_context_error() {
        std::env::remove_var("DISPLAY");
        std::env::remove_var("WAYLAND_DISPLAY");

        let error = ensure_display_server().unwrap_err();
        assert!(matches!(error, Error::ContextInit(_)));
        assert!(error.to_string().contains("display server"));
    }
}
