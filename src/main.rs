use anyhow::{anyhow, bail, Context as _, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use image_comparator::app::{AppConfig, AppState};
use image_comparator::comparator::{
    ComparatorConfig, OverlayConfig, DEFAULT_BASE_SRC, DEFAULT_OVERLAY_SRCS,
};
use image_comparator::handle::Bounds;
use log::{error, info};
use winit::{
    event::{ElementState, Event, KeyboardInput, VirtualKeyCode, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    window::WindowBuilder,
};

fn main() -> Result<()> {
    env_logger::init();

    let matches = Command::new("image_comparator")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Compares stacked images by sliding overlays over a base image")
        .arg(
            Arg::new("base")
                .long("base")
                .action(ArgAction::Set)
                .value_name("SRC")
                .help("Base image path or URL")
                .default_value(DEFAULT_BASE_SRC),
        )
        .arg(
            Arg::new("overlay1")
                .long("overlay1")
                .action(ArgAction::Set)
                .value_name("SRC")
                .help("First overlay image path or URL")
                .default_value(DEFAULT_OVERLAY_SRCS[0]),
        )
        .arg(
            Arg::new("overlay2")
                .long("overlay2")
                .action(ArgAction::Set)
                .value_name("SRC")
                .help("Second overlay image path or URL")
                .default_value(DEFAULT_OVERLAY_SRCS[1]),
        )
        .arg(
            Arg::new("bounds1")
                .long("bounds1")
                .action(ArgAction::Set)
                .value_name("START:END")
                .help("Open pixel range the first handle can be dragged within")
                .default_value("50:500"),
        )
        .arg(
            Arg::new("bounds2")
                .long("bounds2")
                .action(ArgAction::Set)
                .value_name("START:END")
                .help("Open pixel range the second handle can be dragged within")
                .default_value("100:500"),
        )
        .arg(
            Arg::new("size")
                .short('s')
                .long("size")
                .action(ArgAction::Set)
                .value_name("WIDTHxHEIGHT")
                .help("Comparator size in logical pixels")
                .default_value("500x300"),
        )
        .arg(
            Arg::new("window_size")
                .short('w')
                .long("window-size")
                .action(ArgAction::Set)
                .value_name("WIDTHxHEIGHT")
                .help("Window size in format WIDTHxHEIGHT (e.g. 1920x1080)")
                .default_value("800x600"),
        )
        .get_matches();

    let app_config = app_config_from(&matches)?;
    info!(
        "Starting image comparator {}x{} in a {}x{} window",
        app_config.comparator.width,
        app_config.comparator.height,
        app_config.window_width,
        app_config.window_height
    );

    let event_loop = EventLoop::new();
    let window = WindowBuilder::new()
        .with_title("Image Comparator")
        .with_inner_size(winit::dpi::LogicalSize::new(
            app_config.window_width,
            app_config.window_height,
        ))
        .build(&event_loop)
        .context("Failed to create window")?;

    let mut app_state = pollster::block_on(AppState::new(&window, app_config))?;

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Wait;

        match event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => *control_flow = ControlFlow::Exit,
                WindowEvent::KeyboardInput {
                    input:
                        KeyboardInput {
                            state: ElementState::Pressed,
                            virtual_keycode: Some(VirtualKeyCode::Escape),
                            ..
                        },
                    ..
                } => *control_flow = ControlFlow::Exit,
                event => {
                    app_state.handle_event(&event);
                    window.request_redraw();
                }
            },
            Event::RedrawRequested(_) => match app_state.render() {
                Ok(()) => {}
                Err(wgpu::SurfaceError::Lost) => app_state.reconfigure(),
                Err(wgpu::SurfaceError::OutOfMemory) => {
                    error!("Render error: out of GPU memory");
                    *control_flow = ControlFlow::Exit;
                }
                Err(e) => error!("Render error: {}", e),
            },
            Event::LoopDestroyed => app_state.shutdown(),
            _ => {}
        }
    });
}

fn app_config_from(matches: &ArgMatches) -> Result<AppConfig> {
    let (width, height) = parse_size(arg(matches, "size")?)?;
    let (window_width, window_height) = parse_size(arg(matches, "window_size")?)?;
    let overlay = |src: &str, bounds: &str| -> Result<OverlayConfig> {
        Ok(OverlayConfig {
            src: arg(matches, src)?.to_string(),
            bounds: parse_bounds(arg(matches, bounds)?)?,
        })
    };

    Ok(AppConfig {
        comparator: ComparatorConfig {
            width: width as f64,
            height: height as f64,
            base: arg(matches, "base")?.to_string(),
            overlays: [overlay("overlay1", "bounds1")?, overlay("overlay2", "bounds2")?],
        },
        window_width,
        window_height,
    })
}

fn arg<'a>(matches: &'a ArgMatches, id: &str) -> Result<&'a str> {
    matches
        .get_one::<String>(id)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("Missing value for '{}'", id))
}

fn parse_size(size: &str) -> Result<(f32, f32)> {
    let parts: Vec<&str> = size.split('x').collect();
    if parts.len() != 2 {
        bail!("Invalid size '{}'. Use WIDTHxHEIGHT", size);
    }
    let width = parts[0]
        .parse::<f32>()
        .with_context(|| format!("Invalid width '{}'", parts[0]))?;
    let height = parts[1]
        .parse::<f32>()
        .with_context(|| format!("Invalid height '{}'", parts[1]))?;
    if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
        bail!("Size '{}' must be finite and positive", size);
    }
    Ok((width, height))
}

fn parse_bounds(bounds: &str) -> Result<Bounds> {
    let (start, end) = bounds
        .split_once(':')
        .ok_or_else(|| anyhow!("Invalid bounds '{}'. Use START:END", bounds))?;
    let start = start
        .trim()
        .parse::<f64>()
        .with_context(|| format!("Invalid bounds start '{}'", start))?;
    let end = end
        .trim()
        .parse::<f64>()
        .with_context(|| format!("Invalid bounds end '{}'", end))?;
    if !(start.is_finite() && end.is_finite()) {
        bail!("Bounds '{}' must be finite", bounds);
    }
    Ok(Bounds::new(start, end))
}
