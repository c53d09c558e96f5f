// SPDX-License-Identifier: CEPL-1.0
#![deny(unsafe_op_in_unsafe_fn)]
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use rgb_core::{init_tracing, DEFAULT_LOG_DIRECTIVE};
use rgb_platform::{required_instance_extensions, window_attributes, WindowSpec};
use rgb_render::{DeviceClass, DeviceRequirement, RenderSize, SessionOptions};
use rgb_render_vk::{initialize_session, teardown_session, SessionConfig, VkSession};
use tracing::{error, info, warn};

use rgb_platform::winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file; missing means defaults
    #[arg(long, default_value = "rgb.toml")]
    config: PathBuf,
    /// Validation layer + diagnostic messenger on/off
    #[arg(long)]
    diagnostics: Option<bool>,
    /// Physical device class to accept
    #[arg(long, value_enum)]
    device_class: Option<DeviceClassCfg>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum, Default)]
#[serde(rename_all = "snake_case")]
enum DeviceClassCfg {
    #[default]
    Discrete,
    Integrated,
    Virtual,
    Cpu,
    Any,
}

impl From<DeviceClassCfg> for DeviceRequirement {
    fn from(cfg: DeviceClassCfg) -> Self {
        match cfg {
            DeviceClassCfg::Discrete => DeviceRequirement::Only(DeviceClass::Discrete),
            DeviceClassCfg::Integrated => DeviceRequirement::Only(DeviceClass::Integrated),
            DeviceClassCfg::Virtual => DeviceRequirement::Only(DeviceClass::Virtual),
            DeviceClassCfg::Cpu => DeviceRequirement::Only(DeviceClass::Cpu),
            DeviceClassCfg::Any => DeviceRequirement::Any,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
struct SessionCfg {
    #[serde(default = "default_app_name")]
    app_name: String,
    #[serde(default = "default_diagnostics")]
    diagnostics: bool,
    #[serde(default)]
    device_class: DeviceClassCfg,
}

#[derive(Debug, Deserialize, Clone)]
struct WindowCfg {
    #[serde(default = "default_title")]
    title: String,
    #[serde(default = "default_width")]
    width: u32,
    #[serde(default = "default_height")]
    height: u32,
    #[serde(default)]
    resizable: bool,
}

#[derive(Debug, Deserialize, Default, Clone)]
struct AppCfg {
    #[serde(default)]
    session: SessionCfg,
    #[serde(default)]
    window: WindowCfg,
}

impl Default for SessionCfg {
    fn default() -> Self {
        SessionCfg {
            app_name: default_app_name(),
            diagnostics: default_diagnostics(),
            device_class: DeviceClassCfg::Discrete,
        }
    }
}

impl Default for WindowCfg {
    fn default() -> Self {
        WindowCfg {
            title: default_title(),
            width: default_width(),
            height: default_height(),
            resizable: false,
        }
    }
}

fn default_app_name() -> String {
    "Hello Triangle".to_owned()
}
fn default_diagnostics() -> bool {
    cfg!(debug_assertions)
}
fn default_title() -> String {
    "Vulkan".to_owned()
}
fn default_width() -> u32 {
    800
}
fn default_height() -> u32 {
    600
}

fn parse_cfg(text: &str) -> Result<AppCfg> {
    Ok(toml::from_str::<AppCfg>(text)?)
}

fn load_cfg(path: &Path) -> AppCfg {
    match fs::read_to_string(path) {
        Ok(s) => parse_cfg(&s).unwrap_or_else(|e| {
            warn!("ignoring {}: {e}", path.display());
            AppCfg::default()
        }),
        Err(_) => AppCfg::default(),
    }
}

impl AppCfg {
    fn apply_args(mut self, args: &Args) -> Self {
        if let Some(on) = args.diagnostics {
            self.session.diagnostics = on;
        }
        if let Some(class) = args.device_class {
            self.session.device_class = class;
        }
        self
    }

    fn window_spec(&self) -> WindowSpec {
        WindowSpec {
            title: self.window.title.clone(),
            size: RenderSize::new(self.window.width.max(1), self.window.height.max(1)),
            resizable: self.window.resizable,
        }
    }

    fn session_options(&self, size_hint: RenderSize) -> SessionOptions {
        SessionOptions {
            app_name: self.session.app_name.clone(),
            diagnostics: self.session.diagnostics,
            device: self.session.device_class.into(),
            size_hint,
        }
    }
}

struct App {
    cfg: AppCfg,
    // Field order matters: the session must go before the window it presents to.
    session: Option<VkSession>,
    window: Option<Window>,
    failure: Option<anyhow::Error>,
}

impl App {
    fn start(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let window = event_loop
            .create_window(window_attributes(&self.cfg.window_spec()))
            .context("create_window")?;
        let size = rgb_platform::render_size(&window);

        let extensions = required_instance_extensions(&window)?;
        let config = SessionConfig::new(self.cfg.session_options(size), extensions);
        let session = initialize_session(&window, &window, &config)?;

        self.window = Some(window);
        self.session = Some(session);
        Ok(())
    }

    fn shut_down(&mut self) {
        if let Some(session) = self.session.take() {
            teardown_session(session);
        }
        self.window = None;
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() || self.failure.is_some() {
            return;
        }
        event_loop.set_control_flow(ControlFlow::Wait);

        if let Err(e) = self.start(event_loop) {
            error!("session setup failed: {e:#}");
            self.failure = Some(e);
            self.shut_down();
            event_loop.exit();
            return;
        }
        info!("session running; close the window to exit");
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if let Some(window) = &self.window {
            if window_id != window.id() {
                return;
            }
        }

        if let WindowEvent::CloseRequested = event {
            info!("CloseRequested");
            self.shut_down();
            event_loop.exit();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.shut_down();
    }
}

fn main() -> Result<()> {
    init_tracing(DEFAULT_LOG_DIRECTIVE);
    let args = Args::parse();
    let cfg = load_cfg(&args.config).apply_args(&args);
    let event_loop: EventLoop<()> = EventLoop::new()?;

    let mut app = App {
        cfg,
        session: None,
        window: None,
        failure: None,
    };

    event_loop.run_app(&mut app)?;
    match app.failure.take() {
        Some(e) => Err(e.context("could not bring up the Vulkan session")),
        None => Ok(()),
    }
}
