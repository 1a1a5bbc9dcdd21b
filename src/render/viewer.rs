use anyhow::{Context, Result};
use crossbeam_channel as xchan;
use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
    thread::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use wgpu::util::DeviceExt;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    keyboard::{KeyCode, PhysicalKey},
    window::{Fullscreen, Window, WindowAttributes, WindowId},
};

use crate::config::Configuration;
use crate::events::{Command, Dispatcher, UiEvent};
use crate::permission::DirectoryAccess;
use crate::render::loader::{LoaderMsg, PreparedImage, spawn_loader};
use crate::scan::DirectoryStore;
use crate::slideshow::{ScreenUpdate, SlideshowController};

#[derive(Debug)]
pub enum ViewerEvent {
    Ui(UiEvent),
    Decoded(PreparedImage),
    Cancelled,
}

/// Marshals controller events onto the event-loop thread.
struct ProxyDispatcher(Mutex<EventLoopProxy<ViewerEvent>>);

impl Dispatcher for ProxyDispatcher {
    fn post(&self, event: UiEvent) -> bool {
        match self.0.lock() {
            Ok(proxy) => proxy.send_event(ViewerEvent::Ui(event)).is_ok(),
            Err(_) => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Command(Command),
    Quit,
}

/// Key bindings for the screen's controls.
#[must_use]
pub const fn key_action(key: KeyCode) -> Option<KeyAction> {
    match key {
        KeyCode::ArrowRight | KeyCode::KeyN => Some(KeyAction::Command(Command::Next)),
        KeyCode::ArrowLeft | KeyCode::KeyP => Some(KeyAction::Command(Command::Previous)),
        KeyCode::Space | KeyCode::KeyS => Some(KeyAction::Command(Command::Toggle)),
        KeyCode::Escape | KeyCode::KeyQ => Some(KeyAction::Quit),
        _ => None,
    }
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct Vertex {
    pos: [f32; 2],
    uv: [f32; 2],
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct Params {
    scale: [f32; 4],
}

const QUAD: [Vertex; 4] = [
    //   NDC pos         UV
    Vertex {
        pos: [-1.0, -1.0],
        uv: [0.0, 1.0],
    }, // bottom-left
    Vertex {
        pos: [1.0, -1.0],
        uv: [1.0, 1.0],
    }, // bottom-right
    Vertex {
        pos: [-1.0, 1.0],
        uv: [0.0, 0.0],
    }, // top-left
    Vertex {
        pos: [1.0, 1.0],
        uv: [1.0, 0.0],
    }, // top-right
];

type Controller = SlideshowController<DirectoryStore, DirectoryAccess>;

/// Open the slideshow window and run its event loop on the calling thread.
///
/// Returns when the window closes or `cancel` fires. Must be called from
/// inside a tokio runtime.
///
/// # Errors
/// Returns an error if the event loop cannot be created or fails while running.
pub fn run_windowed(cfg: Configuration, cancel: CancellationToken) -> Result<()> {
    let event_loop = EventLoop::<ViewerEvent>::with_user_event()
        .build()
        .context("failed to build viewer event loop")?;
    let proxy = event_loop.create_proxy();

    let cancel_task = {
        let cancel = cancel.clone();
        let proxy = proxy.clone();
        tokio::spawn(async move {
            cancel.cancelled().await;
            let _ = proxy.send_event(ViewerEvent::Cancelled);
        })
    };

    let (tx_req, rx_req) = xchan::unbounded::<LoaderMsg>();
    let loader = {
        let proxy = proxy.clone();
        spawn_loader(rx_req, move |img| {
            proxy.send_event(ViewerEvent::Decoded(img)).is_ok()
        })
        .context("failed to spawn image loader")?
    };

    let dispatcher: Arc<dyn Dispatcher> = Arc::new(ProxyDispatcher(Mutex::new(proxy)));
    let controller = SlideshowController::new(
        DirectoryStore::new(&cfg.photo_library_path, cfg.scan_options()),
        DirectoryAccess::new(&cfg.photo_library_path),
        dispatcher,
        cfg.slideshow_interval,
    );

    info!(
        library = %cfg.photo_library_path.display(),
        interval = ?cfg.slideshow_interval,
        "starting slideshow window"
    );
    let mut app = App::new(cfg, cancel, controller, tx_req, loader);
    let run_result = event_loop.run_app(&mut app);
    cancel_task.abort();
    app.shutdown_loader();

    run_result.context("viewer event loop failed")
}

struct Tex {
    view: wgpu::TextureView,
    w: u32,
    h: u32,
}

struct Gpu {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,

    pipeline: wgpu::RenderPipeline,
    bind_layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
    vbuf: wgpu::Buffer,
    params: wgpu::Buffer,
    sampler: wgpu::Sampler,
    tex: Tex,
}

struct App {
    cfg: Configuration,
    cancel: CancellationToken,
    controller: Controller,
    created: bool,

    window: Option<Arc<Window>>,
    gpu: Option<Gpu>,

    // decode pipeline
    tx_req: xchan::Sender<LoaderMsg>,
    loader: Option<JoinHandle<()>>,
    requested: Option<PathBuf>,

    notice: Option<String>,
}

impl App {
    fn new(
        cfg: Configuration,
        cancel: CancellationToken,
        controller: Controller,
        tx_req: xchan::Sender<LoaderMsg>,
        loader: JoinHandle<()>,
    ) -> Self {
        Self {
            cfg,
            cancel,
            controller,
            created: false,
            window: None,
            gpu: None,
            tx_req,
            loader: Some(loader),
            requested: None,
            notice: None,
        }
    }

    fn ensure_window(&mut self, event_loop: &ActiveEventLoop) -> Option<Arc<Window>> {
        if let Some(window) = self.window.as_ref() {
            return Some(window.clone());
        }

        let mut attrs = WindowAttributes::default().with_title(self.cfg.window_title.clone());
        if self.cfg.fullscreen {
            attrs = attrs.with_fullscreen(Some(Fullscreen::Borderless(None)));
        }
        match event_loop.create_window(attrs) {
            Ok(window) => {
                let window = Arc::new(window);
                self.window = Some(window.clone());
                Some(window)
            }
            Err(err) => {
                error!(error = %err, "failed to create viewer window");
                None
            }
        }
    }

    /// Apply controller output to the window.
    fn apply(&mut self, updates: Vec<ScreenUpdate>) {
        if updates.is_empty() {
            return;
        }
        let mut notice = None;
        for update in updates {
            match update {
                ScreenUpdate::ShowImage(entry) => {
                    debug!(uri = %entry.display_uri(), "show image");
                    self.request_decode(entry.path);
                }
                ScreenUpdate::NavigationEnabled(enabled) => {
                    debug!(enabled, "navigation controls");
                }
                ScreenUpdate::ToggleLabel(label) => {
                    debug!(%label, "toggle label");
                }
                ScreenUpdate::Notice(msg) => {
                    warn!(notice = %msg, "user notice");
                    notice = Some(msg);
                }
            }
        }
        self.notice = notice;
        self.refresh_title();
    }

    fn refresh_title(&self) {
        let Some(window) = self.window.as_ref() else {
            return;
        };
        let view = self.controller.view();
        let title = if let Some(notice) = self.notice.as_deref() {
            format!("{} | {notice}", self.cfg.window_title)
        } else {
            let file = view
                .image
                .as_ref()
                .map_or_else(|| "(no image)".to_string(), |e| e.file_name());
            let nav = if view.navigation_enabled {
                ""
            } else {
                " (navigation locked)"
            };
            format!(
                "{} | {file} | {}{nav}",
                self.cfg.window_title, view.toggle_label
            )
        };
        window.set_title(&title);
    }

    fn decode_bounds(&self) -> (u32, u32) {
        let PhysicalSize { width, height } = self
            .window
            .as_ref()
            .map_or(PhysicalSize::new(1920, 1080), |w| w.inner_size());
        let max = self
            .gpu
            .as_ref()
            .map_or(8192, |gpu| gpu.device.limits().max_texture_dimension_2d);
        (width.clamp(1, max), height.clamp(1, max))
    }

    fn request_decode(&mut self, path: PathBuf) {
        let bounds = self.decode_bounds();
        self.requested = Some(path.clone());
        if self.tx_req.send(LoaderMsg::Decode(path, bounds)).is_err() {
            warn!("image loader is gone; display not updated");
        }
    }

    fn on_decoded(&mut self, img: PreparedImage) {
        if self.requested.as_ref() != Some(&img.path) {
            debug!(path = %img.path.display(), "dropping stale decode");
            return;
        }
        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };
        gpu.tex = upload_texture(&gpu.device, &gpu.queue, &img.pixels, img.size.0, img.size.1);
        write_params(gpu);
        rebuild_bind_group(gpu);
        self.request_redraw();
    }

    fn handle_resize(&mut self, new_size: PhysicalSize<u32>) {
        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        gpu.config.width = new_size.width;
        gpu.config.height = new_size.height;
        gpu.surface.configure(&gpu.device, &gpu.config);
        write_params(gpu);
        debug!(
            width = gpu.config.width,
            height = gpu.config.height,
            "viewer surface resized"
        );
        self.request_redraw();
    }

    fn request_redraw(&self) {
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }

    fn deactivate(&mut self) {
        let updates = self.controller.deactivate();
        self.apply(updates);
    }

    fn quit(&mut self, event_loop: &ActiveEventLoop) {
        self.deactivate();
        event_loop.exit();
    }

    fn shutdown_loader(&mut self) {
        let _ = self.tx_req.send(LoaderMsg::Quit);
        if let Some(handle) = self.loader.take()
            && handle.join().is_err()
        {
            warn!("image loader thread panicked");
        }
    }

    fn draw(&mut self) {
        let Some(gpu) = self.gpu.as_ref() else { return };
        let frame = match gpu.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Lost) => {
                info!("viewer surface lost; reconfiguring");
                if let Some(size) = self.window.as_ref().map(|w| w.inner_size()) {
                    self.handle_resize(size);
                }
                return;
            }
            Err(err) => {
                warn!(error = %err, "failed to acquire surface texture");
                return;
            }
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("viewer-encoder"),
            });
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("viewer-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            rpass.set_pipeline(&gpu.pipeline);
            rpass.set_bind_group(0, &gpu.bind_group, &[]);
            rpass.set_vertex_buffer(0, gpu.vbuf.slice(..));
            rpass.draw(0..4, 0..1);
        }
        gpu.queue.submit([encoder.finish()]);
        frame.present();
    }
}

impl ApplicationHandler<ViewerEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.cancel.is_cancelled() {
            event_loop.exit();
            return;
        }
        let Some(window) = self.ensure_window(event_loop) else {
            event_loop.exit();
            return;
        };
        if self.gpu.is_none() {
            match init_gpu(window) {
                Ok(gpu) => self.gpu = Some(gpu),
                Err(err) => {
                    error!(error = ?err, "failed to initialize GPU state");
                    event_loop.exit();
                    return;
                }
            }
        }
        if !self.created {
            self.created = true;
            let updates = self.controller.on_create();
            self.apply(updates);
        }
        self.refresh_title();
        self.request_redraw();
    }

    fn suspended(&mut self, _event_loop: &ActiveEventLoop) {
        info!("viewer suspended");
        self.deactivate();
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(window) = self.window.as_ref() else {
            return;
        };
        if window.id() != window_id {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                info!("viewer window close requested");
                self.quit(event_loop);
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state != ElementState::Pressed || event.repeat {
                    return;
                }
                let PhysicalKey::Code(code) = event.physical_key else {
                    return;
                };
                match key_action(code) {
                    Some(KeyAction::Command(cmd)) => {
                        let updates = self.controller.on_command(cmd);
                        self.apply(updates);
                    }
                    Some(KeyAction::Quit) => self.quit(event_loop),
                    None => {}
                }
            }
            WindowEvent::Occluded(true) => {
                debug!("viewer occluded");
                self.deactivate();
            }
            WindowEvent::Resized(new_size) => self.handle_resize(new_size),
            WindowEvent::RedrawRequested => self.draw(),
            _ => {}
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: ViewerEvent) {
        match event {
            ViewerEvent::Ui(ev) => {
                let updates = self.controller.on_ui_event(ev);
                self.apply(updates);
            }
            ViewerEvent::Decoded(img) => self.on_decoded(img),
            ViewerEvent::Cancelled => {
                info!("viewer received cancellation event");
                self.quit(event_loop);
            }
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.deactivate();
    }
}

fn init_gpu(window: Arc<Window>) -> Result<Gpu> {
    let instance = wgpu::Instance::default();
    let surface = instance
        .create_surface(window.clone())
        .context("failed to create surface")?;
    let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::default(),
        compatible_surface: Some(&surface),
        force_fallback_adapter: false,
    }))
    .context("no compatible GPU adapter found")?;

    let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
        label: Some("viewer-device"),
        required_limits: adapter.limits(),
        ..Default::default()
    }))
    .context("failed to acquire GPU device")?;

    let caps = surface.get_capabilities(&adapter);
    let format = caps
        .formats
        .iter()
        .copied()
        .find(wgpu::TextureFormat::is_srgb)
        .or_else(|| caps.formats.first().copied())
        .context("surface reports no supported formats")?;
    let PhysicalSize { width, height } = window.inner_size();
    let config = wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format,
        width: width.max(1),
        height: height.max(1),
        present_mode: wgpu::PresentMode::AutoVsync,
        alpha_mode: caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto),
        view_formats: vec![],
        desired_maximum_frame_latency: 2,
    };
    surface.configure(&device, &config);
    info!(
        width = config.width,
        height = config.height,
        format = ?config.format,
        "viewer surface configured"
    );

    // black until the first decoded image arrives
    let tex = upload_texture(&device, &queue, &[0, 0, 0, 255], 1, 1);

    let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("photo-sampler"),
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    });

    let params = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("params"),
        contents: bytemuck::bytes_of(&Params {
            scale: fit_scale(config.width, config.height, tex.w, tex.h),
        }),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    });

    let vbuf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("quad"),
        contents: bytemuck::cast_slice(&QUAD),
        usage: wgpu::BufferUsages::VERTEX,
    });

    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("photo-shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("shaders/photo.wgsl").into()),
    });

    let bind_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("photo-bind-layout"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
        ],
    });

    let bind_group = create_bind_group(&device, &bind_layout, &tex, &sampler, &params);

    let vlayout = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2],
    };

    let pip_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("photo-pipeline-layout"),
        bind_group_layouts: &[&bind_layout],
        push_constant_ranges: &[],
    });

    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("photo-pipeline"),
        layout: Some(&pip_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[vlayout],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleStrip,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    });

    Ok(Gpu {
        surface,
        device,
        queue,
        config,
        pipeline,
        bind_layout,
        bind_group,
        vbuf,
        params,
        sampler,
        tex,
    })
}

fn upload_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    pixels: &[u8],
    w: u32,
    h: u32,
) -> Tex {
    let size = wgpu::Extent3d {
        width: w,
        height: h,
        depth_or_array_layers: 1,
    };
    let tex = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("photo"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        tex.as_image_copy(),
        pixels,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * w),
            rows_per_image: Some(h),
        },
        size,
    );
    Tex {
        view: tex.create_view(&wgpu::TextureViewDescriptor::default()),
        w,
        h,
    }
}

fn create_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    tex: &Tex,
    sampler: &wgpu::Sampler,
    params: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("photo-bind-group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&tex.view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: params.as_entire_binding(),
            },
        ],
    })
}

fn rebuild_bind_group(gpu: &mut Gpu) {
    gpu.bind_group = create_bind_group(
        &gpu.device,
        &gpu.bind_layout,
        &gpu.tex,
        &gpu.sampler,
        &gpu.params,
    );
}

fn write_params(gpu: &Gpu) {
    let params = Params {
        scale: fit_scale(gpu.config.width, gpu.config.height, gpu.tex.w, gpu.tex.h),
    };
    gpu.queue
        .write_buffer(&gpu.params, 0, bytemuck::bytes_of(&params));
}

/// Quad scale (NDC) that fits the image inside the window without cropping.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn fit_scale(win_w: u32, win_h: u32, img_w: u32, img_h: u32) -> [f32; 4] {
    if win_w == 0 || win_h == 0 || img_w == 0 || img_h == 0 {
        return [1.0, 1.0, 0.0, 0.0];
    }
    let win_ar = win_w as f32 / win_h as f32;
    let img_ar = img_w as f32 / img_h as f32;

    if img_ar > win_ar {
        // wider than the window: full width, bars top and bottom
        [1.0, win_ar / img_ar, 0.0, 0.0]
    } else {
        [img_ar / win_ar, 1.0, 0.0, 0.0]
    }
}
