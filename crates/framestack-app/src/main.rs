//! Framestack - headless compositor
//!
//! Builds a demo timeline, composes the configured frames and writes them
//! as PNGs. The first argument is an optional JSON config file.

mod config;
mod demo;
mod render;

use anyhow::Result;
use framestack_audio::{AudioEngine, Tone};
use framestack_gpu::{GraphicsBackend, SoftwareBackend};
use framestack_media::{TestPatternSource, ThreadedDecoder};
use framestack_render::Compositor;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::config::{AppConfig, BackendKind};
use crate::render::Renderer;

fn main() -> Result<()> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let loaded = config_path.as_deref().map(AppConfig::load);
    let config = match &loaded {
        Some(Ok(config)) => config.clone(),
        _ => AppConfig::default(),
    };

    init_logging(&config.log_level)?;
    if let Some(Err(e)) = &loaded {
        warn!("Falling back to default config: {:#}", e);
    }
    info!("Framestack starting...");

    let decoder = Arc::new(ThreadedDecoder::new(Arc::new(TestPatternSource::new())));
    let audio = Arc::new(audio_engine());
    let compositor = Compositor::new(decoder.clone(), audio.clone(), config.compose);

    let mut sequence = demo::build_sequence(&config, &decoder);
    let mut backend = create_backend(&config)?;
    let output = backend.current_framebuffer();

    let renderer = Renderer {
        compositor: &compositor,
        audio: &audio,
        config: &config,
    };
    let written = renderer.render_all(&mut sequence, backend.as_mut(), output)?;
    info!("Rendered {} frames into {}", written, config.output_dir.display());
    Ok(())
}

fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[cfg(feature = "cpal")]
fn audio_engine() -> AudioEngine {
    AudioEngine::new(Arc::new(Tone::default())).with_device_probe()
}

#[cfg(not(feature = "cpal"))]
fn audio_engine() -> AudioEngine {
    AudioEngine::new(Arc::new(Tone::default()))
}

fn create_backend(config: &AppConfig) -> Result<Box<dyn GraphicsBackend>> {
    match config.backend {
        #[cfg(feature = "wgpu")]
        BackendKind::Wgpu => {
            let ctx = framestack_gpu::GpuContext::new_blocking()?;
            info!("Using GPU: {}", ctx.adapter_info().name);
            let backend = framestack_gpu::WgpuBackend::new(ctx, config.width, config.height)?;
            Ok(Box::new(backend))
        }
        #[cfg(not(feature = "wgpu"))]
        BackendKind::Wgpu => {
            warn!("Built without the wgpu feature, using the software backend");
            Ok(Box::new(SoftwareBackend::new(config.width, config.height)))
        }
        BackendKind::Software => Ok(Box::new(SoftwareBackend::new(config.width, config.height))),
    }
}
