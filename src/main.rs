mod cli;

use hlsforge::{
    cache::MetadataCache,
    config::{self, Config},
    server,
    service::MediaService,
};
use hlsforge_media::{MediaPlaylist, Segmenter, VariantName};

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use std::sync::Arc;
use std::time::Duration;

async fn start_server(
    host: Option<String>,
    port: Option<u16>,
    config_path: Option<&std::path::Path>,
) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;

    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    tracing::info!("Starting hlsforge server");
    tracing::info!(
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );

    server::start_server(config).await
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let debug = cli.verbose
        || config::load_config_or_default(cli.config.as_deref())
            .map(|c| c.debug)
            .unwrap_or(false);

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if debug {
            "hlsforge=trace,hlsforge_media=trace,tower_http=debug".to_string()
        } else {
            "hlsforge=debug,hlsforge_media=debug,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Serve { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::Probe { source, json } => {
            let config = config::load_config_or_default(cli.config.as_deref())?;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(probe_source(config, &source, json))
        }
        Commands::Segments {
            source,
            length,
            video,
            audio,
        } => {
            let config = config::load_config_or_default(cli.config.as_deref())?;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(print_segments(config, &source, length, video, audio))
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("hlsforge {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn create_service(config: Config) -> MediaService {
    let cache = Arc::new(MetadataCache::new(
        config.parser.cache_max_entries,
        Duration::from_secs(config.parser.cache_ttl_secs),
    ));
    MediaService::new(Arc::new(config), cache)
}

async fn probe_source(config: Config, source: &str, json: bool) -> Result<()> {
    let service = create_service(config);
    let info = service.source_metadata(source).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(info.as_ref())?);
        return Ok(());
    }

    println!("Source: {}", source);
    println!("\nVideo Tracks: {}", info.video_tracks().count());
    for (i, track) in info.video_tracks().enumerate() {
        println!(
            "  [{}] {} {}x{} {:.3} fps, {} kb/s, {} ms (track #{})",
            i + 1,
            track.codec_description,
            track.width,
            track.height,
            track.fps,
            track.bitrate,
            track.track.duration,
            track.track.track_id
        );
    }

    println!("\nAudio Tracks: {}", info.audio_tracks().count());
    for (i, track) in info.audio_tracks().enumerate() {
        println!(
            "  [{}] {} {} Hz {}ch ({}), {} kb/s, {} ms (track #{})",
            i + 1,
            track.codec_description,
            track.sample_rate,
            track.channels,
            track.track.language,
            track.bitrate,
            track.track.duration,
            track.track.track_id
        );
    }

    Ok(())
}

async fn print_segments(
    config: Config,
    source: &str,
    length: Option<u64>,
    video: Option<u32>,
    audio: Option<u32>,
) -> Result<()> {
    let segment_length = length.unwrap_or(config.hls_muxer.segment_length);
    let tolerance = config.hls_muxer.tolerance;
    let service = create_service(config);

    let info = service.source_metadata(source).await?;
    let video = video.or_else(|| info.first_video().map(|_| 1));
    let audio = audio.or_else(|| info.first_audio().map(|_| 1));
    if video.is_none() && audio.is_none() {
        anyhow::bail!("Source has no playable tracks: {}", source);
    }

    let tracks = service.source_tracks(source, video, audio).await?;
    let segments = Segmenter::new(segment_length)
        .tolerance(tolerance)
        .segment(&tracks);

    let variant = VariantName::new(0, video, audio);
    let playlist = MediaPlaylist::from_segments(segment_length, &variant, &segments, None);
    print!("{}", playlist.render());

    Ok(())
}

fn validate_config(path: Option<&std::path::Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            println!("  Server: {}:{}", config.server.host, config.server.port);
            println!(
                "  Segment length: {} ms (tolerance {})",
                config.hls_muxer.segment_length, config.hls_muxer.tolerance
            );
            println!("  Applications: {}", config.applications.len());
            let mut ids: Vec<&String> = config.applications.keys().collect();
            ids.sort();
            for id in ids {
                if let Some(app) = config.application(id) {
                    println!(
                        "    {} -> {} ({} ms)",
                        app.id, app.origin_path, app.hls_muxer.segment_length
                    );
                }
            }
        }
        None => {
            println!("No config file specified, using defaults");
            let config = Config::default();
            println!("Default config:");
            println!("  Server: {}:{}", config.server.host, config.server.port);
        }
    }

    Ok(())
}
