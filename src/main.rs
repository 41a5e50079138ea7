use std::{
    path::PathBuf,
    thread,
    time::{Duration, Instant},
};

use anyhow::{Result, anyhow};
use framecast::{
    config::StreamConfig,
    frame::{self, CaptureMode},
    source::{CubeScene, FrameSource},
    streamer::{ConnectionState, FrameStreamer},
};

#[derive(Debug, Default, Clone)]
struct Cli {
    config: Option<PathBuf>,
    host: Option<String>,
    port: Option<u16>,
    size: Option<[u32; 2]>,
    fps: Option<u32>,
    views: Option<u8>,
    capture: Option<CaptureMode>,
    /// 0 = run forever.
    max_ticks: u64,
}

fn parse_cli(args: &[String]) -> Result<Cli> {
    let mut cli = Cli::default();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                let Some(v) = args.get(i + 1) else {
                    return Err(anyhow!("missing value for --config"));
                };
                cli.config = Some(PathBuf::from(v));
                i += 2;
            }
            "--host" => {
                let Some(v) = args.get(i + 1) else {
                    return Err(anyhow!("missing value for --host"));
                };
                cli.host = Some(v.clone());
                i += 2;
            }
            "--port" => {
                let Some(v) = args.get(i + 1) else {
                    return Err(anyhow!("missing value for --port"));
                };
                cli.port = Some(v.parse().map_err(|_| anyhow!("bad --port value: {v}"))?);
                i += 2;
            }
            "--size" => {
                let Some(v) = args.get(i + 1) else {
                    return Err(anyhow!("missing value for --size"));
                };
                cli.size = Some(parse_size(v)?);
                i += 2;
            }
            "--fps" => {
                let Some(v) = args.get(i + 1) else {
                    return Err(anyhow!("missing value for --fps"));
                };
                cli.fps = Some(v.parse().map_err(|_| anyhow!("bad --fps value: {v}"))?);
                i += 2;
            }
            "--views" => {
                let Some(v) = args.get(i + 1) else {
                    return Err(anyhow!("missing value for --views"));
                };
                cli.views = Some(v.parse().map_err(|_| anyhow!("bad --views value: {v}"))?);
                i += 2;
            }
            "--capture" => {
                let Some(v) = args.get(i + 1) else {
                    return Err(anyhow!("missing value for --capture"));
                };
                cli.capture = Some(parse_capture(v)?);
                i += 2;
            }
            "--max-ticks" => {
                let Some(v) = args.get(i + 1) else {
                    return Err(anyhow!("missing value for --max-ticks"));
                };
                cli.max_ticks = v.parse().map_err(|_| anyhow!("bad --max-ticks value: {v}"))?;
                i += 2;
            }
            other => {
                return Err(anyhow!(
                    "unknown argument: {other} (supported: --config <json>, --host <addr>, --port <n>, --size <WxH>, --fps <n>, --views <1|2>, --capture <raw|data-uri>, --max-ticks <n>)"
                ));
            }
        }
    }
    Ok(cli)
}

fn parse_size(v: &str) -> Result<[u32; 2]> {
    let Some((w, h)) = v.split_once('x') else {
        return Err(anyhow!("bad --size value (expected WxH): {v}"));
    };
    let width = w.parse().map_err(|_| anyhow!("bad --size width: {v}"))?;
    let height = h.parse().map_err(|_| anyhow!("bad --size height: {v}"))?;
    Ok([width, height])
}

fn parse_capture(v: &str) -> Result<CaptureMode> {
    match v {
        "raw" => Ok(CaptureMode::Raw),
        "data-uri" | "png-data-uri" => Ok(CaptureMode::PngDataUri),
        other => Err(anyhow!("bad --capture value: {other} (raw | data-uri)")),
    }
}

fn apply_overrides(config: &mut StreamConfig, cli: &Cli) {
    if let Some(host) = &cli.host {
        config.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(size) = cli.size {
        config.resolution = size;
    }
    if let Some(fps) = cli.fps {
        config.fps = fps;
    }
    if let Some(views) = cli.views {
        config.views = views;
    }
    if let Some(capture) = cli.capture {
        config.capture = capture;
    }
}

/// Fixed-interval render loop: advance the scene, capture, poll the socket
/// for acknowledgments, attempt one gated send, then pace to the target fps.
fn run(config: &StreamConfig, max_ticks: u64) -> Result<()> {
    let mut scene = CubeScene::new(
        config.resolution[0],
        config.resolution[1],
        config.views == 2,
    );

    let mut streamer = FrameStreamer::new();
    // The original keeps rendering when the endpoint never opens; sends are
    // silently skipped until the socket is up.
    let mut was_open = match streamer.connect(&config.host, config.port, &config.path) {
        Ok(()) => {
            eprintln!("[stream] connected to {}", config.endpoint_url());
            true
        }
        Err(e) => {
            eprintln!(
                "[stream] connect to {} failed: {e:#}; continuing without sends",
                config.endpoint_url()
            );
            false
        }
    };

    let frame_interval = Duration::from_millis(1000 / u64::from(config.fps));
    let mut ticks: u64 = 0;

    loop {
        let tick_start = Instant::now();

        let views = scene.next_views()?;
        let frames = views
            .iter()
            .map(|surface| frame::capture(config.capture, surface))
            .collect::<Result<Vec<_>>>()?;

        streamer.poll();
        streamer.try_send_frames(&frames);

        if was_open && streamer.state() == ConnectionState::Closed {
            // The original keeps rendering with sends silently skipped; do
            // the same rather than treating a closed peer as an error.
            eprintln!("[loop] connection closed; continuing without sends");
            was_open = false;
        }

        ticks += 1;
        if max_ticks != 0 && ticks >= max_ticks {
            break;
        }

        let elapsed = tick_start.elapsed();
        if elapsed < frame_interval {
            thread::sleep(frame_interval - elapsed);
        }
    }

    eprintln!(
        "[loop] {} send cycles over {} ticks",
        streamer.sent_cycles(),
        ticks
    );
    Ok(())
}

fn main() -> Result<()> {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    let cli = parse_cli(&argv)?;

    let mut config = match &cli.config {
        Some(path) => StreamConfig::load_from_json(path)?,
        None => StreamConfig::default(),
    };
    apply_overrides(&mut config, &cli);
    config.validate()?;

    run(&config, cli.max_ticks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parse_cli_accepts_all_flags() {
        let cli = parse_cli(&args(&[
            "--host",
            "10.0.0.7",
            "--port",
            "9000",
            "--size",
            "320x240",
            "--fps",
            "24",
            "--views",
            "1",
            "--capture",
            "data-uri",
            "--max-ticks",
            "5",
        ]))
        .unwrap();
        assert_eq!(cli.host.as_deref(), Some("10.0.0.7"));
        assert_eq!(cli.port, Some(9000));
        assert_eq!(cli.size, Some([320, 240]));
        assert_eq!(cli.fps, Some(24));
        assert_eq!(cli.views, Some(1));
        assert_eq!(cli.capture, Some(CaptureMode::PngDataUri));
        assert_eq!(cli.max_ticks, 5);
    }

    #[test]
    fn parse_cli_rejects_unknown_arguments() {
        assert!(parse_cli(&args(&["--frobnicate"])).is_err());
        assert!(parse_cli(&args(&["--size", "320by240"])).is_err());
        assert!(parse_cli(&args(&["--capture", "bmp"])).is_err());
    }

    #[test]
    fn run_keeps_rendering_when_endpoint_is_unreachable() {
        // A freshly unbound port refuses connections immediately.
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let mut config = StreamConfig::default();
        config.port = port;
        config.resolution = [16, 16];
        config.fps = 1000;
        run(&config, 3).unwrap();
    }

    #[test]
    fn overrides_take_precedence_over_defaults() {
        let cli = parse_cli(&args(&["--port", "9000", "--views", "1"])).unwrap();
        let mut config = StreamConfig::default();
        apply_overrides(&mut config, &cli);
        assert_eq!(config.port, 9000);
        assert_eq!(config.views, 1);
        assert_eq!(config.host, "127.0.0.1");
    }
}
