use anyhow::{anyhow, bail, Context};
use camhal::convert::SoftwareConverter;
use camhal::sinks::notifier::PictureEncoding;
use camhal::sinks::{CallbackNotifier, NotifierEvent, PreviewWindow};
use camhal::{CameraSession, SessionConfig, SyntheticSensor};
use crossbeam_channel::Receiver;
use std::env;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

struct Options {
    config: Option<PathBuf>,
    params: Option<String>,
    seconds: u64,
    output: Option<PathBuf>,
    json: bool,
}

fn main() -> anyhow::Result<()> {
    camhal::init_logging();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: camhal-cli <preview|picture|params|info> [--config <file>] [--set <k=v;...>] [--json]");
        std::process::exit(1);
    }

    let options = parse_options(&args[2..])?;
    let command = &args[1];
    match command.as_str() {
        "preview" => cmd_preview(&options),
        "picture" => cmd_picture(&options),
        "params" => cmd_params(&options),
        "info" => cmd_info(&options),
        _ => {
            eprintln!("Unknown command: {}", command);
            std::process::exit(1);
        }
    }
}

fn parse_options(args: &[String]) -> anyhow::Result<Options> {
    let mut options = Options {
        config: None,
        params: None,
        seconds: 3,
        output: None,
        json: false,
    };

    let mut i = 0;
    while i < args.len() {
        let arg = args[i].as_str();
        let mut value = |name: &str| {
            i += 1;
            args.get(i)
                .cloned()
                .ok_or_else(|| anyhow!("{} requires a value", name))
        };
        match arg {
            "--config" => options.config = Some(PathBuf::from(value("--config")?)),
            "--set" => options.params = Some(value("--set")?),
            "--seconds" => options.seconds = value("--seconds")?.parse()?,
            "--json" => options.json = true,
            other if other.starts_with("--") => bail!("unknown option {}", other),
            other => {
                if options.output.is_none() {
                    options.output = Some(PathBuf::from(other));
                }
            }
        }
        i += 1;
    }
    Ok(options)
}

fn load_config(options: &Options) -> anyhow::Result<SessionConfig> {
    match &options.config {
        Some(path) => SessionConfig::load_from_file(path)
            .with_context(|| format!("loading {}", path.display())),
        None => Ok(SessionConfig::load_or_default()),
    }
}

fn open_session(
    options: &Options,
) -> anyhow::Result<(CameraSession, Arc<PreviewWindow>, Receiver<NotifierEvent>)> {
    let config = load_config(options)?;
    let sensor = SyntheticSensor::new(0, config.camera.preview_fps);
    let preview = Arc::new(PreviewWindow::new());
    let (notifier, events) = CallbackNotifier::new(32);

    let session = CameraSession::builder(config)
        .sensor(sensor)
        .preview_sink(preview.clone())
        .delivery_sink(Arc::new(notifier))
        .converter(Arc::new(SoftwareConverter::new()))
        .build()?;

    if let Some(params) = &options.params {
        let mut merged = session.parameters();
        for (key, value) in camhal::ParameterSet::unflatten(params).iter() {
            merged.set(key, value);
        }
        session.apply_parameters(merged)?;
    }
    Ok((session, preview, events))
}

fn cmd_preview(options: &Options) -> anyhow::Result<()> {
    let (session, preview, events) = open_session(options)?;

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("installing Ctrl-C handler")?;

    session.connect()?;
    session.start_preview()?;

    let deadline = Instant::now() + Duration::from_secs(options.seconds);
    while running.load(Ordering::SeqCst) && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(100));
        for event in events.try_iter() {
            if let NotifierEvent::Error(code) = event {
                eprintln!("Device error: {}", code);
                running.store(false, Ordering::SeqCst);
            }
        }
    }

    let diagnostics = session.dump();
    session.close()?;

    if options.json {
        println!("{}", serde_json::to_string(&diagnostics)?);
    } else {
        println!(
            "Preview: {} frames{}",
            diagnostics.preview_frames,
            diagnostics
                .preview_fps
                .map(|fps| format!(" at {:.1} fps", fps))
                .unwrap_or_default()
        );
        if let Some(frame) = preview.latest_frame() {
            println!(
                "Last frame: {}x{} {} ({} bytes)",
                frame.width,
                frame.height,
                frame.fourcc,
                frame.data.len()
            );
        }
    }
    Ok(())
}

fn cmd_picture(options: &Options) -> anyhow::Result<()> {
    let output = options
        .output
        .clone()
        .ok_or_else(|| anyhow!("Usage: camhal-cli picture <output> [--set <k=v;...>]"))?;
    let (session, _preview, events) = open_session(options)?;

    session.connect()?;
    session.start_preview()?;
    session.take_picture()?;

    let picture = loop {
        match events.recv_timeout(Duration::from_secs(5)) {
            Ok(NotifierEvent::Picture(picture)) => break picture,
            Ok(NotifierEvent::Error(code)) => bail!("device error {} during capture", code),
            Ok(_) => continue,
            Err(_) => bail!("timed out waiting for the picture"),
        }
    };
    session.close()?;

    std::fs::write(&output, &picture.data)
        .with_context(|| format!("writing {}", output.display()))?;

    let encoding = match picture.encoding {
        PictureEncoding::Jpeg => "jpeg".to_string(),
        PictureEncoding::Raw(fourcc) => fourcc.to_string(),
    };
    if options.json {
        println!(
            "{}",
            serde_json::json!({
                "path": output,
                "width": picture.width,
                "height": picture.height,
                "encoding": encoding,
                "quality": picture.quality,
                "bytes": picture.data.len(),
            })
        );
    } else {
        println!(
            "Saved {}x{} {} picture to {} ({} bytes)",
            picture.width,
            picture.height,
            encoding,
            output.display(),
            picture.data.len()
        );
    }
    Ok(())
}

fn cmd_params(options: &Options) -> anyhow::Result<()> {
    let (session, _preview, _events) = open_session(options)?;
    let params = session.parameters();
    if options.json {
        let map: std::collections::BTreeMap<&str, &str> = params.iter().collect();
        println!("{}", serde_json::to_string(&map)?);
    } else {
        for (key, value) in params.iter() {
            println!("{}={}", key, value);
        }
    }
    Ok(())
}

fn cmd_info(options: &Options) -> anyhow::Result<()> {
    let (session, _preview, _events) = open_session(options)?;
    let info = session.camera_info();
    let crate_info = camhal::get_info();
    if options.json {
        println!(
            "{}",
            serde_json::json!({ "camera": info, "crate": crate_info })
        );
    } else {
        println!("{} {}", crate_info.name, crate_info.version);
        println!("facing: {}", info.facing.as_str());
        println!("orientation: {}", info.orientation);
    }
    Ok(())
}
