use crabclip::config::CrabClipConfig;
use crabclip::monitoring::Monitor;
use crabclip::platform::NativeCaptureProvider;
use crabclip::recording::NativeRecorderProvider;
use crabclip::{CaptureController, StartOutcome};
use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

type Controller = CaptureController<NativeCaptureProvider, NativeRecorderProvider>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    crabclip::init_logging();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: crabclip-cli <probe|record> [--seconds N] [--json] [--config PATH]");
        std::process::exit(1);
    }

    let config = load_config(&args)?;
    let mut controller = CaptureController::new(
        &config,
        NativeCaptureProvider::new(),
        NativeRecorderProvider::new(&config.recording.output_directory),
    )
    .with_monitor(Monitor::from_config(&config.monitoring));

    let command = &args[1];
    match command.as_str() {
        "probe" => cmd_probe(&mut controller, &args).await,
        "record" => cmd_record(&mut controller, &args).await,
        _ => {
            eprintln!("Unknown command: {}", command);
            std::process::exit(1);
        }
    }
}

fn load_config(args: &[String]) -> Result<CrabClipConfig, Box<dyn std::error::Error>> {
    let config = match args.iter().position(|a| a == "--config") {
        Some(i) => {
            let path = args.get(i + 1).ok_or("--config needs a path")?;
            CrabClipConfig::load_from_file(path)?
        }
        None => CrabClipConfig::load_or_default(),
    };
    config.validate()?;
    Ok(config)
}

async fn cmd_probe(controller: &mut Controller, args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let state = controller.probe().await.clone();
    let json = args.contains(&"--json".to_string());

    if json {
        let report = serde_json::json!({
            "probe": state,
            "capability": controller.capability(),
            "selection": controller.selection(),
            "frame_rates": controller.frame_rate_options(),
            "container": controller.container().mime_type(),
        });
        println!("{}", serde_json::to_string(&report)?);
        return Ok(());
    }

    match controller.capability() {
        Some(capability) => println!("Camera: {}", capability.describe()),
        None => println!("Camera: not probed ({:?})", state),
    }
    let selection = controller.selection();
    println!(
        "Selection: {} @ {} -> {}",
        option_label(selection.resolution.map(|r| r.label().to_string())),
        option_label(selection.frame_rate.map(|f| f.label())),
        option_label(selection.bit_rate.map(|b| b.label().to_string()))
    );
    for option in controller.frame_rate_options() {
        let marker = if option.disabled { " (unsupported)" } else { "" };
        println!("  {}{}", option.label, marker);
    }
    println!("Container: {}", controller.container().mime_type());
    Ok(())
}

async fn cmd_record(controller: &mut Controller, args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    // Parse args: record [--seconds <n>] [--json]
    let mut seconds = 5u64;
    let mut json = false;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--seconds" => {
                i += 1;
                seconds = args.get(i).ok_or("--seconds needs a value")?.parse()?;
            }
            "--json" => json = true,
            "--config" => i += 1,
            other => {
                eprintln!("Ignoring unknown argument: {}", other);
            }
        }
        i += 1;
    }

    controller.probe().await;

    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = interrupted.clone();
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))?;

    match controller.start().await {
        StartOutcome::Started => {}
        other => {
            if json {
                println!("{}", serde_json::to_string(&other)?);
            } else {
                eprintln!("Cannot record: {:?}", other);
            }
            std::process::exit(2);
        }
    }

    if !json {
        println!("Recording for {}s (Ctrl-C to stop early)...", seconds);
    }
    let deadline = Instant::now() + Duration::from_secs(seconds);
    while Instant::now() < deadline && !interrupted.load(Ordering::SeqCst) {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    let index = controller.stop().await?.ok_or("Recording was not active")?;
    let descriptor = controller
        .catalog()
        .get(index)
        .ok_or("Recording missing from catalog")?;

    if json {
        println!("{}", serde_json::to_string(descriptor)?);
    } else {
        println!(
            "Saved {} ({}) -> {}",
            descriptor.file_name, descriptor.size_label, descriptor.url
        );
    }
    Ok(())
}

fn option_label(label: Option<String>) -> String {
    label.unwrap_or_else(|| "default".to_string())
}
