//! adbctl - Command-line interface for adb device control
//!
//! Usage:
//!     adbctl [OPTIONS] <COMMAND>
//!
//! Environment Variables:
//!     ADBCTL_SERIAL: Target device serial for multi-device setups
//!     ADBCTL_ADB_PATH: Path to the adb executable (default: adb)
//!     ADBCTL_ENCODING: Primary encoding of device output (default: utf-8)
//!     RUST_LOG: Overrides the -v log level

use adb_control::{
    list_devices, run_command_line, DeviceSession, DeviceStatus, Invocation, KeyCode,
    ProcessRunner, RestoreOutcome, SessionConfig, ADB_KEYBOARD_IME, DEFAULT_BOUNDED_TIMEOUT,
};
use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// adbctl - drive an Android device through adb
#[derive(Parser, Debug)]
#[command(name = "adbctl")]
#[command(about = "adbctl - drive an Android device through adb")]
#[command(after_help = r#"Examples:
    # List attached devices
    adbctl devices

    # Run a shell command on a specific device
    adbctl -s emulator-5554 shell getprop ro.build.version.release

    # Pull a file
    adbctl cmd pull /sdcard/log.txt ./log.txt

    # Run any command line with a 5 second bound
    adbctl run --timeout 5 adb logcat -d

    # Type text through ADB Keyboard, then restore the original keyboard
    adbctl text "hello & goodbye"

    # Check the environment
    adbctl doctor
"#)]
struct Cli {
    /// Target device serial
    #[arg(short = 's', long, env = "ADBCTL_SERIAL", global = true)]
    serial: Option<String>,

    /// Path to the adb executable
    #[arg(long, env = "ADBCTL_ADB_PATH", default_value = "adb", global = true)]
    adb_path: String,

    /// Primary encoding of device output (UTF-8 is always tried as fallback)
    #[arg(long, env = "ADBCTL_ENCODING", default_value = "utf-8", global = true)]
    encoding: String,

    /// Timeout in seconds for device commands (default: wait for completion)
    #[arg(long, value_name = "SECS", global = true)]
    command_timeout: Option<f64>,

    /// Do not log every adb invocation
    #[arg(short = 'q', long, global = true)]
    quiet: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List attached devices
    Devices {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the serial of the only attached device
    Serial,
    /// Run `adb [-s SERIAL] shell <COMMAND>`
    Shell {
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
    /// Run `adb [-s SERIAL] <COMMAND>`
    Cmd {
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
    /// Run an arbitrary command line with a timeout
    Run {
        /// Timeout in seconds
        #[arg(long, default_value_t = DEFAULT_BOUNDED_TIMEOUT.as_secs_f64())]
        timeout: f64,
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        line: Vec<String>,
    },
    /// Tap at coordinates
    Tap { x: i32, y: i32 },
    /// Swipe between two points
    Swipe {
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        /// Duration in milliseconds (default: derived from distance)
        #[arg(long)]
        duration_ms: Option<u64>,
    },
    /// Send a key event: home, back, enter, menu, delete or a numeric code
    Key { key: String },
    /// Type text through ADB Keyboard
    Text {
        text: String,
        /// Leave ADB Keyboard active afterwards
        #[arg(long)]
        keep_keyboard: bool,
    },
    /// Open a deep link
    Url { url: String },
    /// Capture a screenshot to a local PNG
    Screenshot {
        /// Output path (default: screenshot_<timestamp>.png)
        path: Option<PathBuf>,
    },
    /// Show the current input method
    Ime,
    /// Check adb installation and attached devices
    Doctor,
}

/// Invocations are logged at info, so that is the floor unless `--quiet`
fn default_level(verbosity: u8, quiet: bool) -> tracing::Level {
    match verbosity {
        0 if quiet => tracing::Level::WARN,
        0 | 1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    }
}

/// Initialize tracing; RUST_LOG wins over -v
fn init_tracing(verbosity: u8, quiet: bool) {
    let level = default_level(verbosity, quiet);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string()));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn parse_key(key: &str) -> Result<KeyCode> {
    Ok(match key.to_lowercase().as_str() {
        "home" => KeyCode::Home,
        "back" => KeyCode::Back,
        "enter" => KeyCode::Enter,
        "menu" => KeyCode::Menu,
        "delete" | "del" => KeyCode::Delete,
        other => KeyCode::Code(
            other
                .parse()
                .map_err(|_| anyhow!("Unknown key: {}", key))?,
        ),
    })
}

fn secs(value: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(value).map_err(|e| anyhow!("Invalid timeout {}: {}", value, e))
}

fn session_config(cli: &Cli) -> Result<SessionConfig> {
    let mut config = SessionConfig::new()
        .with_adb_path(&cli.adb_path)
        .with_encoding(&cli.encoding)
        .with_debug(!cli.quiet);
    if let Some(serial) = &cli.serial {
        config = config.with_device_id(serial);
    }
    if let Some(timeout) = cli.command_timeout {
        config = config.with_command_timeout(secs(timeout)?);
    }
    Ok(config)
}

async fn open_session(cli: &Cli) -> Result<DeviceSession> {
    DeviceSession::open(session_config(cli)?)
        .await
        .context("Failed to open device session")
}

/// Check adb installation and devices, printing a report
async fn run_doctor(cli: &Cli) -> Result<bool> {
    println!("\u{1F50D} Checking system requirements...");
    println!("{}", "-".repeat(50));

    print!("1. Checking adb installation... ");
    io::stdout().flush().ok();

    if which::which(&cli.adb_path).is_err() {
        println!("\u{274C} FAILED");
        println!("   Error: {} is not installed or not in PATH.", cli.adb_path);
        println!("   Solution: Install Android platform tools:");
        println!("     - macOS: brew install android-platform-tools");
        println!("     - Linux: sudo apt install android-tools-adb");
        println!(
            "     - Windows: Download from https://developer.android.com/studio/releases/platform-tools"
        );
        return Ok(false);
    }

    let invocation = Invocation::new(cli.adb_path.as_str(), ["version"])
        .with_timeout(Some(Duration::from_secs(10)));
    let output = ProcessRunner::new().run(&invocation).await?;
    let version = String::from_utf8_lossy(&output.stdout);
    println!(
        "\u{2705} OK ({})",
        version.lines().next().filter(|l| !l.is_empty()).unwrap_or("installed")
    );

    print!("2. Checking connected devices... ");
    io::stdout().flush().ok();

    let devices = list_devices(&cli.adb_path, DEFAULT_BOUNDED_TIMEOUT).await?;
    let ready: Vec<&str> = devices
        .iter()
        .filter(|d| d.status == DeviceStatus::Device)
        .map(|d| d.serial.as_str())
        .collect();
    if ready.is_empty() {
        println!("\u{274C} FAILED");
        println!("   Error: No devices connected.");
        println!("   Solution:");
        println!("     1. Enable USB debugging on your Android device");
        println!("     2. Connect via USB and authorize the connection");
        return Ok(false);
    }
    println!("\u{2705} OK ({} device(s): {})", ready.len(), ready.join(", "));

    print!("3. Checking ADB Keyboard... ");
    io::stdout().flush().ok();

    let session = open_session(cli).await?;
    if session.is_app_installed("com.android.adbkeyboard").await? {
        println!("\u{2705} OK");
    } else {
        println!("\u{274C} FAILED");
        println!("   Error: ADB Keyboard is not installed on the device.");
        println!("   Solution: adbctl cmd install ADBKeyboard.apk");
        return Ok(false);
    }

    println!("{}", "-".repeat(50));
    println!("\u{2705} All system checks passed!");
    Ok(true)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match &cli.command {
        Commands::Devices { json } => {
            let devices = list_devices(&cli.adb_path, DEFAULT_BOUNDED_TIMEOUT).await?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&devices)?);
            } else if devices.is_empty() {
                println!("No devices connected");
            } else {
                for device in devices {
                    println!(
                        "{}\t{:?}\t{:?}{}",
                        device.serial,
                        device.status,
                        device.connection_type,
                        device
                            .model
                            .map(|m| format!("\t{}", m))
                            .unwrap_or_default()
                    );
                }
            }
        }
        Commands::Run { timeout, line } => {
            let line = shlex::try_join(line.iter().map(String::as_str))
                .map_err(|e| anyhow!("Cannot quote command line: {}", e))?;
            let text = run_command_line(&line, secs(*timeout)?).await?;
            println!("{}", text);
        }
        Commands::Doctor => {
            if !run_doctor(&cli).await? {
                std::process::exit(1);
            }
        }
        command => {
            let session = open_session(&cli).await?;
            run_session_command(&session, command).await?;
        }
    }

    Ok(())
}

async fn run_session_command(session: &DeviceSession, command: &Commands) -> Result<()> {
    match command {
        Commands::Serial => println!("{}", session.local_serial().await?),
        Commands::Shell { command } => println!("{}", session.shell(&command.join(" ")).await?),
        Commands::Cmd { command } => println!("{}", session.command_args(command.as_slice()).await?),
        Commands::Tap { x, y } => session.tap(*x, *y).await?,
        Commands::Swipe {
            x1,
            y1,
            x2,
            y2,
            duration_ms,
        } => {
            session
                .swipe((*x1, *y1), (*x2, *y2), duration_ms.map(Duration::from_millis))
                .await?
        }
        Commands::Key { key } => session.send_key_event(parse_key(key)?).await?,
        Commands::Text {
            text,
            keep_keyboard,
        } => {
            if *keep_keyboard {
                session.enable_ime(ADB_KEYBOARD_IME).await?;
                session.send_text(text).await?;
            } else {
                match session.type_text(text).await? {
                    RestoreOutcome::Restored => {}
                    outcome => eprintln!("warning: keyboard not restored: {:?}", outcome),
                }
            }
        }
        Commands::Url { url } => println!("{}", session.open_url(url).await?),
        Commands::Screenshot { path } => {
            let path = path.clone().unwrap_or_else(|| {
                PathBuf::from(format!(
                    "screenshot_{}.png",
                    chrono::Local::now().format("%Y%m%d_%H%M%S")
                ))
            });
            let shot = session.screenshot(&path).await?;
            println!("{} ({}x{})", shot.path.display(), shot.width, shot.height);
        }
        Commands::Ime => {
            println!("{}", session.current_input_method().await?);
        }
        Commands::Devices { .. } | Commands::Run { .. } | Commands::Doctor => {
            bail!("command does not need a device session")
        }
    }
    Ok(())
}
