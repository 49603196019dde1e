use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::Command;

use eyre::{Result, WrapErr, bail};
use log::{debug, info, warn};

use ytclip::config::{Config, config_path};
use ytclip::error::Error;
use ytclip::naming::VersionSuffix;
use ytclip::session::Session;
use ytclip::timespec::{self, TimeRange};
use ytclip::{is_accepted_url, output};

mod cli;

use cli::Cli;

const TIME_FORMAT_HELP: &str = "expected MM:SS, HH:MM:SS, MMSS or HHMMSS (e.g. 01:30 or 0130)";

fn setup_logging() -> Result<()> {
    let log_dir = log_dir();
    std::fs::create_dir_all(&log_dir)?;
    let log_file = log_dir.join("ytclip.log");

    let target = Box::new(std::fs::OpenOptions::new().create(true).append(true).open(&log_file)?);

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized: {}", log_file.display());
    Ok(())
}

fn log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ytclip")
        .join("logs")
}

fn tool_version(name: &str, flag: &str) -> Option<String> {
    Command::new(name)
        .arg(flag)
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| {
            String::from_utf8_lossy(&o.stdout)
                .trim()
                .lines()
                .next()
                .unwrap_or("")
                .to_string()
        })
}

fn build_after_help() -> String {
    let tool_line = |name: &str, flag: &str, why: &str| match tool_version(name, flag) {
        Some(v) => format!("  \x1b[32m✅\x1b[0m {name:<10} {v}"),
        None => format!("  \x1b[31m❌\x1b[0m {name:<10} (not found, {why})"),
    };

    let yt_dlp_line = tool_line("yt-dlp", "--version", "required for every download");
    let ffmpeg_line = tool_line("ffmpeg", "-version", "needed to merge streams and cut sections");

    format!(
        "\nREQUIRED TOOLS:\n{yt_dlp_line}\n{ffmpeg_line}\n\nConfig is read from: {}\nLogs are written to: {}",
        config_path().display(),
        log_dir().join("ytclip.log").display()
    )
}

/// Point at the accepted time formats when a time input was the problem
fn report_input_error(e: &Error) {
    if e.is_time_input() {
        eprintln!("Time format: {TIME_FORMAT_HELP}");
    }
}

/// Print a prompt and read one trimmed line
fn prompt(input: &mut impl BufRead, label: &str) -> Result<String> {
    print!("{label}");
    io::stdout().flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        bail!("input closed before all values were entered");
    }
    Ok(line.trim().to_string())
}

/// Prompt until `accept` passes, reporting `problem` on each rejection
fn prompt_until(
    input: &mut impl BufRead,
    label: &str,
    accept: impl Fn(&str) -> bool,
    problem: &str,
) -> Result<String> {
    loop {
        let value = prompt(input, label)?;
        if accept(&value) {
            return Ok(value);
        }
        eprintln!("{problem}");
    }
}

/// Interactively collect URL, start and end
fn prompt_request(input: &mut impl BufRead) -> Result<(String, String, String)> {
    println!("YouTube clip downloader");
    println!("Time format: {TIME_FORMAT_HELP}");
    println!("Leave start and end empty to download the whole video");

    let url = prompt_until(
        input,
        "YouTube URL: ",
        is_accepted_url,
        "Not a supported YouTube URL (watch, youtu.be, embed or shorts link), try again",
    )?;

    loop {
        let problem = format!("Invalid time, {TIME_FORMAT_HELP}");
        let start = prompt_until(input, "Start time (empty for whole video): ", timespec::validate, &problem)?;
        let end = prompt_until(input, "End time (empty for whole video): ", timespec::validate, &problem)?;

        match TimeRange::from_parts(&start, &end) {
            Ok(_) => return Ok((url, start, end)),
            Err(e) => eprintln!("{e}"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging()?;

    let after_help = build_after_help();
    let cmd = <Cli as clap::CommandFactory>::command().after_help(after_help);
    let matches = cmd.get_matches();
    let cli = <Cli as clap::FromArgMatches>::from_arg_matches(&matches)?;

    // Load config file (non-fatal if missing/invalid)
    let config = Config::load().unwrap_or_else(|e| {
        warn!("Ignoring invalid config: {e}");
        Config::default()
    });

    if cli.verbose {
        let path = config_path();
        if path.exists() {
            eprintln!("Config: {}", path.display());
        }
    }

    let suffix = if cli.lower_suffix {
        VersionSuffix::Lower
    } else {
        config.version_suffix
    };
    let downloader = config.downloader().with_suffix(suffix);

    let output_dir = cli
        .output_dir
        .clone()
        .or_else(|| config.output_dir.clone())
        .unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&output_dir)
        .wrap_err_with(|| format!("could not create output directory {}", output_dir.display()))?;

    let browser = cli.browser.or(config.default_browser);
    if let Some(browser) = browser.filter(|_| !config.allow_browser_cookies) {
        eprintln!(
            "Cookie sourcing is disabled, not using {browser} cookies (set allow_browser_cookies = true in {})",
            config_path().display()
        );
    }

    let (url, start, end) = match &cli.url {
        Some(url) => {
            let (start, end) = match &cli.range {
                Some(token) => timespec::split_token(token)
                    .inspect_err(report_input_error)
                    .wrap_err("invalid --range")?
                    .unwrap_or(("", "")),
                None => (
                    cli.start.as_deref().unwrap_or(""),
                    cli.end.as_deref().unwrap_or(""),
                ),
            };
            (url.clone(), start.to_string(), end.to_string())
        }
        None => prompt_request(&mut io::stdin().lock())?,
    };
    debug!("Input: url={url} start={start:?} end={end:?}");

    let mut session = Session::new(browser);
    let request = session
        .submit(&url, &start, &end)
        .inspect_err(report_input_error)
        .wrap_err("invalid input")?;

    if cli.verbose {
        eprintln!("URL: {url}\nOutput: {}", output_dir.display());
    }

    eprintln!("Fetching video info...");
    let info = session
        .fetch_info(&downloader, &request)
        .await
        .wrap_err("could not fetch video info")?;
    eprintln!("{}", output::render_video_info(info));
    eprintln!("{}", output::render_configuring(&request.range));

    let mut shown_progress = false;
    let result = session
        .invoke(&downloader, &request, &output_dir, |progress| {
            eprint!("\r\x1b[2K{}", output::render_progress(progress));
            shown_progress = true;
        })
        .await;
    if shown_progress {
        eprintln!();
    }

    let artifact = result.wrap_err("download failed")?;
    println!("{}", output::render_artifact(artifact));

    Ok(())
}
