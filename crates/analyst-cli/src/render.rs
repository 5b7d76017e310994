//! Terminal rendering of session progress

use std::io::Write;
use std::path::Path;

use analyst_core::session::{step_descriptor, MAX_STEP, STEPS};
use analyst_core::{Config, Message, Notice, Session, SessionChange};
use console::style;

/// Print everything one applied frame changed, in the order it changed
pub fn changes(session: &Session, changes: &[SessionChange]) {
    for change in changes {
        match change {
            SessionChange::MessageAppended(index) => {
                if let Some(message) = session.messages().get(*index) {
                    self::message(message);
                }
            }
            SessionChange::StepChanged(step) => step_banner(*step),
            SessionChange::ReportSet => {
                println!("{}", style("Final report received").green());
            }
            SessionChange::InputRequested => {
                println!(
                    "{} {}",
                    style("The agent needs your input.").yellow().bold(),
                    style("(type q to cancel the analysis)").dim()
                );
                prompt();
            }
            SessionChange::Completed => {
                println!();
                println!("{}", style("Analysis complete").bold().green());
            }
        }
    }
}

pub fn message(message: &Message) {
    match message {
        Message::Oneline { text } => println!("  {} {}", style("•").cyan(), text),
        Message::Detailed { summary, content } => {
            println!();
            println!("{}", style(summary).bold());
            for line in content.lines() {
                println!("  {}", line);
            }
        }
    }
}

pub fn step_banner(step: u8) {
    let Some(descriptor) = step_descriptor(step) else {
        return;
    };
    println!();
    println!(
        "{} {}",
        style(format!("[{}/{}]", step, MAX_STEP)).cyan().bold(),
        style(descriptor.title).bold()
    );
    println!("  {}", style(descriptor.description).dim());
}

pub fn notice(notice: &Notice) {
    let text = notice.message();
    match notice {
        Notice::ConnectionFailure { .. } | Notice::ConnectionLost { .. } => {
            eprintln!("{}", style(text).red());
        }
        Notice::Protocol { .. } | Notice::DispatchRejected { .. } => {
            eprintln!("{}", style(text).yellow());
        }
    }
}

pub fn prompt() {
    print!("{} ", style(">").green().bold());
    let _ = std::io::stdout().flush();
}

pub fn hint(text: &str) {
    println!("{}", style(text).dim());
}

pub fn warning(text: &str) {
    eprintln!("{}", style(format!("Warning: {}", text)).yellow());
}

/// Print the pipeline stages
pub fn steps() {
    println!("{}", style("Analysis steps:").bold());
    println!();
    for line in step_lines() {
        println!("{}", line);
    }
}

fn step_lines() -> Vec<String> {
    STEPS
        .iter()
        .map(|descriptor| {
            format!(
                "  {}. {:<18} {}",
                descriptor.step,
                style(descriptor.title).cyan(),
                style(descriptor.description).dim()
            )
        })
        .collect()
}

pub fn config(config: &Config, config_path: &Path) {
    println!("{}", style("Configuration:").bold());
    println!();
    println!("  Config file: {}", style(config_path.display()).dim());
    println!(
        "  Base URL: {}",
        style(config.server.resolve_base_url()).green()
    );
    match config.server.endpoint_url() {
        Ok(url) => println!("  Endpoint: {}", style(url).green()),
        Err(e) => println!("  Endpoint: {}", style(e).red()),
    }
    println!(
        "  Connect timeout: {} ms",
        config.server.connect_timeout_ms
    );
    println!(
        "  Request file: {}",
        style(config.handoff.resolve_path().display()).dim()
    );
    println!(
        "  Report directory: {}",
        style(config.report.resolve_output_dir().display()).dim()
    );
    println!("  Log level: {}", config.general.log_level);
}
