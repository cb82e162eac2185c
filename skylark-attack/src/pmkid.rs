//! Clientless PMKID capture
//!
//! Runs a bounded hcxdumptool capture, then converts the pcapng into a
//! hashcat 22000 hash file. Success is a non-empty hash artifact; the
//! intermediate pcapng is session scratch.

use skylark_core::{Error, Network, Result};
use skylark_session::{CancelToken, Session, ToolRunner};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// Hashes recovered by a PMKID run
#[derive(Debug, Clone)]
pub struct PmkidCapture {
    pub hash_file: PathBuf,
    pub hash_count: usize,
}

/// Capture PMKIDs on the session interface, optionally pinned to one target.
///
/// Returns `None` when the capture window closed without recoverable hashes.
pub async fn capture_pmkid(
    runner: &dyn ToolRunner,
    session: &Session,
    cancel: &CancelToken,
    window: Duration,
    target: Option<&Network>,
) -> Result<Option<PmkidCapture>> {
    cancel.check("pmkid capture")?;

    let label = target.map(|t| t.file_essid()).unwrap_or_else(|| "pmkid".to_string());
    let prefix = session.capture_prefix(&label);
    let pcapng = prefix.with_extension("pcapng");
    let hash_file = prefix.with_extension("22000");
    session.track_artifact(pcapng.clone());

    let iface = session.active_interface();
    let pcapng_arg = pcapng.to_string_lossy().to_string();
    let mut args: Vec<String> = vec![
        "-i".to_string(),
        iface.clone(),
        "-o".to_string(),
        pcapng_arg,
        "--enable_status=1".to_string(),
    ];
    if let Some(target) = target {
        // hcxdumptool filter file would be overkill for one AP; lock the
        // channel instead and let conversion filter by BSSID
        args.push("-c".to_string());
        args.push(target.channel.to_string());
    }
    let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();

    info!(interface = %iface, seconds = window.as_secs(), "starting PMKID capture");
    let id = runner.spawn("hcxdumptool", &arg_refs)?;
    let completed = cancel.sleep(window).await;
    runner.terminate(id).await;
    if !completed {
        return Err(Error::Cancelled("pmkid capture".to_string()));
    }

    let hash_arg = hash_file.to_string_lossy().to_string();
    let pcapng_arg = pcapng.to_string_lossy().to_string();
    let convert = runner
        .run(
            "hcxpcapngtool",
            &["-o", &hash_arg, &pcapng_arg],
            Some(Duration::from_secs(60)),
        )
        .await?;
    if !convert.success() {
        warn!(code = convert.code, "hash conversion failed");
        return Ok(None);
    }

    let hash_count = std::fs::read_to_string(&hash_file)
        .map(|s| s.lines().filter(|l| !l.trim().is_empty()).count())
        .unwrap_or(0);
    if hash_count == 0 {
        // nothing recovered; don't leave an empty artifact behind
        let _ = std::fs::remove_file(&hash_file);
        info!("no PMKID hashes recovered");
        return Ok(None);
    }

    info!(count = hash_count, file = %hash_file.display(), "PMKID hashes recovered");
    Ok(Some(PmkidCapture { hash_file, hash_count }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::ScriptedRunner;
    use skylark_core::AttackMode;
    use skylark_session::ProcessSupervisor;
    use std::sync::Arc;

    fn session(dir: &std::path::Path) -> Session {
        Session::new(
            "wlan0mon",
            AttackMode::Pmkid,
            dir,
            Duration::ZERO,
            Arc::new(ProcessSupervisor::new()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn recovers_hashes_when_conversion_yields_lines() {
        let dir = tempfile::tempdir().unwrap();
        let session = session(dir.path());
        let runner = ScriptedRunner::new();
        // the conversion tool writes the hash file as a side effect; fake it
        // by scripting success and pre-creating the file on hcxdumptool spawn
        runner.on_spawn("hcxdumptool", |args| {
            let pcapng = args
                .iter()
                .position(|a| a == "-o")
                .map(|i| args[i + 1].clone())
                .unwrap();
            std::fs::write(&pcapng, b"pcapng").unwrap();
            let hash = std::path::Path::new(&pcapng).with_extension("22000");
            std::fs::write(hash, "WPA*02*aaaa*bbbb\nWPA*01*cccc*dddd\n").unwrap();
        });

        let cancel = CancelToken::new();
        let capture = capture_pmkid(&runner, &session, &cancel, Duration::from_millis(10), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(capture.hash_count, 2);
        assert!(capture.hash_file.exists());
        assert_eq!(runner.live_count(), 0);
    }

    #[tokio::test]
    async fn empty_conversion_is_none_and_leaves_no_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let session = session(dir.path());
        let runner = ScriptedRunner::new();

        let cancel = CancelToken::new();
        let capture = capture_pmkid(&runner, &session, &cancel, Duration::from_millis(10), None)
            .await
            .unwrap();
        assert!(capture.is_none());
        assert_eq!(runner.live_count(), 0);
    }

    #[tokio::test]
    async fn failed_conversion_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let session = session(dir.path());
        let runner = ScriptedRunner::new();
        runner.script("hcxpcapngtool", None, vec![ScriptedRunner::output(1, "")]);

        let cancel = CancelToken::new();
        let capture = capture_pmkid(&runner, &session, &cancel, Duration::from_millis(10), None)
            .await
            .unwrap();
        assert!(capture.is_none());
    }
}
