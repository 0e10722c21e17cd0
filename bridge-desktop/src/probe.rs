//! Media probe backed by the `ffprobe` command line tool

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    probe::MediaProbe,
};
use core_async::process::{Command, Stdio};
use core_async::time::{timeout, Duration};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Runs `ffprobe` against the first video stream and reports its width.
///
/// The child process is killed if the timeout elapses, so a hung probe
/// never outlives the call.
#[derive(Debug, Clone)]
pub struct FfprobeMediaProbe {
    program: PathBuf,
    timeout: Duration,
}

impl FfprobeMediaProbe {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    fn command(&self, path: &Path) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=width",
                "-of",
                "csv=p=0",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        command
    }
}

#[async_trait]
impl MediaProbe for FfprobeMediaProbe {
    async fn video_width(&self, path: &Path) -> Result<u32> {
        debug!(path = %path.display(), program = %self.program.display(), "Probing media");

        let output = timeout(self.timeout, self.command(path).output())
            .await
            .map_err(|_| BridgeError::Timeout(self.timeout))??;

        if !output.status.success() {
            return Err(BridgeError::OperationFailed(format!(
                "{} exited with {}",
                self.program.display(),
                output.status
            )));
        }

        parse_width_output(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Parses the width `ffprobe` prints for `stream=width` in `csv=p=0` mode.
///
/// Some builds append a trailing separator (`1920,`); the first non-empty
/// line wins.
pub fn parse_width_output(stdout: &str) -> Result<u32> {
    let line = stdout
        .lines()
        .map(|line| line.trim().trim_end_matches(','))
        .find(|line| !line.is_empty())
        .ok_or_else(|| BridgeError::OperationFailed("probe produced no output".to_string()))?;

    match line.parse::<u32>() {
        Ok(width) if width > 0 => Ok(width),
        _ => Err(BridgeError::OperationFailed(format!(
            "unexpected probe output: {line:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_width_output() {
        assert_eq!(parse_width_output("3840\n").unwrap(), 3840);
        assert_eq!(parse_width_output("\n1920,\n").unwrap(), 1920);
        assert!(parse_width_output("").is_err());
        assert!(parse_width_output("N/A\n").is_err());
        assert!(parse_width_output("0\n").is_err());
    }

    #[cfg(unix)]
    fn script(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("fake-ffprobe");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_probe_reads_width_from_program() {
        let dir = tempfile::tempdir().unwrap();
        let program = script(dir.path(), "echo 3840");
        let probe = FfprobeMediaProbe::new(program, Duration::from_secs(5));

        let width = probe.video_width(Path::new("/any/file.mkv")).await.unwrap();
        assert_eq!(width, 3840);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_probe_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let program = script(dir.path(), "sleep 5");
        let probe = FfprobeMediaProbe::new(program, Duration::from_millis(100));

        let err = probe
            .video_width(Path::new("/any/file.mkv"))
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::Timeout(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_probe_nonzero_exit_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let program = script(dir.path(), "exit 1");
        let probe = FfprobeMediaProbe::new(program, Duration::from_secs(5));

        let err = probe
            .video_width(Path::new("/any/file.mkv"))
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::OperationFailed(_)));
    }

    #[tokio::test]
    async fn test_probe_missing_program() {
        let probe = FfprobeMediaProbe::new(
            "definitely-not-a-real-ffprobe",
            Duration::from_secs(1),
        );

        let err = probe
            .video_width(Path::new("/any/file.mkv"))
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::Io(_)));
    }
}
