//! File transfer and screenshot capture

use std::path::{Path, PathBuf};

use tracing::debug;
use uuid::Uuid;

use crate::config::TimingConfig;
use crate::error::{AdbError, Result};
use crate::session::DeviceSession;

/// Device directory used for intermediate files
const DEVICE_TMP_DIR: &str = "/data/local/tmp";

/// A screenshot pulled to the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screenshot {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

impl DeviceSession {
    /// Copy a device file to the host (`adb pull`)
    ///
    /// Fails when adb reports a nonzero exit.
    pub async fn pull(&self, source: &str, target: &Path) -> Result<String> {
        let target = target.to_string_lossy();
        self.transfer(&["pull", source, &*target]).await
    }

    /// Copy a host file to the device (`adb push`)
    ///
    /// Fails when adb reports a nonzero exit.
    pub async fn push(&self, source: &Path, target: &str) -> Result<String> {
        let source = source.to_string_lossy();
        self.transfer(&["push", &*source, target]).await
    }

    async fn transfer(&self, args: &[&str]) -> Result<String> {
        let invocation = self
            .formatter()
            .direct_args(args)
            .with_timeout(self.command_timeout());
        self.execute_checked(invocation).await
    }

    /// Capture the screen as PNG and pull it to `local_path`
    ///
    /// Uses a unique file under `/data/local/tmp` and removes it afterwards.
    pub async fn screenshot(&self, local_path: &Path) -> Result<Screenshot> {
        let remote = format!("{}/screen_{}.png", DEVICE_TMP_DIR, Uuid::new_v4().simple());
        let timeout = TimingConfig::duration(self.timing().screenshot_timeout);

        let capture = self
            .shell_with_timeout(&format!("screencap -p {}", remote), timeout)
            .await?;
        if capture.contains("Status: -1") || capture.contains("Failed") {
            return Err(AdbError::CommandFailed(format!(
                "screencap refused (secure window?): {}",
                capture
            )));
        }

        let pulled = self.pull(&remote, local_path).await;
        // Remove the device copy even when the pull failed
        if let Err(e) = self.shell(&format!("rm -f {}", remote)).await {
            debug!("could not remove {}: {}", remote, e);
        }
        let pulled = pulled?;
        debug!("adb pull output: {}", pulled);

        let size = tokio::fs::metadata(local_path)
            .await
            .map(|m| m.len())
            .unwrap_or(0);
        if size == 0 {
            return Err(AdbError::CommandFailed(format!(
                "no screenshot at {} after pull: {}",
                local_path.display(),
                pulled
            )));
        }

        let (width, height) = image::image_dimensions(local_path)?;
        debug!("Screenshot dimensions: {}x{}", width, height);

        Ok(Screenshot {
            path: local_path.to_path_buf(),
            width,
            height,
        })
    }
}
