//! App lifecycle and query helpers

use std::path::Path;

use crate::error::{AdbError, Result};
use crate::session::DeviceSession;

fn quote(value: &str) -> Result<String> {
    shlex::try_quote(value)
        .map(|q| q.into_owned())
        .map_err(|e| AdbError::InvalidCommand {
            command: value.to_string(),
            reason: e.to_string(),
        })
}

/// `mCurrentFocus=Window{1f2e u0 com.app/com.app.Main}` -> `com.app/com.app.Main`
fn parse_focused_component(text: &str) -> Option<String> {
    let last = text
        .lines()
        .filter(|line| line.contains("mCurrentFocus"))
        .last()?
        .replace("mCurrentFocus=", "");
    let token = last.split_whitespace().last()?;
    let component = token.trim_end_matches('}');
    if component.is_empty() || component == "null" {
        None
    } else {
        Some(component.to_string())
    }
}

fn parse_version_name(dump: &str) -> Option<String> {
    dump.lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix("versionName="))
        .map(|v| v.trim().to_string())
}

impl DeviceSession {
    /// Open a deep link (`am start -a android.intent.action.VIEW -d <url>`)
    ///
    /// The url is quoted for the device shell, so `&` and `?` survive as-is.
    pub async fn open_url(&self, url: &str) -> Result<String> {
        self.shell(&format!(
            "am start -a android.intent.action.VIEW -d {}",
            quote(url)?
        ))
        .await
    }

    /// Bring an installed app back to the foreground via its launcher intent
    pub async fn bring_to_front(&self, package: &str) -> Result<String> {
        self.shell(&format!(
            "monkey -p {} -c android.intent.category.LAUNCHER 1",
            quote(package)?
        ))
        .await
    }

    /// Focused window line from `dumpsys window`
    pub async fn current_window(&self) -> Result<Option<String>> {
        let dump = self.shell("dumpsys window").await?;
        Ok(dump
            .lines()
            .find(|line| line.contains("mFocusedWindow") || line.contains("mCurrentFocus"))
            .map(|line| line.trim().to_string()))
    }

    /// `package/activity` of the focused window
    pub async fn current_package(&self) -> Result<Option<String>> {
        let dump = self.shell("dumpsys window windows").await?;
        Ok(parse_focused_component(&dump))
    }

    /// Whether `pm list packages` knows the package
    pub async fn is_app_installed(&self, package: &str) -> Result<bool> {
        let listing = self
            .shell(&format!("pm list packages {}", quote(package)?))
            .await?;
        let wanted = format!("package:{}", package);
        Ok(listing.lines().any(|line| line.trim() == wanted))
    }

    /// Wipe an app's data and cache (`pm clear`)
    pub async fn clear_app_data(&self, package: &str) -> Result<String> {
        self.shell(&format!("pm clear {}", quote(package)?)).await
    }

    /// `versionName` reported by `dumpsys package`
    pub async fn app_version(&self, package: &str) -> Result<Option<String>> {
        let dump = self
            .shell(&format!("dumpsys package {}", quote(package)?))
            .await?;
        Ok(parse_version_name(&dump))
    }

    /// Install an APK from the host (`adb install -r <apk>`)
    pub async fn install(&self, apk: &Path) -> Result<String> {
        let apk = apk.to_string_lossy();
        self.command_args(&["install", "-r", &*apk]).await
    }

    /// Toggle Wi-Fi through the helper activity `com.example.chris.adbhelper`
    pub async fn set_wifi(&self, enabled: bool) -> Result<String> {
        let status = if enabled { "enablewifi" } else { "disablewifi" };
        self.shell(&format!(
            "am start -n com.example.chris.adbhelper/.MainActivity --es msg {}",
            status
        ))
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_focused_component() {
        let text = "  mCurrentFocus=Window{1f2e3d u0 com.example.shop/com.example.shop.MainActivity}";
        assert_eq!(
            parse_focused_component(text).as_deref(),
            Some("com.example.shop/com.example.shop.MainActivity")
        );
        assert_eq!(parse_focused_component("mCurrentFocus=null"), None);
        assert_eq!(parse_focused_component(""), None);
    }

    #[test]
    fn test_parse_version_name() {
        let dump = "Packages:\n  Package [com.example] (abc):\n    versionCode=42 minSdk=21\n    versionName=3.1.4\n";
        assert_eq!(parse_version_name(dump).as_deref(), Some("3.1.4"));
        assert_eq!(parse_version_name("Unable to find package"), None);
    }

    #[test]
    fn test_quote_url() {
        let url = "shop://wdb/account?a=1&b=2";
        let quoted = quote(url).unwrap();
        assert_ne!(quoted, url);
        assert_eq!(shlex::split(&quoted).unwrap(), vec![url.to_string()]);
        assert_eq!(quote("com.example").unwrap(), "com.example");
    }
}
