//! Input method and text entry helpers

use base64::{engine::general_purpose, Engine as _};

use crate::error::Result;
use crate::session::{DeviceSession, RestoreOutcome, IME_QUERY};

/// Input method id of ADB Keyboard
pub const ADB_KEYBOARD_IME: &str = "com.android.adbkeyboard/.AdbIME";

impl DeviceSession {
    /// Query the active input method id
    pub async fn current_input_method(&self) -> Result<String> {
        self.shell(IME_QUERY).await
    }

    /// Enable an input method and make it the default
    pub async fn enable_ime(&self, ime: &str) -> Result<()> {
        self.shell(&format!("ime enable {}", ime)).await?;
        self.shell(&format!("ime set {}", ime)).await?;
        Ok(())
    }

    /// Type text into the focused field through ADB Keyboard
    ///
    /// The text is sent base64-encoded, so no device-shell escaping is needed.
    pub async fn send_text(&self, text: &str) -> Result<()> {
        let encoded = general_purpose::STANDARD.encode(text.as_bytes());
        self.shell(&format!("am broadcast -a ADB_INPUT_B64 --es msg {}", encoded))
            .await?;
        Ok(())
    }

    /// Switch to ADB Keyboard, type `text`, then put the captured keyboard back
    ///
    /// The restore runs even when switching or typing failed; that error is
    /// returned after it.
    pub async fn type_text(&self, text: &str) -> Result<RestoreOutcome> {
        let typed = async {
            self.enable_ime(ADB_KEYBOARD_IME).await?;
            self.send_text(text).await
        }
        .await;
        let outcome = self.restore_input_method().await;
        typed.map(|()| outcome)
    }

    /// Clear the focused field through ADB Keyboard
    pub async fn clear_text(&self) -> Result<()> {
        self.shell("am broadcast -a ADB_CLEAR_TEXT").await?;
        Ok(())
    }

    /// Whether the soft keyboard window currently has a surface
    pub async fn is_keyboard_active(&self) -> Result<bool> {
        let dump = self.shell("dumpsys window InputMethod").await?;
        Ok(keyboard_has_surface(&dump))
    }
}

fn keyboard_has_surface(dump: &str) -> bool {
    dump.lines()
        .filter(|line| line.contains("mHasSurface"))
        .last()
        .map(|line| line.trim_end().ends_with("true"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyboard_has_surface() {
        let shown = "Window #1 Window{42 u0 InputMethod}:\n  mHasSurface=true\n";
        let hidden = "Window #1 Window{42 u0 InputMethod}:\n  mHasSurface=false\n";
        assert!(keyboard_has_surface(shown));
        assert!(!keyboard_has_surface(hidden));
        assert!(!keyboard_has_surface(""));
    }

    #[test]
    fn test_text_is_base64_encoded() {
        let encoded = general_purpose::STANDARD.encode("a&b \"c\"".as_bytes());
        assert!(!encoded.contains('&'));
        assert!(!encoded.contains(' '));
    }
}
