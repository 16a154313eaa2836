//! Gestures and key events built on the shell primitive

use std::time::Duration;

use crate::config::TimingConfig;
use crate::error::Result;
use crate::session::DeviceSession;

/// Android key codes used by the helpers
///
/// See <https://developer.android.com/reference/android/view/KeyEvent>.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCode {
    Home,
    Back,
    Enter,
    Menu,
    Delete,
    /// Any other numeric key code
    Code(u32),
}

impl KeyCode {
    pub fn code(self) -> u32 {
        match self {
            Self::Home => 3,
            Self::Back => 4,
            Self::Enter => 66,
            Self::Menu => 82,
            Self::Delete => 67,
            Self::Code(code) => code,
        }
    }
}

async fn pause(secs: f64) {
    let delay = TimingConfig::duration(secs);
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

/// Swipe duration derived from distance when the caller gives none
fn default_swipe_duration(start: (i32, i32), end: (i32, i32)) -> u32 {
    let dx = i128::from(start.0) - i128::from(end.0);
    let dy = i128::from(start.1) - i128::from(end.1);
    ((dx * dx + dy * dy) / 1000).clamp(300, 2000) as u32
}

impl DeviceSession {
    /// Send a key event, then wait `key_event_delay`
    pub async fn send_key_event(&self, key: KeyCode) -> Result<()> {
        self.shell(&format!("input keyevent {}", key.code())).await?;
        pause(self.timing().key_event_delay).await;
        Ok(())
    }

    pub async fn press_back(&self) -> Result<()> {
        self.send_key_event(KeyCode::Back).await
    }

    pub async fn press_home(&self) -> Result<()> {
        self.send_key_event(KeyCode::Home).await
    }

    pub async fn press_enter(&self) -> Result<()> {
        self.send_key_event(KeyCode::Enter).await
    }

    /// Tap at the specified coordinates
    pub async fn tap(&self, x: i32, y: i32) -> Result<()> {
        self.shell(&format!("input tap {} {}", x, y)).await?;
        pause(self.timing().tap_delay).await;
        Ok(())
    }

    /// Swipe from start to end; without a duration one is derived from distance
    pub async fn swipe(
        &self,
        start: (i32, i32),
        end: (i32, i32),
        duration: Option<Duration>,
    ) -> Result<()> {
        let duration_ms = duration
            .map(|d| d.as_millis().min(u128::from(u32::MAX)) as u32)
            .unwrap_or_else(|| default_swipe_duration(start, end));
        self.shell(&format!(
            "input swipe {} {} {} {} {}",
            start.0, start.1, end.0, end.1, duration_ms
        ))
        .await?;
        pause(self.timing().swipe_delay).await;
        Ok(())
    }

    /// Long press is a zero-distance swipe held for `duration`
    pub async fn long_press(&self, x: i32, y: i32, duration: Duration) -> Result<()> {
        self.swipe((x, y), (x, y), Some(duration)).await
    }

    /// Finger travels from y=`height` up to the top edge
    pub async fn swipe_down(&self, height: i32) -> Result<()> {
        self.shell(&format!("input swipe 500 {} 500 0", height)).await?;
        pause(self.timing().swipe_delay).await;
        Ok(())
    }

    /// Finger travels from y=500 down to `height + 500`
    pub async fn swipe_up(&self, height: i32) -> Result<()> {
        self.shell(&format!("input swipe 500 500 500 {}", height.saturating_add(500)))
            .await?;
        pause(self.timing().swipe_delay).await;
        Ok(())
    }

    /// Swipe left 500 px
    pub async fn swipe_left(&self) -> Result<()> {
        self.shell("input swipe 500 500 0 500").await?;
        pause(self.timing().swipe_delay).await;
        Ok(())
    }

    /// Swipe right 500 px
    pub async fn swipe_right(&self) -> Result<()> {
        self.shell("input swipe 500 500 1000 500").await?;
        pause(self.timing().swipe_delay).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_codes() {
        assert_eq!(KeyCode::Home.code(), 3);
        assert_eq!(KeyCode::Back.code(), 4);
        assert_eq!(KeyCode::Enter.code(), 66);
        assert_eq!(KeyCode::Code(187).code(), 187);
    }

    #[test]
    fn test_default_swipe_duration_is_clamped() {
        assert_eq!(default_swipe_duration((0, 0), (0, 0)), 300);
        assert_eq!(default_swipe_duration((500, 1500), (500, 500)), 1000);
        assert_eq!(default_swipe_duration((0, 0), (2000, 2000)), 2000);
    }

    #[test]
    fn test_default_swipe_duration_extreme_coordinates() {
        assert_eq!(
            default_swipe_duration((i32::MIN, i32::MIN), (i32::MAX, i32::MAX)),
            2000
        );
        assert_eq!(default_swipe_duration((i32::MAX, 0), (i32::MAX, 0)), 300);
    }
}
