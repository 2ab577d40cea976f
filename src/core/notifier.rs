use crate::core::app_log::AppLog;
use crate::core::error::{Result, WatchdogError};
use crate::models::NotificationRequest;
use serde_json::json;

const SCOPE: &str = "notifications/native";

/// Renders one notification. Failures are reported, never retried.
pub trait NotificationSink: Send {
    fn show(&self, request: &NotificationRequest) -> Result<()>;
}

/// Desktop notifications through `notify-rust`.
///
/// Each notification is shown from its own short-lived thread so a slow
/// notification daemon never holds up event processing.
pub struct DesktopNotifier {
    app_name: String,
    sound: Option<String>,
    log: AppLog,
}

impl DesktopNotifier {
    pub fn new(app_name: impl Into<String>, sound: Option<String>, log: AppLog) -> Self {
        Self {
            app_name: app_name.into(),
            sound,
            log,
        }
    }

    /// Needs to run once before the first notification.
    pub fn configure_once(&self) -> Result<()> {
        #[cfg(target_os = "macos")]
        {
            // A plain binary has no bundle identifier, so macOS cannot attribute
            // notifications to it. Borrow Terminal's.
            let app_id = "com.apple.Terminal";
            notify_rust::set_application(app_id).map_err(|e| {
                WatchdogError::Sink(format!(
                    "Failed to set notification app id ({}): {}",
                    app_id, e
                ))
            })?;
        }
        Ok(())
    }
}

fn build_notification(
    app_name: &str,
    sound: Option<&str>,
    request: &NotificationRequest,
) -> notify_rust::Notification {
    let mut notification = notify_rust::Notification::new();
    notification
        .appname(app_name)
        .summary(&request.title)
        .body(&request.body);
    if let Some(icon) = request.icon.as_ref() {
        notification.icon(&icon.to_string_lossy());
    }
    if let Some(sound) = sound {
        notification.sound_name(sound);
    }
    notification
}

impl NotificationSink for DesktopNotifier {
    fn show(&self, request: &NotificationRequest) -> Result<()> {
        let notification = build_notification(&self.app_name, self.sound.as_deref(), request);
        let log = self.log.clone();
        let title = request.title.clone();

        std::thread::Builder::new()
            .name("notification".to_string())
            .spawn(move || match notification.show() {
                Ok(_) => log.info(SCOPE, "shown", Some(json!({ "title": title }))),
                Err(e) => log.error(
                    SCOPE,
                    "show_failed",
                    Some(json!({ "title": title, "error": e.to_string() })),
                ),
            })
            .map(|_| ())
            .map_err(|e| WatchdogError::Sink(format!("Failed to spawn notification thread: {}", e)))
    }
}
