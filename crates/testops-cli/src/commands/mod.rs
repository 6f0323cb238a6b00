pub mod auth;
pub mod coverage;
pub mod generate;
pub mod gitlab;
pub mod model;
pub mod plans;
pub mod settings;
pub mod standards;

use serde::Serialize;
use testops_application::CopilotUseCase;
use testops_core::notification::NotificationKind;

/// Prints the banners raised during the command to stderr.
pub fn print_notifications(app: &CopilotUseCase) {
    for notification in app.state().ui.notifications {
        let icon = match notification.kind {
            NotificationKind::Success => "✅",
            NotificationKind::Info => "ℹ️ ",
            NotificationKind::Warning => "⚠️ ",
            NotificationKind::Error => "❌",
        };
        eprintln!("{} {}", icon, notification.message);
    }
}

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
