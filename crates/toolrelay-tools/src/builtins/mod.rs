//! Built-in tools bundled with toolrelay.

mod email;
mod freshdesk;
mod utils;
mod weather;

use crate::ToolRegistry;
use log::{info, warn};
use reqwest::Client;
use std::sync::Arc;
use toolrelay_config::ToolsConfig;

pub use email::{EmailSettings, EmailTool};
pub use freshdesk::{FreshdeskSettings, FreshdeskTool};
pub use weather::{WeatherSettings, WeatherTool};

/// Register every configured built-in tool and return the registered names.
///
/// A tool whose block is absent is skipped silently. A tool whose block is
/// present but whose environment settings cannot be resolved is skipped with
/// a warning.
pub fn register_builtin_tools(
    registry: &mut ToolRegistry,
    config: &ToolsConfig,
    client: Client,
) -> Vec<String> {
    let mut registered = Vec::new();

    if let Some(weather) = &config.weather {
        match WeatherSettings::from_config(weather) {
            Ok(settings) => {
                registry.register(Arc::new(WeatherTool::new(client.clone(), settings)));
                registered.push("get_weather".to_string());
            }
            Err(err) => warn!("skipping built-in tool (name=get_weather, error={err})"),
        }
    }

    if let Some(email) = &config.email {
        match EmailSettings::from_config(email) {
            Ok(settings) => {
                registry.register(Arc::new(EmailTool::new(client.clone(), settings)));
                registered.push("send_email".to_string());
            }
            Err(err) => warn!("skipping built-in tool (name=send_email, error={err})"),
        }
    }

    if let Some(freshdesk) = &config.freshdesk {
        match FreshdeskSettings::from_config(freshdesk) {
            Ok(settings) => {
                registry.register(Arc::new(FreshdeskTool::new(client, settings)));
                registered.push("create_freshdesk_ticket".to_string());
            }
            Err(err) => {
                warn!("skipping built-in tool (name=create_freshdesk_ticket, error={err})")
            }
        }
    }

    info!(
        "registered built-in tools (count={}, names={:?})",
        registered.len(),
        registered
    );
    registered
}
