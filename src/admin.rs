//! Links to the bearerbox admin interface.
//!
//! URLs are only built here; the browser issues them after the operator
//! confirms. Credentials are passed through untouched apart from query
//! encoding.

use reqwest::Url;

use crate::settings::InstanceConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminCommand {
    Suspend,
    Isolate,
    Resume,
    FlushDlr,
    Shutdown,
    Restart,
}

impl AdminCommand {
    /// Display order on the page.
    pub const ALL: [AdminCommand; 6] = [
        AdminCommand::Suspend,
        AdminCommand::Isolate,
        AdminCommand::Resume,
        AdminCommand::FlushDlr,
        AdminCommand::Shutdown,
        AdminCommand::Restart,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            AdminCommand::Suspend => "suspend",
            AdminCommand::Isolate => "isolate",
            AdminCommand::Resume => "resume",
            AdminCommand::FlushDlr => "flush-dlr",
            AdminCommand::Shutdown => "shutdown",
            AdminCommand::Restart => "restart",
        }
    }

    pub fn url(&self, instance: &InstanceConfig) -> String {
        command_url(
            instance,
            self.name(),
            &[("password", instance.admin_password.as_str())],
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkCommand {
    Stop,
    Start,
}

impl LinkCommand {
    pub fn name(&self) -> &'static str {
        match self {
            LinkCommand::Stop => "stop-smsc",
            LinkCommand::Start => "start-smsc",
        }
    }

    /// Short label for the link text.
    pub fn label(&self) -> &'static str {
        match self {
            LinkCommand::Stop => "stop",
            LinkCommand::Start => "start",
        }
    }

    pub fn url(&self, instance: &InstanceConfig, smsc_id: &str) -> String {
        command_url(
            instance,
            self.name(),
            &[
                ("password", instance.admin_password.as_str()),
                ("smsc", smsc_id),
            ],
        )
    }
}

fn command_url(instance: &InstanceConfig, command: &str, params: &[(&str, &str)]) -> String {
    let raw = format!("{}/{}", instance.base(), command);
    match Url::parse_with_params(&raw, params) {
        Ok(url) => url.to_string(),
        // Unparsable base URLs are passed through; the request fails later.
        Err(_) => {
            let query: Vec<String> = params.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
            format!("{}?{}", raw, query.join("&"))
        }
    }
}
