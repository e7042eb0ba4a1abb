use serde::{Deserialize, Serialize};

/// Who is making a subscription call.
///
/// An explicit capability passed by the trusted caller, replacing any form
/// of implicit caller detection. Hosts stamp `PluginDuringMount` only while
/// a plugin's mount hook is executing; UI adapters hand out `UiComponent`;
/// everything else defaults to `Unauthenticated`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CallerRole {
    UiComponent,
    PluginDuringMount,
    ConductorInternal,
    #[default]
    Unauthenticated,
}

impl CallerRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UiComponent => "ui_component",
            Self::PluginDuringMount => "plugin_during_mount",
            Self::ConductorInternal => "conductor_internal",
            Self::Unauthenticated => "unauthenticated",
        }
    }
}

/// Calling context attached to every subscribe/unsubscribe call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallerContext {
    pub role: CallerRole,
    pub plugin_id: Option<String>,
    /// Diagnostic label only; never consulted for authorization decisions.
    pub source_label: String,
}

impl CallerContext {
    pub fn ui(source_label: impl Into<String>) -> Self {
        Self {
            role: CallerRole::UiComponent,
            plugin_id: None,
            source_label: source_label.into(),
        }
    }

    pub fn plugin_mount(plugin_id: impl Into<String>) -> Self {
        let plugin_id = plugin_id.into();
        Self {
            role: CallerRole::PluginDuringMount,
            source_label: format!("plugin:{plugin_id}"),
            plugin_id: Some(plugin_id),
        }
    }

    pub fn internal() -> Self {
        Self {
            role: CallerRole::ConductorInternal,
            plugin_id: None,
            source_label: "conductor".into(),
        }
    }

    pub fn unauthenticated(source_label: impl Into<String>) -> Self {
        Self {
            role: CallerRole::Unauthenticated,
            plugin_id: None,
            source_label: source_label.into(),
        }
    }

    /// Stable identifier used in violation records and log lines.
    pub fn caller_id(&self) -> String {
        match &self.plugin_id {
            Some(id) => format!("{}:{}", self.role.as_str(), id),
            None => self.role.as_str().to_string(),
        }
    }
}
