//! Device registry: alias → connection endpoint, backend, device class.

use serde::{Deserialize, Serialize};

/// Execution backend used to drive a device.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// Raw-protocol backend: command strings over a VISA session.
    Visa,
    /// Command-tree backend: instrument exposed as a nested object tree
    /// through a device manager.
    Tree,
    /// Command-tree device manager that also accepts raw command strings.
    Hybrid,
    /// Direct TCP socket transport. Write-only: the generated wrapper has
    /// no read path, so query-shaped blocks are rejected at compile time.
    Socket,
    /// Serial (ASRL) transport.
    Serial,
}

impl Backend {
    /// Whether operations on this backend go through the command tree.
    pub fn is_tree(self) -> bool {
        matches!(self, Backend::Tree | Backend::Hybrid)
    }

    /// Whether the backend can read a response back from the instrument.
    pub fn supports_query(self) -> bool {
        !matches!(self, Backend::Socket)
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Backend::Visa => "visa",
            Backend::Tree => "tree",
            Backend::Hybrid => "hybrid",
            Backend::Socket => "socket",
            Backend::Serial => "serial",
        };
        write!(f, "{s}")
    }
}

/// Declared instrument class of a device.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    /// Oscilloscope.
    #[serde(alias = "scope")]
    Oscilloscope,
    /// Source-measure unit.
    #[serde(alias = "smu")]
    SourceMeasureUnit,
    /// Power supply.
    #[serde(alias = "psu")]
    PowerSupply,
    /// Digital multimeter.
    #[serde(alias = "dmm")]
    Multimeter,
    /// Arbitrary/function generator.
    #[serde(alias = "afg")]
    FunctionGenerator,
    /// Arbitrary waveform generator.
    #[serde(alias = "awg")]
    ArbitraryWaveformGenerator,
}

impl DeviceClass {
    /// Device-manager factory method name for command-tree connections.
    pub fn add_method(self) -> &'static str {
        match self {
            DeviceClass::Oscilloscope => "add_scope",
            DeviceClass::SourceMeasureUnit => "add_smu",
            DeviceClass::PowerSupply => "add_ps",
            DeviceClass::Multimeter => "add_dmm",
            DeviceClass::FunctionGenerator => "add_afg",
            DeviceClass::ArbitraryWaveformGenerator => "add_awg",
        }
    }
}

impl std::fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DeviceClass::Oscilloscope => "oscilloscope",
            DeviceClass::SourceMeasureUnit => "source-measure unit",
            DeviceClass::PowerSupply => "power supply",
            DeviceClass::Multimeter => "multimeter",
            DeviceClass::FunctionGenerator => "function generator",
            DeviceClass::ArbitraryWaveformGenerator => "arbitrary waveform generator",
        };
        write!(f, "{s}")
    }
}

/// One device binding from the registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceBinding {
    /// Case-insensitive alias the program refers to the device by.
    pub alias: String,
    /// Network address or hostname, when no explicit resource is given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Explicit VISA resource string, overriding `address`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    /// Execution backend.
    pub backend: Backend,
    /// Declared instrument class.
    pub class: DeviceClass,
}

impl DeviceBinding {
    /// Canonical identifier of the physical connection endpoint, used for
    /// collision detection. Backend decorations are stripped so the same
    /// instrument reached through different transports still collides:
    /// `TCPIP0::10.0.0.5::INSTR`, `TCPIP0::10.0.0.5::4000::SOCKET`, and a
    /// bare `10.0.0.5` all canonicalize to `10.0.0.5`.
    pub fn canonical_resource(&self) -> Option<String> {
        let raw = self
            .resource
            .as_deref()
            .or(self.address.as_deref())?
            .trim();
        if raw.is_empty() {
            return None;
        }
        let lower = raw.to_ascii_lowercase();
        if lower.contains("::") {
            // VISA form: the endpoint is the second segment.
            let host = lower.split("::").nth(1).unwrap_or(&lower);
            return Some(host.to_string());
        }
        Some(lower)
    }

    /// Concrete VISA resource string for raw-protocol emission.
    pub fn visa_resource(&self) -> Option<String> {
        if let Some(explicit) = self.resource.as_deref() {
            let trimmed = explicit.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        let address = self.address.as_deref()?.trim();
        if address.is_empty() {
            return None;
        }
        Some(match self.backend {
            Backend::Socket => format!("TCPIP0::{address}::4000::SOCKET"),
            Backend::Serial => format!("ASRL{address}::INSTR"),
            Backend::Visa | Backend::Tree | Backend::Hybrid => {
                format!("TCPIP0::{address}::INSTR")
            }
        })
    }

    /// Endpoint handed to the device manager for command-tree connections.
    pub fn manager_endpoint(&self) -> Option<String> {
        let raw = self.address.as_deref().or(self.resource.as_deref())?.trim();
        if raw.is_empty() { None } else { Some(raw.to_string()) }
    }

    /// Python identifier used for this device in the generated script.
    pub fn py_ident(&self) -> String {
        sanitize_ident(&self.alias)
    }
}

/// Lower-case an alias and replace anything outside `[a-z0-9_]`, prefixing
/// an underscore when the result would start with a digit.
pub(crate) fn sanitize_ident(alias: &str) -> String {
    let mut ident: String = alias
        .trim()
        .to_ascii_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if ident.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        ident.insert(0, '_');
    }
    if ident.is_empty() {
        ident.push_str("device");
    }
    ident
}

/// The device registry given alongside a program.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceRegistry {
    /// All configured device bindings.
    pub devices: Vec<DeviceBinding>,
}

impl DeviceRegistry {
    /// Parse a registry from its JSON serialization.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Case-insensitive alias lookup.
    pub fn get(&self, alias: &str) -> Option<&DeviceBinding> {
        self.devices
            .iter()
            .find(|d| d.alias.eq_ignore_ascii_case(alias))
    }
}
