use serde::{Deserialize, Serialize};

/// Domain kind of an editable parameter.
///
/// Each kind corresponds to one enumerable instrument-resource category
/// with its own valid index range (see [`crate::params::rules`]). The two
/// non-resource kinds, [`ParamKind::Numeric`] and [`ParamKind::Enumeration`],
/// classify plain argument values.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    /// Analog input channel (`CH1`–`CH4`), or a digital sub-channel group
    /// (`CH1_D0`–`CH1_D7`) when the digital suffix is present.
    Channel,
    /// Digital bit line (`D0`–`D7`).
    DigitalBit,
    /// Reference waveform slot (`REF1`–`REF4`).
    Reference,
    /// Math waveform slot (`MATH1`–`MATH4`).
    Math,
    /// Serial/parallel bus (`B1`–`B8`, also written `BUS1`–`BUS8`).
    Bus,
    /// Automatic measurement slot (`MEAS1`–`MEAS8`).
    Measurement,
    /// Cursor (`CURSOR1`, `CURSOR2`).
    Cursor,
    /// Zoom window (`ZOOM1` only).
    Zoom,
    /// Search slot (`SEARCH1`–`SEARCH8`).
    Search,
    /// Power analysis slot (`POWER1`–`POWER8`).
    Power,
    /// Histogram slot (`HISTOGRAM1`–`HISTOGRAM4`).
    Histogram,
    /// Callout annotation (`CALLOUT1`–`CALLOUT4`).
    Callout,
    /// Mask test slot (`MASK1`–`MASK8`).
    Mask,
    /// Measurement area (`AREA1`–`AREA8`).
    Area,
    /// Source channel of a source-measure or supply unit (`SOURCE1`, `SOURCE2`).
    Source,
    /// Trigger edge slot (`EDGE1`, `EDGE2`).
    Edge,
    /// Acquisition segment (`SEGMENT1`–`SEGMENT8`).
    Segment,
    /// Reference point marker (`POINT1`–`POINT4`).
    Point,
    /// Results table (`TABLE1`–`TABLE4`).
    Table,
    /// Waveform view (`VIEW1`–`VIEW4`).
    View,
    /// Generator function slot (`FUNCTION1`, `FUNCTION2`).
    Function,
    /// Output connector (`OUTPUT1`, `OUTPUT2`).
    Output,
    /// XY/math plot (`PLOT1`–`PLOT4`).
    Plot,
    /// A plain numeric argument (no bounded option set).
    Numeric,
    /// A bare-word enumeration argument; options come from the command
    /// catalog's syntax template when one is loaded.
    Enumeration,
}

impl std::fmt::Display for ParamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ParamKind::Channel => "channel",
            ParamKind::DigitalBit => "digital-bit",
            ParamKind::Reference => "reference",
            ParamKind::Math => "math",
            ParamKind::Bus => "bus",
            ParamKind::Measurement => "measurement",
            ParamKind::Cursor => "cursor",
            ParamKind::Zoom => "zoom",
            ParamKind::Search => "search",
            ParamKind::Power => "power",
            ParamKind::Histogram => "histogram",
            ParamKind::Callout => "callout",
            ParamKind::Mask => "mask",
            ParamKind::Area => "area",
            ParamKind::Source => "source",
            ParamKind::Edge => "edge",
            ParamKind::Segment => "segment",
            ParamKind::Point => "point",
            ParamKind::Table => "table",
            ParamKind::View => "view",
            ParamKind::Function => "function",
            ParamKind::Output => "output",
            ParamKind::Plot => "plot",
            ParamKind::Numeric => "numeric",
            ParamKind::Enumeration => "enumeration",
        };
        write!(f, "{s}")
    }
}
