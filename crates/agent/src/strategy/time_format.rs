//! Time format — the fixed set of timestamp layouts a strategy may declare.
//!
//! Each descriptor maps to a regex that locates the timestamp inside a raw
//! line and a chrono format string that parses the located substring.

use serde::{Deserialize, Serialize};

/// Supported timestamp layouts, keyed by their human-readable descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeFormat {
    /// `2024-03-01 12:00:00`
    #[serde(rename = "yyyy-mm-dd HH:MM:SS")]
    DashedDateTime,
    /// `2024/03/01 12:00:00`
    #[serde(rename = "yyyy/mm/dd HH:MM:SS")]
    SlashedDateTime,
    /// `20240301 12:00:00`
    #[serde(rename = "yyyymmdd HH:MM:SS")]
    CompactDateTime,
    /// `2024-03-01T12:00:00`
    #[serde(rename = "yyyy-mm-ddTHH:MM:SS")]
    IsoDateTime,
    /// `01/Mar/2024:12:00:00` (common access log)
    #[serde(rename = "dd/mmm/yyyy:HH:MM:SS")]
    AccessLog,
    /// `01/Mar/2024 12:00:00`
    #[serde(rename = "dd/mmm/yyyy HH:MM:SS")]
    SlashedMonthName,
    /// `01-Mar-2024 12:00:00`
    #[serde(rename = "dd-mmm-yyyy HH:MM:SS")]
    DashedMonthName,
    /// `01 Mar 2024 12:00:00`
    #[serde(rename = "dd mmm yyyy HH:MM:SS")]
    SpacedMonthName,
    /// `Mar  1 12:00:00` (syslog, no year)
    #[serde(rename = "mmm dd HH:MM:SS")]
    Syslog,
}

impl TimeFormat {
    pub const ALL: [TimeFormat; 9] = [
        TimeFormat::DashedDateTime,
        TimeFormat::SlashedDateTime,
        TimeFormat::CompactDateTime,
        TimeFormat::IsoDateTime,
        TimeFormat::AccessLog,
        TimeFormat::SlashedMonthName,
        TimeFormat::DashedMonthName,
        TimeFormat::SpacedMonthName,
        TimeFormat::Syslog,
    ];

    /// Look up a layout by its descriptor string.
    pub fn from_descriptor(descriptor: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.descriptor() == descriptor.trim())
    }

    pub fn descriptor(&self) -> &'static str {
        match self {
            TimeFormat::DashedDateTime => "yyyy-mm-dd HH:MM:SS",
            TimeFormat::SlashedDateTime => "yyyy/mm/dd HH:MM:SS",
            TimeFormat::CompactDateTime => "yyyymmdd HH:MM:SS",
            TimeFormat::IsoDateTime => "yyyy-mm-ddTHH:MM:SS",
            TimeFormat::AccessLog => "dd/mmm/yyyy:HH:MM:SS",
            TimeFormat::SlashedMonthName => "dd/mmm/yyyy HH:MM:SS",
            TimeFormat::DashedMonthName => "dd-mmm-yyyy HH:MM:SS",
            TimeFormat::SpacedMonthName => "dd mmm yyyy HH:MM:SS",
            TimeFormat::Syslog => "mmm dd HH:MM:SS",
        }
    }

    /// Regex locating the timestamp substring inside a line.
    pub fn locator(&self) -> &'static str {
        match self {
            TimeFormat::DashedDateTime => {
                r"(2[0-9]{3})-(0[1-9]|1[012])-([012][0-9]|3[01])\s([01][0-9]|2[0-4])(:[012345][0-9]){2}"
            }
            TimeFormat::SlashedDateTime => {
                r"(2[0-9]{3})/(0[1-9]|1[012])/([012][0-9]|3[01])\s([01][0-9]|2[0-4])(:[012345][0-9]){2}"
            }
            TimeFormat::CompactDateTime => {
                r"(2[0-9]{3})(0[1-9]|1[012])([012][0-9]|3[01])\s([01][0-9]|2[0-4])(:[012345][0-9]){2}"
            }
            TimeFormat::IsoDateTime => {
                r"(2[0-9]{3})-(0[1-9]|1[012])-([012][0-9]|3[01])T([01][0-9]|2[0-4])(:[012345][0-9]){2}"
            }
            TimeFormat::AccessLog => {
                r"([012][0-9]|3[01])/[JFMASOND][a-z]{2}/(2[0-9]{3}):([01][0-9]|2[0-4])(:[012345][0-9]){2}"
            }
            TimeFormat::SlashedMonthName => {
                r"([012][0-9]|3[01])/[JFMASOND][a-z]{2}/(2[0-9]{3})\s([01][0-9]|2[0-4])(:[012345][0-9]){2}"
            }
            TimeFormat::DashedMonthName => {
                r"([012][0-9]|3[01])-[JFMASOND][a-z]{2}-(2[0-9]{3})\s([01][0-9]|2[0-4])(:[012345][0-9]){2}"
            }
            TimeFormat::SpacedMonthName => {
                r"([012][0-9]|3[01])\s+[JFMASOND][a-z]{2}\s+(2[0-9]{3})\s([01][0-9]|2[0-4])(:[012345][0-9]){2}"
            }
            TimeFormat::Syslog => {
                r"[JFMASOND][a-z]{2}\s+([1-9]|[12][0-9]|3[01])\s([01][0-9]|2[0-4])(:[012345][0-9]){2}"
            }
        }
    }

    /// chrono parse format for the located substring.
    ///
    /// For year-less layouts this is the format of the substring *after* the
    /// current year has been prepended.
    pub fn chrono_format(&self) -> &'static str {
        match self {
            TimeFormat::DashedDateTime => "%Y-%m-%d %H:%M:%S",
            TimeFormat::SlashedDateTime => "%Y/%m/%d %H:%M:%S",
            TimeFormat::CompactDateTime => "%Y%m%d %H:%M:%S",
            TimeFormat::IsoDateTime => "%Y-%m-%dT%H:%M:%S",
            TimeFormat::AccessLog => "%d/%b/%Y:%H:%M:%S",
            TimeFormat::SlashedMonthName => "%d/%b/%Y %H:%M:%S",
            TimeFormat::DashedMonthName => "%d-%b-%Y %H:%M:%S",
            TimeFormat::SpacedMonthName => "%d %b %Y %H:%M:%S",
            TimeFormat::Syslog => "%Y %b %d %H:%M:%S",
        }
    }

    pub fn has_year(&self) -> bool {
        !matches!(self, TimeFormat::Syslog)
    }
}

impl std::fmt::Display for TimeFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.descriptor())
    }
}
