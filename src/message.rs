//! AIS report types and their fixed-offset field layouts
//!
//! Offsets and widths follow ITU-R M.1371. Decoding yields raw values,
//! sentinels included; encoding substitutes the "unavailable" sentinel for
//! every field left as `None`.

use crate::constants::{POSITION_REPORT_BITS, STATIC_VOYAGE_REPORT_BITS};
use crate::core::{BitBuffer, Channel};
use crate::error::{AisError, Result};

/// Rate of turn not available
pub const ROT_UNAVAILABLE: i32 = -128;
/// Speed over ground not available (raw, knots x10)
pub const SOG_UNAVAILABLE: u32 = 1023;
/// Longitude not available, degrees
pub const LON_UNAVAILABLE: f64 = 181.0;
/// Latitude not available, degrees
pub const LAT_UNAVAILABLE: f64 = 91.0;
/// Course over ground not available (raw, degrees x10)
pub const COG_UNAVAILABLE: u32 = 3600;
/// True heading not available
pub const HEADING_UNAVAILABLE: u16 = 511;
/// UTC second not available
pub const SECOND_UNAVAILABLE: u8 = 60;
/// ETA hour not available
pub const ETA_HOUR_UNAVAILABLE: u8 = 24;
/// ETA minute not available
pub const ETA_MINUTE_UNAVAILABLE: u8 = 60;

const COORDINATE_SCALE: f64 = 600_000.0;
const TENTHS: f64 = 10.0;

fn rounded(value: f64, factor: f64) -> i64 {
    (value * factor).round() as i64
}

fn scaled(field: &str, value: f64, factor: f64) -> Result<i64> {
    if !value.is_finite() {
        return Err(AisError::field_out_of_range(format!(
            "{} value {} is not a finite number",
            field, value
        )));
    }
    Ok(rounded(value, factor))
}

fn unsigned(field: &str, value: i64) -> Result<u64> {
    u64::try_from(value).map_err(|_| {
        AisError::field_out_of_range(format!("{} value {} is negative", field, value))
    })
}

/// Position report, message types 1, 2 and 3
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PositionReport {
    /// Message type (1-3)
    pub message_type: u8,
    /// Repeat indicator (0-3)
    pub repeat: Option<u8>,
    /// Maritime Mobile Service Identity (30 bits)
    pub mmsi: u32,
    /// Navigation status (0-15)
    pub nav_status: Option<u8>,
    /// Rate of turn, raw signed value (-128 = unavailable)
    pub rate_of_turn: Option<i32>,
    /// Speed over ground, knots (102.3 = unavailable)
    pub sog: Option<f64>,
    /// Position accuracy flag
    pub accuracy: Option<bool>,
    /// Longitude, degrees (181 = unavailable)
    pub lon: Option<f64>,
    /// Latitude, degrees (91 = unavailable)
    pub lat: Option<f64>,
    /// Course over ground, degrees (360 = unavailable)
    pub cog: Option<f64>,
    /// True heading, degrees (511 = unavailable)
    pub heading: Option<u16>,
    /// UTC second of the fix (60 = unavailable)
    pub timestamp: Option<u8>,
    /// Special manoeuvre indicator (0-2)
    pub special_manoeuvre: Option<u8>,
    /// RAIM flag
    pub raim: Option<bool>,
    /// Radio status (19 bits)
    pub radio: Option<u32>,
    /// Channel the report was received on or should be sent on
    pub channel: Option<Channel>,
}

impl Default for PositionReport {
    fn default() -> Self {
        PositionReport {
            message_type: 1,
            repeat: None,
            mmsi: 0,
            nav_status: None,
            rate_of_turn: None,
            sog: None,
            accuracy: None,
            lon: None,
            lat: None,
            cog: None,
            heading: None,
            timestamp: None,
            special_manoeuvre: None,
            raim: None,
            radio: None,
            channel: None,
        }
    }
}

impl PositionReport {
    /// Create a type 1 report for `mmsi` with every other field unavailable
    pub fn new(mmsi: u32) -> Self {
        PositionReport {
            mmsi,
            ..Default::default()
        }
    }

    /// Speed over ground in knots, `None` when unavailable
    pub fn speed_knots(&self) -> Option<f64> {
        self.sog
            .filter(|&sog| rounded(sog, TENTHS) != i64::from(SOG_UNAVAILABLE))
    }

    /// Longitude in degrees, `None` when unavailable
    pub fn longitude(&self) -> Option<f64> {
        self.lon.filter(|&lon| lon.abs() <= 180.0)
    }

    /// Latitude in degrees, `None` when unavailable
    pub fn latitude(&self) -> Option<f64> {
        self.lat.filter(|&lat| lat.abs() <= 90.0)
    }

    /// Course over ground in degrees, `None` when unavailable
    pub fn course(&self) -> Option<f64> {
        self.cog
            .filter(|&cog| rounded(cog, TENTHS) < i64::from(COG_UNAVAILABLE))
    }

    /// True heading in degrees, `None` when unavailable
    pub fn true_heading(&self) -> Option<u16> {
        self.heading.filter(|&heading| heading < 360)
    }

    /// Pack into the 168-bit position layout
    pub fn to_bits(&self) -> Result<BitBuffer> {
        if !(1..=3).contains(&self.message_type) {
            return Err(AisError::invalid_message_type(format!(
                "Position report type must be 1-3, got {}",
                self.message_type
            )));
        }

        let sog = match self.sog {
            Some(sog) => scaled("speed over ground", sog, TENTHS)?,
            None => i64::from(SOG_UNAVAILABLE),
        };
        let lon = scaled(
            "longitude",
            self.lon.unwrap_or(LON_UNAVAILABLE),
            COORDINATE_SCALE,
        )?;
        let lat = scaled(
            "latitude",
            self.lat.unwrap_or(LAT_UNAVAILABLE),
            COORDINATE_SCALE,
        )?;
        let cog = match self.cog {
            Some(cog) => scaled("course over ground", cog, TENTHS)?,
            None => i64::from(COG_UNAVAILABLE),
        };

        let mut bits = BitBuffer::with_capacity(POSITION_REPORT_BITS);
        bits.push_unsigned("message type", u64::from(self.message_type), 6)?;
        bits.push_unsigned("repeat", u64::from(self.repeat.unwrap_or(0)), 2)?;
        bits.push_unsigned("mmsi", u64::from(self.mmsi), 30)?;
        bits.push_unsigned("navigation status", u64::from(self.nav_status.unwrap_or(0)), 4)?;
        bits.push_signed(
            "rate of turn",
            i64::from(self.rate_of_turn.unwrap_or(ROT_UNAVAILABLE)),
            8,
        )?;
        bits.push_unsigned("speed over ground", unsigned("speed over ground", sog)?, 10)?;
        bits.push_flag(self.accuracy.unwrap_or(false));
        bits.push_signed("longitude", lon, 28)?;
        bits.push_signed("latitude", lat, 27)?;
        bits.push_unsigned("course over ground", unsigned("course over ground", cog)?, 12)?;
        bits.push_unsigned(
            "heading",
            u64::from(self.heading.unwrap_or(HEADING_UNAVAILABLE)),
            9,
        )?;
        bits.push_unsigned(
            "timestamp",
            u64::from(self.timestamp.unwrap_or(SECOND_UNAVAILABLE)),
            6,
        )?;
        bits.push_unsigned(
            "special manoeuvre",
            u64::from(self.special_manoeuvre.unwrap_or(0)),
            2,
        )?;
        bits.push_unsigned("spare", 0, 3)?;
        bits.push_flag(self.raim.unwrap_or(false));
        bits.push_unsigned("radio status", u64::from(self.radio.unwrap_or(0)), 19)?;

        Ok(bits)
    }

    /// Unpack from the 168-bit position layout
    pub fn from_bits(bits: &BitBuffer, channel: Option<Channel>) -> Result<Self> {
        if bits.len() < POSITION_REPORT_BITS {
            return Err(AisError::insufficient_data(format!(
                "Position report needs {} bits, got {}",
                POSITION_REPORT_BITS,
                bits.len()
            )));
        }

        Ok(PositionReport {
            message_type: bits.read_unsigned(0, 6)? as u8,
            repeat: Some(bits.read_unsigned(6, 2)? as u8),
            mmsi: bits.read_unsigned(8, 30)?,
            nav_status: Some(bits.read_unsigned(38, 4)? as u8),
            rate_of_turn: Some(bits.read_signed(42, 8)?),
            sog: Some(f64::from(bits.read_unsigned(50, 10)?) / TENTHS),
            accuracy: Some(bits.read_flag(60)?),
            lon: Some(f64::from(bits.read_signed(61, 28)?) / COORDINATE_SCALE),
            lat: Some(f64::from(bits.read_signed(89, 27)?) / COORDINATE_SCALE),
            cog: Some(f64::from(bits.read_unsigned(116, 12)?) / TENTHS),
            heading: Some(bits.read_unsigned(128, 9)? as u16),
            timestamp: Some(bits.read_unsigned(137, 6)? as u8),
            special_manoeuvre: Some(bits.read_unsigned(143, 2)? as u8),
            raim: Some(bits.read_flag(148)?),
            radio: Some(bits.read_unsigned(149, 19)?),
            channel,
        })
    }
}

impl std::fmt::Display for PositionReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "PositionReport(type={}, mmsi={}, lat={:?}, lon={:?}, sog={:?}, cog={:?}, heading={:?}, channel={:?})",
            self.message_type,
            self.mmsi,
            self.lat,
            self.lon,
            self.sog,
            self.cog,
            self.heading,
            self.channel
        )
    }
}

/// Static and voyage related data, message type 5
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StaticVoyageReport {
    /// Repeat indicator (0-3)
    pub repeat: Option<u8>,
    /// Maritime Mobile Service Identity (30 bits)
    pub mmsi: u32,
    /// AIS version indicator (0-3)
    pub ais_version: Option<u8>,
    /// IMO ship identification number
    pub imo: Option<u32>,
    /// Call sign, up to 7 characters
    pub callsign: Option<String>,
    /// Vessel name, up to 20 characters
    pub name: Option<String>,
    /// Ship and cargo type code
    pub ship_type: Option<u8>,
    /// Dimension to bow, meters
    pub dimension_to_bow: Option<u16>,
    /// Dimension to stern, meters
    pub dimension_to_stern: Option<u16>,
    /// Dimension to port, meters
    pub dimension_to_port: Option<u8>,
    /// Dimension to starboard, meters
    pub dimension_to_starboard: Option<u8>,
    /// Type of electronic position fixing device
    pub epfd: Option<u8>,
    /// ETA month (0 = unavailable)
    pub eta_month: Option<u8>,
    /// ETA day (0 = unavailable)
    pub eta_day: Option<u8>,
    /// ETA hour (24 = unavailable)
    pub eta_hour: Option<u8>,
    /// ETA minute (60 = unavailable)
    pub eta_minute: Option<u8>,
    /// Maximum present static draught, meters
    pub draught: Option<f64>,
    /// Destination, up to 20 characters
    pub destination: Option<String>,
    /// Data terminal equipment available
    pub dte_available: Option<bool>,
    /// Channel the report was received on or should be sent on
    pub channel: Option<Channel>,
}

impl StaticVoyageReport {
    /// Message type carried by every static and voyage report
    pub const MESSAGE_TYPE: u8 = 5;

    /// Create a report for `mmsi` with every other field unavailable
    pub fn new(mmsi: u32) -> Self {
        StaticVoyageReport {
            mmsi,
            ..Default::default()
        }
    }

    /// Message type (always 5)
    pub fn message_type(&self) -> u8 {
        Self::MESSAGE_TYPE
    }

    /// ETA as (month, day, hour, minute), `None` if any part is unavailable
    pub fn eta(&self) -> Option<(u8, u8, u8, u8)> {
        let month = self.eta_month.filter(|&m| m != 0)?;
        let day = self.eta_day.filter(|&d| d != 0)?;
        let hour = self.eta_hour.filter(|&h| h != ETA_HOUR_UNAVAILABLE)?;
        let minute = self.eta_minute.filter(|&m| m != ETA_MINUTE_UNAVAILABLE)?;
        Some((month, day, hour, minute))
    }

    /// Overall length and beam in meters, when both ends are reported
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        let length = u32::from(self.dimension_to_bow?) + u32::from(self.dimension_to_stern?);
        let beam = u32::from(self.dimension_to_port?) + u32::from(self.dimension_to_starboard?);
        Some((length, beam))
    }

    /// Pack into the 424-bit static and voyage layout
    pub fn to_bits(&self) -> Result<BitBuffer> {
        let draught = scaled("draught", self.draught.unwrap_or(0.0), TENTHS)?;
        // Inverted on the wire: 0 means available
        let dte_not_ready = self.dte_available == Some(false);

        let mut bits = BitBuffer::with_capacity(STATIC_VOYAGE_REPORT_BITS);
        bits.push_unsigned("message type", u64::from(Self::MESSAGE_TYPE), 6)?;
        bits.push_unsigned("repeat", u64::from(self.repeat.unwrap_or(0)), 2)?;
        bits.push_unsigned("mmsi", u64::from(self.mmsi), 30)?;
        bits.push_unsigned("ais version", u64::from(self.ais_version.unwrap_or(0)), 2)?;
        bits.push_unsigned("imo", u64::from(self.imo.unwrap_or(0)), 30)?;
        bits.push_text(self.callsign.as_deref().unwrap_or(""), 7);
        bits.push_text(self.name.as_deref().unwrap_or(""), 20);
        bits.push_unsigned("ship type", u64::from(self.ship_type.unwrap_or(0)), 8)?;
        bits.push_unsigned(
            "dimension to bow",
            u64::from(self.dimension_to_bow.unwrap_or(0)),
            9,
        )?;
        bits.push_unsigned(
            "dimension to stern",
            u64::from(self.dimension_to_stern.unwrap_or(0)),
            9,
        )?;
        bits.push_unsigned(
            "dimension to port",
            u64::from(self.dimension_to_port.unwrap_or(0)),
            6,
        )?;
        bits.push_unsigned(
            "dimension to starboard",
            u64::from(self.dimension_to_starboard.unwrap_or(0)),
            6,
        )?;
        bits.push_unsigned("epfd", u64::from(self.epfd.unwrap_or(0)), 4)?;
        bits.push_unsigned("eta month", u64::from(self.eta_month.unwrap_or(0)), 4)?;
        bits.push_unsigned("eta day", u64::from(self.eta_day.unwrap_or(0)), 5)?;
        bits.push_unsigned(
            "eta hour",
            u64::from(self.eta_hour.unwrap_or(ETA_HOUR_UNAVAILABLE)),
            5,
        )?;
        bits.push_unsigned(
            "eta minute",
            u64::from(self.eta_minute.unwrap_or(ETA_MINUTE_UNAVAILABLE)),
            6,
        )?;
        bits.push_unsigned("draught", unsigned("draught", draught)?, 8)?;
        bits.push_text(self.destination.as_deref().unwrap_or(""), 20);
        bits.push_flag(dte_not_ready);
        bits.push_unsigned("spare", 0, 1)?;

        Ok(bits)
    }

    /// Unpack from the 424-bit static and voyage layout
    pub fn from_bits(bits: &BitBuffer, channel: Option<Channel>) -> Result<Self> {
        if bits.len() < STATIC_VOYAGE_REPORT_BITS {
            return Err(AisError::insufficient_data(format!(
                "Static and voyage report needs {} bits, got {}",
                STATIC_VOYAGE_REPORT_BITS,
                bits.len()
            )));
        }

        Ok(StaticVoyageReport {
            repeat: Some(bits.read_unsigned(6, 2)? as u8),
            mmsi: bits.read_unsigned(8, 30)?,
            ais_version: Some(bits.read_unsigned(38, 2)? as u8),
            imo: Some(bits.read_unsigned(40, 30)?),
            callsign: Some(bits.read_text(70, 7)?),
            name: Some(bits.read_text(112, 20)?),
            ship_type: Some(bits.read_unsigned(232, 8)? as u8),
            dimension_to_bow: Some(bits.read_unsigned(240, 9)? as u16),
            dimension_to_stern: Some(bits.read_unsigned(249, 9)? as u16),
            dimension_to_port: Some(bits.read_unsigned(258, 6)? as u8),
            dimension_to_starboard: Some(bits.read_unsigned(264, 6)? as u8),
            epfd: Some(bits.read_unsigned(270, 4)? as u8),
            eta_month: Some(bits.read_unsigned(274, 4)? as u8),
            eta_day: Some(bits.read_unsigned(278, 5)? as u8),
            eta_hour: Some(bits.read_unsigned(283, 5)? as u8),
            eta_minute: Some(bits.read_unsigned(288, 6)? as u8),
            draught: Some(f64::from(bits.read_unsigned(294, 8)?) / TENTHS),
            destination: Some(bits.read_text(302, 20)?),
            dte_available: Some(!bits.read_flag(422)?),
            channel,
        })
    }
}

impl std::fmt::Display for StaticVoyageReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "StaticVoyageReport(mmsi={}, imo={:?}, callsign={:?}, name={:?}, ship_type={:?}, destination={:?}, channel={:?})",
            self.mmsi,
            self.imo,
            self.callsign,
            self.name,
            self.ship_type,
            self.destination,
            self.channel
        )
    }
}

/// A decoded AIS message
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AisMessage {
    /// Types 1-3
    Position(PositionReport),
    /// Type 5
    StaticVoyage(StaticVoyageReport),
}

impl AisMessage {
    /// MMSI of the reporting station
    pub fn mmsi(&self) -> u32 {
        match self {
            AisMessage::Position(report) => report.mmsi,
            AisMessage::StaticVoyage(report) => report.mmsi,
        }
    }

    /// Message type number
    pub fn message_type(&self) -> u8 {
        match self {
            AisMessage::Position(report) => report.message_type,
            AisMessage::StaticVoyage(report) => report.message_type(),
        }
    }

    /// Channel attached to the message
    pub fn channel(&self) -> Option<Channel> {
        match self {
            AisMessage::Position(report) => report.channel,
            AisMessage::StaticVoyage(report) => report.channel,
        }
    }

    /// Pack the message into its bit layout
    pub fn to_bits(&self) -> Result<BitBuffer> {
        match self {
            AisMessage::Position(report) => report.to_bits(),
            AisMessage::StaticVoyage(report) => report.to_bits(),
        }
    }

    /// Decode a complete payload bitstream, dispatching on the type field
    pub fn from_bits(bits: &BitBuffer, channel: Option<Channel>) -> Result<Self> {
        if bits.len() < crate::constants::MIN_HEADER_BITS {
            return Err(AisError::insufficient_data(format!(
                "Payload of {} bits is too short for a message header",
                bits.len()
            )));
        }

        match bits.read_unsigned(0, 6)? as u8 {
            1..=3 => Ok(AisMessage::Position(PositionReport::from_bits(
                bits, channel,
            )?)),
            StaticVoyageReport::MESSAGE_TYPE => Ok(AisMessage::StaticVoyage(
                StaticVoyageReport::from_bits(bits, channel)?,
            )),
            other => Err(AisError::UnsupportedMessageType(other)),
        }
    }

    /// Render the message as a JSON object
    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl From<PositionReport> for AisMessage {
    fn from(report: PositionReport) -> Self {
        AisMessage::Position(report)
    }
}

impl From<StaticVoyageReport> for AisMessage {
    fn from(report: StaticVoyageReport) -> Self {
        AisMessage::StaticVoyage(report)
    }
}

impl std::fmt::Display for AisMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AisMessage::Position(report) => std::fmt::Display::fmt(report, f),
            AisMessage::StaticVoyage(report) => std::fmt::Display::fmt(report, f),
        }
    }
}
