//! Out-of-band pairing payloads: `GROUP:<sessionCode>` and
//! `REMOTE:<deviceCode>`, typically shown as a QR code.

use std::fmt;
use std::str::FromStr;

use qrcode::{Color, QrCode};
use tandem_common::SyncError;

use crate::codes::{DeviceCode, SessionCode};

const GROUP_PREFIX: &str = "GROUP:";
const REMOTE_PREFIX: &str = "REMOTE:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairingPayload {
    /// Join a group session.
    Group(SessionCode),
    /// Pair as the remote control of a presentation client.
    Remote(DeviceCode),
}

impl PairingPayload {
    /// Render as rows of Unicode half-blocks, two QR rows per text line.
    pub fn render_qr(&self) -> Option<String> {
        let code = QrCode::new(self.to_string().as_bytes()).ok()?;
        let modules = code.to_colors();
        let width = code.width();

        let mut out = String::new();
        for y in (0..width).step_by(2) {
            out.push_str("  ");
            for x in 0..width {
                let top = modules[y * width + x];
                let bottom = if y + 1 < width {
                    modules[(y + 1) * width + x]
                } else {
                    Color::Light
                };
                out.push(match (top, bottom) {
                    (Color::Dark, Color::Dark) => '█',
                    (Color::Dark, Color::Light) => '▀',
                    (Color::Light, Color::Dark) => '▄',
                    (Color::Light, Color::Light) => ' ',
                });
            }
            out.push('\n');
        }
        Some(out)
    }
}

impl fmt::Display for PairingPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PairingPayload::Group(code) => write!(f, "{GROUP_PREFIX}{code}"),
            PairingPayload::Remote(code) => write!(f, "{REMOTE_PREFIX}{code}"),
        }
    }
}

impl FromStr for PairingPayload {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(code) = s.strip_prefix(GROUP_PREFIX) {
            Ok(PairingPayload::Group(SessionCode::parse(code)?))
        } else if let Some(code) = s.strip_prefix(REMOTE_PREFIX) {
            Ok(PairingPayload::Remote(DeviceCode::parse(code)?))
        } else {
            Err(SyncError::Validation(format!(
                "unrecognized pairing payload '{s}'"
            )))
        }
    }
}
