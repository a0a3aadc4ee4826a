use crate::error::{TokenmillError, TokenmillResult};

/// When the pipeline routes a file through the interactive framing surface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FramingMode {
    /// Always frame automatically.
    #[default]
    Never,
    /// Every file suspends for manual framing.
    Always,
    /// Only files whose aspect ratio strays more than 5% from square.
    NonSquare,
}

/// The three values the core consults, plus the immediate-download flag that
/// only the surrounding application reads.
#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub framing_mode: FramingMode,
    /// Opaque token background, straight RGBA.
    #[serde(default = "default_background")]
    pub background_rgba: [u8; 4],
    #[serde(default)]
    pub download_immediately: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            framing_mode: FramingMode::default(),
            background_rgba: default_background(),
            download_immediately: false,
        }
    }
}

fn default_background() -> [u8; 4] {
    [0, 0, 0, 255]
}

/// Parse `#rgb` or `#rrggbb` (leading `#` optional) into opaque RGBA.
pub fn parse_hex_color(s: &str) -> TokenmillResult<[u8; 4]> {
    let hex = s.strip_prefix('#').unwrap_or(s);
    let expand = |c: u8| (c << 4) | c;

    match hex.len() {
        3 => {
            let v = u16::from_str_radix(hex, 16)
                .map_err(|_| TokenmillError::validation(format!("invalid hex color '{s}'")))?;
            Ok([
                expand(((v >> 8) & 0xf) as u8),
                expand(((v >> 4) & 0xf) as u8),
                expand((v & 0xf) as u8),
                255,
            ])
        }
        6 => {
            let v = u32::from_str_radix(hex, 16)
                .map_err(|_| TokenmillError::validation(format!("invalid hex color '{s}'")))?;
            Ok([(v >> 16) as u8, (v >> 8) as u8, v as u8, 255])
        }
        _ => Err(TokenmillError::validation(format!(
            "invalid hex color '{s}' (expected #rgb or #rrggbb)"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_auto_framing_on_black() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.framing_mode, FramingMode::Never);
        assert_eq!(cfg.background_rgba, [0, 0, 0, 255]);
        assert!(!cfg.download_immediately);
    }

    #[test]
    fn json_roundtrip() {
        let cfg = PipelineConfig {
            framing_mode: FramingMode::NonSquare,
            background_rgba: [17, 34, 51, 255],
            download_immediately: true,
        };
        let s = serde_json::to_string(&cfg).unwrap();
        assert!(s.contains("non-square"));
        let de: PipelineConfig = serde_json::from_str(&s).unwrap();
        assert_eq!(de.framing_mode, FramingMode::NonSquare);
        assert_eq!(de.background_rgba, [17, 34, 51, 255]);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let de: PipelineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(de.framing_mode, FramingMode::Never);
        assert_eq!(de.background_rgba, [0, 0, 0, 255]);
    }

    #[test]
    fn parse_hex_long_and_short() {
        assert_eq!(parse_hex_color("#112233").unwrap(), [17, 34, 51, 255]);
        assert_eq!(parse_hex_color("112233").unwrap(), [17, 34, 51, 255]);
        assert_eq!(parse_hex_color("#fff").unwrap(), [255, 255, 255, 255]);
        assert_eq!(parse_hex_color("#000000").unwrap(), [0, 0, 0, 255]);
    }

    #[test]
    fn parse_hex_rejects_garbage() {
        assert!(parse_hex_color("#12345").is_err());
        assert!(parse_hex_color("#zzzzzz").is_err());
        assert!(parse_hex_color("").is_err());
    }
}
