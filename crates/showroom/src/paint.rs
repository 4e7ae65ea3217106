//! Color and texture broker.
//!
//! Holds the active [`ColorChoice`] and broadcasts every change. The broker
//! does not know which entity is selected; the session applies a choice to
//! the selected entity's colorable parts.

use std::{fmt, str::FromStr, sync::Arc};

use crate::{
    error::{Error, Result},
    events::{EventStream, SubscriptionId},
};

/// Swatches offered when no palette is configured.
pub const DEFAULT_PALETTE: [Rgb; 5] = [
    Rgb::new(30, 30, 30),
    Rgb::new(200, 200, 200),
    Rgb::new(200, 0, 0),
    Rgb::new(200, 200, 0),
    Rgb::new(0, 200, 0),
];

// ============================================================================
// Colors
// ============================================================================

/// An sRGB color with 8-bit channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// Create a color from its channels.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Channels as an array, in the order egui's color picker expects.
    #[must_use]
    pub fn to_array(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    /// Parse `rgb(r, g, b)` or `#rrggbb`.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let invalid = || Error::InvalidColorInput {
            input: input.to_string(),
        };

        if let Some(hex) = trimmed.strip_prefix('#') {
            if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(invalid());
            }
            let channel = |range: std::ops::Range<usize>| {
                u8::from_str_radix(&hex[range], 16).map_err(|_| invalid())
            };
            return Ok(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?));
        }

        let body = trimmed
            .strip_prefix("rgb(")
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(invalid)?;
        let channels = body
            .split(',')
            .map(str::trim)
            .map(|part| {
                if !part.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(invalid());
                }
                part.parse::<u8>().map_err(|_| invalid())
            })
            .collect::<Result<Vec<_>>>()?;
        match channels.as_slice() {
            [r, g, b] => Ok(Self::new(*r, *g, *b)),
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({}, {}, {})", self.r, self.g, self.b)
    }
}

impl FromStr for Rgb {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

// ============================================================================
// Textures
// ============================================================================

/// Image container detected from the leading bytes of a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    /// Anything else; the renderer may still be able to decode it.
    Unknown,
}

impl ImageFormat {
    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];
    const JPEG_MAGIC: &[u8] = &[0xff, 0xd8, 0xff];

    /// Sniff the format from file contents.
    #[must_use]
    pub fn sniff(bytes: &[u8]) -> Self {
        if bytes.starts_with(Self::PNG_MAGIC) {
            Self::Png
        } else if bytes.starts_with(Self::JPEG_MAGIC) {
            Self::Jpeg
        } else {
            Self::Unknown
        }
    }

    /// MIME type for known formats.
    #[must_use]
    pub fn mime_type(self) -> Option<&'static str> {
        match self {
            Self::Png => Some("image/png"),
            Self::Jpeg => Some("image/jpeg"),
            Self::Unknown => None,
        }
    }
}

/// Encoded texture image shared between the broker and its subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureData {
    bytes: Arc<[u8]>,
    format: ImageFormat,
}

impl TextureData {
    /// Wrap encoded image bytes. Empty input is rejected.
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Result<Self> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(Error::InvalidTextureInput {
                reason: "no image data",
            });
        }
        let format = ImageFormat::sniff(&bytes);
        Ok(Self { bytes, format })
    }

    /// The encoded image.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Detected container format.
    #[must_use]
    pub fn format(&self) -> ImageFormat {
        self.format
    }
}

/// The paint applied to the selected entity's colorable parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColorChoice {
    SolidColor(Rgb),
    Texture(TextureData),
}

// ============================================================================
// Broker
// ============================================================================

/// Holds the active color or texture and broadcasts changes.
#[derive(Debug)]
pub struct PaintBroker {
    palette: Vec<Rgb>,
    current: Option<ColorChoice>,
    color_changed: EventStream<Rgb>,
    texture_changed: EventStream<TextureData>,
}

impl Default for PaintBroker {
    fn default() -> Self {
        Self::new(DEFAULT_PALETTE.to_vec())
    }
}

impl PaintBroker {
    /// Create a broker offering the given swatches.
    #[must_use]
    pub fn new(palette: Vec<Rgb>) -> Self {
        Self {
            palette,
            current: None,
            color_changed: EventStream::new(),
            texture_changed: EventStream::new(),
        }
    }

    /// Configured swatches, in display order.
    #[must_use]
    pub fn palette(&self) -> &[Rgb] {
        &self.palette
    }

    /// The active choice, if any has been made.
    #[must_use]
    pub fn current(&self) -> Option<&ColorChoice> {
        self.current.as_ref()
    }

    /// Parse a color string and make it the active choice.
    ///
    /// Empty or unparsable input is ignored: no event, no state change.
    pub fn set_color(&mut self, input: &str) -> Option<ColorChoice> {
        if input.trim().is_empty() {
            tracing::debug!("Ignoring empty color input");
            return None;
        }
        match Rgb::parse(input) {
            Ok(rgb) => self.set_rgb(rgb),
            Err(e) => {
                tracing::debug!("Ignoring color: {e}");
                None
            }
        }
    }

    /// Make a solid color the active choice and emit `ColorChanged`.
    ///
    /// Re-setting the current color emits again.
    pub fn set_rgb(&mut self, rgb: Rgb) -> Option<ColorChoice> {
        let choice = ColorChoice::SolidColor(rgb);
        self.current = Some(choice.clone());
        tracing::debug!("Color changed to {rgb}");
        self.color_changed.emit(&rgb);
        Some(choice)
    }

    /// Make a texture the active choice and emit `TextureChanged`.
    ///
    /// Empty input is ignored.
    pub fn set_texture(&mut self, bytes: impl Into<Arc<[u8]>>) -> Option<ColorChoice> {
        let texture = match TextureData::new(bytes) {
            Ok(texture) => texture,
            Err(e) => {
                tracing::debug!("Ignoring texture: {e}");
                return None;
            }
        };
        tracing::debug!(
            "Texture changed ({} bytes, {:?})",
            texture.bytes().len(),
            texture.format()
        );
        self.current = Some(ColorChoice::Texture(texture.clone()));
        self.texture_changed.emit(&texture);
        self.current.clone()
    }

    /// Subscribe to solid color changes.
    pub fn on_color_changed(
        &mut self,
        handler: impl FnMut(&Rgb) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.color_changed.subscribe(handler)
    }

    /// Subscribe to texture changes.
    pub fn on_texture_changed(
        &mut self,
        handler: impl FnMut(&TextureData) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.texture_changed.subscribe(handler)
    }
}
