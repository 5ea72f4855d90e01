use crate::foundation::error::{PetError, PetResult};

/// Raw pixels of one rendered pose as RGBA8, straight alpha, tightly packed, row-major.
///
/// Each stage that produces a frame owns its buffer outright; preview and export never share one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameBuffer {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, `width * height * 4` long.
    pub data: Vec<u8>,
}

impl FrameBuffer {
    /// A fully transparent frame.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; byte_len(width, height)],
        }
    }

    /// Wrap existing RGBA8 bytes, checking the length against the dimensions.
    pub fn from_rgba8(width: u32, height: u32, data: Vec<u8>) -> PetResult<Self> {
        if data.len() != byte_len(width, height) {
            return Err(PetError::validation(format!(
                "frame data is {} bytes, expected {} for {width}x{height}",
                data.len(),
                byte_len(width, height)
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// The RGBA value at `(x, y)`, or `None` outside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        Some([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }

    /// Convert into an `image` buffer, e.g. for PNG output.
    pub fn into_image(self) -> PetResult<image::RgbaImage> {
        image::RgbaImage::from_raw(self.width, self.height, self.data)
            .ok_or_else(|| PetError::validation("frame data does not match its dimensions"))
    }
}

impl From<image::RgbaImage> for FrameBuffer {
    fn from(img: image::RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            data: img.into_raw(),
        }
    }
}

fn byte_len(width: u32, height: u32) -> usize {
    (width as usize)
        .saturating_mul(height as usize)
        .saturating_mul(4)
}
