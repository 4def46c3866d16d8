use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{Error, Result};

const COLOR_AMOUNT: usize = 0x40;
const COLOR_DEPTH: usize = 3;

// Entries with every emphasis combination.
const EMPHASIS_AMOUNT: usize = COLOR_AMOUNT * 8;

// Attenuation of the channels not being emphasized.
const DIM: f32 = 0.816_328;

#[rustfmt::skip]
const NTSC: [u32; COLOR_AMOUNT] = [
    0x666666, 0x002a88, 0x1412a7, 0x3b00a4, 0x5c007e, 0x6e0040, 0x6c0600, 0x561d00,
    0x333500, 0x0b4800, 0x005200, 0x004f08, 0x00404d, 0x000000, 0x000000, 0x000000,
    0xadadad, 0x155fd9, 0x4240ff, 0x7527fe, 0xa01acc, 0xb71e7b, 0xb53120, 0x994e00,
    0x6b6d00, 0x388700, 0x0c9300, 0x008f32, 0x007c8d, 0x000000, 0x000000, 0x000000,
    0xfffeff, 0x64b0ff, 0x9290ff, 0xc676ff, 0xf36aff, 0xfe6ecc, 0xfe8170, 0xea9e22,
    0xbcbe00, 0x88d800, 0x5ce430, 0x45e082, 0x48cdde, 0x4f4f4f, 0x000000, 0x000000,
    0xfffeff, 0xc0dfff, 0xd3d2ff, 0xe8c8ff, 0xfbc2ff, 0xfec4ea, 0xfeccc5, 0xf7d8a5,
    0xe4e594, 0xcfef96, 0xbdf4ab, 0xb3f3cc, 0xb5ebf2, 0xb8b8b8, 0x000000, 0x000000,
];

// Maps frame buffer entries (6 bit color, 3 emphasis bits) to RGB.
#[derive(Clone)]
pub struct Palette {
    colors: Vec<[u8; COLOR_DEPTH]>,
}

impl Palette {
    pub fn ntsc() -> Self {
        let base = NTSC.iter()
            .map(|&rgb| [(rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8])
            .collect::<Vec<_>>();
        Self::with_emphasis(&base)
    }

    // A .pal file holds either the 64 base colors or all 512 emphasized ones.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let colors = data.chunks_exact(COLOR_DEPTH)
            .map(|rgb| [rgb[0], rgb[1], rgb[2]])
            .collect::<Vec<_>>();

        match colors.len() {
            COLOR_AMOUNT => Ok(Self::with_emphasis(&colors)),
            EMPHASIS_AMOUNT => Ok(Self { colors }),
            _ => Err(Error::InvalidPalette(data.len())),
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut data = vec![];
        File::open(path)
            .and_then(|mut file| file.read_to_end(&mut data))
            .map_err(|err| Error::io(err, format!("reading palette {}", path.display())))?;
        Self::from_bytes(&data)
    }

    fn with_emphasis(base: &[[u8; COLOR_DEPTH]]) -> Self {
        let mut colors = Vec::with_capacity(EMPHASIS_AMOUNT);
        for emphasis in 0..8 {
            for (index, rgb) in base.iter().enumerate() {
                colors.push(Self::emphasize(*rgb, emphasis, index));
            }
        }
        Self { colors }
    }

    // Each emphasis bit dims the two other channels. The black columns ignore emphasis.
    fn emphasize(rgb: [u8; COLOR_DEPTH], emphasis: usize, index: usize) -> [u8; COLOR_DEPTH] {
        if emphasis == 0 || index & 0x0e == 0x0e {
            return rgb;
        }

        let mut scale = [1.0_f32; COLOR_DEPTH];
        for (channel, factor) in scale.iter_mut().enumerate() {
            if emphasis & !(1 << channel) != 0 {
                *factor = DIM;
            }
        }

        let mut out = rgb;
        for (value, factor) in out.iter_mut().zip(scale.iter()) {
            *value = (*value as f32 * factor) as u8;
        }
        out
    }

    pub fn rgb(&self, pixel: u16) -> [u8; COLOR_DEPTH] {
        self.colors[pixel as usize % self.colors.len()]
    }

    // Map a list of pixels into an RGB image buffer, three bytes per pixel.
    pub fn map(&self, pixels: &[u16], out: &mut Vec<u8>) {
        out.clear();
        out.reserve(pixels.len() * COLOR_DEPTH);
        for &pixel in pixels {
            out.extend_from_slice(&self.rgb(pixel));
        }
    }
}

impl Default for Palette {
    fn default() -> Self { Self::ntsc() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_colors() {
        let palette = Palette::ntsc();
        assert_eq!(palette.rgb(0x0f), [0, 0, 0]);
        assert_eq!(palette.rgb(0x30), [0xff, 0xfe, 0xff]);
    }

    #[test]
    fn red_emphasis_dims_green_and_blue() {
        let palette = Palette::ntsc();
        let plain = palette.rgb(0x30);
        let red = palette.rgb(0x30 | (0b001 << 6));
        assert_eq!(red[0], plain[0]);
        assert!(red[1] < plain[1]);
        assert!(red[2] < plain[2]);
    }

    #[test]
    fn custom_palette_size() {
        assert!(Palette::from_bytes(&[0; 64 * 3]).is_ok());
        assert!(Palette::from_bytes(&[0; 512 * 3]).is_ok());
        assert!(Palette::from_bytes(&[0; 10]).is_err());
    }

    #[test]
    fn maps_to_rgb_bytes() {
        let palette = Palette::ntsc();
        let mut out = vec![];
        palette.map(&[0x0f, 0x30], &mut out);
        assert_eq!(out, vec![0, 0, 0, 0xff, 0xfe, 0xff]);
    }
}
