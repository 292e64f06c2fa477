//! Image to tensor encoding.
//!
//! A photo of any size becomes a `size × size` RGB float tensor in three
//! steps: take the largest centered square, scale it with nearest-neighbour
//! sampling, then divide every 8-bit channel by 255. The result must match
//! the preprocessing the models were trained with bit for bit, so nothing
//! here interpolates or filters.

use image::{imageops, imageops::FilterType, DynamicImage, GenericImageView, Rgba, RgbaImage};
use ndarray::{Array4, ArrayView4};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{PlantClassifierError, Result};

/// Input edge length used by every shipped image model.
pub const DEFAULT_TARGET_SIZE: u32 = 200;

const RGB_CHANNELS: usize = 3;

/// Memory layout the model expects for its image input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelOrder {
    /// `[1, H, W, 3]`, R G B next to each other for every pixel.
    Interleaved,
    /// `[1, 3, H, W]`, a full R plane, then G, then B.
    ChannelFirst,
}

impl ChannelOrder {
    pub const fn shape(self, size: usize) -> [usize; 4] {
        match self {
            Self::Interleaved => [1, size, size, RGB_CHANNELS],
            Self::ChannelFirst => [1, RGB_CHANNELS, size, size],
        }
    }

    /// Flat buffer position of channel `c` of the `pixel`-th pixel (row-major).
    const fn index(self, pixel: usize, channel: usize, plane: usize) -> usize {
        match self {
            Self::Interleaved => pixel * RGB_CHANNELS + channel,
            Self::ChannelFirst => channel * plane + pixel,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TensorDataType {
    Float32,
}

/// Model input produced by [`normalize`].
///
/// Owned by a single classification call and dropped once inference returns.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTensor {
    data: Vec<f32>,
    shape: [usize; 4],
    channel_order: ChannelOrder,
}

impl NormalizedTensor {
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub const fn shape(&self) -> [usize; 4] {
        self.shape
    }

    pub const fn channel_order(&self) -> ChannelOrder {
        self.channel_order
    }

    pub const fn dtype(&self) -> TensorDataType {
        TensorDataType::Float32
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Raw buffer in native byte order, four bytes per value.
    pub fn to_ne_bytes(&self) -> Vec<u8> {
        self.data.iter().flat_map(|v| v.to_ne_bytes()).collect()
    }

    pub fn view(&self) -> Result<ArrayView4<'_, f32>> {
        Ok(ArrayView4::from_shape(self.shape, &self.data)?)
    }

    pub fn into_array(self) -> Result<Array4<f32>> {
        Ok(Array4::from_shape_vec(self.shape, self.data)?)
    }
}

/// Region kept by the center crop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropBounds {
    pub x: u32,
    pub y: u32,
    pub size: u32,
}

/// Largest centered square of a `width × height` image.
///
/// With an odd surplus the extra pixel is dropped from the right or bottom.
pub const fn crop_bounds(width: u32, height: u32) -> CropBounds {
    let size = if width < height { width } else { height };
    CropBounds {
        x: (width - size) / 2,
        y: (height - size) / 2,
        size,
    }
}

pub fn center_crop(image: &RgbaImage) -> RgbaImage {
    let (width, height) = image.dimensions();
    let CropBounds { x, y, size } = crop_bounds(width, height);
    if x == 0 && y == 0 && size == width && size == height {
        return image.clone();
    }
    imageops::crop_imm(image, x, y, size, size).to_image()
}

/// Packs a pixel the way Android bitmaps store it: `0xAARRGGBB`.
pub fn pack_argb(pixel: &Rgba<u8>) -> u32 {
    let [r, g, b, a] = pixel.0;
    (u32::from(a) << 24) | (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b)
}

/// Scaled R, G, B of a packed ARGB pixel. Alpha is ignored.
pub fn unpack_rgb(pixel: u32) -> [f32; 3] {
    [
        ((pixel >> 16) & 0xFF) as f32 / 255.0,
        ((pixel >> 8) & 0xFF) as f32 / 255.0,
        (pixel & 0xFF) as f32 / 255.0,
    ]
}

/// Encodes an already square image without resizing it.
pub fn encode(image: &RgbaImage, channel_order: ChannelOrder) -> Result<NormalizedTensor> {
    let (width, height) = image.dimensions();
    if width != height {
        return Err(PlantClassifierError::InvalidImage {
            width,
            height,
            reason: "must be square before encoding".to_string(),
        });
    }

    let size = width as usize;
    let plane = size * size;
    let mut data = vec![0.0f32; RGB_CHANNELS * plane];
    for (i, pixel) in image.pixels().enumerate() {
        for (c, value) in unpack_rgb(pack_argb(pixel)).into_iter().enumerate() {
            data[channel_order.index(i, c, plane)] = value;
        }
    }

    Ok(NormalizedTensor {
        data,
        shape: channel_order.shape(size),
        channel_order,
    })
}

/// Center-crops, scales to `target_size × target_size` and encodes `image`.
pub fn normalize(
    image: &DynamicImage,
    target_size: u32,
    channel_order: ChannelOrder,
) -> Result<NormalizedTensor> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(PlantClassifierError::InvalidImage {
            width,
            height,
            reason: "has no pixels".to_string(),
        });
    }
    if target_size == 0 {
        return Err(PlantClassifierError::Validation {
            field: "target_size".to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }

    let cropped = center_crop(&image.to_rgba8());
    let scaled = imageops::resize(&cropped, target_size, target_size, FilterType::Nearest);
    debug!(
        width,
        height,
        crop = cropped.width(),
        target_size,
        ?channel_order,
        "normalized image"
    );
    encode(&scaled, channel_order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn gradient(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8, 255])
        })
    }

    #[test]
    fn square_images_are_not_cropped() {
        for size in [1, 7, 200, 513] {
            assert_eq!(crop_bounds(size, size), CropBounds { x: 0, y: 0, size });
        }
        let image = gradient(50, 50);
        assert_eq!(center_crop(&image), image);
    }

    #[test]
    fn landscape_crop_is_centered_horizontally() {
        assert_eq!(
            crop_bounds(400, 300),
            CropBounds {
                x: 50,
                y: 0,
                size: 300
            }
        );

        let cropped = center_crop(&gradient(400, 300));
        assert_eq!(cropped.dimensions(), (300, 300));
        // column 0 of the crop is column 50 of the source
        assert_eq!(cropped.get_pixel(0, 0).0[0], 50);
        assert_eq!(cropped.get_pixel(299, 0).0[0], 93);
    }

    #[test]
    fn portrait_crop_is_centered_vertically() {
        assert_eq!(
            crop_bounds(120, 161),
            CropBounds {
                x: 0,
                y: 20,
                size: 120
            }
        );
    }

    #[test]
    fn packed_pixel_channels() {
        let packed = pack_argb(&Rgba([0x12, 0x34, 0x56, 0x78]));
        assert_eq!(packed, 0x7812_3456);
        assert_eq!(
            unpack_rgb(packed),
            [0x12 as f32 / 255.0, 0x34 as f32 / 255.0, 0x56 as f32 / 255.0]
        );
    }

    #[test]
    fn normalize_has_fixed_length_and_unit_range() -> Result<()> {
        let images = [
            DynamicImage::ImageRgba8(gradient(400, 300)),
            DynamicImage::ImageRgb8(RgbImage::from_pixel(31, 97, image::Rgb([255, 0, 128]))),
            DynamicImage::ImageRgba8(gradient(1, 1)),
        ];
        for image in &images {
            for order in [ChannelOrder::Interleaved, ChannelOrder::ChannelFirst] {
                let tensor = normalize(image, DEFAULT_TARGET_SIZE, order)?;
                assert_eq!(tensor.len(), 3 * 200 * 200);
                assert!(tensor.data().iter().all(|v| (0.0..=1.0).contains(v)));
                assert_eq!(tensor.dtype(), TensorDataType::Float32);
            }
        }
        Ok(())
    }

    #[test]
    fn channel_orders_place_values_differently() -> Result<()> {
        // 2x2 with a distinct colour per pixel
        let colors = [[10u8, 20, 30], [40, 50, 60], [70, 80, 90], [100, 110, 120]];
        let image = RgbaImage::from_fn(2, 2, |x, y| {
            let [r, g, b] = colors[(y * 2 + x) as usize];
            Rgba([r, g, b, 0])
        });

        let nhwc = encode(&image, ChannelOrder::Interleaved)?;
        let nchw = encode(&image, ChannelOrder::ChannelFirst)?;
        assert_eq!(nhwc.shape(), [1, 2, 2, 3]);
        assert_eq!(nchw.shape(), [1, 3, 2, 2]);

        let nhwc_view = nhwc.view()?;
        let nchw_view = nchw.view()?;
        for y in 0..2 {
            for x in 0..2 {
                for c in 0..3 {
                    let expected = colors[y * 2 + x][c] as f32 / 255.0;
                    assert_eq!(nhwc_view[[0, y, x, c]], expected);
                    assert_eq!(nchw_view[[0, c, y, x]], expected);
                }
            }
        }
        assert_eq!(nhwc.data()[..3], [10.0 / 255.0, 20.0 / 255.0, 30.0 / 255.0]);
        assert_eq!(nchw.data()[..4], [10.0 / 255.0, 40.0 / 255.0, 70.0 / 255.0, 100.0 / 255.0]);
        Ok(())
    }

    #[test]
    fn alpha_is_dropped() -> Result<()> {
        let opaque = RgbaImage::from_pixel(3, 3, Rgba([9, 8, 7, 255]));
        let clear = RgbaImage::from_pixel(3, 3, Rgba([9, 8, 7, 0]));
        assert_eq!(
            encode(&opaque, ChannelOrder::Interleaved)?.data(),
            encode(&clear, ChannelOrder::Interleaved)?.data()
        );
        Ok(())
    }

    #[test]
    fn empty_image_is_rejected() {
        let image = DynamicImage::ImageRgba8(RgbaImage::new(0, 10));
        let err = normalize(&image, DEFAULT_TARGET_SIZE, ChannelOrder::Interleaved).unwrap_err();
        assert!(matches!(
            err,
            PlantClassifierError::InvalidImage {
                width: 0,
                height: 10,
                ..
            }
        ));
    }

    #[test]
    fn normalize_is_deterministic() -> Result<()> {
        let image = DynamicImage::ImageRgba8(gradient(333, 257));
        let first = normalize(&image, 64, ChannelOrder::ChannelFirst)?;
        let second = normalize(&image, 64, ChannelOrder::ChannelFirst)?;
        assert_eq!(first.to_ne_bytes(), second.to_ne_bytes());
        assert_eq!(first.to_ne_bytes().len(), 4 * 3 * 64 * 64);
        Ok(())
    }

    #[test]
    fn tensor_converts_to_ndarray() -> Result<()> {
        let image = DynamicImage::ImageRgba8(gradient(10, 10));
        let tensor = normalize(&image, 8, ChannelOrder::Interleaved)?;
        let array = tensor.into_array()?;
        assert_eq!(array.shape(), &[1, 8, 8, 3]);
        Ok(())
    }
}
