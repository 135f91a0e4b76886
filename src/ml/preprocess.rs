//! 画像の前処理
//!
//! 生のバイト列をデコードし、モデル入力サイズにリサイズして [0, 1] に正規化します。
//! 出力はバッチ次元付きの NHWC テンソル `[1, size, size, 3]` です。

use image::imageops::FilterType;

use crate::error::DecodeError;

/// 標準のモデル入力サイズ
pub const IMAGE_SIZE: u32 = 224;

/// チャンネル数（RGB）
pub const CHANNELS: usize = 3;

/// バッチ付き画像テンソル（NHWC、f32）
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    data: Vec<f32>,
    shape: [usize; 4],
}

impl ImageTensor {
    /// 形状とデータ長が一致しない場合は `None`
    pub fn new(data: Vec<f32>, shape: [usize; 4]) -> Option<Self> {
        (shape.iter().product::<usize>() == data.len()).then_some(Self { data, shape })
    }

    /// 形状 `[batch, height, width, channels]`
    pub fn shape(&self) -> [usize; 4] {
        self.shape
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}

/// 画像前処理器
#[derive(Debug, Clone, Copy)]
pub struct ImagePreprocessor {
    size: u32,
    filter: FilterType,
}

impl ImagePreprocessor {
    /// バイリニア補間でリサイズする前処理器
    pub fn new(size: u32) -> Self {
        Self {
            size,
            filter: FilterType::Triangle,
        }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// このサイズで期待される入力形状
    pub fn expected_shape(&self) -> [usize; 4] {
        let s = self.size as usize;
        [1, s, s, CHANNELS]
    }

    /// バイト列をモデル入力テンソルに変換
    pub fn preprocess(&self, raw_bytes: &[u8]) -> Result<ImageTensor, DecodeError> {
        let img = image::load_from_memory(raw_bytes)?;
        let (width, height) = (img.width(), img.height());
        if width == 0 || height == 0 {
            return Err(DecodeError::EmptyFrame { width, height });
        }

        // to_rgb32f はビット深度に応じて各チャンネルを [0, 1] に線形変換する
        let resized = img.resize_exact(self.size, self.size, self.filter);
        let data = resized.to_rgb32f().into_raw();

        Ok(ImageTensor {
            data,
            shape: self.expected_shape(),
        })
    }
}

impl Default for ImagePreprocessor {
    fn default() -> Self {
        Self::new(IMAGE_SIZE)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{DynamicImage, GrayImage, ImageBuffer, ImageFormat, Luma, Rgb, RgbImage, Rgba, RgbaImage};
    use std::io::Cursor;

    fn encode_png(img: DynamicImage) -> Vec<u8> {
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png).unwrap();
        buf
    }

    /// テスト用にPNGをメモリ上で生成
    pub(crate) fn png_bytes(img: RgbImage) -> Vec<u8> {
        encode_png(DynamicImage::ImageRgb8(img))
    }

    fn assert_all_pixels(tensor: &ImageTensor, expected: [f32; 3], tolerance: f32) {
        for pixel in tensor.as_slice().chunks(CHANNELS) {
            for (value, want) in pixel.iter().zip(expected) {
                assert!((value - want).abs() <= tolerance, "{:?} != {:?}", pixel, expected);
            }
        }
    }

    #[test]
    fn test_preprocess_shape_and_range() {
        let img = ImageBuffer::from_fn(64, 32, |x, y| Rgb([(x * 4) as u8, (y * 8) as u8, 255]));
        let tensor = ImagePreprocessor::default().preprocess(&png_bytes(img)).unwrap();

        assert_eq!(tensor.shape(), [1, 224, 224, 3]);
        assert_eq!(tensor.as_slice().len(), 224 * 224 * 3);
        assert!(tensor.as_slice().iter().all(|v| (0.0..=1.0).contains(v)));
        // 青チャンネルは全画素255
        assert!(tensor.as_slice().iter().skip(2).step_by(3).all(|v| (*v - 1.0).abs() < 1e-6));
    }

    #[test]
    fn test_black_image_is_all_zero() {
        let tensor = ImagePreprocessor::default()
            .preprocess(&png_bytes(RgbImage::new(224, 224)))
            .unwrap();
        assert!(tensor.as_slice().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_custom_size() {
        let tensor = ImagePreprocessor::new(32)
            .preprocess(&png_bytes(RgbImage::new(100, 100)))
            .unwrap();
        assert_eq!(tensor.shape(), [1, 32, 32, 3]);
    }

    #[test]
    fn test_16bit_image_uses_full_range() {
        let img: ImageBuffer<Rgb<u16>, Vec<u16>> =
            ImageBuffer::from_pixel(16, 16, Rgb([65535, 0, 32768]));
        let tensor = ImagePreprocessor::new(16)
            .preprocess(&encode_png(DynamicImage::ImageRgb16(img)))
            .unwrap();
        assert_eq!(tensor.shape(), [1, 16, 16, 3]);
        assert_all_pixels(&tensor, [1.0, 0.0, 32768.0 / 65535.0], 1e-3);
    }

    #[test]
    fn test_grayscale_is_expanded_to_rgb() {
        let img = GrayImage::from_pixel(16, 16, Luma([51]));
        let tensor = ImagePreprocessor::new(16)
            .preprocess(&encode_png(DynamicImage::ImageLuma8(img)))
            .unwrap();
        assert_eq!(tensor.shape(), [1, 16, 16, 3]);
        assert_all_pixels(&tensor, [0.2, 0.2, 0.2], 1e-3);
    }

    #[test]
    fn test_alpha_channel_is_dropped() {
        let img = RgbaImage::from_pixel(16, 16, Rgba([255, 0, 102, 255]));
        let tensor = ImagePreprocessor::new(16)
            .preprocess(&encode_png(DynamicImage::ImageRgba8(img)))
            .unwrap();
        assert_eq!(tensor.as_slice().len(), 16 * 16 * 3);
        assert_all_pixels(&tensor, [1.0, 0.0, 0.4], 1e-3);
    }

    #[test]
    fn test_truncated_file_is_decode_error() {
        let bytes = png_bytes(RgbImage::new(50, 50));
        let truncated = &bytes[..20];
        let result = ImagePreprocessor::default().preprocess(truncated);
        assert!(matches!(result, Err(DecodeError::Unreadable(_))));
    }

    #[test]
    fn test_garbage_bytes_is_decode_error() {
        let result = ImagePreprocessor::default().preprocess(b"definitely not an image");
        assert!(result.is_err());
        assert!(ImagePreprocessor::default().preprocess(&[]).is_err());
    }

    #[test]
    fn test_tensor_new_checks_length() {
        assert!(ImageTensor::new(vec![0.0; 12], [1, 2, 2, 3]).is_some());
        assert!(ImageTensor::new(vec![0.0; 11], [1, 2, 2, 3]).is_none());
    }
}
