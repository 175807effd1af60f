//! Page bitmap operations: decode, destructive region fill and PNG encode.

use image::{ImageError, ImageFormat, Rgb, RgbImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use serde::{Deserialize, Serialize};
use std::io::Cursor;

/// 脱敏填充色（不透明黑）
pub const FILL: Rgb<u8> = Rgb([0, 0, 0]);

/// 像素矩形，左上角为原点，两个角点都包含在内
///
/// 坐标可以落在图片之外，也可以顺序颠倒。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub xmin: i32,
    pub ymin: i32,
    pub xmax: i32,
    pub ymax: i32,
}

/// 裁剪到图片范围内的矩形（包含边界）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelBounds {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl PixelBounds {
    pub fn width(&self) -> u32 {
        self.right - self.left + 1
    }

    pub fn height(&self) -> u32 {
        self.bottom - self.top + 1
    }
}

impl Region {
    pub fn new(xmin: i32, ymin: i32, xmax: i32, ymax: i32) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    /// 与 `width` x `height` 的画布求交，完全在外时返回 `None`
    pub fn clip(&self, width: u32, height: u32) -> Option<PixelBounds> {
        if width == 0 || height == 0 {
            return None;
        }

        let (x0, x1) = ordered(self.xmin, self.xmax);
        let (y0, y1) = ordered(self.ymin, self.ymax);

        let left = x0.max(0);
        let top = y0.max(0);
        let right = x1.min(i64::from(width) - 1);
        let bottom = y1.min(i64::from(height) - 1);

        if left > right || top > bottom {
            return None;
        }

        Some(PixelBounds {
            left: left as u32,
            top: top as u32,
            right: right as u32,
            bottom: bottom as u32,
        })
    }
}

fn ordered(a: i32, b: i32) -> (i64, i64) {
    let (a, b) = (i64::from(a), i64::from(b));
    (a.min(b), a.max(b))
}

/// 用黑色实心矩形覆盖区域，原像素不可恢复
///
/// 原地修改，不分配新图片。重复覆盖同一区域结果不变。
/// 超出画布的部分被裁掉，完全在画布外时什么都不做。
pub fn redact_region(img: &mut RgbImage, region: Region) {
    let (width, height) = img.dimensions();
    let Some(bounds) = region.clip(width, height) else {
        log::debug!("[Redact] 区域 {:?} 不在 {}x{} 画布内，跳过", region, width, height);
        return;
    };

    let rect = Rect::at(bounds.left as i32, bounds.top as i32)
        .of_size(bounds.width(), bounds.height());
    draw_filled_rect_mut(img, rect, FILL);
}

/// 解码页面图片，统一为 RGB8（丢弃 alpha 通道）
pub fn decode_page(bytes: &[u8]) -> Result<RgbImage, ImageError> {
    Ok(image::load_from_memory(bytes)?.to_rgb8())
}

/// 无损编码为 PNG
pub fn encode_png(img: &RgbImage) -> Result<Vec<u8>, ImageError> {
    let mut output = Vec::new();
    img.write_to(&mut Cursor::new(&mut output), ImageFormat::Png)?;
    Ok(output)
}
