//! Post-redaction verification checks.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::RgbImage;
use pagemask_core::{AppliedRedaction, DocumentReport, PageBundle};
use pagemask_render::{PixelBounds, FILL};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VerifyOptions {
    /// 每个方向上的抽样点数
    pub sample_grid: u32,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self { sample_grid: 5 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyResult {
    pub ok: bool,
    pub warnings: Vec<String>,
}

/// 解出输出包中的图片
pub fn decode_bundle_image(bundle: &PageBundle) -> Result<RgbImage, String> {
    let png = STANDARD
        .decode(&bundle.image)
        .map_err(|e| format!("页面 {} base64 无效: {}", bundle.page_index, e))?;
    pagemask_render::decode_page(&png)
        .map_err(|e| format!("页面 {} 图片无法解码: {}", bundle.page_index, e))
}

/// 两张图片逐像素相同
pub fn images_identical(a: &RgbImage, b: &RgbImage) -> bool {
    a.dimensions() == b.dimensions() && a.as_raw() == b.as_raw()
}

/// 抽样检查每处脱敏区域在输出图片中确实是填充色
pub fn verify_report(report: &DocumentReport, options: &VerifyOptions) -> VerifyResult {
    let mut warnings = Vec::new();
    let mut decoded: HashMap<&str, RgbImage> = HashMap::new();

    for bundle in &report.bundles {
        match decode_bundle_image(bundle) {
            Ok(img) => {
                decoded.insert(bundle.page_index.as_str(), img);
            }
            Err(e) => warnings.push(e),
        }
    }

    for redaction in &report.redactions {
        let Some(img) = decoded.get(redaction.page_index.as_str()) else {
            warnings.push(format!("页面 {} 没有可检查的输出图片", redaction.page_index));
            continue;
        };
        if let Some(warning) = check_region(img, redaction, options.sample_grid) {
            warnings.push(warning);
        }
    }

    for warning in &warnings {
        log::warn!("[Verify] {}", warning);
    }

    VerifyResult {
        ok: warnings.is_empty(),
        warnings,
    }
}

fn check_region(img: &RgbImage, redaction: &AppliedRedaction, grid: u32) -> Option<String> {
    let (width, height) = img.dimensions();
    // 完全在画布外的区域没有像素可查
    let bounds = redaction.region.clip(width, height)?;

    for (x, y) in sample_points(&bounds, grid) {
        let pixel = img.get_pixel(x, y);
        if *pixel != FILL {
            return Some(format!(
                "页面 {} 区域 {:?} 在 ({}, {}) 处未被覆盖: {:?}",
                redaction.page_index, redaction.region, x, y, pixel.0
            ));
        }
    }
    None
}

/// 均匀分布的抽样点，总是包含四个角
fn sample_points(bounds: &PixelBounds, grid: u32) -> Vec<(u32, u32)> {
    let xs = axis_samples(bounds.left, bounds.right, grid);
    let ys = axis_samples(bounds.top, bounds.bottom, grid);
    ys.iter()
        .flat_map(|&y| xs.iter().map(move |&x| (x, y)))
        .collect()
}

fn axis_samples(start: u32, end: u32, grid: u32) -> Vec<u32> {
    let span = u64::from(end - start);
    let n = u64::from(grid.max(2)).min(span + 1);
    if n <= 1 {
        return vec![start];
    }
    let mut samples: Vec<u32> = (0..n)
        .map(|i| start + (span * i / (n - 1)) as u32)
        .collect();
    samples.dedup();
    samples
}
