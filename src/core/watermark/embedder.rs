use std::path::Path;

use image::{imageops::FilterType, DynamicImage};

use crate::core::record::{MatrixData, RecordKey, RecordStore, SideChannelRecord};
use crate::core::watermark::{colorspace, dwt::DwtProcessor, open_image, scramble, svd};
use crate::models::{PipelineConfig, WatermarkError};

/// 完整的水印嵌入流水线
///
/// ## 算法
///
/// 1. 载体缩放到配置尺寸（默认 512×512），水印按灰度解码并缩放到
///    LL 子带尺寸（默认 256×256）
/// 2. 载体转 YCrCb，只处理亮度平面，色度平面原样保留
/// 3. 亮度做 1 级 Haar DWT，对 LL 子带做 SVD
/// 4. 水印经混沌置乱后做 SVD
/// 5. 奇异值混合 `S' = S_LL + alpha * S_WM`，用载体原 U/Vᵀ 重建 LL，
///    IDWT 重建亮度，与色度合并回显示色彩空间
/// 6. 产出旁路记录：载体原始奇异值、水印 U/Vᵀ、置乱置换表
///
/// 像素值只在最终输出边界钳制到 [0, 255] 并量化，流水线中间全程
/// 浮点运算。
pub struct WatermarkEmbedder {
    config: PipelineConfig,
    dwt: DwtProcessor,
}

impl WatermarkEmbedder {
    /// 以默认几何（512×512 载体 / 256×256 水印）与默认混沌参数创建
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            dwt: DwtProcessor::new(),
        }
    }

    /// 以自定义配置创建
    ///
    /// # 错误
    /// 配置违反几何不变量（载体偶数尺寸、水印 = 载体的一半）时返回
    /// `Dimension`。
    pub fn with_config(config: PipelineConfig) -> Result<Self, WatermarkError> {
        config.validate()?;
        Ok(Self {
            config,
            dwt: DwtProcessor::new(),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// 将灰度水印嵌入载体图片
    ///
    /// # 参数
    /// * `carrier`   - 载体彩色图片（任意常见尺寸，将被缩放）
    /// * `watermark` - 水印图片（按灰度处理，将被缩放）
    /// * `alpha`     - 强度因子，必须为正；提取时必须提供相同值
    ///
    /// # 返回
    /// 含水印图片与旁路记录。记录由调用方交给 `RecordStore` 持久化，
    /// 生成后不可变。
    pub fn embed(
        &self,
        carrier: &DynamicImage,
        watermark: &DynamicImage,
        alpha: f64,
    ) -> Result<(DynamicImage, SideChannelRecord), WatermarkError> {
        if !(alpha > 0.0) {
            return Err(WatermarkError::DegenerateArithmetic(format!(
                "Strength factor alpha must be positive, got {}",
                alpha
            )));
        }

        let (cw, ch) = (self.config.carrier_width, self.config.carrier_height);
        let (ww, wh) = (self.config.watermark_width, self.config.watermark_height);

        // ── 强制缩放到配置几何 ──────────────────────────────────────────────
        let carrier_rgb = resize_to(carrier, cw, ch).to_rgb8();
        let watermark_gray = resize_to(watermark, ww, wh).to_luma8();

        // ── 亮度域变换 + 载体 SVD ───────────────────────────────────────────
        let mut planes = colorspace::planes_from_rgb(&carrier_rgb);
        let mut bands = self.dwt.decompose(planes.y.view())?;
        let carrier_svd = svd::compute_svd(&bands.ll)?;

        // ── 水印置乱 + SVD ─────────────────────────────────────────────────
        let wm_plane = colorspace::plane_from_gray(&watermark_gray);
        let (scrambled, permutation) = scramble::scramble(&wm_plane, &self.config.chaos);
        let wm_svd = svd::compute_svd(&scrambled)?;

        if wm_svd
            .singular_values
            .first()
            .map_or(true, |&s| s <= f64::EPSILON)
        {
            return Err(WatermarkError::DegenerateArithmetic(
                "Watermark has zero rank, nothing to embed".into(),
            ));
        }

        // ── 奇异值混合与重建 ────────────────────────────────────────────────
        let blended = svd::blend_singular_values(
            &carrier_svd.singular_values,
            &wm_svd.singular_values,
            alpha,
        );
        bands.ll = carrier_svd.compose_with(&blended)?;
        planes.y = self.dwt.reconstruct(&bands)?;

        let watermarked = colorspace::rgb_from_planes(&planes)?;

        let record = SideChannelRecord {
            carrier_singular_values: carrier_svd.singular_values,
            watermark_u: MatrixData::from_dmatrix(&wm_svd.u),
            watermark_v_t: MatrixData::from_dmatrix(&wm_svd.v_t),
            permutation,
        };

        Ok((DynamicImage::ImageRgb8(watermarked), record))
    }

    /// 嵌入并把旁路记录写入存储，键为 `(image_id, alpha)`
    pub fn embed_to_store(
        &self,
        carrier: &DynamicImage,
        watermark: &DynamicImage,
        alpha: f64,
        image_id: &str,
        store: &dyn RecordStore,
    ) -> Result<DynamicImage, WatermarkError> {
        let (watermarked, record) = self.embed(carrier, watermark, alpha)?;
        store.put(&RecordKey::new(image_id, alpha), &record)?;
        Ok(watermarked)
    }

    /// 从文件路径加载载体与水印后嵌入
    ///
    /// # 错误
    /// 任一图片无法解码时返回 `Decode`，错误信息包含具体路径。
    pub fn embed_files(
        &self,
        carrier_path: &Path,
        watermark_path: &Path,
        alpha: f64,
    ) -> Result<(DynamicImage, SideChannelRecord), WatermarkError> {
        let carrier = open_image(carrier_path)?;
        let watermark = open_image(watermark_path)?;
        self.embed(&carrier, &watermark, alpha)
    }
}

impl Default for WatermarkEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

/// 尺寸已符合时跳过重采样，避免无谓的双线性平滑
fn resize_to(image: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    if image.width() == width && image.height() == height {
        image.clone()
    } else {
        image.resize_exact(width, height, FilterType::Triangle)
    }
}
