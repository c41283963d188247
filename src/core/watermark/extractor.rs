use std::path::Path;

use image::{imageops::FilterType, DynamicImage, GrayImage};

use crate::core::record::{RecordKey, RecordStore, SideChannelRecord};
use crate::core::watermark::{colorspace, dwt::DwtProcessor, open_image, scramble, svd};
use crate::models::{PipelineConfig, WatermarkError};

/// 完整的水印提取流水线
///
/// ## 算法
///
/// 1. 含水印（可能被攻击过的）图片缩放回载体几何，转 YCrCb 取亮度
/// 2. 亮度做 1 级 Haar DWT，对 LL 子带重新做 SVD，只取观测奇异值
///    （攻击会破坏 U/V，新鲜算出的奇异向量直接丢弃）
/// 3. 反解 `S_WM = (S_obs - S_LL_orig) / alpha`，其中 S_LL_orig 来自
///    旁路记录——这是整套方案需要持久化的唯一原因
/// 4. 用记录中的水印 U/Vᵀ 重建置乱水印，再用记录中的置换表还原
/// 5. 钳制到 [0, 255] 并量化为灰度图输出
///
/// 提取只读旁路记录，绝不修改；同一条记录可对同一嵌入的任意多份
/// 攻击副本反复使用。
pub struct WatermarkExtractor {
    config: PipelineConfig,
    dwt: DwtProcessor,
}

impl WatermarkExtractor {
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            dwt: DwtProcessor::new(),
        }
    }

    /// 以自定义配置创建（必须与嵌入端配置一致）
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

    /// 从含水印图片中提取水印的近似
    ///
    /// # 参数
    /// * `watermarked` - 含水印图片，允许已被攻击（噪声、压缩、缩放等）
    /// * `record`      - 嵌入时产出的旁路记录
    /// * `alpha`       - 嵌入时使用的强度因子，必须一致
    ///
    /// # 错误
    /// * `DegenerateArithmetic` - alpha 为 0
    /// * `Dimension` - 记录几何与配置不符（记录与图片配错了对）
    pub fn extract(
        &self,
        watermarked: &DynamicImage,
        record: &SideChannelRecord,
        alpha: f64,
    ) -> Result<GrayImage, WatermarkError> {
        if alpha == 0.0 {
            return Err(WatermarkError::DegenerateArithmetic(
                "Extraction requires the nonzero alpha used at embedding".into(),
            ));
        }

        let (cw, ch) = (self.config.carrier_width, self.config.carrier_height);
        let (ww, wh) = (self.config.watermark_width, self.config.watermark_height);

        let u = record.watermark_u.to_dmatrix()?;
        let v_t = record.watermark_v_t.to_dmatrix()?;
        if u.nrows() != wh as usize || v_t.ncols() != ww as usize {
            return Err(WatermarkError::Dimension(format!(
                "Record watermark factors {}x{} do not match configured watermark {}x{}",
                u.nrows(),
                v_t.ncols(),
                wh,
                ww
            )));
        }
        if record.permutation.len() != (ww * wh) as usize {
            return Err(WatermarkError::Dimension(format!(
                "Record permutation length {} does not match watermark size {}x{}",
                record.permutation.len(),
                ww,
                wh
            )));
        }

        // ── 几何重对齐 + 观测奇异值 ─────────────────────────────────────────
        // 缩放攻击后的图片被拉回嵌入几何，保证 LL 形状与记录对齐
        let aligned = if watermarked.width() == cw && watermarked.height() == ch {
            watermarked.clone()
        } else {
            watermarked.resize_exact(cw, ch, FilterType::Triangle)
        };
        let planes = colorspace::planes_from_rgb(&aligned.to_rgb8());
        let bands = self.dwt.decompose(planes.y.view())?;
        let observed = svd::singular_values_only(&bands.ll);

        // ── 反解混合并重建置乱水印 ──────────────────────────────────────────
        let recovered = svd::invert_blend(&observed, &record.carrier_singular_values, alpha)?;
        let scrambled = svd::compose(&u, &recovered, &v_t)?;
        let restored = scramble::descramble(&scrambled, &record.permutation)?;

        Ok(colorspace::gray_from_plane(&restored))
    }

    /// 按 `(image_id, alpha)` 从存储加载记录后提取
    ///
    /// # 错误
    /// 存储中没有对应记录时返回 `RecordNotFound`。
    pub fn extract_from_store(
        &self,
        watermarked: &DynamicImage,
        image_id: &str,
        alpha: f64,
        store: &dyn RecordStore,
    ) -> Result<GrayImage, WatermarkError> {
        let record = store.get(&RecordKey::new(image_id, alpha))?;
        self.extract(watermarked, &record, alpha)
    }

    /// 从文件路径加载含水印图片后提取
    pub fn extract_file(
        &self,
        watermarked_path: &Path,
        record: &SideChannelRecord,
        alpha: f64,
    ) -> Result<GrayImage, WatermarkError> {
        let watermarked = open_image(watermarked_path)?;
        self.extract(&watermarked, record, alpha)
    }
}

impl Default for WatermarkExtractor {
    fn default() -> Self {
        Self::new()
    }
}
