use serde::{Deserialize, Serialize};

use crate::models::WatermarkError;

/// Logistic-map parameters driving the watermark scrambler
///
/// The map `x_{n+1} = r * x_n * (1 - x_n)` is chaotic for r in roughly
/// [3.57, 4.0]. Both values must match between embedding runs that are
/// expected to produce the same permutation; extraction itself never
/// re-derives the sequence (it descrambles with the persisted permutation).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChaosParams {
    /// Initial value, meaningful in the open interval (0, 1)
    pub x0: f64,
    /// Growth rate of the logistic map
    pub r: f64,
}

impl Default for ChaosParams {
    fn default() -> Self {
        Self { x0: 0.7, r: 3.99 }
    }
}

/// Geometry and scrambling configuration shared by embedder and extractor
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineConfig {
    /// Carrier width after mandatory resize
    pub carrier_width: u32,
    /// Carrier height after mandatory resize
    pub carrier_height: u32,
    /// Watermark width after mandatory resize
    pub watermark_width: u32,
    /// Watermark height after mandatory resize
    pub watermark_height: u32,
    /// Scrambler parameters (used at embedding time only)
    #[serde(default)]
    pub chaos: ChaosParams,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            carrier_width: 512,
            carrier_height: 512,
            watermark_width: 256,
            watermark_height: 256,
            chaos: ChaosParams::default(),
        }
    }
}

impl PipelineConfig {
    /// Validate the geometry invariants
    ///
    /// The carrier must have nonzero even dimensions (single-level DWT),
    /// and the watermark must match the LL subband exactly, i.e. half the
    /// carrier in each dimension. The singular-value blend needs equally
    /// shaped matrices on both sides.
    pub fn validate(&self) -> Result<(), WatermarkError> {
        if self.carrier_width == 0 || self.carrier_height == 0 {
            return Err(WatermarkError::Dimension(format!(
                "Carrier size must be nonzero: {}x{}",
                self.carrier_width, self.carrier_height
            )));
        }
        if self.carrier_width % 2 != 0 || self.carrier_height % 2 != 0 {
            return Err(WatermarkError::Dimension(format!(
                "Carrier size must be even for DWT: {}x{}",
                self.carrier_width, self.carrier_height
            )));
        }
        if self.watermark_width != self.carrier_width / 2
            || self.watermark_height != self.carrier_height / 2
        {
            return Err(WatermarkError::Dimension(format!(
                "Watermark size {}x{} must be half the carrier size {}x{}",
                self.watermark_width,
                self.watermark_height,
                self.carrier_width,
                self.carrier_height
            )));
        }
        Ok(())
    }
}
