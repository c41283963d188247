//! 奇异值域的水印调制
//!
//! ## 算法
//!
//! ### 嵌入
//! 对载体 LL 子带与置乱后的水印分别做薄 SVD（奇异值降序），
//! 按 `S' = S_LL + alpha * S_WM` 逐元素混合，再用载体**原有**的
//! U/Vᵀ 重建修改后的 LL：只扰动奇异值，不动奇异向量基。
//! 因此 U_LL/V_LL 无需持久化——提取端对（可能被攻击过的）图片
//! 重新计算即可。
//!
//! ### 提取
//! 对含水印图片的 LL 子带重新做 SVD 得到观测奇异值，
//! 按 `S_WM = (S_obs - S_LL_orig) / alpha` 反解，再用旁路记录中
//! 持久化的水印 U/Vᵀ 重建置乱水印。载体原始奇异值与水印奇异向量
//! 都无法从被攻击的图片恢复，这正是旁路记录存在的唯一原因。

use nalgebra::{DMatrix, DVector};
use ndarray::Array2;

use crate::models::WatermarkError;

/// 薄 SVD 分解结果，奇异值降序排列
#[derive(Debug, Clone)]
pub struct SvdTriple {
    pub u: DMatrix<f64>,
    pub singular_values: Vec<f64>,
    pub v_t: DMatrix<f64>,
}

/// 对矩阵做薄 SVD
///
/// # 错误
/// nalgebra 未能返回奇异向量时报 `DegenerateArithmetic`（实践中仅发生
/// 在病态输入上）。
pub fn compute_svd(matrix: &Array2<f64>) -> Result<SvdTriple, WatermarkError> {
    let (rows, cols) = matrix.dim();
    let m = DMatrix::from_fn(rows, cols, |i, j| matrix[[i, j]]);

    let svd = m.svd(true, true);
    let u = svd.u.ok_or_else(|| {
        WatermarkError::DegenerateArithmetic("SVD did not produce left singular vectors".into())
    })?;
    let v_t = svd.v_t.ok_or_else(|| {
        WatermarkError::DegenerateArithmetic("SVD did not produce right singular vectors".into())
    })?;

    Ok(SvdTriple {
        u,
        singular_values: svd.singular_values.iter().copied().collect(),
        v_t,
    })
}

/// 只计算奇异值，不计算奇异向量
///
/// 提取端对被攻击图片的 LL 子带只需要观测奇异值；新鲜的 U/V 会被
/// 直接丢弃，不如不算。
pub fn singular_values_only(matrix: &Array2<f64>) -> Vec<f64> {
    let (rows, cols) = matrix.dim();
    let m = DMatrix::from_fn(rows, cols, |i, j| matrix[[i, j]]);
    m.svd(false, false).singular_values.iter().copied().collect()
}

impl SvdTriple {
    /// 用给定奇异值重建 `U * diag(values) * Vᵀ`
    ///
    /// # 错误
    /// `values` 长度必须等于分解的秩维度（U 的列数 = Vᵀ 的行数），
    /// 否则报 `Dimension`。
    pub fn compose_with(&self, values: &[f64]) -> Result<Array2<f64>, WatermarkError> {
        compose(&self.u, values, &self.v_t)
    }
}

/// `U * diag(values) * Vᵀ`，持久化矩阵与新鲜分解共用的重建原语
pub fn compose(
    u: &DMatrix<f64>,
    values: &[f64],
    v_t: &DMatrix<f64>,
) -> Result<Array2<f64>, WatermarkError> {
    let k = u.ncols();
    if values.len() != k || v_t.nrows() != k {
        return Err(WatermarkError::Dimension(format!(
            "Singular value count {} does not match factor shapes U:{}x{} Vt:{}x{}",
            values.len(),
            u.nrows(),
            u.ncols(),
            v_t.nrows(),
            v_t.ncols()
        )));
    }

    let diag = DMatrix::from_diagonal(&DVector::from_row_slice(values));
    let product = u * diag * v_t;

    let (rows, cols) = (product.nrows(), product.ncols());
    Ok(Array2::from_shape_fn((rows, cols), |(i, j)| product[(i, j)]))
}

/// 嵌入混合：`S_base + alpha * S_mark`，长度向较短者截断
///
/// 两个输入都是降序奇异值向量；矩形矩阵秩不同时，多出的分量
/// 不参与混合。
pub fn blend_singular_values(s_base: &[f64], s_mark: &[f64], alpha: f64) -> Vec<f64> {
    s_base
        .iter()
        .zip(s_mark.iter())
        .map(|(&base, &mark)| base + alpha * mark)
        .collect()
}

/// 提取反解：`(S_observed - S_original) / alpha`，长度向较短者截断
///
/// # 错误
/// `alpha == 0` 时嵌入本身无信号、除法也无定义，报
/// `DegenerateArithmetic` 而不是悄悄输出 NaN/Inf。
pub fn invert_blend(
    s_observed: &[f64],
    s_original: &[f64],
    alpha: f64,
) -> Result<Vec<f64>, WatermarkError> {
    if alpha == 0.0 {
        return Err(WatermarkError::DegenerateArithmetic(
            "Extraction requires a nonzero strength factor alpha".into(),
        ));
    }
    Ok(s_observed
        .iter()
        .zip(s_original.iter())
        .map(|(&observed, &original)| (observed - original) / alpha)
        .collect())
}
