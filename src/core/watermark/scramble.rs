//! 混沌像素置乱 / 还原
//!
//! ## 算法
//!
//! ### 置乱（嵌入前）
//! 1. 将矩阵按行优先展平为长度 N 的序列
//! 2. 生成长度 N 的 logistic 混沌序列
//! 3. `perm = argsort(seq)`：perm[k] = 第 k 小混沌值的下标（稳定排序，
//!    相等值按原下标先后）
//! 4. gather：`scrambled[k] = flat[perm[k]]`，再还原形状
//!
//! ### 还原（提取后）
//! scatter：`result[perm[k]] = scrambled_flat[k]`，与置乱互为精确逆操作。
//! 提取端只需要持久化的 perm，不需要 x0/r，也不重新生成混沌序列。
//!
//! 置乱/还原是纯粹的重排，不做任何数值运算，往返逐位无损。

use ndarray::Array2;

use crate::core::watermark::chaos::logistic_sequence;
use crate::models::{ChaosParams, WatermarkError};

/// 用混沌序列置乱矩阵，返回置乱结果与置换表
///
/// 置换下标使用 `u32` 而非 `usize`，保证持久化后的记录在 32 位与
/// 64 位平台之间可互换。
pub fn scramble(matrix: &Array2<f64>, params: &ChaosParams) -> (Array2<f64>, Vec<u32>) {
    let (h, w) = matrix.dim();
    let n = h * w;

    let seq = logistic_sequence(n, params.x0, params.r);
    let mut perm: Vec<u32> = (0..n as u32).collect();
    // 稳定排序 + total_cmp：相等值保持原下标顺序，退化种子产生的
    // NaN 也不会引发 panic
    perm.sort_by(|&a, &b| seq[a as usize].total_cmp(&seq[b as usize]));

    let flat: Vec<f64> = matrix.iter().copied().collect();
    let scrambled_flat: Vec<f64> = perm.iter().map(|&p| flat[p as usize]).collect();

    let scrambled = Array2::from_shape_vec((h, w), scrambled_flat)
        .expect("scrambled element count matches source shape");
    (scrambled, perm)
}

/// 用置换表将置乱矩阵还原为原始顺序
///
/// # 错误
/// 置换表长度与矩阵元素个数不一致、或置换下标越界时返回
/// `WatermarkError::Dimension`（通常意味着记录与图片不匹配或已损坏）。
pub fn descramble(matrix: &Array2<f64>, perm: &[u32]) -> Result<Array2<f64>, WatermarkError> {
    let (h, w) = matrix.dim();
    let n = h * w;

    if perm.len() != n {
        return Err(WatermarkError::Dimension(format!(
            "Permutation length {} does not match matrix element count {}",
            perm.len(),
            n
        )));
    }
    if let Some(&bad) = perm.iter().find(|&&p| p as usize >= n) {
        return Err(WatermarkError::Dimension(format!(
            "Permutation index {} out of range for {} elements",
            bad, n
        )));
    }

    let mut flat = vec![0.0f64; n];
    for (k, value) in matrix.iter().enumerate() {
        flat[perm[k] as usize] = *value;
    }

    let restored = Array2::from_shape_vec((h, w), flat)
        .expect("descrambled element count matches source shape");
    Ok(restored)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_matrix(h: usize, w: usize) -> Array2<f64> {
        Array2::from_shape_fn((h, w), |(i, j)| (i * w + j) as f64)
    }

    #[test]
    fn test_scramble_descramble_roundtrip_exact() {
        let original = test_matrix(16, 16);
        let params = ChaosParams::default();

        let (scrambled, perm) = scramble(&original, &params);
        let restored = descramble(&scrambled, &perm).unwrap();

        // 纯重排，要求逐位精确还原
        assert_eq!(original, restored, "往返应逐位无损");
    }

    #[test]
    fn test_scramble_is_deterministic() {
        let m = test_matrix(32, 8);
        let params = ChaosParams::default();

        let (s1, p1) = scramble(&m, &params);
        let (s2, p2) = scramble(&m, &params);
        assert_eq!(s1, s2);
        assert_eq!(p1, p2, "相同参数应产生相同置换");
    }

    #[test]
    fn test_different_seeds_give_different_permutations() {
        let m = test_matrix(16, 16);
        let (_, p1) = scramble(&m, &ChaosParams { x0: 0.7, r: 3.99 });
        let (_, p2) = scramble(&m, &ChaosParams { x0: 0.3, r: 3.99 });
        assert_ne!(p1, p2, "不同种子应产生不同置换");
    }

    #[test]
    fn test_permutation_is_bijection() {
        let m = test_matrix(16, 16);
        let (_, perm) = scramble(&m, &ChaosParams::default());

        let mut sorted = perm.clone();
        sorted.sort_unstable();
        let expected: Vec<u32> = (0..256).collect();
        assert_eq!(sorted, expected, "置换表应覆盖 [0, N) 每个下标恰好一次");
    }

    #[test]
    fn test_scramble_actually_moves_pixels() {
        let m = test_matrix(16, 16);
        let (scrambled, _) = scramble(&m, &ChaosParams::default());
        assert_ne!(m, scrambled, "混沌置乱后顺序应发生改变");
    }

    #[test]
    fn test_descramble_length_mismatch() {
        let m = test_matrix(4, 4);
        let perm: Vec<u32> = (0..8).collect();
        let result = descramble(&m, &perm);
        assert!(matches!(result, Err(WatermarkError::Dimension(_))));
    }

    #[test]
    fn test_descramble_out_of_range_index() {
        let m = test_matrix(2, 2);
        let perm = vec![0u32, 1, 2, 99];
        let result = descramble(&m, &perm);
        assert!(matches!(result, Err(WatermarkError::Dimension(_))));
    }

    #[test]
    fn test_degenerate_seed_still_roundtrips() {
        // x0 在 (0,1) 之外会退化，但置乱/还原仍必须可逆
        let m = test_matrix(8, 8);
        let params = ChaosParams { x0: 1.5, r: 3.99 };
        let (scrambled, perm) = scramble(&m, &params);
        let restored = descramble(&scrambled, &perm).unwrap();
        assert_eq!(m, restored);
    }
}
