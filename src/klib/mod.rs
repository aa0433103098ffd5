//! Kernel Library (KLib).
//!
//! Utilitários agnósticos de hardware para uso interno do núcleo de reclaim.

pub mod test_framework;

/// Divisão inteira que nunca divide por zero (`den == 0` vira 1).
#[inline]
pub const fn div_or_one(num: usize, den: usize) -> usize {
    if den == 0 {
        num
    } else {
        num / den
    }
}
