//! Adaptive render-delay window.

use contracts::WindowConfig;

/// Interpolation window from network statistics (milliseconds)
///
/// `clamp(scale * (delay + jitter) + safety, min, max)`
///
/// Larger delay or jitter → wider window (fewer extrapolation gaps);
/// a quiet link shrinks it toward `min_ms` (less latency).
pub fn compute_window_ms(delay_ema_ms: f64, jitter_ema_ms: f64, config: &WindowConfig) -> f64 {
    let raw = config.scale * (delay_ema_ms + jitter_ema_ms) + config.safety_ms;
    raw.clamp(config.min_ms, config.max_ms.max(config.min_ms))
}
