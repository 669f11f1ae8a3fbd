//! Config validation
//!
//! Rules:
//! - bind address parses as a socket address
//! - capacities and counts > 0
//! - window min <= max, thresholds > 0
//! - blend fractions and smoothing factors in [0, 1]
//! - hard-reject limits not below spike limits
//! - speed bands ordered low < high

use std::net::SocketAddr;

use contracts::{ContractError, RelayConfig};

/// Validate a `RelayConfig`
///
/// Returns the first error encountered.
pub fn validate(config: &RelayConfig) -> Result<(), ContractError> {
    validate_network(config)?;
    validate_capacities(config)?;
    validate_clock(config)?;
    validate_window(config)?;
    validate_resampling(config)?;
    validate_filter(config)?;
    validate_smoothing(config)?;
    validate_calibration(config)?;
    Ok(())
}

fn positive(field: &str, value: f64) -> Result<(), ContractError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ContractError::config_validation(
            field,
            format!("must be > 0, got {value}"),
        ))
    }
}

fn non_negative(field: &str, value: f64) -> Result<(), ContractError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ContractError::config_validation(
            field,
            format!("must be >= 0, got {value}"),
        ))
    }
}

fn unit_interval(field: &str, value: f64) -> Result<(), ContractError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ContractError::config_validation(
            field,
            format!("must be within [0, 1], got {value}"),
        ))
    }
}

fn ordered(field: &str, low: f64, high: f64) -> Result<(), ContractError> {
    if low < high {
        Ok(())
    } else {
        Err(ContractError::config_validation(
            field,
            format!("low ({low}) must be < high ({high})"),
        ))
    }
}

fn validate_network(config: &RelayConfig) -> Result<(), ContractError> {
    let net = &config.network;
    if net.bind_addr.parse::<SocketAddr>().is_err() {
        return Err(ContractError::config_validation(
            "network.bind_addr",
            format!("'{}' is not a valid socket address", net.bind_addr),
        ));
    }
    if net.max_datagram_bytes == 0 {
        return Err(ContractError::config_validation(
            "network.max_datagram_bytes",
            "must be > 0",
        ));
    }
    Ok(())
}

fn validate_capacities(config: &RelayConfig) -> Result<(), ContractError> {
    if config.queue.capacity == 0 {
        return Err(ContractError::config_validation(
            "queue.capacity",
            "must be > 0",
        ));
    }
    if config.history.max_count < 2 {
        return Err(ContractError::config_validation(
            "history.max_count",
            format!(
                "must hold at least 2 samples, got {}",
                config.history.max_count
            ),
        ));
    }
    if config.reconstruction.head_history_max == 0 {
        return Err(ContractError::config_validation(
            "reconstruction.head_history_max",
            "must be > 0",
        ));
    }
    positive("history.retention_s", config.history.retention_s)?;
    positive("history.max_sample_age_s", config.history.max_sample_age_s)?;
    positive(
        "reconstruction.head_history_s",
        config.reconstruction.head_history_s,
    )?;
    Ok(())
}

fn validate_clock(config: &RelayConfig) -> Result<(), ContractError> {
    let clock = &config.clock;
    positive("clock.delay_alpha", clock.delay_alpha)?;
    unit_interval("clock.delay_alpha", clock.delay_alpha)?;
    positive("clock.jitter_alpha", clock.jitter_alpha)?;
    unit_interval("clock.jitter_alpha", clock.jitter_alpha)?;
    positive("clock.process_noise", clock.process_noise)?;
    positive("clock.measurement_noise", clock.measurement_noise)?;
    non_negative("clock.transit_estimate_ms", clock.transit_estimate_ms)?;
    if clock.residual_window == 0 {
        return Err(ContractError::config_validation(
            "clock.residual_window",
            "must be > 0",
        ));
    }
    Ok(())
}

fn validate_window(config: &RelayConfig) -> Result<(), ContractError> {
    let window = &config.window;
    positive("window.scale", window.scale)?;
    non_negative("window.safety_ms", window.safety_ms)?;
    non_negative("window.min_ms", window.min_ms)?;
    if window.min_ms > window.max_ms {
        return Err(ContractError::config_validation(
            "window.min_ms / window.max_ms",
            format!(
                "min_ms ({}) must be <= max_ms ({})",
                window.min_ms, window.max_ms
            ),
        ));
    }
    Ok(())
}

fn validate_resampling(config: &RelayConfig) -> Result<(), ContractError> {
    let resampling = &config.resampling;
    non_negative("resampling.render_delay_ms", resampling.render_delay_ms)?;
    non_negative("resampling.lead_ms", resampling.lead_ms)?;
    positive("resampling.min_delta_s", resampling.min_delta_s)?;
    Ok(())
}

fn validate_filter(config: &RelayConfig) -> Result<(), ContractError> {
    let filter = &config.filter;
    positive("filter.deadzone_m", filter.deadzone_m)?;
    positive("filter.deadzone_deg", filter.deadzone_deg)?;
    positive("filter.spike_m", filter.spike_m)?;
    positive("filter.spike_deg", filter.spike_deg)?;
    positive("filter.hard_reject_m", filter.hard_reject_m)?;
    positive("filter.hard_reject_deg", filter.hard_reject_deg)?;
    unit_interval("filter.spike_blend", filter.spike_blend)?;

    if filter.hard_reject_m < filter.spike_m {
        return Err(ContractError::config_validation(
            "filter.hard_reject_m",
            format!(
                "hard limit ({}) must not be below the spike limit ({})",
                filter.hard_reject_m, filter.spike_m
            ),
        ));
    }
    if filter.hard_reject_deg < filter.spike_deg {
        return Err(ContractError::config_validation(
            "filter.hard_reject_deg",
            format!(
                "hard limit ({}) must not be below the spike limit ({})",
                filter.hard_reject_deg, filter.spike_deg
            ),
        ));
    }
    Ok(())
}

fn validate_smoothing(config: &RelayConfig) -> Result<(), ContractError> {
    let s = &config.smoothing;
    unit_interval("smoothing.base_factor", s.base_factor)?;
    unit_interval("smoothing.base_weight", s.base_weight)?;
    unit_interval("smoothing.max_smoothing", s.max_smoothing)?;
    unit_interval("smoothing.min_smoothing", s.min_smoothing)?;
    unit_interval("smoothing.min_confidence_scale", s.min_confidence_scale)?;
    ordered("smoothing.speed_pos_low", s.speed_pos_low, s.speed_pos_high)?;
    ordered("smoothing.speed_rot_low", s.speed_rot_low, s.speed_rot_high)?;
    positive("smoothing.normal_sharpness", s.normal_sharpness)?;
    positive("smoothing.fast_sharpness", s.fast_sharpness)?;
    non_negative("smoothing.snap_distance_m", s.snap_distance_m)?;
    non_negative("smoothing.snap_angle_deg", s.snap_angle_deg)?;
    Ok(())
}

fn validate_calibration(config: &RelayConfig) -> Result<(), ContractError> {
    positive(
        "calibration.default_interval_s",
        config.calibration.default_interval_s,
    )?;
    if config.calibration.default_steps == 0 {
        return Err(ContractError::config_validation(
            "calibration.default_steps",
            "must be > 0",
        ));
    }
    Ok(())
}
