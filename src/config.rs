use std::env;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use crate::optimizer::{CountPolicy, LayoutConfig, ScalingMode};

/// Complete application configuration, loaded from environment variables or default values.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub optimizer: OptimizerConfig,
}

impl AppConfig {
    /// Creates a configuration from the currently available environment variables.
    pub fn from_env() -> Self {
        Self {
            api: ApiConfig::from_env(),
            optimizer: OptimizerConfig::from_env(),
        }
    }
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    bind_ip: IpAddr,
    display_host: String,
    port: u16,
}

impl ApiConfig {
    const DEFAULT_HOST: &'static str = "0.0.0.0";
    const DEFAULT_PORT: u16 = 8080;
    const HOST_VAR: &'static str = "LAYER_IT_NOW_API_HOST";
    const PORT_VAR: &'static str = "LAYER_IT_NOW_API_PORT";

    fn from_env() -> Self {
        Self::from_values(env_string(Self::HOST_VAR), env_string(Self::PORT_VAR))
    }

    fn from_values(host: Option<String>, port: Option<String>) -> Self {
        let host_value = host.unwrap_or_else(|| Self::DEFAULT_HOST.to_string());
        let (bind_ip, display_host) = match host_value.parse::<IpAddr>() {
            Ok(ip) => (ip, host_value),
            Err(err) => {
                log::warn!(
                    "⚠️ Could not parse {} ('{}'): {}. Using {}.",
                    Self::HOST_VAR,
                    host_value,
                    err,
                    Self::DEFAULT_HOST
                );
                (
                    IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                    Self::DEFAULT_HOST.to_string(),
                )
            }
        };

        let port = match port {
            Some(raw) => match raw.parse::<u16>() {
                Ok(value) if value != 0 => value,
                Ok(_) => {
                    log::warn!(
                        "⚠️ {} must not be 0. Using {}.",
                        Self::PORT_VAR,
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
                Err(err) => {
                    log::warn!(
                        "⚠️ Could not parse {} ('{}'): {}. Using {}.",
                        Self::PORT_VAR,
                        raw,
                        err,
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
            },
            None => Self::DEFAULT_PORT,
        };

        Self {
            bind_ip,
            display_host,
            port,
        }
    }

    /// Socket address to bind the server to.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.port)
    }

    /// Visible hostname for logging and hints.
    pub fn display_host(&self) -> &str {
        &self.display_host
    }

    /// Configured port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Indicates whether binding to all interfaces.
    pub fn binds_to_all_interfaces(&self) -> bool {
        match self.bind_ip {
            IpAddr::V4(addr) => addr == Ipv4Addr::UNSPECIFIED,
            IpAddr::V6(addr) => addr == Ipv6Addr::UNSPECIFIED,
        }
    }

    /// Checks whether the hostname matches the default value.
    pub fn uses_default_host(&self) -> bool {
        self.display_host == Self::DEFAULT_HOST
    }
}

/// Configuration for the layer search.
#[derive(Clone, Debug, Default)]
pub struct OptimizerConfig {
    layout: LayoutConfig,
}

impl OptimizerConfig {
    const PALLET_WIDTH_VAR: &'static str = "LAYER_IT_NOW_PALLET_WIDTH";
    const PALLET_LENGTH_VAR: &'static str = "LAYER_IT_NOW_PALLET_LENGTH";
    const TARGET_RATIO_VAR: &'static str = "LAYER_IT_NOW_TARGET_RATIO";
    const SCALE_INCREMENT_VAR: &'static str = "LAYER_IT_NOW_SCALE_INCREMENT";
    const MAX_SCALE_FACTOR_VAR: &'static str = "LAYER_IT_NOW_MAX_SCALE_FACTOR";
    const FINE_SCALE_INCREMENT_VAR: &'static str = "LAYER_IT_NOW_FINE_SCALE_INCREMENT";
    const MAX_ADDITIONAL_SIZE_VAR: &'static str = "LAYER_IT_NOW_MAX_ADDITIONAL_SIZE";
    const MAX_GRID_ROWS_VAR: &'static str = "LAYER_IT_NOW_MAX_GRID_ROWS";
    const MAX_GRID_COLUMNS_VAR: &'static str = "LAYER_IT_NOW_MAX_GRID_COLUMNS";
    const MAX_SWEEP_COUNT_VAR: &'static str = "LAYER_IT_NOW_MAX_SWEEP_COUNT";
    const MIN_BOX_DIMENSION_VAR: &'static str = "LAYER_IT_NOW_MIN_BOX_DIMENSION";
    const MAX_BOX_DIMENSION_VAR: &'static str = "LAYER_IT_NOW_MAX_BOX_DIMENSION";
    const MAX_BOX_COUNT_VAR: &'static str = "LAYER_IT_NOW_MAX_BOX_COUNT";
    const COLUMN_WISE_PENALTY_VAR: &'static str = "LAYER_IT_NOW_COLUMN_WISE_PENALTY";
    const SCALING_MODE_VAR: &'static str = "LAYER_IT_NOW_SCALING_MODE";
    const COUNT_POLICY_VAR: &'static str = "LAYER_IT_NOW_COUNT_POLICY";

    fn from_env() -> Self {
        let pallet_width = load_f64_with_warning(
            Self::PALLET_WIDTH_VAR,
            LayoutConfig::DEFAULT_PALLET_WIDTH,
            |value| value > 0.0,
            "must be greater than 0",
            "Warning: Non-standard pallet width",
        );

        let pallet_length = load_f64_with_warning(
            Self::PALLET_LENGTH_VAR,
            LayoutConfig::DEFAULT_PALLET_LENGTH,
            |value| value > 0.0,
            "must be greater than 0",
            "Warning: Non-standard pallet length",
        );

        let target_ratio = load_f64_with_warning(
            Self::TARGET_RATIO_VAR,
            LayoutConfig::DEFAULT_TARGET_RATIO,
            |value| value > 0.0,
            "must be greater than 0",
            "Warning: Adjusted target ratio changes which layouts count as stable",
        );

        let scale_increment = load_f64_with_warning(
            Self::SCALE_INCREMENT_VAR,
            LayoutConfig::DEFAULT_SCALE_INCREMENT,
            |value| value > 0.0,
            "must be greater than 0",
            "Warning: Adjusted scale step changes how far pallets grow",
        );

        let max_scale_factor = load_f64_with_warning(
            Self::MAX_SCALE_FACTOR_VAR,
            LayoutConfig::DEFAULT_MAX_SCALE_FACTOR,
            |value| value >= 1.0,
            "must be at least 1",
            "Warning: Adjusted scale cap may allow oversized pallets",
        );

        let fine_scale_increment = load_f64_with_warning(
            Self::FINE_SCALE_INCREMENT_VAR,
            LayoutConfig::DEFAULT_FINE_SCALE_INCREMENT,
            |value| value > 0.0,
            "must be greater than 0",
            "Warning: Small fine scale steps multiply the search time",
        );

        let max_additional_size = load_f64_with_warning(
            Self::MAX_ADDITIONAL_SIZE_VAR,
            LayoutConfig::DEFAULT_MAX_ADDITIONAL_SIZE,
            |value| value >= 0.0,
            "must not be negative",
            "Warning: Adjusted growth cap for independent scaling",
        );

        let max_grid_rows = load_usize_with_warning(
            Self::MAX_GRID_ROWS_VAR,
            LayoutConfig::DEFAULT_MAX_GRID_ROWS,
            |value| (1..=32).contains(&value),
            "must be between 1 and 32",
        );

        let max_grid_columns = load_usize_with_warning(
            Self::MAX_GRID_COLUMNS_VAR,
            LayoutConfig::DEFAULT_MAX_GRID_COLUMNS,
            |value| (1..=32).contains(&value),
            "must be between 1 and 32",
        );

        let max_sweep_count = load_usize_with_warning(
            Self::MAX_SWEEP_COUNT_VAR,
            LayoutConfig::DEFAULT_MAX_SWEEP_COUNT,
            |value| value >= 1,
            "must be at least 1",
        );

        let min_box_dimension = load_f64_with_warning(
            Self::MIN_BOX_DIMENSION_VAR,
            LayoutConfig::DEFAULT_MIN_BOX_DIMENSION,
            |value| value > 0.0,
            "must be greater than 0",
            "Warning: Adjusted minimum box dimension",
        );

        let max_box_dimension = load_f64_with_warning(
            Self::MAX_BOX_DIMENSION_VAR,
            LayoutConfig::DEFAULT_MAX_BOX_DIMENSION,
            |value| value > min_box_dimension,
            "must exceed the minimum box dimension",
            "Warning: Adjusted maximum box dimension",
        );

        let max_box_count = load_usize_with_warning(
            Self::MAX_BOX_COUNT_VAR,
            LayoutConfig::DEFAULT_MAX_BOX_COUNT,
            |value| value >= 1,
            "must be at least 1",
        );

        let column_wise_penalty = load_f64_with_warning(
            Self::COLUMN_WISE_PENALTY_VAR,
            LayoutConfig::DEFAULT_COLUMN_WISE_PENALTY,
            |value| value >= 0.0,
            "must not be negative",
            "Warning: Adjusted penalty shifts the preference between strategies",
        );

        let scaling_mode = env_string(Self::SCALING_MODE_VAR)
            .and_then(|raw| parse_scaling_mode(&raw, Self::SCALING_MODE_VAR))
            .unwrap_or_default();

        let count_policy = env_string(Self::COUNT_POLICY_VAR)
            .and_then(|raw| parse_count_policy(&raw, Self::COUNT_POLICY_VAR))
            .unwrap_or_default();

        let layout = LayoutConfig::builder()
            .pallet(pallet_width, pallet_length)
            .target_ratio(target_ratio)
            .proportional_scaling(scale_increment, max_scale_factor)
            .independent_scaling(fine_scale_increment, max_additional_size)
            .max_grid(max_grid_rows, max_grid_columns)
            .sweep(
                LayoutConfig::DEFAULT_SWEEP_LOWER_DIVISOR,
                LayoutConfig::DEFAULT_SWEEP_UPPER_MULTIPLIER,
                max_sweep_count,
            )
            .box_dimension_range(min_box_dimension, max_box_dimension)
            .max_box_count(max_box_count)
            .scoring(LayoutConfig::DEFAULT_EFFICIENCY_WEIGHT, column_wise_penalty)
            .scaling_mode(scaling_mode)
            .count_policy(count_policy)
            .build();

        Self { layout }
    }

    /// Returns the configured LayoutConfig.
    pub fn layout_config(&self) -> LayoutConfig {
        self.layout
    }
}

impl From<LayoutConfig> for OptimizerConfig {
    fn from(layout: LayoutConfig) -> Self {
        Self { layout }
    }
}

fn env_string(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_owned())
            }
        }
        Err(env::VarError::NotPresent) => None,
        Err(err) => {
            log::warn!(
                "⚠️ Access to {} failed: {}. Using default value.",
                name,
                err
            );
            None
        }
    }
}

fn parse_scaling_mode(raw: &str, var_name: &str) -> Option<ScalingMode> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "proportional" | "uniform" => Some(ScalingMode::Proportional),
        "independent" | "fine" => Some(ScalingMode::Independent),
        other => {
            log::warn!(
                "⚠️ Could not interpret {} ('{}') as scaling mode. Using default value.",
                var_name,
                other
            );
            None
        }
    }
}

fn parse_count_policy(raw: &str, var_name: &str) -> Option<CountPolicy> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "density" => Some(CountPolicy::Density),
        "efficiency" | "efficiency_and_count" => Some(CountPolicy::EfficiencyAndCount),
        other => {
            log::warn!(
                "⚠️ Could not interpret {} ('{}') as count policy. Using default value.",
                var_name,
                other
            );
            None
        }
    }
}

fn parse_f64_value(
    var_name: &str,
    raw: Option<String>,
    default: f64,
    validator: impl Fn(f64) -> bool,
    invalid_hint: &str,
    warning: &str,
) -> f64 {
    let Some(raw) = raw else {
        return default;
    };
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() && validator(value) => {
            let tolerance = (default.abs().max(1.0)) * 1e-9;
            if (value - default).abs() > tolerance {
                log::info!("⚠️ {} ({} = {}).", warning, var_name, value);
            }
            value
        }
        Ok(_) => {
            log::warn!(
                "⚠️ {} contains invalid value '{}': {}. Using {}.",
                var_name,
                raw,
                invalid_hint,
                default
            );
            default
        }
        Err(err) => {
            log::warn!(
                "⚠️ Could not parse {} ('{}') as number: {}. Using {}.",
                var_name,
                raw,
                err,
                default
            );
            default
        }
    }
}

fn load_f64_with_warning(
    var_name: &str,
    default: f64,
    validator: impl Fn(f64) -> bool,
    invalid_hint: &str,
    warning: &str,
) -> f64 {
    parse_f64_value(
        var_name,
        env_string(var_name),
        default,
        validator,
        invalid_hint,
        warning,
    )
}

fn parse_usize_value(
    var_name: &str,
    raw: Option<String>,
    default: usize,
    validator: impl Fn(usize) -> bool,
    invalid_hint: &str,
) -> usize {
    let Some(raw) = raw else {
        return default;
    };
    match raw.parse::<usize>() {
        Ok(value) if validator(value) => value,
        Ok(_) => {
            log::warn!(
                "⚠️ {} contains invalid value '{}': {}. Using {}.",
                var_name,
                raw,
                invalid_hint,
                default
            );
            default
        }
        Err(err) => {
            log::warn!(
                "⚠️ Could not parse {} ('{}') as integer: {}. Using {}.",
                var_name,
                raw,
                err,
                default
            );
            default
        }
    }
}

fn load_usize_with_warning(
    var_name: &str,
    default: usize,
    validator: impl Fn(usize) -> bool,
    invalid_hint: &str,
) -> usize {
    parse_usize_value(var_name, env_string(var_name), default, validator, invalid_hint)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scaling_mode_values() {
        assert_eq!(
            parse_scaling_mode("proportional", "TEST_VAR"),
            Some(ScalingMode::Proportional)
        );
        assert_eq!(
            parse_scaling_mode("Independent", "TEST_VAR"),
            Some(ScalingMode::Independent)
        );

        // Test with whitespace
        assert_eq!(
            parse_scaling_mode("  fine ", "TEST_VAR"),
            Some(ScalingMode::Independent)
        );
    }

    #[test]
    fn test_parse_count_policy_values() {
        assert_eq!(
            parse_count_policy("density", "TEST_VAR"),
            Some(CountPolicy::Density)
        );
        assert_eq!(
            parse_count_policy("EFFICIENCY", "TEST_VAR"),
            Some(CountPolicy::EfficiencyAndCount)
        );
        assert_eq!(
            parse_count_policy("efficiency_and_count", "TEST_VAR"),
            Some(CountPolicy::EfficiencyAndCount)
        );
    }

    #[test]
    fn test_parse_enum_invalid_values() {
        assert_eq!(parse_scaling_mode("diagonal", "TEST_VAR"), None);
        assert_eq!(parse_scaling_mode("", "TEST_VAR"), None);
        assert_eq!(parse_count_policy("most", "TEST_VAR"), None);
        assert_eq!(parse_count_policy("  ", "TEST_VAR"), None);
    }

    #[test]
    fn test_parse_f64_value_falls_back() {
        let positive = |value: f64| value > 0.0;
        assert_eq!(parse_f64_value("T", None, 40.0, positive, "", ""), 40.0);
        assert_eq!(
            parse_f64_value("T", Some("44.5".into()), 40.0, positive, "", ""),
            44.5
        );
        assert_eq!(
            parse_f64_value("T", Some("-3".into()), 40.0, positive, "", ""),
            40.0
        );
        assert_eq!(
            parse_f64_value("T", Some("wide".into()), 40.0, positive, "", ""),
            40.0
        );
        assert_eq!(
            parse_f64_value("T", Some("inf".into()), 40.0, positive, "", ""),
            40.0
        );
    }

    #[test]
    fn test_parse_usize_value_falls_back() {
        let small = |value: usize| (1..=32).contains(&value);
        assert_eq!(parse_usize_value("T", Some("6".into()), 8, small, ""), 6);
        assert_eq!(parse_usize_value("T", Some("0".into()), 8, small, ""), 8);
        assert_eq!(parse_usize_value("T", Some("-1".into()), 8, small, ""), 8);
        assert_eq!(parse_usize_value("T", None, 8, small, ""), 8);
    }

    #[test]
    fn test_api_config_values() {
        let config = ApiConfig::from_values(None, None);
        assert!(config.uses_default_host());
        assert!(config.binds_to_all_interfaces());
        assert_eq!(config.port(), 8080);

        let config = ApiConfig::from_values(Some("127.0.0.1".into()), Some("9000".into()));
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:9000");
        assert!(!config.binds_to_all_interfaces());

        let config = ApiConfig::from_values(Some("not-an-ip".into()), Some("0".into()));
        assert_eq!(config.display_host(), "0.0.0.0");
        assert_eq!(config.port(), 8080);
    }

    #[test]
    fn test_optimizer_config_defaults() {
        let config = OptimizerConfig::default().layout_config();
        assert_eq!(config.pallet_width, 40.0);
        assert_eq!(config.pallet_length, 48.0);
        assert_eq!(config.scaling_mode, ScalingMode::Proportional);
        assert_eq!(config.count_policy, CountPolicy::Density);
    }
}
