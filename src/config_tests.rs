// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `config.rs`

#[cfg(test)]
mod tests {
    use super::super::*;

    fn parse(args: &[&str]) -> OperatorConfig {
        let mut argv = vec!["tenant-reconciler", "--installation", "ginger"];
        argv.extend_from_slice(args);
        OperatorConfig::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = parse(&["--route-table-names", "ginger_private_0"]);

        assert_eq!(config.installation, "ginger");
        assert_eq!(config.requeue_intervals(), RequeueIntervals::default());
        assert_eq!(config.retry_config(), RetryConfig::default());
        assert_eq!(config.cache_ttl(), Duration::from_secs(60));
        assert_eq!(config.metrics_bind_address, "0.0.0.0:8080");
        assert_eq!(config.operator_version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_route_table_names_are_comma_separated() {
        let config = parse(&["--route-table-names", "ginger_private_0,ginger_private_1"]);

        assert_eq!(
            config.route_table_names,
            vec!["ginger_private_0", "ginger_private_1"]
        );
    }

    #[test]
    fn test_overrides() {
        let config = parse(&[
            "--requeue-cancelled-secs",
            "5",
            "--retry-max-attempts",
            "2",
            "--retry-initial-interval-ms",
            "250",
            "--log-format",
            "json",
        ]);

        assert_eq!(config.requeue_intervals().cancelled, Duration::from_secs(5));
        assert_eq!(config.retry_config().max_attempts, 2);
        assert_eq!(
            config.retry_config().initial_interval,
            Duration::from_millis(250)
        );
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_zero_attempts_still_runs_once() {
        let config = parse(&["--retry-max-attempts", "0"]);
        assert_eq!(config.retry_config().max_attempts, 1);
    }

    #[test]
    fn test_installation_is_required() {
        assert!(OperatorConfig::try_parse_from(["tenant-reconciler"]).is_err()
            || std::env::var("INSTALLATION_NAME").is_ok());
    }
}
