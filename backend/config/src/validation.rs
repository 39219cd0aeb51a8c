//! Config validation: field-level checks with user-friendly messages.

use crate::defaults::MAX_TIMEOUT_SECS;
use crate::schema::ParleyConfig;
use thiserror::Error;

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// All errors and warnings found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &ParleyConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_agent(config, &mut report);
    validate_server(config, &mut report);
    validate_peers(config, &mut report);
    validate_timeouts(config, &mut report);
    validate_routes(config, &mut report);
    report
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

fn validate_agent(config: &ParleyConfig, report: &mut ValidationReport) {
    if config.agent.name.trim().is_empty() {
        report.error("agent.name", "Agent name cannot be empty");
    }
    if let Some(url) = &config.agent.public_url {
        if !is_http_url(url) {
            report.error("agent.publicUrl", format!("'{url}' is not an http(s) URL"));
        }
    }
}

fn validate_server(config: &ParleyConfig, report: &mut ValidationReport) {
    let port = config.server.port;
    if port == 0 {
        report.error("server.port", "Port must be > 0");
    } else if port < 1024 && port != 80 && port != 443 {
        report.warn(
            "server.port",
            format!("Port {port} requires elevated privileges; consider using a port >= 1024"),
        );
    }
}

fn validate_peers(config: &ParleyConfig, report: &mut ValidationReport) {
    for (i, url) in config.peers.iter().enumerate() {
        if !is_http_url(url) {
            report.error(format!("peers[{i}]"), format!("'{url}' is not an http(s) URL"));
        }
    }
    if let Some(host) = &config.host_url {
        if !is_http_url(host) {
            report.error("hostUrl", format!("'{host}' is not an http(s) URL"));
        }
        if *host == config.public_url() {
            report.warn("hostUrl", "Agent would announce itself to itself");
        }
    }
}

fn validate_timeouts(config: &ParleyConfig, report: &mut ValidationReport) {
    let t = &config.timeouts;
    for (field, secs) in [
        ("timeouts.descriptorSecs", t.descriptor_secs),
        ("timeouts.rpcSecs", t.rpc_secs),
        ("timeouts.registerSecs", t.register_secs),
    ] {
        if secs == 0 {
            report.error(field, "Timeout must be >= 1 second");
        } else if secs > MAX_TIMEOUT_SECS {
            report.error(field, format!("Timeout must be <= {MAX_TIMEOUT_SECS} seconds"));
        }
    }
}

fn validate_routes(config: &ParleyConfig, report: &mut ValidationReport) {
    for (i, rule) in config.routes.iter().enumerate() {
        let path = format!("routes[{i}]");
        if rule.keywords.is_empty() {
            report.error(format!("{path}.keywords"), "Route needs at least one keyword");
        }
        match (&rule.skill, &rule.delegate) {
            (Some(_), Some(_)) => {
                report.error(&path, "Route must set either 'skill' or 'delegate', not both")
            }
            (None, None) => report.error(&path, "Route must set 'skill' or 'delegate'"),
            (None, Some(peer)) if *peer == config.agent.name => {
                report.warn(format!("{path}.delegate"), "Route delegates to this agent itself")
            }
            _ => {}
        }
    }
}
