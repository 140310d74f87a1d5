//! Configuration validation.

use url::Url;

use crate::error::ConfigError;
use crate::schema::Config;

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// Collapse into the first error, if any.
    pub fn into_result(self) -> Result<Vec<ValidationWarning>, ConfigError> {
        match self.errors.into_iter().next() {
            Some(error) => Err(ConfigError::InvalidValue {
                field: error.path,
                message: error.message,
            }),
            None => Ok(self.warnings),
        }
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_server(config, &mut result);
        Self::validate_scheduler(config, &mut result);
        Self::validate_instance(config, &mut result);
        Self::validate_livy(config, &mut result);

        result
    }

    fn validate_server(config: &Config, result: &mut ValidationResult) {
        if config.server.port == 0 {
            result.add_error(ValidationError::new("server.port", "Port cannot be 0"));
        }

        if config.server.host.is_empty() {
            result.add_error(ValidationError::new("server.host", "Host cannot be empty"));
        }
    }

    fn validate_scheduler(config: &Config, result: &mut ValidationResult) {
        let scheduler = &config.scheduler;
        if scheduler.group.is_empty() {
            result.add_error(ValidationError::new("scheduler.group", "Group cannot be empty"));
        }
        if scheduler.predicate_group.is_empty() {
            result.add_error(ValidationError::new(
                "scheduler.predicate_group",
                "Predicate group cannot be empty",
            ));
        }
        if scheduler.group == scheduler.predicate_group {
            result.add_error(ValidationError::new(
                "scheduler.predicate_group",
                "Predicate group must differ from the job group",
            ));
        }
        if scheduler.tick_millis == 0 {
            result.add_error(ValidationError::new(
                "scheduler.tick_millis",
                "tick_millis must be greater than 0",
            ));
        }
    }

    fn validate_instance(config: &Config, result: &mut ValidationResult) {
        let instance = &config.instance;
        for (path, value) in [
            ("instance.retention_secs", instance.retention_secs),
            ("instance.expiry_sweep_secs", instance.expiry_sweep_secs),
            ("instance.poll_interval_secs", instance.poll_interval_secs),
        ] {
            if value == 0 {
                result.add_error(ValidationError::new(path, "must be greater than 0"));
            }
        }

        if instance.poll_interval_secs < 10 {
            result.add_warning(ValidationWarning::new(
                "instance.poll_interval_secs",
                "poll interval below 10s puts extra load on the execution service",
            ));
        }
    }

    fn validate_livy(config: &Config, result: &mut ValidationResult) {
        for (path, value) in [("livy.uri", &config.livy.uri), ("livy.spark_uri", &config.livy.spark_uri)] {
            match Url::parse(value) {
                Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
                Ok(_) => result.add_error(ValidationError::new(path, "must use http:// or https://")),
                Err(e) => result.add_error(ValidationError::new(path, e.to_string())),
            }
        }

        if config.livy.timeout_secs == 0 {
            result.add_error(ValidationError::new(
                "livy.timeout_secs",
                "timeout_secs must be greater than 0",
            ));
        }

        if config.livy.file.is_empty() {
            result.add_warning(ValidationWarning::new(
                "livy.file",
                "No measure artifact configured, submissions will be rejected remotely",
            ));
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
