//! Operation messages returned by mutating endpoints.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OperationMessage {
    pub code: u16,
    pub description: &'static str,
}

impl OperationMessage {
    pub const CREATE_MEASURE_SUCCEED: Self = Self::new(201, "Create Measure Succeed");
    pub const DELETE_MEASURE_SUCCEED: Self = Self::new(202, "Delete Measure Succeed");
    pub const CREATE_JOB_SUCCEED: Self = Self::new(205, "Create Job Succeed");
    pub const DELETE_JOB_SUCCEED: Self = Self::new(206, "Delete Job Succeed");
    pub const CREATE_MEASURE_FAILED: Self = Self::new(401, "Create Measure Failed");
    pub const DELETE_MEASURE_FAILED: Self = Self::new(402, "Delete Measure Failed");
    pub const CREATE_JOB_FAILED: Self = Self::new(405, "Create Job Failed");
    pub const DELETE_JOB_FAILED: Self = Self::new(406, "Delete Job Failed");

    const fn new(code: u16, description: &'static str) -> Self {
        Self { code, description }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_serialization() {
        let json = serde_json::to_value(OperationMessage::CREATE_JOB_FAILED).unwrap();
        assert_eq!(json, serde_json::json!({"code": 405, "description": "Create Job Failed"}));
    }

    #[test]
    fn test_success_and_failure_codes_pair_up() {
        let pairs = [
            (OperationMessage::CREATE_MEASURE_SUCCEED, OperationMessage::CREATE_MEASURE_FAILED),
            (OperationMessage::DELETE_MEASURE_SUCCEED, OperationMessage::DELETE_MEASURE_FAILED),
            (OperationMessage::CREATE_JOB_SUCCEED, OperationMessage::CREATE_JOB_FAILED),
            (OperationMessage::DELETE_JOB_SUCCEED, OperationMessage::DELETE_JOB_FAILED),
        ];
        for (ok, failed) in pairs {
            assert_eq!(failed.code, ok.code + 200);
        }
    }
}
