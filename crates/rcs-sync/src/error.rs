use rcs_storage::StoreError;
use serde::Serialize;
use thiserror::Error;

pub const GENERIC_FAILURE_MESSAGE: &str = "Whoops, something went wrong.";
pub const STORE_FAILURE_CODE: u32 = 10004;
pub const INTERNAL_FAILURE_CODE: u32 = 10005;
pub const UNREACHABLE_DATABASE_HINT: &str = "database unreachable; check SOURCE_DATABASE_URL and CRAWL_DATABASE_URL";

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("encoding remark payload: {0}")]
    Remark(#[from] serde_json::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// What an operator or caller sees when a run fails. Diagnostic detail stays
/// in the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureEnvelope {
    pub rest_status: u16,
    pub body: FailureBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureBody {
    pub err_code: u32,
    pub err_msg: String,
}

impl SyncError {
    pub fn err_code(&self) -> u32 {
        match self {
            SyncError::Store(_) => STORE_FAILURE_CODE,
            SyncError::Remark(_) | SyncError::Other(_) => INTERNAL_FAILURE_CODE,
        }
    }

    /// One line for the operator's log. Connectivity failures get a
    /// configuration hint instead of the generic message.
    pub fn operator_message(&self) -> &'static str {
        match self {
            SyncError::Store(err) if err.is_connectivity() => UNREACHABLE_DATABASE_HINT,
            _ => GENERIC_FAILURE_MESSAGE,
        }
    }

    pub fn envelope(&self) -> FailureEnvelope {
        FailureEnvelope {
            rest_status: 500,
            body: FailureBody {
                err_code: self.err_code(),
                err_msg: GENERIC_FAILURE_MESSAGE.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rcs_storage::PlanError;

    #[test]
    fn store_failures_map_to_store_code() {
        let err = SyncError::from(StoreError::from(PlanError::Empty));
        let envelope = err.envelope();
        assert_eq!(envelope.rest_status, 500);
        assert_eq!(envelope.body.err_code, STORE_FAILURE_CODE);
        assert_eq!(envelope.body.err_msg, GENERIC_FAILURE_MESSAGE);
    }

    #[test]
    fn envelope_hides_detail() {
        let err = SyncError::from(anyhow::anyhow!("password=hunter2 rejected"));
        let json = serde_json::to_value(err.envelope()).unwrap();
        assert_eq!(json["restStatus"], 500);
        assert_eq!(json["body"]["errCode"], INTERNAL_FAILURE_CODE);
        assert!(!json.to_string().contains("hunter2"));
    }

    #[test]
    fn unreachable_database_gets_a_configuration_hint() {
        let down = SyncError::from(StoreError::Connect(sqlx::Error::PoolTimedOut));
        assert_eq!(down.operator_message(), UNREACHABLE_DATABASE_HINT);
        assert_eq!(down.envelope().body.err_msg, GENERIC_FAILURE_MESSAGE);

        let bad_plan = SyncError::from(StoreError::from(PlanError::Empty));
        assert_eq!(bad_plan.operator_message(), GENERIC_FAILURE_MESSAGE);
    }
}
