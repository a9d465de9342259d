use sea_orm::error::DbErr;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("CSV error in {path}: {source}")]
    CsvError {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("IO error on {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Missing column '{column}' in {path}")]
    MissingColumn { path: PathBuf, column: String },

    #[error("Duplicate credential: user '{0}' already exists")]
    DuplicateCredential(String),

    #[error("Hash error: {0}")]
    HashError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Migration error: {0}")]
    MigrationError(String),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl ServiceError {
    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        ServiceError::CsvError {
            path: path.into(),
            source,
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ServiceError::IoError {
            path: path.into(),
            source,
        }
    }

    /// Process exit code for the CLI. Row-level import problems never
    /// surface as a `ServiceError`.
    pub fn exit_code(&self) -> i32 {
        match self {
            ServiceError::IoError { .. }
            | ServiceError::CsvError { .. }
            | ServiceError::MissingColumn { .. } => 2,
            ServiceError::DuplicateCredential(_) => 3,
            ServiceError::Forbidden(_) => 4,
            ServiceError::NotFound(_) => 5,
            ServiceError::Conflict(_) => 6,
            ServiceError::ConfigError(_) | ServiceError::ValidationError(_) => 78,
            _ => 1,
        }
    }
}

pub type AppError = ServiceError;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_names_the_file() {
        let err = ServiceError::io(
            "import/Tovar.csv",
            std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        );
        assert_eq!(
            err.to_string(),
            "IO error on import/Tovar.csv: no such file"
        );
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn duplicate_credential_has_its_own_exit_code() {
        let err = ServiceError::DuplicateCredential("admin@shop.ru".into());
        assert_eq!(err.exit_code(), 3);
        assert!(err.to_string().contains("admin@shop.ru"));
    }

    #[test]
    fn management_failures_have_distinct_exit_codes() {
        assert_eq!(ServiceError::Forbidden("guest".into()).exit_code(), 4);
        assert_eq!(ServiceError::NotFound("order 9".into()).exit_code(), 5);
        assert_eq!(ServiceError::Conflict("A112T4".into()).exit_code(), 6);
    }

    #[test]
    fn db_errors_convert_with_question_mark() {
        fn fails() -> Result<(), ServiceError> {
            Err(DbErr::Custom("boom".into()))?;
            Ok(())
        }
        let err = fails().unwrap_err();
        assert!(matches!(err, ServiceError::DatabaseError(_)));
        assert_eq!(err.exit_code(), 1);
    }
}
