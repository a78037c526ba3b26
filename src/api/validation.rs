use thiserror::Error;

use super::models::CreateJobRequest;

#[derive(Debug, Error)]
pub enum JobRequestValidationError {
    #[error("filename must not be empty")]
    EmptyFilename,
    #[error("filename exceeds 255 characters")]
    FilenameTooLong,
    #[error("filename must not contain path separators")]
    FilenameContainsPathSeparator,
}

pub fn validate_create_job(request: &CreateJobRequest) -> Result<(), JobRequestValidationError> {
    if request.filename.is_empty() {
        return Err(JobRequestValidationError::EmptyFilename);
    }
    if request.filename.len() > 255 {
        return Err(JobRequestValidationError::FilenameTooLong);
    }
    if request.filename.contains('/') || request.filename.contains('\\') {
        return Err(JobRequestValidationError::FilenameContainsPathSeparator);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_filename() {
        let request = CreateJobRequest { filename: "sample.mp4".to_string() };
        assert!(validate_create_job(&request).is_ok());
    }

    #[test]
    fn rejects_empty_filename() {
        let request = CreateJobRequest { filename: String::new() };
        assert!(matches!(validate_create_job(&request), Err(JobRequestValidationError::EmptyFilename)));
    }

    #[test]
    fn rejects_path_separators() {
        let request = CreateJobRequest { filename: "../escape.mp4".to_string() };
        assert!(matches!(
            validate_create_job(&request),
            Err(JobRequestValidationError::FilenameContainsPathSeparator)
        ));
    }
}
